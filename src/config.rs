//! 配置模块
//!
//! 进程级、启动时加载一次的不可变配置。
//!
//! ## 环境变量
//!
//! | 变量 | 含义 | 缺省 |
//! |------|------|------|
//! | `SECRET` | access token 的 HMAC 签名密钥 | 必填 |
//! | `AES_KEY` | refresh token 的 AES-256 密钥（32 字节） | 必填 |
//! | `ACCESS_TOKEN_TTL` | access token 有效期，如 `30m` | 30 分钟 |
//! | `REFRESH_TOKEN_TTL` | refresh token 有效期，如 `168h` | 7 天 |
//!
//! ## 示例
//!
//! ```rust
//! use guidauth::config::TokenManagerConfig;
//! use chrono::Duration;
//!
//! let config = TokenManagerConfig::new(b"signing-secret", b"0123456789abcdef0123456789abcdef")
//!     .with_access_ttl(Duration::minutes(15));
//! assert!(config.validate().is_ok());
//! ```

use chrono::{DateTime, Duration, Utc};
use std::fmt;

use crate::error::{ConfigError, Error, Result};

/// AES-256 密钥长度（字节）
pub const AES_KEY_LEN: usize = 32;

/// bcrypt 默认 cost
pub const DEFAULT_BCRYPT_COST: u32 = bcrypt::DEFAULT_COST;

/// 有效期上限：`i64::MAX` 纳秒（约 292 年）
pub fn max_ttl() -> Duration {
    Duration::nanoseconds(i64::MAX)
}

/// 计算从现在起 `ttl` 之后的时间点
///
/// 结果超出可表示的时间范围时返回 `key` 对应的配置错误。
pub fn expiry_from_now(ttl: Duration, key: &str) -> Result<DateTime<Utc>> {
    Utc::now().checked_add_signed(ttl).ok_or_else(|| {
        Error::Config(ConfigError::InvalidValue {
            key: key.to_string(),
            message: "expiry is out of the representable time range".to_string(),
        })
    })
}

/// TokenManager 配置
#[derive(Clone)]
pub struct TokenManagerConfig {
    /// access token 签名密钥
    pub signing_secret: Vec<u8>,
    /// refresh token 加密密钥
    pub encryption_key: Vec<u8>,
    /// access token 有效期
    pub access_ttl: Duration,
    /// refresh token（Session）有效期
    pub refresh_ttl: Duration,
}

impl fmt::Debug for TokenManagerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenManagerConfig")
            .field("signing_secret", &"<redacted>")
            .field("encryption_key", &"<redacted>")
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish()
    }
}

impl TokenManagerConfig {
    /// 默认 access token 有效期
    pub fn default_access_ttl() -> Duration {
        Duration::minutes(30)
    }

    /// 默认 refresh token 有效期
    pub fn default_refresh_ttl() -> Duration {
        Duration::days(7)
    }

    /// 使用签名密钥和加密密钥创建配置，有效期取默认值
    pub fn new(signing_secret: impl AsRef<[u8]>, encryption_key: impl AsRef<[u8]>) -> Self {
        Self {
            signing_secret: signing_secret.as_ref().to_vec(),
            encryption_key: encryption_key.as_ref().to_vec(),
            access_ttl: Self::default_access_ttl(),
            refresh_ttl: Self::default_refresh_ttl(),
        }
    }

    /// 设置 access token 有效期
    pub fn with_access_ttl(mut self, ttl: Duration) -> Self {
        self.access_ttl = ttl;
        self
    }

    /// 设置 refresh token 有效期
    pub fn with_refresh_ttl(mut self, ttl: Duration) -> Self {
        self.refresh_ttl = ttl;
        self
    }

    /// 检查配置
    ///
    /// 签名密钥为空时不在此处报错，而是在签发 access token 时返回签名错误。
    pub fn validate(&self) -> Result<()> {
        if self.encryption_key.len() != AES_KEY_LEN {
            return Err(Error::Config(ConfigError::InvalidValue {
                key: "AES_KEY".to_string(),
                message: format!(
                    "expected {} bytes, got {}",
                    AES_KEY_LEN,
                    self.encryption_key.len()
                ),
            }));
        }
        for (key, ttl) in [
            ("ACCESS_TOKEN_TTL", self.access_ttl),
            ("REFRESH_TOKEN_TTL", self.refresh_ttl),
        ] {
            if ttl.abs() > max_ttl() {
                return Err(Error::Config(ConfigError::InvalidValue {
                    key: key.to_string(),
                    message: "must not exceed 2562047h".to_string(),
                }));
            }
        }
        Ok(())
    }

    /// 从环境变量加载配置（会先尝试读取 `.env`）
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 从任意键值来源加载配置
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let secret = lookup("SECRET")
            .ok_or_else(|| Error::Config(ConfigError::MissingRequired("SECRET".to_string())))?;
        let aes_key = lookup("AES_KEY")
            .ok_or_else(|| Error::Config(ConfigError::MissingRequired("AES_KEY".to_string())))?;

        let access_ttl = lookup("ACCESS_TOKEN_TTL")
            .and_then(|v| parse_duration(&v))
            .unwrap_or_else(Self::default_access_ttl);
        let refresh_ttl = lookup("REFRESH_TOKEN_TTL")
            .and_then(|v| parse_duration(&v))
            .unwrap_or_else(Self::default_refresh_ttl);

        let config = Self::new(secret, aes_key)
            .with_access_ttl(access_ttl)
            .with_refresh_ttl(refresh_ttl);
        config.validate()?;

        tracing::debug!(?config, "token manager config loaded");
        Ok(config)
    }
}

/// AuthService 配置
#[derive(Debug, Clone)]
pub struct AuthServiceConfig {
    /// refresh token 哈希的 bcrypt cost（4-31）
    pub bcrypt_cost: u32,
    /// 单次存储调用的超时时间
    pub store_timeout: std::time::Duration,
    /// 刷新时是否检查 Session 过期时间
    pub enforce_refresh_expiry: bool,
    /// Authenticate 是否要求用户已注册
    pub require_registration: bool,
}

impl Default for AuthServiceConfig {
    fn default() -> Self {
        Self {
            bcrypt_cost: DEFAULT_BCRYPT_COST,
            store_timeout: std::time::Duration::from_secs(5),
            enforce_refresh_expiry: true,
            require_registration: true,
        }
    }
}

impl AuthServiceConfig {
    /// 创建默认配置
    pub fn new() -> Self {
        Self::default()
    }

    /// 设置 bcrypt cost
    pub fn with_bcrypt_cost(mut self, cost: u32) -> Self {
        self.bcrypt_cost = cost;
        self
    }

    /// 设置存储调用超时
    pub fn with_store_timeout(mut self, timeout: std::time::Duration) -> Self {
        self.store_timeout = timeout;
        self
    }

    /// 设置是否检查 refresh 过期
    pub fn with_refresh_expiry(mut self, enabled: bool) -> Self {
        self.enforce_refresh_expiry = enabled;
        self
    }

    /// 设置 Authenticate 是否要求预先注册
    pub fn with_require_registration(mut self, required: bool) -> Self {
        self.require_registration = required;
        self
    }

    /// 检查配置
    pub fn validate(&self) -> Result<()> {
        if !(4..=31).contains(&self.bcrypt_cost) {
            return Err(Error::Config(ConfigError::InvalidValue {
                key: "bcrypt_cost".to_string(),
                message: "must be between 4 and 31".to_string(),
            }));
        }
        if self.store_timeout.is_zero() {
            return Err(Error::Config(ConfigError::InvalidValue {
                key: "store_timeout".to_string(),
                message: "must be greater than zero".to_string(),
            }));
        }
        Ok(())
    }
}

/// 解析形如 `1h30m`、`45s`、`500ms` 的时长字符串
///
/// 支持的单位：`h`、`m`、`s`、`ms`。格式无效或总时长超过 [`max_ttl`] 时返回 `None`。
pub fn parse_duration(input: &str) -> Option<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }

    let mut total = Duration::zero();
    let mut rest = input;

    while !rest.is_empty() {
        let digits = rest.find(|c: char| !c.is_ascii_digit())?;
        if digits == 0 {
            return None;
        }
        let value: i64 = rest[..digits].parse().ok()?;
        rest = &rest[digits..];

        let unit_len = rest
            .find(|c: char| c.is_ascii_digit())
            .unwrap_or(rest.len());
        let part = match &rest[..unit_len] {
            "h" => Duration::try_hours(value)?,
            "m" => Duration::try_minutes(value)?,
            "s" => Duration::try_seconds(value)?,
            "ms" => Duration::try_milliseconds(value)?,
            _ => return None,
        };
        total = total.checked_add(&part)?;
        rest = &rest[unit_len..];
    }

    (total <= max_ttl()).then_some(total)
}
