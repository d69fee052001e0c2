//! TokenManager
//!
//! 纯密码学组件：签发 access token，加密/解密 refresh token。
//! 不持有可变状态，不访问存储，可在任意线程间共享。

use chrono::{DateTime, Duration, Utc};

use super::jwt::{AccessClaims, JwtValidator, sign_access_token};
use super::refresh::RefreshTokenCipher;
use crate::config::TokenManagerConfig;
use crate::error::{Error, Result};

/// access token 与 refresh token 的签发和校验
#[derive(Debug, Clone)]
pub struct TokenManager {
    config: TokenManagerConfig,
    cipher: RefreshTokenCipher,
}

impl TokenManager {
    /// 创建 TokenManager
    ///
    /// 加密密钥长度不是 32 字节时返回配置错误。
    pub fn new(config: TokenManagerConfig) -> Result<Self> {
        config.validate()?;
        let cipher = RefreshTokenCipher::new(&config.encryption_key)?;
        Ok(Self { config, cipher })
    }

    /// access token 有效期
    pub fn access_ttl(&self) -> Duration {
        self.config.access_ttl
    }

    /// refresh token 有效期
    pub fn refresh_ttl(&self) -> Duration {
        self.config.refresh_ttl
    }

    /// 签发 access token，返回 token 及其过期时间
    pub fn issue_access_token(&self, guid: &str) -> Result<(String, DateTime<Utc>)> {
        let claims = AccessClaims::new(guid, self.config.access_ttl)?;
        let token = sign_access_token(&claims, &self.config.signing_secret)?;
        let expires_at = DateTime::from_timestamp(claims.exp, 0)
            .ok_or_else(|| Error::internal(format!("exp {} is out of range", claims.exp)))?;
        tracing::debug!(guid, "access token issued");
        Ok((token, expires_at))
    }

    /// 签发 refresh token（内部 hex 形式）
    pub fn issue_refresh_token(&self, guid: &str) -> Result<String> {
        let token = self.cipher.encrypt(guid)?;
        tracing::debug!(guid, "refresh token issued");
        Ok(token)
    }

    /// 校验 refresh token 并返回其中的 GUID
    pub fn verify_refresh_token(&self, token: &str) -> Result<String> {
        self.cipher.decrypt(token)
    }

    /// 校验 access token 并返回 claims
    pub fn validate_access_token(&self, token: &str) -> Result<AccessClaims> {
        JwtValidator::new(&self.config.signing_secret).validate(token)
    }
}
