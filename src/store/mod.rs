//! 用户与 Session 存储模块
//!
//! 每个 GUID 对应一条用户记录，记录内嵌至多一个 Session（refresh token 的哈希 +
//! 过期时间）。`refresh_token_hash` 为空表示没有活跃 Session。
//!
//! Session 只能整体替换。写入通过 [`SessionStore::set_session`] 的版本号做
//! 条件更新（compare-and-swap）：只有存储中的 `session_version` 与调用方先前
//! 读取的版本一致时才会写入，并把版本号加一。
//!
//! ## 示例
//!
//! ```rust
//! use guidauth::store::{InMemorySessionStore, Session, SessionStore, UserInput};
//! use chrono::Duration;
//!
//! # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
//! let store = InMemorySessionStore::new();
//! store.create(UserInput::new("guid-1").into_user()).await.unwrap();
//!
//! let user = store.get_by_guid("guid-1").await.unwrap();
//! let session = Session::new("$2b$04$hash", Duration::days(7)).unwrap();
//! let version = store
//!     .set_session("guid-1", session, user.session_version)
//!     .await
//!     .unwrap();
//! assert_eq!(version, user.session_version + 1);
//! # });
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::config::expiry_from_now;
use crate::error::Result;

mod memory;

pub use memory::InMemorySessionStore;

/// 用户内嵌的 Session
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// refresh token 的 bcrypt 哈希，空字符串表示无 Session
    pub refresh_token_hash: String,
    /// 过期时间
    pub expires_at: Option<DateTime<Utc>>,
}

impl Session {
    /// 创建从现在起 `ttl` 后过期的 Session
    ///
    /// 过期时间超出可表示范围时返回配置错误。
    pub fn new(refresh_token_hash: impl Into<String>, ttl: Duration) -> Result<Self> {
        Ok(Self {
            refresh_token_hash: refresh_token_hash.into(),
            expires_at: Some(expiry_from_now(ttl, "REFRESH_TOKEN_TTL")?),
        })
    }

    /// 是否为活跃 Session（哈希非空）
    pub fn is_active(&self) -> bool {
        !self.refresh_token_hash.is_empty()
    }

    /// 检查 Session 是否已过期
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(expires_at) => Utc::now() > expires_at,
            None => false,
        }
    }

    /// 获取剩余有效时间（秒）
    pub fn time_to_live(&self) -> i64 {
        self.expires_at
            .map(|expires_at| (expires_at - Utc::now()).num_seconds().max(0))
            .unwrap_or(0)
    }
}

/// 用户记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// 唯一且不可变的身份标识
    pub guid: String,
    /// 当前 Session
    #[serde(default)]
    pub session: Session,
    /// Session 代际版本号，每次写入 Session 加一
    #[serde(default)]
    pub session_version: u64,
}

impl User {
    /// 创建没有 Session 的用户
    pub fn new(guid: impl Into<String>) -> Self {
        Self {
            guid: guid.into(),
            session: Session::default(),
            session_version: 0,
        }
    }

    /// 是否存在活跃 Session
    pub fn has_session(&self) -> bool {
        self.session.is_active()
    }
}

/// 注册请求
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserInput {
    /// 用户 GUID
    pub guid: String,
}

impl UserInput {
    /// 创建注册请求
    pub fn new(guid: impl Into<String>) -> Self {
        Self { guid: guid.into() }
    }

    /// 转换为新用户记录
    pub fn into_user(self) -> User {
        User::new(self.guid)
    }
}

/// 用户/Session 存储 trait
///
/// 实现此 trait 可以接入数据库等持久化后端。GUID 必须在存储层声明为唯一。
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// 按 GUID 读取用户，不存在时返回 `StorageError::NotFound`
    async fn get_by_guid(&self, guid: &str) -> Result<User>;

    /// 创建用户，GUID 已存在时返回 `StorageError::AlreadyExists`
    async fn create(&self, user: User) -> Result<()>;

    /// 条件替换用户的 Session
    ///
    /// 仅当存储中的 `session_version == expected_version` 时写入，
    /// 成功后返回新的版本号。版本不一致返回 `StorageError::Conflict`，
    /// 用户不存在返回 `StorageError::NotFound`。
    async fn set_session(&self, guid: &str, session: Session, expected_version: u64)
    -> Result<u64>;
}
