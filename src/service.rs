//! 认证服务
//!
//! [`AuthService`] 组合 [`TokenManager`] 与 [`SessionStore`]，实现注册、首次认证与
//! refresh token 轮换，并维护"每个用户至多一个 Session"的不变量。
//!
//! ## Session 状态
//!
//! - **NoSession**: `refresh_token_hash` 为空
//! - **ActiveSession**: 哈希非空，带过期时间
//!
//! `authenticate` 只允许 NoSession → ActiveSession；`refresh` 在 token 与存储的
//! 哈希匹配时做 ActiveSession → ActiveSession 的整体轮换。两者都通过版本号条件写入
//! Session，并发请求中只有一个能成功，失败方得到可重试的
//! [`SessionError::Conflict`]。
//!
//! ## 示例
//!
//! ```rust
//! use guidauth::config::{AuthServiceConfig, TokenManagerConfig};
//! use guidauth::service::AuthService;
//! use guidauth::store::{InMemorySessionStore, UserInput};
//! use guidauth::token::TokenManager;
//! use std::sync::Arc;
//!
//! # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
//! let tokens = TokenManager::new(TokenManagerConfig::new(
//!     b"my-secret-key-at-least-32-bytes!",
//!     b"0123456789abcdef0123456789abcdef",
//! ))
//! .unwrap();
//! let service = AuthService::with_config(
//!     tokens,
//!     Arc::new(InMemorySessionStore::new()),
//!     AuthServiceConfig::new().with_bcrypt_cost(4),
//! )
//! .unwrap();
//!
//! service.register(UserInput::new("guid-1")).await.unwrap();
//! let pair = service.authenticate("guid-1").await.unwrap();
//! let rotated = service.refresh(&pair.refresh_token).await.unwrap();
//! assert_ne!(pair.refresh_token, rotated.refresh_token);
//! # });
//! ```

use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::audit::{AuditLogger, SecurityEvent};
use crate::config::{AuthServiceConfig, expiry_from_now};
use crate::error::{Error, Result, SessionError, StorageError, TokenError, ValidationError};
use crate::password::PasswordHasher;
use crate::store::{Session, SessionStore, User, UserInput};
use crate::token::{AccessClaims, TokenManager, TokenPair, decode_transport, encode_transport};

/// 认证服务
pub struct AuthService {
    tokens: Arc<TokenManager>,
    store: Arc<dyn SessionStore>,
    hasher: PasswordHasher,
    config: AuthServiceConfig,
    audit: Option<Arc<dyn AuditLogger>>,
}

impl AuthService {
    /// 使用默认配置创建认证服务
    pub fn new(tokens: TokenManager, store: Arc<dyn SessionStore>) -> Self {
        let config = AuthServiceConfig::default();
        Self {
            tokens: Arc::new(tokens),
            store,
            hasher: PasswordHasher::new(config.bcrypt_cost),
            config,
            audit: None,
        }
    }

    /// 使用自定义配置创建认证服务
    pub fn with_config(
        tokens: TokenManager,
        store: Arc<dyn SessionStore>,
        config: AuthServiceConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            tokens: Arc::new(tokens),
            store,
            hasher: PasswordHasher::new(config.bcrypt_cost),
            config,
            audit: None,
        })
    }

    /// 设置审计日志记录器
    pub fn with_audit_logger(mut self, logger: Arc<dyn AuditLogger>) -> Self {
        self.audit = Some(logger);
        self
    }

    /// 当前配置
    pub fn config(&self) -> &AuthServiceConfig {
        &self.config
    }

    /// 注册新用户
    ///
    /// GUID 已存在时返回 `StorageError::AlreadyExists`。
    pub async fn register(&self, input: UserInput) -> Result<()> {
        if input.guid.trim().is_empty() {
            return Err(Error::Validation(ValidationError::EmptyField(
                "guid".to_string(),
            )));
        }

        let guid = input.guid.clone();
        self.store_call("create", self.store.create(input.into_user()))
            .await?;

        info!(guid = %guid, "user registered");
        self.audit(SecurityEvent::user_registered(guid));
        Ok(())
    }

    /// 首次认证：为没有 Session 的用户创建 Session 并返回 token 对
    ///
    /// 用户已有活跃 Session 时返回 [`SessionError::AlreadyExists`]。开启过期检查时，
    /// 已过期的 Session 视为 NoSession，会被新的 Session 条件替换。
    pub async fn authenticate(&self, guid: &str) -> Result<TokenPair> {
        if guid.trim().is_empty() {
            return Err(Error::Validation(ValidationError::EmptyField(
                "guid".to_string(),
            )));
        }

        let user = match self.load_user(guid).await {
            Ok(user) => user,
            Err(e) => return Err(self.reject(Some(guid), e)),
        };

        let expired = self.config.enforce_refresh_expiry && user.session.is_expired();
        if user.has_session() && !expired {
            return Err(self.reject(
                Some(guid),
                Error::Session(SessionError::AlreadyExists(guid.to_string())),
            ));
        }

        if user.has_session() {
            debug!(guid, "replacing expired session");
        }

        let pair = self
            .create_session(guid, user.session_version)
            .await
            .map_err(|e| self.reject(Some(guid), e))?;

        info!(guid, "session created");
        self.audit(SecurityEvent::session_created(guid));
        Ok(pair)
    }

    /// 使用传输形式的 refresh token 轮换 Session
    ///
    /// 成功后旧 refresh token 立即失效，access token 也会重新签发。
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair> {
        let raw = decode_transport(refresh_token).map_err(|e| self.reject(None, e))?;
        let guid = self
            .tokens
            .verify_refresh_token(&raw)
            .map_err(|e| self.reject(None, e))?;

        let user = self
            .store_call("get_by_guid", self.store.get_by_guid(&guid))
            .await
            .map_err(|e| self.reject(Some(&guid), e))?;

        if !self
            .verify_hash(raw, user.session.refresh_token_hash.clone())
            .await
            .map_err(|e| self.reject(Some(&guid), e))?
        {
            return Err(self.reject(Some(&guid), Error::Token(TokenError::Mismatch)));
        }

        if self.config.enforce_refresh_expiry && user.session.is_expired() {
            return Err(self.reject(Some(&guid), Error::Session(SessionError::Expired)));
        }

        let pair = self
            .create_session(&guid, user.session_version)
            .await
            .map_err(|e| self.reject(Some(&guid), e))?;

        info!(guid = %guid, "session rotated");
        self.audit(SecurityEvent::session_rotated(&guid));
        Ok(pair)
    }

    /// 校验 access token
    pub fn validate_access_token(&self, token: &str) -> Result<AccessClaims> {
        self.tokens.validate_access_token(token)
    }

    async fn load_user(&self, guid: &str) -> Result<User> {
        match self.store_call("get_by_guid", self.store.get_by_guid(guid)).await {
            Err(Error::Storage(StorageError::NotFound(_))) if !self.config.require_registration => {
                debug!(guid, "implicit registration");
                match self
                    .store_call("create", self.store.create(User::new(guid)))
                    .await
                {
                    Ok(()) | Err(Error::Storage(StorageError::AlreadyExists(_))) => {}
                    Err(e) => return Err(e),
                }
                self.store_call("get_by_guid", self.store.get_by_guid(guid))
                    .await
            }
            other => other,
        }
    }

    /// 签发新 token 对并条件写入 Session
    ///
    /// 存储写入是最后一步，之前任何失败都不会留下部分写入的 Session。
    async fn create_session(&self, guid: &str, expected_version: u64) -> Result<TokenPair> {
        let (access_token, access_expires_at) = self.tokens.issue_access_token(guid)?;
        let refresh_token = self.tokens.issue_refresh_token(guid)?;
        let hash = self.hash_token(refresh_token.clone()).await?;

        let refresh_expires_at =
            expiry_from_now(self.tokens.refresh_ttl(), "REFRESH_TOKEN_TTL")?;
        let session = Session {
            refresh_token_hash: hash,
            expires_at: Some(refresh_expires_at),
        };

        let version = self
            .store_call(
                "set_session",
                self.store.set_session(guid, session, expected_version),
            )
            .await
            .map_err(|e| match e {
                Error::Storage(StorageError::Conflict(_)) => {
                    Error::Session(SessionError::Conflict(guid.to_string()))
                }
                other => other,
            })?;
        debug!(guid, version, "session persisted");

        Ok(TokenPair::new(
            access_token,
            encode_transport(&refresh_token),
            access_expires_at,
            refresh_expires_at,
        ))
    }

    async fn store_call<T, F>(&self, op: &'static str, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        match tokio::time::timeout(self.config.store_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(Error::Cancelled(format!(
                "store {} timed out after {:?}",
                op, self.config.store_timeout
            ))),
        }
    }

    async fn hash_token(&self, token: String) -> Result<String> {
        let hasher = self.hasher;
        run_blocking("hashing", move || hasher.hash(&token)).await?
    }

    async fn verify_hash(&self, token: String, hash: String) -> Result<bool> {
        let hasher = self.hasher;
        run_blocking("verification", move || hasher.verify(&token, &hash)).await
    }

    fn reject(&self, guid: Option<&str>, err: Error) -> Error {
        let event = match (&err, guid) {
            (Error::Session(SessionError::Conflict(_)), Some(guid)) => {
                warn!(guid, "session conflict");
                SecurityEvent::session_conflict(guid)
            }
            (_, Some(guid)) => {
                warn!(guid, error = %err, "session request rejected");
                SecurityEvent::session_rejected(guid, err.to_string())
            }
            (_, None) => {
                warn!(error = %err, "refresh token rejected");
                SecurityEvent::token_rejected(err.to_string())
            }
        };
        self.audit(event);
        err
    }

    fn audit(&self, event: SecurityEvent) {
        if let Some(logger) = &self.audit {
            logger.log(event);
        }
    }
}

/// 在阻塞线程池上执行 bcrypt 计算，任务 panic 时返回内部错误
async fn run_blocking<T, F>(op: &'static str, f: F) -> Result<T>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| Error::internal(format!("{} task failed: {}", op, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::{EventType, InMemoryAuditLogger};
    use crate::config::TokenManagerConfig;
    use crate::error::CryptoError;
    use crate::store::InMemorySessionStore;
    use chrono::Duration;

    const SECRET: &[u8] = b"test-secret-key-at-least-32-bytes!";
    const KEY: &[u8] = b"0123456789abcdef0123456789abcdef";

    fn service_with(config: TokenManagerConfig) -> (AuthService, Arc<InMemorySessionStore>) {
        let store = Arc::new(InMemorySessionStore::new());
        let service = AuthService::with_config(
            TokenManager::new(config).unwrap(),
            store.clone(),
            AuthServiceConfig::new().with_bcrypt_cost(4),
        )
        .unwrap();
        (service, store)
    }

    fn service() -> (AuthService, Arc<InMemorySessionStore>) {
        service_with(TokenManagerConfig::new(SECRET, KEY))
    }

    #[tokio::test]
    async fn test_register_and_authenticate() {
        let (service, store) = service();
        service.register(UserInput::new("guid-1")).await.unwrap();

        let pair = service.authenticate("guid-1").await.unwrap();
        assert_eq!(pair.token_type, "Bearer");
        assert!(pair.refresh_expires_at > pair.access_expires_at);

        let claims = service.validate_access_token(&pair.access_token).unwrap();
        assert_eq!(claims.guid, "guid-1");

        let user = store.get_by_guid("guid-1").await.unwrap();
        assert!(user.has_session());
        assert_eq!(user.session_version, 1);
        // 只存储哈希，不存储 token 本身
        assert!(user.session.refresh_token_hash.starts_with("$2"));
        assert_ne!(user.session.refresh_token_hash, pair.refresh_token);
    }

    #[tokio::test]
    async fn test_register_empty_guid() {
        let (service, _) = service();
        let result = service.register(UserInput::new("  ")).await;
        assert!(matches!(
            result,
            Err(Error::Validation(ValidationError::EmptyField(_)))
        ));
    }

    #[tokio::test]
    async fn test_register_duplicate() {
        let (service, _) = service();
        service.register(UserInput::new("guid-1")).await.unwrap();
        let result = service.register(UserInput::new("guid-1")).await;
        assert!(matches!(
            result,
            Err(Error::Storage(StorageError::AlreadyExists(_)))
        ));
    }

    #[tokio::test]
    async fn test_authenticate_twice() {
        let (service, _) = service();
        service.register(UserInput::new("guid-1")).await.unwrap();

        service.authenticate("guid-1").await.unwrap();
        let result = service.authenticate("guid-1").await;
        assert!(matches!(
            result,
            Err(Error::Session(SessionError::AlreadyExists(_)))
        ));
    }

    #[tokio::test]
    async fn test_authenticate_unknown_user() {
        let (service, _) = service();
        let result = service.authenticate("nobody").await;
        assert!(matches!(
            result,
            Err(Error::Storage(StorageError::NotFound(_)))
        ));
    }

    #[tokio::test]
    async fn test_authenticate_implicit_registration() {
        let store = Arc::new(InMemorySessionStore::new());
        let service = AuthService::with_config(
            TokenManager::new(TokenManagerConfig::new(SECRET, KEY)).unwrap(),
            store.clone(),
            AuthServiceConfig::new()
                .with_bcrypt_cost(4)
                .with_require_registration(false),
        )
        .unwrap();

        service.authenticate("guid-new").await.unwrap();
        let user = store.get_by_guid("guid-new").await.unwrap();
        assert!(user.has_session());
    }

    #[tokio::test]
    async fn test_refresh_rotates_tokens() {
        let (service, store) = service();
        service.register(UserInput::new("guid-1")).await.unwrap();

        let first = service.authenticate("guid-1").await.unwrap();
        let hash_before = store.get_by_guid("guid-1").await.unwrap().session;

        let second = service.refresh(&first.refresh_token).await.unwrap();
        assert_ne!(first.refresh_token, second.refresh_token);

        let user = store.get_by_guid("guid-1").await.unwrap();
        assert_ne!(user.session.refresh_token_hash, hash_before.refresh_token_hash);
        assert_eq!(user.session_version, 2);
    }

    #[tokio::test]
    async fn test_refresh_with_old_token_fails() {
        let (service, _) = service();
        service.register(UserInput::new("guid-1")).await.unwrap();

        let first = service.authenticate("guid-1").await.unwrap();
        service.refresh(&first.refresh_token).await.unwrap();

        let result = service.refresh(&first.refresh_token).await;
        assert!(matches!(result, Err(Error::Token(TokenError::Mismatch))));
    }

    #[tokio::test]
    async fn test_refresh_invalid_base64() {
        let (service, _) = service();
        let result = service.refresh("%%%").await;
        assert!(matches!(
            result,
            Err(Error::Token(TokenError::TransportDecode(_)))
        ));
    }

    #[tokio::test]
    async fn test_refresh_malformed_token() {
        let (service, _) = service();
        let result = service.refresh(&encode_transport("abcd")).await;
        assert!(matches!(result, Err(Error::Token(TokenError::Malformed(_)))));
    }

    #[tokio::test]
    async fn test_refresh_tampered_token() {
        let (service, _) = service();
        service.register(UserInput::new("guid-1")).await.unwrap();
        let pair = service.authenticate("guid-1").await.unwrap();

        let raw = decode_transport(&pair.refresh_token).unwrap();
        let mut bytes = hex::decode(raw).unwrap();
        bytes[0] ^= 0x01;
        let tampered = encode_transport(&hex::encode(bytes));

        let result = service.refresh(&tampered).await;
        assert!(matches!(
            result,
            Err(Error::Crypto(CryptoError::DecryptionFailed))
        ));
    }

    #[tokio::test]
    async fn test_refresh_unregistered_guid() {
        let (service, _) = service();
        let other = TokenManager::new(TokenManagerConfig::new(SECRET, KEY)).unwrap();
        let raw = other.issue_refresh_token("ghost").unwrap();

        let result = service.refresh(&encode_transport(&raw)).await;
        assert!(matches!(
            result,
            Err(Error::Storage(StorageError::NotFound(_)))
        ));
    }

    #[tokio::test]
    async fn test_refresh_without_session() {
        let (service, _) = service();
        service.register(UserInput::new("guid-1")).await.unwrap();

        let other = TokenManager::new(TokenManagerConfig::new(SECRET, KEY)).unwrap();
        let raw = other.issue_refresh_token("guid-1").unwrap();

        let result = service.refresh(&encode_transport(&raw)).await;
        assert!(matches!(result, Err(Error::Token(TokenError::Mismatch))));
    }

    #[tokio::test]
    async fn test_refresh_expired_session() {
        let (service, _) = service_with(
            TokenManagerConfig::new(SECRET, KEY).with_refresh_ttl(Duration::seconds(-1)),
        );
        service.register(UserInput::new("guid-1")).await.unwrap();
        let pair = service.authenticate("guid-1").await.unwrap();

        let result = service.refresh(&pair.refresh_token).await;
        assert!(matches!(result, Err(Error::Session(SessionError::Expired))));
    }

    #[tokio::test]
    async fn test_concurrent_authenticate() {
        let (service, store) = service();
        service.register(UserInput::new("guid-1")).await.unwrap();

        let (a, b) = tokio::join!(service.authenticate("guid-1"), service.authenticate("guid-1"));

        let successes = [&a, &b].iter().filter(|r| r.is_ok()).count();
        assert_eq!(successes, 1);

        let err = if a.is_err() { a.unwrap_err() } else { b.unwrap_err() };
        assert!(matches!(err, Error::Session(SessionError::Conflict(_))));
        assert!(err.is_retryable());

        assert_eq!(store.get_by_guid("guid-1").await.unwrap().session_version, 1);
    }

    #[tokio::test]
    async fn test_audit_events() {
        let (service, _) = service();
        let logger = Arc::new(InMemoryAuditLogger::new());
        let service = service.with_audit_logger(logger.clone());

        service.register(UserInput::new("guid-1")).await.unwrap();
        let pair = service.authenticate("guid-1").await.unwrap();
        service.refresh(&pair.refresh_token).await.unwrap();
        let _ = service.refresh(&pair.refresh_token).await;

        let types: Vec<EventType> = logger
            .get_events()
            .into_iter()
            .map(|e| e.event_type)
            .collect();
        assert_eq!(
            types,
            vec![
                EventType::UserRegistered,
                EventType::SessionCreated,
                EventType::SessionRotated,
                EventType::SessionRejected,
            ]
        );

        // 审计事件不包含 token
        for event in logger.get_events() {
            let json = serde_json::to_string(&event).unwrap();
            assert!(!json.contains(&pair.refresh_token));
        }
    }

    #[tokio::test]
    async fn test_authenticate_replaces_expired_session() {
        let (service, store) = service_with(
            TokenManagerConfig::new(SECRET, KEY).with_refresh_ttl(Duration::seconds(-1)),
        );
        service.register(UserInput::new("guid-1")).await.unwrap();
        let first = service.authenticate("guid-1").await.unwrap();

        let result = service.refresh(&first.refresh_token).await;
        assert!(matches!(result, Err(Error::Session(SessionError::Expired))));

        // 过期 Session 不阻止重新认证，且仍经过版本号条件写入
        let second = service.authenticate("guid-1").await.unwrap();
        assert_ne!(first.refresh_token, second.refresh_token);
        assert_eq!(store.get_by_guid("guid-1").await.unwrap().session_version, 2);

        let stale = service.refresh(&first.refresh_token).await;
        assert!(matches!(stale, Err(Error::Token(TokenError::Mismatch))));
    }

    #[tokio::test]
    async fn test_expired_session_blocks_authenticate_without_expiry_check() {
        let store = Arc::new(InMemorySessionStore::new());
        let service = AuthService::with_config(
            TokenManager::new(
                TokenManagerConfig::new(SECRET, KEY).with_refresh_ttl(Duration::seconds(-1)),
            )
            .unwrap(),
            store,
            AuthServiceConfig::new()
                .with_bcrypt_cost(4)
                .with_refresh_expiry(false),
        )
        .unwrap();
        service.register(UserInput::new("guid-1")).await.unwrap();
        service.authenticate("guid-1").await.unwrap();

        let result = service.authenticate("guid-1").await;
        assert!(matches!(
            result,
            Err(Error::Session(SessionError::AlreadyExists(_)))
        ));
    }

    #[tokio::test]
    async fn test_run_blocking_panic_is_internal_error() {
        let result: Result<()> = run_blocking("hashing", || panic!("bcrypt exploded")).await;
        assert!(matches!(result, Err(Error::Internal(_))));
    }

    #[tokio::test]
    async fn test_internal_error_is_audited() {
        let (service, _) = service();
        let logger = Arc::new(InMemoryAuditLogger::new());
        let service = service.with_audit_logger(logger.clone());

        let err = service.reject(Some("guid-1"), Error::internal("verification task failed"));
        assert!(matches!(err, Error::Internal(_)));

        let events = logger.get_events_by_user("guid-1");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, EventType::SessionRejected);
    }

    #[tokio::test]
    async fn test_with_config_rejects_invalid() {
        let result = AuthService::with_config(
            TokenManager::new(TokenManagerConfig::new(SECRET, KEY)).unwrap(),
            Arc::new(InMemorySessionStore::new()),
            AuthServiceConfig::new().with_bcrypt_cost(40),
        );
        assert!(result.is_err());
    }
}
