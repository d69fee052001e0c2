//! # guidauth
//!
//! 基于 GUID 的认证库，管理双 token 的单 Session 生命周期。
//!
//! ## 功能特性
//!
//! - **Access Token**: HS512 签名的 JWT，claims 为类型化的 `{guid, exp, iat, jti}`
//! - **Refresh Token**: AES-256-GCM 加密的 GUID，hex 内部形式 + base64 传输形式
//! - **哈希校验**: 存储层只保存 refresh token 的 bcrypt 哈希
//! - **单 Session 不变量**: 每个用户至多一个 Session，条件写入防止并发覆盖
//! - **审计日志**: Session 生命周期安全事件
//!
//! ## 示例
//!
//! ```rust
//! use guidauth::{AuthService, AuthServiceConfig, InMemorySessionStore, TokenManager, TokenManagerConfig, UserInput};
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
//! service.register(UserInput::new("6f1c2a9e-0d4b-4f7e-9a51-3c2b1d0e8f77")).await.unwrap();
//!
//! // 首次认证
//! let pair = service.authenticate("6f1c2a9e-0d4b-4f7e-9a51-3c2b1d0e8f77").await.unwrap();
//!
//! // 已有 Session 时再次认证失败
//! assert!(service.authenticate("6f1c2a9e-0d4b-4f7e-9a51-3c2b1d0e8f77").await.is_err());
//!
//! // 轮换
//! let rotated = service.refresh(&pair.refresh_token).await.unwrap();
//! let claims = service.validate_access_token(&rotated.access_token).unwrap();
//! assert_eq!(claims.guid, "6f1c2a9e-0d4b-4f7e-9a51-3c2b1d0e8f77");
//! # });
//! ```

pub mod audit;
pub mod config;
pub mod error;
pub mod password;
pub mod random;
pub mod service;
pub mod store;
pub mod token;

pub use error::{Error, ErrorKind, Result};

// ============================================================================
// 配置与服务导出
// ============================================================================

pub use config::{AuthServiceConfig, TokenManagerConfig};
pub use service::AuthService;

// ============================================================================
// Token 相关导出
// ============================================================================

pub use token::{AccessClaims, TokenManager, TokenPair};

// ============================================================================
// 存储相关导出
// ============================================================================

pub use store::{InMemorySessionStore, Session, SessionStore, User, UserInput};

// ============================================================================
// 审计相关导出
// ============================================================================

pub use audit::{AuditLogger, InMemoryAuditLogger, SecurityEvent, TracingAuditLogger};
