//! Token 模块
//!
//! 提供 access token 与 refresh token 的签发和校验。
//!
//! ## 子模块
//!
//! - **jwt**: HS512 签名的 access token，claims 为 `{guid, exp, iat, jti}`
//! - **refresh**: AES-256-GCM 加密的 refresh token 及其传输编码
//! - **manager**: 组合以上两者的 [`TokenManager`]
//!
//! ## 示例
//!
//! ```rust
//! use guidauth::config::TokenManagerConfig;
//! use guidauth::token::TokenManager;
//!
//! let config = TokenManagerConfig::new(
//!     b"my-secret-key-at-least-32-bytes!",
//!     b"0123456789abcdef0123456789abcdef",
//! );
//! let manager = TokenManager::new(config).unwrap();
//!
//! let refresh = manager.issue_refresh_token("6f1c2a9e-guid").unwrap();
//! assert_eq!(manager.verify_refresh_token(&refresh).unwrap(), "6f1c2a9e-guid");
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod jwt;
pub mod manager;
pub mod refresh;

pub use jwt::{AccessClaims, JwtValidator};
pub use manager::TokenManager;
pub use refresh::{RefreshTokenCipher, decode_transport, encode_transport};

/// 返回给调用方的 token 对
///
/// refresh token 为传输形式（base64），不会原样存储。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    /// Access Token（短期有效）
    pub access_token: String,
    /// Refresh Token（长期有效，传输形式）
    pub refresh_token: String,
    /// Access Token 过期时间（Unix 时间戳）
    pub access_expires_at: i64,
    /// Refresh Token 过期时间（Unix 时间戳）
    pub refresh_expires_at: i64,
    /// Token 类型
    pub token_type: String,
}

impl TokenPair {
    pub(crate) fn new(
        access_token: String,
        refresh_token: String,
        access_expires_at: DateTime<Utc>,
        refresh_expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            access_token,
            refresh_token,
            access_expires_at: access_expires_at.timestamp(),
            refresh_expires_at: refresh_expires_at.timestamp(),
            token_type: "Bearer".to_string(),
        }
    }
}
