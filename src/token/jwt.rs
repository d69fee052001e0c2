//! Access token（JWT）实现模块
//!
//! access token 使用 HMAC-SHA512 签名，claims 为固定的类型化结构
//! [`AccessClaims`]，不接受任意键值。
//!
//! ## 示例
//!
//! ```rust
//! use guidauth::token::jwt::{AccessClaims, JwtValidator, sign_access_token};
//! use chrono::Duration;
//!
//! let secret = b"my-secret-key-at-least-32-bytes!";
//! let claims = AccessClaims::new("6f1c2a9e-guid", Duration::minutes(30)).unwrap();
//! let token = sign_access_token(&claims, secret).unwrap();
//!
//! let validator = JwtValidator::new(secret);
//! let decoded = validator.validate(&token).unwrap();
//! assert_eq!(decoded.guid, "6f1c2a9e-guid");
//! ```

use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::config::expiry_from_now;
use crate::error::{Error, Result, TokenError};
use crate::random::generate_random_hex;

/// access token 使用的签名算法
pub const ACCESS_TOKEN_ALGORITHM: Algorithm = Algorithm::HS512;

/// `jti` 的随机字节数
const JTI_BYTES: usize = 16;

/// access token 的 claims
///
/// 每个 token 带随机 `jti`，同一秒内为同一用户签发的两个 token 也互不相同。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
    /// 用户 GUID
    pub guid: String,
    /// 过期时间（Unix 秒）
    pub exp: i64,
    /// 签发时间（Unix 秒）
    pub iat: i64,
    /// Token ID
    pub jti: String,
}

impl AccessClaims {
    /// 创建从现在起 `ttl` 后过期的 claims
    ///
    /// 过期时间超出可表示范围时返回配置错误。
    pub fn new(guid: impl Into<String>, ttl: Duration) -> Result<Self> {
        let iat = Utc::now().timestamp();
        let exp = expiry_from_now(ttl, "ACCESS_TOKEN_TTL")?.timestamp();
        Ok(Self {
            guid: guid.into(),
            exp,
            iat,
            jti: generate_random_hex(JTI_BYTES)?,
        })
    }

    /// 检查 token 是否已过期
    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() > self.exp
    }
}

/// 使用 HS512 对 claims 签名
///
/// 密钥为空时返回 [`TokenError::SigningFailed`]。
pub fn sign_access_token(claims: &AccessClaims, secret: &[u8]) -> Result<String> {
    if secret.is_empty() {
        return Err(Error::Token(TokenError::SigningFailed(
            "signing secret is empty".to_string(),
        )));
    }

    let header = Header::new(ACCESS_TOKEN_ALGORITHM);
    let key = EncodingKey::from_secret(secret);

    encode(&header, claims, &key).map_err(|e| {
        Error::Token(TokenError::SigningFailed(format!(
            "failed to encode JWT: {}",
            e
        )))
    })
}

/// access token 验证器
pub struct JwtValidator {
    decoding_key: DecodingKey,
    leeway: u64,
}

impl JwtValidator {
    /// 使用签名密钥创建验证器
    pub fn new(secret: &[u8]) -> Self {
        Self {
            decoding_key: DecodingKey::from_secret(secret),
            leeway: 0,
        }
    }

    /// 设置时钟偏差容忍度（秒）
    pub fn with_leeway(mut self, leeway: u64) -> Self {
        self.leeway = leeway;
        self
    }

    /// 验证签名与过期时间并解码 claims
    pub fn validate(&self, token: &str) -> Result<AccessClaims> {
        let mut validation = Validation::new(ACCESS_TOKEN_ALGORITHM);
        validation.leeway = self.leeway;
        validation.set_required_spec_claims(&["exp"]);

        let data = decode::<AccessClaims>(token, &self.decoding_key, &validation).map_err(|e| {
            let error = match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::Expired,
                jsonwebtoken::errors::ErrorKind::InvalidSignature => TokenError::InvalidSignature,
                jsonwebtoken::errors::ErrorKind::InvalidToken => {
                    TokenError::Malformed("invalid token structure".to_string())
                }
                _ => TokenError::DecodingFailed(e.to_string()),
            };
            Error::Token(error)
        })?;

        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_SECRET: &[u8] = b"test-secret-key-at-least-32-bytes!";

    #[test]
    fn test_sign_and_validate() {
        let claims = AccessClaims::new("guid-123", Duration::minutes(30)).unwrap();
        let token = sign_access_token(&claims, TEST_SECRET).unwrap();

        assert_eq!(token.matches('.').count(), 2);

        let decoded = JwtValidator::new(TEST_SECRET).validate(&token).unwrap();
        assert_eq!(decoded, claims);
    }

    #[test]
    fn test_jti_is_unique() {
        let a = AccessClaims::new("guid-123", Duration::minutes(30)).unwrap();
        let b = AccessClaims::new("guid-123", Duration::minutes(30)).unwrap();
        assert_eq!(a.jti.len(), JTI_BYTES * 2);
        assert_ne!(a.jti, b.jti);

        // 同一秒内签发的 token 也不相同
        let token_a = sign_access_token(&a, TEST_SECRET).unwrap();
        let token_b = sign_access_token(&b, TEST_SECRET).unwrap();
        assert_ne!(token_a, token_b);

        let decoded = JwtValidator::new(TEST_SECRET).validate(&token_a).unwrap();
        assert_eq!(decoded.jti, a.jti);
    }

    #[test]
    fn test_ttl_out_of_range() {
        let result = AccessClaims::new("guid-123", Duration::MAX);
        assert!(matches!(
            result,
            Err(Error::Config(crate::error::ConfigError::InvalidValue { .. }))
        ));
    }

    #[test]
    fn test_header_uses_hs512() {
        let claims = AccessClaims::new("guid-123", Duration::minutes(30)).unwrap();
        let token = sign_access_token(&claims, TEST_SECRET).unwrap();

        let header = jsonwebtoken::decode_header(&token).unwrap();
        assert_eq!(header.alg, Algorithm::HS512);
    }

    #[test]
    fn test_empty_secret_fails() {
        let claims = AccessClaims::new("guid-123", Duration::minutes(30)).unwrap();
        let result = sign_access_token(&claims, b"");
        assert!(matches!(
            result,
            Err(Error::Token(TokenError::SigningFailed(_)))
        ));
    }

    #[test]
    fn test_expired_token() {
        let claims = AccessClaims::new("guid-123", Duration::seconds(-120)).unwrap();
        assert!(claims.is_expired());

        let token = sign_access_token(&claims, TEST_SECRET).unwrap();
        let result = JwtValidator::new(TEST_SECRET).validate(&token);
        assert!(matches!(result, Err(Error::Token(TokenError::Expired))));
    }

    #[test]
    fn test_wrong_secret() {
        let claims = AccessClaims::new("guid-123", Duration::minutes(30)).unwrap();
        let token = sign_access_token(&claims, TEST_SECRET).unwrap();

        let result = JwtValidator::new(b"wrong-secret-key-at-least-32-bytes!").validate(&token);
        assert!(matches!(
            result,
            Err(Error::Token(TokenError::InvalidSignature))
        ));
    }

    #[test]
    fn test_garbage_token() {
        let result = JwtValidator::new(TEST_SECRET).validate("not-a-jwt");
        assert!(result.is_err());
    }

    #[test]
    fn test_leeway_accepts_recently_expired() {
        let claims = AccessClaims::new("guid-123", Duration::seconds(-5)).unwrap();
        let token = sign_access_token(&claims, TEST_SECRET).unwrap();

        let validator = JwtValidator::new(TEST_SECRET).with_leeway(60);
        assert!(validator.validate(&token).is_ok());
    }
}
