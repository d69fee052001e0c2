//! Refresh Token 加解密模块
//!
//! refresh token 是用 AES-256-GCM 加密的用户 GUID：
//!
//! - 内部形式：`hex(nonce ++ ciphertext ++ tag)`
//! - 传输形式：内部形式 hex 字符串字节的标准 base64 编码
//!
//! 每次加密都使用新的 96 位随机 nonce。同一个密钥在进程生命周期内不变，
//! nonce 只需唯一，无需保密，因此直接放在密文前面。
//!
//! ## 示例
//!
//! ```rust
//! use guidauth::token::refresh::RefreshTokenCipher;
//!
//! let cipher = RefreshTokenCipher::new(b"0123456789abcdef0123456789abcdef").unwrap();
//! let token = cipher.encrypt("6f1c2a9e-guid").unwrap();
//! assert_eq!(cipher.decrypt(&token).unwrap(), "6f1c2a9e-guid");
//! ```

use aes_gcm::{
    Aes256Gcm, Nonce,
    aead::{Aead, KeyInit},
};
use base64::{Engine, engine::general_purpose::STANDARD};

use crate::error::{CryptoError, Error, Result, TokenError};
use crate::random::generate_nonce;

/// AES-GCM nonce 长度（字节）
pub const NONCE_LEN: usize = 12;

/// AES-GCM 认证标签长度（字节）
pub const TAG_LEN: usize = 16;

/// refresh token 的 AES-256-GCM 加解密器
#[derive(Clone)]
pub struct RefreshTokenCipher {
    cipher: Aes256Gcm,
}

impl std::fmt::Debug for RefreshTokenCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshTokenCipher").finish_non_exhaustive()
    }
}

impl RefreshTokenCipher {
    /// 使用 32 字节密钥创建加解密器
    pub fn new(key: &[u8]) -> Result<Self> {
        let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| {
            Error::Crypto(CryptoError::InvalidKey(format!(
                "AES-256 key must be 32 bytes, got {}",
                key.len()
            )))
        })?;
        Ok(Self { cipher })
    }

    /// 加密 GUID，返回 refresh token 的内部 hex 形式
    pub fn encrypt(&self, guid: &str) -> Result<String> {
        let nonce_bytes: [u8; NONCE_LEN] = generate_nonce().map_err(|e| match e {
            Error::Crypto(CryptoError::RngFailed(msg)) => {
                Error::Crypto(CryptoError::EncryptionFailed(format!("nonce generation: {}", msg)))
            }
            other => other,
        })?;
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = self.cipher.encrypt(nonce, guid.as_bytes()).map_err(|_| {
            Error::Crypto(CryptoError::EncryptionFailed("AES-GCM seal failed".to_string()))
        })?;

        let mut sealed = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        sealed.extend_from_slice(&nonce_bytes);
        sealed.extend_from_slice(&ciphertext);

        Ok(hex::encode(sealed))
    }

    /// 解密内部 hex 形式的 refresh token，返回 GUID
    ///
    /// - hex 解码失败或长度不足 nonce：[`TokenError::Malformed`]
    /// - 认证标签校验失败：[`CryptoError::DecryptionFailed`]
    pub fn decrypt(&self, token: &str) -> Result<String> {
        let sealed = hex::decode(token)
            .map_err(|e| Error::Token(TokenError::Malformed(format!("invalid hex: {}", e))))?;

        if sealed.len() < NONCE_LEN {
            return Err(Error::Token(TokenError::Malformed(
                "ciphertext too short".to_string(),
            )));
        }

        let (nonce_bytes, ciphertext) = sealed.split_at(NONCE_LEN);
        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
            .map_err(|_| Error::Crypto(CryptoError::DecryptionFailed))?;

        String::from_utf8(plaintext).map_err(|_| Error::Crypto(CryptoError::DecryptionFailed))
    }
}

/// 将内部形式编码为传输形式（标准 base64）
pub fn encode_transport(token: &str) -> String {
    STANDARD.encode(token.as_bytes())
}

/// 将传输形式解码为内部形式
pub fn decode_transport(encoded: &str) -> Result<String> {
    let bytes = STANDARD
        .decode(encoded)
        .map_err(|e| Error::Token(TokenError::TransportDecode(e.to_string())))?;
    String::from_utf8(bytes).map_err(|_| {
        Error::Token(TokenError::TransportDecode(
            "decoded token is not valid UTF-8".to_string(),
        ))
    })
}
