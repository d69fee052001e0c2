//! 安全随机数生成模块
//!
//! 提供密码学安全的随机数生成功能，用于 refresh token 的 nonce 与 access token 的 `jti`。

use rand::{TryRngCore, rngs::OsRng};

use crate::error::{CryptoError, Error, Result};

/// 使用操作系统 CSPRNG 填充给定的缓冲区
///
/// 随机源不可用时返回 [`CryptoError::RngFailed`]。
pub fn fill_random(buf: &mut [u8]) -> Result<()> {
    OsRng
        .try_fill_bytes(buf)
        .map_err(|e| Error::Crypto(CryptoError::RngFailed(format!("{:?}", e))))
}

/// 生成指定字节数的随机 hex 字符串
///
/// # Example
///
/// ```rust
/// use guidauth::random::generate_random_hex;
///
/// let hex = generate_random_hex(16).unwrap();
/// assert_eq!(hex.len(), 32);
/// ```
pub fn generate_random_hex(byte_length: usize) -> Result<String> {
    let mut bytes = vec![0u8; byte_length];
    fill_random(&mut bytes)?;
    Ok(hex::encode(bytes))
}

/// 生成固定长度的随机 nonce
///
/// AES-GCM 使用 96 位 nonce，即 `generate_nonce::<12>()`。
pub fn generate_nonce<const N: usize>() -> Result<[u8; N]> {
    let mut nonce = [0u8; N];
    fill_random(&mut nonce)?;
    Ok(nonce)
}
