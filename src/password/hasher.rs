//! bcrypt 哈希实现
//!
//! 提供慢速加盐哈希与常量时间校验，用于存储 refresh token 的哈希。
//!
//! bcrypt 只处理输入的前 72 字节，而 refresh token 的 hex 形式通常更长，
//! 因此输入先归约为 SHA-256 十六进制摘要（64 字节）再交给 bcrypt。

use sha2::{Digest, Sha256};

use crate::config::DEFAULT_BCRYPT_COST;
use crate::error::{CryptoError, Error, Result};

/// bcrypt 哈希器
#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    /// bcrypt 的 cost 参数 (4-31, 默认 12)
    cost: u32,
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self {
            cost: DEFAULT_BCRYPT_COST,
        }
    }
}

impl PasswordHasher {
    /// 使用指定 cost 创建哈希器
    ///
    /// # Panics
    ///
    /// 如果 cost 不在 4-31 范围内会 panic
    pub fn new(cost: u32) -> Self {
        assert!(
            (4..=31).contains(&cost),
            "bcrypt cost must be between 4 and 31"
        );
        Self { cost }
    }

    /// 当前 cost
    pub fn cost(&self) -> u32 {
        self.cost
    }

    /// 哈希输入
    ///
    /// # Example
    ///
    /// ```rust
    /// use guidauth::password::PasswordHasher;
    ///
    /// let hasher = PasswordHasher::new(4);
    /// let hash = hasher.hash("refresh-token").unwrap();
    /// assert!(hash.starts_with("$2"));
    /// ```
    pub fn hash(&self, input: &str) -> Result<String> {
        bcrypt::hash(prehash(input), self.cost).map_err(|e| {
            Error::Crypto(CryptoError::HashFailed(format!("bcrypt hash failed: {}", e)))
        })
    }

    /// 校验输入与哈希是否匹配
    ///
    /// 空哈希（无活跃 Session）或格式无效的哈希都视为不匹配。
    pub fn verify(&self, input: &str, hash: &str) -> bool {
        if hash.is_empty() {
            return false;
        }
        bcrypt::verify(prehash(input), hash).unwrap_or(false)
    }
}

fn prehash(input: &str) -> String {
    hex::encode(Sha256::digest(input.as_bytes()))
}
