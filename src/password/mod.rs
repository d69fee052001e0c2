//! 哈希模块
//!
//! 基于 bcrypt 的慢速加盐哈希。存储层只保存 refresh token 的哈希，
//! 刷新时用常量时间比较校验客户端提交的 token。
//!
//! ## 示例
//!
//! ```rust
//! use guidauth::password::PasswordHasher;
//!
//! let hasher = PasswordHasher::new(4);
//! let hash = hasher.hash("opaque-refresh-token").unwrap();
//! assert!(hasher.verify("opaque-refresh-token", &hash));
//! ```

mod hasher;

pub use hasher::PasswordHasher;
