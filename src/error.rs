//! 统一错误类型模块
//!
//! 提供 guidauth 库中所有操作的错误类型定义。
//!
//! 错误信息中不包含密钥、原始 token 或解密失败时得到的任何明文。

use thiserror::Error;

/// guidauth 库的统一结果类型
pub type Result<T> = std::result::Result<T, Error>;

/// guidauth 库的错误类型
#[derive(Debug, Error)]
pub enum Error {
    /// Token 相关错误
    #[error("Token error: {0}")]
    Token(#[from] TokenError),

    /// 加密相关错误
    #[error("Crypto error: {0}")]
    Crypto(#[from] CryptoError),

    /// Session 状态错误
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// 存储错误
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// 配置错误
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// 验证错误
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// 请求被取消或超时
    #[error("operation cancelled: {0}")]
    Cancelled(String),

    /// 内部错误
    #[error("Internal error: {0}")]
    Internal(String),
}

/// 面向传输层的错误分类
///
/// 具体的状态码映射由调用方决定。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// token 或密码学校验失败
    Unauthorized,
    /// 重复注册或并发 Session 冲突
    Conflict,
    /// 用户不存在
    NotFound,
    /// 请求参数无效
    BadRequest,
    /// 服务端故障
    Internal,
}

impl Error {
    /// 创建一个内部错误
    pub fn internal(msg: impl Into<String>) -> Self {
        Error::Internal(msg.into())
    }

    /// 返回错误分类
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Token(_) | Error::Crypto(CryptoError::DecryptionFailed) => {
                ErrorKind::Unauthorized
            }
            Error::Crypto(_) => ErrorKind::Internal,
            Error::Session(SessionError::Expired) => ErrorKind::Unauthorized,
            Error::Session(_) => ErrorKind::Conflict,
            Error::Storage(StorageError::NotFound(_)) => ErrorKind::NotFound,
            Error::Storage(StorageError::AlreadyExists(_) | StorageError::Conflict(_)) => {
                ErrorKind::Conflict
            }
            Error::Storage(_) => ErrorKind::Internal,
            Error::Validation(_) => ErrorKind::BadRequest,
            Error::Config(_) | Error::Cancelled(_) | Error::Internal(_) => ErrorKind::Internal,
        }
    }

    /// 调用方是否可以重新发起同一请求
    ///
    /// 库内部从不自动重试。
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::Session(SessionError::Conflict(_)) | Error::Cancelled(_)
        )
    }
}

/// Token 相关错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    /// Token 已过期
    #[error("token has expired")]
    Expired,
    /// Token 格式无效（hex 解码失败或长度不足）
    #[error("malformed token: {0}")]
    Malformed(String),
    /// 传输层 base64 解码失败
    #[error("transport decoding failed: {0}")]
    TransportDecode(String),
    /// Token 签名无效
    #[error("invalid token signature")]
    InvalidSignature,
    /// 签名失败
    #[error("token signing failed: {0}")]
    SigningFailed(String),
    /// Token 解码失败
    #[error("token decoding failed: {0}")]
    DecodingFailed(String),
    /// Refresh token 与存储的哈希不匹配
    #[error("refresh token does not match the active session")]
    Mismatch,
}

/// 加密相关错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CryptoError {
    /// 随机数生成失败
    #[error("random number generation failed: {0}")]
    RngFailed(String),
    /// 密钥无效
    #[error("invalid key: {0}")]
    InvalidKey(String),
    /// 加密失败
    #[error("encryption failed: {0}")]
    EncryptionFailed(String),
    /// 解密失败（认证标签校验未通过）
    #[error("decryption failed")]
    DecryptionFailed,
    /// 哈希计算失败
    #[error("hashing failed: {0}")]
    HashFailed(String),
}

/// Session 状态错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// 用户已有活跃 Session
    #[error("session already exists for user {0}")]
    AlreadyExists(String),
    /// 并发写入导致 Session 代际冲突
    #[error("concurrent session update for user {0}")]
    Conflict(String),
    /// 存储的 Session 已过期
    #[error("session has expired")]
    Expired,
}

/// 存储相关错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    /// 记录未找到
    #[error("not found: {0}")]
    NotFound(String),
    /// 记录已存在
    #[error("already exists: {0}")]
    AlreadyExists(String),
    /// 条件写入失败，记录已被修改
    #[error("version conflict: {0}")]
    Conflict(String),
    /// 操作失败
    #[error("storage operation failed: {0}")]
    OperationFailed(String),
}

/// 配置相关错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// 缺少必需的配置
    #[error("missing required configuration: {0}")]
    MissingRequired(String),
    /// 无效的配置值
    #[error("invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },
}

/// 验证相关错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// 字段为空
    #[error("field '{0}' cannot be empty")]
    EmptyField(String),
}
