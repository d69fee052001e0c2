//! 审计日志模块
//!
//! 记录 Session 生命周期中的安全事件：
//!
//! - **安全事件**: 注册、Session 创建、轮换、拒绝、并发冲突
//! - **审计日志 Trait**: 可插拔的记录接口
//! - **实现**: 内存实现（测试/开发）与 `tracing` 转发实现
//!
//! 事件中只包含 GUID 与原因描述，从不包含 token 或密钥。
//!
//! ## 使用示例
//!
//! ```rust
//! use guidauth::audit::{AuditLogger, EventType, InMemoryAuditLogger, SecurityEvent};
//!
//! let logger = InMemoryAuditLogger::new();
//! logger.log(SecurityEvent::session_created("guid-1"));
//! logger.log(SecurityEvent::session_rejected("guid-2", "token mismatch"));
//!
//! assert_eq!(logger.get_events_by_user("guid-1").len(), 1);
//! assert_eq!(logger.get_events_by_type(&EventType::SessionRejected).len(), 1);
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::RwLock;

/// 事件严重程度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum EventSeverity {
    /// 调试信息
    Debug,
    /// 一般信息
    #[default]
    Info,
    /// 警告
    Warning,
    /// 错误
    Error,
}

impl std::fmt::Display for EventSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventSeverity::Debug => write!(f, "DEBUG"),
            EventSeverity::Info => write!(f, "INFO"),
            EventSeverity::Warning => write!(f, "WARNING"),
            EventSeverity::Error => write!(f, "ERROR"),
        }
    }
}

/// 安全事件类型
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventType {
    /// 用户注册
    UserRegistered,
    /// 首次认证创建 Session
    SessionCreated,
    /// refresh 轮换 Session
    SessionRotated,
    /// 认证或刷新被拒绝
    SessionRejected,
    /// 并发写入冲突
    SessionConflict,
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventType::UserRegistered => write!(f, "user_registered"),
            EventType::SessionCreated => write!(f, "session_created"),
            EventType::SessionRotated => write!(f, "session_rotated"),
            EventType::SessionRejected => write!(f, "session_rejected"),
            EventType::SessionConflict => write!(f, "session_conflict"),
        }
    }
}

/// 安全事件
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityEvent {
    /// 事件类型
    pub event_type: EventType,
    /// 严重程度
    pub severity: EventSeverity,
    /// 用户 GUID（如果已知）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// 事件消息/描述
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// 额外详情
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub details: HashMap<String, String>,
    /// 事件时间
    pub timestamp: DateTime<Utc>,
}

impl SecurityEvent {
    /// 创建新的安全事件
    pub fn new(event_type: EventType, severity: EventSeverity) -> Self {
        Self {
            event_type,
            severity,
            user_id: None,
            message: None,
            details: HashMap::new(),
            timestamp: Utc::now(),
        }
    }

    pub fn user_registered(guid: impl Into<String>) -> Self {
        Self::new(EventType::UserRegistered, EventSeverity::Info).with_user_id(guid)
    }

    pub fn session_created(guid: impl Into<String>) -> Self {
        Self::new(EventType::SessionCreated, EventSeverity::Info).with_user_id(guid)
    }

    pub fn session_rotated(guid: impl Into<String>) -> Self {
        Self::new(EventType::SessionRotated, EventSeverity::Info).with_user_id(guid)
    }

    pub fn session_rejected(guid: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::new(EventType::SessionRejected, EventSeverity::Warning)
            .with_user_id(guid)
            .with_message(reason)
    }

    /// 无法确定 GUID 的拒绝（例如 refresh token 解密失败）
    pub fn token_rejected(reason: impl Into<String>) -> Self {
        Self::new(EventType::SessionRejected, EventSeverity::Warning).with_message(reason)
    }

    pub fn session_conflict(guid: impl Into<String>) -> Self {
        Self::new(EventType::SessionConflict, EventSeverity::Warning)
            .with_user_id(guid)
            .with_message("concurrent session update lost the race")
    }

    /// 设置用户 ID
    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// 设置消息
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// 添加详情
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }
}

/// 审计日志记录器 trait
pub trait AuditLogger: Send + Sync {
    /// 记录安全事件
    fn log(&self, event: SecurityEvent);
}

/// 内存审计日志记录器
///
/// 用于测试和开发环境，将事件存储在内存中
#[derive(Debug, Default)]
pub struct InMemoryAuditLogger {
    events: RwLock<VecDeque<SecurityEvent>>,
    max_events: Option<usize>,
}

impl InMemoryAuditLogger {
    /// 创建新的内存日志记录器
    pub fn new() -> Self {
        Self::default()
    }

    /// 创建带有最大事件数限制的日志记录器，超出时丢弃最旧的事件
    pub fn with_max_events(max: usize) -> Self {
        Self {
            events: RwLock::new(VecDeque::new()),
            max_events: Some(max),
        }
    }

    /// 获取所有事件
    pub fn get_events(&self) -> Vec<SecurityEvent> {
        self.events
            .read()
            .map(|e| e.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// 获取事件数量
    pub fn event_count(&self) -> usize {
        self.events.read().map(|e| e.len()).unwrap_or(0)
    }

    /// 按用户 ID 获取事件
    pub fn get_events_by_user(&self, user_id: &str) -> Vec<SecurityEvent> {
        self.filter(|e| e.user_id.as_deref() == Some(user_id))
    }

    /// 按事件类型获取事件
    pub fn get_events_by_type(&self, event_type: &EventType) -> Vec<SecurityEvent> {
        self.filter(|e| &e.event_type == event_type)
    }

    /// 按严重程度获取事件
    pub fn get_events_by_severity(&self, severity: EventSeverity) -> Vec<SecurityEvent> {
        self.filter(|e| e.severity == severity)
    }

    /// 清空所有事件
    pub fn clear(&self) {
        if let Ok(mut events) = self.events.write() {
            events.clear();
        }
    }

    fn filter<F>(&self, predicate: F) -> Vec<SecurityEvent>
    where
        F: Fn(&SecurityEvent) -> bool,
    {
        self.events
            .read()
            .map(|events| events.iter().filter(|e| predicate(e)).cloned().collect())
            .unwrap_or_default()
    }
}

impl AuditLogger for InMemoryAuditLogger {
    fn log(&self, event: SecurityEvent) {
        if self.max_events == Some(0) {
            return;
        }
        if let Ok(mut events) = self.events.write() {
            if let Some(max) = self.max_events {
                while events.len() >= max {
                    events.pop_front();
                }
            }
            events.push_back(event);
        }
    }
}

/// 将事件转发到 `tracing` 的记录器
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAuditLogger;

impl AuditLogger for TracingAuditLogger {
    fn log(&self, event: SecurityEvent) {
        let user = event.user_id.as_deref().unwrap_or("-");
        let message = event.message.as_deref().unwrap_or("");
        match event.severity {
            EventSeverity::Debug => {
                tracing::debug!(target: "guidauth::audit", event = %event.event_type, user, message)
            }
            EventSeverity::Info => {
                tracing::info!(target: "guidauth::audit", event = %event.event_type, user, message)
            }
            EventSeverity::Warning => {
                tracing::warn!(target: "guidauth::audit", event = %event.event_type, user, message)
            }
            EventSeverity::Error => {
                tracing::error!(target: "guidauth::audit", event = %event.event_type, user, message)
            }
        }
    }
}
