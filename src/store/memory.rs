//! 内存存储实现

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

use super::{Session, SessionStore, User};
use crate::error::{Error, Result, StorageError};

/// 内存用户/Session 存储
///
/// 用于开发和测试，生产环境应接入带唯一索引和条件更新的持久化存储
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    users: RwLock<HashMap<String, User>>,
}

impl InMemorySessionStore {
    /// 创建新的内存存储
    pub fn new() -> Self {
        Self::default()
    }

    /// 用户总数
    pub fn count(&self) -> Result<usize> {
        let users = self.users.read().map_err(|_| lock_poisoned())?;
        Ok(users.len())
    }
}

fn lock_poisoned() -> Error {
    Error::Storage(StorageError::OperationFailed("lock poisoned".into()))
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get_by_guid(&self, guid: &str) -> Result<User> {
        let users = self.users.read().map_err(|_| lock_poisoned())?;
        users
            .get(guid)
            .cloned()
            .ok_or_else(|| Error::Storage(StorageError::NotFound(format!("user {}", guid))))
    }

    async fn create(&self, user: User) -> Result<()> {
        let mut users = self.users.write().map_err(|_| lock_poisoned())?;

        if users.contains_key(&user.guid) {
            return Err(Error::Storage(StorageError::AlreadyExists(format!(
                "user {}",
                user.guid
            ))));
        }

        users.insert(user.guid.clone(), user);
        Ok(())
    }

    async fn set_session(
        &self,
        guid: &str,
        session: Session,
        expected_version: u64,
    ) -> Result<u64> {
        let mut users = self.users.write().map_err(|_| lock_poisoned())?;

        let user = users
            .get_mut(guid)
            .ok_or_else(|| Error::Storage(StorageError::NotFound(format!("user {}", guid))))?;

        if user.session_version != expected_version {
            return Err(Error::Storage(StorageError::Conflict(format!(
                "user {}: expected session version {}, found {}",
                guid, expected_version, user.session_version
            ))));
        }

        user.session = session;
        user.session_version += 1;
        Ok(user.session_version)
    }
}
