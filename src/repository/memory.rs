//! In-memory stores
//!
//! Same contracts as the Postgres repositories, kept in a `RwLock`. Used by the
//! test suite and by `PORTAL_DATABASE__URL=memory://` local runs.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{empty_set_error, PermissionFilter, PermissionStore, UserDirectory};
use crate::{
    error::AppError,
    models::{
        user::{NewUser, Role, User, UserUpdate},
        Application, CapabilitySet, Permission,
    },
};

#[derive(Default)]
struct PermissionTable {
    next_id: i64,
    // 以 (user_id, application) 为键，天然唯一
    records: HashMap<(Uuid, Application), Permission>,
}

#[derive(Default)]
pub struct InMemoryPermissionStore {
    table: RwLock<PermissionTable>,
}

impl InMemoryPermissionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    pub async fn len(&self) -> usize {
        self.table.read().await.records.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

fn sorted(mut permissions: Vec<Permission>) -> Vec<Permission> {
    permissions.sort_by_key(|p| (p.user_id, p.application));
    permissions
}

#[async_trait]
impl PermissionStore for InMemoryPermissionStore {
    async fn find(
        &self,
        user_id: Uuid,
        application: Application,
    ) -> Result<Option<Permission>, AppError> {
        let table = self.table.read().await;
        Ok(table.records.get(&(user_id, application)).cloned())
    }

    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<Permission>, AppError> {
        let table = self.table.read().await;
        Ok(sorted(
            table
                .records
                .values()
                .filter(|p| p.user_id == user_id)
                .cloned()
                .collect(),
        ))
    }

    async fn list(&self, filter: &PermissionFilter) -> Result<Vec<Permission>, AppError> {
        let table = self.table.read().await;
        Ok(sorted(
            table
                .records
                .values()
                .filter(|p| {
                    filter
                        .user_ids
                        .as_ref()
                        .map_or(true, |ids| ids.contains(&p.user_id))
                })
                .filter(|p| filter.application.map_or(true, |app| p.application == app))
                .cloned()
                .collect(),
        ))
    }

    async fn upsert(
        &self,
        user_id: Uuid,
        application: Application,
        capabilities: CapabilitySet,
        granted_by: Option<Uuid>,
    ) -> Result<Permission, AppError> {
        if capabilities.is_empty() {
            return Err(empty_set_error(user_id, application));
        }

        let mut table = self.table.write().await;
        let now = Utc::now();

        if let Some(existing) = table.records.get_mut(&(user_id, application)) {
            existing.capabilities = capabilities;
            existing.updated_at = now;
            return Ok(existing.clone());
        }

        table.next_id += 1;
        let permission = Permission {
            id: table.next_id,
            user_id,
            application,
            capabilities,
            granted_by,
            granted_at: now,
            updated_at: now,
        };
        table.records.insert((user_id, application), permission.clone());

        Ok(permission)
    }

    async fn delete(&self, user_id: Uuid, application: Application) -> Result<bool, AppError> {
        let mut table = self.table.write().await;
        Ok(table.records.remove(&(user_id, application)).is_some())
    }

    async fn delete_by_user(&self, user_id: Uuid) -> Result<u64, AppError> {
        let mut table = self.table.write().await;
        let before = table.records.len();
        table.records.retain(|(owner, _), _| *owner != user_id);
        Ok((before - table.records.len()) as u64)
    }

    async fn ping(&self) -> Result<(), AppError> {
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryUserDirectory {
    users: RwLock<HashMap<Uuid, User>>,
}

impl InMemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }
}

fn duplicate_username(username: &str) -> AppError {
    AppError::BadRequest(format!("Username already exists: {}", username))
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.username == username).cloned())
    }

    async fn find_many(&self, ids: &[Uuid]) -> Result<Vec<User>, AppError> {
        let users = self.users.read().await;
        let mut found: Vec<User> = ids.iter().filter_map(|id| users.get(id).cloned()).collect();
        found.sort_by(|a, b| a.username.cmp(&b.username));
        found.dedup_by_key(|u| u.id);
        Ok(found)
    }

    async fn ids_in_role(&self, role: Role) -> Result<Vec<Uuid>, AppError> {
        let users = self.users.read().await;
        Ok(users.values().filter(|u| u.role == role).map(|u| u.id).collect())
    }

    async fn list(&self) -> Result<Vec<User>, AppError> {
        let mut all: Vec<User> = self.users.read().await.values().cloned().collect();
        all.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(all)
    }

    async fn create(&self, user: NewUser) -> Result<User, AppError> {
        let mut users = self.users.write().await;
        if users.values().any(|u| u.username == user.username) {
            return Err(duplicate_username(&user.username));
        }

        let created = User {
            id: Uuid::new_v4(),
            username: user.username,
            full_name: user.full_name,
            email: user.email,
            password_hash: user.password_hash,
            is_active: true,
            role: user.role,
            created_at: Utc::now(),
            updated_at: None,
        };
        users.insert(created.id, created.clone());

        Ok(created)
    }

    async fn update(&self, id: Uuid, update: UserUpdate) -> Result<Option<User>, AppError> {
        let mut users = self.users.write().await;
        if users
            .values()
            .any(|u| u.id != id && u.username == update.username)
        {
            return Err(duplicate_username(&update.username));
        }

        let Some(user) = users.get_mut(&id) else {
            return Ok(None);
        };
        user.username = update.username;
        user.full_name = update.full_name;
        user.email = update.email;
        user.role = update.role;
        user.is_active = update.is_active;
        if let Some(hash) = update.password_hash {
            user.password_hash = hash;
        }
        user.updated_at = Some(Utc::now());

        Ok(Some(user.clone()))
    }

    async fn set_active(&self, id: Uuid, is_active: bool) -> Result<Option<User>, AppError> {
        let mut users = self.users.write().await;
        Ok(users.get_mut(&id).map(|user| {
            user.is_active = is_active;
            user.updated_at = Some(Utc::now());
            user.clone()
        }))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, AppError> {
        Ok(self.users.write().await.remove(&id).is_some())
    }
}
