//! Database repository layer
//!
//! The permission core talks to storage through two ports: [`PermissionStore`]
//! for application permission records and [`UserDirectory`] for the identity
//! collaborator. Postgres backs both in production; the in-memory versions back
//! tests and local runs without a database.

pub mod memory;
pub mod permission_repo;
pub mod user_repo;

use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    error::AppError,
    models::{
        user::{NewUser, Role, User, UserUpdate},
        Application, CapabilitySet, Permission,
    },
};

pub use memory::{InMemoryPermissionStore, InMemoryUserDirectory};
pub use permission_repo::PermissionRepository;
pub use user_repo::UserRepository;

/// Restricts a permission listing. Empty filter lists every record.
#[derive(Debug, Clone, Default)]
pub struct PermissionFilter {
    pub user_ids: Option<Vec<Uuid>>,
    pub application: Option<Application>,
}

/// Storage of application permission records.
///
/// Implementations must keep (user_id, application) unique and must refuse
/// to persist an empty capability set.
#[async_trait]
pub trait PermissionStore: Send + Sync {
    /// Looks up the record for one pair.
    async fn find(
        &self,
        user_id: Uuid,
        application: Application,
    ) -> Result<Option<Permission>, AppError>;

    /// Every record of one user, in canonical application order.
    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<Permission>, AppError>;

    async fn list(&self, filter: &PermissionFilter) -> Result<Vec<Permission>, AppError>;

    /// Creates the record or replaces its capability set.
    ///
    /// On update `granted_by` and `granted_at` keep their original values and
    /// `updated_at` is refreshed.
    async fn upsert(
        &self,
        user_id: Uuid,
        application: Application,
        capabilities: CapabilitySet,
        granted_by: Option<Uuid>,
    ) -> Result<Permission, AppError>;

    /// Returns whether a record was removed.
    async fn delete(&self, user_id: Uuid, application: Application) -> Result<bool, AppError>;

    /// Returns the number of records removed.
    async fn delete_by_user(&self, user_id: Uuid) -> Result<u64, AppError>;

    /// Connectivity check for readiness.
    async fn ping(&self) -> Result<(), AppError>;
}

/// Identity collaborator: accounts and their primary role.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AppError>;

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, AppError>;

    /// Users with the given ids; unknown ids are skipped.
    async fn find_many(&self, ids: &[Uuid]) -> Result<Vec<User>, AppError>;

    async fn ids_in_role(&self, role: Role) -> Result<Vec<Uuid>, AppError>;

    /// Every account, ordered by username.
    async fn list(&self) -> Result<Vec<User>, AppError>;

    /// Rejects a username already taken by another account.
    async fn create(&self, user: NewUser) -> Result<User, AppError>;

    /// Replaces the editable fields. `None` when the account does not exist.
    async fn update(&self, id: Uuid, update: UserUpdate) -> Result<Option<User>, AppError>;

    async fn set_active(&self, id: Uuid, is_active: bool) -> Result<Option<User>, AppError>;

    /// Returns whether an account was removed.
    async fn delete(&self, id: Uuid) -> Result<bool, AppError>;
}

pub(crate) fn empty_set_error(user_id: Uuid, application: Application) -> AppError {
    AppError::Internal(format!(
        "refusing to store empty capability set for user {} on {}",
        user_id, application
    ))
}
