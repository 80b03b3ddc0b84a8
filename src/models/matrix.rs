//! Permission matrix rows and the views built from them

use serde::Serialize;
use std::collections::BTreeMap;
use uuid::Uuid;

use super::{application::Application, capability::CapabilitySet, user::Role};

/// Stored state of one (user, application) cell.
///
/// `permission_id` is `None` when no record exists; the set is then empty.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CapabilitySnapshot {
    pub permission_id: Option<i64>,
    pub capabilities: CapabilitySet,
}

/// One user of the matrix query result
#[derive(Debug, Clone)]
pub struct UserPermissionRow {
    pub user_id: Uuid,
    pub username: String,
    pub full_name: String,
    pub role: Role,
    pub is_active: bool,
    pub permissions: BTreeMap<Application, CapabilitySnapshot>,
}

/// Result of a matrix query: rows plus the applications used as columns
#[derive(Debug, Clone)]
pub struct PermissionMatrix {
    pub rows: Vec<UserPermissionRow>,
    pub applications: Vec<Application>,
}

/// Column header
#[derive(Debug, Serialize)]
pub struct ApplicationColumn {
    pub application_name: Application,
    pub display_name: &'static str,
    pub icon: &'static str,
}

/// A grid cell
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct AppPermissions {
    pub application_name: Application,
    pub permission_id: Option<i64>,
    pub can_view: bool,
    pub can_create: bool,
    pub can_edit: bool,
    pub can_delete: bool,
    pub has_any_permission: bool,
}

/// A grid row; `permissions` follows the column order
#[derive(Debug, Serialize)]
pub struct MatrixRowView {
    pub user_id: Uuid,
    pub username: String,
    pub full_name: String,
    pub role: Role,
    pub is_active: bool,
    pub permissions: Vec<AppPermissions>,
}

/// Dense matrix for the management UI
#[derive(Debug, Serialize)]
pub struct PermissionMatrixView {
    pub applications: Vec<ApplicationColumn>,
    pub users: Vec<MatrixRowView>,
    pub role_filter: Option<Role>,
    pub application_filter: Option<Application>,
}

/// One application on the per-user edit form
#[derive(Debug, Serialize)]
pub struct ApplicationPermissionItem {
    pub id: Option<i64>,
    pub application_name: Application,
    pub display_name: &'static str,
    pub icon: &'static str,
    pub can_view: bool,
    pub can_create: bool,
    pub can_edit: bool,
    pub can_delete: bool,
}

/// Per-user edit form
#[derive(Debug, Serialize)]
pub struct UserPermissionsView {
    pub user_id: Uuid,
    pub username: String,
    pub full_name: String,
    pub email: String,
    pub role: Role,
    pub applications: Vec<ApplicationPermissionItem>,
}

/// An application the caller may open
#[derive(Debug, Serialize)]
pub struct AccessibleApplication {
    pub application_name: Application,
    pub display_name: &'static str,
    pub icon: &'static str,
    pub can_view: bool,
    pub can_create: bool,
    pub can_edit: bool,
    pub can_delete: bool,
}
