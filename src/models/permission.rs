//! Application permission domain models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::{application::Application, capability::Capability, capability::CapabilitySet};

/// Capabilities one user holds on one application.
///
/// At most one exists per (user_id, application). A stored record always has a
/// non-empty capability set; clearing the last bit deletes the record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Permission {
    pub id: i64,
    pub user_id: Uuid,
    pub application: Application,
    pub capabilities: CapabilitySet,
    pub granted_by: Option<Uuid>,
    pub granted_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Permission {
    pub fn allows(&self, capability: Capability) -> bool {
        self.capabilities.allows(capability)
    }
}

/// One application row of a batch save
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PermissionDto {
    pub application_name: String,
    #[serde(default)]
    pub can_view: bool,
    #[serde(default)]
    pub can_create: bool,
    #[serde(default)]
    pub can_edit: bool,
    #[serde(default)]
    pub can_delete: bool,
}

impl PermissionDto {
    pub fn capabilities(&self) -> CapabilitySet {
        CapabilitySet::from_flags(self.can_view, self.can_create, self.can_edit, self.can_delete)
    }
}

/// Save permissions request (full replace per listed application)
#[derive(Debug, Deserialize, Validate)]
pub struct SavePermissionsRequest {
    #[validate(length(min = 1, message = "at least one application is required"))]
    pub applications: Vec<PermissionDto>,
}

/// Toggle a single capability
#[derive(Debug, Deserialize, Validate)]
pub struct TogglePermissionRequest {
    pub user_id: Uuid,
    #[validate(length(min = 1, max = 100))]
    pub application_name: String,
    #[validate(length(min = 1, max = 20))]
    pub permission_type: String,
}

/// Toggle response
#[derive(Debug, Serialize)]
pub struct TogglePermissionResponse {
    pub success: bool,
    pub new_value: bool,
}

/// Delete every permission of one user
#[derive(Debug, Deserialize)]
pub struct DeletePermissionsRequest {
    pub user_id: Uuid,
}

/// Matrix query string
#[derive(Debug, Default, Deserialize)]
pub struct PermissionMatrixQuery {
    pub role_filter: Option<String>,
    pub application_filter: Option<String>,
}
