//! Read-side composition of permission data into management views.
//!
//! Everything here is pure: no storage access and no business rules beyond
//! passing the filters through.

use crate::models::{
    matrix::{
        AccessibleApplication, AppPermissions, ApplicationColumn, ApplicationPermissionItem,
        CapabilitySnapshot, MatrixRowView, PermissionMatrix, PermissionMatrixView,
        UserPermissionsView,
    },
    Application, CapabilitySet, Permission, Role, User,
};

fn cell(application: Application, snapshot: CapabilitySnapshot) -> AppPermissions {
    let caps = snapshot.capabilities;
    AppPermissions {
        application_name: application,
        permission_id: snapshot.permission_id,
        can_view: caps.can_view(),
        can_create: caps.can_create(),
        can_edit: caps.can_edit(),
        can_delete: caps.can_delete(),
        has_any_permission: snapshot.permission_id.is_some() && !caps.is_empty(),
    }
}

fn column(application: Application) -> ApplicationColumn {
    ApplicationColumn {
        application_name: application,
        display_name: application.display_name(),
        icon: application.icon(),
    }
}

/// Dense grid: one cell per (row, column), missing cells default to no capability.
pub fn present_matrix(
    matrix: PermissionMatrix,
    role_filter: Option<Role>,
    application_filter: Option<Application>,
) -> PermissionMatrixView {
    let columns = matrix.applications;

    let users = matrix
        .rows
        .into_iter()
        .map(|row| MatrixRowView {
            permissions: columns
                .iter()
                .map(|&app| cell(app, row.permissions.get(&app).copied().unwrap_or_default()))
                .collect(),
            user_id: row.user_id,
            username: row.username,
            full_name: row.full_name,
            role: row.role,
            is_active: row.is_active,
        })
        .collect();

    PermissionMatrixView {
        applications: columns.into_iter().map(column).collect(),
        users,
        role_filter,
        application_filter,
    }
}

/// Edit form for one user: every application, with its stored flags.
pub fn present_user_permissions(user: User, permissions: &[Permission]) -> UserPermissionsView {
    let applications = Application::ALL
        .into_iter()
        .map(|app| {
            let stored = permissions.iter().find(|p| p.application == app);
            let caps = stored.map_or(CapabilitySet::empty(), |p| p.capabilities);
            ApplicationPermissionItem {
                id: stored.map(|p| p.id),
                application_name: app,
                display_name: app.display_name(),
                icon: app.icon(),
                can_view: caps.can_view(),
                can_create: caps.can_create(),
                can_edit: caps.can_edit(),
                can_delete: caps.can_delete(),
            }
        })
        .collect();

    UserPermissionsView {
        user_id: user.id,
        username: user.username,
        full_name: user.full_name,
        email: user.email.unwrap_or_default(),
        role: user.role,
        applications,
    }
}

/// Applications the caller can view. Admins see every application with full
/// capabilities.
pub fn present_accessible_applications(
    is_admin: bool,
    permissions: &[Permission],
) -> Vec<AccessibleApplication> {
    Application::ALL
        .into_iter()
        .filter_map(|app| {
            let caps = if is_admin {
                CapabilitySet::all()
            } else {
                permissions
                    .iter()
                    .find(|p| p.application == app)
                    .map(|p| p.capabilities)?
            };

            caps.can_view().then(|| AccessibleApplication {
                application_name: app,
                display_name: app.display_name(),
                icon: app.icon(),
                can_view: true,
                can_create: caps.can_create(),
                can_edit: caps.can_edit(),
                can_delete: caps.can_delete(),
            })
        })
        .collect()
}
