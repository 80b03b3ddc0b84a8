//! 权限管理的 HTTP 处理器（仅管理员）

use crate::{
    auth::AuthContext,
    error::AppError,
    middleware::AppState,
    models::{
        permission::{
            DeletePermissionsRequest, PermissionMatrixQuery, SavePermissionsRequest,
            TogglePermissionRequest, TogglePermissionResponse,
        },
        Application, Capability, CapabilitySet, Role,
    },
    services::matrix_presenter::{present_matrix, present_user_permissions},
};
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use serde_json::json;
use std::{collections::BTreeMap, sync::Arc};
use uuid::Uuid;
use validator::Validate;

use super::{acting_user, AppJson};

/// 空字符串视为未设置过滤条件
fn parse_filter<T>(value: Option<&str>) -> Result<Option<T>, AppError>
where
    T: std::str::FromStr<Err = AppError>,
{
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(raw) => raw.parse().map(Some),
    }
}

/// 权限矩阵
pub async fn permission_matrix(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PermissionMatrixQuery>,
) -> Result<impl IntoResponse, AppError> {
    let role_filter = parse_filter::<Role>(query.role_filter.as_deref())?;
    let application_filter = parse_filter::<Application>(query.application_filter.as_deref())?;

    let matrix = state
        .permission_service
        .get_permission_matrix(role_filter, application_filter)
        .await?;

    Ok(Json(present_matrix(matrix, role_filter, application_filter)))
}

/// 单个用户的权限编辑视图
pub async fn get_user_permissions(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let user = state
        .users
        .find_by_id(user_id)
        .await?
        .ok_or_else(|| AppError::not_found("user"))?;

    let permissions = state.permission_service.get_user_permissions(user_id).await?;

    Ok(Json(present_user_permissions(user, &permissions)))
}

/// 批量保存用户权限
pub async fn save_user_permissions(
    State(state): State<Arc<AppState>>,
    auth_context: AuthContext,
    Path(user_id): Path<Uuid>,
    AppJson(req): AppJson<SavePermissionsRequest>,
) -> Result<impl IntoResponse, AppError> {
    req.validate()?;
    let granted_by = acting_user(&auth_context)?;

    // 先校验全部应用名，再写入存储
    let mut permissions: BTreeMap<Application, CapabilitySet> = BTreeMap::new();
    for dto in &req.applications {
        let application = dto.application_name.parse::<Application>()?;
        permissions.insert(application, dto.capabilities());
    }

    if state.users.find_by_id(user_id).await?.is_none() {
        return Err(AppError::not_found("user"));
    }

    state
        .permission_service
        .save_permissions(user_id, &permissions, granted_by)
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "Permissions saved"
    })))
}

/// 切换单项能力
pub async fn toggle_permission(
    State(state): State<Arc<AppState>>,
    auth_context: AuthContext,
    AppJson(req): AppJson<TogglePermissionRequest>,
) -> Result<impl IntoResponse, AppError> {
    req.validate()?;
    let acting = acting_user(&auth_context)?;

    let application = req.application_name.parse::<Application>()?;
    let capability = req.permission_type.parse::<Capability>()?;

    let new_value = state
        .permission_service
        .toggle(req.user_id, application, capability, acting)
        .await?;

    Ok(Json(TogglePermissionResponse {
        success: true,
        new_value,
    }))
}

/// 删除用户的全部权限
pub async fn delete_all_permissions(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<DeletePermissionsRequest>,
) -> Result<impl IntoResponse, AppError> {
    let removed = state
        .permission_service
        .delete_all_permissions(req.user_id)
        .await?;

    Ok(Json(json!({
        "success": true,
        "removed": removed
    })))
}
