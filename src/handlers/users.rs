//! 用户管理的 HTTP 处理器（仅管理员）

use crate::{
    auth::{password::PasswordHasher, AuthContext},
    error::AppError,
    middleware::AppState,
    models::user::{CreateUserRequest, NewUser, Role, UpdateUserRequest, UserResponse, UserUpdate},
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use super::{acting_user, AppJson};

/// 列出用户
pub async fn list_users(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, AppError> {
    let users: Vec<UserResponse> = state
        .users
        .list()
        .await?
        .into_iter()
        .map(UserResponse::from)
        .collect();

    Ok(Json(json!({
        "count": users.len(),
        "users": users
    })))
}

/// 创建用户
pub async fn create_user(
    State(state): State<Arc<AppState>>,
    auth_context: AuthContext,
    AppJson(req): AppJson<CreateUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    req.validate()?;
    let role = req.role.parse::<Role>()?;

    // 验证密码策略
    PasswordHasher::validate_password_policy(&req.password, &state.config)?;
    let password_hash = PasswordHasher::new().hash(&req.password)?;

    let mut user = state
        .users
        .create(NewUser {
            username: req.username,
            full_name: req.full_name,
            email: req.email,
            password_hash,
            role,
        })
        .await?;

    // 创建时总是启用，按请求再停用
    if !req.is_active {
        user = state
            .users
            .set_active(user.id, false)
            .await?
            .ok_or_else(|| AppError::not_found("user"))?;
    }

    tracing::info!(
        user_id = %user.id,
        username = %user.username,
        created_by = %auth_context.username,
        "User created"
    );

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "User created",
            "user": UserResponse::from(user)
        })),
    ))
}

/// 获取用户详情
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let user = state
        .users
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::not_found("user"))?;

    Ok(Json(UserResponse::from(user)))
}

/// 更新用户
pub async fn update_user(
    State(state): State<Arc<AppState>>,
    auth_context: AuthContext,
    Path(id): Path<Uuid>,
    AppJson(req): AppJson<UpdateUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    req.validate()?;
    let role = req.role.parse::<Role>()?;

    // 提供了新密码时才重新哈希
    let password_hash = match req.password.as_deref().filter(|p| !p.is_empty()) {
        Some(password) => {
            PasswordHasher::validate_password_policy(password, &state.config)?;
            Some(PasswordHasher::new().hash(password)?)
        }
        None => None,
    };

    let user = state
        .users
        .update(
            id,
            UserUpdate {
                username: req.username,
                full_name: req.full_name,
                email: req.email,
                role,
                is_active: req.is_active,
                password_hash,
            },
        )
        .await?
        .ok_or_else(|| AppError::not_found("user"))?;

    tracing::info!(
        user_id = %user.id,
        username = %user.username,
        updated_by = %auth_context.username,
        "User updated"
    );

    Ok(Json(json!({
        "message": "User updated",
        "user": UserResponse::from(user)
    })))
}

/// 删除用户
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    auth_context: AuthContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    // 不允许删除自己
    if id == acting_user(&auth_context)? {
        return Err(AppError::BadRequest(
            "You cannot delete your own account".to_string(),
        ));
    }

    let user = state
        .users
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::not_found("user"))?;

    // 内存存储没有外键级联，先清理权限记录
    state.permission_service.delete_all_permissions(id).await?;
    state.users.delete(id).await?;

    tracing::info!(
        user_id = %id,
        username = %user.username,
        deleted_by = %auth_context.username,
        "User deleted"
    );

    Ok(Json(json!({
        "message": "User deleted"
    })))
}

/// 启用/停用用户
pub async fn toggle_user_status(
    State(state): State<Arc<AppState>>,
    auth_context: AuthContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let current = state
        .users
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::not_found("user"))?;

    let user = state
        .users
        .set_active(id, !current.is_active)
        .await?
        .ok_or_else(|| AppError::not_found("user"))?;

    tracing::info!(
        user_id = %user.id,
        is_active = user.is_active,
        changed_by = %auth_context.username,
        "User status changed"
    );

    Ok(Json(json!({
        "success": true,
        "is_active": user.is_active
    })))
}
