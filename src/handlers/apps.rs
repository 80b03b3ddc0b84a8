//! 当前用户可访问的应用列表

use crate::{
    auth::AuthContext, error::AppError, middleware::AppState,
    services::matrix_presenter::present_accessible_applications,
};
use axum::{extract::State, response::IntoResponse, Json};
use std::sync::Arc;

/// 列出调用者可以查看的应用（管理员可见全部）
pub async fn list_accessible_applications(
    State(state): State<Arc<AppState>>,
    auth_context: AuthContext,
) -> Result<impl IntoResponse, AppError> {
    let user_id = auth_context.user_id().ok_or(AppError::Unauthorized)?;

    let is_admin = state.permission_service.is_admin(user_id).await?;
    let permissions = if is_admin {
        Vec::new()
    } else {
        state.permission_service.get_user_permissions(user_id).await?
    };

    Ok(Json(present_accessible_applications(is_admin, &permissions)))
}
