//! 账户相关的 HTTP 处理器：登录、登出、拒绝访问

use crate::{
    error::AppError,
    middleware::AppState,
    models::auth::LoginRequest,
};
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use std::sync::Arc;
use validator::Validate;

use super::AppJson;

/// 登录
pub async fn login(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    req.validate()?;

    let response = state.auth_service.login(req).await?;

    Ok(Json(response))
}

/// 登出
///
/// 访问令牌是无状态的，客户端丢弃即可
pub async fn logout() -> impl IntoResponse {
    Json(json!({"message": "Logged out"}))
}

/// 权限不足时的重定向目标
pub async fn access_denied() -> impl IntoResponse {
    (
        StatusCode::FORBIDDEN,
        Json(json!({
            "error": {
                "code": 403,
                "message": "You do not have permission to access this resource"
            }
        })),
    )
}
