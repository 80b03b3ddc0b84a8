//! HTTP 处理器

pub mod account;
pub mod apps;
pub mod health;
pub mod permissions;
pub mod users;

use crate::{auth::AuthContext, error::AppError};
use axum::{
    extract::{rejection::JsonRejection, FromRequest, Request},
    Json,
};
use uuid::Uuid;

/// JSON 请求体提取器
///
/// 请求体缺失或格式错误时返回统一的 400 错误响应，而不是 axum 默认的纯文本
pub struct AppJson<T>(pub T);

impl<S, T> FromRequest<S> for AppJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(AppJson(value))
    }
}

/// 当前操作者的用户 ID
pub(crate) fn acting_user(auth_context: &AuthContext) -> Result<Uuid, AppError> {
    auth_context.user_id().ok_or(AppError::Forbidden)
}
