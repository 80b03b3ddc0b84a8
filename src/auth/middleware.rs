//! JWT 认证中间件
//!
//! 只负责识别身份，不做授权判断；授权由 `authz` 模块完成

use crate::{auth::jwt::JwtService, error::AppError};
use axum::{
    extract::{FromRequestParts, Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use uuid::Uuid;

/// 认证上下文（附加到请求扩展）
#[derive(Debug, Clone)]
pub struct AuthContext {
    /// 令牌中的 subject，正常情况下是用户 ID
    pub subject: String,
    pub username: String,
}

impl AuthContext {
    /// 用户 ID；subject 不是合法 UUID 时返回 None
    pub fn user_id(&self) -> Option<Uuid> {
        Uuid::parse_str(&self.subject).ok()
    }
}

// 实现 FromRequestParts 以便在 handler 中直接提取 AuthContext
impl<S> FromRequestParts<S> for AuthContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthContext>()
            .cloned()
            .ok_or(AppError::Unauthorized)
    }
}

/// 从 Authorization 头提取令牌
pub fn extract_token(headers: &HeaderMap) -> Result<String, AppError> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
        .ok_or(AppError::Unauthorized)
}

/// 可选认证 - 不强制要求令牌
///
/// 令牌有效时附加 AuthContext，否则请求按匿名继续
pub async fn optional_auth_middleware(
    State(jwt_service): State<Arc<JwtService>>,
    mut req: Request,
    next: Next,
) -> Response {
    if let Ok(token) = extract_token(req.headers()) {
        match jwt_service.validate_access_token(&token) {
            Ok(claims) => {
                req.extensions_mut().insert(AuthContext {
                    subject: claims.sub,
                    username: claims.username,
                });
            }
            Err(_) => {
                tracing::debug!(path = %req.uri().path(), "Ignoring invalid bearer token");
            }
        }
    }

    next.run(req).await
}
