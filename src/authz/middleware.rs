//! 授权中间件
//!
//! permission_middleware: 按路由和 HTTP 方法做能力检查，拒绝时重定向
//! require_admin_middleware: 管理区域的粗粒度角色检查

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use std::sync::Arc;

use super::rules::{authorize, Outcome, RequestFacts};
use crate::{auth::AuthContext, error::AppError, middleware::AppState};

/// 能力检查中间件（每个请求执行一次）
pub async fn permission_middleware(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Response {
    let facts = RequestFacts::new(
        &state.resolver,
        req.uri().path(),
        req.method().clone(),
        req.extensions().get::<AuthContext>().cloned(),
    );

    // 存储故障直接失败，不放行
    let outcome = match authorize(&facts, &state.resolver, &state.permission_service).await {
        Ok(outcome) => outcome,
        Err(e) => return e.into_response(),
    };

    match outcome {
        Outcome::Denied {
            user_id,
            application,
            capability,
        } => {
            tracing::warn!(
                user_id = %user_id,
                username = facts.identity.as_ref().map(|i| i.username.as_str()).unwrap_or(""),
                application = %application,
                capability = %capability,
                method = %facts.method,
                path = %facts.path,
                "Access denied"
            );
            metrics::counter!("authz_denied_total", "application" => application.as_str())
                .increment(1);

            Redirect::to(&state.config.authz.access_denied_path).into_response()
        }
        Outcome::Granted {
            user_id,
            application,
            capability,
        } => {
            tracing::debug!(
                user_id = %user_id,
                application = %application,
                capability = %capability,
                "Access granted"
            );
            next.run(req).await
        }
        Outcome::PassThrough(rule) => {
            tracing::trace!(rule = ?rule, path = %facts.path, "Not gated");
            next.run(req).await
        }
    }
}

/// 管理员角色检查：未认证 401，非管理员 403
pub async fn require_admin_middleware(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let identity = req
        .extensions()
        .get::<AuthContext>()
        .ok_or(AppError::Unauthorized)?;

    let Some(user_id) = identity.user_id() else {
        return Err(AppError::Forbidden);
    };

    if !state.permission_service.is_admin(user_id).await? {
        tracing::warn!(
            user_id = %user_id,
            username = %identity.username,
            path = %req.uri().path(),
            "Admin area access denied"
        );
        return Err(AppError::Forbidden);
    }

    Ok(next.run(req).await)
}
