//! 路由注册
//! 创建所有路由并应用中间件

use axum::{
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};

use crate::{auth, authz, handlers, middleware::AppState};

/// 请求体上限（1 MiB）
const BODY_LIMIT_BYTES: usize = 1024 * 1024;

/// 创建应用路由（不挂载业务应用）
pub fn create_router(state: Arc<AppState>) -> Router {
    create_router_with_apps(state, Router::new())
}

/// 创建应用路由，并挂载由各业务应用提供的路由
///
/// `apps` 中的路由受能力检查保护（/kiosk、/bugs、/features、/developer）
pub fn create_router_with_apps(state: Arc<AppState>, apps: Router<Arc<AppState>>) -> Router {
    // 公开端点（健康检查、账户）
    let public_routes = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/ready", get(handlers::health::readiness_check))
        .route("/account/login", post(handlers::account::login))
        .route("/account/logout", post(handlers::account::logout))
        .route("/account/accessdenied", get(handlers::account::access_denied));

    // 需要认证的路由
    let authenticated_routes =
        Router::new().route("/apps", get(handlers::apps::list_accessible_applications));

    // 权限与用户管理（仅管理员）
    let admin_routes = Router::new()
        .route("/permissions", get(handlers::permissions::permission_matrix))
        .route(
            "/permissions/users/{user_id}",
            get(handlers::permissions::get_user_permissions)
                .put(handlers::permissions::save_user_permissions),
        )
        .route("/permissions/toggle", post(handlers::permissions::toggle_permission))
        .route(
            "/permissions/delete-all",
            post(handlers::permissions::delete_all_permissions),
        )
        .route(
            "/admin/users",
            get(handlers::users::list_users).post(handlers::users::create_user),
        )
        .route(
            "/admin/users/{id}",
            get(handlers::users::get_user)
                .put(handlers::users::update_user)
                .delete(handlers::users::delete_user),
        )
        .route(
            "/admin/users/{id}/toggle-status",
            post(handlers::users::toggle_user_status),
        )
        .route_layer(from_fn_with_state(
            state.clone(),
            authz::require_admin_middleware,
        ));

    // 组合所有路由；越靠后的 layer 越先执行
    Router::new()
        .merge(public_routes)
        .merge(authenticated_routes)
        .merge(admin_routes)
        .merge(apps)
        .layer(from_fn_with_state(state.clone(), authz::permission_middleware))
        .layer(from_fn_with_state(
            state.jwt_service.clone(),
            auth::optional_auth_middleware,
        ))
        .layer(RequestBodyLimitLayer::new(BODY_LIMIT_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(from_fn(crate::middleware::request_tracking_middleware))
        .with_state(state)
}
