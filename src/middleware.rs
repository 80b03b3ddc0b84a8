//! HTTP 中间件
//! 应用状态与请求追踪

use axum::{
    extract::Request,
    http::{HeaderMap, HeaderValue},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use std::time::Instant;
use tracing::Instrument;
use uuid::Uuid;

use crate::{
    auth::JwtService,
    authz::RouteResolver,
    config::AppConfig,
    repository::{PermissionStore, UserDirectory},
    services::{AuthService, PermissionService},
};

/// 应用状态
///
/// 服务通过 Arc 共享，存储与用户目录以 trait 对象注入，
/// 测试时替换为内存实现
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub permission_store: Arc<dyn PermissionStore>,
    pub users: Arc<dyn UserDirectory>,
    pub permission_service: Arc<PermissionService>,
    pub auth_service: Arc<AuthService>,
    pub jwt_service: Arc<JwtService>,
    pub resolver: Arc<RouteResolver>,
}

impl AppState {
    /// 基于给定的存储构建全部服务
    pub fn new(
        config: AppConfig,
        permission_store: Arc<dyn PermissionStore>,
        users: Arc<dyn UserDirectory>,
    ) -> Result<Self, crate::error::AppError> {
        let config = Arc::new(config);
        let jwt_service = Arc::new(JwtService::from_config(&config)?);

        let permission_service = Arc::new(PermissionService::new(
            permission_store.clone(),
            users.clone(),
        ));
        let auth_service = Arc::new(AuthService::new(
            users.clone(),
            jwt_service.clone(),
            config.clone(),
        ));

        Ok(Self {
            config,
            permission_store,
            users,
            permission_service,
            auth_service,
            jwt_service,
            resolver: Arc::new(RouteResolver::default()),
        })
    }
}

/// 请求追踪中间件
/// 为每个请求生成 trace_id 和 request_id，并记录指标
pub async fn request_tracking_middleware(req: Request, next: Next) -> Response {
    // 生成或提取 trace_id/request_id
    let trace_id = extract_or_generate_trace_id(req.headers());
    let request_id = Uuid::new_v4().to_string();

    let method = req.method().clone();
    let uri = req.uri().to_string();

    // 创建 span
    let span = tracing::info_span!(
        "http_request",
        trace_id = %trace_id,
        request_id = %request_id,
        method = %method,
        uri = %uri,
    );

    async move {
        let start = Instant::now();

        // 继续处理请求
        let mut response = next.run(req).await;

        let elapsed = start.elapsed();

        // 记录指标 - 使用静态字符串
        let status = response.status().as_u16();
        let method_name = match method.as_str() {
            "GET" => "GET",
            "POST" => "POST",
            "PUT" => "PUT",
            "DELETE" => "DELETE",
            "PATCH" => "PATCH",
            _ => "OTHER",
        };
        let status_class = match status {
            200..=299 => "2xx",
            300..=399 => "3xx",
            400..=499 => "4xx",
            _ => "5xx",
        };

        metrics::counter!("http_requests_total", "method" => method_name, "status" => status_class)
            .increment(1);
        metrics::histogram!("http_request_duration_seconds").record(elapsed.as_secs_f64());

        tracing::info!(
            method = %method,
            uri = %uri,
            status = status,
            elapsed_ms = elapsed.as_millis(),
            "Request completed"
        );

        // 在响应头中添加 trace_id
        if let Ok(value) = HeaderValue::from_str(&trace_id) {
            response.headers_mut().insert("x-trace-id", value);
        }
        if let Ok(value) = HeaderValue::from_str(&request_id) {
            response.headers_mut().insert("x-request-id", value);
        }

        response
    }
    .instrument(span)
    .await
}

/// 从请求头中提取或生成 trace_id
fn extract_or_generate_trace_id(headers: &HeaderMap) -> String {
    headers
        .get("x-trace-id")
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.is_empty() && s.len() <= 128)
        .map(|s| s.to_string())
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}
