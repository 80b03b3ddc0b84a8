//! 测试公共模块
//! 基于内存存储构建完整的应用，并提供请求辅助函数

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, HeaderMap, Method, Request, StatusCode},
    routing::get,
    Router,
};
use http_body_util::BodyExt;
use platform_portal::{
    config::{
        AppConfig, AuthzConfig, DatabaseConfig, LoggingConfig, SecurityConfig, SeedConfig,
        ServerConfig,
    },
    middleware::AppState,
    models::{user::NewUser, Role, User},
    repository::{
        InMemoryPermissionStore, InMemoryUserDirectory, PermissionStore, UserDirectory,
    },
    routes,
};
use secrecy::Secret;
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

/// 创建测试配置
pub fn create_test_config() -> AppConfig {
    AppConfig {
        server: ServerConfig {
            addr: "127.0.0.1:0".to_string(), // 使用随机端口
            graceful_shutdown_timeout_secs: 5,
        },
        database: DatabaseConfig {
            url: Secret::new("memory://".to_string()),
            max_connections: 5,
            min_connections: 1,
            acquire_timeout_secs: 5,
            idle_timeout_secs: 300,
            max_lifetime_secs: 1800,
        },
        logging: LoggingConfig {
            level: "debug".to_string(),
            format: "pretty".to_string(),
        },
        security: SecurityConfig {
            jwt_secret: Secret::new("test-secret-key-for-testing-only-min-32-chars".to_string()),
            access_token_exp_secs: 300, // 5分钟用于测试
            password_min_length: 8,
        },
        authz: AuthzConfig {
            access_denied_path: "/account/accessdenied".to_string(),
        },
        seed: SeedConfig {
            enabled: false,
            admin_password: Secret::new("Admin123!".to_string()),
            user_password: Secret::new("User123!".to_string()),
        },
    }
}

/// 测试应用：状态、内存存储以及一个管理员和一个普通用户
pub struct TestApp {
    pub state: Arc<AppState>,
    pub store: Arc<InMemoryPermissionStore>,
    pub users: Arc<InMemoryUserDirectory>,
    pub admin: User,
    pub user: User,
}

impl TestApp {
    pub async fn new() -> Self {
        let store = Arc::new(InMemoryPermissionStore::new());
        let users = Arc::new(InMemoryUserDirectory::new());
        let state = Arc::new(
            AppState::new(create_test_config(), store.clone(), users.clone())
                .expect("Failed to build app state"),
        );

        let admin = create_user(users.as_ref(), "admin", Role::Admin).await;
        let user = create_user(users.as_ref(), "mrossi", Role::User).await;

        Self {
            state,
            store,
            users,
            admin,
            user,
        }
    }

    /// 完整路由，包含模拟的业务应用路由
    pub fn router(&self) -> Router {
        routes::create_router_with_apps(self.state.clone(), demo_apps())
    }

    pub fn token_for(&self, user: &User) -> String {
        self.state
            .jwt_service
            .generate_access_token(&user.id, &user.username)
            .expect("Failed to issue token")
    }

    pub async fn add_user(&self, username: &str, role: Role) -> User {
        create_user(self.users.as_ref(), username, role).await
    }

    /// 发送请求并解析 JSON 响应（空响应体返回 Null）
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, HeaderMap, Value) {
        send(self.router(), request).await
    }
}

pub async fn create_user(users: &dyn UserDirectory, username: &str, role: Role) -> User {
    users
        .create(NewUser {
            username: username.to_string(),
            full_name: format!("{} test", username),
            email: Some(format!("{}@example.com", username)),
            password_hash: String::new(),
            role,
        })
        .await
        .expect("Failed to create test user")
}

/// 模拟业务应用的路由
pub fn demo_apps() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/kiosk",
            get(|| async { "kiosk list" }).post(|| async { (StatusCode::CREATED, "kiosk created") }),
        )
        .route(
            "/kiosk/{id}",
            get(|| async { "kiosk detail" })
                .put(|| async { "kiosk updated" })
                .delete(|| async { StatusCode::NO_CONTENT }),
        )
        .route("/bugs", get(|| async { "bug list" }))
        .route("/features", get(|| async { "feature list" }))
        .route("/developer", get(|| async { "dashboard" }))
        .route("/reports", get(|| async { "reports" }).post(|| async { "report queued" }))
}

/// 构造请求
pub fn request(method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }

    match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

pub async fn send(app: Router, request: Request<Body>) -> (StatusCode, HeaderMap, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| {
            Value::String(String::from_utf8_lossy(&bytes).into_owned())
        })
    };

    (status, headers, json)
}

/// 直接写入权限记录
pub async fn seed_permission(
    store: &dyn PermissionStore,
    user: &User,
    application: platform_portal::models::Application,
    capabilities: platform_portal::models::CapabilitySet,
) {
    store
        .upsert(user.id, application, capabilities, None)
        .await
        .expect("Failed to seed permission");
}
