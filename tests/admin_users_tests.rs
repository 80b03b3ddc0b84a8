//! 用户管理 API 集成测试

use axum::http::{Method, StatusCode};
use platform_portal::{
    models::{Application, CapabilitySet},
    repository::{PermissionStore, UserDirectory},
};
use serde_json::{json, Value};
use uuid::Uuid;

mod common;
use common::{request, seed_permission, TestApp};

fn new_account(username: &str) -> Value {
    json!({
        "username": username,
        "full_name": "Giulia Verdi",
        "email": format!("{}@example.com", username),
        "password": "Passw0rd!",
        "role": "User"
    })
}

async fn login(app: &TestApp, username: &str, password: &str) -> StatusCode {
    let (status, _, _) = app
        .send(request(
            Method::POST,
            "/account/login",
            None,
            Some(json!({ "username": username, "password": password })),
        ))
        .await;
    status
}

#[tokio::test]
async fn test_user_management_requires_admin() {
    let app = TestApp::new().await;

    let (status, _, _) = app.send(request(Method::GET, "/admin/users", None, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let token = app.token_for(&app.user);
    let (status, _, _) = app
        .send(request(Method::GET, "/admin/users", Some(&token), None))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _, _) = app
        .send(request(
            Method::POST,
            "/admin/users",
            Some(&token),
            Some(new_account("gverdi")),
        ))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(app.users.find_by_username("gverdi").await.unwrap().is_none());
}

#[tokio::test]
async fn test_create_and_list_users() {
    let app = TestApp::new().await;
    let token = app.token_for(&app.admin);

    let (status, _, body) = app
        .send(request(
            Method::POST,
            "/admin/users",
            Some(&token),
            Some(new_account("gverdi")),
        ))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["user"]["username"], "gverdi");
    assert_eq!(body["user"]["role"], "User");
    assert_eq!(body["user"]["is_active"], true);
    assert!(body["user"].get("password_hash").is_none());

    let (status, _, body) = app
        .send(request(Method::GET, "/admin/users", Some(&token), None))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 3);
    let names: Vec<&str> = body["users"]
        .as_array()
        .unwrap()
        .iter()
        .map(|u| u["username"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["admin", "gverdi", "mrossi"]);

    // 新账户可以直接登录
    assert_eq!(login(&app, "gverdi", "Passw0rd!").await, StatusCode::OK);
}

#[tokio::test]
async fn test_create_user_rejects_invalid_input() {
    let app = TestApp::new().await;
    let token = app.token_for(&app.admin);

    let duplicate = new_account(&app.user.username);
    let mut weak_password = new_account("weak");
    weak_password["password"] = json!("password");
    let mut unknown_role = new_account("auditor");
    unknown_role["role"] = json!("Auditor");
    let mut bad_email = new_account("noemail");
    bad_email["email"] = json!("not-an-email");

    for body in [duplicate, weak_password, unknown_role, bad_email] {
        let (status, _, response) = app
            .send(request(Method::POST, "/admin/users", Some(&token), Some(body)))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(response["error"]["code"], 400);
    }

    // 缺少必填字段同样返回 JSON 错误
    let (status, _, response) = app
        .send(request(
            Method::POST,
            "/admin/users",
            Some(&token),
            Some(json!({ "username": "incomplete" })),
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(response["error"]["code"], 400);

    assert_eq!(app.users.list().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_update_user() {
    let app = TestApp::new().await;
    let token = app.token_for(&app.admin);

    let (_, _, created) = app
        .send(request(
            Method::POST,
            "/admin/users",
            Some(&token),
            Some(new_account("gverdi")),
        ))
        .await;
    let id = created["user"]["id"].as_str().unwrap().to_string();

    let (status, _, body) = app
        .send(request(
            Method::PUT,
            &format!("/admin/users/{}", id),
            Some(&token),
            Some(json!({
                "username": "gverdi",
                "full_name": "Giulia Verdi Neri",
                "email": "giulia@example.com",
                "password": "N3wSecret!",
                "role": "admin",
                "is_active": true
            })),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["full_name"], "Giulia Verdi Neri");
    assert_eq!(body["user"]["role"], "Admin");
    assert!(body["user"]["updated_at"].is_string());

    assert_eq!(login(&app, "gverdi", "Passw0rd!").await, StatusCode::UNAUTHORIZED);
    assert_eq!(login(&app, "gverdi", "N3wSecret!").await, StatusCode::OK);

    // 不提供密码时保留原密码
    let (status, _, _) = app
        .send(request(
            Method::PUT,
            &format!("/admin/users/{}", id),
            Some(&token),
            Some(json!({
                "username": "gverdi",
                "full_name": "Giulia Verdi",
                "role": "User"
            })),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(login(&app, "gverdi", "N3wSecret!").await, StatusCode::OK);

    let (status, _, body) = app
        .send(request(Method::GET, &format!("/admin/users/{}", id), Some(&token), None))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["role"], "User");
    assert_eq!(body["email"], Value::Null);

    let (status, _, _) = app
        .send(request(
            Method::PUT,
            &format!("/admin/users/{}", Uuid::new_v4()),
            Some(&token),
            Some(json!({ "username": "ghost", "full_name": "Ghost", "role": "User" })),
        ))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_toggle_user_status_blocks_login() {
    let app = TestApp::new().await;
    let token = app.token_for(&app.admin);

    let (_, _, created) = app
        .send(request(
            Method::POST,
            "/admin/users",
            Some(&token),
            Some(new_account("gverdi")),
        ))
        .await;
    let id = created["user"]["id"].as_str().unwrap().to_string();
    let uri = format!("/admin/users/{}/toggle-status", id);

    let (status, _, body) = app.send(request(Method::POST, &uri, Some(&token), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_active"], false);
    assert_eq!(login(&app, "gverdi", "Passw0rd!").await, StatusCode::UNAUTHORIZED);

    let (_, _, body) = app.send(request(Method::POST, &uri, Some(&token), None)).await;
    assert_eq!(body["is_active"], true);
    assert_eq!(login(&app, "gverdi", "Passw0rd!").await, StatusCode::OK);

    let (status, _, _) = app
        .send(request(
            Method::POST,
            &format!("/admin/users/{}/toggle-status", Uuid::new_v4()),
            Some(&token),
            None,
        ))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_user_removes_permissions() {
    let app = TestApp::new().await;
    for application in [Application::KioskRegistration, Application::BugTracking] {
        seed_permission(app.store.as_ref(), &app.user, application, CapabilitySet::VIEW).await;
    }
    let token = app.token_for(&app.admin);

    let (status, _, _) = app
        .send(request(
            Method::DELETE,
            &format!("/admin/users/{}", app.user.id),
            Some(&token),
            None,
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(app.users.find_by_id(app.user.id).await.unwrap().is_none());
    assert!(app.store.list_by_user(app.user.id).await.unwrap().is_empty());

    let (status, _, _) = app
        .send(request(
            Method::GET,
            &format!("/admin/users/{}", app.user.id),
            Some(&token),
            None,
        ))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_admin_cannot_delete_own_account() {
    let app = TestApp::new().await;
    let token = app.token_for(&app.admin);

    let (status, _, body) = app
        .send(request(
            Method::DELETE,
            &format!("/admin/users/{}", app.admin.id),
            Some(&token),
            None,
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["message"], "You cannot delete your own account");
    assert!(app.users.find_by_id(app.admin.id).await.unwrap().is_some());

    let (status, _, _) = app
        .send(request(
            Method::DELETE,
            &format!("/admin/users/{}", Uuid::new_v4()),
            Some(&token),
            None,
        ))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
