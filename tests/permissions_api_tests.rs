//! 权限管理 API 集成测试

use axum::http::{Method, StatusCode};
use platform_portal::{
    models::{Application, CapabilitySet, Role},
    repository::PermissionStore,
};
use serde_json::json;

mod common;
use common::{request, seed_permission, TestApp};

#[tokio::test]
async fn test_management_requires_admin() {
    let app = TestApp::new().await;

    let (status, _, _) = app.send(request(Method::GET, "/permissions", None, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let token = app.token_for(&app.user);
    let (status, _, body) = app
        .send(request(Method::GET, "/permissions", Some(&token), None))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], 403);

    let (status, _, _) = app
        .send(request(
            Method::POST,
            "/permissions/delete-all",
            Some(&token),
            Some(json!({ "user_id": app.user.id })),
        ))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_matrix_is_dense() {
    let app = TestApp::new().await;
    seed_permission(
        app.store.as_ref(),
        &app.user,
        Application::FeatureRequest,
        CapabilitySet::VIEW | CapabilitySet::CREATE,
    )
    .await;
    let token = app.token_for(&app.admin);

    let (status, _, body) = app
        .send(request(Method::GET, "/permissions", Some(&token), None))
        .await;
    assert_eq!(status, StatusCode::OK);

    let columns = body["applications"].as_array().unwrap();
    let names: Vec<&str> = columns
        .iter()
        .map(|c| c["application_name"].as_str().unwrap())
        .collect();
    assert_eq!(
        names,
        ["KioskRegistration", "BugTracking", "FeatureRequest", "DeveloperDashboard"]
    );

    // 只有拥有记录的用户出现在矩阵中
    let users = body["users"].as_array().unwrap();
    assert_eq!(users.len(), 1);
    assert_eq!(users[0]["username"], "mrossi");

    let cells = users[0]["permissions"].as_array().unwrap();
    assert_eq!(cells.len(), 4);
    assert_eq!(cells[0]["has_any_permission"], false);
    assert_eq!(cells[0]["can_view"], false);
    assert_eq!(cells[2]["can_view"], true);
    assert_eq!(cells[2]["can_create"], true);
    assert_eq!(cells[2]["can_edit"], false);
    assert_eq!(cells[2]["has_any_permission"], true);
}

#[tokio::test]
async fn test_matrix_filters() {
    let app = TestApp::new().await;
    // 管理员自己也有记录，但会被 role_filter=User 排除
    seed_permission(app.store.as_ref(), &app.admin, Application::BugTracking, CapabilitySet::all())
        .await;
    seed_permission(app.store.as_ref(), &app.user, Application::KioskRegistration, CapabilitySet::VIEW)
        .await;
    let token = app.token_for(&app.admin);

    let (status, _, body) = app
        .send(request(Method::GET, "/permissions?role_filter=User", Some(&token), None))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["role_filter"], "User");
    let users = body["users"].as_array().unwrap();
    assert_eq!(users.len(), 1);
    assert_eq!(users[0]["role"], "User");

    let (status, _, body) = app
        .send(request(
            Method::GET,
            "/permissions?application_filter=BugTracking",
            Some(&token),
            None,
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["applications"].as_array().unwrap().len(), 1);
    let users = body["users"].as_array().unwrap();
    assert_eq!(users.len(), 1);
    assert_eq!(users[0]["username"], "admin");
    assert_eq!(users[0]["permissions"].as_array().unwrap().len(), 1);

    // 空过滤条件等同于未设置
    let (status, _, body) = app
        .send(request(Method::GET, "/permissions?role_filter=", Some(&token), None))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["users"].as_array().unwrap().len(), 2);

    let (status, _, _) = app
        .send(request(Method::GET, "/permissions?role_filter=Guest", Some(&token), None))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_user_permissions_view() {
    let app = TestApp::new().await;
    seed_permission(app.store.as_ref(), &app.user, Application::DeveloperDashboard, CapabilitySet::EDIT)
        .await;
    let token = app.token_for(&app.admin);

    let uri = format!("/permissions/users/{}", app.user.id);
    let (status, _, body) = app.send(request(Method::GET, &uri, Some(&token), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], "mrossi");
    assert_eq!(body["email"], "mrossi@example.com");

    let apps = body["applications"].as_array().unwrap();
    assert_eq!(apps.len(), 4);
    assert_eq!(apps[3]["application_name"], "DeveloperDashboard");
    assert_eq!(apps[3]["display_name"], "Developer Dashboard");
    assert_eq!(apps[3]["can_edit"], true);
    assert!(apps[0]["id"].is_null());

    let uri = format!("/permissions/users/{}", uuid::Uuid::new_v4());
    let (status, _, _) = app.send(request(Method::GET, &uri, Some(&token), None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_batch_save_replaces_per_application() {
    let app = TestApp::new().await;
    seed_permission(app.store.as_ref(), &app.user, Application::BugTracking, CapabilitySet::all())
        .await;
    seed_permission(app.store.as_ref(), &app.user, Application::FeatureRequest, CapabilitySet::VIEW)
        .await;
    let token = app.token_for(&app.admin);

    let uri = format!("/permissions/users/{}", app.user.id);
    let (status, _, body) = app
        .send(request(
            Method::PUT,
            &uri,
            Some(&token),
            Some(json!({
                "applications": [
                    { "application_name": "KioskRegistration", "can_view": true, "can_edit": true },
                    { "application_name": "BugTracking" }
                ]
            })),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let kiosk = app
        .store
        .find(app.user.id, Application::KioskRegistration)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(kiosk.capabilities, CapabilitySet::VIEW | CapabilitySet::EDIT);
    assert_eq!(kiosk.granted_by, Some(app.admin.id));

    // 空集合删除记录，未列出的应用保持不变
    assert!(app
        .store
        .find(app.user.id, Application::BugTracking)
        .await
        .unwrap()
        .is_none());
    assert!(app
        .store
        .find(app.user.id, Application::FeatureRequest)
        .await
        .unwrap()
        .is_some());
}

#[tokio::test]
async fn test_batch_save_rejects_unknown_application() {
    let app = TestApp::new().await;
    let token = app.token_for(&app.admin);

    let uri = format!("/permissions/users/{}", app.user.id);
    let (status, _, body) = app
        .send(request(
            Method::PUT,
            &uri,
            Some(&token),
            Some(json!({
                "applications": [
                    { "application_name": "KioskRegistration", "can_view": true },
                    { "application_name": "Payroll", "can_view": true }
                ]
            })),
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"]["message"].as_str().unwrap().contains("Payroll"));

    // 校验在写入之前完成
    assert!(app.store.is_empty().await);

    let (status, _, _) = app
        .send(request(
            Method::PUT,
            &uri,
            Some(&token),
            Some(json!({ "applications": [] })),
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_toggle_flips_capability() {
    let app = TestApp::new().await;
    let token = app.token_for(&app.admin);
    let body = json!({
        "user_id": app.user.id,
        "application_name": "BugTracking",
        "permission_type": "Create"
    });

    let (status, _, response) = app
        .send(request(Method::POST, "/permissions/toggle", Some(&token), Some(body.clone())))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["success"], true);
    assert_eq!(response["new_value"], true);

    let record = app
        .store
        .find(app.user.id, Application::BugTracking)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.capabilities, CapabilitySet::CREATE);

    // 再次切换清空最后一项能力，记录被删除
    let (_, _, response) = app
        .send(request(Method::POST, "/permissions/toggle", Some(&token), Some(body)))
        .await;
    assert_eq!(response["new_value"], false);
    assert!(app.store.is_empty().await);

    let (status, _, _) = app
        .send(request(
            Method::POST,
            "/permissions/toggle",
            Some(&token),
            Some(json!({
                "user_id": app.user.id,
                "application_name": "BugTracking",
                "permission_type": "Approve"
            })),
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_delete_all_permissions() {
    let app = TestApp::new().await;
    for application in Application::ALL {
        seed_permission(app.store.as_ref(), &app.user, application, CapabilitySet::VIEW).await;
    }
    let token = app.token_for(&app.admin);

    let (status, _, body) = app
        .send(request(
            Method::POST,
            "/permissions/delete-all",
            Some(&token),
            Some(json!({ "user_id": app.user.id })),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["removed"], 4);
    assert!(app.store.is_empty().await);

    // 没有记录时是空操作
    let (status, _, body) = app
        .send(request(
            Method::POST,
            "/permissions/delete-all",
            Some(&token),
            Some(json!({ "user_id": app.user.id })),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["removed"], 0);
}

#[tokio::test]
async fn test_malformed_bodies_return_json_errors() {
    let app = TestApp::new().await;
    let token = app.token_for(&app.admin);

    // 缺少 user_id
    let (status, _, body) = app
        .send(request(
            Method::POST,
            "/permissions/toggle",
            Some(&token),
            Some(json!({
                "application_name": "BugTracking",
                "permission_type": "View"
            })),
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], 400);
    assert!(body["error"]["message"].as_str().unwrap().contains("user_id"));

    // user_id 不是 UUID
    let (status, _, body) = app
        .send(request(
            Method::POST,
            "/permissions/delete-all",
            Some(&token),
            Some(json!({ "user_id": "nope" })),
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], 400);
    assert!(body["error"]["request_id"].is_string());

    assert!(app.store.is_empty().await);
}

#[tokio::test]
async fn test_new_admin_manages_permissions() {
    let app = TestApp::new().await;
    let second = app.add_user("ops_lead", Role::Admin).await;
    let token = app.token_for(&second);

    let (status, _, _) = app
        .send(request(Method::GET, "/permissions", Some(&token), None))
        .await;
    assert_eq!(status, StatusCode::OK);
}
