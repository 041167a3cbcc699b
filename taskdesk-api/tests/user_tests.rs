/// Integration tests for user endpoints
///
/// Self-service profile changes and the admin-only management routes.

mod common;

use axum::http::StatusCode;
use common::{TestContext, PASSWORD};
use serde_json::json;

#[tokio::test]
async fn test_non_admin_cannot_list_users() {
    let ctx = TestContext::new();
    let token = ctx.user_token("a@x.com").await;

    let response = ctx.get("/api/users", &token).await;

    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert_eq!(response.code(), "INSUFFICIENT_PERMISSIONS");
    assert_eq!(response.body["requiredRoles"], json!(["admin"]));
    assert_eq!(response.body["userRole"], "user");
}

#[tokio::test]
async fn test_admin_lists_users_with_filters() {
    let ctx = TestContext::new();
    let (_, admin) = ctx.admin("admin@x.com").await;
    ctx.user_token("a@x.com").await;
    let b = ctx.user_token("b@x.com").await;
    ctx.put("/api/users/deactivate", &b, json!({})).await;

    let response = ctx.get("/api/users", &admin).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["pagination"]["total"], 3);
    assert!(response.body["data"]["users"]
        .as_array()
        .unwrap()
        .iter()
        .all(|u| u.get("passwordHash").is_none()));

    let response = ctx.get("/api/users?role=admin", &admin).await;
    let users = response.body["data"]["users"].as_array().unwrap();
    assert_eq!(users.len(), 1);
    assert_eq!(users[0]["email"], "admin@x.com");

    let response = ctx.get("/api/users?isActive=false", &admin).await;
    let users = response.body["data"]["users"].as_array().unwrap();
    assert_eq!(users.len(), 1);
    assert_eq!(users[0]["email"], "b@x.com");

    let response = ctx.get("/api/users?limit=2", &admin).await;
    assert_eq!(
        response.body["data"]["pagination"],
        json!({ "page": 1, "limit": 2, "total": 3, "pages": 2 })
    );
}

#[tokio::test]
async fn test_list_users_rejects_bad_query() {
    let ctx = TestContext::new();
    let (_, admin) = ctx.admin("admin@x.com").await;

    let response = ctx.get("/api/users?role=owner&isActive=maybe", &admin).await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.code(), "VALIDATION_ERROR");
    let fields: Vec<&str> = response.body["errors"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|e| e["field"].as_str())
        .collect();
    assert_eq!(fields, vec!["isActive", "role"]);
}

#[tokio::test]
async fn test_admin_get_and_update_user() {
    let ctx = TestContext::new();
    let (_, admin) = ctx.admin("admin@x.com").await;
    let registered = ctx.register("a@x.com").await;
    let id = registered.body["data"]["user"]["id"].as_str().unwrap().to_string();
    let uri = format!("/api/users/{}", id);

    let response = ctx.get(&uri, &admin).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["user"]["email"], "a@x.com");

    let response = ctx
        .put(&uri, &admin, json!({ "name": "Alice", "isActive": false }))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["user"]["name"], "Alice");
    assert_eq!(response.body["data"]["user"]["isActive"], false);

    let response = ctx
        .get("/api/auth/profile", &registered.access_token())
        .await;
    assert_eq!(response.code(), "USER_INACTIVE");

    let response = ctx.get("/api/users/not-a-uuid", &admin).await;
    assert_eq!(response.code(), "INVALID_ID");

    let response = ctx
        .get(&format!("/api/users/{}", uuid::Uuid::new_v4()), &admin)
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.code(), "USER_NOT_FOUND");
}

#[tokio::test]
async fn test_email_in_use() {
    let ctx = TestContext::new();
    let (_, admin) = ctx.admin("admin@x.com").await;
    let a = ctx.register("a@x.com").await;
    ctx.register("b@x.com").await;

    let response = ctx
        .put("/api/users/profile", &a.access_token(), json!({ "email": "B@x.com" }))
        .await;
    assert_eq!(response.status, StatusCode::CONFLICT);
    assert_eq!(response.code(), "EMAIL_IN_USE");

    let id = a.body["data"]["user"]["id"].as_str().unwrap();
    let response = ctx
        .put(&format!("/api/users/{}", id), &admin, json!({ "email": "b@x.com" }))
        .await;
    assert_eq!(response.code(), "EMAIL_IN_USE");

    // Keeping your own address is not a conflict
    let response = ctx
        .put(
            "/api/users/profile",
            &a.access_token(),
            json!({ "name": "Anna", "email": "a@x.com" }),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["user"]["name"], "Anna");
}

#[tokio::test]
async fn test_change_password() {
    let ctx = TestContext::new();
    let token = ctx.user_token("a@x.com").await;

    let response = ctx
        .put(
            "/api/users/change-password",
            &token,
            json!({ "currentPassword": "Wrong123", "newPassword": "Xyz789" }),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.code(), "INVALID_CURRENT_PASSWORD");

    let response = ctx
        .put(
            "/api/users/change-password",
            &token,
            json!({ "currentPassword": PASSWORD, "newPassword": "weak" }),
        )
        .await;
    assert_eq!(response.code(), "VALIDATION_ERROR");

    let response = ctx
        .put(
            "/api/users/change-password",
            &token,
            json!({ "currentPassword": PASSWORD, "newPassword": "Xyz789" }),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["message"], "Password changed successfully");

    let old = ctx
        .post("/api/auth/login", None, json!({ "email": "a@x.com", "password": PASSWORD }))
        .await;
    assert_eq!(old.code(), "INVALID_CREDENTIALS");

    let new = ctx
        .post("/api/auth/login", None, json!({ "email": "a@x.com", "password": "Xyz789" }))
        .await;
    assert_eq!(new.status, StatusCode::OK);
}

#[tokio::test]
async fn test_deactivate_clears_cookie() {
    let ctx = TestContext::new();
    let token = ctx.user_token("a@x.com").await;

    let response = ctx.put("/api/users/deactivate", &token, json!({})).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["message"], "Account deactivated successfully");
    assert!(response.set_cookie().unwrap().contains("Max-Age=0"));

    let response = ctx.get("/api/auth/profile", &token).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.code(), "USER_INACTIVE");
}

#[tokio::test]
async fn test_admin_cannot_delete_self() {
    let ctx = TestContext::new();
    let (admin, token) = ctx.admin("admin@x.com").await;

    let response = ctx.delete(&format!("/api/users/{}", admin.id), &token).await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.code(), "CANNOT_DELETE_SELF");
    assert_eq!(ctx.get("/api/auth/profile", &token).await.status, StatusCode::OK);
}

#[tokio::test]
async fn test_delete_user_removes_their_tasks() {
    let ctx = TestContext::new();
    let (_, admin) = ctx.admin("admin@x.com").await;
    let registered = ctx.register("a@x.com").await;
    let id = registered.body["data"]["user"]["id"].as_str().unwrap().to_string();
    let token = registered.access_token();
    ctx.create_task(&token, "one").await;
    ctx.create_task(&token, "two").await;
    ctx.create_task(&admin, "kept").await;

    let response = ctx.delete(&format!("/api/users/{}", id), &admin).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["message"], "User deleted successfully");

    let response = ctx.get(&format!("/api/users/{}", id), &admin).await;
    assert_eq!(response.code(), "USER_NOT_FOUND");

    let response = ctx.get(&format!("/api/tasks?userId={}", id), &admin).await;
    assert_eq!(response.body["data"]["pagination"]["total"], 0);

    let response = ctx.get("/api/tasks", &admin).await;
    assert_eq!(response.body["data"]["pagination"]["total"], 1);

    let response = ctx.delete(&format!("/api/users/{}", id), &admin).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_unknown_route() {
    let ctx = TestContext::new();
    let token = ctx.user_token("a@x.com").await;

    let response = ctx.get("/api/nothing-here", &token).await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.code(), "NOT_FOUND");
    assert_eq!(response.body["success"], false);
}

#[tokio::test]
async fn test_admin_update_reports_mistyped_field_with_the_rest() {
    let ctx = TestContext::new();
    let (_, admin) = ctx.admin("admin@x.com").await;
    let registered = ctx.register("a@x.com").await;
    let id = registered.body["data"]["user"]["id"].as_str().unwrap();

    let response = ctx
        .put(
            &format!("/api/users/{}", id),
            &admin,
            json!({ "isActive": "false", "name": "1" }),
        )
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    let fields: Vec<&str> = response.body["errors"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|e| e["field"].as_str())
        .collect();
    assert_eq!(fields, vec!["isActive", "name", "name"]);

    let response = ctx.get(&format!("/api/users/{}", id), &admin).await;
    assert_eq!(response.body["data"]["user"]["isActive"], true);
}

#[tokio::test]
async fn test_wrong_method_is_enveloped() {
    let ctx = TestContext::new();
    let token = ctx.user_token("a@x.com").await;

    let response = ctx.get("/api/users/profile", &token).await;

    assert_eq!(response.status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(response.code(), "METHOD_NOT_ALLOWED");
    assert_eq!(response.body["success"], false);
}
