mod common;

use axum::http::{Method, StatusCode};
use common::{read_json, TestApp, TEST_PASSWORD};
use serde_json::json;

#[tokio::test]
async fn sign_up_then_sign_in_then_use_token() {
    let app = TestApp::new().await;

    let response = app
        .request(
            Method::POST,
            "/signup/",
            Some(json!({
                "username": "dave",
                "password": "hunter2hunter2",
                "email": "Dave@Example.com"
            })),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let user = read_json(response).await;
    assert_eq!(user["username"], "dave");
    assert_eq!(user["email"], "dave@example.com");
    assert_eq!(user["role"], "customer");
    assert_eq!(user["is_active"], true);
    assert!(user.get("password").is_none());
    assert!(user.get("password_hash").is_none());

    let response = app
        .request(
            Method::POST,
            "/signin/",
            Some(json!({ "username": "dave", "password": "hunter2hunter2" })),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let token = read_json(response).await;
    assert_eq!(token["token_type"], "Bearer");
    assert_eq!(token["expires_in"], 3600);
    assert_eq!(token["user"]["username"], "dave");
    let access_token = token["access_token"].as_str().unwrap().to_string();

    let cart = app
        .request(Method::GET, "/cart/", None, Some(&access_token))
        .await;
    assert_eq!(cart.status(), StatusCode::OK);
}

#[tokio::test]
async fn sign_up_rejects_duplicates_and_bad_input() {
    let app = TestApp::new().await;

    let taken = app
        .request(
            Method::POST,
            "/signup/",
            Some(json!({ "username": "alice", "password": "longenough1" })),
            None,
        )
        .await;
    assert_eq!(taken.status(), StatusCode::CONFLICT);

    let email_taken = app
        .request(
            Method::POST,
            "/signup/",
            Some(json!({
                "username": "alice2",
                "password": "longenough1",
                "email": "ALICE@example.com"
            })),
            None,
        )
        .await;
    assert_eq!(email_taken.status(), StatusCode::CONFLICT);

    let short_password = app
        .request(
            Method::POST,
            "/signup/",
            Some(json!({ "username": "erin", "password": "short" })),
            None,
        )
        .await;
    assert_eq!(short_password.status(), StatusCode::BAD_REQUEST);

    let bad_username = app
        .request(
            Method::POST,
            "/signup/",
            Some(json!({ "username": "has space", "password": "longenough1" })),
            None,
        )
        .await;
    assert_eq!(bad_username.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn sign_in_rejects_wrong_credentials() {
    let app = TestApp::new().await;

    let wrong_password = app
        .request(
            Method::POST,
            "/signin/",
            Some(json!({ "username": "alice", "password": "not-the-password" })),
            None,
        )
        .await;
    assert_eq!(wrong_password.status(), StatusCode::UNAUTHORIZED);

    let unknown_user = app
        .request(
            Method::POST,
            "/signin/",
            Some(json!({ "username": "mallory", "password": TEST_PASSWORD })),
            None,
        )
        .await;
    assert_eq!(unknown_user.status(), StatusCode::UNAUTHORIZED);

    let ok = app
        .request(
            Method::POST,
            "/signin/",
            Some(json!({ "username": "alice", "password": TEST_PASSWORD })),
            None,
        )
        .await;
    assert_eq!(ok.status(), StatusCode::OK);
}

#[tokio::test]
async fn malformed_authorization_header_is_rejected() {
    let app = TestApp::new().await;

    let response = app
        .request_authorization(Method::GET, "/meals/", "Basic YWxpY2U6cHc=")
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = read_json(response).await;
    assert_eq!(body["error"]["code"], "AUTH_INVALID_TOKEN");
}

#[tokio::test]
async fn only_admins_list_users() {
    let app = TestApp::new().await;

    let customer = app.request_as(&app.alice, Method::GET, "/users/", None).await;
    assert_eq!(customer.status(), StatusCode::FORBIDDEN);

    let anonymous = app.request(Method::GET, "/users/", None, None).await;
    assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);

    let admin = app.request_as(&app.admin, Method::GET, "/users/", None).await;
    assert_eq!(admin.status(), StatusCode::OK);
    let users = read_json(admin).await;
    let names: Vec<&str> = users
        .as_array()
        .unwrap()
        .iter()
        .map(|u| u["username"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["admin", "alice", "bob", "carol"]);
    assert_eq!(users[0]["role"], "admin");
}

#[tokio::test]
async fn deactivated_accounts_lose_access() {
    let app = TestApp::new().await;
    let toggle_uri = format!("/users/{}/toggle-status/", app.bob.id);

    let by_customer = app.request_as(&app.alice, Method::POST, &toggle_uri, None).await;
    assert_eq!(by_customer.status(), StatusCode::FORBIDDEN);

    let response = app.request_as(&app.admin, Method::POST, &toggle_uri, None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["is_active"], false);

    let with_old_token = app.request_as(&app.bob, Method::GET, "/cart/", None).await;
    assert_eq!(with_old_token.status(), StatusCode::UNAUTHORIZED);
    let body = read_json(with_old_token).await;
    assert_eq!(body["error"]["code"], "AUTH_INACTIVE_ACCOUNT");

    let sign_in = app
        .request(
            Method::POST,
            "/signin/",
            Some(json!({ "username": "bob", "password": TEST_PASSWORD })),
            None,
        )
        .await;
    assert_eq!(sign_in.status(), StatusCode::UNAUTHORIZED);

    let response = app.request_as(&app.admin, Method::POST, &toggle_uri, None).await;
    let body = read_json(response).await;
    assert_eq!(body["is_active"], true);

    let restored = app.request_as(&app.bob, Method::GET, "/cart/", None).await;
    assert_eq!(restored.status(), StatusCode::OK);
}

#[tokio::test]
async fn admins_cannot_toggle_themselves_or_ghosts() {
    let app = TestApp::new().await;

    let own = app
        .request_as(
            &app.admin,
            Method::POST,
            &format!("/users/{}/toggle-status/", app.admin.id),
            None,
        )
        .await;
    assert_eq!(own.status(), StatusCode::BAD_REQUEST);

    let ghost = app
        .request_as(&app.admin, Method::POST, "/users/9999/toggle-status/", None)
        .await;
    assert_eq!(ghost.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn role_changes_take_effect_without_new_token() {
    let app = TestApp::new().await;

    let before = app.request_as(&app.carol, Method::GET, "/users/", None).await;
    assert_eq!(before.status(), StatusCode::FORBIDDEN);

    app.services()
        .users
        .set_role("carol", foodcart_api::entities::Role::Admin)
        .await
        .expect("promote carol");

    let after = app.request_as(&app.carol, Method::GET, "/users/", None).await;
    assert_eq!(after.status(), StatusCode::OK);
}
