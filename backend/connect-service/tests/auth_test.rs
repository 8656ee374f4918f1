/// Sign-up, sign-in, sessions and third-party sign-in
mod common;

use std::sync::Arc;

use actix_web::cookie::Cookie;
use actix_web::http::{header, StatusCode};
use actix_web::test;
use serde_json::{json, Value};

use common::{init_app, FakeHostedAuth, FakeMailer, FakeOAuth, TestBuilder};
use connect_service::security::SESSION_COOKIE;

fn signup_body(email: &str) -> Value {
    json!({
        "firstName": "Amina",
        "lastName": "Yusuf",
        "email": email,
        "password": "s3cure-passw0rd"
    })
}

#[actix_web::test]
async fn test_signup_creates_user_and_rejects_duplicate_email() {
    let ctx = TestBuilder::new().build();
    let app = init_app(ctx.state.clone()).await;

    let req = test::TestRequest::post()
        .uri("/api/signup")
        .set_json(signup_body("amina@example.com"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["message"], "User created successfully");
    assert_eq!(body["user"]["email"], "amina@example.com");
    assert_eq!(body["user"]["full_name"], "Amina Yusuf");
    assert!(body["user"].get("password_hash").is_none());

    let req = test::TestRequest::post()
        .uri("/api/signup")
        .set_json(signup_body("AMINA@example.com"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], "CONFLICT");
    assert_eq!(ctx.users.all().len(), 1);
}

#[actix_web::test]
async fn test_signup_reports_missing_fields() {
    let ctx = TestBuilder::new().build();
    let app = init_app(ctx.state.clone()).await;

    let req = test::TestRequest::post()
        .uri("/api/signup")
        .set_json(json!({ "email": "not-an-email", "password": "short" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], "VALIDATION_ERROR");
    let fields: Vec<&str> = body["details"]
        .as_array()
        .expect("details")
        .iter()
        .filter_map(|d| d["field"].as_str())
        .collect();
    assert_eq!(fields, vec!["email", "firstName", "lastName", "password"]);
}

#[actix_web::test]
async fn test_signin_issues_session_cookie() {
    let ctx = TestBuilder::new().build();
    let app = init_app(ctx.state.clone()).await;

    let req = test::TestRequest::post()
        .uri("/api/signup")
        .set_json(signup_body("amina@example.com"))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CREATED);

    let req = test::TestRequest::post()
        .uri("/api/auth/signin")
        .set_json(json!({ "email": "amina@example.com", "password": "wrong-password" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let req = test::TestRequest::post()
        .uri("/api/auth/signin")
        .set_json(json!({ "email": "nobody@example.com", "password": "s3cure-passw0rd" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let req = test::TestRequest::post()
        .uri("/api/auth/signin")
        .set_json(json!({ "email": "amina@example.com", "password": "s3cure-passw0rd" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let cookie = resp
        .response()
        .cookies()
        .find(|c| c.name() == SESSION_COOKIE)
        .expect("session cookie")
        .into_owned();
    assert_eq!(cookie.http_only(), Some(true));

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["token"], cookie.value());

    // The cookie alone authenticates
    let req = test::TestRequest::get()
        .uri("/api/auth/session")
        .cookie(Cookie::new(SESSION_COOKIE, cookie.value().to_string()))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["user"]["email"], "amina@example.com");
    assert_eq!(body["user"]["name"], "Amina Yusuf");
    assert_eq!(body["provider"], "credentials");
}

#[actix_web::test]
async fn test_session_requires_valid_token() {
    let ctx = TestBuilder::new().build();
    let app = init_app(ctx.state.clone()).await;

    let req = test::TestRequest::get().uri("/api/auth/session").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let req = test::TestRequest::get()
        .uri("/api/auth/session")
        .insert_header((header::AUTHORIZATION, "Bearer not-a-token"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn test_signout_clears_cookie() {
    let ctx = TestBuilder::new().build();
    let app = init_app(ctx.state.clone()).await;

    let req = test::TestRequest::post().uri("/api/auth/signout").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let cookie = resp
        .response()
        .cookies()
        .find(|c| c.name() == SESSION_COOKIE)
        .expect("removal cookie");
    assert_eq!(cookie.value(), "");
}

#[actix_web::test]
async fn test_providers_follow_configuration() {
    let ctx = TestBuilder::new().build();
    let app = init_app(ctx.state.clone()).await;
    let req = test::TestRequest::get().uri("/api/auth/providers").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let ids: Vec<&str> = body["providers"]
        .as_array()
        .expect("providers")
        .iter()
        .filter_map(|p| p["id"].as_str())
        .collect();
    assert_eq!(ids, vec!["credentials"]);

    let ctx = TestBuilder::new()
        .oauth("google", Arc::new(FakeOAuth))
        .hosted_auth(Arc::new(FakeHostedAuth))
        .build();
    let app = init_app(ctx.state.clone()).await;
    let req = test::TestRequest::get().uri("/api/auth/providers").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let ids: Vec<&str> = body["providers"]
        .as_array()
        .expect("providers")
        .iter()
        .filter_map(|p| p["id"].as_str())
        .collect();
    assert_eq!(ids, vec!["credentials", "google", "hosted"]);
}

#[actix_web::test]
async fn test_social_sign_in_hidden_when_disabled() {
    let ctx = TestBuilder::new()
        .var("ENABLE_SOCIAL_LOGIN", "false")
        .oauth("google", Arc::new(FakeOAuth))
        .build();
    let app = init_app(ctx.state.clone()).await;

    let req = test::TestRequest::get()
        .uri("/api/auth/signin/google")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn test_google_sign_in_round_trip() {
    let ctx = TestBuilder::new().oauth("google", Arc::new(FakeOAuth)).build();
    let app = init_app(ctx.state.clone()).await;

    let req = test::TestRequest::get()
        .uri("/api/auth/signin/google")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    let location = resp
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .expect("location header")
        .to_string();
    let state = location
        .split("state=")
        .nth(1)
        .expect("state parameter")
        .to_string();

    // A state minted for another provider is rejected
    let foreign = ctx.state.sessions.issue_oauth_state("facebook").expect("state");
    let req = test::TestRequest::get()
        .uri(&format!("/api/auth/callback/google?code=good-code&state={}", foreign))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let req = test::TestRequest::get()
        .uri(&format!("/api/auth/callback/google?code=bad-code&state={}", state))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let req = test::TestRequest::get()
        .uri(&format!("/api/auth/callback/google?code=good-code&state={}", state))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["user"]["email"], "khadija@example.com");
    assert_eq!(body["user"]["email_verified"], true);

    let users = ctx.users.all();
    assert_eq!(users.len(), 1);
    assert!(users[0].password_hash.is_none());
}

#[actix_web::test]
async fn test_hosted_session_links_or_creates_user() {
    let ctx = TestBuilder::new().build();
    let app = init_app(ctx.state.clone()).await;
    let req = test::TestRequest::post()
        .uri("/api/auth/hosted/session")
        .set_json(json!({ "access_token": "valid-token" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);

    let ctx = TestBuilder::new().hosted_auth(Arc::new(FakeHostedAuth)).build();
    let existing = ctx.create_user("yusuf@example.com", "Yusuf Ali").await;
    let app = init_app(ctx.state.clone()).await;

    let req = test::TestRequest::post()
        .uri("/api/auth/hosted/session")
        .set_json(json!({ "access_token": "expired" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);

    let req = test::TestRequest::post()
        .uri("/api/auth/hosted/session")
        .set_json(json!({ "access_token": "valid-token" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let users = ctx.users.all();
    assert_eq!(users.len(), 1);
    assert_eq!(users[0].id, existing.id);
    assert_eq!(users[0].stack_user_id.as_deref(), Some("stack-user-1"));
}

#[actix_web::test]
async fn test_email_verification_flow() {
    let ctx = TestBuilder::new()
        .var("ENABLE_EMAIL_VERIFICATION", "true")
        .mailer(FakeMailer::enabled())
        .build();
    let app = init_app(ctx.state.clone()).await;

    let req = test::TestRequest::post()
        .uri("/api/signup")
        .set_json(signup_body("amina@example.com"))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["user"]["email_verified"], false);

    let sent = ctx.mailer.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, "amina@example.com");
    let link = &sent[0].1;
    assert!(link.starts_with("http://localhost:3000/api/auth/verify-email?token="));
    let path = link.trim_start_matches("http://localhost:3000");

    let req = test::TestRequest::get().uri(path).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(ctx.users.all()[0].email_verified);

    let req = test::TestRequest::get()
        .uri("/api/auth/verify-email?token=forged")
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn test_unverified_provider_email_cannot_claim_existing_account() {
    let ctx = TestBuilder::new().oauth("google", Arc::new(FakeOAuth)).build();
    let existing = ctx.create_user("khadija@example.com", "Khadija Rahman").await;
    let app = init_app(ctx.state.clone()).await;

    let oauth_state = ctx.state.sessions.issue_oauth_state("google").expect("state");
    let req = test::TestRequest::get()
        .uri(&format!(
            "/api/auth/callback/google?code=unverified-code&state={}",
            oauth_state
        ))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    assert!(resp
        .response()
        .cookies()
        .all(|c| c.name() != SESSION_COOKIE));

    // A provider-verified email still signs in to the same account
    let req = test::TestRequest::get()
        .uri(&format!(
            "/api/auth/callback/google?code=good-code&state={}",
            oauth_state
        ))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["user"]["id"], existing.id.to_string());
    assert_eq!(ctx.users.all().len(), 1);
}

#[actix_web::test]
async fn test_unverified_hosted_email_is_not_linked() {
    let ctx = TestBuilder::new().hosted_auth(Arc::new(FakeHostedAuth)).build();
    let existing = ctx.create_user("yusuf@example.com", "Yusuf Ali").await;
    let app = init_app(ctx.state.clone()).await;

    let req = test::TestRequest::post()
        .uri("/api/auth/hosted/session")
        .set_json(json!({ "access_token": "unverified-token" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    let users = ctx.users.all();
    assert_eq!(users.len(), 1);
    assert_eq!(users[0].id, existing.id);
    assert!(users[0].stack_user_id.is_none());
}
