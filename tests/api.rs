use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use labmarket::{app, auth::Keys, db, AppState};
use serde_json::{json, Value};
use sqlx::sqlite::SqlitePoolOptions;
use tower::ServiceExt;

async fn test_app() -> Router {
    // one connection: every connection to sqlite::memory: is its own database
    let db_pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    db::init(&db_pool).await.unwrap();

    app(AppState {
        db_pool,
        keys: Keys::new(b"integration-secret", 1),
    })
}

async fn call(app: &Router, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => request
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string())),
        None => request.body(Body::empty()),
    }
    .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };
    (status, value)
}

/// Registers and logs in; returns (token, user id).
async fn sign_up(app: &Router, name: &str, role: &str) -> (String, String) {
    let email = format!("{}@example.org", name.to_lowercase());
    let (status, body) = call(
        app,
        Method::POST,
        "/api/auth/register",
        None,
        Some(json!({
            "name": name,
            "email": email,
            "password": "pa55word",
            "role": role,
            "institution": "IISc",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert!(body.get("passwordHash").is_none());

    let (status, body) = call(
        app,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({ "email": email, "password": "pa55word" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["role"], role);
    assert_eq!(body["name"], name);

    (
        body["token"].as_str().unwrap().to_owned(),
        body["id"].as_str().unwrap().to_owned(),
    )
}

async fn create_project(app: &Router, token: &str, title: &str) -> String {
    let (status, body) = call(
        app,
        Method::POST,
        "/api/projects",
        Some(token),
        Some(json!({ "title": title, "abstract": "A study", "trl": 3, "fundingRequired": 50000.0 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    body["id"].as_str().unwrap().to_owned()
}

#[tokio::test]
async fn health_is_public() {
    let app = test_app().await;
    let (status, body) = call(&app, Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::String("ok".into()));
}

#[tokio::test]
async fn register_validates_and_rejects_duplicates() {
    let app = test_app().await;

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/auth/register",
        None,
        Some(json!({ "name": "Rae", "email": "rae@example.org", "password": "x", "role": "researcher" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Institution is required for researchers and investors");

    let (status, _) = call(
        &app,
        Method::POST,
        "/api/auth/register",
        None,
        Some(json!({ "email": "rae@example.org" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    sign_up(&app, "Rae", "researcher").await;
    let (status, _) = call(
        &app,
        Method::POST,
        "/api/auth/register",
        None,
        Some(json!({ "name": "Rae", "email": "RAE@example.org", "password": "x", "role": "admin" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn login_rejects_wrong_password() {
    let app = test_app().await;
    sign_up(&app, "Ivy", "investor").await;

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({ "email": "ivy@example.org", "password": "nope" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid credentials");
}

#[tokio::test]
async fn profile_round_trip() {
    let app = test_app().await;
    let (token, _) = sign_up(&app, "Rae", "researcher").await;

    let (status, body) = call(
        &app,
        Method::PUT,
        "/api/auth/profile",
        Some(token.as_str()),
        Some(json!({ "name": "", "phoneNumber": "+91 555" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["name"], "Rae");
    assert_eq!(body["phoneNumber"], "+91 555");
    assert!(body.get("email").is_none());
    assert!(body.get("role").is_none());

    let (status, body) = call(&app, Method::GET, "/api/auth/profile", Some(token.as_str()), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["institution"], "IISc");
    assert_eq!(body["role"], "researcher");
    assert_eq!(body["email"], "rae@example.org");
    assert!(body.get("id").is_none());
    assert!(body.get("createdAt").is_none());
}

#[tokio::test]
async fn guards_reject_missing_token_and_wrong_role() {
    let app = test_app().await;
    let (investor, _) = sign_up(&app, "Ivy", "investor").await;
    let (researcher, _) = sign_up(&app, "Rae", "researcher").await;

    let (status, _) = call(&app, Method::GET, "/api/messages", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = call(&app, Method::GET, "/api/messages", Some("garbage"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = call(
        &app,
        Method::POST,
        "/api/projects",
        Some(investor.as_str()),
        Some(json!({ "title": "Nope" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = call(&app, Method::GET, "/api/projects", Some(researcher.as_str()), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn interest_in_two_projects_yields_one_conversation() {
    let app = test_app().await;
    let (researcher, researcher_id) = sign_up(&app, "Rae", "researcher").await;
    let (investor, investor_id) = sign_up(&app, "Ivy", "investor").await;
    let p1 = create_project(&app, &researcher, "Solar Ink").await;
    let p2 = create_project(&app, &researcher, "Tidal Mesh").await;

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/messages/express-interest",
        Some(investor.as_str()),
        Some(json!({ "projectId": p1 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["message"], "Interest expressed successfully");
    assert_eq!(body["researcherId"], researcher_id);
    assert_eq!(body["chat"]["sender"]["name"], "Ivy");
    assert_eq!(body["chat"]["receiver"]["name"], "Rae");

    for project in [&p1, &p2] {
        let (status, body) = call(
            &app,
            Method::POST,
            "/api/messages/express-interest",
            Some(investor.as_str()),
            Some(json!({ "projectId": project })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Chat already exists");
        assert_eq!(body["researcherId"], researcher_id);
        assert!(body.get("chat").is_none());
    }

    let (_, conversations) = call(&app, Method::GET, "/api/messages/conversations", Some(investor.as_str()), None).await;
    let conversations = conversations.as_array().unwrap();
    assert_eq!(conversations.len(), 1);
    assert_eq!(conversations[0]["counterparty"]["id"], researcher_id);
    assert_eq!(conversations[0]["messages"].as_array().unwrap().len(), 1);
    assert_eq!(
        conversations[0]["lastMessage"]["content"],
        "Hi! I'm interested in your project \"Solar Ink\". Let's discuss!"
    );
    assert_eq!(conversations[0]["unreadCount"], 0);

    let (_, conversations) = call(&app, Method::GET, "/api/messages/conversations", Some(researcher.as_str()), None).await;
    assert_eq!(conversations[0]["counterparty"]["id"], investor_id);
    assert_eq!(conversations[0]["counterparty"]["name"], "Ivy");
    assert_eq!(conversations[0]["unreadCount"], 1);
}

#[tokio::test]
async fn only_receiver_marks_read() {
    let app = test_app().await;
    let (ada, _) = sign_up(&app, "Ada", "investor").await;
    let (bob, bob_id) = sign_up(&app, "Bob", "researcher").await;

    let (status, sent) = call(
        &app,
        Method::POST,
        "/api/messages",
        Some(ada.as_str()),
        Some(json!({ "receiver": bob_id, "content": "hello" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{sent}");
    assert_eq!(sent["read"], false);
    let uri = format!("/api/messages/{}/read", sent["id"].as_str().unwrap());

    let (status, body) = call(&app, Method::PUT, &uri, Some(ada.as_str()), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "Not authorized");

    for _ in 0..2 {
        let (status, body) = call(&app, Method::PUT, &uri, Some(bob.as_str()), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Marked as read");
    }

    let (_, messages) = call(&app, Method::GET, "/api/messages", Some(bob.as_str()), None).await;
    assert_eq!(messages[0]["read"], true);

    let (status, _) = call(&app, Method::PUT, "/api/messages/not-an-id/read", Some(bob.as_str()), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn send_rejects_bad_input() {
    let app = test_app().await;
    let (ada, _) = sign_up(&app, "Ada", "investor").await;
    let (_, bob_id) = sign_up(&app, "Bob", "researcher").await;

    let (status, _) = call(
        &app,
        Method::POST,
        "/api/messages",
        Some(ada.as_str()),
        Some(json!({ "receiver": bob_id, "content": "   " })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = call(&app, Method::POST, "/api/messages", Some(ada.as_str()), Some(json!({ "content": "hi" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, messages) = call(&app, Method::GET, "/api/messages", Some(ada.as_str()), None).await;
    assert_eq!(messages, json!([]));
}

#[tokio::test]
async fn malformed_bodies_get_json_errors() {
    let app = test_app().await;
    let (ada, _) = sign_up(&app, "Ada", "investor").await;
    let (rae, _) = sign_up(&app, "Rae", "researcher").await;

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/messages",
        Some(ada.as_str()),
        Some(json!({ "receiver": 5, "content": "hi" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("receiver"), "{body}");

    let (status, body) = call(&app, Method::POST, "/api/messages", Some(ada.as_str()), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].is_string(), "{body}");

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/projects",
        Some(rae.as_str()),
        Some(json!({ "title": "Solar", "trl": "three" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].is_string(), "{body}");

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/auth/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn raw_token_without_scheme_is_rejected() {
    let app = test_app().await;
    let (ada, _) = sign_up(&app, "Ada", "investor").await;

    let request = Request::builder()
        .uri("/api/messages")
        .header(header::AUTHORIZATION, ada)
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn unknown_email_login_fails_like_wrong_password() {
    let app = test_app().await;

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({ "email": "ghost@example.org", "password": "pa55word" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid credentials");
}

#[tokio::test]
async fn project_lifecycle() {
    let app = test_app().await;
    let (owner, owner_id) = sign_up(&app, "Rae", "researcher").await;
    let (rival, _) = sign_up(&app, "Rex", "researcher").await;
    let (investor, investor_id) = sign_up(&app, "Ivy", "investor").await;
    let project = create_project(&app, &owner, "Solar Ink").await;

    let (status, listed) = call(&app, Method::GET, "/api/projects", Some(investor.as_str()), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed[0]["createdBy"]["id"], owner_id);
    assert_eq!(listed[0]["createdBy"]["role"], "researcher");

    let interest = format!("/api/projects/{project}/interest");
    let (status, _) = call(&app, Method::POST, &interest, Some(investor.as_str()), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = call(&app, Method::POST, &interest, Some(investor.as_str()), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Already expressed interest");

    let (_, interested) = call(&app, Method::GET, "/api/projects/interested", Some(investor.as_str()), None).await;
    assert_eq!(interested[0]["interestedUsers"], json!([investor_id]));

    let (status, _) = call(
        &app,
        Method::PUT,
        &format!("/api/projects/{project}"),
        Some(rival.as_str()),
        Some(json!({ "title": "Hijacked" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, updated) = call(
        &app,
        Method::PUT,
        &format!("/api/projects/{project}"),
        Some(owner.as_str()),
        Some(json!({ "trl": 5 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{updated}");
    assert_eq!(updated["trl"], 5);
    assert_eq!(updated["title"], "Solar Ink");

    let (status, _) = call(
        &app,
        Method::DELETE,
        &format!("/api/projects/interested/{project}"),
        Some(investor.as_str()),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let (_, interested) = call(&app, Method::GET, "/api/projects/interested", Some(investor.as_str()), None).await;
    assert_eq!(interested, json!([]));

    let (status, _) = call(&app, Method::DELETE, &format!("/api/projects/{project}"), Some(owner.as_str()), None).await;
    assert_eq!(status, StatusCode::OK);
    let (_, mine) = call(&app, Method::GET, "/api/projects/mine", Some(owner.as_str()), None).await;
    assert_eq!(mine, json!([]));

    let (status, _) = call(
        &app,
        Method::POST,
        "/api/messages/express-interest",
        Some(investor.as_str()),
        Some(json!({ "projectId": project })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
