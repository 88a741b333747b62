//! Integration tests for the users API.
//!
//! These tests drive the router in-process and cover the full CRUD contract,
//! including status codes, envelopes and error messages.

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Method, Request, StatusCode, header};
use serde_json::{Value, json};
use tower::ServiceExt;
use users_cluster::{AppState, create_router};

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    body: Option<&str>,
) -> (StatusCode, Option<String>, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(body.map(|b| Body::from(b.to_string())).unwrap_or_else(Body::empty))
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .map(|v| v.to_str().unwrap().to_string());
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };

    (status, content_type, json)
}

fn app() -> Router {
    create_router(AppState::standalone())
}

async fn create_bob(app: &Router) -> Value {
    let (status, _, body) = send(
        app,
        Method::POST,
        "/api/users",
        Some(r#"{"username":"Bob","age":54,"hobbies":["Books"]}"#),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body["data"]["user"].clone()
}

#[tokio::test]
async fn test_list_starts_empty() {
    let app = app();
    let (status, content_type, body) = send(&app, Method::GET, "/api/users", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type.as_deref(), Some("application/json"));
    assert_eq!(body, json!({ "ok": true, "data": { "users": [] } }));
}

#[tokio::test]
async fn test_crud_scenario() {
    let app = app();

    // Create
    let user = create_bob(&app).await;
    let id = user["id"].as_str().unwrap().to_string();
    assert_eq!(
        user,
        json!({ "id": id, "username": "Bob", "age": 54, "hobbies": ["Books"] })
    );

    // Read back
    let (status, _, body) = send(&app, Method::GET, &format!("/api/users/{}", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "ok": true, "data": { "user": user } }));

    // Partial update
    let (status, _, body) = send(
        &app,
        Method::PUT,
        &format!("/api/users/{}", id),
        Some(r#"{"username":"Alice"}"#),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["data"]["user"],
        json!({ "id": id, "username": "Alice", "age": 54, "hobbies": ["Books"] })
    );

    // Listed
    let (_, _, body) = send(&app, Method::GET, "/api/users", None).await;
    assert_eq!(body["data"]["users"].as_array().unwrap().len(), 1);

    // Delete
    let (status, content_type, body) =
        send(&app, Method::DELETE, &format!("/api/users/{}", id), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(content_type.as_deref(), Some("application/json"));
    assert_eq!(body, Value::Null);

    // Gone
    let (status, _, body) = send(&app, Method::GET, &format!("/api/users/{}", id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({ "ok": false, "error": "User is not found." }));
}

#[tokio::test]
async fn test_update_every_field() {
    let app = app();
    let user = create_bob(&app).await;
    let id = user["id"].as_str().unwrap();

    let (status, _, body) = send(
        &app,
        Method::PUT,
        &format!("/api/users/{}", id),
        Some(r#"{"username":"Carol","age":30.5,"hobbies":["Chess","Go"]}"#),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["data"]["user"],
        json!({ "id": id, "username": "Carol", "age": 30.5, "hobbies": ["Chess", "Go"] })
    );
}

#[tokio::test]
async fn test_update_without_known_fields_keeps_record() {
    let app = app();
    let user = create_bob(&app).await;
    let id = user["id"].as_str().unwrap();

    let (status, _, body) = send(
        &app,
        Method::PUT,
        &format!("/api/users/{}", id),
        Some(r#"{"nickname":"B"}"#),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["user"], user);
}

#[tokio::test]
async fn test_update_rejects_wrong_types() {
    let app = app();
    let user = create_bob(&app).await;
    let id = user["id"].as_str().unwrap();

    let (status, _, body) = send(
        &app,
        Method::PUT,
        &format!("/api/users/{}", id),
        Some(r#"{"username":"Alice","hobbies":"none"}"#),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body,
        json!({
            "ok": false,
            "error": "Provided user is not valid.",
            "errors": { "hobbies": "Field hobbies is not an array." },
        })
    );

    // Nothing was applied
    let (_, _, body) = send(&app, Method::GET, &format!("/api/users/{}", id), None).await;
    assert_eq!(body["data"]["user"], user);
}

#[tokio::test]
async fn test_invalid_ids() {
    let app = app();

    for (method, uri) in [
        (Method::GET, "/api/users/not-a-uuid"),
        (Method::PUT, "/api/users/1"),
        (Method::DELETE, "/api/users/1"),
        (Method::GET, "/api/users/a/b"),
        (Method::GET, "/api/users/"),
        (Method::PUT, "/api/users/"),
        (Method::DELETE, "/api/users/"),
        // Decodes to invalid UTF-8
        (Method::GET, "/api/users/%FF"),
        // Version 1 UUID
        (Method::GET, "/api/users/c232ab00-9414-11ec-b3c8-9f6bdeced846"),
    ] {
        let (status, content_type, body) = send(&app, method, uri, Some("{}")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
        assert_eq!(content_type.as_deref(), Some("application/json"));
        assert_eq!(
            body,
            json!({ "ok": false, "error": "Provided userId is not valid." })
        );
    }
}

#[tokio::test]
async fn test_unknown_ids() {
    let app = app();
    let uri = "/api/users/b47d10c2-d4a4-435e-9958-958226eddf62";

    for method in [Method::GET, Method::PUT, Method::DELETE] {
        let (status, _, body) = send(&app, method, uri, Some("{}")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({ "ok": false, "error": "User is not found." }));
    }
}

#[tokio::test]
async fn test_unknown_id_wins_over_malformed_body() {
    let app = app();
    let (status, _, _) = send(
        &app,
        Method::PUT,
        "/api/users/b47d10c2-d4a4-435e-9958-958226eddf62",
        Some("String"),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_create_validation_errors() {
    let app = app();

    let cases = [
        (
            r#"{"age":54,"hobbies":["Books"]}"#,
            json!({ "username": "Field username is not provided." }),
        ),
        (
            r#"{"username":100,"age":54,"hobbies":["Books"]}"#,
            json!({ "username": "Field username is not a string." }),
        ),
        (
            r#"{"username":"Bob","hobbies":["Books"]}"#,
            json!({ "age": "Field age is not provided." }),
        ),
        (
            r#"{"username":"Bob","age":"54","hobbies":["Books"]}"#,
            json!({ "age": "Field age is not a number." }),
        ),
        (
            r#"{"username":"Bob","age":54}"#,
            json!({ "hobbies": "Field hobbies is not provided." }),
        ),
        (
            r#"{"username":"Bob","age":54,"hobbies":"Books"}"#,
            json!({ "hobbies": "Field hobbies is not an array." }),
        ),
    ];

    for (payload, errors) in cases {
        let (status, content_type, body) =
            send(&app, Method::POST, "/api/users", Some(payload)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", payload);
        assert_eq!(content_type.as_deref(), Some("application/json"));
        assert_eq!(
            body,
            json!({ "ok": false, "error": "Provided user is not valid.", "errors": errors })
        );
    }

    // Nothing was stored
    let (_, _, body) = send(&app, Method::GET, "/api/users", None).await;
    assert_eq!(body["data"]["users"], json!([]));
}

#[tokio::test]
async fn test_malformed_create_body_is_500() {
    let app = app();
    let (status, content_type, body) = send(&app, Method::POST, "/api/users", Some("String")).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(content_type.as_deref(), Some("application/json"));
    assert_eq!(body, json!({ "ok": false, "error": "Internal server error." }));
}

#[tokio::test]
async fn test_unknown_endpoints() {
    let app = app();

    for (method, uri) in [
        (Method::GET, "/"),
        (Method::GET, "/api"),
        (Method::GET, "/api/some-resource"),
        (Method::DELETE, "/api/users"),
        (Method::POST, "/api/users/b47d10c2-d4a4-435e-9958-958226eddf62"),
    ] {
        let (status, _, body) = send(&app, method, uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{}", uri);
        assert_eq!(
            body,
            json!({ "ok": false, "error": "Requested endpoint is not found." })
        );
    }
}

#[tokio::test]
async fn test_created_ids_are_unique() {
    let app = app();
    let mut ids = std::collections::HashSet::new();
    for _ in 0..20 {
        let user = create_bob(&app).await;
        assert!(ids.insert(user["id"].as_str().unwrap().to_string()));
    }

    let (_, _, body) = send(&app, Method::GET, "/api/users", None).await;
    assert_eq!(body["data"]["users"].as_array().unwrap().len(), 20);
}
