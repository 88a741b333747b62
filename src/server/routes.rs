//! Route handlers for the users API.
//!
//! This module contains the axum router and the CRUD handlers. Handlers read
//! the whole body before touching the store, and every store access happens
//! in one synchronous step, so a client disconnecting mid-request can never
//! leave a mutation half applied.

use axum::{
    Json, Router, async_trait,
    body::Bytes,
    extract::{FromRequestParts, Path, Request, State},
    http::{HeaderValue, StatusCode, header, request::Parts},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use crate::error::ApiError;
use crate::server::payload;
use crate::server::state::AppState;
use crate::store::{User, parse_user_id};

/// Successful response envelope: `{"ok": true, "data": ...}`.
#[derive(Serialize, Debug)]
pub struct ApiResponse<T> {
    pub ok: bool,
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn new(data: T) -> Self {
        Self { ok: true, data }
    }
}

#[derive(Serialize, Debug)]
pub struct UsersData {
    pub users: Vec<User>,
}

#[derive(Serialize, Debug)]
pub struct UserData {
    pub user: User,
}

type UserResponse = Json<ApiResponse<UserData>>;

/// User id taken from the request path.
///
/// Anything that is not a v4 UUID is rejected as an invalid id. That includes
/// an empty segment and segments that are not valid UTF-8 once decoded.
#[derive(Debug, Clone, Copy)]
pub struct UserId(pub Uuid);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for UserId {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw_id) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|_| ApiError::InvalidUserId)?;
        parse_user_id(&raw_id)
            .map(UserId)
            .ok_or(ApiError::InvalidUserId)
    }
}

fn user_response(user: User) -> UserResponse {
    Json(ApiResponse::new(UserData { user }))
}

/// `GET /api/users`
pub async fn list_users(State(state): State<AppState>) -> Json<ApiResponse<UsersData>> {
    let users = state.read(|store| store.snapshot());
    Json(ApiResponse::new(UsersData { users }))
}

/// `GET /api/users/{id}`
pub async fn get_user(
    State(state): State<AppState>,
    UserId(id): UserId,
) -> Result<UserResponse, ApiError> {
    state
        .read(|store| store.get(&id).cloned())
        .map(user_response)
        .ok_or(ApiError::UserNotFound)
}

/// `POST /api/users`
pub async fn create_user(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<(StatusCode, UserResponse), ApiError> {
    let new_user = payload::new_user(&body)?;
    let user = state.create(new_user);

    debug!("Created user {}", user.id);
    Ok((StatusCode::CREATED, user_response(user)))
}

/// `PUT /api/users/{id}`
///
/// Existence is checked before the body is parsed, so an unknown id wins over
/// a malformed body.
pub async fn update_user(
    State(state): State<AppState>,
    UserId(id): UserId,
    body: Bytes,
) -> Result<UserResponse, ApiError> {
    if state.read(|store| store.get(&id).is_none()) {
        return Err(ApiError::UserNotFound);
    }

    let patch = payload::user_patch(&body)?;
    let user = state
        .mutate(|store| store.update(&id, patch))
        .ok_or(ApiError::UserNotFound)?;

    debug!("Updated user {}", user.id);
    Ok(user_response(user))
}

/// `DELETE /api/users/{id}`
///
/// The empty 204 still carries the JSON content type of the rest of the API.
pub async fn delete_user(
    State(state): State<AppState>,
    UserId(id): UserId,
) -> Result<impl IntoResponse, ApiError> {
    state
        .mutate(|store| store.remove(&id))
        .ok_or(ApiError::UserNotFound)?;

    debug!("Deleted user {}", id);
    Ok((
        StatusCode::NO_CONTENT,
        [(header::CONTENT_TYPE, HeaderValue::from_static("application/json"))],
    ))
}

/// Any path or method outside the users API.
pub async fn endpoint_not_found() -> ApiError {
    ApiError::EndpointNotFound
}

async fn log_request(request: Request, next: Next) -> Response {
    debug!("{} {}", request.method(), request.uri());
    next.run(request).await
}

/// Creates the users API router.
///
/// The id route captures the rest of the path, so `/api/users/a/b` is reported
/// as an invalid id rather than an unknown endpoint. `/api/users/` shares its
/// handlers and fails id extraction the same way.
pub fn create_router(state: AppState) -> Router {
    let user_by_id = get(get_user)
        .put(update_user)
        .delete(delete_user)
        .fallback(endpoint_not_found);

    Router::new()
        .route(
            "/api/users",
            get(list_users).post(create_user).fallback(endpoint_not_found),
        )
        .route("/api/users/", user_by_id.clone())
        .route("/api/users/*id", user_by_id)
        .fallback(endpoint_not_found)
        .layer(middleware::from_fn(log_request))
        .with_state(state)
}
