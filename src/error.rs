//! Error types for every layer of the service.
//!
//! Request-level errors (`ApiError`, `ProxyError`) are turned into HTTP
//! responses where they are detected and never escape a request. Only
//! `ClusterError` propagates, and only during startup.

use std::collections::BTreeMap;
use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use axum::Json;
use axum::http::StatusCode;
use axum::http::uri::InvalidUri;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

/// Per-field validation messages, keyed by field name.
pub type FieldErrors = BTreeMap<&'static str, String>;

/// Failures of the user CRUD handlers.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Provided userId is not valid.")]
    InvalidUserId,

    #[error("User is not found.")]
    UserNotFound,

    #[error("Provided user is not valid.")]
    InvalidUser(FieldErrors),

    /// The body could not be read as a JSON object. Reported as 500 rather
    /// than 400 to keep the status clients of this API already rely on.
    #[error("Internal server error.")]
    MalformedBody(String),

    #[error("Requested endpoint is not found.")]
    EndpointNotFound,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidUserId | ApiError::InvalidUser(_) => StatusCode::BAD_REQUEST,
            ApiError::UserNotFound | ApiError::EndpointNotFound => StatusCode::NOT_FOUND,
            ApiError::MalformedBody(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Wire form of a failed response: `{"ok": false, "error": ..., "errors"?: ...}`.
#[derive(Serialize)]
struct ErrorBody {
    ok: bool,
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    errors: Option<FieldErrors>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error = self.to_string();

        let errors = match self {
            ApiError::InvalidUser(errors) => Some(errors),
            ApiError::MalformedBody(detail) => {
                debug!("Rejecting malformed body: {}", detail);
                None
            }
            _ => None,
        };

        (
            status,
            Json(ErrorBody {
                ok: false,
                error,
                errors,
            }),
        )
            .into_response()
    }
}

/// Failures of the coordinator while forwarding a request to a worker.
#[derive(Error, Debug)]
pub enum ProxyError {
    #[error("No workers are registered")]
    NoWorkers,

    #[error("Request body exceeds {limit} bytes")]
    PayloadTooLarge { limit: usize },

    #[error("Invalid upstream URI: {0}")]
    InvalidUri(#[from] InvalidUri),

    #[error("Worker at {upstream} is unreachable: {source}")]
    Unreachable {
        upstream: SocketAddr,
        #[source]
        source: hyper_util::client::legacy::Error,
    },

    #[error("Worker at {upstream} did not respond within {timeout:?}")]
    Timeout {
        upstream: SocketAddr,
        timeout: Duration,
    },
}

impl ProxyError {
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::NoWorkers => StatusCode::SERVICE_UNAVAILABLE,
            ProxyError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            ProxyError::InvalidUri(_) => StatusCode::BAD_REQUEST,
            ProxyError::Unreachable { .. } => StatusCode::BAD_GATEWAY,
            ProxyError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        warn!("Proxy error: {}", self);
        (self.status(), self.to_string()).into_response()
    }
}

/// Failures while bringing the coordinator or a worker up.
#[derive(Error, Debug)]
pub enum ClusterError {
    #[error("Worker count must be at least 1")]
    NoWorkers,

    #[error("Worker ports starting at {base} overflow for {count} workers")]
    PortRange { base: u16, count: usize },

    #[error("Cannot locate the current executable: {0}")]
    CurrentExe(#[source] io::Error),

    #[error("Failed to spawn worker {index} on port {port}: {source}")]
    Spawn {
        index: usize,
        port: u16,
        #[source]
        source: io::Error,
    },

    #[error("Worker {index} has no {pipe} pipe")]
    MissingPipe { index: usize, pipe: &'static str },

    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    #[error("Server error: {0}")]
    Serve(#[source] io::Error),
}
