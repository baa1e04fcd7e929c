//! Route handlers

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use dispatcher::Fanouter;
use tracing::error;

pub async fn index() -> Json<&'static str> {
    Json("go to /feeds/{id}")
}

pub async fn missing_feed() -> (StatusCode, &'static str) {
    (StatusCode::BAD_REQUEST, "feed id is required")
}

pub async fn trigger(
    State(fanouter): State<Arc<Fanouter>>,
    Path(id): Path<String>,
) -> Response {
    match fanouter.fanout(&id).await {
        Ok(()) => Json("query send").into_response(),
        Err(e) if e.is_not_found() => (StatusCode::BAD_REQUEST, e.to_string()).into_response(),
        Err(e) => {
            error!(feed = %id, error = %e, "fanout failed");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}
