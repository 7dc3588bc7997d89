use std::sync::Arc;

use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
};

use crate::error::AppError;
use crate::state::AppState;

pub async fn metrics(State(state): State<Arc<AppState>>) -> Result<Response, AppError> {
    let collector = Arc::clone(&state.collector);
    let document = tokio::task::spawn_blocking(move || collector.collect()).await?;
    let body = serde_json::to_string_pretty(&document)?;

    Ok(([(header::CONTENT_TYPE, "application/json")], body).into_response())
}

pub async fn health() -> &'static str {
    "OK"
}
