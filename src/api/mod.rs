//! HTTP surface.

pub mod chat;
pub mod health;

use axum::routing::{get, post};
use axum::Router;

use crate::AppState;

pub fn build_api_router() -> Router<AppState> {
    Router::new()
        .route("/healthz", get(health::healthz))
        .route("/v1/chat/completions", post(chat::chat_completions))
}
