use axum::extract::State;
use axum::Json;
use serde_json::json;

use crate::AppState;

pub async fn healthz(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "ok": true,
        "config_version": state.config.config_version,
    }))
}
