//! Chat completions handler. Thin by intent: identity extraction and a call
//! into the gateway, which owns all policy and orchestration.

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;

use crate::context::RequestContext;
use crate::error::AppError;
use crate::providers::types::{ChatCompletionRequest, ChatCompletionResponse};
use crate::AppState;

pub async fn chat_completions(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<ChatCompletionRequest>,
) -> Result<Json<ChatCompletionResponse>, AppError> {
    let ctx = RequestContext::from_headers(&headers);
    tracing::info!(
        request_id = %ctx.request_id,
        tenant_id = %ctx.tenant_id,
        route = %ctx.route,
        messages = request.messages.len(),
        "Chat completion request"
    );
    let response = state.gateway.chat(&ctx, request).await?;
    Ok(Json(response))
}
