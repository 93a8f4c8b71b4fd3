//! Request orchestration: admission policies, cache lookup, and the provider
//! fallback chain, with one audit event per attempt.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::json;
use uuid::Uuid;

use crate::audit::{now_ms, AuditEvent, AuditSink, AuditStatus};
use crate::cache::{fingerprint, ResponseCache};
use crate::config::Config;
use crate::context::RequestContext;
use crate::error::AppError;
use crate::policy::{resolve_budget, CostEstimator, RateLimiter, Redactor};
use crate::providers::types::{ChatCompletionRequest, ChatCompletionResponse};
use crate::providers::ProviderRegistry;

pub struct Gateway {
    config: Arc<Config>,
    registry: ProviderRegistry,
    limiter: Option<RateLimiter>,
    cache: Option<ResponseCache>,
    estimator: CostEstimator,
    redactor: Redactor,
    audit: AuditSink,
}

impl Gateway {
    pub fn new(
        config: Arc<Config>,
        registry: ProviderRegistry,
        audit: AuditSink,
    ) -> anyhow::Result<Self> {
        let redactor = Redactor::from_config(&config.redaction)
            .map_err(|e| anyhow::anyhow!("invalid redaction pattern: {e}"))?;
        let limiter = config
            .rate_limit
            .enabled
            .then(|| RateLimiter::new(config.rate_limit.refill_per_sec, config.rate_limit.capacity));
        let cache = config.cache.enabled.then(|| {
            ResponseCache::new(
                Duration::from_secs(config.cache.ttl_secs),
                config.cache.max_items,
            )
        });

        Ok(Self {
            config,
            registry,
            limiter,
            cache,
            estimator: CostEstimator::new(),
            redactor,
            audit,
        })
    }

    /// Serve one chat completion request end to end.
    pub async fn chat(
        &self,
        ctx: &RequestContext,
        request: ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse, AppError> {
        if request.messages.is_empty() {
            return Err(AppError::BadRequest("messages must not be empty".into()));
        }

        // Rate limit before anything else; a denied request spends no tokens.
        if let Some(limiter) = &self.limiter {
            let key = format!("{}:{}", ctx.tenant_id, ctx.route);
            if !limiter.allow(&key, 1.0) {
                self.audit_denial(ctx, &request, "rate_limit_exceeded");
                return Err(AppError::PolicyDenied {
                    reason: "rate_limit_exceeded".into(),
                    request_id: ctx.request_id.clone(),
                });
            }
        }

        let budget = resolve_budget(&self.config.budgets, &ctx.tenant_id, &ctx.route);

        if let Some(requested) = request.max_tokens {
            if requested > budget.effective_max_tokens {
                self.audit_denial(ctx, &request, "max_tokens_exceeds_budget");
                return Err(AppError::PolicyDenied {
                    reason: format!(
                        "max_tokens_exceeds_budget: requested {requested}, budget {}",
                        budget.effective_max_tokens
                    ),
                    request_id: ctx.request_id.clone(),
                });
            }
        }

        if self.config.policies.enabled {
            let prompt_chars: usize = request.messages.iter().map(|m| m.content.len()).sum();
            if prompt_chars > self.config.policies.max_prompt_chars {
                return Err(AppError::BadRequest(format!(
                    "prompt too large: {prompt_chars} chars exceeds limit {}",
                    self.config.policies.max_prompt_chars
                )));
            }
        }

        let chain = self
            .config
            .routes
            .get(&ctx.route)
            .map(|route| route.providers.as_slice())
            .filter(|providers| !providers.is_empty())
            .ok_or_else(|| AppError::BadRequest(format!("unknown route: {}", ctx.route)))?;

        let cache_key = self
            .cache
            .as_ref()
            .map(|_| fingerprint(&ctx.route, &request));
        if let (Some(cache), Some(key)) = (&self.cache, &cache_key) {
            if let Some(mut hit) = cache.get(key) {
                tracing::debug!(request_id = %ctx.request_id, "Cache hit");
                hit.request_id = ctx.request_id.clone();
                return Ok(hit);
            }
        }

        let effective_max_tokens = request.max_tokens.unwrap_or(budget.effective_max_tokens);
        let request_redacted = self.redacted_request_snapshot(&request);

        let mut last_error: Option<String> = None;

        for (index, provider_name) in chain.iter().enumerate() {
            let attempt = (index + 1) as u32;

            let Some(provider) = self.registry.get(provider_name) else {
                let message = format!("provider_not_configured: {provider_name}");
                tracing::warn!(
                    request_id = %ctx.request_id,
                    provider = %provider_name,
                    attempt,
                    "Chain names a provider with no configuration, skipping"
                );
                last_error = Some(message);
                continue;
            };

            let allowed = &self.config.routing.allowed_models;
            if !allowed.is_empty() && !allowed.iter().any(|m| m == provider.model()) {
                let message = format!("model_not_allowed: {}", provider.model());
                tracing::warn!(
                    request_id = %ctx.request_id,
                    provider = %provider_name,
                    model = %provider.model(),
                    attempt,
                    "Provider model is not on the allowlist, skipping"
                );
                last_error = Some(message);
                continue;
            }

            let started = Instant::now();
            let outcome = provider
                .invoke(&request.messages, request.temperature, effective_max_tokens)
                .await;
            let latency_ms = started.elapsed().as_millis() as u64;

            match outcome {
                Ok(result) => {
                    let cost = self.estimator.estimate(provider.model(), &result.usage);
                    if cost > budget.effective_max_cost_usd {
                        // Cost overrun is a hard stop: retrying elsewhere
                        // would just spend more.
                        let reason = format!(
                            "cost_budget_exceeded: estimated {cost:.6} USD, budget {:.6}",
                            budget.effective_max_cost_usd
                        );
                        self.audit.emit(self.attempt_event(
                            ctx,
                            provider.name(),
                            provider.model(),
                            attempt,
                            AuditStatus::Denied,
                            latency_ms,
                            request_redacted.clone(),
                            serde_json::Value::Null,
                            Some(reason.clone()),
                        ));
                        return Err(AppError::PolicyDenied {
                            reason,
                            request_id: ctx.request_id.clone(),
                        });
                    }

                    let response_redacted = json!({
                        "content": self.redactor.apply(&result.content),
                        "usage": result.usage,
                    });
                    self.audit.emit(self.attempt_event(
                        ctx,
                        provider.name(),
                        provider.model(),
                        attempt,
                        AuditStatus::Ok,
                        latency_ms,
                        request_redacted.clone(),
                        response_redacted,
                        None,
                    ));

                    let response = ChatCompletionResponse {
                        id: Uuid::new_v4().to_string(),
                        model: provider.model().to_string(),
                        provider: provider.name().to_string(),
                        request_id: ctx.request_id.clone(),
                        content: result.content,
                        usage: result.usage,
                        fallback_used: attempt > 1,
                    };

                    if let (Some(cache), Some(key)) = (&self.cache, cache_key) {
                        cache.set(key, response.clone());
                    }

                    tracing::info!(
                        request_id = %ctx.request_id,
                        provider = %response.provider,
                        attempt,
                        latency_ms,
                        cost_usd = cost,
                        "Completion served"
                    );
                    return Ok(response);
                }
                Err(error) => {
                    let message = error.to_string();
                    tracing::warn!(
                        request_id = %ctx.request_id,
                        provider = %provider_name,
                        attempt,
                        error = %message,
                        "Provider attempt failed"
                    );
                    self.audit.emit(self.attempt_event(
                        ctx,
                        provider.name(),
                        provider.model(),
                        attempt,
                        AuditStatus::Error,
                        latency_ms,
                        request_redacted.clone(),
                        serde_json::Value::Null,
                        Some(message.clone()),
                    ));
                    last_error = Some(message);
                }
            }
        }

        Err(AppError::Exhausted {
            last_error,
            request_id: ctx.request_id.clone(),
        })
    }

    fn redacted_request_snapshot(&self, request: &ChatCompletionRequest) -> serde_json::Value {
        json!({
            "messages": self.redactor.apply_messages(&request.messages),
            "temperature": request.temperature,
            "max_tokens": request.max_tokens,
            "metadata": request.metadata,
        })
    }

    /// A denial recorded before any provider was chosen: attempt 0, no
    /// provider attribution, zero latency.
    fn audit_denial(&self, ctx: &RequestContext, request: &ChatCompletionRequest, reason: &str) {
        self.audit.emit(self.attempt_event(
            ctx,
            "",
            "",
            0,
            AuditStatus::Denied,
            0,
            self.redacted_request_snapshot(request),
            serde_json::Value::Null,
            Some(reason.to_string()),
        ));
    }

    #[allow(clippy::too_many_arguments)]
    fn attempt_event(
        &self,
        ctx: &RequestContext,
        provider: &str,
        model: &str,
        attempt: u32,
        status: AuditStatus,
        latency_ms: u64,
        request_redacted: serde_json::Value,
        response_redacted: serde_json::Value,
        error: Option<String>,
    ) -> AuditEvent {
        AuditEvent {
            ts_ms: now_ms(),
            request_id: ctx.request_id.clone(),
            tenant_id: ctx.tenant_id.clone(),
            route: ctx.route.clone(),
            config_version: self.config.config_version.clone(),
            provider: provider.to_string(),
            model: model.to_string(),
            attempt,
            fallback_used: attempt > 1,
            status,
            latency_ms,
            request_redacted,
            response_redacted,
            error,
        }
    }
}
