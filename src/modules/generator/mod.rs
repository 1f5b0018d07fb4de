pub mod models;
pub mod prompt;
pub mod upstream;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use axum::{
    extract::{rejection::JsonRejection, State},
    middleware,
    routing::post,
    Json, Router,
};
use blogsmith_http::{
    error::AppError,
    middleware::{enforce_rate_limit, RateLimitState},
};
use blogsmith_kernel::{settings::Settings, InitCtx, Module};
use blogsmith_ratelimit::FixedWindowLimiter;
use tokio::task::JoinHandle;

use models::{GenerationPayload, GenerationResult};
use upstream::{CompletionProvider, OpenRouterClient};

/// Client-facing message for every upstream failure.
pub const GENERATION_FAILED_MESSAGE: &str = "Failed to generate blog post";

/// Handler state: the provider and the model to ask for.
#[derive(Clone)]
pub struct GeneratorState {
    provider: Arc<dyn CompletionProvider>,
    model: String,
}

/// Blog post generation: `POST /generate`, rate limited per client.
pub struct GeneratorModule {
    state: GeneratorState,
    rate_limit: RateLimitState,
    purge_task: Mutex<Option<JoinHandle<()>>>,
}

impl GeneratorModule {
    pub fn new(
        provider: Arc<dyn CompletionProvider>,
        limiter: Arc<FixedWindowLimiter>,
        settings: &Settings,
    ) -> Self {
        Self {
            state: GeneratorState {
                provider,
                model: settings.upstream.model.clone(),
            },
            rate_limit: RateLimitState::new(limiter, settings.server.trusted_proxy_hops),
            purge_task: Mutex::new(None),
        }
    }

    /// Production wiring: OpenRouter client and a system-clock limiter.
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let provider = OpenRouterClient::new(&settings.upstream)
            .context("failed to create completion client")?;
        let limiter = FixedWindowLimiter::new(
            Duration::from_secs(settings.rate_limit.window_secs),
            settings.rate_limit.max_requests,
        )
        .context("invalid rate limit settings")?;

        Ok(Self::new(Arc::new(provider), Arc::new(limiter), settings))
    }
}

#[async_trait]
impl Module for GeneratorModule {
    fn name(&self) -> &'static str {
        "generator"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        if ctx.settings.upstream.api_key().is_none() {
            tracing::warn!(
                module = self.name(),
                "OPENROUTER_API_KEY is not set; generation requests will fail"
            );
        }

        tracing::info!(
            module = self.name(),
            model = %self.state.model,
            window_secs = ctx.settings.rate_limit.window_secs,
            max_requests = ctx.settings.rate_limit.max_requests,
            "generator module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        Router::new()
            .route("/generate", post(generate))
            .route_layer(middleware::from_fn_with_state(
                self.rate_limit.clone(),
                enforce_rate_limit,
            ))
            .with_state(self.state.clone())
    }

    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        let limiter = self.rate_limit.limiter().clone();
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(limiter.window());
            // The first tick completes immediately.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let removed = limiter.purge_expired();
                if removed > 0 {
                    tracing::debug!(removed, "purged expired rate limit windows");
                }
            }
        });

        let mut slot = self.purge_task.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(previous) = slot.replace(handle) {
            previous.abort();
        }

        tracing::info!(module = self.name(), "generator module started");
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        let handle = self
            .purge_task
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(handle) = handle {
            handle.abort();
        }

        tracing::info!(module = self.name(), "generator module stopped");
        Ok(())
    }
}

/// Generate a blog post for the given topic, tone and word count
#[tracing::instrument(skip_all)]
async fn generate(
    State(state): State<GeneratorState>,
    payload: Result<Json<GenerationPayload>, JsonRejection>,
) -> Result<Json<GenerationResult>, AppError> {
    let Json(payload) = payload?;
    let request = payload
        .validate()
        .map_err(|details| AppError::validation(details, "invalid generation request"))?;

    tracing::info!(tone = %request.tone, count = request.count, "generating blog post");

    let chat_request = prompt::build_chat_request(&request, &state.model);
    let response = state
        .provider
        .complete(&chat_request)
        .await
        .map_err(|e| AppError::upstream(GENERATION_FAILED_MESSAGE, e))?;

    let result = GenerationResult::from_response(&response);
    if result.notice.is_some() {
        tracing::warn!("completion provider returned no text; sending fallback");
    }

    Ok(Json(result))
}
