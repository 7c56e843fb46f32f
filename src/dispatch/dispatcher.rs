// Chat request dispatcher
// Author: kelexine (https://github.com/kelexine)

use super::coalesce::{CallFailure, CallOutcome, InFlight};
use crate::backend::{BackendError, BackendErrorKind, GenerateOptions, GenerationBackend};
use crate::cache::{CachedResponse, PromptKey, ResponseCache};
use crate::config::{CacheConfig, DispatchConfig};
use crate::error::{ProxyError, Result};
use crate::models::chat::{ChatReply, ChatRequest};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Turns a chat request into a reply.
///
/// Per request: validate, look the prompt up in the response cache, and on a
/// miss call the backend (shared with any concurrent miss on the same key),
/// cache a successful answer and classify failures. Cheap to clone.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<Inner>,
}

struct Inner {
    backend: Arc<dyn GenerationBackend>,
    cache: Arc<ResponseCache>,
    in_flight: InFlight,
    cache_config: CacheConfig,
    config: DispatchConfig,
}

impl Dispatcher {
    pub fn new(
        backend: Arc<dyn GenerationBackend>,
        cache: Arc<ResponseCache>,
        cache_config: CacheConfig,
        config: DispatchConfig,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                backend,
                cache,
                in_flight: InFlight::new(),
                cache_config,
                config,
            }),
        }
    }

    /// The cache this dispatcher reads and fills.
    pub fn cache(&self) -> &Arc<ResponseCache> {
        &self.inner.cache
    }

    /// Number of upstream calls currently pending.
    pub fn in_flight(&self) -> usize {
        self.inner.in_flight.len()
    }

    /// Handle one chat request.
    ///
    /// Every failure comes back as a [`ProxyError`] that renders to a
    /// structured JSON body; nothing here panics on bad input.
    pub async fn dispatch(&self, request: ChatRequest) -> Result<ChatReply> {
        let message = validate(&request)?.to_string();
        let options = GenerateOptions {
            temperature: request.temperature,
            max_output_tokens: request.max_output_tokens,
            system_instruction: request.system_instruction,
        };

        let key = if self.inner.cache_config.scope_by_instruction {
            PromptKey::scoped(&message, &options)
        } else {
            PromptKey::new(&message)
        };

        if self.inner.cache_config.enabled {
            if let Some(hit) = self.inner.cache.lookup(&key) {
                return Ok(ChatReply {
                    text: hit.text,
                    cached: true,
                    fallback: false,
                });
            }
        }

        let outcome = if self.inner.cache_config.coalesce_requests {
            self.coalesced(key, message, options).await
        } else {
            self.inner.generate_and_store(&key, &message, &options).await
        };

        match outcome {
            Ok(text) => Ok(ChatReply {
                text,
                cached: false,
                fallback: false,
            }),
            Err(CallFailure::Backend(err)) => self.inner.classify(err),
            Err(CallFailure::Aborted(detail)) => Err(ProxyError::Internal(detail)),
        }
    }

    async fn coalesced(
        &self,
        key: PromptKey,
        message: String,
        options: GenerateOptions,
    ) -> CallOutcome {
        let inner = self.inner.clone();
        let call_key = key.clone();

        let (call, joined) = self.inner.in_flight.join_or_start(&key, move || async move {
            let outcome = inner.generate_and_store(&call_key, &message, &options).await;
            inner.in_flight.finish(&call_key);
            outcome
        });

        if joined {
            crate::metrics::record_cache_operation("coalesced");
        }

        let outcome = call.clone().await;
        // A task that died never reached its own `finish`
        if matches!(outcome, Err(CallFailure::Aborted(_))) {
            self.inner.in_flight.finish_call(&key, &call);
        }
        outcome
    }
}

impl Inner {
    /// Call the backend under the configured deadline and cache a success.
    async fn generate_and_store(
        &self,
        key: &PromptKey,
        message: &str,
        options: &GenerateOptions,
    ) -> CallOutcome {
        let backend_name = self.backend.name().to_string();
        let started = Instant::now();

        let result = match tokio::time::timeout(
            self.config.request_timeout(),
            self.backend.generate(message, options),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(BackendError::timeout(format!(
                "no response within {}s",
                self.config.request_timeout_seconds
            ))),
        };

        let elapsed = started.elapsed();
        let label = match &result {
            Ok(_) => "ok".to_string(),
            Err(e) => e.kind.to_string(),
        };
        crate::metrics::record_gemini_call(&backend_name, &label, elapsed.as_secs_f64());

        let text = result.map_err(CallFailure::Backend)?;
        info!(
            "Generated response for {} in {:?} ({} chars)",
            key,
            elapsed,
            text.len()
        );

        if self.cache_config.enabled {
            self.cache.insert(
                key.clone(),
                CachedResponse::fresh(text.clone()),
                self.cache_config.ttl(),
            );
        }

        Ok(text)
    }

    /// Map a backend failure to the reply the client sees.
    fn classify(&self, err: BackendError) -> Result<ChatReply> {
        match err.kind {
            BackendErrorKind::RateLimited { retry_after } => {
                warn!("Upstream rate limit: {}", err.message);
                Err(ProxyError::RateLimited {
                    retry_after: Some(retry_after.unwrap_or_else(|| self.config.retry_hint())),
                })
            }
            _ if self.config.fallback_enabled => {
                warn!("Backend failed, answering with fallback: {}", err);
                Ok(ChatReply {
                    text: self.config.fallback_message.clone(),
                    cached: false,
                    fallback: true,
                })
            }
            _ => Err(ProxyError::BackendUnavailable(err.to_string())),
        }
    }
}

/// Extract the message, rejecting requests without usable text.
fn validate(request: &ChatRequest) -> Result<&str> {
    match request.message.as_deref() {
        None => Err(ProxyError::Validation("Message is required".to_string())),
        Some(message) if message.trim().is_empty() => {
            debug!("Rejecting empty message");
            Err(ProxyError::Validation("Message must not be empty".to_string()))
        }
        Some(message) => Ok(message),
    }
}
