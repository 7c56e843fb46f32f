// Shared test fixtures
// Author: kelexine (https://github.com/kelexine)

#![allow(dead_code)]

use async_trait::async_trait;
use gemini_chat::backend::{BackendError, GenerateOptions, GenerationBackend};
use gemini_chat::cache::ResponseCache;
use gemini_chat::config::{CacheConfig, DispatchConfig};
use gemini_chat::dispatch::Dispatcher;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// In-process stand-in for the Gemini API.
///
/// Answers `echo: <prompt>` after an optional delay, or fails with the
/// configured error. Counts every call it receives.
#[derive(Default)]
pub struct FakeBackend {
    calls: AtomicUsize,
    delay: Option<Duration>,
    failure: Option<BackendError>,
    last_options: Mutex<Option<GenerateOptions>>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(error: BackendError) -> Self {
        Self {
            failure: Some(error),
            ..Default::default()
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_options(&self) -> Option<GenerateOptions> {
        self.last_options.lock().clone()
    }
}

#[async_trait]
impl GenerationBackend for FakeBackend {
    async fn generate(
        &self,
        prompt: &str,
        options: &GenerateOptions,
    ) -> Result<String, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_options.lock() = Some(options.clone());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        match &self.failure {
            Some(err) => Err(err.clone()),
            None => Ok(format!("echo: {}", prompt)),
        }
    }

    fn name(&self) -> &str {
        "fake"
    }
}

pub fn dispatcher_with(
    backend: Arc<FakeBackend>,
    cache_config: CacheConfig,
    dispatch_config: DispatchConfig,
) -> Dispatcher {
    Dispatcher::new(
        backend,
        Arc::new(ResponseCache::new()),
        cache_config,
        dispatch_config,
    )
}

pub fn dispatcher(backend: Arc<FakeBackend>) -> Dispatcher {
    dispatcher_with(backend, CacheConfig::default(), DispatchConfig::default())
}
