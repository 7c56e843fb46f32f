// Dispatcher behavior against an in-process backend
// Author: kelexine (https://github.com/kelexine)

mod common;

use common::{dispatcher, dispatcher_with, FakeBackend};
use futures::future::join_all;
use gemini_chat::backend::BackendError;
use gemini_chat::config::{CacheConfig, DispatchConfig};
use gemini_chat::error::{ProxyError, GENERIC_ERROR_MESSAGE, RATE_LIMIT_MESSAGE};
use gemini_chat::models::chat::ChatRequest;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

const RTT: Duration = Duration::from_millis(200);

#[tokio::test]
async fn test_missing_message_never_reaches_backend() {
    let backend = Arc::new(FakeBackend::new());
    let dispatcher = dispatcher(backend.clone());

    let err = dispatcher.dispatch(ChatRequest::default()).await.unwrap_err();
    assert!(matches!(err, ProxyError::Validation(_)));

    let err = dispatcher.dispatch(ChatRequest::new("   ")).await.unwrap_err();
    assert!(matches!(err, ProxyError::Validation(_)));

    assert_eq!(backend.calls(), 0);
}

#[tokio::test]
async fn test_repeated_message_is_served_from_cache() {
    let backend = Arc::new(FakeBackend::new());
    let dispatcher = dispatcher(backend.clone());

    let first = dispatcher.dispatch(ChatRequest::new("What is Rust?")).await.unwrap();
    assert!(!first.cached);
    assert_eq!(first.text, "echo: What is Rust?");

    let second = dispatcher.dispatch(ChatRequest::new("What is Rust?")).await.unwrap();
    assert!(second.cached);
    assert_eq!(second.text, first.text);

    assert_eq!(backend.calls(), 1);
}

#[tokio::test]
async fn test_normalized_variants_share_an_entry() {
    let backend = Arc::new(FakeBackend::new());
    let dispatcher = dispatcher(backend.clone());

    dispatcher.dispatch(ChatRequest::new("Hello")).await.unwrap();
    let reply = dispatcher.dispatch(ChatRequest::new("  hello\n")).await.unwrap();

    assert!(reply.cached);
    assert_eq!(reply.text, "echo: Hello");
    assert_eq!(backend.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_expired_entry_triggers_new_call() {
    let backend = Arc::new(FakeBackend::new());
    let cache = CacheConfig {
        ttl_seconds: 60,
        ..Default::default()
    };
    let dispatcher = dispatcher_with(backend.clone(), cache, DispatchConfig::default());

    dispatcher.dispatch(ChatRequest::new("ping")).await.unwrap();
    tokio::time::advance(Duration::from_secs(61)).await;

    let reply = dispatcher.dispatch(ChatRequest::new("ping")).await.unwrap();
    assert!(!reply.cached);
    assert_eq!(backend.calls(), 2);
}

#[tokio::test]
async fn test_rate_limit_maps_to_429_with_hint() {
    let backend = Arc::new(FakeBackend::failing(BackendError::rate_limited(
        Some(Duration::from_secs(42)),
        "HTTP 429: quota exceeded",
    )));
    let dispatcher = dispatcher(backend.clone());

    let err = dispatcher.dispatch(ChatRequest::new("hi")).await.unwrap_err();
    match &err {
        ProxyError::RateLimited { retry_after } => {
            assert_eq!(*retry_after, Some(Duration::from_secs(42)));
        }
        other => panic!("expected rate limit, got {:?}", other),
    }

    let body = err.to_body();
    assert_eq!(body.error, "Rate limit exceeded. Please try again in ~42 seconds.");
    assert_eq!(body.retry_after_seconds, Some(42));
}

#[tokio::test]
async fn test_rate_limit_without_upstream_hint_uses_configured_hint() {
    let backend = Arc::new(FakeBackend::failing(BackendError::rate_limited(
        None,
        "RESOURCE_EXHAUSTED",
    )));
    let dispatcher = dispatcher(backend);

    let err = dispatcher.dispatch(ChatRequest::new("hi")).await.unwrap_err();
    let body = err.to_body();
    assert_eq!(body.retry_after_seconds, Some(300));
    assert_eq!(body.error, RATE_LIMIT_MESSAGE);
}

#[tokio::test]
async fn test_failure_is_not_cached() {
    let backend = Arc::new(FakeBackend::failing(BackendError::unavailable("boom")));
    let dispatcher = dispatcher(backend.clone());

    assert!(dispatcher.dispatch(ChatRequest::new("hi")).await.is_err());
    assert!(dispatcher.dispatch(ChatRequest::new("hi")).await.is_err());

    assert_eq!(backend.calls(), 2);
    assert!(dispatcher.cache().is_empty());
}

#[tokio::test]
async fn test_generic_failure_hides_upstream_detail() {
    let backend = Arc::new(FakeBackend::failing(BackendError::unavailable(
        "network timeout contacting 10.0.0.7",
    )));
    let dispatcher = dispatcher(backend);

    let err = dispatcher.dispatch(ChatRequest::new("hi")).await.unwrap_err();
    assert!(matches!(err, ProxyError::BackendUnavailable(_)));

    let body = serde_json::to_string(&err.to_body()).unwrap();
    assert!(body.contains(GENERIC_ERROR_MESSAGE));
    assert!(!body.contains("network timeout"));
    assert!(!body.contains("10.0.0.7"));
}

#[tokio::test(start_paused = true)]
async fn test_slow_backend_times_out() {
    let backend = Arc::new(FakeBackend::new().with_delay(Duration::from_secs(120)));
    let dispatch = DispatchConfig {
        request_timeout_seconds: 5,
        ..Default::default()
    };
    let dispatcher = dispatcher_with(backend.clone(), CacheConfig::default(), dispatch);

    let started = Instant::now();
    let err = dispatcher.dispatch(ChatRequest::new("slow")).await.unwrap_err();

    assert!(matches!(err, ProxyError::BackendUnavailable(_)));
    assert!(started.elapsed() < Duration::from_secs(6));
    assert!(dispatcher.cache().is_empty());
}

#[tokio::test]
async fn test_fallback_reply_on_failure() {
    let backend = Arc::new(FakeBackend::failing(BackendError::unavailable("down")));
    let dispatch = DispatchConfig {
        fallback_enabled: true,
        fallback_message: "Try again soon.".to_string(),
        ..Default::default()
    };
    let dispatcher = dispatcher_with(backend, CacheConfig::default(), dispatch);

    let reply = dispatcher.dispatch(ChatRequest::new("hi")).await.unwrap();
    assert!(reply.fallback);
    assert!(!reply.cached);
    assert_eq!(reply.text, "Try again soon.");
    assert!(dispatcher.cache().is_empty());
}

#[tokio::test]
async fn test_fallback_does_not_mask_rate_limit() {
    let backend = Arc::new(FakeBackend::failing(BackendError::rate_limited(None, "429")));
    let dispatch = DispatchConfig {
        fallback_enabled: true,
        ..Default::default()
    };
    let dispatcher = dispatcher_with(backend, CacheConfig::default(), dispatch);

    let err = dispatcher.dispatch(ChatRequest::new("hi")).await.unwrap_err();
    assert!(matches!(err, ProxyError::RateLimited { .. }));
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_identical_requests_share_one_call() {
    let backend = Arc::new(FakeBackend::new().with_delay(RTT));
    let dispatcher = dispatcher(backend.clone());

    let requests = (0..8).map(|_| {
        let dispatcher = dispatcher.clone();
        tokio::spawn(async move { dispatcher.dispatch(ChatRequest::new("same question")).await })
    });
    let replies = join_all(requests).await;

    for reply in replies {
        let reply = reply.unwrap().unwrap();
        assert_eq!(reply.text, "echo: same question");
    }
    assert_eq!(backend.calls(), 1);
    assert_eq!(dispatcher.in_flight(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_failures_are_shared_too() {
    let backend = Arc::new(
        FakeBackend::failing(BackendError::unavailable("down")).with_delay(RTT),
    );
    let dispatcher = dispatcher(backend.clone());

    let requests = (0..4).map(|_| {
        let dispatcher = dispatcher.clone();
        tokio::spawn(async move { dispatcher.dispatch(ChatRequest::new("q")).await })
    });

    for reply in join_all(requests).await {
        assert!(reply.unwrap().is_err());
    }
    assert_eq!(backend.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_distinct_requests_run_in_parallel() {
    let backend = Arc::new(FakeBackend::new().with_delay(RTT));
    let dispatcher = dispatcher(backend.clone());

    let started = Instant::now();
    let requests = (0..10).map(|i| {
        let dispatcher = dispatcher.clone();
        tokio::spawn(async move { dispatcher.dispatch(ChatRequest::new(format!("q{}", i))).await })
    });
    for reply in join_all(requests).await {
        reply.unwrap().unwrap();
    }

    assert_eq!(backend.calls(), 10);
    assert!(started.elapsed() < RTT * 2);
}

#[tokio::test(start_paused = true)]
async fn test_coalescing_can_be_disabled() {
    let backend = Arc::new(FakeBackend::new().with_delay(RTT));
    let cache = CacheConfig {
        coalesce_requests: false,
        ..Default::default()
    };
    let dispatcher = dispatcher_with(backend.clone(), cache, DispatchConfig::default());

    let requests = (0..3).map(|_| {
        let dispatcher = dispatcher.clone();
        tokio::spawn(async move { dispatcher.dispatch(ChatRequest::new("same")).await })
    });
    for reply in join_all(requests).await {
        reply.unwrap().unwrap();
    }

    assert_eq!(backend.calls(), 3);
}

#[tokio::test]
async fn test_cache_disabled_always_calls_backend() {
    let backend = Arc::new(FakeBackend::new());
    let cache = CacheConfig {
        enabled: false,
        ..Default::default()
    };
    let dispatcher = dispatcher_with(backend.clone(), cache, DispatchConfig::default());

    dispatcher.dispatch(ChatRequest::new("hi")).await.unwrap();
    let reply = dispatcher.dispatch(ChatRequest::new("hi")).await.unwrap();

    assert!(!reply.cached);
    assert_eq!(backend.calls(), 2);
    assert!(dispatcher.cache().is_empty());
}

#[tokio::test]
async fn test_instruction_ignored_by_default_key() {
    let backend = Arc::new(FakeBackend::new());
    let dispatcher = dispatcher(backend.clone());

    dispatcher.dispatch(ChatRequest::new("hi")).await.unwrap();
    let mut request = ChatRequest::new("hi");
    request.system_instruction = Some("Answer like a pirate.".to_string());
    let reply = dispatcher.dispatch(request).await.unwrap();

    assert!(reply.cached);
    assert_eq!(backend.calls(), 1);
}

#[tokio::test]
async fn test_scoped_keys_separate_instructions() {
    let backend = Arc::new(FakeBackend::new());
    let cache = CacheConfig {
        scope_by_instruction: true,
        ..Default::default()
    };
    let dispatcher = dispatcher_with(backend.clone(), cache, DispatchConfig::default());

    dispatcher.dispatch(ChatRequest::new("hi")).await.unwrap();
    let mut request = ChatRequest::new("hi");
    request.system_instruction = Some("Answer like a pirate.".to_string());
    let reply = dispatcher.dispatch(request.clone()).await.unwrap();
    assert!(!reply.cached);

    let again = dispatcher.dispatch(request).await.unwrap();
    assert!(again.cached);
    assert_eq!(backend.calls(), 2);
}

#[tokio::test]
async fn test_overrides_are_passed_to_backend() {
    let backend = Arc::new(FakeBackend::new());
    let dispatcher = dispatcher(backend.clone());

    let mut request = ChatRequest::new("hi");
    request.temperature = Some(0.3);
    request.max_output_tokens = Some(64);
    dispatcher.dispatch(request).await.unwrap();

    let options = backend.last_options().unwrap();
    assert_eq!(options.temperature, Some(0.3));
    assert_eq!(options.max_output_tokens, Some(64));
    assert_eq!(options.system_instruction, None);
}

struct PanicOnce {
    calls: std::sync::atomic::AtomicUsize,
}

#[async_trait::async_trait]
impl gemini_chat::backend::GenerationBackend for PanicOnce {
    async fn generate(
        &self,
        prompt: &str,
        _options: &gemini_chat::backend::GenerateOptions,
    ) -> Result<String, BackendError> {
        let call = self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        if call == 0 {
            panic!("backend bug");
        }
        Ok(format!("echo: {}", prompt))
    }
}

#[tokio::test]
async fn test_panicked_call_does_not_wedge_the_key() {
    let backend = Arc::new(PanicOnce {
        calls: std::sync::atomic::AtomicUsize::new(0),
    });
    let dispatcher = gemini_chat::dispatch::Dispatcher::new(
        backend,
        Arc::new(gemini_chat::cache::ResponseCache::new()),
        CacheConfig::default(),
        DispatchConfig::default(),
    );

    let err = dispatcher.dispatch(ChatRequest::new("hi")).await.unwrap_err();
    assert!(matches!(err, ProxyError::Internal(_)));
    assert_eq!(dispatcher.in_flight(), 0);

    let reply = dispatcher.dispatch(ChatRequest::new("hi")).await.unwrap();
    assert_eq!(reply.text, "echo: hi");
}

#[tokio::test]
async fn test_unbounded_ttl_is_cached_not_fatal() {
    for coalesce_requests in [true, false] {
        let backend = Arc::new(FakeBackend::new());
        let cache = CacheConfig {
            ttl_seconds: u64::MAX,
            coalesce_requests,
            ..Default::default()
        };
        let dispatcher = dispatcher_with(backend.clone(), cache, DispatchConfig::default());

        let first = dispatcher.dispatch(ChatRequest::new("hi")).await.unwrap();
        assert!(!first.cached);
        let second = dispatcher.dispatch(ChatRequest::new("hi")).await.unwrap();
        assert!(second.cached);
        assert_eq!(backend.calls(), 1);
    }
}
