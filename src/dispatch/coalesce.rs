// In-flight request coalescing
// Author: kelexine (https://github.com/kelexine)
//
// Concurrent cache misses on one prompt key share a single upstream call.
// The call runs as its own task, so it finishes (and fills the cache) even
// if every request that was waiting on it goes away.

use crate::backend::BackendError;
use crate::cache::PromptKey;
use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::future::Future;
use tracing::{debug, error};

/// Why a shared call produced no text.
#[derive(Debug, Clone)]
pub enum CallFailure {
    Backend(BackendError),
    /// The generation task died without an outcome.
    Aborted(String),
}

pub type CallOutcome = Result<String, CallFailure>;

pub type SharedCall = Shared<BoxFuture<'static, CallOutcome>>;

/// Pending upstream calls keyed by prompt.
#[derive(Default)]
pub struct InFlight {
    calls: Mutex<HashMap<PromptKey, SharedCall>>,
}

impl InFlight {
    pub fn new() -> Self {
        Self::default()
    }

    /// Join the pending call for `key`, or spawn `start()` as the new one.
    ///
    /// Returns the shared call and whether an existing call was joined. The
    /// spawned future must call [`InFlight::finish`] for `key` once its
    /// outcome is settled.
    pub fn join_or_start<F, Fut>(&self, key: &PromptKey, start: F) -> (SharedCall, bool)
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = CallOutcome> + Send + 'static,
    {
        let mut calls = self.calls.lock();
        if let Some(call) = calls.get(key) {
            debug!("Joining in-flight call for {}", key);
            return (call.clone(), true);
        }

        let handle = tokio::spawn(start());
        let call = async move {
            handle.await.unwrap_or_else(|e| {
                error!("Generation task failed: {}", e);
                Err(CallFailure::Aborted(e.to_string()))
            })
        }
        .boxed()
        .shared();

        calls.insert(key.clone(), call.clone());
        (call, false)
    }

    /// Forget the pending call for `key`.
    pub fn finish(&self, key: &PromptKey) {
        self.calls.lock().remove(key);
    }

    /// Forget `call` if it is still the pending call for `key`. A newer call
    /// started under the same key is left alone.
    pub fn finish_call(&self, key: &PromptKey, call: &SharedCall) {
        let mut calls = self.calls.lock();
        if calls.get(key).is_some_and(|current| current.ptr_eq(call)) {
            calls.remove(key);
        }
    }

    /// Number of calls currently pending.
    pub fn len(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.lock().is_empty()
    }
}
