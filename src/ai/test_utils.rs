//! Shared test utilities for the `ai` module.

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;

use crate::ai::{GeneratorMetadata, MessageGenerator};

/// Mock generator with a pre-programmed queue of responses.
///
/// Responses are consumed in request-issue order; once the queue is
/// exhausted, calls fall back to echoing `improved: <diff>`. The
/// scripted response is claimed when the request is issued (not when
/// its future first runs) so tests stay deterministic under concurrent
/// fan-out, where a failing sibling may cancel a future before it is
/// polled.
///
/// Every call records its diff; use [`call_handle`](Self::call_handle)
/// to inspect issued requests after the generator has been moved into
/// a [`MessageImprover`](crate::ai::MessageImprover), and
/// [`concurrency_handle`](Self::concurrency_handle) to observe how many
/// request futures were in flight simultaneously.
pub(crate) struct ScriptedGenerator {
    script: Mutex<VecDeque<Result<String>>>,
    calls: Arc<Mutex<Vec<String>>>,
    active: Arc<ActiveCounter>,
}

/// In-flight request counter with a high-water mark.
#[derive(Default)]
pub(crate) struct ActiveCounter {
    current: AtomicUsize,
    peak: AtomicUsize,
}

impl ActiveCounter {
    fn enter(&self) {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
    }

    fn exit(&self) {
        self.current.fetch_sub(1, Ordering::SeqCst);
    }
}

impl ScriptedGenerator {
    /// Creates a generator that echoes every diff back as a message.
    pub(crate) fn echoing() -> Self {
        Self::with_script(Vec::new())
    }

    /// Creates a generator that replays the given responses in order.
    pub(crate) fn with_script(responses: Vec<Result<String>>) -> Self {
        Self {
            script: Mutex::new(VecDeque::from(responses)),
            calls: Arc::new(Mutex::new(Vec::new())),
            active: Arc::new(ActiveCounter::default()),
        }
    }

    /// Returns a handle for inspecting issued requests.
    pub(crate) fn call_handle(&self) -> CallRecordHandle {
        CallRecordHandle {
            calls: self.calls.clone(),
        }
    }

    /// Returns a handle for inspecting request concurrency.
    pub(crate) fn concurrency_handle(&self) -> ConcurrencyHandle {
        ConcurrencyHandle {
            active: self.active.clone(),
        }
    }
}

/// Shared handle to a mock generator's recorded requests.
pub(crate) struct CallRecordHandle {
    calls: Arc<Mutex<Vec<String>>>,
}

#[allow(clippy::unwrap_used)]
impl CallRecordHandle {
    /// Returns the number of generation requests issued.
    pub(crate) fn count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Returns the diffs of all issued requests, in issue order.
    pub(crate) fn diffs(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

/// Shared handle to a mock generator's concurrency counter.
pub(crate) struct ConcurrencyHandle {
    active: Arc<ActiveCounter>,
}

impl ConcurrencyHandle {
    /// Returns the highest number of simultaneously pending requests.
    pub(crate) fn peak(&self) -> usize {
        self.active.peak.load(Ordering::SeqCst)
    }
}

#[allow(clippy::unwrap_used)]
impl MessageGenerator for ScriptedGenerator {
    fn generate<'a>(
        &'a self,
        diff: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<String>> + Send + 'a>> {
        self.calls.lock().unwrap().push(diff.to_string());
        let response = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(format!("improved: {diff}")));
        let active = self.active.clone();

        Box::pin(async move {
            active.enter();
            // Stay pending across one poll so fan-in tests can observe
            // genuine concurrency
            tokio::time::sleep(Duration::from_millis(5)).await;
            active.exit();
            response
        })
    }

    fn metadata(&self) -> GeneratorMetadata {
        GeneratorMetadata {
            provider: "Mock".to_string(),
            model: "scripted".to_string(),
        }
    }
}
