//! Test utilities and mock backends for pipeline testing
//!
//! [`MockBackend`] plays back a queue of scripted calls so tests can hold a
//! job "in flight" behind a gate, emit progress ticks, fail, or ignore
//! cancellation entirely, without decoding any real image.

use crate::{
    config::RemovalConfig,
    error::{Result, StudioError},
    inference::RemovalBackend,
    services::progress::ProgressCallback,
    types::{Blob, LoadedImage},
};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::sync::{watch, Notify};
use tokio_util::sync::CancellationToken;

/// Script for a single `remove_background` call
#[derive(Debug, Clone)]
pub struct MockCall {
    ticks: Vec<(u64, u64)>,
    gate: Option<Arc<Notify>>,
    late_ticks: Vec<(u64, u64)>,
    honour_cancel: bool,
    failure: Option<String>,
    output: Vec<u8>,
}

impl Default for MockCall {
    fn default() -> Self {
        Self {
            ticks: Vec::new(),
            gate: None,
            late_ticks: Vec::new(),
            honour_cancel: false,
            failure: None,
            output: b"mock-result".to_vec(),
        }
    }
}

impl MockCall {
    #[must_use]
    pub fn succeed(output: &[u8]) -> Self {
        Self {
            output: output.to_vec(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn fail(message: &str) -> Self {
        Self {
            failure: Some(message.to_string()),
            ..Self::default()
        }
    }

    /// Block the call until the returned gate is notified
    #[must_use]
    pub fn gated(mut self) -> (Self, Arc<Notify>) {
        let gate = Arc::new(Notify::new());
        self.gate = Some(Arc::clone(&gate));
        (self, gate)
    }

    /// Ticks emitted before waiting on the gate
    #[must_use]
    pub fn with_ticks(mut self, ticks: &[(u64, u64)]) -> Self {
        self.ticks = ticks.to_vec();
        self
    }

    /// Ticks emitted after the gate opens
    #[must_use]
    pub fn with_late_ticks(mut self, ticks: &[(u64, u64)]) -> Self {
        self.late_ticks = ticks.to_vec();
        self
    }

    /// Return `Cancelled` as soon as the token fires while gated
    #[must_use]
    pub fn honouring_cancel(mut self) -> Self {
        self.honour_cancel = true;
        self
    }
}

/// Backend that plays back [`MockCall`] scripts in order
pub struct MockBackend {
    calls: Mutex<VecDeque<MockCall>>,
    started: watch::Sender<usize>,
    seen_models: Mutex<Vec<String>>,
}

impl MockBackend {
    #[must_use]
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(VecDeque::new()),
            started: watch::Sender::new(0),
            seen_models: Mutex::new(Vec::new()),
        }
    }

    /// Queue a script; calls beyond the queue succeed immediately
    #[must_use]
    pub fn with_call(self, call: MockCall) -> Self {
        self.calls.lock().unwrap().push_back(call);
        self
    }

    pub fn started(&self) -> usize {
        *self.started.borrow()
    }

    /// Resolve once at least `count` calls have started
    pub async fn wait_started(&self, count: usize) {
        let mut rx = self.started.subscribe();
        let _ = rx.wait_for(|started| *started >= count).await;
    }

    /// Model names passed in the removal config, one per call
    pub fn seen_models(&self) -> Vec<String> {
        self.seen_models.lock().unwrap().clone()
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RemovalBackend for MockBackend {
    fn name(&self) -> &str {
        "mock"
    }

    async fn remove_background(
        &self,
        _image: &LoadedImage,
        config: &RemovalConfig,
        progress: &dyn ProgressCallback,
        cancel: &CancellationToken,
    ) -> Result<Blob> {
        let call = self.calls.lock().unwrap().pop_front().unwrap_or_default();
        self.seen_models
            .lock()
            .unwrap()
            .push(config.model.as_str().to_string());

        for (current, total) in &call.ticks {
            progress.on_progress("compute:inference", *current, *total);
        }

        self.started.send_modify(|started| *started += 1);
        if let Some(gate) = &call.gate {
            if call.honour_cancel {
                tokio::select! {
                    () = gate.notified() => {},
                    () = cancel.cancelled() => return Err(StudioError::Cancelled),
                }
            } else {
                gate.notified().await;
            }
        }

        for (current, total) in &call.late_ticks {
            progress.on_progress("compute:inference", *current, *total);
        }

        match call.failure {
            Some(message) => Err(StudioError::processing(message)),
            None => Ok(Blob::new(config.output_format.mime_type(), call.output)),
        }
    }
}
