//! Simulation provider - scripted chat backend for testing
//!
//! No API key or network required. Supports:
//! - Echo replies (default) and scripted reply queues
//! - Failure injection (always fail, fail N times then recover)
//! - Configurable per-call delay to widen concurrency windows in tests
//! - Capture of the last system message and full call count for assertions

#![allow(dead_code)]

use super::{BackendError, ChatProvider};
use crate::core::types::ChatMessage;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Behavior of the simulated backend
enum SimBehavior {
    /// Reply with a formatted echo of the last prompt
    Echo,
    /// Pop scripted replies in order; fail once exhausted
    Scripted(Mutex<VecDeque<String>>),
    /// Fail every call
    AlwaysFail(String),
    /// Fail the first N calls, then echo
    FailTimes(AtomicUsize, String),
}

/// Scripted chat provider
pub struct SimProvider {
    behavior: SimBehavior,
    delay: Option<Duration>,
    calls: AtomicUsize,
    last_system_message: Mutex<Option<String>>,
}

impl SimProvider {
    /// Provider that echoes the last prompt
    pub fn echo() -> Self {
        Self::with_behavior(SimBehavior::Echo)
    }

    /// Provider that replies with the given strings in order
    pub fn scripted(replies: impl IntoIterator<Item = impl Into<String>>) -> Self {
        let queue = replies.into_iter().map(Into::into).collect();
        Self::with_behavior(SimBehavior::Scripted(Mutex::new(queue)))
    }

    /// Provider that fails every call
    pub fn failing(message: impl Into<String>) -> Self {
        Self::with_behavior(SimBehavior::AlwaysFail(message.into()))
    }

    /// Provider that fails the first `n` calls, then echoes
    pub fn failing_times(n: usize, message: impl Into<String>) -> Self {
        Self::with_behavior(SimBehavior::FailTimes(AtomicUsize::new(n), message.into()))
    }

    /// Add an artificial delay before each reply
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of `complete` calls received so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// The system message seen by the most recent call
    pub fn last_system_message(&self) -> Option<String> {
        self.last_system_message.lock().unwrap().clone()
    }

    fn with_behavior(behavior: SimBehavior) -> Self {
        Self {
            behavior,
            delay: None,
            calls: AtomicUsize::new(0),
            last_system_message: Mutex::new(None),
        }
    }
}

#[async_trait]
impl ChatProvider for SimProvider {
    fn name(&self) -> &str {
        "sim"
    }

    async fn complete(
        &self,
        system_message: &str,
        history: &[ChatMessage],
    ) -> Result<String, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_system_message.lock().unwrap() = Some(system_message.to_string());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let prompt = history.last().map(|m| m.text.as_str()).unwrap_or_default();

        match &self.behavior {
            SimBehavior::Echo => Ok(format!("sim: {prompt}")),
            SimBehavior::Scripted(queue) => queue
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| BackendError::Unavailable("script exhausted".to_string())),
            SimBehavior::AlwaysFail(message) => {
                Err(BackendError::Unavailable(message.clone()))
            }
            SimBehavior::FailTimes(remaining, message) => {
                let prev = remaining
                    .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                        Some(n.saturating_sub(1))
                    })
                    .unwrap_or(0);
                if prev > 0 {
                    Err(BackendError::Unavailable(message.clone()))
                } else {
                    Ok(format!("sim: {prompt}"))
                }
            }
        }
    }
}
