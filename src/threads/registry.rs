//! Thread registry - session lifecycle and persistence
//!
//! Handles:
//! - Thread creation (idempotent under concurrent invocation)
//! - Session construction with primary -> fallback factory chain
//! - History restoration from the store before a thread becomes visible
//! - Snapshot persistence after every successful exchange
//! - Reset, mode switches, and removal

use super::{ActiveThreadState, Thread};
use crate::core::errors::ThreadError;
use crate::core::prompts;
use crate::core::types::{
    AssistantEvent, ChatMessage, ThreadInfo, ThreadMode, GENERAL_THREAD_KEY,
};
use crate::llm::{Session, SessionFactory};
use crate::storage::{history_key, KeyValueStore};
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex};

/// Owns the mapping from thread key to live thread
///
/// All mutation of the thread set and of session state funnels through this
/// type so the invariants (one session per key, persistence after every
/// exchange) are enforced in one place.
pub struct ThreadRegistry {
    threads: DashMap<String, Arc<Thread>>,
    /// Per-key creation gates: a second concurrent `create_thread` (or a
    /// removal racing a creation) queues here instead of starting a
    /// duplicate session. Gates are retained for the registry's lifetime.
    creation_gates: DashMap<String, Arc<Mutex<()>>>,
    store: Arc<dyn KeyValueStore>,
    primary: Arc<dyn SessionFactory>,
    fallback: Arc<dyn SessionFactory>,
    active: Arc<ActiveThreadState>,
    events: broadcast::Sender<AssistantEvent>,
}

impl ThreadRegistry {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        primary: Arc<dyn SessionFactory>,
        fallback: Arc<dyn SessionFactory>,
        active: Arc<ActiveThreadState>,
        events: broadcast::Sender<AssistantEvent>,
    ) -> Self {
        Self {
            threads: DashMap::new(),
            creation_gates: DashMap::new(),
            store,
            primary,
            fallback,
            active,
            events,
        }
    }

    /// Create a thread for `key` if one does not exist yet
    ///
    /// Concurrent calls for the same key construct exactly one session; the
    /// later caller waits on the creation gate and then observes the first
    /// caller's thread. Any persisted history for `key` is loaded before the
    /// thread becomes visible to other callers.
    pub async fn create_thread(
        &self,
        key: &str,
        context: &str,
        title: &str,
    ) -> Result<(), ThreadError> {
        if self.threads.contains_key(key) {
            return Ok(());
        }

        let gate = self.creation_gate(key);
        let _guard = gate.lock().await;

        // A concurrent creation may have finished while we waited
        if self.threads.contains_key(key) {
            return Ok(());
        }

        let system_message = if key == GENERAL_THREAD_KEY {
            prompts::general_system_message()
        } else {
            prompts::document_system_message(title, context, ThreadMode::default())
        };

        let mut session = self.build_session(key, &system_message).await?;
        self.load_persisted_history(key, &mut session);

        self.threads
            .insert(key.to_string(), Arc::new(Thread::new(key, title, context, session)));

        tracing::info!(key, title, "thread created");
        self.emit_thread_list_changed();
        Ok(())
    }

    /// Fetch a thread by key
    pub fn get(&self, key: &str) -> Option<Arc<Thread>> {
        self.threads.get(key).map(|entry| entry.value().clone())
    }

    /// Whether a thread is registered under `key`
    pub fn contains(&self, key: &str) -> bool {
        self.threads.contains_key(key)
    }

    /// Remove a thread and its persisted history
    ///
    /// Queues behind any in-flight creation for the same key, so a removal
    /// racing a creation is applied after the creation completes. Absent
    /// keys are a no-op.
    pub async fn remove_thread(&self, key: &str) {
        let gate = self.creation_gate(key);
        let _guard = gate.lock().await;

        if self.threads.remove(key).is_none() {
            return;
        }

        if let Err(err) = self.store.remove(&history_key(key)) {
            tracing::warn!(key, error = %err, "failed to remove persisted history");
        }

        tracing::info!(key, "thread removed");
        self.emit_thread_list_changed();
    }

    /// Run one chat exchange on the thread and persist the result
    ///
    /// The persisted snapshot is written while the session lock is still
    /// held, so snapshots land in completion order per key. A store failure
    /// is logged and the exchange still succeeds.
    pub async fn send_message(&self, key: &str, prompt: &str) -> Result<String, ThreadError> {
        let thread = self
            .get(key)
            .ok_or_else(|| ThreadError::NotFound(key.to_string()))?;

        let mut session = thread.session.lock().await;
        let reply = session.chat(prompt).await?;
        self.persist_history(key, session.history());

        Ok(reply)
    }

    /// Clear a thread's history; the thread stays registered
    ///
    /// The persisted entry is overwritten with an empty sequence.
    pub async fn reset_thread(&self, key: &str) {
        let Some(thread) = self.get(key) else { return };

        let mut session = thread.session.lock().await;
        session.reset();
        self.persist_history(key, session.history());
    }

    /// Replace a thread's system message; history is untouched
    pub async fn set_system_message(&self, key: &str, text: &str) {
        let Some(thread) = self.get(key) else { return };
        thread.session.lock().await.set_system_message(text);
    }

    /// Switch a document thread's persona mode
    ///
    /// Rebuilds the system message from the retained document context; the
    /// conversation history is preserved. No-op for the general thread and
    /// for unknown keys.
    pub async fn set_thread_mode(&self, key: &str, mode: ThreadMode) {
        let Some(thread) = self.get(key) else { return };
        if thread.mode().is_none() {
            return;
        }

        thread.set_mode(mode);
        let system_message =
            prompts::document_system_message(thread.title(), thread.doc_context(), mode);
        thread.session.lock().await.set_system_message(&system_message);
        tracing::debug!(key, %mode, "thread mode switched");
    }

    /// Snapshots of all registered threads, ordered by key
    pub fn thread_infos(&self) -> Vec<ThreadInfo> {
        let mut infos: Vec<ThreadInfo> = self
            .threads
            .iter()
            .map(|entry| entry.value().info())
            .collect();
        infos.sort_by(|a, b| a.key.cmp(&b.key));
        infos
    }

    /// Read the persisted history snapshot for `key`
    pub fn persisted_history(&self, key: &str) -> Vec<ChatMessage> {
        match self.store.get(&history_key(key)) {
            Ok(Some(value)) => serde_json::from_value(value).unwrap_or_else(|err| {
                tracing::warn!(key, error = %err, "persisted history is malformed");
                Vec::new()
            }),
            Ok(None) => Vec::new(),
            Err(err) => {
                tracing::warn!(key, error = %err, "failed to read persisted history");
                Vec::new()
            }
        }
    }

    fn creation_gate(&self, key: &str) -> Arc<Mutex<()>> {
        self.creation_gates
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Try the provider-backed factory, then the direct fallback
    async fn build_session(&self, key: &str, system_message: &str) -> Result<Session, ThreadError> {
        match self.primary.create_session(system_message).await {
            Ok(session) => Ok(session),
            Err(primary_err) => {
                tracing::warn!(key, error = %primary_err, "primary session factory failed, using direct fallback");
                self.fallback
                    .create_session(system_message)
                    .await
                    .map_err(|fallback_err| ThreadError::CreationFailed {
                        key: key.to_string(),
                        reason: format!("primary: {primary_err}; fallback: {fallback_err}"),
                    })
            }
        }
    }

    fn load_persisted_history(&self, key: &str, session: &mut Session) {
        let history = self.persisted_history(key);
        if !history.is_empty() {
            tracing::debug!(key, messages = history.len(), "restored persisted history");
            session.set_history(history);
        }
    }

    fn persist_history(&self, key: &str, history: &[ChatMessage]) {
        let value = match serde_json::to_value(history) {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!(key, error = %err, "failed to serialize history");
                return;
            }
        };
        if let Err(err) = self.store.set(&history_key(key), &value) {
            tracing::warn!(key, error = %err, "failed to persist history");
        }
    }

    fn emit_thread_list_changed(&self) {
        let _ = self.events.send(AssistantEvent::ThreadListChanged {
            threads: self.thread_infos(),
            active_key: self.active.current(),
        });
    }
}
