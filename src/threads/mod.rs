//! Thread coordination: registry, lifecycle, and active-thread tracking
//!
//! A thread is an independent conversational context bound to one document
//! (or the general-purpose context). The registry is the single source of
//! truth for which threads exist; the lifecycle watcher keeps it consistent
//! with the editor's document set.

pub mod active;
pub mod lifecycle;
pub mod registry;

pub use active::ActiveThreadState;
pub use lifecycle::DocumentLifecycle;
pub use registry::ThreadRegistry;

use crate::core::types::{ChatMessage, ThreadInfo, ThreadMode, GENERAL_THREAD_KEY};
use crate::llm::Session;
use std::sync::Mutex as StdMutex;
use tokio::sync::Mutex;

/// One conversational context and its metadata
///
/// The session mutex is held across an entire exchange, mutation and
/// persistence included, which is what serializes snapshot writes per key.
pub struct Thread {
    key: String,
    title: String,
    /// Document text captured at creation; mode switches rebuild the
    /// system message from it
    doc_context: String,
    /// Persona mode; `None` for the general thread, which has no modes
    mode: StdMutex<Option<ThreadMode>>,
    pub(crate) session: Mutex<Session>,
}

impl Thread {
    pub(crate) fn new(
        key: impl Into<String>,
        title: impl Into<String>,
        doc_context: impl Into<String>,
        session: Session,
    ) -> Self {
        let key = key.into();
        let mode = if key == GENERAL_THREAD_KEY {
            None
        } else {
            Some(ThreadMode::default())
        };
        Self {
            key,
            title: title.into(),
            doc_context: doc_context.into(),
            mode: StdMutex::new(mode),
            session: Mutex::new(session),
        }
    }

    /// Thread key (document URI, or the general key)
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Display title
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Document text this thread was created with
    pub fn doc_context(&self) -> &str {
        &self.doc_context
    }

    /// Current persona mode; `None` for the general thread
    pub fn mode(&self) -> Option<ThreadMode> {
        *self.mode.lock().unwrap()
    }

    pub(crate) fn set_mode(&self, mode: ThreadMode) {
        let mut slot = self.mode.lock().unwrap();
        if slot.is_some() {
            *slot = Some(mode);
        }
    }

    /// Snapshot for listings and notifications
    pub fn info(&self) -> ThreadInfo {
        ThreadInfo {
            key: self.key.clone(),
            title: self.title.clone(),
            mode: self.mode(),
        }
    }

    /// Copy of the current message history
    pub async fn history(&self) -> Vec<ChatMessage> {
        self.session.lock().await.history().to_vec()
    }
}
