//! Focused-thread bookkeeping
//!
//! Pure state, no I/O: tracks which thread key currently receives UI
//! dispatch. The pointer always names a registered thread; the general
//! thread is never removed, so falling back to it is always safe.

use crate::core::types::GENERAL_THREAD_KEY;
use std::sync::RwLock;

/// At most one thread is focused at any time
pub struct ActiveThreadState {
    key: RwLock<String>,
}

impl ActiveThreadState {
    pub fn new() -> Self {
        Self {
            key: RwLock::new(GENERAL_THREAD_KEY.to_string()),
        }
    }

    /// Key of the currently focused thread
    pub fn current(&self) -> String {
        self.key.read().unwrap().clone()
    }

    /// Whether `key` is the focused thread
    pub fn is_active(&self, key: &str) -> bool {
        *self.key.read().unwrap() == key
    }

    /// Focus `key`; validation against the registry is the caller's job
    pub fn set(&self, key: impl Into<String>) {
        *self.key.write().unwrap() = key.into();
    }

    /// Reassign focus to the general-purpose thread
    pub fn reset_to_general(&self) {
        self.set(GENERAL_THREAD_KEY);
    }
}

impl Default for ActiveThreadState {
    fn default() -> Self {
        Self::new()
    }
}
