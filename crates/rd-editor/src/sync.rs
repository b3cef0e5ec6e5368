//! Echo suppression between the engine and an externally owned content
//! value.
//!
//! Every emitted serialization is recorded before listeners run. When the
//! owner later feeds a value back, a match against a recorded emission is
//! an echo of our own edit and must not reset the document. Anything else
//! is a genuine external change.

use std::collections::VecDeque;

/// Maximum number of unacknowledged emissions remembered.
pub const ECHO_CAPACITY: usize = 32;

/// What `receive_external` did with an incoming value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The value already matches the current document.
    Unchanged,
    /// The value is one of our own emissions coming back.
    Echo,
    /// The document was replaced from the value.
    Reset,
}

/// Bounded FIFO of emitted, not yet acknowledged contents.
#[derive(Debug, Default, Clone)]
pub struct EchoGuard {
    pending: VecDeque<String>,
}

impl EchoGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, content: &str) {
        self.pending.push_back(content.to_string());
        while self.pending.len() > ECHO_CAPACITY {
            self.pending.pop_front();
        }
    }

    /// If `value` was emitted, acknowledge it together with every older
    /// emission and return true.
    pub fn acknowledge(&mut self, value: &str) -> bool {
        match self.pending.iter().position(|c| c == value) {
            Some(at) => {
                self.pending.drain(..=at);
                true
            }
            None => false,
        }
    }

    pub fn last_emitted(&self) -> Option<&str> {
        self.pending.back().map(String::as_str)
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
