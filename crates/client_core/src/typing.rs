use std::time::Duration;

use tokio::time::Instant;

#[derive(Debug, Clone)]
pub struct TypingDebouncer {
    window: Duration,
    deadline: Option<Instant>,
}

impl TypingDebouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            deadline: None,
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn is_typing(&self) -> bool {
        self.deadline.is_some()
    }

    /// Returns `true` when this keystroke starts a typing run.
    pub fn keystroke(&mut self, now: Instant) -> bool {
        let started = self.deadline.is_none();
        self.deadline = Some(now + self.window);
        started
    }

    /// Returns `true` when the run ended at or before `now`.
    pub fn expire(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }

    /// Ends a run early (message sent, conversation left). Returns `true` if
    /// a run was in progress.
    pub fn stop(&mut self) -> bool {
        self.deadline.take().is_some()
    }
}

#[cfg(test)]
#[path = "tests/typing_tests.rs"]
mod tests;
