//! Conversation state machine and prompt assembly.
//!
//! ```text
//!            submit(query)              reply(content)
//!   Idle ───────────────────▶ AwaitingReply ─────────────▶ Idle
//!    │                            │
//!    │ terminate()                │ abort()  (completion failed)
//!    ▼                            ▼
//!  Terminated                    Idle, history unchanged
//! ```
//!
//! The history is an append-only log owned by the [`Conversation`]. A
//! query is only committed (user + assistant messages appended together)
//! once its reply arrives, so a failed completion leaves the history
//! exactly as it was.
//!
//! The outbound prompt for a query is
//! `system + turn_system + window(history, N) + [user query]`, where the
//! system messages are fixed at construction and `turn_system` is an
//! optional per-query block (e.g. retrieved context).

use crate::error::{ChatError, Result};
use crate::models::{Message, Role};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    AwaitingReply,
    Terminated,
}

#[derive(Debug, Clone)]
pub struct Conversation {
    system: Vec<Message>,
    history: Vec<Message>,
    window: usize,
    pending: Option<Message>,
    state: SessionState,
}

impl Conversation {
    /// `system` is computed once per session; `window` is how many of the
    /// most recent history messages go into each prompt.
    pub fn new(system: Vec<Message>, window: usize) -> Self {
        Self {
            system,
            history: Vec::new(),
            window,
            pending: None,
            state: SessionState::Idle,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn system_messages(&self) -> &[Message] {
        &self.system
    }

    pub fn history(&self) -> &[Message] {
        &self.history
    }

    pub fn window(&self) -> usize {
        self.window
    }

    /// The most recent `window` messages of the history.
    pub fn recent(&self) -> &[Message] {
        let start = self.history.len().saturating_sub(self.window);
        &self.history[start..]
    }

    pub fn submit(&mut self, query: &str) -> Result<Vec<Message>> {
        self.submit_with_context(query, Vec::new())
    }

    /// Move to `AwaitingReply` and return the prompt to send.
    pub fn submit_with_context(
        &mut self,
        query: &str,
        turn_system: Vec<Message>,
    ) -> Result<Vec<Message>> {
        self.expect_state(SessionState::Idle, "submit")?;

        let user = Message::user(query);
        let recent = self.recent();
        let mut prompt =
            Vec::with_capacity(self.system.len() + turn_system.len() + recent.len() + 1);
        prompt.extend(self.system.iter().cloned());
        prompt.extend(turn_system);
        prompt.extend(recent.iter().cloned());
        prompt.push(user.clone());

        self.pending = Some(user);
        self.state = SessionState::AwaitingReply;
        Ok(prompt)
    }

    /// Commit the pending query and its reply; back to `Idle`.
    pub fn reply(&mut self, content: impl Into<String>) -> Result<()> {
        self.expect_state(SessionState::AwaitingReply, "reply")?;
        if let Some(user) = self.pending.take() {
            self.history.push(user);
        }
        self.history.push(Message::assistant(content));
        self.state = SessionState::Idle;
        Ok(())
    }

    /// Drop the pending query without touching the history.
    pub fn abort(&mut self) -> Result<()> {
        self.expect_state(SessionState::AwaitingReply, "abort")?;
        self.pending = None;
        self.state = SessionState::Idle;
        Ok(())
    }

    /// End the session and hand back the history for saving.
    pub fn terminate(&mut self) -> Result<&[Message]> {
        self.expect_state(SessionState::Idle, "terminate")?;
        self.state = SessionState::Terminated;
        Ok(self.history.as_slice())
    }

    fn expect_state(&self, expected: SessionState, op: &str) -> Result<()> {
        if self.state != expected {
            return Err(ChatError::InvalidState(format!(
                "cannot {} while {:?}",
                op, self.state
            )));
        }
        Ok(())
    }

    /// Number of assistant replies recorded so far.
    pub fn turns(&self) -> usize {
        self.history
            .iter()
            .filter(|m| m.role == Role::Assistant)
            .count()
    }
}
