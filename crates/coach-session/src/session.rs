use chrono::{DateTime, Utc};
use coach_core::types::{ChatMessage, Role};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// A single conversation turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub id: String,
    pub role: Role,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl Turn {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: format!("turn_{}", Uuid::new_v4().simple()),
            role,
            content: content.into(),
            created_at: Utc::now(),
        }
    }

    pub fn to_chat_message(&self) -> ChatMessage {
        ChatMessage::new(self.role, self.content.clone())
    }
}

/// Append-only ordered turns of one session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Transcript {
    turns: Vec<Turn>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a turn. Alternation is not enforced.
    pub fn push(&mut self, role: Role, content: impl Into<String>) -> &Turn {
        self.turns.push(Turn::new(role, content));
        &self.turns[self.turns.len() - 1]
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    /// The newest `max` turns in chronological order, or all of them when `max` is `None`.
    pub fn recent(&self, max: Option<usize>) -> &[Turn] {
        match max {
            Some(n) if n < self.turns.len() => &self.turns[self.turns.len() - n..],
            _ => &self.turns,
        }
    }

    /// Number of user turns.
    pub fn user_turns(&self) -> usize {
        self.turns.iter().filter(|t| t.role == Role::User).count()
    }
}

impl fmt::Display for Transcript {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Transcript(turns={}, user_turns={})", self.len(), self.user_turns())
    }
}
