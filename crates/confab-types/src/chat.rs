//! Conversation types and session key construction for the confab gateway.
//!
//! A session is identified by `(user_id, session_id)` and materialized in the
//! backing store as two hash records: a pointer key naming the user's live
//! session and a full session key holding the conversation history.

use serde::{Deserialize, Serialize};

use std::fmt;
use std::str::FromStr;

/// Who produced a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Assistant,
}

impl fmt::Display for TurnRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TurnRole::User => write!(f, "user"),
            TurnRole::Assistant => write!(f, "assistant"),
        }
    }
}

impl FromStr for TurnRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "user" => Ok(TurnRole::User),
            "assistant" => Ok(TurnRole::Assistant),
            other => Err(format!("invalid turn role: '{other}'")),
        }
    }
}

/// One message in a conversation history. Immutable once appended.
///
/// The stored history is a JSON array of these objects under the
/// `conversation_history` hash field, e.g.
/// `[{"role": "user", "content": "..."}, ...]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: TurnRole,
    pub content: String,
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::Assistant,
            content: content.into(),
        }
    }
}

/// Hash field names used by the session store records.
pub mod fields {
    /// Live session id on the pointer key; session id echo on the session key.
    pub const SESSION_ID: &str = "session_id";
    /// Owning user id on the session key.
    pub const USER_ID: &str = "user_id";
    /// Display name captured at session creation.
    pub const USER_NAME: &str = "user_name";
    /// JSON array of [`super::Turn`]s.
    pub const CONVERSATION_HISTORY: &str = "conversation_history";
}

/// Pointer key naming a user's live session: `user:{user_id}`.
pub fn user_pointer_key(user_id: &str) -> String {
    format!("user:{user_id}")
}

/// Full session key for a (user, session) pair: `user:{user_id}:{session_id}`.
pub fn full_session_key(user_id: &str, session_id: &str) -> String {
    format!("user:{user_id}:{session_id}")
}

/// Lock key guarding a session's history: `lock:{session_key}`.
pub fn lock_key(session_key: &str) -> String {
    format!("lock:{session_key}")
}
