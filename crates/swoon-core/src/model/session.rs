use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::catalog::{DressId, MAX_NAME_LENGTH};
use crate::error::{Result, SwoonError};

/// Normalize an optional bride name: trimmed, empty becomes `None`.
pub fn validate_bride_name(name: Option<&str>) -> Result<Option<String>> {
    let Some(name) = name.map(str::trim).filter(|n| !n.is_empty()) else {
        return Ok(None);
    };
    if name.len() > MAX_NAME_LENGTH {
        return Err(SwoonError::InvalidInput(format!(
            "bride name exceeds maximum length of {MAX_NAME_LENGTH} characters"
        )));
    }
    Ok(Some(name.to_string()))
}

pub fn validate_operator(operator: &str) -> Result<()> {
    if operator.trim().is_empty() {
        return Err(SwoonError::InvalidInput("operator cannot be empty".into()));
    }
    Ok(())
}

/// Where a session is in its lifecycle. `Completed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SessionState {
    Active,
    Completed {
        #[serde(rename = "completed_at")]
        at: DateTime<Utc>,
    },
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Completed { .. } => write!(f, "completed"),
        }
    }
}

/// One bride's swiping run, scoped to a single shop.
///
/// `token` is the only handle ever handed to clients. Storage backends may
/// keep their own numeric keys but never surface them here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub token: Uuid,
    pub shop_id: Uuid,
    pub created_by: String,
    pub bride_name: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub state: SessionState,
}

impl Session {
    pub fn new(shop_id: Uuid, created_by: String, bride_name: Option<String>) -> Self {
        Self {
            // v4 rather than v7: tokens must not be guessable from creation time.
            token: Uuid::new_v4(),
            shop_id,
            created_by,
            bride_name,
            created_at: Utc::now(),
            state: SessionState::Active,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self.state, SessionState::Completed { .. })
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        match self.state {
            SessionState::Active => None,
            SessionState::Completed { at } => Some(at),
        }
    }

    /// Move to `Completed`. A session that is already completed keeps its
    /// original timestamp.
    pub fn complete(mut self, at: DateTime<Utc>) -> Self {
        if let SessionState::Active = self.state {
            self.state = SessionState::Completed { at };
        }
        self
    }
}

/// A single like/dislike decision. At most one exists per (session, dress).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwipeEvent {
    pub session: Uuid,
    pub dress_id: DressId,
    pub liked: bool,
    pub created_at: DateTime<Utc>,
}

/// Result of an insert-if-absent on the swipe store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedEvent {
    /// The stored event, which may predate this call.
    pub event: SwipeEvent,
    /// `false` when the pair was already recorded and this call was absorbed.
    pub created: bool,
}
