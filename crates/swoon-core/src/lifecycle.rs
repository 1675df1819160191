//! Session lifecycle: creation, the present/submit loop, and completion.
//!
//! A session is `Active` until its termination condition holds on a submit,
//! at which point it is marked `Completed` exactly once. Every check reads
//! the current durable state, so any number of processes can serve the same
//! session without coordinating beyond the storage layer.

use chrono::Utc;
use rand::Rng;
use serde::Serialize;
use uuid::Uuid;

use crate::config::{RetryConfig, SessionConfig};
use crate::error::Result;
use crate::model::*;
use crate::recorder;
use crate::selector;
use crate::storage::StorageBackend;

/// Policy knobs for a running session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionPolicy {
    /// Swipe count at which a session ends regardless of unseen dresses.
    pub max_swipes: usize,
}

impl Default for SessionPolicy {
    fn default() -> Self {
        Self::from(&SessionConfig::default())
    }
}

impl From<&SessionConfig> for SessionPolicy {
    fn from(config: &SessionConfig) -> Self {
        Self {
            max_swipes: config.max_swipes,
        }
    }
}

/// What to show the bride next.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Presentation {
    Dress {
        dress: Dress,
        swipe_count: usize,
        max_swipes: usize,
    },
    /// The caller should move on to results.
    Terminated,
}

/// Directive returned after a swipe has been recorded.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NextStep {
    Finish {
        session: Session,
    },
    Continue {
        next: Dress,
        swipe_count: usize,
        max_swipes: usize,
    },
}

/// Outcome of [`submit`]: the stored swipe plus what happens next.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Submitted {
    pub recorded: RecordedEvent,
    pub step: NextStep,
}

impl Submitted {
    pub fn is_finished(&self) -> bool {
        matches!(self.step, NextStep::Finish { .. })
    }
}

/// Swipe count and unseen set, read from one storage snapshot so the
/// termination check and the pick agree.
struct Progress {
    swipe_count: usize,
    unseen: Vec<Dress>,
}

impl Progress {
    async fn load(storage: &impl StorageBackend, session: &Session) -> Result<Self> {
        let (swipe_count, mut unseen) = storage.swipe_progress(session.token).await?;
        unseen.retain(|d| d.shop_id == session.shop_id);
        Ok(Self {
            swipe_count,
            unseen,
        })
    }

    fn should_terminate(&self, policy: &SessionPolicy) -> bool {
        self.swipe_count >= policy.max_swipes || self.unseen.is_empty()
    }
}

/// Start a new `Active` session for `shop_id`.
pub async fn create_session(
    storage: &impl StorageBackend,
    shop_id: Uuid,
    operator: &str,
    bride_name: Option<&str>,
) -> Result<Session> {
    validate_operator(operator)?;
    let bride_name = validate_bride_name(bride_name)?;
    storage.get_shop(shop_id).await?;

    let session = Session::new(shop_id, operator.trim().to_string(), bride_name);
    storage.save_session(&session).await?;
    tracing::info!(session = %session.token, shop = %shop_id, "session created");
    Ok(session)
}

/// True once the swipe cap is reached or no unseen dress remains. A session
/// already marked completed stays terminated.
pub async fn should_terminate(
    storage: &impl StorageBackend,
    token: Uuid,
    policy: &SessionPolicy,
) -> Result<bool> {
    let session = storage.get_session(token).await?;
    if session.is_completed() {
        return Ok(true);
    }
    Ok(Progress::load(storage, &session).await?.should_terminate(policy))
}

/// Next dress to show, or `Terminated`. Never writes.
pub async fn present_next<S, R>(
    storage: &S,
    token: Uuid,
    policy: &SessionPolicy,
    rng: &mut R,
) -> Result<Presentation>
where
    S: StorageBackend,
    R: Rng + ?Sized,
{
    let session = storage.get_session(token).await?;
    if session.is_completed() {
        return Ok(Presentation::Terminated);
    }

    let progress = Progress::load(storage, &session).await?;
    if progress.should_terminate(policy) {
        return Ok(Presentation::Terminated);
    }
    let swipe_count = progress.swipe_count;
    Ok(match selector::pick(progress.unseen, rng) {
        Some(dress) => Presentation::Dress {
            dress,
            swipe_count,
            max_swipes: policy.max_swipes,
        },
        None => Presentation::Terminated,
    })
}

/// Record a swipe, then decide whether the session continues.
///
/// Safe to call again with the same arguments after a lost response: the
/// swipe is stored once and the stored outcome is echoed back.
pub async fn submit<S, R>(
    storage: &S,
    token: Uuid,
    dress_id: DressId,
    liked: bool,
    policy: &SessionPolicy,
    retry: &RetryConfig,
    rng: &mut R,
) -> Result<Submitted>
where
    S: StorageBackend,
    R: Rng + ?Sized,
{
    let session = storage.get_session(token).await?;
    let recorded = recorder::record_for_session(storage, &session, dress_id, liked, retry).await?;

    let progress = Progress::load(storage, &session).await?;
    let swipe_count = progress.swipe_count;
    let next = if session.is_completed() || progress.should_terminate(policy) {
        None
    } else {
        selector::pick(progress.unseen, rng)
    };

    let step = match next {
        Some(next) => NextStep::Continue {
            next,
            swipe_count,
            max_swipes: policy.max_swipes,
        },
        None => {
            let completed = storage.complete_session(token, Utc::now()).await?;
            if !session.is_completed() {
                tracing::info!(
                    session = %token,
                    swipe_count,
                    max_swipes = policy.max_swipes,
                    "session completed"
                );
            }
            NextStep::Finish { session: completed }
        }
    };

    Ok(Submitted { recorded, step })
}
