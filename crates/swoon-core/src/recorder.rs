//! Records like/dislike decisions exactly once per (session, dress).

use uuid::Uuid;

use crate::config::RetryConfig;
use crate::error::{Result, SwoonError};
use crate::model::{DressId, RecordedEvent, Session};
use crate::retry::with_retry_config;
use crate::storage::StorageBackend;

/// Record a swipe for the session identified by `token`.
///
/// Resubmitting an already-recorded pair succeeds and echoes the stored
/// decision, whatever `liked` says this time.
pub async fn record_swipe(
    storage: &impl StorageBackend,
    token: Uuid,
    dress_id: DressId,
    liked: bool,
    retry: &RetryConfig,
) -> Result<RecordedEvent> {
    let session = storage.get_session(token).await?;
    record_for_session(storage, &session, dress_id, liked, retry).await
}

/// Same as [`record_swipe`] for a session that is already loaded.
pub async fn record_for_session(
    storage: &impl StorageBackend,
    session: &Session,
    dress_id: DressId,
    liked: bool,
    retry: &RetryConfig,
) -> Result<RecordedEvent> {
    let dress = storage.get_dress(dress_id).await?;
    if dress.shop_id != session.shop_id {
        return Err(SwoonError::InvalidReference(format!(
            "dress {dress_id} does not belong to the shop of session {}",
            session.token
        )));
    }

    // Insert-if-absent is idempotent, so contention can simply be retried.
    let recorded = with_retry_config(retry, || {
        storage.insert_swipe_if_absent(session.token, dress_id, liked)
    })
    .await?;

    if recorded.created {
        tracing::debug!(session = %session.token, dress_id, liked, "swipe recorded");
    } else {
        tracing::debug!(
            session = %session.token,
            dress_id,
            stored = recorded.event.liked,
            "duplicate swipe absorbed"
        );
    }
    Ok(recorded)
}
