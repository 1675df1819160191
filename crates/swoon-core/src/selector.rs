//! Picks the next dress to show in a session.

use rand::Rng;

use crate::error::Result;
use crate::model::{Dress, Session};
use crate::storage::StorageBackend;

/// Dresses of the session's shop that the session has not swiped yet.
/// Always read fresh from storage.
pub async fn candidates(storage: &impl StorageBackend, session: &Session) -> Result<Vec<Dress>> {
    let mut unseen = storage.unseen_dresses(session.token).await?;
    unseen.retain(|d| d.shop_id == session.shop_id);
    Ok(unseen)
}

/// Choose one candidate uniformly at random. `None` means exhaustion.
pub fn pick<R: Rng + ?Sized>(mut unseen: Vec<Dress>, rng: &mut R) -> Option<Dress> {
    if unseen.is_empty() {
        return None;
    }
    let idx = rng.random_range(0..unseen.len());
    Some(unseen.swap_remove(idx))
}

/// A random unseen dress for `session`, or `None` once every dress in the
/// shop has been swiped. Read-only.
pub async fn next_candidate<S, R>(
    storage: &S,
    session: &Session,
    rng: &mut R,
) -> Result<Option<Dress>>
where
    S: StorageBackend,
    R: Rng + ?Sized,
{
    let unseen = candidates(storage, session).await?;
    Ok(pick(unseen, rng))
}
