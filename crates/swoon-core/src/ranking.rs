use std::collections::HashMap;

use rand::Rng;
use serde::Serialize;
use uuid::Uuid;

use crate::config::RankingConfig;
use crate::error::{Result, SwoonError};
use crate::model::{Dress, DressId, PriceRange, SwipeEvent};
use crate::storage::StorageBackend;

/// Weights for the shortlist score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankingWeights {
    /// Added for a liked dress.
    pub like: f64,
    /// Subtracted for a disliked dress.
    pub dislike: f64,
    /// Upper bound (exclusive) of the per-dress random jitter. Zero disables it.
    pub exploration: f64,
}

impl Default for RankingWeights {
    fn default() -> Self {
        Self::from(&RankingConfig::default())
    }
}

impl From<&RankingConfig> for RankingWeights {
    fn from(config: &RankingConfig) -> Self {
        Self {
            like: config.like_weight,
            dislike: config.dislike_weight,
            exploration: config.exploration,
        }
    }
}

/// Filters and size of a shortlist request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankQuery {
    pub limit: usize,
    pub price: PriceRange,
}

impl RankQuery {
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            price: PriceRange::default(),
        }
    }

    pub fn with_price(mut self, price: PriceRange) -> Self {
        self.price = price;
        self
    }
}

/// How each component contributed to the final score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoreBreakdown {
    pub base: f64,
    pub exploration: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedDress {
    pub dress: Dress,
    pub score: f64,
    pub breakdown: ScoreBreakdown,
}

/// Swipe signal for one dress: `like` if liked, `-dislike` if disliked,
/// 0 if the session never saw it.
pub fn base_score(liked: Option<bool>, weights: &RankingWeights) -> f64 {
    match liked {
        Some(true) => weights.like,
        Some(false) => -weights.dislike,
        None => 0.0,
    }
}

/// Score every dress and sort by score, descending.
///
/// The exploration term is drawn fresh for each dress on each call, so two
/// calls over the same input can order untouched dresses differently. Pass a
/// seeded RNG to reproduce an ordering.
pub fn score_candidates<R: Rng + ?Sized>(
    dresses: Vec<Dress>,
    swipes: &[SwipeEvent],
    weights: &RankingWeights,
    rng: &mut R,
) -> Vec<RankedDress> {
    let decisions: HashMap<DressId, bool> = swipes.iter().map(|s| (s.dress_id, s.liked)).collect();

    let mut ranked: Vec<RankedDress> = dresses
        .into_iter()
        .map(|dress| {
            let base = base_score(decisions.get(&dress.id).copied(), weights);
            let exploration = if weights.exploration > 0.0 {
                rng.random_range(0.0..weights.exploration)
            } else {
                0.0
            };
            RankedDress {
                dress,
                score: base + exploration,
                breakdown: ScoreBreakdown { base, exploration },
            }
        })
        .collect();

    ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
    ranked
}

/// Shortlist for a session: the shop's dresses within `query.price`, scored
/// from the session's swipes, best first, at most `query.limit` long.
///
/// Read-only. Output order among dresses with equal swipe signal is random
/// per call unless `rng` is seeded.
pub async fn rank<S, R>(
    storage: &S,
    shop_id: Uuid,
    token: Uuid,
    query: &RankQuery,
    weights: &RankingWeights,
    rng: &mut R,
) -> Result<Vec<RankedDress>>
where
    S: StorageBackend,
    R: Rng + ?Sized,
{
    query.price.validate()?;
    let session = storage.get_session(token).await?;
    if session.shop_id != shop_id {
        return Err(SwoonError::InvalidReference(format!(
            "session {token} does not belong to shop {shop_id}"
        )));
    }

    let dresses = storage.list_dresses(shop_id, &query.price).await?;
    let swipes = storage.swipes_for_session(token).await?;
    let mut ranked = score_candidates(dresses, &swipes, weights, rng);
    ranked.truncate(query.limit);

    tracing::debug!(
        session = %token,
        returned = ranked.len(),
        limit = query.limit,
        "ranked shortlist"
    );
    Ok(ranked)
}
