use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::{get, post};
use axum::Router;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use swoon_core::lifecycle::{self, NextStep, Presentation, SessionPolicy};
use swoon_core::model::*;
use swoon_core::ranking::{self, RankQuery, RankedDress, RankingWeights};
use swoon_core::storage::StorageBackend;
use uuid::Uuid;

use crate::error::ApiError;
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/v1/sessions", post(create_session))
        .route("/api/v1/sessions/{token}", get(get_session))
        .route("/api/v1/sessions/{token}/next", get(next_dress))
        .route("/api/v1/sessions/{token}/swipes", post(submit_swipe))
        .route("/api/v1/sessions/{token}/results", get(results))
        .route("/api/v1/shops/{shop_id}/sessions", get(list_shop_sessions))
        .route("/api/v1/shops/{shop_id}/dresses", get(list_shop_dresses))
}

// -- Request/Response types --

#[derive(Debug, Deserialize, Serialize)]
pub struct CreateSessionRequest {
    pub shop_id: Uuid,
    pub operator: String,
    #[serde(default)]
    pub bride_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SessionStatusResponse {
    #[serde(flatten)]
    pub session: Session,
    pub swipe_count: usize,
    pub max_swipes: usize,
}

#[derive(Debug, Serialize)]
pub struct NextResponse {
    pub terminated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dress: Option<Dress>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub swipe_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_swipes: Option<usize>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct SwipeRequest {
    pub dress_id: DressId,
    pub liked: bool,
}

#[derive(Debug, Serialize)]
pub struct SwipeResponse {
    pub terminated: bool,
    /// False when this pair was already recorded and the stored decision is echoed.
    pub created: bool,
    pub liked: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<Dress>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub swipe_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_swipes: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct ResultsParams {
    pub limit: Option<usize>,
    pub price_min: Option<f64>,
    pub price_max: Option<f64>,
    /// Fixes the exploration draw so the same ordering can be fetched again.
    pub seed: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct ResultsResponse {
    pub token: Uuid,
    pub completed: bool,
    pub results: Vec<RankedDress>,
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    #[serde(default = "default_list_limit")]
    pub limit: usize,
}

fn default_list_limit() -> usize {
    50
}

#[derive(Debug, Deserialize)]
pub struct PriceParams {
    pub price_min: Option<f64>,
    pub price_max: Option<f64>,
}

// -- Helpers --

fn price_range(min: Option<f64>, max: Option<f64>) -> Result<PriceRange, ApiError> {
    Ok(PriceRange::validated(min, max)?)
}

fn request_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    }
}

// -- Handlers --

async fn create_session(
    State(state): State<Arc<AppState>>,
    ApiJson(input): ApiJson<CreateSessionRequest>,
) -> Result<(StatusCode, Json<Session>), ApiError> {
    let session = lifecycle::create_session(
        &state.storage,
        input.shop_id,
        &input.operator,
        input.bride_name.as_deref(),
    )
    .await?;
    Ok((StatusCode::CREATED, Json(session)))
}

async fn get_session(
    State(state): State<Arc<AppState>>,
    ApiPath(token): ApiPath<Uuid>,
) -> Result<Json<SessionStatusResponse>, ApiError> {
    let session = state.storage.get_session(token).await?;
    let swipe_count = state.storage.count_swipes(token).await?;
    Ok(Json(SessionStatusResponse {
        session,
        swipe_count,
        max_swipes: state.config.session.max_swipes,
    }))
}

async fn next_dress(
    State(state): State<Arc<AppState>>,
    ApiPath(token): ApiPath<Uuid>,
) -> Result<Json<NextResponse>, ApiError> {
    let policy = SessionPolicy::from(&state.config.session);
    let mut rng = request_rng(None);
    let presentation = lifecycle::present_next(&state.storage, token, &policy, &mut rng).await?;

    let response = match presentation {
        Presentation::Dress {
            dress,
            swipe_count,
            max_swipes,
        } => NextResponse {
            terminated: false,
            dress: Some(dress),
            swipe_count: Some(swipe_count),
            max_swipes: Some(max_swipes),
        },
        Presentation::Terminated => NextResponse {
            terminated: true,
            dress: None,
            swipe_count: None,
            max_swipes: None,
        },
    };
    Ok(Json(response))
}

async fn submit_swipe(
    State(state): State<Arc<AppState>>,
    ApiPath(token): ApiPath<Uuid>,
    ApiJson(input): ApiJson<SwipeRequest>,
) -> Result<Json<SwipeResponse>, ApiError> {
    let policy = SessionPolicy::from(&state.config.session);
    let mut rng = request_rng(None);
    let submitted = lifecycle::submit(
        &state.storage,
        token,
        input.dress_id,
        input.liked,
        &policy,
        &state.config.retry,
        &mut rng,
    )
    .await?;

    let created = submitted.recorded.created;
    let liked = submitted.recorded.event.liked;
    let response = match submitted.step {
        NextStep::Finish { .. } => SwipeResponse {
            terminated: true,
            created,
            liked,
            next: None,
            swipe_count: None,
            max_swipes: None,
        },
        NextStep::Continue {
            next,
            swipe_count,
            max_swipes,
        } => SwipeResponse {
            terminated: false,
            created,
            liked,
            next: Some(next),
            swipe_count: Some(swipe_count),
            max_swipes: Some(max_swipes),
        },
    };
    Ok(Json(response))
}

async fn results(
    State(state): State<Arc<AppState>>,
    ApiPath(token): ApiPath<Uuid>,
    ApiQuery(params): ApiQuery<ResultsParams>,
) -> Result<Json<ResultsResponse>, ApiError> {
    let limit = params.limit.unwrap_or(state.config.ranking.default_limit);
    if limit == 0 {
        return Err(ApiError::bad_request("limit must be at least 1"));
    }
    let price = price_range(params.price_min, params.price_max)?;

    let session = state.storage.get_session(token).await?;
    let weights = RankingWeights::from(&state.config.ranking);
    let query = RankQuery::new(limit).with_price(price);
    let mut rng = request_rng(params.seed);
    let results = ranking::rank(
        &state.storage,
        session.shop_id,
        token,
        &query,
        &weights,
        &mut rng,
    )
    .await?;

    Ok(Json(ResultsResponse {
        token,
        completed: session.is_completed(),
        results,
    }))
}

async fn list_shop_sessions(
    State(state): State<Arc<AppState>>,
    ApiPath(shop_id): ApiPath<Uuid>,
    ApiQuery(params): ApiQuery<ListParams>,
) -> Result<Json<Vec<Session>>, ApiError> {
    state.storage.get_shop(shop_id).await?;
    let sessions = state.storage.list_sessions(shop_id, params.limit).await?;
    Ok(Json(sessions))
}

async fn list_shop_dresses(
    State(state): State<Arc<AppState>>,
    ApiPath(shop_id): ApiPath<Uuid>,
    ApiQuery(params): ApiQuery<PriceParams>,
) -> Result<Json<Vec<Dress>>, ApiError> {
    let price = price_range(params.price_min, params.price_max)?;
    state.storage.get_shop(shop_id).await?;
    let dresses = state.storage.list_dresses(shop_id, &price).await?;
    Ok(Json(dresses))
}
