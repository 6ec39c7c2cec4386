use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::AppResult;
use crate::models::{CatalogRecord, HistoryRecord};
use crate::services::{
    ranker::{DEFAULT_LIMIT, DEFAULT_PERCENTILE},
    RankParams, Recommendation,
};

use super::AppState;

const DEFAULT_SONGS_LIMIT: usize = 100;

// Request types

#[derive(Debug, Deserialize)]
pub struct SongsQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct RecommendationQuery {
    pub limit: Option<usize>,
    pub percentile: Option<f64>,
}

// Handlers

/// Health check endpoint
pub async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}

/// First `limit` catalog tracks in file order
pub async fn get_songs(
    State(state): State<AppState>,
    query: Result<Query<SongsQuery>, QueryRejection>,
) -> AppResult<Json<Vec<CatalogRecord>>> {
    let Query(query) = query?;
    let limit = query.limit.unwrap_or(DEFAULT_SONGS_LIMIT);
    let songs = state
        .context
        .catalog()
        .records()
        .iter()
        .take(limit)
        .cloned()
        .collect();
    Ok(Json(songs))
}

/// The reconciled listening history
pub async fn get_history(State(state): State<AppState>) -> Json<Vec<HistoryRecord>> {
    Json(state.context.history().records().to_vec())
}

/// Tracks most unlike the listener's history
pub async fn get_recommendations(
    State(state): State<AppState>,
    query: Result<Query<RecommendationQuery>, QueryRejection>,
) -> AppResult<Json<Vec<Recommendation>>> {
    let Query(query) = query?;
    let params = RankParams::new(
        query.limit.unwrap_or(DEFAULT_LIMIT),
        query.percentile.unwrap_or(DEFAULT_PERCENTILE),
    )?;

    let recommendations = state.context.recommend(params, &mut rand::rng()).map_err(|reason| {
        tracing::info!(reason = %reason, "Recommendation request had insufficient data");
        reason
    })?;

    tracing::info!(
        count = recommendations.len(),
        limit = params.limit(),
        percentile = params.percentile(),
        "Recommendations served"
    );

    Ok(Json(recommendations))
}
