//! Harvested-data handlers: cache queries and channel aggregates.

use crate::api::AppState;
use crate::db::{CachedVideo, ChannelAggregate};
use crate::error::Error;
use axum::{
    Json,
    extract::{Query, State},
};
use serde::Deserialize;
use utoipa::IntoParams;

/// Query parameters for the video cache search
#[derive(Debug, Clone, Deserialize, IntoParams)]
pub struct VideoQuery {
    /// Free-text filter over title, description and channel name
    #[serde(default)]
    pub query: String,

    /// Only return items classified as relevant
    #[serde(default)]
    pub relevant_only: bool,

    /// Maximum rows to return (default: 50)
    #[serde(default = "default_limit")]
    pub limit: u32,
}

/// Query parameters for channel aggregates
#[derive(Debug, Clone, Deserialize, IntoParams)]
pub struct ChannelQuery {
    /// Only aggregate items classified as relevant
    #[serde(default)]
    pub relevant_only: bool,

    /// Maximum channels to return (default: 20)
    #[serde(default = "default_channel_limit")]
    pub limit: u32,
}

/// GET /videos - Query the harvested video cache
#[utoipa::path(
    get,
    path = "/api/v1/videos",
    tag = "videos",
    params(VideoQuery),
    responses(
        (status = 200, description = "Matching cached videos", body = [CachedVideo])
    )
)]
pub async fn list_videos(
    State(state): State<AppState>,
    Query(params): Query<VideoQuery>,
) -> Result<Json<Vec<CachedVideo>>, Error> {
    let videos = state
        .harvester
        .db
        .search_videos(&params.query, params.relevant_only, params.limit.min(500))
        .await?;

    Ok(Json(videos))
}

/// GET /videos/channels - Channels ranked by total views
#[utoipa::path(
    get,
    path = "/api/v1/videos/channels",
    tag = "videos",
    params(ChannelQuery),
    responses(
        (status = 200, description = "Channel aggregates", body = [ChannelAggregate])
    )
)]
pub async fn top_channels(
    State(state): State<AppState>,
    Query(params): Query<ChannelQuery>,
) -> Result<Json<Vec<ChannelAggregate>>, Error> {
    let channels = state
        .harvester
        .db
        .top_channels(params.relevant_only, params.limit.min(100))
        .await?;

    Ok(Json(channels))
}

fn default_limit() -> u32 {
    50
}

fn default_channel_limit() -> u32 {
    20
}
