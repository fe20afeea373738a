use axum::{
    extract::{Path, State},
    Extension, Json,
};
use serde::Serialize;
use trendmap_core::{GlobalTrend, RegionSelector, TrendTopic};
use trendmap_pipeline::Retrieved;

use crate::middleware::RequestId;

use super::{map_store_error, parse_selector, parse_time_range, ApiError, AppState};

/// Global ranking at a time range. `timestamp` is epoch milliseconds and is
/// omitted when no snapshot qualified.
#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub(super) struct GlobalTrendsBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
    pub global_trends: Vec<GlobalTrend>,
}

pub(super) async fn global_trends(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(time_range): Path<String>,
) -> Result<Json<GlobalTrendsBody>, ApiError> {
    let index = parse_time_range(&req_id.0, &time_range)?;

    let retrieved = state
        .retriever
        .retrieve(&RegionSelector::Global, index)
        .await
        .map_err(|e| map_store_error(req_id.0.clone(), &e))?;

    let timestamp = retrieved.captured_at().map(|t| t.timestamp_millis());
    let global_trends = match retrieved {
        Retrieved::Global { trends, .. } => trends,
        Retrieved::Region { .. } => Vec::new(),
    };

    Ok(Json(GlobalTrendsBody {
        timestamp,
        global_trends,
    }))
}

pub(super) async fn region_trends(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path((region, time_range)): Path<(String, String)>,
) -> Result<Json<Vec<TrendTopic>>, ApiError> {
    let selector = parse_selector(&req_id.0, &region)?;
    if selector == RegionSelector::Global {
        return Err(ApiError::new(
            req_id.0,
            "bad_request",
            "use /api/v1/trends/global for the global ranking",
        ));
    }
    let index = parse_time_range(&req_id.0, &time_range)?;

    let retrieved = state
        .retriever
        .retrieve(&selector, index)
        .await
        .map_err(|e| map_store_error(req_id.0.clone(), &e))?;

    let trends = match retrieved {
        Retrieved::Region { trends, .. } => trends,
        Retrieved::Global { .. } => Vec::new(),
    };
    Ok(Json(trends))
}
