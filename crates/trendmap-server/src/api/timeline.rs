use axum::{
    extract::{Path, State},
    Extension, Json,
};
use trendmap_core::TimelineSeries;

use crate::middleware::RequestId;

use super::{map_trends_error, parse_selector, ApiError, AppState};

pub(super) async fn topic_timeline(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path((topic, region)): Path<(String, String)>,
) -> Result<Json<TimelineSeries>, ApiError> {
    let topic = topic.trim();
    if topic.is_empty() {
        return Err(ApiError::new(req_id.0, "bad_request", "topic must not be empty"));
    }
    let selector = parse_selector(&req_id.0, &region)?;

    let series = state
        .timelines
        .get_timeline(topic, &selector.to_string())
        .await
        .map_err(|e| map_trends_error(req_id.0.clone(), &e))?;

    Ok(Json(series))
}
