//! Customer-facing lookup. No session required.

use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use axum::routing::get;
use axum::Router;
use serde::{Deserialize, Serialize};

use shiptrack::{LookupType, Progress, Services, Shipment};

use super::{ok, ApiResult};
use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct TrackQuery {
    #[serde(rename = "type")]
    pub lookup: LookupType,
    pub value: String,
}

/// A shipment together with its rendered progress bar.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackResponse {
    pub shipment: Shipment,
    pub progress: Progress,
}

pub fn router() -> Router<Services> {
    Router::new()
        .route("/api/track", get(track_by_query))
        .route("/api/track/{job_number}", get(track_by_job_number))
}

fn track(services: &Services, lookup: LookupType, value: &str) -> ApiResult<TrackResponse> {
    let shipment = services
        .tracker
        .find_shipment(lookup, value)?
        .ok_or_else(|| {
            ApiError::NotFound("No shipment found. Please check the number and try again.".to_string())
        })?;
    let progress = Progress::for_status(shipment.status.as_str());
    ok(TrackResponse { shipment, progress })
}

async fn track_by_job_number(
    State(services): State<Services>,
    Path(job_number): Path<String>,
) -> ApiResult<TrackResponse> {
    track(&services, LookupType::JobNumber, &job_number)
}

async fn track_by_query(
    State(services): State<Services>,
    query: Result<Query<TrackQuery>, QueryRejection>,
) -> ApiResult<TrackResponse> {
    let Query(query) = query?;
    track(&services, query.lookup, query.value.trim())
}
