//! Dashboard routes for signed-in employees and admins.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};

use shiptrack::{ListQuery, ListView, Page, RecordOutcome, Services, Shipment, StatusChange};

use super::{ok, ApiResponse, ApiResult};
use crate::auth::Authenticated;
use crate::error::ApiError;

pub fn router() -> Router<Services> {
    Router::new()
        .route("/api/shipments", get(list_shipments).post(record_status_change))
        .route("/api/shipments/{job_number}", get(get_shipment))
}

async fn list_shipments(
    State(services): State<Services>,
    _user: Authenticated,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> ApiResult<Page<Shipment>> {
    let Query(query) = query?;
    let mut view = ListView::from_query(&services.config.listing, &query)?;
    let shipments = services.tracker.list_shipments()?;
    ok(view.apply(shipments))
}

async fn get_shipment(
    State(services): State<Services>,
    _user: Authenticated,
    Path(job_number): Path<String>,
) -> ApiResult<Shipment> {
    ok(services.tracker.get_shipment(&job_number)?)
}

async fn record_status_change(
    State(services): State<Services>,
    Authenticated { actor, .. }: Authenticated,
    payload: Result<Json<StatusChange>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<RecordOutcome>>), ApiError> {
    let Json(change) = payload?;
    let outcome = services.tracker.record_status_change(&actor, &change)?;

    let status = if outcome.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(ApiResponse::ok(outcome))))
}
