//! Admin-only routes: shipment deletion and history, the live shipment feed
//! and employee management.

use std::convert::Infallible;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use futures_util::stream::{self, Stream};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use shiptrack::{
    BulkDeleteReport, Employee, HistoryConsistency, HistoryEntry, NewEmployee, Services, Snapshot,
};

use super::{ok, ApiResponse, ApiResult};
use crate::auth::AdminActor;
use crate::error::ApiError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct BulkDeleteRequest {
    pub job_numbers: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteResponse {
    pub job_number: String,
    pub removed_history: usize,
}

pub fn router() -> Router<Services> {
    Router::new()
        .route("/api/shipments/{job_number}/history", get(history))
        .route("/api/admin/shipments/events", get(shipment_events))
        .route("/api/admin/shipments/bulk-delete", post(bulk_delete))
        .route("/api/admin/shipments/{job_number}", delete(delete_shipment))
        .route(
            "/api/admin/shipments/{job_number}/consistency",
            get(check_history),
        )
        .route("/api/admin/employees", get(list_employees).post(provision_employee))
        .route("/api/admin/employees/{uid}", delete(remove_employee))
}

async fn history(
    State(services): State<Services>,
    _admin: AdminActor,
    Path(job_number): Path<String>,
) -> ApiResult<Vec<HistoryEntry>> {
    ok(services.tracker.history(&job_number)?)
}

async fn delete_shipment(
    State(services): State<Services>,
    AdminActor(actor): AdminActor,
    Path(job_number): Path<String>,
) -> ApiResult<DeleteResponse> {
    let removed_history = services.tracker.delete_shipment(&actor, &job_number)?;
    ok(DeleteResponse {
        job_number,
        removed_history,
    })
}

async fn bulk_delete(
    State(services): State<Services>,
    AdminActor(actor): AdminActor,
    payload: Result<Json<BulkDeleteRequest>, JsonRejection>,
) -> ApiResult<BulkDeleteReport> {
    let Json(request) = payload?;
    ok(services
        .tracker
        .bulk_delete_shipments(&actor, &request.job_numbers)?)
}

async fn check_history(
    State(services): State<Services>,
    _admin: AdminActor,
    Path(job_number): Path<String>,
) -> ApiResult<HistoryConsistency> {
    ok(services.tracker.check_history(&job_number)?)
}

/// Streams a `snapshot` event with every shipment on connect and after each
/// change. The subscription ends when the client disconnects.
async fn shipment_events(
    State(services): State<Services>,
    _admin: AdminActor,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let (tx, rx) = mpsc::unbounded_channel::<Snapshot>();
    let handle = services.tracker.subscribe(move |snapshot| {
        let _ = tx.send(snapshot);
    });

    // The stream owns the handle, so dropping the response unsubscribes.
    let events = stream::unfold((rx, handle), |(mut rx, handle)| async move {
        let snapshot = rx.recv().await?;
        let event = Event::default()
            .event("snapshot")
            .json_data(&snapshot)
            .unwrap_or_else(|e| {
                tracing::error!("Failed to encode snapshot: {}", e);
                Event::default().event("error").data("snapshot unavailable")
            });
        Some((Ok(event), (rx, handle)))
    });

    Sse::new(events).keep_alive(KeepAlive::default())
}

async fn list_employees(
    State(services): State<Services>,
    AdminActor(actor): AdminActor,
) -> ApiResult<Vec<Employee>> {
    ok(services.directory.list_employees(&actor)?)
}

async fn provision_employee(
    State(services): State<Services>,
    AdminActor(actor): AdminActor,
    payload: Result<Json<NewEmployee>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<Employee>>), ApiError> {
    let Json(request) = payload?;
    let employee = services.directory.provision_employee(&actor, &request)?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(employee))))
}

async fn remove_employee(
    State(services): State<Services>,
    AdminActor(actor): AdminActor,
    Path(uid): Path<String>,
) -> ApiResult<()> {
    services.directory.remove_employee(&actor, &uid)?;
    ok(())
}
