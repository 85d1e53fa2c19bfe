use std::time::Instant;

use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::http::StatusCode;

use crate::model::*;
use crate::observability;

use super::AppState;
use super::error::ApiResult;

type IdParam = Result<Path<u64>, PathRejection>;

// ── Tables ───────────────────────────────────────────────────────

/// POST /api/v1/tables
pub async fn create_table(
    State(state): State<AppState>,
    payload: Result<Json<NewTable>, JsonRejection>,
) -> ApiResult<Json<Table>> {
    let Json(new) = payload?;
    let started = Instant::now();
    let result = state.tables.create_table(new).await;
    observability::record("create_table", started, &result);
    Ok(Json(result?))
}

/// GET /api/v1/tables
pub async fn list_tables(State(state): State<AppState>) -> ApiResult<Json<Vec<Table>>> {
    let started = Instant::now();
    let result = state.tables.list_tables().await;
    observability::record("list_tables", started, &result);
    Ok(Json(result?))
}

/// GET /api/v1/tables/{id}
pub async fn get_table(State(state): State<AppState>, id: IdParam) -> ApiResult<Json<Table>> {
    let Path(id) = id?;
    let started = Instant::now();
    let result = state.tables.get_table(id).await;
    observability::record("get_table", started, &result);
    Ok(Json(result?))
}

/// DELETE /api/v1/tables/{id}
pub async fn delete_table(State(state): State<AppState>, id: IdParam) -> ApiResult<StatusCode> {
    let Path(id) = id?;
    let started = Instant::now();
    let result = state.tables.delete_table(id).await;
    observability::record("delete_table", started, &result);
    result?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/tables/{id}/reservations
pub async fn list_table_reservations(
    State(state): State<AppState>,
    id: IdParam,
) -> ApiResult<Json<Vec<Reservation>>> {
    let Path(id) = id?;
    let started = Instant::now();
    let result = state.reservations.list_table_reservations(id).await;
    observability::record("list_table_reservations", started, &result);
    Ok(Json(result?))
}

// ── Reservations ─────────────────────────────────────────────────

/// POST /api/v1/reservations
pub async fn create_reservation(
    State(state): State<AppState>,
    payload: Result<Json<NewReservation>, JsonRejection>,
) -> ApiResult<Json<Reservation>> {
    let Json(new) = payload?;
    let started = Instant::now();
    let result = state.reservations.create_reservation(new).await;
    observability::record("create_reservation", started, &result);
    Ok(Json(result?))
}

/// GET /api/v1/reservations
pub async fn list_reservations(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<Reservation>>> {
    let started = Instant::now();
    let result = state.reservations.list_reservations().await;
    observability::record("list_reservations", started, &result);
    Ok(Json(result?))
}

/// GET /api/v1/reservations/{id}
pub async fn get_reservation(
    State(state): State<AppState>,
    id: IdParam,
) -> ApiResult<Json<Reservation>> {
    let Path(id) = id?;
    let started = Instant::now();
    let result = state.reservations.get_reservation(id).await;
    observability::record("get_reservation", started, &result);
    Ok(Json(result?))
}

/// DELETE /api/v1/reservations/{id}
pub async fn delete_reservation(
    State(state): State<AppState>,
    id: IdParam,
) -> ApiResult<StatusCode> {
    let Path(id) = id?;
    let started = Instant::now();
    let result = state.reservations.delete_reservation(id).await;
    observability::record("delete_reservation", started, &result);
    result?;
    Ok(StatusCode::NO_CONTENT)
}
