mod error;
mod handlers;

pub use error::{ApiError, ApiResult, status_for};

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::http::StatusCode;
use axum::routing::get;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::engine::Engine;
use crate::service::{ReservationService, TableService};

#[derive(Clone)]
pub struct AppState {
    pub tables: TableService<Engine>,
    pub reservations: ReservationService<Engine>,
}

impl AppState {
    pub fn new(engine: Arc<Engine>) -> Self {
        Self {
            tables: TableService::new(engine.clone()),
            reservations: ReservationService::new(engine),
        }
    }
}

pub fn router(state: AppState, request_timeout: Duration) -> Router {
    Router::new()
        .nest("/api/v1", api_routes())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            request_timeout,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn api_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/tables",
            get(handlers::list_tables).post(handlers::create_table),
        )
        .route(
            "/tables/",
            get(handlers::list_tables).post(handlers::create_table),
        )
        .route(
            "/tables/{id}",
            get(handlers::get_table).delete(handlers::delete_table),
        )
        .route(
            "/tables/{id}/reservations",
            get(handlers::list_table_reservations),
        )
        .route(
            "/reservations",
            get(handlers::list_reservations).post(handlers::create_reservation),
        )
        .route(
            "/reservations/",
            get(handlers::list_reservations).post(handlers::create_reservation),
        )
        .route(
            "/reservations/{id}",
            get(handlers::get_reservation).delete(handlers::delete_reservation),
        )
}
