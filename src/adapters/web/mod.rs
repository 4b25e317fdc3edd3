//! Web server adapter.
//!
//! Axum router serving the `/data` JSON API and an HTMX dashboard. Pages
//! return a fragment when the request carries `HX-Request`, a full page
//! otherwise.

mod chart_svg;
mod error;
mod handlers;
mod templates;

pub use chart_svg::bank_evolution_svg;
pub use error::{WebError, status_from_error};
pub use handlers::*;

use axum::{
    Router,
    routing::{get, post},
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::domain::error::TradeflowError;

use super::SharedStore;

pub struct AppState {
    pub store: SharedStore,
}

impl AppState {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route(
            "/data",
            get(handlers::get_data)
                .post(handlers::post_data)
                .put(handlers::put_data)
                .delete(handlers::delete_data),
        )
        .route("/data/bank-operation", post(handlers::post_bank_operation))
        .route("/data/summary", get(handlers::get_summary))
        .route("/data/projection", get(handlers::get_projection))
        .route("/data/calendar", get(handlers::get_calendar))
        .route("/export.csv", get(handlers::export_csv))
        .route("/chart/bank.svg", get(handlers::bank_chart_svg))
        .route("/", get(handlers::dashboard))
        .route("/projection", get(handlers::projection_page))
        .route("/calendar", get(handlers::calendar_page))
        .route("/settings", post(handlers::settings_form))
        .route("/records", post(handlers::record_form))
        .route("/records/{id}/delete", post(handlers::delete_record_form))
        .route("/bank-operation", post(handlers::bank_operation_form))
        .route("/reset", post(handlers::reset_form))
        .fallback(handlers::not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state))
}

/// Bind `addr` and serve until the process is stopped.
pub async fn serve(state: AppState, addr: SocketAddr) -> Result<(), TradeflowError> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "listening");
    axum::serve(listener, build_router(state)).await?;
    Ok(())
}

fn is_htmx_request(headers: &axum::http::HeaderMap) -> bool {
    headers.get("HX-Request").is_some()
}
