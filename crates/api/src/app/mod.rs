//! HTTP application wiring (Axum router + service wiring).
//!
//! - `services.rs`: ledger store selection and service construction
//! - `routes/`: handlers, one file per screen of the shop app
//! - `dto.rs`: request bodies, query strings and JSON shaping
//! - `errors.rs`: uniform `{error, message}` responses

use std::sync::Arc;

use axum::{routing::get, Extension, Router};
use tower::ServiceBuilder;

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

/// Build the full HTTP router around already constructed services.
pub fn build_app(services: Arc<services::AppServices>) -> Router {
    // Ledger routes: operator context attached, required on writes.
    let ledger = routes::router()
        .layer(Extension(services))
        .layer(axum::middleware::from_fn(middleware::operator_middleware));

    Router::new()
        .route("/health", get(routes::system::health))
        .merge(ledger)
        .layer(ServiceBuilder::new())
}
