use std::sync::Arc;

use axum::{
    extract::{Extension, Query},
    http::StatusCode,
    routing::get,
    Router,
};

use crate::app::dto::DateQuery;
use crate::app::errors;
use crate::app::routes::common::today_or;
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new().route("/products", get(get_sellable_products))
}

/// Products with stock on hand, for the point-of-sale picker.
pub async fn get_sellable_products(
    Extension(services): Extension<Arc<AppServices>>,
    Query(q): Query<DateQuery>,
) -> axum::response::Response {
    errors::respond(StatusCode::OK, services.alerts.available_products(today_or(q.date)).await)
}
