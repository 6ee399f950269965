use std::sync::Arc;

use axum::{
    extract::{Extension, Query},
    http::StatusCode,
    routing::get,
    Router,
};

use crate::app::dto::LimitQuery;
use crate::app::errors;
use crate::app::routes::common::clamp_limit;
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new().route("/", get(list_invoices))
}

pub async fn list_invoices(
    Extension(services): Extension<Arc<AppServices>>,
    Query(q): Query<LimitQuery>,
) -> axum::response::Response {
    errors::respond(StatusCode::OK, services.dashboard.recent_sales(clamp_limit(q.limit)).await)
}
