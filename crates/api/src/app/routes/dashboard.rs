use std::sync::Arc;

use axum::{
    extract::{Extension, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};

use shopledger_accounting::PeriodPreset;

use crate::app::dto::{self, DateQuery, LimitQuery, RangeQuery};
use crate::app::errors;
use crate::app::routes::common::{clamp_limit, today_or};
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/", get(get_snapshot))
        .route("/sales", get(get_sales_chart))
        .route("/top-products", get(get_top_products))
}

pub async fn get_snapshot(
    Extension(services): Extension<Arc<AppServices>>,
    Query(q): Query<DateQuery>,
) -> axum::response::Response {
    let today = today_or(q.date);
    errors::respond(StatusCode::OK, services.dashboard.snapshot(today).await)
}

/// Daily income for `range` (`week` by default).
pub async fn get_sales_chart(
    Extension(services): Extension<Arc<AppServices>>,
    Query(q): Query<RangeQuery>,
) -> axum::response::Response {
    let range = q.range.unwrap_or_else(|| "week".to_string());
    let preset = match range.parse::<PeriodPreset>() {
        Ok(p) => p,
        Err(e) => return errors::json_error(StatusCode::BAD_REQUEST, "validation_error", e.to_string()),
    };

    let period = preset.resolve(today_or(q.date));
    match services.dashboard.sales_chart(period).await {
        Ok(points) => (StatusCode::OK, Json(dto::sales_chart_to_json(&range, &points))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn get_top_products(
    Extension(services): Extension<Arc<AppServices>>,
    Query(limit): Query<LimitQuery>,
    Query(date): Query<DateQuery>,
) -> axum::response::Response {
    let today = today_or(date.date);
    errors::respond(
        StatusCode::OK,
        services.dashboard.top_products(today, clamp_limit(limit.limit)).await,
    )
}
