use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;

use shopledger_core::{LotId, ProductId};
use shopledger_inventory::{LotAdjustment, ReceiveLot};

use crate::app::dto::{self, AllocationQuery, DateQuery};
use crate::app::errors;
use crate::app::routes::common::today_or;
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/", get(get_stock_levels))
        .route("/alerts", get(get_alerts))
        .route("/lots", post(receive_lot))
        .route("/lots/:id/adjust", post(adjust_lot))
        .route("/products/:id/lots", get(get_product_lots))
        .route("/products/:id/allocation", get(get_allocation))
}

pub async fn get_stock_levels(
    Extension(services): Extension<Arc<AppServices>>,
    Query(q): Query<DateQuery>,
) -> axum::response::Response {
    errors::respond(StatusCode::OK, services.alerts.stock_levels(today_or(q.date)).await)
}

pub async fn get_alerts(
    Extension(services): Extension<Arc<AppServices>>,
    Query(q): Query<DateQuery>,
) -> axum::response::Response {
    let today = today_or(q.date);

    let alerts = match services.alerts.derive_alerts(today).await {
        Ok(a) => a,
        Err(e) => return errors::service_error_to_response(e),
    };
    let products = match services.catalog.products().await {
        Ok(p) => p,
        Err(e) => return errors::service_error_to_response(e),
    };
    let by_id: HashMap<ProductId, _> = products.iter().map(|p| (p.id, p)).collect();

    let body: Vec<_> = alerts
        .iter()
        .map(|alert| dto::alert_to_json(alert, by_id.get(&alert.product_id()).copied(), today))
        .collect();

    (StatusCode::OK, Json(body)).into_response()
}

pub async fn receive_lot(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<ReceiveLot>,
) -> axum::response::Response {
    errors::respond(StatusCode::CREATED, services.catalog.receive_lot(body, Utc::now()).await)
}

pub async fn adjust_lot(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Json(body): Json<LotAdjustment>,
) -> axum::response::Response {
    let Ok(lot_id) = id.parse::<LotId>() else {
        return errors::invalid_id("lot");
    };
    errors::respond(StatusCode::OK, services.catalog.adjust_lot(lot_id, body, Utc::now()).await)
}

pub async fn get_product_lots(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let Ok(product_id) = id.parse::<ProductId>() else {
        return errors::invalid_id("product");
    };
    errors::respond(StatusCode::OK, services.catalog.lots_of(product_id).await)
}

/// Preview which lots a sale of `quantity` would draw from. Nothing is written.
pub async fn get_allocation(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Query(q): Query<AllocationQuery>,
) -> axum::response::Response {
    let Ok(product_id) = id.parse::<ProductId>() else {
        return errors::invalid_id("product");
    };
    errors::respond(StatusCode::OK, services.allocator.allocate(product_id, q.quantity).await)
}
