use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;

use shopledger_core::SaleId;

use crate::app::dto::CreateSaleRequest;
use crate::app::errors;
use crate::app::services::AppServices;
use crate::context::OperatorContext;

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_sale))
        .route("/:id", get(get_sale))
}

/// Commit a sale: lines are priced, lots debited FEFO and the sale stored
/// in one unit. Any failure leaves stock untouched.
pub async fn create_sale(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(operator): Extension<OperatorContext>,
    Json(body): Json<CreateSaleRequest>,
) -> axum::response::Response {
    let now = Utc::now();
    let draft = body.into_draft(operator.user_id(), now);
    errors::respond(StatusCode::CREATED, services.committer.commit_sale(draft, now).await)
}

pub async fn get_sale(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let Ok(sale_id) = id.parse::<SaleId>() else {
        return errors::invalid_id("sale");
    };
    errors::respond(StatusCode::OK, services.dashboard.sale(sale_id).await)
}
