use std::sync::Arc;

use axum::{
    extract::{Extension, Query},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use chrono::Utc;

use shopledger_accounting::{PeriodPreset, TransactionFilter};

use crate::app::dto::{CreateTransactionRequest, SummaryQuery};
use crate::app::errors;
use crate::app::routes::common::today_or;
use crate::app::services::AppServices;
use crate::context::OperatorContext;

pub fn router() -> Router {
    Router::new()
        .route("/summary", get(get_summary))
        .route("/transactions", get(list_transactions).post(create_transaction))
}

/// Summary for `start..=end` when both are given, otherwise for the named
/// `period` (`month` by default) ending today.
pub async fn get_summary(
    Extension(services): Extension<Arc<AppServices>>,
    Query(q): Query<SummaryQuery>,
) -> axum::response::Response {
    let result = match (q.start, q.end) {
        (Some(start), Some(end)) => services.finance.summarize(start, end).await,
        (None, None) => {
            let preset = match q.period.as_deref().unwrap_or("month").parse::<PeriodPreset>() {
                Ok(p) => p,
                Err(e) => return errors::json_error(StatusCode::BAD_REQUEST, "validation_error", e.to_string()),
            };
            services.finance.summarize_period(preset.resolve(today_or(q.date))).await
        }
        _ => {
            return errors::json_error(
                StatusCode::BAD_REQUEST,
                "validation_error",
                "start and end must be given together",
            );
        }
    };
    errors::respond(StatusCode::OK, result)
}

/// Newest first. Without `start`/`end` the last month is listed.
pub async fn list_transactions(
    Extension(services): Extension<Arc<AppServices>>,
    Query(mut filter): Query<TransactionFilter>,
) -> axum::response::Response {
    if filter.start.is_none() && filter.end.is_none() {
        let month = PeriodPreset::Month.resolve(today_or(None));
        filter.start = Some(month.start());
        filter.end = Some(month.end());
    }
    errors::respond(StatusCode::OK, services.finance.list_transactions(filter).await)
}

pub async fn create_transaction(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(operator): Extension<OperatorContext>,
    Json(body): Json<CreateTransactionRequest>,
) -> axum::response::Response {
    let new = body.into_new(Utc::now());
    errors::respond(
        StatusCode::CREATED,
        services.finance.record_transaction(new, operator.user_id()).await,
    )
}
