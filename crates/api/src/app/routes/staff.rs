use std::sync::Arc;

use axum::{
    extract::{Extension, Query},
    http::StatusCode,
    routing::get,
    Json, Router,
};

use shopledger_staff::{NewAttendance, NewEmployee};

use crate::app::dto::DateQuery;
use crate::app::errors;
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/employees", get(list_employees).post(create_employee))
        .route("/attendance", get(list_attendance).post(record_attendance))
}

pub async fn list_employees(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    errors::respond(StatusCode::OK, services.staff.employees().await)
}

pub async fn create_employee(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<NewEmployee>,
) -> axum::response::Response {
    errors::respond(StatusCode::CREATED, services.staff.hire(body).await)
}

/// All records, newest day first; `?date=` narrows to one day.
pub async fn list_attendance(
    Extension(services): Extension<Arc<AppServices>>,
    Query(q): Query<DateQuery>,
) -> axum::response::Response {
    errors::respond(StatusCode::OK, services.staff.attendance(q.date).await)
}

pub async fn record_attendance(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<NewAttendance>,
) -> axum::response::Response {
    errors::respond(StatusCode::CREATED, services.staff.record_attendance(body).await)
}
