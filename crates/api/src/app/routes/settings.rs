use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, put},
    Json, Router,
};

use crate::app::dto::{self, UpdateSettingRequest};
use crate::app::errors;
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/", get(get_settings))
        .route("/:key", put(update_setting))
}

pub async fn get_settings(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    match services.settings.all().await {
        Ok(map) => (StatusCode::OK, Json(dto::settings_to_json(&map))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn update_setting(
    Extension(services): Extension<Arc<AppServices>>,
    Path(key): Path<String>,
    Json(body): Json<UpdateSettingRequest>,
) -> axum::response::Response {
    match services.settings.update(&key, &body.value).await {
        Ok(map) => (StatusCode::OK, Json(dto::settings_to_json(&map))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
