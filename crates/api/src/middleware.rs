use axum::{
    http::{HeaderMap, Method, StatusCode},
    middleware::Next,
    response::Response,
};

use shopledger_core::UserId;

use crate::app::errors::json_error;
use crate::context::{OPERATOR_HEADER, OperatorContext};

/// Attach the [`OperatorContext`] from the operator header.
///
/// Writes (anything but GET/HEAD/OPTIONS) without a valid operator id are
/// rejected with 401.
pub async fn operator_middleware(mut req: axum::http::Request<axum::body::Body>, next: Next) -> Response {
    let operator = extract_operator(req.headers());
    let is_write = !matches!(*req.method(), Method::GET | Method::HEAD | Method::OPTIONS);

    match operator {
        Ok(user_id) => {
            req.extensions_mut().insert(OperatorContext::new(user_id));
        }
        Err(reason) if is_write => {
            return json_error(StatusCode::UNAUTHORIZED, "unauthorized", reason);
        }
        Err(_) => {}
    }

    next.run(req).await
}

fn extract_operator(headers: &HeaderMap) -> Result<UserId, &'static str> {
    let header = headers
        .get(OPERATOR_HEADER)
        .ok_or("missing x-operator-id header")?;

    let value = header.to_str().map_err(|_| "x-operator-id is not valid text")?.trim();
    if value.is_empty() {
        return Err("missing x-operator-id header");
    }

    value.parse().map_err(|_| "x-operator-id is not a valid id")
}
