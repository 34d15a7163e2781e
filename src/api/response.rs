use axum::{
    http::{HeaderName, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

pub const TOTAL_COUNT_HEADER: HeaderName = HeaderName::from_static("x-total-count");

/// JSON body plus an `X-Total-Count` header carrying the unpaginated size.
pub fn with_total_count<T: Serialize>(data: T, count: usize) -> Response {
    (StatusCode::OK, [(TOTAL_COUNT_HEADER, count.to_string())], Json(data)).into_response()
}
