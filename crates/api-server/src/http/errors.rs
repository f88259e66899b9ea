use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use shared::models::ErrorResponse;
use shared::repos::StoreError;
use tracing::error;

pub(super) fn bad_request_response(detail: impl Into<String>) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            detail: detail.into(),
        }),
    )
        .into_response()
}

pub(super) fn payload_too_large_response(detail: impl Into<String>) -> Response {
    (
        StatusCode::PAYLOAD_TOO_LARGE,
        Json(ErrorResponse {
            detail: detail.into(),
        }),
    )
        .into_response()
}

pub(super) fn internal_error_response(detail: impl Into<String>) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            detail: detail.into(),
        }),
    )
        .into_response()
}

pub(super) fn store_error_response(err: StoreError) -> Response {
    error!("database operation failed: {err}");
    internal_error_response("Unexpected server error")
}
