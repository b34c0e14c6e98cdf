/**
 * Error Conversion
 *
 * `IntoResponse` for `BackendError`, so handlers can return it directly.
 *
 * # Response Format
 *
 * ```json
 * {
 *   "error": "card 6f1c... not found",
 *   "status": 404
 * }
 * ```
 */

use axum::{
    response::{IntoResponse, Response},
    Json,
};
use crate::backend::error::domain::DomainError;
use crate::backend::error::types::BackendError;

impl IntoResponse for BackendError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = self.message();

        match &self {
            BackendError::Domain(DomainError::Persistence(detail)) => {
                tracing::error!("[Backend] Persistence failure: {}", detail);
            }
            _ if status.is_server_error() => {
                tracing::error!("[Backend] {}", self);
            }
            _ => {
                tracing::debug!("[Backend] Request rejected ({}): {}", status, message);
            }
        }

        let body = serde_json::json!({
            "error": message,
            "status": status.as_u16(),
        });

        (status, Json(body)).into_response()
    }
}
