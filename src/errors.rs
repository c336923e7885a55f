use crate::endpoint::EndpointError;
use crate::schema::ValidationError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::time::Duration;
use tracing::error;

/// Failures while talking to the upstream API.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Failed to reach upstream: {0}")]
    Unreachable(#[source] Box<dyn std::error::Error + Send + Sync>),
    #[error("Failed to read upstream body: {0}")]
    Body(#[source] axum::Error),
    #[error("Upstream returned a body that is not JSON (status {status}): {source}")]
    MalformedJson {
        status: StatusCode,
        #[source]
        source: serde_json::Error,
    },
    #[error("Upstream did not answer within {0:?}")]
    Timeout(Duration),
}

#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Endpoint(#[from] EndpointError),
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        match self {
            RelayError::Validation(err) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(json!({ "error": err.fields })),
            )
                .into_response(),
            RelayError::Endpoint(err) => {
                error!(error = %err, "Failed to build upstream URL");
                error_response(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "server_error",
                    "Failed to build upstream request",
                )
            }
            RelayError::Transport(TransportError::Timeout(after)) => {
                error!("Upstream timed out after {:?}", after);
                error_response(
                    StatusCode::GATEWAY_TIMEOUT,
                    "upstream_timeout",
                    "Upstream service did not respond in time",
                )
            }
            RelayError::Transport(err) => {
                error!(error = %err, "Upstream transport failure");
                error_response(
                    StatusCode::BAD_GATEWAY,
                    "upstream_error",
                    "Upstream service is unavailable",
                )
            }
        }
    }
}

fn error_response(status: StatusCode, error_type: &str, message: &str) -> Response {
    let body = json!({
        "error": {
            "type": error_type,
            "message": message
        }
    });

    (status, Json(body)).into_response()
}
