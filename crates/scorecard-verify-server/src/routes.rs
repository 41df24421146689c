//! Routes and error mapping.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use scorecard_verify::{VerificationReport, Verifier, VerifyError};
use tracing::{error, info, info_span, warn, Instrument};

pub const BANNER: &str = "Scorecard signature certificate verification";

/// Largest accepted payload.
pub const MAX_PAYLOAD_BYTES: usize = 16 * 1024 * 1024;

/// Build the service router around a shared verifier.
pub fn router(verifier: Arc<Verifier>) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/healthz", get(healthz))
        .route("/projects", post(verify_project))
        .route("/projects/", post(verify_project))
        .layer(DefaultBodyLimit::max(MAX_PAYLOAD_BYTES))
        .with_state(verifier)
}

async fn home() -> &'static str {
    BANNER
}

async fn healthz() -> &'static str {
    "ok"
}

async fn verify_project(
    State(verifier): State<Arc<Verifier>>,
    body: Bytes,
) -> Result<Json<VerificationReport>, ApiError> {
    let span = info_span!("verify", payload_bytes = body.len());
    let report = verifier.verify(&body).instrument(span).await?;

    info!(
        repository = %report.provenance.path,
        reference = %report.provenance.reference,
        uuid = %report.entry.uuid,
        "verified payload"
    );
    Ok(Json(report))
}

/// [`VerifyError`] rendered as `{"error": {"code", "message"}}`.
#[derive(Debug)]
pub struct ApiError(pub VerifyError);

impl From<VerifyError> for ApiError {
    fn from(err: VerifyError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            error!(code = self.0.code(), error = %self.0, "verification failed");
        } else {
            warn!(code = self.0.code(), error = %self.0, "verification rejected");
        }

        let body = serde_json::json!({
            "error": {
                "code": self.0.code(),
                "message": self.0.to_string(),
            }
        });
        (status, Json(body)).into_response()
    }
}
