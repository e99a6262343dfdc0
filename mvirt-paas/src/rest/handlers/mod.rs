mod clusters;
mod templates;
mod vms;

use axum::{
    Json,
    body::Bytes,
    extract::{FromRequest, Request},
    http::StatusCode,
    response::IntoResponse,
};
use serde::{Serialize, de::DeserializeOwned};
use std::sync::Arc;
use tracing::error;
use utoipa::ToSchema;

use crate::audit::AuditLogger;
use crate::service::{ServiceError, Services};
use crate::validation::ValidationErrors;

pub use clusters::*;
pub use templates::*;
pub use vms::*;

/// Shared application state
pub struct AppState {
    pub services: Services,
    pub audit: Arc<AuditLogger>,
}

/// Field-level validation failure
#[derive(Serialize, ToSchema)]
pub struct FieldErrorBody {
    pub field: String,
    pub message: String,
}

/// API error response
#[derive(Serialize, ToSchema)]
pub struct ApiError {
    pub error: String,
    /// Machine-readable error kind, e.g. `validation_failed`
    pub kind: String,
    pub code: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<FieldErrorBody>>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match self.code {
            400 => StatusCode::BAD_REQUEST,
            404 => StatusCode::NOT_FOUND,
            422 => StatusCode::UNPROCESSABLE_ENTITY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

impl From<ServiceError> for ApiError {
    fn from(e: ServiceError) -> Self {
        let code = match &e {
            ServiceError::InvalidRequest(_) | ServiceError::ValidationFailed(_) => 400,
            ServiceError::NotFound { .. } | ServiceError::TemplateNotFound(_) => 404,
            ServiceError::TypeMismatch { .. } | ServiceError::RenderFailure(_) => 422,
            ServiceError::Internal(_) => 500,
        };
        if code == 500 {
            error!("Request failed: {}", e);
        }
        let details = match &e {
            ServiceError::ValidationFailed(errors) => Some(
                errors
                    .iter()
                    .map(|fe| FieldErrorBody {
                        field: fe.field.clone(),
                        message: fe.message.clone(),
                    })
                    .collect(),
            ),
            _ => None,
        };
        ApiError {
            error: e.to_string(),
            kind: e.kind().to_string(),
            code,
            details,
        }
    }
}

/// JSON request body.
///
/// Like `Json`, but an empty or `null` body is reported as the validation
/// error `request: is required`, and malformed JSON as `invalid_request`.
pub struct Payload<T>(pub T);

impl<S, T> FromRequest<S> for Payload<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|e| ServiceError::InvalidRequest(e.body_text()))?;

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Err(ServiceError::ValidationFailed(ValidationErrors::missing_request()).into());
        }

        match serde_json::from_slice::<Option<T>>(&bytes) {
            Ok(Some(value)) => Ok(Payload(value)),
            Ok(None) => {
                Err(ServiceError::ValidationFailed(ValidationErrors::missing_request()).into())
            }
            Err(e) => Err(ServiceError::InvalidRequest(e.to_string()).into()),
        }
    }
}

/// Delete confirmation
#[derive(Serialize, ToSchema)]
pub struct DeleteResponse {
    pub deleted: bool,
}

// === Version ===

/// Version information
#[derive(Serialize, ToSchema)]
pub struct VersionInfo {
    pub version: String,
}

/// Get service version
#[utoipa::path(
    get,
    path = "/api/v1/version",
    responses(
        (status = 200, description = "Service version", body = VersionInfo)
    ),
    tag = "system"
)]
pub async fn get_version() -> Json<VersionInfo> {
    Json(VersionInfo {
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
