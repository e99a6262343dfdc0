//! Resource services.
//!
//! Each mutation runs validate → assign ID → render → store, in that order, so
//! a failed render never leaves a record behind. All calls are synchronous and
//! complete once started.

mod clusters;
mod templates;
mod vms;

pub use clusters::ClusterService;
pub use templates::TemplateService;
pub use vms::VmService;

use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::model::{EntityKind, TemplateKind};
use crate::processor::{ProcessError, TemplateProcessor};
use crate::render::RenderError;
use crate::store::{Repository, StoreError};
use crate::validation::ValidationErrors;

/// Caller-visible failure of a service operation.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Malformed request envelope (bad JSON, wrong types).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("validation failed: {0}")]
    ValidationFailed(ValidationErrors),

    #[error("{kind} {id} not found")]
    NotFound { kind: EntityKind, id: String },

    #[error("template {0} not found")]
    TemplateNotFound(String),

    #[error("template {template_id} is a {actual} template, expected {expected}")]
    TypeMismatch {
        template_id: String,
        expected: TemplateKind,
        actual: TemplateKind,
    },

    #[error("failed to render template: {0}")]
    RenderFailure(RenderError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    /// Stable machine-readable name of the variant.
    pub fn kind(&self) -> &'static str {
        match self {
            ServiceError::InvalidRequest(_) => "invalid_request",
            ServiceError::ValidationFailed(_) => "validation_failed",
            ServiceError::NotFound { .. } => "not_found",
            ServiceError::TemplateNotFound(_) => "template_not_found",
            ServiceError::TypeMismatch { .. } => "type_mismatch",
            ServiceError::RenderFailure(_) => "render_failure",
            ServiceError::Internal(_) => "internal",
        }
    }
}

impl From<ValidationErrors> for ServiceError {
    fn from(errors: ValidationErrors) -> Self {
        ServiceError::ValidationFailed(errors)
    }
}

impl From<StoreError> for ServiceError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound { kind, id } => ServiceError::NotFound { kind, id },
            StoreError::Internal(msg) => ServiceError::Internal(msg),
        }
    }
}

impl From<ProcessError> for ServiceError {
    fn from(e: ProcessError) -> Self {
        match e {
            ProcessError::TemplateNotFound(id) => ServiceError::TemplateNotFound(id),
            ProcessError::TypeMismatch {
                template_id,
                expected,
                actual,
            } => ServiceError::TypeMismatch {
                template_id,
                expected,
                actual,
            },
            ProcessError::Render(e) => ServiceError::RenderFailure(e),
            ProcessError::Store(e) => e.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ServiceError>;

/// Source of fresh entity IDs.
///
/// Uniqueness is best effort; the repository does not check for collisions.
pub trait IdGenerator: Send + Sync {
    fn next_id(&self) -> String;
}

/// Random UUID v4 IDs.
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidGenerator;

impl IdGenerator for UuidGenerator {
    fn next_id(&self) -> String {
        Uuid::new_v4().to_string()
    }
}

/// The three resource services wired to one repository.
pub struct Services {
    pub templates: TemplateService,
    pub vms: VmService,
    pub clusters: ClusterService,
}

impl Services {
    pub fn new(store: Arc<dyn Repository>) -> Self {
        Self::with_id_generator(store, Arc::new(UuidGenerator))
    }

    pub fn with_id_generator(store: Arc<dyn Repository>, ids: Arc<dyn IdGenerator>) -> Self {
        let processor = Arc::new(TemplateProcessor::new(store.clone()));
        Self {
            templates: TemplateService::new(store.clone(), ids.clone()),
            vms: VmService::new(store.clone(), processor.clone(), ids.clone()),
            clusters: ClusterService::new(store, processor, ids),
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::atomic::{AtomicU64, Ordering};

    use super::*;
    use crate::model::{CreateTemplateRequest, Template};
    use crate::store::MemoryStore;

    /// Predictable IDs: `id-1`, `id-2`, ...
    #[derive(Default)]
    pub struct SequentialIds(AtomicU64);

    impl IdGenerator for SequentialIds {
        fn next_id(&self) -> String {
            format!("id-{}", self.0.fetch_add(1, Ordering::Relaxed) + 1)
        }
    }

    pub fn services() -> Services {
        Services::with_id_generator(
            Arc::new(MemoryStore::new()),
            Arc::new(SequentialIds::default()),
        )
    }

    pub fn add_template(
        services: &Services,
        id: &str,
        kind: TemplateKind,
        raw_body: &str,
    ) -> Template {
        services
            .templates
            .create(CreateTemplateRequest {
                id: Some(id.to_string()),
                name: format!("{} template", id),
                kind: Some(kind),
                raw_body: raw_body.to_string(),
            })
            .unwrap()
    }
}
