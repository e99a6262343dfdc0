//! Template processor: binds a resource to its template and renders it.

use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use crate::model::{KubernetesCluster, Resource, TemplateKind, VirtualMachine};
use crate::render::{CompiledTemplate, RenderError};
use crate::store::{Repository, StoreError};

/// Errors raised while producing a resource's rendered configuration.
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("template {0} not found")]
    TemplateNotFound(String),

    #[error("template {template_id} is a {actual} template, expected {expected}")]
    TypeMismatch {
        template_id: String,
        expected: TemplateKind,
        actual: TemplateKind,
    },

    #[error("failed to render template: {0}")]
    Render(#[from] RenderError),

    #[error("store error: {0}")]
    Store(StoreError),
}

pub struct TemplateProcessor {
    store: Arc<dyn Repository>,
}

impl TemplateProcessor {
    pub fn new(store: Arc<dyn Repository>) -> Self {
        Self { store }
    }

    /// Render `resource` with the template it references.
    ///
    /// The template kind must equal `R::KIND`; on mismatch nothing is parsed.
    pub fn render<R: Resource>(&self, resource: &R) -> Result<String, ProcessError> {
        let template_id = resource.template_id();
        let template = self.store.get_template(template_id).map_err(|e| match e {
            StoreError::NotFound { .. } => ProcessError::TemplateNotFound(template_id.to_string()),
            other => ProcessError::Store(other),
        })?;

        if template.kind != R::KIND {
            return Err(ProcessError::TypeMismatch {
                template_id: template.id,
                expected: R::KIND,
                actual: template.kind,
            });
        }

        let compiled = CompiledTemplate::parse(&template.raw_body)?;
        let rendered = compiled.execute(&resource.render_context())?;
        debug!(
            template_id = %template.id,
            kind = %R::KIND,
            bytes = rendered.len(),
            "Rendered template"
        );
        Ok(rendered)
    }

    pub fn render_for_vm(&self, vm: &VirtualMachine) -> Result<String, ProcessError> {
        self.render(vm)
    }

    pub fn render_for_cluster(&self, cluster: &KubernetesCluster) -> Result<String, ProcessError> {
        self.render(cluster)
    }
}
