use std::sync::Arc;
use tracing::warn;

use crate::model::{CreateTemplateRequest, Template, UpdateTemplateRequest};
use crate::store::Repository;
use crate::validation;

use super::{IdGenerator, Result};

/// Template CRUD. Templates are stored as-is; their bodies are only parsed
/// when a resource renders with them.
pub struct TemplateService {
    store: Arc<dyn Repository>,
    ids: Arc<dyn IdGenerator>,
}

impl TemplateService {
    pub fn new(store: Arc<dyn Repository>, ids: Arc<dyn IdGenerator>) -> Self {
        Self { store, ids }
    }

    /// Store a new template. A caller-chosen ID that already exists is
    /// replaced.
    pub fn create(&self, req: CreateTemplateRequest) -> Result<Template> {
        let kind = validation::validate_create_template(Some(&req))?;

        let id = match req.id.filter(|id| !id.is_empty()) {
            Some(id) => {
                if self.store.get_template(&id).is_ok() {
                    warn!(template_id = %id, "Replacing existing template");
                }
                id
            }
            None => self.ids.next_id(),
        };

        let template = Template {
            id,
            name: req.name,
            kind,
            raw_body: req.raw_body,
        };
        Ok(self.store.create_template(template)?)
    }

    pub fn get(&self, id: &str) -> Result<Template> {
        validation::validate_id(Some(id)).into_result()?;
        Ok(self.store.get_template(id)?)
    }

    /// List templates, optionally filtered by kind (`vm`, `kubernetes`, or
    /// empty for all). Sorted by ID.
    pub fn list(&self, kind: Option<&str>) -> Result<Vec<Template>> {
        let kind = validation::validate_list_templates(kind)?;
        let mut templates = self.store.list_templates(kind)?;
        templates.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(templates)
    }

    /// Replace a template. Resources already rendered with it keep their
    /// output.
    pub fn update(&self, req: UpdateTemplateRequest) -> Result<Template> {
        let kind = validation::validate_update_template(Some(&req))?;

        let template = Template {
            id: req.id,
            name: req.name,
            kind,
            raw_body: req.raw_body,
        };
        Ok(self.store.update_template(template)?)
    }

    pub fn delete(&self, id: &str) -> Result<()> {
        validation::validate_id(Some(id)).into_result()?;
        Ok(self.store.delete_template(id)?)
    }
}
