use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};

use crate::model::{CreateTemplateRequest, Template, TemplateKind, UpdateTemplateRequest};

use super::{ApiError, AppState, DeleteResponse, Payload};

/// Request to create a template
#[derive(Deserialize, ToSchema)]
pub struct CreateTemplateBody {
    /// Optional explicit ID; generated when absent
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
    /// Resource kind: vm or kubernetes
    #[serde(default)]
    #[schema(value_type = Option<String>, example = "vm")]
    pub kind: Option<TemplateKind>,
    /// Template text with placeholders
    #[serde(default)]
    pub raw_body: String,
}

/// Request to replace a template
#[derive(Deserialize, ToSchema)]
pub struct UpdateTemplateBody {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    #[schema(value_type = Option<String>, example = "kubernetes")]
    pub kind: Option<TemplateKind>,
    #[serde(default)]
    pub raw_body: String,
}

/// Template resource
#[derive(Serialize, ToSchema)]
pub struct TemplateResponse {
    pub id: String,
    pub name: String,
    #[schema(value_type = String, example = "vm")]
    pub kind: TemplateKind,
    pub raw_body: String,
}

impl From<Template> for TemplateResponse {
    fn from(t: Template) -> Self {
        Self {
            id: t.id,
            name: t.name,
            kind: t.kind,
            raw_body: t.raw_body,
        }
    }
}

/// Template list filter
#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListTemplatesQuery {
    /// Only templates of this kind (vm or kubernetes)
    pub kind: Option<String>,
}

/// Create a template
#[utoipa::path(
    post,
    path = "/api/v1/templates",
    request_body = CreateTemplateBody,
    responses(
        (status = 200, description = "Template created", body = TemplateResponse),
        (status = 400, description = "Invalid request", body = ApiError)
    ),
    tag = "templates"
)]
pub async fn create_template(
    State(state): State<Arc<AppState>>,
    Payload(req): Payload<CreateTemplateBody>,
) -> Result<Json<TemplateResponse>, ApiError> {
    let template = state.services.templates.create(CreateTemplateRequest {
        id: req.id,
        name: req.name,
        kind: req.kind,
        raw_body: req.raw_body,
    })?;
    state
        .audit
        .template_created(&template.id, &template.name, template.kind.as_str());

    Ok(Json(template.into()))
}

/// Get a template
#[utoipa::path(
    get,
    path = "/api/v1/templates/{id}",
    params(("id" = String, Path, description = "Template ID")),
    responses(
        (status = 200, description = "Template found", body = TemplateResponse),
        (status = 404, description = "Template not found", body = ApiError)
    ),
    tag = "templates"
)]
pub async fn get_template(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<TemplateResponse>, ApiError> {
    let template = state.services.templates.get(&id)?;
    Ok(Json(template.into()))
}

/// List templates
#[utoipa::path(
    get,
    path = "/api/v1/templates",
    params(ListTemplatesQuery),
    responses(
        (status = 200, description = "List of templates", body = Vec<TemplateResponse>),
        (status = 400, description = "Unknown kind filter", body = ApiError)
    ),
    tag = "templates"
)]
pub async fn list_templates(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListTemplatesQuery>,
) -> Result<Json<Vec<TemplateResponse>>, ApiError> {
    let templates = state.services.templates.list(query.kind.as_deref())?;
    Ok(Json(templates.into_iter().map(Into::into).collect()))
}

/// Replace a template
///
/// VMs and clusters rendered from the old body keep their output.
#[utoipa::path(
    put,
    path = "/api/v1/templates/{id}",
    params(("id" = String, Path, description = "Template ID")),
    request_body = UpdateTemplateBody,
    responses(
        (status = 200, description = "Template updated", body = TemplateResponse),
        (status = 400, description = "Invalid request", body = ApiError),
        (status = 404, description = "Template not found", body = ApiError)
    ),
    tag = "templates"
)]
pub async fn update_template(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Payload(req): Payload<UpdateTemplateBody>,
) -> Result<Json<TemplateResponse>, ApiError> {
    let template = state.services.templates.update(UpdateTemplateRequest {
        id,
        name: req.name,
        kind: req.kind,
        raw_body: req.raw_body,
    })?;
    state.audit.template_updated(&template.id);

    Ok(Json(template.into()))
}

/// Delete a template
#[utoipa::path(
    delete,
    path = "/api/v1/templates/{id}",
    params(("id" = String, Path, description = "Template ID")),
    responses(
        (status = 200, description = "Template deleted", body = DeleteResponse),
        (status = 404, description = "Template not found", body = ApiError)
    ),
    tag = "templates"
)]
pub async fn delete_template(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<DeleteResponse>, ApiError> {
    state.services.templates.delete(&id)?;
    state.audit.template_deleted(&id);
    Ok(Json(DeleteResponse { deleted: true }))
}
