use axum::{
    Json, Router,
    routing::{delete, get, post, put},
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

use super::handlers::{self, AppState};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "mvirt PaaS API",
        version = "0.1.0",
        description = "REST API for template-rendered virtual machines and Kubernetes clusters. Resources are simulated records whose configuration is rendered from a typed template.",
        license(name = "MIT")
    ),
    tags(
        (name = "system", description = "System information"),
        (name = "templates", description = "Configuration template CRUD"),
        (name = "vms", description = "Virtual machine CRUD"),
        (name = "clusters", description = "Kubernetes cluster CRUD")
    ),
    paths(
        handlers::get_version,
        // Templates
        handlers::create_template,
        handlers::get_template,
        handlers::list_templates,
        handlers::update_template,
        handlers::delete_template,
        // VMs
        handlers::create_vm,
        handlers::get_vm,
        handlers::list_vms,
        handlers::update_vm,
        handlers::delete_vm,
        // Clusters
        handlers::create_cluster,
        handlers::get_cluster,
        handlers::list_clusters,
        handlers::update_cluster,
        handlers::delete_cluster,
    ),
    components(schemas(
        handlers::VersionInfo,
        handlers::ApiError,
        handlers::FieldErrorBody,
        handlers::DeleteResponse,
        handlers::CreateTemplateBody,
        handlers::UpdateTemplateBody,
        handlers::TemplateResponse,
        handlers::VmBody,
        handlers::Vm,
        handlers::ClusterBody,
        handlers::Cluster,
    ))
)]
pub struct ApiDoc;

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

pub fn create_router(state: Arc<AppState>) -> Router {
    let api_routes = Router::new()
        // System
        .route("/version", get(handlers::get_version))
        .route("/openapi.json", get(openapi_json))
        // Templates
        .route("/templates", get(handlers::list_templates))
        .route("/templates", post(handlers::create_template))
        .route("/templates/{id}", get(handlers::get_template))
        .route("/templates/{id}", put(handlers::update_template))
        .route("/templates/{id}", delete(handlers::delete_template))
        // VMs
        .route("/vms", get(handlers::list_vms))
        .route("/vms", post(handlers::create_vm))
        .route("/vms/{id}", get(handlers::get_vm))
        .route("/vms/{id}", put(handlers::update_vm))
        .route("/vms/{id}", delete(handlers::delete_vm))
        // Clusters
        .route("/clusters", get(handlers::list_clusters))
        .route("/clusters", post(handlers::create_cluster))
        .route("/clusters/{id}", get(handlers::get_cluster))
        .route("/clusters/{id}", put(handlers::update_cluster))
        .route("/clusters/{id}", delete(handlers::delete_cluster));

    Router::new()
        .nest("/api/v1", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
