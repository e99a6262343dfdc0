use axum::{
    Json,
    extract::{Path, State},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

use crate::model::{ClusterSpec, KubernetesCluster};

use super::{ApiError, AppState, DeleteResponse, Payload};

/// Request to create or replace a Kubernetes cluster
#[derive(Default, Deserialize, ToSchema)]
#[serde(default)]
pub struct ClusterBody {
    pub name: String,
    pub region: String,
    /// Number of nodes (1-100)
    pub node_count: i32,
    /// Kubernetes version, e.g. "1.30"
    pub version: String,
    /// ID of a template of kind kubernetes
    pub template_id: String,
}

impl From<ClusterBody> for ClusterSpec {
    fn from(body: ClusterBody) -> Self {
        Self {
            name: body.name,
            region: body.region,
            node_count: body.node_count,
            version: body.version,
            template_id: body.template_id,
        }
    }
}

/// Kubernetes cluster resource
#[derive(Serialize, ToSchema)]
pub struct Cluster {
    pub id: String,
    pub name: String,
    pub region: String,
    pub node_count: i32,
    pub version: String,
    pub template_id: String,
    pub rendered_config: String,
}

impl From<KubernetesCluster> for Cluster {
    fn from(c: KubernetesCluster) -> Self {
        Self {
            id: c.id,
            name: c.name,
            region: c.region,
            node_count: c.node_count,
            version: c.version,
            template_id: c.template_id,
            rendered_config: c.rendered_config,
        }
    }
}

/// Create a Kubernetes cluster
#[utoipa::path(
    post,
    path = "/api/v1/clusters",
    request_body = ClusterBody,
    responses(
        (status = 200, description = "Cluster created", body = Cluster),
        (status = 400, description = "Validation failed", body = ApiError),
        (status = 404, description = "Template not found", body = ApiError),
        (status = 422, description = "Template kind mismatch or render failure", body = ApiError)
    ),
    tag = "clusters"
)]
pub async fn create_cluster(
    State(state): State<Arc<AppState>>,
    Payload(req): Payload<ClusterBody>,
) -> Result<Json<Cluster>, ApiError> {
    let cluster = state.services.clusters.create(req.into())?;
    state
        .audit
        .cluster_created(&cluster.id, &cluster.name, &cluster.template_id);

    Ok(Json(cluster.into()))
}

/// Get a Kubernetes cluster
#[utoipa::path(
    get,
    path = "/api/v1/clusters/{id}",
    params(("id" = String, Path, description = "Cluster ID")),
    responses(
        (status = 200, description = "Cluster found", body = Cluster),
        (status = 404, description = "Cluster not found", body = ApiError)
    ),
    tag = "clusters"
)]
pub async fn get_cluster(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Cluster>, ApiError> {
    let cluster = state.services.clusters.get(&id)?;
    Ok(Json(cluster.into()))
}

/// List Kubernetes clusters
#[utoipa::path(
    get,
    path = "/api/v1/clusters",
    responses(
        (status = 200, description = "List of clusters", body = Vec<Cluster>)
    ),
    tag = "clusters"
)]
pub async fn list_clusters(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Cluster>>, ApiError> {
    let clusters = state.services.clusters.list()?;
    Ok(Json(clusters.into_iter().map(Into::into).collect()))
}

/// Replace a Kubernetes cluster and re-render its configuration
#[utoipa::path(
    put,
    path = "/api/v1/clusters/{id}",
    params(("id" = String, Path, description = "Cluster ID")),
    request_body = ClusterBody,
    responses(
        (status = 200, description = "Cluster updated", body = Cluster),
        (status = 400, description = "Validation failed", body = ApiError),
        (status = 404, description = "Cluster or template not found", body = ApiError),
        (status = 422, description = "Template kind mismatch or render failure", body = ApiError)
    ),
    tag = "clusters"
)]
pub async fn update_cluster(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Payload(req): Payload<ClusterBody>,
) -> Result<Json<Cluster>, ApiError> {
    let cluster = state.services.clusters.update(&id, req.into())?;
    state
        .audit
        .cluster_updated(&cluster.id, &cluster.template_id);

    Ok(Json(cluster.into()))
}

/// Delete a Kubernetes cluster
#[utoipa::path(
    delete,
    path = "/api/v1/clusters/{id}",
    params(("id" = String, Path, description = "Cluster ID")),
    responses(
        (status = 200, description = "Cluster deleted", body = DeleteResponse),
        (status = 404, description = "Cluster not found", body = ApiError)
    ),
    tag = "clusters"
)]
pub async fn delete_cluster(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<DeleteResponse>, ApiError> {
    state.services.clusters.delete(&id)?;
    state.audit.cluster_deleted(&id);
    Ok(Json(DeleteResponse { deleted: true }))
}
