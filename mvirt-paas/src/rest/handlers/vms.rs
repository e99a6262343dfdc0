use axum::{
    Json,
    extract::{Path, State},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

use crate::model::{VirtualMachine, VmSpec};

use super::{ApiError, AppState, DeleteResponse, Payload};

/// Request to create or replace a VM
#[derive(Default, Deserialize, ToSchema)]
#[serde(default)]
pub struct VmBody {
    pub name: String,
    /// CPU cores (1-32)
    pub cpu: i32,
    /// Memory in MB (512-65536)
    pub memory: i32,
    pub os: String,
    /// ID of a template of kind vm
    pub template_id: String,
}

impl From<VmBody> for VmSpec {
    fn from(body: VmBody) -> Self {
        Self {
            name: body.name,
            cpu_cores: body.cpu,
            memory_mb: body.memory,
            os: body.os,
            template_id: body.template_id,
        }
    }
}

/// VM resource
#[derive(Serialize, ToSchema)]
pub struct Vm {
    pub id: String,
    pub name: String,
    pub cpu: i32,
    pub memory: i32,
    pub os: String,
    pub template_id: String,
    /// Configuration rendered from the template at the last create/update
    pub rendered_config: String,
}

impl From<VirtualMachine> for Vm {
    fn from(vm: VirtualMachine) -> Self {
        Self {
            id: vm.id,
            name: vm.name,
            cpu: vm.cpu_cores,
            memory: vm.memory_mb,
            os: vm.os,
            template_id: vm.template_id,
            rendered_config: vm.rendered_config,
        }
    }
}

/// Create a new VM
#[utoipa::path(
    post,
    path = "/api/v1/vms",
    request_body = VmBody,
    responses(
        (status = 200, description = "VM created", body = Vm),
        (status = 400, description = "Validation failed", body = ApiError),
        (status = 404, description = "Template not found", body = ApiError),
        (status = 422, description = "Template kind mismatch or render failure", body = ApiError)
    ),
    tag = "vms"
)]
pub async fn create_vm(
    State(state): State<Arc<AppState>>,
    Payload(req): Payload<VmBody>,
) -> Result<Json<Vm>, ApiError> {
    let vm = state.services.vms.create(req.into())?;
    state.audit.vm_created(&vm.id, &vm.name, &vm.template_id);

    Ok(Json(vm.into()))
}

/// Get a VM by ID
#[utoipa::path(
    get,
    path = "/api/v1/vms/{id}",
    params(("id" = String, Path, description = "VM ID")),
    responses(
        (status = 200, description = "VM found", body = Vm),
        (status = 404, description = "VM not found", body = ApiError)
    ),
    tag = "vms"
)]
pub async fn get_vm(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Vm>, ApiError> {
    let vm = state.services.vms.get(&id)?;
    Ok(Json(vm.into()))
}

/// List all VMs
#[utoipa::path(
    get,
    path = "/api/v1/vms",
    responses(
        (status = 200, description = "List of VMs", body = Vec<Vm>)
    ),
    tag = "vms"
)]
pub async fn list_vms(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Vm>>, ApiError> {
    let vms = state.services.vms.list()?;
    Ok(Json(vms.into_iter().map(Into::into).collect()))
}

/// Replace a VM and re-render its configuration
#[utoipa::path(
    put,
    path = "/api/v1/vms/{id}",
    params(("id" = String, Path, description = "VM ID")),
    request_body = VmBody,
    responses(
        (status = 200, description = "VM updated", body = Vm),
        (status = 400, description = "Validation failed", body = ApiError),
        (status = 404, description = "VM or template not found", body = ApiError),
        (status = 422, description = "Template kind mismatch or render failure", body = ApiError)
    ),
    tag = "vms"
)]
pub async fn update_vm(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Payload(req): Payload<VmBody>,
) -> Result<Json<Vm>, ApiError> {
    let vm = state.services.vms.update(&id, req.into())?;
    state.audit.vm_updated(&vm.id, &vm.template_id);

    Ok(Json(vm.into()))
}

/// Delete a VM
#[utoipa::path(
    delete,
    path = "/api/v1/vms/{id}",
    params(("id" = String, Path, description = "VM ID")),
    responses(
        (status = 200, description = "VM deleted", body = DeleteResponse),
        (status = 404, description = "VM not found", body = ApiError)
    ),
    tag = "vms"
)]
pub async fn delete_vm(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<DeleteResponse>, ApiError> {
    state.services.vms.delete(&id)?;
    state.audit.vm_deleted(&id);
    Ok(Json(DeleteResponse { deleted: true }))
}
