//! Repository trait definitions.
//!
//! One trait per entity partition. Every method works on owned copies: what
//! goes in is moved into the store, what comes out is a clone. Nothing hands
//! out references into the backing maps.

use crate::model::{KubernetesCluster, Template, TemplateKind, VirtualMachine};

use super::error::Result;

/// Store trait for template operations.
pub trait TemplateStore: Send + Sync {
    /// Insert under `template.id`, replacing any existing entry.
    fn create_template(&self, template: Template) -> Result<Template>;

    /// Get a template by ID.
    fn get_template(&self, id: &str) -> Result<Template>;

    /// List templates, optionally only those of one kind. Order is unspecified.
    fn list_templates(&self, kind: Option<TemplateKind>) -> Result<Vec<Template>>;

    /// Replace an existing template.
    fn update_template(&self, template: Template) -> Result<Template>;

    /// Delete a template.
    fn delete_template(&self, id: &str) -> Result<()>;
}

/// Store trait for virtual machine operations.
pub trait VmStore: Send + Sync {
    /// Insert under `vm.id`, replacing any existing entry.
    fn create_vm(&self, vm: VirtualMachine) -> Result<VirtualMachine>;

    /// Get a VM by ID.
    fn get_vm(&self, id: &str) -> Result<VirtualMachine>;

    /// List all VMs. Order is unspecified.
    fn list_vms(&self) -> Result<Vec<VirtualMachine>>;

    /// Replace an existing VM.
    fn update_vm(&self, vm: VirtualMachine) -> Result<VirtualMachine>;

    /// Delete a VM.
    fn delete_vm(&self, id: &str) -> Result<()>;
}

/// Store trait for Kubernetes cluster operations.
pub trait ClusterStore: Send + Sync {
    /// Insert under `cluster.id`, replacing any existing entry.
    fn create_cluster(&self, cluster: KubernetesCluster) -> Result<KubernetesCluster>;

    /// Get a cluster by ID.
    fn get_cluster(&self, id: &str) -> Result<KubernetesCluster>;

    /// List all clusters. Order is unspecified.
    fn list_clusters(&self) -> Result<Vec<KubernetesCluster>>;

    /// Replace an existing cluster.
    fn update_cluster(&self, cluster: KubernetesCluster) -> Result<KubernetesCluster>;

    /// Delete a cluster.
    fn delete_cluster(&self, id: &str) -> Result<()>;
}

/// Composite repository trait combining all partitions.
///
/// This is what services and the template processor hold, as
/// `Arc<dyn Repository>`.
pub trait Repository: TemplateStore + VmStore + ClusterStore + Send + Sync {}

impl<T> Repository for T where T: TemplateStore + VmStore + ClusterStore + Send + Sync {}
