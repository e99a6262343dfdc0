use std::sync::Arc;
use tracing::info;

/// Target used for audit events, so they can be filtered or routed apart
/// from ordinary logs (`RUST_LOG=audit=info`).
pub const AUDIT_TARGET: &str = "audit";

/// Audit trail of successful mutations.
pub struct AuditLogger {
    enabled: bool,
}

impl AuditLogger {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    pub fn new_noop() -> Self {
        Self::new(false)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn log(&self, message: String, object_ids: &[&str]) {
        if !self.enabled {
            return;
        }
        info!(target: AUDIT_TARGET, objects = ?object_ids, "{}", message);
    }

    // Template events
    pub fn template_created(&self, template_id: &str, name: &str, kind: &str) {
        self.log(
            format!("Template created: {} ({}, kind {})", name, template_id, kind),
            &[template_id],
        );
    }

    pub fn template_updated(&self, template_id: &str) {
        self.log(format!("Template updated: {}", template_id), &[template_id]);
    }

    pub fn template_deleted(&self, template_id: &str) {
        self.log(format!("Template deleted: {}", template_id), &[template_id]);
    }

    // VM events
    pub fn vm_created(&self, vm_id: &str, name: &str, template_id: &str) {
        self.log(
            format!("VM created: {} ({}) from template {}", name, vm_id, template_id),
            &[vm_id, template_id],
        );
    }

    pub fn vm_updated(&self, vm_id: &str, template_id: &str) {
        self.log(
            format!("VM updated: {} (template {})", vm_id, template_id),
            &[vm_id, template_id],
        );
    }

    pub fn vm_deleted(&self, vm_id: &str) {
        self.log(format!("VM deleted: {}", vm_id), &[vm_id]);
    }

    // Cluster events
    pub fn cluster_created(&self, cluster_id: &str, name: &str, template_id: &str) {
        self.log(
            format!(
                "Kubernetes cluster created: {} ({}) from template {}",
                name, cluster_id, template_id
            ),
            &[cluster_id, template_id],
        );
    }

    pub fn cluster_updated(&self, cluster_id: &str, template_id: &str) {
        self.log(
            format!(
                "Kubernetes cluster updated: {} (template {})",
                cluster_id, template_id
            ),
            &[cluster_id, template_id],
        );
    }

    pub fn cluster_deleted(&self, cluster_id: &str) {
        self.log(
            format!("Kubernetes cluster deleted: {}", cluster_id),
            &[cluster_id],
        );
    }
}

/// Create an audit logger, disabled when `enabled` is false.
pub fn create_audit_logger(enabled: bool) -> Arc<AuditLogger> {
    Arc::new(AuditLogger::new(enabled))
}
