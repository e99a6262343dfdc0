pub mod audit;
pub mod bootstrap;
pub mod config;
pub mod model;
pub mod processor;
pub mod render;
pub mod rest;
pub mod service;
pub mod store;
pub mod validation;

pub use audit::{AuditLogger, create_audit_logger};
pub use config::Config;
pub use model::{
    ClusterSpec, CreateTemplateRequest, KubernetesCluster, Template, TemplateKind,
    UpdateTemplateRequest, VirtualMachine, VmSpec,
};
pub use processor::{ProcessError, TemplateProcessor};
pub use service::{ServiceError, Services};
pub use store::{MemoryStore, Repository, StoreError};
pub use validation::{FieldError, ValidationErrors};
