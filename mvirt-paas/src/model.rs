//! Entities owned by the repository.
//!
//! Templates, virtual machines and Kubernetes clusters live in three
//! independent ID namespaces. Resources reference their template by ID only
//! (soft reference); the reference is checked when rendering, never enforced
//! on delete.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::render::{RenderContext, Value};

/// Kind of resource a template renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateKind {
    Vm,
    Kubernetes,
}

impl TemplateKind {
    pub const ALL: [TemplateKind; 2] = [TemplateKind::Vm, TemplateKind::Kubernetes];

    pub fn as_str(&self) -> &'static str {
        match self {
            TemplateKind::Vm => "vm",
            TemplateKind::Kubernetes => "kubernetes",
        }
    }
}

impl fmt::Display for TemplateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TemplateKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "vm" => Ok(TemplateKind::Vm),
            "kubernetes" => Ok(TemplateKind::Kubernetes),
            other => Err(format!("unknown template kind '{}'", other)),
        }
    }
}

/// Entity partitions of the repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Template,
    VirtualMachine,
    KubernetesCluster,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Template => f.write_str("template"),
            EntityKind::VirtualMachine => f.write_str("virtual machine"),
            EntityKind::KubernetesCluster => f.write_str("kubernetes cluster"),
        }
    }
}

/// Configuration template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Template {
    pub id: String,
    pub name: String,
    pub kind: TemplateKind,
    pub raw_body: String,
}

/// Simulated virtual machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VirtualMachine {
    pub id: String,
    pub name: String,
    #[serde(rename = "cpu")]
    pub cpu_cores: i32,
    #[serde(rename = "memory")]
    pub memory_mb: i32,
    pub os: String,
    pub template_id: String,
    /// Output of the last successful render.
    pub rendered_config: String,
}

impl VirtualMachine {
    /// Assemble a record from caller input; `rendered_config` starts empty.
    pub fn from_spec(id: String, spec: VmSpec) -> Self {
        Self {
            id,
            name: spec.name,
            cpu_cores: spec.cpu_cores,
            memory_mb: spec.memory_mb,
            os: spec.os,
            template_id: spec.template_id,
            rendered_config: String::new(),
        }
    }
}

/// Simulated Kubernetes cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KubernetesCluster {
    pub id: String,
    pub name: String,
    pub region: String,
    pub node_count: i32,
    pub version: String,
    pub template_id: String,
    /// Output of the last successful render.
    pub rendered_config: String,
}

impl KubernetesCluster {
    pub fn from_spec(id: String, spec: ClusterSpec) -> Self {
        Self {
            id,
            name: spec.name,
            region: spec.region,
            node_count: spec.node_count,
            version: spec.version,
            template_id: spec.template_id,
            rendered_config: String::new(),
        }
    }
}

// === Requests ===

/// Input for creating a template. An absent or empty `id` gets a generated one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateTemplateRequest {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub kind: Option<TemplateKind>,
    #[serde(default)]
    pub raw_body: String,
}

/// Full replacement of an existing template.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateTemplateRequest {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub kind: Option<TemplateKind>,
    #[serde(default)]
    pub raw_body: String,
}

/// Caller-controlled fields of a virtual machine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VmSpec {
    pub name: String,
    #[serde(rename = "cpu")]
    pub cpu_cores: i32,
    #[serde(rename = "memory")]
    pub memory_mb: i32,
    pub os: String,
    pub template_id: String,
}

/// Caller-controlled fields of a Kubernetes cluster.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterSpec {
    pub name: String,
    pub region: String,
    pub node_count: i32,
    pub version: String,
    pub template_id: String,
}

/// Capabilities shared by every template-bound resource.
pub trait Resource {
    /// Template kind this resource must be rendered with.
    const KIND: TemplateKind;

    /// Placeholder names exposed to templates.
    const PLACEHOLDERS: &'static [&'static str];

    fn template_id(&self) -> &str;

    /// Flat placeholder → value mapping. Keys are exactly `PLACEHOLDERS`.
    fn render_context(&self) -> RenderContext;
}

impl Resource for VirtualMachine {
    const KIND: TemplateKind = TemplateKind::Vm;
    const PLACEHOLDERS: &'static [&'static str] = &["Name", "CPUCores", "MemoryMB", "OS"];

    fn template_id(&self) -> &str {
        &self.template_id
    }

    fn render_context(&self) -> RenderContext {
        RenderContext::new(Self::PLACEHOLDERS)
            .with("Name", Value::from(self.name.as_str()))
            .with("CPUCores", Value::from(self.cpu_cores))
            .with("MemoryMB", Value::from(self.memory_mb))
            .with("OS", Value::from(self.os.as_str()))
    }
}

impl Resource for KubernetesCluster {
    const KIND: TemplateKind = TemplateKind::Kubernetes;
    const PLACEHOLDERS: &'static [&'static str] = &["Name", "Region", "NodeCount", "Version"];

    fn template_id(&self) -> &str {
        &self.template_id
    }

    fn render_context(&self) -> RenderContext {
        RenderContext::new(Self::PLACEHOLDERS)
            .with("Name", Value::from(self.name.as_str()))
            .with("Region", Value::from(self.region.as_str()))
            .with("NodeCount", Value::from(self.node_count))
            .with("Version", Value::from(self.version.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_kind_parse() {
        assert_eq!("vm".parse::<TemplateKind>().unwrap(), TemplateKind::Vm);
        assert_eq!(
            "Kubernetes".parse::<TemplateKind>().unwrap(),
            TemplateKind::Kubernetes
        );
        assert!("docker".parse::<TemplateKind>().is_err());
    }

    #[test]
    fn test_template_kind_serde() {
        let json = serde_json::to_string(&TemplateKind::Kubernetes).unwrap();
        assert_eq!(json, "\"kubernetes\"");
        let kind: TemplateKind = serde_json::from_str("\"vm\"").unwrap();
        assert_eq!(kind, TemplateKind::Vm);
    }

    #[test]
    fn test_vm_context_covers_placeholders() {
        let vm = VirtualMachine {
            id: "vm-1".to_string(),
            name: "web1".to_string(),
            cpu_cores: 4,
            memory_mb: 2048,
            os: "Linux".to_string(),
            template_id: "t1".to_string(),
            rendered_config: String::new(),
        };
        let ctx = vm.render_context();
        let mut keys: Vec<&str> = ctx.keys().collect();
        keys.sort_unstable();
        let mut expected = VirtualMachine::PLACEHOLDERS.to_vec();
        expected.sort_unstable();
        assert_eq!(keys, expected);
        assert_eq!(ctx.get("CPUCores"), Some(&Value::Int(4)));
    }

    #[test]
    fn test_cluster_context_covers_placeholders() {
        let cluster = KubernetesCluster {
            id: "k-1".to_string(),
            name: "prod".to_string(),
            region: "eu-west".to_string(),
            node_count: 3,
            version: "1.30".to_string(),
            template_id: "t2".to_string(),
            rendered_config: String::new(),
        };
        let ctx = cluster.render_context();
        assert_eq!(ctx.len(), KubernetesCluster::PLACEHOLDERS.len());
        assert_eq!(ctx.get("Region"), Some(&Value::Str("eu-west".to_string())));
    }

    #[test]
    fn test_vm_wire_names() {
        let spec: VmSpec = serde_json::from_str(
            r#"{"name":"web1","cpu":4,"memory":2048,"os":"Linux","template_id":"t1"}"#,
        )
        .unwrap();
        assert_eq!(spec.cpu_cores, 4);
        assert_eq!(spec.memory_mb, 2048);

        let vm = VirtualMachine::from_spec("vm-1".to_string(), spec);
        let json = serde_json::to_value(&vm).unwrap();
        assert_eq!(json["cpu"], 4);
        assert_eq!(json["memory"], 2048);
        assert_eq!(json["rendered_config"], "");
    }

    #[test]
    fn test_missing_fields_default() {
        let spec: ClusterSpec = serde_json::from_str(r#"{"name":"prod"}"#).unwrap();
        assert_eq!(spec.node_count, 0);
        assert!(spec.region.is_empty());

        let req: CreateTemplateRequest = serde_json::from_str(r#"{"name":"x"}"#).unwrap();
        assert_eq!(req.kind, None);
        assert_eq!(req.id, None);
    }
}
