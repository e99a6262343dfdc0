//! Startup templates.

use tracing::{info, warn};

use crate::config::{TemplateFileConfig, TemplatesConfig};
use crate::model::{CreateTemplateRequest, Template, TemplateKind};
use crate::service::{Result, TemplateService};

pub const DEFAULT_VM_TEMPLATE: &str = "Name: {{ .Name }}
CPU: {{ .CPUCores }} cores
Memory: {{ .MemoryMB }} MB
OS: {{ .OS }}
";

pub const DEFAULT_KUBERNETES_TEMPLATE: &str = "Name: {{ .Name }}
Region: {{ .Region }}
Node Count: {{ .NodeCount }}
Kubernetes Version: {{ .Version }}
";

fn default_body(kind: TemplateKind) -> &'static str {
    match kind {
        TemplateKind::Vm => DEFAULT_VM_TEMPLATE,
        TemplateKind::Kubernetes => DEFAULT_KUBERNETES_TEMPLATE,
    }
}

/// Create the configured VM and Kubernetes templates. Unreadable or blank
/// files fall back to the built-in bodies.
pub fn load_templates(
    config: &TemplatesConfig,
    templates: &TemplateService,
) -> Result<Vec<Template>> {
    [
        (TemplateKind::Vm, &config.vm),
        (TemplateKind::Kubernetes, &config.kubernetes),
    ]
    .into_iter()
    .map(|(kind, entry)| load_one(kind, entry, templates))
    .collect()
}

fn load_one(
    kind: TemplateKind,
    entry: &TemplateFileConfig,
    templates: &TemplateService,
) -> Result<Template> {
    let raw_body = match std::fs::read_to_string(&entry.file) {
        Ok(body) if body.trim().is_empty() => {
            warn!(
                "{} template {} is empty, using built-in body",
                kind,
                entry.file.display()
            );
            default_body(kind).to_string()
        }
        Ok(body) => body,
        Err(e) => {
            warn!(
                "Cannot read {} template {}: {}, using built-in body",
                kind,
                entry.file.display(),
                e
            );
            default_body(kind).to_string()
        }
    };

    let template = templates.create(CreateTemplateRequest {
        id: Some(entry.id.clone()),
        name: entry.name.clone(),
        kind: Some(kind),
        raw_body,
    })?;
    info!("Loaded {} template {} ({})", kind, template.name, template.id);
    Ok(template)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ClusterSpec, VmSpec};
    use crate::service::testing::services;
    use std::path::PathBuf;

    fn missing_files() -> TemplatesConfig {
        let mut config = TemplatesConfig::default();
        config.vm.file = PathBuf::from("/nonexistent/vm.tmpl");
        config.kubernetes.file = PathBuf::from("/nonexistent/k8s.tmpl");
        config
    }

    #[test]
    fn test_falls_back_to_builtin_bodies() {
        let s = services();
        let loaded = load_templates(&missing_files(), &s.templates).unwrap();
        assert_eq!(loaded.len(), 2);

        let vm_template = s.templates.get("vm-template-1").unwrap();
        assert_eq!(vm_template.kind, TemplateKind::Vm);
        assert_eq!(vm_template.raw_body, DEFAULT_VM_TEMPLATE);

        let k8s_template = s.templates.get("k8s-template-1").unwrap();
        assert_eq!(k8s_template.kind, TemplateKind::Kubernetes);
        assert_eq!(k8s_template.name, "Basic Kubernetes Template");
    }

    #[test]
    fn test_reads_template_files() {
        let dir = tempfile::tempdir().unwrap();
        let vm_file = dir.path().join("vm.tmpl");
        std::fs::write(&vm_file, "vm {{.Name}}").unwrap();

        let mut config = missing_files();
        config.vm.file = vm_file;
        config.vm.id = "custom-vm".to_string();

        let s = services();
        load_templates(&config, &s.templates).unwrap();
        assert_eq!(s.templates.get("custom-vm").unwrap().raw_body, "vm {{.Name}}");
    }

    #[test]
    fn test_blank_files_fall_back_to_builtin_bodies() {
        let dir = tempfile::tempdir().unwrap();
        let vm_file = dir.path().join("vm.tmpl");
        let k8s_file = dir.path().join("k8s.tmpl");
        std::fs::write(&vm_file, "").unwrap();
        std::fs::write(&k8s_file, "  \n\t\n").unwrap();

        let mut config = missing_files();
        config.vm.file = vm_file;
        config.kubernetes.file = k8s_file;

        let s = services();
        let loaded = load_templates(&config, &s.templates).unwrap();
        assert_eq!(loaded[0].raw_body, DEFAULT_VM_TEMPLATE);
        assert_eq!(loaded[1].raw_body, DEFAULT_KUBERNETES_TEMPLATE);
    }

    #[test]
    fn test_builtin_bodies_render() {
        let s = services();
        load_templates(&missing_files(), &s.templates).unwrap();

        let vm = s
            .vms
            .create(VmSpec {
                name: "web1".to_string(),
                cpu_cores: 2,
                memory_mb: 1024,
                os: "Ubuntu".to_string(),
                template_id: "vm-template-1".to_string(),
            })
            .unwrap();
        assert_eq!(
            vm.rendered_config,
            "Name: web1\nCPU: 2 cores\nMemory: 1024 MB\nOS: Ubuntu\n"
        );

        let cluster = s
            .clusters
            .create(ClusterSpec {
                name: "prod".to_string(),
                region: "us-east-1".to_string(),
                node_count: 5,
                version: "1.29".to_string(),
                template_id: "k8s-template-1".to_string(),
            })
            .unwrap();
        assert_eq!(
            cluster.rendered_config,
            "Name: prod\nRegion: us-east-1\nNode Count: 5\nKubernetes Version: 1.29\n"
        );
    }

    #[test]
    fn test_invalid_entry_fails() {
        let mut config = missing_files();
        config.vm.name = String::new();
        let s = services();
        assert!(load_templates(&config, &s.templates).is_err());
    }
}
