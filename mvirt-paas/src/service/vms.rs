use std::sync::Arc;

use crate::model::{VirtualMachine, VmSpec};
use crate::processor::TemplateProcessor;
use crate::store::Repository;
use crate::validation;

use super::{IdGenerator, Result};

pub struct VmService {
    store: Arc<dyn Repository>,
    processor: Arc<TemplateProcessor>,
    ids: Arc<dyn IdGenerator>,
}

impl VmService {
    pub fn new(
        store: Arc<dyn Repository>,
        processor: Arc<TemplateProcessor>,
        ids: Arc<dyn IdGenerator>,
    ) -> Self {
        Self {
            store,
            processor,
            ids,
        }
    }

    /// Create a VM and render its configuration.
    pub fn create(&self, spec: VmSpec) -> Result<VirtualMachine> {
        validation::validate_create_vm(Some(&spec)).into_result()?;

        let mut vm = VirtualMachine::from_spec(self.ids.next_id(), spec);
        vm.rendered_config = self.processor.render_for_vm(&vm)?;
        Ok(self.store.create_vm(vm)?)
    }

    pub fn get(&self, id: &str) -> Result<VirtualMachine> {
        validation::validate_id(Some(id)).into_result()?;
        Ok(self.store.get_vm(id)?)
    }

    /// All VMs, sorted by ID.
    pub fn list(&self) -> Result<Vec<VirtualMachine>> {
        let mut vms = self.store.list_vms()?;
        vms.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(vms)
    }

    /// Replace a VM, re-rendering against the (possibly new) template.
    pub fn update(&self, id: &str, spec: VmSpec) -> Result<VirtualMachine> {
        validation::validate_update_vm(id, Some(&spec)).into_result()?;

        let mut vm = VirtualMachine::from_spec(id.to_string(), spec);
        vm.rendered_config = self.processor.render_for_vm(&vm)?;
        Ok(self.store.update_vm(vm)?)
    }

    pub fn delete(&self, id: &str) -> Result<()> {
        validation::validate_id(Some(id)).into_result()?;
        Ok(self.store.delete_vm(id)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{TemplateKind, UpdateTemplateRequest};
    use crate::render::RenderError;
    use crate::service::ServiceError;
    use crate::service::testing::{add_template, services};
    use std::thread;

    fn spec(template_id: &str) -> VmSpec {
        VmSpec {
            name: "web1".to_string(),
            cpu_cores: 4,
            memory_mb: 2048,
            os: "Linux".to_string(),
            template_id: template_id.to_string(),
        }
    }

    #[test]
    fn test_create_renders() {
        let s = services();
        add_template(&s, "t1", TemplateKind::Vm, "{{.Name}} has {{.CPUCores}} cores");

        let vm = s.vms.create(spec("t1")).unwrap();
        assert!(!vm.id.is_empty());
        assert_eq!(vm.rendered_config, "web1 has 4 cores");
        assert_eq!(s.vms.get(&vm.id).unwrap(), vm);
    }

    #[test]
    fn test_create_rejects_invalid_cpu() {
        let s = services();
        add_template(&s, "t1", TemplateKind::Vm, "{{.Name}}");

        let mut bad = spec("t1");
        bad.cpu_cores = 0;
        match s.vms.create(bad) {
            Err(ServiceError::ValidationFailed(errors)) => {
                assert!(errors.contains("cpu", "must be at least 1"));
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(s.vms.list().unwrap().is_empty());
    }

    #[test]
    fn test_type_mismatch_creates_nothing() {
        let s = services();
        add_template(&s, "k1", TemplateKind::Kubernetes, "{{.Region}}");

        let err = s.vms.create(spec("k1")).unwrap_err();
        assert!(matches!(err, ServiceError::TypeMismatch { .. }));
        assert!(s.vms.list().unwrap().is_empty());
        // The ID that would have been assigned was never stored.
        assert!(matches!(s.vms.get("id-1"), Err(ServiceError::NotFound { .. })));
    }

    #[test]
    fn test_unknown_template() {
        let s = services();
        let err = s.vms.create(spec("missing")).unwrap_err();
        assert_eq!(err.to_string(), "template missing not found");
        assert!(s.vms.list().unwrap().is_empty());
    }

    #[test]
    fn test_render_failure_creates_nothing() {
        let s = services();
        add_template(&s, "t1", TemplateKind::Vm, "{{.Name}} in {{.Region}}");

        let err = s.vms.create(spec("t1")).unwrap_err();
        assert!(matches!(
            err,
            ServiceError::RenderFailure(RenderError::UnknownField { .. })
        ));
        assert!(s.vms.list().unwrap().is_empty());
    }

    #[test]
    fn test_rendered_config_survives_template_changes() {
        let s = services();
        add_template(&s, "t1", TemplateKind::Vm, "v1 {{.Name}}");
        let vm = s.vms.create(spec("t1")).unwrap();

        s.templates
            .update(UpdateTemplateRequest {
                id: "t1".to_string(),
                name: "t1".to_string(),
                kind: Some(TemplateKind::Vm),
                raw_body: "v2 {{.Name}}".to_string(),
            })
            .unwrap();
        assert_eq!(s.vms.get(&vm.id).unwrap().rendered_config, "v1 web1");

        s.templates.delete("t1").unwrap();
        assert_eq!(s.vms.get(&vm.id).unwrap().rendered_config, "v1 web1");
    }

    #[test]
    fn test_update_rerenders_with_new_template() {
        let s = services();
        add_template(&s, "t1", TemplateKind::Vm, "old {{.Name}}");
        add_template(&s, "t2", TemplateKind::Vm, "{{.Name}}: {{.MemoryMB}} MB");
        let vm = s.vms.create(spec("t1")).unwrap();

        let mut changed = spec("t2");
        changed.memory_mb = 4096;
        let updated = s.vms.update(&vm.id, changed).unwrap();
        assert_eq!(updated.id, vm.id);
        assert_eq!(updated.rendered_config, "web1: 4096 MB");
        assert_eq!(s.vms.get(&vm.id).unwrap(), updated);
    }

    #[test]
    fn test_failed_update_leaves_record() {
        let s = services();
        add_template(&s, "t1", TemplateKind::Vm, "{{.Name}}");
        add_template(&s, "k1", TemplateKind::Kubernetes, "{{.Name}}");
        let vm = s.vms.create(spec("t1")).unwrap();

        let err = s.vms.update(&vm.id, spec("k1")).unwrap_err();
        assert!(matches!(err, ServiceError::TypeMismatch { .. }));
        assert_eq!(s.vms.get(&vm.id).unwrap(), vm);
    }

    #[test]
    fn test_update_and_delete_missing() {
        let s = services();
        add_template(&s, "t1", TemplateKind::Vm, "{{.Name}}");
        assert!(matches!(
            s.vms.update("ghost", spec("t1")),
            Err(ServiceError::NotFound { .. })
        ));
        assert!(matches!(
            s.vms.delete("ghost"),
            Err(ServiceError::NotFound { .. })
        ));
    }

    #[test]
    fn test_delete() {
        let s = services();
        add_template(&s, "t1", TemplateKind::Vm, "{{.Name}}");
        let vm = s.vms.create(spec("t1")).unwrap();
        s.vms.delete(&vm.id).unwrap();
        assert!(s.vms.get(&vm.id).is_err());
        assert!(s.vms.list().unwrap().is_empty());
    }

    #[test]
    fn test_concurrent_creates() {
        let s = services();
        add_template(&s, "t1", TemplateKind::Vm, "{{.Name}}");

        thread::scope(|scope| {
            for worker in 0..4 {
                let s = &s;
                scope.spawn(move || {
                    for i in 0..25 {
                        let mut vm = spec("t1");
                        vm.name = format!("vm-{}-{}", worker, i);
                        s.vms.create(vm).unwrap();
                    }
                });
            }
        });

        let vms = s.vms.list().unwrap();
        assert_eq!(vms.len(), 100);
        assert!(vms.iter().all(|vm| vm.rendered_config == vm.name));
    }
}
