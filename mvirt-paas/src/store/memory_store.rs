//! In-memory repository.
//!
//! Each entity kind lives in its own partition behind its own `RwLock`, so a
//! VM write never waits on a template read. Locks are held for the map
//! operation only; cloning happens outside the critical section where
//! possible.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::model::{EntityKind, KubernetesCluster, Template, TemplateKind, VirtualMachine};

use super::error::{Result, StoreError};
use super::traits::{ClusterStore, TemplateStore, VmStore};

struct Partition<T> {
    kind: EntityKind,
    entries: RwLock<HashMap<String, T>>,
}

impl<T: Clone> Partition<T> {
    fn new(kind: EntityKind) -> Self {
        Self {
            kind,
            entries: RwLock::new(HashMap::new()),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<String, T>>> {
        self.entries
            .read()
            .map_err(|_| StoreError::Internal(format!("{} partition lock poisoned", self.kind)))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<String, T>>> {
        self.entries
            .write()
            .map_err(|_| StoreError::Internal(format!("{} partition lock poisoned", self.kind)))
    }

    fn insert(&self, id: String, entity: T) -> Result<T> {
        let stored = entity.clone();
        self.write()?.insert(id, entity);
        Ok(stored)
    }

    fn get(&self, id: &str) -> Result<T> {
        self.read()?
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::not_found(self.kind, id))
    }

    fn list(&self, keep: impl Fn(&T) -> bool) -> Result<Vec<T>> {
        Ok(self.read()?.values().filter(|e| keep(e)).cloned().collect())
    }

    fn replace(&self, id: &str, entity: T) -> Result<T> {
        let stored = entity.clone();
        let mut map = self.write()?;
        match map.get_mut(id) {
            Some(slot) => {
                *slot = entity;
                Ok(stored)
            }
            None => Err(StoreError::not_found(self.kind, id)),
        }
    }

    fn remove(&self, id: &str) -> Result<()> {
        self.write()?
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| StoreError::not_found(self.kind, id))
    }
}

/// Volatile, process-lifetime repository for all three entity kinds.
pub struct MemoryStore {
    templates: Partition<Template>,
    vms: Partition<VirtualMachine>,
    clusters: Partition<KubernetesCluster>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            templates: Partition::new(EntityKind::Template),
            vms: Partition::new(EntityKind::VirtualMachine),
            clusters: Partition::new(EntityKind::KubernetesCluster),
        }
    }
}

impl TemplateStore for MemoryStore {
    fn create_template(&self, template: Template) -> Result<Template> {
        self.templates.insert(template.id.clone(), template)
    }

    fn get_template(&self, id: &str) -> Result<Template> {
        self.templates.get(id)
    }

    fn list_templates(&self, kind: Option<TemplateKind>) -> Result<Vec<Template>> {
        self.templates
            .list(|t| kind.is_none_or(|wanted| t.kind == wanted))
    }

    fn update_template(&self, template: Template) -> Result<Template> {
        let id = template.id.clone();
        self.templates.replace(&id, template)
    }

    fn delete_template(&self, id: &str) -> Result<()> {
        self.templates.remove(id)
    }
}

impl VmStore for MemoryStore {
    fn create_vm(&self, vm: VirtualMachine) -> Result<VirtualMachine> {
        self.vms.insert(vm.id.clone(), vm)
    }

    fn get_vm(&self, id: &str) -> Result<VirtualMachine> {
        self.vms.get(id)
    }

    fn list_vms(&self) -> Result<Vec<VirtualMachine>> {
        self.vms.list(|_| true)
    }

    fn update_vm(&self, vm: VirtualMachine) -> Result<VirtualMachine> {
        let id = vm.id.clone();
        self.vms.replace(&id, vm)
    }

    fn delete_vm(&self, id: &str) -> Result<()> {
        self.vms.remove(id)
    }
}

impl ClusterStore for MemoryStore {
    fn create_cluster(&self, cluster: KubernetesCluster) -> Result<KubernetesCluster> {
        self.clusters.insert(cluster.id.clone(), cluster)
    }

    fn get_cluster(&self, id: &str) -> Result<KubernetesCluster> {
        self.clusters.get(id)
    }

    fn list_clusters(&self) -> Result<Vec<KubernetesCluster>> {
        self.clusters.list(|_| true)
    }

    fn update_cluster(&self, cluster: KubernetesCluster) -> Result<KubernetesCluster> {
        let id = cluster.id.clone();
        self.clusters.replace(&id, cluster)
    }

    fn delete_cluster(&self, id: &str) -> Result<()> {
        self.clusters.remove(id)
    }
}
