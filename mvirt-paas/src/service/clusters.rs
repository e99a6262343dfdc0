use std::sync::Arc;

use crate::model::{ClusterSpec, KubernetesCluster};
use crate::processor::TemplateProcessor;
use crate::store::Repository;
use crate::validation;

use super::{IdGenerator, Result};

pub struct ClusterService {
    store: Arc<dyn Repository>,
    processor: Arc<TemplateProcessor>,
    ids: Arc<dyn IdGenerator>,
}

impl ClusterService {
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

    pub fn create(&self, spec: ClusterSpec) -> Result<KubernetesCluster> {
        validation::validate_create_cluster(Some(&spec)).into_result()?;

        let mut cluster = KubernetesCluster::from_spec(self.ids.next_id(), spec);
        cluster.rendered_config = self.processor.render_for_cluster(&cluster)?;
        Ok(self.store.create_cluster(cluster)?)
    }

    pub fn get(&self, id: &str) -> Result<KubernetesCluster> {
        validation::validate_id(Some(id)).into_result()?;
        Ok(self.store.get_cluster(id)?)
    }

    pub fn list(&self) -> Result<Vec<KubernetesCluster>> {
        let mut clusters = self.store.list_clusters()?;
        clusters.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(clusters)
    }

    pub fn update(&self, id: &str, spec: ClusterSpec) -> Result<KubernetesCluster> {
        validation::validate_update_cluster(id, Some(&spec)).into_result()?;

        let mut cluster = KubernetesCluster::from_spec(id.to_string(), spec);
        cluster.rendered_config = self.processor.render_for_cluster(&cluster)?;
        Ok(self.store.update_cluster(cluster)?)
    }

    pub fn delete(&self, id: &str) -> Result<()> {
        validation::validate_id(Some(id)).into_result()?;
        Ok(self.store.delete_cluster(id)?)
    }
}
