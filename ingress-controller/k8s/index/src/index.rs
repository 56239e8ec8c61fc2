use crate::{
    change::ResourceChange, configuration::Configuration, problem::ConfigurationProblem,
};
use ingress_controller_k8s_api::{Ingress, ResourceId, VirtualServer, VirtualServerRoute};
use parking_lot::RwLock;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;

pub type SharedIndex = Arc<RwLock<Index>>;

/// Feeds watch events into a [`Configuration`] and publishes the outcome of
/// each event.
#[derive(Debug)]
pub struct Index {
    configuration: Configuration,
    updates: UnboundedSender<Update>,
}

/// The changes and problems that resulted from a single watch event.
#[derive(Clone, Debug, PartialEq)]
pub struct Update {
    pub changes: Vec<ResourceChange>,
    pub problems: Vec<ConfigurationProblem>,
}

// === impl Index ===

impl Index {
    pub fn shared(configuration: Configuration, updates: UnboundedSender<Update>) -> SharedIndex {
        Arc::new(RwLock::new(Self {
            configuration,
            updates,
        }))
    }

    pub fn configuration(&self) -> &Configuration {
        &self.configuration
    }

    fn publish(&self, (changes, problems): (Vec<ResourceChange>, Vec<ConfigurationProblem>)) {
        if changes.is_empty() && problems.is_empty() {
            return;
        }
        if self.updates.send(Update { changes, problems }).is_err() {
            tracing::warn!("Update receiver dropped");
        }
    }
}

impl kubert::index::IndexNamespacedResource<Ingress> for Index {
    fn apply(&mut self, ingress: Ingress) {
        let updates = self.configuration.upsert_ingress(ingress);
        self.publish(updates);
    }

    fn delete(&mut self, namespace: String, name: String) {
        let updates = self
            .configuration
            .delete_ingress(&ResourceId::new(namespace, name));
        self.publish(updates);
    }
}

impl kubert::index::IndexNamespacedResource<VirtualServer> for Index {
    fn apply(&mut self, vs: VirtualServer) {
        let updates = self.configuration.upsert_virtual_server(vs);
        self.publish(updates);
    }

    fn delete(&mut self, namespace: String, name: String) {
        let updates = self
            .configuration
            .delete_virtual_server(&ResourceId::new(namespace, name));
        self.publish(updates);
    }
}

impl kubert::index::IndexNamespacedResource<VirtualServerRoute> for Index {
    fn apply(&mut self, vsr: VirtualServerRoute) {
        let updates = self.configuration.upsert_virtual_server_route(vsr);
        self.publish(updates);
    }

    fn delete(&mut self, namespace: String, name: String) {
        let updates = self
            .configuration
            .delete_virtual_server_route(&ResourceId::new(namespace, name));
        self.publish(updates);
    }
}
