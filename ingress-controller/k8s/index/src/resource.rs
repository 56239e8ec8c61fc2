use ingress_controller_k8s_api::{
    resource_id, Ingress, IngressExt, ObjectMeta, Resource as _, ResourceId, VirtualServer,
    VirtualServerRoute,
};
use std::{
    collections::{BTreeMap, BTreeSet},
    fmt,
    sync::Arc,
};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceKind {
    Ingress,
    VirtualServer,
    VirtualServerRoute,
}

/// Identifies a resource across kinds, formatted as `<kind>/<namespace>/<name>`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceKey {
    pub kind: ResourceKind,
    pub id: ResourceId,
}

/// A top-level unit of configuration stored in the host table.
///
/// Regular and master Ingresses are held as [`IngressConfiguration`]s (a
/// master carries its minions); VirtualServers are held with the
/// VirtualServerRoutes they attach.
#[derive(Clone, Debug, PartialEq)]
pub enum Resource {
    Ingress(IngressConfiguration),
    VirtualServer(VirtualServerConfiguration),
}

#[derive(Clone, Debug, PartialEq)]
pub struct IngressConfiguration {
    pub ingress: Arc<Ingress>,
    pub is_master: bool,
    /// Only populated for masters, ordered by minion key.
    pub minions: Vec<MinionConfiguration>,
    /// The declared hosts this Ingress currently owns.
    pub valid_hosts: BTreeSet<String>,
    pub warnings: Vec<String>,
    /// Warnings for minions, keyed by the minion's identity.
    pub child_warnings: BTreeMap<ResourceId, Vec<String>>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct MinionConfiguration {
    pub ingress: Arc<Ingress>,
    /// The declared paths this minion currently serves.
    pub valid_paths: BTreeSet<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct VirtualServerConfiguration {
    pub virtual_server: Arc<VirtualServer>,
    pub virtual_server_routes: Vec<Arc<VirtualServerRoute>>,
    pub warnings: Vec<String>,
}

/// Decides between two objects of the same tier: the older object wins; for
/// equal creation times the greater UID wins. Returns true when `m1` wins.
pub fn choose_object_meta_winner(m1: &ObjectMeta, m2: &ObjectMeta) -> bool {
    if m1.creation_timestamp == m2.creation_timestamp {
        return m1.uid > m2.uid;
    }
    m1.creation_timestamp < m2.creation_timestamp
}

fn same_meta(m1: &ObjectMeta, m2: &ObjectMeta) -> bool {
    m1.namespace == m2.namespace && m1.name == m2.name && m1.generation == m2.generation
}

fn same_meta_with_annotations(m1: &ObjectMeta, m2: &ObjectMeta) -> bool {
    same_meta(m1, m2) && m1.annotations == m2.annotations
}

// === impl ResourceKind ===

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ingress => "Ingress",
            Self::VirtualServer => "VirtualServer",
            Self::VirtualServerRoute => "VirtualServerRoute",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// === impl ResourceKey ===

impl ResourceKey {
    pub fn new(kind: ResourceKind, id: ResourceId) -> Self {
        Self { kind, id }
    }

    pub fn ingress(id: ResourceId) -> Self {
        Self::new(ResourceKind::Ingress, id)
    }

    pub fn virtual_server(id: ResourceId) -> Self {
        Self::new(ResourceKind::VirtualServer, id)
    }

    pub fn virtual_server_route(id: ResourceId) -> Self {
        Self::new(ResourceKind::VirtualServerRoute, id)
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind, self.id)
    }
}

// === impl Resource ===

impl Resource {
    pub fn key(&self) -> ResourceKey {
        match self {
            Self::Ingress(ic) => ResourceKey::ingress(resource_id(&*ic.ingress)),
            Self::VirtualServer(vsc) => {
                ResourceKey::virtual_server(resource_id(&*vsc.virtual_server))
            }
        }
    }

    pub fn kind(&self) -> ResourceKind {
        match self {
            Self::Ingress(_) => ResourceKind::Ingress,
            Self::VirtualServer(_) => ResourceKind::VirtualServer,
        }
    }

    pub fn meta(&self) -> &ObjectMeta {
        match self {
            Self::Ingress(ic) => ic.ingress.meta(),
            Self::VirtualServer(vsc) => vsc.virtual_server.meta(),
        }
    }

    pub fn warnings(&self) -> &[String] {
        match self {
            Self::Ingress(ic) => &ic.warnings,
            Self::VirtualServer(vsc) => &vsc.warnings,
        }
    }

    /// Ranks kinds competing for a host: masters outrank regular Ingresses,
    /// which outrank VirtualServers.
    pub fn tier(&self) -> u8 {
        match self {
            Self::Ingress(ic) if ic.is_master => 2,
            Self::Ingress(_) => 1,
            Self::VirtualServer(_) => 0,
        }
    }

    /// Returns true if this resource keeps a host that `other` also claims.
    pub fn wins(&self, other: &Resource) -> bool {
        match self.tier().cmp(&other.tier()) {
            std::cmp::Ordering::Equal => choose_object_meta_winner(self.meta(), other.meta()),
            ord => ord.is_gt(),
        }
    }

    pub fn acquire_host(&mut self, host: String) {
        // A VirtualServer has a single host, so its ownership is tracked by
        // the host table alone.
        if let Self::Ingress(ic) = self {
            ic.valid_hosts.insert(host);
        }
    }

    pub fn release_host(&mut self, host: &str) {
        if let Self::Ingress(ic) = self {
            ic.valid_hosts.remove(host);
        }
    }

    pub fn add_warning(&mut self, warning: String) {
        match self {
            Self::Ingress(ic) => ic.warnings.push(warning),
            Self::VirtualServer(vsc) => vsc.warnings.push(warning),
        }
    }

    /// Compares the parts of two resources that consumers observe. Ingress
    /// warnings are not compared; VirtualServer warnings are, since they are
    /// reported on the VirtualServer's status.
    pub fn is_equal(&self, other: &Resource) -> bool {
        match (self, other) {
            (Self::Ingress(a), Self::Ingress(b)) => {
                same_meta_with_annotations(a.ingress.meta(), b.ingress.meta())
                    && a.valid_hosts == b.valid_hosts
                    && a.is_master == b.is_master
                    && a.minions.len() == b.minions.len()
                    && a.minions.iter().zip(&b.minions).all(|(a, b)| {
                        same_meta_with_annotations(a.ingress.meta(), b.ingress.meta())
                    })
            }
            (Self::VirtualServer(a), Self::VirtualServer(b)) => {
                same_meta(a.virtual_server.meta(), b.virtual_server.meta())
                    && a.warnings == b.warnings
                    && a.virtual_server_routes.len() == b.virtual_server_routes.len()
                    && a
                        .virtual_server_routes
                        .iter()
                        .zip(&b.virtual_server_routes)
                        .all(|(a, b)| same_meta(a.meta(), b.meta()))
            }
            _ => false,
        }
    }
}

// === impl IngressConfiguration ===

impl IngressConfiguration {
    pub fn regular(ingress: Arc<Ingress>) -> Self {
        Self {
            ingress,
            is_master: false,
            minions: Vec::new(),
            valid_hosts: BTreeSet::new(),
            warnings: Vec::new(),
            child_warnings: BTreeMap::new(),
        }
    }

    pub fn master(
        ingress: Arc<Ingress>,
        minions: Vec<MinionConfiguration>,
        child_warnings: BTreeMap<ResourceId, Vec<String>>,
    ) -> Self {
        Self {
            is_master: true,
            minions,
            child_warnings,
            ..Self::regular(ingress)
        }
    }

    /// The host of a master, which declares exactly one.
    pub fn master_host(&self) -> Option<&str> {
        self.ingress.hosts().first().copied()
    }
}

// === impl MinionConfiguration ===

impl MinionConfiguration {
    pub fn new(ingress: Arc<Ingress>) -> Self {
        Self {
            ingress,
            valid_paths: BTreeSet::new(),
        }
    }
}

// === impl VirtualServerConfiguration ===

impl VirtualServerConfiguration {
    pub fn new(
        virtual_server: Arc<VirtualServer>,
        virtual_server_routes: Vec<Arc<VirtualServerRoute>>,
        warnings: Vec<String>,
    ) -> Self {
        Self {
            virtual_server,
            virtual_server_routes,
            warnings,
        }
    }

    pub fn host(&self) -> &str {
        &self.virtual_server.spec.host
    }

    pub fn attaches(&self, id: &ResourceId) -> bool {
        self.virtual_server_routes
            .iter()
            .any(|vsr| resource_id(&**vsr) == *id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ingress_controller_k8s_api::Time;

    fn meta(uid: &str, created: Option<&str>) -> ObjectMeta {
        ObjectMeta {
            namespace: Some("default".to_string()),
            name: Some(uid.to_string()),
            uid: Some(uid.to_string()),
            creation_timestamp: created.map(|ts| {
                serde_json::from_value::<Time>(serde_json::json!(ts)).expect("valid timestamp")
            }),
            ..Default::default()
        }
    }

    #[test]
    fn older_object_wins() {
        let older = meta("a", Some("2024-01-01T00:00:00Z"));
        let newer = meta("b", Some("2024-01-02T00:00:00Z"));
        assert!(choose_object_meta_winner(&older, &newer));
        assert!(!choose_object_meta_winner(&newer, &older));
    }

    #[test]
    fn greater_uid_breaks_timestamp_ties() {
        let a = meta("a", Some("2024-01-01T00:00:00Z"));
        let b = meta("b", Some("2024-01-01T00:00:00Z"));
        assert!(choose_object_meta_winner(&b, &a));
        assert!(!choose_object_meta_winner(&a, &b));
        // Fully tied objects never win, so the contender evaluated second
        // takes the host.
        assert!(!choose_object_meta_winner(&a, &a.clone()));
    }
}
