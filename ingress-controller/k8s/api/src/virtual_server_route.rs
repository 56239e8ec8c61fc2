use crate::virtual_server::{Action, PolicyReference, Split, Upstream};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Configures a set of subroutes that a VirtualServer delegates a path prefix
/// to.
#[derive(Clone, Debug, Default, PartialEq, CustomResource, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "k8s.nginx.org",
    version = "v1",
    kind = "VirtualServerRoute",
    status = "VirtualServerRouteStatus",
    shortname = "vsr",
    derive = "PartialEq",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct VirtualServerRouteSpec {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub ingress_class_name: String,

    #[serde(default)]
    pub host: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub upstreams: Vec<Upstream>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subroutes: Vec<Subroute>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct VirtualServerRouteStatus {
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub message: String,
    /// The VirtualServers that reference this route, as `namespace/name`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub referenced_by: Vec<String>,
}

/// A VirtualServerRoute subroute. Unlike a VirtualServer route it may not
/// delegate further, so a `route` field is rejected by validation.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Subroute {
    pub path: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub policies: Vec<PolicyReference>,

    pub route: Option<String>,

    pub action: Option<Action>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub splits: Vec<Split>,
}

// === impl VirtualServerRoute ===

impl VirtualServerRoute {
    pub fn policy_refs(&self) -> impl Iterator<Item = crate::ResourceId> + '_ {
        let ns = self.metadata.namespace.as_deref().unwrap_or_default();
        self.spec
            .subroutes
            .iter()
            .flat_map(|s| s.policies.iter())
            .map(move |p| p.resolve(ns))
    }
}
