use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Configures load balancing for a single host.
#[derive(Clone, Debug, Default, PartialEq, CustomResource, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "k8s.nginx.org",
    version = "v1",
    kind = "VirtualServer",
    status = "VirtualServerStatus",
    shortname = "vs",
    derive = "PartialEq",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct VirtualServerSpec {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub ingress_class_name: String,

    #[serde(default)]
    pub host: String,

    pub tls: Option<Tls>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub policies: Vec<PolicyReference>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub upstreams: Vec<Upstream>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub routes: Vec<Route>,
}

/// Reported by the controller after each reconciliation of the resource.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct VirtualServerStatus {
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub message: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Tls {
    pub secret: Option<String>,
    pub redirect: Option<TlsRedirect>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TlsRedirect {
    #[serde(default)]
    pub enable: bool,
    pub code: Option<u16>,
    pub based_on: Option<String>,
}

/// Refers to a Policy resource. The namespace defaults to the namespace of the
/// referencing object.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PolicyReference {
    pub name: String,
    pub namespace: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Upstream {
    pub name: String,
    #[serde(default)]
    pub service: String,
    #[serde(default)]
    pub port: u16,
    pub subselector: Option<std::collections::BTreeMap<String, String>>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Route {
    pub path: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub policies: Vec<PolicyReference>,

    /// Delegates the path to a VirtualServerRoute, as `name` or `namespace/name`.
    pub route: Option<String>,

    pub action: Option<Action>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub splits: Vec<Split>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Action {
    /// Names an upstream to pass requests to.
    pub pass: Option<String>,
    pub redirect: Option<ActionRedirect>,
    #[serde(rename = "return")]
    pub r#return: Option<ActionReturn>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ActionRedirect {
    pub url: String,
    pub code: Option<u16>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ActionReturn {
    pub code: Option<u16>,
    #[serde(rename = "type")]
    pub content_type: Option<String>,
    #[serde(default)]
    pub body: String,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Split {
    pub weight: u32,
    pub action: Option<Action>,
}

// === impl VirtualServer ===

impl VirtualServer {
    /// Iterates over every policy reference in the resource, resolving omitted
    /// namespaces to the resource's namespace.
    pub fn policy_refs(&self) -> impl Iterator<Item = crate::ResourceId> + '_ {
        let ns = self.metadata.namespace.as_deref().unwrap_or_default();
        self.spec
            .policies
            .iter()
            .chain(self.spec.routes.iter().flat_map(|r| r.policies.iter()))
            .map(move |p| p.resolve(ns))
    }
}

// === impl PolicyReference ===

impl PolicyReference {
    pub fn resolve(&self, default_ns: &str) -> crate::ResourceId {
        crate::ResourceId::new(
            self.namespace
                .as_deref()
                .filter(|ns| !ns.is_empty())
                .unwrap_or(default_ns),
            self.name.clone(),
        )
    }
}
