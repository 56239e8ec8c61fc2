pub use k8s_openapi::api::networking::v1::{
    HTTPIngressPath, HTTPIngressRuleValue, Ingress, IngressBackend, IngressRule,
    IngressServiceBackend, IngressSpec, IngressTLS,
};
use std::str::FromStr;

/// Marks an Ingress as part of a mergeable group.
pub const MERGEABLE_INGRESS_TYPE_ANNOTATION: &str = "nginx.org/mergeable-ingress-type";

/// The legacy class annotation. When present it takes precedence over
/// `spec.ingressClassName`.
pub const INGRESS_CLASS_ANNOTATION: &str = "kubernetes.io/ingress.class";

/// Names a Secret holding a JWT key.
pub const JWT_KEY_ANNOTATION: &str = "nginx.com/jwt-key";

pub const APP_PROTECT_POLICY_ANNOTATION: &str = "appprotect.f5.com/app-protect-policy";

pub const APP_PROTECT_LOG_CONF_ANNOTATION: &str = "appprotect.f5.com/app-protect-security-log";

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MergeableType {
    Master,
    Minion,
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("must be one of: 'master' or 'minion'")]
pub struct InvalidMergeableType(());

/// Accessors for the parts of an Ingress the controller inspects.
pub trait IngressExt {
    fn annotation(&self, key: &str) -> Option<&str>;

    fn rules(&self) -> &[IngressRule];

    fn tls(&self) -> &[IngressTLS];

    fn default_backend(&self) -> Option<&IngressBackend>;

    /// The class requested by the annotation, or failing that, by the spec.
    /// An empty annotation defers to the spec. Empty when neither is set.
    fn ingress_class(&self) -> &str {
        self.annotation(INGRESS_CLASS_ANNOTATION)
            .filter(|class| !class.is_empty())
            .or_else(|| self.spec_ingress_class())
            .unwrap_or_default()
    }

    fn spec_ingress_class(&self) -> Option<&str>;

    /// The parsed mergeable type. Unset and unparseable values are treated as
    /// a regular Ingress here; validation reports the latter.
    fn mergeable_type(&self) -> Option<MergeableType> {
        self.annotation(MERGEABLE_INGRESS_TYPE_ANNOTATION)
            .and_then(|v| v.parse().ok())
    }

    fn is_master(&self) -> bool {
        self.mergeable_type() == Some(MergeableType::Master)
    }

    fn is_minion(&self) -> bool {
        self.mergeable_type() == Some(MergeableType::Minion)
    }

    /// Non-empty hosts named by the rules, in declaration order.
    fn hosts(&self) -> Vec<&str> {
        self.rules()
            .iter()
            .filter_map(|r| r.host.as_deref())
            .filter(|h| !h.is_empty())
            .collect()
    }

    /// The HTTP paths of every rule.
    fn paths(&self) -> Vec<&HTTPIngressPath> {
        self.rules()
            .iter()
            .filter_map(|r| r.http.as_ref())
            .flat_map(|http| http.paths.iter())
            .collect()
    }

    /// Names of every Service the Ingress routes to.
    fn backend_services(&self) -> Vec<&str> {
        self.default_backend()
            .into_iter()
            .chain(self.paths().into_iter().map(|p| &p.backend))
            .filter_map(|b| b.service.as_ref())
            .map(|s| s.name.as_str())
            .collect()
    }
}

// === impl MergeableType ===

impl FromStr for MergeableType {
    type Err = InvalidMergeableType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "master" => Ok(Self::Master),
            "minion" => Ok(Self::Minion),
            _ => Err(InvalidMergeableType(())),
        }
    }
}

// === impl IngressExt ===

impl IngressExt for Ingress {
    fn annotation(&self, key: &str) -> Option<&str> {
        self.metadata
            .annotations
            .as_ref()
            .and_then(|a| a.get(key))
            .map(String::as_str)
    }

    fn rules(&self) -> &[IngressRule] {
        self.spec
            .as_ref()
            .and_then(|s| s.rules.as_deref())
            .unwrap_or_default()
    }

    fn tls(&self) -> &[IngressTLS] {
        self.spec
            .as_ref()
            .and_then(|s| s.tls.as_deref())
            .unwrap_or_default()
    }

    fn default_backend(&self) -> Option<&IngressBackend> {
        self.spec.as_ref().and_then(|s| s.default_backend.as_ref())
    }

    fn spec_ingress_class(&self) -> Option<&str> {
        self.spec
            .as_ref()
            .and_then(|s| s.ingress_class_name.as_deref())
    }
}
