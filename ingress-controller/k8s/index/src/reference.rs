use ingress_controller_k8s_api::{
    ingress::{APP_PROTECT_LOG_CONF_ANNOTATION, APP_PROTECT_POLICY_ANNOTATION, JWT_KEY_ANNOTATION},
    Ingress, IngressExt, ResourceId, VirtualServer, VirtualServerRoute,
};

/// Decides whether an object references the dependency `namespace/name`.
pub trait ReferenceChecker {
    fn is_referenced_by_ingress(&self, namespace: &str, name: &str, ingress: &Ingress) -> bool;

    fn is_referenced_by_minion(&self, namespace: &str, name: &str, minion: &Ingress) -> bool;

    fn is_referenced_by_virtual_server(&self, namespace: &str, name: &str, vs: &VirtualServer)
        -> bool;

    fn is_referenced_by_virtual_server_route(
        &self,
        namespace: &str,
        name: &str,
        vsr: &VirtualServerRoute,
    ) -> bool;
}

/// TLS secrets, and with NGINX Plus, JWT key secrets.
#[derive(Clone, Debug, Default)]
pub struct SecretReferenceChecker {
    pub is_plus: bool,
}

#[derive(Clone, Debug, Default)]
pub struct ServiceReferenceChecker(());

#[derive(Clone, Debug, Default)]
pub struct PolicyReferenceChecker(());

/// App Protect policies and log configurations, referenced by an annotation
/// on regular and master Ingresses.
#[derive(Clone, Debug)]
pub struct AppProtectReferenceChecker {
    annotation: &'static str,
}

fn in_namespace(namespace: &str, object_ns: Option<&str>) -> bool {
    object_ns.unwrap_or_default() == namespace
}

// === impl SecretReferenceChecker ===

impl SecretReferenceChecker {
    pub fn new(is_plus: bool) -> Self {
        Self { is_plus }
    }

    fn references_jwt_key(&self, name: &str, ingress: &Ingress) -> bool {
        self.is_plus && ingress.annotation(JWT_KEY_ANNOTATION) == Some(name)
    }
}

impl ReferenceChecker for SecretReferenceChecker {
    fn is_referenced_by_ingress(&self, namespace: &str, name: &str, ingress: &Ingress) -> bool {
        if !in_namespace(namespace, ingress.metadata.namespace.as_deref()) {
            return false;
        }
        ingress
            .tls()
            .iter()
            .any(|tls| tls.secret_name.as_deref() == Some(name))
            || self.references_jwt_key(name, ingress)
    }

    fn is_referenced_by_minion(&self, namespace: &str, name: &str, minion: &Ingress) -> bool {
        in_namespace(namespace, minion.metadata.namespace.as_deref())
            && self.references_jwt_key(name, minion)
    }

    fn is_referenced_by_virtual_server(
        &self,
        namespace: &str,
        name: &str,
        vs: &VirtualServer,
    ) -> bool {
        in_namespace(namespace, vs.metadata.namespace.as_deref())
            && vs
                .spec
                .tls
                .as_ref()
                .and_then(|tls| tls.secret.as_deref())
                == Some(name)
    }

    fn is_referenced_by_virtual_server_route(&self, _: &str, _: &str, _: &VirtualServerRoute) -> bool {
        false
    }
}

// === impl ServiceReferenceChecker ===

impl ReferenceChecker for ServiceReferenceChecker {
    fn is_referenced_by_ingress(&self, namespace: &str, name: &str, ingress: &Ingress) -> bool {
        in_namespace(namespace, ingress.metadata.namespace.as_deref())
            && ingress.backend_services().contains(&name)
    }

    fn is_referenced_by_minion(&self, namespace: &str, name: &str, minion: &Ingress) -> bool {
        self.is_referenced_by_ingress(namespace, name, minion)
    }

    fn is_referenced_by_virtual_server(
        &self,
        namespace: &str,
        name: &str,
        vs: &VirtualServer,
    ) -> bool {
        in_namespace(namespace, vs.metadata.namespace.as_deref())
            && vs.spec.upstreams.iter().any(|u| u.service == name)
    }

    fn is_referenced_by_virtual_server_route(
        &self,
        namespace: &str,
        name: &str,
        vsr: &VirtualServerRoute,
    ) -> bool {
        in_namespace(namespace, vsr.metadata.namespace.as_deref())
            && vsr.spec.upstreams.iter().any(|u| u.service == name)
    }
}

// === impl PolicyReferenceChecker ===

impl ReferenceChecker for PolicyReferenceChecker {
    fn is_referenced_by_ingress(&self, _: &str, _: &str, _: &Ingress) -> bool {
        false
    }

    fn is_referenced_by_minion(&self, _: &str, _: &str, _: &Ingress) -> bool {
        false
    }

    fn is_referenced_by_virtual_server(
        &self,
        namespace: &str,
        name: &str,
        vs: &VirtualServer,
    ) -> bool {
        let policy = ResourceId::new(namespace, name);
        vs.policy_refs().any(|p| p == policy)
    }

    fn is_referenced_by_virtual_server_route(
        &self,
        namespace: &str,
        name: &str,
        vsr: &VirtualServerRoute,
    ) -> bool {
        let policy = ResourceId::new(namespace, name);
        vsr.policy_refs().any(|p| p == policy)
    }
}

// === impl AppProtectReferenceChecker ===

impl AppProtectReferenceChecker {
    pub fn policies() -> Self {
        Self {
            annotation: APP_PROTECT_POLICY_ANNOTATION,
        }
    }

    pub fn log_confs() -> Self {
        Self {
            annotation: APP_PROTECT_LOG_CONF_ANNOTATION,
        }
    }
}

impl ReferenceChecker for AppProtectReferenceChecker {
    fn is_referenced_by_ingress(&self, namespace: &str, name: &str, ingress: &Ingress) -> bool {
        let Some(value) = ingress.annotation(self.annotation) else {
            return false;
        };
        // Unqualified names resolve in the Ingress's namespace.
        ResourceId::from_reference(value, ingress.metadata.namespace.as_deref().unwrap_or_default())
            == ResourceId::new(namespace, name)
    }

    fn is_referenced_by_minion(&self, _: &str, _: &str, _: &Ingress) -> bool {
        false
    }

    fn is_referenced_by_virtual_server(&self, _: &str, _: &str, _: &VirtualServer) -> bool {
        false
    }

    fn is_referenced_by_virtual_server_route(&self, _: &str, _: &str, _: &VirtualServerRoute) -> bool {
        false
    }
}
