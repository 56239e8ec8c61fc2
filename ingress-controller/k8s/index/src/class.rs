use ingress_controller_k8s_api::{Ingress, IngressExt, VirtualServer, VirtualServerRoute};

/// The ingress class served by this controller.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IngressClass {
    pub name: String,
    /// When set, Ingresses without a class are not served.
    pub use_ingress_class_only: bool,
}

// === impl IngressClass ===

impl IngressClass {
    pub fn new(name: impl Into<String>, use_ingress_class_only: bool) -> Self {
        Self {
            name: name.into(),
            use_ingress_class_only,
        }
    }

    pub fn accepts_ingress(&self, ingress: &Ingress) -> bool {
        let class = ingress.ingress_class();
        if self.use_ingress_class_only {
            return class == self.name;
        }
        self.matches(class)
    }

    pub fn accepts_virtual_server(&self, vs: &VirtualServer) -> bool {
        self.matches(&vs.spec.ingress_class_name)
    }

    pub fn accepts_virtual_server_route(&self, vsr: &VirtualServerRoute) -> bool {
        self.matches(&vsr.spec.ingress_class_name)
    }

    fn matches(&self, class: &str) -> bool {
        class.is_empty() || class == self.name
    }
}

impl Default for IngressClass {
    fn default() -> Self {
        Self::new("nginx", false)
    }
}
