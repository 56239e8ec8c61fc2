use crate::resource::{ResourceKey, ResourceKind};
use ingress_controller_k8s_api::{
    resource_id, Ingress, ResourceId, VirtualServer, VirtualServerRoute,
};
use std::{fmt, sync::Arc};

/// The object a problem is reported against.
#[derive(Clone, Debug, PartialEq)]
pub enum ConfigurationObject {
    Ingress(Arc<Ingress>),
    VirtualServer(Arc<VirtualServer>),
    VirtualServerRoute(Arc<VirtualServerRoute>),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Reason {
    Rejected,
    NoIngressMasterFound,
    NoVirtualServerFound,
    Ignored,
}

/// A problem to surface on an object's status or as an event.
///
/// Errors put the object into the `Invalid` state; other problems are
/// warnings.
#[derive(Clone, Debug, PartialEq)]
pub struct ConfigurationProblem {
    pub object: ConfigurationObject,
    pub is_error: bool,
    pub reason: Reason,
    pub message: String,
}

// === impl ConfigurationObject ===

impl ConfigurationObject {
    pub fn kind(&self) -> ResourceKind {
        match self {
            Self::Ingress(_) => ResourceKind::Ingress,
            Self::VirtualServer(_) => ResourceKind::VirtualServer,
            Self::VirtualServerRoute(_) => ResourceKind::VirtualServerRoute,
        }
    }

    pub fn id(&self) -> ResourceId {
        match self {
            Self::Ingress(ing) => resource_id(&**ing),
            Self::VirtualServer(vs) => resource_id(&**vs),
            Self::VirtualServerRoute(vsr) => resource_id(&**vsr),
        }
    }

    pub fn key(&self) -> ResourceKey {
        ResourceKey::new(self.kind(), self.id())
    }
}

// === impl Reason ===

impl Reason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rejected => "Rejected",
            Self::NoIngressMasterFound => "NoIngressMasterFound",
            Self::NoVirtualServerFound => "NoVirtualServerFound",
            Self::Ignored => "Ignored",
        }
    }
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// === impl ConfigurationProblem ===

impl ConfigurationProblem {
    pub fn warning(object: ConfigurationObject, reason: Reason, message: impl Into<String>) -> Self {
        Self {
            object,
            is_error: false,
            reason,
            message: message.into(),
        }
    }

    pub fn rejected(object: ConfigurationObject, message: impl Into<String>) -> Self {
        Self {
            object,
            is_error: true,
            reason: Reason::Rejected,
            message: message.into(),
        }
    }

    pub fn key(&self) -> ResourceKey {
        self.object.key()
    }

    /// Problems are reported again only when their severity, reason or
    /// message changes.
    pub fn same_as(&self, other: &Self) -> bool {
        self.is_error == other.is_error
            && self.reason == other.reason
            && self.message == other.message
    }
}
