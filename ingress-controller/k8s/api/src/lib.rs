#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

pub mod ingress;
mod resource_id;
pub mod virtual_server;
pub mod virtual_server_route;

pub use self::{
    ingress::{Ingress, IngressExt, MergeableType},
    resource_id::{InvalidKey, ResourceId},
    virtual_server::{VirtualServer, VirtualServerSpec, VirtualServerStatus},
    virtual_server_route::{VirtualServerRoute, VirtualServerRouteSpec, VirtualServerRouteStatus},
};
pub use k8s_openapi::{
    api::{self, networking::v1 as networking},
    apimachinery::pkg::apis::meta::v1::{ObjectMeta, Time},
};
pub use kube::{
    api::{Api, Patch, PatchParams},
    Client, Resource, ResourceExt,
};

/// Returns the `<namespace>/<name>` identity of an object.
pub fn resource_id<T: Resource>(obj: &T) -> ResourceId {
    let meta = obj.meta();
    ResourceId::new(
        meta.namespace.clone().unwrap_or_default(),
        meta.name.clone().unwrap_or_default(),
    )
}
