//! Ingress Controller Configuration
//!
//! The configuration index converts watch events for Ingresses, VirtualServers and
//! VirtualServerRoutes into a host table where each host is owned by at most one resource:
//!
//! - A regular `Ingress` claims each host named by its rules.
//! - A master `Ingress` (annotated `nginx.org/mergeable-ingress-type: master`) claims a single
//!   host and aggregates the minion Ingresses that declare the same host. Minions never own a
//!   host themselves.
//! - A `VirtualServer` claims its host and attaches the `VirtualServerRoute`s that its routes
//!   delegate to.
//!
//! ```text
//! [ minion Ingress ] -> [ master Ingress ] -\
//!                            [ Ingress ] ----> [ host ]
//! [ VirtualServerRoute ] -> [ VirtualServer ] -/
//! ```
//!
//! When resources compete for a host, masters win over regular Ingresses, which win over
//! VirtualServers; among equals the oldest object wins. Each mutation rebuilds the host table and
//! returns the changes that the configuration renderer must apply, together with the problems
//! that should be reported on the objects involved.

#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

mod change;
mod class;
mod configuration;
mod index;
pub mod metrics;
mod problem;
mod reference;
mod resource;
pub mod validation;

#[cfg(test)]
mod tests;

pub use self::{
    change::{squash_resource_changes, Operation, ResourceChange},
    class::IngressClass,
    configuration::{Configuration, ResourceFilter, Updates},
    index::{Index, SharedIndex, Update},
    problem::{ConfigurationObject, ConfigurationProblem, Reason},
    reference::{
        AppProtectReferenceChecker, PolicyReferenceChecker, ReferenceChecker,
        SecretReferenceChecker, ServiceReferenceChecker,
    },
    resource::{
        choose_object_meta_winner, IngressConfiguration, MinionConfiguration, Resource,
        ResourceKey, ResourceKind, VirtualServerConfiguration,
    },
    validation::{DefaultValidator, FieldError, FieldErrors, Validator},
};
