//! Reports the outcome of each configuration update on the status of the
//! VirtualServers and VirtualServerRoutes involved.
//!
//! Ingresses carry no state in their status, so their changes and problems
//! are only logged.

use crate::{
    index::{ConfigurationObject, Operation, Resource, Update},
    k8s::{
        self, resource_id, ResourceId, VirtualServer, VirtualServerRoute, VirtualServerRouteStatus,
        VirtualServerStatus,
    },
};
use tokio::sync::mpsc::UnboundedReceiver;

const FIELD_MANAGER: &str = "nginx-ingress-controller";

pub const STATE_VALID: &str = "Valid";
pub const STATE_WARNING: &str = "Warning";
pub const STATE_INVALID: &str = "Invalid";

const REASON_ADDED_OR_UPDATED: &str = "AddedOrUpdated";
const REASON_ADDED_OR_UPDATED_WITH_WARNING: &str = "AddedOrUpdatedWithWarning";

pub struct Controller {
    client: k8s::Client,
    updates: UnboundedReceiver<Update>,
    patch_params: k8s::PatchParams,
}

/// A status to write to a single object.
#[derive(Clone, Debug, PartialEq)]
pub enum StatusUpdate {
    VirtualServer {
        id: ResourceId,
        status: VirtualServerStatus,
    },
    VirtualServerRoute {
        id: ResourceId,
        status: VirtualServerRouteStatus,
    },
}

// === impl Controller ===

impl Controller {
    pub fn new(client: k8s::Client, updates: UnboundedReceiver<Update>) -> Self {
        Self {
            client,
            updates,
            patch_params: k8s::PatchParams::apply(FIELD_MANAGER),
        }
    }

    pub async fn run(mut self) {
        // A failed patch is logged; the next update for the object rewrites it.
        while let Some(update) = self.updates.recv().await {
            log_update(&update);
            for status in status_updates(&update) {
                self.patch(status).await;
            }
        }
        tracing::debug!("Updates channel closed");
    }

    async fn patch(&self, update: StatusUpdate) {
        let (kind, id, result) = match update {
            StatusUpdate::VirtualServer { id, status } => {
                let api = k8s::Api::<VirtualServer>::namespaced(self.client.clone(), &id.namespace);
                let patch = k8s::Patch::Merge(serde_json::json!({ "status": status }));
                let result = api.patch_status(&id.name, &self.patch_params, &patch).await;
                ("VirtualServer", id, result.map(|_| ()))
            }
            StatusUpdate::VirtualServerRoute { id, status } => {
                let api =
                    k8s::Api::<VirtualServerRoute>::namespaced(self.client.clone(), &id.namespace);
                // referencedBy is always written so that a detached route
                // stops listing its former VirtualServer.
                let patch = k8s::Patch::Merge(serde_json::json!({
                    "status": {
                        "state": status.state,
                        "reason": status.reason,
                        "message": status.message,
                        "referencedBy": status.referenced_by,
                    }
                }));
                let result = api.patch_status(&id.name, &self.patch_params, &patch).await;
                ("VirtualServerRoute", id, result.map(|_| ()))
            }
        };

        match result {
            Ok(()) => tracing::debug!(kind, %id, "Patched status"),
            Err(error) => tracing::error!(kind, %id, %error, "Failed to patch status"),
        }
    }
}

/// Derives the statuses to write for an update.
///
/// Added or updated VirtualServers become `Valid`, or `Warning` when they
/// carry warnings; the routes they attach become `Valid` and reference them.
/// Problems then override the status of the objects they name. Deletes
/// produce no status of their own: a rejected object is reported through its
/// problem.
pub fn status_updates(update: &Update) -> Vec<StatusUpdate> {
    let mut statuses = Vec::new();

    for change in &update.changes {
        if change.op != Operation::AddOrUpdate {
            continue;
        }
        let Resource::VirtualServer(vsc) = &*change.resource else {
            continue;
        };

        let vs_id = resource_id(&*vsc.virtual_server);
        let (state, reason, message) = if vsc.warnings.is_empty() {
            (
                STATE_VALID,
                REASON_ADDED_OR_UPDATED,
                format!("Configuration for {vs_id} was added or updated"),
            )
        } else {
            (
                STATE_WARNING,
                REASON_ADDED_OR_UPDATED_WITH_WARNING,
                format!(
                    "Configuration for {vs_id} was added or updated with warning(s): {}",
                    vsc.warnings.join("; ")
                ),
            )
        };

        for vsr in &vsc.virtual_server_routes {
            let id = resource_id(&**vsr);
            let message = format!("Configuration for {id} was added or updated");
            statuses.push(StatusUpdate::VirtualServerRoute {
                id,
                status: VirtualServerRouteStatus {
                    state: STATE_VALID.to_string(),
                    reason: REASON_ADDED_OR_UPDATED.to_string(),
                    message,
                    referenced_by: vec![vs_id.to_string()],
                },
            });
        }

        statuses.push(StatusUpdate::VirtualServer {
            id: vs_id,
            status: VirtualServerStatus {
                state: state.to_string(),
                reason: reason.to_string(),
                message,
            },
        });
    }

    for problem in &update.problems {
        let state = if problem.is_error {
            STATE_INVALID
        } else {
            STATE_WARNING
        };
        match &problem.object {
            ConfigurationObject::Ingress(_) => {}
            ConfigurationObject::VirtualServer(vs) => statuses.push(StatusUpdate::VirtualServer {
                id: resource_id(&**vs),
                status: VirtualServerStatus {
                    state: state.to_string(),
                    reason: problem.reason.to_string(),
                    message: problem.message.clone(),
                },
            }),
            ConfigurationObject::VirtualServerRoute(vsr) => {
                statuses.push(StatusUpdate::VirtualServerRoute {
                    id: resource_id(&**vsr),
                    status: VirtualServerRouteStatus {
                        state: state.to_string(),
                        reason: problem.reason.to_string(),
                        message: problem.message.clone(),
                        referenced_by: Vec::new(),
                    },
                })
            }
        }
    }

    statuses
}

pub(crate) fn log_update(update: &Update) {
    for change in &update.changes {
        let resource = change.key();
        match (change.op, change.error.as_deref()) {
            (Operation::Delete, Some(error)) => {
                tracing::warn!(%resource, %error, "Configuration removed after a rejection")
            }
            (Operation::Delete, None) => tracing::info!(%resource, "Configuration removed"),
            (Operation::AddOrUpdate, _) => {
                let warnings = change.resource.warnings();
                if warnings.is_empty() {
                    tracing::info!(%resource, "Configuration added or updated");
                } else {
                    tracing::warn!(
                        %resource,
                        warnings = %warnings.join("; "),
                        "Configuration added or updated with warnings"
                    );
                }
            }
        }
    }

    for problem in &update.problems {
        tracing::warn!(
            object = %problem.key(),
            reason = %problem.reason,
            is_error = problem.is_error,
            message = %problem.message,
            "Configuration problem"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{
        Configuration, ConfigurationProblem, DefaultValidator, IngressClass, Reason,
    };
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use serde_json::json;
    use std::sync::Arc;

    fn metadata(name: &str) -> serde_json::Value {
        json!({
            "namespace": "default",
            "name": name,
            "uid": name,
            "generation": 1,
            "creationTimestamp": "2024-01-01T00:00:00Z",
        })
    }

    fn mk_virtual_server(route: Option<&str>) -> VirtualServer {
        let routes = route
            .map(|route| vec![json!({ "path": "/coffee", "route": route })])
            .unwrap_or_default();
        serde_json::from_value(json!({
            "apiVersion": "k8s.nginx.org/v1",
            "kind": "VirtualServer",
            "metadata": metadata("cafe"),
            "spec": { "host": "cafe.example.com", "routes": routes }
        }))
        .expect("virtual server must deserialize")
    }

    fn mk_virtual_server_route(name: &str) -> VirtualServerRoute {
        serde_json::from_value(json!({
            "apiVersion": "k8s.nginx.org/v1",
            "kind": "VirtualServerRoute",
            "metadata": metadata(name),
            "spec": {
                "host": "cafe.example.com",
                "upstreams": [{ "name": "backend", "service": "coffee-svc", "port": 80 }],
                "subroutes": [{ "path": "/coffee", "action": { "pass": "backend" } }]
            }
        }))
        .expect("virtual server route must deserialize")
    }

    fn mk_configuration() -> Configuration {
        Configuration::new(
            IngressClass::default(),
            Box::<DefaultValidator>::default(),
            false,
        )
    }

    fn update((changes, problems): crate::index::Updates) -> Update {
        Update { changes, problems }
    }

    #[test]
    fn valid_virtual_server_and_its_routes() {
        let mut config = mk_configuration();
        config.upsert_virtual_server_route(mk_virtual_server_route("coffee"));
        let update = update(config.upsert_virtual_server(mk_virtual_server(Some("coffee"))));

        assert_eq!(
            status_updates(&update),
            vec![
                StatusUpdate::VirtualServerRoute {
                    id: ResourceId::new("default", "coffee"),
                    status: VirtualServerRouteStatus {
                        state: "Valid".to_string(),
                        reason: "AddedOrUpdated".to_string(),
                        message: "Configuration for default/coffee was added or updated"
                            .to_string(),
                        referenced_by: vec!["default/cafe".to_string()],
                    },
                },
                StatusUpdate::VirtualServer {
                    id: ResourceId::new("default", "cafe"),
                    status: VirtualServerStatus {
                        state: "Valid".to_string(),
                        reason: "AddedOrUpdated".to_string(),
                        message: "Configuration for default/cafe was added or updated".to_string(),
                    },
                },
            ]
        );
    }

    #[test]
    fn virtual_server_with_warnings() {
        let mut config = mk_configuration();
        let update = update(config.upsert_virtual_server(mk_virtual_server(Some("coffee"))));

        assert_eq!(
            status_updates(&update),
            vec![StatusUpdate::VirtualServer {
                id: ResourceId::new("default", "cafe"),
                status: VirtualServerStatus {
                    state: "Warning".to_string(),
                    reason: "AddedOrUpdatedWithWarning".to_string(),
                    message: "Configuration for default/cafe was added or updated with warning(s): VirtualServerRoute default/coffee doesn't exist or invalid".to_string(),
                },
            }]
        );
    }

    #[test]
    fn deletes_have_no_status() {
        let mut config = mk_configuration();
        config.upsert_virtual_server(mk_virtual_server(None));
        let update = update(config.delete_virtual_server(&ResourceId::new("default", "cafe")));

        assert_eq!(update.changes.len(), 1);
        assert_eq!(status_updates(&update), vec![]);
    }

    #[rstest]
    #[case::error(true, "Invalid")]
    #[case::warning(false, "Warning")]
    fn problems_set_state(#[case] is_error: bool, #[case] state: &str) {
        let vsr = Arc::new(mk_virtual_server_route("coffee"));
        let problem = ConfigurationProblem {
            object: ConfigurationObject::VirtualServerRoute(vsr),
            is_error,
            reason: Reason::NoVirtualServerFound,
            message: "VirtualServer is invalid or doesn't exist".to_string(),
        };
        let update = Update {
            changes: vec![],
            problems: vec![problem],
        };

        assert_eq!(
            status_updates(&update),
            vec![StatusUpdate::VirtualServerRoute {
                id: ResourceId::new("default", "coffee"),
                status: VirtualServerRouteStatus {
                    state: state.to_string(),
                    reason: "NoVirtualServerFound".to_string(),
                    message: "VirtualServer is invalid or doesn't exist".to_string(),
                    referenced_by: vec![],
                },
            }]
        );
    }

    #[test]
    fn rejected_virtual_server_is_invalid() {
        let mut config = mk_configuration();
        let mut vs = mk_virtual_server(None);
        vs.spec.host = String::new();
        let update = update(config.upsert_virtual_server(vs));

        assert_eq!(
            status_updates(&update),
            vec![StatusUpdate::VirtualServer {
                id: ResourceId::new("default", "cafe"),
                status: VirtualServerStatus {
                    state: "Invalid".to_string(),
                    reason: "Rejected".to_string(),
                    message:
                        "VirtualServer default/cafe was rejected with error: spec.host: Required value"
                            .to_string(),
                },
            }]
        );
    }

    #[test]
    fn ingress_problems_are_not_written() {
        let ingress = serde_json::from_value(json!({
            "metadata": metadata("cafe"),
            "spec": { "rules": [{ "host": "" }] }
        }))
        .expect("ingress must deserialize");
        let update = Update {
            changes: vec![],
            problems: vec![ConfigurationProblem::rejected(
                ConfigurationObject::Ingress(Arc::new(ingress)),
                "spec.rules[0].host: Required value",
            )],
        };
        assert_eq!(status_updates(&update), vec![]);
    }
}
