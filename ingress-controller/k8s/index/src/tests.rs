mod mergeable;
mod references;
mod squash;

use super::*;
use ingress_controller_k8s_api::{Ingress, VirtualServer, VirtualServerRoute};
use serde_json::{json, Value};

fn mk_configuration() -> Configuration {
    Configuration::new(
        IngressClass::default(),
        Box::<DefaultValidator>::default(),
        false,
    )
}

fn metadata(ns: &str, name: &str, created: &str, annotations: Value) -> Value {
    json!({
        "namespace": ns,
        "name": name,
        "uid": format!("{ns}-{name}"),
        "generation": 1,
        "creationTimestamp": created,
        "annotations": annotations,
    })
}

/// A regular Ingress routing `/` on each host to `svc`.
fn mk_ingress(ns: &str, name: &str, created: &str, hosts: &[&str]) -> Ingress {
    let rules = hosts
        .iter()
        .map(|host| {
            json!({
                "host": host,
                "http": { "paths": [{
                    "path": "/",
                    "pathType": "Prefix",
                    "backend": { "service": { "name": "svc", "port": { "number": 80 } } }
                }] }
            })
        })
        .collect::<Vec<_>>();
    serde_json::from_value(json!({
        "metadata": metadata(ns, name, created, json!({})),
        "spec": { "rules": rules }
    }))
    .expect("ingress must deserialize")
}

fn mk_master(ns: &str, name: &str, created: &str, host: &str) -> Ingress {
    serde_json::from_value(json!({
        "metadata": metadata(ns, name, created, json!({
            "nginx.org/mergeable-ingress-type": "master"
        })),
        "spec": { "rules": [{ "host": host }] }
    }))
    .expect("master must deserialize")
}

fn mk_minion(ns: &str, name: &str, created: &str, host: &str, paths: &[&str]) -> Ingress {
    let paths = paths
        .iter()
        .map(|path| {
            json!({
                "path": path,
                "pathType": "Prefix",
                "backend": { "service": { "name": format!("{name}-svc"), "port": { "number": 80 } } }
            })
        })
        .collect::<Vec<_>>();
    serde_json::from_value(json!({
        "metadata": metadata(ns, name, created, json!({
            "nginx.org/mergeable-ingress-type": "minion"
        })),
        "spec": { "rules": [{ "host": host, "http": { "paths": paths } }] }
    }))
    .expect("minion must deserialize")
}

/// A VirtualServer delegating each `(path, route)` pair to a VirtualServerRoute.
fn mk_virtual_server(
    ns: &str,
    name: &str,
    created: &str,
    host: &str,
    routes: &[(&str, &str)],
) -> VirtualServer {
    let routes = routes
        .iter()
        .map(|(path, route)| json!({ "path": path, "route": route }))
        .collect::<Vec<_>>();
    serde_json::from_value(json!({
        "apiVersion": "k8s.nginx.org/v1",
        "kind": "VirtualServer",
        "metadata": metadata(ns, name, created, json!({})),
        "spec": { "host": host, "routes": routes }
    }))
    .expect("virtual server must deserialize")
}

/// A VirtualServerRoute passing each subroute to a single upstream.
fn mk_virtual_server_route(
    ns: &str,
    name: &str,
    host: &str,
    paths: &[&str],
) -> VirtualServerRoute {
    let subroutes = paths
        .iter()
        .map(|path| json!({ "path": path, "action": { "pass": "backend" } }))
        .collect::<Vec<_>>();
    serde_json::from_value(json!({
        "apiVersion": "k8s.nginx.org/v1",
        "kind": "VirtualServerRoute",
        "metadata": metadata(ns, name, "2024-01-01T00:00:00Z", json!({})),
        "spec": {
            "host": host,
            "upstreams": [{ "name": "backend", "service": format!("{name}-svc"), "port": 80 }],
            "subroutes": subroutes
        }
    }))
    .expect("virtual server route must deserialize")
}

/// Renders changes as `(op, key)` pairs.
fn changes_of(changes: &[ResourceChange]) -> Vec<(Operation, String)> {
    changes
        .iter()
        .map(|c| (c.op, c.key().to_string()))
        .collect()
}

/// Renders problems as `(key, reason, is_error, message)` tuples.
fn problems_of(problems: &[ConfigurationProblem]) -> Vec<(String, Reason, bool, String)> {
    problems
        .iter()
        .map(|p| (p.key().to_string(), p.reason, p.is_error, p.message.clone()))
        .collect()
}

fn ingress_config(resource: &Resource) -> &IngressConfiguration {
    match resource {
        Resource::Ingress(ic) => ic,
        Resource::VirtualServer(_) => panic!("expected an Ingress configuration"),
    }
}

fn virtual_server_config(resource: &Resource) -> &VirtualServerConfiguration {
    match resource {
        Resource::VirtualServer(vsc) => vsc,
        Resource::Ingress(_) => panic!("expected a VirtualServer configuration"),
    }
}

fn keys(resources: &[std::sync::Arc<Resource>]) -> Vec<String> {
    resources.iter().map(|r| r.key().to_string()).collect()
}
