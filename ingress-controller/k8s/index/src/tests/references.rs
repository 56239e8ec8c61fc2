use super::*;
use pretty_assertions::assert_eq;
use serde_json::json;

const CREATED: &str = "2024-01-01T00:00:00Z";

fn mk_configuration_with(validator: DefaultValidator) -> Configuration {
    let is_plus = validator.is_plus;
    Configuration::new(IngressClass::default(), Box::new(validator), is_plus)
}

fn mk_annotated_ingress(name: &str, host: &str, annotations: serde_json::Value) -> Ingress {
    serde_json::from_value(json!({
        "metadata": metadata("default", name, CREATED, annotations),
        "spec": {
            "tls": [{ "hosts": [host], "secretName": format!("{name}-secret") }],
            "rules": [{
                "host": host,
                "http": { "paths": [{
                    "path": "/",
                    "pathType": "Prefix",
                    "backend": { "service": { "name": "svc", "port": { "number": 80 } } }
                }] }
            }]
        }
    }))
    .expect("ingress must deserialize")
}

#[test]
fn secrets() {
    let mut config = mk_configuration_with(DefaultValidator {
        is_plus: true,
        ..Default::default()
    });
    let cafe = mk_annotated_ingress("cafe", "cafe.example.com", json!({ "nginx.com/jwt-key": "jwk" }));
    config.upsert_ingress(cafe.clone());

    let tea = serde_json::from_value(json!({
        "apiVersion": "k8s.nginx.org/v1",
        "kind": "VirtualServer",
        "metadata": metadata("default", "tea", CREATED, json!({})),
        "spec": { "host": "tea.example.com", "tls": { "secret": "tea-secret" } }
    }))
    .expect("virtual server must deserialize");
    config.upsert_virtual_server(tea);

    assert_eq!(
        keys(&config.find_resources_for_secret("default", "cafe-secret")),
        vec!["Ingress/default/cafe"]
    );
    assert_eq!(
        keys(&config.find_resources_for_secret("default", "jwk")),
        vec!["Ingress/default/cafe"]
    );
    assert_eq!(
        keys(&config.find_resources_for_secret("default", "tea-secret")),
        vec!["VirtualServer/default/tea"]
    );
    assert!(config.find_resources_for_secret("other", "cafe-secret").is_empty());

    // JWT keys are only used by NGINX Plus.
    assert!(!SecretReferenceChecker::new(false).is_referenced_by_ingress("default", "jwk", &cafe));
    assert!(SecretReferenceChecker::new(false).is_referenced_by_ingress(
        "default",
        "cafe-secret",
        &cafe
    ));
}

#[test]
fn services_and_endpoints() {
    let mut config = mk_configuration();
    config.upsert_ingress(mk_ingress("default", "plain", CREATED, &["a.example.com"]));
    config.upsert_ingress(mk_master("default", "cafe-master", CREATED, "m.example.com"));
    config.upsert_ingress(mk_minion("default", "coffee", CREATED, "m.example.com", &["/coffee"]));
    config.upsert_virtual_server(mk_virtual_server(
        "default",
        "cafe",
        CREATED,
        "cafe.example.com",
        &[("/coffee", "coffee")],
    ));
    config.upsert_virtual_server_route(mk_virtual_server_route(
        "default",
        "coffee",
        "cafe.example.com",
        &["/coffee"],
    ));

    // Resources are listed in host order.
    assert_eq!(
        keys(&config.find_resources_for_service("default", "coffee-svc")),
        vec!["VirtualServer/default/cafe", "Ingress/default/cafe-master"]
    );
    assert_eq!(
        keys(&config.find_resources_for_service("default", "svc")),
        vec!["Ingress/default/plain"]
    );
    assert_eq!(
        keys(&config.find_resources_for_endpoints("default", "coffee-svc")),
        keys(&config.find_resources_for_service("default", "coffee-svc")),
    );
    assert!(config.find_resources_for_service("other", "svc").is_empty());
}

#[test]
fn resources_are_listed_once() {
    let mut config = mk_configuration();
    config.upsert_ingress(mk_ingress(
        "default",
        "cafe",
        CREATED,
        &["a.example.com", "b.example.com", "c.example.com"],
    ));
    assert_eq!(
        keys(&config.find_resources_for_service("default", "svc")),
        vec!["Ingress/default/cafe"]
    );
}

#[test]
fn policies() {
    let mut config = mk_configuration();
    let vs = serde_json::from_value(json!({
        "apiVersion": "k8s.nginx.org/v1",
        "kind": "VirtualServer",
        "metadata": metadata("default", "cafe", CREATED, json!({})),
        "spec": {
            "host": "cafe.example.com",
            "policies": [{ "name": "rate" }, { "name": "auth", "namespace": "security" }],
            "routes": [{ "path": "/coffee", "route": "coffee" }]
        }
    }))
    .expect("virtual server must deserialize");
    config.upsert_virtual_server(vs);

    let vsr = serde_json::from_value(json!({
        "apiVersion": "k8s.nginx.org/v1",
        "kind": "VirtualServerRoute",
        "metadata": metadata("default", "coffee", CREATED, json!({})),
        "spec": {
            "host": "cafe.example.com",
            "upstreams": [{ "name": "backend", "service": "coffee-svc", "port": 80 }],
            "subroutes": [{
                "path": "/coffee",
                "policies": [{ "name": "waf" }],
                "action": { "pass": "backend" }
            }]
        }
    }))
    .expect("virtual server route must deserialize");
    config.upsert_virtual_server_route(vsr);

    for (ns, name) in [("default", "rate"), ("security", "auth"), ("default", "waf")] {
        assert_eq!(
            keys(&config.find_resources_for_policy(ns, name)),
            vec!["VirtualServer/default/cafe"],
            "{ns}/{name}"
        );
    }
    assert!(config.find_resources_for_policy("default", "auth").is_empty());
    assert!(config.find_resources_for_policy("security", "rate").is_empty());
}

#[test]
fn app_protect_resources() {
    let mut config = mk_configuration_with(DefaultValidator {
        app_protect_enabled: true,
        ..Default::default()
    });
    config.upsert_ingress(mk_annotated_ingress(
        "cafe",
        "cafe.example.com",
        json!({
            "appprotect.f5.com/app-protect-policy": "waf/strict",
            "appprotect.f5.com/app-protect-security-log": "logconf",
        }),
    ));

    assert_eq!(
        keys(&config.find_resources_for_app_protect_policy("waf", "strict")),
        vec!["Ingress/default/cafe"]
    );
    assert!(config
        .find_resources_for_app_protect_policy("default", "strict")
        .is_empty());
    assert_eq!(
        keys(&config.find_resources_for_app_protect_log_conf("default", "logconf")),
        vec!["Ingress/default/cafe"]
    );
    assert!(config
        .find_resources_for_app_protect_log_conf("waf", "logconf")
        .is_empty());
}
