use super::*;
use pretty_assertions::assert_eq;
use std::sync::Arc;

const CREATED: &str = "2024-01-01T00:00:00Z";

fn ingress(name: &str) -> Arc<Resource> {
    let ingress = mk_ingress("default", name, CREATED, &["cafe.example.com"]);
    Arc::new(Resource::Ingress(IngressConfiguration::regular(Arc::new(
        ingress,
    ))))
}

fn virtual_server(name: &str) -> Arc<Resource> {
    let vs = mk_virtual_server("default", name, CREATED, "cafe.example.com", &[]);
    Arc::new(Resource::VirtualServer(VirtualServerConfiguration::new(
        Arc::new(vs),
        vec![],
        vec![],
    )))
}

fn delete(resource: &Arc<Resource>) -> ResourceChange {
    ResourceChange::delete(resource.clone())
}

fn update(resource: &Arc<Resource>) -> ResourceChange {
    ResourceChange::add_or_update(resource.clone())
}

#[test]
fn keeps_last_change_per_resource() {
    let a = virtual_server("a");
    let b = virtual_server("b");

    let squashed = squash_resource_changes(vec![delete(&a), update(&b), delete(&b)]);
    assert_eq!(
        changes_of(&squashed),
        vec![
            (Operation::Delete, "VirtualServer/default/a".to_string()),
            (Operation::Delete, "VirtualServer/default/b".to_string()),
        ]
    );
}

#[test]
fn orders_deletes_before_updates() {
    let ing = ingress("cafe");
    let vs = virtual_server("cafe");

    let squashed = squash_resource_changes(vec![delete(&ing), update(&ing), delete(&vs)]);
    assert_eq!(
        changes_of(&squashed),
        vec![
            (Operation::Delete, "VirtualServer/default/cafe".to_string()),
            (Operation::AddOrUpdate, "Ingress/default/cafe".to_string()),
        ]
    );
}

#[test]
fn keeps_first_appearance_order_within_groups() {
    let a = ingress("a");
    let b = ingress("b");
    let c = virtual_server("c");

    let squashed = squash_resource_changes(vec![update(&c), update(&b), update(&a), update(&c)]);
    assert_eq!(
        changes_of(&squashed),
        vec![
            (Operation::AddOrUpdate, "VirtualServer/default/c".to_string()),
            (Operation::AddOrUpdate, "Ingress/default/b".to_string()),
            (Operation::AddOrUpdate, "Ingress/default/a".to_string()),
        ]
    );
}

#[rstest::rstest]
#[case::empty(vec![])]
#[case::single(vec![update(&ingress("a"))])]
#[case::mixed(vec![update(&ingress("a")), delete(&virtual_server("a")), delete(&ingress("a"))])]
fn squashing_is_idempotent(#[case] changes: Vec<ResourceChange>) {
    let once = squash_resource_changes(changes);
    let twice = squash_resource_changes(once.clone());
    assert_eq!(once, twice);
}
