use super::*;
use ingress_controller_k8s_api::ResourceId;
use maplit::{btreemap, btreeset};
use pretty_assertions::assert_eq;

const CREATED: &str = "2024-01-01T00:00:00Z";
const HOST: &str = "cafe.example.com";

fn no_master(name: &str) -> (String, Reason, bool, String) {
    (
        format!("Ingress/default/{name}"),
        Reason::NoIngressMasterFound,
        false,
        "Ingress master is invalid or doesn't exist".to_string(),
    )
}

#[test]
fn minions_follow_their_master() {
    let mut config = mk_configuration();

    let (changes, problems) = config.upsert_ingress(mk_minion("default", "coffee", CREATED, HOST, &["/a"]));
    assert!(changes.is_empty(), "minions never own a host");
    assert_eq!(problems_of(&problems), vec![no_master("coffee")]);

    let (changes, problems) = config.upsert_ingress(mk_master("default", "cafe-master", CREATED, HOST));
    assert_eq!(
        changes_of(&changes),
        vec![(Operation::AddOrUpdate, "Ingress/default/cafe-master".to_string())]
    );
    assert!(problems.is_empty(), "a resolved problem is not reported");
    let master = ingress_config(&changes[0].resource);
    assert!(master.is_master);
    assert_eq!(master.master_host(), Some(HOST));
    assert_eq!(master.minions.len(), 1);
    assert_eq!(master.minions[0].valid_paths, btreeset! {"/a".to_string()});
    assert!(master.child_warnings.is_empty());

    // A later minion loses the paths already served.
    let (changes, problems) =
        config.upsert_ingress(mk_minion("default", "coffee-2", CREATED, HOST, &["/a", "/b"]));
    assert_eq!(
        changes_of(&changes),
        vec![(Operation::AddOrUpdate, "Ingress/default/cafe-master".to_string())]
    );
    assert!(problems.is_empty());
    let master = ingress_config(&changes[0].resource);
    assert_eq!(master.minions.len(), 2);
    assert_eq!(master.minions[1].valid_paths, btreeset! {"/b".to_string()});
    assert_eq!(
        master.child_warnings,
        btreemap! {
            "default/coffee-2".parse::<ResourceId>().unwrap() => vec!["path /a is taken by another resource".to_string()],
        }
    );

    let (changes, problems) = config.delete_ingress(&"default/cafe-master".parse().unwrap());
    assert_eq!(
        changes_of(&changes),
        vec![(Operation::Delete, "Ingress/default/cafe-master".to_string())]
    );
    assert_eq!(
        problems_of(&problems),
        vec![no_master("coffee"), no_master("coffee-2")]
    );
}

#[test]
fn minion_updates_update_master() {
    let mut config = mk_configuration();
    config.upsert_ingress(mk_master("default", "cafe-master", CREATED, HOST));
    config.upsert_ingress(mk_minion("default", "coffee", CREATED, HOST, &["/a"]));

    let mut minion = mk_minion("default", "coffee", CREATED, HOST, &["/a", "/c"]);
    minion.metadata.generation = Some(2);
    let (changes, _) = config.upsert_ingress(minion);
    assert_eq!(
        changes_of(&changes),
        vec![(Operation::AddOrUpdate, "Ingress/default/cafe-master".to_string())]
    );
    assert_eq!(
        ingress_config(&changes[0].resource).minions[0].valid_paths,
        btreeset! {"/a".to_string(), "/c".to_string()}
    );

    let (changes, problems) = config.delete_ingress(&"default/coffee".parse().unwrap());
    assert_eq!(
        changes_of(&changes),
        vec![(Operation::AddOrUpdate, "Ingress/default/cafe-master".to_string())]
    );
    assert!(ingress_config(&changes[0].resource).minions.is_empty());
    assert!(problems.is_empty());
}

#[test]
fn minions_of_other_hosts_are_ignored() {
    let mut config = mk_configuration();
    config.upsert_ingress(mk_master("default", "cafe-master", CREATED, HOST));

    let (changes, problems) = config.upsert_ingress(mk_minion(
        "default",
        "tea",
        CREATED,
        "tea.example.com",
        &["/tea"],
    ));
    assert!(changes.is_empty());
    assert_eq!(problems_of(&problems), vec![no_master("tea")]);
    assert_eq!(config.registered_count(ResourceKind::Ingress), 2);
}

#[test]
fn invalid_minion_is_rejected() {
    let mut config = mk_configuration();
    config.upsert_ingress(mk_master("default", "cafe-master", CREATED, HOST));

    let (changes, problems) = config.upsert_ingress(mk_minion("default", "coffee", CREATED, HOST, &[]));
    assert!(changes.is_empty());
    assert_eq!(
        problems_of(&problems),
        vec![(
            "Ingress/default/coffee".to_string(),
            Reason::Rejected,
            true,
            "spec.rules[0].http.paths: Required value: must include at least one path".to_string(),
        )]
    );
}
