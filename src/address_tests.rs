// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for member address derivation and matching.

use super::*;
use serde_json::json;

fn make_config(service: Option<&str>) -> Config {
    Config {
        pod_label_selector: "app=mongo".to_string(),
        loop_sleep_seconds: 5,
        unhealthy_seconds: 15,
        mongo_port: 27017,
        mongo_database: "admin".to_string(),
        k8s_mongo_service_name: service.map(str::to_string),
        k8s_cluster_domain: "cluster.local".to_string(),
        k8s_namespace: None,
    }
}

fn make_pod(
    name: &str,
    pod_ip: Option<&str>,
    hostname: Option<&str>,
    subdomain: Option<&str>,
) -> Pod {
    let mut spec = json!({ "containers": [] });
    if let Some(hostname) = hostname {
        spec["hostname"] = json!(hostname);
    }
    if let Some(subdomain) = subdomain {
        spec["subdomain"] = json!(subdomain);
    }

    let mut status = json!({ "phase": "Running" });
    if let Some(ip) = pod_ip {
        status["podIP"] = json!(ip);
    }

    serde_json::from_value(json!({
        "apiVersion": "v1",
        "kind": "Pod",
        "metadata": { "name": name, "namespace": "db" },
        "spec": spec,
        "status": status,
    }))
    .expect("valid pod fixture")
}

fn make_member(name: &str) -> ReplSetMember {
    ReplSetMember {
        id: 0,
        name: name.to_string(),
        health: 1.0,
        state: 2,
        is_self: false,
        last_heartbeat_recv: None,
    }
}

// -----------------------------------------------------------------------------
// stable_address
// -----------------------------------------------------------------------------

#[test]
fn test_stable_address_uses_hostname_when_subdomain_matches_service() {
    let config = make_config(Some("mongo"));
    let pod = make_pod("mongo-0", Some("10.0.0.2"), Some("replica-a"), Some("mongo"));

    assert_eq!(
        stable_address(&pod, &config).as_deref(),
        Some("replica-a.mongo.db.svc.cluster.local:27017")
    );
}

#[test]
fn test_stable_address_falls_back_to_pod_name_on_subdomain_mismatch() {
    let config = make_config(Some("mongo"));
    let pod = make_pod("mongo-0", Some("10.0.0.2"), Some("replica-a"), Some("other"));

    assert_eq!(
        stable_address(&pod, &config).as_deref(),
        Some("mongo-0.mongo.db.svc.cluster.local:27017")
    );
}

#[test]
fn test_stable_address_falls_back_to_pod_name_without_hostname() {
    let config = make_config(Some("mongo"));
    let pod = make_pod("mongo-1", Some("10.0.0.3"), None, None);

    assert_eq!(
        stable_address(&pod, &config).as_deref(),
        Some("mongo-1.mongo.db.svc.cluster.local:27017")
    );
}

#[test]
fn test_stable_address_requires_service_name() {
    let config = make_config(None);
    let pod = make_pod("mongo-0", Some("10.0.0.2"), Some("replica-a"), Some("mongo"));

    assert_eq!(stable_address(&pod, &config), None);
}

#[test]
fn test_stable_address_respects_cluster_domain_and_port() {
    let mut config = make_config(Some("mongo"));
    config.k8s_cluster_domain = "corp.internal".to_string();
    config.mongo_port = 27018;
    let pod = make_pod("mongo-2", Some("10.0.0.4"), None, None);

    assert_eq!(
        stable_address(&pod, &config).as_deref(),
        Some("mongo-2.mongo.db.svc.corp.internal:27018")
    );
}

// -----------------------------------------------------------------------------
// pod_ip_address / member_address
// -----------------------------------------------------------------------------

#[test]
fn test_pod_ip_address_forms() {
    let config = make_config(None);
    let pod = make_pod("mongo-0", Some("10.0.0.2"), None, None);

    assert_eq!(pod_ip_address(&pod, &config).as_deref(), Some("10.0.0.2:27017"));
}

#[test]
fn test_pod_ip_address_without_ip_is_none() {
    let config = make_config(None);
    let pod = make_pod("mongo-0", None, None, None);

    assert_eq!(pod_ip_address(&pod, &config), None);
}

#[test]
fn test_member_address_prefers_stable_form() {
    let config = make_config(Some("mongo"));
    let pod = make_pod("mongo-0", Some("10.0.0.2"), None, None);

    // Never the ip:port form while a service name is configured.
    assert_eq!(
        member_address(&pod, &config).as_deref(),
        Some("mongo-0.mongo.db.svc.cluster.local:27017")
    );
}

#[test]
fn test_member_address_falls_back_to_ip_form() {
    let config = make_config(None);
    let pod = make_pod("mongo-0", Some("10.0.0.2"), None, None);

    assert_eq!(member_address(&pod, &config).as_deref(), Some("10.0.0.2:27017"));
}

// -----------------------------------------------------------------------------
// member_matches_pod
// -----------------------------------------------------------------------------

#[test]
fn test_member_matches_pod_by_stable_name() {
    let config = make_config(Some("mongo"));
    let pod = make_pod("mongo-0", Some("10.0.0.2"), None, None);
    let member = make_member("mongo-0.mongo.db.svc.cluster.local:27017");

    assert!(member_matches_pod(&member, &pod, &config));
}

#[test]
fn test_member_matches_pod_by_ip_form_even_when_stable_configured() {
    let config = make_config(Some("mongo"));
    let pod = make_pod("mongo-0", Some("10.0.0.2"), None, None);
    let member = make_member("10.0.0.2:27017");

    assert!(member_matches_pod(&member, &pod, &config));
}

#[test]
fn test_member_matches_pod_by_raw_ip_with_different_port() {
    let config = make_config(None);
    let pod = make_pod("mongo-0", Some("10.0.0.2"), None, None);
    let member = make_member("10.0.0.2:27018");

    assert!(member_matches_pod(&member, &pod, &config));
}

#[test]
fn test_member_does_not_match_other_pod() {
    let config = make_config(Some("mongo"));
    let pod = make_pod("mongo-1", Some("10.0.0.3"), None, None);
    let member = make_member("mongo-0.mongo.db.svc.cluster.local:27017");

    assert!(!member_matches_pod(&member, &pod, &config));
}

#[test]
fn test_dns_named_member_does_not_match_by_ip() {
    // A member recorded under a stable name has no derivable IP, so raw IP
    // equality cannot apply.
    let config = make_config(None);
    let pod = make_pod("mongo-0", Some("10.0.0.2"), None, None);
    let member = make_member("mongo-0.mongo.db.svc.cluster.local:27017");

    assert!(!member_matches_pod(&member, &pod, &config));
}
