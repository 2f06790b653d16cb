// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Integration tests for the Mongy sidecar.
//!
//! These tests need live infrastructure - a Kubernetes cluster for the pod
//! listing tests, a local `mongod` started with `--replSet` for the admin
//! tests - and skip themselves when it is absent.
//!
//! Run with: cargo test --test sidecar_integration -- --ignored

use kube::Client;
use mongy::config::Config;
use mongy::mongo::{MongoAdmin, StatusOutcome};
use mongy::pods;

// ============================================================================
// Helper Functions
// ============================================================================

/// Test helper to check if running in a Kubernetes cluster
async fn get_kube_client_or_skip() -> Option<Client> {
    match Client::try_default().await {
        Ok(client) => {
            println!("✓ Successfully connected to Kubernetes cluster");
            Some(client)
        }
        Err(e) => {
            eprintln!("⊘ Skipping integration test: not running in Kubernetes cluster: {e}");
            None
        }
    }
}

fn test_config(selector: &str) -> Config {
    Config {
        pod_label_selector: selector.to_string(),
        loop_sleep_seconds: 5,
        unhealthy_seconds: 15,
        mongo_port: 27017,
        mongo_database: "admin".to_string(),
        k8s_mongo_service_name: None,
        k8s_cluster_domain: "cluster.local".to_string(),
        k8s_namespace: None,
    }
}

// ============================================================================
// Pod Listing
// ============================================================================

#[tokio::test]
#[ignore = "requires a Kubernetes cluster"]
async fn test_list_pods_with_selector() {
    let Some(client) = get_kube_client_or_skip().await else {
        return;
    };

    // An improbable selector must produce an empty, not failed, listing.
    let config = test_config("mongy-integration-test=does-not-exist");
    let listed = pods::list_mongo_pods(&client, &config)
        .await
        .expect("listing with an unmatched selector must succeed");

    assert!(listed.is_empty());
}

#[tokio::test]
#[ignore = "requires a Kubernetes cluster and a labelled mongo workload"]
async fn test_list_pods_returns_only_running_pods_with_ips() {
    let Some(client) = get_kube_client_or_skip().await else {
        return;
    };

    let selector =
        std::env::var("MONGY_TEST_POD_LABELS").unwrap_or_else(|_| "app=mongo".to_string());
    let config = test_config(&selector);

    let listed = pods::list_mongo_pods(&client, &config)
        .await
        .expect("pod listing must succeed");

    for pod in &listed {
        assert!(pods::is_reconcilable(pod));
        assert!(pods::pod_ipv4(pod).is_some());
    }
}

// ============================================================================
// Local MongoDB Admin
// ============================================================================

#[tokio::test]
#[ignore = "requires a local mongod started with --replSet"]
async fn test_local_status_is_classified_not_errored() {
    let config = test_config("app=mongo");

    let admin = match MongoAdmin::connect_local(&config).await {
        Ok(admin) => admin,
        Err(e) => {
            eprintln!("⊘ Skipping integration test: no local mongod: {e}");
            return;
        }
    };

    // Whatever state the instance is in, codes 93/94 must come back as
    // classified outcomes rather than errors.
    let outcome = admin.get_status().await;
    admin.shutdown().await;

    match outcome.expect("status must classify, not fail") {
        StatusOutcome::InSet(status) => {
            assert!(!status.members.is_empty());
        }
        StatusOutcome::NotYetInitialized | StatusOutcome::InvalidConfig => {}
    }
}

#[tokio::test]
#[ignore = "requires a local mongod started with --replSet"]
async fn test_probe_of_local_instance_matches_status() {
    let config = test_config("app=mongo");

    let in_set = match MongoAdmin::is_in_repl_set("127.0.0.1:27017", &config).await {
        Ok(in_set) => in_set,
        Err(e) => {
            eprintln!("⊘ Skipping integration test: no local mongod: {e}");
            return;
        }
    };

    let admin = MongoAdmin::connect_local(&config)
        .await
        .expect("local admin connection");
    let outcome = admin.get_status().await.expect("status must classify");
    admin.shutdown().await;

    match outcome {
        StatusOutcome::InSet(_) => assert!(in_set),
        StatusOutcome::NotYetInitialized => assert!(!in_set),
        StatusOutcome::InvalidConfig => {
            unreachable!("probe should have propagated code 93 as an error")
        }
    }
}
