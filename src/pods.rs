// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Pod discovery for the MongoDB workload.
//!
//! Pods are re-listed from the cluster API on every tick; there is no cache,
//! so each tick reconciles against ground truth. Only pods that are Running
//! and have an IPv4 pod IP participate in reconciliation.

use std::net::Ipv4Addr;

use anyhow::Result;
use k8s_openapi::api::core::v1::Pod;
use kube::{api::ListParams, Api, Client};
use tracing::debug;

use crate::config::Config;
use crate::constants::POD_PHASE_RUNNING;

/// List the MongoDB pods this sidecar reconciles against.
///
/// Lists pods in the configured namespace (or the client's default, i.e. the
/// pod's own namespace) matching the configured label selector, then filters
/// to reconcilable pods.
///
/// # Errors
///
/// Returns an error when the cluster API list call fails; the caller skips
/// the tick.
pub async fn list_mongo_pods(client: &Client, config: &Config) -> Result<Vec<Pod>> {
    let namespace = config
        .k8s_namespace
        .as_deref()
        .unwrap_or_else(|| client.default_namespace());

    let api: Api<Pod> = Api::namespaced(client.clone(), namespace);
    let params = ListParams::default().labels(&config.pod_label_selector);

    let listed = api.list(&params).await?;
    let total = listed.items.len();

    let pods: Vec<Pod> = listed
        .items
        .into_iter()
        .filter(is_reconcilable)
        .collect();

    debug!(
        namespace,
        selector = %config.pod_label_selector,
        listed = total,
        reconcilable = pods.len(),
        "listed mongo pods"
    );

    Ok(pods)
}

/// Whether a pod participates in reconciliation: Running with an IPv4 pod IP.
#[must_use]
pub fn is_reconcilable(pod: &Pod) -> bool {
    let running = pod
        .status
        .as_ref()
        .and_then(|status| status.phase.as_deref())
        == Some(POD_PHASE_RUNNING);

    running && pod_ipv4(pod).is_some()
}

/// The pod's IPv4 address, if the orchestrator has assigned one.
#[must_use]
pub fn pod_ipv4(pod: &Pod) -> Option<Ipv4Addr> {
    pod.status
        .as_ref()?
        .pod_ip
        .as_deref()?
        .parse::<Ipv4Addr>()
        .ok()
}

#[cfg(test)]
#[path = "pods_tests.rs"]
mod pods_tests;
