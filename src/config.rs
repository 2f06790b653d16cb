// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Sidecar configuration loaded from environment variables.
//!
//! Every option has a default from [`crate::constants`] except the pod label
//! selector, which is required: without it the sidecar cannot tell which pods
//! belong to the MongoDB workload, so startup fails instead of guessing.

use anyhow::{bail, Result};

use crate::constants::{
    DEFAULT_CLUSTER_DOMAIN, DEFAULT_LOOP_SLEEP_SECS, DEFAULT_MONGO_DATABASE, DEFAULT_MONGO_PORT,
    DEFAULT_UNHEALTHY_SECS,
};

/// Resolved sidecar configuration.
///
/// Built once at startup via [`Config::from_env`] and shared read-only with
/// every reconcile tick.
#[derive(Debug, Clone)]
pub struct Config {
    /// Label selector identifying the MongoDB pods, e.g. `app=mongo,env=prod`
    pub pod_label_selector: String,

    /// Seconds to sleep between the end of one tick and the start of the next
    pub loop_sleep_seconds: u64,

    /// Heartbeat age in seconds beyond which an unhealthy member is removed
    pub unhealthy_seconds: i64,

    /// MongoDB port, used for the local admin connection and all member addresses
    pub mongo_port: u16,

    /// Database used for admin command dispatch
    pub mongo_database: String,

    /// Headless service name fronting the workload; enables stable DNS
    /// member addresses when set
    pub k8s_mongo_service_name: Option<String>,

    /// DNS cluster suffix for stable member addresses
    pub k8s_cluster_domain: String,

    /// Namespace to list pods in; `None` means the pod's own namespace
    pub k8s_namespace: Option<String>,
}

impl Config {
    /// Load the configuration from process environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error when `MONGO_SIDECAR_POD_LABELS` is unset or empty.
    /// Unparseable numeric options fall back to their defaults rather than
    /// failing, so a typo degrades to known-good behavior.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load the configuration through an arbitrary variable lookup.
    ///
    /// Split out from [`Config::from_env`] so tests can feed in a map instead
    /// of mutating process-global environment state.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let pod_label_selector = match lookup("MONGO_SIDECAR_POD_LABELS") {
            Some(labels) if !labels.trim().is_empty() => labels,
            _ => bail!(
                "MONGO_SIDECAR_POD_LABELS must be set to the label selector \
                 identifying the MongoDB pods (e.g. \"app=mongo\")"
            ),
        };

        let loop_sleep_seconds = lookup("MONGO_SIDECAR_SLEEP_SECONDS")
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_LOOP_SLEEP_SECS);

        let unhealthy_seconds = lookup("MONGO_SIDECAR_UNHEALTHY_SECONDS")
            .and_then(|s| s.parse::<i64>().ok())
            .unwrap_or(DEFAULT_UNHEALTHY_SECS);

        let mongo_port = lookup("MONGO_PORT")
            .and_then(|s| s.parse::<u16>().ok())
            .unwrap_or(DEFAULT_MONGO_PORT);

        let mongo_database =
            lookup("MONGODB_DATABASE").unwrap_or_else(|| DEFAULT_MONGO_DATABASE.to_string());

        let k8s_mongo_service_name =
            lookup("KUBERNETES_MONGO_SERVICE_NAME").filter(|name| !name.trim().is_empty());

        let k8s_cluster_domain = lookup("KUBERNETES_CLUSTER_DOMAIN")
            .filter(|domain| !domain.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_CLUSTER_DOMAIN.to_string());

        let k8s_namespace = lookup("KUBE_NAMESPACE").filter(|ns| !ns.trim().is_empty());

        Ok(Self {
            pod_label_selector,
            loop_sleep_seconds,
            unhealthy_seconds,
            mongo_port,
            mongo_database,
            k8s_mongo_service_name,
            k8s_cluster_domain,
            k8s_namespace,
        })
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod config_tests;
