// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Member address derivation and matching.
//!
//! A replica set member is named by a `host:port` string. When a headless
//! service fronts the workload, pods get stable DNS names of the form
//! `{host}.{service}.{namespace}.svc.{clusterDomain}` that survive pod IP
//! churn; those are preferred everywhere. Without a service name the only
//! available form is `{podIP}:{port}`.
//!
//! Matching must recognize both forms, plus raw IP equality, because the
//! replica set config records whatever form was in use when a member was
//! added, which is not necessarily the form this sidecar would derive today.

use k8s_openapi::api::core::v1::Pod;

use crate::config::Config;
use crate::mongo::ReplSetMember;
use crate::pods::pod_ipv4;

/// The canonical address for a pod: stable DNS when derivable, else `ip:port`.
#[must_use]
pub fn member_address(pod: &Pod, config: &Config) -> Option<String> {
    stable_address(pod, config).or_else(|| pod_ip_address(pod, config))
}

/// The stable DNS address for a pod, when a service name is configured.
///
/// Uses `pod.spec.hostname` when the pod's subdomain matches the configured
/// service (the orchestrator only publishes `hostname.subdomain` DNS records
/// in that case), otherwise falls back to the pod name, which equals the
/// published DNS label for stateful workloads.
#[must_use]
pub fn stable_address(pod: &Pod, config: &Config) -> Option<String> {
    let service = config.k8s_mongo_service_name.as_deref()?;
    let namespace = pod.metadata.namespace.as_deref()?;

    let spec_hostname = pod.spec.as_ref().and_then(|spec| spec.hostname.as_deref());
    let spec_subdomain = pod.spec.as_ref().and_then(|spec| spec.subdomain.as_deref());

    let host = match (spec_hostname, spec_subdomain) {
        (Some(hostname), Some(subdomain)) if subdomain == service => hostname,
        _ => pod.metadata.name.as_deref()?,
    };

    Some(format!(
        "{host}.{service}.{namespace}.svc.{domain}:{port}",
        domain = config.k8s_cluster_domain,
        port = config.mongo_port
    ))
}

/// The `ip:port` address for a pod, when it has an IP.
#[must_use]
pub fn pod_ip_address(pod: &Pod, config: &Config) -> Option<String> {
    pod_ipv4(pod).map(|ip| format!("{ip}:{port}", port = config.mongo_port))
}

/// Whether a configured replica set member represents the given pod.
///
/// True when the member name equals either derivable address form, or when
/// the member name's host part is the pod's IP regardless of port. The last
/// rule keeps a pod that inherited the IP of a dead, still-configured member
/// from being added a second time.
#[must_use]
pub fn member_matches_pod(member: &ReplSetMember, pod: &Pod, config: &Config) -> bool {
    if let Some(stable) = stable_address(pod, config) {
        if member.name == stable {
            return true;
        }
    }

    if let Some(ip_form) = pod_ip_address(pod, config) {
        if member.name == ip_form {
            return true;
        }
    }

    match (member.ip(), pod_ipv4(pod)) {
        (Some(member_ip), Some(pod_ip)) => member_ip == pod_ip,
        _ => false,
    }
}

#[cfg(test)]
#[path = "address_tests.rs"]
mod address_tests;
