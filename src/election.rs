// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Deterministic leaderless election over a pod set.
//!
//! Every sidecar lists the same pods and picks the one with the numerically
//! lowest IPv4 address, so at steady state exactly one replica believes it
//! is allowed to mutate the replica set. There is no lease or lock; the
//! agreement comes from sorting a shared observation identically.
//!
//! The sort key is the 32-bit integer value of the address. A textual sort
//! would order "10.0.0.10" before "10.0.0.9" and break cross-replica
//! agreement with mixed-width octets.

use std::net::Ipv4Addr;

use k8s_openapi::api::core::v1::Pod;

use crate::pods::pod_ipv4;

/// The election winner: the pod with the numerically lowest IPv4 address.
///
/// Pods without a parsed IPv4 address are ignored. Returns `None` for an
/// empty (or IP-less) pod set. Pod IPs are unique within a cluster, so ties
/// do not occur.
#[must_use]
pub fn elected_pod(pods: &[Pod]) -> Option<&Pod> {
    pods.iter()
        .filter_map(|pod| pod_ipv4(pod).map(|ip| (u32::from(ip), pod)))
        .min_by_key(|(key, _)| *key)
        .map(|(_, pod)| pod)
}

/// Whether the pod with the given IP is the election winner.
#[must_use]
pub fn is_elected(pods: &[Pod], self_ip: Ipv4Addr) -> bool {
    elected_pod(pods).and_then(pod_ipv4) == Some(self_ip)
}

#[cfg(test)]
#[path = "election_tests.rs"]
mod election_tests;
