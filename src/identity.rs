// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! The sidecar's own network identity.
//!
//! Each sidecar shares a pod with one `mongod` and must know which pod that
//! is. The pod IP is resolved from the local hostname exactly once, at
//! startup; a failure here is fatal because every election decision and the
//! initiation fallback address depend on it. The resolved identity is owned
//! by [`crate::context::Context`] and never reassigned, so a reconcile tick
//! without an identity cannot be expressed.

use std::net::{IpAddr, Ipv4Addr};

use anyhow::{anyhow, Context as _, Result};

/// Immutable identity of the pod this sidecar runs in.
#[derive(Debug, Clone)]
pub struct HostIdentity {
    /// The pod's own IPv4 address
    pub ip: Ipv4Addr,

    /// `ip:port` form of this pod's MongoDB instance
    pub address: String,
}

impl HostIdentity {
    /// Build an identity from a known IP and port.
    #[must_use]
    pub fn new(ip: Ipv4Addr, mongo_port: u16) -> Self {
        Self {
            ip,
            address: format!("{ip}:{mongo_port}"),
        }
    }

    /// Resolve the local hostname to the pod's IPv4 address.
    ///
    /// Inside a pod the hostname resolves to the pod IP, which is the same
    /// address the orchestrator reports as `status.podIP` for this pod.
    ///
    /// # Errors
    ///
    /// Returns an error when the hostname cannot be read, when resolution
    /// fails, or when no IPv4 address is among the results.
    pub async fn resolve(mongo_port: u16) -> Result<Self> {
        let hostname = hostname::get()
            .context("failed to read local hostname")?
            .to_string_lossy()
            .into_owned();

        let addrs = tokio::net::lookup_host((hostname.as_str(), mongo_port))
            .await
            .with_context(|| format!("failed to resolve local hostname '{hostname}'"))?;

        let ip = addrs
            .filter_map(|addr| match addr.ip() {
                IpAddr::V4(v4) => Some(v4),
                IpAddr::V6(_) => None,
            })
            .next()
            .ok_or_else(|| anyhow!("local hostname '{hostname}' has no IPv4 address"))?;

        Ok(Self::new(ip, mongo_port))
    }
}

#[cfg(test)]
#[path = "identity_tests.rs"]
mod identity_tests;
