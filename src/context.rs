// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Shared context for the reconcile loop.

use kube::Client;

use crate::config::Config;
use crate::identity::HostIdentity;

/// Everything a reconcile tick needs, built once at startup.
///
/// Construction requires a resolved [`HostIdentity`], so a tick can never
/// run with a partially initialized identity.
pub struct Context {
    /// Kubernetes client for pod listing
    pub client: Client,

    /// Resolved sidecar configuration
    pub config: Config,

    /// This pod's own network identity
    pub identity: HostIdentity,
}
