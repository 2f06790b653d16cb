// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Global constants for the Mongy sidecar.
//!
//! This module contains all numeric and string constants used throughout the codebase.
//! Constants are organized by category for easy maintenance.

// ============================================================================
// Reconcile Loop Defaults
// ============================================================================

/// Default interval between reconcile ticks, in seconds
pub const DEFAULT_LOOP_SLEEP_SECS: u64 = 5;

/// Default age of a member's last received heartbeat, in seconds, beyond
/// which an unhealthy member is removed from the replica set
pub const DEFAULT_UNHEALTHY_SECS: i64 = 15;

// ============================================================================
// MongoDB Defaults
// ============================================================================

/// Default MongoDB port, used both for the local admin connection and as
/// the port suffix of every member address
pub const DEFAULT_MONGO_PORT: u16 = 27017;

/// Default database used for admin command dispatch
pub const DEFAULT_MONGO_DATABASE: &str = "admin";

/// Loopback host for the local admin connection
pub const LOCAL_MONGO_HOST: &str = "127.0.0.1";

/// Server selection timeout for admin and probe connections, in milliseconds.
///
/// Kept short so that a dead peer fails a probe within one tick rather than
/// hanging the loop for the driver's 30-second default.
pub const MONGO_TIMEOUT_MILLIS: u64 = 2000;

// ============================================================================
// MongoDB Error Codes
// ============================================================================

/// `InvalidReplicaSetConfig`: a replica set configuration exists but the
/// server considers it unusable (typically quorum lost beyond recovery)
pub const MONGO_ERR_INVALID_REPLICA_SET_CONFIG: i32 = 93;

/// `NotYetInitialized`: the server has no replica set configuration at all
pub const MONGO_ERR_NOT_YET_INITIALIZED: i32 = 94;

// ============================================================================
// Replica Set Member States
// ============================================================================

/// Member state code for PRIMARY
pub const MEMBER_STATE_PRIMARY: i32 = 1;

// ============================================================================
// Kubernetes Defaults
// ============================================================================

/// Default DNS cluster suffix used for stable member addresses
pub const DEFAULT_CLUSTER_DOMAIN: &str = "cluster.local";

/// Pod phase required for a pod to participate in reconciliation
pub const POD_PHASE_RUNNING: &str = "Running";

// ============================================================================
// Runtime Constants
// ============================================================================

/// Number of tokio worker threads; the sidecar runs one serial reconcile
/// loop plus short-lived probe tasks, so a small pool is plenty
pub const TOKIO_WORKER_THREADS: usize = 2;
