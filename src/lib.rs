// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! # Mongy - MongoDB Replica Set Sidecar for Kubernetes
//!
//! Mongy runs as a sidecar next to every `mongod` of a MongoDB workload and
//! cooperatively keeps one replica set's membership in sync with the set of
//! live pods. There is no central coordinator: every pod runs an identical
//! copy of this controller, and mutations are serialized by a deterministic
//! election over pod IPs plus the authority MongoDB itself exerts over its
//! configuration.
//!
//! ## Overview
//!
//! Each tick the sidecar:
//!
//! 1. Lists the workload's pods from the cluster API
//! 2. Asks the local `mongod` for its replica set status
//! 3. Classifies the outcome (in set / not initialized / invalid config)
//! 4. Adds new pods, removes members whose heartbeats went stale,
//!    initializes a missing replica set, or force-repairs a broken one
//!
//! ## Modules
//!
//! - [`config`] - Environment-backed configuration
//! - [`pods`] - Pod discovery via the cluster API
//! - [`mongo`] - Typed MongoDB admin operations and status classification
//! - [`address`] - Stable-DNS and `ip:port` member addressing
//! - [`election`] - Deterministic leaderless election over pod IPs
//! - [`reconciler`] - The per-tick state machine
//! - [`driver`] - The serial reconcile loop

pub mod address;
pub mod config;
pub mod constants;
pub mod context;
pub mod driver;
pub mod election;
pub mod identity;
pub mod mongo;
pub mod pods;
pub mod reconciler;
