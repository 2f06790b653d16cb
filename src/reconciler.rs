// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! The per-tick reconciliation state machine.
//!
//! Each tick observes two sources of truth - the pods of the MongoDB
//! workload and the local instance's view of the replica set - classifies
//! the combination, and takes at most one mutating action:
//!
//! | condition                        | action                              |
//! |----------------------------------|-------------------------------------|
//! | no reconcilable pods             | skip                                |
//! | in set, self is primary          | add/remove members                  |
//! | in set, another primary exists   | nothing                             |
//! | in set, no primary               | if elected: add/remove with `force` |
//! | not initialized (code 94)        | probe peers, maybe initiate         |
//! | invalid config (code 93)         | if elected: forced reconfiguration  |
//!
//! Mutations are gated on the deterministic election except in the
//! self-primary case, where the replica set itself already assigned this
//! instance the authority.

use anyhow::Result;
use chrono::{DateTime, Utc};
use futures::future::try_join_all;
use k8s_openapi::api::core::v1::Pod;
use tracing::{debug, info, warn};

use crate::address;
use crate::config::Config;
use crate::context::Context;
use crate::election;
use crate::mongo::{MongoAdmin, ReplSetMember, StatusOutcome};
use crate::pods;

/// Run one reconcile tick.
///
/// Lists the workload's pods, opens the local admin connection, classifies
/// the replica set state, and acts on it. The admin connection is released
/// on every exit path.
///
/// # Errors
///
/// Any failure aborts the tick and surfaces to the loop driver, which logs
/// it and schedules the next tick.
pub async fn reconcile(ctx: &Context) -> Result<()> {
    let pods = pods::list_mongo_pods(&ctx.client, &ctx.config).await?;
    if pods.is_empty() {
        info!("no running mongo pods found, nothing to reconcile");
        return Ok(());
    }

    let admin = MongoAdmin::connect_local(&ctx.config).await?;
    let result = run_state_machine(ctx, &admin, &pods).await;
    admin.shutdown().await;
    result
}

/// Classify the local instance's replica set state and dispatch.
async fn run_state_machine(ctx: &Context, admin: &MongoAdmin, pods: &[Pod]) -> Result<()> {
    match admin.get_status().await? {
        StatusOutcome::InSet(status) => reconcile_in_set(ctx, admin, pods, &status.members).await,
        StatusOutcome::NotYetInitialized => initialize_repl_set(ctx, admin, pods).await,
        StatusOutcome::InvalidConfig => recover_invalid_config(ctx, admin, pods).await,
    }
}

/// Handle a working replica set: act as primary, defer to another primary,
/// or repair a primaryless set when elected.
async fn reconcile_in_set(
    ctx: &Context,
    admin: &MongoAdmin,
    pods: &[Pod],
    members: &[ReplSetMember],
) -> Result<()> {
    match members.iter().find(|member| member.is_primary()) {
        Some(primary) if primary.is_self => primary_work(ctx, admin, pods, members, false).await,
        Some(primary) => {
            debug!(primary = %primary.name, "another member is primary, nothing to do");
            Ok(())
        }
        None => {
            if election::is_elected(pods, ctx.identity.ip) {
                warn!("replica set has no primary, elected to repair membership");
                primary_work(ctx, admin, pods, members, true).await
            } else {
                debug!("replica set has no primary, not elected, standing by");
                Ok(())
            }
        }
    }
}

/// Compute and apply the membership delta between pods and members.
///
/// Both halves of the delta go into a single reconfiguration; when the
/// delta is empty no command is issued at all.
async fn primary_work(
    ctx: &Context,
    admin: &MongoAdmin,
    pods: &[Pod],
    members: &[ReplSetMember],
    force: bool,
) -> Result<()> {
    let additions = compute_additions(pods, members, &ctx.config);
    let removals = compute_removals(members, Utc::now(), ctx.config.unhealthy_seconds);

    if additions.is_empty() && removals.is_empty() {
        debug!("replica set membership matches the pod set");
        return Ok(());
    }

    info!(
        additions = ?additions,
        removals = ?removals,
        force,
        "reconfiguring replica set membership"
    );
    admin.reconfigure(&additions, &removals, force).await
}

/// Addresses of pods that are not yet replica set members.
///
/// A pod counts as present when any member matches it by either address
/// form or by raw IP (see [`address::member_matches_pod`]).
#[must_use]
pub fn compute_additions(pods: &[Pod], members: &[ReplSetMember], config: &Config) -> Vec<String> {
    pods.iter()
        .filter(|pod| {
            !members
                .iter()
                .any(|member| address::member_matches_pod(member, pod, config))
        })
        .filter_map(|pod| address::member_address(pod, config))
        .collect()
}

/// Names of members that are unhealthy and past the heartbeat threshold.
///
/// Removal requires both `health == 0` and a last received heartbeat
/// strictly older than `unhealthy_seconds`; a member that never reported a
/// heartbeat timestamp is left alone.
#[must_use]
pub fn compute_removals(
    members: &[ReplSetMember],
    now: DateTime<Utc>,
    unhealthy_seconds: i64,
) -> Vec<String> {
    members
        .iter()
        .filter(|member| !member.is_healthy())
        .filter(|member| {
            member
                .heartbeat_age(now)
                .is_some_and(|age| age.num_seconds() > unhealthy_seconds)
        })
        .map(|member| member.name.clone())
        .collect()
}

/// Handle code 94: no replica set configuration exists locally.
///
/// Every running pod is probed concurrently first. If any peer already
/// belongs to a set, some other replica is mid-reconcile and this instance
/// will be absorbed through its add path, so initiating would race it.
/// Only when all probes come back negative does the election winner
/// initiate, naming its own canonical address.
async fn initialize_repl_set(ctx: &Context, admin: &MongoAdmin, pods: &[Pod]) -> Result<()> {
    let probe_targets: Vec<String> = pods
        .iter()
        .filter_map(|pod| address::pod_ip_address(pod, &ctx.config))
        .collect();

    let probes = probe_targets
        .iter()
        .map(|target| MongoAdmin::is_in_repl_set(target, &ctx.config));
    let results = try_join_all(probes).await?;

    if results.into_iter().any(|in_set| in_set) {
        info!("a peer already belongs to a replica set, waiting to be added");
        return Ok(());
    }

    let Some(winner) = election::elected_pod(pods) else {
        debug!("no electable pod, skipping initiation");
        return Ok(());
    };
    if pods::pod_ipv4(winner) != Some(ctx.identity.ip) {
        debug!("not elected to initiate, standing by");
        return Ok(());
    }

    let primary_address = address::member_address(winner, &ctx.config)
        .unwrap_or_else(|| ctx.identity.address.clone());

    info!(primary = %primary_address, "initiating replica set");
    admin.initiate(&primary_address).await
}

/// Handle code 93: the configuration exists but lost quorum beyond what the
/// server will repair on its own.
///
/// The election winner forces a reconfiguration built from the running pods.
/// The invalid status carries no usable member list, so every pod becomes an
/// addition. Forcing here can lose acknowledged writes; availability is
/// deliberately preferred.
async fn recover_invalid_config(ctx: &Context, admin: &MongoAdmin, pods: &[Pod]) -> Result<()> {
    if !election::is_elected(pods, ctx.identity.ip) {
        debug!("replica set config invalid, not elected, standing by");
        return Ok(());
    }

    warn!("replica set config invalid, forcing reconfiguration from pod set");
    primary_work(ctx, admin, pods, &[], true).await
}

#[cfg(test)]
#[path = "reconciler_tests.rs"]
mod reconciler_tests;
