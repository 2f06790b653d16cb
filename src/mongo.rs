// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Typed administrative operations on a MongoDB instance.
//!
//! This module wraps the raw `replSetGetStatus` / `replSetInitiate` /
//! `replSetReconfig` admin commands behind a small API. Two command error
//! codes are part of the interface contract rather than failures:
//!
//! - **94 `NotYetInitialized`** - the instance has no replica set config
//! - **93 `InvalidReplicaSetConfig`** - a config exists but the server
//!   considers it unrecoverable
//!
//! Both are classified into [`StatusOutcome`] and drive the reconciler's
//! state machine; every other command failure surfaces as an error.
//!
//! All connections are direct (non-discovering): the sidecar talks to one
//! specific `mongod`, never to the replica set as a logical unit.

use std::net::Ipv4Addr;

use anyhow::{Context as _, Result};
use bson::{doc, Bson, Document};
use chrono::{DateTime, Duration, Utc};
use mongodb::error::ErrorKind;
use mongodb::{Client, Database};
use serde::Deserialize;
use tracing::debug;

use crate::config::Config;
use crate::constants::{
    LOCAL_MONGO_HOST, MEMBER_STATE_PRIMARY, MONGO_ERR_INVALID_REPLICA_SET_CONFIG,
    MONGO_ERR_NOT_YET_INITIALIZED, MONGO_TIMEOUT_MILLIS,
};

/// One member of the replica set as reported by `replSetGetStatus`.
#[derive(Debug, Clone, Deserialize)]
pub struct ReplSetMember {
    /// Member id within the replica set config
    #[serde(rename = "_id")]
    pub id: i64,

    /// The `host:port` the member was configured with
    pub name: String,

    /// 1 when the member is reachable and healthy, 0 otherwise; the server
    /// reports this as a double
    #[serde(default)]
    pub health: f64,

    /// Member state code; 1 is PRIMARY
    #[serde(default)]
    pub state: i32,

    /// Set only on the member representing the connected instance
    #[serde(rename = "self", default)]
    pub is_self: bool,

    /// When a heartbeat was last received from this member; absent on the
    /// self member, which does not heartbeat itself
    #[serde(rename = "lastHeartbeatRecv", default)]
    pub last_heartbeat_recv: Option<bson::DateTime>,
}

impl ReplSetMember {
    /// Whether this member currently holds the PRIMARY state.
    #[must_use]
    pub fn is_primary(&self) -> bool {
        self.state == MEMBER_STATE_PRIMARY
    }

    /// Whether the server considers this member healthy.
    #[must_use]
    pub fn is_healthy(&self) -> bool {
        self.health > 0.0
    }

    /// The member's IP, when its name is in `ip:port` form.
    ///
    /// Members added under a stable DNS name have no derivable IP and
    /// return `None`.
    #[must_use]
    pub fn ip(&self) -> Option<Ipv4Addr> {
        self.name
            .rsplit_once(':')
            .and_then(|(host, _)| host.parse::<Ipv4Addr>().ok())
    }

    /// Age of the last received heartbeat relative to `now`.
    #[must_use]
    pub fn heartbeat_age(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.last_heartbeat_recv
            .map(|received| now - received.to_chrono())
    }
}

/// Successful `replSetGetStatus` reply, reduced to what the reconciler uses.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReplSetStatus {
    /// Replica set name
    #[serde(default)]
    pub set: String,

    /// All configured members, including the connected instance itself
    #[serde(default)]
    pub members: Vec<ReplSetMember>,
}

/// Classified outcome of asking an instance for its replica set status.
#[derive(Debug)]
pub enum StatusOutcome {
    /// The instance belongs to a working replica set
    InSet(ReplSetStatus),

    /// Code 94: no replica set configuration exists on this instance
    NotYetInitialized,

    /// Code 93: a configuration exists but the server reports it as
    /// unrecoverable; the reply carries no usable member list
    InvalidConfig,
}

/// Admin connection to one specific MongoDB instance.
pub struct MongoAdmin {
    client: Client,
    db: Database,
}

impl MongoAdmin {
    /// Connect to the `mongod` sharing this pod over loopback.
    ///
    /// # Errors
    ///
    /// Returns an error when the client cannot be constructed; actual
    /// reachability is only tested by the first command.
    pub async fn connect_local(config: &Config) -> Result<Self> {
        let address = format!("{LOCAL_MONGO_HOST}:{port}", port = config.mongo_port);
        Self::connect(&address, config).await
    }

    /// Connect directly to the instance at `address` (`host:port`).
    async fn connect(address: &str, config: &Config) -> Result<Self> {
        let uri = format!(
            "mongodb://{address}/?directConnection=true\
             &serverSelectionTimeoutMS={MONGO_TIMEOUT_MILLIS}\
             &connectTimeoutMS={MONGO_TIMEOUT_MILLIS}"
        );

        let client = Client::with_uri_str(&uri)
            .await
            .with_context(|| format!("failed to create mongo client for {address}"))?;
        let db = client.database(&config.mongo_database);

        Ok(Self { client, db })
    }

    /// Release the connection's resources.
    ///
    /// Called on every tick exit path, success or error.
    pub async fn shutdown(self) {
        self.client.shutdown().await;
    }

    /// Ask the connected instance for its replica set status.
    ///
    /// # Errors
    ///
    /// Command failures other than codes 93 and 94 surface as errors; those
    /// two are classified into [`StatusOutcome`] variants.
    pub async fn get_status(&self) -> Result<StatusOutcome> {
        match self.db.run_command(doc! { "replSetGetStatus": 1 }).await {
            Ok(reply) => {
                let status: ReplSetStatus = bson::from_document(reply)
                    .context("failed to decode replSetGetStatus reply")?;
                Ok(StatusOutcome::InSet(status))
            }
            Err(err) => match command_error_code(&err) {
                Some(MONGO_ERR_NOT_YET_INITIALIZED) => Ok(StatusOutcome::NotYetInitialized),
                Some(MONGO_ERR_INVALID_REPLICA_SET_CONFIG) => Ok(StatusOutcome::InvalidConfig),
                _ => Err(err).context("replSetGetStatus failed"),
            },
        }
    }

    /// Initiate a replica set whose single member is `primary_address`.
    ///
    /// `replSetInitiate` records the server's own hostname as the member
    /// host, which peers cannot reach, so the sole member is immediately
    /// rewritten to the given address with a forced reconfig.
    ///
    /// # Errors
    ///
    /// Returns an error when either command fails, including when another
    /// replica initiated concurrently (the server rejects a second initiate).
    pub async fn initiate(&self, primary_address: &str) -> Result<()> {
        self.db
            .run_command(doc! { "replSetInitiate": {} })
            .await
            .context("replSetInitiate failed")?;

        let mut config = self.get_config().await?;
        rewrite_sole_member_host(&mut config, primary_address)?;
        bump_version(&mut config);

        self.submit_config(config, true).await
    }

    /// Apply membership changes in a single reconfiguration.
    ///
    /// Reads the current config, appends one member per address in
    /// `additions` with fresh ids, drops members whose name is in
    /// `removals`, bumps the version, and submits once. Additions and
    /// removals must land in the same command: an intermediate config could
    /// transiently drop quorum.
    ///
    /// # Errors
    ///
    /// Returns an error when reading or submitting the config fails.
    pub async fn reconfigure(
        &self,
        additions: &[String],
        removals: &[String],
        force: bool,
    ) -> Result<()> {
        let mut config = self.get_config().await?;
        apply_membership_changes(&mut config, additions, removals)?;
        bump_version(&mut config);
        self.submit_config(config, force).await
    }

    /// Probe a remote instance for replica set membership.
    ///
    /// Opens a short-lived direct connection to `remote_address` and asks it
    /// for its status. A successful reply means it belongs to a set; code 94
    /// means it does not.
    ///
    /// # Errors
    ///
    /// Any other failure (unreachable instance, code 93, operational error)
    /// propagates, and the caller treats the whole probe round as unusable.
    pub async fn is_in_repl_set(remote_address: &str, config: &Config) -> Result<bool> {
        let admin = Self::connect(remote_address, config).await?;

        let outcome = match admin.db.run_command(doc! { "replSetGetStatus": 1 }).await {
            Ok(_) => Ok(true),
            Err(err) => match command_error_code(&err) {
                Some(MONGO_ERR_NOT_YET_INITIALIZED) => Ok(false),
                _ => Err(err).with_context(|| format!("probe of {remote_address} failed")),
            },
        };

        admin.shutdown().await;
        outcome
    }

    /// Fetch the current replica set config document.
    async fn get_config(&self) -> Result<Document> {
        let reply = self
            .db
            .run_command(doc! { "replSetGetConfig": 1 })
            .await
            .context("replSetGetConfig failed")?;

        Ok(reply
            .get_document("config")
            .context("replSetGetConfig reply has no config document")?
            .clone())
    }

    /// Submit a replica set config document.
    async fn submit_config(&self, config: Document, force: bool) -> Result<()> {
        debug!(force, config = %config, "submitting replica set config");
        self.db
            .run_command(doc! { "replSetReconfig": config, "force": force })
            .await
            .context("replSetReconfig failed")?;
        Ok(())
    }
}

/// Extract the numeric code of a server-side command error, if that is what
/// the failure was.
fn command_error_code(err: &mongodb::error::Error) -> Option<i32> {
    match err.kind.as_ref() {
        ErrorKind::Command(command_err) => Some(command_err.code),
        _ => None,
    }
}

/// Append `additions` and drop `removals` in a replica set config document.
///
/// New members get ids `max(existing ids) + 1, + 2, ...` computed over the
/// config as read, before removals apply, so a removed member's id is never
/// reused within the same reconfiguration. An addition whose host the config
/// already carries is skipped: the server rejects duplicate hosts, and the
/// force-recovery path computes additions without a member list to compare
/// against.
pub(crate) fn apply_membership_changes(
    config: &mut Document,
    additions: &[String],
    removals: &[String],
) -> Result<()> {
    let members = config
        .get_array_mut("members")
        .context("replica set config has no members array")?;

    let member_host = |member: &Bson| -> Option<String> {
        member
            .as_document()
            .and_then(|doc| doc.get_str("host").ok())
            .map(str::to_string)
    };

    let existing_hosts: Vec<String> = members.iter().filter_map(&member_host).collect();

    let mut next_id = members
        .iter()
        .filter_map(|member| member.as_document())
        .filter_map(|member| {
            member
                .get_i64("_id")
                .ok()
                .or_else(|| member.get_i32("_id").ok().map(i64::from))
        })
        .max()
        .unwrap_or(-1)
        + 1;

    if !removals.is_empty() {
        members.retain(|member| {
            member_host(member).map_or(true, |host| !removals.iter().any(|name| *name == host))
        });
    }

    for address in additions {
        if existing_hosts.iter().any(|host| host == address) {
            continue;
        }
        members.push(Bson::Document(doc! {
            "_id": next_id,
            "host": address.as_str(),
        }));
        next_id += 1;
    }

    Ok(())
}

/// Rewrite the sole member's host right after initiation.
fn rewrite_sole_member_host(config: &mut Document, host: &str) -> Result<()> {
    let members = config
        .get_array_mut("members")
        .context("initiated config has no members array")?;

    if let Some(Bson::Document(member)) = members.first_mut() {
        member.insert("host", host);
    }

    Ok(())
}

/// Increment the config version, whichever integer width the server used.
fn bump_version(config: &mut Document) {
    let version = config
        .get_i64("version")
        .ok()
        .or_else(|| config.get_i32("version").ok().map(i64::from))
        .unwrap_or(1);
    config.insert("version", version + 1);
}

#[cfg(test)]
#[path = "mongo_tests.rs"]
mod mongo_tests;
