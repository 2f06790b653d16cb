// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! The serial reconcile loop.
//!
//! Ticks never overlap: the sleep is scheduled after a tick finishes, so a
//! slow cluster API or a hung probe delays the next tick instead of stacking
//! concurrent ones. A failed tick is logged and the loop continues; the loop
//! itself is the retry mechanism, there is no backoff.

use std::time::Duration;

use anyhow::Result;
use tracing::{debug, error};

use crate::context::Context;
use crate::reconciler;

/// Run reconcile ticks forever.
///
/// Never returns under normal operation; the process exits via signal
/// handling in `main`.
pub async fn run(ctx: Context) -> Result<()> {
    let interval = Duration::from_secs(ctx.config.loop_sleep_seconds);

    loop {
        debug!("starting reconcile tick");
        if let Err(err) = reconciler::reconcile(&ctx).await {
            // The next tick re-reads ground truth, so no state needs repair here.
            error!(error = %format!("{err:#}"), "reconcile tick failed");
        }

        tokio::time::sleep(interval).await;
    }
}
