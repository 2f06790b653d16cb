// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

use anyhow::Result;
use mongy::{
    config::Config, constants::TOKIO_WORKER_THREADS, context::Context, driver,
    identity::HostIdentity,
};
use tracing::{debug, info};

fn main() -> Result<()> {
    // Build Tokio runtime with custom thread names
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(TOKIO_WORKER_THREADS)
        .thread_name("mongy-sidecar")
        .enable_all()
        .build()?;

    runtime.block_on(async_main())
}

/// Initialize logging with custom format
///
/// Respects `RUST_LOG` environment variable if set, otherwise defaults to INFO level.
/// Respects `RUST_LOG_FORMAT` environment variable for output format (json or text).
fn initialize_logging() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let log_format = std::env::var("RUST_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    match log_format.to_lowercase().as_str() {
        "json" => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .json()
                .init();
        }
        _ => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .with_ansi(true)
                .compact()
                .init();
        }
    }

    info!("Starting MongoDB replica set sidecar");
}

/// Build the reconcile context: configuration, Kubernetes client, and the
/// pod's own identity. Any failure here is fatal and exits the process.
async fn initialize_context() -> Result<Context> {
    let config = Config::from_env()?;
    debug!(?config, "configuration loaded");

    debug!("Initializing Kubernetes client");
    let client = kube::Client::try_default().await?;
    debug!("Kubernetes client initialized successfully");

    let identity = HostIdentity::resolve(config.mongo_port).await?;
    info!(ip = %identity.ip, address = %identity.address, "resolved host identity");

    Ok(Context {
        client,
        config,
        identity,
    })
}

async fn async_main() -> Result<()> {
    initialize_logging();

    let ctx = initialize_context().await?;

    // Run the reconcile loop with signal handling. The loop never exits on
    // its own; a mid-tick termination at worst leaves one reconfig in
    // flight, which the server accepts or rejects atomically.
    let shutdown_result: Result<()> = tokio::select! {
        // Monitor for SIGINT (Ctrl+C)
        result = tokio::signal::ctrl_c() => {
            info!("Received SIGINT (Ctrl+C), shutting down...");
            result.map_err(anyhow::Error::from)
        }

        // Monitor for SIGTERM (Kubernetes sends this when deleting pods)
        result = async {
            #[cfg(unix)]
            {
                use tokio::signal::unix::{signal, SignalKind};
                let mut sigterm = signal(SignalKind::terminate())?;
                sigterm.recv().await;
                Ok::<(), anyhow::Error>(())
            }
            #[cfg(not(unix))]
            {
                // On non-Unix platforms, just wait forever
                std::future::pending::<()>().await;
                Ok::<(), anyhow::Error>(())
            }
        } => {
            info!("Received SIGTERM (pod termination), shutting down...");
            result
        }

        // Run the reconcile loop
        result = driver::run(ctx) => {
            result
        }
    };

    shutdown_result?;
    info!("Graceful shutdown completed successfully");

    Ok(())
}
