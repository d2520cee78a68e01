/*
 *  Copyright 2025-2026 Colliery Software
 *
 *  Licensed under the Apache License, Version 2.0 (the "License");
 *  you may not use this file except in compliance with the License.
 *  You may obtain a copy of the License at
 *
 *      http://www.apache.org/licenses/LICENSE-2.0
 *
 *  Unless required by applicable law or agreed to in writing, software
 *  distributed under the License is distributed on an "AS IS" BASIS,
 *  WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 *  See the License for the specific language governing permissions and
 *  limitations under the License.
 */

//! pager-server: HTTP API plus the channel workers, in one process.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use metrics_exporter_prometheus::PrometheusBuilder;
use pager::dal::PostgresStore;
use pager::database::Database;
use pager::dispatcher::{ChannelBinding, ChannelWorker, WorkerGroup};
use pager::guard::ConnectionGuard;
use pager::listener::PostgresEventSource;
use pager::processor::{FanoutProcessor, TaskProcessor};
use pager::push::WebPushTransport;
use pager_server::config::{Overrides, ServerConfig};
use pager_server::{build_router, AppState};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Pager - notification-driven task and Web Push dispatch
#[derive(Parser)]
#[command(name = "pager-server")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(long, env = "PAGER_CONFIG")]
    config: Option<PathBuf>,

    /// Database URL
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    /// Port for the HTTP API
    #[arg(long, env = "SERVER_PORT")]
    port: Option<u16>,

    /// VAPID contact URI (mailto: or https:)
    #[arg(long, env = "VAPID_SUBSCRIBER")]
    vapid_subscriber: Option<String>,

    /// VAPID public key (base64url)
    #[arg(long, env = "VAPID_PUBLIC_KEY")]
    vapid_public_key: Option<String>,

    /// VAPID private key (base64url)
    #[arg(long, env = "VAPID_PRIVATE_KEY", hide_env_values = true)]
    vapid_private_key: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.json_logs);

    let config = ServerConfig::load(cli.config.as_deref())
        .context("Failed to load configuration")?
        .with_overrides(Overrides {
            database_url: cli.database_url,
            port: cli.port,
            vapid_subscriber: cli.vapid_subscriber,
            vapid_public_key: cli.vapid_public_key,
            vapid_private_key: cli.vapid_private_key,
        });
    config.validate().context("Invalid configuration")?;

    let metrics = PrometheusBuilder::new()
        .install_recorder()
        .context("Failed to install metrics recorder")?;

    let dispatch = config.dispatch_config();
    let database_url = config
        .database_url()
        .context("Database URL is required. Set --database-url or DATABASE_URL environment variable")?;
    let credentials = config
        .vapid_credentials()
        .context("VAPID credentials are required")?;
    let public_key = credentials.public_key.clone();

    let cancel = CancellationToken::new();
    tokio::spawn(shutdown_on_signal(cancel.clone()));

    let database = Database::new(database_url, config.server.pool_size)?;
    let store = Arc::new(PostgresStore::new(database.clone()));
    ConnectionGuard::new(dispatch.retry_policy().clone())
        .ensure_connected(store.as_ref(), &cancel)
        .await
        .context("Database is not reachable")?;
    database.run_migrations().await?;
    database
        .bind_channels(dispatch.task_channel(), dispatch.notification_channel())
        .await?;

    let source = Arc::new(PostgresEventSource::from(&database));
    let transport = Arc::new(WebPushTransport::new(credentials, dispatch.delivery_timeout())?);
    let workers = vec![
        ChannelWorker::new(
            ChannelBinding::new(
                dispatch.task_channel(),
                Arc::new(TaskProcessor::new(
                    store.clone(),
                    Arc::new(pager::processor::LoggingTaskHandler),
                    dispatch.claim_mode(),
                )),
            ),
            store.clone(),
            source.clone(),
            &dispatch,
        ),
        ChannelWorker::new(
            ChannelBinding::new(
                dispatch.notification_channel(),
                Arc::new(FanoutProcessor::new(store.clone(), transport, &dispatch)),
            ),
            store.clone(),
            source,
            &dispatch,
        ),
    ];
    let group = WorkerGroup::spawn(workers, cancel.clone());
    info!(channels = ?group.channels().collect::<Vec<_>>(), "Channel workers started");

    let state = AppState::new(store)
        .with_metrics(metrics)
        .with_vapid_public_key(public_key);
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.server.port))
        .await
        .with_context(|| format!("Failed to bind port {}", config.server.port))?;
    info!(addr = %listener.local_addr()?, "HTTP API listening");

    let serve_cancel = cancel.clone();
    let served = axum::serve(listener, build_router(state))
        .with_graceful_shutdown(async move { serve_cancel.cancelled().await })
        .await;
    cancel.cancel();

    for result in group.join().await {
        match result {
            Ok(report) => info!(
                channel = %report.channel,
                exit = ?report.exit,
                received = report.summary.received,
                failed = report.summary.failed,
                "Channel worker finished"
            ),
            Err(e) => error!(error = %e, "Channel worker failed"),
        }
    }

    served.context("HTTP server failed")?;
    info!("Shutdown complete");
    Ok(())
}

fn init_tracing(verbose: bool, json: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }
}

/// Cancels `cancel` on SIGINT or SIGTERM.
async fn shutdown_on_signal(cancel: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
        _ = cancel.cancelled() => {}
    }
    cancel.cancel();
}
