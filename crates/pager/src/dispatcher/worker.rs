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

//! Channel workers and the worker group.
//!
//! A [`ChannelWorker`] is the execution unit for one channel binding. Each
//! subscriber instance it runs goes through the same steps:
//!
//! 1. wait for the store with the connection guard
//! 2. register on the channel
//! 3. dispatch events until cancelled or disconnected
//!
//! After a disconnect the worker starts a fresh instance from step 1 when
//! `restart_on_disconnect` is set. A guard or registration failure ends only
//! this worker. [`WorkerGroup`] spawns one task per worker and shares a single
//! cancellation token between them.

use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use super::{DispatchEnd, DispatchSummary, Dispatcher, Processor};
use crate::config::DispatchConfig;
use crate::dal::Store;
use crate::error::{GuardError, WorkerError};
use crate::guard::ConnectionGuard;
use crate::listener::EventSource;
use crate::subscriber::EventSubscriber;

/// Construction-time binding of a channel to the processor for its events.
#[derive(Clone)]
pub struct ChannelBinding {
    pub channel: String,
    pub processor: Arc<dyn Processor>,
}

impl ChannelBinding {
    pub fn new(channel: impl Into<String>, processor: Arc<dyn Processor>) -> Self {
        Self {
            channel: channel.into(),
            processor,
        }
    }
}

impl std::fmt::Debug for ChannelBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelBinding")
            .field("channel", &self.channel)
            .field("processor", &self.processor.name())
            .finish()
    }
}

/// How a worker ended when it ended cleanly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerExit {
    Cancelled,
    /// The connection closed and restarts are disabled.
    Disconnected,
}

/// Outcome of a worker that ended cleanly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerReport {
    pub channel: String,
    pub exit: WorkerExit,
    /// Number of subscriber instances started.
    pub subscriber_runs: u32,
    /// Totals across all subscriber instances.
    pub summary: DispatchSummary,
}

/// The execution unit for one channel.
pub struct ChannelWorker {
    binding: ChannelBinding,
    store: Arc<dyn Store>,
    source: Arc<dyn EventSource>,
    guard: ConnectionGuard,
    restart_on_disconnect: bool,
}

impl ChannelWorker {
    pub fn new(
        binding: ChannelBinding,
        store: Arc<dyn Store>,
        source: Arc<dyn EventSource>,
        config: &DispatchConfig,
    ) -> Self {
        Self {
            binding,
            store,
            source,
            guard: ConnectionGuard::new(config.retry_policy().clone()),
            restart_on_disconnect: config.restart_on_disconnect(),
        }
    }

    pub fn channel(&self) -> &str {
        &self.binding.channel
    }

    /// Runs subscriber instances until cancellation or a fatal error.
    pub async fn run(self, cancel: CancellationToken) -> Result<WorkerReport, WorkerError> {
        let channel = self.binding.channel.clone();
        let dispatcher = Dispatcher::new(self.binding.processor.clone());
        let mut report = WorkerReport {
            channel: channel.clone(),
            exit: WorkerExit::Cancelled,
            subscriber_runs: 0,
            summary: DispatchSummary::default(),
        };

        loop {
            match self
                .guard
                .ensure_connected(self.store.as_ref(), &cancel)
                .await
            {
                Ok(_) => {}
                Err(GuardError::Cancelled { .. }) => {
                    info!(%channel, "Worker cancelled while waiting for the database");
                    return Ok(report);
                }
                Err(e) => {
                    error!(%channel, error = %e, "Worker giving up");
                    return Err(e.into());
                }
            }

            let mut subscriber =
                match EventSubscriber::subscribe(self.source.as_ref(), &channel, cancel.clone())
                    .await
                {
                    Ok(subscriber) => subscriber,
                    Err(_) if cancel.is_cancelled() => return Ok(report),
                    Err(e) => {
                        error!(%channel, error = %e, "Failed to register listener");
                        return Err(e.into());
                    }
                };
            report.subscriber_runs += 1;

            let (end, summary) = dispatcher.run(&mut subscriber).await;
            report.summary.absorb(summary);
            drop(subscriber);

            match end {
                DispatchEnd::Cancelled => {
                    info!(%channel, events = report.summary.received, "Worker stopped");
                    return Ok(report);
                }
                DispatchEnd::Disconnected if self.restart_on_disconnect && !cancel.is_cancelled() => {
                    warn!(%channel, "Restarting subscriber after disconnect");
                }
                DispatchEnd::Disconnected => {
                    report.exit = if cancel.is_cancelled() {
                        WorkerExit::Cancelled
                    } else {
                        WorkerExit::Disconnected
                    };
                    return Ok(report);
                }
            }
        }
    }
}

/// Handle to a set of running channel workers.
pub struct WorkerGroup {
    cancel: CancellationToken,
    joins: Vec<(String, JoinHandle<Result<WorkerReport, WorkerError>>)>,
}

impl WorkerGroup {
    /// Spawns every worker on the current runtime.
    pub fn spawn(workers: Vec<ChannelWorker>, cancel: CancellationToken) -> Self {
        let joins = workers
            .into_iter()
            .map(|worker| {
                let channel = worker.channel().to_string();
                let join = tokio::spawn(worker.run(cancel.clone()));
                (channel, join)
            })
            .collect();

        Self { cancel, joins }
    }

    /// Channels with a spawned worker, in spawn order.
    pub fn channels(&self) -> impl Iterator<Item = &str> {
        self.joins.iter().map(|(channel, _)| channel.as_str())
    }

    /// Asks every worker to stop at its next pull boundary.
    pub fn request_shutdown(&self) {
        self.cancel.cancel();
    }

    /// Waits for every worker to end, in spawn order.
    pub async fn join(self) -> Vec<Result<WorkerReport, WorkerError>> {
        let mut results = Vec::with_capacity(self.joins.len());
        for (channel, join) in self.joins {
            let result = join.await.unwrap_or_else(|e| {
                Err(WorkerError::Panicked {
                    channel,
                    reason: e.to_string(),
                })
            });
            results.push(result);
        }
        results
    }

    /// Requests shutdown and waits for every worker.
    pub async fn shutdown_and_join(self) -> Vec<Result<WorkerReport, WorkerError>> {
        self.request_shutdown();
        self.join().await
    }
}
