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

//! Per-channel dispatch loop.
//!
//! The [`Dispatcher`] pulls events from an [`EventSubscriber`] one at a time
//! and hands each to its [`Processor`]. It is the error boundary for the
//! channel: a failed event is logged and counted, never retried, and the loop
//! moves on to the next pull. Events on one channel are never processed
//! concurrently.
//!
//! [`worker`] wraps the loop with the connection guard and restart handling,
//! and runs one worker per channel binding.

pub mod worker;

pub use worker::{ChannelBinding, ChannelWorker, WorkerExit, WorkerGroup, WorkerReport};

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, error, warn};

use crate::error::ProcessError;
use crate::models::ChannelEvent;
use crate::subscriber::EventSubscriber;

/// Handles the events of one channel.
#[async_trait]
pub trait Processor: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    async fn process(&self, event: &ChannelEvent) -> Result<(), ProcessError>;
}

/// Counters for one dispatcher run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchSummary {
    pub received: u64,
    pub processed: u64,
    pub failed: u64,
    pub wait_errors: u64,
}

impl DispatchSummary {
    pub(crate) fn absorb(&mut self, other: DispatchSummary) {
        self.received += other.received;
        self.processed += other.processed;
        self.failed += other.failed;
        self.wait_errors += other.wait_errors;
    }
}

/// Why a dispatcher run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchEnd {
    Cancelled,
    /// The listen connection closed.
    Disconnected,
}

/// Sequential event loop for one channel.
#[derive(Clone)]
pub struct Dispatcher {
    processor: Arc<dyn Processor>,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("processor", &self.processor.name())
            .finish()
    }
}

impl Dispatcher {
    pub fn new(processor: Arc<dyn Processor>) -> Self {
        Self { processor }
    }

    /// Runs until the subscriber's sequence ends.
    ///
    /// Cancellation is observed only between events: an in-flight
    /// [`Processor::process`] call runs to completion.
    pub async fn run(&self, subscriber: &mut EventSubscriber) -> (DispatchEnd, DispatchSummary) {
        let channel = subscriber.channel().to_string();
        let processor = self.processor.name();
        let mut summary = DispatchSummary::default();

        while let Some(next) = subscriber.next().await {
            let event = match next {
                Ok(event) => event,
                Err(e) if !e.is_transient() => {
                    warn!(%channel, error = %e, "Listen connection lost");
                    return (DispatchEnd::Disconnected, summary);
                }
                Err(e) => {
                    summary.wait_errors += 1;
                    metrics::counter!("pager_listener_wait_errors_total", "channel" => channel.clone())
                        .increment(1);
                    warn!(%channel, error = %e, "Error waiting for notification");
                    continue;
                }
            };

            summary.received += 1;
            metrics::counter!("pager_events_received_total", "channel" => channel.clone())
                .increment(1);
            debug!(%channel, processor, process_id = event.process_id, "Received event");

            match self.processor.process(&event).await {
                Ok(()) => {
                    summary.processed += 1;
                    metrics::counter!("pager_events_processed_total", "channel" => channel.clone())
                        .increment(1);
                }
                Err(e) => {
                    summary.failed += 1;
                    metrics::counter!("pager_events_failed_total", "channel" => channel.clone())
                        .increment(1);
                    error!(%channel, processor, error = %e, "Failed to process event");
                }
            }
        }

        (DispatchEnd::Cancelled, summary)
    }
}
