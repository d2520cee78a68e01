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

//! Shared harness: running worker groups wired to in-memory collaborators.
//!
//! Every group spawned by a [`Harness`] shares one store, one event source and
//! one push transport, so several groups behave like several service
//! instances listening on the same database.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use pager::config::DispatchConfig;
use pager::dal::MemoryStore;
use pager::dispatcher::{ChannelBinding, ChannelWorker, WorkerGroup, WorkerReport};
use pager::error::WorkerError;
use pager::listener::MemoryEventSource;
use pager::models::{Notification, Status, Task};
use pager::processor::{FanoutProcessor, LoggingTaskHandler, TaskHandler, TaskProcessor};
use pager::push::MemoryTransport;
use tokio_util::sync::CancellationToken;

pub const WAIT: Duration = Duration::from_secs(5);

pub struct Harness {
    pub config: DispatchConfig,
    pub source: MemoryEventSource,
    pub store: MemoryStore,
    pub transport: MemoryTransport,
    pub cancel: CancellationToken,
    handler: Arc<dyn TaskHandler>,
    groups: Vec<WorkerGroup>,
}

impl Harness {
    /// One instance with the logging task handler.
    pub async fn start(config: DispatchConfig) -> Self {
        Self::start_with_handler(config, Arc::new(LoggingTaskHandler)).await
    }

    pub async fn start_with_handler(config: DispatchConfig, handler: Arc<dyn TaskHandler>) -> Self {
        let source = MemoryEventSource::new();
        let store = MemoryStore::with_event_channels(
            source.clone(),
            config.task_channel(),
            config.notification_channel(),
        );
        let mut harness = Self {
            config,
            source,
            store,
            transport: MemoryTransport::new(),
            cancel: CancellationToken::new(),
            handler,
            groups: Vec::new(),
        };
        harness.add_instance().await;
        harness
    }

    /// Spawns another instance and waits until its workers are listening.
    pub async fn add_instance(&mut self) {
        let store = Arc::new(self.store.clone());
        let source = Arc::new(self.source.clone());
        let tasks = TaskProcessor::new(store.clone(), self.handler.clone(), self.config.claim_mode());
        let fanout = FanoutProcessor::new(store.clone(), Arc::new(self.transport.clone()), &self.config);

        let workers = vec![
            ChannelWorker::new(
                ChannelBinding::new(self.config.task_channel(), Arc::new(tasks)),
                store.clone(),
                source.clone(),
                &self.config,
            ),
            ChannelWorker::new(
                ChannelBinding::new(self.config.notification_channel(), Arc::new(fanout)),
                store,
                source,
                &self.config,
            ),
        ];
        self.groups
            .push(WorkerGroup::spawn(workers, self.cancel.child_token()));

        let expected = self.groups.len();
        tokio::time::timeout(WAIT, async {
            self.source
                .wait_for_listeners(self.config.task_channel(), expected)
                .await;
            self.source
                .wait_for_listeners(self.config.notification_channel(), expected)
                .await;
        })
        .await
        .expect("workers did not start listening");
    }

    pub async fn wait_for_task(&self, id: &str, status: Status) -> Task {
        wait_until(move || async move { self.store.task(id).filter(|task| task.status == status) }).await
    }

    pub async fn wait_for_notification(&self, id: i64, status: Status) -> Notification {
        wait_until(move || async move {
            self.store
                .notification(id)
                .filter(|notification| notification.status == status)
        })
        .await
    }

    /// Cancels every instance and collects all worker results.
    pub async fn shutdown(self) -> Vec<Result<WorkerReport, WorkerError>> {
        self.cancel.cancel();
        let mut results = Vec::new();
        for group in self.groups {
            let joined = tokio::time::timeout(WAIT, group.join())
                .await
                .expect("workers did not stop");
            results.extend(joined);
        }
        results
    }
}

/// Polls `check` until it yields a value, panicking after [`WAIT`].
pub async fn wait_until<T, F, Fut>(mut check: F) -> T
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Option<T>>,
{
    tokio::time::timeout(WAIT, async {
        loop {
            if let Some(value) = check().await {
                return value;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not reached in time")
}
