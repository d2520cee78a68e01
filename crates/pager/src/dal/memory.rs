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

//! In-process [`Store`] used by tests and local runs.
//!
//! Besides the rows themselves it records every status write per row, so
//! tests can assert the exact transition sequence. When attached to a
//! [`MemoryEventSource`] it publishes each inserted task and notification as
//! JSON on its channel, the way the PostgreSQL insert triggers do.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::warn;

use super::Store;
use crate::config::{DEFAULT_NOTIFICATION_CHANNEL, DEFAULT_TASK_CHANNEL};
use crate::error::StoreError;
use crate::listener::MemoryEventSource;
use crate::models::{NewTask, Notification, Status, Subscription, Task};

/// One status write as recorded by [`MemoryStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusChange {
    pub status: Status,
    pub at: DateTime<Utc>,
}

#[derive(Default)]
struct State {
    tasks: Vec<(Task, Vec<StatusChange>)>,
    notifications: Vec<(Notification, Vec<StatusChange>)>,
    subscriptions: Vec<(i64, Subscription)>,
    next_notification_id: i64,
    next_subscription_id: i64,
}

#[derive(Clone)]
struct Publisher {
    source: MemoryEventSource,
    task_channel: String,
    notification_channel: String,
}

#[derive(Default)]
struct Faults {
    unavailable: AtomicBool,
    failing_pings: AtomicU32,
    fail_subscription_reads: AtomicBool,
    fail_status_writes: AtomicBool,
    pings: AtomicUsize,
}

/// Thread-safe in-memory store. Clones share the same rows.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<State>>,
    faults: Arc<Faults>,
    publisher: Option<Publisher>,
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("publishing", &self.publisher.is_some())
            .finish_non_exhaustive()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publishes inserts on the default task and notification channels of `source`.
    pub fn with_events(source: MemoryEventSource) -> Self {
        Self::with_event_channels(source, DEFAULT_TASK_CHANNEL, DEFAULT_NOTIFICATION_CHANNEL)
    }

    pub fn with_event_channels(
        source: MemoryEventSource,
        task_channel: impl Into<String>,
        notification_channel: impl Into<String>,
    ) -> Self {
        Self {
            publisher: Some(Publisher {
                source,
                task_channel: task_channel.into(),
                notification_channel: notification_channel.into(),
            }),
            ..Self::default()
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.faults.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::ConnectionPool("store unavailable".to_string()));
        }
        Ok(())
    }

    fn check_status_write(&self) -> Result<(), StoreError> {
        self.check_available()?;
        if self.faults.fail_status_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Query("status write rejected".to_string()));
        }
        Ok(())
    }

    fn publish_task(&self, task: &Task) {
        if let Some(publisher) = &self.publisher {
            publish_row(&publisher.source, &publisher.task_channel, task);
        }
    }

    fn publish_notification(&self, notification: &Notification) {
        if let Some(publisher) = &self.publisher {
            publish_row(&publisher.source, &publisher.notification_channel, notification);
        }
    }

    /// Makes every operation fail with a connection error while set.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.faults.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Makes the next `count` pings fail.
    pub fn fail_next_pings(&self, count: u32) {
        self.faults.failing_pings.store(count, Ordering::SeqCst);
    }

    pub fn fail_subscription_reads(&self, fail: bool) {
        self.faults
            .fail_subscription_reads
            .store(fail, Ordering::SeqCst);
    }

    pub fn fail_status_writes(&self, fail: bool) {
        self.faults.fail_status_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of pings received, successful or not.
    pub fn ping_count(&self) -> usize {
        self.faults.pings.load(Ordering::SeqCst)
    }

    pub fn task(&self, id: &str) -> Option<Task> {
        self.state()
            .tasks
            .iter()
            .find(|(task, _)| task.id == id)
            .map(|(task, _)| task.clone())
    }

    pub fn notification(&self, id: i64) -> Option<Notification> {
        self.state()
            .notifications
            .iter()
            .find(|(n, _)| n.id == id)
            .map(|(n, _)| n.clone())
    }

    /// Every status the task has held, oldest first, starting with the
    /// `pending` it was inserted with.
    pub fn task_history(&self, id: &str) -> Vec<StatusChange> {
        self.state()
            .tasks
            .iter()
            .find(|(task, _)| task.id == id)
            .map(|(_, history)| history.clone())
            .unwrap_or_default()
    }

    /// Every status the notification has held, oldest first, starting with
    /// the `pending` it was inserted with.
    pub fn notification_history(&self, id: i64) -> Vec<StatusChange> {
        self.state()
            .notifications
            .iter()
            .find(|(n, _)| n.id == id)
            .map(|(_, history)| history.clone())
            .unwrap_or_default()
    }
}

fn publish_row<T: serde::Serialize>(source: &MemoryEventSource, channel: &str, row: &T) {
    match serde_json::to_string(row) {
        Ok(payload) => {
            source.publish(channel, payload);
        }
        Err(e) => warn!(channel, error = %e, "Failed to encode row snapshot for publish"),
    }
}

fn inserted(created: DateTime<Utc>) -> Vec<StatusChange> {
    vec![StatusChange {
        status: Status::Pending,
        at: created,
    }]
}

fn record(
    status_field: &mut Status,
    updated: &mut DateTime<Utc>,
    history: &mut Vec<StatusChange>,
    status: Status,
) {
    // Clock steps backwards must not make `updated` go backwards.
    let at = Utc::now().max(*updated);
    *status_field = status;
    *updated = at;
    history.push(StatusChange { status, at });
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> Result<(), StoreError> {
        self.faults.pings.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;
        let remaining = self.faults.failing_pings.load(Ordering::SeqCst);
        if remaining > 0 {
            self.faults
                .failing_pings
                .store(remaining - 1, Ordering::SeqCst);
            return Err(StoreError::ConnectionPool("connection refused".to_string()));
        }
        Ok(())
    }

    async fn create_task(&self, new_task: NewTask) -> Result<Task, StoreError> {
        self.check_available()?;
        let task = new_task.into_task(Utc::now());
        self.state()
            .tasks
            .push((task.clone(), inserted(task.created)));
        self.publish_task(&task);
        Ok(task)
    }

    async fn list_tasks(&self) -> Result<Vec<Task>, StoreError> {
        self.check_available()?;
        Ok(self.state().tasks.iter().map(|(t, _)| t.clone()).collect())
    }

    async fn set_task_status(&self, id: &str, status: Status) -> Result<bool, StoreError> {
        self.check_status_write()?;
        let mut state = self.state();
        let Some((task, history)) = state.tasks.iter_mut().find(|(t, _)| t.id == id) else {
            return Ok(false);
        };
        record(&mut task.status, &mut task.updated, history, status);
        Ok(true)
    }

    async fn claim_task(&self, id: &str) -> Result<bool, StoreError> {
        self.check_status_write()?;
        let mut state = self.state();
        match state.tasks.iter_mut().find(|(t, _)| t.id == id) {
            Some((task, history)) if task.status == Status::Pending => {
                record(&mut task.status, &mut task.updated, history, Status::Processing);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn create_notification(&self, body: String) -> Result<Notification, StoreError> {
        self.check_available()?;
        let now = Utc::now();
        let notification = {
            let mut state = self.state();
            state.next_notification_id += 1;
            let notification = Notification {
                id: state.next_notification_id,
                body,
                status: Status::Pending,
                created: now,
                updated: now,
            };
            state
                .notifications
                .push((notification.clone(), inserted(now)));
            notification
        };
        self.publish_notification(&notification);
        Ok(notification)
    }

    async fn list_notifications(&self) -> Result<Vec<Notification>, StoreError> {
        self.check_available()?;
        Ok(self
            .state()
            .notifications
            .iter()
            .map(|(n, _)| n.clone())
            .collect())
    }

    async fn set_notification_status(
        &self,
        id: i64,
        status: Status,
    ) -> Result<bool, StoreError> {
        self.check_status_write()?;
        let mut state = self.state();
        let Some((notification, history)) =
            state.notifications.iter_mut().find(|(n, _)| n.id == id)
        else {
            return Ok(false);
        };
        record(
            &mut notification.status,
            &mut notification.updated,
            history,
            status,
        );
        Ok(true)
    }

    async fn claim_notification(&self, id: i64) -> Result<bool, StoreError> {
        self.check_status_write()?;
        let mut state = self.state();
        match state.notifications.iter_mut().find(|(n, _)| n.id == id) {
            Some((notification, history)) if notification.status == Status::Pending => {
                record(
                    &mut notification.status,
                    &mut notification.updated,
                    history,
                    Status::Processing,
                );
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn create_subscription(
        &self,
        subscription: Subscription,
    ) -> Result<Subscription, StoreError> {
        self.check_available()?;
        let mut state = self.state();
        state.next_subscription_id += 1;
        let id = state.next_subscription_id;
        state.subscriptions.push((id, subscription.clone()));
        Ok(subscription)
    }

    async fn list_subscriptions(&self) -> Result<Vec<Subscription>, StoreError> {
        self.check_available()?;
        if self.faults.fail_subscription_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Query("subscription read rejected".to_string()));
        }
        Ok(self
            .state()
            .subscriptions
            .iter()
            .map(|(_, s)| s.clone())
            .collect())
    }
}
