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

//! Data access layer.
//!
//! The dispatch engine touches the store only through [`Store`]: a
//! connectivity probe, inserts and listings for the HTTP boundary, status
//! writes keyed by identity, and a full read of the subscription set.
//!
//! Status writes return `Ok(false)` when no row matched. Callers log that as a
//! warning rather than failing the event.

#[cfg(feature = "postgres")]
pub mod postgres;
pub mod memory;

pub use memory::MemoryStore;
#[cfg(feature = "postgres")]
pub use postgres::PostgresStore;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::models::{NewTask, Notification, Status, Subscription, Task};

/// Row reads and writes used by the processors and the HTTP boundary.
#[async_trait]
pub trait Store: Send + Sync {
    /// Cheap round-trip used by the connection guard and the health check.
    async fn ping(&self) -> Result<(), StoreError>;

    /// Inserts a task with a fresh id and status `pending`.
    async fn create_task(&self, new_task: NewTask) -> Result<Task, StoreError>;

    async fn list_tasks(&self) -> Result<Vec<Task>, StoreError>;

    /// Unconditionally writes `status` and bumps `updated`.
    async fn set_task_status(&self, id: &str, status: Status) -> Result<bool, StoreError>;

    /// Moves the task from `pending` to `processing` only if it is still pending.
    async fn claim_task(&self, id: &str) -> Result<bool, StoreError>;

    /// Inserts a notification with status `pending`.
    async fn create_notification(&self, body: String) -> Result<Notification, StoreError>;

    async fn list_notifications(&self) -> Result<Vec<Notification>, StoreError>;

    async fn set_notification_status(&self, id: i64, status: Status)
        -> Result<bool, StoreError>;

    async fn claim_notification(&self, id: i64) -> Result<bool, StoreError>;

    async fn create_subscription(
        &self,
        subscription: Subscription,
    ) -> Result<Subscription, StoreError>;

    /// Every registered subscription, in registration order.
    async fn list_subscriptions(&self) -> Result<Vec<Subscription>, StoreError>;
}
