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

//! # Pager
//!
//! A notification-driven dispatch engine. Rows inserted into the store are
//! published on a channel by an insert trigger; long-lived subscribers pick
//! the events up, drive each row through its status state machine and, for
//! notifications, fan the payload out to every registered Web Push endpoint.
//!
//! ## Components
//!
//! - [`guard::ConnectionGuard`]: bounded-retry wait for the store
//! - [`subscriber::EventSubscriber`]: one registration on one channel, pulled
//!   event by event until cancelled
//! - [`dispatcher::Dispatcher`]: per-channel sequential loop and error boundary
//! - [`processor::TaskProcessor`]: `pending -> processing -> completed | failed`
//! - [`processor::FanoutProcessor`]: sequential push delivery with a named
//!   failure policy
//! - [`dispatcher::WorkerGroup`]: one worker per channel binding, one shared
//!   cancellation token
//!
//! Delivery is at least once. Every running subscriber receives every event
//! on its channel; [`config::ClaimMode::Exclusive`] turns the pick-up write
//! into a conditional claim so only one instance processes each row.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use pager::config::DispatchConfig;
//! use pager::dal::MemoryStore;
//! use pager::dispatcher::{ChannelBinding, ChannelWorker, WorkerGroup};
//! use pager::listener::MemoryEventSource;
//! use pager::processor::{FanoutProcessor, TaskProcessor};
//! use pager::push::MemoryTransport;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() {
//! let config = DispatchConfig::default();
//! let source = MemoryEventSource::new();
//! let store = Arc::new(MemoryStore::with_events(source.clone()));
//! let source = Arc::new(source);
//!
//! let tasks = ChannelBinding::new(
//!     config.task_channel(),
//!     Arc::new(TaskProcessor::logging(store.clone())),
//! );
//! let notifications = ChannelBinding::new(
//!     config.notification_channel(),
//!     Arc::new(FanoutProcessor::new(store.clone(), Arc::new(MemoryTransport::new()), &config)),
//! );
//!
//! let group = WorkerGroup::spawn(
//!     vec![
//!         ChannelWorker::new(tasks, store.clone(), source.clone(), &config),
//!         ChannelWorker::new(notifications, store.clone(), source.clone(), &config),
//!     ],
//!     CancellationToken::new(),
//! );
//!
//! // ... on shutdown
//! group.shutdown_and_join().await;
//! # }
//! ```

pub mod config;
pub mod dal;
pub mod database;
pub mod dispatcher;
pub mod error;
pub mod guard;
pub mod listener;
pub mod models;
pub mod processor;
pub mod push;
pub mod subscriber;

pub use config::{Backoff, ClaimMode, DispatchConfig, FanoutPolicy, RetryPolicy};
pub use dal::{MemoryStore, Store};
pub use error::{
    DatabaseError, DecodeError, GuardError, ListenError, ProcessError, StoreError,
    TransportError, WorkerError,
};
pub use models::{ChannelEvent, Notification, Status, Subscription, Task};

#[cfg(feature = "postgres")]
pub use dal::PostgresStore;
#[cfg(feature = "postgres")]
pub use database::Database;
#[cfg(feature = "postgres")]
pub use listener::PostgresEventSource;
