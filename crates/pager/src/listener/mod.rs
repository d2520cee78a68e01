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

//! Channel listeners.
//!
//! An [`EventSource`] hands out [`Listener`]s. Each listener owns one
//! registration on one channel, made when it is created and never repeated,
//! and yields the raw payloads published on that channel from then on.
//! Payloads published while no listener is registered are lost; the rows
//! themselves remain queryable.
//!
//! - PostgreSQL: a dedicated `tokio-postgres` connection per listener issuing
//!   one `LISTEN`
//! - Memory: an in-process broadcast used by tests and local runs

pub mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;

pub use memory::MemoryEventSource;
#[cfg(feature = "postgres")]
pub use postgres::PostgresEventSource;

use async_trait::async_trait;

use crate::error::ListenError;
use crate::models::ChannelEvent;

/// Creates channel listeners.
#[async_trait]
pub trait EventSource: Send + Sync {
    /// Opens a listener registered on `channel`.
    async fn listen(&self, channel: &str) -> Result<Box<dyn Listener>, ListenError>;
}

/// One registration on one channel.
///
/// Dropping the listener releases its connection.
#[async_trait]
pub trait Listener: Send {
    fn channel(&self) -> &str;

    /// Waits for the next payload on the channel.
    ///
    /// Must be cancel safe: the subscriber races this future against its
    /// cancellation token and drops it when cancellation wins.
    ///
    /// [`ListenError::Wait`] leaves the listener usable; [`ListenError::Closed`]
    /// means no further payloads will arrive.
    async fn wait_for_notification(&mut self) -> Result<ChannelEvent, ListenError>;
}
