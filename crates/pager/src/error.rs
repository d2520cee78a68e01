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

//! Error types for the dispatch engine.
//!
//! Each concern gets its own error enum so callers can tell a malformed event
//! apart from a store outage or a push delivery failure:
//!
//! - [`StoreError`]: row reads and writes
//! - [`ListenError`]: channel registration and notification waits
//! - [`GuardError`]: connection establishment before listening
//! - [`DecodeError`]: malformed event payloads
//! - [`TransportError`]: push delivery
//! - [`ProcessError`]: everything a processor can return to the dispatcher
//! - [`WorkerError`]: the reasons a channel worker stops for good
//!
//! Cancellation is not an error anywhere in this crate: cancelled waits end
//! their loops with `Ok`/`None`.

use std::time::Duration;
use thiserror::Error;

/// Errors raised by [`crate::dal::Store`] implementations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A pooled connection could not be obtained or the blocking call failed.
    #[error("Connection pool error: {0}")]
    ConnectionPool(String),

    /// The query itself failed.
    #[error("Query failed: {0}")]
    Query(String),

    /// A stored value could not be mapped onto the domain model.
    #[error("Invalid stored value for {field}: {value}")]
    InvalidValue { field: &'static str, value: String },
}

#[cfg(feature = "postgres")]
impl From<diesel::result::Error> for StoreError {
    fn from(e: diesel::result::Error) -> Self {
        StoreError::Query(e.to_string())
    }
}

/// Errors raised while creating the pool or preparing the schema.
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// The URL does not parse or is not a `postgres://` URL.
    #[error("Invalid database URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// The pool could not be built or a connection could not be checked out.
    #[error("Failed to build connection pool: {0}")]
    Pool(String),

    /// An embedded migration failed to apply.
    #[error("Failed to run migrations: {0}")]
    Migration(String),

    /// A channel handed to the insert triggers is not a valid identifier.
    #[error("Invalid channel name '{name}': {reason}")]
    InvalidChannel { name: String, reason: &'static str },

    /// Recreating the insert triggers failed.
    #[error("Failed to bind insert triggers: {0}")]
    Triggers(String),
}

/// Errors raised by event sources and listeners.
#[derive(Debug, Error)]
pub enum ListenError {
    /// The dedicated listen connection could not be opened.
    #[error("Failed to open listen connection: {0}")]
    Connect(String),

    /// The channel name is not a valid identifier.
    #[error("Invalid channel name '{name}': {reason}")]
    InvalidChannel { name: String, reason: &'static str },

    /// A wait for the next notification failed; the listener is still usable.
    #[error("Error waiting for notification: {0}")]
    Wait(String),

    /// The underlying connection is gone; no further notifications will arrive.
    #[error("Listen connection closed")]
    Closed,
}

impl ListenError {
    /// Whether the listener can keep being polled after this error.
    pub fn is_transient(&self) -> bool {
        matches!(self, ListenError::Wait(_))
    }
}

/// Errors raised by the connection guard.
#[derive(Debug, Error)]
pub enum GuardError {
    /// Every attempt allowed by the retry policy failed.
    #[error("Failed to connect to database after {attempts} attempts: {last_error}")]
    Exhausted { attempts: u32, last_error: String },

    /// Cancellation fired while pinging or waiting between attempts.
    #[error("Connection wait cancelled after {attempts} attempts")]
    Cancelled { attempts: u32 },
}

/// A channel payload that could not be decoded into its row snapshot.
#[derive(Debug, Error)]
#[error("Failed to decode {kind} payload on channel '{channel}': {source}")]
pub struct DecodeError {
    pub channel: String,
    pub kind: &'static str,
    #[source]
    pub source: serde_json::Error,
}

/// Hard push delivery failures.
///
/// A non-2xx HTTP response is *not* a transport error; it is returned as a
/// [`crate::push::PushResponse`] and treated as a soft failure.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The endpoint does not parse as an `https` URL.
    #[error("Invalid endpoint '{endpoint}': {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    /// The subscription keys could not be used to encrypt or sign the payload.
    #[error("Failed to encrypt payload for '{endpoint}': {reason}")]
    Encryption { endpoint: String, reason: String },

    /// The HTTP request did not produce a response.
    #[error("Push request to '{endpoint}' failed: {reason}")]
    Request { endpoint: String, reason: String },

    /// The delivery deadline passed before a response arrived.
    #[error("Push request to '{endpoint}' timed out after {timeout:?}")]
    Timeout { endpoint: String, timeout: Duration },
}

/// Errors a processor hands back to the dispatcher.
///
/// The dispatcher logs these and moves on to the next event.
#[derive(Debug, Error)]
pub enum ProcessError {
    /// The event payload is not a valid row snapshot.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// A status write or subscription read failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A delivery hard-failed under the fail-fast policy.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The unit of work for a task failed.
    #[error("Task {task_id} failed: {reason}")]
    Handler { task_id: String, reason: String },

    /// Several deliveries failed under the continue-and-aggregate policy.
    #[error("{} of {attempted} deliveries failed for notification {notification_id}", .failures.len())]
    Deliveries {
        notification_id: i64,
        attempted: usize,
        failures: Vec<TransportError>,
    },
}

/// Why a channel worker ended other than by cancellation.
///
/// Only the affected worker stops; other channels keep running.
#[derive(Debug, Error)]
pub enum WorkerError {
    /// The store never became reachable.
    #[error(transparent)]
    Guard(#[from] GuardError),

    /// Registering on the channel failed.
    #[error(transparent)]
    Listen(#[from] ListenError),

    /// The worker task panicked or was aborted.
    #[error("Worker for channel '{channel}' panicked: {reason}")]
    Panicked { channel: String, reason: String },
}
