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

//! In-process event source backed by `tokio::sync::broadcast`.
//!
//! Semantics follow PostgreSQL NOTIFY: every listener registered on a channel
//! receives every payload published after it registered, and payloads
//! published with no listener are dropped.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::{broadcast, Notify};
use tracing::debug;

use super::{EventSource, Listener};
use crate::database::validate_channel_name;
use crate::error::ListenError;
use crate::models::ChannelEvent;

const CHANNEL_CAPACITY: usize = 1024;

#[derive(Debug, Clone)]
enum Message {
    Event(ChannelEvent),
    WaitError(String),
}

#[derive(Default)]
struct Inner {
    channels: Mutex<HashMap<String, broadcast::Sender<Message>>>,
    registered: Notify,
    listen_calls: AtomicUsize,
}

/// Broadcast-based [`EventSource`].
///
/// Clones share the same channels.
#[derive(Clone, Default)]
pub struct MemoryEventSource {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for MemoryEventSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryEventSource")
            .field("listen_calls", &self.listen_calls())
            .finish_non_exhaustive()
    }
}

impl MemoryEventSource {
    pub fn new() -> Self {
        Self::default()
    }

    fn channels(&self) -> MutexGuard<'_, HashMap<String, broadcast::Sender<Message>>> {
        // A poisoned map is still structurally valid.
        self.inner
            .channels
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn send(&self, channel: &str, message: Message) -> usize {
        let channels = self.channels();
        match channels.get(channel) {
            Some(sender) => sender.send(message).unwrap_or(0),
            None => 0,
        }
    }

    /// Publishes `payload` on `channel`; returns how many listeners received it.
    pub fn publish(&self, channel: &str, payload: impl Into<String>) -> usize {
        let event = ChannelEvent::new(channel, payload);
        let delivered = self.send(channel, Message::Event(event));
        debug!(channel, delivered, "Published in-memory notification");
        delivered
    }

    /// Makes the next wait of every current listener on `channel` fail with
    /// [`ListenError::Wait`].
    pub fn inject_wait_error(&self, channel: &str, reason: impl Into<String>) -> usize {
        self.send(channel, Message::WaitError(reason.into()))
    }

    /// Drops the channel, so current listeners see [`ListenError::Closed`]
    /// once they have drained what was already published.
    pub fn close_channel(&self, channel: &str) {
        self.channels().remove(channel);
    }

    /// Number of listeners currently registered on `channel`.
    pub fn listener_count(&self, channel: &str) -> usize {
        self.channels()
            .get(channel)
            .map(|sender| sender.receiver_count())
            .unwrap_or(0)
    }

    /// Total number of successful `listen` calls across all channels.
    pub fn listen_calls(&self) -> usize {
        self.inner.listen_calls.load(Ordering::SeqCst)
    }

    /// Resolves once at least `count` listeners are registered on `channel`.
    pub async fn wait_for_listeners(&self, channel: &str, count: usize) {
        loop {
            let registered = self.inner.registered.notified();
            if self.listener_count(channel) >= count {
                return;
            }
            registered.await;
        }
    }
}

#[async_trait]
impl EventSource for MemoryEventSource {
    async fn listen(&self, channel: &str) -> Result<Box<dyn Listener>, ListenError> {
        validate_channel_name(channel).map_err(|e| ListenError::InvalidChannel {
            name: channel.to_string(),
            reason: e.reason(),
        })?;

        let receiver = {
            let mut channels = self.channels();
            channels
                .entry(channel.to_string())
                .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
                .subscribe()
        };
        self.inner.listen_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.registered.notify_waiters();
        debug!(channel, "In-memory listener registered");

        Ok(Box::new(MemoryListener {
            channel: channel.to_string(),
            receiver,
        }))
    }
}

struct MemoryListener {
    channel: String,
    receiver: broadcast::Receiver<Message>,
}

#[async_trait]
impl Listener for MemoryListener {
    fn channel(&self) -> &str {
        &self.channel
    }

    async fn wait_for_notification(&mut self) -> Result<ChannelEvent, ListenError> {
        match self.receiver.recv().await {
            Ok(Message::Event(event)) => Ok(event),
            Ok(Message::WaitError(reason)) => Err(ListenError::Wait(reason)),
            Err(broadcast::error::RecvError::Lagged(skipped)) => Err(ListenError::Wait(format!(
                "listener lagged, {skipped} notifications dropped"
            ))),
            Err(broadcast::error::RecvError::Closed) => Err(ListenError::Closed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn every_listener_receives_every_payload() {
        let source = MemoryEventSource::new();
        let mut a = source.listen("tasks_channel").await.unwrap();
        let mut b = source.listen("tasks_channel").await.unwrap();

        assert_eq!(source.publish("tasks_channel", "{}"), 2);

        assert_eq!(a.wait_for_notification().await.unwrap().payload, "{}");
        assert_eq!(b.wait_for_notification().await.unwrap().payload, "{}");
        assert_eq!(source.listen_calls(), 2);
    }

    #[tokio::test]
    async fn payloads_without_listeners_are_dropped() {
        let source = MemoryEventSource::new();
        assert_eq!(source.publish("tasks_channel", "lost"), 0);

        let mut listener = source.listen("tasks_channel").await.unwrap();
        source.publish("tasks_channel", "kept");
        assert_eq!(listener.wait_for_notification().await.unwrap().payload, "kept");
    }

    #[tokio::test]
    async fn channels_are_isolated() {
        let source = MemoryEventSource::new();
        let mut tasks = source.listen("tasks_channel").await.unwrap();
        let _notifications = source.listen("notifications_channel").await.unwrap();

        source.publish("notifications_channel", "n");
        source.publish("tasks_channel", "t");

        let event = tasks.wait_for_notification().await.unwrap();
        assert_eq!(event.channel, "tasks_channel");
        assert_eq!(event.payload, "t");
    }

    #[tokio::test]
    async fn injected_errors_are_transient() {
        let source = MemoryEventSource::new();
        let mut listener = source.listen("tasks_channel").await.unwrap();

        source.inject_wait_error("tasks_channel", "socket hiccup");
        source.publish("tasks_channel", "after");

        let err = listener.wait_for_notification().await.unwrap_err();
        assert!(err.is_transient());
        assert_eq!(listener.wait_for_notification().await.unwrap().payload, "after");
    }

    #[tokio::test]
    async fn closing_a_channel_ends_its_listeners() {
        let source = MemoryEventSource::new();
        let mut listener = source.listen("tasks_channel").await.unwrap();
        source.close_channel("tasks_channel");
        assert!(matches!(
            listener.wait_for_notification().await,
            Err(ListenError::Closed)
        ));
    }

    #[tokio::test]
    async fn rejects_invalid_channel_names() {
        let source = MemoryEventSource::new();
        let err = source.listen("bad channel").await.err().unwrap();
        assert!(matches!(err, ListenError::InvalidChannel { .. }));
        assert_eq!(source.listen_calls(), 0);
    }
}
