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

//! Event subscriber.
//!
//! An [`EventSubscriber`] owns one listener, registered once when the
//! subscriber is created, and turns it into a pull-based sequence of events:
//!
//! - `Some(Ok(event))` for every payload
//! - `Some(Err(e))` for a transient wait error; the sequence continues
//! - `Some(Err(e))` once for any other error, after which it ends
//! - `None` once cancellation fires, or after a terminal error
//!
//! The sequence is not restartable. A closed connection needs a new
//! subscriber, and so a new registration.

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::ListenError;
use crate::listener::{EventSource, Listener};
use crate::models::ChannelEvent;

pub struct EventSubscriber {
    listener: Box<dyn Listener>,
    cancel: CancellationToken,
    finished: bool,
}

impl std::fmt::Debug for EventSubscriber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventSubscriber")
            .field("channel", &self.listener.channel())
            .field("finished", &self.finished)
            .finish()
    }
}

impl EventSubscriber {
    /// Registers on `channel` and returns a subscriber that stops when
    /// `cancel` fires.
    pub async fn subscribe(
        source: &dyn EventSource,
        channel: &str,
        cancel: CancellationToken,
    ) -> Result<Self, ListenError> {
        let listener = source.listen(channel).await?;
        info!(channel, "Subscriber listening");
        Ok(Self::from_listener(listener, cancel))
    }

    pub fn from_listener(listener: Box<dyn Listener>, cancel: CancellationToken) -> Self {
        Self {
            listener,
            cancel,
            finished: false,
        }
    }

    pub fn channel(&self) -> &str {
        self.listener.channel()
    }

    /// Whether the sequence has ended.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Waits for the next event.
    pub async fn next(&mut self) -> Option<Result<ChannelEvent, ListenError>> {
        if self.finished {
            return None;
        }

        let result = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                debug!(channel = %self.listener.channel(), "Subscriber cancelled");
                self.finished = true;
                return None;
            }
            result = self.listener.wait_for_notification() => result,
        };

        if result.as_ref().is_err_and(|e| !e.is_transient()) {
            self.finished = true;
        }
        Some(result)
    }
}
