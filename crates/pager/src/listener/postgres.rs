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

//! PostgreSQL LISTEN/NOTIFY event source.
//!
//! Each listener opens its own `tokio-postgres` connection. A driver task
//! polls the connection and forwards every asynchronous message over an
//! unbounded channel; the listener issues a single `LISTEN` on the client and
//! then reads notifications off that channel. When the connection fails or
//! the server closes it the driver exits, the channel closes and the listener
//! reports [`ListenError::Closed`].

use async_trait::async_trait;
use futures::StreamExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_postgres::{AsyncMessage, Client, NoTls};
use tracing::{debug, error, info, trace};

use super::{EventSource, Listener};
use crate::database::validate_channel_name;
use crate::error::ListenError;
use crate::models::ChannelEvent;

/// [`EventSource`] that opens a dedicated PostgreSQL connection per listener.
#[derive(Clone)]
pub struct PostgresEventSource {
    database_url: String,
}

impl std::fmt::Debug for PostgresEventSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresEventSource").finish_non_exhaustive()
    }
}

impl PostgresEventSource {
    /// `database_url` is used for every listen connection this source opens.
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
        }
    }
}

impl From<&crate::database::Database> for PostgresEventSource {
    fn from(database: &crate::database::Database) -> Self {
        Self::new(database.url())
    }
}

#[async_trait]
impl EventSource for PostgresEventSource {
    async fn listen(&self, channel: &str) -> Result<Box<dyn Listener>, ListenError> {
        let channel = validate_channel_name(channel).map_err(|e| ListenError::InvalidChannel {
            name: channel.to_string(),
            reason: e.reason(),
        })?;

        let (client, mut connection) = tokio_postgres::connect(&self.database_url, NoTls)
            .await
            .map_err(|e| ListenError::Connect(e.to_string()))?;

        let (tx, rx) = mpsc::unbounded_channel();
        let driver_channel = channel.to_string();
        let driver = tokio::spawn(async move {
            let stream = futures::stream::poll_fn(move |cx| connection.poll_message(cx));
            futures::pin_mut!(stream);

            while let Some(message) = stream.next().await {
                match message {
                    Ok(message) => {
                        if tx.send(message).is_err() {
                            // Listener dropped
                            break;
                        }
                    }
                    Err(e) => {
                        error!(channel = %driver_channel, error = %e, "PostgreSQL listen connection error");
                        break;
                    }
                }
            }
            debug!(channel = %driver_channel, "PostgreSQL listen connection driver exited");
        });

        // Quoted so the identifier keeps its case; validation rules out quotes.
        if let Err(e) = client.batch_execute(&format!("LISTEN \"{channel}\"")).await {
            driver.abort();
            return Err(ListenError::Connect(e.to_string()));
        }
        info!(channel, "PostgreSQL LISTEN registered");

        Ok(Box::new(PostgresListener {
            channel: channel.to_string(),
            _client: client,
            messages: rx,
            driver,
        }))
    }
}

struct PostgresListener {
    channel: String,
    /// Dropping the client closes the connection, so it lives as long as the listener.
    _client: Client,
    messages: mpsc::UnboundedReceiver<AsyncMessage>,
    driver: JoinHandle<()>,
}

#[async_trait]
impl Listener for PostgresListener {
    fn channel(&self) -> &str {
        &self.channel
    }

    async fn wait_for_notification(&mut self) -> Result<ChannelEvent, ListenError> {
        loop {
            match self.messages.recv().await {
                Some(AsyncMessage::Notification(notification)) => {
                    return Ok(ChannelEvent {
                        channel: notification.channel().to_string(),
                        payload: notification.payload().to_string(),
                        process_id: notification.process_id(),
                    });
                }
                Some(AsyncMessage::Notice(notice)) => {
                    trace!(channel = %self.channel, notice = %notice, "Ignoring server notice");
                }
                Some(_) => {}
                None => return Err(ListenError::Closed),
            }
        }
    }
}

impl Drop for PostgresListener {
    fn drop(&mut self) {
        self.driver.abort();
    }
}
