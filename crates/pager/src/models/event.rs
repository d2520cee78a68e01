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

use crate::error::DecodeError;
use serde::de::DeserializeOwned;

/// One broadcast payload received on a channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelEvent {
    pub channel: String,
    /// Raw payload exactly as published
    pub payload: String,
    /// Backend process id of the publisher (0 when unknown)
    pub process_id: i32,
}

impl ChannelEvent {
    pub fn new(channel: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            payload: payload.into(),
            process_id: 0,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.payload.as_bytes()
    }

    /// Decodes the payload as a row snapshot; `kind` names the row type in errors.
    pub fn decode<T: DeserializeOwned>(&self, kind: &'static str) -> Result<T, DecodeError> {
        serde_json::from_str(&self.payload).map_err(|source| DecodeError {
            channel: self.channel.clone(),
            kind,
            source,
        })
    }
}
