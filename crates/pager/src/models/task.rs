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

//! Task Model
//!
//! A task is a unit of deferred work. Producers insert it with status
//! `pending`; the insert trigger publishes the full row on the task channel and
//! the task processor moves it to `processing` and then to a terminal status.
//!
//! The payload is opaque to the engine: it is stored, published and handed to
//! the unit of work without interpretation.

use super::Status;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Task type used when a producer does not supply one.
pub const DEFAULT_TASK_TYPE: &str = "default";

/// A task row, as stored and as published on the task channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Producer-assigned, time-ordered identifier
    pub id: String,
    /// Free-form type tag
    #[serde(rename = "type")]
    pub task_type: String,
    /// Opaque structured payload
    #[serde(default)]
    pub payload: serde_json::Value,
    pub status: Status,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}

/// Structure for creating new tasks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTask {
    #[serde(rename = "type", default = "default_task_type")]
    pub task_type: String,
    #[serde(default = "default_task_payload")]
    pub payload: serde_json::Value,
}

fn default_task_type() -> String {
    DEFAULT_TASK_TYPE.to_string()
}

fn default_task_payload() -> serde_json::Value {
    serde_json::json!({ "message": "New task created" })
}

impl Default for NewTask {
    fn default() -> Self {
        Self {
            task_type: default_task_type(),
            payload: default_task_payload(),
        }
    }
}

impl NewTask {
    pub fn new(task_type: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            task_type: task_type.into(),
            payload,
        }
    }

    /// Materialises the row a store should insert: fresh id, `pending`, both
    /// timestamps set to `now`.
    pub fn into_task(self, now: DateTime<Utc>) -> Task {
        Task {
            id: generate_task_id(),
            task_type: self.task_type,
            payload: self.payload,
            status: Status::Pending,
            created: now,
            updated: now,
        }
    }
}

/// Generates a collision-resistant, time-ordered task id (UUIDv7).
pub fn generate_task_id() -> String {
    uuid::Uuid::now_v7().to_string()
}
