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

//! Domain models.
//!
//! These are API-level types; backend-specific row structs live next to the
//! store implementations.

pub mod event;
pub mod notification;
pub mod status;
pub mod subscription;
pub mod task;

pub use event::ChannelEvent;
pub use notification::{NewNotification, Notification};
pub use status::{Status, UnknownStatus};
pub use subscription::{Subscription, SubscriptionKeys};
pub use task::{generate_task_id, NewTask, Task, DEFAULT_TASK_TYPE};
