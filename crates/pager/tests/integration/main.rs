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

//! Integration tests for the dispatch engine.
//!
//! Most modules drive complete channel workers against the in-memory store,
//! event source and push transport. `postgres` needs a live database and is
//! ignored unless run with `--ignored` and `DATABASE_URL` set.

mod fixtures;
mod notifications;
mod pipeline;
#[cfg(feature = "postgres")]
mod postgres;
mod tasks;
