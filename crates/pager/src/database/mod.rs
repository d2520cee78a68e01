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

//! Channel name validation, plus the PostgreSQL connection pool, schema and
//! embedded migrations.
//!
//! The migrations create the `tasks`, `notifications` and `subscriptions`
//! tables together with the `AFTER INSERT` triggers that publish every new
//! row as JSON on its channel via `pg_notify`.

pub mod channel;
#[cfg(feature = "postgres")]
pub mod connection;
#[cfg(feature = "postgres")]
pub mod schema;

pub use channel::{validate_channel_name, ChannelNameError};
#[cfg(feature = "postgres")]
pub use connection::Database;

#[cfg(feature = "postgres")]
use diesel_migrations::{embed_migrations, EmbeddedMigrations};

/// Migrations for the dispatch tables and their insert triggers.
#[cfg(feature = "postgres")]
pub const POSTGRES_MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations/postgres");
