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

//! PostgreSQL [`Store`] built on diesel and the `deadpool-diesel` pool.
//!
//! Every call borrows a pooled connection for the duration of one query; the
//! listen connection is separate (see [`crate::listener::postgres`]).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;

use super::Store;
use crate::database::schema::{notifications, subscriptions, tasks};
use crate::database::Database;
use crate::error::StoreError;
use crate::models::{NewTask, Notification, Status, Subscription, SubscriptionKeys, Task};

#[derive(Debug, Queryable, Selectable, Insertable)]
#[diesel(table_name = tasks)]
#[diesel(check_for_backend(diesel::pg::Pg))]
struct TaskRow {
    id: String,
    task_type: String,
    payload: serde_json::Value,
    status: String,
    created: DateTime<Utc>,
    updated: DateTime<Utc>,
}

#[derive(Debug, Queryable, Selectable)]
#[diesel(table_name = notifications)]
#[diesel(check_for_backend(diesel::pg::Pg))]
struct NotificationRow {
    id: i64,
    body: String,
    status: String,
    created: DateTime<Utc>,
    updated: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = notifications)]
struct NewNotificationRow {
    body: String,
    status: String,
}

#[derive(Debug, Queryable, Selectable)]
#[diesel(table_name = subscriptions)]
#[diesel(check_for_backend(diesel::pg::Pg))]
struct SubscriptionRow {
    endpoint: String,
    auth: String,
    p256dh: String,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = subscriptions)]
struct NewSubscriptionRow {
    endpoint: String,
    auth: String,
    p256dh: String,
}

fn parse_status(value: String) -> Result<Status, StoreError> {
    value
        .parse()
        .map_err(|_| StoreError::InvalidValue {
            field: "status",
            value,
        })
}

impl TryFrom<TaskRow> for Task {
    type Error = StoreError;

    fn try_from(row: TaskRow) -> Result<Self, Self::Error> {
        Ok(Task {
            id: row.id,
            task_type: row.task_type,
            payload: row.payload,
            status: parse_status(row.status)?,
            created: row.created,
            updated: row.updated,
        })
    }
}

impl From<Task> for TaskRow {
    fn from(task: Task) -> Self {
        TaskRow {
            id: task.id,
            task_type: task.task_type,
            payload: task.payload,
            status: task.status.as_str().to_string(),
            created: task.created,
            updated: task.updated,
        }
    }
}

impl TryFrom<NotificationRow> for Notification {
    type Error = StoreError;

    fn try_from(row: NotificationRow) -> Result<Self, Self::Error> {
        Ok(Notification {
            id: row.id,
            body: row.body,
            status: parse_status(row.status)?,
            created: row.created,
            updated: row.updated,
        })
    }
}

impl From<SubscriptionRow> for Subscription {
    fn from(row: SubscriptionRow) -> Self {
        Subscription {
            endpoint: row.endpoint,
            keys: SubscriptionKeys {
                auth: row.auth,
                p256dh: row.p256dh,
            },
        }
    }
}

/// Data access over the dispatch tables.
#[derive(Clone, Debug)]
pub struct PostgresStore {
    database: Database,
}

impl PostgresStore {
    pub fn new(database: Database) -> Self {
        Self { database }
    }

    pub fn database(&self) -> &Database {
        &self.database
    }

    async fn connection(&self) -> Result<deadpool_diesel::postgres::Object, StoreError> {
        self.database
            .pool()
            .get()
            .await
            .map_err(|e| StoreError::ConnectionPool(e.to_string()))
    }
}

#[async_trait]
impl Store for PostgresStore {
    async fn ping(&self) -> Result<(), StoreError> {
        let conn = self.connection().await?;
        conn.interact(|conn| diesel::sql_query("SELECT 1").execute(conn))
            .await
            .map_err(|e| StoreError::ConnectionPool(e.to_string()))??;
        Ok(())
    }

    async fn create_task(&self, new_task: NewTask) -> Result<Task, StoreError> {
        let conn = self.connection().await?;
        let row = TaskRow::from(new_task.into_task(Utc::now()));

        let inserted: TaskRow = conn
            .interact(move |conn| {
                diesel::insert_into(tasks::table)
                    .values(&row)
                    .returning(TaskRow::as_returning())
                    .get_result(conn)
            })
            .await
            .map_err(|e| StoreError::ConnectionPool(e.to_string()))??;

        inserted.try_into()
    }

    async fn list_tasks(&self) -> Result<Vec<Task>, StoreError> {
        let conn = self.connection().await?;
        let rows: Vec<TaskRow> = conn
            .interact(|conn| {
                tasks::table
                    .order(tasks::created.asc())
                    .select(TaskRow::as_select())
                    .load(conn)
            })
            .await
            .map_err(|e| StoreError::ConnectionPool(e.to_string()))??;

        rows.into_iter().map(Task::try_from).collect()
    }

    async fn set_task_status(&self, id: &str, status: Status) -> Result<bool, StoreError> {
        let conn = self.connection().await?;
        let id = id.to_string();

        let updated = conn
            .interact(move |conn| {
                diesel::update(tasks::table.filter(tasks::id.eq(id)))
                    .set((
                        tasks::status.eq(status.as_str()),
                        tasks::updated.eq(Utc::now()),
                    ))
                    .execute(conn)
            })
            .await
            .map_err(|e| StoreError::ConnectionPool(e.to_string()))??;

        Ok(updated > 0)
    }

    async fn claim_task(&self, id: &str) -> Result<bool, StoreError> {
        let conn = self.connection().await?;
        let id = id.to_string();

        let updated = conn
            .interact(move |conn| {
                diesel::update(
                    tasks::table
                        .filter(tasks::id.eq(id))
                        .filter(tasks::status.eq(Status::Pending.as_str())),
                )
                .set((
                    tasks::status.eq(Status::Processing.as_str()),
                    tasks::updated.eq(Utc::now()),
                ))
                .execute(conn)
            })
            .await
            .map_err(|e| StoreError::ConnectionPool(e.to_string()))??;

        Ok(updated > 0)
    }

    async fn create_notification(&self, body: String) -> Result<Notification, StoreError> {
        let conn = self.connection().await?;
        let row = NewNotificationRow {
            body,
            status: Status::Pending.as_str().to_string(),
        };

        let inserted: NotificationRow = conn
            .interact(move |conn| {
                diesel::insert_into(notifications::table)
                    .values(&row)
                    .returning(NotificationRow::as_returning())
                    .get_result(conn)
            })
            .await
            .map_err(|e| StoreError::ConnectionPool(e.to_string()))??;

        inserted.try_into()
    }

    async fn list_notifications(&self) -> Result<Vec<Notification>, StoreError> {
        let conn = self.connection().await?;
        let rows: Vec<NotificationRow> = conn
            .interact(|conn| {
                notifications::table
                    .order(notifications::id.asc())
                    .select(NotificationRow::as_select())
                    .load(conn)
            })
            .await
            .map_err(|e| StoreError::ConnectionPool(e.to_string()))??;

        rows.into_iter().map(Notification::try_from).collect()
    }

    async fn set_notification_status(
        &self,
        id: i64,
        status: Status,
    ) -> Result<bool, StoreError> {
        let conn = self.connection().await?;
        let updated = conn
            .interact(move |conn| {
                diesel::update(notifications::table.find(id))
                    .set((
                        notifications::status.eq(status.as_str()),
                        notifications::updated.eq(Utc::now()),
                    ))
                    .execute(conn)
            })
            .await
            .map_err(|e| StoreError::ConnectionPool(e.to_string()))??;

        Ok(updated > 0)
    }

    async fn claim_notification(&self, id: i64) -> Result<bool, StoreError> {
        let conn = self.connection().await?;
        let updated = conn
            .interact(move |conn| {
                diesel::update(
                    notifications::table
                        .find(id)
                        .filter(notifications::status.eq(Status::Pending.as_str())),
                )
                .set((
                    notifications::status.eq(Status::Processing.as_str()),
                    notifications::updated.eq(Utc::now()),
                ))
                .execute(conn)
            })
            .await
            .map_err(|e| StoreError::ConnectionPool(e.to_string()))??;

        Ok(updated > 0)
    }

    async fn create_subscription(
        &self,
        subscription: Subscription,
    ) -> Result<Subscription, StoreError> {
        let conn = self.connection().await?;
        let row = NewSubscriptionRow {
            endpoint: subscription.endpoint,
            auth: subscription.keys.auth,
            p256dh: subscription.keys.p256dh,
        };

        let inserted: SubscriptionRow = conn
            .interact(move |conn| {
                diesel::insert_into(subscriptions::table)
                    .values(&row)
                    .returning(SubscriptionRow::as_returning())
                    .get_result(conn)
            })
            .await
            .map_err(|e| StoreError::ConnectionPool(e.to_string()))??;

        Ok(inserted.into())
    }

    async fn list_subscriptions(&self) -> Result<Vec<Subscription>, StoreError> {
        let conn = self.connection().await?;
        let rows: Vec<SubscriptionRow> = conn
            .interact(|conn| {
                subscriptions::table
                    .order(subscriptions::id.asc())
                    .select(SubscriptionRow::as_select())
                    .load(conn)
            })
            .await
            .map_err(|e| StoreError::ConnectionPool(e.to_string()))??;

        Ok(rows.into_iter().map(Subscription::from).collect())
    }
}
