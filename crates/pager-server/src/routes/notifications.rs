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

use axum::body::Bytes;
use axum::extract::State;
use axum::Json;
use pager::models::{NewNotification, Notification};
use tracing::info;

use super::decode;
use crate::error::ApiError;
use crate::AppState;

/// `POST /notifications` with `{"body": "..."}`.
pub async fn create_notification(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<Notification>, ApiError> {
    let NewNotification { body } = decode(&body)?;
    let notification = state
        .store()
        .create_notification(body)
        .await
        .map_err(ApiError::store("store notification"))?;
    metrics::counter!("pager_api_rows_created_total", "table" => "notifications").increment(1);
    info!(notification_id = notification.id, "Notification created");
    Ok(Json(notification))
}

pub async fn list_notifications(
    State(state): State<AppState>,
) -> Result<Json<Vec<Notification>>, ApiError> {
    let notifications = state
        .store()
        .list_notifications()
        .await
        .map_err(ApiError::store("read notifications"))?;
    Ok(Json(notifications))
}
