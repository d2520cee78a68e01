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
use pager::models::{NewTask, Task};
use tracing::info;

use super::decode;
use crate::error::ApiError;
use crate::AppState;

/// `POST /tasks`. The body is optional; missing fields take their defaults.
pub async fn create_task(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<Task>, ApiError> {
    let new_task = if body.iter().all(u8::is_ascii_whitespace) {
        NewTask::default()
    } else {
        decode::<NewTask>(&body)?
    };

    let task = state
        .store()
        .create_task(new_task)
        .await
        .map_err(ApiError::store("create task"))?;
    metrics::counter!("pager_api_rows_created_total", "table" => "tasks").increment(1);
    info!(task_id = %task.id, task_type = %task.task_type, "Task created");
    Ok(Json(task))
}

/// `GET /tasks`
pub async fn list_tasks(State(state): State<AppState>) -> Result<Json<Vec<Task>>, ApiError> {
    let tasks = state
        .store()
        .list_tasks()
        .await
        .map_err(ApiError::store("read tasks"))?;
    Ok(Json(tasks))
}
