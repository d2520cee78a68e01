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

// Mirrors migrations/postgres. The `type` column is exposed as `task_type`.

diesel::table! {
    tasks (id) {
        id -> Text,
        #[sql_name = "type"]
        task_type -> Text,
        payload -> Jsonb,
        status -> Text,
        created -> Timestamptz,
        updated -> Timestamptz,
    }
}

diesel::table! {
    notifications (id) {
        id -> Int8,
        body -> Text,
        status -> Text,
        created -> Timestamptz,
        updated -> Timestamptz,
    }
}

diesel::table! {
    subscriptions (id) {
        id -> Int8,
        endpoint -> Text,
        auth -> Text,
        p256dh -> Text,
        created -> Timestamptz,
        updated -> Timestamptz,
    }
}

diesel::allow_tables_to_appear_in_same_query!(tasks, notifications, subscriptions);
