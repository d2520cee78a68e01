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

//! Channel name validation.

use thiserror::Error;

/// Maximum length for PostgreSQL identifiers (NAMEDATALEN - 1).
const MAX_CHANNEL_NAME_LENGTH: usize = 63;

/// Errors returned when a channel name is not a safe identifier.
///
/// Channel names are interpolated into `LISTEN` statements, which cannot take
/// bind parameters.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChannelNameError {
    #[error("Channel name length invalid: '{name}' (must be 1-{max} characters)")]
    InvalidLength { name: String, max: usize },

    #[error("Channel name must start with a letter or underscore: '{0}'")]
    InvalidStart(String),

    #[error(
        "Channel name contains invalid characters (only alphanumeric and underscore allowed): '{0}'"
    )]
    InvalidCharacters(String),
}

impl ChannelNameError {
    /// Short, static description used in [`crate::error::ListenError::InvalidChannel`].
    pub fn reason(&self) -> &'static str {
        match self {
            ChannelNameError::InvalidLength { .. } => "length must be 1-63 characters",
            ChannelNameError::InvalidStart(_) => "must start with a letter or underscore",
            ChannelNameError::InvalidCharacters(_) => {
                "only alphanumeric characters and underscores are allowed"
            }
        }
    }
}

/// Validates a channel name before it is used in `LISTEN`.
///
/// ```
/// use pager::database::validate_channel_name;
///
/// assert!(validate_channel_name("tasks_channel").is_ok());
/// assert!(validate_channel_name("1channel").is_err());
/// assert!(validate_channel_name("tasks; DROP TABLE tasks").is_err());
/// ```
pub fn validate_channel_name(name: &str) -> Result<&str, ChannelNameError> {
    if name.is_empty() || name.len() > MAX_CHANNEL_NAME_LENGTH {
        return Err(ChannelNameError::InvalidLength {
            name: name.to_string(),
            max: MAX_CHANNEL_NAME_LENGTH,
        });
    }

    let starts_ok = name
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    if !starts_ok {
        return Err(ChannelNameError::InvalidStart(name.to_string()));
    }

    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(ChannelNameError::InvalidCharacters(name.to_string()));
    }

    Ok(name)
}
