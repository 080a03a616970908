// Topic Tabs - Topic-scoped browser tab visibility engine
// Copyright (C) 2025  Simon Peter Rothgang
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as
// published by the Free Software Foundation, either version 3 of the
// License, or (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

use crate::model::TopicId;

/// Precondition violations surfaced to the caller. Host-call failures never
/// end up here; they are logged and recovered where they happen.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    #[error("topic index {index} is out of range ({count} topics)")]
    InvalidTopic { index: TopicId, count: usize },
    #[error("the last remaining topic cannot be deleted")]
    LastTopic,
    #[error("failed to persist topic state: {0}")]
    Persistence(String),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AppError {
    #[error("Invalid configuration")]
    ConfigInvalid,
    #[error("Invalid replay script")]
    ScriptInvalid,
    #[error("Persisted state unreadable")]
    StateUnreadable,
}

impl AppError {
    pub const CONFIG_INVALID_EXIT_CODE: i32 = 20;
    pub const SCRIPT_INVALID_EXIT_CODE: i32 = 21;
    pub const STATE_UNREADABLE_EXIT_CODE: i32 = 22;

    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConfigInvalid => Self::CONFIG_INVALID_EXIT_CODE,
            Self::ScriptInvalid => Self::SCRIPT_INVALID_EXIT_CODE,
            Self::StateUnreadable => Self::STATE_UNREADABLE_EXIT_CODE,
        }
    }

    #[must_use]
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::ConfigInvalid => {
                "The engine configuration could not be loaded. Check the file passed to --config."
            }
            Self::ScriptInvalid => "The replay script is not a valid scenario document.",
            Self::StateUnreadable => {
                "The persisted topic state could not be read. Move it aside or pass another --state path."
            }
        }
    }
}
