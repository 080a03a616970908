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

use crate::capability::Capabilities;
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::model::{PersistedState, Topic, TopicId, TopicTable};
use crate::registry::TopicRegistry;

/// All mutable runtime state of the engine, owned in one place and handed to
/// every operation. Lives as long as the extension's background context and is
/// rebuilt from persistence at startup.
#[derive(Debug)]
pub struct TopicContext {
    pub topics: TopicTable,
    /// `None` while the table is empty, or while a deleted active topic has
    /// not been replaced yet.
    pub current: Option<TopicId>,
    pub registry: TopicRegistry,
    pub capabilities: Capabilities,
    pub config: EngineConfig,
    listener_installed: bool,
}

impl TopicContext {
    #[must_use]
    pub fn new(state: PersistedState, capabilities: Capabilities, config: EngineConfig) -> Self {
        let state = state.normalized();
        Self {
            topics: state.topic_table,
            current: state.current_topic_index,
            registry: TopicRegistry::new(),
            capabilities,
            config,
            listener_installed: false,
        }
    }

    #[must_use]
    pub fn persisted(&self) -> PersistedState {
        PersistedState { topic_table: self.topics.clone(), current_topic_index: self.current }
    }

    pub fn check_topic(&self, index: TopicId) -> Result<(), EngineError> {
        if index < self.topics.len() {
            Ok(())
        } else {
            Err(EngineError::InvalidTopic { index, count: self.topics.len() })
        }
    }

    #[must_use]
    pub fn topic(&self, index: TopicId) -> Option<&Topic> {
        self.topics.get(index)
    }

    pub fn topic_mut(&mut self, index: TopicId) -> Option<&mut Topic> {
        self.topics.get_mut(index)
    }

    #[must_use]
    pub fn current_topic(&self) -> Option<&Topic> {
        self.current.and_then(|index| self.topics.get(index))
    }

    /// Topic that owns untracked tabs: the active one, or topic 0 before any
    /// switch happened.
    #[must_use]
    pub fn adoption_topic(&self) -> TopicId {
        self.current.unwrap_or(0)
    }

    /// Flip the installed flag. Returns `false` if it was already set.
    pub fn mark_listener_installed(&mut self) -> bool {
        !std::mem::replace(&mut self.listener_installed, true)
    }

    #[must_use]
    pub fn listener_installed(&self) -> bool {
        self.listener_installed
    }
}
