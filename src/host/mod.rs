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

pub mod memory;

use crate::model::{GroupId, TabId, is_regular_url};

pub use memory::{HostCall, MemoryHost};

/// A live tab as reported by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostTab {
    pub id: TabId,
    pub url: String,
    pub title: String,
    pub favicon_url: Option<String>,
    pub active: bool,
    /// Hidden through the visibility primitive.
    pub hidden: bool,
    pub group_id: Option<GroupId>,
}

impl HostTab {
    #[must_use]
    pub fn is_regular(&self) -> bool {
        is_regular_url(&self.url)
    }

    /// Whether the tab is parked, either explicitly hidden or inside `hidden_group`.
    #[must_use]
    pub fn is_parked(&self, hidden_group: Option<GroupId>) -> bool {
        self.hidden || (self.group_id.is_some() && self.group_id == hidden_group)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TabUpdate {
    pub url: Option<String>,
    pub active: Option<bool>,
}

impl TabUpdate {
    #[must_use]
    pub fn navigate(url: impl Into<String>) -> Self {
        Self { url: Some(url.into()), active: None }
    }

    #[must_use]
    pub fn activate() -> Self {
        Self { url: None, active: Some(true) }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupUpdate {
    pub title: Option<String>,
    pub collapsed: Option<bool>,
}

/// Lifecycle notifications delivered by the host, in host order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostEvent {
    Created(HostTab),
    Removed { tab_id: TabId },
    Updated { tab_id: TabId, url: Option<String> },
    Activated { tab_id: TabId },
    GroupRemoved { group_id: GroupId },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HostError {
    #[error("host rejected {call}: {message}")]
    Rejected { call: &'static str, message: String },
    #[error("no tab with id {0}")]
    NoSuchTab(TabId),
    #[error("no tab group with id {0}")]
    NoSuchGroup(GroupId),
}

/// Required tab/window surface of the host.
#[async_trait::async_trait(?Send)]
pub trait TabHost {
    async fn query_tabs(&self) -> Result<Vec<HostTab>, HostError>;

    async fn query_active_tab(&self) -> Result<Option<HostTab>, HostError>;

    async fn create_tab(&self, url: &str, active: bool) -> Result<HostTab, HostError>;

    async fn update_tab(&self, tab_id: TabId, update: TabUpdate) -> Result<HostTab, HostError>;

    async fn remove_tabs(&self, tab_ids: &[TabId]) -> Result<(), HostError>;

    /// The optional grouping primitive, if this host exposes one.
    fn grouping(&self) -> Option<&dyn TabGrouping> {
        None
    }

    /// The optional hide/show primitive, if this host exposes one.
    fn visibility(&self) -> Option<&dyn TabVisibility> {
        None
    }
}

#[async_trait::async_trait(?Send)]
pub trait TabGrouping {
    /// Move `tab_ids` into `group`, or into a fresh group when `group` is `None`.
    async fn group_tabs(
        &self,
        tab_ids: &[TabId],
        group: Option<GroupId>,
    ) -> Result<GroupId, HostError>;

    async fn ungroup_tabs(&self, tab_ids: &[TabId]) -> Result<(), HostError>;

    async fn update_group(&self, group: GroupId, update: GroupUpdate) -> Result<(), HostError>;
}

#[async_trait::async_trait(?Send)]
pub trait TabVisibility {
    async fn hide_tabs(&self, tab_ids: &[TabId]) -> Result<(), HostError>;

    async fn show_tabs(&self, tab_ids: &[TabId]) -> Result<(), HostError>;
}

/// Regular tabs only, host order preserved.
#[must_use]
pub fn regular_tabs(tabs: Vec<HostTab>) -> Vec<HostTab> {
    tabs.into_iter().filter(HostTab::is_regular).collect()
}
