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

use serde::{Deserialize, Serialize};
use std::fmt;

/// Ordinal position of a topic inside the topic table.
pub type TopicId = usize;

/// Host-assigned identifier of a live tab.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TabId(pub u64);

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Host-assigned identifier of a tab group (the hidden container).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupId(pub u64);

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

const SYSTEM_URL_PREFIXES: &[&str] = &["about:", "chrome:", "moz-extension:", "firefox:"];

/// Internal/host pages are never owned by a topic and never counted.
#[must_use]
pub fn is_system_url(url: &str) -> bool {
    let trimmed = url.trim();
    trimmed.is_empty() || SYSTEM_URL_PREFIXES.iter().any(|prefix| trimmed.starts_with(prefix))
}

#[must_use]
pub fn is_regular_url(url: &str) -> bool {
    !is_system_url(url)
}

/// Persisted description of one tab. Identity is the URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabRecord {
    pub url: String,
    #[serde(default = "untitled")]
    pub title: String,
    #[serde(default, alias = "favIconUrl", skip_serializing_if = "Option::is_none")]
    pub favicon_ref: Option<String>,
}

fn untitled() -> String {
    "Untitled".to_owned()
}

impl TabRecord {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into(), title: untitled(), favicon_ref: None }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Topic {
    pub name: String,
    #[serde(default)]
    pub tabs: Vec<TabRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_tab_index: Option<usize>,
    /// Category/bookmark tree owned by the sidebar; carried through untouched.
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub categories: serde_json::Value,
}

impl Topic {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tabs: Vec::new(),
            active_tab_index: None,
            categories: serde_json::Value::Null,
        }
    }

    #[must_use]
    pub fn with_tabs<I, S>(mut self, urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tabs = urls.into_iter().map(TabRecord::new).collect();
        self
    }

    /// URLs of the persisted tabs that denote regular pages, in list order.
    #[must_use]
    pub fn regular_urls(&self) -> Vec<&str> {
        self.tabs.iter().map(|t| t.url.as_str()).filter(|url| is_regular_url(url)).collect()
    }
}

pub type TopicTable = Vec<Topic>;

/// The single record kept in persistence.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedState {
    #[serde(default, alias = "topicsData")]
    pub topic_table: TopicTable,
    #[serde(default, deserialize_with = "de_current_index")]
    pub current_topic_index: Option<TopicId>,
}

// Legacy records store "no topic" as -1.
fn de_current_index<'de, D>(deserializer: D) -> Result<Option<TopicId>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = Option::<i64>::deserialize(deserializer)?;
    Ok(raw.and_then(|value| usize::try_from(value).ok()))
}

impl PersistedState {
    /// Drop a current index that no longer points into the table.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        if self.current_topic_index.is_some_and(|idx| idx >= self.topic_table.len()) {
            tracing::warn!(
                index = ?self.current_topic_index,
                topics = self.topic_table.len(),
                "persisted current topic out of range, ignoring"
            );
            self.current_topic_index = None;
        }
        self
    }
}
