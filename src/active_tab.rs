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

//! Per-topic memory of the focused tab, stored as a position in the topic's
//! persisted tab list.

use crate::host::HostTab;
use crate::model::Topic;

/// Remember `url` as the focused tab of `topic`. Returns `false` when the URL
/// is not in the topic's list; the previous index is kept in that case.
pub fn record_focus(topic: &mut Topic, url: &str) -> bool {
    match topic.tabs.iter().position(|t| t.url == url) {
        Some(index) => {
            topic.active_tab_index = Some(index);
            true
        }
        None => false,
    }
}

/// Position of the focused tab within a snapshot of visible tabs.
#[must_use]
pub fn focused_position(visible: &[HostTab]) -> Option<usize> {
    visible.iter().position(|t| t.active)
}

/// Index into a show-set of `len` tabs to focus when entering `topic`.
#[must_use]
pub fn restore_position(topic: &Topic, len: usize) -> Option<usize> {
    if len == 0 {
        return None;
    }
    Some(topic.active_tab_index.unwrap_or(0).min(len - 1))
}

/// Keep `active_tab_index` pointing inside the list after it shrank.
pub fn clamp(topic: &mut Topic) {
    topic.active_tab_index = match (topic.active_tab_index, topic.tabs.len()) {
        (_, 0) | (None, _) => None,
        (Some(index), len) => Some(index.min(len - 1)),
    };
}
