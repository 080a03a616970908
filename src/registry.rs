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

use crate::model::{GroupId, TabId, TopicId};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Runtime owner of every live regular tab.
///
/// Membership counts derived from here, not `Topic::tabs.len()`, are what the
/// sidebar shows as badges.
#[derive(Debug, Default, Clone)]
pub struct TopicRegistry {
    owners: HashMap<TabId, TopicId>,
    /// The single container all parked tabs are grouped into.
    hidden_group: Option<GroupId>,
}

impl TopicRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the registry with every live regular tab owned by `topic`.
    pub fn seed(&mut self, tab_ids: impl IntoIterator<Item = TabId>, topic: TopicId) {
        let mut seeded = 0usize;
        for tab_id in tab_ids {
            self.owners.insert(tab_id, topic);
            seeded += 1;
        }
        tracing::debug!(topic, seeded, "seeded tab registry");
    }

    pub fn assign(&mut self, tab_id: TabId, topic: TopicId) {
        self.owners.insert(tab_id, topic);
    }

    /// Assign only if the tab is not tracked yet. Returns the effective owner.
    pub fn adopt(&mut self, tab_id: TabId, topic: TopicId) -> TopicId {
        *self.owners.entry(tab_id).or_insert(topic)
    }

    pub fn unassign(&mut self, tab_id: TabId) -> Option<TopicId> {
        self.owners.remove(&tab_id)
    }

    #[must_use]
    pub fn topic_of(&self, tab_id: TabId) -> Option<TopicId> {
        self.owners.get(&tab_id).copied()
    }

    #[must_use]
    pub fn tabs_of(&self, topic: TopicId) -> BTreeSet<TabId> {
        self.owners.iter().filter(|(_, owner)| **owner == topic).map(|(tab, _)| *tab).collect()
    }

    #[must_use]
    pub fn tab_count(&self, topic: TopicId) -> usize {
        self.owners.values().filter(|owner| **owner == topic).count()
    }

    /// Badge counts for every topic that owns at least one tab.
    #[must_use]
    pub fn counts(&self) -> BTreeMap<TopicId, usize> {
        let mut counts = BTreeMap::new();
        for owner in self.owners.values() {
            *counts.entry(*owner).or_insert(0) += 1;
        }
        counts
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.owners.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }

    /// Drop entries whose tab no longer exists on the host.
    pub fn retain_live(&mut self, live: &BTreeSet<TabId>) -> usize {
        let before = self.owners.len();
        self.owners.retain(|tab, _| live.contains(tab));
        let pruned = before - self.owners.len();
        if pruned > 0 {
            tracing::debug!(pruned, "pruned stale registry entries");
        }
        pruned
    }

    /// Forget `topic` after it was deleted from the table: its entries are
    /// returned and every higher topic id shifts down by one.
    pub fn remove_topic(&mut self, topic: TopicId) -> Vec<TabId> {
        let orphaned: Vec<TabId> = self.tabs_of(topic).into_iter().collect();
        for tab in &orphaned {
            self.owners.remove(tab);
        }
        for owner in self.owners.values_mut() {
            if *owner > topic {
                *owner -= 1;
            }
        }
        orphaned
    }

    #[must_use]
    pub fn hidden_group(&self) -> Option<GroupId> {
        self.hidden_group
    }

    pub fn set_hidden_group(&mut self, group: GroupId) {
        self.hidden_group = Some(group);
    }

    /// Forget the hidden container if `group` is it. Returns whether it was.
    pub fn forget_group(&mut self, group: GroupId) -> bool {
        if self.hidden_group == Some(group) {
            self.hidden_group = None;
            true
        } else {
            false
        }
    }
}
