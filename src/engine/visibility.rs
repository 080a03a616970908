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

//! Hide/show fallback chains over the two optional host primitives.
//!
//! Hiding prefers grouping into the single hidden container, then explicit
//! hide. Showing prefers ungrouping, then explicit show. A primitive that
//! rejects is treated as absent for that call only.

use crate::capability::Capabilities;
use crate::host::{GroupUpdate, HostError, HostTab, TabGrouping, TabHost};
use crate::model::{GroupId, TabId};
use crate::registry::TopicRegistry;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Primitive {
    Grouping,
    Visibility,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// Nothing to do.
    Empty,
    Applied(Primitive),
    /// No hiding primitive on this host.
    Degraded,
    /// Every available primitive rejected; tabs stay as they were.
    Failed,
}

impl StepOutcome {
    #[must_use]
    pub fn took_effect(self) -> bool {
        matches!(self, Self::Applied(_))
    }
}

/// Park `tabs` out of sight.
pub async fn park_tabs<H: TabHost + ?Sized>(
    host: &H,
    registry: &mut TopicRegistry,
    caps: Capabilities,
    group_title: &str,
    tabs: &[HostTab],
) -> StepOutcome {
    if tabs.is_empty() {
        return StepOutcome::Empty;
    }
    let ids: Vec<TabId> = tabs.iter().map(|t| t.id).collect();

    if caps.has_grouping
        && let Some(grouping) = host.grouping()
    {
        match group_into_hidden(grouping, registry, group_title, &ids).await {
            Ok(group) => {
                tracing::debug!(count = ids.len(), %group, "parked tabs in hidden container");
                return StepOutcome::Applied(Primitive::Grouping);
            }
            Err(err) => tracing::warn!("grouping tabs failed, falling back to hide: {err}"),
        }
    }

    if caps.has_visibility
        && let Some(visibility) = host.visibility()
    {
        match visibility.hide_tabs(&ids).await {
            Ok(()) => {
                tracing::debug!(count = ids.len(), "hid tabs");
                return StepOutcome::Applied(Primitive::Visibility);
            }
            Err(err) => tracing::warn!("hiding tabs failed: {err}"),
        }
    }

    if caps.is_degraded() {
        tracing::warn!(count = ids.len(), "no hiding primitive, tabs of other topics stay visible");
        StepOutcome::Degraded
    } else {
        tracing::warn!(count = ids.len(), "hide step skipped, every primitive rejected");
        StepOutcome::Failed
    }
}

/// Bring parked `tabs` back. Grouped tabs are ungrouped; explicitly hidden
/// ones are shown. If ungrouping rejects, everything goes through show.
pub async fn unpark_tabs<H: TabHost + ?Sized>(
    host: &H,
    caps: Capabilities,
    tabs: &[HostTab],
) -> StepOutcome {
    let grouped: Vec<TabId> = tabs.iter().filter(|t| t.group_id.is_some()).map(|t| t.id).collect();
    let mut to_show: Vec<TabId> = tabs.iter().filter(|t| t.hidden).map(|t| t.id).collect();
    if grouped.is_empty() && to_show.is_empty() {
        return StepOutcome::Empty;
    }
    if caps.is_degraded() {
        return StepOutcome::Degraded;
    }

    let mut applied = None;
    if !grouped.is_empty() {
        match host.grouping().filter(|_| caps.has_grouping) {
            Some(grouping) => match grouping.ungroup_tabs(&grouped).await {
                Ok(()) => applied = Some(Primitive::Grouping),
                Err(err) => {
                    tracing::warn!("ungrouping tabs failed, falling back to show: {err}");
                    merge_unique(&mut to_show, &grouped);
                }
            },
            None => merge_unique(&mut to_show, &grouped),
        }
    }

    if !to_show.is_empty()
        && let Some(visibility) = host.visibility().filter(|_| caps.has_visibility)
    {
        match visibility.show_tabs(&to_show).await {
            Ok(()) => {
                if applied.is_none() {
                    applied = Some(Primitive::Visibility);
                }
            }
            Err(err) => tracing::warn!("showing tabs failed: {err}"),
        }
    }

    match applied {
        Some(primitive) => StepOutcome::Applied(primitive),
        None => {
            tracing::warn!(count = tabs.len(), "show step skipped, every primitive rejected");
            StepOutcome::Failed
        }
    }
}

async fn group_into_hidden(
    grouping: &dyn TabGrouping,
    registry: &mut TopicRegistry,
    title: &str,
    ids: &[TabId],
) -> Result<GroupId, HostError> {
    if let Some(group) = registry.hidden_group() {
        match grouping.group_tabs(ids, Some(group)).await {
            Ok(group) => {
                let collapse = GroupUpdate { title: None, collapsed: Some(true) };
                if let Err(err) = grouping.update_group(group, collapse).await {
                    tracing::debug!(%group, "could not collapse hidden container: {err}");
                }
                return Ok(group);
            }
            Err(HostError::NoSuchGroup(_)) => {
                tracing::info!(%group, "hidden container is gone, recreating it");
                registry.forget_group(group);
            }
            Err(err) => return Err(err),
        }
    }

    let group = grouping.group_tabs(ids, None).await?;
    registry.set_hidden_group(group);
    let label = GroupUpdate { title: Some(title.to_owned()), collapsed: Some(true) };
    if let Err(err) = grouping.update_group(group, label).await {
        tracing::debug!(%group, "created hidden container but could not label it: {err}");
    }
    tracing::debug!(%group, "created hidden container");
    Ok(group)
}

fn merge_unique(into: &mut Vec<TabId>, from: &[TabId]) {
    for id in from {
        if !into.contains(id) {
            into.push(*id);
        }
    }
}
