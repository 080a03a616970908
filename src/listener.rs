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

//! Reconciliation listener.
//!
//! Host lifecycle notifications are dispatched to one pure transition per
//! event kind. A transition only touches the registry and returns the
//! follow-ups that need the host; `run_followups` executes those. Topic lists
//! are always re-derived from registry membership, never patched entry by
//! entry, so a burst of events converges on registry truth.

use crate::active_tab;
use crate::context::TopicContext;
use crate::engine::record_of;
use crate::host::{HostEvent, HostTab, TabHost};
use crate::model::{GroupId, TabId, TopicId, is_regular_url};
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Followup {
    /// Open a landing tab if no regular tab is left in view.
    EnsureWindowNotEmpty,
    /// Rebuild a topic's persisted list from the registry.
    Resync(TopicId),
    /// Remember the focused tab of a topic.
    RecordFocus { topic: TopicId, tab_id: TabId },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transition {
    pub followups: Vec<Followup>,
}

impl Transition {
    fn none() -> Self {
        Self::default()
    }

    fn with(followups: Vec<Followup>) -> Self {
        Self { followups }
    }
}

/// Dispatch one host event to its transition.
pub fn transition(ctx: &mut TopicContext, event: &HostEvent) -> Transition {
    if ctx.topics.is_empty() {
        return Transition::none();
    }
    match event {
        HostEvent::Created(tab) => on_created(ctx, tab),
        HostEvent::Removed { tab_id } => on_removed(ctx, *tab_id),
        HostEvent::Updated { tab_id, url } => on_updated(ctx, *tab_id, url.as_deref()),
        HostEvent::Activated { tab_id } => on_activated(ctx, *tab_id),
        HostEvent::GroupRemoved { group_id } => on_group_removed(ctx, *group_id),
    }
}

fn on_created(ctx: &mut TopicContext, tab: &HostTab) -> Transition {
    if !tab.is_regular() {
        return Transition::none();
    }
    // A tab the switch engine opened is already attributed.
    let owner = ctx.registry.adopt(tab.id, ctx.adoption_topic());
    tracing::debug!(tab = %tab.id, url = %tab.url, topic = owner, "tab created");
    Transition::with(vec![Followup::Resync(owner)])
}

fn on_removed(ctx: &mut TopicContext, tab_id: TabId) -> Transition {
    let owner = ctx.registry.unassign(tab_id);
    tracing::debug!(tab = %tab_id, owner = ?owner, "tab removed");
    let mut followups = vec![Followup::EnsureWindowNotEmpty];
    followups.extend(owner.map(Followup::Resync));
    Transition::with(followups)
}

fn on_updated(ctx: &mut TopicContext, tab_id: TabId, url: Option<&str>) -> Transition {
    let Some(url) = url else {
        return Transition::none();
    };
    let previous = ctx.registry.topic_of(tab_id);

    if !is_regular_url(url) {
        ctx.registry.unassign(tab_id);
        return Transition::with(previous.map(Followup::Resync).into_iter().collect());
    }

    let active = ctx.adoption_topic();
    ctx.registry.assign(tab_id, active);
    tracing::debug!(tab = %tab_id, %url, topic = active, previous = ?previous, "tab navigated");
    let mut followups = vec![Followup::Resync(active)];
    if let Some(previous) = previous.filter(|p| *p != active) {
        followups.push(Followup::Resync(previous));
    }
    Transition::with(followups)
}

fn on_activated(ctx: &mut TopicContext, tab_id: TabId) -> Transition {
    match ctx.current {
        Some(topic) => Transition::with(vec![Followup::RecordFocus { topic, tab_id }]),
        None => Transition::none(),
    }
}

fn on_group_removed(ctx: &mut TopicContext, group_id: GroupId) -> Transition {
    if ctx.registry.forget_group(group_id) {
        tracing::info!(group = %group_id, "hidden container removed, recreating on next use");
    }
    Transition::none()
}

/// Execute follow-ups against the host. Returns whether persisted topic data
/// changed and should be saved.
pub async fn run_followups<H: TabHost + ?Sized>(
    ctx: &mut TopicContext,
    host: &H,
    followups: Vec<Followup>,
) -> bool {
    let mut dirty = false;
    for followup in followups {
        dirty |= match followup {
            Followup::EnsureWindowNotEmpty => ensure_window_not_empty(ctx, host).await,
            Followup::Resync(topic) => resync_topic(ctx, host, topic).await,
            Followup::RecordFocus { topic, tab_id } => record_focus(ctx, host, topic, tab_id).await,
        };
    }
    dirty
}

/// Apply one event end to end.
pub async fn handle_event<H: TabHost + ?Sized>(
    ctx: &mut TopicContext,
    host: &H,
    event: &HostEvent,
) -> bool {
    let transition = transition(ctx, event);
    run_followups(ctx, host, transition.followups).await
}

async fn ensure_window_not_empty<H: TabHost + ?Sized>(ctx: &mut TopicContext, host: &H) -> bool {
    match host.query_tabs().await {
        Ok(tabs) => {
            let hidden_group = ctx.registry.hidden_group();
            if tabs.iter().any(|t| t.is_regular() && !t.is_parked(hidden_group)) {
                return false;
            }
        }
        Err(err) => tracing::warn!("could not enumerate tabs after removal, opening a replacement: {err}"),
    }

    let url = ctx.config.default_landing_url.clone();
    match host.create_tab(&url, true).await {
        Ok(tab) => {
            let topic = ctx.adoption_topic();
            ctx.registry.assign(tab.id, topic);
            tracing::info!(tab = %tab.id, topic, "last tab closed, opened replacement");
            resync_topic(ctx, host, topic).await
        }
        Err(err) => {
            tracing::error!("could not open replacement tab: {err}");
            false
        }
    }
}

/// Rebuild `topic`'s persisted list from the live tabs the registry assigns it.
pub async fn resync_topic<H: TabHost + ?Sized>(
    ctx: &mut TopicContext,
    host: &H,
    topic: TopicId,
) -> bool {
    let tabs = match host.query_tabs().await {
        Ok(tabs) => tabs,
        Err(err) => {
            tracing::warn!(topic, "resync skipped, could not enumerate tabs: {err}");
            return false;
        }
    };
    let live: BTreeSet<TabId> = tabs.iter().map(|t| t.id).collect();
    ctx.registry.retain_live(&live);

    let records: Vec<_> = tabs
        .iter()
        .filter(|t| t.is_regular() && ctx.registry.topic_of(t.id) == Some(topic))
        .map(record_of)
        .collect();
    let Some(entry) = ctx.topic_mut(topic) else {
        return false;
    };
    if entry.tabs == records {
        return false;
    }
    entry.tabs = records;
    active_tab::clamp(entry);
    tracing::debug!(topic, tabs = entry.tabs.len(), "resynced topic from registry");
    true
}

async fn record_focus<H: TabHost + ?Sized>(
    ctx: &mut TopicContext,
    host: &H,
    topic: TopicId,
    tab_id: TabId,
) -> bool {
    let tab = match host.query_tabs().await {
        Ok(tabs) => tabs.into_iter().find(|t| t.id == tab_id),
        Err(err) => {
            tracing::warn!(tab = %tab_id, "could not look up focused tab: {err}");
            return false;
        }
    };
    let (Some(tab), Some(entry)) = (tab, ctx.topics.get_mut(topic)) else {
        return false;
    };
    let before = entry.active_tab_index;
    active_tab::record_focus(entry, &tab.url) && entry.active_tab_index != before
}
