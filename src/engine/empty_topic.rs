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

//! Entering a topic without any regular tab must still leave exactly one
//! regular tab in view, at the configured landing page.

use crate::context::TopicContext;
use crate::host::{HostTab, TabHost, TabUpdate};
use crate::model::{TabId, TabRecord, TopicId};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmptyTopicOutcome {
    /// The single tab left in view, if one could be produced.
    pub landing: Option<TabId>,
    pub repurposed: bool,
    pub closed: Vec<TabId>,
}

/// `still_visible` are the regular tabs the hide step could not take out of
/// view. One of them is navigated to the landing page and the rest are
/// closed; with none left, a fresh landing tab is opened.
pub async fn normalize_empty_topic<H: TabHost + ?Sized>(
    ctx: &mut TopicContext,
    host: &H,
    target: TopicId,
    still_visible: &[HostTab],
) -> EmptyTopicOutcome {
    let landing_url = ctx.config.default_landing_url.clone();
    let mut outcome = EmptyTopicOutcome::default();

    let focused = if still_visible.is_empty() {
        None
    } else {
        host.query_active_tab().await.ok().flatten().map(|t| t.id)
    };
    let keeper =
        still_visible.iter().find(|t| Some(t.id) == focused).or_else(|| still_visible.first());
    if let Some(keeper) = keeper {
        let update = TabUpdate { active: Some(true), ..TabUpdate::navigate(landing_url.clone()) };
        match host.update_tab(keeper.id, update).await {
            Ok(tab) => {
                outcome.landing = Some(tab.id);
                outcome.repurposed = true;
            }
            Err(err) => tracing::warn!(tab = %keeper.id, "could not repurpose tab: {err}"),
        }
    }

    if outcome.landing.is_none() {
        match host.create_tab(&landing_url, true).await {
            Ok(tab) => outcome.landing = Some(tab.id),
            Err(err) => tracing::warn!("could not open landing tab: {err}"),
        }
    }

    if let Some(landing) = outcome.landing {
        ctx.registry.assign(landing, target);
        let leftovers: Vec<TabId> =
            still_visible.iter().map(|t| t.id).filter(|id| *id != landing).collect();
        // Removal events for these must not rewrite any topic's saved list.
        for id in &leftovers {
            ctx.registry.unassign(*id);
        }
        if !leftovers.is_empty() {
            match host.remove_tabs(&leftovers).await {
                Ok(()) => outcome.closed = leftovers,
                Err(err) => tracing::warn!(count = leftovers.len(), "could not close leftover tabs: {err}"),
            }
        }
        if let Some(topic) = ctx.topic_mut(target) {
            topic.tabs = vec![TabRecord::new(landing_url)];
            topic.active_tab_index = Some(0);
        }
    }

    tracing::info!(
        topic = target,
        landing = ?outcome.landing,
        repurposed = outcome.repurposed,
        closed = outcome.closed.len(),
        "normalized empty topic"
    );
    outcome
}
