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

use super::empty_topic::{EmptyTopicOutcome, normalize_empty_topic};
use super::verify::{VerifyReport, verify_visibility};
use super::visibility::{StepOutcome, park_tabs, unpark_tabs};
use crate::active_tab;
use crate::batch::{BatchOutcome, create_batch};
use crate::context::TopicContext;
use crate::error::EngineError;
use crate::host::{HostError, HostTab, TabHost, TabUpdate, regular_tabs};
use crate::model::{TabId, TabRecord, TopicId};

/// Phases of one `switch_to_topic` call, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchPhase {
    Idle,
    SavingOld,
    Classifying,
    Hiding,
    Showing,
    Creating,
    Activating,
    Verifying,
}

#[derive(Debug, Default)]
pub struct SwitchReport {
    pub from: Option<TopicId>,
    pub to: TopicId,
    /// `true` when the target was already active and nothing happened.
    pub unchanged: bool,
    pub shown: Vec<TabId>,
    pub hidden: Vec<TabId>,
    pub hide_outcome: Option<StepOutcome>,
    pub show_outcome: Option<StepOutcome>,
    pub created: Option<BatchOutcome>,
    pub empty_topic: Option<EmptyTopicOutcome>,
    pub activated: Option<TabId>,
    pub verify: VerifyReport,
}

/// Live tabs sorted into what the target topic keeps and what gets parked.
#[derive(Debug, Default)]
struct SwitchPlan {
    show: Vec<HostTab>,
    hide: Vec<HostTab>,
    missing_urls: Vec<String>,
}

struct PhaseTracker {
    target: TopicId,
    phase: SwitchPhase,
}

impl PhaseTracker {
    fn enter(&mut self, next: SwitchPhase) {
        tracing::debug!(target_topic = self.target, from = ?self.phase, to = ?next, "switch phase");
        self.phase = next;
    }
}

/// Make `target` the single visible topic.
///
/// Only an out-of-range `target` is an error, and it is reported before any
/// host call. Every later step is best-effort: failures are logged and the
/// remaining independent steps still run.
pub async fn switch_to_topic<H: TabHost + ?Sized>(
    ctx: &mut TopicContext,
    host: &H,
    target: TopicId,
) -> Result<SwitchReport, EngineError> {
    ctx.check_topic(target)?;
    let old = ctx.current;
    if old == Some(target) {
        tracing::debug!(topic = target, "topic already active, nothing to switch");
        return Ok(SwitchReport { from: old, to: target, unchanged: true, ..SwitchReport::default() });
    }
    tracing::info!(from = ?old, to = target, "switching topic");

    let mut report = SwitchReport { from: old, to: target, ..SwitchReport::default() };
    let mut tracker = PhaseTracker { target, phase: SwitchPhase::Idle };

    tracker.enter(SwitchPhase::SavingOld);
    if let Some(old) = old
        && let Err(err) = save_outgoing(ctx, host, old).await
    {
        tracing::warn!(topic = old, "could not save outgoing topic: {err}");
    }

    tracker.enter(SwitchPhase::Classifying);
    let plan = match host.query_tabs().await {
        Ok(tabs) => classify(ctx, regular_tabs(tabs), old, target),
        Err(err) => {
            tracing::warn!("could not enumerate tabs, switching blind: {err}");
            SwitchPlan::default()
        }
    };
    report.shown = plan.show.iter().map(|t| t.id).collect();
    report.hidden = plan.hide.iter().map(|t| t.id).collect();

    tracker.enter(SwitchPhase::Hiding);
    let caps = ctx.capabilities;
    let title = ctx.config.hidden_group_title.clone();
    let hide_outcome = park_tabs(host, &mut ctx.registry, caps, &title, &plan.hide).await;
    report.hide_outcome = Some(hide_outcome);

    tracker.enter(SwitchPhase::Showing);
    report.show_outcome = Some(unpark_tabs(host, caps, &plan.show).await);

    ctx.current = Some(target);

    tracker.enter(SwitchPhase::Creating);
    let mut show_set = plan.show.clone();
    if !plan.missing_urls.is_empty() {
        let outcome =
            create_batch(host, &plan.missing_urls, ctx.config.batch_size, ctx.config.batch_delay()).await;
        tracing::info!(
            topic = target,
            created = outcome.created_count(),
            requested = outcome.requested,
            "restored missing tabs"
        );
        for tab in &outcome.created {
            ctx.registry.assign(tab.id, target);
            show_set.push(tab.clone());
        }
        report.created = Some(outcome);
    }

    tracker.enter(SwitchPhase::Activating);
    let target_is_empty = ctx.topic(target).is_none_or(|t| t.regular_urls().is_empty());
    if target_is_empty {
        let still_visible: &[HostTab] =
            if hide_outcome.took_effect() { &[] } else { plan.hide.as_slice() };
        report.empty_topic = Some(normalize_empty_topic(ctx, host, target, still_visible).await);
        report.activated = report.empty_topic.as_ref().and_then(|o| o.landing);
    } else if let Some(tab_id) = pick_focus(ctx, target, show_set) {
        match host.update_tab(tab_id, TabUpdate::activate()).await {
            Ok(_) => report.activated = Some(tab_id),
            Err(err) => tracing::warn!(tab = %tab_id, "could not activate tab: {err}"),
        }
    }

    tracker.enter(SwitchPhase::Verifying);
    report.verify = verify_visibility(ctx, host, target).await;

    tracker.enter(SwitchPhase::Idle);
    Ok(report)
}

/// Write the tabs currently in view into the outgoing topic's list.
async fn save_outgoing<H: TabHost + ?Sized>(
    ctx: &mut TopicContext,
    host: &H,
    old: TopicId,
) -> Result<(), HostError> {
    let tabs = host.query_tabs().await?;
    let hidden_group = ctx.registry.hidden_group();
    let visible: Vec<HostTab> = regular_tabs(tabs)
        .into_iter()
        .filter(|t| !t.is_parked(hidden_group))
        .filter(|t| ctx.registry.topic_of(t.id).is_none_or(|owner| owner == old))
        .collect();

    for tab in &visible {
        ctx.registry.assign(tab.id, old);
    }
    let Some(topic) = ctx.topic_mut(old) else {
        return Ok(());
    };
    topic.tabs = visible.iter().map(record_of).collect();
    if let Some(focused) = active_tab::focused_position(&visible) {
        topic.active_tab_index = Some(focused);
    }
    active_tab::clamp(topic);
    tracing::debug!(topic = old, tabs = topic.tabs.len(), "saved outgoing topic");
    Ok(())
}

fn classify(
    ctx: &mut TopicContext,
    tabs: Vec<HostTab>,
    old: Option<TopicId>,
    target: TopicId,
) -> SwitchPlan {
    let target_urls: Vec<String> = ctx
        .topic(target)
        .map(|t| t.regular_urls().into_iter().map(str::to_owned).collect())
        .unwrap_or_default();
    let adopter = old.unwrap_or_else(|| ctx.adoption_topic());

    let mut plan = SwitchPlan::default();
    let mut adopted = Vec::new();
    for tab in tabs {
        if target_urls.iter().any(|url| *url == tab.url) {
            ctx.registry.assign(tab.id, target);
            plan.show.push(tab);
            continue;
        }
        // Untracked tabs, and tabs that no longer match the target they
        // point at, stay with the topic being left.
        let owner = ctx.registry.topic_of(tab.id);
        if owner.is_none() || owner == Some(target) {
            ctx.registry.assign(tab.id, adopter);
            if adopter == target {
                // No topic is being left: the target takes them into view.
                adopted.push(record_of(&tab));
                plan.show.push(tab);
                continue;
            }
        }
        plan.hide.push(tab);
    }
    if !adopted.is_empty()
        && let Some(topic) = ctx.topic_mut(target)
    {
        tracing::debug!(topic = target, adopted = adopted.len(), "target adopted unlisted tabs");
        topic.tabs.extend(adopted);
    }

    plan.missing_urls = target_urls
        .iter()
        .filter(|url| !plan.show.iter().any(|t| t.url == **url))
        .cloned()
        .collect();

    tracing::debug!(
        show = plan.show.len(),
        hide = plan.hide.len(),
        missing = plan.missing_urls.len(),
        "classified live tabs"
    );
    plan
}

/// Order the show-set by list position and pick the remembered tab.
fn pick_focus(ctx: &TopicContext, target: TopicId, mut show_set: Vec<HostTab>) -> Option<TabId> {
    let topic = ctx.topic(target)?;
    let position_of =
        |tab: &HostTab| topic.tabs.iter().position(|r| r.url == tab.url).unwrap_or(usize::MAX);
    show_set.sort_by_key(position_of);

    let remembered_url = topic.active_tab_index.and_then(|i| topic.tabs.get(i)).map(|r| r.url.as_str());
    if let Some(url) = remembered_url
        && let Some(tab) = show_set.iter().find(|t| t.url == url)
    {
        return Some(tab.id);
    }
    let index = active_tab::restore_position(topic, show_set.len())?;
    show_set.get(index).map(|t| t.id)
}

pub(crate) fn record_of(tab: &HostTab) -> TabRecord {
    TabRecord {
        url: tab.url.clone(),
        title: if tab.title.is_empty() { "Untitled".to_owned() } else { tab.title.clone() },
        favicon_ref: tab.favicon_url.clone(),
    }
}
