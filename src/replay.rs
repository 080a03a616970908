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

//! Scripted scenarios against the in-process host.
//!
//! A scenario opens some tabs, then plays a list of steps: user actions on the
//! host, switches and topic lifecycle calls. Host notifications are applied
//! after every step, the same way a browser delivers them between callbacks.

use crate::config::EngineConfig;
use crate::engine::SwitchReport;
use crate::host::MemoryHost;
use crate::model::{TabId, Topic, TopicId};
use crate::service::TopicService;
use crate::storage::Persistence;
use anyhow::Context as _;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::rc::Rc;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scenario {
    /// URLs open before the engine starts.
    #[serde(default)]
    pub open: Vec<String>,
    #[serde(default)]
    pub steps: Vec<Step>,
}

/// Tabs are addressed by URL; the first live tab with that URL is used.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum Step {
    Switch { topic: TopicId },
    Open { url: String },
    Close { url: String },
    Navigate { url: String, to: String },
    Activate { url: String },
    CreateTopic {
        name: String,
        #[serde(default)]
        tabs: Vec<String>,
    },
    DeleteTopic { topic: TopicId },
    RemoveHiddenGroup,
}

impl Step {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Switch { .. } => "switch",
            Self::Open { .. } => "open",
            Self::Close { .. } => "close",
            Self::Navigate { .. } => "navigate",
            Self::Activate { .. } => "activate",
            Self::CreateTopic { .. } => "createTopic",
            Self::DeleteTopic { .. } => "deleteTopic",
            Self::RemoveHiddenGroup => "removeHiddenGroup",
        }
    }
}

impl Scenario {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read scenario {}", path.display()))?;
        serde_json::from_str(&raw).with_context(|| format!("failed to parse scenario {}", path.display()))
    }
}

/// Which optional primitives the simulated host exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostProfile {
    pub grouping: bool,
    pub visibility: bool,
}

impl Default for HostProfile {
    fn default() -> Self {
        Self { grouping: true, visibility: true }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SwitchSummary {
    pub from: Option<TopicId>,
    pub to: TopicId,
    pub unchanged: bool,
    pub shown: usize,
    pub hidden: usize,
    pub created: usize,
    pub failed: usize,
    pub activated: Option<TabId>,
    pub mismatches: usize,
}

impl From<&SwitchReport> for SwitchSummary {
    fn from(report: &SwitchReport) -> Self {
        Self {
            from: report.from,
            to: report.to,
            unchanged: report.unchanged,
            shown: report.shown.len(),
            hidden: report.hidden.len(),
            created: report.created.as_ref().map_or(0, |c| c.created_count()),
            failed: report.created.as_ref().map_or(0, |c| c.failed_urls.len()),
            activated: report.activated,
            mismatches: report.verify.mismatches.len(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepSummary {
    pub op: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub switch: Option<SwitchSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TabSummary {
    pub id: TabId,
    pub url: String,
    pub visible: bool,
    pub active: bool,
    pub owner: Option<TopicId>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplaySummary {
    pub steps: Vec<StepSummary>,
    pub tabs: Vec<TabSummary>,
    pub counts: Vec<usize>,
    pub current_topic_index: Option<TopicId>,
    pub topic_table: Vec<Topic>,
}

/// Play `scenario` and save the final topic table through `store`.
pub async fn run_scenario<S: Persistence>(
    scenario: &Scenario,
    store: S,
    config: EngineConfig,
    profile: HostProfile,
) -> anyhow::Result<ReplaySummary> {
    let (host, events) = MemoryHost::new();
    let host = match (profile.grouping, profile.visibility) {
        (true, true) => host,
        (false, true) => host.without_grouping(),
        (true, false) => host.without_visibility(),
        (false, false) => host.without_grouping().without_visibility(),
    };
    let host = Rc::new(host);
    for url in &scenario.open {
        host.user_open(url);
    }

    let mut service = TopicService::initialize(Rc::clone(&host), store, config, events).await?;
    let mut steps = Vec::with_capacity(scenario.steps.len());
    for step in &scenario.steps {
        tracing::debug!(op = step.name(), "replaying step");
        let summary = apply_step(&mut service, &host, step).await;
        service.process_pending_events().await;
        steps.push(summary);
    }

    service.flush().await.context("failed to save final topic state")?;
    Ok(summarize(&service, &host, steps))
}

async fn apply_step<S: Persistence>(
    service: &mut TopicService<MemoryHost, S>,
    host: &MemoryHost,
    step: &Step,
) -> StepSummary {
    let mut summary = StepSummary { op: step.name(), switch: None, error: None };
    let missing = |url: &str| Some(format!("no open tab at {url}"));

    match step {
        Step::Switch { topic } => match service.switch_to_topic(*topic).await {
            Ok(report) => summary.switch = Some(SwitchSummary::from(&report)),
            Err(err) => summary.error = Some(err.to_string()),
        },
        Step::Open { url } => {
            host.user_open(url);
        }
        Step::Close { url } => match host.tab_by_url(url) {
            Some(tab) => {
                host.user_close(tab.id);
            }
            None => summary.error = missing(url),
        },
        Step::Navigate { url, to } => match host.tab_by_url(url) {
            Some(tab) => {
                host.user_navigate(tab.id, to);
            }
            None => summary.error = missing(url),
        },
        Step::Activate { url } => match host.tab_by_url(url) {
            Some(tab) => {
                host.user_activate(tab.id);
            }
            None => summary.error = missing(url),
        },
        Step::CreateTopic { name, tabs } => {
            service.topic_created(Topic::new(name.clone()).with_tabs(tabs.iter().cloned()));
        }
        Step::DeleteTopic { topic } => match service.topic_deleted(*topic).await {
            Ok(report) => summary.switch = report.as_ref().map(SwitchSummary::from),
            Err(err) => summary.error = Some(err.to_string()),
        },
        Step::RemoveHiddenGroup => match service.context().registry.hidden_group() {
            Some(group) => {
                host.destroy_group(group);
            }
            None => summary.error = Some("no hidden container exists".to_owned()),
        },
    }

    if let Some(error) = &summary.error {
        tracing::warn!(op = summary.op, "step failed: {error}");
    }
    summary
}

fn summarize<S: Persistence>(
    service: &TopicService<MemoryHost, S>,
    host: &MemoryHost,
    steps: Vec<StepSummary>,
) -> ReplaySummary {
    let hidden_group = service.context().registry.hidden_group();
    let tabs = host
        .tabs()
        .into_iter()
        .map(|tab| TabSummary {
            id: tab.id,
            visible: !tab.is_parked(hidden_group),
            active: tab.active,
            owner: service.topic_of(tab.id),
            url: tab.url,
        })
        .collect();
    ReplaySummary {
        steps,
        tabs,
        counts: service.topic_counts(),
        current_topic_index: service.current_topic(),
        topic_table: service.topics().to_vec(),
    }
}
