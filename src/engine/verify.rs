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

use crate::context::TopicContext;
use crate::host::TabHost;
use crate::model::{TabId, TopicId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisibilityMismatch {
    pub tab_id: TabId,
    pub url: String,
    pub owner: Option<TopicId>,
    pub visible: bool,
}

/// Actual host state after a switch, classified independently of what the
/// switch intended.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerifyReport {
    pub visible: Vec<TabId>,
    pub hidden: Vec<TabId>,
    /// Tabs whose visibility disagrees with registry ownership.
    pub mismatches: Vec<VisibilityMismatch>,
}

/// Re-read the host and compare it against the registry. Never mutates.
pub async fn verify_visibility<H: TabHost + ?Sized>(
    ctx: &TopicContext,
    host: &H,
    target: TopicId,
) -> VerifyReport {
    let tabs = match host.query_tabs().await {
        Ok(tabs) => tabs,
        Err(err) => {
            tracing::warn!("verification skipped, could not enumerate tabs: {err}");
            return VerifyReport::default();
        }
    };

    let hidden_group = ctx.registry.hidden_group();
    let mut report = VerifyReport::default();
    for tab in tabs.iter().filter(|t| t.is_regular()) {
        let visible = !tab.is_parked(hidden_group);
        if visible {
            report.visible.push(tab.id);
        } else {
            report.hidden.push(tab.id);
        }
        let owner = ctx.registry.topic_of(tab.id);
        let should_be_visible = owner.is_none_or(|owner| owner == target);
        if visible != should_be_visible && ctx.capabilities.can_hide() {
            report.mismatches.push(VisibilityMismatch {
                tab_id: tab.id,
                url: tab.url.clone(),
                owner,
                visible,
            });
        }
    }

    tracing::info!(
        target_topic = target,
        visible = report.visible.len(),
        hidden = report.hidden.len(),
        "verified tab visibility"
    );
    for mismatch in &report.mismatches {
        tracing::warn!(
            tab = %mismatch.tab_id,
            url = %mismatch.url,
            owner = ?mismatch.owner,
            visible = mismatch.visible,
            "tab visibility disagrees with its owner"
        );
    }
    report
}
