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

use crate::model::is_system_url;
use anyhow::Context as _;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_LANDING_URL: &str = "https://www.google.de";
pub const DEFAULT_BATCH_SIZE: usize = 3;
pub const DEFAULT_BATCH_DELAY_MS: u64 = 300;
pub const DEFAULT_TAB_SAVE_DEBOUNCE_MS: u64 = 500;
pub const DEFAULT_HIDDEN_GROUP_TITLE: &str = "Hidden Tabs";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    /// Page opened when a topic would otherwise leave the window empty.
    pub default_landing_url: String,
    pub batch_size: usize,
    pub batch_delay_ms: u64,
    pub tab_save_debounce_ms: u64,
    pub hidden_group_title: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_landing_url: DEFAULT_LANDING_URL.to_owned(),
            batch_size: DEFAULT_BATCH_SIZE,
            batch_delay_ms: DEFAULT_BATCH_DELAY_MS,
            tab_save_debounce_ms: DEFAULT_TAB_SAVE_DEBOUNCE_MS,
            hidden_group_title: DEFAULT_HIDDEN_GROUP_TITLE.to_owned(),
        }
    }
}

impl EngineConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config: Self = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.batch_size == 0 {
            anyhow::bail!("batchSize must be at least 1");
        }
        if self.default_landing_url.trim().is_empty() {
            anyhow::bail!("defaultLandingUrl must not be empty");
        }
        if is_system_url(&self.default_landing_url) {
            anyhow::bail!(
                "defaultLandingUrl `{}` is an internal page and would never count as an open tab",
                self.default_landing_url
            );
        }
        Ok(())
    }

    #[must_use]
    pub fn batch_delay(&self) -> Duration {
        Duration::from_millis(self.batch_delay_ms)
    }

    #[must_use]
    pub fn save_debounce(&self) -> Duration {
        Duration::from_millis(self.tab_save_debounce_ms)
    }
}
