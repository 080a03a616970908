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

use crate::host::TabHost;

/// Which optional hiding primitives the host offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Capabilities {
    pub has_grouping: bool,
    pub has_visibility: bool,
}

impl Capabilities {
    /// Probe the host once. Capabilities are assumed stable for the process
    /// lifetime; a primitive that later rejects is handled per call.
    pub fn detect<H: TabHost + ?Sized>(host: &H) -> Self {
        let caps =
            Self { has_grouping: host.grouping().is_some(), has_visibility: host.visibility().is_some() };
        tracing::info!(
            has_grouping = caps.has_grouping,
            has_visibility = caps.has_visibility,
            "probed host capabilities"
        );
        if caps.is_degraded() {
            tracing::warn!(
                "neither tab grouping nor tab hiding is available; topics will not be visually separated"
            );
        }
        caps
    }

    /// No hiding primitive at all: tabs are created/closed but never hidden.
    #[must_use]
    pub fn is_degraded(self) -> bool {
        !self.has_grouping && !self.has_visibility
    }

    #[must_use]
    pub fn can_hide(self) -> bool {
        !self.is_degraded()
    }
}
