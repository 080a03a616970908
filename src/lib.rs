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

pub mod active_tab;
pub mod batch;
pub mod capability;
pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod host;
pub mod listener;
pub mod model;
pub mod registry;
pub mod replay;
pub mod service;
pub mod storage;

use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "topic-tabs", about = "Replay topic switching scenarios against a simulated browser")]
pub struct Cli {
    /// Scenario file to replay (JSON)
    #[arg(long, short)]
    pub script: PathBuf,

    /// Persisted topic state (defaults to the platform data directory)
    #[arg(long)]
    pub state: Option<PathBuf>,

    /// Engine configuration file (JSON, camelCase keys)
    #[arg(long, short)]
    pub config: Option<PathBuf>,

    /// Override the landing page opened for empty topics
    #[arg(long)]
    pub landing_url: Option<String>,

    /// Override how many tabs are created concurrently
    #[arg(long)]
    pub batch_size: Option<usize>,

    /// Simulate a browser without tab groups
    #[arg(long)]
    pub no_grouping: bool,

    /// Simulate a browser without tab hiding
    #[arg(long)]
    pub no_visibility: bool,

    /// Write tracing diagnostics to this file (enables logging when set)
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Tracing filter directives (example: `info,topic_tabs::engine=debug`)
    /// Falls back to `RUST_LOG` when omitted.
    #[arg(long, value_name = "FILTER")]
    pub log_filter: Option<String>,

    /// Append to `--log-file` instead of truncating on startup
    #[arg(long)]
    pub log_append: bool,
}

impl Cli {
    /// Which optional primitives the simulated host exposes.
    #[must_use]
    pub fn host_profile(&self) -> replay::HostProfile {
        replay::HostProfile { grouping: !self.no_grouping, visibility: !self.no_visibility }
    }
}
