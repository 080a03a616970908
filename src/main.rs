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

use clap::Parser;
use std::fs::OpenOptions;
use topic_tabs::Cli;
use topic_tabs::config::EngineConfig;
use topic_tabs::error::AppError;
use topic_tabs::replay::{self, Scenario};
use topic_tabs::storage::{JsonFileStore, default_state_path};

#[allow(clippy::exit)]
fn main() {
    if let Err(err) = run() {
        if let Some(app_error) = extract_app_error(&err) {
            eprintln!("{}", app_error.user_message());
            eprintln!("{err:#}");
            std::process::exit(app_error.exit_code());
        }
        eprintln!("{err:#}");
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli)?;

    let config = load_config(&cli).map_err(|err| err.context(AppError::ConfigInvalid))?;
    let scenario = Scenario::load(&cli.script).map_err(|err| err.context(AppError::ScriptInvalid))?;
    let state_path = cli
        .state
        .clone()
        .or_else(default_state_path)
        .ok_or_else(|| anyhow::anyhow!("no data directory available, pass --state <PATH>"))?;
    tracing::info!(state = %state_path.display(), steps = scenario.steps.len(), "replaying scenario");

    let rt = tokio::runtime::Runtime::new()?;
    let local_set = tokio::task::LocalSet::new();

    let summary = rt.block_on(local_set.run_until(async move {
        let store = JsonFileStore::new(state_path);
        replay::run_scenario(&scenario, store, config, cli.host_profile())
            .await
            .map_err(|err| err.context(AppError::StateUnreadable))
    }))?;

    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn load_config(cli: &Cli) -> anyhow::Result<EngineConfig> {
    let mut config = match cli.config.as_deref() {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    if let Some(url) = &cli.landing_url {
        config.default_landing_url.clone_from(url);
    }
    if let Some(batch_size) = cli.batch_size {
        config.batch_size = batch_size;
    }
    config.validate()?;
    Ok(config)
}

fn extract_app_error(err: &anyhow::Error) -> Option<AppError> {
    err.downcast_ref::<AppError>()
        .cloned()
        .or_else(|| err.chain().find_map(|cause| cause.downcast_ref::<AppError>().cloned()))
}

fn init_tracing(cli: &Cli) -> anyhow::Result<()> {
    let Some(path) = cli.log_file.as_ref() else {
        if std::env::var_os("RUST_LOG").is_some() {
            eprintln!(
                "RUST_LOG is set, but tracing is disabled without --log-file <PATH>. \
Use --log-file to enable diagnostics."
            );
        }
        return Ok(());
    };

    let directives = cli
        .log_filter
        .clone()
        .or_else(|| std::env::var("RUST_LOG").ok())
        .unwrap_or_else(|| "info".to_owned());
    let filter = tracing_subscriber::EnvFilter::try_new(directives.as_str())
        .map_err(|e| anyhow::anyhow!("invalid tracing filter `{directives}`: {e}"))?;

    let mut options = OpenOptions::new();
    options.create(true).write(true);
    if cli.log_append {
        options.append(true);
    } else {
        options.truncate(true);
    }
    let file = options
        .open(path)
        .map_err(|e| anyhow::anyhow!("failed to open log file {}: {e}", path.display()))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(file)
        .with_ansi(false)
        .with_file(true)
        .with_line_number(true)
        .with_target(true)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to initialize tracing subscriber: {e}"))?;

    tracing::info!(
        target: "diagnostics",
        version = env!("CARGO_PKG_VERSION"),
        log_file = %path.display(),
        log_filter = %directives,
        log_append = cli.log_append,
        "tracing enabled"
    );

    Ok(())
}
