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

use crate::model::PersistedState;
use anyhow::Context as _;
use std::cell::{Cell, RefCell};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::Duration;
use tokio::time::Instant;

const STATE_DIR_NAME: &str = "topic-tabs";
const STATE_FILE: &str = "state.json";

/// Key-value persistence for the topic table. A completed `save` is visible to
/// the next `load` and commits as one record.
#[async_trait::async_trait(?Send)]
pub trait Persistence {
    async fn load(&self) -> anyhow::Result<PersistedState>;

    async fn save(&self, state: &PersistedState) -> anyhow::Result<()>;
}

#[async_trait::async_trait(?Send)]
impl<P: Persistence + ?Sized> Persistence for Rc<P> {
    async fn load(&self) -> anyhow::Result<PersistedState> {
        (**self).load().await
    }

    async fn save(&self, state: &PersistedState) -> anyhow::Result<()> {
        (**self).save(state).await
    }
}

#[must_use]
pub fn default_state_path() -> Option<PathBuf> {
    dirs::data_dir().map(|dir| dir.join(STATE_DIR_NAME).join(STATE_FILE))
}

/// JSON document on disk, replaced through a sibling temp file.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait::async_trait(?Send)]
impl Persistence for JsonFileStore {
    async fn load(&self) -> anyhow::Result<PersistedState> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "no persisted state yet");
                return Ok(PersistedState::default());
            }
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("failed to read {}", self.path.display()));
            }
        };
        let state: PersistedState = serde_json::from_str(&content)
            .with_context(|| format!("failed to decode {}", self.path.display()))?;
        Ok(state.normalized())
    }

    async fn save(&self, state: &PersistedState) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }
        let content = serde_json::to_vec_pretty(state).context("failed to encode topic state")?;
        let temp = self.temp_path();
        tokio::fs::write(&temp, content)
            .await
            .with_context(|| format!("failed to write {}", temp.display()))?;
        tokio::fs::rename(&temp, &self.path)
            .await
            .with_context(|| format!("failed to commit {}", self.path.display()))?;
        Ok(())
    }
}

/// In-process store, mostly for tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RefCell<PersistedState>,
    saves: Cell<usize>,
    failing: Cell<bool>,
}

impl MemoryStore {
    #[must_use]
    pub fn new(state: PersistedState) -> Self {
        Self { state: RefCell::new(state), saves: Cell::new(0), failing: Cell::new(false) }
    }

    #[must_use]
    pub fn snapshot(&self) -> PersistedState {
        self.state.borrow().clone()
    }

    #[must_use]
    pub fn save_count(&self) -> usize {
        self.saves.get()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.set(failing);
    }
}

#[async_trait::async_trait(?Send)]
impl Persistence for MemoryStore {
    async fn load(&self) -> anyhow::Result<PersistedState> {
        Ok(self.snapshot().normalized())
    }

    async fn save(&self, state: &PersistedState) -> anyhow::Result<()> {
        if self.failing.get() {
            anyhow::bail!("storage unavailable");
        }
        *self.state.borrow_mut() = state.clone();
        self.saves.set(self.saves.get() + 1);
        Ok(())
    }
}

/// Trailing-edge debounce for persistence writes.
#[derive(Debug)]
pub struct SaveSchedule {
    window: Duration,
    due: Option<Instant>,
}

impl SaveSchedule {
    #[must_use]
    pub fn new(window: Duration) -> Self {
        Self { window, due: None }
    }

    /// Push the deadline out by one window from now.
    pub fn touch(&mut self) {
        self.due = Some(Instant::now() + self.window);
    }

    #[must_use]
    pub fn due(&self) -> Option<Instant> {
        self.due
    }

    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.due.is_some()
    }

    #[must_use]
    pub fn is_due(&self, now: Instant) -> bool {
        self.due.is_some_and(|due| due <= now)
    }

    pub fn clear(&mut self) {
        self.due = None;
    }
}
