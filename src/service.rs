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

//! UI-facing surface of the engine.
//!
//! `TopicService` owns the context, the host handle, the persistence backend
//! and the host's notification queue. Every operation takes `&mut self`, so a
//! switch can never overlap another switch or an event handler; notifications
//! that arrive while a switch is suspended wait in the queue and are applied
//! right after it.

use crate::capability::Capabilities;
use crate::config::EngineConfig;
use crate::context::TopicContext;
use crate::engine::visibility::unpark_tabs;
use crate::engine::{self, SwitchReport};
use crate::error::EngineError;
use crate::host::{HostEvent, TabHost, regular_tabs};
use crate::listener;
use crate::model::{TabId, TabRecord, Topic, TopicId};
use crate::storage::{Persistence, SaveSchedule};
use anyhow::Context as _;
use std::future::Future;
use std::rc::Rc;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;

/// Sidebar requests served by [`TopicService::run`] between host
/// notifications.
#[derive(Debug)]
pub enum TopicCommand {
    Switch(TopicId),
    Create(Topic),
    Rename { index: TopicId, name: String },
    Delete(TopicId),
    CloseTabs(TopicId),
}

impl TopicCommand {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Switch(_) => "switch",
            Self::Create(_) => "create",
            Self::Rename { .. } => "rename",
            Self::Delete(_) => "delete",
            Self::CloseTabs(_) => "closeTabs",
        }
    }
}

/// What a sidebar needs to redraw after a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicStatus {
    pub current: Option<TopicId>,
    pub counts: Vec<usize>,
}

pub type CommandReply = oneshot::Sender<Result<TopicStatus, EngineError>>;

#[derive(Debug)]
pub struct TopicRequest {
    pub command: TopicCommand,
    pub reply: Option<CommandReply>,
}

impl TopicRequest {
    /// A request whose outcome is delivered on the returned receiver.
    #[must_use]
    pub fn new(command: TopicCommand) -> (Self, oneshot::Receiver<Result<TopicStatus, EngineError>>) {
        let (tx, rx) = oneshot::channel();
        (Self { command, reply: Some(tx) }, rx)
    }
}

impl From<TopicCommand> for TopicRequest {
    fn from(command: TopicCommand) -> Self {
        Self { command, reply: None }
    }
}

enum Wake {
    Shutdown,
    Event(Option<HostEvent>),
    Request(Option<TopicRequest>),
    SaveDue,
}

pub struct TopicService<H, S> {
    ctx: TopicContext,
    host: Rc<H>,
    store: S,
    events: Option<mpsc::UnboundedReceiver<HostEvent>>,
    save: SaveSchedule,
}

impl<H: TabHost, S: Persistence> TopicService<H, S> {
    /// Load persisted state, probe the host, attribute every live regular tab
    /// to the persisted current topic (or topic 0), make all of them visible
    /// and start listening to host notifications.
    ///
    /// The topic the tabs were attributed to becomes the active one, so a
    /// first switch to it is a no-op rather than a re-classification.
    pub async fn initialize(
        host: Rc<H>,
        store: S,
        config: EngineConfig,
        mut events: mpsc::UnboundedReceiver<HostEvent>,
    ) -> anyhow::Result<Self> {
        let state = store.load().await.context("failed to load persisted topic state")?;
        let capabilities = Capabilities::detect(host.as_ref());
        let save = SaveSchedule::new(config.save_debounce());
        let mut ctx = TopicContext::new(state, capabilities, config);
        if !ctx.topics.is_empty() {
            ctx.current = Some(ctx.adoption_topic());
        }

        match host.query_tabs().await {
            Ok(tabs) => {
                let tabs = regular_tabs(tabs);
                if let Some(topic) = ctx.current {
                    ctx.registry.seed(tabs.iter().map(|t| t.id), topic);
                }
                let shown = unpark_tabs(host.as_ref(), capabilities, &tabs).await;
                tracing::debug!(outcome = ?shown, "made every tab visible");
            }
            Err(err) => tracing::warn!("could not enumerate tabs at startup: {err}"),
        }

        // The enumeration above already covers whatever was queued before now.
        let mut stale = 0usize;
        while events.try_recv().is_ok() {
            stale += 1;
        }
        if stale > 0 {
            tracing::debug!(stale, "discarded notifications queued before startup");
        }

        tracing::info!(
            topics = ctx.topics.len(),
            current = ?ctx.current,
            tracked = ctx.registry.len(),
            "topic service initialized"
        );
        let mut service = Self { ctx, host, store, events: None, save };
        service.install_listener(events);
        Ok(service)
    }

    /// Attach the host's notification queue. Only the first call takes
    /// effect; later receivers are dropped.
    pub fn install_listener(&mut self, events: mpsc::UnboundedReceiver<HostEvent>) -> bool {
        if self.ctx.mark_listener_installed() {
            self.events = Some(events);
            true
        } else {
            tracing::debug!("reconciliation listener already installed");
            false
        }
    }

    /// Make `target` the visible topic, then apply the notifications the
    /// switch produced and persist the result immediately.
    pub async fn switch_to_topic(&mut self, target: TopicId) -> Result<SwitchReport, EngineError> {
        self.ctx.check_topic(target)?;
        self.process_pending_events().await;
        let report = engine::switch_to_topic(&mut self.ctx, self.host.as_ref(), target).await?;
        if report.unchanged {
            return Ok(report);
        }
        self.process_pending_events().await;
        if let Err(err) = self.flush().await {
            tracing::warn!(topic = target, "switch completed but state was not saved: {err}");
        }
        Ok(report)
    }

    #[must_use]
    pub fn topic_of(&self, tab_id: TabId) -> Option<TopicId> {
        self.ctx.registry.topic_of(tab_id)
    }

    #[must_use]
    pub fn tab_count(&self, topic: TopicId) -> usize {
        self.ctx.registry.tab_count(topic)
    }

    /// Badge count for every topic, in table order.
    #[must_use]
    pub fn topic_counts(&self) -> Vec<usize> {
        (0..self.ctx.topics.len()).map(|topic| self.ctx.registry.tab_count(topic)).collect()
    }

    /// Append a topic. A topic without any regular tab starts with a single
    /// record at the landing page.
    pub fn topic_created(&mut self, mut topic: Topic) -> TopicId {
        if topic.regular_urls().is_empty() {
            topic.tabs = vec![TabRecord::new(self.ctx.config.default_landing_url.clone())];
            topic.active_tab_index = Some(0);
        }
        self.ctx.topics.push(topic);
        let index = self.ctx.topics.len() - 1;
        tracing::info!(topic = index, "topic created");
        self.save.touch();
        index
    }

    pub fn topic_renamed(&mut self, index: TopicId, name: impl Into<String>) -> Result<(), EngineError> {
        self.ctx.check_topic(index)?;
        if let Some(topic) = self.ctx.topic_mut(index) {
            topic.name = name.into();
        }
        self.save.touch();
        Ok(())
    }

    /// Delete a topic and close its tabs. When it was the active topic, its
    /// neighbour becomes active and that switch's report is returned.
    pub async fn topic_deleted(&mut self, index: TopicId) -> Result<Option<SwitchReport>, EngineError> {
        self.ctx.check_topic(index)?;
        if self.ctx.topics.len() == 1 {
            return Err(EngineError::LastTopic);
        }
        self.process_pending_events().await;

        // The neighbour switch runs before the removal notifications are
        // applied, so they find a populated window.
        let was_current = self.ctx.current == Some(index);
        // Entries go first so the removal notifications rewrite no list.
        let orphaned = self.ctx.registry.remove_topic(index);
        self.close_tabs(&orphaned).await;
        let removed = self.ctx.topics.remove(index);
        tracing::info!(topic = index, name = %removed.name, closed = orphaned.len(), "topic deleted");

        let report = match self.ctx.current {
            Some(_) if was_current => {
                self.ctx.current = None;
                let neighbour = index.saturating_sub(1);
                Some(engine::switch_to_topic(&mut self.ctx, self.host.as_ref(), neighbour).await?)
            }
            Some(current) if current > index => {
                self.ctx.current = Some(current - 1);
                None
            }
            _ => None,
        };

        self.process_pending_events().await;
        if let Err(err) = self.flush().await {
            tracing::warn!("topic deleted but state was not saved: {err}");
        }
        Ok(report)
    }

    /// Close every live tab the registry attributes to `index`.
    pub async fn close_tabs_for_topic(&mut self, index: TopicId) -> Result<Vec<TabId>, EngineError> {
        self.ctx.check_topic(index)?;
        let owned: Vec<TabId> = self.ctx.registry.tabs_of(index).into_iter().collect();
        self.close_tabs(&owned).await;
        self.process_pending_events().await;
        Ok(owned)
    }

    async fn close_tabs(&self, tab_ids: &[TabId]) {
        if tab_ids.is_empty() {
            return;
        }
        let live: Vec<TabId> = match self.host.query_tabs().await {
            Ok(tabs) => tabs.iter().map(|t| t.id).filter(|id| tab_ids.contains(id)).collect(),
            Err(_) => tab_ids.to_vec(),
        };
        if live.is_empty() {
            return;
        }
        if let Err(err) = self.host.remove_tabs(&live).await {
            tracing::warn!(count = live.len(), "could not close topic tabs: {err}");
        }
    }

    /// Apply every queued host notification. Returns how many were handled.
    pub async fn process_pending_events(&mut self) -> usize {
        let Some(mut events) = self.events.take() else {
            return 0;
        };
        let mut handled = 0usize;
        while let Ok(event) = events.try_recv() {
            self.handle_event(&event).await;
            handled += 1;
        }
        self.events = Some(events);
        handled
    }

    async fn handle_event(&mut self, event: &HostEvent) {
        if listener::handle_event(&mut self.ctx, self.host.as_ref(), event).await {
            self.save.touch();
        }
    }

    /// Run one sidebar command and report the resulting status.
    pub async fn execute(&mut self, command: TopicCommand) -> Result<TopicStatus, EngineError> {
        match command {
            TopicCommand::Switch(topic) => {
                self.switch_to_topic(topic).await?;
            }
            TopicCommand::Create(topic) => {
                self.topic_created(topic);
            }
            TopicCommand::Rename { index, name } => self.topic_renamed(index, name)?,
            TopicCommand::Delete(index) => {
                self.topic_deleted(index).await?;
            }
            TopicCommand::CloseTabs(index) => {
                self.close_tabs_for_topic(index).await?;
            }
        }
        Ok(self.status())
    }

    #[must_use]
    pub fn status(&self) -> TopicStatus {
        TopicStatus { current: self.ctx.current, counts: self.topic_counts() }
    }

    /// Serve sidebar requests and host notifications until `shutdown`
    /// resolves or the host stops sending notifications, saving once no
    /// change arrived for the debounce window.
    pub async fn run(
        &mut self,
        mut requests: mpsc::UnboundedReceiver<TopicRequest>,
        shutdown: impl Future<Output = ()>,
    ) -> anyhow::Result<()> {
        if self.events.is_none() {
            anyhow::bail!("reconciliation listener is not installed");
        }
        tokio::pin!(shutdown);
        let mut requests_open = true;

        loop {
            let deadline = self.save.due();
            let wake = tokio::select! {
                () = &mut shutdown => Wake::Shutdown,
                event = next_event(&mut self.events) => Wake::Event(event),
                request = requests.recv(), if requests_open => Wake::Request(request),
                () = save_deadline(deadline) => Wake::SaveDue,
            };
            match wake {
                Wake::Shutdown => break,
                Wake::Event(Some(event)) => self.handle_event(&event).await,
                Wake::Event(None) => {
                    tracing::info!("host notification channel closed");
                    break;
                }
                Wake::Request(Some(request)) => self.serve(request).await,
                Wake::Request(None) => {
                    tracing::debug!("sidebar request channel closed");
                    requests_open = false;
                }
                Wake::SaveDue => {
                    if let Err(err) = self.flush().await {
                        tracing::warn!("debounced save failed: {err}");
                    }
                }
            }
        }

        if self.save.is_pending() {
            self.flush().await?;
        }
        Ok(())
    }

    async fn serve(&mut self, request: TopicRequest) {
        let TopicRequest { command, reply } = request;
        let name = command.name();
        let result = self.execute(command).await;
        if let Err(err) = &result {
            tracing::warn!(command = name, "sidebar command failed: {err}");
        }
        if let Some(reply) = reply
            && reply.send(result).is_err()
        {
            tracing::debug!(command = name, "sidebar stopped waiting for the reply");
        }
    }

    /// Save if the debounce window has elapsed. Returns whether a save ran.
    pub async fn flush_if_due(&mut self) -> Result<bool, EngineError> {
        if !self.save.is_due(Instant::now()) {
            return Ok(false);
        }
        self.flush().await?;
        Ok(true)
    }

    pub async fn flush(&mut self) -> Result<(), EngineError> {
        self.save.clear();
        let state = self.ctx.persisted();
        self.store
            .save(&state)
            .await
            .map_err(|err| EngineError::Persistence(format!("{err:#}")))?;
        tracing::debug!(topics = state.topic_table.len(), "saved topic state");
        Ok(())
    }

    #[must_use]
    pub fn save_pending(&self) -> bool {
        self.save.is_pending()
    }

    #[must_use]
    pub fn context(&self) -> &TopicContext {
        &self.ctx
    }

    #[must_use]
    pub fn host(&self) -> &Rc<H> {
        &self.host
    }

    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    #[must_use]
    pub fn topics(&self) -> &[Topic] {
        &self.ctx.topics
    }

    #[must_use]
    pub fn current_topic(&self) -> Option<TopicId> {
        self.ctx.current
    }
}

async fn next_event(events: &mut Option<mpsc::UnboundedReceiver<HostEvent>>) -> Option<HostEvent> {
    match events {
        Some(events) => events.recv().await,
        None => std::future::pending().await,
    }
}

async fn save_deadline(due: Option<Instant>) {
    match due {
        Some(due) => tokio::time::sleep_until(due).await,
        None => std::future::pending().await,
    }
}
