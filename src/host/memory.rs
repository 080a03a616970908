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

//! In-process tab host.
//!
//! Keeps a window worth of tabs in memory, emits the same lifecycle
//! notifications a browser would, records every primitive call and can be told
//! to reject specific calls. The replay binary and the integration tests drive
//! the engine through it.

use super::{
    GroupUpdate, HostError, HostEvent, HostTab, TabGrouping, TabHost, TabUpdate, TabVisibility,
};
use crate::model::{GroupId, TabId};
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use tokio::sync::mpsc;

/// Every primitive the engine can invoke on a host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostCall {
    QueryTabs,
    QueryActive,
    Create,
    Update,
    Remove,
    Group,
    Ungroup,
    UpdateGroup,
    Hide,
    Show,
}

impl HostCall {
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::QueryTabs => "tabs.query",
            Self::QueryActive => "tabs.query(active)",
            Self::Create => "tabs.create",
            Self::Update => "tabs.update",
            Self::Remove => "tabs.remove",
            Self::Group => "tabs.group",
            Self::Ungroup => "tabs.ungroup",
            Self::UpdateGroup => "tabGroups.update",
            Self::Hide => "tabs.hide",
            Self::Show => "tabs.show",
        }
    }

    #[must_use]
    pub fn is_grouping(self) -> bool {
        matches!(self, Self::Group | Self::Ungroup | Self::UpdateGroup)
    }
}

#[derive(Debug, Clone, Default)]
pub struct GroupState {
    pub title: Option<String>,
    pub collapsed: bool,
}

type HookAction = Box<dyn FnOnce(&MemoryHost)>;

/// Side effect scheduled to run when a primitive is invoked for the n-th time.
struct CallHook {
    call: HostCall,
    remaining: usize,
    action: HookAction,
}

#[derive(Default)]
struct HostState {
    tabs: Vec<HostTab>,
    groups: HashMap<GroupId, GroupState>,
    next_tab_id: u64,
    next_group_id: u64,
    calls: Vec<HostCall>,
    failing: HashSet<HostCall>,
    failing_urls: HashSet<String>,
    hooks: Vec<CallHook>,
}

pub struct MemoryHost {
    state: RefCell<HostState>,
    grouping_enabled: bool,
    visibility_enabled: bool,
    in_flight_creates: Cell<usize>,
    peak_in_flight_creates: Cell<usize>,
    event_tx: mpsc::UnboundedSender<HostEvent>,
}

impl MemoryHost {
    /// A host exposing both optional primitives, plus the receiving end of its
    /// lifecycle notifications.
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<HostEvent>) {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let host = Self {
            state: RefCell::new(HostState { next_tab_id: 1, next_group_id: 1, ..HostState::default() }),
            grouping_enabled: true,
            visibility_enabled: true,
            in_flight_creates: Cell::new(0),
            peak_in_flight_creates: Cell::new(0),
            event_tx,
        };
        (host, event_rx)
    }

    #[must_use]
    pub fn without_grouping(mut self) -> Self {
        self.grouping_enabled = false;
        self
    }

    #[must_use]
    pub fn without_visibility(mut self) -> Self {
        self.visibility_enabled = false;
        self
    }

    /// Make every subsequent `call` reject.
    pub fn fail(&self, call: HostCall) {
        self.state.borrow_mut().failing.insert(call);
    }

    pub fn recover(&self, call: HostCall) {
        self.state.borrow_mut().failing.remove(&call);
    }

    /// Make creation of `url` reject.
    pub fn fail_create_of(&self, url: &str) {
        self.state.borrow_mut().failing_urls.insert(url.to_owned());
    }

    /// Run `action` right before the `nth` (1-based) invocation of `call`
    /// made after this point, as if the user acted while the engine was
    /// suspended on that call.
    pub fn before_call(&self, call: HostCall, nth: usize, action: impl FnOnce(&Self) + 'static) {
        let hook = CallHook { call, remaining: nth.max(1), action: Box::new(action) };
        self.state.borrow_mut().hooks.push(hook);
    }

    #[must_use]
    pub fn calls(&self) -> Vec<HostCall> {
        self.state.borrow().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.borrow_mut().calls.clear();
    }

    #[must_use]
    pub fn peak_concurrent_creates(&self) -> usize {
        self.peak_in_flight_creates.get()
    }

    #[must_use]
    pub fn tabs(&self) -> Vec<HostTab> {
        self.state.borrow().tabs.clone()
    }

    #[must_use]
    pub fn tab(&self, tab_id: TabId) -> Option<HostTab> {
        self.state.borrow().tabs.iter().find(|t| t.id == tab_id).cloned()
    }

    #[must_use]
    pub fn tab_by_url(&self, url: &str) -> Option<HostTab> {
        self.state.borrow().tabs.iter().find(|t| t.url == url).cloned()
    }

    /// Tabs a user would see in the tab strip.
    #[must_use]
    pub fn visible_tabs(&self) -> Vec<HostTab> {
        self.state.borrow().tabs.iter().filter(|t| !t.hidden && t.group_id.is_none()).cloned().collect()
    }

    #[must_use]
    pub fn visible_urls(&self) -> Vec<String> {
        self.visible_tabs().into_iter().filter(HostTab::is_regular).map(|t| t.url).collect()
    }

    #[must_use]
    pub fn active_tab(&self) -> Option<HostTab> {
        self.state.borrow().tabs.iter().find(|t| t.active).cloned()
    }

    #[must_use]
    pub fn group(&self, group: GroupId) -> Option<GroupState> {
        self.state.borrow().groups.get(&group).cloned()
    }

    // --- user-side actions (bypass failure injection and the call log) ---

    /// The user opens a tab and focuses it.
    pub fn user_open(&self, url: &str) -> TabId {
        let tab = self.insert_tab(url, true);
        self.emit(HostEvent::Created(tab.clone()));
        self.emit(HostEvent::Activated { tab_id: tab.id });
        tab.id
    }

    pub fn user_close(&self, tab_id: TabId) -> bool {
        self.detach_tabs(&[tab_id]) > 0
    }

    pub fn user_navigate(&self, tab_id: TabId, url: &str) -> bool {
        let changed = {
            let mut state = self.state.borrow_mut();
            match state.tabs.iter_mut().find(|t| t.id == tab_id) {
                Some(tab) => {
                    tab.url = url.to_owned();
                    tab.title = title_for(url);
                    true
                }
                None => false,
            }
        };
        if changed {
            self.emit(HostEvent::Updated { tab_id, url: Some(url.to_owned()) });
        }
        changed
    }

    pub fn user_activate(&self, tab_id: TabId) -> bool {
        let found = self.set_active(tab_id);
        if found {
            self.emit(HostEvent::Activated { tab_id });
        }
        found
    }

    /// Something outside the engine destroys a tab group.
    pub fn destroy_group(&self, group: GroupId) -> bool {
        let existed = {
            let mut state = self.state.borrow_mut();
            for tab in state.tabs.iter_mut().filter(|t| t.group_id == Some(group)) {
                tab.group_id = None;
            }
            state.groups.remove(&group).is_some()
        };
        if existed {
            self.emit(HostEvent::GroupRemoved { group_id: group });
        }
        existed
    }

    // --- internals ---

    fn emit(&self, event: HostEvent) {
        let _ = self.event_tx.send(event);
    }

    fn check(&self, call: HostCall) -> Result<(), HostError> {
        let due = {
            let mut state = self.state.borrow_mut();
            state.calls.push(call);
            take_due_hooks(&mut state.hooks, call)
        };
        for action in due {
            action(self);
        }
        if self.state.borrow().failing.contains(&call) {
            return Err(HostError::Rejected {
                call: call.name(),
                message: "injected failure".to_owned(),
            });
        }
        Ok(())
    }

    fn insert_tab(&self, url: &str, active: bool) -> HostTab {
        let mut state = self.state.borrow_mut();
        let id = TabId(state.next_tab_id);
        state.next_tab_id += 1;
        if active {
            for tab in &mut state.tabs {
                tab.active = false;
            }
        }
        let tab = HostTab {
            id,
            url: url.to_owned(),
            title: title_for(url),
            favicon_url: None,
            active,
            hidden: false,
            group_id: None,
        };
        state.tabs.push(tab.clone());
        tab
    }

    fn set_active(&self, tab_id: TabId) -> bool {
        let mut state = self.state.borrow_mut();
        if !state.tabs.iter().any(|t| t.id == tab_id) {
            return false;
        }
        for tab in &mut state.tabs {
            tab.active = tab.id == tab_id;
        }
        true
    }

    fn unknown_tab(&self, tab_ids: &[TabId]) -> Option<TabId> {
        let state = self.state.borrow();
        tab_ids.iter().copied().find(|id| !state.tabs.iter().any(|t| t.id == *id))
    }

    /// Remove tabs, move focus like a browser does, drop emptied groups.
    fn detach_tabs(&self, tab_ids: &[TabId]) -> usize {
        let mut events = Vec::new();
        let removed = {
            let mut state = self.state.borrow_mut();
            let mut removed = 0;
            let mut lost_focus_at = None;
            for id in tab_ids {
                if let Some(pos) = state.tabs.iter().position(|t| t.id == *id) {
                    let tab = state.tabs.remove(pos);
                    if tab.active {
                        lost_focus_at = Some(pos);
                    }
                    events.push(HostEvent::Removed { tab_id: tab.id });
                    removed += 1;
                }
            }
            if let Some(pos) = lost_focus_at
                && !state.tabs.is_empty()
            {
                let next = pos.min(state.tabs.len() - 1);
                state.tabs[next].active = true;
                events.push(HostEvent::Activated { tab_id: state.tabs[next].id });
            }
            events.extend(drop_empty_groups(&mut state));
            removed
        };
        for event in events {
            self.emit(event);
        }
        removed
    }
}

fn drop_empty_groups(state: &mut HostState) -> Vec<HostEvent> {
    let occupied: HashSet<GroupId> = state.tabs.iter().filter_map(|t| t.group_id).collect();
    let empty: Vec<GroupId> = state.groups.keys().copied().filter(|g| !occupied.contains(g)).collect();
    empty
        .into_iter()
        .map(|group_id| {
            state.groups.remove(&group_id);
            HostEvent::GroupRemoved { group_id }
        })
        .collect()
}

fn take_due_hooks(hooks: &mut Vec<CallHook>, call: HostCall) -> Vec<HookAction> {
    for hook in hooks.iter_mut().filter(|h| h.call == call) {
        hook.remaining -= 1;
    }
    let (due, pending): (Vec<_>, Vec<_>) =
        std::mem::take(hooks).into_iter().partition(|h| h.remaining == 0);
    *hooks = pending;
    due.into_iter().map(|h| h.action).collect()
}

fn title_for(url: &str) -> String {
    url.split("://").nth(1).unwrap_or(url).trim_end_matches('/').to_owned()
}

#[async_trait::async_trait(?Send)]
impl TabHost for MemoryHost {
    async fn query_tabs(&self) -> Result<Vec<HostTab>, HostError> {
        self.check(HostCall::QueryTabs)?;
        Ok(self.tabs())
    }

    async fn query_active_tab(&self) -> Result<Option<HostTab>, HostError> {
        self.check(HostCall::QueryActive)?;
        Ok(self.active_tab())
    }

    async fn create_tab(&self, url: &str, active: bool) -> Result<HostTab, HostError> {
        self.check(HostCall::Create)?;
        self.in_flight_creates.set(self.in_flight_creates.get() + 1);
        self.peak_in_flight_creates
            .set(self.peak_in_flight_creates.get().max(self.in_flight_creates.get()));
        tokio::task::yield_now().await;
        self.in_flight_creates.set(self.in_flight_creates.get() - 1);

        if self.state.borrow().failing_urls.contains(url) {
            return Err(HostError::Rejected {
                call: HostCall::Create.name(),
                message: format!("cannot open {url}"),
            });
        }
        let tab = self.insert_tab(url, active);
        self.emit(HostEvent::Created(tab.clone()));
        if active {
            self.emit(HostEvent::Activated { tab_id: tab.id });
        }
        Ok(tab)
    }

    async fn update_tab(&self, tab_id: TabId, update: TabUpdate) -> Result<HostTab, HostError> {
        self.check(HostCall::Update)?;
        if self.tab(tab_id).is_none() {
            return Err(HostError::NoSuchTab(tab_id));
        }
        if let Some(url) = update.url.as_deref() {
            self.user_navigate(tab_id, url);
        }
        if update.active == Some(true) {
            self.user_activate(tab_id);
        }
        self.tab(tab_id).ok_or(HostError::NoSuchTab(tab_id))
    }

    async fn remove_tabs(&self, tab_ids: &[TabId]) -> Result<(), HostError> {
        self.check(HostCall::Remove)?;
        if let Some(missing) = self.unknown_tab(tab_ids) {
            return Err(HostError::NoSuchTab(missing));
        }
        self.detach_tabs(tab_ids);
        Ok(())
    }

    fn grouping(&self) -> Option<&dyn TabGrouping> {
        self.grouping_enabled.then_some(self as &dyn TabGrouping)
    }

    fn visibility(&self) -> Option<&dyn TabVisibility> {
        self.visibility_enabled.then_some(self as &dyn TabVisibility)
    }
}

#[async_trait::async_trait(?Send)]
impl TabGrouping for MemoryHost {
    async fn group_tabs(
        &self,
        tab_ids: &[TabId],
        group: Option<GroupId>,
    ) -> Result<GroupId, HostError> {
        self.check(HostCall::Group)?;
        if let Some(missing) = self.unknown_tab(tab_ids) {
            return Err(HostError::NoSuchTab(missing));
        }
        let mut state = self.state.borrow_mut();
        let group = match group {
            Some(group) if state.groups.contains_key(&group) => group,
            Some(group) => return Err(HostError::NoSuchGroup(group)),
            None => {
                let group = GroupId(state.next_group_id);
                state.next_group_id += 1;
                state.groups.insert(group, GroupState::default());
                group
            }
        };
        for tab in state.tabs.iter_mut().filter(|t| tab_ids.contains(&t.id)) {
            tab.group_id = Some(group);
        }
        Ok(group)
    }

    async fn ungroup_tabs(&self, tab_ids: &[TabId]) -> Result<(), HostError> {
        self.check(HostCall::Ungroup)?;
        if let Some(missing) = self.unknown_tab(tab_ids) {
            return Err(HostError::NoSuchTab(missing));
        }
        let events = {
            let mut state = self.state.borrow_mut();
            for tab in state.tabs.iter_mut().filter(|t| tab_ids.contains(&t.id)) {
                tab.group_id = None;
            }
            drop_empty_groups(&mut state)
        };
        for event in events {
            self.emit(event);
        }
        Ok(())
    }

    async fn update_group(&self, group: GroupId, update: GroupUpdate) -> Result<(), HostError> {
        self.check(HostCall::UpdateGroup)?;
        let mut state = self.state.borrow_mut();
        let entry = state.groups.get_mut(&group).ok_or(HostError::NoSuchGroup(group))?;
        if let Some(title) = update.title {
            entry.title = Some(title);
        }
        if let Some(collapsed) = update.collapsed {
            entry.collapsed = collapsed;
        }
        Ok(())
    }
}

#[async_trait::async_trait(?Send)]
impl TabVisibility for MemoryHost {
    async fn hide_tabs(&self, tab_ids: &[TabId]) -> Result<(), HostError> {
        self.check(HostCall::Hide)?;
        if let Some(missing) = self.unknown_tab(tab_ids) {
            return Err(HostError::NoSuchTab(missing));
        }
        let mut state = self.state.borrow_mut();
        for tab in state.tabs.iter_mut().filter(|t| tab_ids.contains(&t.id)) {
            tab.hidden = true;
        }
        Ok(())
    }

    async fn show_tabs(&self, tab_ids: &[TabId]) -> Result<(), HostError> {
        self.check(HostCall::Show)?;
        if let Some(missing) = self.unknown_tab(tab_ids) {
            return Err(HostError::NoSuchTab(missing));
        }
        let mut state = self.state.borrow_mut();
        for tab in state.tabs.iter_mut().filter(|t| tab_ids.contains(&t.id)) {
            tab.hidden = false;
        }
        Ok(())
    }
}
