use std::rc::Rc;
use tokio::sync::mpsc;
use topic_tabs::config::EngineConfig;
use topic_tabs::host::{HostEvent, MemoryHost};
use topic_tabs::model::{PersistedState, Topic, TopicId};
use topic_tabs::service::TopicService;
use topic_tabs::storage::MemoryStore;

pub const LANDING: &str = "https://www.google.de";

pub type TestService = TopicService<MemoryHost, Rc<MemoryStore>>;

pub struct Harness {
    pub service: TestService,
    pub host: Rc<MemoryHost>,
    pub store: Rc<MemoryStore>,
}

/// `Work` owns a.example, `Home` owns b.example.
pub fn work_and_home(current: Option<TopicId>) -> PersistedState {
    PersistedState {
        topic_table: vec![
            Topic::new("Work").with_tabs(["https://a.example"]),
            Topic::new("Home").with_tabs(["https://b.example"]),
        ],
        current_topic_index: current,
    }
}

/// Start the service on a host exposing both primitives, with `open`
/// already open before startup.
pub async fn start(state: PersistedState, open: &[&str]) -> Harness {
    let (host, events) = MemoryHost::new();
    start_on(host, events, state, open).await
}

pub async fn start_on(
    host: MemoryHost,
    events: mpsc::UnboundedReceiver<HostEvent>,
    state: PersistedState,
    open: &[&str],
) -> Harness {
    let host = Rc::new(host);
    for url in open {
        host.user_open(url);
    }
    let store = Rc::new(MemoryStore::new(state));
    let service =
        TopicService::initialize(Rc::clone(&host), Rc::clone(&store), EngineConfig::default(), events)
            .await
            .unwrap();
    host.clear_calls();
    Harness { service, host, store }
}

/// Every live regular tab is owned by exactly one topic and the badge counts
/// add up to the live tab count.
pub fn assert_single_ownership(h: &Harness) {
    let live: Vec<_> = h.host.tabs().into_iter().filter(|t| t.is_regular()).collect();
    for tab in &live {
        assert!(h.service.topic_of(tab.id).is_some(), "tab {} ({}) has no owner", tab.id, tab.url);
    }
    assert_eq!(h.service.topic_counts().iter().sum::<usize>(), live.len());
}
