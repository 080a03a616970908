// =====
// TESTS: 6
// =====
//
// Persistence integration tests.
// Debounced saves on the paused tokio clock, the JSON file store and startup
// normalization of persisted state.

use pretty_assertions::assert_eq;
use std::rc::Rc;
use std::time::Duration;
use tokio::sync::mpsc;
use topic_tabs::config::EngineConfig;
use topic_tabs::error::EngineError;
use topic_tabs::host::MemoryHost;
use topic_tabs::model::{PersistedState, Topic};
use topic_tabs::service::{TopicCommand, TopicRequest, TopicService};
use topic_tabs::storage::{JsonFileStore, Persistence};

use crate::helpers::{start, work_and_home};

#[tokio::test(start_paused = true)]
async fn run_loop_saves_once_after_a_quiet_window() {
    let mut h = start(work_and_home(Some(0)), &["https://a.example"]).await;
    let host = Rc::clone(&h.host);
    let store = Rc::clone(&h.store);
    let (_requests, rx) = mpsc::unbounded_channel();

    let script = async {
        host.user_open("https://c.example");
        tokio::time::sleep(Duration::from_millis(200)).await;
        host.user_open("https://d.example");
        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(store.save_count(), 0, "saved inside the debounce window");
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(store.save_count(), 1);
    };
    h.service.run(rx, script).await.unwrap();

    assert_eq!(h.store.save_count(), 1);
    assert_eq!(
        h.store.snapshot().topic_table[0].regular_urls(),
        vec!["https://a.example", "https://c.example", "https://d.example"]
    );
}

#[tokio::test(start_paused = true)]
async fn flush_if_due_waits_for_the_debounce_window() {
    let mut h = start(work_and_home(Some(0)), &["https://a.example"]).await;
    h.host.user_open("https://c.example");
    h.service.process_pending_events().await;

    assert!(h.service.save_pending());
    assert!(!h.service.flush_if_due().await.unwrap());
    tokio::time::advance(Duration::from_millis(500)).await;
    assert!(h.service.flush_if_due().await.unwrap());
    assert_eq!(h.store.save_count(), 1);
    assert!(!h.service.save_pending());
}

#[tokio::test]
async fn run_loop_flushes_pending_changes_on_shutdown() {
    let mut h = start(work_and_home(Some(0)), &["https://a.example"]).await;
    h.service.topic_renamed(0, "Office").unwrap();

    let (_requests, rx) = mpsc::unbounded_channel();
    h.service.run(rx, async {}).await.unwrap();

    assert_eq!(h.store.snapshot().topic_table[0].name, "Office");
}

#[tokio::test(start_paused = true)]
async fn run_loop_serves_sidebar_requests_between_notifications() {
    let mut h = start(work_and_home(Some(0)), &["https://a.example"]).await;
    let host = Rc::clone(&h.host);
    let store = Rc::clone(&h.store);
    let (requests, rx) = mpsc::unbounded_channel();

    let script = async {
        let (request, reply) = TopicRequest::new(TopicCommand::Switch(1));
        requests.send(request).unwrap();
        let status = reply.await.unwrap().unwrap();
        assert_eq!(status.current, Some(1));
        assert_eq!(store.save_count(), 1, "switch is saved immediately");

        host.user_open("https://c.example");
        tokio::time::sleep(Duration::from_millis(600)).await;
        assert_eq!(store.save_count(), 2);

        let (request, reply) = TopicRequest::new(TopicCommand::Switch(9));
        requests.send(request).unwrap();
        let err = reply.await.unwrap().unwrap_err();
        assert_eq!(err, EngineError::InvalidTopic { index: 9, count: 2 });
    };
    h.service.run(rx, script).await.unwrap();

    assert_eq!(h.store.save_count(), 2);
    assert_eq!(
        h.store.snapshot().topic_table[1].regular_urls(),
        vec!["https://b.example", "https://c.example"]
    );
}

#[tokio::test]
async fn switch_is_written_to_the_state_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");
    JsonFileStore::new(&path).save(&work_and_home(Some(0))).await.unwrap();

    let (host, events) = MemoryHost::new();
    let host = Rc::new(host);
    host.user_open("https://a.example");
    let mut service =
        TopicService::initialize(host, JsonFileStore::new(&path), EngineConfig::default(), events)
            .await
            .unwrap();
    service.switch_to_topic(1).await.unwrap();

    let raw = std::fs::read_to_string(&path).unwrap();
    let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(json["currentTopicIndex"], 1);
    assert_eq!(json["topicTable"][1]["tabs"][0]["url"], "https://b.example");
    assert_eq!(json["topicTable"][0]["tabs"][0]["url"], "https://a.example");
}

#[tokio::test]
async fn stale_current_index_falls_back_to_the_first_topic() {
    let state = PersistedState {
        topic_table: vec![Topic::new("Work"), Topic::new("Home")],
        current_topic_index: Some(9),
    };
    let h = start(state, &["https://a.example"]).await;

    let a = h.host.tab_by_url("https://a.example").unwrap();
    assert_eq!(h.service.current_topic(), Some(0));
    assert_eq!(h.service.topic_of(a.id), Some(0));
}
