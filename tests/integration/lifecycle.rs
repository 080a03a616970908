// =====
// TESTS: 5
// =====
//
// Topic lifecycle integration tests.
// Creation, deletion and bulk close notifications coming from the sidebar.

use pretty_assertions::assert_eq;
use topic_tabs::error::EngineError;
use topic_tabs::model::{PersistedState, Topic};

use crate::helpers::{LANDING, assert_single_ownership, start, work_and_home};

#[tokio::test]
async fn deleting_the_active_topic_switches_to_its_neighbour() {
    let mut h = start(work_and_home(Some(0)), &["https://a.example"]).await;
    let a = h.host.tab_by_url("https://a.example").unwrap();

    let report = h.service.topic_deleted(0).await.unwrap().unwrap();

    assert_eq!((report.from, report.to), (None, 0));
    assert!(h.host.tab(a.id).is_none());
    assert_eq!(h.service.topics().len(), 1);
    assert_eq!(h.service.topics()[0].name, "Home");
    assert_eq!(h.service.current_topic(), Some(0));
    assert_eq!(h.host.visible_urls(), vec!["https://b.example"]);
    assert_eq!(h.service.topic_counts(), vec![1]);
    assert_eq!(h.store.snapshot().topic_table.len(), 1);
}

#[tokio::test]
async fn deleting_an_earlier_topic_reindexes_ownership() {
    let state = PersistedState {
        topic_table: vec![Topic::new("Work"), Topic::new("Home"), Topic::new("Misc")],
        current_topic_index: Some(2),
    };
    let mut h = start(state, &["https://x.example"]).await;
    let x = h.host.tab_by_url("https://x.example").unwrap();
    assert_eq!(h.service.topic_of(x.id), Some(2));

    let report = h.service.topic_deleted(0).await.unwrap();

    assert!(report.is_none());
    assert_eq!(h.service.current_topic(), Some(1));
    assert_eq!(h.service.topic_of(x.id), Some(1));
    assert_eq!(h.service.topic_counts(), vec![0, 1]);
    assert!(h.host.tab(x.id).is_some());
}

#[tokio::test]
async fn deleting_the_last_topic_is_refused() {
    let state = PersistedState { topic_table: vec![Topic::new("Only")], current_topic_index: Some(0) };
    let mut h = start(state, &["https://a.example"]).await;

    assert_eq!(h.service.topic_deleted(0).await.unwrap_err(), EngineError::LastTopic);
    assert_eq!(h.service.topics().len(), 1);
    assert!(h.host.calls().is_empty());
}

#[tokio::test]
async fn closing_a_topics_tabs_empties_its_list() {
    let mut h = start(work_and_home(Some(0)), &["https://a.example"]).await;
    h.service.switch_to_topic(1).await.unwrap();
    let a = h.host.tab_by_url("https://a.example").unwrap();

    let closed = h.service.close_tabs_for_topic(0).await.unwrap();

    assert_eq!(closed, vec![a.id]);
    assert!(h.host.tab(a.id).is_none());
    assert_eq!(h.service.topic_counts(), vec![0, 1]);
    assert!(h.service.topics()[0].tabs.is_empty());
    assert_eq!(h.host.visible_urls(), vec!["https://b.example"]);
    assert_single_ownership(&h);
}

#[tokio::test]
async fn new_topic_starts_on_the_landing_page() {
    let mut h = start(work_and_home(Some(0)), &["https://a.example"]).await;

    let research = h.service.topic_created(Topic::new("Research"));
    h.service.switch_to_topic(research).await.unwrap();

    assert_eq!(research, 2);
    assert_eq!(h.host.visible_urls(), vec![LANDING]);
    let landing = h.host.tab_by_url(LANDING).unwrap();
    assert_eq!(h.service.topic_of(landing.id), Some(2));
    assert_eq!(h.host.active_tab().map(|t| t.id), Some(landing.id));
    assert_eq!(h.store.snapshot().topic_table[2].name, "Research");
}
