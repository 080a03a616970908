// =====
// TESTS: 6
// =====
//
// Reconciliation listener integration tests.
// User-driven tab lifecycle changes applied without any switch call.

use pretty_assertions::assert_eq;

use crate::helpers::{LANDING, assert_single_ownership, start, work_and_home};

#[tokio::test]
async fn closing_the_last_tab_opens_a_replacement() {
    let mut h = start(work_and_home(Some(0)), &["https://a.example"]).await;
    let a = h.host.tab_by_url("https://a.example").unwrap();

    h.host.user_close(a.id);
    h.service.process_pending_events().await;

    assert_eq!(h.host.visible_urls(), vec![LANDING]);
    let landing = h.host.tab_by_url(LANDING).unwrap();
    assert_eq!(h.service.topic_of(landing.id), Some(0));
    assert_eq!(h.service.topics()[0].regular_urls(), vec![LANDING]);
    assert_eq!(h.service.current_topic(), Some(0));
}

#[tokio::test]
async fn closing_the_last_visible_tab_ignores_parked_ones() {
    let mut h = start(work_and_home(Some(0)), &["https://a.example"]).await;
    h.service.switch_to_topic(1).await.unwrap();
    let b = h.host.tab_by_url("https://b.example").unwrap();

    h.host.user_close(b.id);
    h.service.process_pending_events().await;

    assert_eq!(h.host.visible_urls(), vec![LANDING]);
    assert_eq!(h.service.topic_counts(), vec![1, 1]);
    assert_eq!(h.service.topics()[1].regular_urls(), vec![LANDING]);
    assert_single_ownership(&h);
}

#[tokio::test]
async fn repeated_closes_never_empty_the_window() {
    let mut h = start(work_and_home(Some(0)), &["https://a.example", "https://c.example"]).await;

    for _ in 0..3 {
        for tab in h.host.tabs() {
            h.host.user_close(tab.id);
            h.service.process_pending_events().await;
            assert!(!h.host.visible_urls().is_empty());
        }
    }
    assert_eq!(h.host.visible_urls(), vec![LANDING]);
    assert_single_ownership(&h);
}

#[tokio::test]
async fn opened_and_navigated_tabs_join_the_active_topic() {
    let mut h = start(work_and_home(Some(0)), &["https://a.example"]).await;
    h.service.switch_to_topic(1).await.unwrap();
    let b = h.host.tab_by_url("https://b.example").unwrap();

    h.host.user_navigate(b.id, "https://c.example");
    let d = h.host.user_open("https://d.example");
    h.service.process_pending_events().await;

    assert_eq!(h.service.topic_of(d), Some(1));
    assert_eq!(h.service.topics()[1].regular_urls(), vec!["https://c.example", "https://d.example"]);
    assert_eq!(h.service.topic_counts(), vec![1, 2]);
    assert!(h.service.save_pending());
}

#[tokio::test]
async fn navigating_to_an_internal_page_drops_ownership() {
    let mut h = start(work_and_home(Some(0)), &["https://a.example", "https://c.example"]).await;
    let c = h.host.tab_by_url("https://c.example").unwrap();

    h.host.user_navigate(c.id, "about:blank");
    h.service.process_pending_events().await;

    assert_eq!(h.service.topic_of(c.id), None);
    assert_eq!(h.service.tab_count(0), 1);
    assert_eq!(h.service.topics()[0].regular_urls(), vec!["https://a.example"]);
}

#[tokio::test]
async fn activation_is_remembered_per_topic() {
    let mut h = start(work_and_home(Some(0)), &["https://a.example"]).await;
    h.service.switch_to_topic(1).await.unwrap();
    let d = h.host.user_open("https://d.example");
    h.service.process_pending_events().await;
    assert_eq!(h.service.topics()[1].active_tab_index, Some(1));

    let b = h.host.tab_by_url("https://b.example").unwrap();
    h.host.user_activate(b.id);
    h.service.process_pending_events().await;

    assert_eq!(h.service.topics()[1].active_tab_index, Some(0));
    assert_eq!(h.service.topic_of(d), Some(1));
}
