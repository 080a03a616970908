// =====
// TESTS: 11
// =====
//
// Switch engine integration tests.
// Drive `TopicService::switch_to_topic` against the in-process host and check
// the resulting tab strip, registry and persisted topic table.

use pretty_assertions::assert_eq;
use topic_tabs::error::EngineError;
use topic_tabs::host::HostCall;
use topic_tabs::model::{PersistedState, Topic};

use crate::helpers::{LANDING, assert_single_ownership, start, work_and_home};

#[tokio::test]
async fn switching_hides_old_tabs_and_restores_missing_ones() {
    let mut h = start(work_and_home(Some(0)), &["https://a.example"]).await;
    let a = h.host.tab_by_url("https://a.example").unwrap();

    let report = h.service.switch_to_topic(1).await.unwrap();

    let b = h.host.tab_by_url("https://b.example").unwrap();
    assert_eq!(report.hidden, vec![a.id]);
    assert_eq!(report.activated, Some(b.id));
    assert!(h.host.tab(a.id).unwrap().group_id.is_some());
    assert_eq!(h.host.visible_urls(), vec!["https://b.example"]);
    assert_eq!(h.host.active_tab().map(|t| t.id), Some(b.id));
    assert_eq!(h.service.topic_of(b.id), Some(1));
    assert_eq!(h.service.topic_of(a.id), Some(0));
    assert!(report.verify.mismatches.is_empty());
    assert_single_ownership(&h);
}

#[tokio::test]
async fn switching_twice_is_idempotent() {
    let mut h = start(work_and_home(Some(0)), &["https://a.example"]).await;

    h.service.switch_to_topic(1).await.unwrap();
    let once = h.host.visible_urls();
    h.host.clear_calls();
    let again = h.service.switch_to_topic(1).await.unwrap();

    assert!(again.unchanged);
    assert_eq!(h.host.visible_urls(), once);
    assert!(h.host.calls().is_empty());
}

#[tokio::test]
async fn empty_topic_opens_one_landing_tab() {
    let state = PersistedState {
        topic_table: vec![Topic::new("Work").with_tabs(["https://a.example"]), Topic::new("Empty")],
        current_topic_index: Some(0),
    };
    let mut h = start(state, &["https://a.example"]).await;

    let report = h.service.switch_to_topic(1).await.unwrap();

    assert_eq!(h.host.visible_urls(), vec![LANDING]);
    let landing = h.host.tab_by_url(LANDING).unwrap();
    assert_eq!(report.activated, Some(landing.id));
    assert_eq!(h.service.topic_of(landing.id), Some(1));
    assert_eq!(h.service.topics()[1].regular_urls(), vec![LANDING]);
    assert_eq!(h.service.topics()[1].active_tab_index, Some(0));
}

#[tokio::test]
async fn fresh_start_makes_the_seeded_topic_active() {
    let mut h = start(work_and_home(None), &["https://a.example", "https://x.example"]).await;
    let x = h.host.tab_by_url("https://x.example").unwrap();
    assert_eq!(h.service.current_topic(), Some(0));

    let first = h.service.switch_to_topic(0).await.unwrap();
    assert!(first.unchanged);
    assert_eq!(h.host.visible_urls(), vec!["https://a.example", "https://x.example"]);

    h.service.switch_to_topic(1).await.unwrap();
    let back = h.service.switch_to_topic(0).await.unwrap();

    assert!(back.verify.mismatches.is_empty());
    assert_eq!(h.host.visible_urls(), vec!["https://a.example", "https://x.example"]);
    assert_eq!(h.service.topic_of(x.id), Some(0));
    assert_eq!(h.service.topics()[0].regular_urls(), vec!["https://a.example", "https://x.example"]);
    assert_single_ownership(&h);
}

#[tokio::test]
async fn first_topic_takes_over_tabs_open_before_it_existed() {
    let mut h = start(PersistedState::default(), &["https://x.example"]).await;
    let x = h.host.tab_by_url("https://x.example").unwrap();
    assert_eq!(h.service.current_topic(), None);

    h.service.topic_created(Topic::new("Research"));
    let report = h.service.switch_to_topic(0).await.unwrap();

    assert!(report.hidden.is_empty());
    assert!(report.verify.mismatches.is_empty());
    assert_eq!(h.service.topic_of(x.id), Some(0));
    assert!(h.host.visible_urls().contains(&"https://x.example".to_owned()));
    assert_eq!(h.service.topic_counts(), vec![2]);
    assert_single_ownership(&h);
}

#[tokio::test]
async fn topic_with_only_internal_pages_counts_as_empty() {
    let state = PersistedState {
        topic_table: vec![
            Topic::new("Work").with_tabs(["https://a.example"]),
            Topic::new("Settings").with_tabs(["about:config", "about:preferences"]),
        ],
        current_topic_index: Some(0),
    };
    let mut h = start(state, &["https://a.example"]).await;

    h.service.switch_to_topic(1).await.unwrap();

    assert_eq!(h.host.visible_urls(), vec![LANDING]);
    assert!(h.host.tab_by_url("https://a.example").is_some());
    assert_single_ownership(&h);
}

#[tokio::test]
async fn invalid_topic_is_rejected_before_touching_the_host() {
    let mut h = start(work_and_home(Some(0)), &["https://a.example"]).await;

    let err = h.service.switch_to_topic(7).await.unwrap_err();

    assert_eq!(err, EngineError::InvalidTopic { index: 7, count: 2 });
    assert!(h.host.calls().is_empty());
    assert_eq!(h.service.current_topic(), Some(0));
}

#[tokio::test]
async fn switching_back_restores_the_focused_tab() {
    let state = PersistedState {
        topic_table: vec![
            Topic::new("Work").with_tabs(["https://a.example", "https://c.example"]),
            Topic::new("Home").with_tabs(["https://b.example"]),
        ],
        current_topic_index: Some(0),
    };
    let mut h = start(state, &["https://a.example", "https://c.example"]).await;
    let a = h.host.tab_by_url("https://a.example").unwrap();
    h.host.user_activate(a.id);

    h.service.switch_to_topic(1).await.unwrap();
    assert_eq!(h.service.topics()[0].active_tab_index, Some(0));
    h.host.user_activate(h.host.tab_by_url("https://b.example").unwrap().id);
    let report = h.service.switch_to_topic(0).await.unwrap();

    assert_eq!(report.activated, Some(a.id));
    assert_eq!(h.host.active_tab().map(|t| t.id), Some(a.id));
    assert_eq!(h.host.visible_urls(), vec!["https://a.example", "https://c.example"]);
    assert!(report.created.is_none());
}

#[tokio::test]
async fn tabs_outside_the_target_list_stay_with_the_topic_being_left() {
    let mut h = start(work_and_home(Some(0)), &["https://a.example"]).await;
    let stray = h.host.user_open("https://stray.example");

    h.service.switch_to_topic(1).await.unwrap();

    assert_eq!(h.service.topic_of(stray), Some(0));
    assert!(!h.host.visible_urls().contains(&"https://stray.example".to_owned()));
    assert_eq!(h.service.topic_counts(), vec![2, 1]);
}

#[tokio::test]
async fn round_trip_keeps_single_ownership() {
    let mut h = start(work_and_home(Some(0)), &["https://a.example"]).await;

    h.service.switch_to_topic(1).await.unwrap();
    h.host.user_open("https://b2.example");
    h.service.switch_to_topic(0).await.unwrap();
    h.service.switch_to_topic(1).await.unwrap();

    assert_single_ownership(&h);
    assert_eq!(h.host.visible_urls(), vec!["https://b.example", "https://b2.example"]);
    assert_eq!(h.service.topics()[1].regular_urls(), vec!["https://b.example", "https://b2.example"]);
}

#[tokio::test]
async fn verification_reads_the_host_after_concurrent_changes() {
    let mut h = start(work_and_home(Some(0)), &["https://a.example"]).await;
    let a = h.host.tab_by_url("https://a.example").unwrap().id;
    // The user closes a parked tab and opens a new one while the switch is
    // suspended on its focus call.
    h.host.before_call(HostCall::Update, 1, move |host| {
        host.user_close(a);
        host.user_open("https://late.example");
    });

    let report = h.service.switch_to_topic(1).await.unwrap();

    let b = h.host.tab_by_url("https://b.example").unwrap();
    let late = h.host.tab_by_url("https://late.example").unwrap();
    assert_eq!(report.verify.visible, vec![b.id, late.id]);
    assert!(report.verify.hidden.is_empty());
    assert!(report.verify.mismatches.is_empty());
    assert_eq!(h.service.topic_of(late.id), Some(1));
    assert_eq!(h.service.topic_of(a), None);
    assert_eq!(h.service.topic_counts(), vec![0, 2]);
    assert_single_ownership(&h);
}
