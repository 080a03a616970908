// =====
// TESTS: 7
// =====
//
// Capability and fallback integration tests.
// Hosts with one, none or failing hiding primitives.

use pretty_assertions::assert_eq;
use topic_tabs::engine::{Primitive, StepOutcome};
use topic_tabs::host::{HostCall, MemoryHost};
use topic_tabs::model::{PersistedState, Topic};

use crate::helpers::{LANDING, start, start_on, work_and_home};

#[tokio::test]
async fn visibility_only_host_never_touches_grouping() {
    let (host, events) = MemoryHost::new();
    let mut h =
        start_on(host.without_grouping(), events, work_and_home(Some(0)), &["https://a.example"]).await;

    let there = h.service.switch_to_topic(1).await.unwrap();
    let back = h.service.switch_to_topic(0).await.unwrap();

    assert_eq!(there.hide_outcome, Some(StepOutcome::Applied(Primitive::Visibility)));
    assert_eq!(back.show_outcome, Some(StepOutcome::Applied(Primitive::Visibility)));
    let calls = h.host.calls();
    assert!(!calls.iter().any(|c| c.is_grouping()), "grouping called: {calls:?}");
    assert!(calls.contains(&HostCall::Hide));
    assert!(calls.contains(&HostCall::Show));
    assert_eq!(h.host.visible_urls(), vec!["https://a.example"]);
}

#[tokio::test]
async fn rejected_grouping_falls_back_to_hiding() {
    let mut h = start(work_and_home(Some(0)), &["https://a.example"]).await;
    h.host.fail(HostCall::Group);

    let report = h.service.switch_to_topic(1).await.unwrap();

    assert_eq!(report.hide_outcome, Some(StepOutcome::Applied(Primitive::Visibility)));
    let calls = h.host.calls();
    let group_at = calls.iter().position(|c| *c == HostCall::Group).unwrap();
    let hide_at = calls.iter().position(|c| *c == HostCall::Hide).unwrap();
    assert!(group_at < hide_at);
    assert!(h.host.tab_by_url("https://a.example").unwrap().hidden);
    assert_eq!(h.host.visible_urls(), vec!["https://b.example"]);
}

#[tokio::test]
async fn failed_hiding_does_not_block_showing_or_creating() {
    let mut h = start(work_and_home(Some(0)), &["https://a.example"]).await;
    h.host.fail(HostCall::Group);
    h.host.fail(HostCall::Hide);

    let report = h.service.switch_to_topic(1).await.unwrap();

    assert_eq!(report.hide_outcome, Some(StepOutcome::Failed));
    assert_eq!(report.created.as_ref().map(|c| c.created_count()), Some(1));
    let b = h.host.tab_by_url("https://b.example").unwrap();
    assert_eq!(h.host.active_tab().map(|t| t.id), Some(b.id));
    assert_eq!(h.host.visible_urls(), vec!["https://a.example", "https://b.example"]);
    // The tab that should have been parked is reported, not hidden.
    assert_eq!(report.verify.mismatches.len(), 1);
    assert_eq!(report.verify.mismatches[0].url, "https://a.example");
}

#[tokio::test]
async fn host_without_primitives_runs_degraded() {
    let (host, events) = MemoryHost::new();
    let host = host.without_grouping().without_visibility();
    let mut h = start_on(host, events, work_and_home(Some(0)), &["https://a.example"]).await;

    let report = h.service.switch_to_topic(1).await.unwrap();

    assert_eq!(report.hide_outcome, Some(StepOutcome::Degraded));
    assert!(h.service.context().capabilities.is_degraded());
    assert_eq!(h.host.visible_urls(), vec!["https://a.example", "https://b.example"]);
    assert!(report.verify.mismatches.is_empty());
    assert_eq!(h.service.topic_counts(), vec![1, 1]);
}

#[tokio::test]
async fn degraded_empty_topic_repurposes_a_visible_tab() {
    let (host, events) = MemoryHost::new();
    let host = host.without_grouping().without_visibility();
    let mut h = start_on(
        host,
        events,
        PersistedState {
            topic_table: vec![
                Topic::new("Work").with_tabs(["https://a.example", "https://c.example"]),
                Topic::new("Empty"),
            ],
            current_topic_index: Some(0),
        },
        &["https://a.example", "https://c.example"],
    )
    .await;
    let c = h.host.tab_by_url("https://c.example").unwrap();

    let report = h.service.switch_to_topic(1).await.unwrap();

    let outcome = report.empty_topic.unwrap();
    assert!(outcome.repurposed);
    assert_eq!(outcome.landing, Some(c.id));
    assert_eq!(outcome.closed.len(), 1);
    assert_eq!(h.host.visible_urls(), vec![LANDING]);
    assert_eq!(h.service.topic_of(c.id), Some(1));
}

#[tokio::test]
async fn destroyed_hidden_container_is_recreated() {
    let mut h = start(work_and_home(Some(0)), &["https://a.example"]).await;
    h.service.switch_to_topic(1).await.unwrap();
    let first = h.service.context().registry.hidden_group().unwrap();

    h.host.destroy_group(first);
    h.service.process_pending_events().await;
    assert_eq!(h.service.context().registry.hidden_group(), None);

    h.service.switch_to_topic(0).await.unwrap();

    let second = h.service.context().registry.hidden_group().unwrap();
    assert_ne!(first, second);
    let container = h.host.group(second).unwrap();
    assert_eq!(container.title.as_deref(), Some("Hidden Tabs"));
    assert!(container.collapsed);
    assert_eq!(h.host.visible_urls(), vec!["https://a.example"]);
}

#[tokio::test]
async fn rejected_primitive_is_only_skipped_for_that_call() {
    let mut h = start(work_and_home(Some(0)), &["https://a.example"]).await;
    h.host.fail(HostCall::Group);
    let first = h.service.switch_to_topic(1).await.unwrap();
    h.host.recover(HostCall::Group);

    let second = h.service.switch_to_topic(0).await.unwrap();

    assert_eq!(first.hide_outcome, Some(StepOutcome::Applied(Primitive::Visibility)));
    assert_eq!(second.hide_outcome, Some(StepOutcome::Applied(Primitive::Grouping)));
    assert_eq!(second.show_outcome, Some(StepOutcome::Applied(Primitive::Visibility)));
    assert!(h.service.context().capabilities.has_grouping);
    assert_eq!(h.host.visible_urls(), vec!["https://a.example"]);
}
