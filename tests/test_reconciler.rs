mod common;

use common::{mount_health, node_against, offline_node, sample_project, seed_user};
use packhorse::Project;
use packhorse_sync::{Reconciler, SyncDispatcher};
use std::sync::Arc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn reconciler_for(node: &common::TestNode) -> Reconciler {
    Reconciler::new(
        Arc::clone(&node.local),
        Arc::clone(&node.remote),
        Arc::clone(&node.probe),
    )
}

fn remote_record(id: i64, name: &str) -> Project {
    Project {
        id,
        ..sample_project(name, 1)
    }
}

async fn mount_listing(server: &MockServer, records: &[Project]) {
    Mock::given(method("GET"))
        .and(path("/projects"))
        .respond_with(ResponseTemplate::new(200).set_body_json(records))
        .mount(server)
        .await;
}

/// Bootstrap: an empty local store receives the remote's records verbatim.
#[tokio::test]
async fn test_bootstrap_pulls_missing_records() {
    let server = MockServer::start().await;
    mount_health(&server).await;
    let record = remote_record(1, "A");
    mount_listing(&server, std::slice::from_ref(&record)).await;

    let node = node_against(&server);
    let summary = reconciler_for(&node).run_once().await;

    assert_eq!(summary.inserted, 1);
    assert_eq!(summary.updated, 0);
    assert!(!summary.skipped);
    assert_eq!(node.local.get_project(1).unwrap().unwrap(), record);
}

/// A local record the remote does not know is never deleted.
#[tokio::test]
async fn test_local_only_records_survive() {
    let server = MockServer::start().await;
    mount_health(&server).await;
    mount_listing(&server, &[]).await;

    let node = node_against(&server);
    let local_only = remote_record(2, "Z");
    node.local.insert_project_with_id(&local_only).unwrap();

    let summary = reconciler_for(&node).run_once().await;

    assert_eq!(summary.inserted + summary.updated, 0);
    assert_eq!(node.local.get_project(2).unwrap().unwrap(), local_only);
}

/// During reconciliation the remote is authoritative: any field difference
/// overwrites the local copy.
#[tokio::test]
async fn test_divergent_record_is_overwritten_from_remote() {
    let server = MockServer::start().await;
    mount_health(&server).await;

    let mut remote_version = remote_record(3, "renamed");
    remote_version.img = Some("https://cdn.example.com/3.webp".to_string());
    mount_listing(&server, std::slice::from_ref(&remote_version)).await;

    let node = node_against(&server);
    node.local
        .insert_project_with_id(&remote_record(3, "original"))
        .unwrap();

    let summary = reconciler_for(&node).run_once().await;

    assert_eq!(summary.updated, 1);
    assert_eq!(node.local.get_project(3).unwrap().unwrap(), remote_version);
}

/// An identical record is left untouched: no write, no counter.
#[tokio::test]
async fn test_identical_record_is_not_rewritten() {
    let server = MockServer::start().await;
    mount_health(&server).await;
    let record = remote_record(4, "same");
    mount_listing(&server, std::slice::from_ref(&record)).await;

    let node = node_against(&server);
    node.local.insert_project_with_id(&record).unwrap();

    let summary = reconciler_for(&node).run_once().await;
    assert_eq!(summary.inserted + summary.updated, 0);
}

/// Unreachable remote at bootstrap is a skip, not an error.
#[tokio::test]
async fn test_unreachable_remote_skips_pass() {
    let node = offline_node();
    let summary = reconciler_for(&node).run_once().await;
    assert!(summary.skipped);
}

/// The wiring drains the outbox before the initial reconciliation pass, so
/// an edit made offline reaches the remote before the remote snapshot is
/// pulled back in the same connectivity window.
#[tokio::test]
async fn test_startup_drains_outbox_before_reconciling() {
    let server = MockServer::start().await;
    let node = node_against(&server);
    let user_id = seed_user(&node.local);

    // offline edit, parked in the outbox
    let stored = node.repo.create(sample_project("edited-offline", user_id)).await.unwrap();

    // connectivity returns before the background tasks start
    mount_health(&server).await;
    Mock::given(method("PUT"))
        .and(path(format!("/projects/{}", stored.id)))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    mount_listing(&server, std::slice::from_ref(&stored)).await;

    let dispatcher = Arc::new(SyncDispatcher::new(
        Arc::clone(&node.local),
        Arc::clone(&node.remote),
        Arc::clone(&node.probe),
        &node.config,
    ));
    dispatcher.drain_once().await;
    let summary = reconciler_for(&node).run_once().await;

    // the pass saw the already-pushed version: nothing to heal, and the
    // offline edit was not overwritten
    assert_eq!(summary.inserted + summary.updated, 0);
    assert_eq!(node.local.get_project(stored.id).unwrap().unwrap(), stored);

    let seen = common::requests_seen(&server).await;
    let put_pos = seen.iter().position(|(m, _)| m == "PUT").unwrap();
    let listing_pos = seen
        .iter()
        .position(|(m, p)| m == "GET" && p == "/projects")
        .unwrap();
    assert!(put_pos < listing_pos, "outbox must drain before the pull");
}
