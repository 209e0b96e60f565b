//! Contract Test: Idempotent Reconciliation
//!
//! Constraints verified:
//! - An unchanged public IP never reaches the provider
//! - Only the check timestamp moves when nothing changed
//! - A changed IP is pushed once, then remembered across ticks and restarts
//!
//! If this test fails, the scheduler is spamming provider APIs.

mod common;

use chrono::{Duration, Utc};
use common::*;
use dnswatch_core::traits::TaskStore;
use dnswatch_core::types::RecordType;
use dnswatch_core::{FileTaskStore, MemoryTaskStore, Scheduler};
use std::sync::Arc;

#[tokio::test]
async fn changed_ip_is_pushed_and_remembered() {
    let t0 = Utc::now();
    let task = task_at("home", "r1", t0);
    let store = Arc::new(MemoryTaskStore::with_tasks([task.clone()]));
    let backend = MockBackend::new();
    let (scheduler, _events) = Scheduler::new(
        store.clone(),
        Arc::new(ScriptedDiscovery::fixed(ip("203.0.113.7"))),
        backend.factory(),
        test_config(),
    )
    .unwrap();

    let report = scheduler.tick(t0).await;
    assert_eq!(report.updated, 1);

    let calls = backend.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].domain, "example.com");
    assert_eq!(calls[0].record_id, "r1");
    assert_eq!(calls[0].credential_id, "home-id");
    assert_eq!(calls[0].request.sub_domain.as_deref(), Some("home"));
    assert_eq!(calls[0].request.record_type, RecordType::A);
    assert_eq!(calls[0].request.value, "203.0.113.7");
    assert_eq!(calls[0].request.ttl, 600);

    let stored = store.get(task.id()).await.unwrap().unwrap();
    assert_eq!(stored.last_known_ip(), Some(ip("203.0.113.7")));
    assert_eq!(stored.last_update_time(), Some(t0));
    assert_eq!(stored.last_check_time(), Some(t0));
    assert_eq!(stored.last_error(), None);
}

#[tokio::test]
async fn unchanged_ip_only_moves_check_time() {
    let t0 = Utc::now();
    let store = Arc::new(MemoryTaskStore::with_tasks([task_at("home", "r1", t0)]));
    let backend = MockBackend::new();
    let (scheduler, _events) = Scheduler::new(
        store.clone(),
        Arc::new(ScriptedDiscovery::fixed(ip("203.0.113.7"))),
        backend.factory(),
        test_config(),
    )
    .unwrap();

    scheduler.tick(t0).await;
    let after_first = store.get_all().await.unwrap().remove(0);

    let t1 = t0 + Duration::minutes(5);
    let report = scheduler.tick(t1).await;
    assert_eq!(report.unchanged, 1);
    assert_eq!(report.updated, 0);
    assert_eq!(backend.update_count(), 1, "second tick must not call the provider");

    let after_second = store.get_all().await.unwrap().remove(0);
    assert_eq!(after_second.last_check_time(), Some(t1));
    assert_eq!(after_second.last_known_ip(), after_first.last_known_ip());
    assert_eq!(after_second.last_update_time(), after_first.last_update_time());
    assert_eq!(after_second.last_error(), None);
}

#[tokio::test]
async fn ipv6_address_is_pushed_as_aaaa() {
    let t0 = Utc::now();
    let store = Arc::new(MemoryTaskStore::with_tasks([task_at("v6", "r6", t0)]));
    let backend = MockBackend::new();
    let (scheduler, _events) = Scheduler::new(
        store,
        Arc::new(ScriptedDiscovery::fixed(ip("2001:db8::1"))),
        backend.factory(),
        test_config(),
    )
    .unwrap();

    scheduler.tick(t0).await;
    let calls = backend.calls();
    assert_eq!(calls[0].request.record_type, RecordType::Aaaa);
    assert_eq!(calls[0].request.value, "2001:db8::1");
}

#[tokio::test]
async fn new_address_after_change_is_pushed_again() {
    let t0 = Utc::now();
    let store = Arc::new(MemoryTaskStore::with_tasks([task_at("home", "r1", t0)]));
    let backend = MockBackend::new();
    let discovery = Arc::new(ScriptedDiscovery::script(vec![
        Ok(ip("203.0.113.7")),
        Ok(ip("203.0.113.7")),
        Ok(ip("198.51.100.2")),
    ]));
    let (scheduler, _events) =
        Scheduler::new(store.clone(), discovery, backend.factory(), test_config()).unwrap();

    for i in 0..3 {
        scheduler.tick(t0 + Duration::minutes(5 * i)).await;
    }

    let values: Vec<String> = backend.calls().into_iter().map(|c| c.request.value).collect();
    assert_eq!(values, vec!["203.0.113.7", "198.51.100.2"]);

    let stored = store.get_all().await.unwrap().remove(0);
    assert_eq!(stored.last_known_ip(), Some(ip("198.51.100.2")));
}

#[tokio::test]
async fn restart_does_not_repeat_update() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tasks.json");
    let t0 = Utc::now();

    // First "run": push the address and persist it
    {
        let store = Arc::new(FileTaskStore::new(&path).await.unwrap());
        store.add(&task_at("home", "r1", t0)).await.unwrap();

        let backend = MockBackend::new();
        let (scheduler, _events) = Scheduler::new(
            store,
            Arc::new(ScriptedDiscovery::fixed(ip("203.0.113.7"))),
            backend.factory(),
            test_config(),
        )
        .unwrap();
        scheduler.tick(t0).await;
        assert_eq!(backend.update_count(), 1);
    }

    // Second "run": same address, nothing to push
    let store = Arc::new(FileTaskStore::new(&path).await.unwrap());
    let backend = MockBackend::new();
    let (scheduler, _events) = Scheduler::new(
        store,
        Arc::new(ScriptedDiscovery::fixed(ip("203.0.113.7"))),
        backend.factory(),
        test_config(),
    )
    .unwrap();

    let report = scheduler.tick(t0 + Duration::minutes(10)).await;
    assert_eq!(report.unchanged, 1);
    assert_eq!(backend.update_count(), 0, "restart must not re-push an unchanged IP");
}
