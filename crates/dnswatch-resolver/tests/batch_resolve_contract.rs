//! Contract Test: Single and Batch Resolution
//!
//! Constraints verified:
//! - Batch output order equals provider order, whatever the completion order
//! - One slow or failing server never hides the others' results
//! - Deadline and cancellation both complete the query as a timeout
//! - A client is created at most once per server, even under contention
//!
//! If this test fails, comparison output is misattributed or incomplete.

mod common;

use common::*;
use dnswatch_core::types::{DnsServer, RecordType};
use dnswatch_resolver::{ComparisonSummary, QueryFailure, ResolutionEngine};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[tokio::test(start_paused = true)]
async fn batch_preserves_provider_order() {
    let factory = ScriptedFactory::new()
        .reply("8.8.8.8", Reply::slow(300, &["93.184.216.34"]))
        .reply("1.1.1.1", Reply::slow(10, &["93.184.216.34"]))
        .reply("9.9.9.9", Reply::slow(100, &["93.184.216.35"]));
    let engine = ResolutionEngine::new(Arc::new(factory), settings(1000, 1));

    let providers = vec![
        isp("google", "8.8.8.8"),
        isp("cloudflare", "1.1.1.1"),
        isp("quad9", "9.9.9.9"),
    ];
    let queries = engine.batch_resolve(&domain(), RecordType::A, &providers).await;

    let names: Vec<&str> = queries.iter().map(|q| q.isp_name().unwrap()).collect();
    assert_eq!(names, vec!["google DNS", "cloudflare DNS", "quad9 DNS"]);
    for (query, provider) in queries.iter().zip(&providers) {
        assert_eq!(query.server(), provider.primary);
        assert!(query.is_completed());
        assert!(query.is_success());
    }

    let summary = ComparisonSummary::from_queries(&queries);
    assert_eq!(summary.answers[0].servers, vec!["google DNS", "cloudflare DNS"]);
}

#[tokio::test(start_paused = true)]
async fn one_timeout_does_not_hide_others() {
    let factory = ScriptedFactory::new()
        .reply("8.8.8.8", Reply::answer(&["93.184.216.34"]))
        .reply("1.1.1.1", Reply::Hang)
        .reply("9.9.9.9", Reply::answer(&["93.184.216.34"]));
    let engine = ResolutionEngine::new(Arc::new(factory), settings(200, 2));

    let providers = vec![
        isp("google", "8.8.8.8"),
        isp("cloudflare", "1.1.1.1"),
        isp("quad9", "9.9.9.9"),
    ];
    let queries = engine.batch_resolve(&domain(), RecordType::A, &providers).await;

    assert_eq!(queries.len(), 3);
    let failures: Vec<_> = queries.iter().filter(|q| !q.is_success()).collect();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].isp_name(), Some("cloudflare DNS"));

    let error = failures[0].result().unwrap().error().unwrap();
    assert!(error.contains("timed out"), "unexpected error: {}", error);
    assert!(error.contains("400 ms"), "deadline is timeout * attempts: {}", error);
}

#[tokio::test]
async fn failure_classes_become_query_errors() {
    let factory = ScriptedFactory::new()
        .reply(
            "8.8.8.8",
            Reply::Fail(QueryFailure::Response("NXDOMAIN".to_string())),
        )
        .reply(
            "1.1.1.1",
            Reply::Fail(QueryFailure::Network("connection refused".to_string())),
        );
    let engine = ResolutionEngine::new(Arc::new(factory), settings(1000, 1));

    let nx = engine
        .resolve(
            &domain(),
            RecordType::A,
            DnsServer::from_ip("8.8.8.8".parse().unwrap()),
            None,
        )
        .await;
    let nx_result = nx.result().unwrap();
    assert!(!nx_result.is_success());
    assert_eq!(nx_result.error(), Some("DNS response error: NXDOMAIN"));
    assert!(nx_result.records().is_empty());
    assert_eq!(nx_result.elapsed_ms(), 0);
    assert_eq!(nx.isp_name(), None);

    let refused = engine
        .resolve(
            &domain(),
            RecordType::A,
            DnsServer::from_ip("1.1.1.1".parse().unwrap()),
            Some("Cloudflare"),
        )
        .await;
    assert_eq!(
        refused.result().unwrap().error(),
        Some("Network error: connection refused")
    );
}

#[tokio::test]
async fn empty_answer_is_success() {
    let factory = ScriptedFactory::new().reply("8.8.8.8", Reply::answer(&[]));
    let engine = ResolutionEngine::new(Arc::new(factory), settings(1000, 1));

    let query = engine
        .resolve(
            &domain(),
            RecordType::Txt,
            DnsServer::from_ip("8.8.8.8".parse().unwrap()),
            None,
        )
        .await;
    assert!(query.is_success());
    assert!(query.result().unwrap().records().is_empty());
}

#[tokio::test(start_paused = true)]
async fn cancellation_is_a_timeout_failure() {
    let factory = ScriptedFactory::new()
        .reply("8.8.8.8", Reply::Hang)
        .reply("1.1.1.1", Reply::Hang);
    let engine = ResolutionEngine::new(Arc::new(factory), settings(60_000, 3));

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let providers = vec![isp("google", "8.8.8.8"), isp("cloudflare", "1.1.1.1")];
    let queries = engine
        .batch_resolve_cancellable(&domain(), RecordType::A, &providers, &cancel)
        .await;

    assert_eq!(queries.len(), 2);
    for query in &queries {
        let error = query.result().unwrap().error().unwrap();
        assert!(error.contains("cancelled"), "unexpected error: {}", error);
    }
}

#[tokio::test]
async fn clients_are_reused_across_calls() {
    let factory = Arc::new(ScriptedFactory::new().reply("8.8.8.8", Reply::answer(&["1.2.3.4"])));
    let engine = ResolutionEngine::new(factory.clone(), settings(1000, 1));
    let server = DnsServer::from_ip("8.8.8.8".parse().unwrap());

    for _ in 0..5 {
        engine.resolve(&domain(), RecordType::A, server, None).await;
    }

    assert_eq!(factory.created_for(server), 1);
    assert_eq!(engine.cache().len(), 1);
}

#[test]
fn concurrent_first_use_creates_one_client() {
    let mut factory = ScriptedFactory::new().reply("8.8.8.8", Reply::answer(&["1.2.3.4"]));
    factory.create_delay = Some(Duration::from_millis(20));
    let factory = Arc::new(factory);
    let engine = ResolutionEngine::new(factory.clone(), settings(1000, 1));
    let server = DnsServer::from_ip("8.8.8.8".parse().unwrap());

    std::thread::scope(|scope| {
        for _ in 0..8 {
            scope.spawn(|| {
                engine.cache().get_or_create(server);
            });
        }
    });

    assert_eq!(factory.created_for(server), 1);
    assert_eq!(factory.total_created(), 1);
}
