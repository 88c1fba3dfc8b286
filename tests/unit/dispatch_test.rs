use std::collections::HashMap;
use std::sync::Arc;

use dbcollect::dispatch::{Outcome, dispatch, execute_target};
use dbcollect::error::CollectorError;

use crate::support::{MockConnector, Script, targets};

fn outcome_targets(outcomes: &[Outcome]) -> Vec<String> {
    let mut names: Vec<String> = outcomes.iter().map(|o| o.target().to_string()).collect();
    names.sort();
    names
}

#[tokio::test]
async fn one_outcome_per_target_for_any_worker_limit() {
    for workers in [1, 2, 3, 10] {
        let connector = Arc::new(MockConnector::new(&[
            ("a", Script::rows(&["id"], &[&["1"]])),
            ("b", Script::connect_error()),
            ("c", Script::query_error()),
            ("d", Script::rows(&["id"], &[])),
            ("e", Script::rows(&["id"], &[&["2"], &["3"]])),
        ]));
        let hosts = targets(&["a", "b", "c", "d", "e"]);

        let outcomes = dispatch(connector, &hosts, "SELECT id FROM t", workers).await;

        assert_eq!(outcomes.len(), 5, "workers={workers}");
        assert_eq!(outcome_targets(&outcomes), hosts, "workers={workers}");
        assert_eq!(outcomes.iter().filter(|o| o.is_success()).count(), 3);
    }
}

#[tokio::test]
async fn duplicate_targets_each_run_once() {
    let connector = Arc::new(MockConnector::new(&[("a", Script::rows(&["x"], &[&["1"]]))]));
    let stats = Arc::clone(&connector.stats);

    let outcomes = dispatch(connector, &targets(&["a", "a"]), "SELECT 1", 2).await;

    assert_eq!(outcomes.len(), 2);
    assert_eq!(stats.connects.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn connect_failure_skips_query() {
    let connector = Arc::new(MockConnector::new(&[
        ("a", Script::connect_error()),
        ("b", Script::rows(&["id"], &[&["1"]])),
    ]));
    let stats = Arc::clone(&connector.stats);

    let outcomes = dispatch(connector, &targets(&["a", "b"]), "SELECT 1", 2).await;

    let failures: Vec<&Outcome> = outcomes.iter().filter(|o| !o.is_success()).collect();
    assert_eq!(failures.len(), 1);
    match failures[0] {
        Outcome::Failure { target, error } => {
            assert_eq!(target, "a");
            assert!(matches!(error, CollectorError::Connect { .. }));
            assert_eq!(error.target(), Some("a"));
        }
        other => panic!("expected failure, got {other:?}"),
    }
    assert!(!stats.queried("a"));
    assert!(stats.queried("b"));
    assert_eq!(stats.closes_for("a"), 0);
}

#[tokio::test]
async fn every_opened_connection_is_closed_once() {
    let connector = Arc::new(MockConnector::new(&[
        ("ok", Script::rows(&["id"], &[&["1"]])),
        ("bad-query", Script::query_error()),
        ("no-connect", Script::connect_error()),
    ]));
    let stats = Arc::clone(&connector.stats);

    dispatch(
        connector,
        &targets(&["ok", "bad-query", "no-connect"]),
        "SELECT 1",
        3,
    )
    .await;

    assert_eq!(stats.closes_for("ok"), 1);
    assert_eq!(stats.closes_for("bad-query"), 1);
    assert_eq!(stats.closes_for("no-connect"), 0);
    assert_eq!(stats.open_now.load(std::sync::atomic::Ordering::SeqCst), 0);
}

#[tokio::test]
async fn query_failure_is_tagged_with_target() {
    let connector = MockConnector::new(&[("db7", Script::query_error())]);

    let outcome = execute_target(&connector, "db7", "SELECT broken").await;

    match outcome {
        Outcome::Failure { target, error } => {
            assert_eq!(target, "db7");
            assert!(matches!(error, CollectorError::Query { .. }));
            assert!(error.to_string().contains("db7"));
        }
        other => panic!("expected failure, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn single_worker_never_overlaps_connections() {
    let connector = Arc::new(MockConnector::new(&[
        ("a", Script::rows(&["id"], &[&["1"]]).delayed(30)),
        ("b", Script::rows(&["id"], &[&["2"]]).delayed(10)),
        ("c", Script::rows(&["id"], &[&["3"]]).delayed(20)),
    ]));
    let stats = Arc::clone(&connector.stats);

    let outcomes = dispatch(connector, &targets(&["a", "b", "c"]), "SELECT id", 1).await;

    assert_eq!(outcomes.len(), 3);
    assert_eq!(stats.max_open(), 1);
}

#[tokio::test(start_paused = true)]
async fn concurrency_is_bounded_by_worker_limit() {
    let scripts: Vec<(String, Script)> = (0..8)
        .map(|i| (format!("h{i}"), Script::rows(&["n"], &[&["1"]]).delayed(50)))
        .collect();
    let refs: Vec<(&str, Script)> = scripts
        .iter()
        .map(|(t, s)| (t.as_str(), s.clone()))
        .collect();
    let connector = Arc::new(MockConnector::new(&refs));
    let stats = Arc::clone(&connector.stats);
    let hosts: Vec<String> = scripts.iter().map(|(t, _)| t.clone()).collect();

    let outcomes = dispatch(connector, &hosts, "SELECT 1", 3).await;

    assert_eq!(outcomes.len(), 8);
    assert_eq!(stats.max_open(), 3);
}

#[tokio::test(start_paused = true)]
async fn zero_workers_is_treated_as_one() {
    let connector = Arc::new(MockConnector::new(&[
        ("a", Script::rows(&["id"], &[&["1"]]).delayed(5)),
        ("b", Script::rows(&["id"], &[&["2"]]).delayed(5)),
    ]));
    let stats = Arc::clone(&connector.stats);

    let outcomes = dispatch(connector, &targets(&["a", "b"]), "SELECT 1", 0).await;

    assert_eq!(outcomes.len(), 2);
    assert_eq!(stats.max_open(), 1);
}

#[tokio::test(start_paused = true)]
async fn outcomes_arrive_in_completion_order() {
    let connector = Arc::new(MockConnector::new(&[
        ("slow", Script::rows(&["id"], &[&["1"]]).delayed(300)),
        ("fast", Script::rows(&["id"], &[&["2"]]).delayed(10)),
        ("medium", Script::rows(&["id"], &[&["3"]]).delayed(100)),
    ]));

    let outcomes = dispatch(
        connector,
        &targets(&["slow", "fast", "medium"]),
        "SELECT 1",
        3,
    )
    .await;

    let order: Vec<&str> = outcomes.iter().map(Outcome::target).collect();
    assert_eq!(order, vec!["fast", "medium", "slow"]);
}

#[tokio::test(start_paused = true)]
async fn failure_does_not_block_other_targets() {
    let connector = Arc::new(MockConnector::new(&[
        ("down", Script::connect_error()),
        ("up1", Script::rows(&["id"], &[&["1"]]).delayed(20)),
        ("up2", Script::rows(&["id"], &[&["2"]]).delayed(40)),
    ]));

    let outcomes = dispatch(connector, &targets(&["down", "up1", "up2"]), "SELECT 1", 1).await;

    let by_target: HashMap<&str, bool> = outcomes
        .iter()
        .map(|o| (o.target(), o.is_success()))
        .collect();
    assert_eq!(by_target.get("down"), Some(&false));
    assert_eq!(by_target.get("up1"), Some(&true));
    assert_eq!(by_target.get("up2"), Some(&true));
}

#[tokio::test]
async fn panicking_target_becomes_failure() {
    let mut crashing = Script::rows(&["id"], &[&["1"]]);
    crashing.panic_in_query = true;
    let connector = Arc::new(MockConnector::new(&[
        ("crash", crashing),
        ("fine", Script::rows(&["id"], &[&["2"]])),
    ]));

    let outcomes = dispatch(connector, &targets(&["crash", "fine"]), "SELECT 1", 2).await;

    assert_eq!(outcomes.len(), 2);
    let crash = outcomes
        .iter()
        .find(|o| o.target() == "crash")
        .expect("crash outcome present");
    match crash {
        Outcome::Failure { error, .. } => {
            assert!(matches!(error, CollectorError::Worker { .. }));
        }
        other => panic!("expected failure, got {other:?}"),
    }
}
