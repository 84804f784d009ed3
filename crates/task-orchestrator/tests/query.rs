mod common;

use std::sync::Arc;

use common::*;
use option_ledger_core::{AggregateSnapshot, ClosePrice, QuerySnapshot};
use option_ledger_tasks::{QueryRequest, Selection, TaskEvent, TaskOutcome};

fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-9,
        "expected {expected}, got {actual}"
    );
}

fn snapshot_of(events: &[TaskEvent]) -> QuerySnapshot {
    let [.., TaskEvent::ResultReady(snapshot), TaskEvent::Finished(_)] = events else {
        panic!("result must directly precede the terminal event: {events:?}");
    };
    snapshot.clone()
}

fn single(name: &str, day: &str) -> QueryRequest {
    QueryRequest::new(Selection::Option(name.to_string()), date(day))
}

#[tokio::test]
async fn single_option_lists_every_date_through_query_date() {
    let mut ledger = sample_ledger();
    mark_missing(&mut ledger, "m-call", "2025-11-04");
    let provider = Arc::new(ScriptedProvider::new().with_price("m2601", "2025-11-04", 2990.0));
    let store = Arc::new(MemoryStore::new());
    let runner = runner(
        ledger,
        provider.clone(),
        store.clone(),
        "2025-11-10",
        settings(false),
    );

    let events = runner
        .start_query(single("m-call", "2025-11-05"))
        .unwrap()
        .collect()
        .await;

    let outcome = terminal(&events);
    assert!(outcome.error_report().unwrap().is_empty());
    assert_eq!(progress_percents(&events), vec![0, 30, 70, 80, 90, 100, 100]);
    assert_eq!(
        provider.calls(),
        vec![("m2601".to_string(), date("2025-11-04"))]
    );
    assert_eq!(store.saves(), 2);

    let QuerySnapshot::Single { option_name, rows } = snapshot_of(&events) else {
        panic!("expected single mode");
    };
    assert_eq!(option_name, "m-call");
    let dates: Vec<_> = rows.iter().map(|r| r.date).collect();
    assert_eq!(
        dates,
        vec![date("2025-11-03"), date("2025-11-04"), date("2025-11-05")]
    );
    assert_eq!(rows[0].close_price, None);
    assert_eq!(rows[1].close_price, Some(ClosePrice::Resolved(2990.0)));
    assert_close(rows[0].position, -600.0);
    assert_close(rows[1].position, -300.0);
    assert_close(rows[2].position, 0.0);
    assert_close(rows[2].daily_reversal, 300.0);
}

#[tokio::test]
async fn query_date_itself_is_never_reported_missing() {
    let mut ledger = sample_ledger();
    mark_missing(&mut ledger, "i-put", "2025-11-07");
    mark_missing(&mut ledger, "i-put", "2025-11-10");
    let provider = Arc::new(ScriptedProvider::new());
    let runner = runner(
        ledger,
        provider.clone(),
        Arc::new(MemoryStore::new()),
        "2025-11-12",
        settings(false),
    );

    let outcome = runner
        .start_query(single("i-put", "2025-11-10"))
        .unwrap()
        .wait()
        .await;

    let report = outcome.error_report().unwrap();
    assert_eq!(report.len(), 1);
    assert_eq!(report.dates("i-put"), vec![date("2025-11-07")]);
    assert_eq!(provider.calls().len(), 2);

    let ledger = runner.ledger();
    let ledger = ledger.read().await;
    assert_eq!(
        ledger.get("i-put").unwrap().close_price(date("2025-11-10")),
        Some(ClosePrice::Missing)
    );
}

#[tokio::test]
async fn several_targets_build_the_aggregate_view() {
    let mut ledger = sample_ledger();
    ledger
        .create(
            "c-call",
            terms("c2601", 2200.0, -500.0, &["2025-11-12", "2025-11-13"]),
            false,
        )
        .unwrap();
    let provider = Arc::new(ScriptedProvider::new());
    let runner = runner(
        ledger,
        provider.clone(),
        Arc::new(MemoryStore::new()),
        "2025-11-10",
        settings(false),
    );

    let events = runner
        .start_query(QueryRequest::new(Selection::All, date("2025-11-10")))
        .unwrap()
        .collect()
        .await;

    assert!(terminal(&events).is_success());
    assert!(provider.calls().is_empty());

    let QuerySnapshot::Aggregate(aggregate) = snapshot_of(&events) else {
        panic!("expected aggregate mode");
    };
    assert_eq!(aggregate.active_count, 1);
    assert_eq!(aggregate.expired_count, 1);

    let active = &aggregate.active[0];
    assert_eq!(active.option_name, "i-put");
    assert_eq!(active.date, date("2025-11-10"));
    assert_close(active.position, 400.0 - 2.0 * 400.0 / 3.0);

    let expired = &aggregate.expired[0];
    assert_eq!(expired.option_name, "m-call");
    assert_eq!(expired.date, date("2025-11-05"));
    assert_close(expired.position, 0.0);
}

#[tokio::test]
async fn keyword_matching_one_option_uses_single_mode() {
    let runner = runner(
        sample_ledger(),
        Arc::new(ScriptedProvider::new()),
        Arc::new(MemoryStore::new()),
        "2025-11-10",
        settings(false),
    );

    let events = runner
        .start_query(QueryRequest::new(
            Selection::Keyword("PUT".to_string()),
            date("2025-11-10"),
        ))
        .unwrap()
        .collect()
        .await;

    let snapshot = snapshot_of(&events);
    assert!(snapshot.is_single());
    assert_eq!(snapshot.rows().count(), 2);
}

#[tokio::test]
async fn unattempted_dates_are_fetched_when_enabled() {
    let provider = Arc::new(
        ScriptedProvider::new()
            .with_price("m2601", "2025-11-03", 3012.0)
            .with_price("m2601", "2025-11-04", 2990.0)
            .with_price("m2601", "2025-11-05", 3001.0),
    );
    let runner = runner(
        sample_ledger(),
        provider.clone(),
        Arc::new(MemoryStore::new()),
        "2025-11-10",
        settings(true),
    );

    let events = runner
        .start_query(single("m-call", "2025-11-05"))
        .unwrap()
        .collect()
        .await;

    assert!(terminal(&events).error_report().unwrap().is_empty());
    assert_eq!(provider.calls().len(), 3);

    let positions: Vec<f64> = snapshot_of(&events).rows().map(|r| r.position).collect();
    assert_eq!(positions.len(), 3);
    assert_close(positions[0], -900.0);
    assert_close(positions[1], -600.0);
    assert_close(positions[2], -600.0);
}

#[tokio::test]
async fn unattempted_past_date_without_price_is_reported() {
    let runner = runner(
        sample_ledger(),
        Arc::new(ScriptedProvider::new().with_price("m2601", "2025-11-03", 3012.0)),
        Arc::new(MemoryStore::new()),
        "2025-11-10",
        settings(true),
    );

    let outcome = runner
        .start_query(single("m-call", "2025-11-05"))
        .unwrap()
        .wait()
        .await;

    assert_eq!(
        outcome.error_report().unwrap().dates("m-call"),
        vec![date("2025-11-04")]
    );
}

#[tokio::test]
async fn empty_ledger_yields_empty_aggregate() {
    let runner = runner(
        Default::default(),
        Arc::new(ScriptedProvider::new()),
        Arc::new(MemoryStore::new()),
        "2025-11-10",
        settings(true),
    );

    let events = runner
        .start_query(QueryRequest::new(Selection::All, date("2025-11-10")))
        .unwrap()
        .collect()
        .await;

    assert!(terminal(&events).is_success());
    assert_eq!(
        snapshot_of(&events),
        QuerySnapshot::Aggregate(AggregateSnapshot::default())
    );
}

#[tokio::test]
async fn keyword_without_match_emits_only_the_failure() {
    let store = Arc::new(MemoryStore::new());
    let runner = runner(
        sample_ledger(),
        Arc::new(ScriptedProvider::new()),
        store.clone(),
        "2025-11-10",
        settings(true),
    );

    let events = runner
        .start_query(QueryRequest::new(
            Selection::Keyword("corn".to_string()),
            date("2025-11-10"),
        ))
        .unwrap()
        .collect()
        .await;

    assert_eq!(
        events,
        vec![TaskEvent::Finished(TaskOutcome::Failed {
            message: "no option matches keyword 'corn'".to_string()
        })]
    );
    assert_eq!(store.saves(), 0);
    assert_eq!(*runner.ledger().read().await, sample_ledger());
}

#[tokio::test]
async fn unknown_option_fails() {
    let runner = runner(
        sample_ledger(),
        Arc::new(ScriptedProvider::new()),
        Arc::new(MemoryStore::new()),
        "2025-11-10",
        settings(true),
    );

    let outcome = runner
        .start_query(single("ghost", "2025-11-10"))
        .unwrap()
        .wait()
        .await;

    assert_eq!(
        outcome,
        TaskOutcome::Failed {
            message: "option not found: ghost".to_string()
        }
    );
}

#[tokio::test]
async fn cancelled_query_publishes_no_result() {
    let mut ledger = sample_ledger();
    mark_missing(&mut ledger, "m-call", "2025-11-03");
    mark_missing(&mut ledger, "m-call", "2025-11-04");
    let provider = Arc::new(GatedProvider::new(3100.0));
    let store = Arc::new(MemoryStore::new());
    let runner = runner(
        ledger,
        provider.clone(),
        store.clone(),
        "2025-11-10",
        settings(false),
    );

    let mut handle = runner.start_query(single("m-call", "2025-11-05")).unwrap();
    let mut seen = Vec::new();
    while let Some(event) = handle.next_event().await {
        let scanned = matches!(event, TaskEvent::Progress { percent: 30, .. });
        seen.push(event);
        if scanned {
            break;
        }
    }

    handle.cancel();
    while let Some(event) = handle.next_event().await {
        seen.push(event);
    }

    assert_eq!(terminal(&seen), TaskOutcome::Cancelled);
    assert!(!seen
        .iter()
        .any(|e| matches!(e, TaskEvent::ResultReady(_))));
    // only the save at the start of the query
    assert_eq!(store.saves(), 1);
}
