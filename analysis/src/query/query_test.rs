use super::{Query, QueryConfig, QueryError, ResultSetStore, TimerKind, DEFAULT_NUM_RUN};
use std::str::FromStr;

fn parse(yaml: &str) -> QueryConfig {
    serde_yaml::from_str(yaml).unwrap()
}

#[test]
pub fn default_run_count() {
    let query = Query::new(&parse("query: select 1\nnumRun: 0"), None).unwrap();
    assert_eq!(query.num_run, DEFAULT_NUM_RUN);

    let query = Query::new(&parse("query: select 1"), None).unwrap();
    assert_eq!(query.num_run, DEFAULT_NUM_RUN);
}

#[test]
pub fn run_window_slices_warmup_and_cooldown() {
    let query = Query::new(
        &parse("query: select 1\nnumRun: 5\nnumWarmup: 1\nnumCooldown: 1"),
        None,
    )
    .unwrap();
    let samples = [10.0, 11.0, 12.0, 13.0, 14.0];

    assert_eq!(query.num_run_begin(), 1);
    assert_eq!(query.num_run_end(), 4);
    assert_eq!(query.measured_runs(), 3);
    assert_eq!(&samples[query.run_window()], &[11.0, 12.0, 13.0]);
}

#[test]
pub fn missing_query_is_rejected() {
    assert_eq!(
        Query::new(&parse("title: nothing"), None),
        Err(QueryError::MissingQuery)
    );

    let composite = Query::new(&parse("queryList: [1, 2]"), None).unwrap();
    assert!(composite.is_composite());
}

#[test]
pub fn oversized_partition_is_rejected() {
    assert!(matches!(
        Query::new(
            &parse("query: select 1\nnumRun: 2\nnumWarmup: 2\nnumCooldown: 1"),
            None
        ),
        Err(QueryError::InvalidRunPartition { .. })
    ));
}

#[test]
pub fn template_wins_and_merges_recursively() {
    let config = parse(
        "query: select 1
numRun: 3
title: mine
timer:
  datatransfer:
    active: true
    sorted: true
  connection:
    delay: 1.5",
    );
    let template = parse(
        "numRun: 10
timer:
  datatransfer:
    store: [csv, dataframe]
  connection:
    active: true",
    );

    let query = Query::new(&config, Some(&template)).unwrap();

    assert_eq!(query.num_run, 10);
    assert_eq!(query.title, "mine");
    assert!(query.with_data);
    assert!(query.with_connect);
    assert_eq!(query.delay_connect, 1.5);
    assert!(query.result.sorted);
    assert_eq!(
        query.result.store,
        ResultSetStore::Formats(vec!["csv".into(), "dataframe".into()])
    );
    assert!(query.result.store_data);
}

#[test]
pub fn parameter_mappings_merge_deeply() {
    let config = parse(
        "query: select 1
parameter:
  x:
    type: integer
    range: [1, 2]",
    );
    let template = parse(
        "parameter:
  x:
    range: [5, 6]",
    );

    let query = Query::new(&config, Some(&template)).unwrap();
    let x = &query.parameter["x"];

    assert_eq!(x["type"].as_str(), Some("integer"));
    assert_eq!(x["range"][0].as_u64(), Some(5));
}

#[test]
pub fn store_triggers_are_independent_of_store_format() {
    let compare = Query::new(
        &parse("query: q\ntimer:\n  datatransfer:\n    active: true\n    compare: result"),
        None,
    )
    .unwrap();
    assert!(compare.result.store_data);
    assert!(!compare.result.store_result_set());

    let all = Query::new(
        &parse("query: q\ntimer:\n  datatransfer:\n    store: true"),
        None,
    )
    .unwrap();
    assert_eq!(all.result.store, ResultSetStore::All);
    assert!(all.result.store_data);

    let single = Query::new(
        &parse("query: q\ntimer:\n  datatransfer:\n    store: csv"),
        None,
    )
    .unwrap();
    assert_eq!(single.result.store, ResultSetStore::Formats(vec!["csv".into()]));

    let none = Query::new(
        &parse("query: q\ntimer:\n  datatransfer:\n    store: false\n    precision: 2"),
        None,
    )
    .unwrap();
    assert_eq!(none.result.store, ResultSetStore::None);
    assert_eq!(none.result.precision, Some(2));
    assert!(none.result.store_data);
}

#[test]
pub fn active_timers() {
    let query = Query::new(&parse("query: q"), None).unwrap();

    assert!(!query.is_timer_active(TimerKind::Connection));
    assert!(!query.is_timer_active(TimerKind::DataTransfer));
    assert!(query.is_timer_active(TimerKind::Execution));
    assert!(query.is_timer_active(TimerKind::Run));
    assert!(query.is_timer_active(TimerKind::Session));
    assert!(!query.with_data);
    assert!(!query.result.store_data);
}

#[test]
pub fn connection_specific_text() {
    let query = Query::new(
        &parse("query: select 1\nDBMS:\n  postgres: select 1::int"),
        None,
    )
    .unwrap();

    assert_eq!(query.text_for("postgres"), Some("select 1::int"));
    assert_eq!(query.text_for("mysql"), Some("select 1"));
}

#[test]
pub fn unknown_keys_are_rejected() {
    assert!(serde_yaml::from_str::<QueryConfig>("query: q\nnumRuns: 3").is_err());
}

#[test]
pub fn timer_kind_names() {
    for kind in TimerKind::ALL {
        assert_eq!(TimerKind::from_str(kind.name()), Ok(kind));
    }
    assert!(TimerKind::from_str("transfer").is_err());
}
