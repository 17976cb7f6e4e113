use super::ExperimentConfig;
use dbmsbench_analysis::{BenchmarkContext, Factor};

const EXPERIMENT: &str = "
connections:
  - name: postgres
    alias: SQL
    exec: /usr/bin/psql
  - name: mysql
    alias: SQL
    active: false
queries:
  - query: select count(*) from lineitem
    numRun: 3
    numWarmup: 1
  - title: both
    queryList: [1]
template:
  timer:
    datatransfer:
      active: true
factor: median
anonymize: true
";

fn parse(yaml: &str) -> ExperimentConfig {
    serde_yaml::from_str(yaml).unwrap()
}

#[test]
pub fn parse_and_build() {
    let config = parse(EXPERIMENT);
    assert!(!config.preflight_checks());
    assert_eq!(config.factor, Factor::Median);
    assert_eq!(config.timeout, 60);
    assert_eq!(config.connections[1].version, "-");

    let mut context = BenchmarkContext::new(config.anonymize);
    let experiment = config.build(&mut context).unwrap();

    assert_eq!(experiment.queries.len(), 2);
    assert_eq!(experiment.queries[0].warmup, 1);
    assert!(experiment.queries[0].with_data);
    assert!(experiment.queries[1].is_composite());
    assert!(!experiment.connections[1].active);
    assert_eq!(context.registry().display_name("postgres"), "SQL A");
    assert_eq!(context.registry().display_name("mysql"), "SQL B");
    assert!(experiment.settings["postgres"].exec.is_some());
}

#[test]
pub fn preflight_finds_errors() {
    let config = parse(
        "
connections:
  - name: postgres
  - name: postgres
queries:
  - title: nothing to run
  - queryList: [5]
timeout: 0
",
    );

    assert!(config.preflight_checks());
}

#[test]
pub fn invalid_query_fails_build() {
    let config = parse(
        "
connections:
  - name: postgres
queries:
  - query: select 1
    numRun: 2
    numWarmup: 3
",
    );
    let mut context = BenchmarkContext::new(false);

    assert!(config.build(&mut context).is_err());
}

#[test]
pub fn unknown_keys_are_rejected() {
    assert!(serde_yaml::from_str::<ExperimentConfig>(
        "connections: []\nqueries: []\nfactors: mean"
    )
    .is_err());
}
