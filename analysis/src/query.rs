use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::{collections::BTreeMap, fmt, ops::Range, str::FromStr};
use thiserror::Error;
use tracing::debug;

/// Number of runs used when a query does not configure any
pub const DEFAULT_NUM_RUN: usize = 5;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum QueryError {
    #[error("Query neither defines a query string nor a query list")]
    MissingQuery,
    #[error("Warmup ({warmup}) and cooldown ({cooldown}) exceed the number of runs ({num_run})")]
    InvalidRunPartition {
        num_run: usize,
        warmup: usize,
        cooldown: usize,
    },
    #[error("Unknown timer kind `{0}`")]
    UnknownTimer(String),
}

/// Named categories of duration measurement
#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TimerKind {
    Connection,
    Execution,
    #[serde(rename = "datatransfer")]
    DataTransfer,
    Run,
    Session,
}

impl TimerKind {
    pub const ALL: [TimerKind; 5] = [
        TimerKind::Connection,
        TimerKind::Execution,
        TimerKind::DataTransfer,
        TimerKind::Run,
        TimerKind::Session,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Connection => "connection",
            Self::Execution => "execution",
            Self::DataTransfer => "datatransfer",
            Self::Run => "run",
            Self::Session => "session",
        }
    }
}

impl fmt::Display for TimerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TimerKind {
    type Err = QueryError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name() == name)
            .ok_or_else(|| QueryError::UnknownTimer(name.to_string()))
    }
}

/// Recursive merge where values of `other` win over values of `self`
pub trait Merge {
    fn merge(&mut self, other: &Self);
}

impl<T: Clone> Merge for Option<T> {
    fn merge(&mut self, other: &Self) {
        if other.is_some() {
            self.clone_from(other);
        }
    }
}

/// merge nested yaml mappings key by key, everything else is replaced outright
pub fn merge_value(target: &mut Value, other: &Value) {
    match (target, other) {
        (Value::Mapping(target), Value::Mapping(other)) => {
            for (key, value) in other {
                match target.get_mut(key) {
                    Some(existing) => merge_value(existing, value),
                    None => {
                        target.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        (target, other) => *target = other.clone(),
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(untagged)]
/// Raw `store` setting of the data transfer timer
pub enum StoreSetting {
    Flag(bool),
    Format(String),
    Formats(Vec<String>),
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ConnectionTimerConfig {
    pub active: Option<bool>,
    /// delay before connecting in seconds
    pub delay: Option<f64>,
}

impl Merge for ConnectionTimerConfig {
    fn merge(&mut self, other: &Self) {
        self.active.merge(&other.active);
        self.delay.merge(&other.delay);
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct DataTransferConfig {
    pub active: Option<bool>,
    pub compare: Option<String>,
    pub precision: Option<u32>,
    pub sorted: Option<bool>,
    pub store: Option<StoreSetting>,
}

impl Merge for DataTransferConfig {
    fn merge(&mut self, other: &Self) {
        self.active.merge(&other.active);
        self.compare.merge(&other.compare);
        self.precision.merge(&other.precision);
        self.sorted.merge(&other.sorted);
        self.store.merge(&other.store);
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ExecutionTimerConfig {
    pub active: Option<bool>,
}

impl Merge for ExecutionTimerConfig {
    fn merge(&mut self, other: &Self) {
        self.active.merge(&other.active);
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct TimerConfig {
    pub connection: Option<ConnectionTimerConfig>,
    pub execution: Option<ExecutionTimerConfig>,
    pub datatransfer: Option<DataTransferConfig>,
}

// nested sections merge field by field instead of being replaced
fn merge_section<T: Merge + Clone>(target: &mut Option<T>, other: &Option<T>) {
    match (target.as_mut(), other) {
        (Some(target), Some(other)) => target.merge(other),
        (None, Some(other)) => *target = Some(other.clone()),
        (_, None) => {}
    }
}

impl Merge for TimerConfig {
    fn merge(&mut self, other: &Self) {
        merge_section(&mut self.connection, &other.connection);
        merge_section(&mut self.execution, &other.execution);
        merge_section(&mut self.datatransfer, &other.datatransfer);
    }
}

/// Query configuration as read from an experiment file
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct QueryConfig {
    pub query: Option<String>,
    pub num_run: Option<usize>,
    pub num_parallel: Option<usize>,
    pub num_warmup: Option<usize>,
    pub num_cooldown: Option<usize>,
    /// delay between runs in seconds
    pub delay: Option<f64>,
    pub active: Option<bool>,
    pub title: Option<String>,
    /// query strings replacing `query` for single connections
    #[serde(rename = "DBMS")]
    pub dbms: Option<BTreeMap<String, String>>,
    pub parameter: Option<BTreeMap<String, Value>>,
    pub timer: Option<TimerConfig>,
    /// 1-based numbers of the queries this composite query consists of
    pub query_list: Option<Vec<usize>>,
}

impl Merge for QueryConfig {
    fn merge(&mut self, other: &Self) {
        self.query.merge(&other.query);
        self.num_run.merge(&other.num_run);
        self.num_parallel.merge(&other.num_parallel);
        self.num_warmup.merge(&other.num_warmup);
        self.num_cooldown.merge(&other.num_cooldown);
        self.delay.merge(&other.delay);
        self.active.merge(&other.active);
        self.title.merge(&other.title);

        if let Some(other_dbms) = &other.dbms {
            self.dbms
                .get_or_insert_with(BTreeMap::new)
                .extend(other_dbms.iter().map(|(k, v)| (k.clone(), v.clone())));
        }

        if let Some(other_parameter) = &other.parameter {
            let parameter = self.parameter.get_or_insert_with(BTreeMap::new);

            for (key, value) in other_parameter {
                match parameter.get_mut(key) {
                    Some(existing) => merge_value(existing, value),
                    None => {
                        parameter.insert(key.clone(), value.clone());
                    }
                }
            }
        }

        merge_section(&mut self.timer, &other.timer);
        self.query_list.merge(&other.query_list);
    }
}

#[derive(Serialize, Clone, Debug, Default, PartialEq, Eq)]
/// Formats a fetched result set is persisted in
pub enum ResultSetStore {
    #[default]
    None,
    All,
    Formats(Vec<String>),
}

#[derive(Serialize, Clone, Debug, Default, PartialEq)]
/// How fetched result rows are handled
pub struct ResultPolicy {
    pub compare: Option<String>,
    pub precision: Option<u32>,
    pub sorted: bool,
    pub store: ResultSetStore,
    /// result rows have to be kept in memory after fetching
    pub store_data: bool,
}

impl ResultPolicy {
    fn from_config(config: &DataTransferConfig) -> Self {
        let mut policy = Self::default();

        if let Some(compare) = config.compare.as_ref().filter(|compare| !compare.is_empty()) {
            policy.compare = Some(compare.clone());
            policy.store_data = true;
        }
        if let Some(precision) = config.precision {
            policy.precision = Some(precision);
            policy.store_data = true;
        }
        if config.sorted == Some(true) {
            policy.sorted = true;
            policy.store_data = true;
        }

        policy.store = match &config.store {
            None | Some(StoreSetting::Flag(false)) => ResultSetStore::None,
            Some(StoreSetting::Flag(true)) => ResultSetStore::All,
            Some(StoreSetting::Format(format)) => ResultSetStore::Formats(vec![format.clone()]),
            Some(StoreSetting::Formats(formats)) => ResultSetStore::Formats(formats.clone()),
        };
        if policy.store_result_set() {
            policy.store_data = true;
        }

        policy
    }

    pub fn store_result_set(&self) -> bool {
        self.store != ResultSetStore::None
    }
}

#[derive(Serialize, Clone, Debug, PartialEq)]
/// Canonical execution contract of one configured query
pub struct Query {
    pub text: Option<String>,
    pub title: String,
    pub num_run: usize,
    pub num_parallel: usize,
    pub warmup: usize,
    pub cooldown: usize,
    /// delay between runs in seconds
    pub delay_run: f64,
    /// delay before connecting in seconds
    pub delay_connect: f64,
    pub active: bool,
    pub dbms: BTreeMap<String, String>,
    pub parameter: BTreeMap<String, Value>,
    pub timers: BTreeMap<TimerKind, bool>,
    /// result rows must be fetched
    pub with_data: bool,
    pub with_connect: bool,
    pub result: ResultPolicy,
    pub query_list: Vec<usize>,
}

impl Query {
    /// Resolve `config` into a query, `template` is merged over it and wins on conflicts
    pub fn new(config: &QueryConfig, template: Option<&QueryConfig>) -> Result<Self, QueryError> {
        let mut config = config.clone();
        if let Some(template) = template {
            config.merge(template);
        }

        let query_list = config.query_list.unwrap_or_default();
        if config.query.is_none() && query_list.is_empty() {
            return Err(QueryError::MissingQuery);
        }

        let num_run = match config.num_run {
            None | Some(0) => DEFAULT_NUM_RUN,
            Some(num_run) => num_run,
        };
        let warmup = config.num_warmup.unwrap_or(0);
        let cooldown = config.num_cooldown.unwrap_or(0);
        if warmup + cooldown > num_run {
            return Err(QueryError::InvalidRunPartition {
                num_run,
                warmup,
                cooldown,
            });
        }

        let timer = config.timer.unwrap_or_default();
        let connection = timer.connection.unwrap_or_default();
        let datatransfer = timer.datatransfer.unwrap_or_default();
        let execution = timer.execution.unwrap_or_default();

        let with_connect = connection.active.unwrap_or(false);
        let with_data = datatransfer.active.unwrap_or(false);

        let timers = BTreeMap::from([
            (TimerKind::Connection, with_connect),
            (TimerKind::Execution, execution.active.unwrap_or(true)),
            (TimerKind::DataTransfer, with_data),
            (TimerKind::Run, true),
            (TimerKind::Session, true),
        ]);

        let query = Self {
            text: config.query,
            title: config.title.unwrap_or_default(),
            num_run,
            num_parallel: config.num_parallel.unwrap_or(1),
            warmup,
            cooldown,
            delay_run: config.delay.unwrap_or(0.0),
            delay_connect: connection.delay.unwrap_or(0.0),
            active: config.active.unwrap_or(true),
            dbms: config.dbms.unwrap_or_default(),
            parameter: config.parameter.unwrap_or_default(),
            timers,
            with_data,
            with_connect,
            result: ResultPolicy::from_config(&datatransfer),
            query_list,
        };

        debug!(
            title = %query.title,
            num_run = query.num_run,
            warmup = query.warmup,
            cooldown = query.cooldown,
            "Resolved query"
        );

        Ok(query)
    }

    /// first run that counts for statistics
    pub fn num_run_begin(&self) -> usize {
        self.warmup
    }

    /// first run after the measured window
    pub fn num_run_end(&self) -> usize {
        self.num_run - self.cooldown
    }

    /// runs that count for statistics, excluding warmup and cooldown
    pub fn run_window(&self) -> Range<usize> {
        self.num_run_begin()..self.num_run_end()
    }

    pub fn measured_runs(&self) -> usize {
        self.num_run_end() - self.num_run_begin()
    }

    pub fn is_timer_active(&self, kind: TimerKind) -> bool {
        self.timers.get(&kind).copied().unwrap_or(false)
    }

    /// query text for a connection, connection specific text takes precedence
    pub fn text_for(&self, connection: &str) -> Option<&str> {
        self.dbms
            .get(connection)
            .or(self.text.as_ref())
            .map(String::as_str)
    }

    pub fn is_composite(&self) -> bool {
        !self.query_list.is_empty()
    }
}

#[cfg(test)]
mod query_test;
