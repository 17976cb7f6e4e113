use crate::{
    query::{Query, TimerKind},
    registry::IdentityRegistry,
    stats::{Statistics, STATS_HEADER},
    table::Table,
};
use itertools::Itertools;
use std::{
    collections::BTreeMap,
    ops::Range,
    time::{Duration, Instant},
};
use thiserror::Error;
use tracing::{debug, info};

/// map of connection -> samples of all runs (milliseconds)
pub type SampleMap = BTreeMap<String, Vec<f64>>;
/// map of connection -> statistics
pub type StatisticsMap = BTreeMap<String, Statistics>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TimerError {
    #[error("Timer {0} has no connection selected")]
    NoConnection(String),
    #[error("Timer {0} has no run in progress")]
    NoRun(String),
    #[error("Timer {0} got query 0, queries are numbered from 1")]
    QueryZero(String),
}

#[derive(Debug, Clone, Copy, PartialEq)]
/// Outcome of a single run
pub enum Sample {
    Measured(f64),
    Failed,
}

impl Sample {
    /// milliseconds, failed runs are reported as zero
    pub fn millis(&self) -> f64 {
        match self {
            Self::Measured(millis) => *millis,
            Self::Failed => 0.0,
        }
    }
}

/// milliseconds with sub-millisecond precision
fn as_millis(duration: Duration) -> f64 {
    duration.as_nanos() as f64 / 1_000_000.0
}

#[derive(Debug, Clone)]
/// runs of the (query, connection) pair currently being benchmarked
struct Staging {
    query: usize,
    connection: String,
    num_run: usize,
    window: Range<usize>,
    samples: Vec<Sample>,
    run_start: Option<Instant>,
}

/// Container of timing samples for one kind of measurement
///
/// Samples are kept as query -> connection -> run. Use it by
/// - looping over queries
/// - looping over connections: `begin`
/// - looping over runs: `begin_run` and `end_run` / `abort_run`
/// - finishing the connection: optionally `abort` / `cancel`, then `commit`
///
/// Nothing is visible in the per query maps before `commit`.
#[derive(Debug, Clone)]
pub struct Timer {
    pub kind: TimerKind,
    /// values of this timer may be summed up with other stackable timers
    pub stackable: bool,
    /// statistics respect warmup and cooldown
    pub per_run: bool,
    times: Vec<SampleMap>,
    stats: Vec<StatisticsMap>,
    staging: Option<Staging>,
}

impl Timer {
    pub fn new(kind: TimerKind) -> Self {
        Self {
            kind,
            stackable: true,
            per_run: true,
            times: Vec::new(),
            stats: Vec::new(),
            staging: None,
        }
    }

    pub fn with_flags(mut self, stackable: bool, per_run: bool) -> Self {
        self.stackable = stackable;
        self.per_run = per_run;
        self
    }

    pub fn name(&self) -> &'static str {
        self.kind.name()
    }

    /// drop all samples and statistics
    pub fn clear(&mut self) {
        self.times.clear();
        self.stats.clear();
        self.staging = None;
    }

    pub fn num_queries(&self) -> usize {
        self.times.len()
    }

    // 0-based index of the 1-based `query_index`
    fn query_position(&self, query_index: usize) -> Result<usize, TimerError> {
        query_index
            .checked_sub(1)
            .ok_or_else(|| TimerError::QueryZero(self.name().to_string()))
    }

    // make sure the 0-based `index` has backing maps
    fn ensure_query(&mut self, index: usize) {
        while self.times.len() <= index {
            self.times.push(SampleMap::new());
            self.stats.push(StatisticsMap::new());
        }
    }

    fn staging_mut(&mut self) -> Result<&mut Staging, TimerError> {
        let name = self.name();

        self.staging
            .as_mut()
            .ok_or_else(|| TimerError::NoConnection(name.to_string()))
    }

    /// Select the 1-based `query_index` and `connection` for the following runs
    pub fn begin(
        &mut self,
        query_index: usize,
        query: &Query,
        connection: &str,
    ) -> Result<(), TimerError> {
        let index = self.query_position(query_index)?;
        self.ensure_query(index);

        if self.times[index].contains_key(connection) {
            debug!(
                timer = self.name(),
                query = query_index,
                connection = connection,
                "Benchmark has already been done and will be overwritten"
            );
        }

        self.staging = Some(Staging {
            query: index,
            connection: connection.to_string(),
            num_run: query.num_run,
            window: query.run_window(),
            samples: Vec::with_capacity(query.num_run),
            run_start: None,
        });

        Ok(())
    }

    pub fn begin_run(&mut self) -> Result<(), TimerError> {
        self.staging_mut()?.run_start = Some(Instant::now());

        Ok(())
    }

    /// finish the current run and return its duration in milliseconds
    pub fn end_run(&mut self) -> Result<f64, TimerError> {
        let name = self.name();
        let staging = self.staging_mut()?;
        let start = staging
            .run_start
            .take()
            .ok_or_else(|| TimerError::NoRun(name.to_string()))?;
        let millis = as_millis(start.elapsed());

        staging.samples.push(Sample::Measured(millis));

        Ok(millis)
    }

    /// finish the current run as failed, its duration is reported as zero
    pub fn abort_run(&mut self) -> Result<f64, TimerError> {
        let staging = self.staging_mut()?;
        staging.run_start = None;
        staging.samples.push(Sample::Failed);

        Ok(0.0)
    }

    /// record a run timed by the caller
    pub fn record(&mut self, elapsed: Duration) -> Result<f64, TimerError> {
        let millis = as_millis(elapsed);
        self.staging_mut()?.samples.push(Sample::Measured(millis));

        Ok(millis)
    }

    /// record a failed run timed by the caller
    pub fn record_failure(&mut self) -> Result<(), TimerError> {
        self.staging_mut()?.samples.push(Sample::Failed);

        Ok(())
    }

    /// runs recorded for the current connection so far
    pub fn staged_runs(&self) -> usize {
        self.staging
            .as_ref()
            .map(|staging| staging.samples.len())
            .unwrap_or(0)
    }

    /// every run of the current connection failed, none was executed
    pub fn cancel(&mut self) -> Result<(), TimerError> {
        let staging = self.staging_mut()?;
        staging.samples = vec![Sample::Failed; staging.num_run];

        Ok(())
    }

    /// the remaining runs of the current connection failed
    pub fn abort(&mut self) -> Result<(), TimerError> {
        let staging = self.staging_mut()?;
        let missing = staging.num_run.saturating_sub(staging.samples.len());
        staging
            .samples
            .extend(std::iter::repeat(Sample::Failed).take(missing));

        Ok(())
    }

    fn compute_stats(&self, samples: &[f64], window: &Range<usize>) -> Statistics {
        if self.per_run {
            let end = window.end.min(samples.len());
            let start = window.start.min(end);

            Statistics::compute(&samples[start..end])
        } else {
            Statistics::compute(samples)
        }
    }

    /// Publish the samples of the current connection and return their statistics
    pub fn commit(&mut self) -> Result<Statistics, TimerError> {
        let staging = self
            .staging
            .take()
            .ok_or_else(|| TimerError::NoConnection(self.name().to_string()))?;

        let samples = staging.samples.iter().map(Sample::millis).collect_vec();
        let stats = self.compute_stats(&samples, &staging.window);

        self.times[staging.query].insert(staging.connection.clone(), samples);
        self.stats[staging.query].insert(staging.connection.clone(), stats);

        info!(
            timer = self.name(),
            query = staging.query + 1,
            connection = %staging.connection,
            mean = stats.mean,
            "Benchmark has been stored"
        );

        Ok(stats)
    }

    /// Record a (query, connection) pair that was never attempted, existing samples are kept
    pub fn skip(
        &mut self,
        query_index: usize,
        _query: &Query,
        connection: &str,
    ) -> Result<(), TimerError> {
        let index = self.query_position(query_index)?;
        self.ensure_query(index);

        self.times[index]
            .entry(connection.to_string())
            .or_default();
        self.stats[index]
            .entry(connection.to_string())
            .or_default();

        debug!(
            timer = self.name(),
            query = query_index,
            connection = connection,
            "Skipped benchmark"
        );

        Ok(())
    }

    /// Append complete samples of the next query, e.g. reloaded from disk
    pub fn append_times(&mut self, times: SampleMap, query: &Query) {
        let window = query.run_window();
        let stats = times
            .iter()
            .map(|(connection, samples)| (connection.clone(), self.compute_stats(samples, &window)))
            .collect();

        self.times.push(times);
        self.stats.push(stats);
    }

    /// samples are present for the 1-based `query_index` (and `connection`)
    pub fn has_results(&self, query_index: usize, connection: Option<&str>) -> bool {
        query_index >= 1
            && self.times.len() >= query_index
            && connection.map_or(true, |connection| {
                self.times[query_index - 1].contains_key(connection)
            })
    }

    /// samples are present and at least one of them is not zero
    pub fn has_successful_results(&self, query_index: usize, connection: Option<&str>) -> bool {
        if !self.has_results(query_index, connection) {
            return false;
        }

        let times = &self.times[query_index - 1];
        match connection {
            Some(connection) => !times[connection].iter().all(|value| *value == 0.0),
            None => !times.values().flatten().all(|value| *value == 0.0),
        }
    }

    pub fn samples(&self, query_index: usize) -> Option<&SampleMap> {
        query_index.checked_sub(1).and_then(|index| self.times.get(index))
    }

    pub fn statistics(&self, query_index: usize) -> Option<&StatisticsMap> {
        query_index.checked_sub(1).and_then(|index| self.stats.get(index))
    }

    /// Samples of a query, one row per connection and one column per run
    pub fn samples_table(&self, query_index: usize, registry: &IdentityRegistry) -> Table {
        let Some(times) = self.samples(query_index) else {
            return Table::empty();
        };
        let runs = times.values().map(Vec::len).max().unwrap_or(0);
        let mut table = Table::new(STATS_HEADER[0], (0..runs).map(|run| run.to_string()).collect());

        for (connection, samples) in times {
            let mut values = samples.clone();
            values.resize(runs, 0.0);
            table.push_row(registry.display_name(connection), values);
        }

        table
    }

    /// Statistics of a query, one row per connection, columns as in `STATS_HEADER`
    pub fn stats_table(&self, query_index: usize, registry: &IdentityRegistry) -> Table {
        let Some(stats) = self.statistics(query_index) else {
            return Table::empty();
        };
        let mut table = Table::new(
            STATS_HEADER[0],
            STATS_HEADER[1..].iter().map(|column| column.to_string()).collect(),
        );

        for (connection, stats) in stats {
            table.push_row(registry.display_name(connection), stats.values().to_vec());
        }

        if table.is_empty() {
            debug!(timer = self.name(), query = query_index, "no values");
        }

        table
    }
}
