use crate::executors::{self, ResultSets};
use dbmsbench_analysis::{timer::SampleMap, Query, Timer, TimerKind};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fs, path::Path};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum IngestorError {
    #[error("Failed to access results")]
    Io(#[from] std::io::Error),
    #[error("Failed to (de)serialize results: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("Results contain query {0} which is not configured")]
    UnknownQuery(usize),
    #[error("Q{query} on {connection} has {found} runs, configured are {expected}")]
    RunMismatch {
        query: usize,
        connection: String,
        expected: usize,
        found: usize,
    },
}

/// Raw measurements of a finished benchmark as persisted on disk
///
/// Only samples are stored, statistics are recomputed when the results are
/// turned back into timers.
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct BenchmarkResults {
    /// query number -> timer -> connection -> samples
    pub times: BTreeMap<usize, BTreeMap<TimerKind, SampleMap>>,
    #[serde(default)]
    pub resultsets: ResultSets,
}

impl BenchmarkResults {
    pub fn from_timers(timers: &[Timer], resultsets: ResultSets) -> Self {
        let mut times = BTreeMap::<usize, BTreeMap<TimerKind, SampleMap>>::new();

        for timer in timers {
            for number in 1..=timer.num_queries() {
                if let Some(samples) = timer.samples(number) {
                    times
                        .entry(number)
                        .or_default()
                        .insert(timer.kind, samples.clone());
                }
            }
        }

        Self { times, resultsets }
    }

    pub fn load(path: &Path) -> Result<Self, IngestorError> {
        let content = fs::read_to_string(path)?;
        let results: Self = serde_yaml::from_str(&content)?;

        debug!("Loaded results of {} queries from {path:?}", results.times.len());

        Ok(results)
    }

    pub fn store(&self, path: &Path) -> Result<(), IngestorError> {
        fs::write(path, serde_yaml::to_string(self)?)?;

        info!("Stored results of {} queries in {path:?}", self.times.len());

        Ok(())
    }

    /// Rebuild all timers, `queries` must be the queries the results were measured with
    pub fn into_timers(&self, queries: &[Query]) -> Result<Vec<Timer>, IngestorError> {
        if let Some(number) = self
            .times
            .keys()
            .find(|number| **number == 0 || **number > queries.len())
        {
            return Err(IngestorError::UnknownQuery(*number));
        }

        let mut timers = executors::timers();

        for (index, query) in queries.iter().enumerate() {
            let number = index + 1;
            let measured = self.times.get(&number);

            for timer in timers.iter_mut() {
                let samples = measured
                    .and_then(|measured| measured.get(&timer.kind))
                    .cloned()
                    .unwrap_or_default();

                // skipped benchmarks are stored without any run
                if let Some((connection, runs)) = samples
                    .iter()
                    .find(|(_, runs)| !runs.is_empty() && runs.len() != query.num_run)
                {
                    return Err(IngestorError::RunMismatch {
                        query: number,
                        connection: connection.clone(),
                        expected: query.num_run,
                        found: runs.len(),
                    });
                }

                timer.append_times(samples, query);
            }
        }

        Ok(timers)
    }
}
