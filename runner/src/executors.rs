pub mod local;

use crate::config::{ConfigErrors, Experiment};
use dbmsbench_analysis::{Timer, TimerError, TimerKind};
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExecutorError {
    #[error("Connection {0} has no exec to run queries with")]
    MissingConnectivity(String),
    #[error("Exec of connection {0} is not executable")]
    NotExecutable(String),
    #[error("Failed to check exec: {0}")]
    Config(#[from] ConfigErrors),
    #[error("Timer protocol violated: {0}")]
    Timer(#[from] TimerError),
}

/// map of query number -> connection -> fetched result rows
pub type ResultSets = BTreeMap<usize, BTreeMap<String, Vec<String>>>;

/// All timers a run is measured with
///
/// `run` and `session` overlap the other timers and are not stackable,
/// `session` additionally covers warmup and cooldown.
pub fn timers() -> Vec<Timer> {
    TimerKind::ALL
        .into_iter()
        .map(|kind| match kind {
            TimerKind::Run => Timer::new(kind).with_flags(false, true),
            TimerKind::Session => Timer::new(kind).with_flags(false, false),
            _ => Timer::new(kind),
        })
        .collect()
}

#[derive(Debug)]
pub enum Executors {
    Local(local::LocalExecutor),
}

impl Executors {
    pub fn load(experiment: &Experiment) -> Result<Self, ExecutorError> {
        Ok(Self::Local(local::LocalExecutor::load(experiment)?))
    }

    pub fn execute(
        &mut self,
        experiment: &Experiment,
        timers: &mut [Timer],
    ) -> Result<ResultSets, ExecutorError> {
        match self {
            Self::Local(executor) => executor.execute(experiment, timers),
        }
    }
}
