use super::{ExecutorError, ResultSets};
use crate::{
    config::{check_executable, Experiment},
    resultset,
};
use dbmsbench_analysis::{format::format_size, Query, Timer, TimerKind};
use itertools::Itertools;
use std::{
    collections::BTreeMap,
    io::{self, Read, Write},
    path::PathBuf,
    process::{Child, Command, Stdio},
    thread,
    time::{Duration, Instant},
};
use tracing::{debug, error, info, instrument, trace, warn};
use wait_timeout::ChildExt;

#[derive(Debug)]
enum RunError {
    // the exec could not be started, no further run will succeed
    Spawn(io::Error),
    Io(io::Error),
    Timeout,
    Status(Option<i32>),
}

// stop `child` if it is still running and collect its exit status
fn reap(child: &mut Child) {
    if let Err(e) = child.kill() {
        trace!("Child {} already exited: {e}", child.id());
    }
    if let Err(e) = child.wait() {
        warn!("Failed to wait for child {}: {e}", child.id());
    }
}

#[derive(Debug, Default)]
struct RunOutput {
    connection: Duration,
    execution: Duration,
    datatransfer: Duration,
    rows: Vec<String>,
    bytes: usize,
}

impl RunOutput {
    fn elapsed(&self, kind: TimerKind, session: Duration) -> Duration {
        match kind {
            TimerKind::Connection => self.connection,
            TimerKind::Execution => self.execution,
            TimerKind::DataTransfer => self.datatransfer,
            TimerKind::Run => self.connection + self.execution + self.datatransfer,
            TimerKind::Session => session,
        }
    }
}

#[derive(Debug, Clone)]
struct Endpoint {
    exec: PathBuf,
    params: Vec<String>,
}

/// Executor that runs every query through a local command per connection
///
/// The command receives the query text on stdin and prints one result row per
/// line on stdout. Starting the command counts as connecting, waiting for it as
/// execution and draining its remaining output as data transfer.
#[derive(Debug)]
pub struct LocalExecutor {
    endpoints: BTreeMap<String, Endpoint>,
    timeout: Duration,
}

impl LocalExecutor {
    pub fn load(experiment: &Experiment) -> Result<Self, ExecutorError> {
        let mut endpoints = BTreeMap::new();

        for connection in experiment.connections.iter().filter(|c| c.active) {
            let exec = experiment
                .settings
                .get(&connection.name)
                .and_then(|settings| settings.exec.as_ref().map(|exec| (exec, settings)))
                .ok_or_else(|| ExecutorError::MissingConnectivity(connection.name.clone()));
            let (exec, settings) = exec?;

            if !check_executable(exec)? {
                return Err(ExecutorError::NotExecutable(connection.name.clone()));
            }

            debug!(
                connection = %connection.name,
                version = %settings.version,
                info = %settings.info,
                processes = settings.num_processes,
                "Loaded connection"
            );

            endpoints.insert(
                connection.name.clone(),
                Endpoint {
                    exec: exec.clone(),
                    params: settings.params.clone(),
                },
            );
        }

        Ok(Self {
            endpoints,
            timeout: Duration::from_secs(experiment.timeout),
        })
    }

    // statements sent for `query`, composite queries send their parts in order
    fn statements(experiment: &Experiment, query: &Query, connection: &str) -> Vec<String> {
        if query.is_composite() {
            query
                .query_list
                .iter()
                .filter_map(|number| number.checked_sub(1))
                .filter_map(|index| experiment.queries.get(index))
                .filter_map(|part| part.text_for(connection))
                .map(String::from)
                .collect()
        } else {
            query.text_for(connection).map(String::from).into_iter().collect()
        }
    }

    // feed the query and wait for the command, the child is left to the caller on error
    fn communicate(&self, child: &mut Child, input: &str) -> Result<(Instant, String), RunError> {
        // drain stdout concurrently, a full pipe would block the child
        let reader = child.stdout.take().map(|mut stdout| {
            thread::spawn(move || {
                let mut buffer = String::new();
                stdout.read_to_string(&mut buffer).map(|_| buffer)
            })
        });

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(input.as_bytes()).map_err(RunError::Io)?;
            // closing stdin marks the end of the query
        }

        let status = child
            .wait_timeout(self.timeout)
            .map_err(RunError::Io)?
            .ok_or(RunError::Timeout)?;
        let executed = Instant::now();

        let output = match reader {
            Some(reader) => reader
                .join()
                .map_err(|_| {
                    RunError::Io(io::Error::new(
                        io::ErrorKind::Other,
                        "Reader of command output panicked",
                    ))
                })?
                .map_err(RunError::Io)?,
            None => String::new(),
        };

        if !status.success() {
            return Err(RunError::Status(status.code()));
        }

        Ok((executed, output))
    }

    fn run(&self, endpoint: &Endpoint, input: &str, fetch: bool) -> Result<RunOutput, RunError> {
        let start = Instant::now();
        let mut child = Command::new(&endpoint.exec)
            .args(endpoint.params.iter())
            .stdin(Stdio::piped())
            .stdout(if fetch { Stdio::piped() } else { Stdio::null() })
            .stderr(Stdio::null())
            .spawn()
            .map_err(RunError::Spawn)?;
        let connected = Instant::now();

        let (executed, output) = self.communicate(&mut child, input).map_err(|e| {
            reap(&mut child);
            e
        })?;
        let transferred = Instant::now();

        trace!("Output: {output}");

        Ok(RunOutput {
            connection: connected - start,
            execution: executed - connected,
            datatransfer: transferred - executed,
            bytes: output.len(),
            rows: output.lines().map(String::from).collect(),
        })
    }

    /// Run all queries against all connections and record every run in `timers`
    #[instrument(skip_all, level = "info")]
    pub fn execute(
        &mut self,
        experiment: &Experiment,
        timers: &mut [Timer],
    ) -> Result<ResultSets, ExecutorError> {
        let mut result_sets = ResultSets::new();
        let total = experiment.queries.len() * experiment.connections.len();
        let mut processed = 0;

        for (index, query) in experiment.queries.iter().enumerate() {
            let number = index + 1;

            for connection in experiment.connections.iter() {
                processed += 1;

                let endpoint = self.endpoints.get(&connection.name);
                let statements = Self::statements(experiment, query, &connection.name);
                let endpoint = match endpoint {
                    Some(endpoint) if query.active && !statements.is_empty() => endpoint,
                    _ => {
                        debug!(query = number, connection = %connection.name, "Skip benchmark");
                        for timer in timers.iter_mut() {
                            timer.skip(number, query, &connection.name)?;
                        }
                        continue;
                    }
                };

                info!(
                    "Benchmark Q{number} ({}) on {} [{processed}/{total}]",
                    query.title, connection.name
                );

                for timer in timers.iter_mut() {
                    timer.begin(number, query, &connection.name)?;
                }

                if query.with_connect && query.delay_connect > 0.0 {
                    thread::sleep(Duration::from_secs_f64(query.delay_connect));
                }

                let input = statements.iter().join(";\n");
                let fetch = query.with_data || query.result.store_data;
                let mut rows = None;

                for run in 0..query.num_run {
                    let session = Instant::now();

                    if run > 0 && query.delay_run > 0.0 {
                        thread::sleep(Duration::from_secs_f64(query.delay_run));
                    }

                    match self.run(endpoint, &input, fetch) {
                        Ok(output) => {
                            let session = session.elapsed();
                            for timer in timers.iter_mut() {
                                timer.record(output.elapsed(timer.kind, session))?;
                            }

                            debug!(
                                run = run,
                                size = format_size(output.bytes as f64),
                                "Run finished"
                            );
                            if query.result.store_data && rows.is_none() {
                                rows = Some(output.rows);
                            }
                        }
                        Err(RunError::Spawn(e)) => {
                            error!("Failed to start {:?}: {e}", endpoint.exec);

                            for timer in timers.iter_mut() {
                                if run == 0 {
                                    timer.cancel()?;
                                } else {
                                    timer.abort()?;
                                }
                            }
                            break;
                        }
                        Err(e) => {
                            warn!(run = run, "Run failed: {e:?}");

                            for timer in timers.iter_mut() {
                                timer.record_failure()?;
                            }
                        }
                    }
                }

                for timer in timers.iter_mut() {
                    timer.commit()?;
                }

                if let Some(rows) = rows {
                    result_sets
                        .entry(number)
                        .or_default()
                        .insert(connection.name.clone(), rows);
                }
            }

            if query.result.compare.is_some() {
                if let Some(sets) = result_sets.get(&number) {
                    for connection in resultset::mismatches(sets, &query.result) {
                        warn!("Q{number}: result set of {connection} differs");
                    }
                }
            }

            if !query.result.store_result_set() {
                result_sets.remove(&number);
            }
        }

        info!("Done with processing");

        Ok(result_sets)
    }
}
