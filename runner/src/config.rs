use dbmsbench_analysis::{BenchmarkContext, Connection, Factor, Query, QueryConfig, QueryError};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    fs::{self, File},
    io::Error,
    os::unix::fs::MetadataExt,
    path::{Path, PathBuf},
};
use thiserror::Error;
use tracing::{error, warn};

// check if a file is executable
pub fn check_executable(path: &Path) -> Result<bool, ConfigErrors> {
    if !path.is_file() {
        Err(ConfigErrors::FileNotFound(path.to_path_buf()))
    } else {
        match File::open(path).map(|file| file.metadata()) {
            Ok(Ok(metadata)) => Ok((metadata.mode() & 0o111) != 0),
            Ok(Err(e)) | Err(e) => Err(ConfigErrors::MetadataNotFound(e)),
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigErrors {
    #[error("Failed to read configuration")]
    Io(#[from] Error),
    #[error("Failed to parse configuration: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("Query {0} is invalid: {1}")]
    InvalidQuery(usize, #[source] QueryError),
    #[error("File not found: {0:?}")]
    FileNotFound(PathBuf),
    #[error("Metadata not found")]
    MetadataNotFound(#[source] Error),
    #[error("Configuration contains errors")]
    Preflight,
}

#[derive(Deserialize, Serialize, Clone, Debug)]
#[serde(deny_unknown_fields)]
pub struct ExperimentConfig {
    // systems under test
    pub connections: Vec<ConnectionConfig>,
    // queries in order, query numbers are 1-based positions in this list
    pub queries: Vec<QueryConfig>,
    // merged over every query, wins on conflicts
    #[serde(default)]
    pub template: Option<QueryConfig>,
    #[serde(default)]
    pub factor: Factor,
    #[serde(default)]
    pub anonymize: bool,
    // timeout of a single run in seconds
    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

#[derive(Deserialize, Serialize, Clone, Debug)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct ConnectionConfig {
    pub name: String,
    #[serde(default)]
    pub alias: Option<String>,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub info: String,
    // executable that receives a query on stdin and prints the result rows
    pub exec: Option<PathBuf>,
    #[serde(default)]
    pub params: Vec<String>,
    // client processes of the system under test, informational
    #[serde(default)]
    pub num_processes: usize,
}

/// Resolved experiment: queries and registered connections
#[derive(Debug, Clone)]
pub struct Experiment {
    pub queries: Vec<Query>,
    pub connections: Vec<Connection>,
    pub settings: BTreeMap<String, ConnectionConfig>,
    pub factor: Factor,
    pub timeout: u64,
}

impl ExperimentConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigErrors> {
        let content = fs::read_to_string(path)?;

        Ok(serde_yaml::from_str(&content)?)
    }

    /// Check the configuration and log every problem, returns true if an error was found
    pub fn preflight_checks(&self) -> bool {
        // attempt to catch all errors instead of piece-by-piece to make debugging easier for users
        let mut contains_error = false;

        if self.connections.is_empty() {
            error!("No connection was defined, nothing to benchmark");
            contains_error = true;
        }

        if self.queries.is_empty() {
            error!("No query was defined, nothing to benchmark");
            contains_error = true;
        }

        for (name, count) in self.connections.iter().counts_by(|c| c.name.as_str()) {
            if count > 1 {
                error!("Connection {name} is defined {count} times");
                contains_error = true;
            }
        }

        for connection in self.connections.iter() {
            if connection.active && connection.exec.is_none() {
                warn!(
                    "Connection {} has no exec, it can only be used for reports",
                    connection.name
                );
            }
        }

        if !self.connections.iter().any(|connection| connection.active) {
            warn!("No connection is active, comparisons will be empty");
        }

        for (index, query) in self.queries.iter().enumerate() {
            let number = index + 1;

            if let Err(e) = Query::new(query, self.template.as_ref()) {
                error!("Query {number} is invalid: {e}");
                contains_error = true;
            }

            for referenced in query.query_list.iter().flatten() {
                if *referenced == number {
                    error!("Query {number} references itself in its query list");
                    contains_error = true;
                } else if *referenced == 0 || *referenced > self.queries.len() {
                    error!("Query {number} references query {referenced} which is not defined");
                    contains_error = true;
                }
            }
        }

        if self.timeout == 0 {
            error!("timeout cannot be 0");
            contains_error = true;
        }

        contains_error
    }

    /// Resolve all queries and register all connections in `context`
    pub fn build(&self, context: &mut BenchmarkContext) -> Result<Experiment, ConfigErrors> {
        context.set_template(self.template.clone());

        let queries = self
            .queries
            .iter()
            .enumerate()
            .map(|(index, query)| {
                context
                    .query(query)
                    .map_err(|e| ConfigErrors::InvalidQuery(index + 1, e))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let connections = self
            .connections
            .iter()
            .map(|connection| {
                context.connection(
                    &connection.name,
                    connection.alias.as_deref(),
                    connection.active,
                )
            })
            .collect();

        Ok(Experiment {
            queries,
            connections,
            settings: self
                .connections
                .iter()
                .map(|connection| (connection.name.clone(), connection.clone()))
                .collect(),
            factor: self.factor,
            timeout: self.timeout,
        })
    }
}

fn default_timeout() -> u64 {
    60
}

fn default_active() -> bool {
    true
}

fn default_version() -> String {
    String::from("-")
}

#[cfg(test)]
mod config_test;
