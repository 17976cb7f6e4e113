//! Timing and statistical aggregation engine for benchmarking database systems.
//!
//! The crate consumes raw per-run durations and structural metadata (run counts,
//! warmup/cooldown windows, active flags) and turns them into statistics and
//! cross-connection comparison tables. Executing queries and rendering results
//! is left to the caller.

pub mod aggregate;
pub mod connection;
pub mod context;
pub mod format;
pub mod query;
pub mod registry;
pub mod stats;
pub mod table;
pub mod timer;

pub use aggregate::{Comparison, Factor};
pub use connection::Connection;
pub use context::BenchmarkContext;
pub use query::{Query, QueryConfig, QueryError, TimerKind};
pub use registry::IdentityRegistry;
pub use stats::Statistics;
pub use table::Table;
pub use timer::{Timer, TimerError};
