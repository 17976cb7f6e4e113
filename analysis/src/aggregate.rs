use crate::{
    connection::Connection,
    query::Query,
    registry::IdentityRegistry,
    stats::Statistics,
    table::Table,
    timer::Timer,
};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

const TOTAL: &str = "total";

/// Statistic a comparison is based on
#[derive(Deserialize, Serialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Factor {
    #[default]
    Mean,
    Median,
}

impl Factor {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Mean => "mean",
            Self::Median => "median",
        }
    }

    pub fn of(&self, stats: &Statistics) -> f64 {
        match self {
            Self::Mean => stats.mean,
            Self::Median => stats.median,
        }
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Add a `factor` column to a statistics table.
///
/// The factor is the chosen statistic divided by its minimum over all rows that
/// measured anything, rounded to two decimals. Rows are sorted by factor and
/// rows without any measurement are dropped.
pub fn add_factor(stats: &Table, factor: Factor) -> Table {
    let Some(position) = stats.column_position(factor.name()) else {
        return stats.clone();
    };
    if stats.is_empty() {
        return stats.clone();
    }

    // skip `n`, a row counts if anything from `mean` onwards is not zero
    let minimum = stats
        .rows
        .iter()
        .filter(|row| row.values.iter().skip(1).any(|value| *value != 0.0))
        .map(|row| row.values[position])
        .reduce(f64::min);

    let factors = stats
        .rows
        .iter()
        .map(|row| match minimum {
            Some(minimum) if minimum > 0.0 => round2(row.values[position] / minimum),
            _ => round2(row.values[position]),
        })
        .collect_vec();

    let mut table = stats.clone();
    table.insert_column(0, "factor", factors);
    table.sort_by_column("factor");
    // skip `factor` and `n`
    table.drop_zero_rows(2);

    table
}

/// Comparison of all connections over a set of timers and queries
///
/// `queries` is indexed like the queries of every timer, i.e. `queries[0]` is
/// query number 1.
#[derive(Debug, Clone, Copy)]
pub struct Comparison<'a> {
    timers: &'a [Timer],
    queries: &'a [Query],
    connections: &'a [Connection],
    registry: &'a IdentityRegistry,
    factor: Factor,
}

impl<'a> Comparison<'a> {
    pub fn new(
        timers: &'a [Timer],
        queries: &'a [Query],
        connections: &'a [Connection],
        registry: &'a IdentityRegistry,
        factor: Factor,
    ) -> Self {
        Self {
            timers,
            queries,
            connections,
            registry,
            factor,
        }
    }

    fn active_connection(&self, name: &str) -> Option<&'a Connection> {
        self.connections
            .iter()
            .find(|connection| connection.name == name && connection.active)
    }

    // current display name, aliases may have been renamed after the connection was created
    fn display_name(&self, connection: &Connection) -> String {
        self.registry.display_name(&connection.name).to_string()
    }

    /// Statistics of one query with factor column, see `add_factor`
    pub fn factor_table(&self, query_index: usize, timer: &Timer) -> Table {
        add_factor(&timer.stats_table(query_index, self.registry), self.factor)
    }

    // all active connections finished the query with at least one measurement
    fn is_comparable(&self, timer: &Timer, index: usize, query: &Query) -> bool {
        let number = index + 1;

        if !query.active {
            debug!(query = number, timer = timer.name(), "Ignore query, query inactive");
            return false;
        }

        let Some(samples) = timer.samples(number) else {
            return false;
        };

        for connection in self.connections.iter().filter(|connection| connection.active) {
            match samples.get(&connection.name) {
                None => {
                    debug!(
                        query = number,
                        timer = timer.name(),
                        connection = %connection.name,
                        "Ignore query, missing connection"
                    );
                    return false;
                }
                Some(values) if values.iter().all(|value| *value == 0.0) => {
                    debug!(
                        query = number,
                        timer = timer.name(),
                        connection = %connection.name,
                        "Ignore query, data 0"
                    );
                    return false;
                }
                Some(_) => {}
            }
        }

        true
    }

    /// Queries (0-based) that may be compared, one list per timer.
    ///
    /// Without `scope` a query counts for a timer if the timer is active for
    /// it, the query is active and every active connection has a sample set
    /// that is not all zero. With `scope` only that 1-based query is considered.
    pub fn valid_queries(&self, scope: Option<usize>) -> Vec<Vec<usize>> {
        self.timers
            .iter()
            .map(|timer| {
                debug!(timer = timer.name(), "Check timer for valid queries");

                if let Some(number) = scope {
                    if !timer.has_results(number, None) {
                        return Vec::new();
                    }
                }

                (0..timer.num_queries())
                    .filter(|&index| {
                        let Some(query) = self.queries.get(index) else {
                            return false;
                        };
                        if !query.is_timer_active(timer.kind) {
                            return false;
                        }

                        match scope {
                            Some(number) => number == index + 1,
                            None => self.is_comparable(timer, index, query),
                        }
                    })
                    .collect()
            })
            .collect()
    }

    fn label(&self, combination: &str) -> String {
        format!("{combination} {} times", self.factor.name())
    }

    // rows = connections, columns = timers plus total, sorted by total
    fn composite_table(&self, per_timer: Vec<BTreeMap<String, f64>>, unit: &str) -> Table {
        let connections = per_timer
            .iter()
            .flat_map(|values| values.keys().cloned())
            .sorted()
            .dedup()
            .collect_vec();
        let mut table = Table::new(
            "DBMS",
            self.timers
                .iter()
                .map(|timer| timer.name().to_string())
                .collect(),
        );

        for connection in connections {
            let values = per_timer
                .iter()
                .map(|values| values.get(&connection).copied().unwrap_or(0.0))
                .collect();
            table.push_row(connection, values);
        }

        table.drop_zero_columns();
        let totals = table
            .rows
            .iter()
            .map(|row| row.values.iter().sum::<f64>())
            .collect();
        let position = table.columns.len();
        table.insert_column(position, TOTAL, totals);
        table.drop_zero_rows(0);
        table.drop_zero_columns();

        if table.is_empty() || table.columns.is_empty() {
            debug!("no values");
            return Table::empty();
        }

        table.sort_by_column(TOTAL);
        for column in table.columns.iter_mut() {
            column.push_str(unit);
        }

        table
    }

    /// Arithmetic mean of the chosen statistic per stackable timer and connection.
    ///
    /// Without `scope` all valid queries contribute, otherwise only the given
    /// 1-based query. Returns an empty table if nothing could be compared.
    pub fn sum_per_timer(&self, scope: Option<usize>) -> Table {
        let valid_queries = self.valid_queries(scope);
        let mut values_found = false;
        let mut queries_evaluated = 0;
        let mut measurements = 0;

        let per_timer = self
            .timers
            .iter()
            .zip(valid_queries.iter())
            .map(|(timer, valid)| {
                let mut sums = BTreeMap::<String, f64>::new();

                if !timer.stackable {
                    debug!(timer = timer.name(), "Timer is not stackable");
                    return sums;
                }

                let mut num_factors = 0;
                for &index in valid {
                    let number = index + 1;
                    let (Some(samples), Some(stats)) =
                        (timer.samples(number), timer.statistics(number))
                    else {
                        continue;
                    };
                    let window = self.queries[index].run_window();

                    queries_evaluated += 1;
                    values_found = true;
                    num_factors += 1;

                    if scope.is_none() {
                        debug!(
                            query = number,
                            timer = timer.name(),
                            evaluated = queries_evaluated,
                            "Query contributes to total, all active connections present"
                        );
                    }

                    for (name, values) in samples {
                        let Some(connection) = self.active_connection(name) else {
                            continue;
                        };
                        let Some(connection_stats) =
                            stats.get(name).filter(|stats| !stats.is_zero())
                        else {
                            continue;
                        };

                        let end = window.end.min(values.len());
                        measurements += end - window.start.min(end);
                        *sums.entry(self.display_name(connection)).or_default() +=
                            self.factor.of(connection_stats);
                    }
                }

                sums.values_mut()
                    .for_each(|sum| *sum /= num_factors as f64);

                sums
            })
            .collect_vec();

        if !values_found {
            return Table::empty();
        }

        let table = self.composite_table(per_timer, " [ms]");
        if table.is_empty() {
            return table;
        }

        let label = self.label("Arithmetic mean of");
        let title = match scope {
            None => format!(
                "{label} in {queries_evaluated} benchmarks ({measurements} measurements) [ms]"
            ),
            Some(number) => format!(
                "Q{number}: {label} [ms] in {} benchmark test runs",
                self.queries[number - 1].measured_runs()
            ),
        };

        table.with_title(title)
    }

    /// Geometric mean of the factors per timer and connection.
    ///
    /// Considers every timer, stackable or not. A connection without a factor
    /// for a query (nothing measured outside of warmup and cooldown) is left
    /// out of that query, so its root is taken over fewer factors. A factor of
    /// exactly zero excludes the query for every connection.
    pub fn product_per_timer(&self, scope: Option<usize>) -> Table {
        let valid_queries = self.valid_queries(scope);
        let mut values_found = false;
        let mut queries_evaluated = 0;

        let per_timer = self
            .timers
            .iter()
            .zip(valid_queries.iter())
            .map(|(timer, valid)| {
                let mut products = BTreeMap::<String, f64>::new();
                let mut num_factors = BTreeMap::<String, i32>::new();

                for &index in valid {
                    let number = index + 1;
                    let Some(samples) = timer.samples(number) else {
                        continue;
                    };
                    let factors = self.factor_table(number, timer);

                    values_found = true;

                    // connections without a factor row measured nothing and are left out
                    let contributions = samples
                        .keys()
                        .filter_map(|name| self.active_connection(name))
                        .filter_map(|connection| {
                            let display_name = self.display_name(connection);
                            let factor = factors.value(&display_name, "factor");
                            if factor.is_none() {
                                debug!(
                                    query = number,
                                    timer = timer.name(),
                                    connection = %display_name,
                                    "No factor, connection skipped"
                                );
                            }

                            factor.map(|factor| (display_name, factor))
                        })
                        .collect_vec();

                    if contributions.iter().any(|(_, factor)| *factor == 0.0) {
                        debug!(query = number, timer = timer.name(), "Ignore query, factor 0");
                        continue;
                    }

                    queries_evaluated += 1;
                    for (connection, factor) in contributions {
                        debug!(connection = %connection, factor = factor, "Multiplied");
                        *num_factors.entry(connection.clone()).or_default() += 1;
                        *products.entry(connection).or_insert(1.0) *= factor;
                    }
                }

                products
                    .into_iter()
                    .map(|(connection, product)| {
                        let root = product.powf(1.0 / f64::from(num_factors[&connection]));

                        (connection, root)
                    })
                    .collect::<BTreeMap<_, _>>()
            })
            .collect_vec();

        if !values_found {
            return Table::empty();
        }

        let table = self.composite_table(per_timer, "");
        if table.is_empty() {
            return table;
        }

        let label = self.label("Geometric mean of factors of");
        let title = match scope {
            None => format!("{label} in {queries_evaluated} benchmarks"),
            Some(number) => format!(
                "Q{number}: {label} in {} benchmark test runs",
                self.queries[number - 1].measured_runs()
            ),
        };

        table.with_title(title)
    }
}
