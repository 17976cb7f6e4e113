//! Normalization and comparison of fetched result rows

use dbmsbench_analysis::query::ResultPolicy;
use itertools::Itertools;
use std::collections::BTreeMap;

// round every numeric field of a comma separated row
fn restrict_precision(row: &str, precision: usize) -> String {
    row.split(',')
        .map(|field| {
            let field = field.trim();

            match field.parse::<f64>() {
                Ok(value) => format!("{value:.precision$}"),
                Err(_) => field.to_string(),
            }
        })
        .join(",")
}

/// Apply precision and sorting of `policy` to `rows`
pub fn normalize(rows: &[String], policy: &ResultPolicy) -> Vec<String> {
    let mut rows = match policy.precision {
        Some(precision) => rows
            .iter()
            .map(|row| restrict_precision(row, precision as usize))
            .collect_vec(),
        None => rows.to_vec(),
    };

    if policy.sorted {
        rows.sort();
    }

    rows
}

/// Connections whose normalized rows differ from the first connection
pub fn mismatches(result_sets: &BTreeMap<String, Vec<String>>, policy: &ResultPolicy) -> Vec<String> {
    let mut normalized = result_sets
        .iter()
        .map(|(connection, rows)| (connection, normalize(rows, policy)));

    let Some((_, reference)) = normalized.next() else {
        return Vec::new();
    };

    normalized
        .filter(|(_, rows)| *rows != reference)
        .map(|(connection, _)| connection.clone())
        .collect()
}
