use serde::{Deserialize, Serialize};

/// Column header of every statistics table, the first column holds the connection
pub const STATS_HEADER: [&str; 10] = [
    "DBMS [ms]",
    "n",
    "mean",
    "stdev",
    "cv %",
    "qcod %",
    "iqr",
    "median",
    "min",
    "max",
];

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
/// Descriptive statistics of one sequence of run durations (milliseconds)
pub struct Statistics {
    pub n: usize,
    pub mean: f64,
    pub stdev: f64,
    /// coefficient of variation in percent
    pub cv: f64,
    /// quartile coefficient of dispersion in percent
    pub qcod: f64,
    pub iqr: f64,
    pub median: f64,
    pub min: f64,
    pub max: f64,
}

impl Statistics {
    /// Compute all statistics for `samples`.
    ///
    /// Zero entries mark runs without a successful measurement. They count for
    /// `n`, `mean` and `stdev`, but median, min, max and the quartiles are taken
    /// over the non-zero entries only. If every entry is zero the full
    /// sequence is used instead, so an all-zero input yields all-zero statistics.
    pub fn compute(samples: &[f64]) -> Self {
        let n = samples.len();

        if n == 0 {
            return Self::default();
        }

        let mean = samples.iter().sum::<f64>() / n as f64;
        let stdev = if n > 1 {
            let variance =
                samples.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1) as f64;

            variance.sqrt()
        } else {
            0.0
        };
        let cv = if mean > 0.0 && stdev > 0.0 {
            stdev / mean * 100.0
        } else {
            0.0
        };

        let mut measured = samples
            .iter()
            .copied()
            .filter(|value| *value != 0.0)
            .collect::<Vec<_>>();
        if measured.is_empty() {
            measured = samples.to_vec();
        }
        measured.sort_by(f64::total_cmp);

        let q1 = percentile(&measured, 25.0);
        let q3 = percentile(&measured, 75.0);
        let qcod = if q3 + q1 > 0.0 {
            100.0 * (q3 - q1) / (q3 + q1)
        } else {
            0.0
        };
        let iqr = if q3 - q1 > 0.0 { q3 - q1 } else { 0.0 };

        Self {
            n,
            mean,
            stdev,
            cv,
            qcod,
            iqr,
            median: median(&measured),
            min: measured[0],
            max: measured[measured.len() - 1],
        }
    }

    /// values in the order of `STATS_HEADER[1..]`
    pub fn values(&self) -> [f64; 9] {
        [
            self.n as f64,
            self.mean,
            self.stdev,
            self.cv,
            self.qcod,
            self.iqr,
            self.median,
            self.min,
            self.max,
        ]
    }

    /// true if nothing but zero was measured
    pub fn is_zero(&self) -> bool {
        self.values()[1..].iter().all(|value| *value == 0.0)
    }
}

// expects a sorted, non-empty slice
fn median(sorted: &[f64]) -> f64 {
    let mid = sorted.len() / 2;

    if sorted.len() % 2 == 1 {
        sorted[mid]
    } else {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    }
}

/// Percentile with linear interpolation between closest ranks, expects a sorted, non-empty slice
fn percentile(sorted: &[f64], percent: f64) -> f64 {
    let rank = (sorted.len() - 1) as f64 * percent / 100.0;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;

    sorted[lower] + (sorted[upper] - sorted[lower]) * (rank - lower as f64)
}

#[cfg(test)]
mod stats_test;
