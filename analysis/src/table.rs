use serde::Serialize;
use std::cmp::Ordering;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Row {
    pub name: String,
    pub values: Vec<f64>,
}

/// Labelled rows of numbers, handed to renderers
///
/// A table without rows and title is the "nothing to show" result of every
/// comparison.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Table {
    pub title: String,
    /// header of the row label column
    pub index: String,
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

impl Table {
    pub fn new<S: Into<String>>(index: S, columns: Vec<String>) -> Self {
        Self {
            title: String::new(),
            index: index.into(),
            columns,
            rows: Vec::new(),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_title<S: Into<String>>(mut self, title: S) -> Self {
        self.title = title.into();
        self
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn push_row<S: Into<String>>(&mut self, name: S, values: Vec<f64>) {
        debug_assert_eq!(values.len(), self.columns.len());

        self.rows.push(Row {
            name: name.into(),
            values,
        });
    }

    pub fn column_position(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|name| name == column)
    }

    pub fn row(&self, name: &str) -> Option<&Row> {
        self.rows.iter().find(|row| row.name == name)
    }

    pub fn row_names(&self) -> Vec<&str> {
        self.rows.iter().map(|row| row.name.as_str()).collect()
    }

    pub fn value(&self, row: &str, column: &str) -> Option<f64> {
        let position = self.column_position(column)?;

        self.row(row).map(|row| row.values[position])
    }

    /// insert a column at `position`, `values` are given in row order
    pub fn insert_column<S: Into<String>>(&mut self, position: usize, name: S, values: Vec<f64>) {
        debug_assert_eq!(values.len(), self.rows.len());

        self.columns.insert(position, name.into());
        for (row, value) in self.rows.iter_mut().zip(values) {
            row.values.insert(position, value);
        }
    }

    /// stable ascending sort by a column, unknown columns leave the order untouched
    pub fn sort_by_column(&mut self, column: &str) {
        if let Some(position) = self.column_position(column) {
            self.rows.sort_by(|left, right| {
                left.values[position]
                    .partial_cmp(&right.values[position])
                    .unwrap_or(Ordering::Equal)
            });
        }
    }

    /// drop rows whose values starting at column `skip` are all zero
    pub fn drop_zero_rows(&mut self, skip: usize) {
        self.rows
            .retain(|row| row.values.iter().skip(skip).any(|value| *value != 0.0));
    }

    /// drop columns that are zero in every row
    pub fn drop_zero_columns(&mut self) {
        let keep = (0..self.columns.len())
            .map(|position| self.rows.iter().any(|row| row.values[position] != 0.0))
            .collect::<Vec<_>>();

        let mut keep_iter = keep.iter();
        self.columns.retain(|_| *keep_iter.next().unwrap_or(&true));
        for row in self.rows.iter_mut() {
            let mut keep_iter = keep.iter();
            row.values.retain(|_| *keep_iter.next().unwrap_or(&true));
        }
    }
}
