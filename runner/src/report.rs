//! Plain text rendering of comparison tables

use crate::config::Experiment;
use dbmsbench_analysis::{
    format::format_duration, Comparison, IdentityRegistry, Table, Timer, TimerKind,
};
use prettytable::{format::Alignment, Cell, Row};
use std::collections::BTreeMap;

fn text_table(index: &str, columns: &[String]) -> prettytable::Table {
    let mut table = prettytable::Table::new();
    table.set_format(*prettytable::format::consts::FORMAT_NO_BORDER_LINE_SEPARATOR);
    table.set_titles(Row::new(
        std::iter::once(Cell::new(index))
            .chain(columns.iter().map(|column| Cell::new_align(column, Alignment::RIGHT)))
            .collect(),
    ));

    table
}

/// Render `table` as aligned text, empty tables render as nothing
pub fn render(table: &Table) -> String {
    if table.is_empty() {
        return String::new();
    }

    let mut text = text_table(&table.index, &table.columns);
    for row in table.rows.iter() {
        text.add_row(Row::new(
            std::iter::once(Cell::new(&row.name))
                .chain(
                    row.values
                        .iter()
                        .map(|value| Cell::new_align(&format!("{value:.2}"), Alignment::RIGHT)),
                )
                .collect(),
        ));
    }

    if table.title.is_empty() {
        text.to_string()
    } else {
        format!("{}\n{text}", table.title)
    }
}

/// Total time spent per connection over all sessions
pub fn session_totals(timers: &[Timer], registry: &IdentityRegistry) -> BTreeMap<String, f64> {
    let mut totals = BTreeMap::<String, f64>::new();

    for timer in timers.iter().filter(|timer| timer.kind == TimerKind::Session) {
        for number in 1..=timer.num_queries() {
            for (connection, samples) in timer.samples(number).into_iter().flatten() {
                *totals
                    .entry(registry.display_name(connection).to_string())
                    .or_default() += samples.iter().sum::<f64>();
            }
        }
    }

    totals
}

/// Full report of an experiment, restricted to one 1-based query with `scope`
pub fn report(
    experiment: &Experiment,
    timers: &[Timer],
    registry: &IdentityRegistry,
    scope: Option<usize>,
) -> String {
    let comparison = Comparison::new(
        timers,
        &experiment.queries,
        &experiment.connections,
        registry,
        experiment.factor,
    );
    let mut output = String::new();

    for (index, query) in experiment.queries.iter().enumerate() {
        let number = index + 1;
        if scope.map_or(false, |scope| scope != number) {
            continue;
        }

        for timer in timers.iter().filter(|timer| query.is_timer_active(timer.kind)) {
            let table = comparison
                .factor_table(number, timer)
                .with_title(format!("Q{number}: {} - {} [ms]", query.title, timer.name()));
            if !table.is_empty() {
                output.push('\n');
                output.push_str(&render(&table));
            }
        }
    }

    for table in [
        comparison.sum_per_timer(scope),
        comparison.product_per_timer(scope),
    ] {
        if !table.is_empty() {
            output.push('\n');
            output.push_str(&render(&table));
        }
    }

    let totals = session_totals(timers, registry);
    if !totals.is_empty() {
        let mut text = text_table("DBMS", &["total time".to_string()]);
        for (connection, millis) in totals {
            text.add_row(Row::new(vec![
                Cell::new(&connection),
                Cell::new_align(&format_duration(millis), Alignment::RIGHT),
            ]));
        }

        output.push_str("\nTotal time per connection\n");
        output.push_str(&text.to_string());
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_in_order() {
        let mut table = Table::new("DBMS", vec!["factor".to_string()]);
        table.push_row("postgres", vec![1.0]);
        table.push_row("mysql", vec![2.5]);

        let rendered = render(&table.with_title("Q1"));
        let lines = rendered.lines().collect::<Vec<_>>();

        assert_eq!(lines[0], "Q1");
        assert!(lines[1].contains("DBMS") && lines[1].contains("factor"));
        let postgres = lines.iter().position(|line| line.contains("postgres")).unwrap();
        let mysql = lines.iter().position(|line| line.contains("mysql")).unwrap();
        assert!(postgres < mysql);
        assert!(lines[mysql].contains("2.50"));
        assert!(lines[postgres].contains("1.00"));
        assert!(render(&Table::empty()).is_empty());
    }
}
