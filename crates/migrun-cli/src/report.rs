//! Plain-text rendering of run reports and verification rows

use migrun_core::{ExecutionOutcome, ExecutionResult, RunReport};
use migrun_store::QueryRows;
use std::fmt::Write;

fn marker(outcome: &ExecutionOutcome) -> &'static str {
    match outcome {
        ExecutionOutcome::Applied { .. } | ExecutionOutcome::AlreadyApplied { .. } => "✓",
        ExecutionOutcome::Failed { .. } => "✗",
        ExecutionOutcome::Skipped => "-",
        ExecutionOutcome::Pending => "•",
    }
}

pub fn outcome_line(result: &ExecutionResult) -> String {
    format!("{} {}: {}", marker(&result.outcome), result.name, result.outcome)
}

/// One line per script followed by the summary
pub fn render_report(report: &RunReport) -> String {
    let mut out = String::new();
    for result in report.results() {
        let _ = writeln!(out, "{}", outcome_line(result));
    }
    let _ = writeln!(out, "{}", report.summary());
    out
}

/// Left-aligned table with a row count
pub fn render_rows(rows: &QueryRows) -> String {
    let mut widths: Vec<usize> = rows.columns.iter().map(|c| c.chars().count()).collect();
    for row in &rows.rows {
        for (i, cell) in row.iter().enumerate() {
            if let Some(w) = widths.get_mut(i) {
                *w = (*w).max(cell.chars().count());
            }
        }
    }

    let line = |cells: &[String]| -> String {
        cells
            .iter()
            .zip(&widths)
            .map(|(cell, w)| format!("{:<width$}", cell, width = *w))
            .collect::<Vec<_>>()
            .join(" | ")
            .trim_end()
            .to_string()
    };

    let mut out = String::new();
    if !rows.columns.is_empty() {
        let _ = writeln!(out, "{}", line(&rows.columns));
        let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
        let _ = writeln!(out, "{}", rule.join("-+-"));
    }
    for row in &rows.rows {
        let _ = writeln!(out, "{}", line(row));
    }
    let noun = if rows.len() == 1 { "row" } else { "rows" };
    let _ = writeln!(out, "({} {})", rows.len(), noun);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use migrun_core::{ExError, ExErrorKind};

    #[test]
    fn test_outcome_lines() {
        let applied = ExecutionResult::new("001_seed", ExecutionOutcome::Applied { duration_ms: 12 });
        let failed = ExecutionResult::new(
            "002_fix",
            ExecutionOutcome::Failed {
                error: ExError::new(ExErrorKind::SqlExecution)
                    .with_message("relation \"competitions\" does not exist"),
            },
        );
        let skipped = ExecutionResult::new("003_more", ExecutionOutcome::Skipped);

        assert_eq!(outcome_line(&applied), "✓ 001_seed: applied (12 ms)");
        assert_eq!(
            outcome_line(&failed),
            "✗ 002_fix: failed: relation \"competitions\" does not exist"
        );
        assert_eq!(outcome_line(&skipped), "- 003_more: skipped due to prior failure");
    }

    #[test]
    fn test_render_report_ends_with_summary() {
        let report = RunReport::new(vec![
            ExecutionResult::new("001_seed", ExecutionOutcome::Applied { duration_ms: 1 }),
            ExecutionResult::new("002_fix", ExecutionOutcome::Pending),
        ]);

        let text = render_report(&report);
        let last = text.lines().last().unwrap();

        assert_eq!(text.lines().count(), 3);
        assert_eq!(last, "1 applied, 0 already applied, 0 failed, 0 skipped, 1 pending");
    }

    #[test]
    fn test_render_rows_aligns_columns() {
        let rows = QueryRows {
            columns: vec!["name".to_string(), "status".to_string()],
            rows: vec![
                vec!["Spelling Bee".to_string(), "active".to_string()],
                vec!["Chess".to_string(), "active".to_string()],
            ],
        };

        let text = render_rows(&rows);

        assert_eq!(
            text,
            "name         | status\n\
             -------------+-------\n\
             Spelling Bee | active\n\
             Chess        | active\n\
             (2 rows)\n"
        );
    }

    #[test]
    fn test_render_rows_empty_result() {
        let rows = QueryRows {
            columns: vec!["id".to_string()],
            rows: vec![],
        };
        assert_eq!(render_rows(&rows), "id\n--\n(0 rows)\n");
    }
}
