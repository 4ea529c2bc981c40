use chrono::{DateTime, Local};
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, Color, ContentArrangement, Table};
use engine::{Phase, RunError};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PhaseStatus {
    Passed,
    Failed(String),
    Skipped,
}

/// Every phase runs in order until one fails, so the outcome of the run is
/// enough to know what happened to each.
pub fn phase_statuses(outcome: &Result<(), RunError>) -> Vec<(Phase, PhaseStatus)> {
    let failed = outcome.as_ref().err();
    let mut reached_failure = false;
    Phase::ALL
        .iter()
        .map(|&phase| {
            let status = match failed {
                Some(err) if err.phase == phase => {
                    reached_failure = true;
                    PhaseStatus::Failed(err.source.to_string())
                }
                _ if reached_failure => PhaseStatus::Skipped,
                _ => PhaseStatus::Passed,
            };
            (phase, status)
        })
        .collect()
}

pub fn render(
    outcome: &Result<(), RunError>,
    started_at: DateTime<Local>,
    elapsed: Duration,
) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["#", "Phase", "Result", "Detail"]);

    for (index, (phase, status)) in phase_statuses(outcome).into_iter().enumerate() {
        let (result, detail) = match status {
            PhaseStatus::Passed => (Cell::new("passed").fg(Color::Green), String::new()),
            PhaseStatus::Failed(message) => (Cell::new("FAILED").fg(Color::Red), message),
            PhaseStatus::Skipped => (Cell::new("skipped").fg(Color::DarkGrey), String::new()),
        };
        table.add_row(vec![
            Cell::new(index + 1),
            Cell::new(phase),
            result,
            Cell::new(detail),
        ]);
    }

    let verdict = if outcome.is_ok() { "PASS" } else { "FAIL" };
    table.add_row(vec![
        Cell::new(""),
        Cell::new(format!("started {}", started_at.format("%Y-%m-%d %H:%M:%S"))),
        Cell::new(verdict),
        Cell::new(format!("{:.2?}", elapsed)),
    ]);
    table
}
