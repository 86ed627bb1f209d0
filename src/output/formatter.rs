//! Report rendering
//!
//! Formats the cumulative statistics as the final report table.

#![allow(dead_code)]

use std::collections::BTreeMap;

use crate::models::{TestId, TestStats};
use crate::results::RunContext;

/// Names longer than this are cut and suffixed with "..".
const TRUNCATE_AT: usize = 57;

const TABLE_WIDTH: usize = 110;

/// Renders the final report table.
pub struct ReportFormatter {
    colorize: bool,
}

impl ReportFormatter {
    pub fn new() -> Self {
        Self { colorize: true }
    }

    pub fn no_color(mut self) -> Self {
        self.colorize = false;
        self
    }

    /// Render the report for everything the session aggregated.
    ///
    /// Tests are grouped by container in lexicographic order; within a
    /// group the worst offenders come first (failure count descending,
    /// name descending as the tie break), so output is stable for a given
    /// set of outcomes.
    pub fn format_report(&self, ctx: &RunContext) -> String {
        let mut out = String::new();
        out.push_str(&format!(
            "\n--- Stress Test Report (Runs: {}) ---\n",
            ctx.runs()
        ));

        if ctx.is_empty() {
            out.push_str("No results collected. (Did the build fail?)\n");
            return out;
        }

        out.push_str(&format!(
            "{:<60} | {:<6} | {:<6} | {:<8} | {:<8} | {:<8}\n",
            "Test Case", "Pass", "Fail", "Fail %", "Max MB", "Avg MB"
        ));
        out.push_str(&"-".repeat(TABLE_WIDTH));
        out.push('\n');

        for (container, entries) in group_by_container(ctx.stats()) {
            out.push_str(&format!("[{container}]\n"));
            for (id, stats) in entries {
                let row = format!(
                    "{:<60} | {:<6} | {:<6} | {:<8} | {:<8} | {:<8}",
                    truncate_name(&id.name),
                    stats.pass,
                    stats.fail,
                    format!("{:.1}%", stats.fail_percent()),
                    format!("{:.1}", stats.max_memory_mb()),
                    format!("{:.1}", stats.avg_memory_mb()),
                );
                if self.colorize && stats.fail > 0 {
                    out.push_str(&format!("\x1b[91m{row}\x1b[0m\n"));
                } else {
                    out.push_str(&row);
                    out.push('\n');
                }
            }
        }

        out
    }
}

impl Default for ReportFormatter {
    fn default() -> Self {
        Self::new()
    }
}

/// Group statistics by container, preserving the map's container order and
/// sorting each group for display.
pub(crate) fn group_by_container(
    stats: &BTreeMap<TestId, TestStats>,
) -> Vec<(&str, Vec<(&TestId, &TestStats)>)> {
    let mut groups: Vec<(&str, Vec<(&TestId, &TestStats)>)> = Vec::new();
    for (id, entry) in stats {
        match groups.last_mut() {
            Some((container, entries)) if *container == id.container => {
                entries.push((id, entry));
            }
            _ => groups.push((id.container.as_str(), vec![(id, entry)])),
        }
    }
    for (_, entries) in &mut groups {
        entries.sort_by(|a, b| {
            b.1.fail
                .cmp(&a.1.fail)
                .then_with(|| b.0.name.cmp(&a.0.name))
        });
    }
    groups
}

fn truncate_name(name: &str) -> String {
    if name.chars().count() > TRUNCATE_AT {
        let cut: String = name.chars().take(TRUNCATE_AT).collect();
        format!("{cut}..")
    } else {
        name.to_string()
    }
}
