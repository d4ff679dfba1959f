//! Output formatting for CLI commands.
//!
//! This module provides formatting utilities for displaying
//! information to the user in various formats.

use colored::Colorize;
use std::fmt::Write;
use std::path::PathBuf;
use tabled::{Table, Tabled};

use crate::reconciler::{QueueAction, ReconciliationResult};
use crate::state::IdentityState;
use crate::target::PendingChange;

use super::commands::OutputFormat;

/// Output formatter for CLI.
#[derive(Debug)]
pub struct OutputFormatter {
    /// Output format.
    format: OutputFormat,
}

/// Pending change row for table display.
#[derive(Tabled)]
struct PendingRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "Action")]
    action: String,
    #[tabled(rename = "Queue")]
    queue: String,
    #[tabled(rename = "Fields")]
    fields: String,
    #[tabled(rename = "Policy")]
    policy: String,
}

/// Queue outcome row for table display.
#[derive(Tabled)]
struct OutcomeRow {
    #[tabled(rename = "Queue")]
    queue: String,
    #[tabled(rename = "Result")]
    result: String,
    #[tabled(rename = "Changed")]
    changed: String,
}

/// Stored identity row for table display.
#[derive(Tabled)]
struct IdentityRow {
    #[tabled(rename = "Queue")]
    queue: String,
    #[tabled(rename = "ARN")]
    arn: String,
    #[tabled(rename = "Updated")]
    updated: String,
}

impl OutputFormatter {
    /// Creates a new output formatter.
    #[must_use]
    pub const fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Formats the pending changes of a dry run.
    #[must_use]
    pub fn format_plan(&self, pending: &[PendingChange]) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(pending).unwrap_or_default(),
            OutputFormat::Text => Self::format_plan_text(pending),
        }
    }

    fn format_plan_text(pending: &[PendingChange]) -> String {
        if pending.is_empty() {
            return format!("{} No changes required - queues are up to date.\n", "✓".green());
        }

        let rows: Vec<PendingRow> = pending
            .iter()
            .enumerate()
            .map(|(i, change)| PendingRow {
                index: i + 1,
                action: if change.create {
                    "+create".green().to_string()
                } else {
                    "~update".yellow().to_string()
                },
                queue: change.name.clone(),
                fields: change.fields.join(", "),
                policy: change.policy_fingerprint.clone().unwrap_or_default(),
            })
            .collect();

        let creates = pending.iter().filter(|c| c.create).count();
        let mut output = String::from("\nQueue plan\n\n");
        output.push_str(&Table::new(rows).to_string());
        let _ = write!(
            output,
            "\n\nPlan: {} to create, {} with differences\n",
            creates.to_string().green(),
            (pending.len() - creates).to_string().yellow()
        );
        if creates < pending.len() {
            let _ = writeln!(
                output,
                "{} Existing queues are never updated by 'apply'.",
                "⚠".yellow()
            );
        }
        output
    }

    /// Formats a reconciliation result.
    #[must_use]
    pub fn format_reconciliation(&self, result: &ReconciliationResult) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(result).unwrap_or_default(),
            OutputFormat::Text => {
                let mut output = format!(
                    "{} Reconciliation against {} finished\n\n",
                    "✓".green(),
                    result.target
                );

                if result.queues.is_empty() {
                    output.push_str("   No queues configured.\n");
                    return output;
                }

                let rows: Vec<OutcomeRow> = result
                    .queues
                    .iter()
                    .map(|q| OutcomeRow {
                        queue: q.name.clone(),
                        result: Self::format_action(q.action),
                        changed: q.changed_fields.join(", "),
                    })
                    .collect();
                output.push_str(&Table::new(rows).to_string());
                output.push('\n');
                output
            }
        }
    }

    /// Formats the files written by an export.
    #[must_use]
    pub fn format_export(&self, written: &[PathBuf]) -> String {
        match self.format {
            OutputFormat::Json => {
                let files: Vec<String> = written.iter().map(|p| p.display().to_string()).collect();
                serde_json::to_string_pretty(&serde_json::json!({ "files": files }))
                    .unwrap_or_default()
            }
            OutputFormat::Text => {
                let mut output = format!("{} Wrote {} file(s):\n", "✓".green(), written.len());
                for path in written {
                    let _ = writeln!(output, "   {}", path.display());
                }
                output
            }
        }
    }

    /// Formats the stored identity state.
    #[must_use]
    pub fn format_state(&self, state: &IdentityState) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(state).unwrap_or_default(),
            OutputFormat::Text => {
                let mut output = String::new();

                let _ = write!(output, "\nState: {}\n\n", state.project);
                let _ = writeln!(output, "   Version: {}", state.version);
                let _ = writeln!(output, "   Last updated: {}", state.last_updated);
                let _ = writeln!(output, "   Queues: {}\n", state.queues.len());

                if !state.queues.is_empty() {
                    let rows: Vec<IdentityRow> = state
                        .queues
                        .iter()
                        .map(|(name, identity)| IdentityRow {
                            queue: name.clone(),
                            arn: identity.arn.clone(),
                            updated: identity.updated_at.format("%Y-%m-%d %H:%M").to_string(),
                        })
                        .collect();
                    output.push_str(&Table::new(rows).to_string());
                    output.push('\n');
                }

                if !state.history.is_empty() {
                    let _ = writeln!(output, "\n   Recent history ({}):", state.history.len());
                    for entry in state.history.iter().rev().take(5) {
                        let status = if entry.success { "✓" } else { "✗" };
                        let _ = writeln!(
                            output,
                            "     {status} {} - {} ({})",
                            entry.timestamp.format("%Y-%m-%d %H:%M"),
                            entry.target,
                            entry.queues.join(", ")
                        );
                    }
                }

                output
            }
        }
    }

    /// Formats a queue action with color.
    fn format_action(action: QueueAction) -> String {
        let text = action.to_string();
        match action {
            QueueAction::Created | QueueAction::Exported => text.green().to_string(),
            QueueAction::Planned | QueueAction::UpdateNotSupported | QueueAction::ChangesIgnored => {
                text.yellow().to_string()
            }
            QueueAction::Unchanged | QueueAction::Skipped => text.dimmed().to_string(),
        }
    }
}
