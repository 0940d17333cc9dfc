// Markdown rendering of a pass for the weekly audit record.

use chrono::NaiveDate;

use ebl_core::model::{FailureReason, Outcome};

use super::pass::MoveReport;

/// Render the human-readable account of one pass: the processing order,
/// then each team's drop, add and result in that order.
pub fn render_markdown(report: &MoveReport, run_date: NaiveDate) -> String {
    let mut lines = vec![
        format!("# Roster move processing: {run_date}"),
        String::new(),
        format!("- Processed requests: {}", report.resolved_count()),
        String::new(),
    ];

    if report.entries.is_empty() {
        lines.push("No pending roster move requests.".to_string());
        return lines.join("\n");
    }

    lines.push("## Processing order".to_string());
    for (idx, entry) in report.order.iter().enumerate() {
        lines.push(format!(
            "{}. {} (points: {}, empty: {})",
            idx + 1,
            entry.team_name,
            entry.points,
            u8::from(entry.has_empty_roster_spot)
        ));
    }
    lines.push(String::new());

    for entry in &report.entries {
        lines.push(format!("## {}", entry.team_name));
        lines.push(format!("- Request ID: {}", entry.request_id));
        lines.push(format!("- Submitted: {}", entry.submitted));
        match (&entry.drop, entry.had_empty_roster_spot) {
            (Some(drop), _) => lines.push(format!("- Drop: {}", drop.player_name)),
            (None, true) => lines.push("- Drop: none (empty roster spot)".to_string()),
            (None, false) => lines.push("- Drop: none".to_string()),
        }
        match &entry.outcome {
            Outcome::Processed { added, .. } => {
                lines.push(format!(
                    "- Add: {} (priority {})",
                    added.player_name, added.priority
                ));
                lines.push("- Result: processed".to_string());
            }
            Outcome::Failed { reason } => {
                if *reason == FailureReason::NoAvailableAdds {
                    lines.push("- Add choices: none available".to_string());
                }
                lines.push(format!("- Result: failed ({})", reason.describe()));
            }
        }
        lines.push(String::new());
    }

    lines.join("\n")
}
