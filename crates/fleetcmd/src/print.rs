//! Text rendering of run reports

use std::fmt::Write;

use colored::*;
use fleetcmd_core::{HostResult, RunReport};

/// Render a run report as text, one block per host in hostname order
pub fn render_report(report: &RunReport) -> String {
    let mut out = String::new();

    for (host, result) in &report.results {
        match result {
            HostResult::Success(outputs) => {
                let _ = writeln!(out, "{} {}", "●".green(), host.bold());
                for entry in outputs {
                    let _ = writeln!(out, "  {} {}", "$".bright_black(), entry.command.cyan());
                    for line in entry.output.lines() {
                        let _ = writeln!(out, "    {line}");
                    }
                }
            }
            HostResult::Failed(failure) => {
                let _ = writeln!(out, "{} {}", "●".red(), host.bold());
                let _ = writeln!(out, "  {}", failure.to_string().red());
            }
        }
        out.push('\n');
    }

    let summary = report.summary();
    let elapsed = report.finished_at - report.started_at;
    let _ = writeln!(
        out,
        "{} {} host(s), {} succeeded, {} failed in {}ms",
        summary.command_type.to_string().bright_black(),
        summary.hosts,
        summary.succeeded.to_string().green(),
        if summary.failed > 0 {
            summary.failed.to_string().red()
        } else {
            summary.failed.to_string().normal()
        },
        elapsed.num_milliseconds()
    );

    out
}
