//! Text rendering of progress and reports.

use colored::{ColoredString, Colorize};
use rk_protocol::pipeline_models::{PipelineStepId, ProgressStep, ResearchProgress, StepStatus};
use rk_protocol::report_models::{FollowUpResponse, ReportSummary, ResearchReport};
use std::fmt::Write;

/// Prints one line per visible change of the progress model.
#[derive(Debug, Default)]
pub struct ProgressPrinter {
    last: Option<(PipelineStepId, Option<String>)>,
}

impl ProgressPrinter {
    pub fn new() -> Self {
        Self::default()
    }

    /// The line to print for `progress`, if anything changed since the last one.
    pub fn update(&mut self, progress: &ResearchProgress) -> Option<String> {
        let step = progress.active_step()?;
        let key = (step.id, step.detail.clone());
        if self.last.as_ref() == Some(&key) {
            return None;
        }
        self.last = Some(key);

        let mut line = format!(
            "{} {} {}",
            percent(progress.progress_percent).dimmed(),
            marker(step.status),
            step.label
        );
        if let Some(detail) = &step.detail {
            let _ = write!(line, " ({})", detail.dimmed());
        }
        Some(line)
    }
}

fn percent(value: u8) -> String {
    format!("[{value:>3}%]")
}

fn marker(status: StepStatus) -> ColoredString {
    match status {
        StepStatus::Pending => "·".dimmed(),
        StepStatus::Active => "▶".cyan().bold(),
        StepStatus::Complete => "✓".green(),
        StepStatus::Error => "✗".red().bold(),
    }
}

fn step_line(step: &ProgressStep) -> String {
    let label = match step.status {
        StepStatus::Pending => step.label.dimmed(),
        StepStatus::Active => step.label.cyan(),
        StepStatus::Complete => step.label.normal(),
        StepStatus::Error => step.label.red(),
    };
    format!("  {} {label}", marker(step.status))
}

/// Full step list with the final status of each step.
pub fn render_steps(progress: &ResearchProgress) -> String {
    let mut out = String::new();
    for step in &progress.steps {
        let _ = writeln!(out, "{}", step_line(step));
    }
    let _ = write!(out, "  {}", percent(progress.progress_percent).bold());
    out
}

pub fn render_report(report: &ResearchReport) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "{}", report.question.bold());
    let _ = writeln!(
        out,
        "{}",
        format!(
            "Report {} · {} of {} papers used",
            report.id, report.papers_used, report.total_papers_searched
        )
        .dimmed()
    );

    section(&mut out, "Summary");
    let _ = writeln!(out, "{}", report.executive_summary);

    if !report.key_findings.is_empty() {
        section(&mut out, "Key findings");
        for finding in &report.key_findings {
            let refs: Vec<String> = finding
                .source_indices
                .iter()
                .map(|index| format!("[{index}]"))
                .collect();
            let _ = writeln!(
                out,
                "  • {} {} {}",
                finding.statement,
                refs.join("").dimmed(),
                confidence(&finding.confidence)
            );
        }
    }

    if !report.protocols.is_empty() {
        section(&mut out, "Protocols");
        for protocol in &report.protocols {
            let mut line = format!("  • {} ({}): {}", protocol.name.bold(), protocol.species, protocol.dosage);
            if let Some(frequency) = &protocol.frequency {
                let _ = write!(line, ", {frequency}");
            }
            if let Some(duration) = &protocol.duration {
                let _ = write!(line, ", {duration}");
            }
            let _ = writeln!(out, "{line} → {} [{}]", protocol.result, protocol.source_index);
        }
    }

    if !report.detailed_analysis.is_empty() {
        section(&mut out, "Analysis");
        let _ = writeln!(out, "{}", report.detailed_analysis);
    }

    if !report.limitations.is_empty() {
        section(&mut out, "Limitations");
        let _ = writeln!(out, "{}", report.limitations);
    }

    if !report.sources.is_empty() {
        section(&mut out, "Sources");
        for source in &report.sources {
            let _ = writeln!(
                out,
                "  [{}] {}. {} ({}). {}",
                source.index,
                source.title,
                source.journal.italic(),
                source.year,
                source.url.dimmed()
            );
        }
    }

    out
}

/// One line per stored report, in the order the server lists them.
pub fn render_report_list(reports: &[ReportSummary]) -> String {
    if reports.is_empty() {
        return "No reports yet".dimmed().to_string();
    }

    reports
        .iter()
        .map(|summary| {
            let generated = summary.generated_at.as_deref().unwrap_or("-");
            format!(
                "{}  {}  {}",
                summary.id.as_str().bold(),
                summary.question,
                format!("{generated} · {} papers", summary.papers_used).dimmed()
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn render_follow_up(response: &FollowUpResponse) -> String {
    format!("{}\n{}", response.question.bold(), response.answer)
}

fn section(out: &mut String, title: &str) {
    let _ = writeln!(out, "\n{}", title.bold().underline());
}

fn confidence(level: &str) -> ColoredString {
    let tag = format!("({level})");
    match level {
        "high" => tag.green(),
        "medium" => tag.yellow(),
        "low" => tag.red(),
        _ => tag.dimmed(),
    }
}
