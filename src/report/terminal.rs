use colored::{ColoredString, Colorize};

use super::ReportResult;
use crate::analysis::AnalysisOutcome;
use crate::probes::Severity;

/// Terminal formatting constants
const TERMINAL_WIDTH: usize = 80;
const SEPARATOR_WIDTH: usize = 40;

/// Terminal report generator for console output
pub struct TerminalReporter {
    verbose: bool,
}

impl Default for TerminalReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl TerminalReporter {
    pub fn new() -> Self {
        Self { verbose: false }
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn print(&self, outcome: &AnalysisOutcome) -> ReportResult<()> {
        self.print_header();
        self.print_system_info(outcome);
        self.print_summary(outcome);
        self.print_findings(outcome);
        self.print_errors(outcome);
        self.print_footer(outcome);
        Ok(())
    }

    fn print_header(&self) {
        println!("\n{}", "═".repeat(TERMINAL_WIDTH).bright_blue());
        println!("{}", "SUPPORTCONFIG ANALYSIS REPORT".bright_white().bold());
        println!("{}", "═".repeat(TERMINAL_WIDTH).bright_blue());
    }

    fn print_system_info(&self, outcome: &AnalysisOutcome) {
        let profile = &outcome.profile;
        println!("\n{}", "Server Information".bright_white().bold());
        println!("{}", "─".repeat(SEPARATOR_WIDTH).bright_black());

        if !profile.hostname.is_empty() {
            println!("  Server Name:     {}", profile.hostname.bright_cyan());
        }
        if !profile.distribution.is_empty() {
            println!("  Distribution:    {}", profile.distribution.bright_cyan());
            println!("  Service Pack:    {}", profile.service_pack.bright_cyan());
        }
        if !profile.addon_distribution.is_empty() {
            println!("  Add-on:          {}", profile.addon_distribution.bright_cyan());
        }
        if !profile.kernel_version.is_empty() {
            println!("  Kernel Version:  {}", profile.kernel_version.bright_cyan());
        }
        if !profile.hardware.is_empty() {
            println!("  Hardware:        {}", profile.hardware.bright_cyan());
        }
        if !profile.hypervisor.is_empty() {
            println!("  Hypervisor:      {}", profile.hypervisor.bright_cyan());
        }
        if !profile.collected_at.is_empty() {
            println!("  Collected:       {}", profile.collected_at.bright_cyan());
        }
        println!("  Fingerprint:     {}", outcome.fingerprint.describe().bright_cyan());
        println!("  Pattern Filter:  {}", outcome.filter_labels.join(" ").bright_cyan());
    }

    fn print_summary(&self, outcome: &AnalysisOutcome) {
        let counts = &outcome.report.counts;
        println!("\n{}", "Analysis Summary".bright_white().bold());
        println!("{}", "─".repeat(SEPARATOR_WIDTH).bright_black());

        println!("  Probes Run:      {}", counts.total.to_string().bright_yellow());
        println!("  Applied:         {}", counts.applied.to_string().bright_yellow());
        println!("  Not Applicable:  {}", counts.not_applicable.to_string().bright_yellow());
        println!("  Failed:          {}", counts.errors.to_string().bright_yellow());
        println!();
        for severity in Severity::REPORT_ORDER {
            let count = counts.for_severity(severity);
            if count > 0 {
                println!(
                    "  {:13}{}",
                    format!("{}:", severity.label()),
                    severity_colored(severity, &count.to_string()).bold()
                );
            }
        }
    }

    fn print_findings(&self, outcome: &AnalysisOutcome) {
        for group in &outcome.report.by_severity {
            if group.total() == 0 {
                continue;
            }
            println!(
                "\n{}",
                severity_colored(group.severity, &format!(
                    "Conditions Evaluated as {} ({})",
                    group.severity.label(),
                    group.total()
                ))
                .bold()
            );
            println!("{}", "─".repeat(SEPARATOR_WIDTH).bright_black());

            for class_group in &group.classes {
                println!(
                    "  {} ({} message{})",
                    class_group.class.bright_white().bold(),
                    class_group.records.len(),
                    if class_group.records.len() == 1 { "" } else { "s" }
                );
                for record in &class_group.records {
                    println!(
                        "    • [{}/{}] {}",
                        record.category,
                        record.component,
                        record.message
                    );
                    if self.verbose {
                        if let Some(link) = record.primary_link() {
                            println!("      {} {}", link.label.bright_black(), link.url.bright_black());
                        }
                        println!("      {}", record.probe_path.display().to_string().bright_black());
                    }
                }
            }
        }
    }

    fn print_errors(&self, outcome: &AnalysisOutcome) {
        let errors = &outcome.report.errors;
        if errors.is_empty() {
            return;
        }
        println!("\n{}", "Probes Not Evaluated".bright_red().bold());
        println!("{}", "─".repeat(SEPARATOR_WIDTH).bright_black());
        for error in errors {
            println!("  {}", error.probe_path.display());
            println!("    {}", error.reason.bright_black());
        }
    }

    fn print_footer(&self, outcome: &AnalysisOutcome) {
        println!("\n{}", "═".repeat(TERMINAL_WIDTH).bright_blue());
        println!(
            "Run {} finished at {}",
            outcome.run_id,
            outcome.finished_at.format("%Y-%m-%d %H:%M:%S UTC")
        );
        println!("{}", "═".repeat(TERMINAL_WIDTH).bright_blue());
    }
}

fn severity_colored(severity: Severity, text: &str) -> ColoredString {
    match severity {
        Severity::Critical => text.bright_red(),
        Severity::Warning => text.bright_yellow(),
        Severity::Recommended => text.bright_blue(),
        Severity::Success => text.bright_green(),
    }
}
