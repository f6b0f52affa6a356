use std::fs::File;
use std::io::Write;
use std::path::Path;

use super::{ReportGenerator, ReportResult};
use crate::analysis::AnalysisOutcome;
use crate::probes::Severity;
use crate::report::aggregate::SeverityGroup;

/// HTML report generator producing a single self-contained file
pub struct HtmlReporter;

impl Default for HtmlReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl HtmlReporter {
    pub fn new() -> Self {
        Self
    }

    pub fn save_report(&self, outcome: &AnalysisOutcome, output_path: &Path) -> ReportResult<()> {
        let html = self.generate_html(outcome);
        let mut file = File::create(output_path)?;
        file.write_all(html.as_bytes())?;
        Ok(())
    }

    /// Generate the HTML content
    pub fn generate_html(&self, outcome: &AnalysisOutcome) -> String {
        let mut html = String::new();

        html.push_str("<!DOCTYPE html>\n");
        html.push_str("<html lang=\"en\">\n");
        html.push_str("<head>\n");
        html.push_str("    <meta charset=\"UTF-8\">\n");
        html.push_str(&format!(
            "    <title>Supportconfig Analysis Report for {}</title>\n",
            escape(&outcome.profile.hostname)
        ));
        html.push_str("    <style>\n");
        html.push_str("      a {text-decoration: none}\n");
        html.push_str("      a:link {color:#0000FF;}\n");
        html.push_str("      a:visited {color:#0000FF;}\n");
        html.push_str("      table {border:1px solid black; border-collapse:collapse; width:100%;}\n");
        html.push_str("      td, th {padding:2px 6px;}\n");
        html.push_str("      .group {color:#0000FF; background:#FFCC99; cursor:pointer;}\n");
        html.push_str("      .detail {display:none; background:#FFFFFF;}\n");
        html.push_str("      .cell {background:#EEEEEE;}\n");
        html.push_str("    </style>\n");
        html.push_str("    <script>\n");
        html.push_str("      function toggle(groupId) {\n");
        html.push_str("        var rows = document.querySelectorAll('.' + groupId);\n");
        html.push_str("        for (var i = 0; i < rows.length; i++) {\n");
        html.push_str("          rows[i].style.display = rows[i].style.display === 'table-row' ? 'none' : 'table-row';\n");
        html.push_str("        }\n");
        html.push_str("      }\n");
        html.push_str("    </script>\n");
        html.push_str("</head>\n");
        html.push_str("<body>\n");

        html.push_str("<h1>Supportconfig Analysis Report</h1>\n");
        html.push_str(&self.header_html(outcome));

        for group in &outcome.report.by_severity {
            html.push_str(&self.severity_table_html(group));
        }

        html.push_str(&self.errors_html(outcome));

        html.push_str("</body>\n");
        html.push_str("</html>\n");
        html
    }

    /// Server-information header, mirroring the collector's summary fields
    fn header_html(&self, outcome: &AnalysisOutcome) -> String {
        let profile = &outcome.profile;
        let mut html = String::new();

        html.push_str("<h2><hr />Server Information</h2>\n");
        html.push_str("<table>\n");
        html.push_str(&format!(
            "<tr><td><b>Analysis Date:</b></td><td>{}</td></tr>\n",
            outcome.finished_at.format("%Y-%m-%d %H:%M:%S")
        ));
        html.push_str(&format!(
            "<tr><td><b>Supportconfig Run Date:</b></td><td>{}</td></tr>\n",
            escape(&profile.collected_at)
        ));
        html.push_str(&format!(
            "<tr><td><b>Supportconfig File:</b></td><td>{}</td></tr>\n",
            escape(&outcome.snapshot_name)
        ));
        html.push_str("</table>\n");

        html.push_str("<table>\n");
        html.push_str(&format!(
            "<tr><td><b>Server Name:</b></td><td>{}</td><td><b>Hardware:</b></td><td>{}</td></tr>\n",
            escape(&profile.hostname),
            escape(&profile.hardware)
        ));
        html.push_str(&format!(
            "<tr><td><b>Distribution:</b></td><td>{}</td><td><b>Service Pack:</b></td><td>{}</td></tr>\n",
            escape(&profile.distribution),
            escape(&profile.service_pack)
        ));
        if !profile.addon_distribution.is_empty() {
            html.push_str(&format!(
                "<tr><td><b>Add-on Distribution:</b></td><td>{}</td><td><b>Add-on Service Pack:</b></td><td>{}</td></tr>\n",
                escape(&profile.addon_distribution),
                escape(&profile.addon_service_pack)
            ));
        }
        if !profile.hypervisor.is_empty() && profile.hypervisor != "None" {
            html.push_str(&format!(
                "<tr><td><b>Hypervisor:</b></td><td>{}</td><td><b>Identity:</b></td><td>{}</td></tr>\n",
                escape(&profile.hypervisor),
                escape(&profile.vm_identity)
            ));
        }
        html.push_str(&format!(
            "<tr><td><b>Kernel Version:</b></td><td>{}</td><td><b>Supportconfig Version:</b></td><td>{}</td></tr>\n",
            escape(&profile.kernel_version),
            escape(&profile.collector_version)
        ));
        html.push_str("</table>\n");
        html.push_str("<hr />\n");
        html
    }

    /// One collapsible table per severity level
    fn severity_table_html(&self, group: &SeverityGroup) -> String {
        let color = severity_color(group.severity);
        let mut html = String::new();

        html.push_str(&format!(
            "<h2>Conditions Evaluated as {}<a name=\"{}\"></a></h2>\n",
            group.severity.label(),
            group.severity.label()
        ));
        html.push_str("<table>\n");
        html.push_str(&format!(
            "<tr><th bgcolor=\"{color}\"></th><th class=\"cell\" colspan=\"3\">Category</th><th>Message</th><th>Solutions</th><th bgcolor=\"{color}\"></th></tr>\n"
        ));

        for (class_index, class_group) in group.classes.iter().enumerate() {
            let group_id = format!("sev{}-class{}", group.severity.code(), class_index);

            html.push_str(&format!(
                "<tr class=\"group\" onclick=\"toggle('{group_id}')\"><td bgcolor=\"{color}\" width=\"2%\">&nbsp;</td><td width=\"6%\">{}</td><td width=\"5%\">&nbsp;</td><td width=\"5%\">&nbsp;</td><td>{} {} Message(s)</td><td width=\"8%\">&nbsp;</td><td bgcolor=\"{color}\" width=\"2%\">&nbsp;</td></tr>\n",
                escape(&class_group.class),
                class_group.records.len(),
                escape(&class_group.class)
            ));

            for record in &class_group.records {
                let main_url = record
                    .primary_link()
                    .map(|link| link.url.as_str())
                    .unwrap_or("");
                let mut links = String::new();
                for link in &record.links {
                    links.push_str(&format!(
                        "<a href=\"{}\" target=\"_blank\">{}</a> ",
                        escape(&link.url),
                        escape(&link.label)
                    ));
                }
                html.push_str(&format!(
                    "<tr class=\"detail {group_id}\"><td bgcolor=\"{color}\" width=\"2%\">&nbsp;</td><td class=\"cell\" width=\"6%\">{}</td><td class=\"cell\" width=\"5%\">{}</td><td class=\"cell\" width=\"5%\">{}</td><td><a href=\"{}\" target=\"_blank\">{}</a></td><td width=\"8%\">{}</td><td bgcolor=\"{color}\" width=\"2%\">&nbsp;</td></tr>\n",
                    escape(&record.class),
                    escape(&record.category),
                    escape(&record.component),
                    escape(main_url),
                    escape(&record.message),
                    links
                ));
            }
        }

        html.push_str("</table>\n");
        html
    }

    /// Probes that failed or violated the output protocol
    fn errors_html(&self, outcome: &AnalysisOutcome) -> String {
        let errors = &outcome.report.errors;
        if errors.is_empty() {
            return String::new();
        }
        let mut html = String::new();
        html.push_str("<h2>Probes Not Evaluated</h2>\n");
        html.push_str("<table>\n");
        html.push_str("<tr><th class=\"cell\">Probe</th><th class=\"cell\">Reason</th></tr>\n");
        for error in errors {
            html.push_str(&format!(
                "<tr><td>{}</td><td>{}</td></tr>\n",
                escape(&error.probe_path.display().to_string()),
                escape(&error.reason)
            ));
        }
        html.push_str("</table>\n");
        html
    }
}

impl ReportGenerator for HtmlReporter {
    fn generate(&self, outcome: &AnalysisOutcome, output_path: &Path) -> ReportResult<()> {
        self.save_report(outcome, output_path)
    }

    fn name(&self) -> &'static str {
        "html"
    }
}

fn severity_color(severity: Severity) -> &'static str {
    match severity {
        Severity::Critical => "#FF0000",
        Severity::Warning => "#FFFF00",
        Severity::Recommended => "#1975FF",
        Severity::Success => "#00FF00",
    }
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probes::{Link, ProbeResult, ResultRecord};
    use crate::report::aggregate::aggregate;
    use crate::snapshot::{Fingerprint, ProductIdentity, SystemProfile};
    use std::path::PathBuf;

    fn record(primary_key: &str) -> ResultRecord {
        ResultRecord {
            probe_path: PathBuf::from("/patterns/SLE/sle15all/net-check"),
            class: "Network".to_string(),
            category: "General".to_string(),
            component: "eth0".to_string(),
            pattern_id: "1234".to_string(),
            primary_link_key: primary_key.to_string(),
            severity: crate::probes::Severity::Critical,
            message: "Link down".to_string(),
            links: vec![Link {
                key: "META_LINK_TID".to_string(),
                label: "TID".to_string(),
                url: "http://example/1234".to_string(),
            }],
        }
    }

    fn outcome(primary_key: &str) -> AnalysisOutcome {
        let results = vec![ProbeResult::record("/p", record(primary_key))];
        AnalysisOutcome {
            run_id: "run-1".to_string(),
            started_at: chrono::Utc::now(),
            finished_at: chrono::Utc::now(),
            snapshot_dir: PathBuf::from("/tmp/nts_host"),
            snapshot_name: "nts_host".to_string(),
            fingerprint: Fingerprint {
                products: vec![ProductIdentity {
                    tag: "sle".to_string(),
                    pattern_tag: "SLE".to_string(),
                    major_version: "15".to_string(),
                    minor_version: "3".to_string(),
                }],
            },
            profile: SystemProfile {
                hostname: "sles15host".to_string(),
                distribution: "SUSE Linux Enterprise Server 15 SP3".to_string(),
                service_pack: "3".to_string(),
                ..Default::default()
            },
            filter_labels: vec!["local".to_string(), "sle15all".to_string()],
            report: aggregate(&results),
        }
    }

    #[test]
    fn report_contains_header_and_severity_sections() {
        let html = HtmlReporter::new().generate_html(&outcome("META_LINK_TID"));
        assert!(html.contains("Supportconfig Analysis Report for sles15host"));
        assert!(html.contains("<b>Server Name:</b></td><td>sles15host"));
        for label in ["Critical", "Warning", "Recommended", "Success"] {
            assert!(html.contains(&format!("Conditions Evaluated as {label}")));
        }
        assert!(html.contains("href=\"http://example/1234\""));
        assert!(html.contains("1 Network Message(s)"));
    }

    #[test]
    fn unresolved_primary_link_renders_empty_href() {
        let html = HtmlReporter::new().generate_html(&outcome("META_LINK_MISSING"));
        assert!(html.contains("<a href=\"\" target=\"_blank\">Link down</a>"));
    }

    #[test]
    fn markup_in_messages_is_escaped() {
        let mut out = outcome("META_LINK_TID");
        let results = vec![ProbeResult::record("/p", {
            let mut r = record("META_LINK_TID");
            r.message = "value <script> & more".to_string();
            r
        })];
        out.report = aggregate(&results);
        let html = HtmlReporter::new().generate_html(&out);
        assert!(html.contains("value &lt;script&gt; &amp; more"));
        assert!(!html.contains("value <script>"));
    }
}
