use std::path::Path;
use tracing::debug;

use super::{Link, ProbeFailure, ResultRecord, Severity, MIN_OUTPUT_FIELDS};

/// Ordered tag schema of the pattern output protocol. Each of the first
/// eight pipe-delimited fields must contain its tag; trailing fields are
/// additional links.
const REQUIRED_TAGS: [&str; MIN_OUTPUT_FIELDS] = [
    "CLASS",
    "CATEGORY",
    "COMPONENT",
    "PATTERN_ID",
    "PRIMARY_LINK",
    "OVERALL",
    "OVERALL_INFO",
    "LINK",
];

/// Successful parse of probe stdout
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedOutput {
    Record(ResultRecord),
    /// Valid protocol output whose severity falls outside the applicable
    /// window: the probe does not apply to this system.
    NotApplicable,
}

/// Validate probe stdout against the output protocol and convert it into a
/// result record. The first violation wins.
pub fn parse_output(stdout: &str, probe_path: &Path) -> Result<ParsedOutput, ProbeFailure> {
    let line = stdout.trim_end();
    let fields: Vec<&str> = line.split('|').collect();

    if fields.len() < MIN_OUTPUT_FIELDS {
        return Err(ProbeFailure::InsufficientFields {
            got: fields.len(),
            need: MIN_OUTPUT_FIELDS,
        });
    }

    for (field, tag) in fields.iter().zip(REQUIRED_TAGS) {
        if !field.contains(tag) {
            return Err(ProbeFailure::TagMismatch {
                tag: tag.to_string(),
                field: field.to_string(),
            });
        }
    }

    let severity_raw = field_value(fields[5]);
    let code: i64 = severity_raw
        .trim()
        .parse()
        .map_err(|_| ProbeFailure::InvalidSeverity(severity_raw.to_string()))?;

    if !(0..5).contains(&code) {
        return Ok(ParsedOutput::NotApplicable);
    }
    let Some(severity) = Severity::from_code(code) else {
        // reserved code inside the protocol window
        debug!(
            "Probe {} reported reserved severity {}, treating as not applicable",
            probe_path.display(),
            code
        );
        return Ok(ParsedOutput::NotApplicable);
    };

    let links = fields[MIN_OUTPUT_FIELDS - 1..]
        .iter()
        .map(|field| parse_link(field))
        .collect();

    Ok(ParsedOutput::Record(ResultRecord {
        probe_path: probe_path.to_path_buf(),
        class: field_value(fields[0]).to_string(),
        category: field_value(fields[1]).to_string(),
        component: field_value(fields[2]).to_string(),
        pattern_id: field_value(fields[3]).to_string(),
        primary_link_key: field_value(fields[4]).to_string(),
        severity,
        message: field_value(fields[6]).to_string(),
        links,
    }))
}

/// Everything after the field's first `=`. URLs may themselves contain `=`,
/// so only the first occurrence splits.
fn field_value(field: &str) -> &str {
    field.split_once('=').map(|(_, value)| value).unwrap_or("")
}

fn parse_link(field: &str) -> Link {
    let (key, url) = field.split_once('=').unwrap_or((field, ""));
    let label = key.rsplit('_').next().unwrap_or(key);
    Link {
        key: key.to_string(),
        label: label.to_string(),
        url: url.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn probe() -> PathBuf {
        PathBuf::from("/usr/lib/scpilot/patterns/SLE/sle15all/network-check")
    }

    const VALID_OUTPUT: &str = "CLASS=Network|CATEGORY=General|COMPONENT=eth0|\
        PATTERN_ID=1234|PRIMARY_LINK=META_LINK_TID|OVERALL=4|OVERALL_INFO=Link down|\
        META_LINK_TID=http://example/1234";

    #[test]
    fn valid_output_parses_to_record() {
        let parsed = parse_output(VALID_OUTPUT, &probe()).unwrap();
        let ParsedOutput::Record(record) = parsed else {
            panic!("expected a record");
        };
        assert_eq!(record.severity, Severity::Critical);
        assert_eq!(record.message, "Link down");
        assert_eq!(record.class, "Network");
        assert_eq!(record.pattern_id, "1234");
        assert_eq!(record.links.len(), 1);
        assert_eq!(record.links[0].label, "TID");
        assert_eq!(record.links[0].url, "http://example/1234");
        let primary = record.primary_link().expect("primary link resolves");
        assert_eq!(primary.url, "http://example/1234");
    }

    #[test]
    fn trailing_newline_is_trimmed() {
        let with_newline = format!("{VALID_OUTPUT}\n");
        assert!(matches!(
            parse_output(&with_newline, &probe()).unwrap(),
            ParsedOutput::Record(_)
        ));
    }

    #[test]
    fn too_few_fields_is_rejected_with_count() {
        let err = parse_output("CLASS=a|CATEGORY=b|COMPONENT=c|PATTERN_ID=d|PRIMARY_LINK=e", &probe())
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "insufficient output elements: got 5, need 8"
        );
    }

    #[test]
    fn wrong_tag_is_rejected_with_field() {
        let output = "CLASS=Network|WRONG=General|COMPONENT=eth0|PATTERN_ID=1|\
            PRIMARY_LINK=META_LINK_TID|OVERALL=0|OVERALL_INFO=ok|META_LINK_TID=http://x";
        let err = parse_output(output, &probe()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid output element: CATEGORY not found in WRONG=General"
        );
    }

    #[test]
    fn severity_out_of_window_is_not_applicable() {
        let output = VALID_OUTPUT.replace("OVERALL=4", "OVERALL=7");
        assert_eq!(parse_output(&output, &probe()).unwrap(), ParsedOutput::NotApplicable);

        let output = VALID_OUTPUT.replace("OVERALL=4", "OVERALL=-1");
        assert_eq!(parse_output(&output, &probe()).unwrap(), ParsedOutput::NotApplicable);
    }

    #[test]
    fn reserved_severity_is_not_applicable() {
        let output = VALID_OUTPUT.replace("OVERALL=4", "OVERALL=2");
        assert_eq!(parse_output(&output, &probe()).unwrap(), ParsedOutput::NotApplicable);
    }

    #[test]
    fn non_numeric_severity_is_a_protocol_error() {
        let output = VALID_OUTPUT.replace("OVERALL=4", "OVERALL=high");
        let err = parse_output(&output, &probe()).unwrap_err();
        assert_eq!(err, ProbeFailure::InvalidSeverity("high".to_string()));
    }

    #[test]
    fn url_with_equals_survives_intact() {
        let output = VALID_OUTPUT.replace(
            "META_LINK_TID=http://example/1234",
            "META_LINK_TID=http://example/kb?id=1234&rev=2",
        );
        let ParsedOutput::Record(record) = parse_output(&output, &probe()).unwrap() else {
            panic!("expected a record");
        };
        assert_eq!(record.links[0].url, "http://example/kb?id=1234&rev=2");
    }

    #[test]
    fn multiple_links_keep_order_and_suffix_labels() {
        let output = format!(
            "{VALID_OUTPUT}|META_LINK_BUG=https://bugs.example/42|META_LINK_DOC=https://docs.example/a"
        );
        let ParsedOutput::Record(record) = parse_output(&output, &probe()).unwrap() else {
            panic!("expected a record");
        };
        let labels: Vec<&str> = record.links.iter().map(|l| l.label.as_str()).collect();
        assert_eq!(labels, vec!["TID", "BUG", "DOC"]);
    }

    #[test]
    fn parse_is_idempotent() {
        let first = parse_output(VALID_OUTPUT, &probe()).unwrap();
        let second = parse_output(VALID_OUTPUT, &probe()).unwrap();
        assert_eq!(first, second);

        let bad = "CLASS=a|CATEGORY=b";
        assert_eq!(
            parse_output(bad, &probe()).unwrap_err(),
            parse_output(bad, &probe()).unwrap_err()
        );
    }
}
