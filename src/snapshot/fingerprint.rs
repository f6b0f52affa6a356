use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{Snapshot, SnapshotError, SnapshotResult};

/// Directory prefix of the base distribution in the pattern catalog
pub const BASE_PRODUCT_TAG: &str = "sle";

/// Catalog subdirectory of the base distribution
pub const BASE_PATTERN_TAG: &str = "SLE";

/// One product installed on the analyzed system: the base distribution or
/// an add-on layer. `tag` and `major`/`minor` build candidate catalog
/// directory names; `pattern_tag` is the catalog subdirectory.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProductIdentity {
    pub tag: String,
    pub pattern_tag: String,
    pub major_version: String,
    pub minor_version: String,
}

/// Derived identity of the analyzed system. Always carries at least the
/// base distribution, with unresolved versions defaulting to "0".
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Fingerprint {
    pub products: Vec<ProductIdentity>,
}

impl Fingerprint {
    pub fn base(&self) -> &ProductIdentity {
        &self.products[0]
    }

    /// One-line rendition for status output, e.g. `SLE 15 SP3, HAE 3.0`
    pub fn describe(&self) -> String {
        self.products
            .iter()
            .map(|p| format!("{} {} SP{}", p.pattern_tag, p.major_version, p.minor_version))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Report-header fields scraped from the environment-description file.
/// Absent fields stay empty rather than failing the run.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SystemProfile {
    pub hostname: String,
    pub hardware: String,
    pub hypervisor: String,
    pub vm_identity: String,
    pub kernel_version: String,
    pub distribution: String,
    pub service_pack: String,
    pub addon_distribution: String,
    pub addon_service_pack: String,
    pub collector_version: String,
    pub collected_at: String,
}

struct AddonMatcher {
    needles: &'static [&'static str],
    tag: &'static str,
    pattern_tag: &'static str,
}

/// Package-inventory needles identifying add-on product layers
const ADDON_MATCHERS: [AddonMatcher; 5] = [
    AddonMatcher { needles: &["heartbeat"], tag: "hae", pattern_tag: "HAE" },
    AddonMatcher { needles: &["oes"], tag: "oes", pattern_tag: "OES" },
    AddonMatcher { needles: &["edirectory"], tag: "edir", pattern_tag: "eDirectory" },
    AddonMatcher { needles: &["groupwise", "datasync-common"], tag: "gw", pattern_tag: "GroupWise" },
    AddonMatcher { needles: &["filr"], tag: "filr", pattern_tag: "Filr" },
];

/// Derive the system fingerprint and report profile from a snapshot.
pub fn fingerprint(snapshot: &Snapshot) -> SnapshotResult<(Fingerprint, SystemProfile)> {
    let env_text = read_required(&snapshot.environment_file())?;
    let inventory_text = read_required(&snapshot.package_inventory_file())?;

    let mut profile = SystemProfile::default();
    let mut base = ProductIdentity {
        tag: BASE_PRODUCT_TAG.to_string(),
        pattern_tag: BASE_PATTERN_TAG.to_string(),
        major_version: "0".to_string(),
        minor_version: "0".to_string(),
    };

    let lines: Vec<&str> = env_text.lines().collect();
    let mut os_release: Option<Vec<&str>> = None;
    let mut legacy_release: Option<Vec<&str>> = None;
    let mut addon_release: Option<Vec<&str>> = None;

    for (i, line) in lines.iter().enumerate() {
        if let Some(value) = line.strip_prefix("Hardware:") {
            profile.hardware = value.trim().to_string();
        } else if let Some(value) = line.strip_prefix("Hypervisor:") {
            profile.hypervisor = value.trim().to_string();
        } else if let Some(value) = line.strip_prefix("Identity:") {
            profile.vm_identity = value.trim().to_string();
        } else if let Some(value) = line.strip_prefix("Script Version:") {
            profile.collector_version = value.trim().to_string();
        } else if line.contains("/bin/date") {
            if let Some(next) = lines.get(i + 1) {
                profile.collected_at = parse_archive_date(next);
            }
        } else if line.contains("/bin/uname -a") {
            if let Some(next) = lines.get(i + 1) {
                let mut tokens = next.split_whitespace();
                tokens.next();
                profile.hostname = tokens.next().unwrap_or("").to_string();
                profile.kernel_version = tokens.next().unwrap_or("").to_string();
            }
        } else if line.contains("/etc/os-release") {
            os_release = Some(section_body(&lines, i + 1));
        } else if line.contains("/etc/SuSE-release") {
            legacy_release = Some(section_body(&lines, i + 1));
        } else if line.contains("/etc/novell-release") {
            addon_release = Some(section_body(&lines, i + 1));
        }
    }

    if let Some(section) = os_release {
        apply_os_release(&section, &mut base, &mut profile);
    } else if let Some(section) = legacy_release {
        apply_legacy_release(&section, &mut base, &mut profile);
    }

    let oes_from_env = addon_release.and_then(|section| apply_addon_release(&section, &mut profile));

    let mut products = vec![base];
    products.extend(addon_products(&inventory_text, oes_from_env));

    let fingerprint = Fingerprint { products };
    debug!("System fingerprint: {}", fingerprint.describe());
    Ok((fingerprint, profile))
}

fn read_required(path: &Path) -> SnapshotResult<String> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(text),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(SnapshotError::MissingFile(path.to_path_buf()))
        }
        Err(e) => Err(e.into()),
    }
}

/// Lines of a section starting at `start`, up to the next section marker
fn section_body<'a>(lines: &[&'a str], start: usize) -> Vec<&'a str> {
    lines[start.min(lines.len())..]
        .iter()
        .take_while(|line| !line.starts_with("#==["))
        .copied()
        .collect()
}

fn apply_os_release(section: &[&str], base: &mut ProductIdentity, profile: &mut SystemProfile) {
    for line in section {
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let value = value.trim().trim_matches('"');
        match key.trim() {
            "PRETTY_NAME" => profile.distribution = value.to_string(),
            "NAME" if profile.distribution.is_empty() => profile.distribution = value.to_string(),
            "VERSION_ID" => {
                let (major, minor) = split_version(value);
                base.major_version = major;
                base.minor_version = minor.clone();
                profile.service_pack = minor;
            }
            _ => {}
        }
    }
}

/// Legacy release-file section: pretty name on the first line, then
/// `VERSION = N` and `PATCHLEVEL = N` assignments.
fn apply_legacy_release(section: &[&str], base: &mut ProductIdentity, profile: &mut SystemProfile) {
    if let Some(first) = section.iter().find(|l| !l.trim().is_empty()) {
        profile.distribution = first.trim().to_string();
    }
    for line in section {
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let value = value.trim();
        match key.trim() {
            "VERSION" => base.major_version = split_version(value).0,
            "PATCHLEVEL" => {
                base.minor_version = value.to_string();
                profile.service_pack = value.to_string();
            }
            _ => {}
        }
    }
}

/// Add-on release-file section (OES). Returns the version-resolved product
/// identity when the section names an Open Enterprise release.
fn apply_addon_release(section: &[&str], profile: &mut SystemProfile) -> Option<ProductIdentity> {
    let first = section.iter().find(|l| !l.trim().is_empty())?;
    if !first.contains("Open Enterprise") {
        return None;
    }
    profile.addon_distribution = first.trim().to_string();

    let mut identity = ProductIdentity {
        tag: "oes".to_string(),
        pattern_tag: "OES".to_string(),
        major_version: "0".to_string(),
        minor_version: "0".to_string(),
    };
    for line in section {
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let value = value.trim();
        match key.trim() {
            "VERSION" => identity.major_version = split_version(value).0,
            "PATCHLEVEL" => {
                identity.minor_version = value.to_string();
                profile.addon_service_pack = value.to_string();
            }
            _ => {}
        }
    }
    Some(identity)
}

/// Discover add-on products from the package inventory. Lines belonging to
/// the pattern packages themselves are not product evidence.
fn addon_products(inventory: &str, oes_from_env: Option<ProductIdentity>) -> Vec<ProductIdentity> {
    let lines: Vec<&str> = inventory
        .lines()
        .filter(|line| !line.starts_with("sca-patterns"))
        .collect();

    let mut products = Vec::new();
    for matcher in &ADDON_MATCHERS {
        let matched = lines
            .iter()
            .find(|line| matcher.needles.iter().any(|needle| line.contains(needle)));
        let Some(line) = matched else {
            continue;
        };
        if matcher.tag == "oes" {
            if let Some(identity) = &oes_from_env {
                products.push(identity.clone());
                continue;
            }
        }
        let (major, minor) = rpm_line_version(line);
        products.push(ProductIdentity {
            tag: matcher.tag.to_string(),
            pattern_tag: matcher.pattern_tag.to_string(),
            major_version: major,
            minor_version: minor,
        });
    }
    products
}

/// Version of an inventory line: the trailing version-release column with
/// the release part dropped.
fn rpm_line_version(line: &str) -> (String, String) {
    let Some(token) = line.split_whitespace().last() else {
        return ("0".to_string(), "0".to_string());
    };
    let version = token.split('-').next().unwrap_or("");
    split_version(version)
}

/// Split a dotted version into major and minor; a missing minor is "0".
fn split_version(raw: &str) -> (String, String) {
    let raw = raw.trim().trim_matches('"');
    let mut parts = raw.split('.');
    let major = parts.next().filter(|p| !p.is_empty()).unwrap_or("0");
    let minor = parts.next().filter(|p| !p.is_empty()).unwrap_or("0");
    (major.to_string(), minor.to_string())
}

/// Normalize the collector's `date` output to `YYYY-MM-DD HH:MM:SS`
fn parse_archive_date(line: &str) -> String {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    if tokens.len() < 5 {
        return String::new();
    }
    let month = match tokens[1] {
        "Jan" => "01",
        "Feb" => "02",
        "Mar" => "03",
        "Apr" => "04",
        "May" => "05",
        "Jun" => "06",
        "Jul" => "07",
        "Aug" => "08",
        "Sep" => "09",
        "Oct" => "10",
        "Nov" => "11",
        "Dec" => "12",
        _ => return String::new(),
    };
    let day = tokens[2];
    let time = tokens[3];
    let year = tokens[tokens.len() - 1];
    format!("{year}-{month}-{day:0>2} {time}")
}
