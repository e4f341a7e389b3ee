pub mod report;

use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fs;

use crate::plan::{self, RemediationPlan};
use report::ScanReport;

/// Class marker Trivy puts on results coming from OS packages, i.e. the
/// base image layer.
const OS_PKGS_CLASS: &str = "os-pkgs";

static FROM_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^\s*FROM\s+(\S+)").unwrap());

/// Returns the base image reference from the first `FROM` line of the
/// Dockerfile, or `None` when no line matches. Errors only when the file
/// cannot be read.
pub fn extract_base_image(dockerfile_path: &str) -> Result<Option<String>, Box<dyn Error>> {
    let content = fs::read_to_string(dockerfile_path)?;

    for line in content.lines() {
        if let Some(caps) = FROM_LINE.captures(line) {
            return Ok(Some(caps[1].to_string()));
        }
    }

    Ok(None)
}

/// Partitions the report's vulnerabilities into base-image vs. application
/// findings and writes the remediation plan to `output_path`.
pub fn analyze_report(
    report_path: &str,
    dockerfile_path: &str,
    output_path: &str,
) -> Result<RemediationPlan, Box<dyn Error>> {
    let raw = fs::read_to_string(report_path)?;
    let report: ScanReport = serde_json::from_str(&raw)?;

    let base_image = extract_base_image(dockerfile_path)?;

    let mut base_vulnerabilities = Vec::new();
    let mut app_vulnerabilities = Vec::new();

    for result in &report.results {
        let vulns = match &result.vulnerabilities {
            Some(v) if !v.is_empty() => v,
            _ => continue,
        };

        if result.class.contains(OS_PKGS_CLASS) {
            base_vulnerabilities.extend(vulns.iter().cloned());
        } else {
            app_vulnerabilities.extend(vulns.iter().cloned());
        }
    }

    for result in &report.results {
        println!("Found target: {}", result.target);
    }

    let remediation_plan = RemediationPlan {
        base_image,
        base_vulnerabilities,
        app_vulnerabilities,
    };

    plan::save_plan(output_path, &remediation_plan)?;
    println!("Remediation plan written to {}", output_path);

    Ok(remediation_plan)
}
