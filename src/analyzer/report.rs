use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Trivy JSON report, reduced to the fields classification needs.
#[derive(Debug, Deserialize)]
pub struct ScanReport {
    #[serde(rename = "Results", default)]
    pub results: Vec<ScanResult>,
}

#[derive(Debug, Deserialize)]
pub struct ScanResult {
    #[serde(rename = "Target", default)]
    pub target: String,
    #[serde(rename = "Class", default)]
    pub class: String,
    // Trivy emits null (or omits the key) for clean targets.
    #[serde(rename = "Vulnerabilities", default)]
    pub vulnerabilities: Option<Vec<Vulnerability>>,
}

/// A single vulnerability record. Only `PkgName` and `FixedVersion` are
/// inspected; every other scanner field rides along in `extra` so the
/// remediation plan keeps the full record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vulnerability {
    #[serde(rename = "PkgName", default, skip_serializing_if = "Option::is_none")]
    pub pkg_name: Option<String>,
    #[serde(
        rename = "FixedVersion",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub fixed_version: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
