use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fs;

use crate::analyzer::report::Vulnerability;

/// The contract between the analyzer and the remediator. Written once by
/// `analyze`, read once by `remediate`, never mutated in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemediationPlan {
    #[serde(default)]
    pub base_image: Option<String>,
    #[serde(default)]
    pub base_vulnerabilities: Vec<Vulnerability>,
    #[serde(default)]
    pub app_vulnerabilities: Vec<Vulnerability>,
}

pub fn load_plan(path: &str) -> Result<RemediationPlan, Box<dyn Error>> {
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

pub fn save_plan(path: &str, plan: &RemediationPlan) -> Result<(), Box<dyn Error>> {
    let json = serde_json::to_string_pretty(plan)?;
    fs::write(path, json)?;
    Ok(())
}
