use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;
use std::error::Error;
use std::fs;

use crate::plan::RemediationPlan;
use crate::analyzer::report::Vulnerability;

const SECTIONS: [&str; 2] = ["dependencies", "devDependencies"];

static GE_PREFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^>=\s*").unwrap());

/// Strips a leading `>=` operator (and surrounding whitespace) from a
/// version specifier.
pub fn clean_version_spec(spec: &str) -> String {
    GE_PREFIX.replace(spec, "").trim().to_string()
}

/// Normalization pass: strip `>=` prefixes from every string specifier in
/// both dependency sections, in place. Returns whether anything changed.
fn normalize_sections(doc: &mut Value) -> bool {
    let mut changed = false;

    for section in SECTIONS {
        let Some(deps) = doc.get_mut(section).and_then(Value::as_object_mut) else {
            continue;
        };

        for (pkg, spec) in deps.iter_mut() {
            let Some(old) = spec.as_str().map(String::from) else {
                continue;
            };

            let cleaned = clean_version_spec(&old);
            if cleaned != old {
                println!("🔄 Cleaning {}: {} '{}' → '{}'", section, pkg, old, cleaned);
                *spec = Value::String(cleaned);
                changed = true;
            }
        }
    }

    changed
}

/// Maps each vulnerable package to the best (lexicographically greatest)
/// fixed version named across the plan's application vulnerabilities, with
/// operator prefixes stripped. Same string ordering as the tag selection.
fn best_fixed_versions(vulns: &[Vulnerability]) -> HashMap<String, String> {
    let mut best: HashMap<String, String> = HashMap::new();

    for vuln in vulns {
        let (Some(pkg), Some(fixed)) = (&vuln.pkg_name, &vuln.fixed_version) else {
            continue;
        };
        if pkg.is_empty() || fixed.is_empty() {
            continue;
        }

        let cleaned = clean_version_spec(fixed);
        match best.get(pkg) {
            Some(existing) if *existing >= cleaned => {}
            _ => {
                best.insert(pkg.clone(), cleaned);
            }
        }
    }

    best
}

/// CVE-fix pass: overwrite specifiers of packages named by the plan with
/// their fixed versions. Returns whether anything changed.
fn apply_fixed_versions(doc: &mut Value, fixes: &HashMap<String, String>) -> bool {
    if fixes.is_empty() {
        return false;
    }

    println!("🔧 Bumping vulnerable packages to fixed versions...");
    let mut changed = false;

    for section in SECTIONS {
        let Some(deps) = doc.get_mut(section).and_then(Value::as_object_mut) else {
            continue;
        };

        for (pkg, spec) in deps.iter_mut() {
            let Some(fixed) = fixes.get(pkg) else {
                continue;
            };

            if spec.as_str() != Some(fixed.as_str()) {
                let old = spec
                    .as_str()
                    .map(String::from)
                    .unwrap_or_else(|| spec.to_string());
                println!("🔄 {}: {} '{}' → '{}'", section, pkg, old, fixed);
                *spec = Value::String(fixed.clone());
                changed = true;
            }
        }
    }

    changed
}

/// Runs both manifest passes and writes the file once at the end iff either
/// pass changed anything.
pub fn bump_packages(plan: &RemediationPlan, manifest_path: &str) -> Result<bool, Box<dyn Error>> {
    let raw = fs::read_to_string(manifest_path)?;
    let mut doc: Value = serde_json::from_str(&raw)?;
    let mut changed = false;

    println!("🔧 Stripping all leading '>=' from package.json...");
    if normalize_sections(&mut doc) {
        changed = true;
        println!("✅ Removed all '>=' operators from package.json");
    } else {
        println!("ℹ️ No '>=' operators found in package.json to remove");
    }

    let fixes = best_fixed_versions(&plan.app_vulnerabilities);
    if apply_fixed_versions(&mut doc, &fixes) {
        changed = true;
    }

    if changed {
        fs::write(manifest_path, serde_json::to_string_pretty(&doc)?)?;
        println!("✅ package.json fully updated");
    } else {
        println!("ℹ️ package.json already up-to-date (no changes)");
    }

    Ok(changed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn vuln(pkg: &str, fixed: &str) -> Vulnerability {
        Vulnerability {
            pkg_name: Some(pkg.to_string()),
            fixed_version: Some(fixed.to_string()),
            extra: serde_json::Map::new(),
        }
    }

    fn plan_with(vulns: Vec<Vulnerability>) -> RemediationPlan {
        RemediationPlan {
            base_image: None,
            base_vulnerabilities: Vec::new(),
            app_vulnerabilities: vulns,
        }
    }

    #[test]
    fn strips_ge_prefix() {
        assert_eq!(clean_version_spec(">=1.2.0"), "1.2.0");
        assert_eq!(clean_version_spec(">= 1.2.0 "), "1.2.0");
        assert_eq!(clean_version_spec("^1.2.0"), "^1.2.0");
    }

    #[test]
    fn normalization_rewrites_both_sections() {
        let mut doc = json!({
            "dependencies": {"left-pad": ">=1.2.0", "express": "4.18.0"},
            "devDependencies": {"jest": ">= 29.0.0"}
        });

        assert!(normalize_sections(&mut doc));
        assert_eq!(doc["dependencies"]["left-pad"], "1.2.0");
        assert_eq!(doc["dependencies"]["express"], "4.18.0");
        assert_eq!(doc["devDependencies"]["jest"], "29.0.0");
    }

    #[test]
    fn normalization_is_idempotent() {
        let mut doc = json!({
            "dependencies": {"left-pad": ">=1.2.0"}
        });

        assert!(normalize_sections(&mut doc));
        let after_first = doc.clone();
        assert!(!normalize_sections(&mut doc));
        assert_eq!(doc, after_first);
    }

    #[test]
    fn cve_pass_overwrites_vulnerable_entries() {
        let mut doc = json!({
            "dependencies": {"foo": "1.0.0", "bar": "3.0.0"}
        });
        let fixes = best_fixed_versions(&[vuln("foo", ">=2.0.0")]);

        assert!(apply_fixed_versions(&mut doc, &fixes));
        assert_eq!(doc["dependencies"]["foo"], "2.0.0");
        assert_eq!(doc["dependencies"]["bar"], "3.0.0");
    }

    #[test]
    fn best_fixed_version_is_the_lexicographic_maximum() {
        let fixes = best_fixed_versions(&[
            vuln("foo", ">=1.10.0"),
            vuln("foo", "1.2.0"),
            vuln("foo", ">= 1.9.1"),
        ]);
        // string comparison: "1.9.1" > "1.2.0" > "1.10.0"
        assert_eq!(fixes.get("foo").map(String::as_str), Some("1.9.1"));
    }

    #[test]
    fn records_without_pkg_or_fixed_version_are_ignored() {
        let incomplete = Vulnerability {
            pkg_name: Some("foo".to_string()),
            fixed_version: None,
            extra: serde_json::Map::new(),
        };
        let empty = vuln("", "2.0.0");

        let fixes = best_fixed_versions(&[incomplete, empty]);
        assert!(fixes.is_empty());
    }

    #[test]
    fn manifest_is_written_once_and_preserves_other_fields() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(
            br#"{
  "name": "demo-app",
  "version": "0.1.0",
  "dependencies": {"foo": "1.0.0", "left-pad": ">=1.2.0"},
  "scripts": {"start": "node index.js"}
}"#,
        )
        .unwrap();
        let path = file.path().to_str().unwrap();

        let plan = plan_with(vec![vuln("foo", ">=2.0.0")]);
        assert!(bump_packages(&plan, path).unwrap());

        let doc: Value = serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(doc["dependencies"]["foo"], "2.0.0");
        assert_eq!(doc["dependencies"]["left-pad"], "1.2.0");
        assert_eq!(doc["name"], "demo-app");
        assert_eq!(doc["scripts"]["start"], "node index.js");
    }

    #[test]
    fn clean_manifest_is_left_untouched() {
        let original = r#"{
  "dependencies": {"express": "4.18.0"}
}"#;
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(original.as_bytes()).unwrap();
        let path = file.path().to_str().unwrap();

        let plan = plan_with(Vec::new());
        assert!(!bump_packages(&plan, path).unwrap());
        assert_eq!(fs::read_to_string(path).unwrap(), original);
    }

    #[test]
    fn rerunning_with_the_same_plan_changes_nothing_further() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(br#"{"dependencies": {"foo": ">=1.0.0"}}"#)
            .unwrap();
        let path = file.path().to_str().unwrap();

        let plan = plan_with(vec![vuln("foo", ">=2.0.0")]);
        assert!(bump_packages(&plan, path).unwrap());
        let after_first = fs::read_to_string(path).unwrap();

        assert!(!bump_packages(&plan, path).unwrap());
        assert_eq!(fs::read_to_string(path).unwrap(), after_first);
    }
}
