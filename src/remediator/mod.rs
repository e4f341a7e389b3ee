pub mod dockerfile;
pub mod manifest;

use std::error::Error;

use crate::plan::RemediationPlan;

/// Applies a remediation plan: bump the Dockerfile base image, then bump the
/// manifest's vulnerable packages. Each step is independent and idempotent.
pub async fn run(
    plan: &RemediationPlan,
    dockerfile_path: &str,
    manifest_path: &str,
    token: Option<String>,
) -> Result<(), Box<dyn Error>> {
    dockerfile::bump_base_image(plan, dockerfile_path, token).await?;
    manifest::bump_packages(plan, manifest_path)?;
    Ok(())
}
