use once_cell::sync::Lazy;
use regex::{NoExpand, Regex};
use std::error::Error;
use std::fs;

use crate::plan::RemediationPlan;
use crate::registry::client::RegistryClient;

const GHCR_REGISTRY: &str = "ghcr.io";

static FROM_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?im)^[ \t]*FROM[ \t]+\S+").unwrap());

/// Splits `registry/owner/name:tag` into `(owner, name)`: drop the registry
/// host before the first `/`, drop the tag after the last `:`.
pub fn parse_image_ref(image_ref: &str) -> Result<(String, String), Box<dyn Error>> {
    let malformed = || format!("Malformed image reference: {}", image_ref);

    let (_, remainder) = image_ref.split_once('/').ok_or_else(malformed)?;
    let (owner_pkg, _) = remainder.rsplit_once(':').ok_or_else(malformed)?;
    let (owner, pkg) = owner_pkg.split_once('/').ok_or_else(malformed)?;

    Ok((owner.to_string(), pkg.to_string()))
}

/// Rewrites the first `FROM` line to point at `new_ref`. Returns whether the
/// file actually changed; errors when there is no `FROM` line to replace.
pub fn rewrite_from_line(dockerfile_path: &str, new_ref: &str) -> Result<bool, Box<dyn Error>> {
    let content = fs::read_to_string(dockerfile_path)?;

    if !FROM_LINE.is_match(&content) {
        return Err("No FROM line found in Dockerfile".into());
    }

    let replacement = format!("FROM {}", new_ref);
    let new_content = FROM_LINE.replace(&content, NoExpand(&replacement));

    if new_content != content {
        fs::write(dockerfile_path, new_content.as_bytes())?;
        println!("✅ Dockerfile FROM updated to {}", new_ref);
        return Ok(true);
    }

    println!("ℹ️ Dockerfile already up-to-date");
    Ok(false)
}

/// Bumps the Dockerfile base image to the latest GHCR tag for the plan's
/// `base_image`. A plan without a base image is a no-op; a missing token is
/// fatal once a bump is actually needed.
pub async fn bump_base_image(
    plan: &RemediationPlan,
    dockerfile_path: &str,
    token: Option<String>,
) -> Result<bool, Box<dyn Error>> {
    let Some(image_ref) = &plan.base_image else {
        println!("ℹ️ No base_image; skipping base image bump");
        return Ok(false);
    };

    let (owner, pkg) = parse_image_ref(image_ref)?;
    let token = token.ok_or("❌ GHCR_TOKEN not set in environment")?;

    let registry = RegistryClient::new(token);
    let latest = registry.fetch_latest_tag(&owner, &pkg).await?;
    let new_ref = format!("{}/{}/{}:{}", GHCR_REGISTRY, owner, pkg, latest);

    rewrite_from_line(dockerfile_path, &new_ref)
}
