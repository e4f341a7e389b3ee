use reqwest::Client;
use serde::Deserialize;
use std::error::Error;

const GITHUB_API_BASE: &str = "https://api.github.com";
const PER_PAGE: u32 = 100;
/// Hard stop for the pagination loop in case the API never returns an
/// empty page.
const MAX_PAGES: u32 = 50;

/// GHCR package-version client for the GitHub REST API
pub struct RegistryClient {
    client: Client,
    token: String,
    api_base: String,
}

#[derive(Debug, Deserialize)]
struct PackageVersion {
    #[serde(default)]
    metadata: Option<VersionMetadata>,
}

#[derive(Debug, Deserialize)]
struct VersionMetadata {
    #[serde(default)]
    container: Option<ContainerMetadata>,
}

#[derive(Debug, Deserialize)]
struct ContainerMetadata {
    #[serde(default)]
    tags: Vec<String>,
}

impl RegistryClient {
    pub fn new(token: String) -> Self {
        Self::with_api_base(token, GITHUB_API_BASE.to_string())
    }

    fn with_api_base(token: String, api_base: String) -> Self {
        Self {
            client: Client::new(),
            token,
            api_base,
        }
    }

    /// Collect every container tag published for `owner/pkg`, walking the
    /// paginated versions listing until an empty page comes back.
    pub async fn fetch_all_tags(
        &self,
        owner: &str,
        pkg: &str,
    ) -> Result<Vec<String>, Box<dyn Error>> {
        let url = format!(
            "{}/users/{}/packages/container/{}/versions",
            self.api_base, owner, pkg
        );

        let mut tags = Vec::new();
        let mut page: u32 = 1;

        loop {
            if page > MAX_PAGES {
                return Err(format!(
                    "GHCR pagination did not terminate after {} pages",
                    MAX_PAGES
                )
                .into());
            }

            let response = self
                .client
                .get(&url)
                .query(&[("per_page", PER_PAGE), ("page", page)])
                .header("Authorization", format!("Bearer {}", self.token))
                .header("User-Agent", "vulnmend")
                .header("Accept", "application/vnd.github+json")
                .send()
                .await?;

            if !response.status().is_success() {
                return Err(format!("GitHub API error: {}", response.status()).into());
            }

            let versions: Vec<PackageVersion> = response.json().await?;
            if versions.is_empty() {
                break;
            }

            for version in versions {
                if let Some(container) = version.metadata.and_then(|m| m.container) {
                    tags.extend(container.tags);
                }
            }

            page += 1;
        }

        Ok(tags)
    }

    /// Fetch the latest tag for `owner/pkg`. Errors when the package has no
    /// tags at all.
    pub async fn fetch_latest_tag(&self, owner: &str, pkg: &str) -> Result<String, Box<dyn Error>> {
        let tags = self.fetch_all_tags(owner, pkg).await?;
        latest_tag(&tags).ok_or_else(|| "No tags found in GHCR".into())
    }
}

/// Plain string maximum over the tag list. Deliberately NOT semver-aware:
/// "1.2.0" beats "1.10.0". The CI jobs consuming these tags rely on the
/// string ordering, so keep it.
pub fn latest_tag(tags: &[String]) -> Option<String> {
    tags.iter().max().cloned()
}
