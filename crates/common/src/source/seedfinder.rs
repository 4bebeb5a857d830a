//! Seedfinder HTTP client

use super::{parse, StrainSource};
use crate::config::SourceConfig;
use crate::db::models::NewStrain;
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE};
use reqwest::Url;
use std::time::Duration;
use tracing::{debug, warn};

/// Scrapes strain pages from seedfinder.eu
pub struct SeedfinderClient {
    client: reqwest::Client,
    base_url: String,
    delay: Duration,
}

impl SeedfinderClient {
    /// `delay` is the pause between consecutive search requests in discovery
    pub fn new(config: &SourceConfig, delay: Duration) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .default_headers(headers)
            .build()
            .map_err(|e| AppError::Configuration {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            delay,
        })
    }

    fn search_url(&self, query: &str) -> Result<Url> {
        Url::parse_with_params(
            &format!("{}/en/search/results", self.base_url),
            &[("search", query), ("isExtended", "false")],
        )
        .map_err(|e| AppError::Configuration {
            message: format!("Invalid source base URL: {}", e),
        })
    }

    async fn get_html(&self, url: &str) -> Result<String> {
        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(AppError::Upstream {
                message: format!("{} returned {}", url, status),
            });
        }

        Ok(response.text().await?)
    }
}

#[async_trait]
impl StrainSource for SeedfinderClient {
    async fn fetch(&self, url: &str) -> Result<NewStrain> {
        debug!(url = %url, "Fetching strain page");
        let html = self.get_html(url).await?;
        Ok(parse::parse_strain_page(&html, url))
    }

    async fn search(&self, query: &str) -> Result<Vec<String>> {
        let url = self.search_url(query)?;
        let html = match self.get_html(url.as_str()).await {
            Ok(html) => html,
            Err(e) => {
                warn!(query = %query, error = %e, "Strain search failed");
                return Ok(Vec::new());
            }
        };

        let urls = parse::extract_strain_urls(&html, &self.base_url);
        debug!(query = %query, found = urls.len(), "Strain search finished");
        Ok(urls)
    }

    fn request_delay(&self) -> Duration {
        self.delay
    }

    fn name(&self) -> &str {
        "seedfinder"
    }
}
