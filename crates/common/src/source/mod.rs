//! External strain sources
//!
//! Imports pull strain data through [`StrainSource`]:
//! - `SeedfinderClient` scrapes seedfinder.eu
//! - `MockSource` serves canned pages for tests and offline runs

pub mod parse;
mod seedfinder;

pub use seedfinder::SeedfinderClient;

use crate::config::SourceConfig;
use crate::db::models::{NewStrain, StrainType};
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Search terms used to discover well-known strains
pub const POPULAR_STRAINS: &[&str] = &[
    "white widow", "northern lights", "blue dream", "sour diesel",
    "og kush", "ak-47", "purple haze", "jack herer", "green crack",
    "granddaddy purple", "girl scout cookies", "amnesia haze",
    "skunk #1", "durban poison", "cheese", "super silver haze",
];

/// Trait for strain data providers
#[async_trait]
pub trait StrainSource: Send + Sync {
    /// Fetch and parse one strain page
    async fn fetch(&self, url: &str) -> Result<NewStrain>;

    /// Strain page URLs matching a free-text query
    async fn search(&self, query: &str) -> Result<Vec<String>>;

    /// Pause between consecutive searches during discovery
    fn request_delay(&self) -> Duration {
        Duration::ZERO
    }

    /// Up to `limit` distinct URLs for well-known strains
    async fn discover_popular(&self, limit: usize) -> Result<Vec<String>> {
        let mut urls: Vec<String> = Vec::new();

        for (i, term) in POPULAR_STRAINS.iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(self.request_delay()).await;
            }

            tracing::debug!(term = %term, "Searching popular strain");
            for url in self.search(term).await? {
                if !urls.contains(&url) {
                    urls.push(url);
                }
            }

            if urls.len() >= limit {
                break;
            }
        }

        urls.truncate(limit);
        Ok(urls)
    }

    /// URLs found by searching for the type's name
    async fn discover_by_type(&self, strain_type: StrainType) -> Result<Vec<String>> {
        self.search(strain_type.as_str()).await
    }

    /// Provider name
    fn name(&self) -> &str;
}

/// Canned source for tests
#[derive(Default)]
pub struct MockSource {
    pages: HashMap<String, NewStrain>,
    searches: HashMap<String, Vec<String>>,
    /// Build a record from the URL when no page is registered
    synthesize: bool,
    fetches: AtomicUsize,
}

impl MockSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answers every URL with a minimal record named after its path
    pub fn synthesizing() -> Self {
        Self {
            synthesize: true,
            ..Self::default()
        }
    }

    /// Register a page, keyed by the strain's `seedfinder_url`
    pub fn with_page(mut self, url: impl Into<String>, strain: NewStrain) -> Self {
        let url = url.into();
        self.pages.insert(url.clone(), strain.with_seedfinder_url(url));
        self
    }

    pub fn with_search<I, S>(mut self, query: impl Into<String>, urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.searches
            .insert(query.into(), urls.into_iter().map(Into::into).collect());
        self
    }

    /// Number of `fetch` calls so far
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StrainSource for MockSource {
    async fn fetch(&self, url: &str) -> Result<NewStrain> {
        self.fetches.fetch_add(1, Ordering::SeqCst);

        if let Some(strain) = self.pages.get(url) {
            return Ok(strain.clone());
        }

        match parse::name_and_breeder_from_url(url) {
            Some((name, breeder)) if self.synthesize => {
                let mut strain = NewStrain::new(name, StrainType::Hybrid).with_seedfinder_url(url);
                strain.breeder = breeder;
                Ok(strain)
            }
            _ => Err(AppError::Upstream {
                message: format!("{} returned 404 Not Found", url),
            }),
        }
    }

    async fn search(&self, query: &str) -> Result<Vec<String>> {
        Ok(self.searches.get(query).cloned().unwrap_or_default())
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// Create a strain source based on configuration
pub fn create_source(config: &SourceConfig, delay: Duration) -> Result<Arc<dyn StrainSource>> {
    match config.provider.as_str() {
        "seedfinder" => Ok(Arc::new(SeedfinderClient::new(config, delay)?)),
        "mock" => Ok(Arc::new(MockSource::synthesizing())),
        other => {
            tracing::warn!(provider = other, "Unknown strain source, using mock");
            Ok(Arc::new(MockSource::synthesizing()))
        }
    }
}
