//! Import orchestration
//!
//! Turns source URLs into catalog records, at most one record per URL.
//! URLs are processed one at a time with a fixed pause between them, and a
//! failing URL is recorded and skipped rather than aborting the batch.

use crate::db::models::{Strain, StrainType};
use crate::db::StrainStore;
use crate::errors::{AppError, Result};
use crate::metrics;
use crate::source::StrainSource;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use validator::Validate;

/// Result of importing a single URL
#[derive(Debug, Clone, PartialEq)]
pub enum ImportOutcome {
    /// A record with this URL was already in the catalog
    Existing(Strain),
    /// Fetched and inserted
    Imported(Strain),
}

impl ImportOutcome {
    pub fn into_strain(self) -> Strain {
        match self {
            Self::Existing(s) | Self::Imported(s) => s,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ImportStatus {
    Existing { strain: Strain },
    Imported { strain: Strain },
    Failed { reason: String },
}

impl ImportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Existing { .. } => "existing",
            Self::Imported { .. } => "imported",
            Self::Failed { .. } => "failed",
        }
    }
}

impl From<Result<ImportOutcome>> for ImportStatus {
    fn from(result: Result<ImportOutcome>) -> Self {
        match result {
            Ok(ImportOutcome::Existing(strain)) => Self::Existing { strain },
            Ok(ImportOutcome::Imported(strain)) => Self::Imported { strain },
            Err(e) => Self::Failed { reason: e.to_string() },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportEntry {
    pub url: String,
    #[serde(flatten)]
    pub status: ImportStatus,
}

/// Per-URL results of a batch, in input order
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ImportReport {
    pub entries: Vec<ImportEntry>,
}

impl ImportReport {
    /// Existing and imported records, in input order
    pub fn strains(&self) -> Vec<Strain> {
        self.entries
            .iter()
            .filter_map(|entry| match &entry.status {
                ImportStatus::Existing { strain } | ImportStatus::Imported { strain } => {
                    Some(strain.clone())
                }
                ImportStatus::Failed { .. } => None,
            })
            .collect()
    }

    fn count(&self, status: &str) -> usize {
        self.entries.iter().filter(|e| e.status.as_str() == status).count()
    }

    pub fn imported_count(&self) -> usize {
        self.count("imported")
    }

    pub fn existing_count(&self) -> usize {
        self.count("existing")
    }

    pub fn failed_count(&self) -> usize {
        self.count("failed")
    }
}

/// Drives a [`StrainSource`] into a [`StrainStore`]
#[derive(Clone)]
pub struct Importer {
    store: Arc<dyn StrainStore>,
    source: Arc<dyn StrainSource>,
    delay: Duration,
}

impl Importer {
    /// `delay` is the pause between consecutive URLs in a batch
    pub fn new(store: Arc<dyn StrainStore>, source: Arc<dyn StrainSource>, delay: Duration) -> Self {
        Self { store, source, delay }
    }

    /// Import one URL, reusing the existing record when there is one
    pub async fn import_one(&self, url: &str) -> Result<ImportOutcome> {
        let result = self.import_url(url).await;

        let status = match &result {
            Ok(ImportOutcome::Existing(_)) => "existing",
            Ok(ImportOutcome::Imported(_)) => "imported",
            Err(_) => "failed",
        };
        metrics::record_import(status);

        result
    }

    async fn import_url(&self, url: &str) -> Result<ImportOutcome> {
        if let Some(existing) = self.store.find_by_seedfinder_url(url).await? {
            return Ok(ImportOutcome::Existing(existing));
        }

        let mut strain = self.source.fetch(url).await?;
        strain.seedfinder_url = Some(url.to_string());
        strain.validate()?;

        match self.store.insert(strain).await {
            Ok(created) => {
                info!(url = %url, id = %created.id, name = %created.name, "Imported strain");
                Ok(ImportOutcome::Imported(created))
            }
            // Lost a race with a concurrent import of the same URL
            Err(AppError::Duplicate { .. }) => self
                .store
                .find_by_seedfinder_url(url)
                .await?
                .map(ImportOutcome::Existing)
                .ok_or_else(|| AppError::Internal {
                    message: format!("record for {} vanished after conflict", url),
                }),
            Err(e) => Err(e),
        }
    }

    /// Import each URL in order, pausing between them
    pub async fn import_batch(&self, urls: &[String]) -> ImportReport {
        info!(count = urls.len(), source = self.source.name(), "Starting batch import");
        let mut report = ImportReport::default();

        for (i, url) in urls.iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(self.delay).await;
            }

            let result = self.import_one(url).await;
            if let Err(ref e) = result {
                warn!(url = %url, error = %e, "Skipping strain that failed to import");
            }

            report.entries.push(ImportEntry {
                url: url.clone(),
                status: result.into(),
            });
        }

        info!(
            imported = report.imported_count(),
            existing = report.existing_count(),
            failed = report.failed_count(),
            "Batch import finished"
        );
        report
    }

    /// Search the source, then import every hit
    pub async fn search_and_import(&self, query: &str) -> ImportReport {
        let urls = Self::discovered(self.source.search(query).await, "search");
        self.import_batch(&urls).await
    }

    pub async fn import_popular(&self, limit: usize) -> ImportReport {
        info!(limit, "Starting popular strain import");
        let mut urls = Self::discovered(self.source.discover_popular(limit).await, "popular");
        urls.truncate(limit);
        self.import_batch(&urls).await
    }

    pub async fn import_by_type(&self, strain_type: StrainType, limit: usize) -> ImportReport {
        info!(limit, strain_type = %strain_type, "Starting import by type");
        let mut urls = Self::discovered(self.source.discover_by_type(strain_type).await, "by_type");
        urls.truncate(limit);
        self.import_batch(&urls).await
    }

    /// Discovery failures become an empty batch
    fn discovered(result: Result<Vec<String>>, kind: &str) -> Vec<String> {
        match result {
            Ok(urls) => {
                info!(kind, found = urls.len(), "Discovered strain URLs");
                urls
            }
            Err(e) => {
                warn!(kind, error = %e, "Strain discovery failed");
                Vec::new()
            }
        }
    }
}
