//! Preference-based strain recommendations
//!
//! A filtered catalog query, with a fallback to the unfiltered catalog when
//! the filtered query finds nothing or fails.

use crate::db::models::{Strain, StrainType};
use crate::db::{StrainFilter, StrainStore};
use crate::errors::{AppError, Result};
use crate::metrics;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Hard cap on returned strains
pub const MAX_RECOMMENDATIONS: u64 = 10;

/// User preferences as submitted by clients.
///
/// Only `type`, `effects` and `flavors` narrow the query. The remaining
/// fields are accepted and echoed back but do not filter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrainPreferences {
    /// Kept as text so an unknown value reaches the fallback policy
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub strain_type: Option<String>,

    #[serde(default)]
    pub effects: Vec<String>,

    #[serde(default)]
    pub flavors: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub medical_uses: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub experience_level: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thc_preference: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mood: Vec<String>,
}

impl StrainPreferences {
    /// Catalog filter for these preferences, capped at [`MAX_RECOMMENDATIONS`]
    pub fn to_filter(&self) -> Result<StrainFilter> {
        let mut filter = StrainFilter::all()
            .with_any_effect(self.effects.clone())
            .with_any_flavor(self.flavors.clone())
            .limit(MAX_RECOMMENDATIONS);

        // A blank type means "any type"
        let raw_type = self.strain_type.as_deref().map(str::trim).filter(|t| !t.is_empty());
        if let Some(raw) = raw_type {
            let strain_type: StrainType = raw
                .parse()
                .map_err(|message| AppError::InvalidFormat { message })?;
            filter = filter.of_type(strain_type);
        }

        Ok(filter)
    }
}

/// How a recommendation was produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationStrategy {
    /// The filtered query returned rows
    Matched,
    /// Nothing matched; unfiltered catalog returned
    FallbackNoMatch,
    /// The filtered query failed; unfiltered catalog returned
    FallbackQueryError,
    /// The fallback failed as well
    Unavailable,
}

impl RecommendationStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Matched => "matched",
            Self::FallbackNoMatch => "fallback_no_match",
            Self::FallbackQueryError => "fallback_query_error",
            Self::Unavailable => "unavailable",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    pub strains: Vec<Strain>,
    pub strategy: RecommendationStrategy,
}

/// Resolves preferences against the catalog
#[derive(Clone)]
pub struct RecommendationResolver {
    store: Arc<dyn StrainStore>,
}

impl RecommendationResolver {
    pub fn new(store: Arc<dyn StrainStore>) -> Self {
        Self { store }
    }

    /// Never fails: errors degrade to the fallback, then to an empty result
    pub async fn resolve(&self, prefs: &StrainPreferences) -> Recommendation {
        let matched = match prefs.to_filter() {
            Ok(filter) => self.store.query(&filter).await,
            Err(e) => Err(e),
        };

        let recommendation = self.settle(matched).await;
        self.observe(&recommendation);
        recommendation
    }

    /// Preferences that could not be read at all go straight to the fallback
    pub async fn resolve_unreadable(&self, reason: &str) -> Recommendation {
        warn!(error = %reason, "Unreadable preferences, using fallback");
        let recommendation = self.fallback(RecommendationStrategy::FallbackQueryError).await;
        self.observe(&recommendation);
        recommendation
    }

    async fn settle(&self, matched: Result<Vec<Strain>>) -> Recommendation {
        match matched {
            Ok(strains) if !strains.is_empty() => Recommendation {
                strains,
                strategy: RecommendationStrategy::Matched,
            },
            Ok(_) => {
                info!("No strains matched preferences, using fallback");
                self.fallback(RecommendationStrategy::FallbackNoMatch).await
            }
            Err(e) => {
                warn!(error = %e, "Preference query failed, using fallback");
                self.fallback(RecommendationStrategy::FallbackQueryError).await
            }
        }
    }

    fn observe(&self, recommendation: &Recommendation) {
        debug!(
            strategy = recommendation.strategy.as_str(),
            count = recommendation.strains.len(),
            "Resolved recommendations"
        );
        metrics::record_recommendation(recommendation.strategy.as_str(), recommendation.strains.len());
    }

    async fn fallback(&self, strategy: RecommendationStrategy) -> Recommendation {
        let filter = StrainFilter::all().limit(MAX_RECOMMENDATIONS);

        match self.store.query(&filter).await {
            Ok(strains) => Recommendation { strains, strategy },
            Err(e) => {
                error!(error = %e, "Fallback recommendation query failed");
                Recommendation {
                    strains: Vec::new(),
                    strategy: RecommendationStrategy::Unavailable,
                }
            }
        }
    }
}
