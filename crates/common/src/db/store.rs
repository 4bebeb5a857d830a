//! Strain store abstraction
//!
//! Every catalog read and write goes through [`StrainStore`], so the
//! recommendation resolver and the import orchestrator never see SQL.

use crate::db::models::{NewStrain, Strain, StrainPatch, StrainType};
use crate::errors::Result;
use async_trait::async_trait;
use uuid::Uuid;

/// Predicates for a catalog query.
///
/// Present predicates are AND-ed together. `effects_any` and `flavors_any`
/// match records sharing at least one element with the requested set; an
/// empty set adds no predicate. Results are always ordered by name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StrainFilter {
    pub strain_type: Option<StrainType>,
    pub effects_any: Vec<String>,
    pub flavors_any: Vec<String>,
    /// Case-insensitive substring over name, breeder and genetics
    pub text: Option<String>,
    pub limit: Option<u64>,
}

impl StrainFilter {
    /// Whole catalog, no predicates
    pub fn all() -> Self {
        Self::default()
    }

    pub fn search(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }

    pub fn of_type(mut self, strain_type: StrainType) -> Self {
        self.strain_type = Some(strain_type);
        self
    }

    pub fn with_any_effect(mut self, effects: Vec<String>) -> Self {
        self.effects_any = effects;
        self
    }

    pub fn with_any_flavor(mut self, flavors: Vec<String>) -> Self {
        self.flavors_any = flavors;
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// True when no predicate narrows the catalog (a limit alone does not)
    pub fn is_unfiltered(&self) -> bool {
        self.strain_type.is_none()
            && self.effects_any.is_empty()
            && self.flavors_any.is_empty()
            && self.text.is_none()
    }

    /// Evaluate the predicates against one record
    pub fn matches(&self, strain: &Strain) -> bool {
        if let Some(t) = self.strain_type {
            if strain.strain_type != t {
                return false;
            }
        }
        if !self.effects_any.is_empty() && !strain.has_any_effect(&self.effects_any) {
            return false;
        }
        if !self.flavors_any.is_empty() && !strain.has_any_flavor(&self.flavors_any) {
            return false;
        }
        if let Some(ref text) = self.text {
            let needle = text.to_lowercase();
            let hit = [&strain.name, &strain.breeder, &strain.genetics]
                .iter()
                .any(|field| field.to_lowercase().contains(&needle));
            if !hit {
                return false;
            }
        }
        true
    }
}

/// Persistent strain catalog
#[async_trait]
pub trait StrainStore: Send + Sync {
    /// Run a filtered, name-ordered query
    async fn query(&self, filter: &StrainFilter) -> Result<Vec<Strain>>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Strain>>;

    async fn find_by_seedfinder_url(&self, url: &str) -> Result<Option<Strain>>;

    /// Insert a record; a taken `seedfinder_url` yields `AppError::Duplicate`
    async fn insert(&self, strain: NewStrain) -> Result<Strain>;

    /// Partial update; `None` when the id is unknown
    async fn update(&self, id: Uuid, patch: StrainPatch) -> Result<Option<Strain>>;

    /// `false` when nothing was deleted
    async fn delete(&self, id: Uuid) -> Result<bool>;

    /// Check connectivity
    async fn ping(&self) -> Result<()>;

    /// Backend name for logs
    fn backend(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strain(name: &str, t: StrainType, effects: &[&str], flavors: &[&str]) -> Strain {
        NewStrain::new(name, t)
            .with_effects(effects.iter().copied())
            .with_flavors(flavors.iter().copied())
            .into_model(Uuid::new_v4(), chrono::Utc::now().into())
    }

    #[test]
    fn test_unfiltered_matches_everything() {
        let filter = StrainFilter::all().limit(10);
        assert!(filter.is_unfiltered());
        assert!(filter.matches(&strain("A", StrainType::Sativa, &[], &[])));
    }

    #[test]
    fn test_dimensions_are_anded() {
        let a = strain("A", StrainType::Indica, &["relaxed", "happy"], &["earthy"]);
        let filter = StrainFilter::all()
            .of_type(StrainType::Indica)
            .with_any_effect(vec!["happy".into()])
            .with_any_flavor(vec!["citrus".into()]);

        assert!(!filter.matches(&a));
        assert!(filter.clone().with_any_flavor(vec!["earthy".into(), "citrus".into()]).matches(&a));
    }

    #[test]
    fn test_text_search_is_case_insensitive() {
        let mut a = strain("Northern Lights", StrainType::Indica, &[], &[]);
        a.breeder = "Sensi Seeds".into();

        assert!(StrainFilter::search("northern").matches(&a));
        assert!(StrainFilter::search("SENSI").matches(&a));
        assert!(!StrainFilter::search("haze").matches(&a));
    }
}
