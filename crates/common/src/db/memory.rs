//! In-process strain store
//!
//! Same semantics as the Postgres repository: name ordering, unique
//! `seedfinder_url`, store-owned timestamps. Used for tests and for running
//! the gateway without a database (`database.backend = "memory"`).

use crate::db::models::{NewStrain, Strain, StrainPatch};
use crate::db::store::{StrainFilter, StrainStore};
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
pub struct MemoryStore {
    strains: RwLock<BTreeMap<Uuid, Strain>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records
    pub async fn len(&self) -> usize {
        self.strains.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.strains.read().await.is_empty()
    }

    fn url_taken(strains: &BTreeMap<Uuid, Strain>, url: &str, except: Option<Uuid>) -> bool {
        strains
            .values()
            .any(|s| Some(s.id) != except && s.seedfinder_url.as_deref() == Some(url))
    }
}

#[async_trait]
impl StrainStore for MemoryStore {
    async fn query(&self, filter: &StrainFilter) -> Result<Vec<Strain>> {
        let strains = self.strains.read().await;

        let mut rows: Vec<Strain> = strains
            .values()
            .filter(|s| filter.matches(s))
            .cloned()
            .collect();

        rows.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));

        if let Some(limit) = filter.limit {
            rows.truncate(limit as usize);
        }

        Ok(rows)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Strain>> {
        Ok(self.strains.read().await.get(&id).cloned())
    }

    async fn find_by_seedfinder_url(&self, url: &str) -> Result<Option<Strain>> {
        let strains = self.strains.read().await;
        Ok(strains
            .values()
            .find(|s| s.seedfinder_url.as_deref() == Some(url))
            .cloned())
    }

    async fn insert(&self, strain: NewStrain) -> Result<Strain> {
        let mut strains = self.strains.write().await;

        if let Some(ref url) = strain.seedfinder_url {
            if Self::url_taken(&strains, url, None) {
                return Err(AppError::Duplicate {
                    message: format!("seedfinder_url {} already exists", url),
                });
            }
        }

        let model = strain.into_model(Uuid::new_v4(), chrono::Utc::now().into());
        strains.insert(model.id, model.clone());
        Ok(model)
    }

    async fn update(&self, id: Uuid, patch: StrainPatch) -> Result<Option<Strain>> {
        let mut strains = self.strains.write().await;

        if let Some(ref url) = patch.seedfinder_url {
            if Self::url_taken(&strains, url, Some(id)) {
                return Err(AppError::Duplicate {
                    message: format!("seedfinder_url {} already exists", url),
                });
            }
        }

        let Some(strain) = strains.get_mut(&id) else {
            return Ok(None);
        };

        patch.apply_to(strain);
        strain.updated_at = chrono::Utc::now().into();
        Ok(Some(strain.clone()))
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        Ok(self.strains.write().await.remove(&id).is_some())
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::StrainType;
    use tokio_test::{assert_err, assert_ok};

    #[tokio::test]
    async fn test_insert_assigns_identity_and_timestamps() {
        let store = MemoryStore::new();
        let strain = assert_ok!(store.insert(NewStrain::new("Blue Dream", StrainType::Hybrid)).await);

        assert_eq!(strain.created_at, strain.updated_at);
        assert_eq!(store.find_by_id(strain.id).await.unwrap(), Some(strain));
    }

    #[tokio::test]
    async fn test_seedfinder_url_is_unique() {
        let store = MemoryStore::new();
        let url = "https://seedfinder.eu/en/strain-info/afghani/sensi-seeds/";
        store
            .insert(NewStrain::new("Afghani", StrainType::Indica).with_seedfinder_url(url))
            .await
            .unwrap();

        let err = assert_err!(
            store
                .insert(NewStrain::new("Afghani #2", StrainType::Indica).with_seedfinder_url(url))
                .await
        );
        assert!(matches!(err, AppError::Duplicate { .. }));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_query_orders_by_name_and_limits() {
        let store = MemoryStore::new();
        for name in ["Cheese", "Amnesia Haze", "Blue Dream"] {
            store.insert(NewStrain::new(name, StrainType::Hybrid)).await.unwrap();
        }

        let rows = store.query(&StrainFilter::all().limit(2)).await.unwrap();
        let names: Vec<_> = rows.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Amnesia Haze", "Blue Dream"]);
    }

    #[tokio::test]
    async fn test_update_refreshes_updated_at() {
        let store = MemoryStore::new();
        let strain = store.insert(NewStrain::new("Jack Herer", StrainType::Sativa)).await.unwrap();

        let patch = StrainPatch {
            thc_content: Some("18-22%".into()),
            ..StrainPatch::default()
        };
        let updated = store.update(strain.id, patch).await.unwrap().unwrap();

        assert_eq!(updated.thc_content, "18-22%");
        assert!(updated.updated_at >= strain.updated_at);
        assert_eq!(updated.created_at, strain.created_at);
    }

    #[tokio::test]
    async fn test_update_and_delete_unknown_id() {
        let store = MemoryStore::new();
        let id = Uuid::new_v4();

        assert_eq!(store.update(id, StrainPatch::default()).await.unwrap(), None);
        assert!(!store.delete(id).await.unwrap());
    }
}
