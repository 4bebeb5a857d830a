//! Repository pattern for database operations
//!
//! Postgres implementation of [`StrainStore`] on top of SeaORM. Overlap
//! predicates use the native `&&` array operator; text search uses `ILIKE`.

use crate::db::models::*;
use crate::db::store::{StrainFilter, StrainStore};
use crate::db::DbPool;
use crate::errors::{AppError, Result};
use crate::metrics;
use async_trait::async_trait;
use sea_orm::sea_query::extension::postgres::{PgBinOper, PgExpr};
use sea_orm::sea_query::{Expr, SimpleExpr};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, QueryOrder, QuerySelect, Select, Set, SqlErr,
};
use std::time::Instant;
use uuid::Uuid;

/// Repository for data access operations
#[derive(Clone)]
pub struct Repository {
    pool: DbPool,
}

impl Repository {
    /// Create a new repository with the given connection pool
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Get the read connection
    fn read_conn(&self) -> &DatabaseConnection {
        self.pool.read()
    }

    /// Get the write connection
    fn write_conn(&self) -> &DatabaseConnection {
        self.pool.write()
    }

    /// `column && ARRAY[...]`
    fn overlaps(column: StrainColumn, values: &[String]) -> SimpleExpr {
        Expr::col(column).binary(PgBinOper::Overlap, Expr::val(values.to_vec()))
    }

    fn text_condition(text: &str) -> Condition {
        let pattern = format!("%{}%", text);
        Condition::any()
            .add(Expr::col(StrainColumn::Name).ilike(pattern.clone()))
            .add(Expr::col(StrainColumn::Breeder).ilike(pattern.clone()))
            .add(Expr::col(StrainColumn::Genetics).ilike(pattern))
    }

    /// Predicates AND together; each set predicate is an overlap
    fn select(filter: &StrainFilter) -> Select<StrainEntity> {
        let mut select = StrainEntity::find();

        if let Some(strain_type) = filter.strain_type {
            select = select.filter(StrainColumn::StrainType.eq(strain_type));
        }

        if !filter.effects_any.is_empty() {
            select = select.filter(Self::overlaps(StrainColumn::Effects, &filter.effects_any));
        }

        if !filter.flavors_any.is_empty() {
            select = select.filter(Self::overlaps(StrainColumn::Flavors, &filter.flavors_any));
        }

        if let Some(ref text) = filter.text {
            select = select.filter(Self::text_condition(text));
        }

        select = select.order_by_asc(StrainColumn::Name);

        if let Some(limit) = filter.limit {
            select = select.limit(limit);
        }

        select
    }

    /// Map unique violations on `seedfinder_url` to a domain conflict
    fn map_write_err(err: DbErr) -> AppError {
        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(detail)) => AppError::Duplicate { message: detail },
            _ => AppError::Database(err),
        }
    }

    fn timed<T>(operation: &'static str, started: Instant, result: Result<T>) -> Result<T> {
        metrics::record_store_query(operation, started, result.is_ok());
        result
    }
}

#[async_trait]
impl StrainStore for Repository {
    async fn query(&self, filter: &StrainFilter) -> Result<Vec<Strain>> {
        let started = Instant::now();
        let result = Self::select(filter)
            .all(self.read_conn())
            .await
            .map_err(Into::into);
        Self::timed("query", started, result)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Strain>> {
        let started = Instant::now();
        let result = StrainEntity::find_by_id(id)
            .one(self.read_conn())
            .await
            .map_err(Into::into);
        Self::timed("find_by_id", started, result)
    }

    async fn find_by_seedfinder_url(&self, url: &str) -> Result<Option<Strain>> {
        let started = Instant::now();
        let result = StrainEntity::find()
            .filter(StrainColumn::SeedfinderUrl.eq(url))
            .one(self.read_conn())
            .await
            .map_err(Into::into);
        Self::timed("find_by_seedfinder_url", started, result)
    }

    async fn insert(&self, strain: NewStrain) -> Result<Strain> {
        let started = Instant::now();
        let now = chrono::Utc::now();

        let strain = StrainActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(strain.name),
            strain_type: Set(strain.strain_type),
            genetics: Set(strain.genetics),
            breeder: Set(strain.breeder),
            flowering_time: Set(strain.flowering_time),
            yield_indoor: Set(strain.yield_indoor),
            yield_outdoor: Set(strain.yield_outdoor),
            height_indoor: Set(strain.height_indoor),
            height_outdoor: Set(strain.height_outdoor),
            thc_content: Set(strain.thc_content),
            cbd_content: Set(strain.cbd_content),
            description: Set(strain.description),
            effects: Set(strain.effects),
            flavors: Set(strain.flavors),
            medical_uses: Set(strain.medical_uses),
            growing_difficulty: Set(strain.growing_difficulty),
            seedfinder_url: Set(strain.seedfinder_url),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        let result = strain
            .insert(self.write_conn())
            .await
            .map_err(Self::map_write_err);
        Self::timed("insert", started, result)
    }

    async fn update(&self, id: Uuid, patch: StrainPatch) -> Result<Option<Strain>> {
        let started = Instant::now();

        let Some(existing) = StrainEntity::find_by_id(id).one(self.write_conn()).await? else {
            return Ok(None);
        };

        let mut strain: StrainActiveModel = existing.into();

        macro_rules! assign {
            ($($field:ident),+ $(,)?) => {
                $(if let Some(v) = patch.$field { strain.$field = Set(v); })+
            };
        }

        assign!(
            name, strain_type, genetics, breeder, flowering_time, yield_indoor,
            yield_outdoor, height_indoor, height_outdoor, thc_content, cbd_content,
            description, effects, flavors, medical_uses,
        );

        if let Some(difficulty) = patch.growing_difficulty {
            strain.growing_difficulty = Set(Some(difficulty));
        }
        if let Some(url) = patch.seedfinder_url {
            strain.seedfinder_url = Set(Some(url));
        }
        // The trigger refreshes it as well; setting it keeps the returned row current
        strain.updated_at = Set(chrono::Utc::now().into());

        let result = strain
            .update(self.write_conn())
            .await
            .map(Some)
            .map_err(Self::map_write_err);
        Self::timed("update", started, result)
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        let started = Instant::now();
        let result = StrainEntity::delete_by_id(id)
            .exec(self.write_conn())
            .await
            .map(|res| res.rows_affected > 0)
            .map_err(Into::into);
        Self::timed("delete", started, result)
    }

    async fn ping(&self) -> Result<()> {
        self.pool.ping().await
    }

    fn backend(&self) -> &'static str {
        "postgres"
    }
}
