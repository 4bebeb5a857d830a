//! BUD.ai Common Library
//!
//! Shared code for the BUD.ai strain catalog including:
//! - Strain models and the store abstraction (Postgres and in-memory)
//! - Preference-based recommendations
//! - Import orchestration over external strain sources
//! - Error types and handling
//! - Configuration management
//! - Metrics and observability

pub mod config;
pub mod db;
pub mod errors;
pub mod import;
pub mod metrics;
pub mod recommend;
pub mod source;

// Re-export commonly used types
pub use config::AppConfig;
pub use db::{MemoryStore, Repository, StrainFilter, StrainStore};
pub use errors::{AppError, Result};
pub use import::{ImportOutcome, ImportReport, Importer};
pub use recommend::{RecommendationResolver, StrainPreferences};
pub use source::{MockSource, StrainSource};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
