//! Cocktail CBR - case-based reasoning over cocktail recipes
//!
//! Answers "must contain D, must not contain U" queries by:
//! - retrieving the stored cocktail that is cheapest to repair
//! - repairing it in four ordered stages (swap, optional replace, random replace, force add)
//! - letting a reviewer approve the result and retaining it as a new case
//!
//! # Example
//!
//! ```no_run
//! use cocktail_cbr::{AdaptationEngine, CategoryIndex, Config, Query, SimilarityEngine};
//! use cocktail_cbr::store::{CaseStore, XmlCaseStore};
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = Config::load()?;
//!     let cases = XmlCaseStore::from_config(&config.store)?.load()?;
//!     let categories = CategoryIndex::load(&config.store.categories_path()?)?;
//!
//!     let engine = AdaptationEngine::new(&categories, config.engine.clone());
//!     let query = Query::new(["vodka"], ["gin"]);
//!     let retrieval = SimilarityEngine::new(&engine).find_best(&cases, &query)?;
//!     println!("{:?} at distance {}", retrieval.case().map(|c| &c.title), retrieval.distance);
//!     Ok(())
//! }
//! ```

// Core modules (types first, everything else builds on them)
pub mod types;
pub mod error;
pub mod cbr;
pub mod store;
pub mod review;
pub mod config;
pub mod cli;

// Re-export commonly used types for convenience
pub use types::{Case, Distance, Ignored, Ingredient, Query};

pub use error::EngineError;

pub use cbr::{
    AdaptationEngine,
    AdaptationResult,
    CategoryIndex,
    Cycle,
    CycleOutcome,
    RetentionManager,
    SimilarityEngine,
};

pub use review::{AutoApprove, InteractiveReviewer, ReviewOutcome, Reviewer};

pub use config::Config;
