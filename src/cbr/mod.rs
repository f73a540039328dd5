//! Case-based reasoning core
//!
//! Retrieval scores every case by how cheaply it can be repaired, adaptation
//! performs the repair and retention appends approved results.

pub mod adapt;
pub mod categories;
pub mod cycle;
pub mod retain;
pub mod similarity;

pub use adapt::{AdaptationEngine, AdaptationResult, RepairStep, TraceEntry};
pub use categories::CategoryIndex;
pub use cycle::{Cycle, CycleOutcome};
pub use retain::RetentionManager;
pub use similarity::{Retrieval, ScoredCase, SimilarityEngine};
