//! Retrieval by adaptation distance
//!
//! A case is as similar to a query as it is cheap to repair, so every usable
//! case is scored with a dry-run adaptation.

use serde::Serialize;
use tracing::{debug, warn};

use super::adapt::AdaptationEngine;
use crate::error::{EngineError, Result};
use crate::types::{Case, Distance, Query};

/// Best case for a query
#[derive(Debug, Clone, Copy)]
pub struct Retrieval<'c> {
    /// Position in the case list and the case itself; `None` if no case is usable
    pub best: Option<(usize, &'c Case)>,
    pub distance: Distance,
}

impl Retrieval<'_> {
    pub fn case(&self) -> Option<&Case> {
        self.best.map(|(_, case)| case)
    }
}

/// Distance of one stored case
#[derive(Debug, Clone, Serialize)]
pub struct ScoredCase {
    pub index: usize,
    pub title: String,
    pub distance: Distance,
}

/// Ranks stored cases against a query
pub struct SimilarityEngine<'e, 'a> {
    engine: &'e AdaptationEngine<'a>,
}

impl<'e, 'a> SimilarityEngine<'e, 'a> {
    pub fn new(engine: &'e AdaptationEngine<'a>) -> Self {
        Self { engine }
    }

    /// Distance of a single case.
    ///
    /// Failed cases and cases whose repair is impossible for this query are
    /// infinitely far away. A missing category is still an error.
    pub fn distance(&self, case: &Case, query: &Query) -> Result<Distance> {
        if !case.success {
            return Ok(Distance::Infinite);
        }
        match self.engine.dry_run(case, query) {
            Ok(result) => Ok(Distance::Finite(result.cost)),
            Err(EngineError::UnsatisfiableCategory { ingredient, category, .. }) => {
                warn!(
                    "'{}' cannot be adapted: every {} ingredient is undesired (needed to replace {})",
                    case.title, category, ingredient
                );
                Ok(Distance::Infinite)
            }
            Err(e) => Err(e),
        }
    }

    /// Case with the strictly smallest distance; the earliest case wins ties
    pub fn find_best<'c>(&self, cases: &'c [Case], query: &Query) -> Result<Retrieval<'c>> {
        let mut best: Option<(usize, &'c Case)> = None;
        let mut best_distance = Distance::Infinite;

        for (index, case) in cases.iter().enumerate() {
            let distance = self.distance(case, query)?;
            debug!("Case {} '{}' scored {}", index, case.title, distance);
            if distance < best_distance {
                best = Some((index, case));
                best_distance = distance;
            }
        }

        Ok(Retrieval { best, distance: best_distance })
    }

    /// Every case with its distance, nearest first, ties in case-list order
    pub fn rank(&self, cases: &[Case], query: &Query) -> Result<Vec<ScoredCase>> {
        let mut scored = cases
            .iter()
            .enumerate()
            .map(|(index, case)| -> Result<ScoredCase> {
                Ok(ScoredCase {
                    index,
                    title: case.title.clone(),
                    distance: self.distance(case, query)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        // sort_by_key is stable
        scored.sort_by_key(|s| s.distance);
        Ok(scored)
    }
}
