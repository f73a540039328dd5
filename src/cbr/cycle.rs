//! Retrieve, adapt, review and retain for one query

use anyhow::Result;
use serde::Serialize;
use tracing::info;

use super::adapt::{AdaptationEngine, AdaptationResult};
use super::retain::RetentionManager;
use super::similarity::SimilarityEngine;
use crate::review::{ReviewOutcome, Reviewer};
use crate::store::CaseStore;
use crate::types::{Case, Distance, Query};

/// What happened to a query
#[derive(Debug, Clone, Serialize)]
pub struct CycleOutcome {
    /// Index and title of the retrieved case; `None` if no case was usable
    pub retrieved: Option<(usize, String)>,
    pub distance: Distance,
    pub adaptation: Option<AdaptationResult>,
    /// Index of the newly retained case
    pub retained: Option<usize>,
}

impl CycleOutcome {
    fn no_usable_case() -> Self {
        Self {
            retrieved: None,
            distance: Distance::Infinite,
            adaptation: None,
            retained: None,
        }
    }

    /// The cocktail proposed for the query
    pub fn proposal(&self) -> Option<&Case> {
        self.adaptation.as_ref().map(|a| &a.case)
    }
}

/// Runs the full reasoning cycle over a caller-owned case list
pub struct Cycle<'a, 's, S: CaseStore + ?Sized> {
    engine: AdaptationEngine<'a>,
    retention: Option<RetentionManager<'s, S>>,
}

impl<'a, 's, S: CaseStore + ?Sized> Cycle<'a, 's, S> {
    /// Cycle that retains approved cases in `store`
    pub fn new(engine: AdaptationEngine<'a>, store: &'s S) -> Self {
        Self {
            engine,
            retention: Some(RetentionManager::new(store)),
        }
    }

    /// Cycle that only proposes cocktails
    pub fn without_retention(engine: AdaptationEngine<'a>) -> Self {
        Self { engine, retention: None }
    }

    pub fn engine(&self) -> &AdaptationEngine<'a> {
        &self.engine
    }

    pub fn run(
        &mut self,
        cases: &mut Vec<Case>,
        query: &Query,
        reviewer: &mut dyn Reviewer,
    ) -> Result<CycleOutcome> {
        let retrieval = SimilarityEngine::new(&self.engine).find_best(cases, query)?;
        let Some((index, case)) = retrieval.best.map(|(i, c)| (i, c.clone())) else {
            info!("No usable case for the query");
            return Ok(CycleOutcome::no_usable_case());
        };
        info!("Retrieved '{}' at distance {}", case.title, retrieval.distance);

        let adaptation = self.engine.adapt(&case, query, false)?;
        let mut outcome = CycleOutcome {
            retrieved: Some((index, case.title.clone())),
            distance: retrieval.distance,
            adaptation: None,
            retained: None,
        };

        // an unchanged case is already in the case base
        if adaptation.was_adapted() {
            if let Some(retention) = &self.retention {
                match reviewer.review(&adaptation, query, self.engine.categories())? {
                    ReviewOutcome::Approved(approved) => {
                        outcome.retained = Some(retention.retain(cases, approved)?);
                    }
                    ReviewOutcome::Rejected => info!("'{}' was not retained", adaptation.case.title),
                }
            }
        }

        outcome.adaptation = Some(adaptation);
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cbr::categories::CategoryIndex;
    use crate::config::EngineConfig;
    use crate::review::AutoApprove;
    use crate::store::MockCaseStore;
    use crate::types::Ingredient;

    struct Reject;

    impl Reviewer for Reject {
        fn review(&mut self, _: &AdaptationResult, _: &Query, _: &CategoryIndex) -> Result<ReviewOutcome> {
            Ok(ReviewOutcome::Rejected)
        }
    }

    /// Panics if asked; for cycles that must not reach review
    struct Unreachable;

    impl Reviewer for Unreachable {
        fn review(&mut self, _: &AdaptationResult, _: &Query, _: &CategoryIndex) -> Result<ReviewOutcome> {
            panic!("review should have been skipped");
        }
    }

    fn categories() -> CategoryIndex {
        CategoryIndex::from_pairs([
            ("gin", "alcoholic"),
            ("vodka", "alcoholic"),
            ("lime", "citrus"),
            ("tonic", "nonalcoholic"),
        ])
    }

    fn cases() -> Vec<Case> {
        vec![
            Case::new("Gimlet", vec![Ingredient::new("gin", "6", "cl"), Ingredient::new("lime", "2", "cl")]),
            Case::new("Gin Tonic", vec![Ingredient::new("gin", "4", "cl"), Ingredient::new("tonic", "10", "cl")]),
        ]
    }

    #[test]
    fn test_approved_case_is_appended() {
        let categories = categories();
        let mut store = MockCaseStore::new();
        store.expect_save().times(1).returning(|_| Ok(()));
        let mut cycle = Cycle::new(AdaptationEngine::new(&categories, EngineConfig::default()), &store);

        let mut cases = cases();
        let query = Query::new(["vodka", "lime"], ["gin"]);
        let outcome = cycle.run(&mut cases, &query, &mut AutoApprove).unwrap();

        assert_eq!(outcome.retrieved, Some((0, "Gimlet".to_string())));
        assert_eq!(outcome.distance, Distance::Finite(1));
        assert_eq!(outcome.retained, Some(2));
        assert_eq!(cases.len(), 3);
        assert!(query.is_satisfied_by(&cases[2]));
        assert_eq!(outcome.proposal(), Some(&cases[2]));
    }

    #[test]
    fn test_exact_match_skips_review() {
        let categories = categories();
        let mut store = MockCaseStore::new();
        store.expect_save().times(0);
        let mut cycle = Cycle::new(AdaptationEngine::new(&categories, EngineConfig::default()), &store);

        let mut cases = cases();
        let outcome = cycle
            .run(&mut cases, &Query::new(["gin", "tonic"], Vec::<String>::new()), &mut Unreachable)
            .unwrap();
        assert_eq!(outcome.retrieved.map(|(i, _)| i), Some(1));
        assert_eq!(outcome.adaptation.unwrap().cost, 0);
        assert_eq!(outcome.retained, None);
        assert_eq!(cases.len(), 2);
    }

    #[test]
    fn test_rejected_case_is_not_retained() {
        let categories = categories();
        let mut store = MockCaseStore::new();
        store.expect_save().times(0);
        let mut cycle = Cycle::new(AdaptationEngine::new(&categories, EngineConfig::default()), &store);

        let mut cases = cases();
        let outcome = cycle
            .run(&mut cases, &Query::new(["vodka"], Vec::<String>::new()), &mut Reject)
            .unwrap();
        assert!(outcome.adaptation.is_some());
        assert_eq!(outcome.retained, None);
        assert_eq!(cases.len(), 2);
    }

    #[test]
    fn test_no_usable_case() {
        let categories = categories();
        let mut cycle = Cycle::<MockCaseStore>::without_retention(AdaptationEngine::new(
            &categories,
            EngineConfig::default(),
        ));
        let mut cases: Vec<Case> = cases()
            .into_iter()
            .map(|mut c| {
                c.success = false;
                c
            })
            .collect();

        let outcome = cycle.run(&mut cases, &Query::new(["gin"], Vec::<String>::new()), &mut Unreachable).unwrap();
        assert!(outcome.retrieved.is_none());
        assert!(outcome.proposal().is_none());
        assert_eq!(outcome.distance, Distance::Infinite);
    }

    #[test]
    fn test_without_retention_only_proposes() {
        let categories = categories();
        let mut cycle = Cycle::<MockCaseStore>::without_retention(AdaptationEngine::new(
            &categories,
            EngineConfig::default(),
        ));
        let mut cases = cases();
        let outcome = cycle
            .run(&mut cases, &Query::new(["vodka"], Vec::<String>::new()), &mut Unreachable)
            .unwrap();
        assert!(outcome.proposal().unwrap().contains("vodka"));
        assert_eq!(cases.len(), 2);
    }

    #[test]
    fn test_conflicting_query_retains_nothing() {
        let categories = categories();
        let mut store = MockCaseStore::new();
        store.expect_save().times(0);
        let mut cycle = Cycle::new(AdaptationEngine::new(&categories, EngineConfig::default()), &store);

        let mut cases = cases();
        let err = cycle
            .run(&mut cases, &Query::new(["tonic"], ["tonic"]), &mut AutoApprove)
            .unwrap_err();
        assert!(err.to_string().contains("both desired and undesired"));
        assert_eq!(cases.len(), 2);
    }

    #[test]
    fn test_unknown_ingredient_is_an_error() {
        let categories = categories();
        let mut cycle = Cycle::<MockCaseStore>::without_retention(AdaptationEngine::new(
            &categories,
            EngineConfig::default(),
        ));
        let mut cases = cases();
        let err = cycle
            .run(&mut cases, &Query::new(["mezcal"], Vec::<String>::new()), &mut AutoApprove)
            .unwrap_err();
        assert!(err.to_string().contains("mezcal"));
    }
}
