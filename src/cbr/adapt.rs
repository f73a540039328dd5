//! Adaptation engine - repairs a retrieved case until it satisfies a query
//!
//! The repair runs four ordered stages on a private copy of the case. Each
//! stage repeats while it applies and then hands over to the next one; a
//! stage is never revisited.
//!
//! | Stage | Applies while | Action | Cost |
//! |-------|---------------|--------|------|
//! | Swap | a missing and an extra ingredient share a category | extra -> missing | 1 |
//! | Optional replace | a missing ingredient shares a category with a non-desired ingredient | optional -> missing | 1 |
//! | Random replace | extra ingredients remain | extra -> random acceptable sibling | 1 |
//! | Force add | missing ingredients remain | append a small amount | 2 |
//!
//! Sets are scanned in ascending name order so the outcome only depends on
//! the inputs and the generator seed.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::info;

use super::categories::CategoryIndex;
use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::types::{Case, Ingredient, Query};

/// One repair action taken by the engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum RepairStep {
    Swap {
        undesired: String,
        desired: String,
        category: String,
    },
    OptionalReplace {
        optional: String,
        desired: String,
        category: String,
    },
    RandomReplace {
        undesired: String,
        replacement: String,
        category: String,
    },
    ForceAdd {
        desired: String,
        quantity: String,
        unit: String,
    },
}

impl RepairStep {
    /// Edit distance contributed by this step
    pub fn cost(&self) -> u32 {
        match self {
            RepairStep::ForceAdd { .. } => 2,
            _ => 1,
        }
    }
}

impl std::fmt::Display for RepairStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RepairStep::Swap { undesired, desired, category } => write!(
                f,
                "The missing desired ingredient {} and the contained undesired ingredient {} are both {}, so {} is replaced by {}",
                desired, undesired, category, undesired, desired
            ),
            RepairStep::OptionalReplace { optional, desired, category } => write!(
                f,
                "The missing desired ingredient {} and the optional ingredient {} are both {}, so {} is replaced by {}",
                desired, optional, category, optional, desired
            ),
            RepairStep::RandomReplace { undesired, replacement, category } => write!(
                f,
                "The contained undesired ingredient {} is replaced by the random {} ingredient {}",
                undesired, category, replacement
            ),
            RepairStep::ForceAdd { desired, quantity, unit } => write!(
                f,
                "A little bit ({}{}) of the missing desired ingredient {} is added",
                quantity, unit, desired
            ),
        }
    }
}

/// Snapshot taken after a non-dry repair step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceEntry {
    pub step: RepairStep,
    pub before: String,
    pub after: String,
    pub missing: Vec<String>,
    pub extra: Vec<String>,
}

impl std::fmt::Display for TraceEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{}", self.step)?;
        writeln!(f, "Current cocktail:")?;
        write!(f, "{}", self.after)?;
        if !self.missing.is_empty() {
            writeln!(f, "These desired ingredients are missing: {}", self.missing.join(", "))?;
        }
        if !self.extra.is_empty() {
            writeln!(f, "These undesired ingredients are contained: {}", self.extra.join(", "))?;
        }
        Ok(())
    }
}

/// Outcome of one adaptation call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdaptationResult {
    pub case: Case,
    pub cost: u32,
    /// Empty for dry runs
    pub trace: Vec<TraceEntry>,
}

impl AdaptationResult {
    /// True if any repair step was needed
    pub fn was_adapted(&self) -> bool {
        self.cost > 0
    }
}

/// Repairs cases against queries using the category heuristics
pub struct AdaptationEngine<'a> {
    categories: &'a CategoryIndex,
    settings: EngineConfig,
    rng: StdRng,
}

impl<'a> AdaptationEngine<'a> {
    /// Create an engine whose generator is seeded from `settings.seed`
    pub fn new(categories: &'a CategoryIndex, settings: EngineConfig) -> Self {
        let rng = StdRng::seed_from_u64(settings.seed);
        Self { categories, settings, rng }
    }

    pub fn categories(&self) -> &'a CategoryIndex {
        self.categories
    }

    /// Repair a copy of `case` so that it satisfies `query`.
    ///
    /// With `dry` set nothing is traced or logged and the generator is left
    /// untouched; only the cost is meaningful.
    pub fn adapt(&mut self, case: &Case, query: &Query, dry: bool) -> Result<AdaptationResult> {
        if dry {
            return self.dry_run(case, query);
        }
        Repair {
            categories: self.categories,
            settings: &self.settings,
            query,
            rng: Some(&mut self.rng),
        }
        .run(case)
    }

    /// Cost-only adaptation; does not need exclusive access
    pub fn dry_run(&self, case: &Case, query: &Query) -> Result<AdaptationResult> {
        Repair {
            categories: self.categories,
            settings: &self.settings,
            query,
            rng: None,
        }
        .run(case)
    }
}

/// State of a single repair. `rng` is `None` in dry mode.
struct Repair<'r> {
    categories: &'r CategoryIndex,
    settings: &'r EngineConfig,
    query: &'r Query,
    rng: Option<&'r mut StdRng>,
}

impl Repair<'_> {
    fn dry(&self) -> bool {
        self.rng.is_none()
    }

    fn run(mut self, case: &Case) -> Result<AdaptationResult> {
        if let Some(name) = self.query.conflict() {
            return Err(EngineError::ConflictingQuery(name.clone()));
        }
        for name in self.query.names() {
            self.categories.category_of(name)?;
        }

        let mut adapted = case.clone();
        let mut missing = self.query.missing(&adapted);
        let mut extra = self.query.extra(&adapted);
        let mut cost = 0;
        let mut trace = Vec::new();

        if missing.is_empty() && extra.is_empty() {
            if !self.dry() {
                info!("'{}' already satisfies the query and can be used directly", case.title);
            }
            return Ok(AdaptationResult { case: adapted, cost, trace });
        }

        if !self.dry() {
            info!(
                "Adapting '{}': missing [{}], undesired [{}]",
                case.title,
                join(&missing),
                join(&extra)
            );
        }

        // Swap: one edit fixes a missing and an undesired ingredient at once
        while let Some((desired, undesired, category)) = self.find_swap(&missing, &extra)? {
            let before = self.snapshot(&adapted);
            adapted.replace_ingredient(&undesired, &desired);
            missing.remove(&desired);
            extra.remove(&undesired);
            if adapted.contains(&undesired) {
                // a repeated line still needs repairing
                extra.insert(undesired.clone());
            }
            let step = RepairStep::Swap { undesired, desired, category };
            cost += self.record(step, before, &adapted, &missing, &extra, &mut trace);
        }

        // Optional replace: overwrite an ingredient the query does not care about
        while let Some((desired, optional, category)) = self.find_optional(&missing, &adapted)? {
            let before = self.snapshot(&adapted);
            adapted.replace_ingredient(&optional, &desired);
            missing.remove(&desired);
            let step = RepairStep::OptionalReplace { optional, desired, category };
            cost += self.record(step, before, &adapted, &missing, &extra, &mut trace);
        }

        // Random replace: keep the category, accept the risk of a random pick
        while let Some(undesired) = extra.pop_first() {
            let category = self.categories.category_of(&undesired)?.to_string();
            let replacement = self.draw_replacement(&undesired, &category)?;
            let before = self.snapshot(&adapted);
            adapted.replace_ingredient(&undesired, &replacement);
            if adapted.contains(&undesired) {
                extra.insert(undesired.clone());
            }
            let step = RepairStep::RandomReplace { undesired, replacement, category };
            cost += self.record(step, before, &adapted, &missing, &extra, &mut trace);
        }

        // Force add: the only stage that changes the ingredient count
        while let Some(desired) = missing.pop_first() {
            let unit = if self.categories.is_liquid(&desired, &self.settings.liquid_categories)? {
                self.settings.liquid_unit.clone()
            } else {
                String::new()
            };
            let quantity = self.settings.force_add_quantity.clone();
            let before = self.snapshot(&adapted);
            adapted.add_ingredient(Ingredient::new(desired.clone(), quantity.clone(), unit.clone()));
            let step = RepairStep::ForceAdd { desired, quantity, unit };
            cost += self.record(step, before, &adapted, &missing, &extra, &mut trace);
        }

        debug_assert!(self.query.is_satisfied_by(&adapted));
        Ok(AdaptationResult { case: adapted, cost, trace })
    }

    fn find_swap(
        &self,
        missing: &BTreeSet<String>,
        extra: &BTreeSet<String>,
    ) -> Result<Option<(String, String, String)>> {
        for desired in missing {
            let category = self.categories.category_of(desired)?;
            for undesired in extra {
                if self.categories.category_of(undesired)? == category {
                    return Ok(Some((desired.clone(), undesired.clone(), category.to_string())));
                }
            }
        }
        Ok(None)
    }

    fn find_optional(
        &self,
        missing: &BTreeSet<String>,
        adapted: &Case,
    ) -> Result<Option<(String, String, String)>> {
        let present = adapted.ingredient_set();
        for desired in missing {
            let category = self.categories.category_of(desired)?;
            for optional in &present {
                if self.query.desired.contains(optional) {
                    continue;
                }
                if self.categories.same_category(optional, desired)? {
                    return Ok(Some((desired.clone(), optional.clone(), category.to_string())));
                }
            }
        }
        Ok(None)
    }

    /// Pick a sibling of `undesired` that the query does not reject.
    ///
    /// Draws uniformly among the acceptable siblings. Dry runs take the first
    /// one so the generator stays untouched.
    fn draw_replacement(&mut self, undesired: &str, category: &str) -> Result<String> {
        let categories = self.categories;
        let acceptable: Vec<&String> = categories
            .members(category)
            .iter()
            .filter(|c| !self.query.undesired.contains(*c))
            .collect();

        if acceptable.is_empty() {
            return Err(EngineError::UnsatisfiableCategory {
                ingredient: undesired.to_string(),
                category: category.to_string(),
            });
        }

        let index = match self.rng.as_deref_mut() {
            Some(rng) => rng.random_range(0..acceptable.len()),
            None => 0,
        };
        Ok(acceptable[index].clone())
    }

    fn snapshot(&self, case: &Case) -> String {
        if self.dry() {
            String::new()
        } else {
            case.to_string()
        }
    }

    /// Log and trace a step outside dry mode, returning its cost
    fn record(
        &self,
        step: RepairStep,
        before: String,
        adapted: &Case,
        missing: &BTreeSet<String>,
        extra: &BTreeSet<String>,
        trace: &mut Vec<TraceEntry>,
    ) -> u32 {
        let cost = step.cost();
        if self.dry() {
            return cost;
        }
        info!("{}", step);
        trace.push(TraceEntry {
            step,
            before,
            after: adapted.to_string(),
            missing: missing.iter().cloned().collect(),
            extra: extra.iter().cloned().collect(),
        });
        cost
    }
}

fn join(names: &BTreeSet<String>) -> String {
    names.iter().cloned().collect::<Vec<_>>().join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn categories() -> CategoryIndex {
        CategoryIndex::from_pairs([
            ("gin", "alcoholic"),
            ("vodka", "alcoholic"),
            ("rum", "alcoholic"),
            ("lime", "citrus"),
            ("lemon", "citrus"),
            ("cola", "mixer"),
            ("soda", "mixer"),
            ("tonic", "nonalcoholic"),
            ("mint", "herb"),
            ("sugar", "sweetener"),
        ])
    }

    fn gin_fizz() -> Case {
        Case::new(
            "Gin Fizz",
            vec![
                Ingredient::new("gin", "4", "cl"),
                Ingredient::new("lime", "2", "cl"),
                Ingredient::new("cola", "10", "cl"),
            ],
        )
    }

    fn names(case: &Case) -> Vec<String> {
        case.ingredient_set().into_iter().collect()
    }

    #[test]
    fn test_satisfied_case_is_returned_unchanged() {
        let categories = categories();
        let mut engine = AdaptationEngine::new(&categories, EngineConfig::default());
        let case = gin_fizz();
        let result = engine.adapt(&case, &Query::new(["gin", "lime"], ["rum"]), false).unwrap();
        assert_eq!(result.cost, 0);
        assert!(!result.was_adapted());
        assert_eq!(result.case, case);
        assert!(result.trace.is_empty());
    }

    #[test]
    fn test_swap_scenario() {
        let categories = categories();
        let mut engine = AdaptationEngine::new(&categories, EngineConfig::default());
        let case = gin_fizz();
        let result = engine.adapt(&case, &Query::new(["vodka"], ["gin"]), false).unwrap();

        assert_eq!(result.cost, 1);
        assert_eq!(names(&result.case), ["cola", "lime", "vodka"]);
        assert_eq!(result.case.ingredients[0], Ingredient::new("vodka", "4", "cl"));
        assert_eq!(result.trace.len(), 1);
        assert!(matches!(result.trace[0].step, RepairStep::Swap { .. }));
        // the stored case is untouched
        assert_eq!(case, gin_fizz());
    }

    #[test]
    fn test_optional_replace_scenario() {
        let categories = categories();
        let mut engine = AdaptationEngine::new(&categories, EngineConfig::default());
        let result = engine
            .adapt(&gin_fizz(), &Query::new(["lemon"], Vec::<String>::new()), false)
            .unwrap();

        assert_eq!(result.cost, 1);
        assert_eq!(names(&result.case), ["cola", "gin", "lemon"]);
        assert_eq!(result.case.quantity_of("lemon"), Some("2"));
        assert_eq!(
            result.trace[0].step,
            RepairStep::OptionalReplace {
                optional: "lime".into(),
                desired: "lemon".into(),
                category: "citrus".into(),
            }
        );
    }

    #[test]
    fn test_optional_replace_never_overwrites_desired() {
        let categories = categories();
        let mut engine = AdaptationEngine::new(&categories, EngineConfig::default());
        // lime is desired, so lemon cannot take its place and must be force-added
        let result = engine
            .adapt(&gin_fizz(), &Query::new(["lemon", "lime"], Vec::<String>::new()), false)
            .unwrap();
        assert_eq!(result.cost, 2);
        assert!(result.case.contains("lime"));
        assert!(result.case.contains("lemon"));
    }

    #[test]
    fn test_force_add_liquid_uses_cl() {
        let categories = categories();
        let mut engine = AdaptationEngine::new(&categories, EngineConfig::default());
        let result = engine
            .adapt(&gin_fizz(), &Query::new(["tonic"], Vec::<String>::new()), false)
            .unwrap();
        assert_eq!(result.cost, 2);
        assert_eq!(result.case.ingredients.last(), Some(&Ingredient::new("tonic", "1", "cl")));
        assert!(result.case.title.ends_with(" and a bit of tonic"));
    }

    #[test]
    fn test_force_add_solid_has_no_unit() {
        let categories = categories();
        let mut engine = AdaptationEngine::new(&categories, EngineConfig::default());
        let result = engine
            .adapt(&gin_fizz(), &Query::new(["mint"], Vec::<String>::new()), false)
            .unwrap();
        assert_eq!(result.cost, 2);
        assert_eq!(result.case.ingredients.last(), Some(&Ingredient::new("mint", "1", "")));
    }

    #[test]
    fn test_random_replace_avoids_undesired() {
        let categories = categories();
        for seed in 0..20 {
            let settings = EngineConfig { seed, ..EngineConfig::default() };
            let mut engine = AdaptationEngine::new(&categories, settings);
            let query = Query::new(Vec::<String>::new(), ["gin", "vodka"]);
            let result = engine.adapt(&gin_fizz(), &query, false).unwrap();
            assert_eq!(result.cost, 1);
            assert_eq!(names(&result.case), ["cola", "lime", "rum"]);
            assert_eq!(result.case.quantity_of("rum"), Some("4"));
        }
    }

    #[test]
    fn test_random_replace_is_reproducible_for_a_seed() {
        let categories = CategoryIndex::from_pairs([
            ("gin", "alcoholic"),
            ("vodka", "alcoholic"),
            ("rum", "alcoholic"),
            ("tequila", "alcoholic"),
            ("whisky", "alcoholic"),
        ]);
        let case = Case::new("Neat", vec![Ingredient::new("gin", "5", "cl")]);
        let query = Query::new(Vec::<String>::new(), ["gin"]);
        let run = |seed| {
            let mut engine = AdaptationEngine::new(&categories, EngineConfig { seed, ..EngineConfig::default() });
            engine.adapt(&case, &query, false).unwrap().case
        };
        assert_eq!(run(7), run(7));
    }

    #[test]
    fn test_unsatisfiable_category() {
        let categories = CategoryIndex::from_pairs([("gin", "alcoholic"), ("lime", "citrus")]);
        let mut engine = AdaptationEngine::new(&categories, EngineConfig::default());
        let case = Case::new("Gimlet", vec![Ingredient::new("gin", "6", "cl"), Ingredient::new("lime", "2", "cl")]);
        let query = Query::new(Vec::<String>::new(), ["gin"]);

        let err = engine.adapt(&case, &query, false).unwrap_err();
        assert!(matches!(err, EngineError::UnsatisfiableCategory { ref category, .. } if category == "alcoholic"));
        assert!(engine.dry_run(&case, &query).is_err());
    }

    #[test]
    fn test_missing_category_is_fatal() {
        let categories = categories();
        let mut engine = AdaptationEngine::new(&categories, EngineConfig::default());
        let err = engine
            .adapt(&gin_fizz(), &Query::new(["yuzu"], Vec::<String>::new()), true)
            .unwrap_err();
        assert_eq!(err, EngineError::MissingCategory("yuzu".into()));
    }

    #[test]
    fn test_dry_run_matches_real_cost_without_trace() {
        let categories = categories();
        let mut engine = AdaptationEngine::new(&categories, EngineConfig::default());
        let query = Query::new(["vodka", "lemon", "mint"], ["gin", "cola"]);

        let dry = engine.adapt(&gin_fizz(), &query, true).unwrap();
        let real = engine.adapt(&gin_fizz(), &query, false).unwrap();

        // swap gin, replace lime, random cola, force mint
        assert_eq!(dry.cost, 1 + 1 + 1 + 2);
        assert_eq!(dry.cost, real.cost);
        assert!(dry.trace.is_empty());
        assert_eq!(real.trace.len(), 4);
        assert!(real.case.contains("soda"));
        assert!(query.is_satisfied_by(&real.case));
    }

    #[test]
    fn test_dry_runs_do_not_advance_the_generator() {
        let categories = categories();
        let query = Query::new(Vec::<String>::new(), ["gin"]);

        let mut fresh = AdaptationEngine::new(&categories, EngineConfig::default());
        let expected = fresh.adapt(&gin_fizz(), &query, false).unwrap().case;

        let mut used = AdaptationEngine::new(&categories, EngineConfig::default());
        for _ in 0..5 {
            used.adapt(&gin_fizz(), &query, true).unwrap();
        }
        assert_eq!(used.adapt(&gin_fizz(), &query, false).unwrap().case, expected);
    }

    #[test]
    fn test_cost_counts_each_action() {
        let categories = categories();
        let engine = AdaptationEngine::new(&categories, EngineConfig::default());
        let case = Case::new("Plain", vec![Ingredient::new("sugar", "1", "tsp")]);

        let one = engine.dry_run(&case, &Query::new(["tonic"], Vec::<String>::new())).unwrap();
        let two = engine.dry_run(&case, &Query::new(["tonic", "mint"], Vec::<String>::new())).unwrap();
        assert_eq!(one.cost, 2);
        assert_eq!(two.cost, 4);
    }

    #[test]
    fn test_constraints_hold_across_queries() {
        let categories = categories();
        let mut engine = AdaptationEngine::new(&categories, EngineConfig::default());
        let all: Vec<&str> = categories.iter().map(|(n, _)| n).collect();

        for (i, want) in all.iter().enumerate() {
            for avoid in all.iter().skip(i + 1) {
                let query = Query::new([*want], [*avoid]);
                match engine.adapt(&gin_fizz(), &query, false) {
                    Ok(result) => assert!(query.is_satisfied_by(&result.case), "{:?}", query),
                    Err(EngineError::UnsatisfiableCategory { .. }) => {}
                    Err(e) => panic!("unexpected error for {:?}: {}", query, e),
                }
            }
        }
    }

    #[test]
    fn test_conflicting_query_is_rejected() {
        let categories = categories();
        let mut engine = AdaptationEngine::new(&categories, EngineConfig::default());
        let case = Case::new("Daiquiri", vec![Ingredient::new("lime", "2", "cl")]);
        let query = Query::new(["gin"], ["gin"]);

        let expected = EngineError::ConflictingQuery("gin".into());
        assert_eq!(engine.dry_run(&case, &query).unwrap_err(), expected);
        assert_eq!(engine.adapt(&case, &query, false).unwrap_err(), expected);
    }

    #[test]
    fn test_repeated_undesired_line_is_fully_replaced() {
        let categories = categories();
        let mut engine = AdaptationEngine::new(&categories, EngineConfig::default());
        let case = Case::new(
            "Double Gin",
            vec![
                Ingredient::new("gin", "4", "cl"),
                Ingredient::new("gin", "2", "cl"),
                Ingredient::new("lime", "2", "cl"),
            ],
        );
        let query = Query::new(["vodka"], ["gin"]);

        let dry = engine.dry_run(&case, &query).unwrap();
        let real = engine.adapt(&case, &query, false).unwrap();

        // swap the first line, then replace the second at random
        assert_eq!(real.cost, 2);
        assert_eq!(dry.cost, real.cost);
        assert!(matches!(real.trace[0].step, RepairStep::Swap { .. }));
        assert!(matches!(real.trace[1].step, RepairStep::RandomReplace { .. }));
        assert_eq!(real.case.ingredients[0], Ingredient::new("vodka", "4", "cl"));
        assert!(query.is_satisfied_by(&real.case));
        assert!(query.is_satisfied_by(&dry.case));
    }

    #[test]
    fn test_random_replace_never_gives_up_on_a_lone_sibling() {
        // one acceptable member among many undesired ones
        let categories = CategoryIndex::from_pairs([
            ("gin", "alcoholic"),
            ("vodka", "alcoholic"),
            ("rum", "alcoholic"),
            ("tequila", "alcoholic"),
            ("whisky", "alcoholic"),
        ]);
        let case = Case::new("Neat", vec![Ingredient::new("gin", "5", "cl")]);
        let query = Query::new(Vec::<String>::new(), ["gin", "vodka", "rum", "tequila"]);
        for seed in 0..50 {
            let mut engine = AdaptationEngine::new(&categories, EngineConfig { seed, ..EngineConfig::default() });
            let result = engine.adapt(&case, &query, false).unwrap();
            assert_eq!(result.case.ingredients[0].name, "whisky");
        }
    }

    #[test]
    fn test_step_display() {
        let step = RepairStep::ForceAdd {
            desired: "tonic".into(),
            quantity: "1".into(),
            unit: "cl".into(),
        };
        assert_eq!(step.cost(), 2);
        assert!(step.to_string().contains("(1cl)"));
    }
}
