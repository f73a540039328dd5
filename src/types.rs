//! Shared types used across modules
//!
//! Cases, ingredients and queries are used by the engine, the case store and
//! the review boundary alike, so they live here to avoid circular dependencies.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::cbr::categories::CategoryIndex;

/// A single ingredient line of a recipe
///
/// Quantity and unit are display strings and are never combined arithmetically.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ingredient {
    pub name: String,
    pub quantity: String,
    pub unit: String,
}

impl Ingredient {
    pub fn new(name: impl Into<String>, quantity: impl Into<String>, unit: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            quantity: quantity.into(),
            unit: unit.into(),
        }
    }
}

impl std::fmt::Display for Ingredient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{} {}", self.quantity, self.unit, self.name)
    }
}

/// A stored solution usable as a retrieval candidate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Case {
    pub title: String,
    /// Insertion order; not meaningful for matching
    pub ingredients: Vec<Ingredient>,
    /// `false` marks a failed past solution that retrieval must skip
    pub success: bool,
}

impl Case {
    /// Create a successful case
    pub fn new(title: impl Into<String>, ingredients: Vec<Ingredient>) -> Self {
        Self {
            title: title.into(),
            ingredients,
            success: true,
        }
    }

    /// Names of the ingredients currently in the case, in lexicographic order
    pub fn ingredient_set(&self) -> BTreeSet<String> {
        self.ingredients.iter().map(|i| i.name.clone()).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.ingredients.iter().any(|i| i.name == name)
    }

    /// Swap `old` for `new_name`, keeping the quantity and unit of `old`.
    ///
    /// Returns false if the case has no ingredient called `old`.
    pub fn replace_ingredient(&mut self, old: &str, new_name: &str) -> bool {
        match self.ingredients.iter_mut().find(|i| i.name == old) {
            Some(slot) => {
                slot.name = new_name.to_string();
                self.title.push_str(&format!(" with {} instead of {}", new_name, old));
                true
            }
            None => false,
        }
    }

    /// Replace `old` with a complete ingredient line
    pub fn replace_ingredient_with(&mut self, old: &str, new: Ingredient) -> bool {
        match self.ingredients.iter_mut().find(|i| i.name == old) {
            Some(slot) => {
                self.title.push_str(&format!(" with {} instead of {}", new.name, old));
                *slot = new;
                true
            }
            None => false,
        }
    }

    pub fn add_ingredient(&mut self, ingredient: Ingredient) {
        self.title.push_str(&format!(" and a bit of {}", ingredient.name));
        self.ingredients.push(ingredient);
    }

    /// Remove every line naming `name`
    pub fn remove_ingredient(&mut self, name: &str) -> bool {
        let before = self.ingredients.len();
        self.ingredients.retain(|i| i.name != name);
        if self.ingredients.len() == before {
            return false;
        }
        self.title.push_str(&format!(" without {}", name));
        true
    }

    /// Quantity string of the first line naming `name`
    pub fn quantity_of(&self, name: &str) -> Option<&str> {
        self.ingredients
            .iter()
            .find(|i| i.name == name)
            .map(|i| i.quantity.as_str())
    }
}

impl std::fmt::Display for Case {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{}", self.title)?;
        for ingredient in &self.ingredients {
            writeln!(f, "{}", ingredient)?;
        }
        Ok(())
    }
}

/// Constraint query: ingredients that must and must not appear
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    pub desired: BTreeSet<String>,
    pub undesired: BTreeSet<String>,
}

impl Query {
    pub fn new<D, U>(desired: D, undesired: U) -> Self
    where
        D: IntoIterator,
        D::Item: Into<String>,
        U: IntoIterator,
        U::Item: Into<String>,
    {
        Self {
            desired: desired.into_iter().map(Into::into).collect(),
            undesired: undesired.into_iter().map(Into::into).collect(),
        }
    }

    /// Build a query from raw user tokens.
    ///
    /// Dashes stand for spaces. Names without a category, and names asked
    /// for as both desired and undesired, are dropped and returned so the
    /// caller can tell the user they were ignored.
    pub fn sanitize<D, U>(desired: D, undesired: U, categories: &CategoryIndex) -> (Self, Ignored)
    where
        D: IntoIterator,
        D::Item: AsRef<str>,
        U: IntoIterator,
        U::Item: AsRef<str>,
    {
        let mut ignored = Ignored::default();
        let mut keep = |raw: &str| -> Option<String> {
            let name = normalize_name(raw);
            if name.is_empty() {
                return None;
            }
            if categories.contains(&name) {
                Some(name)
            } else {
                ignored.unknown.push(name);
                None
            }
        };

        let mut desired: BTreeSet<String> = desired.into_iter().filter_map(|d| keep(d.as_ref())).collect();
        let mut undesired: BTreeSet<String> = undesired.into_iter().filter_map(|u| keep(u.as_ref())).collect();

        ignored.conflicting = desired.intersection(&undesired).cloned().collect();
        for name in &ignored.conflicting {
            desired.remove(name);
            undesired.remove(name);
        }

        (Self { desired, undesired }, ignored)
    }

    /// First name that is both desired and undesired
    pub fn conflict(&self) -> Option<&String> {
        self.desired.intersection(&self.undesired).next()
    }

    /// Desired ingredients the case lacks
    pub fn missing(&self, case: &Case) -> BTreeSet<String> {
        let present = case.ingredient_set();
        self.desired.difference(&present).cloned().collect()
    }

    /// Undesired ingredients the case contains
    pub fn extra(&self, case: &Case) -> BTreeSet<String> {
        let present = case.ingredient_set();
        self.undesired.intersection(&present).cloned().collect()
    }

    pub fn is_satisfied_by(&self, case: &Case) -> bool {
        self.missing(case).is_empty() && self.extra(case).is_empty()
    }

    /// Every ingredient name the query mentions
    pub fn names(&self) -> impl Iterator<Item = &String> {
        self.desired.iter().chain(self.undesired.iter())
    }
}

/// User tokens left out of a sanitized query
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ignored {
    /// Names without a category
    pub unknown: Vec<String>,
    /// Names given as both desired and undesired
    pub conflicting: Vec<String>,
}

impl Ignored {
    pub fn is_empty(&self) -> bool {
        self.unknown.is_empty() && self.conflicting.is_empty()
    }
}

/// Normalise a user-typed ingredient token (`orange-juice` -> `orange juice`)
pub fn normalize_name(raw: &str) -> String {
    raw.trim().replace('-', " ").to_lowercase()
}

/// Adaptation distance between a case and a query
///
/// `Infinite` sorts after every finite distance and marks a case that cannot
/// be used for the query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Distance {
    Finite(u32),
    Infinite,
}

impl Distance {
    pub fn as_finite(&self) -> Option<u32> {
        match self {
            Distance::Finite(cost) => Some(*cost),
            Distance::Infinite => None,
        }
    }
}

impl std::fmt::Display for Distance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Distance::Finite(cost) => write!(f, "{}", cost),
            Distance::Infinite => write!(f, "inf"),
        }
    }
}
