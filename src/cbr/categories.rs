//! Ingredient category lookup
//!
//! Categories are curated outside the engine and only ever read here.

use anyhow::Result;
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::EngineError;

/// Static mapping from ingredient name to category tag
#[derive(Debug, Clone, Default)]
pub struct CategoryIndex {
    by_name: BTreeMap<String, String>,
    /// Members of each category, ascending
    members: BTreeMap<String, Vec<String>>,
}

impl CategoryIndex {
    pub fn from_pairs<I, N, C>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (N, C)>,
        N: Into<String>,
        C: Into<String>,
    {
        let by_name: BTreeMap<String, String> = pairs
            .into_iter()
            .map(|(name, category)| (name.into(), category.into()))
            .collect();

        let mut members: BTreeMap<String, Vec<String>> = BTreeMap::new();
        // by_name iterates in key order, so each member list is already sorted
        for (name, category) in &by_name {
            members.entry(category.clone()).or_default().push(name.clone());
        }

        Self { by_name, members }
    }

    /// Load a curated category file
    pub fn load(path: &Path) -> Result<Self> {
        let pairs = crate::store::xml::read_categories(path)?;
        Ok(Self::from_pairs(pairs))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Category of `name`, failing with `MissingCategory` if uncategorised
    pub fn category_of(&self, name: &str) -> Result<&str, EngineError> {
        self.by_name
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| EngineError::MissingCategory(name.to_string()))
    }

    /// True if both ingredients are categorised and share a category
    pub fn same_category(&self, a: &str, b: &str) -> Result<bool, EngineError> {
        Ok(self.category_of(a)? == self.category_of(b)?)
    }

    /// True if `name` belongs to one of the `liquid` categories
    pub fn is_liquid(&self, name: &str, liquid: &[String]) -> Result<bool, EngineError> {
        let category = self.category_of(name)?;
        Ok(liquid.iter().any(|c| c == category))
    }

    /// All ingredients of `category`, ascending
    pub fn members(&self, category: &str) -> &[String] {
        self.members.get(category).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.by_name.iter().map(|(n, c)| (n.as_str(), c.as_str()))
    }
}
