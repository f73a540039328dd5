//! Retention of approved cases
//!
//! The case list order decides retrieval ties, so approved cases are always
//! appended at the end.

use anyhow::Result;
use tracing::info;

use crate::store::CaseStore;
use crate::types::Case;

/// Appends approved cases and persists the case list
pub struct RetentionManager<'s, S: CaseStore + ?Sized> {
    store: &'s S,
}

impl<'s, S: CaseStore + ?Sized> RetentionManager<'s, S> {
    pub fn new(store: &'s S) -> Self {
        Self { store }
    }

    /// Append `approved` and save the whole list. Returns the new case's index.
    pub fn retain(&self, cases: &mut Vec<Case>, approved: Case) -> Result<usize> {
        info!("Retaining '{}'", approved.title);
        cases.push(approved);
        self.store.save(cases)?;
        Ok(cases.len() - 1)
    }

    /// Persist the list without adding anything
    pub fn persist(&self, cases: &[Case]) -> Result<()> {
        self.store.save(cases)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MockCaseStore;
    use crate::types::Ingredient;

    #[test]
    fn test_retain_appends_and_saves() {
        let mut store = MockCaseStore::new();
        store
            .expect_save()
            .withf(|cases| cases.len() == 2 && cases[1].title == "Vodka Fizz")
            .times(1)
            .returning(|_| Ok(()));

        let manager = RetentionManager::new(&store);
        let mut cases = vec![Case::new("Gin Fizz", vec![Ingredient::new("gin", "4", "cl")])];
        let index = manager
            .retain(&mut cases, Case::new("Vodka Fizz", vec![Ingredient::new("vodka", "4", "cl")]))
            .unwrap();

        assert_eq!(index, 1);
        assert_eq!(cases[0].title, "Gin Fizz");
    }

    #[test]
    fn test_save_failure_propagates() {
        let mut store = MockCaseStore::new();
        store
            .expect_save()
            .returning(|_| Err(anyhow::anyhow!("disk full")));

        let manager = RetentionManager::new(&store);
        let mut cases = Vec::new();
        let err = manager.retain(&mut cases, Case::new("X", Vec::new())).unwrap_err();
        assert_eq!(err.to_string(), "disk full");
    }
}
