//! Case store - persistent case base on disk
//!
//! Our own case base is preferred once it exists; until then the official
//! case base provided with the challenge seeds the cycle.

pub mod xml;

use anyhow::Result;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::config::StoreConfig;
use crate::types::Case;

/// Persistence seam used by retention
#[cfg_attr(test, mockall::automock)]
pub trait CaseStore {
    /// Load the ordered case list
    fn load(&self) -> Result<Vec<Case>>;

    /// Overwrite the stored case list in full
    fn save(&self, cases: &[Case]) -> Result<()>;
}

/// Where a loaded case list came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseSource {
    Local,
    Official,
}

impl std::fmt::Display for CaseSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CaseSource::Local => write!(f, "our case base"),
            CaseSource::Official => write!(f, "official case base"),
        }
    }
}

/// Case store backed by XML files
pub struct XmlCaseStore {
    case_base: PathBuf,
    official_case_base: PathBuf,
}

impl XmlCaseStore {
    pub fn new(case_base: PathBuf, official_case_base: PathBuf) -> Self {
        Self { case_base, official_case_base }
    }

    /// Create from the configured locations
    pub fn from_config(config: &StoreConfig) -> Result<Self> {
        Ok(Self::new(config.case_base_path()?, config.official_case_base_path()?))
    }

    pub fn case_base_path(&self) -> &Path {
        &self.case_base
    }

    /// Load cases and report which base they came from
    pub fn load_with_source(&self) -> Result<(Vec<Case>, CaseSource)> {
        if self.case_base.exists() {
            let cases = xml::read_case_base(&self.case_base)?;
            info!("Loaded {} cases from {}", cases.len(), self.case_base.display());
            Ok((cases, CaseSource::Local))
        } else {
            let cases = xml::read_official_case_base(&self.official_case_base)?;
            info!("Loaded {} cases from {}", cases.len(), self.official_case_base.display());
            Ok((cases, CaseSource::Official))
        }
    }
}

impl CaseStore for XmlCaseStore {
    fn load(&self) -> Result<Vec<Case>> {
        Ok(self.load_with_source()?.0)
    }

    fn save(&self, cases: &[Case]) -> Result<()> {
        xml::write_case_base(&self.case_base, cases)?;
        info!("Saved {} cases to {}", cases.len(), self.case_base.display());
        Ok(())
    }
}

/// Every ingredient name used by the cases
pub fn extract_ingredient_names(cases: &[Case]) -> BTreeSet<String> {
    cases
        .iter()
        .flat_map(|case| case.ingredients.iter().map(|i| i.name.clone()))
        .collect()
}

/// Write all ingredient names with blank categories for manual curation
pub fn export_raw_categories(cases: &[Case], path: &Path) -> Result<usize> {
    let names = extract_ingredient_names(cases);
    xml::write_raw_categories(path, &names)?;
    info!("Exported {} ingredients to {}", names.len(), path.display());
    Ok(names.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Ingredient;

    const OFFICIAL: &str = r#"<recipes>
  <recipe>
    <title>Margarita</title>
    <ingredients>
      <ingredient food="Tequila" quantity="5" unit="cl"/>
      <ingredient food="lime juice" quantity="2" unit="cl"/>
    </ingredients>
  </recipe>
</recipes>"#;

    #[test]
    fn test_official_base_until_local_exists() {
        let dir = tempfile::tempdir().unwrap();
        let official = dir.path().join("ccc_cocktails.xml");
        std::fs::write(&official, OFFICIAL).unwrap();
        let store = XmlCaseStore::new(dir.path().join("case_base.xml"), official);

        let (mut cases, source) = store.load_with_source().unwrap();
        assert_eq!(source, CaseSource::Official);
        assert_eq!(cases[0].ingredients[0].name, "tequila");

        cases.push(Case::new("Tequila Sunrise", vec![Ingredient::new("tequila", "4", "cl")]));
        store.save(&cases).unwrap();

        let (reloaded, source) = store.load_with_source().unwrap();
        assert_eq!(source, CaseSource::Local);
        assert_eq!(reloaded, cases);
    }

    #[test]
    fn test_missing_files_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = XmlCaseStore::new(dir.path().join("a.xml"), dir.path().join("b.xml"));
        assert!(store.load().is_err());
    }

    #[test]
    fn test_extract_ingredient_names() {
        let cases = vec![
            Case::new("A", vec![Ingredient::new("gin", "4", "cl"), Ingredient::new("lime", "1", "")]),
            Case::new("B", vec![Ingredient::new("gin", "2", "cl"), Ingredient::new("cola", "8", "cl")]),
        ];
        let names: Vec<String> = extract_ingredient_names(&cases).into_iter().collect();
        assert_eq!(names, ["cola", "gin", "lime"]);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("categories_raw.xml");
        assert_eq!(export_raw_categories(&cases, &path).unwrap(), 3);
        assert_eq!(xml::read_categories(&path).unwrap().len(), 3);
    }
}
