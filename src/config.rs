//! Configuration management
//!
//! Manages file locations, adaptation settings and the review mode.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Case base and category file locations
    #[serde(default)]
    pub store: StoreConfig,
    /// Adaptation engine settings
    #[serde(default)]
    pub engine: EngineConfig,
    /// Review of adapted cocktails
    #[serde(default)]
    pub review: ReviewConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Directory relative file names resolve against (defaults to the project data dir)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
    /// Our own case base, written after every query
    #[serde(default = "default_case_base")]
    pub case_base: PathBuf,
    /// Case base provided by the challenge, used until we have our own
    #[serde(default = "default_official_case_base")]
    pub official_case_base: PathBuf,
    /// Curated ingredient categories
    #[serde(default = "default_categories")]
    pub categories: PathBuf,
    /// Export of all known ingredients, to be curated into `categories`
    #[serde(default = "default_categories_raw")]
    pub categories_raw: PathBuf,
}

fn default_case_base() -> PathBuf {
    PathBuf::from("case_base.xml")
}

fn default_official_case_base() -> PathBuf {
    PathBuf::from("ccc_cocktails.xml")
}

fn default_categories() -> PathBuf {
    PathBuf::from("categories.xml")
}

fn default_categories_raw() -> PathBuf {
    PathBuf::from("categories_raw.xml")
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            case_base: default_case_base(),
            official_case_base: default_official_case_base(),
            categories: default_categories(),
            categories_raw: default_categories_raw(),
        }
    }
}

impl StoreConfig {
    /// Directory that relative paths are resolved against
    pub fn base_dir(&self) -> Result<PathBuf> {
        match &self.data_dir {
            Some(dir) => Ok(dir.clone()),
            None => data_dir(),
        }
    }

    fn resolve(&self, path: &Path) -> Result<PathBuf> {
        if path.is_absolute() {
            Ok(path.to_path_buf())
        } else {
            Ok(self.base_dir()?.join(path))
        }
    }

    pub fn case_base_path(&self) -> Result<PathBuf> {
        self.resolve(&self.case_base)
    }

    pub fn official_case_base_path(&self) -> Result<PathBuf> {
        self.resolve(&self.official_case_base)
    }

    pub fn categories_path(&self) -> Result<PathBuf> {
        self.resolve(&self.categories)
    }

    pub fn categories_raw_path(&self) -> Result<PathBuf> {
        self.resolve(&self.categories_raw)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Seed for the random replacement stage
    #[serde(default)]
    pub seed: u64,
    /// Categories measured in `liquid_unit` when force-added
    #[serde(default = "default_liquid_categories")]
    pub liquid_categories: Vec<String>,
    /// Quantity used when force-adding an ingredient
    #[serde(default = "default_force_add_quantity")]
    pub force_add_quantity: String,
    #[serde(default = "default_liquid_unit")]
    pub liquid_unit: String,
}

fn default_liquid_categories() -> Vec<String> {
    vec!["alcoholic".to_string(), "nonalcoholic".to_string()]
}

fn default_force_add_quantity() -> String {
    "1".to_string()
}

fn default_liquid_unit() -> String {
    "cl".to_string()
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            liquid_categories: default_liquid_categories(),
            force_add_quantity: default_force_add_quantity(),
            liquid_unit: default_liquid_unit(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewConfig {
    /// Retain adapted cocktails without asking
    #[serde(default)]
    pub auto_approve: bool,
}

impl Config {
    /// Load configuration from the default location, writing defaults on first use
    pub fn load() -> Result<Self> {
        Self::load_from(&config_path()?)
    }

    /// Load configuration from a specific file, writing defaults if it is missing
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            let config: Config = toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config file {}", path.display()))?;
            Ok(config)
        } else {
            let config = Config::default();
            config.save_to(path)?;
            Ok(config)
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        let parent = path.parent()
            .context("Config path has no parent")?;

        std::fs::create_dir_all(parent)
            .context("Failed to create config directory")?;

        let contents = toml::to_string_pretty(self)
            .context("Failed to serialize config")?;

        std::fs::write(path, contents)
            .with_context(|| format!("Failed to write config file {}", path.display()))?;

        Ok(())
    }
}

/// Get the configuration file path
pub fn config_path() -> Result<PathBuf> {
    let base = directories::ProjectDirs::from("com", "cocktail-cbr", "cocktail-cbr")
        .context("Failed to get project directories")?;
    Ok(base.config_dir().join("config.toml"))
}

/// Get the data directory path
pub fn data_dir() -> Result<PathBuf> {
    let base = directories::ProjectDirs::from("com", "cocktail-cbr", "cocktail-cbr")
        .context("Failed to get project directories")?;
    Ok(base.data_dir().to_path_buf())
}

/// Show the effective configuration
pub fn show_config(config: &Config) -> Result<()> {
    println!("Case base:          {}", config.store.case_base_path()?.display());
    println!("Official case base: {}", config.store.official_case_base_path()?.display());
    println!("Categories:         {}", config.store.categories_path()?.display());
    println!("Raw categories:     {}", config.store.categories_raw_path()?.display());
    println!();
    println!("Seed:               {}", config.engine.seed);
    println!("Liquid categories:  {} (added as {}{})",
        config.engine.liquid_categories.join(", "),
        config.engine.force_add_quantity,
        config.engine.liquid_unit);
    println!("Review:             {}", if config.review.auto_approve { "automatic" } else { "interactive" });
    Ok(())
}

/// Get default configuration as TOML string
pub fn default_config_toml() -> String {
    let config = Config::default();
    toml::to_string_pretty(&config).unwrap_or_else(|_| "# Default configuration\n".to_string())
}
