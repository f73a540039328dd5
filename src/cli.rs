//! CLI interface for cocktail-cbr

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::cbr::{AdaptationEngine, CategoryIndex, Cycle, CycleOutcome, RetentionManager, SimilarityEngine};
use crate::config::{self, Config, EngineConfig};
use crate::review::{AutoApprove, InteractiveReviewer, Prompt, Reviewer, RustylinePrompt};
use crate::store::{self, CaseSource, CaseStore, XmlCaseStore};
use crate::types::{Case, Ignored, Query};

#[derive(Parser)]
#[command(name = "cocktail-cbr")]
#[command(about = "Case-based reasoning cocktail generator", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file to use instead of the default one
    #[arg(long, global = true, env = "COCKTAIL_CBR_CONFIG")]
    config: Option<PathBuf>,

    /// Directory holding the case bases and category files
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask for ingredients in a loop (default when no command given)
    Interactive {
        /// Retain adapted cocktails without review
        #[arg(short, long)]
        yes: bool,
        /// Seed for random replacements
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Answer a single query
    Query {
        /// Ingredients the cocktail must contain
        #[arg(short, long, num_args = 1..)]
        desired: Vec<String>,
        /// Ingredients the cocktail must not contain
        #[arg(short, long, num_args = 1..)]
        undesired: Vec<String>,
        /// Retain the adapted cocktail without review
        #[arg(short, long)]
        yes: bool,
        /// Only propose a cocktail, never store it
        #[arg(long)]
        no_retain: bool,
        /// Seed for random replacements
        #[arg(long)]
        seed: Option<u64>,
        /// Print the outcome as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show how far every stored cocktail is from a query
    Rank {
        #[arg(short, long, num_args = 1..)]
        desired: Vec<String>,
        #[arg(short, long, num_args = 1..)]
        undesired: Vec<String>,
        /// Maximum results to show
        #[arg(short, long)]
        limit: Option<usize>,
        /// Print the ranking as JSON
        #[arg(long)]
        json: bool,
    },
    /// List stored cocktails
    List {
        /// Maximum cocktails to show
        #[arg(short, long)]
        limit: Option<usize>,
    },
    /// Write every known ingredient to a category file for curation
    ExtractIngredients {
        /// Output file (defaults to the configured raw category file)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Manage configuration
    Config {
        /// Display current configuration
        #[arg(long)]
        show: bool,
        /// Write the default configuration
        #[arg(long)]
        init: bool,
        /// Print the configuration file path
        #[arg(long)]
        path: bool,
    },
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    if let Some(Commands::Config { show, init, path }) = &cli.command {
        let config_file = match &cli.config {
            Some(file) => file.clone(),
            None => config::config_path()?,
        };
        return handle_config(&config_file, cli.data_dir.clone(), *show, *init, *path);
    }

    let mut config = match &cli.config {
        Some(file) => Config::load_from(file)?,
        None => Config::load()?,
    };
    if let Some(dir) = cli.data_dir {
        config.store.data_dir = Some(dir);
    }

    // Default to interactive mode if no command given
    match cli.command {
        None => run_interactive(&config, false, None)?,
        Some(Commands::Interactive { yes, seed }) => run_interactive(&config, yes, seed)?,
        Some(Commands::Query { desired, undesired, yes, no_retain, seed, json }) => {
            run_query(&config, &desired, &undesired, yes, no_retain, seed, json)?;
        }
        Some(Commands::Rank { desired, undesired, limit, json }) => {
            run_rank(&config, &desired, &undesired, limit, json)?;
        }
        Some(Commands::List { limit }) => list_cases(&config, limit)?,
        Some(Commands::ExtractIngredients { output }) => extract_ingredients(&config, output)?,
        Some(Commands::Config { .. }) => {}
    }

    Ok(())
}

fn handle_config(file: &Path, data_dir: Option<PathBuf>, show: bool, init: bool, path: bool) -> Result<()> {
    if path {
        println!("{}", file.display());
    } else if init {
        Config::default().save_to(file)?;
        println!("Default configuration written to {}", file.display());
    } else if show {
        let mut config = Config::load_from(file)?;
        if data_dir.is_some() {
            config.store.data_dir = data_dir;
        }
        config::show_config(&config)?;
    } else {
        println!("Configuration options:");
        println!("  --show    Display current configuration");
        println!("  --init    Write the default configuration");
        println!("  --path    Print the configuration file path");
        println!();
        println!("Default configuration:");
        print!("{}", config::default_config_toml());
    }
    Ok(())
}

/// Case base, categories and the store they came from
struct Session {
    store: XmlCaseStore,
    categories: CategoryIndex,
    cases: Vec<Case>,
}

impl Session {
    fn open(config: &Config) -> Result<Self> {
        let store = XmlCaseStore::from_config(&config.store)?;
        let (cases, source) = store.load_with_source()?;
        if source == CaseSource::Official {
            // categories are curated from this export
            store::export_raw_categories(&cases, &config.store.categories_raw_path()?)?;
        }

        let categories_path = config.store.categories_path()?;
        let categories = CategoryIndex::load(&categories_path).with_context(|| {
            format!(
                "Categorise the ingredients in {} and save the result as {}",
                config.store.categories_raw_path().unwrap_or_default().display(),
                categories_path.display()
            )
        })?;
        info!("Loaded {} cases from {} and {} categorised ingredients", cases.len(), source, categories.len());

        Ok(Self { store, categories, cases })
    }

    fn query(&self, desired: &[String], undesired: &[String]) -> Query {
        let (query, ignored) = Query::sanitize(desired, undesired, &self.categories);
        report_ignored(&ignored);
        query
    }
}

fn report_ignored(ignored: &Ignored) {
    for name in &ignored.unknown {
        warn!("Ignoring unknown ingredient '{}'", name);
        eprintln!("The ingredient {} does not exist and is ignored.", name);
    }
    for name in &ignored.conflicting {
        warn!("Ignoring '{}': both desired and undesired", name);
        eprintln!("The ingredient {} is both desired and undesired and is ignored.", name);
    }
}

fn engine_settings(config: &Config, seed: Option<u64>) -> EngineConfig {
    let mut settings = config.engine.clone();
    if let Some(seed) = seed {
        settings.seed = seed;
    }
    settings
}

fn make_reviewer(interactive: bool) -> Result<Box<dyn Reviewer>> {
    if interactive {
        Ok(Box::new(InteractiveReviewer::new(RustylinePrompt::new()?)))
    } else {
        Ok(Box::new(AutoApprove))
    }
}

fn print_outcome(outcome: &CycleOutcome, show_trace: bool) {
    let (Some((index, title)), Some(adaptation)) = (&outcome.retrieved, &outcome.adaptation) else {
        println!("No usable cocktail found for this query.");
        return;
    };

    println!("Retrieved cocktail #{} '{}' (distance {})", index, title, outcome.distance);
    if !adaptation.was_adapted() {
        println!("It satisfies the query and can be used directly:");
        println!("{}", adaptation.case);
        return;
    }
    if show_trace {
        for entry in &adaptation.trace {
            println!("{}", entry);
        }
        println!("Adapted cocktail (cost {}):", adaptation.cost);
        println!("{}", adaptation.case);
    }
    match outcome.retained {
        Some(index) => println!("Saved as cocktail #{}.", index),
        None => println!("The adapted cocktail was not saved."),
    }
}

fn run_query(
    config: &Config,
    desired: &[String],
    undesired: &[String],
    yes: bool,
    no_retain: bool,
    seed: Option<u64>,
    json: bool,
) -> Result<()> {
    let mut session = Session::open(config)?;
    let query = session.query(desired, undesired);
    let engine = AdaptationEngine::new(&session.categories, engine_settings(config, seed));

    let interactive = !(yes || no_retain || config.review.auto_approve);
    let mut cycle = if no_retain {
        Cycle::without_retention(engine)
    } else {
        Cycle::new(engine, &session.store)
    };
    let mut reviewer = make_reviewer(interactive)?;
    let outcome = cycle.run(&mut session.cases, &query, reviewer.as_mut())?;

    if !no_retain && outcome.retained.is_none() {
        // the first query turns the official base into our own
        session.store.save(&session.cases)?;
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        print_outcome(&outcome, !interactive);
    }
    Ok(())
}

fn run_interactive(config: &Config, yes: bool, seed: Option<u64>) -> Result<()> {
    let mut session = Session::open(config)?;
    let engine = AdaptationEngine::new(&session.categories, engine_settings(config, seed));
    let mut cycle = Cycle::new(engine, &session.store);
    let retention = RetentionManager::new(&session.store);

    let interactive = !(yes || config.review.auto_approve);
    let mut reviewer = make_reviewer(interactive)?;
    let mut prompt = RustylinePrompt::new()?;

    println!("Welcome to the cocktail generator!");
    println!("Enter ingredients separated by spaces, with dashes instead of spaces inside names (orange-juice).");
    println!("Type 'exit' to quit.");

    loop {
        let Some(desired) = prompt.read_line("Desired ingredients: ")? else {
            break;
        };
        if desired.trim() == "exit" {
            break;
        }
        let Some(undesired) = prompt.read_line("Undesired ingredients: ")? else {
            break;
        };
        if undesired.trim() == "exit" {
            break;
        }

        let desired: Vec<String> = desired.split_whitespace().map(String::from).collect();
        let undesired: Vec<String> = undesired.split_whitespace().map(String::from).collect();
        let (query, ignored) = Query::sanitize(&desired, &undesired, &session.categories);
        report_ignored(&ignored);

        let retained = match cycle.run(&mut session.cases, &query, reviewer.as_mut()) {
            Ok(outcome) => {
                print_outcome(&outcome, !interactive);
                outcome.retained.is_some()
            }
            Err(e) => {
                warn!("Query failed: {:#}", e);
                eprintln!("Error: {:#}", e);
                false
            }
        };

        // retention already saved
        if !retained {
            retention.persist(&session.cases)?;
        }
    }

    Ok(())
}

fn run_rank(config: &Config, desired: &[String], undesired: &[String], limit: Option<usize>, json: bool) -> Result<()> {
    let session = Session::open(config)?;
    let query = session.query(desired, undesired);
    let engine = AdaptationEngine::new(&session.categories, config.engine.clone());

    let mut ranked = SimilarityEngine::new(&engine).rank(&session.cases, &query)?;
    if let Some(limit) = limit {
        ranked.truncate(limit);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&ranked)?);
        return Ok(());
    }

    println!("{:>5}  {:>8}  {}", "#", "distance", "title");
    for scored in &ranked {
        println!("{:>5}  {:>8}  {}", scored.index, scored.distance.to_string(), scored.title);
    }
    Ok(())
}

fn list_cases(config: &Config, limit: Option<usize>) -> Result<()> {
    let store = XmlCaseStore::from_config(&config.store)?;
    let (cases, source) = store.load_with_source()?;

    println!("{} cocktails in {}", cases.len(), source);
    println!();
    for (index, case) in cases.iter().enumerate().take(limit.unwrap_or(usize::MAX)) {
        print!("#{} {}", index, case);
        println!();
    }
    Ok(())
}

fn extract_ingredients(config: &Config, output: Option<PathBuf>) -> Result<()> {
    let store = XmlCaseStore::from_config(&config.store)?;
    let cases = store.load()?;
    let output = match output {
        Some(path) => path,
        None => config.store.categories_raw_path()?,
    };

    let count = store::export_raw_categories(&cases, &output)?;
    println!("Wrote {} ingredients to {}", count, output.display());
    Ok(())
}
