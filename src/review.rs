//! Expert review of adapted cocktails
//!
//! Review sits outside the reasoning core: it receives an adaptation result
//! and either approves a (possibly edited) cocktail or rejects it.

use anyhow::{bail, Result};
use tracing::info;

use crate::cbr::adapt::AdaptationResult;
use crate::cbr::categories::CategoryIndex;
use crate::types::{normalize_name, Case, Ingredient, Query};

/// Decision returned by a reviewer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReviewOutcome {
    Approved(Case),
    Rejected,
}

/// Decides whether an adapted cocktail is worth keeping
pub trait Reviewer {
    fn review(
        &mut self,
        result: &AdaptationResult,
        query: &Query,
        categories: &CategoryIndex,
    ) -> Result<ReviewOutcome>;
}

/// Approves every adapted cocktail as is
#[derive(Debug, Default, Clone, Copy)]
pub struct AutoApprove;

impl Reviewer for AutoApprove {
    fn review(&mut self, result: &AdaptationResult, _: &Query, _: &CategoryIndex) -> Result<ReviewOutcome> {
        Ok(ReviewOutcome::Approved(result.case.clone()))
    }
}

/// Line-oriented conversation with the expert
pub trait Prompt {
    /// Read one line; `None` when input is closed
    fn read_line(&mut self, prompt: &str) -> Result<Option<String>>;

    /// Show a message
    fn say(&mut self, message: &str);
}

/// Terminal prompt with line editing and history
pub struct RustylinePrompt {
    editor: rustyline::DefaultEditor,
}

impl RustylinePrompt {
    pub fn new() -> Result<Self> {
        Ok(Self { editor: rustyline::DefaultEditor::new()? })
    }
}

impl Prompt for RustylinePrompt {
    fn read_line(&mut self, prompt: &str) -> Result<Option<String>> {
        match self.editor.readline(prompt) {
            Ok(line) => {
                if !line.trim().is_empty() {
                    let _ = self.editor.add_history_entry(line.as_str());
                }
                Ok(Some(line))
            }
            Err(rustyline::error::ReadlineError::Interrupted)
            | Err(rustyline::error::ReadlineError::Eof) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn say(&mut self, message: &str) {
        println!("{}", message);
    }
}

/// Edit command typed during manual improvement
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReviewCommand {
    /// `add <ingredient> <quantity> <unit>`
    Add(Ingredient),
    /// `replace <ingredient> <new-ingredient> <quantity> <unit>`
    Replace { old: String, new: Ingredient },
    /// `remove <ingredient>`
    Remove(String),
    /// `save`
    Save,
    /// `discard`
    Discard,
}

/// `none` stands for an empty unit
fn parse_unit(raw: &str) -> String {
    if raw == "none" {
        String::new()
    } else {
        raw.to_string()
    }
}

impl ReviewCommand {
    /// Parse a command line. Dashes in ingredient names stand for spaces.
    pub fn parse(line: &str) -> Result<Self> {
        let words: Vec<&str> = line.split_whitespace().collect();
        match words.as_slice() {
            ["add", name, quantity, unit] => Ok(ReviewCommand::Add(Ingredient::new(
                normalize_name(name),
                *quantity,
                parse_unit(unit),
            ))),
            ["replace", old, new, quantity, unit] => Ok(ReviewCommand::Replace {
                old: normalize_name(old),
                new: Ingredient::new(normalize_name(new), *quantity, parse_unit(unit)),
            }),
            ["remove", name] => Ok(ReviewCommand::Remove(normalize_name(name))),
            ["save"] => Ok(ReviewCommand::Save),
            ["discard"] => Ok(ReviewCommand::Discard),
            [] => bail!("Empty command"),
            [command, ..] => bail!("Unknown or incomplete command: {}", command),
        }
    }
}

pub const COMMAND_HELP: &str = "Commands:
\tadd ingredient quantity unit: Adds an ingredient to the cocktail.
\treplace ingredient new-ingredient quantity unit: Replaces an ingredient in the cocktail.
\tremove ingredient: Removes an ingredient from the cocktail.
\tsave: Saves the edited cocktail to the case base.
\tdiscard: Drops the cocktail without saving it.";

/// Missing and contained-undesired ingredients of `case`, one line each
pub fn constraint_report(case: &Case, query: &Query) -> String {
    let mut lines = Vec::new();
    let missing = query.missing(case);
    let extra = query.extra(case);
    if !missing.is_empty() {
        lines.push(format!(
            "These desired ingredients are missing: {}",
            missing.into_iter().collect::<Vec<_>>().join(", ")
        ));
    }
    if !extra.is_empty() {
        lines.push(format!(
            "These undesired ingredients are contained: {}",
            extra.into_iter().collect::<Vec<_>>().join(", ")
        ));
    }
    lines.join("\n")
}

/// Asks the expert whether the cocktail is good and lets them fix it if not
pub struct InteractiveReviewer<P: Prompt> {
    prompt: P,
}

impl<P: Prompt> InteractiveReviewer<P> {
    pub fn new(prompt: P) -> Self {
        Self { prompt }
    }

    pub fn into_prompt(self) -> P {
        self.prompt
    }

    /// `Some(true)` for y, `Some(false)` for n, `None` if input closed
    fn ask_yes_no(&mut self, question: &str) -> Result<Option<bool>> {
        loop {
            let Some(answer) = self.prompt.read_line(&format!("{} (y/n) ", question))? else {
                return Ok(None);
            };
            match answer.trim() {
                "y" => return Ok(Some(true)),
                "n" => return Ok(Some(false)),
                _ => {}
            }
        }
    }

    /// Apply one command, reporting anything that cannot be done
    fn apply(&mut self, command: ReviewCommand, case: &mut Case, categories: &CategoryIndex) {
        match command {
            ReviewCommand::Add(ingredient) => {
                if categories.contains(&ingredient.name) {
                    case.add_ingredient(ingredient);
                } else {
                    self.prompt.say(&format!("The ingredient {} does not exist.", ingredient.name));
                }
            }
            ReviewCommand::Replace { old, new } => {
                if !case.contains(&old) {
                    self.prompt.say(&format!("The cocktail does not contain the ingredient {}", old));
                } else if !categories.contains(&new.name) {
                    self.prompt.say(&format!("The ingredient {} does not exist.", new.name));
                } else {
                    case.replace_ingredient_with(&old, new);
                }
            }
            ReviewCommand::Remove(name) => {
                if !case.remove_ingredient(&name) {
                    self.prompt.say(&format!("The cocktail does not contain the ingredient {}", name));
                }
            }
            ReviewCommand::Save | ReviewCommand::Discard => {}
        }
    }

    /// Editing session; `None` means the expert discarded the cocktail
    fn edit(&mut self, mut case: Case, query: &Query, categories: &CategoryIndex) -> Result<Option<Case>> {
        self.prompt.say("Manual improvement of the cocktail by an expert.");
        self.prompt.say("You can edit the cocktail with the following commands, but make sure that it satisfies the constraints");
        self.prompt.say(&format!("\tdesired ingredients: {}", join(&query.desired)));
        self.prompt.say(&format!("\tundesired ingredients: {}", join(&query.undesired)));
        self.prompt.say(COMMAND_HELP);

        loop {
            let Some(line) = self.prompt.read_line("> ")? else {
                return Ok(None);
            };
            if line.trim().is_empty() {
                continue;
            }
            let command = match ReviewCommand::parse(&line) {
                Ok(command) => command,
                Err(e) => {
                    self.prompt.say(&e.to_string());
                    continue;
                }
            };
            match command {
                ReviewCommand::Discard => return Ok(None),
                ReviewCommand::Save => {
                    self.prompt.say(&format!("Current cocktail:\n{}", case));
                    if query.is_satisfied_by(&case) {
                        return Ok(Some(case));
                    }
                    self.prompt.say(&constraint_report(&case, query));
                    self.prompt.say("Please adapt the cocktail so it contains all desired ingredients and no undesired ones.");
                    self.prompt.say(COMMAND_HELP);
                }
                command => self.apply(command, &mut case, categories),
            }
        }
    }
}

impl<P: Prompt> Reviewer for InteractiveReviewer<P> {
    fn review(
        &mut self,
        result: &AdaptationResult,
        query: &Query,
        categories: &CategoryIndex,
    ) -> Result<ReviewOutcome> {
        if let Some(first) = result.trace.first() {
            self.prompt.say(&format!("Retrieved cocktail:\n{}", first.before));
        }
        for entry in &result.trace {
            self.prompt.say(&entry.to_string());
        }
        self.prompt.say(&format!("Adapted cocktail:\n{}", result.case));

        let mut case = match self.ask_yes_no("Is this a good cocktail?")? {
            None => return Ok(ReviewOutcome::Rejected),
            Some(true) => result.case.clone(),
            Some(false) => match self.edit(result.case.clone(), query, categories)? {
                Some(case) => case,
                None => {
                    info!("Expert discarded the adapted cocktail");
                    return Ok(ReviewOutcome::Rejected);
                }
            },
        };

        if self.ask_yes_no("Would you like to rename the cocktail?")? == Some(true) {
            if let Some(title) = self.prompt.read_line("Please enter the new title of the cocktail: ")? {
                let title = title.trim();
                if !title.is_empty() {
                    case.title = title.to_string();
                }
            }
        }

        Ok(ReviewOutcome::Approved(case))
    }
}

fn join(names: &std::collections::BTreeSet<String>) -> String {
    names.iter().cloned().collect::<Vec<_>>().join(", ")
}
