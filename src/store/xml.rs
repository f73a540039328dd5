//! XML formats for case bases and category files
//!
//! Three layouts are understood:
//!
//! - official case base: `<recipes><recipe><title>..</title><ingredients><ingredient food quantity unit>..`
//! - local case base: `<cocktails><cocktail title><ingredient food quantity unit/>..`
//! - categories: `<ingredients><ingredient food category/>..`

use anyhow::{Context, Result};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};
use quick_xml::reader::Reader;
use quick_xml::writer::Writer;
use std::path::Path;

use crate::types::{Case, Ingredient};

fn read_file(path: &Path) -> Result<String> {
    std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    std::fs::write(path, contents)
        .with_context(|| format!("Failed to write {}", path.display()))
}

/// Value of attribute `name`, unescaped
fn attribute(element: &BytesStart<'_>, name: &str) -> Result<Option<String>> {
    match element.try_get_attribute(name)? {
        Some(attr) => Ok(Some(attr.unescape_value()?.into_owned())),
        None => Ok(None),
    }
}

fn required_attribute(element: &BytesStart<'_>, name: &str) -> Result<String> {
    let tag = String::from_utf8_lossy(element.name().as_ref()).into_owned();
    attribute(element, name)?
        .with_context(|| format!("<{}> is missing the '{}' attribute", tag, name))
}

fn ingredient_from(element: &BytesStart<'_>) -> Result<Ingredient> {
    Ok(Ingredient {
        name: required_attribute(element, "food")?,
        quantity: attribute(element, "quantity")?.unwrap_or_default(),
        unit: attribute(element, "unit")?.unwrap_or_default(),
    })
}

/// Parse the case base provided with the challenge. Food names are lowercased.
pub fn parse_official_case_base(xml: &str) -> Result<Vec<Case>> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut cases = Vec::new();
    let mut title = String::new();
    let mut ingredients = Vec::new();
    let mut in_title = false;
    let mut in_ingredients = false;

    loop {
        match reader.read_event().context("Malformed official case base")? {
            Event::Start(e) => match e.name().as_ref() {
                b"recipe" => {
                    title.clear();
                    ingredients.clear();
                }
                b"title" => in_title = true,
                b"ingredients" => in_ingredients = true,
                b"ingredient" if in_ingredients => {
                    let mut ingredient = ingredient_from(&e)?;
                    ingredient.name = ingredient.name.to_lowercase();
                    ingredients.push(ingredient);
                }
                _ => {}
            },
            Event::Empty(e) => {
                if in_ingredients && e.name().as_ref() == b"ingredient" {
                    let mut ingredient = ingredient_from(&e)?;
                    ingredient.name = ingredient.name.to_lowercase();
                    ingredients.push(ingredient);
                }
            }
            Event::Text(t) if in_title => title.push_str(&t.unescape()?),
            Event::CData(c) if in_title => title.push_str(&String::from_utf8_lossy(&c)),
            Event::End(e) => match e.name().as_ref() {
                b"title" => in_title = false,
                b"ingredients" => in_ingredients = false,
                b"recipe" => cases.push(Case::new(title.trim(), std::mem::take(&mut ingredients))),
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(cases)
}

/// Parse our own case base
pub fn parse_case_base(xml: &str) -> Result<Vec<Case>> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut cases = Vec::new();
    let mut current: Option<Case> = None;

    loop {
        match reader.read_event().context("Malformed case base")? {
            Event::Start(e) if e.name().as_ref() == b"cocktail" => {
                current = Some(Case::new(required_attribute(&e, "title")?, Vec::new()));
            }
            Event::Empty(e) if e.name().as_ref() == b"cocktail" => {
                cases.push(Case::new(required_attribute(&e, "title")?, Vec::new()));
            }
            Event::Start(e) | Event::Empty(e) if e.name().as_ref() == b"ingredient" => {
                if let Some(case) = current.as_mut() {
                    case.ingredients.push(ingredient_from(&e)?);
                }
            }
            Event::End(e) if e.name().as_ref() == b"cocktail" => {
                if let Some(case) = current.take() {
                    cases.push(case);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(cases)
}

/// Render a case base. `success` is not part of the format.
pub fn render_case_base(cases: &[Case]) -> Result<String> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    writer.write_event(Event::Start(BytesStart::new("cocktails")))?;

    for case in cases {
        let cocktail = BytesStart::new("cocktail").with_attributes([("title", case.title.as_str())]);
        if case.ingredients.is_empty() {
            writer.write_event(Event::Empty(cocktail))?;
            continue;
        }
        writer.write_event(Event::Start(cocktail))?;
        for ingredient in &case.ingredients {
            let element = BytesStart::new("ingredient").with_attributes([
                ("food", ingredient.name.as_str()),
                ("quantity", ingredient.quantity.as_str()),
                ("unit", ingredient.unit.as_str()),
            ]);
            writer.write_event(Event::Empty(element))?;
        }
        writer.write_event(Event::End(BytesEnd::new("cocktail")))?;
    }

    writer.write_event(Event::End(BytesEnd::new("cocktails")))?;
    String::from_utf8(writer.into_inner()).context("Case base is not valid UTF-8")
}

/// Parse a category file into (ingredient, category) pairs
pub fn parse_categories(xml: &str) -> Result<Vec<(String, String)>> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut pairs = Vec::new();
    loop {
        match reader.read_event().context("Malformed category file")? {
            Event::Start(e) | Event::Empty(e) if e.name().as_ref() == b"ingredient" => {
                pairs.push((
                    required_attribute(&e, "food")?,
                    required_attribute(&e, "category")?,
                ));
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(pairs)
}

/// Render ingredient names with empty categories, ready for curation
pub fn render_raw_categories<'n>(names: impl IntoIterator<Item = &'n String>) -> Result<String> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    writer.write_event(Event::Start(BytesStart::new("ingredients")))?;
    for name in names {
        let element = BytesStart::new("ingredient")
            .with_attributes([("food", name.as_str()), ("category", "")]);
        writer.write_event(Event::Empty(element))?;
    }
    writer.write_event(Event::End(BytesEnd::new("ingredients")))?;
    String::from_utf8(writer.into_inner()).context("Category file is not valid UTF-8")
}

pub fn read_official_case_base(path: &Path) -> Result<Vec<Case>> {
    parse_official_case_base(&read_file(path)?)
        .with_context(|| format!("Failed to load official case base {}", path.display()))
}

pub fn read_case_base(path: &Path) -> Result<Vec<Case>> {
    parse_case_base(&read_file(path)?)
        .with_context(|| format!("Failed to load case base {}", path.display()))
}

pub fn write_case_base(path: &Path, cases: &[Case]) -> Result<()> {
    write_file(path, &render_case_base(cases)?)
}

pub fn read_categories(path: &Path) -> Result<Vec<(String, String)>> {
    parse_categories(&read_file(path)?)
        .with_context(|| format!("Failed to load categories {}", path.display()))
}

pub fn write_raw_categories<'n>(path: &Path, names: impl IntoIterator<Item = &'n String>) -> Result<()> {
    write_file(path, &render_raw_categories(names)?)
}
