//! Parsing of DOM snapshots into profile data.
//!
//! The site's markup carries no semantic field names, so every block type is
//! described by an ordered table of [`FieldRule`]s. A layout change means editing
//! one table row.

use scraper::{ElementRef, Html, Selector as Css};
use std::collections::HashMap;

use super::models::{EducationEntry, ExperienceEntry, ProfileSummary};
use super::text;
use crate::error::AppError;

pub const EXPERIENCE_BLOCK: &str = r#"[data-field="experience_company_logo"]"#;
pub const EXPERIENCE_LOADED: &str = r#"section[id*="experience"] li"#;
pub const EDUCATION_ANCHOR: &str = "#education";
pub const RESULT_CARD: &str = "div.linked-area";

const OPEN_TO_WORK_MARKER: &str = "is open to work";

#[derive(Debug, Clone, Copy)]
enum Read {
    Text,
    Attr(&'static str),
}

/// Where one field of a block lives: the `nth` match of `selector` inside the
/// block (or the block itself when `selector` is empty), read as text or as an
/// attribute, then passed through `clean`.
struct FieldRule {
    field: &'static str,
    selector: &'static str,
    nth: usize,
    read: Read,
    clean: fn(&str) -> String,
}

const EXPERIENCE_FIELDS: &[FieldRule] = &[
    FieldRule { field: "title", selector: ".t-bold", nth: 0, read: Read::Text, clean: text::title },
    FieldRule { field: "company", selector: "span.t-14.t-normal", nth: 0, read: Read::Text, clean: text::before_separator },
    FieldRule { field: "duration", selector: "span.t-14.t-normal", nth: 1, read: Read::Text, clean: text::duration },
    FieldRule { field: "location", selector: "span.t-14.t-normal", nth: 2, read: Read::Text, clean: text::dedupe_words },
    FieldRule { field: "company_url", selector: "", nth: 0, read: Read::Attr("href"), clean: text::collapse_whitespace },
];

const EDUCATION_FIELDS: &[FieldRule] = &[
    FieldRule { field: "university", selector: r#"span[aria-hidden="true"]"#, nth: 0, read: Read::Text, clean: text::collapse_whitespace },
    FieldRule { field: "degree", selector: ".t-14.t-normal", nth: 0, read: Read::Text, clean: text::title },
    FieldRule { field: "duration", selector: ".t-black--light", nth: 0, read: Read::Text, clean: text::dedupe_words },
];

const CARD_FIELDS: &[FieldRule] = &[
    FieldRule { field: "profile_url", selector: r#"a[href*="linkedin.com/in/"]"#, nth: 0, read: Read::Attr("href"), clean: strip_query },
    FieldRule { field: "name", selector: "span[aria-hidden='true']", nth: 0, read: Read::Text, clean: text::collapse_whitespace },
    FieldRule { field: "image_url", selector: "img", nth: 0, read: Read::Attr("src"), clean: text::collapse_whitespace },
    FieldRule { field: "image_alt", selector: "img", nth: 0, read: Read::Attr("alt"), clean: text::collapse_whitespace },
    FieldRule { field: "description", selector: "div.t-14.t-black.t-normal", nth: 0, read: Read::Text, clean: text::collapse_whitespace },
    FieldRule { field: "location", selector: "div.t-14.t-normal", nth: 1, read: Read::Text, clean: text::collapse_whitespace },
    FieldRule { field: "skills", selector: "p.entity-result__summary--2-lines", nth: 0, read: Read::Text, clean: text::strip_skills_label },
];

fn strip_query(href: &str) -> String {
    let trimmed = href.trim();
    trimmed.split(['?', '#']).next().unwrap_or(trimmed).to_string()
}

fn css(selector: &str) -> Result<Css, AppError> {
    Css::parse(selector)
        .map_err(|e| AppError::ElementNotFound(format!("bad selector {}: {:?}", selector, e)))
}

/// Approximates `innerText`: the text nodes of `element`, space separated.
fn inner_text(element: ElementRef<'_>) -> String {
    element.text().collect::<Vec<_>>().join(" ")
}

/// Applies `rules` to one block. Fields whose element is absent are left out of
/// the map, which callers treat as empty.
fn read_fields(
    block: ElementRef<'_>,
    rules: &[FieldRule],
) -> Result<HashMap<&'static str, String>, AppError> {
    let mut fields = HashMap::new();
    for rule in rules {
        let target = if rule.selector.is_empty() {
            Some(block)
        } else {
            block.select(&css(rule.selector)?).nth(rule.nth)
        };
        let Some(target) = target else { continue };

        let raw = match rule.read {
            Read::Text => Some(inner_text(target)),
            Read::Attr(name) => target.value().attr(name).map(str::to_string),
        };
        if let Some(raw) = raw {
            fields.insert(rule.field, (rule.clean)(&raw));
        }
    }
    Ok(fields)
}

fn take(fields: &mut HashMap<&'static str, String>, name: &str) -> String {
    fields.remove(name).unwrap_or_default()
}

fn take_non_empty(fields: &mut HashMap<&'static str, String>, name: &str) -> Option<String> {
    fields.remove(name).filter(|value| !value.is_empty())
}

/// A loaded profile page.
pub struct ProfileDocument {
    html: Html,
}

impl ProfileDocument {
    pub fn parse(source: &str) -> Self {
        Self {
            html: Html::parse_document(source),
        }
    }

    /// Experience entries in page order. Blocks missing a title or company are skipped.
    pub fn experience(&self) -> Vec<ExperienceEntry> {
        let blocks = match css(EXPERIENCE_BLOCK) {
            Ok(selector) => self.html.select(&selector).collect::<Vec<_>>(),
            Err(e) => {
                tracing::warn!("Error during experience extraction: {}", e);
                return Vec::new();
            }
        };

        let mut entries = Vec::new();
        for (index, block) in blocks.into_iter().enumerate() {
            match read_fields(block, EXPERIENCE_FIELDS) {
                Ok(mut fields) => {
                    let entry = ExperienceEntry {
                        title: take(&mut fields, "title"),
                        company: take(&mut fields, "company"),
                        duration: take(&mut fields, "duration"),
                        location: take(&mut fields, "location"),
                        company_url: take(&mut fields, "company_url"),
                    };
                    if entry.is_complete() {
                        entries.push(entry);
                    } else {
                        tracing::debug!("Skipping experience block {} without title or company", index);
                    }
                }
                Err(e) => tracing::warn!("Failed to parse experience block {}: {}", index, e),
            }
        }
        entries
    }

    /// Education entries from the section holding the `#education` anchor.
    pub fn education(&self) -> Vec<EducationEntry> {
        let section = match self.education_section() {
            Ok(Some(section)) => section,
            Ok(None) => {
                tracing::debug!("No education section on page");
                return Vec::new();
            }
            Err(e) => {
                tracing::warn!("Error during education extraction: {}", e);
                return Vec::new();
            }
        };

        let items = match css("li") {
            Ok(selector) => section.select(&selector).collect::<Vec<_>>(),
            Err(e) => {
                tracing::warn!("Error during education extraction: {}", e);
                return Vec::new();
            }
        };

        let mut entries = Vec::new();
        for (index, item) in items.into_iter().enumerate() {
            match read_fields(item, EDUCATION_FIELDS) {
                Ok(mut fields) => {
                    let entry = EducationEntry {
                        university: take(&mut fields, "university"),
                        degree: take(&mut fields, "degree"),
                        duration: take(&mut fields, "duration"),
                    };
                    if entry.is_complete() {
                        entries.push(entry);
                    } else {
                        tracing::debug!("Skipping education block {} without school or degree", index);
                    }
                }
                Err(e) => tracing::warn!("Error parsing education block {}: {}", index, e),
            }
        }
        entries
    }

    /// The `<section>` enclosing the anchor, or failing that the first `<section>`
    /// among the anchor's following siblings.
    fn education_section(&self) -> Result<Option<ElementRef<'_>>, AppError> {
        let Some(anchor) = self.html.select(&css(EDUCATION_ANCHOR)?).next() else {
            return Ok(None);
        };

        let enclosing = anchor
            .ancestors()
            .filter_map(ElementRef::wrap)
            .find(|el| el.value().name() == "section");
        if enclosing.is_some() {
            return Ok(enclosing);
        }

        Ok(anchor
            .next_siblings()
            .filter_map(ElementRef::wrap)
            .find(|el| el.value().name() == "section"))
    }
}

/// One parsed result card, or the reason it was skipped.
pub type CardResult = Result<ProfileSummary, AppError>;

/// Parses every result card on a search listing snapshot.
pub fn parse_result_cards(source: &str) -> Result<Vec<CardResult>, AppError> {
    let html = Html::parse_document(source);
    let cards = html.select(&css(RESULT_CARD)?).map(parse_card).collect();
    Ok(cards)
}

fn parse_card(card: ElementRef<'_>) -> CardResult {
    let mut fields = read_fields(card, CARD_FIELDS)?;

    let profile_url = take_non_empty(&mut fields, "profile_url")
        .ok_or_else(|| AppError::ElementNotFound("result card without profile link".into()))?;

    let open_to_work = fields
        .get("image_alt")
        .map(|alt| alt.to_lowercase().contains(OPEN_TO_WORK_MARKER))
        .unwrap_or(false);

    Ok(ProfileSummary {
        name: take(&mut fields, "name"),
        profile_url,
        image_url: take_non_empty(&mut fields, "image_url"),
        open_to_work,
        description: take_non_empty(&mut fields, "description"),
        location: take_non_empty(&mut fields, "location"),
        skills: take_non_empty(&mut fields, "skills"),
    })
}
