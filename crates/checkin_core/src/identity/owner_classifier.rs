//! Owner-contact classification.
//!
//! # Responsibility
//! - Detect company-owned lots from legal-form keywords.
//! - Recover individual co-owner names from free-form contact strings.
//!
//! # Invariants
//! - `classify` is deterministic and side-effect free.
//! - `Unknown` means "no directory row for this lot"; a row with no usable
//!   names yields `Individuals` with an empty set.

use crate::model::owner::OwnerContactInfo;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeSet;

static SALUTATION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:mr|mrs|ms|miss|dr)\.?(?:\s+|$)").expect("valid salutation regex")
});
static COMPANY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:P/L|PTY LTD|LIMITED|INVESTMENTS|MANAGEMENT|SUPERANNUATION FUND)\b")
        .expect("valid company regex")
});
// Salutation with any number of initials, or at least one initial without
// one; either form may end in a surname.
static INITIALS_NAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^(?:(?:mr|mrs|ms|miss|dr)\.?(?:\s+|$)(?:[a-z](?:\.\s*|\s+|$))*|(?:[a-z](?:\.\s*|\s+|$))+)(?:[a-z][a-z'\-]*)?\s*$",
    )
    .expect("valid initials regex")
});
static CO_OWNER_SPLIT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\s*&\s*|\s+and\s+").expect("valid co-owner split regex"));

/// Selectable identity recovered for one lot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OwnerIdentity {
    /// Company-owned lot; a representative attends on its behalf.
    Company { name: String },
    /// Individual owners; may be empty when no names could be parsed.
    Individuals { names: BTreeSet<String> },
    /// No directory row exists for the lot.
    Unknown,
}

impl OwnerIdentity {
    /// Returns whether an individuals result carries no names.
    pub fn has_no_names(&self) -> bool {
        matches!(self, Self::Individuals { names } if names.is_empty())
    }
}

/// Classifies a lot's owner contact, or `Unknown` when the lot has no row.
pub fn classify(contact: Option<&OwnerContactInfo>) -> OwnerIdentity {
    match contact {
        Some(contact) => classify_contact(contact),
        None => OwnerIdentity::Unknown,
    }
}

/// Classifies one directory row.
///
/// Rules, in order:
/// - Company keywords in either field win; with both matching, the longer
///   string is kept as the more complete name.
/// - The main contact is the primary source unless it is only a salutation
///   and initials (plus optional surname) and a title name exists.
/// - The primary source is split on `&` / `and` into co-owner names; the
///   title name is the fallback when nothing was recovered.
pub fn classify_contact(contact: &OwnerContactInfo) -> OwnerIdentity {
    let main_contact = non_blank(contact.main_contact_raw.as_deref());
    let title_name = non_blank(contact.title_name_raw.as_deref());

    if let Some(name) = pick_company_name(main_contact, title_name) {
        return OwnerIdentity::Company {
            name: name.to_string(),
        };
    }

    let primary = match (main_contact, title_name) {
        (Some(main), Some(title)) if is_initials_abbreviation(main) => Some(title),
        (Some(main), _) => Some(main),
        (None, title) => title,
    };

    let mut names = primary.map(split_co_owners).unwrap_or_default();
    if names.is_empty() {
        if let Some(title) = title_name {
            names = split_co_owners(title);
        }
    }

    OwnerIdentity::Individuals { names }
}

/// Removes one leading salutation (`Mr`, `Mrs`, `Ms`, `Miss`, `Dr`); a bare
/// salutation strips to an empty string.
pub fn strip_salutation(name: &str) -> String {
    let trimmed = name.trim();
    SALUTATION_RE.replace(trimmed, "").trim().to_string()
}

/// Returns whether the value contains a company legal-form keyword.
pub fn is_company_name(value: &str) -> bool {
    COMPANY_RE.is_match(value)
}

/// Returns whether the value is a salutation and/or initials with at most a
/// surname.
pub fn is_initials_abbreviation(value: &str) -> bool {
    INITIALS_NAME_RE.is_match(value.trim())
}

fn pick_company_name<'a>(main: Option<&'a str>, title: Option<&'a str>) -> Option<&'a str> {
    let main_is_company = main.filter(|value| is_company_name(value));
    let title_is_company = title.filter(|value| is_company_name(value));
    match (main_is_company, title_is_company) {
        (Some(main), Some(title)) if title.chars().count() > main.chars().count() => Some(title),
        (Some(main), _) => Some(main),
        (None, title) => title,
    }
}

fn split_co_owners(value: &str) -> BTreeSet<String> {
    CO_OWNER_SPLIT_RE
        .split(value)
        .map(strip_salutation)
        .filter(|name| !name.is_empty())
        .collect()
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::{is_initials_abbreviation, strip_salutation};

    #[test]
    fn strip_salutation_handles_dots_and_case() {
        assert_eq!(strip_salutation("Mr. John Smith"), "John Smith");
        assert_eq!(strip_salutation("MRS Jane Doe"), "Jane Doe");
        assert_eq!(strip_salutation("Dr Who"), "Who");
        assert_eq!(strip_salutation("Mrsmith"), "Mrsmith");
        assert_eq!(strip_salutation("  Miss  "), "");
        assert_eq!(strip_salutation("Mr."), "");
    }

    #[test]
    fn initials_detection_requires_separated_initials() {
        assert!(is_initials_abbreviation("Mr J S Mackenzie"));
        assert!(is_initials_abbreviation("MR J.S. MACKENZIE"));
        assert!(is_initials_abbreviation("J Smith"));
        assert!(is_initials_abbreviation("Ms K"));
        assert!(is_initials_abbreviation("Mr"));
        assert!(is_initials_abbreviation("Dr. Smith"));
        assert!(!is_initials_abbreviation("John Smith"));
        assert!(!is_initials_abbreviation("MACKENZIE"));
        assert!(!is_initials_abbreviation("J Smith & K Smith"));
    }
}
