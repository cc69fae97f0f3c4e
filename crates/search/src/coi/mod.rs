//! Conflict-of-interest detection
//!
//! Runs only on the final ranked reviewers. Every rule is evaluated
//! independently, so one candidate may carry several flags.

use reviewer_finder_common::models::{AuthorRecord, CoiFlag, CoiType, ManuscriptQuery, Severity};
use std::collections::HashSet;

/// Shortest last name that may raise a last-name flag
pub const MIN_LAST_NAME_LEN: usize = 3;

/// Manuscript-side facts the detector compares candidates against
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConflictContext {
    /// Declared author names, trimmed and lower-cased
    pub names: Vec<String>,
    /// Declared institutions, trimmed and lower-cased
    pub institutions: Vec<String>,
    /// Store ids of the declared authors
    pub author_ids: HashSet<String>,
    /// Union of the declared authors' co-author ids
    pub co_author_ids: HashSet<String>,
}

fn normalize(value: &str) -> String {
    value.trim().to_lowercase()
}

impl ConflictContext {
    pub fn new<N, I>(names: N, institutions: I) -> Self
    where
        N: IntoIterator,
        N::Item: AsRef<str>,
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let mut context = Self::default();
        for name in names {
            let name = normalize(name.as_ref());
            if !name.is_empty() && !context.names.contains(&name) {
                context.names.push(name);
            }
        }
        for institution in institutions {
            let institution = normalize(institution.as_ref());
            if !institution.is_empty() && !context.institutions.contains(&institution) {
                context.institutions.push(institution);
            }
        }
        context
    }

    /// Names and institutions declared on the manuscript
    pub fn from_query(query: &ManuscriptQuery) -> Self {
        let mut context = Self::new(&query.author_names, &query.author_institutions);
        context
            .author_ids
            .extend(query.author_ids.iter().filter(|id| !id.is_empty()).cloned());
        context
    }

    /// Add a store record known to be one of the declared authors
    pub fn add_declared_author(&mut self, record: &AuthorRecord) {
        self.author_ids.insert(record.id.clone());
        self.co_author_ids.extend(record.co_author_ids.iter().cloned());
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
            && self.institutions.is_empty()
            && self.author_ids.is_empty()
            && self.co_author_ids.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CoiDetector;

impl CoiDetector {
    pub fn new() -> Self {
        Self
    }

    /// Flags raised by `candidate`; empty when nothing fires
    pub fn detect(&self, candidate: &AuthorRecord, context: &ConflictContext) -> Vec<CoiFlag> {
        let mut flags = Vec::new();

        if let Some(flag) = co_authorship(candidate, context) {
            flags.push(flag);
        }
        if let Some(flag) = same_institution(candidate, context) {
            flags.push(flag);
        }
        flags.extend(name_matches(candidate, context));

        flags
    }
}

/// Checked in both directions since stored co-author lists may be one-sided
fn co_authorship(candidate: &AuthorRecord, context: &ConflictContext) -> Option<CoiFlag> {
    if context.co_author_ids.contains(&candidate.id) {
        return Some(CoiFlag {
            coi_type: CoiType::CoAuthorship,
            severity: Severity::High,
            explanation: "Listed as a co-author of a manuscript author".to_string(),
        });
    }

    let mut shared: Vec<&str> = candidate
        .co_author_ids
        .iter()
        .filter(|id| context.author_ids.contains(*id))
        .map(String::as_str)
        .collect();
    if shared.is_empty() {
        return None;
    }
    shared.sort_unstable();
    shared.dedup();

    Some(CoiFlag {
        coi_type: CoiType::CoAuthorship,
        severity: Severity::High,
        explanation: format!("Has co-authored with manuscript author (ID: {})", shared.join(", ")),
    })
}

/// Substring containment either way; at most one flag
fn same_institution(candidate: &AuthorRecord, context: &ConflictContext) -> Option<CoiFlag> {
    let institution = normalize(&candidate.institution);
    if institution.is_empty() {
        return None;
    }

    context
        .institutions
        .iter()
        .find(|declared| declared.contains(&institution) || institution.contains(declared.as_str()))
        .map(|_| CoiFlag {
            coi_type: CoiType::SameInstitution,
            severity: Severity::Medium,
            explanation: format!("Same institution: {}", candidate.institution.trim()),
        })
}

/// One flag per declared name: exact match, or else a last-name match
fn name_matches(candidate: &AuthorRecord, context: &ConflictContext) -> Vec<CoiFlag> {
    let name = normalize(&candidate.name);
    let Some(last) = candidate.last_name().map(str::to_lowercase) else {
        return Vec::new();
    };

    let mut flags = Vec::new();
    for declared in &context.names {
        if *declared == name {
            flags.push(CoiFlag {
                coi_type: CoiType::ExactNameMatch,
                severity: Severity::Critical,
                explanation: format!("Candidate name matches manuscript author: {}", declared),
            });
        } else if last.chars().count() >= MIN_LAST_NAME_LEN
            && declared.split_whitespace().last() == Some(last.as_str())
        {
            flags.push(CoiFlag {
                coi_type: CoiType::LastNameMatch,
                severity: Severity::Low,
                explanation: format!("Shares last name with manuscript author: {}", declared),
            });
        }
    }
    flags
}
