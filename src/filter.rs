//! Rewrites abstract filter templates into concrete selections.
//!
//! The backend normally sends its own `selectionArgs`; the filter is then only a
//! matter of swapping field names for columns. When it does not, the clause-by-clause
//! fallback below guesses one argument per clause from the clause shape and the
//! user's original prompt. The fallback is best effort and may produce fewer
//! arguments than the selection has placeholders.

use chrono::{DateTime, Duration, Utc};
use lazy_static::lazy_static;
use regex::{Captures, Regex};
use tracing::debug;

use crate::catalog::FieldCatalog;
use crate::protocol::QueryParameters;
use crate::selection::resolve_selection_arg;
use crate::error::Result;

const CLAUSE_SEPARATOR: &str = " AND ";

lazy_static! {
    static ref IDENTIFIER: Regex = Regex::new(r"[A-Za-z_][A-Za-z0-9_]*").unwrap();
    static ref QUOTED: Regex = Regex::new(r#""([^"]+)""#).unwrap();
}

/// Selection string plus its positional arguments, consumed by a single query.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResolvedSelection {
    pub selection: String,
    pub arguments: Vec<String>,
}

/// Replaces every whole identifier naming a catalog field with its column.
pub fn translate_fields(template: &str, catalog: &FieldCatalog) -> String {
    IDENTIFIER
        .replace_all(template, |caps: &Captures| {
            let token = &caps[0];
            catalog.column(token).unwrap_or(token).to_string()
        })
        .into_owned()
}

pub fn translate_filter(
    parameters: &QueryParameters,
    catalog: &FieldCatalog,
    prompt: &str,
    now: DateTime<Utc>,
) -> Result<ResolvedSelection> {
    if parameters.selection_args.is_empty() {
        return Ok(infer_selection(&parameters.filter, catalog, prompt, now));
    }
    let arguments = parameters
        .selection_args
        .iter()
        .map(|token| resolve_selection_arg(token, now))
        .collect::<Result<Vec<_>>>()?;
    Ok(ResolvedSelection {
        selection: translate_fields(&parameters.filter, catalog),
        arguments,
    })
}

/// Fallback used when the backend sent no arguments.
pub fn infer_selection(filter: &str, catalog: &FieldCatalog, prompt: &str, now: DateTime<Utc>) -> ResolvedSelection {
    if filter.trim().is_empty() {
        return ResolvedSelection::default();
    }
    let clauses: Vec<String> = filter
        .split(CLAUSE_SEPARATOR)
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(|c| translate_fields(c, catalog))
        .collect();

    let mut arguments = Vec::new();
    for clause in &clauses {
        match infer_argument(&clause.to_lowercase(), prompt, now) {
            Some(arg) => arguments.push(arg),
            None => debug!(clause = %clause, "no argument inferred for clause"),
        }
    }
    ResolvedSelection { selection: clauses.join(CLAUSE_SEPARATOR), arguments }
}

fn infer_argument(clause: &str, prompt: &str, now: DateTime<Utc>) -> Option<String> {
    let mentions = |names: &[&str]| names.iter().any(|n| clause.contains(n));
    if clause.contains(" like ?") && mentions(&["title", "display_name"]) {
        Some(format!("%{}%", prompt_keyword(prompt)))
    } else if mentions(&["dtstart", "start_date"]) && clause.contains(">= ?") {
        Some(now.timestamp_millis().to_string())
    } else if mentions(&["dtend", "end_date"]) && clause.contains("<= ?") {
        Some((now + Duration::days(7)).timestamp_millis().to_string())
    } else {
        None
    }
}

/// First quoted phrase of the prompt, else its first word longer than two characters.
pub fn prompt_keyword(prompt: &str) -> &str {
    if let Some(caps) = QUOTED.captures(prompt) {
        if let Some(quoted) = caps.get(1) {
            return quoted.as_str();
        }
    }
    prompt
        .split_whitespace()
        .find(|word| word.chars().count() > 2)
        .unwrap_or("")
}
