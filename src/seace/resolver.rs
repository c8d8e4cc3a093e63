//! Maps caller filter values onto the labels the search widgets display.
//!
//! Callers send whatever casing their source data uses (`"LIMA"`, `"OBRA"`),
//! while SEACE renders title-cased, accented labels (`"Lima"`, `"Obra"`,
//! `"Consultoría de Obra"`). Matching therefore happens on a folded key:
//! lowercase, accents stripped, whitespace collapsed.

use tracing::debug;
use unicode_normalization::UnicodeNormalization;

use crate::seace::models::{Criterion, FilterCriteria, ResolvedOption};
use crate::utils::collapse_whitespace;

/// Fold a label for comparison.
///
/// Pipeline: NFD decompose -> strip combining marks -> lowercase ->
/// collapse whitespace.
pub fn fold_label(s: &str) -> String {
    let stripped: String = s
        .nfd()
        .filter(|c| !unicode_normalization::char::is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .collect();
    collapse_whitespace(&stripped)
}

/// Title-case a caller value the way SEACE labels its options.
fn display_label(criterion: Criterion, raw: &str) -> String {
    let raw = collapse_whitespace(raw);
    if criterion == Criterion::Year {
        return raw;
    }
    raw.split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

/// Produce one [`ResolvedOption`] per non-blank criterion.
///
/// Never fails. The concrete on-screen option is chosen later with
/// [`pick_option`], once the dropdown's items are visible.
pub fn resolve(criteria: &FilterCriteria) -> Vec<ResolvedOption> {
    Criterion::ALL
        .iter()
        .filter_map(|&criterion| {
            let raw = criteria.value(criterion).trim();
            if raw.is_empty() {
                debug!(%criterion, "no value supplied, leaving filter at default");
                return None;
            }
            Some(ResolvedOption {
                criterion,
                raw_value: raw.to_owned(),
                ui_label: display_label(criterion, raw),
                ui_identifier: None,
            })
        })
        .collect()
}

/// Choose the single on-screen option matching `wanted`.
///
/// An option whose folded text equals the folded caller value wins. Failing
/// that, options containing the value as a substring are considered and the
/// shortest (closest) one is taken. Returns the option's text as displayed.
pub fn pick_option<'a>(options: &'a [String], wanted: &ResolvedOption) -> Option<&'a str> {
    let key = fold_label(&wanted.raw_value);
    if key.is_empty() {
        return None;
    }

    let folded: Vec<String> = options.iter().map(|o| fold_label(o)).collect();

    if let Some(idx) = folded.iter().position(|f| *f == key) {
        return Some(options[idx].as_str());
    }

    folded
        .iter()
        .enumerate()
        .filter(|(_, f)| f.contains(&key))
        .min_by_key(|(_, f)| f.len())
        .map(|(idx, _)| options[idx].as_str())
}
