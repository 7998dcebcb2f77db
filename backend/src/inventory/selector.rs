//! Picks the authoritative document per category: the most recently
//! modified candidate, with ties going to the first one enumerated.

use super::classifier::{Candidate, Classification};

/// Most recent candidate, or `None` for an empty list.
///
/// The scan only replaces the current best on a strictly newer timestamp, so
/// among equal timestamps the earliest entry wins.
pub fn most_recent(candidates: &[Candidate]) -> Option<&Candidate> {
    let mut best: Option<&Candidate> = None;
    for candidate in candidates {
        match best {
            Some(current) if candidate.modified_at <= current.modified_at => {}
            _ => best = Some(candidate),
        }
    }
    best
}

/// Selections indexed by catalog position.
pub fn select(classification: Classification) -> Vec<Option<Candidate>> {
    classification
        .into_lists()
        .into_iter()
        .map(|list| most_recent(&list).cloned())
        .collect()
}
