//! Groups a product's files by the categories their names match.
//!
//! Patterns are not mutually exclusive: a file such as `ISO_GMP_2023.pdf`
//! becomes a candidate for every category it matches.

use super::catalog::CategoryCatalog;
use super::tree::FileEntry;
use log::debug;
use std::path::PathBuf;
use std::time::SystemTime;

/// A file that matched one category's pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub path: PathBuf,
    pub modified_at: SystemTime,
}

/// Candidate lists indexed by catalog position.
///
/// Every category has a list, possibly empty; each list keeps file
/// enumeration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    candidates: Vec<Vec<Candidate>>,
}

impl Classification {
    /// Candidates of the category at `index`; empty for an unknown index.
    #[cfg(test)]
    pub fn candidates(&self, index: usize) -> &[Candidate] {
        self.candidates.get(index).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn into_lists(self) -> Vec<Vec<Candidate>> {
        self.candidates
    }
}

pub fn classify(catalog: &CategoryCatalog, files: &[FileEntry]) -> Classification {
    let mut candidates = vec![Vec::new(); catalog.len()];
    for file in files {
        for (index, category) in catalog.iter().enumerate() {
            if category.matches(&file.file_name) {
                debug!("{} -> {}", file.file_name, category.id());
                candidates[index].push(Candidate {
                    path: file.path.clone(),
                    modified_at: file.modified_at,
                });
            }
        }
    }
    Classification { candidates }
}
