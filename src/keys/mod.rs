// (c) 2024 Ross Younger
//! # Key file resolution
//!
//! Works out which key files each configuration section applies to, and merges
//! the applicable sections into one set of settings per key.

use std::{collections::HashMap, path::PathBuf};

use crate::{config::Section, diagnostic::Diagnostic};

mod merge;
pub use merge::Merger;

mod paths;
pub use paths::{normalize, specificity, KeyStore};

/// One key file and the sections whose patterns matched it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchGroup {
    /// Canonical path to the key file
    pub key: PathBuf,
    /// Indices of the matching sections, in file order
    pub sections: Vec<usize>,
}

/// Resolves every section against the key store.
///
/// Returns one group per distinct key file, in order of first match.
/// This order is stable between runs given the same inputs.
pub fn match_sections(
    store: &KeyStore,
    sections: &[Section],
    diagnostics: &mut Vec<Diagnostic>,
) -> Vec<MatchGroup> {
    let mut groups: Vec<MatchGroup> = Vec::new();
    let mut index: HashMap<PathBuf, usize> = HashMap::new();

    for (section_index, section) in sections.iter().enumerate() {
        for key in store.resolve(&section.name, diagnostics) {
            if let Some(&g) = index.get(&key) {
                let group = &mut groups[g];
                // a section can reach the same file twice, e.g. via a symlink
                if group.sections.last() != Some(&section_index) {
                    group.sections.push(section_index);
                }
            } else {
                let _ = index.insert(key.clone(), groups.len());
                groups.push(MatchGroup {
                    key,
                    sections: vec![section_index],
                });
            }
        }
    }
    groups
}
