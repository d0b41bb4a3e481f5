//! Settings merge
// (c) 2024 Ross Younger

use super::{normalize, specificity, MatchGroup};
use crate::config::{Section, Settings};

/// Merges the sections matching a key into its effective settings.
///
/// The specificity of every section is computed once, up front; merging a key then only
/// orders section indices.
#[derive(Debug)]
pub struct Merger<'a> {
    sections: &'a [Section],
    specificity: Vec<usize>,
    defaults: &'a Settings,
    forced: &'a Settings,
}

impl<'a> Merger<'a> {
    /// Constructor
    ///
    /// * `sections`: all sections, in file order. [`MatchGroup`]s index into this.
    /// * `defaults`: applied first, so anything else overrides them
    /// * `forced`: applied last, overriding everything
    #[must_use]
    pub fn new(sections: &'a [Section], defaults: &'a Settings, forced: &'a Settings) -> Self {
        let specificity = sections
            .iter()
            .map(|s| specificity(&normalize(&s.name)))
            .collect();
        Self {
            sections,
            specificity,
            defaults,
            forced,
        }
    }

    /// The order in which a group's sections apply: least specific first,
    /// file order among equals.
    #[must_use]
    pub fn order(&self, group: &MatchGroup) -> Vec<usize> {
        let mut order = group.sections.clone();
        order.sort_by_key(|&i| (self.specificity[i], i));
        order
    }

    /// Computes the effective settings for one key
    #[must_use]
    pub fn merge(&self, group: &MatchGroup) -> Settings {
        let mut merged = self.defaults.clone();
        for i in self.order(group) {
            merged.extend(
                self.sections[i]
                    .settings
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone())),
            );
        }
        merged.extend(self.forced.iter().map(|(k, v)| (k.clone(), v.clone())));
        merged
    }
}
