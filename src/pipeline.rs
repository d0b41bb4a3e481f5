//! The whole run, from repository to `authorized_keys`
// (c) 2024 Ross Younger

use std::path::Path;

use anyhow::Result;
use tracing::{debug, debug_span, info};

use crate::{
    config::{Configuration, RunConfig},
    diagnostic::{Diagnostic, Tally},
    keys::{match_sections, KeyStore, MatchGroup, Merger},
    options::synthesize,
    sync::synchronize,
};

/// What a run produced
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Generated {
    /// Output lines, one per key, without newlines
    pub lines: Vec<String>,
    /// Diagnostics reported along the way
    pub tally: Tally,
}

/// Reads the key material from a key file.
///
/// Only the first non-blank line is used; a key file holding several keys would otherwise
/// produce lines without any options.
fn read_key(path: &Path, diagnostics: &mut Vec<Diagnostic>) -> Option<String> {
    let contents = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            diagnostics.push(Diagnostic::UnreadableKey {
                path: path.to_owned(),
                reason: e.to_string(),
            });
            return None;
        }
    };
    let mut lines = contents.trim().lines().filter(|l| !l.trim().is_empty());
    let Some(first) = lines.next() else {
        diagnostics.push(Diagnostic::EmptyKey {
            path: path.to_owned(),
        });
        return None;
    };
    if lines.next().is_some() {
        diagnostics.push(Diagnostic::MultiLineKey {
            path: path.to_owned(),
        });
    }
    Some(first.trim().to_owned())
}

fn generate_one(
    config: &RunConfig,
    merger: &Merger<'_>,
    group: &MatchGroup,
    diagnostics: &mut Vec<Diagnostic>,
) -> Option<String> {
    let key = read_key(&group.key, diagnostics)?;
    let settings = merger.merge(group);
    debug!("merged config {settings:?}");
    let options = synthesize(&settings, &config.allowed, diagnostics);
    Some(options.render(&key))
}

/// Builds the output lines for an already-loaded configuration.
///
/// Never fails; every problem is per-pattern or per-key and is reported as it is found.
#[must_use]
pub fn generate(config: &RunConfig, configuration: &Configuration, store: &KeyStore) -> Generated {
    let mut tally = Tally::default();
    let mut diagnostics = Vec::new();

    let groups = match_sections(store, &configuration.sections, &mut diagnostics);
    tally.drain(&mut diagnostics);

    // command-line defaults sit beneath the file's [DEFAULT] section
    let mut defaults = config.defaults.clone();
    defaults.extend(
        configuration
            .defaults
            .iter()
            .map(|(k, v)| (k.clone(), v.clone())),
    );
    let merger = Merger::new(&configuration.sections, &defaults, &config.forced);

    let mut lines = Vec::with_capacity(groups.len());
    for group in &groups {
        let _span = debug_span!("key", path = %group.key.display()).entered();
        if let Some(line) = generate_one(config, &merger, group, &mut diagnostics) {
            lines.push(line);
        }
        tally.drain(&mut diagnostics);
    }
    Generated { lines, tally }
}

/// Summary of a completed run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
    /// Number of keys written
    pub keys: usize,
    /// Diagnostics reported
    pub tally: Tally,
}

/// Performs a complete run: synchronize, read, generate, write.
///
/// Errors returned from here are fatal to the run; nothing has been written.
pub fn run(config: &RunConfig) -> Result<Summary> {
    synchronize(&config.repository, config.sync)?;
    let configuration = Configuration::read(config.config_path())?;
    let store = KeyStore::open(config.key_store_path())?;

    let generated = generate(config, &configuration, &store);
    config.output.write_lines(&generated.lines)?;

    let summary = Summary {
        keys: generated.lines.len(),
        tally: generated.tally,
    };
    info!(
        "wrote {} keys to {} ({} warnings, {} errors)",
        summary.keys, config.output, summary.tally.warnings, summary.tally.errors
    );
    Ok(summary)
}
