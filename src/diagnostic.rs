//! Per-item problems found while resolving keys
// (c) 2024 Ross Younger

use std::path::PathBuf;

use crate::options::{Category, Direction, PortError};

/// How bad a [`Diagnostic`] is.
///
/// Neither severity stops the run; they only affect how the problem is logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum Severity {
    /// Something was skipped, but probably deliberately or harmlessly
    Warning,
    /// Something the configuration asked for could not be honoured
    Error,
}

/// A problem with a single pattern, rule or key.
///
/// The core functions collect these into a caller-supplied `Vec` instead of failing,
/// so that one bad key never prevents the others from being emitted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Diagnostic {
    /// A pattern resolved to a file outside the key store
    #[error("skip outside path {path:?} from {pattern}")]
    OutsideBase {
        /// The (normalized) pattern
        pattern: String,
        /// The canonical path it resolved to
        path: PathBuf,
    },
    /// A pattern did not match any key file
    #[error("pattern {pattern} does not match any key file")]
    Unmatched {
        /// The (normalized) pattern
        pattern: String,
    },
    /// A section name is not a valid glob pattern
    #[error("invalid pattern {pattern}: {reason}")]
    InvalidPattern {
        /// The (normalized) pattern
        pattern: String,
        /// What the glob parser said
        reason: String,
    },
    /// A port token in an `open` or `listen` rule could not be used
    #[error("invalid port `{token}` in {direction} rule: {reason}")]
    InvalidPort {
        /// Which kind of rule it was in
        direction: Direction,
        /// The offending token
        token: String,
        /// Why it was rejected
        reason: PortError,
    },
    /// `*:port` under `open`, which sshd cannot express
    #[error("wildcard hosts with port {port} not supported for open")]
    WildcardHostPort {
        /// The concrete port that was paired with the wildcard host
        port: String,
    },
    /// A single-line setting was given more than one line
    #[error("ignoring additional lines in {setting}")]
    ExtraLines {
        /// The setting concerned
        setting: Category,
    },
    /// An `expiry` value that is not a timestamp sshd understands
    #[error("invalid expiry format: {value}")]
    InvalidExpiry {
        /// The rejected value
        value: String,
    },
    /// The key file could not be read
    #[error("cannot read key file {path:?}: {reason}")]
    UnreadableKey {
        /// The key file
        path: PathBuf,
        /// The I/O error, rendered
        reason: String,
    },
    /// The key file contained no key material
    #[error("key file {path:?} is empty")]
    EmptyKey {
        /// The key file
        path: PathBuf,
    },
    /// The key file contained more than one non-blank line; only the first is used
    #[error("ignoring additional lines in key file {path:?}")]
    MultiLineKey {
        /// The key file
        path: PathBuf,
    },
}

impl Diagnostic {
    /// How seriously to log this diagnostic
    #[must_use]
    pub fn severity(&self) -> Severity {
        match self {
            Diagnostic::InvalidPort { .. } | Diagnostic::InvalidExpiry { .. } => Severity::Error,
            _ => Severity::Warning,
        }
    }

    /// Emits this diagnostic to the log at its severity
    pub fn report(&self) {
        match self.severity() {
            Severity::Warning => tracing::warn!("{self}"),
            Severity::Error => tracing::error!("{self}"),
        }
    }
}

/// Running totals of reported diagnostics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tally {
    /// Number of warnings reported
    pub warnings: usize,
    /// Number of errors reported
    pub errors: usize,
}

impl Tally {
    /// Reports every diagnostic in `diagnostics`, then empties it.
    pub fn drain(&mut self, diagnostics: &mut Vec<Diagnostic>) {
        for d in diagnostics.drain(..) {
            d.report();
            match d.severity() {
                Severity::Warning => self.warnings += 1,
                Severity::Error => self.errors += 1,
            }
        }
    }
}
