// (c) 2024 Ross Younger
//! # Configuration management
//!
//! authkeygen works on a _repository_: a directory holding a `keys/` tree of public key files
//! and a configuration file describing what each key may do.
//!
//! ## File format
//!
//! The configuration file is INI-style. Each section name is a glob pattern, relative to `keys/`,
//! selecting the key files the section applies to. `?`, `*`, `[...]` and `**` (any number of
//! directories) are supported.
//!
//! ### Example
//!
//! ```text
//! [DEFAULT]
//! # Applies beneath every section
//! pty = no
//!
//! [**/*]
//! from = 192.0.2.0/24
//!
//! [ops/*]
//! pty = yes
//! agent = yes
//!
//! [ops/alice]
//! open = db1,db2:5432
//!        localhost:8000-8003
//! expiry = 20301231
//! ```
//!
//! ## Precedence
//!
//! When several sections match one key file, their settings are merged:
//! 1. `--force` values from the command line (always win)
//! 1. Matching sections, the most specific first
//! 1. The `[DEFAULT]` section
//! 1. `--default` values from the command line
//!
//! A section is more specific when its pattern has more literal (non-`?`, non-`*`) characters.
//! Equally specific sections later in the file win over earlier ones.
//!
//! For the settings themselves, see [`crate::options`].

use std::{collections::BTreeMap, path::PathBuf};

use crate::{options::AllowList, output::Output, sync::SyncMode};

mod errors;
pub use errors::{AssignmentError, IniError};

mod ini;
pub use ini::{Configuration, Section, DEFAULT_SECTION};

mod lines;

mod overlay;
pub use overlay::{overlay, Assignment};

/// Setting key → raw value
pub type Settings = BTreeMap<String, String>;

/// The directory within the repository that holds the key files
pub const KEY_STORE_DIR: &str = "keys";

/// Everything one run needs to know.
///
/// This is built once, at the command-line boundary, and is not modified afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    /// The repository directory
    pub repository: PathBuf,
    /// The configuration file, relative to the repository (unless absolute)
    pub config: PathBuf,
    /// Where to write the result
    pub output: Output,
    /// Whether to update the repository first
    pub sync: SyncMode,
    /// Which setting categories may produce options
    pub allowed: AllowList,
    /// Settings applied beneath everything else
    pub defaults: Settings,
    /// Settings applied over everything else
    pub forced: Settings,
}

impl RunConfig {
    /// A configuration with default behaviour for the given repository and config file
    #[must_use]
    pub fn new<P, Q>(repository: P, config: Q) -> Self
    where
        P: Into<PathBuf>,
        Q: Into<PathBuf>,
    {
        Self {
            repository: repository.into(),
            config: config.into(),
            output: Output::default(),
            sync: SyncMode::default(),
            allowed: AllowList::all(),
            defaults: Settings::new(),
            forced: Settings::new(),
        }
    }

    /// Full path to the configuration file
    #[must_use]
    pub fn config_path(&self) -> PathBuf {
        self.repository.join(&self.config)
    }

    /// Full path to the key store
    #[must_use]
    pub fn key_store_path(&self) -> PathBuf {
        self.repository.join(KEY_STORE_DIR)
    }
}

#[cfg(test)]
mod test {
    use std::path::Path;

    use super::RunConfig;

    #[test]
    fn paths() {
        let rc = RunConfig::new("/srv/keys-repo", "authkeys.ini");
        assert_eq!(rc.config_path(), Path::new("/srv/keys-repo/authkeys.ini"));
        assert_eq!(rc.key_store_path(), Path::new("/srv/keys-repo/keys"));
    }

    #[test]
    fn absolute_config_path() {
        let rc = RunConfig::new("/srv/keys-repo", "/etc/authkeys.ini");
        assert_eq!(rc.config_path(), Path::new("/etc/authkeys.ini"));
    }
}
