//! Repository synchronization
// (c) 2024 Ross Younger

use std::{
    path::Path,
    process::{Command, Stdio},
};

use anyhow::{Context, Result};
use tracing::{debug, warn};

/// Whether (and how hard) to update the repository before reading it
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, strum::Display, clap::ValueEnum,
)]
#[strum(serialize_all = "lowercase")]
pub enum SyncMode {
    /// Use the repository as it is
    Skip,
    /// Run `git pull`; carry on with the current contents if it fails
    #[default]
    Try,
    /// Run `git pull`; abort if it fails
    Require,
}

/// Runs a command in the repository, discarding its output
fn run_quietly(repository: &Path, program: &str, args: &[&str]) -> Result<()> {
    let status = Command::new(program)
        .args(args)
        .current_dir(repository)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .with_context(|| format!("failed to execute {program}"))?;
    anyhow::ensure!(status.success(), "{program} {} {status}", args.join(" "));
    Ok(())
}

fn synchronize_with(repository: &Path, mode: SyncMode, program: &str) -> Result<()> {
    if mode == SyncMode::Skip {
        debug!("repository synchronization skipped");
        return Ok(());
    }
    debug!("updating {repository:?}");
    match (run_quietly(repository, program, &["pull"]), mode) {
        (Ok(()), _) => Ok(()),
        (Err(e), SyncMode::Require) => {
            Err(e).with_context(|| format!("updating repository {repository:?}"))
        }
        (Err(e), _) => {
            warn!("could not update repository {repository:?}: {e}; using it as it is");
            Ok(())
        }
    }
}

/// Brings the repository up to date with `git pull`, according to `mode`
pub fn synchronize(repository: &Path, mode: SyncMode) -> Result<()> {
    synchronize_with(repository, mode, "git")
}
