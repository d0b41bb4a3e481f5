//! Writing the generated file
// (c) 2024 Ross Younger

use std::{
    convert::Infallible,
    fmt::Display,
    io::Write as _,
    path::{Path, PathBuf},
    str::FromStr,
};

use anyhow::{Context, Result};
use tempfile::NamedTempFile;
use tracing::debug;

/// Where the generated lines go
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Output {
    /// Standard output
    #[default]
    Stdout,
    /// Atomically replace this file
    File(PathBuf),
}

impl FromStr for Output {
    type Err = Infallible;

    /// `-` means standard output; anything else is a file name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(if s == "-" {
            Output::Stdout
        } else {
            Output::File(PathBuf::from(s))
        })
    }
}

impl Display for Output {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Output::Stdout => f.write_str("-"),
            Output::File(p) => write!(f, "{}", p.display()),
        }
    }
}

/// Joins lines into file contents, each line newline-terminated
#[must_use]
pub fn render(lines: &[String]) -> String {
    let mut out = String::with_capacity(lines.iter().map(|l| l.len() + 1).sum());
    for line in lines {
        out.push_str(line);
        out.push('\n');
    }
    out
}

impl Output {
    /// Writes the lines to their destination
    pub fn write_lines(&self, lines: &[String]) -> Result<()> {
        let contents = render(lines);
        match self {
            Output::Stdout => {
                let mut stdout = std::io::stdout().lock();
                stdout
                    .write_all(contents.as_bytes())
                    .and_then(|()| stdout.flush())
                    .context("writing to stdout")
            }
            Output::File(path) => replace_file(path, contents.as_bytes()),
        }
    }
}

/// Replaces `path` with `data`, such that readers only ever see the old or the new contents.
///
/// The data is staged in a temporary file in the same directory (so the final rename
/// cannot cross filesystems), readable by the owner only.
fn replace_file(path: &Path, data: &[u8]) -> Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut staging = NamedTempFile::new_in(parent)
        .with_context(|| format!("creating temporary file in {parent:?}"))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt as _;
        std::fs::set_permissions(staging.path(), std::fs::Permissions::from_mode(0o600))
            .context("setting permissions on temporary file")?;
    }

    staging
        .write_all(data)
        .context("writing temporary file")?;
    staging
        .as_file()
        .sync_all()
        .context("syncing temporary file to disk")?;
    debug!("staged {} bytes in {:?}", data.len(), staging.path());

    let _ = staging
        .persist(path)
        .with_context(|| format!("replacing {path:?}"))?;
    Ok(())
}
