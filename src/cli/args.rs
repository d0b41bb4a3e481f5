// authkeygen top-level command-line arguments
// (c) 2024 Ross Younger

use std::path::PathBuf;

use clap::Parser;

use crate::{
    config::{overlay, Assignment, RunConfig},
    options::{AllowList, Category},
    output::Output,
    sync::SyncMode,
};

#[derive(Debug, Parser, Clone)]
#[command(
    author,
    version(env!("AUTHKEYGEN_VERSION_STRING")),
    about,
    before_help = "e.g.   authkeygen -o ~/.ssh/authorized_keys /srv/keys-repo authkeys.ini",
    infer_long_args(true)
)]
#[command(help_template(
    "\
{name} version {version}
{about-with-newline}
{usage-heading} {usage}
{before-help}
{all-args}{after-help}
"
))]
#[command(styles=super::styles::CLAP_STYLES)]
pub(crate) struct CliArgs {
    /// Where to write the generated file.
    ///
    /// The file is replaced atomically, so sshd never sees a partial file.
    /// `-` means standard output.
    #[arg(short, long, default_value("-"), value_name("FILE"))]
    pub(crate) output: Output,

    /// Whether to `git pull` the repository before reading it
    #[arg(long, value_enum, default_value_t, value_name("MODE"))]
    pub(crate) sync: SyncMode,

    /// Restricts which settings may produce options [default: all]
    ///
    /// May be repeated, or given as a comma-separated list.
    /// `none` turns every setting off, leaving each key with only `restrict`.
    #[arg(
        short,
        long,
        value_enum,
        value_delimiter(','),
        value_name("CATEGORY"),
        help_heading("Settings")
    )]
    pub(crate) allow: Vec<Category>,

    /// Provides a default setting, beneath everything in the configuration file.
    ///
    /// Repeat a key to give a multi-line value, e.g. `-D open=80 -D open=443`.
    #[arg(
        short = 'D',
        long,
        value_name("KEY=VALUE"),
        help_heading("Settings")
    )]
    pub(crate) default: Vec<Assignment>,

    /// Forces a setting for every key, overriding the configuration file.
    ///
    /// Repeat a key to give a multi-line value.
    #[arg(short = 'F', long, value_name("KEY=VALUE"), help_heading("Settings"))]
    pub(crate) force: Vec<Assignment>,

    /// Enables detailed debug output
    ///
    /// This has the same effect as setting `RUST_LOG=authkeygen=debug` in the environment.
    /// If present, `RUST_LOG` overrides this option.
    #[arg(short, long, action, help_heading("Debug"))]
    pub(crate) verbose: bool,

    /// Quiet mode; reports only errors
    #[arg(short, long, action, conflicts_with("verbose"), help_heading("Debug"))]
    pub(crate) quiet: bool,

    /// Log to a file
    ///
    /// By default the log receives everything printed to stderr.
    /// To override this behaviour, set the environment variable `RUST_LOG_FILE_DETAIL` (same semantics as `RUST_LOG`).
    #[arg(short('l'), long, action, help_heading("Debug"), value_name("FILE"))]
    pub(crate) log_file: Option<PathBuf>,

    // POSITIONAL ARGUMENTS ================================================================
    /// The repository: a directory holding `keys/` and the configuration file
    #[arg(required = true, value_name = "REPOSITORY")]
    pub(crate) repository: PathBuf,

    /// The configuration file, relative to the repository
    #[arg(required = true, value_name = "CONFIG")]
    pub(crate) config: PathBuf,
}

impl CliArgs {
    pub(crate) fn trace_level(&self) -> &'static str {
        if self.verbose {
            "debug"
        } else if self.quiet {
            "error"
        } else {
            "info"
        }
    }

    /// Converts the arguments into the configuration for one run
    pub(crate) fn run_config(&self) -> RunConfig {
        RunConfig {
            output: self.output.clone(),
            sync: self.sync,
            allowed: AllowList::from_categories(&self.allow),
            defaults: overlay(&self.default),
            forced: overlay(&self.force),
            ..RunConfig::new(&self.repository, &self.config)
        }
    }
}

#[cfg(test)]
mod test {
    use std::path::Path;

    use clap::Parser as _;

    use super::CliArgs;
    use crate::{
        options::{AllowList, Category},
        output::Output,
        sync::SyncMode,
    };

    fn parse(args: &[&str]) -> CliArgs {
        CliArgs::try_parse_from(std::iter::once("authkeygen").chain(args.iter().copied()))
            .unwrap()
    }

    #[test]
    fn minimal() {
        let args = parse(&["/srv/repo", "authkeys.ini"]);
        let rc = args.run_config();
        assert_eq!(rc.config_path(), Path::new("/srv/repo/authkeys.ini"));
        assert_eq!(rc.output, Output::Stdout);
        assert_eq!(rc.sync, SyncMode::Try);
        assert_eq!(rc.allowed, AllowList::all());
        assert!(rc.defaults.is_empty() && rc.forced.is_empty());
        assert_eq!(args.trace_level(), "info");
    }

    #[test]
    fn everything() {
        let args = parse(&[
            "-o",
            "/tmp/authorized_keys",
            "--sync",
            "require",
            "-a",
            "open,command",
            "--allow",
            "pty",
            "-D",
            "open=80",
            "-D",
            "open=443",
            "-F",
            "PTY: no",
            "-v",
            "repo",
            "authkeys.ini",
        ]);
        let rc = args.run_config();
        assert_eq!(rc.output, Output::File("/tmp/authorized_keys".into()));
        assert_eq!(rc.sync, SyncMode::Require);
        assert_eq!(
            rc.allowed,
            AllowList::from_categories(&[Category::Open, Category::Command, Category::Pty])
        );
        assert_eq!(rc.defaults.get("open").map(String::as_str), Some("80\n443"));
        assert_eq!(rc.forced.get("pty").map(String::as_str), Some("no"));
        assert_eq!(args.trace_level(), "debug");
    }

    #[test]
    fn allow_none() {
        let rc = parse(&["-a", "none", "repo", "c.ini"]).run_config();
        assert_eq!(rc.allowed, AllowList::none());
    }

    #[test]
    fn rejects_bad_input() {
        for bad in [
            &["-v", "-q", "repo", "c.ini"][..],
            &["-a", "bogus", "repo", "c.ini"],
            &["-D", "novalue", "repo", "c.ini"],
            &["--sync", "sometimes", "repo", "c.ini"],
            &["repo"],
        ] {
            let args = std::iter::once("authkeygen").chain(bad.iter().copied());
            assert!(CliArgs::try_parse_from(args).is_err(), "{bad:?}");
        }
    }

    #[test]
    fn version_string() {
        let cmd = <CliArgs as clap::CommandFactory>::command();
        let version = cmd.get_version().unwrap();
        assert!(version.starts_with(env!("CARGO_PKG_VERSION")), "{version}");
    }

    #[test]
    fn quiet() {
        assert_eq!(parse(&["-q", "repo", "c.ini"]).trace_level(), "error");
    }
}
