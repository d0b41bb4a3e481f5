//! # authkeygen
//!
//! Generates an OpenSSH `authorized_keys` file from a _repository_: a directory tree of
//! public key files, plus an INI-style configuration file whose section names are glob
//! patterns over that tree.
//!
//! Every emitted key line begins with `restrict`, so a key only gains the capabilities its
//! configuration grants it.
//!
//! For the configuration file format, see [`config`]. For the settings and the options they
//! produce, see [`options`].
//!
//! ## Overview of a run
//! 1. Optionally update the repository ([`sync`])
//! 1. Read the configuration file ([`config::Configuration`])
//! 1. Resolve each section's pattern to key files, and merge the settings that apply to each
//!    ([`keys`])
//! 1. Turn each key's settings into its option list ([`options::synthesize`])
//! 1. Write the result, atomically ([`output`])
//!
//! Problems with individual patterns, settings or keys are reported as [`diagnostic`]s and do
//! not stop the run. [`pipeline::run`] ties it all together.
// (c) 2024 Ross Younger

mod cli;
pub use cli::cli;
pub mod config;
pub mod diagnostic;
pub mod keys;
pub mod options;
pub mod output;
pub mod pipeline;
pub mod sync;
/// Utilities
pub mod util;
