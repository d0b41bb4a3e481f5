//! Configuration error types
// (c) 2024 Ross Younger

/// Something wrong with the configuration file.
///
/// These are fatal: a configuration we cannot fully understand must not be half-applied.
#[derive(Debug, thiserror::Error)]
pub enum IniError {
    /// Could not read the input
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// An entry appeared before the first `[section]`
    #[error("line {line}: entry before any section header")]
    MissingSectionHeader {
        /// Line number (1-based)
        line: usize,
    },
    /// A line that is neither a header, an entry nor a continuation
    #[error("line {line}: expected `key = value`, found `{text}`")]
    MissingDelimiter {
        /// Line number (1-based)
        line: usize,
        /// The offending text
        text: String,
    },
    /// `= value` with nothing before the delimiter
    #[error("line {line}: entry has an empty key")]
    EmptyKey {
        /// Line number (1-based)
        line: usize,
    },
    /// A `[` without a matching `]`, or `[]`
    #[error("line {line}: malformed section header `{text}`")]
    MalformedSection {
        /// Line number (1-based)
        line: usize,
        /// The offending text
        text: String,
    },
    /// The same section appears twice
    #[error("line {line}: section [{name}] already defined")]
    DuplicateSection {
        /// Line number (1-based)
        line: usize,
        /// The section name
        name: String,
    },
    /// The same key appears twice in one section
    #[error("line {line}: key `{key}` already set in section [{section}]")]
    DuplicateKey {
        /// Line number (1-based)
        line: usize,
        /// The section name
        section: String,
        /// The repeated key
        key: String,
    },
}

/// A `--default` or `--force` value that could not be understood
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AssignmentError {
    /// No `=` or `:`
    #[error("expected KEY=VALUE, found `{0}`")]
    MissingDelimiter(String),
    /// Nothing before the delimiter
    #[error("empty key in `{0}`")]
    EmptyKey(String),
}
