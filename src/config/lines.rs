//! Line parsing internals
// (c) 2024 Ross Younger

#[derive(Debug, PartialEq)]
/// A line we read from a configuration file, classified without regard to context
pub(super) enum Line {
    /// Nothing but whitespace
    Blank,
    /// A full-line comment (`#` or `;`)
    Comment,
    /// Anything else; whether this is a header, an entry or a continuation depends on context
    Content {
        /// Count of leading whitespace characters
        indent: usize,
        /// The line, trimmed
        text: String,
    },
}

impl Line {
    pub(super) fn classify(raw: &str) -> Self {
        let raw = raw.trim_end_matches(['\r', '\n']);
        let text = raw.trim();
        if text.is_empty() {
            return Line::Blank;
        }
        if text.starts_with(['#', ';']) {
            return Line::Comment;
        }
        let indent = raw.chars().take_while(|c| c.is_whitespace()).count();
        Line::Content {
            indent,
            text: text.to_owned(),
        }
    }
}

///////////////////////////////////////////////////////////////////////////////////////

/// Splits `key = value` (or `key: value`) at the first delimiter.
///
/// The key is lower-cased and both halves are trimmed.
/// Returns None if there is no delimiter.
pub(crate) fn split_entry(text: &str) -> Option<(String, String)> {
    let idx = text.find(['=', ':'])?;
    let key = text[..idx].trim().to_lowercase();
    let value = text[idx + 1..].trim().to_owned();
    Some((key, value))
}

/// If this text is a section header, returns its name.
///
/// `Err(())` means the text looks like a header but is not terminated.
pub(super) fn section_name(text: &str) -> Result<Option<&str>, ()> {
    let Some(rest) = text.strip_prefix('[') else {
        return Ok(None);
    };
    match rest.strip_suffix(']') {
        Some(name) if !name.is_empty() => Ok(Some(name)),
        _ => Err(()),
    }
}

///////////////////////////////////////////////////////////////////////////////////////
