//! Configuration file parsing
// (c) 2024 Ross Younger

use std::{
    collections::HashSet,
    fs::File,
    io::{BufRead, BufReader, Read},
    path::Path,
    str::FromStr,
};

use anyhow::{Context, Result};
use tracing::trace;

use super::{
    lines::{section_name, split_entry, Line},
    IniError, Settings,
};

/// Name of the section whose entries apply beneath every other section
pub const DEFAULT_SECTION: &str = "DEFAULT";

/// A named group of settings from the configuration file.
///
/// The name is a glob pattern over key file paths, relative to the key store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    /// The section name, exactly as written
    pub name: String,
    /// The settings in this section
    pub settings: Settings,
}

/// The parsed contents of a configuration file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Configuration {
    /// Entries from the `[DEFAULT]` section, if there was one
    pub defaults: Settings,
    /// All other sections, in file order
    pub sections: Vec<Section>,
}

impl Configuration {
    /// Reads and parses a configuration file
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let parser = Parser::for_path(path)
            .with_context(|| format!("opening configuration file {path:?}"))?;
        parser
            .parse()
            .with_context(|| format!("reading configuration file {path:?}"))
    }
}

impl FromStr for Configuration {
    type Err = IniError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Parser::for_str(s).parse()
    }
}

///////////////////////////////////////////////////////////////////////////////////////

/// The entry currently being read, which may yet gain continuation lines
struct OpenEntry {
    key: String,
    indent: usize,
    lines: Vec<String>,
}

/// Where entries are currently going
enum Target {
    Defaults,
    Section(usize),
}

/// The business end of reading a config file.
///
/// The format follows the common INI dialect:
/// * `[name]` starts a section; `[DEFAULT]` is special
/// * `key = value` or `key: value`; keys are case-insensitive
/// * a line indented deeper than its entry continues that entry's value on a new line
/// * full-line comments start with `#` or `;`
///
/// # Note
/// You can only use this struct once. If for some reason you want to re-parse a file,
/// you must create a fresh `Parser` to do so.
pub(crate) struct Parser<R>
where
    R: Read,
{
    line_number: usize,
    reader: BufReader<R>,
    source: String,
    output: Configuration,
    target: Option<Target>,
    entry: Option<OpenEntry>,
    seen_sections: HashSet<String>,
}

impl Parser<File> {
    pub(crate) fn for_path<P>(path: P) -> std::io::Result<Self>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        let file = File::open(path)?;
        Ok(Self::for_reader(
            BufReader::new(file),
            path.to_string_lossy().to_string(),
        ))
    }
}

impl<'a> Parser<&'a [u8]> {
    pub(crate) fn for_str(s: &'a str) -> Self {
        Self::for_reader(BufReader::new(s.as_bytes()), "<string>".into())
    }
}

impl<R: Read> Parser<R> {
    fn for_reader(reader: BufReader<R>, source: String) -> Self {
        Self {
            line_number: 0,
            reader,
            source,
            output: Configuration::default(),
            target: None,
            entry: None,
            seen_sections: HashSet::new(),
        }
    }

    fn current_settings(&mut self) -> Option<&mut Settings> {
        match self.target {
            None => None,
            Some(Target::Defaults) => Some(&mut self.output.defaults),
            Some(Target::Section(i)) => Some(&mut self.output.sections[i].settings),
        }
    }

    fn current_name(&self) -> &str {
        match self.target {
            Some(Target::Section(i)) => &self.output.sections[i].name,
            _ => DEFAULT_SECTION,
        }
    }

    /// Stores the open entry, if there is one
    fn close_entry(&mut self) {
        let Some(entry) = self.entry.take() else {
            return;
        };
        let value = entry.lines.join("\n").trim_end().to_owned();
        if let Some(settings) = self.current_settings() {
            let _ = settings.insert(entry.key, value);
        }
    }

    fn start_section(&mut self, name: &str) -> Result<(), IniError> {
        self.close_entry();
        let line = self.line_number;
        if !self.seen_sections.insert(name.to_owned()) {
            return Err(IniError::DuplicateSection {
                line,
                name: name.to_owned(),
            });
        }
        trace!("{} line {line}: section [{name}]", self.source);
        if name == DEFAULT_SECTION {
            self.target = Some(Target::Defaults);
        } else {
            self.target = Some(Target::Section(self.output.sections.len()));
            self.output.sections.push(Section {
                name: name.to_owned(),
                settings: Settings::new(),
            });
        }
        Ok(())
    }

    fn start_entry(&mut self, indent: usize, text: &str) -> Result<(), IniError> {
        self.close_entry();
        let line = self.line_number;
        let Some((key, value)) = split_entry(text) else {
            return Err(IniError::MissingDelimiter {
                line,
                text: text.to_owned(),
            });
        };
        if key.is_empty() {
            return Err(IniError::EmptyKey { line });
        }
        let Some(settings) = self.current_settings() else {
            return Err(IniError::MissingSectionHeader { line });
        };
        if settings.contains_key(&key) {
            return Err(IniError::DuplicateKey {
                line,
                section: self.current_name().to_owned(),
                key,
            });
        }
        self.entry = Some(OpenEntry {
            key,
            indent,
            lines: vec![value],
        });
        Ok(())
    }

    fn parse_line(&mut self, line: Line) -> Result<(), IniError> {
        match line {
            Line::Comment => (),
            Line::Blank => {
                // Blank lines inside a value are kept; trailing ones are trimmed on close.
                if let Some(entry) = self.entry.as_mut() {
                    entry.lines.push(String::new());
                }
            }
            Line::Content { indent, text } => {
                if let Some(entry) = self.entry.as_mut() {
                    if indent > entry.indent {
                        entry.lines.push(text);
                        return Ok(());
                    }
                }
                match section_name(&text) {
                    Ok(Some(name)) => self.start_section(name)?,
                    Ok(None) => self.start_entry(indent, &text)?,
                    Err(()) => {
                        return Err(IniError::MalformedSection {
                            line: self.line_number,
                            text: text.clone(),
                        })
                    }
                }
            }
        }
        Ok(())
    }

    /// Reads the whole input.
    /// This consumes the `Parser`.
    pub(crate) fn parse(mut self) -> Result<Configuration, IniError> {
        let mut line = String::new();
        loop {
            line.clear();
            if 0 == self.reader.read_line(&mut line)? {
                break; // EOF
            }
            self.line_number += 1;
            self.parse_line(Line::classify(&line))?;
        }
        self.close_entry();
        Ok(self.output)
    }
}

///////////////////////////////////////////////////////////////////////////////////////
