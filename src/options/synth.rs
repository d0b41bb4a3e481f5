//! Building the option list for one key
// (c) 2024 Ross Younger

use std::fmt::Display;

use super::{parse_port_spec, AllowList, Category, Direction, Permissions};
use crate::{config::Settings, diagnostic::Diagnostic};

/// Settings that take a single line
const SINGLE_LINE: &[Category] = &[Category::Command, Category::From];

/// Settings that take one option per line
const MULTI_LINE: &[Category] = &[Category::Environment];

/// Yes/no settings and the flags they control
const BOOLEAN: &[(Category, &str)] = &[
    (Category::Agent, "agent-forwarding"),
    (Category::Pty, "pty"),
    (Category::Rc, "user-rc"),
    (Category::X11, "X11-forwarding"),
];

/// Accepted lengths of an `expiry` value: YYYYMMDD, YYYYMMDDHHMM, YYYYMMDDHHMMSS
const EXPIRY_LENGTHS: &[usize] = &[8, 12, 14];

/// The ordered option tokens for one key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionLine {
    tokens: Vec<String>,
}

impl OptionLine {
    /// The option tokens, in output order
    #[must_use]
    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    /// Renders a complete `authorized_keys` line (without the newline)
    #[must_use]
    pub fn render(&self, key: &str) -> String {
        format!("{self} {key}")
    }
}

impl Display for OptionLine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.tokens.join(","))
    }
}

/// Escapes a value for use inside a double-quoted option
#[must_use]
pub fn escape(value: &str) -> String {
    value.replace('"', "\\\"")
}

fn quoted(category: Category, value: &str) -> String {
    format!("{}=\"{}\"", category.key(), escape(value))
}

fn non_blank_lines(value: &str) -> impl Iterator<Item = &str> {
    value.lines().filter(|l| !l.trim().is_empty())
}

/// Is this a timestamp `expiry-time` accepts?
#[must_use]
pub fn is_valid_expiry(value: &str) -> bool {
    !value.is_empty()
        && value.bytes().all(|b| b.is_ascii_digit())
        && EXPIRY_LENGTHS.contains(&value.len())
}

/// Computes the permissions for one direction; directions that aren't allowed get none.
fn permissions(
    settings: &Settings,
    allowed: &AllowList,
    category: Category,
    direction: Direction,
    diagnostics: &mut Vec<Diagnostic>,
) -> Permissions {
    if !allowed.allows(category) {
        return Permissions::denied(direction);
    }
    let spec = settings.get(category.key()).map_or("", String::as_str);
    parse_port_spec(spec, direction, diagnostics)
}

/// Turns the effective settings for one key into its option list.
///
/// The line always begins with `restrict`. Settings outside `allowed` are ignored.
/// Problems with individual settings are reported in `diagnostics`; the offending option is
/// left out but the rest of the line is still built.
#[must_use]
pub fn synthesize(
    settings: &Settings,
    allowed: &AllowList,
    diagnostics: &mut Vec<Diagnostic>,
) -> OptionLine {
    let mut tokens = vec!["restrict".to_string()];

    // Port forwarding
    if allowed.allows(Category::Open) || allowed.allows(Category::Listen) {
        let open = permissions(
            settings,
            allowed,
            Category::Open,
            Direction::Open,
            diagnostics,
        );
        let listen = permissions(
            settings,
            allowed,
            Category::Listen,
            Direction::Listen,
            diagnostics,
        );
        if open.is_granted() || listen.is_granted() {
            tokens.push("port-forwarding".into());
            tokens.extend(open.directives());
            tokens.extend(listen.directives());
        }
    }

    for &category in SINGLE_LINE {
        if !allowed.allows(category) {
            continue;
        }
        let Some(value) = settings.get(category.key()) else {
            continue;
        };
        let mut lines = non_blank_lines(value);
        let Some(first) = lines.next() else {
            continue;
        };
        if lines.next().is_some() {
            diagnostics.push(Diagnostic::ExtraLines { setting: category });
        }
        tokens.push(quoted(category, first));
    }

    for &category in MULTI_LINE {
        if !allowed.allows(category) {
            continue;
        }
        if let Some(value) = settings.get(category.key()) {
            tokens.extend(non_blank_lines(value).map(|l| quoted(category, l)));
        }
    }

    for &(category, flag) in BOOLEAN {
        if !allowed.allows(category) {
            continue;
        }
        if let Some(value) = settings.get(category.key()) {
            if value == "yes" {
                tokens.push(flag.into());
            } else {
                tokens.push(format!("no-{flag}"));
            }
        }
    }

    if allowed.allows(Category::Expiry) {
        if let Some(value) = settings.get(Category::Expiry.key()) {
            if is_valid_expiry(value) {
                tokens.push(format!("expiry-time=\"{value}\""));
            } else {
                diagnostics.push(Diagnostic::InvalidExpiry {
                    value: value.clone(),
                });
            }
        }
    }

    OptionLine { tokens }
}
