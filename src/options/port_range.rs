//! Port tokens within `open` and `listen` rules
// (c) 2024 Ross Younger
use std::{fmt::Display, ops::RangeInclusive, str::FromStr};

/// Why a port token was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PortError {
    /// A number outside 1..=65535
    #[error("port number out of range (1-65535)")]
    OutOfRange,
    /// A range whose end is below its beginning
    #[error("port range must be increasing")]
    Decreasing,
    /// Not a number, a range or `*`
    #[error("expected a port number, a range `a-b` or `*`")]
    Invalid,
}

/// An inclusive range of TCP port numbers.
///
/// Port 0 has no meaning in `authorized_keys`, so it is never part of a range.
///
/// In a rule, a range may specified as an integer or as a pair of ports. For example:
/// ```text
/// open = 8080          # a single port
///        8000-8010     # a range
/// ```
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PortRange {
    /// First number in the range
    pub begin: u16,
    /// Last number in the range, inclusive.
    pub end: u16,
}

/// Parses a single port number, distinguishing "too big" from "not a number"
fn parse_port(s: &str) -> Result<u16, PortError> {
    match s.parse::<u64>() {
        Ok(n) => match u16::try_from(n) {
            Ok(0) | Err(_) => Err(PortError::OutOfRange),
            Ok(p) => Ok(p),
        },
        Err(_) => Err(PortError::Invalid),
    }
}

impl FromStr for PortRange {
    type Err = PortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if !s.contains('-') {
            // case 1: it's a number
            let n = parse_port(s)?;
            return Ok(Self { begin: n, end: n });
        }
        // case 2: it's a range
        let (a, b) = s.split_once('-').ok_or(PortError::Invalid)?;
        let aa = parse_port(a.trim())?;
        let bb = parse_port(b.trim())?;
        if aa > bb {
            return Err(PortError::Decreasing);
        }
        Ok(Self { begin: aa, end: bb })
    }
}

impl PortRange {
    /// Iterates over every port in the range
    #[must_use]
    pub fn ports(self) -> RangeInclusive<u16> {
        self.begin..=self.end
    }
}

/// A single resolved port in a rule
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Port {
    /// Any port (`*`)
    Any,
    /// This port
    Number(u16),
}

impl Display for Port {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Port::Any => f.write_str("*"),
            Port::Number(n) => write!(f, "{n}"),
        }
    }
}

impl Port {
    /// Parses a port token (`*`, `n` or `a-b`) into the ports it stands for
    pub fn expand(token: &str) -> Result<Vec<Port>, PortError> {
        if token.trim() == "*" {
            return Ok(vec![Port::Any]);
        }
        let range = PortRange::from_str(token)?;
        Ok(range.ports().map(Port::Number).collect())
    }
}
