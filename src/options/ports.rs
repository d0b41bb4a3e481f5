//! `open` / `listen` rule parsing
// (c) 2024 Ross Younger

use std::fmt::Display;

use tracing::trace;

use super::Port;
use crate::diagnostic::Diagnostic;

/// Host used by rules that give only ports
const DEFAULT_HOST: &str = "localhost";

/// A host that matches anything
const WILDCARD_HOST: &str = "*";

/// Which way a forwarding rule points
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum Direction {
    /// Outbound; the client may ask the server to connect to host:port (`ssh -L`)
    Open,
    /// Inbound; the client may ask the server to listen on host:port (`ssh -R`)
    Listen,
}

/// One permitted (host, port) pair
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PortRule {
    /// Which way the forwarding points
    pub direction: Direction,
    /// The host; empty means the rule carries no host part
    pub host: String,
    /// The port
    pub port: Port,
}

impl Display for PortRule {
    /// Renders the rule as an `authorized_keys` directive
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.host.is_empty() {
            write!(f, "permit{}=\"{}\"", self.direction, self.port)
        } else {
            write!(f, "permit{}=\"{}:{}\"", self.direction, self.host, self.port)
        }
    }
}

/// The forwarding permissions granted in one direction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Permissions {
    direction: Direction,
    rules: Vec<PortRule>,
    /// Set by `*:*` under `open`
    unrestricted: bool,
}

impl Permissions {
    /// No forwarding in this direction
    #[must_use]
    pub fn denied(direction: Direction) -> Self {
        Self {
            direction,
            rules: Vec::new(),
            unrestricted: false,
        }
    }

    /// The concrete rules, in the order they were written
    #[must_use]
    pub fn rules(&self) -> &[PortRule] {
        &self.rules
    }

    /// True if forwarding in this direction is allowed to any destination
    #[must_use]
    pub fn is_unrestricted(&self) -> bool {
        self.unrestricted
    }

    /// True if at least one rule grants something
    #[must_use]
    pub fn is_granted(&self) -> bool {
        self.unrestricted || !self.rules.is_empty()
    }

    /// The directive that denies everything in this direction.
    ///
    /// `null:1` can never be reached, but its presence stops sshd from treating
    /// the absence of any `permit…` option as "anything goes".
    #[must_use]
    pub fn placeholder(&self) -> String {
        format!("permit{}=\"null:1\"", self.direction)
    }

    /// The `authorized_keys` directives for this direction.
    ///
    /// * unrestricted: nothing, because any explicit directive would narrow the grant
    /// * no rules: the deny-all placeholder
    /// * otherwise one directive per rule
    #[must_use]
    pub fn directives(&self) -> Vec<String> {
        if self.unrestricted {
            Vec::new()
        } else if self.rules.is_empty() {
            vec![self.placeholder()]
        } else {
            self.rules.iter().map(ToString::to_string).collect()
        }
    }
}

/// Splits a comma-separated list, trimming each item
fn split_list(s: &str) -> impl Iterator<Item = &str> {
    s.split(',').map(str::trim)
}

/// Parses a multi-line `open` or `listen` specification.
///
/// Each non-blank line is one rule: `ports` (meaning `localhost`) or `hosts:ports`.
/// Hosts and ports are split at the last colon, so a bracketed IPv6 address works as a host.
/// Bad port tokens are reported in `diagnostics` and skipped; the rest of the rule still applies.
pub fn parse_port_spec(
    spec: &str,
    direction: Direction,
    diagnostics: &mut Vec<Diagnostic>,
) -> Permissions {
    let mut result = Permissions::denied(direction);

    for line in spec.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let (hosts, ports): (Vec<&str>, &str) = match line.rsplit_once(':') {
            Some((hosts, ports)) => (split_list(hosts).collect(), ports),
            None => (vec![DEFAULT_HOST], line),
        };

        let mut resolved = Vec::new();
        for token in split_list(ports) {
            match Port::expand(token) {
                Ok(mut p) => resolved.append(&mut p),
                Err(reason) => diagnostics.push(Diagnostic::InvalidPort {
                    direction,
                    token: token.to_owned(),
                    reason,
                }),
            }
        }

        for host in &hosts {
            for port in &resolved {
                if direction == Direction::Open && *host == WILDCARD_HOST {
                    if *port == Port::Any {
                        trace!("{line}: outbound forwarding is unrestricted");
                        result.unrestricted = true;
                    } else {
                        diagnostics.push(Diagnostic::WildcardHostPort {
                            port: port.to_string(),
                        });
                    }
                    continue;
                }
                result.rules.push(PortRule {
                    direction,
                    host: (*host).to_owned(),
                    port: *port,
                });
            }
        }
    }
    result
}

#[cfg(test)]
mod test {
    use assertables::assert_contains;

    use super::{parse_port_spec, Direction, Permissions};
    use crate::{diagnostic::Diagnostic, options::PortError};

    fn parse(spec: &str, direction: Direction) -> (Permissions, Vec<Diagnostic>) {
        let mut diags = Vec::new();
        let p = parse_port_spec(spec, direction, &mut diags);
        (p, diags)
    }

    #[test]
    fn bare_port_is_localhost() {
        let (p, diags) = parse("8080", Direction::Open);
        assert!(diags.is_empty());
        assert!(p.is_granted());
        assert_eq!(p.directives(), vec![r#"permitopen="localhost:8080""#]);
    }

    #[test]
    fn hosts_cross_ports() {
        let (p, diags) = parse("host1,host2:80-82", Direction::Open);
        assert!(diags.is_empty());
        assert_eq!(
            p.directives(),
            vec![
                r#"permitopen="host1:80""#,
                r#"permitopen="host1:81""#,
                r#"permitopen="host1:82""#,
                r#"permitopen="host2:80""#,
                r#"permitopen="host2:81""#,
                r#"permitopen="host2:82""#,
            ]
        );
    }

    #[test]
    fn multiple_lines_and_lists() {
        let (p, diags) = parse("\n22, 443\n\n  db:5432  \n", Direction::Listen);
        assert!(diags.is_empty());
        assert_eq!(
            p.directives(),
            vec![
                r#"permitlisten="localhost:22""#,
                r#"permitlisten="localhost:443""#,
                r#"permitlisten="db:5432""#,
            ]
        );
    }

    #[test]
    fn empty_host_has_no_host_part() {
        let (p, _) = parse(":2222", Direction::Listen);
        assert_eq!(p.directives(), vec![r#"permitlisten="2222""#]);
    }

    #[test]
    fn ipv6_host() {
        let (p, _) = parse("[::1]:22", Direction::Open);
        assert_eq!(p.directives(), vec![r#"permitopen="[::1]:22""#]);
    }

    #[test]
    fn nothing_means_placeholder() {
        for spec in ["", "\n\n", "   "] {
            let (p, diags) = parse(spec, Direction::Listen);
            assert!(diags.is_empty());
            assert!(!p.is_granted());
            assert_eq!(p.directives(), vec![r#"permitlisten="null:1""#]);
        }
    }

    #[test]
    fn bad_tokens_are_skipped() {
        let (p, diags) = parse("80,http,70000,90-85,81", Direction::Open);
        assert_eq!(
            p.directives(),
            vec![r#"permitopen="localhost:80""#, r#"permitopen="localhost:81""#]
        );
        let reasons: Vec<_> = diags
            .iter()
            .map(|d| match d {
                Diagnostic::InvalidPort { reason, .. } => *reason,
                other => panic!("unexpected diagnostic {other:?}"),
            })
            .collect();
        assert_eq!(
            reasons,
            vec![
                PortError::Invalid,
                PortError::OutOfRange,
                PortError::Decreasing
            ]
        );
    }

    #[test]
    fn all_bad_means_placeholder() {
        let (p, diags) = parse("0", Direction::Open);
        assert_eq!(diags.len(), 1);
        assert_eq!(p.directives(), vec![r#"permitopen="null:1""#]);
    }

    #[test]
    fn wildcard_host_with_port_rejected_for_open() {
        let (p, diags) = parse("*:22", Direction::Open);
        assert!(!p.is_granted());
        assert!(p.rules().is_empty());
        assert_eq!(diags.len(), 1);
        assert_contains!(diags[0].to_string(), "wildcard hosts");
    }

    #[test]
    fn wildcard_everything_for_open_is_unrestricted() {
        let (p, diags) = parse("*:*", Direction::Open);
        assert!(diags.is_empty());
        assert!(p.is_granted());
        assert!(p.is_unrestricted());
        assert!(p.directives().is_empty());
    }

    #[test]
    fn unrestricted_swallows_explicit_rules() {
        let (p, _) = parse("8080\n*:*", Direction::Open);
        assert!(p.is_unrestricted());
        assert_eq!(p.rules().len(), 1);
        assert!(p.directives().is_empty());
    }

    #[test]
    fn wildcards_pass_through_for_listen() {
        let (p, diags) = parse("*:2222\n*:*\nlocalhost:*", Direction::Listen);
        assert!(diags.is_empty());
        assert!(!p.is_unrestricted());
        assert_eq!(
            p.directives(),
            vec![
                r#"permitlisten="*:2222""#,
                r#"permitlisten="*:*""#,
                r#"permitlisten="localhost:*""#,
            ]
        );
    }

    #[test]
    fn host_wildcard_port_for_open() {
        let (p, _) = parse("example.com:*", Direction::Open);
        assert_eq!(p.directives(), vec![r#"permitopen="example.com:*""#]);
    }
}
