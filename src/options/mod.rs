// (c) 2024 Ross Younger
//! # Option synthesis
//!
//! Turns the effective settings of one key into an OpenSSH `authorized_keys` option list,
//! as described in `sshd(8)`.
//!
//! Every line starts with `restrict`, which switches off every optional capability.
//! Settings then selectively grant capabilities back:
//!
//! | Setting       | Produces                                               |
//! |---------------|--------------------------------------------------------|
//! | `open`        | `port-forwarding`, `permitopen="host:port"`            |
//! | `listen`      | `port-forwarding`, `permitlisten="host:port"`          |
//! | `command`     | `command="..."` (first line only)                      |
//! | `from`        | `from="..."` (first line only)                         |
//! | `environment` | one `environment="NAME=value"` per line                |
//! | `agent`       | `agent-forwarding` / `no-agent-forwarding`             |
//! | `pty`         | `pty` / `no-pty`                                       |
//! | `rc`          | `user-rc` / `no-user-rc`                               |
//! | `x11`         | `X11-forwarding` / `no-X11-forwarding`                 |
//! | `expiry`      | `expiry-time="YYYYMMDD[HHMM[SS]]"`                     |
//!
//! ## Port specifications
//!
//! `open` and `listen` take one rule per line, in the form `ports` or `hosts:ports`.
//! Both halves are comma-separated lists; a port may be a number, a range `a-b` or `*`.
//! A bare `ports` rule applies to `localhost`.
//!
//! ```text
//! open = 8080
//!        db1,db2:5432
//!        proxy:8000-8003
//! listen = *:2222
//! ```
//!
//! A direction without any usable rule is pinned shut with a `permit…="null:1"` placeholder.
//! Under `open`, the rule `*:*` lifts the outbound restriction altogether.

use std::collections::BTreeSet;

use strum::IntoEnumIterator as _;

mod port_range;
pub use port_range::{Port, PortError, PortRange};

mod ports;
pub use ports::{parse_port_spec, Direction, Permissions, PortRule};

mod synth;
pub use synth::{escape, is_valid_expiry, synthesize, OptionLine};

/// A category of setting that may be allowed to reach the output.
///
/// Each category except [`Category::NoOptions`] is also the name of the setting key it governs.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    strum::Display,
    strum::IntoStaticStr,
    strum::EnumIter,
    clap::ValueEnum,
)]
#[strum(serialize_all = "lowercase")]
pub enum Category {
    /// Outbound port forwarding (`permitopen`)
    Open,
    /// Inbound port forwarding (`permitlisten`)
    Listen,
    /// Forced command
    Command,
    /// Source address restriction
    From,
    /// Environment variables
    Environment,
    /// Agent forwarding
    Agent,
    /// Pseudo-terminal allocation
    Pty,
    /// Execution of `~/.ssh/rc`
    Rc,
    /// X11 forwarding
    X11,
    /// Key expiry time
    Expiry,
    /// Sentinel: allow no option categories at all
    #[value(name = "none")]
    #[strum(serialize = "none")]
    NoOptions,
}

impl Category {
    /// The setting key this category reads
    #[must_use]
    pub fn key(self) -> &'static str {
        self.into()
    }
}

/// The set of setting categories that are permitted to produce options.
///
/// Settings in categories outside the list are silently ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllowList(BTreeSet<Category>);

impl Default for AllowList {
    /// Everything is allowed
    fn default() -> Self {
        Self::all()
    }
}

impl AllowList {
    /// Allows every category
    #[must_use]
    pub fn all() -> Self {
        Self(
            Category::iter()
                .filter(|c| *c != Category::NoOptions)
                .collect(),
        )
    }

    /// Allows nothing; output lines carry only `restrict`
    #[must_use]
    pub fn none() -> Self {
        Self(BTreeSet::new())
    }

    /// Builds an allow list from user input.
    ///
    /// An empty input means "everything". If [`Category::NoOptions`] is present,
    /// it wins over anything else given.
    #[must_use]
    pub fn from_categories(categories: &[Category]) -> Self {
        if categories.is_empty() {
            return Self::all();
        }
        if categories.contains(&Category::NoOptions) {
            return Self::none();
        }
        Self(categories.iter().copied().collect())
    }

    /// Is this category allowed?
    #[must_use]
    pub fn allows(&self, category: Category) -> bool {
        self.0.contains(&category)
    }
}
