// ── Classifier rule flags ──
//
// A RuleFlags value is one packet-filter rule expressed as flag → value
// pairs. Flags are kept in a BTreeMap keyed by `Flag`, whose declaration
// order is the order the packet filter expects them on the command line.

use std::collections::BTreeMap;
use std::fmt;

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::params::Transport;

/// Packet-filter match flags, declared in render order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, strum::EnumIter)]
pub enum Flag {
    MacExtension,
    Protocol,
    MultiportExtension,
    MacSource,
    SourceIp,
    DestinationIp,
    SourcePort,
    DestinationPort,
}

impl Flag {
    /// Command-line token for this flag.
    ///
    /// `-p` is also spelled `--protocol`, and the port flags `--sport` /
    /// `--dport`; the long port forms and the short protocol form are used.
    pub fn token(self) -> &'static str {
        match self {
            Self::MacExtension => "-m mac",
            Self::Protocol => "-p",
            Self::MultiportExtension => "-m multiport",
            Self::MacSource => "--mac-source",
            Self::SourceIp => "--source",
            Self::DestinationIp => "--destination",
            Self::SourcePort => "--source-port",
            Self::DestinationPort => "--destination-port",
        }
    }
}

impl fmt::Display for Flag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// Value attached to a flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlagValue {
    /// Flag without an argument (match extensions).
    Marker,
    /// Free text, e.g. a comma-joined subnet list or a MAC address.
    Text(String),
    Protocol(Transport),
    Port(u16),
}

impl fmt::Display for FlagValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Marker => Ok(()),
            Self::Text(s) => f.write_str(s),
            Self::Protocol(t) => write!(f, "{t}"),
            Self::Port(p) => write!(f, "{p}"),
        }
    }
}

// ── RuleFlags ───────────────────────────────────────────────────────

/// One classifier rule. An empty rule matches every packet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleFlags(BTreeMap<Flag, FlagValue>);

impl RuleFlags {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, flag: Flag, value: FlagValue) -> Self {
        self.0.insert(flag, value);
        self
    }

    pub fn insert(&mut self, flag: Flag, value: FlagValue) -> Option<FlagValue> {
        self.0.insert(flag, value)
    }

    pub fn remove(&mut self, flag: Flag) -> Option<FlagValue> {
        self.0.remove(&flag)
    }

    pub fn get(&self, flag: Flag) -> Option<&FlagValue> {
        self.0.get(&flag)
    }

    pub fn contains(&self, flag: Flag) -> bool {
        self.0.contains_key(&flag)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Flag, &FlagValue)> {
        self.0.iter().map(|(flag, value)| (*flag, value))
    }

    /// Union of both rules' flags; `other` wins on collisions.
    pub fn merged(&self, other: &Self) -> Self {
        let mut out = self.clone();
        out.0
            .extend(other.0.iter().map(|(flag, value)| (*flag, value.clone())));
        out
    }

    /// Command-line arguments in render order, one element per word.
    pub fn to_args(&self) -> Vec<String> {
        let mut args = Vec::with_capacity(self.0.len() * 2);
        for (flag, value) in &self.0 {
            args.extend(flag.token().split(' ').map(str::to_owned));
            if *value != FlagValue::Marker {
                args.push(value.to_string());
            }
        }
        args
    }
}

impl fmt::Display for RuleFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_args().join(" "))
    }
}

/// Serialized as a `token → value` map; markers carry an empty string.
impl Serialize for RuleFlags {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (flag, value) in &self.0 {
            map.serialize_entry(flag.token(), &value.to_string())?;
        }
        map.end()
    }
}
