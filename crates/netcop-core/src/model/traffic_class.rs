// ── Traffic class domain types ──

use std::cmp::Ordering;
use std::fmt;
use std::net::Ipv4Addr;

use ipnetwork::{IpNetworkError, Ipv4Network};
use serde::{Serialize, Serializer};

use super::entity_id::EntityId;

/// Which side of the gateway a class association describes.
///
/// Informational only: compilation routes values by the target's role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Group {
    Inside,
    Outside,
}

/// Who owns a traffic class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassKind {
    System,
    User,
}

// ── Cidr ────────────────────────────────────────────────────────────

/// An IPv4 subnet, rendered `address/prefix`.
///
/// Ordered numerically by address, then prefix, so joined subnet lists
/// come out the same on every run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Cidr(Ipv4Network);

impl Cidr {
    /// Build a subnet. Fails when `prefix` exceeds 32.
    pub fn new(address: Ipv4Addr, prefix: u8) -> Result<Self, IpNetworkError> {
        Ipv4Network::new(address, prefix).map(Self)
    }

    pub fn address(&self) -> Ipv4Addr {
        self.0.ip()
    }

    pub fn prefix(&self) -> u8 {
        self.0.prefix()
    }
}

impl Ord for Cidr {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.address(), self.prefix()).cmp(&(other.address(), other.prefix()))
    }
}

impl PartialOrd for Cidr {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Cidr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.address(), self.prefix())
    }
}

impl Serialize for Cidr {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

// ── Port ────────────────────────────────────────────────────────────

/// Transport protocol of a port. `Any` applies to both TCP and UDP.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Any,
    Tcp,
    Udp,
}

impl Protocol {
    /// Decode an IP protocol number (0, 6 or 17).
    pub fn from_number(number: i64) -> Option<Self> {
        match number {
            0 => Some(Self::Any),
            6 => Some(Self::Tcp),
            17 => Some(Self::Udp),
            _ => None,
        }
    }

    pub fn covers_tcp(self) -> bool {
        matches!(self, Self::Any | Self::Tcp)
    }

    pub fn covers_udp(self) -> bool {
        matches!(self, Self::Any | Self::Udp)
    }
}

/// A port number with its protocol, rendered `80/tcp`, `53/udp` or bare `8080`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Port {
    pub number: u16,
    pub protocol: Protocol,
}

impl fmt::Display for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.protocol {
            Protocol::Any => write!(f, "{}", self.number),
            Protocol::Tcp => write!(f, "{}/tcp", self.number),
            Protocol::Udp => write!(f, "{}/udp", self.number),
        }
    }
}

// ── TrafficClass ────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassSubnet {
    pub cidr: Cidr,
    pub group: Group,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassPort {
    pub port: Port,
    pub group: Group,
}

/// A reusable, named traffic pattern (subnets + ports) referenced by targets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrafficClass {
    pub id: EntityId,
    pub name: String,
    pub description: String,
    pub enabled: bool,
    pub kind: ClassKind,
    pub subnets: Vec<ClassSubnet>,
    pub ports: Vec<ClassPort>,
}

impl TrafficClass {
    /// An empty user-defined class, for building classes in code.
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        Self {
            id: EntityId::new(id),
            name: name.into(),
            description: String::new(),
            enabled: true,
            kind: ClassKind::User,
            subnets: Vec::new(),
            ports: Vec::new(),
        }
    }

    pub fn with_subnet(mut self, cidr: Cidr, group: Group) -> Self {
        self.subnets.push(ClassSubnet { cidr, group });
        self
    }

    pub fn with_port(mut self, number: u16, protocol: Protocol, group: Group) -> Self {
        self.ports.push(ClassPort {
            port: Port { number, protocol },
            group,
        });
        self
    }
}
