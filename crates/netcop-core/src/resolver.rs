// ── Traffic-class resolution ──
//
// Flattens a class's subnet and port associations into ordered, deduplicated
// sets. A port with unspecified protocol lands in both the TCP and UDP sets.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::model::{Cidr, TrafficClass};

/// Distinct subnets and ports of one traffic class, split by protocol.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResolvedClass {
    pub subnets: BTreeSet<Cidr>,
    pub tcp_ports: BTreeSet<u16>,
    pub udp_ports: BTreeSet<u16>,
}

/// Resolve a class. The association `group` is ignored here.
pub fn resolve(class: &TrafficClass) -> ResolvedClass {
    let mut resolved = ResolvedClass::default();

    for subnet in &class.subnets {
        resolved.subnets.insert(subnet.cidr);
    }

    for assoc in &class.ports {
        let port = assoc.port;
        if port.protocol.covers_tcp() {
            resolved.tcp_ports.insert(port.number);
        }
        if port.protocol.covers_udp() {
            resolved.udp_ports.insert(port.number);
        }
    }

    resolved
}
