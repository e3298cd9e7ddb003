// ── Target parameter collection ──
//
// Turns a policy's targets into a ParameterBag: the per-direction sets of
// MACs, subnets and protocol-specific ports the compiler expands. The bag
// is built fresh for every compilation and never mutated afterwards.

use std::collections::BTreeSet;

use serde::Serialize;
use tracing::trace;

use crate::error::CoreError;
use crate::model::{Cidr, EntityId, MacAddress, Target, TargetRole, TrafficClass};
use crate::resolver;

/// The fixed set of parameter kinds a bag always carries.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    strum::Display,
    strum::EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ParamKind {
    Mac,
    SourceIp,
    DestinationIp,
    TcpSourcePort,
    TcpDestinationPort,
    UdpSourcePort,
    UdpDestinationPort,
}

/// Transport protocol a port rule matches. A single rule is never both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Transport {
    Tcp,
    Udp,
}

/// A source/destination pair of the same kind of value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Directional<T> {
    pub source: T,
    pub destination: T,
}

impl<T> Directional<T> {
    pub fn side(&self, role: TargetRole) -> &T {
        match role {
            TargetRole::Source => &self.source,
            TargetRole::Destination => &self.destination,
        }
    }

    pub fn side_mut(&mut self, role: TargetRole) -> &mut T {
        match role {
            TargetRole::Source => &mut self.source,
            TargetRole::Destination => &mut self.destination,
        }
    }
}

impl<V: Ord> Directional<BTreeSet<V>> {
    pub fn is_empty(&self) -> bool {
        self.source.is_empty() && self.destination.is_empty()
    }
}

/// Compilation-scoped parameters of one policy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ParameterBag {
    pub macs: BTreeSet<MacAddress>,
    pub networks: Directional<BTreeSet<Cidr>>,
    pub tcp_ports: Directional<BTreeSet<u16>>,
    pub udp_ports: Directional<BTreeSet<u16>>,
}

impl ParameterBag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ports(&self, transport: Transport) -> &Directional<BTreeSet<u16>> {
        match transport {
            Transport::Tcp => &self.tcp_ports,
            Transport::Udp => &self.udp_ports,
        }
    }

    fn ports_mut(&mut self, transport: Transport) -> &mut Directional<BTreeSet<u16>> {
        match transport {
            Transport::Tcp => &mut self.tcp_ports,
            Transport::Udp => &mut self.udp_ports,
        }
    }

    pub fn has_ports(&self) -> bool {
        !self.tcp_ports.is_empty() || !self.udp_ports.is_empty()
    }

    /// Rendered values of one parameter kind, in iteration order.
    pub fn values(&self, kind: ParamKind) -> Vec<String> {
        fn render<V: ToString>(set: &BTreeSet<V>) -> Vec<String> {
            set.iter().map(ToString::to_string).collect()
        }
        match kind {
            ParamKind::Mac => render(&self.macs),
            ParamKind::SourceIp => render(&self.networks.source),
            ParamKind::DestinationIp => render(&self.networks.destination),
            ParamKind::TcpSourcePort => render(&self.tcp_ports.source),
            ParamKind::TcpDestinationPort => render(&self.tcp_ports.destination),
            ParamKind::UdpSourcePort => render(&self.udp_ports.source),
            ParamKind::UdpDestinationPort => render(&self.udp_ports.destination),
        }
    }

    // ── Builders ─────────────────────────────────────────────────────

    pub fn with_mac(mut self, mac: MacAddress) -> Self {
        self.macs.insert(mac);
        self
    }

    pub fn with_network(mut self, role: TargetRole, cidr: Cidr) -> Self {
        self.networks.side_mut(role).insert(cidr);
        self
    }

    pub fn with_port(mut self, transport: Transport, role: TargetRole, port: u16) -> Self {
        self.ports_mut(transport).side_mut(role).insert(port);
        self
    }

    /// Merge one target into the bag. `class` is the target's resolved class, if any.
    pub fn with_target(mut self, target: &Target, class: Option<&TrafficClass>) -> Self {
        if let Some(ref mac) = target.mac {
            self.macs.insert(mac.clone());
        }
        if let Some(class) = class {
            let resolved = resolver::resolve(class);
            let role = target.role;
            self.networks.side_mut(role).extend(resolved.subnets);
            self.tcp_ports.side_mut(role).extend(resolved.tcp_ports);
            self.udp_ports.side_mut(role).extend(resolved.udp_ports);
        }
        self
    }
}

/// Build the parameter bag of a policy from its targets.
///
/// `class_of` looks up the traffic class a target references; a lookup
/// failure aborts collection for this policy only.
pub fn collect<F>(targets: &[Target], mut class_of: F) -> Result<ParameterBag, CoreError>
where
    F: FnMut(&EntityId) -> Result<TrafficClass, CoreError>,
{
    let mut bag = ParameterBag::new();
    for target in targets {
        let class = target.class_id.as_ref().map(&mut class_of).transpose()?;
        bag = bag.with_target(target, class.as_ref());
        trace!(target_id = %target.id, role = %target.role, "collected target");
    }
    Ok(bag)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::{Group, Protocol};
    use std::collections::HashMap;
    use std::net::Ipv4Addr;
    use strum::IntoEnumIterator;

    fn target(id: i64, role: TargetRole, class: Option<i64>, mac: Option<&str>) -> Target {
        Target {
            id: EntityId::new(id),
            policy_id: EntityId::new(1),
            role,
            class_id: class.map(EntityId::new),
            mac: mac.map(|m| MacAddress::parse(m).unwrap()),
        }
    }

    fn classes() -> HashMap<EntityId, TrafficClass> {
        let web = TrafficClass::new(1, "web")
            .with_subnet(
                Cidr::new(Ipv4Addr::new(10, 0, 0, 0), 8).unwrap(),
                Group::Outside,
            )
            .with_port(80, Protocol::Tcp, Group::Outside)
            .with_port(443, Protocol::Any, Group::Outside);
        let lan = TrafficClass::new(2, "lan").with_subnet(
            Cidr::new(Ipv4Addr::new(192, 168, 0, 0), 24).unwrap(),
            Group::Inside,
        );
        [(web.id, web), (lan.id, lan)].into_iter().collect()
    }

    fn lookup(
        classes: &HashMap<EntityId, TrafficClass>,
    ) -> impl FnMut(&EntityId) -> Result<TrafficClass, CoreError> + '_ {
        move |id: &EntityId| {
            classes
                .get(id)
                .cloned()
                .ok_or_else(|| CoreError::not_found("traffic class", id))
        }
    }

    #[test]
    fn every_kind_starts_empty() {
        let bag = ParameterBag::new();
        for kind in ParamKind::iter() {
            assert!(bag.values(kind).is_empty(), "{kind} should start empty");
        }
    }

    #[test]
    fn class_values_follow_target_role() {
        let classes = classes();
        let targets = vec![
            target(1, TargetRole::Destination, Some(1), None),
            target(2, TargetRole::Source, Some(2), None),
        ];
        let bag = collect(&targets, lookup(&classes)).unwrap();

        assert_eq!(bag.values(ParamKind::DestinationIp), vec!["10.0.0.0/8"]);
        assert_eq!(bag.values(ParamKind::SourceIp), vec!["192.168.0.0/24"]);
        assert_eq!(bag.values(ParamKind::TcpDestinationPort), vec!["80", "443"]);
        assert_eq!(bag.values(ParamKind::UdpDestinationPort), vec!["443"]);
        assert!(bag.values(ParamKind::TcpSourcePort).is_empty());
    }

    #[test]
    fn mac_is_collected_for_any_role() {
        let targets = vec![
            target(1, TargetRole::Source, None, Some("00:00:00:00:00:01")),
            target(2, TargetRole::Destination, None, Some("00:00:00:00:00:02")),
        ];
        let bag = collect(&targets, |_| unreachable!("no class lookups")).unwrap();
        assert_eq!(
            bag.values(ParamKind::Mac),
            vec!["00:00:00:00:00:01", "00:00:00:00:00:02"]
        );
    }

    #[test]
    fn merge_order_does_not_matter() {
        let classes = classes();
        let forward = vec![
            target(1, TargetRole::Destination, Some(1), Some("aa:aa:aa:aa:aa:aa")),
            target(2, TargetRole::Destination, Some(2), None),
        ];
        let mut backward = forward.clone();
        backward.reverse();
        assert_eq!(
            collect(&forward, lookup(&classes)).unwrap(),
            collect(&backward, lookup(&classes)).unwrap()
        );
    }

    #[test]
    fn missing_class_fails_collection() {
        let classes = classes();
        let targets = vec![target(1, TargetRole::Source, Some(99), None)];
        let err = collect(&targets, lookup(&classes)).unwrap_err();
        assert!(matches!(err, CoreError::NotFound { .. }));
    }
}
