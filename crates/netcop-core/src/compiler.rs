// ── Rule compiler ──
//
// Expands a ParameterBag into the classifier rules of one policy. Each stage
// produces fragments that are cartesian-merged into the running rule list;
// mirroring runs last and only for policies that shape download traffic or
// carry a priority tier.

use std::collections::BTreeSet;

use tracing::debug;

use crate::model::{Cidr, Policy, Priority};
use crate::params::{ParameterBag, Transport};
use crate::rule::{Flag, FlagValue, RuleFlags};

/// Source/destination flag pairs swapped when mirroring.
const MIRRORED_PAIRS: [(Flag, Flag); 2] = [
    (Flag::SourceIp, Flag::DestinationIp),
    (Flag::SourcePort, Flag::DestinationPort),
];

/// Compile a parameter bag into an ordered rule list.
///
/// A bag with nothing in it compiles to a single empty rule, which matches
/// every packet.
pub fn compile(
    bag: &ParameterBag,
    priority: Option<Priority>,
    download_kbps: Option<u32>,
) -> Vec<RuleFlags> {
    compile_split(bag, priority, download_kbps).0
}

/// Like [`compile`], also returning how many leading rules are originals.
/// Everything past that index is a mirror.
pub fn compile_split(
    bag: &ParameterBag,
    priority: Option<Priority>,
    download_kbps: Option<u32>,
) -> (Vec<RuleFlags>, usize) {
    let mut rules = vec![RuleFlags::new()];

    rules = cartesian(rules, network_fragments(bag));
    debug!(rules = rules.len(), "network stage");

    rules = cartesian(rules, port_fragments(bag));
    debug!(rules = rules.len(), "port stage");

    rules = cartesian(rules, mac_fragments(bag));
    debug!(rules = rules.len(), "mac stage");

    let originals = rules.len();
    if priority.is_some() || download_kbps.is_some() {
        rules = with_mirrors(rules);
        debug!(rules = rules.len(), "mirror stage");
    }

    (rules, originals)
}

/// Compile using the shaping attributes of `policy`.
pub fn compile_policy(policy: &Policy, bag: &ParameterBag) -> Vec<RuleFlags> {
    compile(bag, policy.priority, policy.download_kbps)
}

/// [`compile_split`] using the shaping attributes of `policy`.
pub fn compile_policy_split(policy: &Policy, bag: &ParameterBag) -> (Vec<RuleFlags>, usize) {
    compile_split(bag, policy.priority, policy.download_kbps)
}

/// Cartesian merge. An empty side is the identity; otherwise every
/// `a.merged(b)` pair in row-major order, `right` winning collisions.
pub fn cartesian(left: Vec<RuleFlags>, right: Vec<RuleFlags>) -> Vec<RuleFlags> {
    if left.is_empty() {
        return right;
    }
    if right.is_empty() {
        return left;
    }
    left.iter()
        .flat_map(|a| right.iter().map(move |b| a.merged(b)))
        .collect()
}

/// Swap source and destination of every IP and port flag. Pairs are handled
/// independently; a flag only moves when present.
pub fn mirror(rule: &RuleFlags) -> RuleFlags {
    let mut mirrored = rule.clone();
    for (source, destination) in MIRRORED_PAIRS {
        mirrored.remove(source);
        mirrored.remove(destination);
    }
    for (source, destination) in MIRRORED_PAIRS {
        if let Some(value) = rule.get(source) {
            mirrored.insert(destination, value.clone());
        }
        if let Some(value) = rule.get(destination) {
            mirrored.insert(source, value.clone());
        }
    }
    mirrored
}

// ── Stages ──────────────────────────────────────────────────────────

fn network_fragments(bag: &ParameterBag) -> Vec<RuleFlags> {
    if bag.networks.is_empty() {
        return Vec::new();
    }
    let join = |set: &BTreeSet<Cidr>| {
        set.iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",")
    };

    let mut fragment = RuleFlags::new();
    if !bag.networks.source.is_empty() {
        fragment.insert(Flag::SourceIp, FlagValue::Text(join(&bag.networks.source)));
    }
    if !bag.networks.destination.is_empty() {
        fragment.insert(
            Flag::DestinationIp,
            FlagValue::Text(join(&bag.networks.destination)),
        );
    }
    vec![fragment]
}

fn port_fragments(bag: &ParameterBag) -> Vec<RuleFlags> {
    let mut fragments = Vec::new();
    for transport in [Transport::Tcp, Transport::Udp] {
        let ports = bag.ports(transport);
        let base = RuleFlags::new().with(Flag::Protocol, FlagValue::Protocol(transport));

        match (ports.source.is_empty(), ports.destination.is_empty()) {
            (true, true) => {}
            (false, true) => fragments.extend(
                ports
                    .source
                    .iter()
                    .map(|p| base.clone().with(Flag::SourcePort, FlagValue::Port(*p))),
            ),
            (true, false) => fragments.extend(
                ports
                    .destination
                    .iter()
                    .map(|p| base.clone().with(Flag::DestinationPort, FlagValue::Port(*p))),
            ),
            (false, false) => {
                for source in &ports.source {
                    for destination in &ports.destination {
                        fragments.push(
                            base.clone()
                                .with(Flag::SourcePort, FlagValue::Port(*source))
                                .with(Flag::DestinationPort, FlagValue::Port(*destination)),
                        );
                    }
                }
            }
        }
    }
    fragments
}

fn mac_fragments(bag: &ParameterBag) -> Vec<RuleFlags> {
    bag.macs
        .iter()
        .map(|mac| {
            RuleFlags::new()
                .with(Flag::MacExtension, FlagValue::Marker)
                .with(Flag::MacSource, FlagValue::Text(mac.to_string()))
        })
        .collect()
}

/// All originals, then the mirror of each original that differs from it.
fn with_mirrors(mut rules: Vec<RuleFlags>) -> Vec<RuleFlags> {
    let mirrors: Vec<RuleFlags> = rules
        .iter()
        .filter_map(|rule| {
            let mirrored = mirror(rule);
            (mirrored != *rule).then_some(mirrored)
        })
        .collect();
    rules.extend(mirrors);
    rules
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::{MacAddress, TargetRole};
    use pretty_assertions::assert_eq;
    use std::net::Ipv4Addr;

    fn mac(s: &str) -> MacAddress {
        MacAddress::parse(s).unwrap()
    }

    fn cidr(a: u8, b: u8, c: u8, d: u8, prefix: u8) -> Cidr {
        Cidr::new(Ipv4Addr::new(a, b, c, d), prefix).unwrap()
    }

    fn lines(rules: &[RuleFlags]) -> Vec<String> {
        rules.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn empty_bag_compiles_to_one_unconditional_rule() {
        let rules = compile(&ParameterBag::new(), None, None);
        assert_eq!(rules, vec![RuleFlags::new()]);

        // An empty rule has nothing to mirror.
        let rules = compile(&ParameterBag::new(), Some(Priority::High), Some(512));
        assert_eq!(rules, vec![RuleFlags::new()]);
    }

    #[test]
    fn one_rule_per_mac() {
        let bag = ParameterBag::new()
            .with_mac(mac("00:00:00:00:00:01"))
            .with_mac(mac("00:00:00:00:00:02"))
            .with_mac(mac("00:00:00:00:00:03"));
        let rules = compile(&bag, None, None);
        assert_eq!(rules.len(), 3);
        for rule in &rules {
            assert_eq!(rule.get(Flag::MacExtension), Some(&FlagValue::Marker));
            assert!(rule.contains(Flag::MacSource));
        }
    }

    #[test]
    fn mac_with_tcp_destination_port() {
        let bag = ParameterBag::new()
            .with_mac(mac("00:00:00:00:00:01"))
            .with_port(Transport::Tcp, TargetRole::Destination, 22);
        let rules = compile(&bag, None, None);
        assert_eq!(rules.len(), 1);
        insta::assert_snapshot!(
            rules[0].to_string(),
            @"-m mac -p tcp --mac-source 00:00:00:00:00:01 --destination-port 22"
        );
    }

    #[test]
    fn download_cap_mirrors_destination_network() {
        let bag = ParameterBag::new().with_network(TargetRole::Destination, cidr(10, 0, 0, 0, 8));
        let rules = compile(&bag, None, Some(1024));
        assert_eq!(
            lines(&rules),
            vec!["--destination 10.0.0.0/8", "--source 10.0.0.0/8"]
        );
    }

    #[test]
    fn priority_alone_triggers_mirroring() {
        let bag = ParameterBag::new().with_network(TargetRole::Source, cidr(10, 0, 0, 0, 8));
        assert_eq!(compile(&bag, Some(Priority::Low), None).len(), 2);
    }

    #[test]
    fn no_mirroring_without_download_cap_or_priority() {
        let bag = ParameterBag::new()
            .with_network(TargetRole::Destination, cidr(10, 0, 0, 0, 8))
            .with_port(Transport::Udp, TargetRole::Source, 53);
        let rules = compile(&bag, None, None);
        assert_eq!(rules.len(), 1);
        assert!(!rules[0].contains(Flag::SourceIp));
    }

    #[test]
    fn tcp_and_udp_fragments_are_concatenated() {
        let bag = ParameterBag::new()
            .with_port(Transport::Tcp, TargetRole::Source, 1)
            .with_port(Transport::Tcp, TargetRole::Source, 2)
            .with_port(Transport::Tcp, TargetRole::Destination, 80)
            .with_port(Transport::Tcp, TargetRole::Destination, 443)
            .with_port(Transport::Udp, TargetRole::Destination, 53);
        let rules = compile(&bag, None, None);
        assert_eq!(
            lines(&rules),
            vec![
                "-p tcp --source-port 1 --destination-port 80",
                "-p tcp --source-port 1 --destination-port 443",
                "-p tcp --source-port 2 --destination-port 80",
                "-p tcp --source-port 2 --destination-port 443",
                "-p udp --destination-port 53",
            ]
        );
    }

    #[test]
    fn rule_count_is_macs_times_port_fragments() {
        let bag = ParameterBag::new()
            .with_mac(mac("00:00:00:00:00:01"))
            .with_mac(mac("00:00:00:00:00:02"))
            .with_network(TargetRole::Source, cidr(192, 168, 0, 0, 24))
            .with_network(TargetRole::Source, cidr(192, 168, 1, 0, 24))
            .with_port(Transport::Tcp, TargetRole::Source, 1000)
            .with_port(Transport::Tcp, TargetRole::Destination, 80)
            .with_port(Transport::Tcp, TargetRole::Destination, 443)
            .with_port(Transport::Tcp, TargetRole::Destination, 8080);
        let rules = compile(&bag, None, None);
        // m × (p × q) with m = 2, p = 1, q = 3
        assert_eq!(rules.len(), 6);
        for rule in &rules {
            assert_eq!(
                rule.get(Flag::SourceIp),
                Some(&FlagValue::Text("192.168.0.0/24,192.168.1.0/24".into()))
            );
        }
    }

    #[test]
    fn mirror_swaps_pairs_independently() {
        let rule = RuleFlags::new()
            .with(Flag::SourceIp, FlagValue::Text("10.0.0.0/8".into()))
            .with(Flag::DestinationPort, FlagValue::Port(80))
            .with(Flag::Protocol, FlagValue::Protocol(Transport::Tcp));
        let mirrored = mirror(&rule);
        insta::assert_snapshot!(
            mirrored.to_string(),
            @"-p tcp --destination 10.0.0.0/8 --source-port 80"
        );
        assert_eq!(mirror(&mirrored), rule);
    }

    #[test]
    fn mirrors_follow_all_originals_and_are_not_remirrored() {
        let bag = ParameterBag::new()
            .with_network(TargetRole::Destination, cidr(10, 0, 0, 0, 8))
            .with_port(Transport::Tcp, TargetRole::Destination, 80)
            .with_port(Transport::Udp, TargetRole::Destination, 53);
        let rules = compile(&bag, Some(Priority::High), None);
        assert_eq!(
            lines(&rules),
            vec![
                "-p tcp --destination 10.0.0.0/8 --destination-port 80",
                "-p udp --destination 10.0.0.0/8 --destination-port 53",
                "-p tcp --source 10.0.0.0/8 --source-port 80",
                "-p udp --source 10.0.0.0/8 --source-port 53",
            ]
        );
    }

    #[test]
    fn split_marks_where_mirrors_start() {
        let bag = ParameterBag::new()
            .with_network(TargetRole::Destination, cidr(10, 0, 0, 0, 8))
            .with_mac(mac("00:00:00:00:00:01"));
        let (rules, originals) = compile_split(&bag, None, Some(1024));
        assert_eq!(originals, 1);
        assert_eq!(
            lines(&rules),
            vec![
                "-m mac --mac-source 00:00:00:00:00:01 --destination 10.0.0.0/8",
                "-m mac --mac-source 00:00:00:00:00:01 --source 10.0.0.0/8",
            ]
        );

        let (rules, originals) = compile_split(&bag, None, None);
        assert_eq!((rules.len(), originals), (1, 1));
    }

    #[test]
    fn symmetric_rule_is_not_duplicated() {
        let bag = ParameterBag::new().with_mac(mac("00:00:00:00:00:01"));
        assert_eq!(compile(&bag, Some(Priority::Normal), Some(64)).len(), 1);
    }

    #[test]
    fn cartesian_identity_and_order() {
        let a = RuleFlags::new().with(Flag::SourcePort, FlagValue::Port(1));
        let b = RuleFlags::new().with(Flag::SourcePort, FlagValue::Port(2));
        let x = RuleFlags::new().with(Flag::DestinationPort, FlagValue::Port(9));

        assert_eq!(cartesian(Vec::new(), vec![x.clone()]), vec![x.clone()]);
        assert_eq!(cartesian(vec![a.clone()], Vec::new()), vec![a.clone()]);

        let merged = cartesian(vec![a.clone(), b.clone()], vec![x.clone()]);
        assert_eq!(merged, vec![a.merged(&x), b.merged(&x)]);

        // right wins collisions
        assert_eq!(cartesian(vec![a], vec![b.clone()]), vec![b]);
    }

    #[test]
    fn compile_policy_uses_policy_shaping() {
        let mut policy = Policy::new(1, "limit");
        policy.download_kbps = Some(256);
        let bag = ParameterBag::new().with_network(TargetRole::Source, cidr(10, 1, 0, 0, 16));
        assert_eq!(compile_policy(&policy, &bag).len(), 2);
    }
}
