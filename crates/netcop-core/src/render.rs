// ── Script rendering ──
//
// Turns a DispatchPlan into the text the script runner executes. The
// default renderer emits a POSIX shell script driving iptables and tc:
// marking happens in dedicated mangle chains, shaping in HTB classes keyed
// by the same mark, and blocking in a dedicated filter chain. Original rules
// mark upload traffic; their mirrors mark download traffic.

use std::collections::BTreeSet;
use std::fmt::Write as _;

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::compiler;
use crate::config::Interfaces;
use crate::model::{EntityId, Policy, Priority};
use crate::params::ParameterBag;
use crate::rule::RuleFlags;

const UPLOAD_CHAIN: &str = "NETCOP_UP";
const DOWNLOAD_CHAIN: &str = "NETCOP_DOWN";
const BLOCK_CHAIN: &str = "NETCOP_BLOCK";

/// Rate given to HTB classes of policies that prioritize without a cap.
const UNCAPPED_RATE: &str = "10gbit";

// ── Plan ────────────────────────────────────────────────────────────

/// One active policy with its compiled rules.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompiledPolicy {
    pub policy: Policy,
    /// Originals first, then mirrors.
    pub rules: Vec<RuleFlags>,
    /// Number of leading `rules` that are originals.
    pub originals: usize,
}

impl CompiledPolicy {
    pub fn compile(policy: Policy, bag: &ParameterBag) -> Self {
        let (rules, originals) = compiler::compile_policy_split(&policy, bag);
        Self {
            policy,
            rules,
            originals,
        }
    }

    /// Rules as compiled, matching traffic leaving through the outside
    /// interface.
    pub fn upload_rules(&self) -> &[RuleFlags] {
        &self.rules[..self.originals.min(self.rules.len())]
    }

    /// One rule per original with source and destination swapped. A rule
    /// with nothing to swap matches as is.
    pub fn download_rules(&self) -> Vec<RuleFlags> {
        self.upload_rules().iter().map(compiler::mirror).collect()
    }
}

/// Everything a renderer needs for one dispatch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DispatchPlan {
    pub interfaces: Interfaces,
    pub generated_at: NaiveDateTime,
    /// Active policies in listing order.
    pub policies: Vec<CompiledPolicy>,
}

impl DispatchPlan {
    pub fn high_priority_count(&self) -> usize {
        self.policies
            .iter()
            .filter(|c| c.policy.priority == Some(Priority::High))
            .count()
    }

    pub fn rule_count(&self) -> usize {
        self.policies.iter().map(|c| c.rules.len()).sum()
    }

    pub fn policy_ids(&self) -> BTreeSet<EntityId> {
        self.policies.iter().map(|c| c.policy.id).collect()
    }
}

/// Produces the script text for a plan.
pub trait Renderer {
    fn render(&self, plan: &DispatchPlan) -> String;
}

// ── Shell script renderer ───────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default)]
pub struct ShellScriptRenderer;

impl Renderer for ShellScriptRenderer {
    fn render(&self, plan: &DispatchPlan) -> String {
        let mut out = String::new();
        header(&mut out, plan);
        reset(&mut out);
        for (index, compiled) in plan.policies.iter().enumerate() {
            policy_section(&mut out, index + 1, compiled);
        }
        out
    }
}

fn header(out: &mut String, plan: &DispatchPlan) {
    out.push_str("#!/bin/sh\n");
    let _ = writeln!(
        out,
        "# Generated by netcop at {}. Rewritten on every dispatch.",
        plan.generated_at.format("%Y-%m-%d %H:%M:%S")
    );
    out.push_str("set -e\n\n");
    let _ = writeln!(out, "OUTSIDE={}", shell_word(&plan.interfaces.outside));
    let _ = writeln!(out, "INSIDE={}", shell_word(&plan.interfaces.inside));
    let _ = writeln!(out, "HIGH_PRIORITY_POLICIES={}", plan.high_priority_count());
    out.push('\n');
}

fn reset(out: &mut String) {
    out.push_str("# Marking and blocking chains\n");
    for (table, chain, hook) in [
        ("mangle", UPLOAD_CHAIN, "FORWARD -o \"$OUTSIDE\""),
        ("mangle", DOWNLOAD_CHAIN, "FORWARD -o \"$INSIDE\""),
        ("filter", BLOCK_CHAIN, "FORWARD"),
    ] {
        let _ = writeln!(out, "iptables -t {table} -N {chain} 2>/dev/null || true");
        let _ = writeln!(out, "iptables -t {table} -F {chain}");
        let _ = writeln!(
            out,
            "iptables -t {table} -D {hook} -j {chain} 2>/dev/null || true"
        );
        let _ = writeln!(out, "iptables -t {table} -A {hook} -j {chain}");
    }

    out.push_str("\n# Root qdiscs\n");
    for dev in ["\"$OUTSIDE\"", "\"$INSIDE\""] {
        let _ = writeln!(out, "tc qdisc del dev {dev} root 2>/dev/null || true");
        let _ = writeln!(out, "tc qdisc add dev {dev} root handle 1: htb");
    }
}

fn policy_section(out: &mut String, index: usize, compiled: &CompiledPolicy) {
    let policy = &compiled.policy;
    let _ = writeln!(
        out,
        "\n# Policy {index}: {} (id {})",
        policy.name.replace(['\n', '\r'], " "),
        policy.id
    );

    if policy.is_blocking() {
        for rule in &compiled.rules {
            let _ = writeln!(out, "iptables -t filter -A {BLOCK_CHAIN}{} -j DROP", args(rule));
        }
        return;
    }

    let prio = policy
        .priority
        .map(|p| format!(" prio {}", p.value()))
        .unwrap_or_default();
    let download = compiled.download_rules();
    let directions = [
        ("\"$OUTSIDE\"", UPLOAD_CHAIN, policy.upload_kbps, compiled.upload_rules()),
        ("\"$INSIDE\"", DOWNLOAD_CHAIN, policy.download_kbps, download.as_slice()),
    ];
    for (dev, chain, cap, rules) in directions {
        // A prioritized policy gets classes in both directions.
        if cap.is_none() && policy.priority.is_none() {
            continue;
        }
        let rate = cap.map_or_else(|| UNCAPPED_RATE.to_owned(), |kbps| format!("{kbps}kbit"));
        let _ = writeln!(
            out,
            "tc class add dev {dev} parent 1: classid 1:{index:x} htb rate {rate}{prio}"
        );
        for rule in rules {
            let _ = writeln!(
                out,
                "iptables -t mangle -A {chain}{} -j MARK --set-mark 0x{index:x}",
                args(rule)
            );
        }
        let _ = writeln!(
            out,
            "tc filter add dev {dev} parent 1: protocol ip handle 0x{index:x} fw flowid 1:{index:x}"
        );
    }
}

/// Rule arguments with a leading space, or nothing for an empty rule.
fn args(rule: &RuleFlags) -> String {
    rule.to_args()
        .iter()
        .map(|arg| format!(" {}", shell_word(arg)))
        .collect()
}

/// Quote a word for the shell unless it only holds safe characters.
fn shell_word(word: &str) -> String {
    let safe = !word.is_empty()
        && word.chars().all(|c| {
            c.is_ascii_alphanumeric()
                || matches!(c, '-' | '_' | '.' | '/' | ':' | ',' | '+' | '@')
        });
    if safe {
        word.to_owned()
    } else {
        format!("'{}'", word.replace('\'', r"'\''"))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::{Cidr, MacAddress, TargetRole};
    use crate::params::Transport;
    use crate::rule::{Flag, FlagValue};
    use chrono::NaiveDate;
    use std::net::Ipv4Addr;

    fn plan(policies: Vec<CompiledPolicy>) -> DispatchPlan {
        DispatchPlan {
            interfaces: Interfaces::default(),
            generated_at: NaiveDate::from_ymd_opt(2024, 1, 2)
                .unwrap()
                .and_hms_opt(10, 0, 0)
                .unwrap(),
            policies,
        }
    }

    /// A policy whose rules were never mirrored.
    fn compiled(policy: Policy, rules: Vec<RuleFlags>) -> CompiledPolicy {
        let originals = rules.len();
        CompiledPolicy {
            policy,
            rules,
            originals,
        }
    }

    fn ssh_rule() -> RuleFlags {
        RuleFlags::new()
            .with(Flag::Protocol, FlagValue::Protocol(Transport::Tcp))
            .with(Flag::DestinationPort, FlagValue::Port(22))
    }

    #[test]
    fn blocking_policy_renders_drop_rules() {
        let script = ShellScriptRenderer.render(&plan(vec![compiled(
            Policy::new(5, "no ssh"),
            vec![ssh_rule()],
        )]));
        assert!(script.starts_with("#!/bin/sh\n"));
        assert!(script.contains("# Policy 1: no ssh (id 5)"));
        assert!(script.contains("iptables -t filter -A NETCOP_BLOCK -p tcp --destination-port 22 -j DROP"));
        assert!(!script.contains("tc class add"));
    }

    #[test]
    fn unconditional_block_drops_everything() {
        let script = ShellScriptRenderer.render(&plan(vec![compiled(
            Policy::new(1, "lockdown"),
            vec![RuleFlags::new()],
        )]));
        assert!(script.contains("iptables -t filter -A NETCOP_BLOCK -j DROP\n"));
    }

    #[test]
    fn upload_cap_shapes_outside_only() {
        let mut policy = Policy::new(1, "slow upload");
        policy.upload_kbps = Some(512);
        let script = ShellScriptRenderer.render(&plan(vec![compiled(policy, vec![ssh_rule()])]));
        assert!(script.contains("tc class add dev \"$OUTSIDE\" parent 1: classid 1:1 htb rate 512kbit\n"));
        assert!(script.contains(
            "iptables -t mangle -A NETCOP_UP -p tcp --destination-port 22 -j MARK --set-mark 0x1"
        ));
        assert!(script.contains("handle 0x1 fw flowid 1:1"));
        assert!(!script.contains("-A NETCOP_DOWN"));
    }

    #[test]
    fn priority_without_cap_shapes_both_directions() {
        let mut policy = Policy::new(1, "voip");
        policy.priority = Some(Priority::High);
        let script =
            ShellScriptRenderer.render(&plan(vec![compiled(policy, vec![RuleFlags::new()])]));
        assert!(script.contains("HIGH_PRIORITY_POLICIES=1"));
        assert!(script.contains("dev \"$OUTSIDE\" parent 1: classid 1:1 htb rate 10gbit prio 1"));
        assert!(script.contains("dev \"$INSIDE\" parent 1: classid 1:1 htb rate 10gbit prio 1"));
        assert!(script.contains("iptables -t mangle -A NETCOP_DOWN -j MARK --set-mark 0x1"));
    }

    #[test]
    fn originals_mark_upload_and_mirrors_mark_download() {
        let mut policy = Policy::new(1, "web");
        policy.upload_kbps = Some(256);
        policy.download_kbps = Some(1024);
        let ten = Cidr::new(Ipv4Addr::new(10, 0, 0, 0), 8).unwrap();
        let bag = ParameterBag::new()
            .with_network(TargetRole::Destination, ten)
            .with_mac(MacAddress::parse("00:00:00:00:00:01").unwrap());
        let policy = CompiledPolicy::compile(policy, &bag);
        assert_eq!((policy.rules.len(), policy.originals), (2, 1));

        let script = ShellScriptRenderer.render(&plan(vec![policy]));
        let marks = |chain: &str| -> Vec<&str> {
            script
                .lines()
                .filter(|l| l.starts_with(&format!("iptables -t mangle -A {chain} ")))
                .collect()
        };
        assert_eq!(
            marks("NETCOP_UP"),
            vec![
                "iptables -t mangle -A NETCOP_UP -m mac --mac-source 00:00:00:00:00:01 --destination 10.0.0.0/8 -j MARK --set-mark 0x1"
            ]
        );
        assert_eq!(
            marks("NETCOP_DOWN"),
            vec![
                "iptables -t mangle -A NETCOP_DOWN -m mac --mac-source 00:00:00:00:00:01 --source 10.0.0.0/8 -j MARK --set-mark 0x1"
            ]
        );
    }

    #[test]
    fn symmetric_rule_marks_both_directions() {
        let mut policy = Policy::new(1, "laptop");
        policy.download_kbps = Some(128);
        policy.priority = Some(Priority::Low);
        let bag = ParameterBag::new().with_mac(MacAddress::parse("00:00:00:00:00:02").unwrap());
        let script =
            ShellScriptRenderer.render(&plan(vec![CompiledPolicy::compile(policy, &bag)]));
        for chain in ["NETCOP_UP", "NETCOP_DOWN"] {
            assert!(script.contains(&format!(
                "-A {chain} -m mac --mac-source 00:00:00:00:00:02 -j MARK --set-mark 0x1"
            )));
        }
    }

    #[test]
    fn class_ids_are_hexadecimal() {
        let policies = (1..=10_i64)
            .map(|id| {
                let mut policy = Policy::new(id, format!("p{id}"));
                policy.download_kbps = Some(100);
                compiled(policy, vec![RuleFlags::new()])
            })
            .collect();
        let script = ShellScriptRenderer.render(&plan(policies));
        assert!(script.contains("classid 1:a htb rate 100kbit"));
        assert!(script.contains("--set-mark 0xa"));
    }

    #[test]
    fn mark_chains_hang_off_forward() {
        let script = ShellScriptRenderer.render(&plan(Vec::new()));
        assert!(script.contains("OUTSIDE=eth0\nINSIDE=eth1\n"));
        assert!(script.contains("iptables -t mangle -A FORWARD -o \"$OUTSIDE\" -j NETCOP_UP"));
        assert!(script.contains("iptables -t mangle -A FORWARD -o \"$INSIDE\" -j NETCOP_DOWN"));
        assert!(!script.contains("POSTROUTING"));
        assert!(script.contains("iptables -t filter -A FORWARD -j NETCOP_BLOCK"));
        assert!(script.contains("tc qdisc add dev \"$INSIDE\" root handle 1: htb"));
    }

    #[test]
    fn shell_words_are_quoted_when_needed() {
        assert_eq!(shell_word("10.0.0.0/8,10.1.0.0/16"), "10.0.0.0/8,10.1.0.0/16");
        assert_eq!(shell_word("a b"), "'a b'");
        assert_eq!(shell_word("it's"), r"'it'\''s'");
        assert_eq!(shell_word(""), "''");
    }

    #[test]
    fn plan_counts() {
        let mut high = Policy::new(1, "high");
        high.priority = Some(Priority::High);
        let plan = plan(vec![
            compiled(high, vec![RuleFlags::new(), ssh_rule()]),
            compiled(Policy::new(2, "block"), vec![ssh_rule()]),
        ]);
        assert_eq!(plan.high_priority_count(), 1);
        assert_eq!(plan.rule_count(), 3);
        assert_eq!(plan.policy_ids().len(), 2);
    }
}
