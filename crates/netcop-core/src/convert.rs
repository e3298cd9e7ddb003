// ── Catalog-to-domain conversion ──
//
// Joins the raw `netcop_catalog` tables into validated domain values. A
// malformed row never fails the whole load: the class or policy it belongs
// to is dropped with a warning and everything else is kept.

use std::collections::{HashMap, HashSet};
use std::net::Ipv4Addr;

use chrono::NaiveTime;
use tracing::{debug, warn};

use netcop_catalog::{
    Catalog, CidrRecord, GroupCode, PolicyRecord, PortRecord, RoleCode, TargetRecord,
    TimeWindowRecord, TrafficClassRecord,
};

use crate::error::CoreError;
use crate::model::{
    Cidr, ClassKind, EntityId, Group, MacAddress, Policy, Port, Priority, Protocol, Target,
    TargetRole, TimeWindow, TrafficClass, weekday_from_sunday,
};
use crate::store::MemoryStore;

// ── Helpers ────────────────────────────────────────────────────────

fn parse_time(raw: &str) -> Option<NaiveTime> {
    let raw = raw.trim();
    NaiveTime::parse_from_str(raw, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M"))
        .ok()
}

fn group(raw: &str) -> Result<Group, String> {
    raw.parse::<GroupCode>().map(|code| match code {
        GroupCode::Inside => Group::Inside,
        GroupCode::Outside => Group::Outside,
    })
}

/// Caps are kbit/s; zero means "no cap".
fn cap(raw: Option<i64>) -> Result<Option<u32>, String> {
    match raw {
        None | Some(0) => Ok(None),
        Some(value) => u32::try_from(value)
            .map(Some)
            .map_err(|_| format!("cap {value} is out of range")),
    }
}

// ── Leaf rows ──────────────────────────────────────────────────────

fn cidr(record: &CidrRecord) -> Result<Cidr, CoreError> {
    let invalid = |reason: String| CoreError::invalid("cidr", record.id, reason);
    let address: Ipv4Addr = record
        .address
        .trim()
        .parse()
        .map_err(|_| invalid(format!("'{}' is not an IPv4 address", record.address)))?;
    let prefix = u8::try_from(record.prefix)
        .ok()
        .filter(|p| *p <= 32)
        .ok_or_else(|| invalid(format!("prefix {} is outside 0..=32", record.prefix)))?;
    Cidr::new(address, prefix).map_err(|e| invalid(e.to_string()))
}

fn port(record: &PortRecord) -> Result<Port, CoreError> {
    let number = u16::try_from(record.number).map_err(|_| {
        CoreError::invalid("port", record.id, format!("{} is not a port number", record.number))
    })?;
    let protocol = Protocol::from_number(record.protocol).ok_or_else(|| {
        CoreError::invalid(
            "port",
            record.id,
            format!("unsupported protocol {}", record.protocol),
        )
    })?;
    Ok(Port { number, protocol })
}

fn window(record: &TimeWindowRecord) -> Result<TimeWindow, String> {
    let weekday = weekday_from_sunday(record.weekday)
        .ok_or_else(|| format!("window {}: weekday {} is outside 0..=6", record.id, record.weekday))?;
    let start = parse_time(&record.start)
        .ok_or_else(|| format!("window {}: bad start time '{}'", record.id, record.start))?;
    let end = parse_time(&record.end)
        .ok_or_else(|| format!("window {}: bad end time '{}'", record.id, record.end))?;
    TimeWindow::new(weekday, start, end).map_err(|e| format!("window {}: {e}", record.id))
}

// ── Traffic classes ────────────────────────────────────────────────

struct Leaves {
    cidrs: HashMap<i64, Result<Cidr, CoreError>>,
    ports: HashMap<i64, Result<Port, CoreError>>,
}

fn traffic_class(
    record: &TrafficClassRecord,
    catalog: &Catalog,
    leaves: &Leaves,
) -> Result<TrafficClass, CoreError> {
    let invalid = |reason: String| CoreError::invalid("traffic class", record.id, reason);

    let mut class = TrafficClass::new(record.id, record.name.clone());
    class.description.clone_from(&record.description);
    class.enabled = record.enabled;
    class.kind = if record.kind == 0 {
        ClassKind::System
    } else {
        ClassKind::User
    };

    for assoc in catalog.class_cidrs.iter().filter(|a| a.class_id == record.id) {
        let cidr = match leaves.cidrs.get(&assoc.cidr_id) {
            Some(Ok(cidr)) => *cidr,
            Some(Err(e)) => return Err(invalid(e.to_string())),
            None => return Err(invalid(format!("unknown cidr {}", assoc.cidr_id))),
        };
        class = class.with_subnet(cidr, group(&assoc.group).map_err(&invalid)?);
    }

    for assoc in catalog.class_ports.iter().filter(|a| a.class_id == record.id) {
        let port = match leaves.ports.get(&assoc.port_id) {
            Some(Ok(port)) => *port,
            Some(Err(e)) => return Err(invalid(e.to_string())),
            None => return Err(invalid(format!("unknown port {}", assoc.port_id))),
        };
        class = class.with_port(
            port.number,
            port.protocol,
            group(&assoc.group).map_err(&invalid)?,
        );
    }

    Ok(class)
}

// ── Policies ───────────────────────────────────────────────────────

fn target(record: &TargetRecord, valid_classes: &HashSet<i64>) -> Result<Target, String> {
    let role = match record.role.parse::<RoleCode>() {
        Ok(RoleCode::Source) => TargetRole::Source,
        Ok(RoleCode::Destination) => TargetRole::Destination,
        Err(e) => return Err(format!("target {}: {e}", record.id)),
    };
    let mac = record
        .mac
        .as_deref()
        .filter(|m| !m.trim().is_empty())
        .map(MacAddress::parse)
        .transpose()
        .map_err(|e| format!("target {}: {e}", record.id))?;
    if let Some(class_id) = record.class_id {
        if !valid_classes.contains(&class_id) {
            return Err(format!(
                "target {}: traffic class {class_id} is missing or invalid",
                record.id
            ));
        }
    }
    Ok(Target {
        id: EntityId::new(record.id),
        policy_id: EntityId::new(record.policy_id),
        role,
        class_id: record.class_id.map(EntityId::new),
        mac,
    })
}

fn policy(
    record: &PolicyRecord,
    windows: &[&TimeWindowRecord],
    targets: &[&TargetRecord],
    valid_classes: &HashSet<i64>,
) -> Result<(Policy, Vec<Target>), CoreError> {
    let invalid = |reason: String| CoreError::invalid("policy", record.id, reason);

    let mut policy = Policy::new(record.id, record.name.clone());
    policy.description.clone_from(&record.description);
    policy.enabled = record.enabled;
    policy.priority = record
        .priority
        .map(|value| {
            Priority::from_value(value)
                .ok_or_else(|| invalid(format!("priority {value} is not one of 1, 3, 7")))
        })
        .transpose()?;
    policy.upload_kbps = cap(record.upload).map_err(|e| invalid(format!("upload {e}")))?;
    policy.download_kbps = cap(record.download).map_err(|e| invalid(format!("download {e}")))?;
    policy.windows = windows
        .iter()
        .map(|w| window(w))
        .collect::<Result<_, _>>()
        .map_err(&invalid)?;

    let targets = targets
        .iter()
        .map(|t| target(t, valid_classes))
        .collect::<Result<Vec<_>, _>>()
        .map_err(&invalid)?;

    Ok((policy, targets))
}

// ── Entry point ────────────────────────────────────────────────────

/// Convert a catalog into a store, dropping malformed classes and policies.
pub fn into_store(catalog: &Catalog) -> MemoryStore {
    let leaves = Leaves {
        cidrs: catalog.cidrs.iter().map(|r| (r.id, cidr(r))).collect(),
        ports: catalog.ports.iter().map(|r| (r.id, port(r))).collect(),
    };

    let mut store = MemoryStore::new();
    let mut valid_classes = HashSet::new();
    for record in &catalog.traffic_classes {
        match traffic_class(record, catalog, &leaves) {
            Ok(class) => {
                valid_classes.insert(record.id);
                store.insert_class(class);
            }
            Err(e) => warn!(class = record.id, name = %record.name, error = %e, "dropping traffic class"),
        }
    }

    let policy_ids: HashSet<i64> = catalog.policies.iter().map(|p| p.id).collect();
    let mut windows: HashMap<i64, Vec<&TimeWindowRecord>> = HashMap::new();
    for record in &catalog.time_windows {
        if policy_ids.contains(&record.policy_id) {
            windows.entry(record.policy_id).or_default().push(record);
        } else {
            warn!(window = record.id, policy = record.policy_id, "dropping orphan time window");
        }
    }
    let mut targets: HashMap<i64, Vec<&TargetRecord>> = HashMap::new();
    for record in &catalog.targets {
        if policy_ids.contains(&record.policy_id) {
            targets.entry(record.policy_id).or_default().push(record);
        } else {
            warn!(target = record.id, policy = record.policy_id, "dropping orphan target");
        }
    }

    for record in &catalog.policies {
        let result = policy(
            record,
            windows.get(&record.id).map_or(&[][..], Vec::as_slice),
            targets.get(&record.id).map_or(&[][..], Vec::as_slice),
            &valid_classes,
        );
        match result {
            Ok((policy, policy_targets)) => {
                store.insert_policy(policy);
                for target in policy_targets {
                    store.insert_target(target);
                }
            }
            Err(e) => warn!(policy = record.id, name = %record.name, error = %e, "skipping policy"),
        }
    }

    debug!(
        policies = store.policy_count(),
        classes = valid_classes.len(),
        "catalog converted"
    );
    store
}
