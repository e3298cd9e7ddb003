// ── Unified domain model ──
//
// Canonical, validated representations of the policy store's entities.
// Catalog rows are converted into these types by `crate::convert`.

pub mod entity_id;
pub mod policy;
pub mod traffic_class;

// ── Re-exports ──────────────────────────────────────────────────────

// Core identity
pub use entity_id::{EntityId, InvalidMacAddress, MacAddress};

// Traffic classes
pub use traffic_class::{Cidr, ClassKind, ClassPort, ClassSubnet, Group, Port, Protocol, TrafficClass};

// Policies
pub use policy::{Policy, Priority, Target, TargetRole, TimeWindow, weekday_from_sunday};
