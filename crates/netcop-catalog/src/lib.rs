// netcop-catalog: Raw records of the netcop policy store.
//
// The catalog is a flat, table-per-entity document (classes, cidrs, ports,
// their associations, policies, targets, time windows). Nothing here is
// validated beyond what serde needs to parse it; `netcop-core` joins the
// tables and rejects malformed rows.

pub mod error;
pub mod format;
pub mod records;

pub use error::Error;
pub use format::Format;
pub use records::{
    Catalog, CidrRecord, ClassCidrRecord, ClassPortRecord, GroupCode, PolicyRecord, PortRecord,
    RoleCode, TargetRecord, TimeWindowRecord, TrafficClassRecord,
};
