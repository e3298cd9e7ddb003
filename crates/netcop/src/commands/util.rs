//! Shared helpers for command handlers.

use netcop_core::Policy;

/// Short description of what a policy does to matching traffic.
pub fn action(policy: &Policy) -> String {
    if policy.is_blocking() {
        return "block".into();
    }
    let mut parts = Vec::new();
    if policy.upload_kbps.is_some() || policy.download_kbps.is_some() {
        parts.push("limit".to_string());
    }
    if let Some(priority) = policy.priority {
        parts.push(format!("{priority} priority"));
    }
    parts.join(", ")
}

/// Render a cap, `-` when absent.
pub fn kbps(cap: Option<u32>) -> String {
    cap.map_or_else(|| "-".into(), |v| format!("{v} kbit/s"))
}

pub fn yes_no(flag: bool) -> String {
    if flag { "yes" } else { "no" }.into()
}
