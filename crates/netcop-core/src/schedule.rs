// ── Schedule evaluation ──

use chrono::NaiveDateTime;

use crate::model::Policy;

/// Whether `policy` is in effect at `at`.
///
/// Disabled policies never are. A policy without windows always is;
/// otherwise at least one window must contain `at`.
pub fn is_active(policy: &Policy, at: NaiveDateTime) -> bool {
    if !policy.enabled {
        return false;
    }
    if !policy.has_windows() {
        return true;
    }
    policy.windows.iter().any(|window| window.contains(at))
}
