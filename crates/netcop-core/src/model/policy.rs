// ── Policy domain types ──

use chrono::{Datelike, NaiveDateTime, NaiveTime, Weekday};
use serde::Serialize;

use super::entity_id::{EntityId, MacAddress};

/// Priority tier. Lower numeric value means higher priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Priority {
    High,
    Normal,
    Low,
}

impl Priority {
    /// Numeric tier as stored (1, 3 or 7).
    pub fn value(self) -> u8 {
        match self {
            Self::High => 1,
            Self::Normal => 3,
            Self::Low => 7,
        }
    }

    pub fn from_value(value: i64) -> Option<Self> {
        match value {
            1 => Some(Self::High),
            3 => Some(Self::Normal),
            7 => Some(Self::Low),
            _ => None,
        }
    }
}

/// Whether a target describes the source or destination side of a flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TargetRole {
    Source,
    Destination,
}

/// An endpoint specification attached to a policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Target {
    pub id: EntityId,
    pub policy_id: EntityId,
    pub role: TargetRole,
    pub class_id: Option<EntityId>,
    /// Contributes to the policy's MAC set whatever the role.
    pub mac: Option<MacAddress>,
}

// ── TimeWindow ──────────────────────────────────────────────────────

/// Weekly time range during which a policy is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeWindow {
    pub weekday: Weekday,
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl TimeWindow {
    /// Build a window. `start` may equal `end` (an empty window) but not exceed it.
    pub fn new(weekday: Weekday, start: NaiveTime, end: NaiveTime) -> Result<Self, String> {
        if start > end {
            return Err(format!("window starts at {start} but ends at {end}"));
        }
        Ok(Self {
            weekday,
            start,
            end,
        })
    }

    /// Half-open containment: same weekday and `start <= time < end`.
    pub fn contains(&self, at: NaiveDateTime) -> bool {
        let time = at.time();
        at.weekday() == self.weekday && self.start <= time && time < self.end
    }
}

/// Map the store's Sunday-based weekday index (0 = Sunday .. 6 = Saturday).
pub fn weekday_from_sunday(index: i64) -> Option<Weekday> {
    match index {
        0 => Some(Weekday::Sun),
        1 => Some(Weekday::Mon),
        2 => Some(Weekday::Tue),
        3 => Some(Weekday::Wed),
        4 => Some(Weekday::Thu),
        5 => Some(Weekday::Fri),
        6 => Some(Weekday::Sat),
        _ => None,
    }
}

// ── Policy ──────────────────────────────────────────────────────────

/// A user rule producing traffic handling: block, limit or prioritize.
///
/// Targets are fetched separately through the store; windows travel with
/// the policy because schedule evaluation needs nothing else.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Policy {
    pub id: EntityId,
    pub name: String,
    pub description: Option<String>,
    pub enabled: bool,
    pub priority: Option<Priority>,
    /// Upload cap in kbit/s.
    pub upload_kbps: Option<u32>,
    /// Download cap in kbit/s.
    pub download_kbps: Option<u32>,
    pub windows: Vec<TimeWindow>,
}

impl Policy {
    /// An enabled, unconditional policy with no caps, priority or windows.
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        Self {
            id: EntityId::new(id),
            name: name.into(),
            description: None,
            enabled: true,
            priority: None,
            upload_kbps: None,
            download_kbps: None,
            windows: Vec::new(),
        }
    }

    pub fn has_windows(&self) -> bool {
        !self.windows.is_empty()
    }

    /// True when the policy only restricts access (no shaping, no priority).
    pub fn is_blocking(&self) -> bool {
        self.upload_kbps.is_none() && self.download_kbps.is_none() && self.priority.is_none()
    }
}
