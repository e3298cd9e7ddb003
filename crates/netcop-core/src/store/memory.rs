// ── In-memory policy store ──

use std::collections::{BTreeMap, HashMap};

use super::PolicyStore;
use crate::error::CoreError;
use crate::model::{EntityId, Policy, Target, TrafficClass};

/// A fully materialized store. Produced by catalog conversion and used
/// directly in tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    policies: Vec<Policy>,
    targets: HashMap<EntityId, Vec<Target>>,
    classes: BTreeMap<EntityId, TrafficClass>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a policy. Replaces an existing policy with the same id in place.
    pub fn with_policy(mut self, policy: Policy) -> Self {
        self.insert_policy(policy);
        self
    }

    pub fn with_target(mut self, target: Target) -> Self {
        self.insert_target(target);
        self
    }

    pub fn with_class(mut self, class: TrafficClass) -> Self {
        self.insert_class(class);
        self
    }

    pub fn insert_policy(&mut self, policy: Policy) {
        match self.policies.iter_mut().find(|p| p.id == policy.id) {
            Some(existing) => *existing = policy,
            None => self.policies.push(policy),
        }
    }

    pub fn insert_target(&mut self, target: Target) {
        self.targets.entry(target.policy_id).or_default().push(target);
    }

    pub fn insert_class(&mut self, class: TrafficClass) {
        self.classes.insert(class.id, class);
    }

    pub fn policy_count(&self) -> usize {
        self.policies.len()
    }

    /// Known traffic classes, ordered by id.
    pub fn classes(&self) -> impl Iterator<Item = &TrafficClass> {
        self.classes.values()
    }
}

impl PolicyStore for MemoryStore {
    fn policies(&self) -> Result<Vec<Policy>, CoreError> {
        Ok(self.policies.clone())
    }

    fn targets(&self, policy_id: EntityId) -> Result<Vec<Target>, CoreError> {
        Ok(self.targets.get(&policy_id).cloned().unwrap_or_default())
    }

    fn traffic_class(&self, class_id: EntityId) -> Result<TrafficClass, CoreError> {
        self.classes
            .get(&class_id)
            .cloned()
            .ok_or_else(|| CoreError::not_found("traffic class", class_id))
    }
}
