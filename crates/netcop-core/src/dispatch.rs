// ── Dispatcher ──
//
// Decides whether the packet filter needs new rules, compiles every active
// policy, renders the script and hands it to the runner. Each cycle either
// applies a complete script or fails as a whole.

use std::collections::BTreeSet;

use chrono::{Local, NaiveDateTime};
use serde::Serialize;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::DispatchConfig;
use crate::error::CoreError;
use crate::model::{EntityId, Policy};
use crate::render::{CompiledPolicy, DispatchPlan, Renderer, ShellScriptRenderer};
use crate::runner::{ScriptRunner, ShellRunner};
use crate::store::{self, PolicyStore};

// ── Decision ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DispatchState {
    /// No script was ever written.
    NoPriorDispatch,
    /// The applied rules are still current.
    Idle,
    /// The active policy set moved since the last dispatch.
    DispatchNeeded,
}

impl DispatchState {
    pub fn needs_dispatch(self) -> bool {
        matches!(self, Self::NoPriorDispatch | Self::DispatchNeeded)
    }
}

/// Dispatch is needed when nothing was dispatched yet, or when schedules
/// exist and they changed which policies are active.
pub fn decide(
    last_dispatch: Option<NaiveDateTime>,
    has_temporal_rules: bool,
    policy_set_changed: bool,
) -> DispatchState {
    match last_dispatch {
        None => DispatchState::NoPriorDispatch,
        Some(_) if has_temporal_rules && policy_set_changed => DispatchState::DispatchNeeded,
        Some(_) => DispatchState::Idle,
    }
}

/// True when any policy id is in exactly one of the two sets.
pub fn policy_set_changed(previous: &BTreeSet<EntityId>, current: &BTreeSet<EntityId>) -> bool {
    previous.symmetric_difference(current).next().is_some()
}

fn ids(policies: &[Policy]) -> BTreeSet<EntityId> {
    policies.iter().map(|p| p.id).collect()
}

/// Inputs and result of one dispatch decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DispatchStatus {
    pub last_dispatch: Option<NaiveDateTime>,
    pub has_temporal_rules: bool,
    /// Only evaluated when there is a prior dispatch and temporal rules exist.
    pub policy_set_changed: Option<bool>,
    pub state: DispatchState,
}

/// What a cycle did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DispatchOutcome {
    Skipped { state: DispatchState },
    Applied { policies: usize, rules: usize },
}

// ── Compilation ─────────────────────────────────────────────────────

/// Compile `policies` in the given order.
///
/// A policy whose targets reference missing or invalid data is skipped
/// with a warning. Any other store failure aborts.
pub fn compile_policies<S>(store: &S, policies: Vec<Policy>) -> Result<Vec<CompiledPolicy>, CoreError>
where
    S: PolicyStore + ?Sized,
{
    let mut compiled = Vec::with_capacity(policies.len());
    for policy in policies {
        let bag = match store::parameter_bag(store, policy.id) {
            Ok(bag) => bag,
            Err(e @ (CoreError::NotFound { .. } | CoreError::InvalidData { .. })) => {
                warn!(policy = %policy.id, name = %policy.name, error = %e, "skipping policy");
                continue;
            }
            Err(e) => return Err(e),
        };
        let policy = CompiledPolicy::compile(policy, &bag);
        debug!(
            policy = %policy.policy.id,
            rules = policy.rules.len(),
            originals = policy.originals,
            "compiled policy"
        );
        compiled.push(policy);
    }
    Ok(compiled)
}

// ── Dispatcher ──────────────────────────────────────────────────────

pub struct Dispatcher<R = ShellScriptRenderer, X = ShellRunner> {
    config: DispatchConfig,
    renderer: R,
    runner: X,
}

impl Dispatcher {
    /// Shell renderer and runner built from `config`.
    pub fn new(config: DispatchConfig) -> Self {
        let runner = ShellRunner::from_config(&config);
        Self::with_parts(config, ShellScriptRenderer, runner)
    }
}

impl<R: Renderer, X: ScriptRunner> Dispatcher<R, X> {
    pub fn with_parts(config: DispatchConfig, renderer: R, runner: X) -> Self {
        Self {
            config,
            renderer,
            runner,
        }
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    pub fn runner(&self) -> &X {
        &self.runner
    }

    /// Gather the decision inputs at `now`.
    pub fn status<S>(&self, store: &S, now: NaiveDateTime) -> Result<DispatchStatus, CoreError>
    where
        S: PolicyStore + ?Sized,
    {
        let last_dispatch = self.runner.last_dispatch()?;
        let has_temporal_rules = store.has_time_windows()?;

        let changed = match last_dispatch {
            Some(last) if has_temporal_rules => {
                let previous = ids(&store::active_policies(store, last)?);
                let current = ids(&store::active_policies(store, now)?);
                Some(policy_set_changed(&previous, &current))
            }
            _ => None,
        };

        Ok(DispatchStatus {
            last_dispatch,
            has_temporal_rules,
            policy_set_changed: changed,
            state: decide(last_dispatch, has_temporal_rules, changed.unwrap_or(false)),
        })
    }

    pub fn evaluate<S>(&self, store: &S, now: NaiveDateTime) -> Result<DispatchState, CoreError>
    where
        S: PolicyStore + ?Sized,
    {
        Ok(self.status(store, now)?.state)
    }

    /// Compile every policy active at `at`, in listing order.
    pub fn plan<S>(&self, store: &S, at: NaiveDateTime) -> Result<DispatchPlan, CoreError>
    where
        S: PolicyStore + ?Sized,
    {
        let active = store::active_policies(store, at)?;
        Ok(DispatchPlan {
            interfaces: self.config.interfaces.clone(),
            generated_at: at,
            policies: compile_policies(store, active)?,
        })
    }

    /// Render the script for `at` without applying it.
    pub fn preview<S>(&self, store: &S, at: NaiveDateTime) -> Result<String, CoreError>
    where
        S: PolicyStore + ?Sized,
    {
        Ok(self.renderer.render(&self.plan(store, at)?))
    }

    /// Run one cycle. `force` applies regardless of the decision.
    pub async fn run_cycle<S>(
        &self,
        store: &S,
        now: NaiveDateTime,
        force: bool,
    ) -> Result<DispatchOutcome, CoreError>
    where
        S: PolicyStore + ?Sized,
    {
        if !force {
            let state = self.evaluate(store, now)?;
            if !state.needs_dispatch() {
                debug!(%state, "nothing to dispatch");
                return Ok(DispatchOutcome::Skipped { state });
            }
        }

        let plan = self.plan(store, now)?;
        let script = self.renderer.render(&plan);
        self.runner.apply(&script).await?;

        let outcome = DispatchOutcome::Applied {
            policies: plan.policies.len(),
            rules: plan.rule_count(),
        };
        info!(
            policies = plan.policies.len(),
            rules = plan.rule_count(),
            high_priority = plan.high_priority_count(),
            "policies dispatched"
        );
        Ok(outcome)
    }

    /// Run a cycle every configured interval until `cancel` fires.
    ///
    /// `load` is called on every tick so catalog edits are picked up. A
    /// failing tick is logged and the loop carries on.
    pub async fn watch<S, F>(&self, mut load: F, cancel: CancellationToken)
    where
        S: PolicyStore,
        F: FnMut() -> Result<S, CoreError>,
    {
        let mut interval = tokio::time::interval(self.config.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(interval_secs = self.config.interval.as_secs(), "watching policies");

        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    debug!("watch cancelled");
                    break;
                }
                _ = interval.tick() => {
                    let now = Local::now().naive_local();
                    let result = match load() {
                        Ok(store) => self.run_cycle(&store, now, false).await,
                        Err(e) => Err(e),
                    };
                    if let Err(e) = result {
                        warn!(error = %e, "dispatch cycle failed");
                    }
                }
            }
        }
    }
}
