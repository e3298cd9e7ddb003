// netcop-core: policy compilation engine and dispatcher.
//
// Pipeline: store → schedule → decision → params → compiler → render → runner.

pub mod compiler;
pub mod config;
pub mod convert;
pub mod dispatch;
pub mod error;
pub mod model;
pub mod params;
pub mod render;
pub mod resolver;
pub mod rule;
pub mod runner;
pub mod schedule;
pub mod store;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{DEFAULT_SCRIPT_PATH, DispatchConfig, Interfaces};
pub use dispatch::{DispatchOutcome, DispatchState, DispatchStatus, Dispatcher};
pub use error::CoreError;
pub use params::{ParamKind, ParameterBag, Transport};
pub use render::{CompiledPolicy, DispatchPlan, Renderer, ShellScriptRenderer};
pub use rule::{Flag, FlagValue, RuleFlags};
pub use runner::{ScriptRunner, ShellRunner};
pub use store::{MemoryStore, PolicyStore, active_policies, load_catalog};

// Re-export model types at the crate root for ergonomics.
pub use model::{
    Cidr, ClassKind, EntityId, Group, MacAddress, Policy, Port, Priority, Protocol, Target,
    TargetRole, TimeWindow, TrafficClass,
};
