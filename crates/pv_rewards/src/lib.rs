//! pv_rewards — reward bookkeeping, approval policies and lifecycle
//! signals for PlayVault.
//!
//! # Module layout
//! - `time_strategy` — how often a repeatable action may be approved
//! - `reward`        — per-reward state persisted through the store facade
//! - `events`        — fire-and-forget notifications of state changes
//! - `foreground`    — debounced foreground/background tracking

pub mod events;
pub mod foreground;
pub mod reward;
pub mod time_strategy;

pub use events::{EventBus, NullBus, RecordingBus, StateEvent};
pub use foreground::Foreground;
pub use reward::RewardStorage;
pub use time_strategy::{StrategyKind, TimeStrategy};
