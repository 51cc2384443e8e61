//! cmp-consent
//!
//! Consent state reconciliation engine.
//!
//! Architectural decisions:
//! - One enabled-id set per (entity type, legal basis) group; groups never share state
//! - Precedence: explicit action > global opt-out signal > current prior > default
//! - A prior made against another history id is surfaced as outdated, never reused
//! - Notice-only records are always enabled and never toggled
//! - Unknown ids are dropped, never propagated
//!
//! Deterministic, pure logic. No IO, no wall-clock. Callers supply `now` and
//! the sampled signal.

mod catalog;
mod engine;
mod enabled;
mod reducer;
mod resolver;
mod signal;
mod staleness;

pub use catalog::{CatalogOptions, ConsentRecord, RecordCatalog, RecordGroup};
pub use enabled::{ConsentState, EnabledIdSet};
pub use engine::{ConsentEngine, EngineOptions, Transition};
pub use reducer::{reduce, ConsentAction, Reduction};
pub use resolver::{resolve_defaults, PreferenceOrigin, Resolution, ResolvedRecord};
pub use signal::{SignalDetector, SignalState, SignalUnavailable, StaticSignal};
pub use staleness::{detect_staleness, Staleness};
