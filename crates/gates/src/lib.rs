//! Gates - Policy gate for the trust-gated control loop
//!
//! "Trust is earned, not given."
//!
//! Each autonomy mode authorizes a fixed set of actions. The sets form a
//! strict inclusion lattice:
//! BLOCK ⊂ SUGGEST_ONLY ⊂ SAFE_ONLY ⊂ FULL_AUTONOMY (the whole vocabulary).

pub mod config;
pub mod gate;

pub use config::PolicyTable;
pub use gate::{Policy, PolicyGate};
