// NiceType Transform Module
// The substitution engine, its matcher state and the echo guard

pub mod engine;
pub mod guard;
pub mod state;

pub use engine::SubstitutionEngine;
pub use guard::{EchoGuard, Suppression};
pub use state::EngineState;
