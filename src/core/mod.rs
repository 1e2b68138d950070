//! Engines: selection, effects, combat, dialogue, persistence, and the
//! session that drives them.

pub mod catalog;
pub mod combat;
pub mod dialogue;
pub mod effects;
pub mod engine;
pub mod events;
pub mod fallback;
pub mod interpolate;
pub mod notify;
pub mod persistence;
pub mod random;
pub mod selection;
pub mod session;
