//! Adventure Engine — procedural scenes and turn-based combat for
//! single-player branching stories.
//!
//! Chooses and parameterizes authored templates from player state, world
//! state, and prior choices; applies declarative effects; and resolves
//! combat rounds, all driven by one injectable randomness source.

pub mod core;
pub mod schema;
