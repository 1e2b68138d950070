//! Data model: player, game state, effects, templates, scenes, NPCs.

pub mod effect;
pub mod npc;
pub mod player;
pub mod scene;
pub mod state;
pub mod template;
