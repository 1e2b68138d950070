use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};

/// A dynamic scalar stored in flags and compared by requirement checks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    String(String),
    Float(f64),
    Int(i64),
    Bool(bool),
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

/// Session-wide mutable context read by applicability checks.
///
/// All three fields are open string enums: the engine only compares them,
/// it never interprets their meaning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldState {
    pub time: String,
    pub weather: String,
    pub danger: String,
}

impl Default for WorldState {
    fn default() -> Self {
        Self {
            time: "morning".to_string(),
            weather: "clear".to_string(),
            danger: "low".to_string(),
        }
    }
}

impl WorldState {
    /// Look up a field by name.
    pub fn get(&self, field: &str) -> Option<&str> {
        match field {
            "time" => Some(&self.time),
            "weather" => Some(&self.weather),
            "danger" => Some(&self.danger),
            _ => None,
        }
    }

    /// Overwrite a named field. Returns false for unknown field names.
    pub fn set(&mut self, field: &str, value: &str) -> bool {
        let slot = match field {
            "time" => &mut self.time,
            "weather" => &mut self.weather,
            "danger" => &mut self.danger,
            _ => return false,
        };
        *slot = value.to_string();
        true
    }
}

/// Everything about a playthrough that is not the player character.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    pub visited_locations: FxHashSet<String>,
    pub completed_quests: FxHashSet<String>,
    /// Ordered item identifiers; duplicates allowed.
    pub inventory: Vec<String>,
    /// NPC id → relationship score, unbounded in both directions.
    pub relationships: FxHashMap<String, i64>,
    pub world: WorldState,
    pub flags: FxHashMap<String, Value>,
}

impl GameState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_item(&self, item: &str) -> bool {
        self.inventory.iter().any(|i| i == item)
    }

    pub fn has_completed(&self, quest: &str) -> bool {
        self.completed_quests.contains(quest)
    }

    pub fn flag(&self, name: &str) -> Option<&Value> {
        self.flags.get(name)
    }

    /// Relationship score with an NPC, zero if never met.
    pub fn relationship(&self, npc_id: &str) -> i64 {
        self.relationships.get(npc_id).copied().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn world_state_defaults() {
        let w = WorldState::default();
        assert_eq!(w.time, "morning");
        assert_eq!(w.weather, "clear");
        assert_eq!(w.danger, "low");
    }

    #[test]
    fn world_state_set_known_and_unknown() {
        let mut w = WorldState::default();
        assert!(w.set("danger", "high"));
        assert_eq!(w.get("danger"), Some("high"));
        assert!(!w.set("moon_phase", "full"));
        assert_eq!(w.get("moon_phase"), None);
    }

    #[test]
    fn relationship_defaults_to_zero() {
        let mut gs = GameState::new();
        assert_eq!(gs.relationship("innkeeper"), 0);
        gs.relationships.insert("innkeeper".to_string(), -12);
        assert_eq!(gs.relationship("innkeeper"), -12);
    }

    #[test]
    fn value_equality() {
        assert_eq!(Value::from(true), Value::Bool(true));
        assert_ne!(Value::from(1), Value::Bool(true));
        assert_eq!(Value::from("x"), Value::String("x".to_string()));
    }
}
