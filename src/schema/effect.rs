use serde::{Deserialize, Serialize};

use super::state::Value;

/// One declarative state change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Effect {
    /// Add a signed delta to a player stat, by authored name.
    StatDelta { stat: String, delta: i64 },
    /// Append every `add` item, then remove one occurrence of each `remove` item.
    InventoryChange {
        #[serde(default)]
        add: Vec<String>,
        #[serde(default)]
        remove: Vec<String>,
    },
    /// Add to the relationship score with an NPC id.
    RelationshipDelta { npc: String, delta: i64 },
    /// Overwrite one world-state field (`time`, `weather`, `danger`).
    WorldStateOverride { field: String, value: String },
    FlagSet { flag: String, value: Value },
    LocationVisited(String),
    QuestCompleted(String),
}

impl Effect {
    /// True if this effect targets the player rather than the game state.
    pub fn touches_player(&self) -> bool {
        matches!(self, Effect::StatDelta { .. })
    }
}

/// An ordered set of effects applied together, attached to a choice or a
/// combat reward.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EffectDescriptor {
    pub effects: Vec<Effect>,
}

impl EffectDescriptor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }

    pub fn stat(mut self, stat: &str, delta: i64) -> Self {
        self.effects.push(Effect::StatDelta {
            stat: stat.to_string(),
            delta,
        });
        self
    }

    pub fn add_items(mut self, items: &[&str]) -> Self {
        self.effects.push(Effect::InventoryChange {
            add: items.iter().map(|s| s.to_string()).collect(),
            remove: Vec::new(),
        });
        self
    }

    pub fn remove_items(mut self, items: &[&str]) -> Self {
        self.effects.push(Effect::InventoryChange {
            add: Vec::new(),
            remove: items.iter().map(|s| s.to_string()).collect(),
        });
        self
    }

    pub fn relationship(mut self, npc: &str, delta: i64) -> Self {
        self.effects.push(Effect::RelationshipDelta {
            npc: npc.to_string(),
            delta,
        });
        self
    }

    pub fn world(mut self, field: &str, value: &str) -> Self {
        self.effects.push(Effect::WorldStateOverride {
            field: field.to_string(),
            value: value.to_string(),
        });
        self
    }

    pub fn flag(mut self, flag: &str, value: impl Into<Value>) -> Self {
        self.effects.push(Effect::FlagSet {
            flag: flag.to_string(),
            value: value.into(),
        });
        self
    }

    pub fn visit(mut self, location: &str) -> Self {
        self.effects
            .push(Effect::LocationVisited(location.to_string()));
        self
    }

    pub fn complete_quest(mut self, quest: &str) -> Self {
        self.effects.push(Effect::QuestCompleted(quest.to_string()));
        self
    }

    /// Items this descriptor adds to the inventory, in order.
    pub fn added_items(&self) -> Vec<&str> {
        self.effects
            .iter()
            .filter_map(|e| match e {
                Effect::InventoryChange { add, .. } => Some(add),
                _ => None,
            })
            .flatten()
            .map(String::as_str)
            .collect()
    }
}
