use serde::{Deserialize, Serialize};

use super::effect::EffectDescriptor;

/// How an NPC regards the player by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Disposition {
    Friendly,
    #[default]
    Neutral,
    Hostile,
}

/// Combat-relevant stat block of an NPC.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NpcStats {
    pub health: i64,
    pub strength: i64,
    pub defense: i64,
    pub intelligence: i64,
    pub resistance: i64,
    pub charisma: i64,
}

impl Default for NpcStats {
    fn default() -> Self {
        Self {
            health: 50,
            strength: 5,
            defense: 3,
            intelligence: 5,
            resistance: 3,
            charisma: 5,
        }
    }
}

/// Lines an NPC can say, grouped by conversational register.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DialogueLines {
    pub greeting: Vec<String>,
    pub friendly: Vec<String>,
    pub neutral: Vec<String>,
    pub hostile: Vec<String>,
    pub farewell: Vec<String>,
}

/// What defeating an NPC yields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Reward {
    /// Experience granted through the stat-modification contract.
    pub experience: i64,
    pub effects: EffectDescriptor,
}

/// An authored NPC record. Scenes carry clones of these as characters, and
/// combat uses hostile ones as enemies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Npc {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub disposition: Disposition,
    #[serde(default)]
    pub stats: NpcStats,
    #[serde(default)]
    pub dialogue: DialogueLines,
    #[serde(default)]
    pub quest_giver: bool,
    #[serde(default)]
    pub merchant: bool,
    #[serde(default)]
    pub inventory: Vec<String>,
    #[serde(default)]
    pub reward: Option<Reward>,
    #[serde(default)]
    pub abilities: Vec<String>,
}

impl Npc {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: "A mysterious individual.".to_string(),
            disposition: Disposition::Neutral,
            stats: NpcStats::default(),
            dialogue: DialogueLines::default(),
            quest_giver: false,
            merchant: false,
            inventory: Vec::new(),
            reward: None,
            abilities: Vec::new(),
        }
    }

    pub fn hostile(mut self) -> Self {
        self.disposition = Disposition::Hostile;
        self
    }

    pub fn with_stats(mut self, stats: NpcStats) -> Self {
        self.stats = stats;
        self
    }

    pub fn with_reward(mut self, reward: Reward) -> Self {
        self.reward = Some(reward);
        self
    }

    pub fn is_hostile(&self) -> bool {
        self.disposition == Disposition::Hostile
    }
}
