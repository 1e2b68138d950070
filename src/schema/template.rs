use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use super::effect::EffectDescriptor;
use super::npc::Npc;
use super::player::Player;
use super::scene::Location;
use super::state::{GameState, Value};

/// Template `kind` reserved for entry scenes.
pub const STARTING_KIND: &str = "starting";

/// Narrative text: either one string or an ordered list of paragraphs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NarrativeText {
    Single(String),
    Paragraphs(Vec<String>),
}

impl Default for NarrativeText {
    fn default() -> Self {
        Self::Paragraphs(Vec::new())
    }
}

impl NarrativeText {
    pub fn paragraphs(&self) -> Vec<&str> {
        match self {
            Self::Single(s) if s.is_empty() => Vec::new(),
            Self::Single(s) => vec![s.as_str()],
            Self::Paragraphs(p) => p.iter().map(String::as_str).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.paragraphs().is_empty()
    }
}

/// Hard gates a template places on the player and game state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Requirements {
    /// Stat name → minimum value. Unknown stats count as zero.
    pub stats: FxHashMap<String, i64>,
    /// Flag name → exact value.
    pub flags: FxHashMap<String, Value>,
    pub inventory: Vec<String>,
    pub quests: Vec<String>,
}

impl Requirements {
    pub fn is_met(&self, player: &Player, state: &GameState) -> bool {
        self.stats_met(player) && self.flags_met(state) && self.items_met(state) && self.quests_met(state)
    }

    pub fn stats_met(&self, player: &Player) -> bool {
        self.stats
            .iter()
            .all(|(stat, min)| player.stats().get(stat).unwrap_or(0) >= *min)
    }

    pub fn flags_met(&self, state: &GameState) -> bool {
        self.flags
            .iter()
            .all(|(flag, value)| state.flag(flag) == Some(value))
    }

    fn items_met(&self, state: &GameState) -> bool {
        self.inventory.iter().all(|item| state.has_item(item))
    }

    fn quests_met(&self, state: &GameState) -> bool {
        self.quests.iter().all(|q| state.has_completed(q))
    }
}

/// Location declared by a story template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateLocation {
    pub name: String,
    #[serde(default = "neutral_kind")]
    pub kind: String,
    #[serde(default)]
    pub description: String,
    /// Continue the prior scene's location instead of moving here.
    #[serde(default)]
    pub continuity: bool,
}

fn neutral_kind() -> String {
    "neutral".to_string()
}

impl TemplateLocation {
    pub fn to_location(&self) -> Location {
        Location {
            name: self.name.clone(),
            kind: self.kind.clone(),
            description: self.description.clone(),
        }
    }
}

/// An authored choice. Text is interpolated at instantiation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChoiceTemplate {
    pub text: String,
    pub target: Option<String>,
    pub effects: Option<EffectDescriptor>,
    pub tags: Vec<String>,
}

/// A story template: one potential next scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoryTemplate {
    pub id: String,
    /// Type tag. `starting` marks entry-only templates.
    #[serde(default)]
    pub kind: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub location: Option<TemplateLocation>,
    #[serde(default)]
    pub narrative: NarrativeText,
    /// An empty list makes the engine synthesize default choices.
    #[serde(default)]
    pub choices: Vec<ChoiceTemplate>,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Base relevance weight; 1 when absent.
    #[serde(default)]
    pub weight: Option<f64>,
    #[serde(default)]
    pub requirements: Requirements,
    /// Tags the current scene must carry.
    #[serde(default)]
    pub required_tags: Vec<String>,
    /// Choice tags this template answers to.
    #[serde(default)]
    pub choice_tags: Vec<String>,
    /// Location kinds the current scene must be in, when non-empty.
    #[serde(default)]
    pub location_types: Vec<String>,
    #[serde(default)]
    pub time_of_day: Option<String>,
    /// Archetypes a starting template is offered to, when non-empty.
    #[serde(default)]
    pub archetypes: Vec<String>,
    /// NPC ids resolved against the catalog.
    #[serde(default)]
    pub characters: Vec<String>,
    #[serde(default)]
    pub music: Option<String>,
    #[serde(default)]
    pub ambient_sounds: Option<String>,
}

impl StoryTemplate {
    pub fn is_starting(&self) -> bool {
        self.kind == STARTING_KIND
    }

    pub fn base_weight(&self) -> f64 {
        self.weight.unwrap_or(1.0).max(0.0)
    }
}

/// A random-event template, matched on location type and time of day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventTemplate {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub narrative: NarrativeText,
    #[serde(default)]
    pub location_types: Vec<String>,
    #[serde(default)]
    pub time_of_day: Option<String>,
    #[serde(default)]
    pub requirements: Requirements,
    #[serde(default)]
    pub choices: Vec<ChoiceTemplate>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub weight: Option<f64>,
    #[serde(default)]
    pub characters: Vec<String>,
}

impl EventTemplate {
    pub fn base_weight(&self) -> f64 {
        self.weight.unwrap_or(1.0).max(0.0)
    }
}

/// A location record used when a scene needs a fresh place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationTemplate {
    pub name: String,
    #[serde(default = "neutral_kind")]
    pub kind: String,
    #[serde(default)]
    pub description: String,
}

impl LocationTemplate {
    pub fn to_location(&self) -> Location {
        Location {
            name: self.name.clone(),
            kind: self.kind.clone(),
            description: self.description.clone(),
        }
    }
}

/// NPC templates are plain NPC records.
pub type NpcTemplate = Npc;
