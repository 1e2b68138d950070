use serde::{Deserialize, Serialize};

use super::effect::EffectDescriptor;
use super::npc::Npc;

/// Name/type/description triple describing where a scene takes place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub name: String,
    /// Open category such as `safe`, `dangerous`, `wilderness`, `town`.
    pub kind: String,
    pub description: String,
}

impl Location {
    pub fn new(name: &str, kind: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: kind.to_string(),
            description: description.to_string(),
        }
    }
}

impl Default for Location {
    fn default() -> Self {
        Self::new("Unknown", "neutral", "A nondescript location.")
    }
}

/// One option offered to the player.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Choice {
    pub text: String,
    /// Story template to jump to directly, bypassing selection.
    #[serde(default)]
    pub target: Option<String>,
    #[serde(default)]
    pub effects: Option<EffectDescriptor>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Choice {
    pub fn new(text: impl Into<String>, tags: &[&str]) -> Self {
        Self {
            text: text.into(),
            target: None,
            effects: None,
            tags: tags.iter().map(|t| t.to_string()).collect(),
        }
    }

    pub fn with_effects(mut self, effects: EffectDescriptor) -> Self {
        self.effects = Some(effects);
        self
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

/// Optional audio hints for the presentation layer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioHints {
    pub music: Option<String>,
    pub ambient: Option<String>,
}

/// One instantiated unit of narrative and choices.
///
/// Scenes are immutable once produced: every transition builds a new one.
/// Construction goes through [`Scene::new`], which guarantees at least one
/// choice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    pub id: String,
    pub title: String,
    pub description: String,
    pub location: Location,
    pub narrative: Vec<String>,
    choices: Vec<Choice>,
    pub characters: Vec<Npc>,
    pub tags: Vec<String>,
    pub audio: AudioHints,
}

impl Scene {
    /// Build a scene. An empty choice list is replaced by a single
    /// "Continue" choice.
    pub fn new(id: impl Into<String>, title: impl Into<String>, location: Location) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: String::new(),
            location,
            narrative: Vec::new(),
            choices: vec![Choice::new("Continue", &[])],
            characters: Vec::new(),
            tags: Vec::new(),
            audio: AudioHints::default(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_narrative(mut self, narrative: Vec<String>) -> Self {
        self.narrative = narrative;
        self
    }

    /// Replace the choices. An empty list leaves the existing ones in place.
    pub fn with_choices(mut self, choices: Vec<Choice>) -> Self {
        if !choices.is_empty() {
            self.choices = choices;
        }
        self
    }

    pub fn with_characters(mut self, characters: Vec<Npc>) -> Self {
        self.characters = characters;
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_audio(mut self, audio: AudioHints) -> Self {
        self.audio = audio;
        self
    }

    pub fn choices(&self) -> &[Choice] {
        &self.choices
    }

    pub fn choice(&self, index: usize) -> Option<&Choice> {
        self.choices.get(index)
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    /// First hostile character, if any.
    pub fn hostile_character(&self) -> Option<&Npc> {
        self.characters.iter().find(|c| c.is_hostile())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_scene_has_continue_choice() {
        let scene = Scene::new("s1", "Start", Location::default());
        assert_eq!(scene.choices().len(), 1);
        assert_eq!(scene.choices()[0].text, "Continue");
    }

    #[test]
    fn empty_choice_list_ignored() {
        let scene = Scene::new("s1", "Start", Location::default()).with_choices(Vec::new());
        assert_eq!(scene.choices().len(), 1);
    }

    #[test]
    fn choice_lookup_out_of_range() {
        let scene = Scene::new("s1", "Start", Location::default())
            .with_choices(vec![Choice::new("A", &["x"]), Choice::new("B", &[])]);
        assert_eq!(scene.choice(1).map(|c| c.text.as_str()), Some("B"));
        assert!(scene.choice(2).is_none());
        assert!(scene.choice(0).unwrap().has_tag("x"));
    }

    #[test]
    fn hostile_character_lookup() {
        let scene = Scene::new("s1", "Ambush", Location::default()).with_characters(vec![
            Npc::new("galen", "Galen"),
            Npc::new("bandit", "Bandit").hostile(),
        ]);
        assert_eq!(scene.hostile_character().map(|n| n.id.as_str()), Some("bandit"));
    }
}
