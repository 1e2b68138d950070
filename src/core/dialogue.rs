/// NPC dialogue — line selection by relationship score and response choices.

use serde::{Deserialize, Serialize};

use crate::core::interpolate::TextContext;
use crate::core::random::RandomSource;
use crate::schema::effect::EffectDescriptor;
use crate::schema::npc::Npc;
use crate::schema::player::{Archetype, Player};
use crate::schema::scene::{Choice, Scene};
use crate::schema::state::GameState;

pub const FRIENDLY_AT: i64 = 50;
pub const HOSTILE_AT: i64 = -50;

/// Conversational register a line is drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Register {
    Greeting,
    Friendly,
    Neutral,
    Hostile,
    Farewell,
}

impl Register {
    pub fn from_relationship(score: i64) -> Self {
        if score >= FRIENDLY_AT {
            Self::Friendly
        } else if score <= HOSTILE_AT {
            Self::Hostile
        } else {
            Self::Neutral
        }
    }
}

/// Generic lines used when an NPC has none for a register. Patterns may
/// reference `{npc.name}`, `{location.name}` and `{world.time}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DialoguePatterns {
    pub friendly: Vec<String>,
    pub neutral: Vec<String>,
    pub hostile: Vec<String>,
}

impl Default for DialoguePatterns {
    fn default() -> Self {
        let lines = |v: &[&str]| -> Vec<String> { v.iter().map(|s| s.to_string()).collect() };
        Self {
            friendly: lines(&[
                "Greetings, friend! It's good to see a friendly face around {location.name}.",
                "Ah, welcome! I've heard good things about you. How can I help?",
                "Hello there! What brings someone like you to {location.name} this {world.time}?",
                "Well met! Always a pleasure to see you around these parts.",
            ]),
            neutral: lines(&[
                "Hello. What brings you to {location.name}?",
                "Greetings, traveler. Can I help you with something?",
                "Yes? What do you need?",
                "Welcome to {location.name}. What's your business here?",
            ]),
            hostile: lines(&[
                "I don't have anything to say to you. Move along.",
                "Keep your distance if you know what's good for you.",
                "What do you want? Make it quick.",
                "I'm watching you, so don't try anything foolish.",
            ]),
        }
    }
}

impl DialoguePatterns {
    fn for_register(&self, register: Register) -> &[String] {
        match register {
            Register::Friendly => &self.friendly,
            Register::Hostile => &self.hostile,
            _ => &self.neutral,
        }
    }
}

/// Pick one line the NPC says in `register`.
///
/// Authored lines win. Greeting and farewell have no generic pool and yield
/// `None` when the NPC has none; the mood registers fall back to `patterns`.
pub fn npc_line(
    npc: &Npc,
    register: Register,
    patterns: &DialoguePatterns,
    text: &TextContext<'_>,
    rng: &mut dyn RandomSource,
) -> Option<String> {
    let authored = match register {
        Register::Greeting => &npc.dialogue.greeting,
        Register::Friendly => &npc.dialogue.friendly,
        Register::Neutral => &npc.dialogue.neutral,
        Register::Hostile => &npc.dialogue.hostile,
        Register::Farewell => &npc.dialogue.farewell,
    };
    let pool: &[String] = if !authored.is_empty() {
        authored
    } else {
        match register {
            Register::Greeting | Register::Farewell => return None,
            _ => patterns.for_register(register),
        }
    };
    if pool.is_empty() {
        return Some("Hello there.".to_string());
    }
    Some(text.render(&pool[rng.index(pool.len())]))
}

/// Responses the player can give, in presentation order.
pub fn responses(player: &Player, npc: &Npc, score: i64) -> Vec<Choice> {
    let mut out = Vec::new();
    let warmer = |delta: i64| EffectDescriptor::new().relationship(&npc.id, delta);

    match Register::from_relationship(score) {
        Register::Friendly => {
            out.push(Choice::new("Respond positively", &["friendly", "social"]).with_effects(warmer(5)))
        }
        Register::Hostile => {
            out.push(Choice::new("Respond cautiously", &["cautious", "social"]));
            out.push(Choice::new("Threaten", &["hostile", "intimidate"]).with_effects(warmer(-10)));
        }
        _ => out.push(Choice::new("Respond politely", &["polite", "social"]).with_effects(warmer(5))),
    }

    match player.archetype {
        Archetype::Warrior => out.push(Choice::new("Ask about local challenges", &["quest", "combat"])),
        Archetype::Mage => out.push(Choice::new("Inquire about magical curiosities", &["quest", "magic"])),
        Archetype::Rogue => out.push(Choice::new("Ask about valuable opportunities", &["quest", "loot"])),
        Archetype::Diplomat => out.push(
            Choice::new("Gather information diplomatically", &["information", "social"])
                .with_effects(warmer(5)),
        ),
        Archetype::Other(_) => {}
    }

    if npc.merchant {
        out.push(Choice::new("Ask to see wares", &["shop", "trade"]));
    }
    if npc.quest_giver {
        out.push(Choice::new("Ask about available tasks", &["quest", "information"]));
    }
    out.push(Choice::new("End the conversation", &["leave", "social"]));
    out
}

/// A conversation with `npc` at the current scene's location.
pub fn dialogue_scene(
    npc: &Npc,
    player: &Player,
    state: &GameState,
    current: &Scene,
    patterns: &DialoguePatterns,
    id: String,
    rng: &mut dyn RandomSource,
) -> Scene {
    let score = state.relationship(&npc.id);
    let text = TextContext::new(player)
        .at(&current.location)
        .with_world(&state.world)
        .with_npc(npc);

    let mut narrative = Vec::new();
    if let Some(greeting) = npc_line(npc, Register::Greeting, patterns, &text, rng) {
        narrative.push(format!("{}: \"{}\"", npc.name, greeting));
    }
    if let Some(line) = npc_line(npc, Register::from_relationship(score), patterns, &text, rng) {
        narrative.push(format!("{}: \"{}\"", npc.name, line));
    }

    Scene::new(id, format!("Talking with {}", npc.name), current.location.clone())
        .with_description(npc.description.clone())
        .with_narrative(narrative)
        .with_choices(responses(player, npc, score))
        .with_characters(vec![npc.clone()])
        .with_tags(["dialogue", "social"])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::random::ScriptedRandom;
    use crate::schema::scene::Location;

    #[test]
    fn register_thresholds() {
        assert_eq!(Register::from_relationship(50), Register::Friendly);
        assert_eq!(Register::from_relationship(49), Register::Neutral);
        assert_eq!(Register::from_relationship(-49), Register::Neutral);
        assert_eq!(Register::from_relationship(-50), Register::Hostile);
    }

    #[test]
    fn authored_lines_preferred() {
        let p = Player::new("Ayla", "warrior");
        let mut npc = Npc::new("galen", "Galen");
        npc.dialogue.neutral = vec!["Another traveler, {player.name}?".to_string()];
        let text = TextContext::new(&p).with_npc(&npc);
        let line = npc_line(&npc, Register::Neutral, &DialoguePatterns::default(), &text, &mut ScriptedRandom::constant(0.0));
        assert_eq!(line.as_deref(), Some("Another traveler, Ayla?"));
    }

    #[test]
    fn generic_pattern_fallback() {
        let p = Player::new("Ayla", "warrior");
        let npc = Npc::new("galen", "Galen");
        let loc = Location::new("Crossroads Inn", "safe", "");
        let text = TextContext::new(&p).at(&loc).with_npc(&npc);
        let patterns = DialoguePatterns::default();
        let line = npc_line(&npc, Register::Neutral, &patterns, &text, &mut ScriptedRandom::constant(0.0));
        assert_eq!(line.as_deref(), Some("Hello. What brings you to Crossroads Inn?"));
        assert!(npc_line(&npc, Register::Greeting, &patterns, &text, &mut ScriptedRandom::constant(0.0)).is_none());
    }

    #[test]
    fn responses_follow_relationship_and_role() {
        let p = Player::new("Ilse", "mage");
        let mut npc = Npc::new("galen", "Galen");
        npc.merchant = true;
        npc.quest_giver = true;

        let texts = |v: Vec<Choice>| v.into_iter().map(|c| c.text).collect::<Vec<_>>();
        assert_eq!(
            texts(responses(&p, &npc, 0)),
            vec![
                "Respond politely",
                "Inquire about magical curiosities",
                "Ask to see wares",
                "Ask about available tasks",
                "End the conversation",
            ]
        );
        let hostile = responses(&p, &npc, -75);
        assert_eq!(hostile[1].text, "Threaten");
        assert!(hostile.last().unwrap().has_tag("leave"));
    }

    #[test]
    fn scene_carries_npc_and_leave_option() {
        let p = Player::new("Ayla", "warrior");
        let mut state = GameState::new();
        state.relationships.insert("galen".to_string(), 60);
        let mut npc = Npc::new("galen", "Galen");
        npc.dialogue.greeting = vec!["Welcome back.".to_string()];
        let here = Scene::new("scene_2", "Inn", Location::new("Crossroads Inn", "safe", ""));

        let scene = dialogue_scene(&npc, &p, &state, &here, &DialoguePatterns::default(), "scene_3".to_string(), &mut ScriptedRandom::constant(0.0));
        assert_eq!(scene.title, "Talking with Galen");
        assert_eq!(scene.narrative[0], "Galen: \"Welcome back.\"");
        assert!(scene.narrative[1].contains("Crossroads Inn"));
        assert_eq!(scene.choices()[0].text, "Respond positively");
        assert_eq!(scene.characters.len(), 1);
        assert_eq!(scene.location, here.location);
    }
}
