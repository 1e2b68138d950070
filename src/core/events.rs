/// Random-event gate — the probabilistic interrupt evaluated once per choice.

use serde::{Deserialize, Serialize};

use crate::core::catalog::Catalog;
use crate::core::fallback;
use crate::core::interpolate::TextContext;
use crate::core::random::RandomSource;
use crate::core::selection::{render_choices, resolve_characters, weighted_pick, SelectionContext};
use crate::schema::scene::{Location, Scene};
use crate::schema::state::GameState;
use crate::schema::template::EventTemplate;

/// Tunables for the interrupt probability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventGateConfig {
    pub enabled: bool,
    pub base_chance: f64,
    /// Added when world danger is `high`.
    pub high_danger_bonus: f64,
    /// Added when the current location type is `dangerous`.
    pub dangerous_location_bonus: f64,
    /// Subtracted when the current location type is `safe`.
    pub safe_location_penalty: f64,
    pub min_chance: f64,
    pub max_chance: f64,
}

impl Default for EventGateConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_chance: 0.15,
            high_danger_bonus: 0.10,
            dangerous_location_bonus: 0.10,
            safe_location_penalty: 0.05,
            min_chance: 0.05,
            max_chance: 0.40,
        }
    }
}

impl EventGateConfig {
    /// A gate that never fires.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// Interrupt probability for the given world and location.
    pub fn probability(&self, state: &GameState, location: &Location) -> f64 {
        let mut chance = self.base_chance;
        if state.world.danger == "high" {
            chance += self.high_danger_bonus;
        }
        match location.kind.as_str() {
            "dangerous" => chance += self.dangerous_location_bonus,
            "safe" => chance -= self.safe_location_penalty,
            _ => {}
        }
        chance.clamp(self.min_chance, self.max_chance.max(self.min_chance))
    }

    /// Roll the gate. Consumes exactly one draw when enabled, none otherwise.
    pub fn roll(&self, state: &GameState, location: &Location, rng: &mut dyn RandomSource) -> bool {
        if !self.enabled {
            return false;
        }
        let chance = self.probability(state, location);
        let fired = rng.chance(chance);
        if fired {
            tracing::info!(chance, location = location.name.as_str(), "random event interrupts");
        }
        fired
    }
}

/// Does `event` fit the current location and world?
pub fn event_applicable(event: &EventTemplate, ctx: &SelectionContext<'_>) -> bool {
    if !event.location_types.is_empty() {
        match ctx.current {
            Some(scene) if event.location_types.contains(&scene.location.kind) => {}
            _ => return false,
        }
    }
    if let Some(time) = &event.time_of_day {
        if *time != ctx.state.world.time {
            return false;
        }
    }
    event.requirements.is_met(ctx.player, ctx.state)
}

/// Produce an event scene at the current location. Falls back to the
/// generic event library when no event template qualifies.
pub fn event_scene(
    catalog: &Catalog,
    ctx: &SelectionContext<'_>,
    id: String,
    rng: &mut dyn RandomSource,
) -> Scene {
    let here = ctx.current.map(|s| s.location.clone()).unwrap_or_default();
    let candidates: Vec<&EventTemplate> = catalog
        .events
        .iter()
        .filter(|e| event_applicable(e, ctx))
        .collect();
    let weights: Vec<f64> = candidates.iter().map(|e| e.base_weight()).collect();

    let Some(idx) = weighted_pick(&weights, rng) else {
        tracing::debug!("no event template qualifies, using generic event");
        return fallback::event_scene(id, &here, rng);
    };
    let event = candidates[idx];

    let text = TextContext::new(ctx.player)
        .at(&here)
        .with_world(&ctx.state.world);
    let mut narrative: Vec<String> = event
        .narrative
        .paragraphs()
        .into_iter()
        .map(|p| text.render(p))
        .collect();
    if narrative.is_empty() {
        narrative.push(text.render(&event.description));
    }
    let mut choices = render_choices(&event.choices, &text);
    if choices.is_empty() {
        choices = fallback::default_choices(&here, &ctx.player.archetype);
    }
    let title = text.render(&event.title);
    let description = text.render(&event.description);

    let mut tags = vec!["event".to_string()];
    tags.extend(event.tags.iter().cloned());

    Scene::new(id, title, here.clone())
        .with_description(description)
        .with_narrative(narrative)
        .with_choices(choices)
        .with_characters(resolve_characters(catalog, &event.characters))
        .with_tags(tags)
}
