/// Template selection: filter the catalog by applicability, weight the
/// survivors, sample one, and instantiate it into a scene.
///
/// Filtering runs in two passes. The strict pass checks every predicate a
/// template declares; the relaxed pass drops only the scene-tag and
/// choice-tag checks, so a narrow affinity never strands the player while
/// requirements, location and time of day still hold. When both come back empty the generic library in
/// [`crate::core::fallback`] takes over.

use crate::core::catalog::Catalog;
use crate::core::fallback;
use crate::core::interpolate::TextContext;
use crate::core::random::RandomSource;
use crate::schema::npc::Npc;
use crate::schema::player::Player;
use crate::schema::scene::{AudioHints, Choice, Location, Scene};
use crate::schema::state::GameState;
use crate::schema::template::{ChoiceTemplate, StoryTemplate};

/// Everything selection reads from the running session.
#[derive(Debug, Clone, Copy)]
pub struct SelectionContext<'a> {
    pub player: &'a Player,
    pub state: &'a GameState,
    /// `None` only while producing the entry scene.
    pub current: Option<&'a Scene>,
    pub choice: Option<&'a Choice>,
}

impl<'a> SelectionContext<'a> {
    pub fn new(player: &'a Player, state: &'a GameState) -> Self {
        Self {
            player,
            state,
            current: None,
            choice: None,
        }
    }

    pub fn from_scene(mut self, scene: &'a Scene) -> Self {
        self.current = Some(scene);
        self
    }

    pub fn after_choice(mut self, choice: &'a Choice) -> Self {
        self.choice = Some(choice);
        self
    }

    fn current_location(&self) -> Option<&'a Location> {
        self.current.map(|s| &s.location)
    }

    fn choice_tags(&self) -> &'a [String] {
        self.choice.map(|c| c.tags.as_slice()).unwrap_or(&[])
    }
}

/// Cumulative-weight sampling over `weights`.
///
/// Draws `r` in `[0, total)` and returns the first index where the running
/// remainder goes negative, so a candidate owns exactly the half-open slice
/// `[before, before + weight)` and zero weights are never picked. Returns
/// `None` only for an empty list; a list with no positive weight yields 0.
pub fn weighted_pick(weights: &[f64], rng: &mut dyn RandomSource) -> Option<usize> {
    if weights.is_empty() {
        return None;
    }
    let total: f64 = weights.iter().map(|w| w.max(0.0)).sum();
    if total <= 0.0 || !total.is_finite() {
        return Some(0);
    }

    let mut r = rng.next_f64() * total;
    for (i, w) in weights.iter().enumerate() {
        r -= w.max(0.0);
        if r < 0.0 {
            return Some(i);
        }
    }
    // Float rounding left a sliver past the last slice
    weights.iter().rposition(|w| *w > 0.0).or(Some(0))
}

/// Does `template` pass every predicate it declares?
pub fn strictly_applicable(template: &StoryTemplate, ctx: &SelectionContext<'_>) -> bool {
    if !loosely_applicable(template, ctx) {
        return false;
    }

    let scene_tags = ctx.current.map(|s| s.tags.as_slice()).unwrap_or(&[]);
    if !template.required_tags.iter().all(|t| scene_tags.contains(t)) {
        return false;
    }

    // A choice without tags shares no affinity with a template that declares one
    if let Some(choice) = ctx.choice {
        if !template.choice_tags.is_empty()
            && !template.choice_tags.iter().any(|t| choice.tags.contains(t))
        {
            return false;
        }
    }
    true
}

/// The relaxed pass: everything except the scene-tag and choice-tag checks.
///
/// Entry-only templates stay out, and requirements, location continuity,
/// location types and time of day still gate.
pub fn loosely_applicable(template: &StoryTemplate, ctx: &SelectionContext<'_>) -> bool {
    if template.is_starting() || !template.requirements.is_met(ctx.player, ctx.state) {
        return false;
    }

    let here = ctx.current_location();
    if let Some(declared) = &template.location {
        if declared.continuity && here.map(|l| l.name.as_str()) != Some(declared.name.as_str()) {
            return false;
        }
    }
    if !template.location_types.is_empty() {
        match here {
            Some(loc) if template.location_types.contains(&loc.kind) => {}
            _ => return false,
        }
    }
    if let Some(time) = &template.time_of_day {
        if *time != ctx.state.world.time {
            return false;
        }
    }
    true
}

/// Relevance weight of a candidate in this context.
pub fn relevance(template: &StoryTemplate, ctx: &SelectionContext<'_>) -> f64 {
    let mut weight = template.base_weight();

    if let (Some(declared), Some(here)) = (&template.location, ctx.current_location()) {
        if declared.name == here.name {
            weight *= 2.0;
        }
    }

    let choice_tags = ctx.choice_tags();
    let matching = template
        .choice_tags
        .iter()
        .filter(|t| choice_tags.contains(t))
        .count();
    weight * (1.0 + 0.5 * matching as f64)
}

/// Pick the next story template, or `None` when nothing qualifies even
/// after relaxing. A choice's direct target wins when it exists.
pub fn select_story<'c>(
    catalog: &'c Catalog,
    ctx: &SelectionContext<'_>,
    rng: &mut dyn RandomSource,
) -> Option<&'c StoryTemplate> {
    if let Some(target) = ctx.choice.and_then(|c| c.target.as_deref()) {
        match catalog.story(target) {
            Some(template) => return Some(template),
            None => tracing::debug!(target, "choice target not in catalog, selecting normally"),
        }
    }

    let mut candidates: Vec<&StoryTemplate> = catalog
        .stories
        .iter()
        .filter(|t| strictly_applicable(t, ctx))
        .collect();
    if candidates.is_empty() {
        tracing::debug!("no strict candidates, relaxing filter");
        candidates = catalog
            .stories
            .iter()
            .filter(|t| loosely_applicable(t, ctx))
            .collect();
    }

    let weights: Vec<f64> = candidates.iter().map(|t| relevance(t, ctx)).collect();
    weighted_pick(&weights, rng).map(|i| candidates[i])
}

/// Produce the scene that follows `ctx.current` and `ctx.choice`.
pub fn next_scene(
    catalog: &Catalog,
    ctx: &SelectionContext<'_>,
    id: String,
    rng: &mut dyn RandomSource,
) -> Scene {
    match select_story(catalog, ctx, rng) {
        Some(template) => instantiate(template, catalog, ctx, id, rng),
        None => {
            tracing::debug!("no story template qualifies, synthesizing continuation");
            let here = ctx.current_location().cloned().unwrap_or_default();
            let choice = ctx.choice.cloned().unwrap_or_default();
            fallback::continuation_scene(id, &here, &choice, &ctx.player.archetype, catalog, rng)
        }
    }
}

/// Produce the entry scene for a new game.
///
/// Only `starting` templates compete, and a template that lists archetypes
/// is offered to those archetypes alone.
pub fn starting_scene(
    catalog: &Catalog,
    player: &Player,
    state: &GameState,
    id: String,
    rng: &mut dyn RandomSource,
) -> Scene {
    let archetype = player.archetype.name();
    let candidates: Vec<&StoryTemplate> = catalog
        .stories
        .iter()
        .filter(|t| t.is_starting())
        .filter(|t| t.archetypes.is_empty() || t.archetypes.iter().any(|a| a.eq_ignore_ascii_case(archetype)))
        .filter(|t| t.requirements.is_met(player, state))
        .collect();

    let weights: Vec<f64> = candidates.iter().map(|t| t.base_weight()).collect();
    let ctx = SelectionContext::new(player, state);
    match weighted_pick(&weights, rng) {
        Some(i) => instantiate(candidates[i], catalog, &ctx, id, rng),
        None => {
            tracing::debug!(archetype, "no starting template, using generic opening");
            fallback::starting_scene(id, rng)
        }
    }
}

/// Turn a story template into a concrete scene.
pub fn instantiate(
    template: &StoryTemplate,
    catalog: &Catalog,
    ctx: &SelectionContext<'_>,
    id: String,
    rng: &mut dyn RandomSource,
) -> Scene {
    let location = match (&template.location, ctx.current_location()) {
        (Some(declared), Some(here)) if declared.continuity => here.clone(),
        (Some(declared), _) => declared.to_location(),
        (None, _) => fallback::random_location(catalog, rng),
    };

    let text = TextContext::new(ctx.player)
        .at(&location)
        .with_world(&ctx.state.world);

    let mut narrative: Vec<String> = template
        .narrative
        .paragraphs()
        .into_iter()
        .map(|p| text.render(p))
        .collect();
    if narrative.is_empty() {
        narrative.push(fallback::default_narrative(&location));
    }

    let mut choices = render_choices(&template.choices, &text);
    if choices.is_empty() {
        choices = fallback::default_choices(&location, &ctx.player.archetype);
    }

    let title = text.render(&template.title);
    let description = text.render(&template.description);
    let characters = resolve_characters(catalog, &template.characters);

    Scene::new(id, title, location)
        .with_description(description)
        .with_narrative(narrative)
        .with_choices(choices)
        .with_characters(characters)
        .with_tags(template.tags.iter().cloned())
        .with_audio(AudioHints {
            music: template.music.clone(),
            ambient: template.ambient_sounds.clone(),
        })
}

/// Interpolate authored choices. Templates with blank text are dropped.
pub(crate) fn render_choices(templates: &[ChoiceTemplate], text: &TextContext<'_>) -> Vec<Choice> {
    templates
        .iter()
        .filter(|c| !c.text.trim().is_empty())
        .map(|c| Choice {
            text: text.render(&c.text),
            target: c.target.clone(),
            effects: c.effects.clone(),
            tags: c.tags.clone(),
        })
        .collect()
}

/// Look up NPC ids in the catalog. Unknown ids are skipped.
pub(crate) fn resolve_characters(catalog: &Catalog, ids: &[String]) -> Vec<Npc> {
    ids.iter()
        .filter_map(|id| {
            let npc = catalog.npc(id).cloned();
            if npc.is_none() {
                tracing::debug!(npc = id.as_str(), "character not in catalog");
            }
            npc
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::random::ScriptedRandom;
    use crate::schema::state::Value;
    use crate::schema::template::TemplateLocation;

    fn story(id: &str) -> StoryTemplate {
        StoryTemplate {
            id: id.to_string(),
            kind: "exploration".to_string(),
            title: id.to_string(),
            description: String::new(),
            location: None,
            narrative: Default::default(),
            choices: Vec::new(),
            tags: Vec::new(),
            weight: None,
            requirements: Default::default(),
            required_tags: Vec::new(),
            choice_tags: Vec::new(),
            location_types: Vec::new(),
            time_of_day: None,
            archetypes: Vec::new(),
            characters: Vec::new(),
            music: None,
            ambient_sounds: None,
        }
    }

    fn at(name: &str, kind: &str) -> TemplateLocation {
        TemplateLocation {
            name: name.to_string(),
            kind: kind.to_string(),
            description: String::new(),
            continuity: false,
        }
    }

    fn inn_scene() -> Scene {
        Scene::new("scene_1", "Inn", Location::new("Crossroads Inn", "safe", "Warm."))
            .with_tags(["starting"])
    }

    #[test]
    fn weighted_pick_respects_slices() {
        let weights = [2.0, 1.0];
        // r = draw * 3
        for (draw, expected) in [(0.0, 0), (0.5, 0), (0.66, 0), (0.67, 1), (0.99, 1)] {
            let got = weighted_pick(&weights, &mut ScriptedRandom::constant(draw));
            assert_eq!(got, Some(expected), "draw {}", draw);
        }
    }

    #[test]
    fn weighted_pick_boundary_goes_to_next() {
        // r == 1.0 exactly belongs to the second candidate
        let got = weighted_pick(&[1.0, 1.0], &mut ScriptedRandom::constant(0.5));
        assert_eq!(got, Some(1));
    }

    #[test]
    fn zero_weight_unreachable_unless_alone() {
        for draw in [0.0, 0.3, 0.999] {
            let got = weighted_pick(&[0.0, 1.0], &mut ScriptedRandom::constant(draw));
            assert_eq!(got, Some(1));
        }
        assert_eq!(weighted_pick(&[0.0], &mut ScriptedRandom::constant(0.5)), Some(0));
        assert_eq!(weighted_pick(&[], &mut ScriptedRandom::constant(0.5)), None);
    }

    #[test]
    fn starting_templates_excluded_later() {
        let player = Player::new("Ayla", "warrior");
        let state = GameState::new();
        let scene = inn_scene();
        let ctx = SelectionContext::new(&player, &state).from_scene(&scene);
        let mut t = story("intro");
        t.kind = "starting".to_string();
        assert!(!strictly_applicable(&t, &ctx));
        assert!(!loosely_applicable(&t, &ctx));
    }

    #[test]
    fn strict_filter_checks_tags_and_continuity() {
        let player = Player::new("Ayla", "warrior");
        let state = GameState::new();
        let scene = inn_scene();
        let choice = Choice::new("Ask about work", &["social"]);
        let ctx = SelectionContext::new(&player, &state)
            .from_scene(&scene)
            .after_choice(&choice);

        let mut needs_tag = story("a");
        needs_tag.required_tags = vec!["introduction".to_string()];
        assert!(!strictly_applicable(&needs_tag, &ctx));
        assert!(loosely_applicable(&needs_tag, &ctx));

        let mut wrong_affinity = story("b");
        wrong_affinity.choice_tags = vec!["combat".to_string()];
        assert!(!strictly_applicable(&wrong_affinity, &ctx));

        let mut stays = story("c");
        stays.location = Some(TemplateLocation {
            continuity: true,
            ..at("Crossroads Inn", "safe")
        });
        assert!(strictly_applicable(&stays, &ctx));
        stays.location = Some(TemplateLocation {
            continuity: true,
            ..at("Harbor Docks", "neutral")
        });
        assert!(!strictly_applicable(&stays, &ctx));
    }

    #[test]
    fn strict_filter_checks_time_and_location_type() {
        let player = Player::new("Ayla", "warrior");
        let state = GameState::new();
        let scene = inn_scene();
        let ctx = SelectionContext::new(&player, &state).from_scene(&scene);

        let mut night = story("night");
        night.time_of_day = Some("night".to_string());
        assert!(!strictly_applicable(&night, &ctx));

        let mut wild = story("wild");
        wild.location_types = vec!["wilderness".to_string()];
        assert!(!strictly_applicable(&wild, &ctx));
        wild.location_types.push("safe".to_string());
        assert!(strictly_applicable(&wild, &ctx));
    }

    #[test]
    fn relevance_multipliers() {
        let player = Player::new("Ayla", "warrior");
        let state = GameState::new();
        let scene = inn_scene();
        let choice = Choice::new("Fight", &["combat", "danger", "brave"]);
        let ctx = SelectionContext::new(&player, &state)
            .from_scene(&scene)
            .after_choice(&choice);

        let mut t = story("t");
        t.weight = Some(2.0);
        t.location = Some(at("Crossroads Inn", "safe"));
        t.choice_tags = vec!["combat".to_string(), "danger".to_string(), "magic".to_string()];
        // 2 × 2 × (1 + 0.5 × 2)
        assert_eq!(relevance(&t, &ctx), 8.0);
    }

    #[test]
    fn direct_target_bypasses_filters() {
        let player = Player::new("Ayla", "warrior");
        let state = GameState::new();
        let scene = inn_scene();
        let mut choice = Choice::new("Go", &[]);
        choice.target = Some("locked".to_string());

        let mut locked = story("locked");
        locked.requirements.flags.insert("opened".to_string(), Value::Bool(true));
        let catalog = Catalog {
            stories: vec![story("open"), locked],
            ..Catalog::default()
        };
        let ctx = SelectionContext::new(&player, &state)
            .from_scene(&scene)
            .after_choice(&choice);
        let picked = select_story(&catalog, &ctx, &mut ScriptedRandom::constant(0.0));
        assert_eq!(picked.map(|t| t.id.as_str()), Some("locked"));
    }

    #[test]
    fn relaxed_pass_used_when_strict_empty() {
        let player = Player::new("Ayla", "warrior");
        let state = GameState::new();
        let scene = inn_scene();
        let ctx = SelectionContext::new(&player, &state).from_scene(&scene);

        let mut t = story("needs_tag");
        t.required_tags = vec!["village".to_string()];
        let catalog = Catalog {
            stories: vec![t],
            ..Catalog::default()
        };
        let picked = select_story(&catalog, &ctx, &mut ScriptedRandom::constant(0.4));
        assert_eq!(picked.map(|t| t.id.as_str()), Some("needs_tag"));
    }

    #[test]
    fn location_gates_hold_in_both_passes() {
        let player = Player::new("Ayla", "warrior");
        let state = GameState::new();
        let scene = inn_scene();
        let choice = Choice::new("Check your pack", &["inventory"]);
        let ctx = SelectionContext::new(&player, &state)
            .from_scene(&scene)
            .after_choice(&choice);

        let mut wild = story("ambush");
        wild.location_types = vec!["wilderness".to_string()];
        assert!(!strictly_applicable(&wild, &ctx));
        assert!(!loosely_applicable(&wild, &ctx));

        let mut night = story("prowl");
        night.time_of_day = Some("night".to_string());
        assert!(!loosely_applicable(&night, &ctx));

        let mut elsewhere = story("aftermath");
        elsewhere.location = Some(TemplateLocation {
            continuity: true,
            ..at("Ancient Forest", "wilderness")
        });
        assert!(!loosely_applicable(&elsewhere, &ctx));

        let catalog = Catalog {
            stories: vec![wild, night, elsewhere],
            ..Catalog::default()
        };
        for draw in [0.0, 0.5, 0.99] {
            assert!(select_story(&catalog, &ctx, &mut ScriptedRandom::constant(draw)).is_none());
        }
        let next = next_scene(&catalog, &ctx, "scene_2".to_string(), &mut ScriptedRandom::constant(0.5));
        assert!(next.has_tag("continuation"));
        assert_eq!(next.location, scene.location);
    }

    #[test]
    fn unmet_requirements_fall_through_to_continuation() {
        let player = Player::new("Ayla", "warrior");
        let state = GameState::new();
        let scene = inn_scene();
        let choice = Choice::new("Lift the gate", &["strength"]);
        let ctx = SelectionContext::new(&player, &state)
            .from_scene(&scene)
            .after_choice(&choice);

        let mut heavy = story("portcullis");
        heavy.requirements.stats.insert("strength".to_string(), 99);
        heavy.choice_tags = vec!["strength".to_string()];
        let mut keyed = story("vault");
        keyed.requirements.inventory = vec!["vault key".to_string()];
        let mut sworn = story("oath");
        sworn.requirements.quests = vec!["knighthood".to_string()];
        let mut marked = story("secret");
        marked.requirements.flags.insert("knowsPassword".to_string(), Value::Bool(true));
        let catalog = Catalog {
            stories: vec![heavy, keyed, sworn, marked],
            ..Catalog::default()
        };

        for t in &catalog.stories {
            assert!(!loosely_applicable(t, &ctx), "{} passed the relaxed pass", t.id);
        }
        let next = next_scene(&catalog, &ctx, "scene_2".to_string(), &mut ScriptedRandom::constant(0.0));
        assert_eq!(next.title, "Continuing On");
        assert!(next.has_tag("continuation"));
    }

    #[test]
    fn untagged_choice_fails_affinity() {
        let player = Player::new("Ayla", "warrior");
        let state = GameState::new();
        let scene = inn_scene();
        let choice = Choice::new("Wait", &[]);
        let ctx = SelectionContext::new(&player, &state)
            .from_scene(&scene)
            .after_choice(&choice);

        let mut picky = story("picky");
        picky.choice_tags = vec!["explore".to_string()];
        assert!(!strictly_applicable(&picky, &ctx));
        assert!(loosely_applicable(&picky, &ctx));
        assert!(strictly_applicable(&story("open"), &ctx));

        let catalog = Catalog {
            stories: vec![picky, story("open")],
            ..Catalog::default()
        };
        for draw in [0.0, 0.99] {
            let picked = select_story(&catalog, &ctx, &mut ScriptedRandom::constant(draw));
            assert_eq!(picked.map(|t| t.id.as_str()), Some("open"));
        }
    }

    #[test]
    fn empty_catalog_synthesizes_continuation() {
        let player = Player::new("Ayla", "rogue");
        let state = GameState::new();
        let scene = inn_scene();
        let choice = Choice::new("Look around", &["inventory"]);
        let ctx = SelectionContext::new(&player, &state)
            .from_scene(&scene)
            .after_choice(&choice);
        let next = next_scene(&Catalog::default(), &ctx, "scene_2".to_string(), &mut ScriptedRandom::constant(0.0));
        assert_eq!(next.location, scene.location);
        assert!(next.has_tag("continuation"));
        assert!(!next.choices().is_empty());
    }

    #[test]
    fn instantiate_interpolates_and_fills_defaults() {
        let player = Player::new("Ayla", "warrior");
        let state = GameState::new();
        let scene = inn_scene();
        let ctx = SelectionContext::new(&player, &state).from_scene(&scene);

        let mut t = story("square");
        t.title = "{player.name} at {location.name}".to_string();
        t.location = Some(at("Village Square", "village"));
        t.characters = vec!["galen".to_string(), "ghost".to_string()];
        t.music = Some("village_theme".to_string());
        let catalog = Catalog {
            npcs: vec![Npc::new("galen", "Galen")],
            ..Catalog::default()
        };

        let out = instantiate(&t, &catalog, &ctx, "scene_9".to_string(), &mut ScriptedRandom::constant(0.0));
        assert_eq!(out.id, "scene_9");
        assert_eq!(out.title, "Ayla at Village Square");
        assert_eq!(out.narrative.len(), 1);
        assert!(out.narrative[0].starts_with("You find yourself at Village Square"));
        assert!(out.choices().iter().any(|c| c.text == "Visit the market"));
        assert_eq!(out.characters.len(), 1);
        assert_eq!(out.audio.music.as_deref(), Some("village_theme"));
    }

    #[test]
    fn continuity_keeps_current_location() {
        let player = Player::new("Ayla", "warrior");
        let state = GameState::new();
        let scene = inn_scene();
        let ctx = SelectionContext::new(&player, &state).from_scene(&scene);
        let mut t = story("linger");
        t.location = Some(TemplateLocation {
            continuity: true,
            ..at("Crossroads Inn", "dangerous")
        });
        let out = instantiate(&t, &Catalog::default(), &ctx, "s".to_string(), &mut ScriptedRandom::constant(0.0));
        assert_eq!(out.location.kind, "safe");
    }

    #[test]
    fn starting_scene_filters_archetypes() {
        let mut mage_only = story("tower");
        mage_only.kind = "starting".to_string();
        mage_only.archetypes = vec!["Mage".to_string()];
        mage_only.location = Some(at("Wizard Tower", "safe"));
        let catalog = Catalog {
            stories: vec![mage_only],
            ..Catalog::default()
        };
        let state = GameState::new();
        let mut rng = ScriptedRandom::constant(0.0);

        let mage = Player::new("Ilse", "mage");
        let scene = starting_scene(&catalog, &mage, &state, "scene_1".to_string(), &mut rng);
        assert_eq!(scene.location.name, "Wizard Tower");

        let warrior = Player::new("Ayla", "warrior");
        let scene = starting_scene(&catalog, &warrior, &state, "scene_1".to_string(), &mut rng);
        assert_eq!(scene.title, "The Beginning");
    }
}
