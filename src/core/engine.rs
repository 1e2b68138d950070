/// The story engine: catalog, randomness, and gate configuration wired
/// together behind the scene-producing operations.
///
/// Built via `StoryEngine::builder()`. The engine owns the single random
/// stream a session draws from, so two engines built with the same seed and
/// catalog produce the same playthrough for the same choices.

use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::core::catalog::{Catalog, CatalogError};
use crate::core::dialogue::{self, DialoguePatterns};
use crate::core::events::{self, EventGateConfig};
use crate::core::random::{RandomSource, SeededRandom};
use crate::core::selection::{self, SelectionContext};
use crate::schema::npc::Npc;
use crate::schema::player::Player;
use crate::schema::scene::{Choice, Scene};
use crate::schema::state::GameState;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result of advancing past a choice.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub scene: Scene,
    /// True when the random-event gate replaced the normal continuation.
    pub random_event: bool,
}

pub struct StoryEngine {
    catalog: Catalog,
    rng: Box<dyn RandomSource>,
    gate: EventGateConfig,
    patterns: DialoguePatterns,
    scene_count: u64,
}

/// Builder for constructing a `StoryEngine`.
pub struct StoryEngineBuilder {
    content_root: PathBuf,
    content_packs: Vec<String>,
    catalog_dir: Option<PathBuf>,
    seed: u64,
    /// Directly provided catalogs (for testing without files).
    catalogs: Vec<Catalog>,
    rng: Option<Box<dyn RandomSource>>,
    gate: EventGateConfig,
    patterns: DialoguePatterns,
}

impl StoryEngine {
    pub fn builder() -> StoryEngineBuilder {
        StoryEngineBuilder {
            content_root: PathBuf::from("content"),
            content_packs: Vec::new(),
            catalog_dir: None,
            seed: 0,
            catalogs: Vec::new(),
            rng: None,
            gate: EventGateConfig::default(),
            patterns: DialoguePatterns::default(),
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn event_gate(&self) -> &EventGateConfig {
        &self.gate
    }

    /// The session's random stream, for combat rounds.
    pub fn rng(&mut self) -> &mut dyn RandomSource {
        self.rng.as_mut()
    }

    fn next_id(&mut self) -> String {
        self.scene_count += 1;
        format!("scene_{}", self.scene_count)
    }

    /// Continue numbering after `scene_id` (used when a save is loaded).
    pub fn resume_ids_after(&mut self, scene_id: &str) {
        if let Some(n) = scene_id
            .strip_prefix("scene_")
            .and_then(|n| n.parse::<u64>().ok())
        {
            self.scene_count = self.scene_count.max(n);
        }
    }

    /// Entry scene for a new game.
    pub fn starting_scene(&mut self, player: &Player, state: &GameState) -> Scene {
        let id = self.next_id();
        selection::starting_scene(&self.catalog, player, state, id, self.rng.as_mut())
    }

    /// Roll the random-event gate, then produce either an event scene or the
    /// normal continuation. Effects of `choice` must already be applied.
    pub fn advance(
        &mut self,
        player: &Player,
        state: &GameState,
        current: &Scene,
        choice: &Choice,
    ) -> Transition {
        let ctx = SelectionContext::new(player, state)
            .from_scene(current)
            .after_choice(choice);
        let id = self.next_id();

        if self.gate.roll(state, &current.location, self.rng.as_mut()) {
            let scene = events::event_scene(&self.catalog, &ctx, id, self.rng.as_mut());
            return Transition {
                scene,
                random_event: true,
            };
        }
        let scene = selection::next_scene(&self.catalog, &ctx, id, self.rng.as_mut());
        Transition {
            scene,
            random_event: false,
        }
    }

    /// Normal continuation without consulting the gate.
    pub fn continue_from(
        &mut self,
        player: &Player,
        state: &GameState,
        current: &Scene,
        choice: &Choice,
    ) -> Scene {
        let ctx = SelectionContext::new(player, state)
            .from_scene(current)
            .after_choice(choice);
        let id = self.next_id();
        selection::next_scene(&self.catalog, &ctx, id, self.rng.as_mut())
    }

    /// Conversation with `npc` at the current scene's location.
    pub fn dialogue_scene(
        &mut self,
        npc: &Npc,
        player: &Player,
        state: &GameState,
        current: &Scene,
    ) -> Scene {
        let id = self.next_id();
        dialogue::dialogue_scene(npc, player, state, current, &self.patterns, id, self.rng.as_mut())
    }
}

impl StoryEngineBuilder {
    /// Directory holding `<pack>/catalog.ron` content packs. Defaults to `content`.
    pub fn content_root(mut self, path: impl AsRef<Path>) -> Self {
        self.content_root = path.as_ref().to_path_buf();
        self
    }

    pub fn content_packs(mut self, packs: &[&str]) -> Self {
        self.content_packs = packs.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Extra catalogs: every `.ron` file in `path`, merged in file-name order.
    pub fn catalog_dir(mut self, path: impl AsRef<Path>) -> Self {
        self.catalog_dir = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Provide a catalog directly (for testing without files).
    pub fn with_catalog(mut self, catalog: Catalog) -> Self {
        self.catalogs.push(catalog);
        self
    }

    /// Replace the seeded generator with another source.
    pub fn with_random(mut self, rng: Box<dyn RandomSource>) -> Self {
        self.rng = Some(rng);
        self
    }

    pub fn event_gate(mut self, gate: EventGateConfig) -> Self {
        self.gate = gate;
        self
    }

    pub fn dialogue_patterns(mut self, patterns: DialoguePatterns) -> Self {
        self.patterns = patterns;
        self
    }

    pub fn build(self) -> Result<StoryEngine, EngineError> {
        let mut catalog = Catalog::default();

        // Content packs first
        for pack in &self.content_packs {
            let path = self.content_root.join(pack).join("catalog.ron");
            if path.exists() {
                catalog.merge(Catalog::load_from_ron(&path)?);
            } else {
                tracing::warn!(pack = pack.as_str(), path = %path.display(), "content pack not found");
            }
        }

        // Game-specific catalogs override packs
        if let Some(ref dir) = self.catalog_dir {
            if dir.exists() {
                load_ron_files_from_dir(dir, |path| {
                    catalog.merge(Catalog::load_from_ron(path)?);
                    Ok(())
                })?;
            }
        }

        // Direct catalogs last
        for direct in self.catalogs {
            catalog.merge(direct);
        }

        tracing::debug!(
            stories = catalog.stories.len(),
            events = catalog.events.len(),
            npcs = catalog.npcs.len(),
            locations = catalog.locations.len(),
            "catalog assembled"
        );

        let rng: Box<dyn RandomSource> = match self.rng {
            Some(rng) => rng,
            None => Box::new(SeededRandom::new(self.seed)),
        };

        Ok(StoryEngine {
            catalog,
            rng,
            gate: self.gate,
            patterns: self.patterns,
            scene_count: 0,
        })
    }
}

/// Load all .ron files from a directory in file-name order, calling
/// `loader` for each.
fn load_ron_files_from_dir<F>(dir: &Path, mut loader: F) -> Result<(), EngineError>
where
    F: FnMut(&Path) -> Result<(), EngineError>,
{
    let mut paths = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().and_then(|s| s.to_str()) == Some("ron") {
            paths.push(path);
        }
    }
    paths.sort();
    for path in paths {
        loader(&path)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::random::ScriptedRandom;
    use crate::schema::scene::Location;

    fn small_catalog() -> Catalog {
        Catalog::parse_ron(
            r#"(
                stories: [
                    (id: "intro", kind: "starting", title: "Intro",
                     location: Some((name: "Crossroads Inn", kind: "safe")),
                     choices: [(text: "Look around", tags: ["explore"])]),
                    (id: "road", kind: "exploration", title: "The Road",
                     location: Some((name: "King's Road", kind: "neutral"))),
                ],
            )"#,
        )
        .unwrap()
    }

    #[test]
    fn build_with_direct_catalog() {
        let engine = StoryEngine::builder()
            .with_catalog(small_catalog())
            .build()
            .unwrap();
        assert_eq!(engine.catalog().stories.len(), 2);
        assert!(engine.event_gate().enabled);
    }

    #[test]
    fn later_catalogs_override() {
        let override_cat = Catalog::parse_ron(r#"(stories: [(id: "road", title: "The Old Road")])"#).unwrap();
        let engine = StoryEngine::builder()
            .with_catalog(small_catalog())
            .with_catalog(override_cat)
            .build()
            .unwrap();
        assert_eq!(engine.catalog().story("road").map(|s| s.title.as_str()), Some("The Old Road"));
    }

    #[test]
    fn missing_pack_is_skipped() {
        let engine = StoryEngine::builder()
            .content_root("does/not/exist")
            .content_packs(&["nothing"])
            .build()
            .unwrap();
        assert!(engine.catalog().is_empty());
    }

    #[test]
    fn scene_ids_count_up_and_resume() {
        let mut engine = StoryEngine::builder()
            .with_catalog(small_catalog())
            .with_random(Box::new(ScriptedRandom::constant(0.9)))
            .build()
            .unwrap();
        let player = Player::new("Ayla", "warrior");
        let state = GameState::new();
        let first = engine.starting_scene(&player, &state);
        assert_eq!(first.id, "scene_1");
        assert_eq!(first.title, "Intro");

        engine.resume_ids_after("scene_41");
        let choice = first.choices()[0].clone();
        let next = engine.advance(&player, &state, &first, &choice);
        assert_eq!(next.scene.id, "scene_42");
        assert!(!next.random_event);
        assert_eq!(next.scene.title, "The Road");
    }

    #[test]
    fn gate_fires_on_low_draw() {
        let mut engine = StoryEngine::builder()
            .with_catalog(small_catalog())
            .with_random(Box::new(ScriptedRandom::constant(0.01)))
            .build()
            .unwrap();
        let player = Player::new("Ayla", "warrior");
        let state = GameState::new();
        let here = Scene::new("scene_1", "Inn", Location::new("Crossroads Inn", "safe", ""));
        let t = engine.advance(&player, &state, &here, &Choice::new("Wait", &[]));
        assert!(t.random_event);
        assert!(t.scene.has_tag("event"));
        assert_eq!(t.scene.location, here.location);
    }

    #[test]
    fn same_seed_same_story() {
        let build = || {
            StoryEngine::builder()
                .with_catalog(small_catalog())
                .seed(7)
                .build()
                .unwrap()
        };
        let (mut a, mut b) = (build(), build());
        let player = Player::new("Ayla", "warrior");
        let state = GameState::new();
        let sa = a.starting_scene(&player, &state);
        let sb = b.starting_scene(&player, &state);
        assert_eq!(sa, sb);
        let choice = sa.choices()[0].clone();
        assert_eq!(
            a.advance(&player, &state, &sa, &choice),
            b.advance(&player, &state, &sb, &choice)
        );
    }
}
