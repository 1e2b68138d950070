/// Game session — owns the player, game state, current scene and any active
/// combat, and turns choice indices into state changes and new scenes.
///
/// Per choice the order is fixed: the choice's effects apply (and their
/// notifications go out), then the choice itself is announced, then the
/// random-event gate is rolled, then the next scene is produced and
/// announced.

use std::sync::mpsc::Receiver;

use crate::core::combat::{CombatAction, CombatOutcome, CombatState, RoundReport};
use crate::core::effects::{self, EffectReport};
use crate::core::engine::StoryEngine;
use crate::core::notify::{EventBus, GameEvent};
use crate::core::persistence::{SaveStore, Snapshot, QUICKSAVE_ID};
use crate::schema::npc::Npc;
use crate::schema::player::Player;
use crate::schema::scene::{Choice, Scene};
use crate::schema::state::GameState;

/// Scene tag that hands off to combat when the scene has a hostile character.
pub const COMBAT_START_TAG: &str = "combat_start";

/// What a successful [`GameSession::choose`] did.
#[derive(Debug, Clone, PartialEq)]
pub enum Progress {
    /// A new scene is current.
    Scene { random_event: bool },
    /// A new scene is current and it opened combat.
    CombatStarted { enemy: String },
    /// One combat round was played.
    Round(RoundReport),
}

pub struct GameSession {
    engine: StoryEngine,
    player: Player,
    state: GameState,
    scene: Scene,
    combat: Option<CombatState>,
    bus: EventBus,
}

impl GameSession {
    /// Start a new game: fresh state and the engine's starting scene.
    pub fn new(mut engine: StoryEngine, player: Player) -> Self {
        let state = GameState::new();
        let scene = engine.starting_scene(&player, &state);
        tracing::info!(player = player.name.as_str(), scene = scene.id.as_str(), "new game");
        let mut session = Self {
            engine,
            player,
            state,
            scene,
            combat: None,
            bus: EventBus::new(),
        };
        session.enter_scene_combat();
        session
    }

    /// Resume from a snapshot.
    pub fn restore(mut engine: StoryEngine, snapshot: Snapshot) -> Self {
        engine.resume_ids_after(&snapshot.current_scene.id);
        let mut player = snapshot.player;
        player.normalize();
        Self {
            engine,
            player,
            state: snapshot.game_state,
            scene: snapshot.current_scene,
            combat: None,
            bus: EventBus::new(),
        }
    }

    pub fn subscribe(&mut self) -> Receiver<GameEvent> {
        self.bus.subscribe()
    }

    pub fn player(&self) -> &Player {
        &self.player
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn combat(&self) -> Option<&CombatState> {
        self.combat.as_ref()
    }

    pub fn in_combat(&self) -> bool {
        self.combat.is_some()
    }

    pub fn engine(&self) -> &StoryEngine {
        &self.engine
    }

    /// Labels for the options currently on offer: scene choices, combat
    /// actions, or a single "Continue" once combat is resolved.
    pub fn options(&self) -> Vec<String> {
        match &self.combat {
            Some(c) if c.is_over() => vec!["Continue".to_string()],
            Some(_) => CombatAction::MENU.iter().map(|a| a.label().to_string()).collect(),
            None => self.scene.choices().iter().map(|c| c.text.clone()).collect(),
        }
    }

    /// Act on the option at `index`. `None` when the index is out of range,
    /// in which case nothing changes.
    pub fn choose(&mut self, index: usize) -> Option<Progress> {
        if self.combat.is_some() {
            return self.choose_in_combat(index);
        }

        let choice = self.scene.choice(index)?.clone();
        if let Some(descriptor) = &choice.effects {
            let report = effects::apply(&mut self.player, &mut self.state, descriptor);
            self.announce_effects(&report);
        }
        self.bus.publish(GameEvent::ChoiceMade {
            index,
            text: choice.text.clone(),
            tags: choice.tags.clone(),
        });

        let transition = self
            .engine
            .advance(&self.player, &self.state, &self.scene, &choice);
        self.set_scene(transition.scene);

        Some(match self.enter_scene_combat() {
            Some(enemy) => Progress::CombatStarted { enemy },
            None => Progress::Scene {
                random_event: transition.random_event,
            },
        })
    }

    /// Apply an action token directly (unknown tokens attack).
    pub fn combat_action(&mut self, token: &str) -> Option<Progress> {
        let active = self.combat.as_ref().map_or(false, |c| !c.is_over());
        if !active {
            return None;
        }
        self.play_combat_round(CombatAction::parse(token))
    }

    fn choose_in_combat(&mut self, index: usize) -> Option<Progress> {
        let combat = self.combat.as_ref()?;
        if let Some(outcome) = combat.outcome() {
            return (index == 0).then(|| self.leave_combat(outcome));
        }
        let action = CombatAction::from_index(index)?;
        self.play_combat_round(action)
    }

    fn play_combat_round(&mut self, action: CombatAction) -> Option<Progress> {
        let combat = self.combat.as_mut()?;
        let report = match combat.play_round(action, &mut self.player, &mut self.state, self.engine.rng()) {
            Ok(report) => report,
            Err(e) => {
                tracing::warn!(error = %e, "combat round rejected");
                return None;
            }
        };
        let enemy = combat.enemy.name.clone();

        if action == CombatAction::Magic && report.player_damage > 0 {
            self.bus.publish(GameEvent::PlayerUpdated);
        }
        self.bus.publish(GameEvent::CombatRound { round: report.round });
        if let Some(outcome) = report.outcome {
            self.bus.publish(GameEvent::PlayerUpdated);
            if report.reward.as_ref().map_or(false, |r| r.state_updated) {
                self.bus.publish(GameEvent::GameStateUpdated);
            }
            self.bus.publish(GameEvent::CombatResolved { enemy, outcome });
        }
        Some(Progress::Round(report))
    }

    /// Close a resolved fight and move on with a scene chosen for the outcome.
    fn leave_combat(&mut self, outcome: CombatOutcome) -> Progress {
        self.combat = None;
        let tag = match outcome {
            CombatOutcome::Victory => "combat_victory",
            CombatOutcome::Defeat => "combat_defeat",
        };
        let choice = Choice::new("Continue", &[tag]);
        self.bus.publish(GameEvent::ChoiceMade {
            index: 0,
            text: choice.text.clone(),
            tags: choice.tags.clone(),
        });
        let scene = self
            .engine
            .continue_from(&self.player, &self.state, &self.scene, &choice);
        self.set_scene(scene);
        Progress::Scene {
            random_event: false,
        }
    }

    /// Start combat against `enemy` outside the scene-tag hand-off.
    pub fn start_combat(&mut self, enemy: Npc) -> bool {
        if self.combat.is_some() {
            return false;
        }
        let name = enemy.name.clone();
        self.combat = Some(CombatState::start(enemy, &self.player));
        self.bus.publish(GameEvent::CombatStarted { enemy: name });
        true
    }

    /// Talk to the character at `character_index` in the current scene.
    pub fn converse(&mut self, character_index: usize) -> Option<&Scene> {
        if self.combat.is_some() {
            return None;
        }
        let npc = self.scene.characters.get(character_index)?.clone();
        let scene = self
            .engine
            .dialogue_scene(&npc, &self.player, &self.state, &self.scene);
        self.set_scene(scene);
        Some(&self.scene)
    }

    fn set_scene(&mut self, scene: Scene) {
        tracing::debug!(scene = scene.id.as_str(), title = scene.title.as_str(), "scene changed");
        self.scene = scene;
        self.bus.publish(GameEvent::SceneChanged {
            scene_id: self.scene.id.clone(),
            title: self.scene.title.clone(),
        });
    }

    /// Open combat if the current scene asks for it. Returns the enemy name.
    fn enter_scene_combat(&mut self) -> Option<String> {
        if !self.scene.has_tag(COMBAT_START_TAG) {
            return None;
        }
        let enemy = self.scene.hostile_character()?.clone();
        let name = enemy.name.clone();
        self.start_combat(enemy).then_some(name)
    }

    fn announce_effects(&mut self, report: &EffectReport) {
        if report.player_updated {
            self.bus.publish(GameEvent::PlayerUpdated);
        }
        if report.state_updated {
            self.bus.publish(GameEvent::GameStateUpdated);
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot::new(self.player.clone(), self.state.clone(), self.scene.clone())
    }

    /// Save under `id` (or a fresh id). Failures are logged and reported as
    /// `None`; the session carries on either way.
    pub fn save_to(&self, store: &mut dyn SaveStore, id: Option<&str>) -> Option<String> {
        match store.save(id, &self.snapshot()) {
            Ok(id) => Some(id),
            Err(e) => {
                tracing::warn!(error = %e, "save failed");
                None
            }
        }
    }

    /// Replace the session state with a stored snapshot. Returns false when
    /// the save is missing or unreadable.
    pub fn load_from(&mut self, store: &dyn SaveStore, id: &str) -> bool {
        match store.load(id) {
            Ok(Some(snapshot)) => {
                self.engine.resume_ids_after(&snapshot.current_scene.id);
                self.player = snapshot.player;
                self.player.normalize();
                self.state = snapshot.game_state;
                self.combat = None;
                self.bus.publish(GameEvent::PlayerUpdated);
                self.bus.publish(GameEvent::GameStateUpdated);
                self.set_scene(snapshot.current_scene);
                true
            }
            Ok(None) => false,
            Err(e) => {
                tracing::warn!(save = id, error = %e, "load failed");
                false
            }
        }
    }

    pub fn quicksave(&self, store: &mut dyn SaveStore) -> bool {
        self.save_to(store, Some(QUICKSAVE_ID)).is_some()
    }

    pub fn quickload(&mut self, store: &dyn SaveStore) -> bool {
        self.load_from(store, QUICKSAVE_ID)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::catalog::Catalog;
    use crate::core::events::EventGateConfig;
    use crate::core::persistence::MemorySaveStore;
    use crate::core::random::ScriptedRandom;

    fn engine(catalog: Catalog, draw: f64) -> StoryEngine {
        StoryEngine::builder()
            .with_catalog(catalog)
            .with_random(Box::new(ScriptedRandom::constant(draw)))
            .event_gate(EventGateConfig::disabled())
            .build()
            .unwrap()
    }

    #[test]
    fn out_of_range_choice_changes_nothing() {
        let mut session = GameSession::new(engine(Catalog::default(), 0.0), Player::new("Ayla", "warrior"));
        let rx = session.subscribe();
        let before = session.scene().clone();
        assert_eq!(session.choose(99), None);
        assert_eq!(session.scene(), &before);
        assert_eq!(rx.try_iter().count(), 0);
    }

    #[test]
    fn notification_order() {
        let mut session = GameSession::new(engine(Catalog::default(), 0.0), Player::new("Ayla", "warrior"));
        let rx = session.subscribe();
        // Generic opening at 0.0: third choice checks belongings
        let progress = session.choose(2).unwrap();
        assert_eq!(progress, Progress::Scene { random_event: false });
        let events: Vec<GameEvent> = rx.try_iter().collect();
        assert_eq!(events[0], GameEvent::GameStateUpdated);
        assert!(matches!(events[1], GameEvent::ChoiceMade { index: 2, .. }));
        assert!(matches!(events[2], GameEvent::SceneChanged { .. }));
        assert_eq!(events.len(), 3);
    }

    #[test]
    fn dialogue_with_scene_character() {
        let catalog = Catalog::parse_ron(
            r#"(
                stories: [(id: "intro", kind: "starting", title: "Inn",
                           location: Some((name: "Crossroads Inn", kind: "safe")),
                           characters: ["innkeeper"])],
                npcs: [(id: "innkeeper", name: "Galen", merchant: true)],
            )"#,
        )
        .unwrap();
        let mut session = GameSession::new(engine(catalog, 0.0), Player::new("Ayla", "warrior"));
        assert!(session.converse(3).is_none());
        let scene = session.converse(0).unwrap();
        assert_eq!(scene.title, "Talking with Galen");
        assert!(scene.choices().iter().any(|c| c.text == "Ask to see wares"));
    }

    #[test]
    fn quicksave_and_quickload() {
        let mut store = MemorySaveStore::new();
        let mut session = GameSession::new(engine(Catalog::default(), 0.0), Player::new("Ayla", "warrior"));
        assert!(session.quicksave(&mut store));
        let saved_scene = session.scene().clone();

        session.choose(0).unwrap();
        assert_ne!(session.scene().id, saved_scene.id);
        assert!(session.quickload(&store));
        assert_eq!(session.scene(), &saved_scene);
        assert!(!session.load_from(&store, "missing"));

        // Ids keep counting past the restored scene
        session.choose(0).unwrap();
        assert_eq!(session.scene().id, "scene_3");
    }
}
