/// Combat resolution — a turn-based state machine between the player and
/// one enemy.
///
/// `NotStarted → InProgress → Resolved(Victory | Defeat)`. Each call to
/// [`CombatState::play_round`] resolves one full exchange. Health during the
/// fight lives in the combat snapshot; it is written back to the player only
/// when the fight resolves. Mana is spent on the player directly.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::effects::{self, EffectReport};
use crate::core::random::RandomSource;
use crate::schema::npc::Npc;
use crate::schema::player::{Player, StatName};
use crate::schema::state::GameState;

pub const MAGIC_COST: i64 = 5;
pub const MAGIC_MULTIPLIER: f64 = 1.5;
pub const SPECIAL_MULTIPLIER: f64 = 1.5;

/// Below this fraction of its starting health the enemy turns desperate.
const DESPERATION_THRESHOLD: f64 = 0.3;
const DESPERATE_SPECIAL_CHANCE: f64 = 0.7;
const SPECIAL_CHANCE: f64 = 0.2;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CombatError {
    #[error("combat has not started")]
    NotStarted,
    #[error("combat already started")]
    AlreadyStarted,
    #[error("combat already resolved ({0:?})")]
    AlreadyResolved(CombatOutcome),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CombatOutcome {
    Victory,
    Defeat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CombatPhase {
    NotStarted,
    InProgress,
    Resolved(CombatOutcome),
}

/// What the player does in a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CombatAction {
    Attack,
    Magic,
    Dodge,
}

impl CombatAction {
    /// Presentation order: a choice index maps into this list.
    pub const MENU: [CombatAction; 3] = [Self::Attack, Self::Dodge, Self::Magic];

    /// Parse an action token. Anything unrecognized is an attack.
    pub fn parse(token: &str) -> Self {
        match token.trim().to_ascii_lowercase().as_str() {
            "magic" => Self::Magic,
            "dodge" => Self::Dodge,
            "attack" => Self::Attack,
            other => {
                tracing::debug!(token = other, "unknown combat action, attacking");
                Self::Attack
            }
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::MENU.get(index).copied()
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Attack => "Attack",
            Self::Magic => "Cast a spell",
            Self::Dodge => "Dodge",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EnemyAction {
    Attack,
    Special,
}

/// Outcome of one round.
#[derive(Debug, Clone, PartialEq)]
pub struct RoundReport {
    pub round: u32,
    pub action: CombatAction,
    pub player_damage: i64,
    /// `None` when the enemy fell before it could act.
    pub enemy_action: Option<EnemyAction>,
    pub enemy_damage: i64,
    pub outcome: Option<CombatOutcome>,
    /// Set when a victory applied the enemy's reward.
    pub reward: Option<EffectReport>,
    /// Log lines this round appended.
    pub lines: Vec<String>,
}

/// One combat session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombatState {
    pub enemy: Npc,
    pub round: u32,
    pub player_health: i64,
    pub enemy_health: i64,
    pub log: Vec<String>,
    pub phase: CombatPhase,
}

impl CombatState {
    pub fn new(enemy: Npc) -> Self {
        Self {
            enemy_health: enemy.stats.health,
            enemy,
            round: 0,
            player_health: 0,
            log: Vec::new(),
            phase: CombatPhase::NotStarted,
        }
    }

    /// Create and begin in one step.
    pub fn start(enemy: Npc, player: &Player) -> Self {
        let mut state = Self::new(enemy);
        state.snapshot(player);
        state
    }

    /// Snapshot both health pools and open the log.
    pub fn begin(&mut self, player: &Player) -> Result<(), CombatError> {
        match self.phase {
            CombatPhase::NotStarted => {
                self.snapshot(player);
                Ok(())
            }
            CombatPhase::InProgress => Err(CombatError::AlreadyStarted),
            CombatPhase::Resolved(outcome) => Err(CombatError::AlreadyResolved(outcome)),
        }
    }

    fn snapshot(&mut self, player: &Player) {
        self.round = 1;
        self.player_health = player.stats().health;
        self.enemy_health = self.enemy.stats.health;
        self.log = vec![format!("Combat with {} begins!", self.enemy.name)];
        self.phase = CombatPhase::InProgress;
        tracing::debug!(enemy = self.enemy.id.as_str(), "combat begins");
    }

    pub fn outcome(&self) -> Option<CombatOutcome> {
        match self.phase {
            CombatPhase::Resolved(outcome) => Some(outcome),
            _ => None,
        }
    }

    pub fn is_over(&self) -> bool {
        self.outcome().is_some()
    }

    /// Resolve one round with the player acting first.
    ///
    /// An enemy brought to zero health by the player's action does not
    /// counterattack, so one round never yields both outcomes.
    pub fn play_round(
        &mut self,
        action: CombatAction,
        player: &mut Player,
        state: &mut GameState,
        rng: &mut dyn RandomSource,
    ) -> Result<RoundReport, CombatError> {
        match self.phase {
            CombatPhase::InProgress => {}
            CombatPhase::NotStarted => return Err(CombatError::NotStarted),
            CombatPhase::Resolved(outcome) => return Err(CombatError::AlreadyResolved(outcome)),
        }

        let first_line = self.log.len();
        let round = self.round;
        let name = self.enemy.name.clone();

        let player_damage = match action {
            CombatAction::Attack => {
                let dmg = damage(
                    player.stats().strength as f64,
                    self.enemy.stats.defense as f64,
                    rng,
                );
                self.log.push(format!("You attack {} for {} damage!", name, dmg));
                dmg
            }
            CombatAction::Magic if player.stats().mana >= MAGIC_COST => {
                player.apply_delta(StatName::Mana, -MAGIC_COST);
                let dmg = damage(
                    player.stats().intelligence as f64 * MAGIC_MULTIPLIER,
                    self.enemy.stats.resistance as f64,
                    rng,
                );
                self.log.push(format!("You cast a spell at {} for {} damage!", name, dmg));
                dmg
            }
            CombatAction::Magic => {
                // The enemy still gets its turn
                self.log.push("You don't have enough mana!".to_string());
                0
            }
            CombatAction::Dodge => {
                self.log.push("You prepare to dodge the enemy attack.".to_string());
                0
            }
        };
        self.enemy_health = (self.enemy_health - player_damage).max(0);

        let mut enemy_action = None;
        let mut enemy_damage = 0;
        if self.enemy_health > 0 {
            let chosen = self.enemy_policy(rng);
            let defense = player.stats().defense as f64;
            enemy_damage = match chosen {
                EnemyAction::Special => {
                    let dmg = damage(self.enemy.stats.strength as f64 * SPECIAL_MULTIPLIER, defense, rng);
                    self.log.push(format!("{} uses a special attack for {} damage!", name, dmg));
                    dmg
                }
                EnemyAction::Attack => {
                    let mut dmg = damage(self.enemy.stats.strength as f64, defense, rng);
                    let mut line = format!("{} attacks you for ", name);
                    if action == CombatAction::Dodge {
                        dmg /= 2;
                        line.push_str(&format!("{} damage! (Reduced by dodge)", dmg));
                    } else {
                        line.push_str(&format!("{} damage!", dmg));
                    }
                    self.log.push(line);
                    dmg
                }
            };
            enemy_action = Some(chosen);
            self.player_health = (self.player_health - enemy_damage).max(0);
        }

        self.log.push(format!(
            "Round {} ends. You: {}HP, {}: {}HP",
            round, self.player_health, name, self.enemy_health
        ));
        self.round += 1;

        let mut reward = None;
        let outcome = if self.enemy_health <= 0 {
            reward = Some(self.resolve_victory(player, state));
            Some(CombatOutcome::Victory)
        } else if self.player_health <= 0 {
            self.resolve_defeat(player);
            Some(CombatOutcome::Defeat)
        } else {
            None
        };

        Ok(RoundReport {
            round,
            action,
            player_damage,
            enemy_action,
            enemy_damage,
            outcome,
            reward,
            lines: self.log[first_line..].to_vec(),
        })
    }

    /// Desperation roll first when badly hurt, then the flat special roll.
    fn enemy_policy(&self, rng: &mut dyn RandomSource) -> EnemyAction {
        let max = self.enemy.stats.health as f64;
        let desperate = (self.enemy_health as f64) < max * DESPERATION_THRESHOLD;
        if desperate && rng.chance(DESPERATE_SPECIAL_CHANCE) {
            return EnemyAction::Special;
        }
        if rng.chance(SPECIAL_CHANCE) {
            return EnemyAction::Special;
        }
        EnemyAction::Attack
    }

    fn resolve_victory(&mut self, player: &mut Player, state: &mut GameState) -> EffectReport {
        self.phase = CombatPhase::Resolved(CombatOutcome::Victory);
        self.log.push(format!("You defeated {}!", self.enemy.name));
        // Health first, so a level-up refill from the reward sticks
        player.set_health(self.player_health);

        let mut report = EffectReport {
            player_updated: true,
            ..EffectReport::default()
        };
        if let Some(reward) = &self.enemy.reward {
            if reward.experience != 0 {
                player.apply_delta(StatName::Experience, reward.experience);
                self.log.push(format!("You gained {} experience!", reward.experience));
            }
            let applied = effects::apply(player, state, &reward.effects);
            report.state_updated = applied.state_updated;
            report.skipped = applied.skipped;
            let loot = reward.effects.added_items();
            if !loot.is_empty() {
                self.log.push(format!("You obtained: {}", loot.join(", ")));
            }
        }
        tracing::info!(enemy = self.enemy.id.as_str(), rounds = self.round - 1, "combat won");
        report
    }

    fn resolve_defeat(&mut self, player: &mut Player) {
        self.phase = CombatPhase::Resolved(CombatOutcome::Defeat);
        self.log.push("You have been defeated!".to_string());
        player.set_health(1);
        tracing::info!(enemy = self.enemy.id.as_str(), "combat lost");
    }
}

/// Damage dealt by `attack` against `defense`.
///
/// Pre-jitter damage is `max(1, floor(attack - defense / 2))`, then a
/// symmetric integer jitter of `±floor(damage × 0.2)` is added. The result is
/// not re-clamped after jitter.
pub fn damage(attack: f64, defense: f64, rng: &mut dyn RandomSource) -> i64 {
    let base = pre_jitter_damage(attack, defense);
    let variation = (base as f64 * 0.2).floor() as i64;
    base + rng.int_inclusive(0, 2 * variation) - variation
}

pub fn pre_jitter_damage(attack: f64, defense: f64) -> i64 {
    ((attack - defense / 2.0).floor() as i64).max(1)
}
