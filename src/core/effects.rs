/// Effect application — mutates player and game state from descriptors.

use crate::schema::effect::{Effect, EffectDescriptor};
use crate::schema::player::Player;
use crate::schema::state::GameState;

/// Which change categories fired while applying one descriptor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EffectReport {
    pub player_updated: bool,
    pub state_updated: bool,
    /// Sub-effects that named something unknown and were skipped.
    pub skipped: Vec<String>,
}

impl EffectReport {
    pub fn any(&self) -> bool {
        self.player_updated || self.state_updated
    }
}

/// Apply every sub-effect of `descriptor` once, in authored order.
///
/// Nothing here can fail the descriptor as a whole: an unknown stat name or
/// world-state field is skipped and listed in the report.
pub fn apply(player: &mut Player, state: &mut GameState, descriptor: &EffectDescriptor) -> EffectReport {
    let mut report = EffectReport::default();
    for effect in &descriptor.effects {
        apply_one(player, state, effect, &mut report);
    }
    if !report.skipped.is_empty() {
        tracing::debug!(skipped = ?report.skipped, "sub-effects skipped");
    }
    report
}

fn apply_one(player: &mut Player, state: &mut GameState, effect: &Effect, report: &mut EffectReport) {
    match effect {
        Effect::StatDelta { stat, delta } => {
            if player.modify_stat(stat, *delta) {
                report.player_updated = true;
            } else {
                report.skipped.push(format!("stat:{}", stat));
            }
        }
        Effect::InventoryChange { add, remove } => {
            state.inventory.extend(add.iter().cloned());
            for item in remove {
                if let Some(pos) = state.inventory.iter().position(|i| i == item) {
                    state.inventory.remove(pos);
                }
            }
            report.state_updated = true;
        }
        Effect::RelationshipDelta { npc, delta } => {
            *state.relationships.entry(npc.clone()).or_insert(0) += delta;
            report.state_updated = true;
        }
        Effect::WorldStateOverride { field, value } => {
            if state.world.set(field, value) {
                report.state_updated = true;
            } else {
                report.skipped.push(format!("world:{}", field));
            }
        }
        Effect::FlagSet { flag, value } => {
            state.flags.insert(flag.clone(), value.clone());
            report.state_updated = true;
        }
        Effect::LocationVisited(location) => {
            state.visited_locations.insert(location.clone());
            report.state_updated = true;
        }
        Effect::QuestCompleted(quest) => {
            state.completed_quests.insert(quest.clone());
            report.state_updated = true;
        }
    }
}
