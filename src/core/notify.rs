/// Typed change notifications.
///
/// The session publishes a [`GameEvent`] after each mutation; any number of
/// subscribers receive every event on their own channel.

use std::sync::mpsc::{channel, Receiver, Sender};

use crate::core::combat::CombatOutcome;

#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    PlayerUpdated,
    GameStateUpdated,
    ChoiceMade {
        index: usize,
        text: String,
        tags: Vec<String>,
    },
    SceneChanged {
        scene_id: String,
        title: String,
    },
    CombatStarted {
        enemy: String,
    },
    CombatRound {
        round: u32,
    },
    CombatResolved {
        enemy: String,
        outcome: CombatOutcome,
    },
}

/// Fan-out of events to subscribers. Disconnected receivers are pruned on
/// the next publish.
#[derive(Debug, Default)]
pub struct EventBus {
    subscribers: Vec<Sender<GameEvent>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self) -> Receiver<GameEvent> {
        let (tx, rx) = channel();
        self.subscribers.push(tx);
        rx
    }

    pub fn publish(&mut self, event: GameEvent) {
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}
