/// Crossroads example — a scripted walk through the default content pack.
///
/// A warrior starts at the Crossroads Inn, chats with the innkeeper, heads
/// into the forest looking for trouble, fights whatever turns up, and
/// quicksaves along the way.
///
/// Run with: cargo run --example crossroads

use adventure_engine::core::engine::StoryEngine;
use adventure_engine::core::notify::GameEvent;
use adventure_engine::core::persistence::MemorySaveStore;
use adventure_engine::core::session::{GameSession, Progress};
use adventure_engine::schema::player::Player;

/// Tags the walkthrough prefers, most wanted first.
const PREFERRED: [&str; 4] = ["danger", "investigate", "explore", "travel"];

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let engine = StoryEngine::builder()
        .content_packs(&["default"])
        .seed(2026)
        .build()
        .expect("Failed to build engine");

    let mut session = GameSession::new(engine, Player::new("Brannoc", "warrior"));
    let events = session.subscribe();
    let mut saves = MemorySaveStore::new();

    print_scene(&session);

    // --- Meet whoever is in the opening scene ---
    if !session.scene().characters.is_empty() {
        session.converse(0);
        print_scene(&session);
    }

    for step in 1..=12 {
        let progress = if session.in_combat() {
            // Always swing; once it's over, index 0 moves on
            session.choose(0)
        } else {
            let pick = preferred_choice(&session);
            println!("> {}", session.options()[pick]);
            session.choose(pick)
        };

        match progress {
            Some(Progress::Round(report)) => {
                for line in &report.lines {
                    println!("  {}", line);
                }
            }
            Some(Progress::CombatStarted { enemy }) => {
                print_scene(&session);
                println!("  (combat with {})", enemy);
            }
            Some(Progress::Scene { random_event }) => {
                if random_event {
                    println!("  (something unexpected happens)");
                }
                print_scene(&session);
            }
            None => break,
        }

        for event in events.try_iter() {
            if let GameEvent::CombatResolved { enemy, outcome } = event {
                println!("  == {:?} against {} ==", outcome, enemy);
            }
        }

        if step % 4 == 0 && session.quicksave(&mut saves) {
            println!("  [quicksaved at {}]", session.scene().location.name);
        }
    }

    // --- Final character sheet ---
    let p = session.player();
    let s = p.stats();
    println!("\n--- {} the {} ---", p.name, p.archetype);
    println!("Level {}  Health {}/{}  Experience {}/{}", s.level, s.health, s.max_health, s.experience, s.experience_to_level);
    println!("Inventory: {:?}", session.state().inventory);
}

fn preferred_choice(session: &GameSession) -> usize {
    let choices = session.scene().choices();
    PREFERRED
        .iter()
        .find_map(|tag| choices.iter().position(|c| c.has_tag(tag)))
        .unwrap_or(0)
}

fn print_scene(session: &GameSession) {
    let scene = session.scene();
    println!("\n=== {} ({}) ===", scene.title, scene.location.name);
    for paragraph in &scene.narrative {
        println!("{}", paragraph);
    }
}
