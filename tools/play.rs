/// Play — terminal front end for walking through a catalog.
///
/// Usage: play [--content <dir>] [--pack <name>] [--seed <n>]
///             [--name <name>] [--archetype <archetype>] [--saves <dir>]
///
/// Commands:
///   <n>           pick option n (1-based)
///   talk <n>      talk to character n in the scene
///   stats         show the character sheet
///   inv           show inventory, flags and relationships
///   save [id]     save the game (quicksave without an id)
///   load [id]     load a save (quicksave without an id)
///   saves         list saves
///   help          list commands
///   quit          exit

use adventure_engine::core::combat::CombatOutcome;
use adventure_engine::core::engine::StoryEngine;
use adventure_engine::core::notify::GameEvent;
use adventure_engine::core::persistence::{DirSaveStore, MemorySaveStore, SaveStore};
use adventure_engine::core::session::{GameSession, Progress};
use adventure_engine::schema::player::Player;
use std::io::{self, BufRead, Write};
use std::sync::mpsc::Receiver;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();

    let mut content_root = "content".to_string();
    let mut pack = "default".to_string();
    let mut seed: u64 = 42;
    let mut name = "Wanderer".to_string();
    let mut archetype = "warrior".to_string();
    let mut saves_dir = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                print_usage();
                return;
            }
            "--content" if i + 1 < args.len() => {
                i += 1;
                content_root = args[i].clone();
            }
            "--pack" if i + 1 < args.len() => {
                i += 1;
                pack = args[i].clone();
            }
            "--seed" if i + 1 < args.len() => {
                i += 1;
                seed = args[i].parse().unwrap_or(42);
            }
            "--name" if i + 1 < args.len() => {
                i += 1;
                name = args[i].clone();
            }
            "--archetype" if i + 1 < args.len() => {
                i += 1;
                archetype = args[i].clone();
            }
            "--saves" if i + 1 < args.len() => {
                i += 1;
                saves_dir = Some(args[i].clone());
            }
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
                print_usage();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    let engine = match StoryEngine::builder()
        .content_root(&content_root)
        .content_packs(&[pack.as_str()])
        .seed(seed)
        .build()
    {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("ERROR building engine: {}", e);
            std::process::exit(1);
        }
    };

    let mut store: Box<dyn SaveStore> = match saves_dir {
        Some(ref dir) => match DirSaveStore::open(dir) {
            Ok(store) => Box::new(store),
            Err(e) => {
                eprintln!("ERROR opening save directory {}: {}", dir, e);
                std::process::exit(1);
            }
        },
        None => Box::new(MemorySaveStore::new()),
    };

    println!("Loaded {} stories from pack '{}'", engine.catalog().stories.len(), pack);
    println!("Seed: {}", seed);
    println!("Type 'help' for commands.\n");

    let mut session = GameSession::new(engine, Player::new(name, archetype.as_str()));
    let events = session.subscribe();
    print_scene(&session);

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("> ");
        stdout.flush().ok();

        let mut line = String::new();
        if stdin.lock().read_line(&mut line).is_err() || line.is_empty() {
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let parts: Vec<&str> = line.split_whitespace().collect();
        let cmd = parts[0].to_lowercase();

        if let Ok(n) = cmd.parse::<usize>() {
            match n.checked_sub(1).and_then(|idx| session.choose(idx)) {
                Some(Progress::Round(report)) => {
                    for l in &report.lines {
                        println!("  {}", l);
                    }
                    drain(&events);
                    print_options(&session);
                }
                Some(_) => {
                    drain(&events);
                    print_scene(&session);
                }
                None => println!("No option {}.", n),
            }
            continue;
        }

        match cmd.as_str() {
            "quit" | "exit" | "q" => {
                println!("Goodbye.");
                break;
            }
            "help" | "h" | "?" => print_help(),
            "talk" => {
                let idx = parts.get(1).and_then(|s| s.parse::<usize>().ok()).and_then(|n| n.checked_sub(1));
                match idx {
                    Some(idx) if session.converse(idx).is_some() => {
                        drain(&events);
                        print_scene(&session);
                    }
                    _ => println!("Nobody to talk to there."),
                }
            }
            "stats" => {
                let p = session.player();
                let s = p.stats();
                println!("{} the {} (level {})", p.name, p.archetype, s.level);
                println!("  Health {}/{}  Mana {}/{}", s.health, s.max_health, s.mana, s.max_mana);
                println!(
                    "  STR {}  INT {}  DEX {}  CHA {}  DEF {}  RES {}",
                    s.strength, s.intelligence, s.dexterity, s.charisma, s.defense, s.resistance
                );
                println!("  Experience {}/{}", s.experience, s.experience_to_level);
                println!("  Abilities: {}", p.abilities.join(", "));
            }
            "inv" => {
                let state = session.state();
                if state.inventory.is_empty() {
                    println!("Inventory: (empty)");
                } else {
                    println!("Inventory: {}", state.inventory.join(", "));
                }
                let mut flags: Vec<_> = state.flags.iter().collect();
                flags.sort_by(|a, b| a.0.cmp(b.0));
                for (flag, value) in flags {
                    println!("  flag {} = {:?}", flag, value);
                }
                let mut rels: Vec<_> = state.relationships.iter().collect();
                rels.sort_by(|a, b| a.0.cmp(b.0));
                for (npc, score) in rels {
                    println!("  {}: {}", npc, score);
                }
                println!("  World: {} / {} / danger {}", state.world.time, state.world.weather, state.world.danger);
            }
            "save" => {
                let saved = match parts.get(1) {
                    Some(id) => session.save_to(&mut *store, Some(*id)),
                    None => session.quicksave(&mut *store).then(|| "quicksave".to_string()),
                };
                match saved {
                    Some(id) => println!("Saved as '{}'.", id),
                    None => println!("Save failed."),
                }
            }
            "load" => {
                let loaded = match parts.get(1) {
                    Some(id) => session.load_from(&*store, id),
                    None => session.quickload(&*store),
                };
                if loaded {
                    drain(&events);
                    print_scene(&session);
                } else {
                    println!("No such save.");
                }
            }
            "saves" => match store.list() {
                Ok(saves) if saves.is_empty() => println!("No saves."),
                Ok(saves) => {
                    for s in saves {
                        println!(
                            "  {}  {} (level {}) at {}  [{}]",
                            s.id, s.player_name, s.level, s.location, s.timestamp
                        );
                    }
                }
                Err(e) => println!("ERROR listing saves: {}", e),
            },
            _ => println!("Unknown command: '{}'. Type 'help' for available commands.", cmd),
        }
    }
}

/// Print notable notifications; the rest are reflected in the next render.
fn drain(events: &Receiver<GameEvent>) {
    for event in events.try_iter() {
        match event {
            GameEvent::CombatStarted { enemy } => println!("\n*** Combat with {}! ***", enemy),
            GameEvent::CombatResolved { enemy, outcome } => match outcome {
                CombatOutcome::Victory => println!("\n*** You defeated {}! ***", enemy),
                CombatOutcome::Defeat => println!("\n*** {} has bested you. ***", enemy),
            },
            _ => {}
        }
    }
}

fn print_scene(session: &GameSession) {
    let scene = session.scene();
    println!("\n=== {} ===", scene.title);
    println!("[{}]", scene.location.name);
    for paragraph in &scene.narrative {
        println!("{}\n", paragraph);
    }
    if !scene.characters.is_empty() {
        let names: Vec<&str> = scene.characters.iter().map(|c| c.name.as_str()).collect();
        println!("Here: {}", names.join(", "));
    }
    print_options(session);
}

fn print_options(session: &GameSession) {
    if let Some(combat) = session.combat() {
        let p = session.player().stats();
        println!(
            "\nRound {}  You: {}/{} HP, {} MP  {}: {} HP",
            combat.round, combat.player_health, p.max_health, p.mana, combat.enemy.name, combat.enemy_health
        );
    }
    for (i, option) in session.options().iter().enumerate() {
        println!("  {}. {}", i + 1, option);
    }
}

fn print_usage() {
    println!("Play — terminal front end for walking through a catalog.");
    println!();
    println!("Usage: play [--content <dir>] [--pack <name>] [--seed <n>]");
    println!("            [--name <name>] [--archetype <archetype>] [--saves <dir>]");
    println!();
    println!("  --content <dir>        Content root holding <pack>/catalog.ron (default: content)");
    println!("  --pack <name>          Content pack to load (default: default)");
    println!("  --seed <n>             RNG seed (default: 42)");
    println!("  --name <name>          Character name (default: Wanderer)");
    println!("  --archetype <name>     warrior, mage, rogue, diplomat, ... (default: warrior)");
    println!("  --saves <dir>          Keep saves as RON files in this directory");
}

fn print_help() {
    println!("Commands:");
    println!("  <n>          Pick option n");
    println!("  talk <n>     Talk to character n in the scene");
    println!("  stats        Show the character sheet");
    println!("  inv          Show inventory, flags and relationships");
    println!("  save [id]    Save the game (quicksave without an id)");
    println!("  load [id]    Load a save (quicksave without an id)");
    println!("  saves        List saves");
    println!("  help         Show this help");
    println!("  quit         Exit");
}
