/// Catalog Linter — validates story catalogs before they ship.
///
/// Usage: catalog_linter <catalog.ron | content_dir>
///
/// Every `.ron` file found is parsed (duplicate ids within one file are
/// parse errors), then the merged catalog is checked for dangling
/// references and content that can never be reached.

use adventure_engine::core::catalog::Catalog;
use adventure_engine::schema::effect::{Effect, EffectDescriptor};
use adventure_engine::schema::npc::Disposition;
use adventure_engine::schema::player::StatName;
use adventure_engine::schema::template::ChoiceTemplate;
use std::path::Path;
use std::process;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        println!("Usage: catalog_linter <catalog.ron | content_dir>");
        process::exit(0);
    }

    let root = Path::new(&args[1]);
    let mut catalog = Catalog::default();
    let mut load_errors = Vec::new();

    if root.is_file() {
        match Catalog::load_from_ron(root) {
            Ok(c) => catalog.merge(c),
            Err(e) => {
                eprintln!("ERROR: Failed to load catalog file: {}", e);
                process::exit(1);
            }
        }
    } else if root.is_dir() {
        load_catalogs_recursive(root, &mut catalog, &mut load_errors);
    } else {
        eprintln!("ERROR: Path '{}' does not exist", args[1]);
        process::exit(1);
    }

    println!(
        "Loaded {} stories, {} events, {} npcs, {} locations",
        catalog.stories.len(),
        catalog.events.len(),
        catalog.npcs.len(),
        catalog.locations.len()
    );

    let (mut errors, warnings) = lint_catalog(&catalog);
    errors.extend(load_errors);

    println!("\n=== Catalog Lint Report ===\n");

    if errors.is_empty() && warnings.is_empty() {
        println!("All checks passed!");
    }

    for warning in &warnings {
        println!("WARNING: {}", warning);
    }

    for error in &errors {
        println!("ERROR: {}", error);
    }

    println!(
        "\nSummary: {} errors, {} warnings",
        errors.len(),
        warnings.len()
    );

    if errors.is_empty() {
        process::exit(0);
    } else {
        process::exit(1);
    }
}

fn load_catalogs_recursive(dir: &Path, catalog: &mut Catalog, errors: &mut Vec<String>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    let mut paths: Vec<_> = entries.flatten().map(|e| e.path()).collect();
    paths.sort();
    for path in paths {
        if path.is_dir() {
            load_catalogs_recursive(&path, catalog, errors);
        } else if path.extension().and_then(|s| s.to_str()) == Some("ron") {
            match Catalog::load_from_ron(&path) {
                Ok(c) => {
                    println!("  Loaded: {}", path.display());
                    catalog.merge(c);
                }
                Err(e) => errors.push(format!("{}: {}", path.display(), e)),
            }
        }
    }
}

fn lint_catalog(catalog: &Catalog) -> (Vec<String>, Vec<String>) {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    if !catalog.stories.iter().any(|s| s.is_starting()) {
        warnings.push("no starting story; new games open with a generic scene".to_string());
    }
    if catalog.locations.is_empty() {
        warnings.push("no locations; travel falls back to built-in places".to_string());
    }

    for story in &catalog.stories {
        let what = format!("story '{}'", story.id);
        if story.base_weight() == 0.0 {
            warnings.push(format!("{} has zero weight and is never selected", what));
        }
        if story.choices.is_empty() {
            warnings.push(format!("{} has no choices; defaults will be generated", what));
        }
        if !story.is_starting() && !story.archetypes.is_empty() {
            warnings.push(format!("{} lists archetypes but is not a starting story", what));
        }
        check_characters(catalog, &what, &story.characters, &mut errors);
        check_choices(catalog, &what, &story.choices, &mut errors, &mut warnings);
        check_stats(&what, story.requirements.stats.keys(), &mut errors);

        if story.tags.iter().any(|t| t == "combat_start") {
            let has_enemy = story
                .characters
                .iter()
                .filter_map(|id| catalog.npc(id))
                .any(|npc| npc.disposition == Disposition::Hostile);
            if !has_enemy {
                errors.push(format!("{} is tagged combat_start but has no hostile character", what));
            }
        }
    }

    for event in &catalog.events {
        let what = format!("event '{}'", event.id);
        if event.location_types.is_empty() {
            warnings.push(format!("{} has no location types and can fire anywhere", what));
        }
        check_characters(catalog, &what, &event.characters, &mut errors);
        check_choices(catalog, &what, &event.choices, &mut errors, &mut warnings);
        check_stats(&what, event.requirements.stats.keys(), &mut errors);
    }

    for npc in &catalog.npcs {
        let what = format!("npc '{}'", npc.id);
        if let Some(reward) = &npc.reward {
            if npc.disposition != Disposition::Hostile {
                warnings.push(format!("{} has a reward but is never fought", what));
            }
            check_effects(catalog, &what, &reward.effects, &mut errors, &mut warnings);
        }
        if npc.stats.health <= 0 {
            errors.push(format!("{} has non-positive health", what));
        }
    }

    (errors, warnings)
}

fn check_characters(catalog: &Catalog, what: &str, ids: &[String], errors: &mut Vec<String>) {
    for id in ids {
        if catalog.npc(id).is_none() {
            errors.push(format!("{} references unknown npc '{}'", what, id));
        }
    }
}

fn check_choices(
    catalog: &Catalog,
    what: &str,
    choices: &[ChoiceTemplate],
    errors: &mut Vec<String>,
    warnings: &mut Vec<String>,
) {
    for choice in choices {
        if choice.text.trim().is_empty() {
            warnings.push(format!("{} has a choice with blank text (dropped at runtime)", what));
        }
        if let Some(target) = &choice.target {
            if catalog.story(target).is_none() {
                warnings.push(format!(
                    "{} choice '{}' targets unknown story '{}'",
                    what, choice.text, target
                ));
            }
        }
        if let Some(effects) = &choice.effects {
            let owner = format!("{} choice '{}'", what, choice.text);
            check_effects(catalog, &owner, effects, errors, warnings);
        }
    }
}

fn check_effects(
    catalog: &Catalog,
    what: &str,
    descriptor: &EffectDescriptor,
    errors: &mut Vec<String>,
    warnings: &mut Vec<String>,
) {
    for effect in &descriptor.effects {
        match effect {
            Effect::StatDelta { stat, .. } => check_stats(what, std::iter::once(stat), errors),
            Effect::WorldStateOverride { field, .. } => {
                if !matches!(field.as_str(), "time" | "weather" | "danger") {
                    errors.push(format!("{} overrides unknown world field '{}'", what, field));
                }
            }
            Effect::RelationshipDelta { npc, .. } => {
                if catalog.npc(npc).is_none() {
                    warnings.push(format!("{} changes relationship with unlisted npc '{}'", what, npc));
                }
            }
            _ => {}
        }
    }
}

fn check_stats<'a>(what: &str, stats: impl Iterator<Item = &'a String>, errors: &mut Vec<String>) {
    for stat in stats {
        if StatName::parse(stat).is_none() {
            errors.push(format!("{} names unknown stat '{}'", what, stat));
        }
    }
}
