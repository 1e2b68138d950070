/// Procedural fallback content — used when no authored template qualifies.

use crate::core::catalog::Catalog;
use crate::core::random::RandomSource;
use crate::schema::effect::EffectDescriptor;
use crate::schema::player::Archetype;
use crate::schema::scene::{Choice, Location, Scene};

/// Built-in places used when the catalog has no location records.
const LOCATION_POOLS: &[(&str, &[&str], &str)] = &[
    (
        "village",
        &["Oakvale", "Rivertown", "Highfield", "Westmarch"],
        "A small settlement with humble buildings and friendly locals.",
    ),
    (
        "wilderness",
        &["Dark Forest", "Mountain Pass", "Misty Valley", "Rolling Hills"],
        "Untamed nature surrounds you, full of both beauty and danger.",
    ),
    (
        "dungeon",
        &["Ancient Ruins", "Forgotten Crypt", "Abandoned Mine", "Mystical Cave"],
        "A foreboding place, dark and mysterious, promising both danger and treasure.",
    ),
    (
        "town",
        &["Ironforge", "Silverpine", "Goldcrest", "Stormhaven"],
        "A bustling place filled with various shops, inns, and plenty of potential opportunities.",
    ),
];

/// Pick a fresh location: from the catalog if it has any, else built in.
pub fn random_location(catalog: &Catalog, rng: &mut dyn RandomSource) -> Location {
    if !catalog.locations.is_empty() {
        let idx = rng.index(catalog.locations.len());
        return catalog.locations[idx].to_location();
    }
    let (kind, names, description) = LOCATION_POOLS[rng.index(LOCATION_POOLS.len())];
    let name = names[rng.index(names.len())];
    Location::new(name, kind, description)
}

/// Narrative paragraph for a scene whose template supplied none.
pub fn default_narrative(location: &Location) -> String {
    let description = if location.description.is_empty() {
        format!("A {} place.", if location.kind.is_empty() { "mysterious" } else { &location.kind })
    } else {
        location.description.clone()
    };
    format!("You find yourself at {}. {}", location.name, description)
}

/// Choices for a scene whose template supplied none.
pub fn default_choices(location: &Location, archetype: &Archetype) -> Vec<Choice> {
    let mut choices = vec![
        Choice::new("Explore further", &["explore"]),
        Choice::new("Rest for a while", &["rest"])
            .with_effects(EffectDescriptor::new().stat("health", 5).stat("mana", 5)),
    ];

    match location.kind.as_str() {
        "town" | "village" | "safe" => {
            choices.push(Choice::new("Talk to locals", &["social"]));
            choices.push(Choice::new("Visit the market", &["shop", "social"]));
        }
        "wilderness" | "dangerous" => {
            choices.push(Choice::new("Proceed with caution", &["explore", "danger"]));
            choices.push(Choice::new("Look for resources", &["gather"]));
        }
        "dungeon" | "ruins" => {
            choices.push(Choice::new("Search for treasures", &["loot", "danger"]));
            choices.push(Choice::new("Examine the area carefully", &["investigate"]));
        }
        _ => {}
    }

    match archetype {
        Archetype::Warrior => choices.push(Choice::new("Look for challenges", &["combat"])),
        Archetype::Mage => choices.push(Choice::new(
            "Study the surroundings for magical properties",
            &["magic", "investigate"],
        )),
        Archetype::Rogue => {
            choices.push(Choice::new("Look for something valuable", &["steal", "loot"]))
        }
        Archetype::Diplomat => {
            choices.push(Choice::new("Gather information", &["social", "investigate"]))
        }
        Archetype::Other(_) => {}
    }

    if location.kind != "wilderness" {
        choices.push(Choice::new(format!("Leave {}", location.name), &["leave", "travel"]));
    }
    choices
}

/// Entry scene when no starting template fits the player.
pub fn starting_scene(id: String, rng: &mut dyn RandomSource) -> Scene {
    let openings = [
        (
            Location::new("Crossroads Inn", "safe", "A cozy tavern at the crossroads between several towns."),
            "Your journey begins as you find yourself in the Crossroads Inn. The possibilities of adventure stretch out before you, waiting to be seized.",
        ),
        (
            Location::new("Village Square", "safe", "The central gathering place of a small frontier village."),
            "The Village Square bustles with activity as you arrive, marking the beginning of your adventure.",
        ),
        (
            Location::new("Harbor Docks", "neutral", "The busy docks of a coastal trading town."),
            "The salty air of the Harbor Docks fills your lungs as you contemplate the path ahead.",
        ),
        (
            Location::new("Forest Edge", "neutral", "The boundary between civilization and the untamed wilds."),
            "Standing at the Forest Edge, you can feel the call of adventure pulling you forward.",
        ),
    ];
    let (location, narrative) = openings[rng.index(openings.len())].clone();

    Scene::new(id, "The Beginning", location)
        .with_description("Your adventure begins here.")
        .with_narrative(vec![narrative.to_string()])
        .with_choices(vec![
            Choice::new("Explore the surroundings", &["explore"]),
            Choice::new("Talk to locals", &["social"]),
            Choice::new("Check your belongings", &["inventory"])
                .with_effects(EffectDescriptor::new().flag("checkedInventory", true)),
        ])
        .with_tags(["starting", "introduction"])
}

/// Continuation when no story template qualifies, even after relaxing.
///
/// A `travel`, `explore`, or `leave` choice moves somewhere new; anything
/// else stays put.
pub fn continuation_scene(
    id: String,
    current: &Location,
    choice: &Choice,
    archetype: &Archetype,
    catalog: &Catalog,
    rng: &mut dyn RandomSource,
) -> Scene {
    let moving = ["travel", "explore", "leave"].iter().any(|t| choice.has_tag(t));
    let location = if moving {
        random_location(catalog, rng)
    } else {
        current.clone()
    };

    let narrative = if moving {
        vec![
            format!("You make your way to {}. {}", location.name, location.description),
            "What will you do here?".to_string(),
        ]
    } else if choice.has_tag("social") {
        vec![
            "After speaking with the locals, you learn more about your surroundings.".to_string(),
            "There seems to be more to discover in this place.".to_string(),
        ]
    } else if choice.has_tag("combat") {
        vec![
            "The threat dealt with, you catch your breath and consider your next move.".to_string(),
            "What path will you choose now?".to_string(),
        ]
    } else {
        vec![
            "You continue your adventure, alert for any opportunities or dangers.".to_string(),
            "What will you do next?".to_string(),
        ]
    };

    let title = if moving {
        format!("At the {}", location.name)
    } else {
        "Continuing On".to_string()
    };
    let choices = default_choices(&location, archetype);

    Scene::new(id, title, location)
        .with_narrative(narrative)
        .with_choices(choices)
        .with_tags([if moving { "new_location" } else { "continuation" }])
}

/// Event scene when no event template qualifies. Stays at the current location.
pub fn event_scene(id: String, current: &Location, rng: &mut dyn RandomSource) -> Scene {
    let (title, narrative, choices) = match rng.index(3) {
        0 => (
            "A Strange Sound",
            format!(
                "As you travel through {}, you hear a strange sound nearby. It seems to be coming from just off the path.",
                current.name
            ),
            vec![
                Choice::new("Investigate the sound", &["investigate", "danger"]),
                Choice::new("Ignore it and continue on your way", &["ignore", "cautious"]),
            ],
        ),
        1 => (
            "An Unexpected Encounter",
            format!(
                "While making your way through {}, you spot a figure in the distance, watching you. They don't seem hostile... yet.",
                current.name
            ),
            vec![
                Choice::new("Approach and greet them", &["social", "approach"]),
                Choice::new("Ready yourself for trouble", &["combat", "cautious"]),
                Choice::new("Try to avoid them", &["stealth", "avoid"]),
            ],
        ),
        _ => (
            "Weather Changes",
            "The weather begins to change suddenly. Dark clouds roll in overhead, and the wind picks up."
                .to_string(),
            vec![
                Choice::new("Seek shelter immediately", &["shelter", "cautious"]),
                Choice::new("Press on despite the weather", &["brave", "continue"])
                    .with_effects(EffectDescriptor::new().stat("health", -5)),
            ],
        ),
    };

    Scene::new(id, title, current.clone())
        .with_description(title)
        .with_narrative(vec![narrative])
        .with_choices(choices)
        .with_tags(["event", "random"])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::random::ScriptedRandom;
    use crate::schema::template::LocationTemplate;

    #[test]
    fn builtin_location_when_catalog_empty() {
        let mut rng = ScriptedRandom::new(vec![0.3, 0.0]);
        let loc = random_location(&Catalog::default(), &mut rng);
        assert_eq!(loc.kind, "wilderness");
        assert_eq!(loc.name, "Dark Forest");
    }

    #[test]
    fn catalog_location_preferred() {
        let mut catalog = Catalog::default();
        catalog.locations.push(LocationTemplate {
            name: "Stormhaven City".to_string(),
            kind: "town".to_string(),
            description: "Walls.".to_string(),
        });
        let loc = random_location(&catalog, &mut ScriptedRandom::constant(0.7));
        assert_eq!(loc.name, "Stormhaven City");
    }

    #[test]
    fn default_choices_by_location_and_archetype() {
        let town = Location::new("Goldcrest", "town", "");
        let choices = default_choices(&town, &Archetype::Mage);
        let texts: Vec<&str> = choices.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(
            texts,
            vec![
                "Explore further",
                "Rest for a while",
                "Talk to locals",
                "Visit the market",
                "Study the surroundings for magical properties",
                "Leave Goldcrest",
            ]
        );

        let wild = Location::new("Misty Valley", "wilderness", "");
        let choices = default_choices(&wild, &Archetype::Other("bard".to_string()));
        assert_eq!(choices.len(), 4);
        assert!(choices.iter().all(|c| !c.has_tag("travel")));
    }

    #[test]
    fn default_narrative_fills_missing_description() {
        let loc = Location::new("Goldcrest", "town", "");
        assert_eq!(default_narrative(&loc), "You find yourself at Goldcrest. A town place.");
    }

    #[test]
    fn starting_scene_offers_inventory_check() {
        let scene = starting_scene("scene_1".to_string(), &mut ScriptedRandom::constant(0.0));
        assert_eq!(scene.location.name, "Crossroads Inn");
        assert!(scene.has_tag("starting"));
        let inv = scene.choices().iter().find(|c| c.has_tag("inventory")).unwrap();
        assert!(inv.effects.is_some());
    }

    #[test]
    fn continuation_keeps_location_unless_moving() {
        let here = Location::new("Crossroads Inn", "safe", "Warm.");
        let mut rng = ScriptedRandom::constant(0.0);
        let stay = continuation_scene(
            "s".to_string(),
            &here,
            &Choice::new("Check", &["inventory"]),
            &Archetype::Warrior,
            &Catalog::default(),
            &mut rng,
        );
        assert_eq!(stay.location, here);
        assert!(stay.has_tag("continuation"));

        let go = continuation_scene(
            "s".to_string(),
            &here,
            &Choice::new("Go", &["travel"]),
            &Archetype::Warrior,
            &Catalog::default(),
            &mut rng,
        );
        assert_eq!(go.location.name, "Oakvale");
        assert!(go.has_tag("new_location"));
        assert_eq!(go.title, "At the Oakvale");
    }

    #[test]
    fn event_scene_stays_in_place() {
        let here = Location::new("Mountain Pass", "wilderness", "");
        let scene = event_scene("e".to_string(), &here, &mut ScriptedRandom::constant(0.9));
        assert_eq!(scene.title, "Weather Changes");
        assert_eq!(scene.location, here);
        assert!(scene.has_tag("event"));
        assert_eq!(scene.choices().len(), 2);
    }
}
