/// Template catalog — read-only story, location, event, and NPC collections.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::schema::template::{EventTemplate, LocationTemplate, NpcTemplate, StoryTemplate};

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON deserialization error: {0}")]
    Ron(#[from] ron::error::SpannedError),
    #[error("duplicate {kind} id '{id}' in one catalog file")]
    DuplicateId { kind: &'static str, id: String },
}

/// The authored content the engine draws from. Never mutated by the engine.
///
/// Collections keep authored order so weighted sampling is reproducible;
/// lookups by id are linear, which is fine at catalog scale.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Catalog {
    pub stories: Vec<StoryTemplate>,
    pub locations: Vec<LocationTemplate>,
    pub events: Vec<EventTemplate>,
    pub npcs: Vec<NpcTemplate>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a catalog from a RON file.
    pub fn load_from_ron(path: &Path) -> Result<Catalog, CatalogError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse_ron(&contents)
    }

    /// Parse a catalog from a RON string. Ids must be unique per collection.
    pub fn parse_ron(input: &str) -> Result<Catalog, CatalogError> {
        let catalog: Catalog = ron::from_str(input)?;
        check_unique("story", catalog.stories.iter().map(|s| s.id.as_str()))?;
        check_unique("event", catalog.events.iter().map(|e| e.id.as_str()))?;
        check_unique("npc", catalog.npcs.iter().map(|n| n.id.as_str()))?;
        check_unique("location", catalog.locations.iter().map(|l| l.name.as_str()))?;
        Ok(catalog)
    }

    /// Merge another catalog into this one. Records from `other` replace
    /// records in `self` with the same id, keeping their original position;
    /// new records are appended.
    pub fn merge(&mut self, other: Catalog) {
        merge_by(&mut self.stories, other.stories, |s| s.id.clone());
        merge_by(&mut self.events, other.events, |e| e.id.clone());
        merge_by(&mut self.npcs, other.npcs, |n| n.id.clone());
        merge_by(&mut self.locations, other.locations, |l| l.name.clone());
    }

    pub fn story(&self, id: &str) -> Option<&StoryTemplate> {
        self.stories.iter().find(|s| s.id == id)
    }

    pub fn event(&self, id: &str) -> Option<&EventTemplate> {
        self.events.iter().find(|e| e.id == id)
    }

    pub fn npc(&self, id: &str) -> Option<&NpcTemplate> {
        self.npcs.iter().find(|n| n.id == id)
    }

    pub fn is_empty(&self) -> bool {
        self.stories.is_empty()
            && self.locations.is_empty()
            && self.events.is_empty()
            && self.npcs.is_empty()
    }
}

fn check_unique<'a>(
    kind: &'static str,
    ids: impl Iterator<Item = &'a str>,
) -> Result<(), CatalogError> {
    let mut seen = rustc_hash::FxHashSet::default();
    for id in ids {
        if !seen.insert(id) {
            return Err(CatalogError::DuplicateId {
                kind,
                id: id.to_string(),
            });
        }
    }
    Ok(())
}

fn merge_by<T, F>(base: &mut Vec<T>, incoming: Vec<T>, key: F)
where
    F: Fn(&T) -> String,
{
    for item in incoming {
        let k = key(&item);
        match base.iter().position(|existing| key(existing) == k) {
            Some(pos) => base[pos] = item,
            None => base.push(item),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SMALL: &str = r#"(
        stories: [
            (id: "intro", kind: "starting", title: "Intro"),
            (id: "road", kind: "exploration", title: "The Road", weight: Some(2.0)),
        ],
        locations: [
            (name: "Mistwood Forest", kind: "wilderness", description: "Mist."),
        ],
        npcs: [
            (id: "innkeeper", name: "Galen"),
        ],
    )"#;

    #[test]
    fn parse_small_catalog() {
        let c = Catalog::parse_ron(SMALL).unwrap();
        assert_eq!(c.stories.len(), 2);
        assert_eq!(c.locations.len(), 1);
        assert!(c.events.is_empty());
        assert_eq!(c.npc("innkeeper").map(|n| n.name.as_str()), Some("Galen"));
        assert!(c.story("intro").unwrap().is_starting());
        assert!(c.story("missing").is_none());
    }

    #[test]
    fn duplicate_ids_rejected() {
        let input = r#"(stories: [(id: "a", title: "A"), (id: "a", title: "B")])"#;
        let err = Catalog::parse_ron(input).unwrap_err();
        assert!(matches!(err, CatalogError::DuplicateId { kind: "story", .. }));
    }

    #[test]
    fn malformed_ron_is_an_error() {
        assert!(matches!(
            Catalog::parse_ron("(stories: [(id: )])"),
            Err(CatalogError::Ron(_))
        ));
    }

    #[test]
    fn merge_precedence() {
        let mut base = Catalog::parse_ron(SMALL).unwrap();
        let other = Catalog::parse_ron(
            r#"(stories: [(id: "road", title: "The Old Road"), (id: "ruins", title: "Ruins")])"#,
        )
        .unwrap();
        base.merge(other);

        assert_eq!(base.stories.len(), 3);
        // Replaced in place
        assert_eq!(base.stories[1].title, "The Old Road");
        assert_eq!(base.stories[1].weight, None);
        assert_eq!(base.stories[2].id, "ruins");
        // Untouched collections survive
        assert_eq!(base.locations.len(), 1);
    }

    #[test]
    fn default_is_empty() {
        assert!(Catalog::default().is_empty());
    }
}
