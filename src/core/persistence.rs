/// Save snapshots and the stores that keep them.
///
/// The engine produces and consumes [`Snapshot`]s; where they live is up to
/// a [`SaveStore`]. Two stores ship here: a bounded in-memory one and a
/// directory of RON files.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

use crate::schema::player::Player;
use crate::schema::scene::Scene;
use crate::schema::state::GameState;

/// Most saves the in-memory store keeps before evicting the oldest.
pub const MAX_SAVES: usize = 10;
pub const QUICKSAVE_ID: &str = "quicksave";

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON serialization error: {0}")]
    Encode(#[from] ron::Error),
    #[error("RON deserialization error: {0}")]
    Decode(#[from] ron::error::SpannedError),
    #[error("invalid save: {0}")]
    Invalid(String),
    #[error("invalid save id '{0}'")]
    InvalidId(String),
}

/// Everything needed to resume a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub player: Player,
    pub game_state: GameState,
    pub current_scene: Scene,
    /// Seconds since the Unix epoch.
    pub timestamp: u64,
}

impl Snapshot {
    pub fn new(player: Player, game_state: GameState, current_scene: Scene) -> Self {
        Self {
            player,
            game_state,
            current_scene,
            timestamp: now(),
        }
    }

    pub fn to_ron(&self) -> Result<String, PersistenceError> {
        Ok(ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())?)
    }

    /// Parse and validate an exported snapshot. Health and mana outside
    /// their pools are clamped.
    pub fn from_ron(input: &str) -> Result<Snapshot, PersistenceError> {
        let mut snapshot: Snapshot = ron::from_str(input)?;
        snapshot.player.normalize();
        snapshot.validate()?;
        Ok(snapshot)
    }

    pub fn validate(&self) -> Result<(), PersistenceError> {
        if self.player.name.trim().is_empty() {
            return Err(PersistenceError::Invalid("player has no name".to_string()));
        }
        if self.current_scene.choices().is_empty() {
            return Err(PersistenceError::Invalid(format!(
                "scene '{}' has no choices",
                self.current_scene.id
            )));
        }
        Ok(())
    }

    pub fn summary(&self, id: &str) -> SaveSummary {
        SaveSummary {
            id: id.to_string(),
            player_name: self.player.name.clone(),
            archetype: self.player.archetype.name().to_string(),
            level: self.player.stats().level,
            scene_title: self.current_scene.title.clone(),
            location: self.current_scene.location.name.clone(),
            timestamp: self.timestamp,
        }
    }
}

/// Listing entry for a save slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveSummary {
    pub id: String,
    pub player_name: String,
    pub archetype: String,
    pub level: i64,
    pub scene_title: String,
    pub location: String,
    pub timestamp: u64,
}

/// Where snapshots are kept. A missing save is `Ok(None)`, not an error.
pub trait SaveStore {
    /// Store `snapshot` under `id`, or under a fresh id when `None`.
    /// Returns the id used.
    fn save(&mut self, id: Option<&str>, snapshot: &Snapshot) -> Result<String, PersistenceError>;
    fn load(&self, id: &str) -> Result<Option<Snapshot>, PersistenceError>;
    /// Returns false when there was nothing to delete.
    fn delete(&mut self, id: &str) -> Result<bool, PersistenceError>;
    /// Newest first.
    fn list(&self) -> Result<Vec<SaveSummary>, PersistenceError>;
}

/// Keeps up to [`MAX_SAVES`] snapshots in memory. Saving a new id past the
/// limit evicts the oldest snapshot.
#[derive(Debug, Default)]
pub struct MemorySaveStore {
    slots: Vec<(String, Snapshot)>,
    generated: u64,
}

impl MemorySaveStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

impl SaveStore for MemorySaveStore {
    fn save(&mut self, id: Option<&str>, snapshot: &Snapshot) -> Result<String, PersistenceError> {
        let id = match id {
            Some(id) => validate_id(id)?,
            None => {
                self.generated += 1;
                format!("save_{}_{}", snapshot.timestamp, self.generated)
            }
        };

        if let Some(slot) = self.slots.iter_mut().find(|(k, _)| *k == id) {
            slot.1 = snapshot.clone();
            return Ok(id);
        }

        if self.slots.len() >= MAX_SAVES {
            // The incoming snapshot is never a candidate, whatever its timestamp
            let oldest = self
                .slots
                .iter()
                .enumerate()
                .min_by_key(|(_, (_, s))| s.timestamp)
                .map(|(i, _)| i);
            if let Some(i) = oldest {
                let (evicted, _) = self.slots.remove(i);
                tracing::debug!(save = evicted.as_str(), "evicted oldest save");
            }
        }
        self.slots.push((id.clone(), snapshot.clone()));
        Ok(id)
    }

    fn load(&self, id: &str) -> Result<Option<Snapshot>, PersistenceError> {
        Ok(self
            .slots
            .iter()
            .find(|(k, _)| k == id)
            .map(|(_, s)| s.clone()))
    }

    fn delete(&mut self, id: &str) -> Result<bool, PersistenceError> {
        let before = self.slots.len();
        self.slots.retain(|(k, _)| k != id);
        Ok(self.slots.len() != before)
    }

    fn list(&self) -> Result<Vec<SaveSummary>, PersistenceError> {
        let mut out: Vec<SaveSummary> = self.slots.iter().map(|(k, s)| s.summary(k)).collect();
        out.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(out)
    }
}

/// One `<id>.ron` file per save inside a directory.
#[derive(Debug, Clone)]
pub struct DirSaveStore {
    dir: PathBuf,
}

impl DirSaveStore {
    /// Use `dir`, creating it if needed.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, PersistenceError> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn path_for(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{}.ron", id))
    }
}

impl SaveStore for DirSaveStore {
    fn save(&mut self, id: Option<&str>, snapshot: &Snapshot) -> Result<String, PersistenceError> {
        let id = match id {
            Some(id) => validate_id(id)?,
            None => {
                let mut n = 1;
                loop {
                    let candidate = format!("save_{}_{}", snapshot.timestamp, n);
                    if !self.path_for(&candidate).exists() {
                        break candidate;
                    }
                    n += 1;
                }
            }
        };
        std::fs::write(self.path_for(&id), snapshot.to_ron()?)?;
        Ok(id)
    }

    fn load(&self, id: &str) -> Result<Option<Snapshot>, PersistenceError> {
        let id = validate_id(id)?;
        let path = self.path_for(&id);
        if !path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(path)?;
        Snapshot::from_ron(&contents).map(Some)
    }

    fn delete(&mut self, id: &str) -> Result<bool, PersistenceError> {
        let id = validate_id(id)?;
        let path = self.path_for(&id);
        if !path.exists() {
            return Ok(false);
        }
        std::fs::remove_file(path)?;
        Ok(true)
    }

    fn list(&self) -> Result<Vec<SaveSummary>, PersistenceError> {
        let mut out = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|s| s.to_str()) != Some("ron") {
                continue;
            }
            let Some(id) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            match std::fs::read_to_string(&path)
                .map_err(PersistenceError::from)
                .and_then(|c| Snapshot::from_ron(&c))
            {
                Ok(snapshot) => out.push(snapshot.summary(id)),
                Err(e) => tracing::warn!(path = %path.display(), error = %e, "skipping unreadable save"),
            }
        }
        out.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(out)
    }
}

/// Save ids become file names: letters, digits, `_` and `-` only.
fn validate_id(id: &str) -> Result<String, PersistenceError> {
    let ok = !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if ok {
        Ok(id.to_string())
    } else {
        Err(PersistenceError::InvalidId(id.to_string()))
    }
}

fn now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
