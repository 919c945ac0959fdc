//! Save and resume for a running table.
//!
//! Saves are human-readable JSON with a version field checked on load. Combat
//! state is included, so a table interrupted mid-encounter resumes on the same
//! round and turn.

use crate::combat::CombatTracker;
use crate::state::GameState;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tokio::fs;

/// Errors from persistence operations.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Version mismatch: expected {expected}, found {found}")]
    VersionMismatch { expected: u32, found: u32 },
}

/// Current save file version.
const SAVE_VERSION: u32 = 1;

/// A saved table with everything needed to resume play.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedGame {
    /// Save format version for compatibility checking.
    pub version: u32,

    /// When the save was created (unix seconds, as a string).
    pub saved_at: String,

    /// Campaign state: party, location, quest, conversation, progress.
    pub state: GameState,

    /// The combat in progress, if any.
    pub combat: Option<CombatTracker>,

    /// Quick-access summary for save browsers.
    pub metadata: SaveMetadata,
}

/// Metadata about the save file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveMetadata {
    /// Party character names.
    pub party: Vec<String>,

    /// Current location.
    pub location: String,

    /// Active quest.
    pub quest: String,

    /// Campaign chapter.
    pub chapter: u32,

    /// Whether a combat was running when the save was made.
    pub in_combat: bool,

    /// When the save was created (duplicated from parent for peek access).
    #[serde(default)]
    pub saved_at: String,
}

impl SavedGame {
    /// Snapshot the current table. A combat tracker is only carried when a
    /// combat is actually running.
    pub fn new(state: GameState, combat: &CombatTracker) -> Self {
        let saved_at = timestamp_now();
        let metadata = SaveMetadata {
            party: state.players().iter().map(|p| p.name.clone()).collect(),
            location: state.location().to_string(),
            quest: state.quest().to_string(),
            chapter: state.progress().chapter,
            in_combat: combat.active,
            saved_at: saved_at.clone(),
        };

        Self {
            version: SAVE_VERSION,
            saved_at,
            state,
            combat: combat.active.then(|| combat.clone()),
            metadata,
        }
    }

    /// Save to a JSON file.
    pub async fn save_json(&self, path: impl AsRef<Path>) -> Result<(), PersistError> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content).await?;
        Ok(())
    }

    /// Load from a JSON file.
    pub async fn load_json(path: impl AsRef<Path>) -> Result<Self, PersistError> {
        let content = fs::read_to_string(path).await?;
        let saved: Self = serde_json::from_str(&content)?;

        if saved.version != SAVE_VERSION {
            return Err(PersistError::VersionMismatch {
                expected: SAVE_VERSION,
                found: saved.version,
            });
        }

        Ok(saved)
    }

    /// Read just the metadata of a save file without loading the full state.
    pub async fn peek_metadata(path: impl AsRef<Path>) -> Result<SaveMetadata, PersistError> {
        let content = fs::read_to_string(path).await?;

        #[derive(Deserialize)]
        struct Partial {
            version: u32,
            metadata: SaveMetadata,
        }

        let partial: Partial = serde_json::from_str(&content)?;

        if partial.version != SAVE_VERSION {
            return Err(PersistError::VersionMismatch {
                expected: SAVE_VERSION,
                found: partial.version,
            });
        }

        Ok(partial.metadata)
    }
}

/// List all save files in a directory, most recent path first.
pub async fn list_saves(dir: impl AsRef<Path>) -> Result<Vec<SaveInfo>, PersistError> {
    let mut saves = Vec::new();
    let mut entries = fs::read_dir(dir).await?;

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().map(|e| e == "json").unwrap_or(false) {
            if let Ok(metadata) = SavedGame::peek_metadata(&path).await {
                saves.push(SaveInfo {
                    path: path.to_string_lossy().to_string(),
                    metadata,
                });
            }
        }
    }

    saves.sort_by(|a, b| b.path.cmp(&a.path));
    Ok(saves)
}

/// Information about a save file.
#[derive(Debug, Clone)]
pub struct SaveInfo {
    /// Path to the save file.
    pub path: String,

    /// Save metadata.
    pub metadata: SaveMetadata,
}

/// Auto-save path for a named table.
pub fn auto_save_path(base_dir: impl AsRef<Path>, table_name: &str) -> std::path::PathBuf {
    let sanitized = table_name
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect::<String>();
    base_dir.as_ref().join(format!("{sanitized}_autosave.json"))
}

/// Current timestamp without a chrono dependency.
fn timestamp_now() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};

    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    format!("{}", now.as_secs())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat::CombatantSpec;

    fn sample_state() -> GameState {
        let mut state = GameState::new();
        state.add_player("Thorin", "Guerrero", 3, 28, 16);
        state.update_location("Phandalin");
        state.update_quest("Encontrar la mina");
        state
    }

    #[tokio::test]
    async fn test_save_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partida.json");

        let saved = SavedGame::new(sample_state(), &CombatTracker::new());
        saved.save_json(&path).await.unwrap();

        let loaded = SavedGame::load_json(&path).await.unwrap();
        assert_eq!(loaded.state.players()[0].name, "Thorin");
        assert_eq!(loaded.state.location(), "Phandalin");
        assert!(loaded.combat.is_none());
    }

    #[tokio::test]
    async fn test_active_combat_survives_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partida.json");

        let mut combat = CombatTracker::new();
        combat.start_combat();
        combat.add_combatant(CombatantSpec {
            name: "Goblin".to_string(),
            initiative: 12,
            hp: 7,
            max_hp: None,
            ac: None,
            is_player: false,
        });
        combat.next_turn();

        SavedGame::new(sample_state(), &combat)
            .save_json(&path)
            .await
            .unwrap();

        let loaded = SavedGame::load_json(&path).await.unwrap();
        let combat = loaded.combat.expect("combat persisted");
        assert!(combat.active);
        assert_eq!(combat.combatants().len(), 1);
        assert_eq!(combat.current_combatant().unwrap().name, "Goblin");
    }

    #[tokio::test]
    async fn test_peek_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partida.json");

        SavedGame::new(sample_state(), &CombatTracker::new())
            .save_json(&path)
            .await
            .unwrap();

        let metadata = SavedGame::peek_metadata(&path).await.unwrap();
        assert_eq!(metadata.party, vec!["Thorin"]);
        assert_eq!(metadata.location, "Phandalin");
        assert_eq!(metadata.chapter, 1);
        assert!(!metadata.in_combat);
    }

    #[tokio::test]
    async fn test_version_mismatch_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partida.json");

        let mut saved = SavedGame::new(sample_state(), &CombatTracker::new());
        saved.version = 99;
        saved.save_json(&path).await.unwrap();

        match SavedGame::load_json(&path).await {
            Err(PersistError::VersionMismatch { expected: 1, found: 99 }) => {}
            other => panic!("expected version mismatch, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_list_saves() {
        let dir = tempfile::tempdir().unwrap();

        SavedGame::new(sample_state(), &CombatTracker::new())
            .save_json(dir.path().join("a.json"))
            .await
            .unwrap();
        SavedGame::new(GameState::new(), &CombatTracker::new())
            .save_json(dir.path().join("b.json"))
            .await
            .unwrap();
        tokio::fs::write(dir.path().join("notas.txt"), "no es un save")
            .await
            .unwrap();

        let saves = list_saves(dir.path()).await.unwrap();
        assert_eq!(saves.len(), 2);
    }

    #[test]
    fn test_auto_save_path_sanitizes() {
        let path = auto_save_path("/tmp/saves", "mesa de los jueves!");
        assert_eq!(
            path.to_string_lossy(),
            "/tmp/saves/mesa_de_los_jueves__autosave.json"
        );
    }
}
