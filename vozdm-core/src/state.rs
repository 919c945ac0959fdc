//! Party roster, location, quest and conversation history.
//!
//! This is the long-lived campaign state, as opposed to the per-encounter
//! [`crate::combat::CombatTracker`]. Everything here serializes so a session
//! can be saved and resumed.

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Conversation turns kept in memory.
pub const HISTORY_LIMIT: usize = 50;
/// Turns included when building a narrator prompt.
pub const RECENT_TURNS: usize = 15;

const DEFAULT_LOCATION: &str = "Inicio de la aventura";
const DEFAULT_QUEST: &str = "Por determinar";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlayerId(pub Uuid);

impl PlayerId {
    pub fn new() -> Self {
        PlayerId(Uuid::new_v4())
    }
}

impl Default for PlayerId {
    fn default() -> Self {
        Self::new()
    }
}

/// A player character in the party.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub class_name: String,
    pub level: u8,
    pub hp: u32,
    pub max_hp: u32,
    pub ac: i32,
    pub conditions: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

/// One exchange in the table conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub content: String,
    pub timestamp_secs: u64,
}

/// Campaign bookkeeping that outlives any single scene.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Progress {
    pub chapter: u32,
    pub completed_quests: Vec<String>,
    pub discovered_locations: Vec<String>,
    pub met_npcs: Vec<String>,
}

impl Default for Progress {
    fn default() -> Self {
        Progress {
            chapter: 1,
            completed_quests: Vec::new(),
            discovered_locations: Vec::new(),
            met_npcs: Vec::new(),
        }
    }
}

/// The full campaign state for one table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameState {
    players: Vec<Player>,
    location: String,
    quest: String,
    conversation: Vec<ChatTurn>,
    progress: Progress,
}

impl Default for GameState {
    fn default() -> Self {
        Self::new()
    }
}

impl GameState {
    pub fn new() -> Self {
        GameState {
            players: Vec::new(),
            location: DEFAULT_LOCATION.to_string(),
            quest: DEFAULT_QUEST.to_string(),
            conversation: Vec::new(),
            progress: Progress::default(),
        }
    }

    /// Register a player. HP doubles as max HP at creation time.
    pub fn add_player(&mut self, name: &str, class_name: &str, level: u8, hp: u32, ac: i32) -> PlayerId {
        let id = PlayerId::new();
        self.players.push(Player {
            id,
            name: name.to_string(),
            class_name: class_name.to_string(),
            level,
            hp,
            max_hp: hp,
            ac,
            conditions: Vec::new(),
        });
        id
    }

    pub fn remove_player(&mut self, id: PlayerId) {
        self.players.retain(|p| p.id != id);
    }

    /// Case-insensitive lookup by character name.
    pub fn find_player(&self, name: &str) -> Option<&Player> {
        let needle = name.to_lowercase();
        self.players.iter().find(|p| p.name.to_lowercase() == needle)
    }

    /// Set a player's HP, clamped to their maximum.
    pub fn update_player_hp(&mut self, id: PlayerId, hp: u32) -> Option<&Player> {
        let player = self.players.iter_mut().find(|p| p.id == id)?;
        player.hp = hp.min(player.max_hp);
        Some(player)
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    /// One-line party summary for prompts and status views.
    pub fn players_summary(&self) -> String {
        if self.players.is_empty() {
            return "No hay jugadores registrados.".to_string();
        }
        self.players
            .iter()
            .map(|p| {
                format!(
                    "{} ({} Nv.{}, HP: {}/{}, CA: {})",
                    p.name, p.class_name, p.level, p.hp, p.max_hp, p.ac
                )
            })
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn quest(&self) -> &str {
        &self.quest
    }

    /// Move the party and record the location as discovered.
    pub fn update_location(&mut self, location: &str) {
        self.location = location.to_string();
        if !self
            .progress
            .discovered_locations
            .iter()
            .any(|l| l == location)
        {
            self.progress.discovered_locations.push(location.to_string());
        }
    }

    pub fn update_quest(&mut self, quest: &str) {
        self.quest = quest.to_string();
    }

    pub fn progress(&self) -> &Progress {
        &self.progress
    }

    pub fn advance_chapter(&mut self) {
        self.progress.chapter += 1;
    }

    pub fn complete_quest(&mut self, quest: &str) {
        if !self.progress.completed_quests.iter().any(|q| q == quest) {
            self.progress.completed_quests.push(quest.to_string());
        }
    }

    pub fn record_met_npc(&mut self, name: &str) {
        if !self.progress.met_npcs.iter().any(|n| n == name) {
            self.progress.met_npcs.push(name.to_string());
        }
    }

    /// Append a conversation turn, dropping the oldest past [`HISTORY_LIMIT`].
    pub fn push_turn(&mut self, role: ChatRole, content: &str) {
        self.conversation.push(ChatTurn {
            role,
            content: content.to_string(),
            timestamp_secs: unix_now(),
        });
        if self.conversation.len() > HISTORY_LIMIT {
            let excess = self.conversation.len() - HISTORY_LIMIT;
            self.conversation.drain(..excess);
        }
    }

    pub fn conversation(&self) -> &[ChatTurn] {
        &self.conversation
    }

    /// The last [`RECENT_TURNS`] turns, for prompt assembly.
    pub fn recent_turns(&self) -> &[ChatTurn] {
        let start = self.conversation.len().saturating_sub(RECENT_TURNS);
        &self.conversation[start..]
    }

    /// Most recent thing a player said, if anything.
    pub fn last_player_message(&self) -> Option<&str> {
        self.conversation
            .iter()
            .rev()
            .find(|t| t.role == ChatRole::User)
            .map(|t| t.content.as_str())
    }

    /// Wipe everything back to a fresh campaign.
    pub fn reset(&mut self) {
        *self = GameState::new();
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
