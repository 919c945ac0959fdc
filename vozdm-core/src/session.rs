//! GameSession - the primary public API for running a table.
//!
//! Wraps the game state, combat tracker, reference library and API client
//! into one interface: feed it player utterances, get back the narrator's
//! annotated response with its parsed events already applied.

use crate::combat::CombatTracker;
use crate::dispatch::{dispatch, DispatchSink};
use crate::persist::{PersistError, SavedGame};
use crate::prompt;
use crate::retrieval::ReferenceLibrary;
use crate::state::{ChatRole, GameState};
use crate::tags::{parse_tags, strip_for_speech, ParsedTag};
use openai::{ChatRequest, Client, Message};
use std::path::Path;
use thiserror::Error;
use tracing::debug;

/// What the narrator says when the model returns an empty choice.
const SILENT_NARRATOR: &str = "El DM guarda silencio...";

/// Errors from GameSession operations.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("API error: {0}")]
    Api(#[from] openai::Error),

    #[error("Persistence error: {0}")]
    Persist(#[from] PersistError),
}

/// Configuration for a game session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Model override; the client default is used when `None`.
    pub model: Option<String>,

    /// Maximum tokens for narrator responses.
    pub max_tokens: u32,

    /// Temperature for narrator generation.
    pub temperature: f32,

    /// Voice used for speech synthesis.
    pub voice: String,

    /// Custom narrator instructions replacing the built-in ones.
    pub custom_instructions: Option<String>,

    /// Language hint passed to transcription.
    pub language: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            model: None,
            max_tokens: 1200,
            temperature: 0.8,
            voice: "onyx".to_string(),
            custom_instructions: None,
            language: "es".to_string(),
        }
    }
}

impl SessionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_voice(mut self, voice: impl Into<String>) -> Self {
        self.voice = voice.into();
        self
    }

    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.custom_instructions = Some(instructions.into());
        self
    }
}

/// One completed narrator exchange.
#[derive(Debug, Clone)]
pub struct Exchange {
    /// The full response, tags included, for the screen.
    pub annotated: String,

    /// The response with tags and emphasis stripped, for the voice.
    pub speech: String,

    /// The tags found in the response, in document order.
    pub tags: Vec<ParsedTag>,

    /// Whether a combat is active after applying the tags.
    pub in_combat: bool,
}

/// A running table.
///
/// Taking `&mut self` for [`player_message`](Self::player_message) means at
/// most one narrator exchange is in flight per session.
pub struct GameSession {
    client: Client,
    config: SessionConfig,
    state: GameState,
    combat: CombatTracker,
    library: ReferenceLibrary,
}

impl GameSession {
    pub fn new(client: Client) -> Self {
        Self::with_config(client, SessionConfig::default())
    }

    pub fn with_config(client: Client, config: SessionConfig) -> Self {
        Self {
            client,
            config,
            state: GameState::new(),
            combat: CombatTracker::new(),
            library: ReferenceLibrary::new(),
        }
    }

    /// Send a player utterance to the narrator and apply the response.
    ///
    /// On success the exchange is recorded in history, its tags dispatched in
    /// document order, and the cleaned speech text returned. On failure
    /// nothing is recorded or applied; the caller surfaces the error and the
    /// player simply repeats themselves.
    pub async fn player_message(
        &mut self,
        speaker: Option<&str>,
        text: &str,
        sink: &mut dyn DispatchSink,
    ) -> Result<Exchange, SessionError> {
        let line = prompt::format_player_line(speaker, text);
        let request = self.build_request(&line);

        let response = self.client.complete(request).await?;
        let annotated = response.text().unwrap_or(SILENT_NARRATOR).to_string();

        self.state.push_turn(ChatRole::User, &line);
        self.state.push_turn(ChatRole::Assistant, &annotated);

        let tags = parse_tags(&annotated);
        debug!(target: "vozdm::session", count = tags.len(), "etiquetas recibidas");
        dispatch(&tags, &mut self.combat, &mut self.state, sink);

        Ok(Exchange {
            speech: strip_for_speech(&annotated),
            in_combat: self.combat.active,
            annotated,
            tags,
        })
    }

    fn build_request(&self, line: &str) -> ChatRequest {
        let system = match &self.config.custom_instructions {
            Some(instructions) => instructions.clone(),
            None => prompt::build_system_prompt(&self.state, &self.combat, &self.library),
        };

        let mut messages = vec![Message::system(system)];
        for turn in self.state.recent_turns() {
            messages.push(match turn.role {
                ChatRole::User => Message::user(&turn.content),
                ChatRole::Assistant => Message::assistant(&turn.content),
            });
        }
        messages.push(Message::user(line));

        let mut request = ChatRequest::new(messages)
            .with_temperature(self.config.temperature)
            .with_max_tokens(self.config.max_tokens);
        if let Some(model) = &self.config.model {
            request = request.with_model(model.clone());
        }
        request
    }

    /// Transcribe a player's recorded audio.
    pub async fn transcribe(
        &self,
        filename: &str,
        audio: Vec<u8>,
    ) -> Result<String, SessionError> {
        Ok(self
            .client
            .transcribe(filename, audio, &self.config.language)
            .await?)
    }

    /// Synthesize speech for a cleaned narration, as MP3 bytes.
    ///
    /// Starting a new synthesis simply abandons any audio the caller was
    /// still playing; there is no queue.
    pub async fn synthesize_speech(&self, speech: &str) -> Result<Vec<u8>, SessionError> {
        Ok(self.client.synthesize(speech, &self.config.voice).await?)
    }

    /// Opening message for the table, before any exchange.
    pub fn welcome(&self) -> String {
        prompt::welcome_prompt(&self.state)
    }

    /// Save the table to a JSON file.
    pub async fn save(&self, path: impl AsRef<Path>) -> Result<(), SessionError> {
        SavedGame::new(self.state.clone(), &self.combat)
            .save_json(path)
            .await?;
        Ok(())
    }

    /// Resume a table from a JSON file.
    pub async fn load(
        client: Client,
        config: SessionConfig,
        path: impl AsRef<Path>,
    ) -> Result<Self, SessionError> {
        let saved = SavedGame::load_json(path).await?;
        let mut session = Self::with_config(client, config);
        session.state = saved.state;
        session.combat = saved.combat.unwrap_or_else(CombatTracker::new);
        Ok(session)
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut GameState {
        &mut self.state
    }

    pub fn combat(&self) -> &CombatTracker {
        &self.combat
    }

    pub fn combat_mut(&mut self) -> &mut CombatTracker {
        &mut self.combat
    }

    pub fn library_mut(&mut self) -> &mut ReferenceLibrary {
        &mut self.library
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }
}
