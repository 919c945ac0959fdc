//! Voice-driven tabletop RPG assistant core.
//!
//! This crate provides:
//! - A combat tracker with initiative order, turns, HP and conditions
//! - The narrator annotation protocol: tag parsing, dispatch, speech cleanup
//! - A dice engine with standard notation
//! - Keyword-relevance retrieval over reference texts
//! - Session orchestration over the OpenAI chat and speech APIs
//! - Save/load persistence
//!
//! # Quick Start
//!
//! ```ignore
//! use vozdm_core::{GameSession, NullSink, SessionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = openai::Client::from_env()?;
//!     let mut session = GameSession::new(client);
//!     session.state_mut().add_player("Thorin", "Guerrero", 3, 28, 16);
//!
//!     let exchange = session
//!         .player_message(Some("Thorin"), "abro la puerta", &mut NullSink)
//!         .await?;
//!     println!("{}", exchange.speech);
//!
//!     session.save("partida.json").await?;
//!     Ok(())
//! }
//! ```

pub mod combat;
pub mod dice;
pub mod dispatch;
pub mod persist;
pub mod prompt;
pub mod retrieval;
pub mod session;
pub mod state;
pub mod tags;
pub mod testing;

// Primary public API
pub use combat::{Combatant, CombatantId, CombatantSpec, CombatTracker};
pub use dispatch::{DispatchSink, NullSink, Observation, RecordingSink, StatusUpdate};
pub use retrieval::ReferenceLibrary;
pub use session::{Exchange, GameSession, SessionConfig, SessionError};
pub use state::{GameState, Player, PlayerId};
pub use tags::{parse_tags, strip_for_speech, ParsedTag, TagKind};
pub use testing::{MockNarrator, TestHarness};
