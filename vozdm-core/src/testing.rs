//! Testing utilities for the narration pipeline.
//!
//! This module provides tools for integration testing:
//! - `MockNarrator` for deterministic testing without API calls
//! - `TestHarness` for scripted table scenarios
//! - Assertion helpers for verifying combat state

use crate::combat::CombatTracker;
use crate::dispatch::{dispatch, RecordingSink};
use crate::session::Exchange;
use crate::state::{ChatRole, GameState};
use crate::tags::{parse_tags, strip_for_speech};

/// A mock narrator that returns scripted annotated responses.
///
/// Use this for deterministic integration tests without API calls.
pub struct MockNarrator {
    /// Scripted responses to return in order.
    responses: Vec<String>,
    /// Index of next response to return.
    response_index: usize,
}

impl MockNarrator {
    pub fn new(responses: Vec<String>) -> Self {
        Self {
            responses,
            response_index: 0,
        }
    }

    /// Add a response to the queue.
    pub fn queue_response(&mut self, response: impl Into<String>) {
        self.responses.push(response.into());
    }

    /// Return the next scripted response, or a stock line when exhausted.
    pub fn next_response(&mut self) -> String {
        if self.response_index < self.responses.len() {
            let r = self.responses[self.response_index].clone();
            self.response_index += 1;
            r
        } else {
            "El narrador no tiene mas respuestas preparadas.".to_string()
        }
    }

    /// Reset the response index to replay from the beginning.
    pub fn reset(&mut self) {
        self.response_index = 0;
    }
}

/// Test harness running the full parse-and-dispatch pipeline against a
/// scripted narrator.
pub struct TestHarness {
    pub narrator: MockNarrator,
    pub state: GameState,
    pub combat: CombatTracker,
    pub sink: RecordingSink,
}

impl TestHarness {
    /// Create a harness with one sample player registered.
    pub fn new() -> Self {
        let mut state = GameState::new();
        state.add_player("Heroe", "Guerrero", 1, 10, 14);

        Self {
            narrator: MockNarrator::new(Vec::new()),
            state,
            combat: CombatTracker::new(),
            sink: RecordingSink::default(),
        }
    }

    /// Create a harness with an empty party.
    pub fn without_players() -> Self {
        Self {
            narrator: MockNarrator::new(Vec::new()),
            state: GameState::new(),
            combat: CombatTracker::new(),
            sink: RecordingSink::default(),
        }
    }

    /// Queue an annotated narrator response.
    pub fn expect_response(&mut self, text: impl Into<String>) -> &mut Self {
        self.narrator.queue_response(text);
        self
    }

    /// Send player input through the pipeline: record both turns, parse the
    /// scripted response and dispatch its tags.
    pub fn input(&mut self, text: &str) -> Exchange {
        let annotated = self.narrator.next_response();

        self.state.push_turn(ChatRole::User, text);
        self.state.push_turn(ChatRole::Assistant, &annotated);

        let tags = parse_tags(&annotated);
        dispatch(&tags, &mut self.combat, &mut self.state, &mut self.sink);

        Exchange {
            speech: strip_for_speech(&annotated),
            in_combat: self.combat.active,
            annotated,
            tags,
        }
    }

    pub fn in_combat(&self) -> bool {
        self.combat.active
    }

    /// HP of a combatant as (current, max), by case-insensitive name.
    pub fn combatant_hp(&self, name: &str) -> Option<(u32, u32)> {
        self.combat.find_by_name(name).map(|c| (c.hp, c.max_hp))
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Assertion Helpers
// ============================================================================

/// Assert a combat is active.
#[track_caller]
pub fn assert_in_combat(harness: &TestHarness) {
    assert!(harness.in_combat(), "Expected to be in combat");
}

/// Assert no combat is active.
#[track_caller]
pub fn assert_not_in_combat(harness: &TestHarness) {
    assert!(!harness.in_combat(), "Expected to NOT be in combat");
}

/// Assert a combatant exists with the expected HP.
#[track_caller]
pub fn assert_combatant_hp(harness: &TestHarness, name: &str, hp: u32) {
    match harness.combatant_hp(name) {
        Some((current, max)) => assert_eq!(
            current, hp,
            "Expected {name} at {hp} HP, got {current}/{max}"
        ),
        None => panic!("Expected combatant '{name}' in the roster"),
    }
}

/// Assert the initiative order matches the given names exactly.
#[track_caller]
pub fn assert_roster(harness: &TestHarness, names: &[&str]) {
    let actual: Vec<&str> = harness
        .combat
        .combatants()
        .iter()
        .map(|c| c.name.as_str())
        .collect();
    assert_eq!(actual, names, "Initiative order mismatch");
}
