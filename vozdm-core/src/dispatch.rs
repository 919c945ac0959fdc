//! Applies parsed narrator tags to combat and game state.
//!
//! Tags are processed in strict document order: a `[COMBATE_INICIO]` ahead of
//! an `[INICIATIVA: ...]` in the same response must reset the tracker before
//! the roster fills. Application is best-effort: a target name that resolves
//! to nothing is dropped silently (the upstream text is natural language),
//! with a debug log for the curious.

use crate::combat::{CombatTracker, CombatantSpec};
use crate::state::GameState;
use crate::tags::{ParsedTag, TagKind};
use tracing::debug;

/// Narrator-internal information surfaced to an observation log. These never
/// mutate combat or game state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Observation {
    HiddenRoll(String),
    NarratorThought(String),
    SecretEvent(String),
}

/// A change to the party's location or active quest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusUpdate {
    Location(String),
    Quest(String),
}

/// Receiver for the side-channel outputs of dispatch.
pub trait DispatchSink {
    fn observation(&mut self, observation: Observation) {
        let _ = observation;
    }

    fn status_update(&mut self, update: StatusUpdate) {
        let _ = update;
    }
}

/// Sink that discards everything.
pub struct NullSink;

impl DispatchSink for NullSink {}

/// Sink that records everything, for log views and tests.
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub observations: Vec<Observation>,
    pub updates: Vec<StatusUpdate>,
}

impl DispatchSink for RecordingSink {
    fn observation(&mut self, observation: Observation) {
        self.observations.push(observation);
    }

    fn status_update(&mut self, update: StatusUpdate) {
        self.updates.push(update);
    }
}

/// Apply each tag, in document order, to the combat tracker and game state.
pub fn dispatch(
    tags: &[ParsedTag],
    combat: &mut CombatTracker,
    state: &mut GameState,
    sink: &mut dyn DispatchSink,
) {
    for tag in tags {
        match tag.kind {
            TagKind::CombatStart => combat.start_combat(),
            TagKind::CombatEnd => combat.end_combat(),
            TagKind::Initiative => apply_initiative(&tag.groups[0], combat, state),
            TagKind::Damage => {
                let (name, amount) = (&tag.groups[0], &tag.groups[1]);
                match (combat.resolve_name(name), amount.parse::<u32>()) {
                    (Some(id), Ok(amount)) => {
                        combat.apply_damage(id, amount);
                    }
                    _ => debug!(target: "vozdm::dispatch", %name, %amount, "dano descartado"),
                }
            }
            TagKind::Heal => {
                let (name, amount) = (&tag.groups[0], &tag.groups[1]);
                match (combat.resolve_name(name), amount.parse::<u32>()) {
                    (Some(id), Ok(amount)) => {
                        combat.heal(id, amount);
                    }
                    _ => debug!(target: "vozdm::dispatch", %name, %amount, "curacion descartada"),
                }
            }
            TagKind::HiddenRoll => {
                sink.observation(Observation::HiddenRoll(tag.groups[0].clone()));
            }
            TagKind::NarratorThought => {
                sink.observation(Observation::NarratorThought(tag.groups[0].clone()));
            }
            TagKind::SecretEvent => {
                sink.observation(Observation::SecretEvent(tag.groups[0].clone()));
            }
            TagKind::Location => {
                state.update_location(&tag.groups[0]);
                sink.status_update(StatusUpdate::Location(tag.groups[0].clone()));
            }
            TagKind::Quest => {
                state.update_quest(&tag.groups[0]);
                sink.status_update(StatusUpdate::Quest(tag.groups[0].clone()));
            }
        }
    }
}

/// Seed the roster from a `nombre=15, nombre=8` list. Known players
/// contribute their HP and AC; everyone else gets narrator defaults.
fn apply_initiative(list: &str, combat: &mut CombatTracker, state: &GameState) {
    for entry in list.split(',') {
        let Some((name, value)) = entry.split_once('=') else {
            continue;
        };
        let name = name.trim();
        let value = value.trim();
        if name.is_empty() || value.is_empty() || !value.chars().all(|c| c.is_ascii_digit()) {
            debug!(target: "vozdm::dispatch", entry, "entrada de iniciativa descartada");
            continue;
        }
        let Ok(initiative) = value.parse::<i32>() else {
            continue;
        };

        let spec = match state.find_player(name) {
            Some(player) => CombatantSpec {
                name: name.to_string(),
                initiative,
                hp: player.hp,
                max_hp: Some(player.max_hp),
                ac: Some(player.ac),
                is_player: true,
            },
            None => CombatantSpec {
                name: name.to_string(),
                initiative,
                hp: 10,
                max_hp: Some(10),
                ac: Some(10),
                is_player: false,
            },
        };
        combat.add_combatant(spec);
    }
}
