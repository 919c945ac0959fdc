//! Combat tracking: initiative order, turns, HP and conditions.
//!
//! The tracker owns its roster. Everything outside mutates combatants through
//! the tracker's operations, looked up by id; name resolution happens at the
//! dispatch edge.

use crate::dice;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a combatant within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CombatantId(pub Uuid);

impl CombatantId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for CombatantId {
    fn default() -> Self {
        Self::new()
    }
}

/// A participant in the current combat.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Combatant {
    pub id: CombatantId,
    pub name: String,
    pub initiative: i32,
    pub hp: u32,
    pub max_hp: u32,
    pub ac: i32,
    pub is_player: bool,
    pub conditions: Vec<String>,
    pub alive: bool,
}

/// Input for adding a combatant. `max_hp` defaults to `hp`, `ac` to 10.
#[derive(Debug, Clone)]
pub struct CombatantSpec {
    pub name: String,
    pub initiative: i32,
    pub hp: u32,
    pub max_hp: Option<u32>,
    pub ac: Option<i32>,
    pub is_player: bool,
}

/// Result of a hidden narrator roll.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HiddenRollEntry {
    pub description: String,
    pub result: i32,
    pub detail: String,
}

/// Combat session state: roster, round/turn counters, and a text log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CombatTracker {
    pub active: bool,
    pub round: u32,
    pub turn_index: usize,
    combatants: Vec<Combatant>,
    log: Vec<String>,
}

impl CombatTracker {
    pub fn new() -> Self {
        Self {
            active: false,
            round: 1,
            turn_index: 0,
            combatants: Vec::new(),
            log: Vec::new(),
        }
    }

    /// Begin a fresh combat session, discarding any session in progress.
    pub fn start_combat(&mut self) {
        self.active = true;
        self.round = 1;
        self.turn_index = 0;
        self.combatants.clear();
        self.log.clear();
    }

    /// End the session and clear its state. Idempotent when already idle.
    pub fn end_combat(&mut self) {
        self.active = false;
        self.round = 1;
        self.turn_index = 0;
        self.combatants.clear();
        self.log.clear();
    }

    /// Add a combatant and re-sort the roster by descending initiative.
    ///
    /// The sort is stable: equal initiatives keep insertion order.
    pub fn add_combatant(&mut self, spec: CombatantSpec) -> CombatantId {
        let id = CombatantId::new();
        self.combatants.push(Combatant {
            id,
            max_hp: spec.max_hp.unwrap_or(spec.hp),
            hp: spec.hp,
            name: spec.name,
            initiative: spec.initiative,
            ac: spec.ac.unwrap_or(10),
            is_player: spec.is_player,
            conditions: Vec::new(),
            alive: true,
        });
        self.sort_by_initiative();
        id
    }

    fn sort_by_initiative(&mut self) {
        self.combatants.sort_by(|a, b| b.initiative.cmp(&a.initiative));
    }

    /// The combatant whose turn it is, if any.
    pub fn current_combatant(&self) -> Option<&Combatant> {
        self.combatants.get(self.turn_index)
    }

    /// Advance to the next living combatant, wrapping into a new round.
    ///
    /// Dead combatants are skipped, but at most one full pass is attempted so
    /// a fully dead roster still terminates. Returns the combatant the turn
    /// lands on, or `None` for an empty roster.
    pub fn next_turn(&mut self) -> Option<&Combatant> {
        if self.combatants.is_empty() {
            return None;
        }

        let len = self.combatants.len();
        let mut attempts = 0;
        loop {
            self.turn_index += 1;
            if self.turn_index >= len {
                self.turn_index = 0;
                self.round += 1;
            }
            attempts += 1;
            if self.combatants[self.turn_index].alive || attempts >= len {
                break;
            }
        }

        self.current_combatant()
    }

    /// Look up a combatant by case-insensitive name.
    pub fn find_by_name(&self, name: &str) -> Option<&Combatant> {
        let lowered = name.to_lowercase();
        self.combatants
            .iter()
            .find(|c| c.name.to_lowercase() == lowered)
    }

    /// Resolve a narrator-supplied name to a stable id.
    pub fn resolve_name(&self, name: &str) -> Option<CombatantId> {
        self.find_by_name(name).map(|c| c.id)
    }

    /// Apply damage, clamping HP at 0. HP reaching 0 marks the combatant
    /// dead. Unknown ids are ignored and return `None`.
    pub fn apply_damage(&mut self, id: CombatantId, amount: u32) -> Option<&Combatant> {
        let index = self.combatants.iter().position(|c| c.id == id)?;
        let c = &mut self.combatants[index];
        c.hp = c.hp.saturating_sub(amount);
        if c.hp == 0 {
            c.alive = false;
        }
        let entry = format!(
            "{} recibe {} de dano (HP: {}/{})",
            c.name, amount, c.hp, c.max_hp
        );
        self.log.push(entry);
        self.combatants.get(index)
    }

    /// Heal, clamping HP at the combatant's maximum. Healing above 0 HP
    /// revives. Unknown ids are ignored and return `None`.
    pub fn heal(&mut self, id: CombatantId, amount: u32) -> Option<&Combatant> {
        let index = self.combatants.iter().position(|c| c.id == id)?;
        let c = &mut self.combatants[index];
        c.hp = (c.hp + amount).min(c.max_hp);
        if c.hp > 0 {
            c.alive = true;
        }
        let entry = format!(
            "{} recupera {} HP (HP: {}/{})",
            c.name, amount, c.hp, c.max_hp
        );
        self.log.push(entry);
        self.combatants.get(index)
    }

    /// Add a condition label. No-op for unknown ids or duplicates.
    pub fn add_condition(&mut self, id: CombatantId, condition: &str) {
        if let Some(c) = self.combatants.iter_mut().find(|c| c.id == id) {
            if !c.conditions.iter().any(|x| x == condition) {
                c.conditions.push(condition.to_string());
            }
        }
    }

    /// Remove a condition label. No-op for unknown ids or absent conditions.
    pub fn remove_condition(&mut self, id: CombatantId, condition: &str) {
        if let Some(c) = self.combatants.iter_mut().find(|c| c.id == id) {
            c.conditions.retain(|x| x != condition);
        }
    }

    /// A narrator roll hidden from the players but recorded in the log.
    pub fn hidden_roll(&mut self, description: &str, sides: u32, modifier: i32) -> HiddenRollEntry {
        let result = dice::roll(sides, 1, modifier);
        let detail = if modifier != 0 {
            format!("{}{:+} = {}", result.rolls[0], modifier, result.total)
        } else {
            format!("{} = {}", result.rolls[0], result.total)
        };
        self.log
            .push(format!("[OCULTO] {description}: {detail}"));
        HiddenRollEntry {
            description: description.to_string(),
            result: result.total,
            detail,
        }
    }

    /// Deterministic textual snapshot used as prompt context.
    pub fn combat_summary(&self) -> String {
        if !self.active {
            return "No hay combate activo.".to_string();
        }

        let current_name = self
            .current_combatant()
            .map(|c| c.name.as_str())
            .unwrap_or("?");
        let mut lines = vec![
            format!("Ronda {} - Turno de {}", self.round, current_name),
            "---".to_string(),
        ];
        for (i, c) in self.combatants.iter().enumerate() {
            let marker = if i == self.turn_index { ">> " } else { "   " };
            let status = if c.alive {
                format!("HP: {}/{}", c.hp, c.max_hp)
            } else {
                "DERROTADO".to_string()
            };
            let conds = if c.conditions.is_empty() {
                String::new()
            } else {
                format!(" [{}]", c.conditions.join(", "))
            };
            lines.push(format!(
                "{}{} - {} ({}, CA: {}){}",
                marker, c.initiative, c.name, status, c.ac, conds
            ));
        }
        lines.join("\n")
    }

    /// The full roster in initiative order.
    pub fn combatants(&self) -> &[Combatant] {
        &self.combatants
    }

    /// Living combatants in initiative order.
    pub fn alive_combatants(&self) -> impl Iterator<Item = &Combatant> {
        self.combatants.iter().filter(|c| c.alive)
    }

    /// Combat event log, oldest first.
    pub fn log(&self) -> &[String] {
        &self.log
    }

    /// True when one side has been eliminated.
    ///
    /// A side that never had a member does not count as eliminated: the
    /// session is not finished until at least one player and one non-player
    /// have been added. Dead combatants stay in the roster, so roster
    /// membership records who has ever participated.
    pub fn is_finished(&self) -> bool {
        let has_players = self.combatants.iter().any(|c| c.is_player);
        let has_enemies = self.combatants.iter().any(|c| !c.is_player);
        if !has_players || !has_enemies {
            return false;
        }

        let alive_players = self.combatants.iter().any(|c| c.is_player && c.alive);
        let alive_enemies = self.combatants.iter().any(|c| !c.is_player && c.alive);
        !alive_players || !alive_enemies
    }
}

impl Default for CombatTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(name: &str, initiative: i32, hp: u32, is_player: bool) -> CombatantSpec {
        CombatantSpec {
            name: name.to_string(),
            initiative,
            hp,
            max_hp: None,
            ac: None,
            is_player,
        }
    }

    fn sample_combat() -> CombatTracker {
        let mut combat = CombatTracker::new();
        combat.start_combat();
        combat.add_combatant(spec("Thorin", 15, 20, true));
        combat.add_combatant(spec("Goblin", 8, 7, false));
        combat
    }

    #[test]
    fn test_roster_sorted_descending_and_stable() {
        let mut combat = CombatTracker::new();
        combat.start_combat();
        combat.add_combatant(spec("Goblin", 8, 7, false));
        combat.add_combatant(spec("Thorin", 15, 20, true));
        combat.add_combatant(spec("Orco", 8, 12, false));
        combat.add_combatant(spec("Elfa", 15, 14, true));

        let names: Vec<&str> = combat.combatants().iter().map(|c| c.name.as_str()).collect();
        // Ties keep insertion order: Thorin before Elfa, Goblin before Orco.
        assert_eq!(names, vec!["Thorin", "Elfa", "Goblin", "Orco"]);
    }

    #[test]
    fn test_defaults_on_add() {
        let mut combat = CombatTracker::new();
        combat.start_combat();
        let id = combat.add_combatant(spec("Goblin", 8, 7, false));
        let c = combat.combatants().iter().find(|c| c.id == id).unwrap();
        assert_eq!(c.max_hp, 7);
        assert_eq!(c.ac, 10);
        assert!(c.alive);
        assert!(c.conditions.is_empty());
    }

    #[test]
    fn test_start_combat_resets_existing_session() {
        let mut combat = sample_combat();
        combat.next_turn();
        combat.start_combat();
        assert!(combat.active);
        assert_eq!(combat.round, 1);
        assert_eq!(combat.turn_index, 0);
        assert!(combat.combatants().is_empty());
        assert!(combat.log().is_empty());
    }

    #[test]
    fn test_end_combat_idempotent() {
        let mut combat = sample_combat();
        combat.end_combat();
        assert!(!combat.active);
        assert!(combat.combatants().is_empty());
        combat.end_combat();
        assert!(!combat.active);
    }

    #[test]
    fn test_damage_clamps_at_zero_and_kills() {
        let mut combat = sample_combat();
        let goblin = combat.resolve_name("goblin").unwrap();

        let c = combat.apply_damage(goblin, 5).unwrap();
        assert_eq!(c.hp, 2);
        assert!(c.alive);

        let c = combat.apply_damage(goblin, 99).unwrap();
        assert_eq!(c.hp, 0);
        assert!(!c.alive);

        assert!(combat.log().last().unwrap().contains("Goblin recibe 99"));
    }

    #[test]
    fn test_heal_clamps_at_max_and_revives() {
        let mut combat = sample_combat();
        let goblin = combat.resolve_name("Goblin").unwrap();
        combat.apply_damage(goblin, 7);
        assert!(!combat.find_by_name("Goblin").unwrap().alive);

        let c = combat.heal(goblin, 3).unwrap();
        assert_eq!(c.hp, 3);
        assert!(c.alive);

        let c = combat.heal(goblin, 100).unwrap();
        assert_eq!(c.hp, 7);
    }

    #[test]
    fn test_unknown_id_is_ignored() {
        let mut combat = sample_combat();
        assert!(combat.apply_damage(CombatantId::new(), 5).is_none());
        assert!(combat.heal(CombatantId::new(), 5).is_none());
        combat.add_condition(CombatantId::new(), "aturdido");
    }

    #[test]
    fn test_conditions_idempotent() {
        let mut combat = sample_combat();
        let id = combat.resolve_name("Thorin").unwrap();
        combat.add_condition(id, "envenenado");
        combat.add_condition(id, "envenenado");
        assert_eq!(combat.find_by_name("Thorin").unwrap().conditions.len(), 1);

        combat.remove_condition(id, "envenenado");
        combat.remove_condition(id, "envenenado");
        assert!(combat.find_by_name("Thorin").unwrap().conditions.is_empty());
    }

    #[test]
    fn test_next_turn_wraps_and_increments_round() {
        let mut combat = sample_combat();
        assert_eq!(combat.current_combatant().unwrap().name, "Thorin");

        let next = combat.next_turn().unwrap();
        assert_eq!(next.name, "Goblin");
        assert_eq!(combat.round, 1);

        // Full cycle on a roster of 2: back to Thorin, round bumped once.
        let next = combat.next_turn().unwrap();
        assert_eq!(next.name, "Thorin");
        assert_eq!(combat.round, 2);
    }

    #[test]
    fn test_next_turn_skips_dead() {
        let mut combat = CombatTracker::new();
        combat.start_combat();
        combat.add_combatant(spec("Thorin", 15, 20, true));
        let goblin = combat.add_combatant(spec("Goblin", 8, 7, false));
        combat.add_combatant(spec("Orco", 3, 12, false));
        combat.apply_damage(goblin, 7);

        let next = combat.next_turn().unwrap();
        assert_eq!(next.name, "Orco");
    }

    #[test]
    fn test_next_turn_terminates_with_all_dead() {
        let mut combat = sample_combat();
        let thorin = combat.resolve_name("Thorin").unwrap();
        let goblin = combat.resolve_name("Goblin").unwrap();
        combat.apply_damage(thorin, 99);
        combat.apply_damage(goblin, 99);

        // Must not loop forever; lands somewhere regardless of alive status.
        assert!(combat.next_turn().is_some());
    }

    #[test]
    fn test_next_turn_empty_roster() {
        let mut combat = CombatTracker::new();
        combat.start_combat();
        assert!(combat.next_turn().is_none());
    }

    #[test]
    fn test_is_finished_requires_both_sides() {
        let mut combat = CombatTracker::new();
        combat.start_combat();
        assert!(!combat.is_finished());

        combat.add_combatant(spec("Thorin", 15, 20, true));
        // Only players so far: not finished, no enemy has ever existed.
        assert!(!combat.is_finished());

        let goblin = combat.add_combatant(spec("Goblin", 8, 7, false));
        assert!(!combat.is_finished());

        combat.apply_damage(goblin, 7);
        // One alive player, zero alive enemies, enemy side existed: finished.
        assert!(combat.is_finished());
    }

    #[test]
    fn test_is_finished_when_players_fall() {
        let mut combat = sample_combat();
        let thorin = combat.resolve_name("Thorin").unwrap();
        combat.apply_damage(thorin, 99);
        assert!(combat.is_finished());
    }

    #[test]
    fn test_hidden_roll_logged() {
        let mut combat = sample_combat();
        let entry = combat.hidden_roll("Sigilo de goblins", 20, 4);
        assert!(entry.result >= 5 && entry.result <= 24);
        assert!(entry.detail.ends_with(&format!("= {}", entry.result)));
        assert!(combat
            .log()
            .last()
            .unwrap()
            .starts_with("[OCULTO] Sigilo de goblins:"));
    }

    #[test]
    fn test_combat_summary() {
        let mut combat = sample_combat();
        let goblin = combat.resolve_name("Goblin").unwrap();
        combat.add_condition(goblin, "asustado");

        let summary = combat.combat_summary();
        assert!(summary.starts_with("Ronda 1 - Turno de Thorin"));
        assert!(summary.contains(">> 15 - Thorin (HP: 20/20, CA: 10)"));
        assert!(summary.contains("   8 - Goblin (HP: 7/7, CA: 10) [asustado]"));

        combat.apply_damage(goblin, 7);
        assert!(combat.combat_summary().contains("Goblin (DERROTADO, CA: 10)"));

        combat.end_combat();
        assert_eq!(combat.combat_summary(), "No hay combate activo.");
    }
}
