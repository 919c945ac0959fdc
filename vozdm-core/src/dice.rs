//! Dice simulator for the narrator's table.
//!
//! Supports plain `XdY+Z` notation, per-die shortcuts, and the attack and
//! saving-throw wrappers the combat flow uses. Malformed notation is not an
//! error: parsing returns `None` and the caller treats the text as ordinary
//! narration.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Complete result of a dice roll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollResult {
    pub sides: u32,
    pub count: u32,
    pub modifier: i32,
    /// Individual die outcomes, each in `1..=sides`.
    pub rolls: Vec<u32>,
    /// Sum of the individual outcomes.
    pub sum: u32,
    /// `sum + modifier`.
    pub total: i32,
    /// Natural 20. Only ever true for a single d20.
    pub is_critical: bool,
    /// Natural 1. Only ever true for a single d20.
    pub is_fumble: bool,
}

impl RollResult {
    /// Reconstruct the canonical notation for this roll (e.g. `2d6+3`).
    pub fn notation(&self) -> String {
        match self.modifier {
            m if m > 0 => format!("{}d{}+{}", self.count, self.sides, m),
            m if m < 0 => format!("{}d{}{}", self.count, self.sides, m),
            _ => format!("{}d{}", self.count, self.sides),
        }
    }
}

impl fmt::Display for RollResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rolls = self
            .rolls
            .iter()
            .map(|r| r.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        if self.modifier != 0 {
            write!(f, "[{}] {:+} = {}", rolls, self.modifier, self.total)
        } else {
            write!(f, "[{}] = {}", rolls, self.total)
        }
    }
}

/// Roll `count` dice with the given number of sides and add `modifier`.
///
/// `sides` must be at least 2 and `count` at least 1.
pub fn roll(sides: u32, count: u32, modifier: i32) -> RollResult {
    roll_with_rng(sides, count, modifier, &mut rand::thread_rng())
}

/// Roll with a specific RNG (useful for testing).
pub fn roll_with_rng<R: Rng>(sides: u32, count: u32, modifier: i32, rng: &mut R) -> RollResult {
    debug_assert!(sides >= 2, "dice need at least 2 sides");
    debug_assert!(count >= 1, "must roll at least one die");

    let rolls: Vec<u32> = (0..count).map(|_| rng.gen_range(1..=sides)).collect();
    let sum: u32 = rolls.iter().sum();
    let single_d20 = sides == 20 && count == 1;

    RollResult {
        sides,
        count,
        modifier,
        is_critical: single_d20 && rolls[0] == 20,
        is_fumble: single_d20 && rolls[0] == 1,
        sum,
        total: sum as i32 + modifier,
        rolls,
    }
}

pub fn d20(modifier: i32) -> RollResult {
    roll(20, 1, modifier)
}

pub fn d12(modifier: i32) -> RollResult {
    roll(12, 1, modifier)
}

pub fn d10(modifier: i32) -> RollResult {
    roll(10, 1, modifier)
}

pub fn d8(modifier: i32) -> RollResult {
    roll(8, 1, modifier)
}

pub fn d6(count: u32, modifier: i32) -> RollResult {
    roll(6, count, modifier)
}

pub fn d4(count: u32, modifier: i32) -> RollResult {
    roll(4, count, modifier)
}

/// Initiative is a plain d20 roll.
pub fn roll_initiative(modifier: i32) -> RollResult {
    d20(modifier)
}

/// An attack roll: d20 + attack bonus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttackRoll {
    pub roll: RollResult,
    /// An attack misses outright only on a natural 1.
    pub hit: bool,
    pub crit: bool,
}

pub fn roll_attack(attack_bonus: i32) -> AttackRoll {
    let roll = d20(attack_bonus);
    AttackRoll {
        hit: !roll.is_fumble,
        crit: roll.is_critical,
        roll,
    }
}

/// A saving throw against a difficulty class.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavingThrow {
    pub roll: RollResult,
    pub dc: i32,
    pub success: bool,
}

pub fn roll_saving_throw(modifier: i32, dc: i32) -> SavingThrow {
    let roll = d20(modifier);
    SavingThrow {
        success: roll.total >= dc,
        dc,
        roll,
    }
}

/// A parsed dice notation: `[count]d<sides>[+|-modifier]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiceNotation {
    pub count: u32,
    pub sides: u32,
    pub modifier: i32,
}

impl DiceNotation {
    /// Roll this notation.
    pub fn roll(&self) -> RollResult {
        roll(self.sides, self.count, self.modifier)
    }
}

impl fmt::Display for DiceNotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.modifier {
            m if m > 0 => write!(f, "{}d{}+{}", self.count, self.sides, m),
            m if m < 0 => write!(f, "{}d{}{}", self.count, self.sides, m),
            _ => write!(f, "{}d{}", self.count, self.sides),
        }
    }
}

/// Largest die accepted by the notation parser.
pub const MAX_NOTATION_SIDES: u32 = 1000;
/// Most dice accepted by the notation parser in one roll.
pub const MAX_NOTATION_COUNT: u32 = 100;

/// Parse notation like `2d6+3`, `d20` or `1d8-1`.
///
/// Returns `None` on anything that does not match the grammar, including a
/// die with fewer than 2 sides, a count of 0, or sizes beyond
/// [`MAX_NOTATION_SIDES`]/[`MAX_NOTATION_COUNT`]. The caps keep the roll
/// arithmetic comfortably inside `u32` no matter what the narrator writes.
pub fn parse_notation(notation: &str) -> Option<DiceNotation> {
    let s = notation.trim();
    let d_pos = s.find(['d', 'D'])?;

    let count_str = &s[..d_pos];
    let count: u32 = if count_str.is_empty() {
        1
    } else {
        count_str.parse().ok()?
    };

    let rest = &s[d_pos + 1..];
    let (sides_str, modifier) = match rest.find(['+', '-']) {
        Some(sign_pos) => {
            let modifier: i32 = rest[sign_pos..].parse().ok()?;
            (&rest[..sign_pos], modifier)
        }
        None => (rest, 0),
    };
    let sides: u32 = sides_str.parse().ok()?;

    if !(2..=MAX_NOTATION_SIDES).contains(&sides) || !(1..=MAX_NOTATION_COUNT).contains(&count) {
        return None;
    }

    Some(DiceNotation {
        count,
        sides,
        modifier,
    })
}

/// Parse notation and roll it in one step.
pub fn parse_and_roll(notation: &str) -> Option<RollResult> {
    parse_notation(notation).map(|n| n.roll())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roll_range() {
        for _ in 0..200 {
            let result = roll(6, 2, 0);
            assert_eq!(result.rolls.len(), 2);
            assert!(result.rolls.iter().all(|&r| (1..=6).contains(&r)));
            assert_eq!(result.sum, result.rolls.iter().sum::<u32>());
            assert_eq!(result.total, result.sum as i32);
        }
    }

    #[test]
    fn test_roll_with_modifier() {
        for _ in 0..200 {
            let result = roll(20, 1, 5);
            assert!(result.total >= 6 && result.total <= 25);
            assert_eq!(result.total, result.sum as i32 + 5);
        }

        let result = roll(8, 1, -3);
        assert_eq!(result.total, result.sum as i32 - 3);
    }

    #[test]
    fn test_crit_and_fumble_single_d20_only() {
        for _ in 0..500 {
            let result = d20(0);
            assert_eq!(result.is_critical, result.rolls[0] == 20);
            assert_eq!(result.is_fumble, result.rolls[0] == 1);
        }

        // Never set for other configurations, even when the faces line up.
        for _ in 0..500 {
            let result = roll(20, 2, 0);
            assert!(!result.is_critical);
            assert!(!result.is_fumble);
        }
        for _ in 0..100 {
            let result = d6(1, 0);
            assert!(!result.is_critical);
            assert!(!result.is_fumble);
        }
    }

    #[test]
    fn test_attack_roll_flags() {
        for _ in 0..500 {
            let attack = roll_attack(4);
            assert_eq!(attack.hit, !attack.roll.is_fumble);
            assert_eq!(attack.crit, attack.roll.is_critical);
        }
    }

    #[test]
    fn test_saving_throw() {
        for _ in 0..500 {
            let save = roll_saving_throw(2, 10);
            assert_eq!(save.dc, 10);
            assert_eq!(save.success, save.roll.total >= 10);
        }
    }

    #[test]
    fn test_parse_notation() {
        assert_eq!(
            parse_notation("2d6+3"),
            Some(DiceNotation {
                count: 2,
                sides: 6,
                modifier: 3
            })
        );
        assert_eq!(
            parse_notation("d20"),
            Some(DiceNotation {
                count: 1,
                sides: 20,
                modifier: 0
            })
        );
        assert_eq!(
            parse_notation("1d8-1"),
            Some(DiceNotation {
                count: 1,
                sides: 8,
                modifier: -1
            })
        );
        assert_eq!(parse_notation("3D10+2").map(|n| n.sides), Some(10));
    }

    #[test]
    fn test_parse_notation_rejects_garbage() {
        assert_eq!(parse_notation(""), None);
        assert_eq!(parse_notation("banana"), None);
        assert_eq!(parse_notation("2d"), None);
        assert_eq!(parse_notation("d6+"), None);
        assert_eq!(parse_notation("2x6"), None);
        assert_eq!(parse_notation("2d6+3extra"), None);
        assert_eq!(parse_notation("0d6"), None);
        assert_eq!(parse_notation("2d1"), None);
        assert_eq!(parse_notation("-2d6"), None);
    }

    #[test]
    fn test_parse_notation_caps_sides_and_count() {
        // Grammar-valid but absurd sizes are a non-match, not a roll; the
        // summed result must stay well inside u32.
        assert_eq!(parse_notation("3d4294967295"), None);
        assert!(parse_and_roll("3d4294967295").is_none());
        assert_eq!(parse_notation("1d1001"), None);
        assert_eq!(parse_notation("101d6"), None);

        let result = parse_and_roll("100d1000").unwrap();
        assert_eq!(result.rolls.len(), 100);
        assert!(result.sum <= 100 * 1000);
    }

    #[test]
    fn test_notation_round_trip() {
        let result = parse_and_roll("2d6+3").unwrap();
        assert_eq!(result.notation(), "2d6+3");
        assert_eq!(result.rolls.len(), 2);

        let result = parse_and_roll("1d8-1").unwrap();
        assert_eq!(result.notation(), "1d8-1");

        let result = parse_and_roll("d20").unwrap();
        assert_eq!(result.notation(), "1d20");
    }

    #[test]
    fn test_display() {
        let notation = DiceNotation {
            count: 2,
            sides: 6,
            modifier: 3,
        };
        assert_eq!(notation.to_string(), "2d6+3");
    }
}
