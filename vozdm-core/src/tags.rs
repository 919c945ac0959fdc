//! Narrator tag protocol.
//!
//! The narrator's responses interleave free narration with bracketed control
//! tags in ten fixed shapes:
//!
//! ```text
//! [COMBATE_INICIO]
//! [COMBATE_FIN]
//! [INICIATIVA: nombre=15, nombre=8, ...]
//! [DANO: nombre -5 HP]
//! [CURACION: nombre +3 HP]
//! [TIRADA_OCULTA: texto]
//! [DM_PIENSA: texto]
//! [DM_EVENTO: texto]
//! [UBICACION: texto]
//! [MISION: texto]
//! ```
//!
//! The scanner extracts every non-overlapping match in document order and is
//! deliberately permissive: bracketed text that does not match a tag shape is
//! ordinary narration, never an error. Captured fields stay strings; numeric
//! interpretation is the dispatcher's job.

use serde::{Deserialize, Serialize};

/// The kind of a parsed narrator tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TagKind {
    CombatStart,
    CombatEnd,
    Initiative,
    Damage,
    Heal,
    HiddenRoll,
    NarratorThought,
    SecretEvent,
    Location,
    Quest,
}

/// A tag extracted from narrator output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedTag {
    pub kind: TagKind,
    /// The raw matched substring, brackets included.
    pub raw: String,
    /// Captured sub-fields, in grammar order.
    pub groups: Vec<String>,
}

/// Bare keywords with no payload.
const BARE_TAGS: [(&str, TagKind); 2] = [
    ("COMBATE_INICIO", TagKind::CombatStart),
    ("COMBATE_FIN", TagKind::CombatEnd),
];

/// Keywords followed by `:` and a payload.
const PAYLOAD_TAGS: [(&str, TagKind); 8] = [
    ("INICIATIVA", TagKind::Initiative),
    ("DANO", TagKind::Damage),
    ("CURACION", TagKind::Heal),
    ("TIRADA_OCULTA", TagKind::HiddenRoll),
    ("DM_PIENSA", TagKind::NarratorThought),
    ("DM_EVENTO", TagKind::SecretEvent),
    ("UBICACION", TagKind::Location),
    ("MISION", TagKind::Quest),
];

/// Extract every tag from `text`, in the order they appear.
pub fn parse_tags(text: &str) -> Vec<ParsedTag> {
    let mut tags = Vec::new();
    let mut i = 0;

    while i < text.len() {
        if text.as_bytes()[i] == b'[' {
            if let Some((tag, consumed)) = match_tag(&text[i..]) {
                tags.push(tag);
                i += consumed;
                continue;
            }
        }
        // Not a tag start: skip one character (not one byte).
        i += text[i..].chars().next().map_or(1, |c| c.len_utf8());
    }

    tags
}

/// Try to match a single tag at the start of `s` (which begins with `[`).
/// Returns the tag and the number of bytes consumed.
fn match_tag(s: &str) -> Option<(ParsedTag, usize)> {
    let rest = &s[1..];

    for (keyword, kind) in BARE_TAGS {
        let with_close = format!("{keyword}]");
        if rest.starts_with(&with_close) {
            let consumed = 1 + with_close.len();
            return Some((
                ParsedTag {
                    kind,
                    raw: s[..consumed].to_string(),
                    groups: Vec::new(),
                },
                consumed,
            ));
        }
    }

    for (keyword, kind) in PAYLOAD_TAGS {
        let Some(after_kw) = rest.strip_prefix(keyword) else {
            continue;
        };
        let Some(after_colon) = after_kw.strip_prefix(':') else {
            continue;
        };
        let close = after_colon.find(']')?;
        let payload = &after_colon[..close];
        // Payloads stay on one line; a stray '[' left open across lines is
        // narration.
        if payload.contains('\n') {
            return None;
        }

        let groups = match kind {
            TagKind::Damage => parse_hp_delta(payload, '-')?,
            TagKind::Heal => parse_hp_delta(payload, '+')?,
            _ => {
                let value = payload.trim_start();
                if value.is_empty() {
                    return None;
                }
                vec![value.to_string()]
            }
        };

        let consumed = 1 + keyword.len() + 1 + close + 1;
        return Some((
            ParsedTag {
                kind,
                raw: s[..consumed].to_string(),
                groups,
            },
            consumed,
        ));
    }

    None
}

/// Parse a `nombre -5 HP` / `nombre +3 HP` payload into `[name, amount]`.
fn parse_hp_delta(payload: &str, sign: char) -> Option<Vec<String>> {
    let body = payload.trim_end().strip_suffix("HP")?.trim_end();

    let digits_start = body
        .rfind(|c: char| !c.is_ascii_digit())
        .map(|p| p + 1)
        .unwrap_or(0);
    let amount = &body[digits_start..];
    if amount.is_empty() {
        return None;
    }

    let before_digits = &body[..digits_start];
    let signed = before_digits.strip_suffix(sign)?;
    // The sign must be separated from the name by whitespace.
    let name = signed.strip_suffix(|c: char| c.is_whitespace())?.trim();
    if name.is_empty() {
        return None;
    }

    Some(vec![name.to_string(), amount.to_string()])
}

/// Strip tags and markdown emphasis from narrator output, leaving only the
/// text meant to be spoken aloud. Whitespace is collapsed.
///
/// Stripping is broader than parsing: any bracketed span opening with a known
/// keyword is removed, even if its payload would not produce an event.
pub fn strip_for_speech(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut i = 0;

    while i < text.len() {
        if text.as_bytes()[i] == b'[' {
            if let Some(consumed) = match_strippable(&text[i..]) {
                i += consumed;
                continue;
            }
        }
        let c = text[i..].chars().next().unwrap();
        out.push(c);
        i += c.len_utf8();
    }

    let without_emphasis = strip_emphasis(&out);
    without_emphasis.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Length of a strippable bracketed span at the start of `s`, if any.
fn match_strippable(s: &str) -> Option<usize> {
    let rest = &s[1..];

    for (keyword, _) in BARE_TAGS {
        let with_close = format!("{keyword}]");
        if rest.starts_with(&with_close) {
            return Some(1 + with_close.len());
        }
    }

    for (keyword, _) in PAYLOAD_TAGS {
        let after_kw = match rest.strip_prefix(keyword) {
            Some(r) => r,
            None => continue,
        };
        let after_colon = after_kw.strip_prefix(':')?;
        let close = after_colon.find(']')?;
        if close == 0 {
            return None;
        }
        return Some(1 + keyword.len() + 1 + close + 1);
    }

    None
}

/// Remove `*emphasis*` spans entirely (the voice does not read stage
/// directions).
fn strip_emphasis(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(start) = rest.find('*') {
        match rest[start + 1..].find('*') {
            // `*...*` with non-empty content: drop the whole span.
            Some(len) if len > 0 => {
                out.push_str(&rest[..start]);
                rest = &rest[start + 1 + len + 1..];
            }
            _ => {
                out.push_str(&rest[..start + 1]);
                rest = &rest[start + 1..];
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_tags() {
        let tags = parse_tags("[COMBATE_INICIO] A luchar. [COMBATE_FIN]");
        assert_eq!(tags.len(), 2);
        assert_eq!(tags[0].kind, TagKind::CombatStart);
        assert_eq!(tags[0].raw, "[COMBATE_INICIO]");
        assert!(tags[0].groups.is_empty());
        assert_eq!(tags[1].kind, TagKind::CombatEnd);
    }

    #[test]
    fn test_damage_tag() {
        let tags = parse_tags("[DANO: Thorin -5 HP] Te golpean.");
        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].kind, TagKind::Damage);
        assert_eq!(tags[0].raw, "[DANO: Thorin -5 HP]");
        assert_eq!(tags[0].groups, vec!["Thorin", "5"]);
    }

    #[test]
    fn test_heal_tag() {
        let tags = parse_tags("[CURACION: Elfa +12 HP]");
        assert_eq!(tags[0].kind, TagKind::Heal);
        assert_eq!(tags[0].groups, vec!["Elfa", "12"]);
    }

    #[test]
    fn test_damage_requires_shape() {
        // Wrong sign, no amount, no HP suffix: all narration, no events.
        assert!(parse_tags("[DANO: Thorin +5 HP]").is_empty());
        assert!(parse_tags("[DANO: Thorin]").is_empty());
        assert!(parse_tags("[DANO: Thorin -5]").is_empty());
        assert!(parse_tags("[DANO: -5 HP]").is_empty());
    }

    #[test]
    fn test_multi_word_names() {
        let tags = parse_tags("[DANO: Goblin jefe -3 HP]");
        assert_eq!(tags[0].groups, vec!["Goblin jefe", "3"]);
    }

    #[test]
    fn test_initiative_tag() {
        let tags = parse_tags("[INICIATIVA: Thorin=15, Goblin=8]");
        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].kind, TagKind::Initiative);
        assert_eq!(tags[0].groups, vec!["Thorin=15, Goblin=8"]);
    }

    #[test]
    fn test_payload_tags() {
        let text = "[DM_PIENSA: CD 15 para forzarla.]\n\
                    [TIRADA_OCULTA: Sigilo | 1d20+4 = 9]\n\
                    [DM_EVENTO: Los goblins preparan una emboscada.]\n\
                    [UBICACION: Cueva de Cragmaw]\n\
                    [MISION: Rescatar a Gundren]";
        let tags = parse_tags(text);
        let kinds: Vec<TagKind> = tags.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TagKind::NarratorThought,
                TagKind::HiddenRoll,
                TagKind::SecretEvent,
                TagKind::Location,
                TagKind::Quest,
            ]
        );
        assert_eq!(tags[3].groups, vec!["Cueva de Cragmaw"]);
    }

    #[test]
    fn test_document_order_across_kinds() {
        let text = "[COMBATE_INICIO] [INICIATIVA: A=10] [DANO: A -2 HP] [COMBATE_FIN]";
        let kinds: Vec<TagKind> = parse_tags(text).iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TagKind::CombatStart,
                TagKind::Initiative,
                TagKind::Damage,
                TagKind::CombatEnd,
            ]
        );
    }

    #[test]
    fn test_repeated_tags_all_captured() {
        let text = "[DANO: A -1 HP] y [DANO: B -2 HP]";
        let tags = parse_tags(text);
        assert_eq!(tags.len(), 2);
        assert_eq!(tags[0].groups[0], "A");
        assert_eq!(tags[1].groups[0], "B");
    }

    #[test]
    fn test_malformed_brackets_are_narration() {
        assert!(parse_tags("Ves [una puerta] cerrada.").is_empty());
        assert!(parse_tags("[UBICACION:]").is_empty());
        assert!(parse_tags("[UBICACION: sin cierre").is_empty());
        assert!(parse_tags("[COMBATE_INICIO").is_empty());
        assert!(parse_tags("[ COMBATE_INICIO ]").is_empty());
    }

    #[test]
    fn test_payload_does_not_span_lines() {
        assert!(parse_tags("[UBICACION: linea\npartida]").is_empty());
    }

    #[test]
    fn test_strip_for_speech() {
        let cleaned = strip_for_speech("[DANO: Thorin -5 HP] Te golpean.");
        assert_eq!(cleaned, "Te golpean.");
    }

    #[test]
    fn test_strip_removes_all_tag_kinds() {
        let text = "[COMBATE_INICIO][INICIATIVA: A=1] Hola [DM_PIENSA: x] mundo [COMBATE_FIN]";
        assert_eq!(strip_for_speech(text), "Hola mundo");
    }

    #[test]
    fn test_strip_is_broader_than_parse() {
        // Malformed DANO payload produces no event but is still stripped.
        assert!(parse_tags("[DANO: rasguño]").is_empty());
        assert_eq!(strip_for_speech("[DANO: rasguño] Au."), "Au.");
    }

    #[test]
    fn test_strip_emphasis_and_whitespace() {
        assert_eq!(
            strip_for_speech("Entras  en la sala. *susurra* ¿Quién anda ahí?"),
            "Entras en la sala. ¿Quién anda ahí?"
        );
        assert_eq!(strip_for_speech("2 * 3 * 4"), "2 4");
        assert_eq!(strip_for_speech("[DM_PIENSA: solo etiquetas]"), "");
    }

    #[test]
    fn test_unknown_bracket_keyword_kept_in_speech() {
        assert_eq!(
            strip_for_speech("Ves [una puerta] cerrada."),
            "Ves [una puerta] cerrada."
        );
    }
}
