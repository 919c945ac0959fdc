//! Keyword-relevance retrieval over page-delimited reference texts.
//!
//! The narrator prompt has a hard character budget, so instead of shipping the
//! whole rulebook we score page sections against the player's last utterance
//! and pack the best ones in. Scoring is plain substring matching with a bonus
//! for hits near the top of a section (likely the heading).

use lazy_static::lazy_static;
use std::collections::HashSet;

/// Character budget for the packed rules excerpt.
pub const RULES_BUDGET_CHARS: usize = 8000;

const MIN_SECTION_CHARS: usize = 100;
const HEADING_WINDOW_CHARS: usize = 200;
const MIN_TAIL_CHARS: usize = 500;
const ADVENTURE_SECTION_LIMIT: usize = 3;
const ADVENTURE_BUDGET_CHARS: usize = 8000;
const ADVENTURE_FALLBACK_CHARS: usize = 6000;

/// Terms force-added to the query while a combat is running.
const COMBAT_TERMS: &[&str] = &[
    "combat",
    "combate",
    "attack",
    "ataque",
    "damage",
    "initiative",
    "iniciativa",
    "saving throw",
    "salvacion",
    "action",
    "accion",
];

lazy_static! {
    /// Spanish and English filler words, plus table chatter like "hola".
    static ref STOP_WORDS: HashSet<&'static str> = [
        "el", "la", "los", "las", "de", "del", "que", "un", "una", "unos", "unas",
        "y", "o", "en", "es", "no", "por", "con", "para", "mi", "tu", "su", "al",
        "se", "lo", "le", "me", "nos", "les", "eso", "esta", "este", "esto",
        "quiero", "voy", "hago", "puedo", "como", "donde", "hay", "ser", "si",
        "pero", "mas", "muy", "ya", "soy", "son", "fue", "era", "tiene", "hacer",
        "the", "a", "is", "it", "to", "and", "of", "in", "my", "i", "you", "we",
        "he", "do", "this", "that", "can", "want", "hola", "vale", "bien", "pues",
    ]
    .into_iter()
    .collect();
}

/// Lowercased content words of at least 3 characters, stop words removed.
pub fn extract_search_terms(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| c.is_whitespace() || ",.;:!?¿¡()[]{}".contains(c))
        .filter(|w| w.chars().count() >= 3 && !STOP_WORDS.contains(w))
        .map(str::to_string)
        .collect()
}

struct Source {
    label: String,
    text: String,
}

/// Reference texts available to the narrator: labeled rulebooks plus the
/// adventure module itself.
#[derive(Default)]
pub struct ReferenceLibrary {
    sources: Vec<Source>,
    adventure: String,
    anchor_terms: Vec<String>,
}

impl ReferenceLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a page-delimited rulebook under a short label (e.g. `PHB`).
    pub fn add_source(&mut self, label: &str, text: &str) {
        self.sources.push(Source {
            label: label.to_string(),
            text: text.to_string(),
        });
    }

    pub fn set_adventure(&mut self, text: &str) {
        self.adventure = text.to_string();
    }

    /// An anchor term always counts as a location match for
    /// [`adventure_context`](Self::adventure_context), regardless of where the
    /// party currently is.
    pub fn add_anchor_term(&mut self, term: &str) {
        self.anchor_terms.push(term.to_lowercase());
    }

    pub fn has_rules(&self) -> bool {
        self.sources.iter().any(|s| !s.text.is_empty())
    }

    pub fn has_adventure(&self) -> bool {
        !self.adventure.is_empty()
    }

    /// Pack the rule sections most relevant to the player's last message into
    /// [`RULES_BUDGET_CHARS`]. Falls back to a baseline cheat-sheet when no
    /// rulebook is loaded or nothing matches.
    pub fn relevant_rules(&self, last_message: &str, combat_active: bool) -> String {
        if !self.has_rules() {
            return baseline_rules().to_string();
        }

        let mut terms = extract_search_terms(last_message);
        if combat_active {
            terms.extend(COMBAT_TERMS.iter().map(|t| t.to_string()));
        }
        if terms.is_empty() {
            return baseline_rules().to_string();
        }

        let mut scored: Vec<(&str, u32, &str)> = Vec::new();
        for source in &self.sources {
            for section in split_pages(&source.text) {
                if section.trim().chars().count() < MIN_SECTION_CHARS {
                    continue;
                }
                let lower = section.to_lowercase();
                let heading: String = lower.chars().take(HEADING_WINDOW_CHARS).collect();
                let mut score = 0u32;
                for term in &terms {
                    if lower.contains(term.as_str()) {
                        score += 1;
                        if heading.contains(term.as_str()) {
                            score += 2;
                        }
                    }
                }
                if score > 0 {
                    scored.push((section, score, source.label.as_str()));
                }
            }
        }

        // Stable sort keeps document order among equal scores.
        scored.sort_by(|a, b| b.1.cmp(&a.1));

        let mut result = String::new();
        let mut used = 0usize;
        for (section, _, label) in scored {
            let trimmed = section.trim();
            let len = trimmed.chars().count();
            if used + len > RULES_BUDGET_CHARS {
                let remaining = RULES_BUDGET_CHARS - used;
                if remaining > MIN_TAIL_CHARS {
                    result.push_str(&format!(
                        "[{}]\n{}\n\n",
                        label,
                        truncate_chars(trimmed, remaining)
                    ));
                }
                break;
            }
            result.push_str(&format!("[{}]\n{}\n\n", label, trimmed));
            used += len;
        }

        if result.is_empty() {
            baseline_rules().to_string()
        } else {
            result
        }
    }

    /// Adventure sections mentioning the current location (or an anchor term),
    /// or the opening pages when nothing matches.
    pub fn adventure_context(&self, location: &str) -> String {
        if self.adventure.is_empty() {
            return String::new();
        }

        let needle = location.to_lowercase();
        let relevant: Vec<&str> = split_pages(&self.adventure)
            .into_iter()
            .filter(|s| {
                let lower = s.to_lowercase();
                lower.contains(&needle) || self.anchor_terms.iter().any(|t| lower.contains(t.as_str()))
            })
            .collect();

        if !relevant.is_empty() {
            let joined = relevant[..relevant.len().min(ADVENTURE_SECTION_LIMIT)].join("\n");
            return truncate_chars(&joined, ADVENTURE_BUDGET_CHARS).to_string();
        }

        truncate_chars(&self.adventure, ADVENTURE_FALLBACK_CHARS).to_string()
    }
}

/// Quick-reference rules used when no rulebook is loaded.
pub fn baseline_rules() -> &'static str {
    "Reglas basicas de referencia:\n\
     - Pruebas de habilidad: d20 + modificador vs CD.\n\
     - Tiradas de salvacion: d20 + modificador de salvacion vs CD.\n\
     - Ataques: d20 + modificador de ataque vs CA del objetivo.\n\
     - Ventaja/Desventaja: tirar 2d20, tomar el mayor/menor.\n\
     - Acciones en combate: Atacar, Lanzar conjuro, Esquivar, Desengancharse, Ayudar, Esconderse, Preparar, Carrera, Buscar, Usar objeto.\n\
     - Descanso corto: 1+ horas, gastar Dados de Golpe para recuperar HP.\n\
     - Descanso largo: 8+ horas, recuperar todos los HP y la mitad de los Dados de Golpe.\n\
     - Muerte: 0 HP = inconsciente. Tiradas de salvacion de muerte: d20, 10+ exito, <10 fallo, 3 fallos = muerte, 20 natural = 1 HP."
}

/// Split on `--- Pagina N ---` markers. The delimiter lines themselves are
/// dropped.
fn split_pages(text: &str) -> Vec<&str> {
    const PREFIX: &str = "--- Pagina ";
    const SUFFIX: &str = " ---";

    let mut sections = Vec::new();
    let mut start = 0;
    let mut search_from = 0;

    while let Some(found) = text[search_from..].find(PREFIX) {
        let marker_start = search_from + found;
        let after_prefix = &text[marker_start + PREFIX.len()..];
        let digits = after_prefix
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(after_prefix.len());

        if digits > 0 && after_prefix[digits..].starts_with(SUFFIX) {
            sections.push(&text[start..marker_start]);
            start = marker_start + PREFIX.len() + digits + SUFFIX.len();
            search_from = start;
        } else {
            search_from = marker_start + PREFIX.len();
        }
    }
    sections.push(&text[start..]);
    sections
}

fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
