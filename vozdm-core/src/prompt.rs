//! Narrator system-prompt assembly.
//!
//! The prompt is rebuilt for every exchange so it always reflects the live
//! party, location, quest and combat state, plus whatever reference material
//! scores as relevant to the player's last utterance.

use crate::combat::CombatTracker;
use crate::retrieval::ReferenceLibrary;
use crate::state::GameState;

/// Fixed narrator instructions, including the annotation protocol. Everything
/// inside square-bracket tags is screen-only; everything else is read aloud.
pub const NARRATOR_INSTRUCTIONS: &str = "\
Eres el Dungeon Master de una aventura de rol de fantasia. Hablas siempre en espanol.

Tu respuesta tiene dos partes: proceso interno (solo pantalla) y narracion (lo que los jugadores escuchan).
Usa estas etiquetas para el proceso interno, antes de narrar:
- [DM_PIENSA: razonamiento] — decisiones, CDs, planes de enemigos.
- [TIRADA_OCULTA: descripcion | XdY+Z = resultado] — tiradas secretas del DM.
- [DM_EVENTO: descripcion] — sucesos que los jugadores no perciben.

Para el estado de la partida usa:
- [COMBATE_INICIO] y [COMBATE_FIN] al empezar y terminar un combate.
- [INICIATIVA: nombre=valor, nombre=valor, ...] con las iniciativas.
- [DANO: nombre -X HP] y [CURACION: nombre +X HP] para cambios de vida.
- [UBICACION: nombre del lugar] al cambiar de lugar.
- [MISION: descripcion] al revelar o actualizar una mision.

Todo el texto fuera de etiquetas es narracion en voz alta. Nunca escribas encabezados como \"NARRACION:\".
Narra de forma concisa (2-4 frases) salvo en momentos clave. No actues por un jugador sin su permiso.
Los mensajes de los jugadores llegan como \"[Nombre]: lo que dice\"; dirigete a cada uno por su nombre.

## ESTADO ACTUAL";

/// Assemble the full system prompt for the next exchange.
pub fn build_system_prompt(
    state: &GameState,
    combat: &CombatTracker,
    library: &ReferenceLibrary,
) -> String {
    let mut parts = vec![NARRATOR_INSTRUCTIONS.to_string()];

    parts.push(format!("\nJugadores: {}", state.players_summary()));
    parts.push(format!("Ubicacion: {}", state.location()));
    parts.push(format!("Mision activa: {}", state.quest()));

    if combat.active {
        parts.push(format!("\n## COMBATE EN CURSO\n{}", combat.combat_summary()));
    }

    if library.has_rules() {
        let rules = library.relevant_rules(
            state.last_player_message().unwrap_or(""),
            combat.active,
        );
        parts.push(format!("\n## REGLAS (referencia)\n{rules}"));
    }

    if library.has_adventure() {
        parts.push(format!(
            "\n## AVENTURA (referencia)\n{}",
            library.adventure_context(state.location())
        ));
    }

    parts.join("\n")
}

/// Opening line shown before any exchange has happened.
pub fn welcome_prompt(state: &GameState) -> String {
    if state.players().is_empty() {
        return "La partida esta a punto de comenzar. Necesito que los jugadores se presenten. \
                Dime: como se llama tu personaje, que clase es, y un breve trasfondo. \
                Puedes empezar cuando quieras."
            .to_string();
    }
    format!(
        "Continuamos la aventura. {}. Estais en: {}. Que haceis?",
        state.players_summary(),
        state.location()
    )
}

/// Prefix an utterance with the speaking character's name, the shape the
/// narrator instructions promise.
pub fn format_player_line(name: Option<&str>, text: &str) -> String {
    match name {
        Some(name) => format!("[{}]: {}", name, text),
        None => text.to_string(),
    }
}
