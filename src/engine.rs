use tracing::debug;

use crate::content::ContentTables;
use crate::types::{Activity, MatchRecord, PresenceState, Session};

/// Core-game state of a running match.
const IN_PROGRESS: &str = "IN_PROGRESS";

/// Pregame state while players are choosing agents.
const CHARACTER_SELECT_ACTIVE: &str = "character_select_active";

/// Classify a match record into a presence state.
///
/// Positive signals are checked first: a running match, then agent select.
/// `NoActiveMatch` means the player is in the lobby. Anything else (a core-game
/// match that is not in progress, a pregame outside agent select) is left
/// unclassified so the current presence stays in place.
pub fn classify(
    record: &MatchRecord,
    session: &Session,
    content: &ContentTables,
) -> Option<PresenceState> {
    match record {
        MatchRecord::InProgress(core) if core.state == IN_PROGRESS => {
            let (map, map_image) = match content.map(&core.map_id) {
                Ok(info) => (info.name.clone(), Some(info.image.clone())),
                Err(e) => {
                    debug!("{e}");
                    (content.unknown_map.clone(), None)
                }
            };
            let mode = match content.mode(&core.mode_id) {
                Ok(info) => info.name.clone(),
                Err(e) => {
                    debug!("{e}");
                    content.unknown_mode.clone()
                }
            };
            Some(PresenceState::InMatch {
                mode,
                map,
                map_image,
            })
        }
        MatchRecord::Pregame(pregame) if pregame.pregame_state == CHARACTER_SELECT_ACTIVE => {
            let players: usize = pregame.teams.iter().map(|t| t.players.len()).sum();
            debug!("Agent select in {} with {players} player(s)", pregame.id);
            Some(PresenceState::PickingAgent)
        }
        MatchRecord::NoActiveMatch => Some(PresenceState::InLobby {
            player: session.riot_id(),
        }),
        _ => None,
    }
}

/// Display fields for a presence state.
pub fn activity_for(state: &PresenceState, large_image: &str) -> Activity {
    let large = Some(large_image.to_string());
    match state {
        PresenceState::InLobby { player } => {
            Activity::new(Some(player.clone()), Some("In Lobby".into()), large, None)
        }
        PresenceState::PickingAgent => Activity::new(
            Some("Agent Select".into()),
            Some("Picking Agent".into()),
            large,
            None,
        ),
        PresenceState::InMatch {
            mode,
            map,
            map_image,
        } => Activity::new(
            Some(map.clone()),
            Some(format!("Playing {mode}")),
            large,
            map_image.clone(),
        ),
    }
}
