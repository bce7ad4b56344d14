use serde::{Deserialize, Serialize};

// ── Local client API ───────────────────────────────────────────────

/// Chat session descriptor from `GET /chat/v1/session`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub puuid: String,
    #[serde(default)]
    pub game_name: String,
    #[serde(default)]
    pub game_tag: String,
    #[serde(default)]
    pub loaded: bool,
    #[serde(default)]
    pub region: Option<String>,
}

impl Session {
    /// `gameName#gameTag`, as shown in the lobby presence.
    pub fn riot_id(&self) -> String {
        format!("{}#{}", self.game_name, self.game_tag)
    }
}

/// Bearer credentials for the regional API, from `GET /entitlements/v1/token`.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct TokenPair {
    #[serde(rename = "accessToken")]
    pub access_token: String,
    /// Entitlements JWT.
    #[serde(rename = "token")]
    pub entitlements_token: String,
    #[serde(default)]
    pub subject: String,
}

impl std::fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenPair")
            .field("subject", &self.subject)
            .finish_non_exhaustive()
    }
}

/// Summary of the `GET /help` manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HelpSummary {
    pub functions: usize,
    pub events: usize,
}

impl HelpSummary {
    pub fn from_manifest(manifest: &serde_json::Value) -> Self {
        let count = |key: &str| {
            manifest
                .get(key)
                .and_then(|v| v.as_object())
                .map(|o| o.len())
                .unwrap_or(0)
        };
        Self {
            functions: count("functions"),
            events: count("events"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub cid: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub unread_count: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Conversations {
    #[serde(default)]
    pub conversations: Vec<Conversation>,
}

/// Body of `POST /chat/v6/messages`.
#[derive(Debug, Clone, Serialize)]
pub struct OutgoingMessage {
    #[serde(rename = "type")]
    pub kind: String,
    pub cid: String,
    pub message: String,
}

// ── Regional API ───────────────────────────────────────────────────

/// `GET /core-game/v1/players/{puuid}` and `GET /pregame/v1/players/{puuid}`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PlayerMatch {
    #[serde(rename = "MatchID")]
    pub match_id: String,
}

/// `GET /core-game/v1/matches/{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CoreGameMatch {
    #[serde(rename = "MatchID", default)]
    pub match_id: String,
    #[serde(rename = "State")]
    pub state: String,
    #[serde(rename = "MapID", default)]
    pub map_id: String,
    #[serde(rename = "ModeID", default)]
    pub mode_id: String,
}

/// `GET /pregame/v1/matches/{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PregameMatch {
    #[serde(rename = "ID", default)]
    pub id: String,
    #[serde(rename = "PregameState")]
    pub pregame_state: String,
    #[serde(rename = "MapID", default)]
    pub map_id: String,
    #[serde(rename = "Teams", default)]
    pub teams: Vec<PregameTeam>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PregameTeam {
    #[serde(rename = "TeamID", default)]
    pub team_id: String,
    #[serde(rename = "Players", default)]
    pub players: Vec<PregamePlayer>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PregamePlayer {
    #[serde(rename = "Subject")]
    pub subject: String,
    #[serde(rename = "CharacterID", default)]
    pub character_id: String,
    #[serde(rename = "CharacterSelectionState", default)]
    pub selection_state: String,
}

/// Latest known core-game membership of the local player.
///
/// `match_id` is `None` when the player is not in a running match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerState {
    pub match_id: Option<String>,
}

/// Match data resolved for one presence tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchRecord {
    InProgress(CoreGameMatch),
    Pregame(PregameMatch),
    /// Neither a core-game nor a pregame match exists for the player.
    NoActiveMatch,
}

// ── Presence ───────────────────────────────────────────────────────

/// Classified player activity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PresenceState {
    /// `player` is the `gameName#gameTag` shown as details.
    InLobby { player: String },
    PickingAgent,
    InMatch {
        mode: String,
        map: String,
        map_image: Option<String>,
    },
}

/// One presence update as handed to a sink, minus its start timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Activity {
    pub details: String,
    pub state: String,
    pub large_image: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub small_image: Option<String>,
}

pub const DEFAULT_DETAILS: &str = "Playing Valorant";
pub const DEFAULT_STATE: &str = "In Lobby";
pub const DEFAULT_LARGE_IMAGE: &str = "valorant-logo";

impl Activity {
    /// Build an activity, falling back to the display defaults for absent fields.
    pub fn new(
        details: Option<String>,
        state: Option<String>,
        large_image: Option<String>,
        small_image: Option<String>,
    ) -> Self {
        Self {
            details: details.unwrap_or_else(|| DEFAULT_DETAILS.to_string()),
            state: state.unwrap_or_else(|| DEFAULT_STATE.to_string()),
            large_image: large_image.unwrap_or_else(|| DEFAULT_LARGE_IMAGE.to_string()),
            small_image,
        }
    }
}

/// A published presence transition, emitted as a JSON line in dry-run mode.
///
/// `activity` is `None` when the presence was cleared.
#[derive(Debug, Clone, Serialize)]
pub struct PresenceEvent {
    pub timestamp: String,
    pub activity: Option<Activity>,
}
