use std::future::Future;

use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::error::{PresenceError, Result};
use crate::local::{check_status, decode_body};
use crate::types::{
    CoreGameMatch, MatchRecord, PlayerMatch, PlayerState, PregameMatch, Session, TokenPair,
};

/// Header carrying the entitlements JWT on regional API requests.
const ENTITLEMENTS_HEADER: &str = "X-Riot-Entitlements-JWT";

/// Regional game API. Every call yields `Ok(None)` when the resource is not found.
pub trait RemoteApi {
    fn core_game_player(
        &self,
        puuid: &str,
    ) -> impl Future<Output = Result<Option<PlayerMatch>>> + Send;
    fn core_game_match(
        &self,
        match_id: &str,
    ) -> impl Future<Output = Result<Option<CoreGameMatch>>> + Send;
    fn pregame_player(
        &self,
        puuid: &str,
    ) -> impl Future<Output = Result<Option<PlayerMatch>>> + Send;
    fn pregame_match(
        &self,
        match_id: &str,
    ) -> impl Future<Output = Result<Option<PregameMatch>>> + Send;
}

/// Regional base URL, e.g. `https://glz-eu-1.eu.a.pvp.net`.
pub fn regional_base_url(region: &str, shard: &str) -> Result<url::Url> {
    let raw = format!("https://glz-{region}-1.{shard}.a.pvp.net");
    url::Url::parse(&raw).map_err(|e| PresenceError::malformed("regional base url", e))
}

/// Bearer-authenticated client for the regional game API.
pub struct RemoteClient {
    http: Client,
    base_url: url::Url,
    tokens: TokenPair,
}

impl RemoteClient {
    pub fn new(base_url: url::Url, tokens: TokenPair) -> Self {
        Self {
            http: Client::new(),
            base_url,
            tokens,
        }
    }

    async fn get_optional<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>> {
        let url = self
            .base_url
            .join(path)
            .map_err(|e| PresenceError::malformed(path, e))?;
        let transport = |source| PresenceError::Transport {
            context: path.to_string(),
            source,
        };
        let resp = self
            .http
            .get(url)
            .bearer_auth(&self.tokens.access_token)
            .header(ENTITLEMENTS_HEADER, &self.tokens.entitlements_token)
            .send()
            .await
            .map_err(transport)?;

        let status = resp.status();
        debug!("{path} -> {status}");
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        check_status(path, status)?;
        let body = resp.text().await.map_err(transport)?;
        decode_body(path, &body).map(Some)
    }
}

impl RemoteApi for RemoteClient {
    async fn core_game_player(&self, puuid: &str) -> Result<Option<PlayerMatch>> {
        self.get_optional(&format!("/core-game/v1/players/{puuid}"))
            .await
    }

    async fn core_game_match(&self, match_id: &str) -> Result<Option<CoreGameMatch>> {
        self.get_optional(&format!("/core-game/v1/matches/{match_id}"))
            .await
    }

    async fn pregame_player(&self, puuid: &str) -> Result<Option<PlayerMatch>> {
        self.get_optional(&format!("/pregame/v1/players/{puuid}"))
            .await
    }

    async fn pregame_match(&self, match_id: &str) -> Result<Option<PregameMatch>> {
        self.get_optional(&format!("/pregame/v1/matches/{match_id}"))
            .await
    }
}

/// Refresh the player's core-game state.
///
/// A 404 means the player is not in a running match. Any other failure is
/// logged and yields `None`.
pub async fn fetch_player_state(api: &impl RemoteApi, session: &Session) -> Option<PlayerState> {
    match api.core_game_player(&session.puuid).await {
        Ok(found) => Some(PlayerState {
            match_id: found.map(|p| p.match_id),
        }),
        Err(e) => {
            warn!("Error fetching player state: {e}");
            None
        }
    }
}

/// Resolve the player's current match record.
///
/// Tries the core-game match first, then falls back to pregame. Returns `None`
/// when a lookup fails for any reason other than "not found".
pub async fn fetch_match_state(
    api: &impl RemoteApi,
    player: &PlayerState,
    session: &Session,
) -> Option<MatchRecord> {
    match resolve_match(api, player, session).await {
        Ok(record) => Some(record),
        Err(e) => {
            warn!("Error fetching match data: {e}");
            None
        }
    }
}

async fn resolve_match(
    api: &impl RemoteApi,
    player: &PlayerState,
    session: &Session,
) -> Result<MatchRecord> {
    if let Some(match_id) = &player.match_id {
        if let Some(core) = api.core_game_match(match_id).await? {
            return Ok(MatchRecord::InProgress(core));
        }
        debug!("Core-game match {match_id} not found, checking pregame");
    }

    let Some(pregame_player) = api.pregame_player(&session.puuid).await? else {
        return Ok(MatchRecord::NoActiveMatch);
    };
    match api.pregame_match(&pregame_player.match_id).await? {
        Some(pregame) => Ok(MatchRecord::Pregame(pregame)),
        None => Ok(MatchRecord::NoActiveMatch),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Canned responses keyed by path; unknown paths are a 404.
    #[derive(Default)]
    pub(crate) struct FakeRemote {
        pub responses: Mutex<HashMap<String, Result<serde_json::Value>>>,
        pub calls: Mutex<Vec<String>>,
    }

    impl FakeRemote {
        pub fn with(self, path: &str, body: serde_json::Value) -> Self {
            self.responses
                .lock()
                .unwrap()
                .insert(path.to_string(), Ok(body));
            self
        }

        pub fn failing(self, path: &str) -> Self {
            self.responses.lock().unwrap().insert(
                path.to_string(),
                Err(PresenceError::Unavailable {
                    context: path.to_string(),
                    status: 503,
                }),
            );
            self
        }

        pub fn set(&self, path: &str, body: serde_json::Value) {
            self.responses
                .lock()
                .unwrap()
                .insert(path.to_string(), Ok(body));
        }

        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn respond<T: DeserializeOwned>(&self, path: String) -> Result<Option<T>> {
            self.calls.lock().unwrap().push(path.clone());
            match self.responses.lock().unwrap().get(&path) {
                None => Ok(None),
                Some(Err(e)) => Err(PresenceError::Unavailable {
                    context: e.to_string(),
                    status: 503,
                }),
                Some(Ok(body)) => serde_json::from_value(body.clone())
                    .map(Some)
                    .map_err(|e| PresenceError::malformed(path, e)),
            }
        }
    }

    impl RemoteApi for FakeRemote {
        async fn core_game_player(&self, puuid: &str) -> Result<Option<PlayerMatch>> {
            self.respond(format!("/core-game/v1/players/{puuid}"))
        }

        async fn core_game_match(&self, match_id: &str) -> Result<Option<CoreGameMatch>> {
            self.respond(format!("/core-game/v1/matches/{match_id}"))
        }

        async fn pregame_player(&self, puuid: &str) -> Result<Option<PlayerMatch>> {
            self.respond(format!("/pregame/v1/players/{puuid}"))
        }

        async fn pregame_match(&self, match_id: &str) -> Result<Option<PregameMatch>> {
            self.respond(format!("/pregame/v1/matches/{match_id}"))
        }
    }

    pub(crate) fn session() -> Session {
        Session {
            puuid: "p1".into(),
            game_name: "Sova".into(),
            game_tag: "EUW".into(),
            loaded: true,
            region: None,
        }
    }

    fn in_match(id: &str) -> PlayerState {
        PlayerState {
            match_id: Some(id.into()),
        }
    }

    // ── fetch_player_state ─────────────────────────────────────────

    #[tokio::test]
    async fn player_state_with_match() {
        let api = FakeRemote::default().with(
            "/core-game/v1/players/p1",
            serde_json::json!({ "Subject": "p1", "MatchID": "m1", "Version": 1 }),
        );
        let state = fetch_player_state(&api, &session()).await;
        assert_eq!(state, Some(in_match("m1")));
    }

    #[tokio::test]
    async fn player_state_not_in_match() {
        let api = FakeRemote::default();
        let state = fetch_player_state(&api, &session()).await;
        assert_eq!(state, Some(PlayerState { match_id: None }));
    }

    #[tokio::test]
    async fn player_state_failure_is_none() {
        let api = FakeRemote::default().failing("/core-game/v1/players/p1");
        assert_eq!(fetch_player_state(&api, &session()).await, None);
    }

    // ── fetch_match_state ──────────────────────────────────────────

    #[tokio::test]
    async fn core_game_match_found() {
        let api = FakeRemote::default().with(
            "/core-game/v1/matches/m1",
            serde_json::json!({
                "MatchID": "m1",
                "State": "IN_PROGRESS",
                "MapID": "/Game/Maps/Ascent/Ascent",
                "ModeID": "/Game/GameModes/Bomb/BombGameMode.BombGameMode_C"
            }),
        );
        let record = fetch_match_state(&api, &in_match("m1"), &session()).await;
        match record {
            Some(MatchRecord::InProgress(m)) => assert_eq!(m.state, "IN_PROGRESS"),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(api.calls(), vec!["/core-game/v1/matches/m1"]);
    }

    #[tokio::test]
    async fn falls_back_to_pregame_on_not_found() {
        let api = FakeRemote::default()
            .with(
                "/pregame/v1/players/p1",
                serde_json::json!({ "Subject": "p1", "MatchID": "pre1" }),
            )
            .with(
                "/pregame/v1/matches/pre1",
                serde_json::json!({
                    "ID": "pre1",
                    "PregameState": "character_select_active",
                    "Teams": []
                }),
            );
        let record = fetch_match_state(&api, &in_match("m1"), &session()).await;
        assert!(matches!(record, Some(MatchRecord::Pregame(_))));
        assert_eq!(
            api.calls(),
            vec![
                "/core-game/v1/matches/m1",
                "/pregame/v1/players/p1",
                "/pregame/v1/matches/pre1",
            ]
        );
    }

    #[tokio::test]
    async fn no_pregame_is_no_active_match() {
        let api = FakeRemote::default();
        let record = fetch_match_state(&api, &in_match("m1"), &session()).await;
        assert_eq!(record, Some(MatchRecord::NoActiveMatch));
    }

    #[tokio::test]
    async fn missing_match_id_skips_core_game() {
        let api = FakeRemote::default();
        let record = fetch_match_state(&api, &PlayerState { match_id: None }, &session()).await;
        assert_eq!(record, Some(MatchRecord::NoActiveMatch));
        assert_eq!(api.calls(), vec!["/pregame/v1/players/p1"]);
    }

    #[tokio::test]
    async fn pregame_match_gone_is_no_active_match() {
        let api = FakeRemote::default().with(
            "/pregame/v1/players/p1",
            serde_json::json!({ "MatchID": "pre1" }),
        );
        let record = fetch_match_state(&api, &in_match("m1"), &session()).await;
        assert_eq!(record, Some(MatchRecord::NoActiveMatch));
    }

    #[tokio::test]
    async fn primary_failure_is_absent_record() {
        let api = FakeRemote::default().failing("/core-game/v1/matches/m1");
        let record = fetch_match_state(&api, &in_match("m1"), &session()).await;
        assert_eq!(record, None);
        assert_eq!(api.calls().len(), 1);
    }

    #[tokio::test]
    async fn malformed_body_is_absent_record() {
        let api = FakeRemote::default().with(
            "/core-game/v1/matches/m1",
            serde_json::json!({ "MatchID": "m1" }),
        );
        assert_eq!(fetch_match_state(&api, &in_match("m1"), &session()).await, None);
    }

    #[test]
    fn builds_regional_url() {
        let url = regional_base_url("eu", "eu").unwrap();
        assert_eq!(url.as_str(), "https://glz-eu-1.eu.a.pvp.net/");
    }
}
