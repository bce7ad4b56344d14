//! Client for the game client's local HTTPS API.

use std::future::Future;

use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::{PresenceError, Result};
use crate::lockfile::Credentials;
use crate::types::{Conversations, HelpSummary, OutgoingMessage, Session, TokenPair};

/// Basic-auth username expected by the local API.
const LOCAL_USERNAME: &str = "riot";

/// Local API calls needed to bootstrap a presence session.
pub trait LocalApi {
    fn session(&self) -> impl Future<Output = Result<Session>> + Send;
    fn entitlement_tokens(&self) -> impl Future<Output = Result<TokenPair>> + Send;
    fn help(&self) -> impl Future<Output = Result<HelpSummary>> + Send;
}

/// Authenticated client for `https://127.0.0.1:{port}`.
///
/// The local API serves a self-signed certificate, so verification is off for
/// this client only.
pub struct LocalClient {
    http: Client,
    base_url: String,
    password: String,
}

impl LocalClient {
    pub fn new(credentials: &Credentials) -> Result<Self> {
        let http = Client::builder()
            .danger_accept_invalid_certs(true)
            .build()
            .map_err(|source| PresenceError::Transport {
                context: "building local client".into(),
                source,
            })?;
        Ok(Self {
            http,
            base_url: credentials.base_url(),
            password: credentials.password.clone(),
        })
    }

    fn request(&self, method: reqwest::Method, path: &str) -> RequestBuilder {
        self.http
            .request(method, format!("{}{path}", self.base_url))
            .basic_auth(LOCAL_USERNAME, Some(&self.password))
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        read_json(path, self.request(reqwest::Method::GET, path)).await
    }

    /// `GET /chat/v6/conversations`.
    pub async fn conversations(&self) -> Result<Conversations> {
        self.get_json("/chat/v6/conversations").await
    }

    /// `POST /chat/v6/messages`; returns the echoed payload.
    pub async fn send_message(&self, message: &OutgoingMessage) -> Result<serde_json::Value> {
        let path = "/chat/v6/messages";
        read_json(path, self.request(reqwest::Method::POST, path).json(message)).await
    }
}

impl LocalApi for LocalClient {
    async fn session(&self) -> Result<Session> {
        self.get_json("/chat/v1/session").await
    }

    async fn entitlement_tokens(&self) -> Result<TokenPair> {
        self.get_json("/entitlements/v1/token").await
    }

    async fn help(&self) -> Result<HelpSummary> {
        let manifest: serde_json::Value = self.get_json("/help").await?;
        Ok(HelpSummary::from_manifest(&manifest))
    }
}

/// Send a request and decode its JSON body.
///
/// Auth failures are fatal; other error statuses and empty or `null` bodies
/// count as the resource being unavailable; undecodable bodies are malformed.
pub(crate) async fn read_json<T: DeserializeOwned>(context: &str, req: RequestBuilder) -> Result<T> {
    let transport = |source| PresenceError::Transport {
        context: context.to_string(),
        source,
    };
    let resp = req.send().await.map_err(transport)?;
    let status = resp.status();
    debug!("{context} -> {status}");

    check_status(context, status)?;
    let body = resp.text().await.map_err(transport)?;
    decode_body(context, &body)
}

pub(crate) fn check_status(context: &str, status: StatusCode) -> Result<()> {
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(PresenceError::Unauthorized {
            context: context.to_string(),
            status: status.as_u16(),
        });
    }
    if !status.is_success() {
        return Err(PresenceError::Unavailable {
            context: context.to_string(),
            status: status.as_u16(),
        });
    }
    Ok(())
}

pub(crate) fn decode_body<T: DeserializeOwned>(context: &str, body: &str) -> Result<T> {
    let trimmed = body.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Err(PresenceError::Unavailable {
            context: context.to_string(),
            status: StatusCode::NO_CONTENT.as_u16(),
        });
    }
    serde_json::from_str(trimmed).map_err(|e| PresenceError::malformed(context, e))
}
