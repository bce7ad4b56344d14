use tracing::{debug, info};

use crate::error::{PresenceError, Result};
use crate::local::LocalApi;
use crate::retry::{RetryPolicy, retry};
use crate::types::{HelpSummary, Session, TokenPair};

/// Everything the poller needs from the local client, acquired once per run.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub session: Session,
    pub tokens: TokenPair,
    pub help: HelpSummary,
}

/// Bootstrap against the local client API.
///
/// Acquires, in order: a loaded chat session, the entitlement token pair, and
/// the help manifest. Each step retries under `policy`; an unloaded session
/// waits the policy's not-ready delay before the next attempt.
pub async fn authenticate(local: &impl LocalApi, policy: &RetryPolicy) -> Result<AuthContext> {
    let session = retry(policy, "session data", || async move {
        let session = local.session().await?;
        debug!("Session: loaded={} puuid={}", session.loaded, session.puuid);
        if !session.loaded {
            return Err(PresenceError::SessionNotReady);
        }
        Ok(session)
    })
    .await?;
    info!("Got session for {}", session.riot_id());

    let tokens = retry(policy, "entitlement tokens", || local.entitlement_tokens()).await?;
    debug!("Got entitlement tokens for {}", tokens.subject);

    let help = retry(policy, "help manifest", || local.help()).await?;
    debug!(
        "Local API ready ({} functions, {} events)",
        help.functions, help.events
    );

    info!("Got PUUID {}", session.puuid);
    Ok(AuthContext {
        session,
        tokens,
        help,
    })
}
