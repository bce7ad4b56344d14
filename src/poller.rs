use std::future::Future;
use std::time::Duration;

use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{debug, info};

use crate::api::{RemoteApi, fetch_match_state, fetch_player_state};
use crate::engine::classify;
use crate::presence::{PresenceSink, PresenceSync, PublishOutcome};
use crate::state::{PollContext, SharedPlayerState};

/// What a presence tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// No player state yet.
    Skipped,
    /// The match lookup failed; nothing changes this tick.
    FetchFailed,
    /// The match record carries no presence signal.
    Unclassified,
    Unchanged,
    Published,
    /// The sink refused the update; the next tick tries again.
    Undelivered,
}

/// Refresh the shared player state once.
pub async fn player_tick<R: RemoteApi>(ctx: &PollContext<R>, shared: &SharedPlayerState) {
    let state = fetch_player_state(&ctx.remote, &ctx.session).await;
    shared.publish(state);
}

/// Fetch the current match, classify it and publish any change.
pub async fn presence_tick<R: RemoteApi, S: PresenceSink>(
    ctx: &PollContext<R>,
    shared: &SharedPlayerState,
    sync: &mut PresenceSync<S>,
) -> TickOutcome {
    let Some(player) = shared.snapshot() else {
        return TickOutcome::Skipped;
    };
    let Some(record) = fetch_match_state(&ctx.remote, &player, &ctx.session).await else {
        return TickOutcome::FetchFailed;
    };
    let Some(state) = classify(&record, &ctx.session, &ctx.content) else {
        return TickOutcome::Unclassified;
    };
    match sync.publish(&state) {
        PublishOutcome::Published => TickOutcome::Published,
        PublishOutcome::Unchanged => TickOutcome::Unchanged,
        PublishOutcome::Undelivered => TickOutcome::Undelivered,
    }
}

/// Runs the player-state and presence loops until shutdown.
pub struct Poller<R, S> {
    ctx: PollContext<R>,
    sync: PresenceSync<S>,
    player_interval: Duration,
    presence_interval: Duration,
}

impl<R: RemoteApi, S: PresenceSink> Poller<R, S> {
    pub fn new(
        ctx: PollContext<R>,
        sync: PresenceSync<S>,
        player_interval: Duration,
        presence_interval: Duration,
    ) -> Self {
        Self {
            ctx,
            sync,
            player_interval,
            presence_interval,
        }
    }

    /// Poll until `shutdown` resolves, then clear the presence and return the sink.
    ///
    /// Both loops run concurrently, so a stalled request in one does not hold
    /// up the other.
    pub async fn run(self, shutdown: impl Future<Output = ()>) -> S {
        let Poller {
            ctx,
            mut sync,
            player_interval,
            presence_interval,
        } = self;
        let shared = SharedPlayerState::new();

        info!(
            "Entering polling loop (player: {}ms, presence: {}ms)",
            player_interval.as_millis(),
            presence_interval.as_millis()
        );

        tokio::select! {
            _ = shutdown => {
                info!("Shutdown signal received");
            }
            _ = async {
                tokio::join!(
                    player_loop(&ctx, &shared, player_interval),
                    presence_loop(&ctx, &shared, &mut sync, presence_interval),
                )
            } => {}
        }

        sync.finish()
    }
}

async fn player_loop<R: RemoteApi>(ctx: &PollContext<R>, shared: &SharedPlayerState, period: Duration) {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    loop {
        ticker.tick().await;
        player_tick(ctx, shared).await;
    }
}

async fn presence_loop<R: RemoteApi, S: PresenceSink>(
    ctx: &PollContext<R>,
    shared: &SharedPlayerState,
    sync: &mut PresenceSync<S>,
    period: Duration,
) {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    loop {
        ticker.tick().await;
        let outcome = presence_tick(ctx, shared, sync).await;
        debug!("Presence tick: {outcome:?}");
    }
}
