//! Presence sinks and change-only synchronization.

use std::time::{Duration, SystemTime};

use chrono::{DateTime, Utc};
use discord_sdk::{
    Discord, Subscriptions,
    activity::{ActivityBuilder, Assets},
    wheel::{UserState, Wheel},
};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::engine::activity_for;
use crate::reporter;
use crate::types::{Activity, PresenceEvent, PresenceState};

/// Time allowed for the Discord task to flush its last update on close.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(2);

/// External display that shows the player's presence.
pub trait PresenceSink {
    /// Sink name used in log lines.
    fn name(&self) -> &'static str;

    /// Replace the displayed activity. Returns `false` if the sink can no
    /// longer accept updates.
    fn set_activity(&self, activity: &Activity, started_at: DateTime<Utc>) -> bool;

    /// Remove the displayed activity.
    fn clear(&self);
}

/// Result of [`PresenceSync::publish`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishOutcome {
    /// Same activity as the last delivered one.
    Unchanged,
    Published,
    /// The sink refused the update; it is retried on the next publish.
    Undelivered,
}

/// Pushes presence to a sink only when the derived activity changes.
pub struct PresenceSync<S> {
    sink: S,
    large_image: String,
    current: Option<Activity>,
}

impl<S: PresenceSink> PresenceSync<S> {
    pub fn new(sink: S, large_image: impl Into<String>) -> Self {
        Self {
            sink,
            large_image: large_image.into(),
            current: None,
        }
    }

    /// Publish `state` if its activity differs from the last delivered one.
    pub fn publish(&mut self, state: &PresenceState) -> PublishOutcome {
        let activity = activity_for(state, &self.large_image);
        if self.current.as_ref() == Some(&activity) {
            return PublishOutcome::Unchanged;
        }

        if !self.sink.set_activity(&activity, Utc::now()) {
            warn!(
                "{} did not accept presence update: {} / {}",
                self.sink.name(),
                activity.details,
                activity.state
            );
            return PublishOutcome::Undelivered;
        }
        info!(
            "[!] Presence changed via {}: {} / {}",
            self.sink.name(),
            activity.details,
            activity.state
        );
        self.current = Some(activity);
        PublishOutcome::Published
    }

    /// Last delivered activity.
    pub fn current(&self) -> Option<&Activity> {
        self.current.as_ref()
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Clear the sink and hand it back.
    pub fn finish(self) -> S {
        if self.current.is_some() {
            self.sink.clear();
        }
        self.sink
    }
}

// ── JSON lines ─────────────────────────────────────────────────────

/// Dry-run sink printing each update as one JSON line on stdout.
#[derive(Debug, Default)]
pub struct JsonLinesSink;

impl PresenceSink for JsonLinesSink {
    fn name(&self) -> &'static str {
        "stdout"
    }

    fn set_activity(&self, activity: &Activity, started_at: DateTime<Utc>) -> bool {
        reporter::report_event(&PresenceEvent {
            timestamp: started_at.to_rfc3339(),
            activity: Some(activity.clone()),
        });
        true
    }

    fn clear(&self) {
        reporter::report_event(&PresenceEvent {
            timestamp: Utc::now().to_rfc3339(),
            activity: None,
        });
    }
}

// ── Discord ────────────────────────────────────────────────────────

enum DiscordCommand {
    Update(Activity, DateTime<Utc>),
    Clear,
}

/// Latest requested activity and whether Discord can currently receive it.
///
/// Updates arriving while disconnected are held and replayed on each
/// (re)connect, so a Discord client started after us still gets the presence.
#[derive(Debug, Default)]
struct ActivityReplay {
    connected: bool,
    latest: Option<(Activity, DateTime<Utc>)>,
}

impl ActivityReplay {
    /// Record an update; returns it if it should be sent now.
    fn update(&mut self, activity: Activity, started_at: DateTime<Utc>) -> Option<(Activity, DateTime<Utc>)> {
        self.latest = Some((activity, started_at));
        if self.connected { self.latest.clone() } else { None }
    }

    /// Forget the held activity; returns whether a clear should be sent now.
    fn clear(&mut self) -> bool {
        self.latest = None;
        self.connected
    }

    /// Record a connection change; returns the activity to re-apply on connect.
    fn connection(&mut self, connected: bool) -> Option<(Activity, DateTime<Utc>)> {
        self.connected = connected;
        if connected { self.latest.clone() } else { None }
    }
}

/// Discord Rich Presence sink.
///
/// Owns a background task holding the Discord connection; updates are queued
/// over a channel so `set_activity` never blocks the poller. The task waits
/// for Discord as long as the sink lives and survives disconnects.
pub struct DiscordSink {
    update_tx: mpsc::UnboundedSender<DiscordCommand>,
    task: JoinHandle<()>,
}

impl DiscordSink {
    /// Spawn the Discord connection task for the given application id.
    pub fn connect(app_id: i64) -> Self {
        let (update_tx, update_rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(Self::run_discord_task(app_id, update_rx));
        Self { update_tx, task }
    }

    /// Stop accepting updates and wait briefly for the task to disconnect.
    pub async fn close(self) {
        drop(self.update_tx);
        if tokio::time::timeout(CLOSE_TIMEOUT, self.task).await.is_err() {
            debug!("Discord task did not finish in time");
        }
    }

    async fn run_discord_task(app_id: i64, mut update_rx: mpsc::UnboundedReceiver<DiscordCommand>) {
        let (wheel, handler) = Wheel::new(Box::new(|err| {
            warn!("Discord error: {:?}", err);
        }));

        let mut user_spoke = wheel.user();

        let discord = match Discord::new(app_id, Subscriptions::ACTIVITY, Box::new(handler)) {
            Ok(d) => d,
            Err(e) => {
                warn!("Discord not available: {:?}", e);
                return;
            }
        };

        info!("Discord connecting...");
        let mut replay = ActivityReplay::default();

        loop {
            tokio::select! {
                changed = user_spoke.0.changed() => {
                    if changed.is_err() {
                        warn!("Discord connection closed");
                        break;
                    }
                    let connected = match &*user_spoke.0.borrow() {
                        UserState::Connected(user) => {
                            info!("Discord Rich Presence connected as {}", user.username);
                            true
                        }
                        UserState::Disconnected(err) => {
                            warn!("Discord disconnected, waiting to reconnect: {:?}", err);
                            false
                        }
                    };
                    if let Some((activity, started_at)) = replay.connection(connected) {
                        send_activity(&discord, activity, started_at).await;
                    }
                }
                command = update_rx.recv() => match command {
                    Some(DiscordCommand::Update(activity, started_at)) => {
                        if let Some((activity, started_at)) = replay.update(activity, started_at) {
                            send_activity(&discord, activity, started_at).await;
                        }
                    }
                    Some(DiscordCommand::Clear) => {
                        if replay.clear() {
                            if let Err(e) = discord.clear_activity().await {
                                debug!("Failed to clear Discord activity: {:?}", e);
                            }
                        }
                    }
                    None => break,
                },
            }
        }

        discord.disconnect().await;
        info!("Discord Rich Presence disconnected");
    }
}

async fn send_activity(discord: &Discord, activity: Activity, started_at: DateTime<Utc>) {
    let mut assets = Assets::default().large(activity.large_image, Some::<&str>("Valorant"));
    if let Some(small) = activity.small_image {
        assets = assets.small(small, None::<&str>);
    }
    let builder = ActivityBuilder::new()
        .details(activity.details)
        .state(activity.state)
        .assets(assets)
        .start_timestamp(SystemTime::from(started_at));
    if let Err(e) = discord.update_activity(builder).await {
        debug!("Failed to update Discord activity: {:?}", e);
    }
}

impl PresenceSink for DiscordSink {
    fn name(&self) -> &'static str {
        "Discord"
    }

    fn set_activity(&self, activity: &Activity, started_at: DateTime<Utc>) -> bool {
        self.update_tx
            .send(DiscordCommand::Update(activity.clone(), started_at))
            .is_ok()
    }

    fn clear(&self) {
        if self.update_tx.send(DiscordCommand::Clear).is_err() {
            debug!("Discord task already stopped; nothing to clear");
        }
    }
}
