use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};

use valorant_presence::api::{RemoteClient, regional_base_url};
use valorant_presence::auth;
use valorant_presence::config::{AppConfig, CONFIG_PATH};
use valorant_presence::content::ContentTables;
use valorant_presence::local::LocalClient;
use valorant_presence::lockfile::{self, FsCreationSignal};
use valorant_presence::poller::Poller;
use valorant_presence::presence::{DiscordSink, JsonLinesSink, PresenceSync};
use valorant_presence::retry::RetryPolicy;
use valorant_presence::state::PollContext;

#[derive(Parser)]
#[command(
    name = "valorant-presence",
    about = "Mirror the local Valorant client's state into Discord Rich Presence"
)]
struct Args {
    /// Path to the TOML config file (optional)
    #[arg(long, default_value = CONFIG_PATH)]
    config: PathBuf,

    /// Print presence updates as JSON lines instead of talking to Discord
    #[arg(long)]
    dry_run: bool,

    /// Regional API region (overrides config)
    #[arg(long)]
    region: Option<String>,

    /// Regional API shard (overrides config)
    #[arg(long)]
    shard: Option<String>,

    /// Lockfile path (overrides config and platform default)
    #[arg(long)]
    lockfile: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let mut config = AppConfig::load_or_default(&args.config)?;
    if let Some(region) = args.region {
        config.settings.region = region;
    }
    if let Some(shard) = args.shard {
        config.settings.shard = shard;
    }

    let lockfile_path = args
        .lockfile
        .or_else(|| config.settings.lockfile_path.clone())
        .or_else(lockfile::default_lockfile_path)
        .context("cannot determine the local data directory; pass --lockfile")?;

    let content = ContentTables::load_or_builtin(config.settings.content_path.as_deref())?;
    info!(
        "Loaded content tables v{} ({} maps, {} modes)",
        content.version,
        content.map_count(),
        content.mode_count()
    );

    // --- Credential discovery ---
    let credentials = tokio::task::spawn_blocking(move || {
        lockfile::wait_for_credentials(&lockfile_path, &mut FsCreationSignal)
    })
    .await??;
    info!(
        "Got lock data (pid {}, port {})",
        credentials.pid, credentials.port
    );

    // --- Bootstrap ---
    let local = LocalClient::new(&credentials)?;
    let policy = RetryPolicy::from(&config.retry);
    let auth_ctx = tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received during bootstrap");
            return Ok(());
        }
        result = auth::authenticate(&local, &policy) => result?,
    };
    if let Some(region) = &auth_ctx.session.region {
        if !region.starts_with(&config.settings.region) {
            warn!(
                "Session region {region} differs from configured region {}",
                config.settings.region
            );
        }
    }

    let base_url = regional_base_url(&config.settings.region, &config.settings.shard)?;
    info!("Using regional API at {base_url}");
    let remote = RemoteClient::new(base_url, auth_ctx.tokens);
    let ctx = PollContext::new(remote, auth_ctx.session, content);

    let player_interval = config.settings.player_poll_interval();
    let presence_interval = config.settings.presence_poll_interval();
    let shutdown = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    // --- Polling ---
    if args.dry_run {
        let sync = PresenceSync::new(JsonLinesSink, config.discord.large_image.clone());
        Poller::new(ctx, sync, player_interval, presence_interval)
            .run(shutdown)
            .await;
    } else {
        let sink = DiscordSink::connect(config.discord.client_id);
        let sync = PresenceSync::new(sink, config.discord.large_image.clone());
        let sink = Poller::new(ctx, sync, player_interval, presence_interval)
            .run(shutdown)
            .await;
        sink.close().await;
    }

    Ok(())
}
