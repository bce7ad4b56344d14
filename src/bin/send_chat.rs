//! send-chat — post a chat message through the local client API.
//!
//! Without `--cid`, the message goes to the first conversation returned by
//! the conversation list.

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Parser;
use tracing::info;

use valorant_presence::local::LocalClient;
use valorant_presence::lockfile;
use valorant_presence::reporter;
use valorant_presence::types::OutgoingMessage;

#[derive(Parser)]
#[command(name = "send-chat", about = "Send a chat message via the local client API")]
struct Cli {
    /// Message text
    message: String,

    /// Conversation id, e.g. `<puuid>@eu1.pvp.net`
    #[arg(long)]
    cid: Option<String>,

    /// Message type (`chat` for direct messages, `groupchat` for parties)
    #[arg(long, default_value = "chat")]
    kind: String,

    /// Lockfile path (defaults to the platform location)
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

    let cli = Cli::parse();
    if cli.message.trim().is_empty() {
        bail!("message cannot be empty");
    }

    let path = cli
        .lockfile
        .or_else(lockfile::default_lockfile_path)
        .context("cannot determine the local data directory; pass --lockfile")?;
    let credentials = lockfile::discover_credentials(&path)
        .with_context(|| format!("is the client running? ({})", path.display()))?;
    let local = LocalClient::new(&credentials)?;

    let cid = match cli.cid {
        Some(cid) => cid,
        None => {
            let conversations = local.conversations().await?;
            let Some(first) = conversations.conversations.into_iter().next() else {
                bail!("no conversations available; pass --cid");
            };
            info!("Using first conversation {} ({})", first.cid, first.kind);
            first.cid
        }
    };

    let echoed = local
        .send_message(&OutgoingMessage {
            kind: cli.kind,
            cid,
            message: cli.message,
        })
        .await?;
    reporter::report_pretty(&echoed);

    Ok(())
}
