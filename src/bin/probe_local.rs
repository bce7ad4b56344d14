//! Probe: local client API
//!
//! Reads the lockfile once (no waiting), bootstraps against the local API and
//! dumps what the presence mirror relies on:
//! - Session descriptor (PUUID, Riot ID, loaded flag)
//! - Token metadata (subject only; token values are never printed)
//! - Help manifest summary
//! - Conversation list
//! - Latency of each step

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use serde_json::json;

use valorant_presence::auth;
use valorant_presence::local::LocalClient;
use valorant_presence::lockfile;
use valorant_presence::reporter;
use valorant_presence::retry::RetryPolicy;

#[derive(Parser)]
#[command(name = "probe_local", about = "Dump local client API state as JSON")]
struct Args {
    /// Lockfile path (defaults to the platform location)
    #[arg(long)]
    lockfile: Option<PathBuf>,

    /// Give up after this many attempts per bootstrap step
    #[arg(long, default_value_t = 20)]
    max_attempts: u32,
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

    let path = args
        .lockfile
        .or_else(lockfile::default_lockfile_path)
        .context("cannot determine the local data directory; pass --lockfile")?;
    let credentials = lockfile::discover_credentials(&path)?;
    println!("=== Probe: local client API ===");
    println!("Lockfile: {}", path.display());
    println!("Credentials: {credentials:?}");
    println!();

    let local = LocalClient::new(&credentials)?;
    let policy = RetryPolicy {
        max_attempts: Some(args.max_attempts),
        ..RetryPolicy::default()
    };

    println!("--- 1. Bootstrap ---");
    let start = Instant::now();
    let ctx = auth::authenticate(&local, &policy).await?;
    println!("Latency: {:?}", start.elapsed());
    reporter::report_pretty(&json!({
        "session": ctx.session,
        "token_subject": ctx.tokens.subject,
        "help": ctx.help,
    }));
    println!();

    println!("--- 2. Conversations ---");
    let start = Instant::now();
    match local.conversations().await {
        Ok(conversations) => {
            println!("Latency: {:?}", start.elapsed());
            println!("Conversation count: {}", conversations.conversations.len());
            reporter::report_pretty(&conversations);
        }
        Err(e) => println!("Failed to fetch conversations: {e}"),
    }

    Ok(())
}
