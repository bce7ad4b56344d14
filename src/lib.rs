pub mod api;
pub mod auth;
pub mod config;
pub mod content;
pub mod engine;
pub mod error;
pub mod local;
pub mod lockfile;
pub mod poller;
pub mod presence;
pub mod reporter;
pub mod retry;
pub mod state;
pub mod types;

pub use error::{PresenceError, Result};
