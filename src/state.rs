use tokio::sync::watch;

use crate::api::RemoteApi;
use crate::content::ContentTables;
use crate::types::{PlayerState, Session};

/// Read-only state shared by both poll tasks, fixed after bootstrap.
pub struct PollContext<R> {
    pub remote: R,
    pub session: Session,
    pub content: ContentTables,
}

impl<R: RemoteApi> PollContext<R> {
    pub fn new(remote: R, session: Session, content: ContentTables) -> Self {
        Self {
            remote,
            session,
            content,
        }
    }
}

/// Latest player state, written by the player task and read by the presence task.
///
/// Values are replaced whole, so a reader sees either the previous or the next
/// snapshot, never a mix.
pub struct SharedPlayerState {
    tx: watch::Sender<Option<PlayerState>>,
}

impl SharedPlayerState {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx }
    }

    /// Replace the stored state; `None` marks the last refresh as failed.
    pub fn publish(&self, state: Option<PlayerState>) {
        self.tx.send_replace(state);
    }

    pub fn snapshot(&self) -> Option<PlayerState> {
        self.tx.borrow().clone()
    }
}

impl Default for SharedPlayerState {
    fn default() -> Self {
        Self::new()
    }
}
