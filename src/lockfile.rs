use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::mpsc;
use std::time::Duration;

use notify::event::ModifyKind;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{debug, info};

use crate::error::{PresenceError, Result};

/// Lockfile location relative to the per-user local data directory.
const LOCKFILE_RELATIVE: [&str; 4] = ["Riot Games", "Riot Client", "Config", "lockfile"];

/// Local client credentials parsed from the lockfile.
///
/// Held in memory only; `Debug` redacts the password.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub process_name: String,
    pub pid: u32,
    pub port: u16,
    pub password: String,
    pub protocol: String,
}

impl Credentials {
    /// Base URL of the local client API.
    pub fn base_url(&self) -> String {
        format!("{}://127.0.0.1:{}", self.protocol, self.port)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("process_name", &self.process_name)
            .field("pid", &self.pid)
            .field("port", &self.port)
            .field("password", &"<redacted>")
            .field("protocol", &self.protocol)
            .finish()
    }
}

impl FromStr for Credentials {
    type Err = PresenceError;

    /// Parse `name:pid:port:password:protocol`.
    fn from_str(line: &str) -> Result<Self> {
        let fields: Vec<&str> = line.trim_end().split(':').collect();
        if fields.len() != 5 {
            return Err(PresenceError::malformed(
                "lockfile",
                format!("expected 5 fields, found {}", fields.len()),
            ));
        }
        if let Some(idx) = fields.iter().position(|f| f.is_empty()) {
            return Err(PresenceError::malformed(
                "lockfile",
                format!("field {} is empty", idx + 1),
            ));
        }

        let pid = fields[1]
            .parse()
            .map_err(|e| PresenceError::malformed("lockfile pid", e))?;
        let port = fields[2]
            .parse()
            .map_err(|e| PresenceError::malformed("lockfile port", e))?;

        Ok(Credentials {
            process_name: fields[0].to_string(),
            pid,
            port,
            password: fields[3].to_string(),
            protocol: fields[4].to_string(),
        })
    }
}

/// Default lockfile path under the platform's local data directory.
pub fn default_lockfile_path() -> Option<PathBuf> {
    let mut path = dirs::data_local_dir()?;
    path.extend(LOCKFILE_RELATIVE);
    Some(path)
}

/// Read and parse the lockfile once.
///
/// A missing file is `CredentialsNotFound`; any other I/O failure is a fatal
/// `CredentialDirectory` error.
pub fn discover_credentials(path: &Path) -> Result<Credentials> {
    match std::fs::read_to_string(path) {
        Ok(contents) => contents.parse(),
        Err(err) if err.kind() == ErrorKind::NotFound => {
            Err(PresenceError::CredentialsNotFound(path.to_path_buf()))
        }
        Err(source) => Err(PresenceError::CredentialDirectory {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Blocks until a given file has been created.
pub trait CreationSignal {
    fn wait_for(&mut self, path: &Path) -> Result<()>;
}

/// [`CreationSignal`] backed by filesystem notifications on the parent directory.
#[derive(Debug, Default)]
pub struct FsCreationSignal;

impl CreationSignal for FsCreationSignal {
    fn wait_for(&mut self, path: &Path) -> Result<()> {
        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        let watch_err = |source| PresenceError::Watch {
            path: dir.to_path_buf(),
            source,
        };

        let (tx, rx) = mpsc::channel();
        let mut watcher: RecommendedWatcher =
            notify::recommended_watcher(move |res: notify::Result<Event>| {
                if let Ok(event) = res {
                    let _ = tx.send(event);
                }
            })
            .map_err(watch_err)?;
        watcher
            .watch(dir, RecursiveMode::NonRecursive)
            .map_err(watch_err)?;

        // The file may have appeared between the failed read and the watch registration.
        if path.exists() {
            return Ok(());
        }

        let target = path.file_name();
        while let Ok(event) = rx.recv() {
            let created = matches!(
                event.kind,
                EventKind::Create(_) | EventKind::Modify(ModifyKind::Name(_))
            );
            if created && event.paths.iter().any(|p| p.file_name() == target) {
                debug!("Lockfile event: {:?}", event.kind);
                return Ok(());
            }
        }

        Err(PresenceError::CredentialDirectory {
            path: dir.to_path_buf(),
            source: std::io::Error::other("watcher channel closed"),
        })
    }
}

/// Pause before re-reading a lockfile that was still being written when read.
const REWRITE_DELAY: Duration = Duration::from_millis(250);

/// Discover credentials, waiting for the lockfile to appear if it is absent.
///
/// Each creation notification is followed by one discovery attempt. A file
/// that parses as malformed right after a notification is treated as not yet
/// written: the wait resumes after `REWRITE_DELAY`. Malformed content found
/// without a preceding notification is returned as an error.
pub fn wait_for_credentials(path: &Path, signal: &mut impl CreationSignal) -> Result<Credentials> {
    let mut notified = false;
    loop {
        match discover_credentials(path) {
            Err(PresenceError::CredentialsNotFound(_)) => {
                info!("Waiting for lockfile at {}...", path.display());
            }
            Err(err @ PresenceError::MalformedResponse { .. }) if notified => {
                debug!("Lockfile not fully written yet ({err})");
                std::thread::sleep(REWRITE_DELAY);
            }
            other => return other,
        }
        signal.wait_for(path)?;
        notified = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_lockfile(dir: &Path, contents: &str) -> PathBuf {
        let path = dir.join("lockfile");
        std::fs::write(&path, contents).expect("write lockfile");
        path
    }

    /// Writes the next scripted contents to the lockfile on each wait; the
    /// last entry repeats once the script runs out.
    struct CreateOnWait {
        contents: Vec<&'static str>,
        waits: usize,
    }

    impl CreateOnWait {
        fn new(contents: &[&'static str]) -> Self {
            Self {
                contents: contents.to_vec(),
                waits: 0,
            }
        }
    }

    impl CreationSignal for CreateOnWait {
        fn wait_for(&mut self, path: &Path) -> Result<()> {
            let index = self.waits.min(self.contents.len() - 1);
            self.waits += 1;
            std::fs::write(path, self.contents[index]).expect("write lockfile");
            Ok(())
        }
    }

    // ── parsing ────────────────────────────────────────────────────

    #[test]
    fn parses_five_fields_in_order() {
        let creds: Credentials = "Riot Client:15840:50321:s3cr3t-Pw:https".parse().unwrap();
        assert_eq!(creds.process_name, "Riot Client");
        assert_eq!(creds.pid, 15840);
        assert_eq!(creds.port, 50321);
        assert_eq!(creds.password, "s3cr3t-Pw");
        assert_eq!(creds.protocol, "https");
        assert_eq!(creds.base_url(), "https://127.0.0.1:50321");
    }

    #[test]
    fn trailing_newline_ignored() {
        let creds: Credentials = "Riot Client:1:2:pw:https\n".parse().unwrap();
        assert_eq!(creds.protocol, "https");
    }

    #[test]
    fn wrong_field_count_is_malformed() {
        for line in ["Riot Client:1:2:pw", "Riot Client:1:2:pw:https:extra", ""] {
            let err = line.parse::<Credentials>().unwrap_err();
            assert!(
                matches!(err, PresenceError::MalformedResponse { .. }),
                "{line:?} -> {err:?}"
            );
        }
    }

    #[test]
    fn empty_field_is_malformed() {
        let err = "Riot Client:1:2::https".parse::<Credentials>().unwrap_err();
        assert!(matches!(err, PresenceError::MalformedResponse { .. }));
    }

    #[test]
    fn non_numeric_port_is_malformed() {
        let err = "Riot Client:1:port:pw:https".parse::<Credentials>().unwrap_err();
        assert!(matches!(err, PresenceError::MalformedResponse { .. }));
    }

    #[test]
    fn debug_redacts_password() {
        let creds: Credentials = "Riot Client:1:2:hunter2:https".parse().unwrap();
        let printed = format!("{creds:?}");
        assert!(!printed.contains("hunter2"));
        assert!(printed.contains("<redacted>"));
    }

    // ── discovery ──────────────────────────────────────────────────

    #[test]
    fn missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = discover_credentials(&dir.path().join("lockfile")).unwrap_err();
        assert!(matches!(err, PresenceError::CredentialsNotFound(_)));
    }

    #[test]
    fn discovers_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_lockfile(dir.path(), "Riot Client:42:6000:pw:https");
        let creds = discover_credentials(&path).unwrap();
        assert_eq!(creds.port, 6000);
    }

    #[test]
    fn wait_skips_signal_when_file_exists() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_lockfile(dir.path(), "Riot Client:42:6000:pw:https");
        let mut signal = CreateOnWait::new(&["unused"]);
        let creds = wait_for_credentials(&path, &mut signal).unwrap();
        assert_eq!(creds.pid, 42);
        assert_eq!(signal.waits, 0);
    }

    #[test]
    fn wait_retries_once_after_creation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lockfile");
        let mut signal = CreateOnWait::new(&["Riot Client:7:6001:pw:https"]);
        let creds = wait_for_credentials(&path, &mut signal).unwrap();
        assert_eq!(creds.port, 6001);
        assert_eq!(signal.waits, 1);
    }

    #[test]
    fn partially_written_file_keeps_waiting() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lockfile");
        let mut signal = CreateOnWait::new(&["", "Riot Client:7:6002:pw:https"]);
        let creds = wait_for_credentials(&path, &mut signal).unwrap();
        assert_eq!(creds.port, 6002);
        assert_eq!(signal.waits, 2);
    }

    #[test]
    fn truncated_line_after_creation_keeps_waiting() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lockfile");
        let mut signal = CreateOnWait::new(&["Riot Client:7:60", "Riot Client:7:6003:pw:https"]);
        let creds = wait_for_credentials(&path, &mut signal).unwrap();
        assert_eq!(creds.port, 6003);
        assert_eq!(signal.waits, 2);
    }

    #[test]
    fn malformed_file_present_at_start_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_lockfile(dir.path(), "Riot Client:7");
        let mut signal = CreateOnWait::new(&["Riot Client:7:6004:pw:https"]);
        let err = wait_for_credentials(&path, &mut signal).unwrap_err();
        assert!(matches!(err, PresenceError::MalformedResponse { .. }));
        assert_eq!(signal.waits, 0);
    }

    #[test]
    fn fs_signal_returns_when_file_already_present() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_lockfile(dir.path(), "Riot Client:1:2:pw:https");
        FsCreationSignal.wait_for(&path).unwrap();
    }

    #[test]
    fn fs_signal_fails_for_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("lockfile");
        let err = FsCreationSignal.wait_for(&path).unwrap_err();
        assert!(matches!(err, PresenceError::Watch { .. }));
    }

    #[test]
    fn fs_signal_wakes_on_creation_event() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lockfile");
        let writer = {
            let path = path.clone();
            std::thread::spawn(move || {
                std::thread::sleep(Duration::from_millis(200));
                std::fs::write(&path, "Riot Client:2:6010:pw:https").expect("write lockfile");
            })
        };

        FsCreationSignal.wait_for(&path).unwrap();
        writer.join().unwrap();
        let creds = discover_credentials(&path).unwrap();
        assert_eq!(creds.pid, 2);
        assert_eq!(creds.port, 6010);
    }

    #[test]
    fn fs_signal_ignores_sibling_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lockfile");
        let writer = {
            let dir = dir.path().to_path_buf();
            let path = path.clone();
            std::thread::spawn(move || {
                std::thread::sleep(Duration::from_millis(100));
                std::fs::write(dir.join("lockfile.tmp"), "x").expect("write sibling");
                std::fs::write(dir.join("settings.yaml"), "x").expect("write sibling");
                std::thread::sleep(Duration::from_millis(400));
                std::fs::write(&path, "Riot Client:3:6011:pw:https").expect("write lockfile");
            })
        };

        FsCreationSignal.wait_for(&path).unwrap();
        assert!(path.exists(), "woke before the lockfile was created");
        writer.join().unwrap();
    }
}
