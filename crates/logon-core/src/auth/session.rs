use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

/// Session file name in the data directory
const SESSION_FILE: &str = "session.json";

/// Scratch file used so a crash mid-write never leaves a truncated session
const SESSION_TMP_FILE: &str = "session.json.tmp";

/// The signed-in identity and its bearer token.
///
/// Serialized with camelCase keys, which is both the shape the remote
/// endpoint answers with and the on-disk record.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub user_id: String,
    pub display_name: String,
    pub email: String,
    pub token: String,
}

impl Session {
    /// A session is only usable when both its identity and token are present.
    pub fn is_complete(&self) -> bool {
        !self.user_id.trim().is_empty() && !self.token.trim().is_empty()
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("user_id", &self.user_id)
            .field("display_name", &self.display_name)
            .field("email", &self.email)
            .field("token", &"<redacted>")
            .finish()
    }
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Session storage I/O failed: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to serialize session: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Stored session is corrupted: {0}")]
    Corrupted(String),
}

/// Durable slot holding at most one session.
///
/// Only the `AuthContext` writes through this trait.
pub trait SessionStore: Send + Sync {
    /// Persist `session`, replacing whatever was stored before.
    fn save(&self, session: &Session) -> Result<(), StoreError>;

    /// Read the stored session, distinguishing corruption from absence.
    fn read(&self) -> Result<Option<Session>, StoreError>;

    /// Remove the stored session. Succeeds when nothing is stored.
    fn clear(&self) -> Result<(), StoreError>;

    /// Read the stored session, treating any failure as absence.
    fn load(&self) -> Option<Session> {
        match self.read() {
            Ok(session) => session,
            Err(StoreError::Corrupted(reason)) => {
                warn!(reason = %reason, "Ignoring corrupted session record");
                None
            }
            Err(e) => {
                warn!(error = %e, "Failed to read session record");
                None
            }
        }
    }
}

/// Parse a serialized session, rejecting partial records.
fn decode(contents: &str) -> Result<Session, StoreError> {
    let session: Session =
        serde_json::from_str(contents).map_err(|e| StoreError::Corrupted(e.to_string()))?;
    if !session.is_complete() {
        return Err(StoreError::Corrupted("session record is incomplete".to_string()));
    }
    Ok(session)
}

/// Session persisted as a JSON file in the application data directory.
pub struct FileSessionStore {
    data_dir: PathBuf,
}

impl FileSessionStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn path(&self) -> PathBuf {
        self.data_dir.join(SESSION_FILE)
    }

    /// Write `contents` readable by the owner only.
    fn write_private(path: &Path, contents: &str) -> io::Result<()> {
        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }

        let mut file = options.open(path)?;
        file.write_all(contents.as_bytes())?;
        file.sync_all()
    }
}

impl SessionStore for FileSessionStore {
    fn save(&self, session: &Session) -> Result<(), StoreError> {
        fs::create_dir_all(&self.data_dir)?;
        let contents = serde_json::to_string_pretty(session)?;

        let tmp = self.data_dir.join(SESSION_TMP_FILE);
        Self::write_private(&tmp, &contents)?;
        fs::rename(&tmp, self.path())?;

        debug!(path = %self.path().display(), "Session saved");
        Ok(())
    }

    fn read(&self) -> Result<Option<Session>, StoreError> {
        let path = self.path();
        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) if e.kind() == io::ErrorKind::InvalidData => {
                return Err(StoreError::Corrupted(e.to_string()))
            }
            Err(e) => return Err(e.into()),
        };
        decode(&contents).map(Some)
    }

    fn clear(&self) -> Result<(), StoreError> {
        match fs::remove_file(self.path()) {
            Ok(()) => {
                debug!("Session file removed");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Session slot that lives only as long as the process.
///
/// Holds the serialized record rather than the value so it behaves like
/// any other storage medium, corruption included.
#[derive(Default)]
pub struct MemorySessionStore {
    slot: Mutex<Option<String>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with a raw payload already in the slot.
    pub fn with_raw(payload: impl Into<String>) -> Self {
        Self {
            slot: Mutex::new(Some(payload.into())),
        }
    }

    /// The serialized record currently held, if any.
    pub fn raw(&self) -> Option<String> {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl SessionStore for MemorySessionStore {
    fn save(&self, session: &Session) -> Result<(), StoreError> {
        let contents = serde_json::to_string(session)?;
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(contents);
        Ok(())
    }

    fn read(&self) -> Result<Option<Session>, StoreError> {
        let slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        slot.as_deref().map(decode).transpose()
    }

    fn clear(&self) -> Result<(), StoreError> {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        Ok(())
    }
}
