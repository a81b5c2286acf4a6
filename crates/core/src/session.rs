//! Session gate and its storage adapters.
//!
//! [`SessionGate`] owns the single `unlocked` flag that decides whether gated
//! queries may run. It is injected into the components that need it rather
//! than read from ambient state. Persistence goes through a [`SessionStore`]
//! so the flag can live in process memory (scoped like a browser tab) or in a
//! file that survives a restart.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};

use crate::error::ConsoleError;

// ---------------------------------------------------------------------------
// Storage adapters
// ---------------------------------------------------------------------------

/// Ephemeral storage for the unlocked flag.
pub trait SessionStore: Send + Sync {
    /// `Ok(None)` when nothing has been stored yet.
    fn load(&self) -> std::io::Result<Option<bool>>;

    fn save(&self, unlocked: bool) -> std::io::Result<()>;

    fn clear(&self) -> std::io::Result<()>;
}

/// In-process store. Clones share the same slot, so a gate rebuilt from a
/// clone sees what the previous gate persisted.
#[derive(Debug, Clone, Default)]
pub struct MemorySessionStore {
    slot: Arc<Mutex<Option<bool>>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    fn load(&self) -> std::io::Result<Option<bool>> {
        Ok(*self.slot.lock().unwrap_or_else(PoisonError::into_inner))
    }

    fn save(&self, unlocked: bool) -> std::io::Result<()> {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(unlocked);
        Ok(())
    }

    fn clear(&self) -> std::io::Result<()> {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}

/// On-disk shape of the persisted session.
#[derive(Debug, Serialize, Deserialize)]
struct PersistedSession {
    unlocked: bool,
}

/// JSON file store. A missing file means "never unlocked".
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

impl SessionStore for FileSessionStore {
    fn load(&self) -> std::io::Result<Option<bool>> {
        let raw = match std::fs::read(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e),
        };
        let persisted: PersistedSession = serde_json::from_slice(&raw)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        Ok(Some(persisted.unlocked))
    }

    fn save(&self, unlocked: bool) -> std::io::Result<()> {
        let raw = serde_json::to_vec(&PersistedSession { unlocked })
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(&self.path, raw)
    }

    fn clear(&self) -> std::io::Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }
}

// ---------------------------------------------------------------------------
// SessionGate
// ---------------------------------------------------------------------------

/// Tracks whether protected views and queries are available.
///
/// Only the gate transitions `unlocked`. There is no expiry: once unlocked it
/// stays unlocked until [`SessionGate::lock`] is called.
pub struct SessionGate {
    unlocked: AtomicBool,
    store: Arc<dyn SessionStore>,
}

impl SessionGate {
    /// A locked gate that ignores whatever the store holds.
    pub fn locked(store: Arc<dyn SessionStore>) -> Self {
        Self {
            unlocked: AtomicBool::new(false),
            store,
        }
    }

    /// Build a gate, restoring the unlocked flag from `store` if present.
    ///
    /// This is the only path by which an unlock survives a restart.
    pub fn restore(store: Arc<dyn SessionStore>) -> Result<Self, ConsoleError> {
        let unlocked = store
            .load()
            .map_err(|e| ConsoleError::Storage(e.to_string()))?
            .unwrap_or(false);
        Ok(Self {
            unlocked: AtomicBool::new(unlocked),
            store,
        })
    }

    pub fn is_unlocked(&self) -> bool {
        self.unlocked.load(Ordering::SeqCst)
    }

    /// Persist and set the unlocked flag.
    ///
    /// Returns `true` only for a locked -> unlocked transition. If the store
    /// rejects the write the gate stays locked.
    pub fn unlock(&self) -> Result<bool, ConsoleError> {
        if self.is_unlocked() {
            return Ok(false);
        }
        self.store
            .save(true)
            .map_err(|e| ConsoleError::Storage(e.to_string()))?;
        Ok(!self.unlocked.swap(true, Ordering::SeqCst))
    }

    /// Clear the persisted flag and lock.
    ///
    /// Returns `true` only for an unlocked -> locked transition. The flag is
    /// dropped in memory even if clearing the store fails.
    pub fn lock(&self) -> Result<bool, ConsoleError> {
        let was_unlocked = self.unlocked.swap(false, Ordering::SeqCst);
        self.store
            .clear()
            .map_err(|e| ConsoleError::Storage(e.to_string()))?;
        Ok(was_unlocked)
    }
}

impl std::fmt::Debug for SessionGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionGate")
            .field("unlocked", &self.is_unlocked())
            .finish_non_exhaustive()
    }
}
