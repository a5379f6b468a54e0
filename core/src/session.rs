//! Bearer-token storage.
//!
//! # Design
//! The token lives behind the injectable `SessionStore` trait so the API
//! client and the orchestrator share one store without ambient globals.
//! Every read goes to the backing storage: a `set` followed by a `get`
//! always observes the new value, and the API client never caches a token
//! across calls.
//!
//! Stores do not announce changes. Whoever performs a login or logout
//! broadcasts it through a `SessionSignal`.

use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::SessionError;

/// Key the token is stored under in the session file.
pub const TOKEN_KEY: &str = "token";

/// Holds at most one bearer token.
pub trait SessionStore: Send + Sync + fmt::Debug {
    fn get(&self) -> Option<String>;
    fn set(&self, token: &str) -> Result<(), SessionError>;
    fn clear(&self) -> Result<(), SessionError>;
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Process-lifetime store, used by tests and short-lived tools.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    token: Mutex<Option<String>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: &str) -> Self {
        Self {
            token: Mutex::new(Some(token.to_string())),
        }
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self) -> Option<String> {
        lock(&self.token).clone()
    }

    fn set(&self, token: &str) -> Result<(), SessionError> {
        *lock(&self.token) = Some(token.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<(), SessionError> {
        *lock(&self.token) = None;
        Ok(())
    }
}

/// Store persisted as a JSON object in a file, so a restart keeps the
/// login. Other keys in the file are preserved.
#[derive(Debug)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<data dir>/bookshelf/session.json`, if the platform has a data dir.
    pub fn default_path() -> Option<PathBuf> {
        dirs::data_dir().map(|dir| dir.join("bookshelf").join("session.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> SessionError {
        SessionError::Io {
            path: self.path.clone(),
            source,
        }
    }

    fn read(&self) -> Result<Map<String, Value>, SessionError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Map::new()),
            Err(e) => return Err(self.io_error(e)),
        };
        match serde_json::from_str(&contents) {
            Ok(map) => Ok(map),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "ignoring malformed session file");
                Ok(Map::new())
            }
        }
    }

    fn write(&self, map: &Map<String, Value>) -> Result<(), SessionError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }
        let json = serde_json::to_string_pretty(map).map_err(|source| SessionError::Encode {
            path: self.path.clone(),
            source,
        })?;
        fs::write(&self.path, json).map_err(|e| self.io_error(e))
    }
}

impl SessionStore for FileSessionStore {
    fn get(&self) -> Option<String> {
        match self.read() {
            Ok(map) => map.get(TOKEN_KEY).and_then(Value::as_str).map(str::to_string),
            Err(e) => {
                warn!(error = %e, "could not read session");
                None
            }
        }
    }

    fn set(&self, token: &str) -> Result<(), SessionError> {
        let mut map = self.read()?;
        map.insert(TOKEN_KEY.to_string(), Value::String(token.to_string()));
        self.write(&map)?;
        debug!(path = %self.path.display(), "session stored");
        Ok(())
    }

    fn clear(&self) -> Result<(), SessionError> {
        let mut map = self.read()?;
        if map.remove(TOKEN_KEY).is_none() {
            return Ok(());
        }
        self.write(&map)?;
        debug!(path = %self.path.display(), "session cleared");
        Ok(())
    }
}

/// Login state transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    LoggedIn,
    LoggedOut,
}

/// Fan-out of `SessionEvent`s to any number of subscribers.
#[derive(Debug, Default)]
pub struct SessionSignal {
    subscribers: Mutex<Vec<Sender<SessionEvent>>>,
}

impl SessionSignal {
    pub fn subscribe(&self) -> Receiver<SessionEvent> {
        let (tx, rx) = mpsc::channel();
        lock(&self.subscribers).push(tx);
        rx
    }

    /// Send `event` to every live subscriber; dropped receivers are pruned.
    pub fn broadcast(&self, event: SessionEvent) {
        lock(&self.subscribers).retain(|tx| tx.send(event).is_ok());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_set_get_clear() {
        let store = MemorySessionStore::new();
        assert_eq!(store.get(), None);
        store.set("abc").unwrap();
        assert_eq!(store.get().as_deref(), Some("abc"));
        store.clear().unwrap();
        assert_eq!(store.get(), None);
    }

    #[test]
    fn file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("session.json");

        let store = FileSessionStore::new(&path);
        assert_eq!(store.get(), None);
        store.set("abc").unwrap();
        assert_eq!(store.get().as_deref(), Some("abc"));

        let reopened = FileSessionStore::new(&path);
        assert_eq!(reopened.get().as_deref(), Some("abc"));

        reopened.clear().unwrap();
        assert_eq!(store.get(), None);
    }

    #[test]
    fn file_store_keeps_unrelated_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        fs::write(&path, r#"{"theme":"dark"}"#).unwrap();

        let store = FileSessionStore::new(&path);
        store.set("abc").unwrap();
        store.clear().unwrap();

        let raw: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["theme"], "dark");
        assert!(raw.get(TOKEN_KEY).is_none());
    }

    #[test]
    fn file_store_treats_garbage_as_logged_out() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        fs::write(&path, "not json").unwrap();

        let store = FileSessionStore::new(&path);
        assert_eq!(store.get(), None);
        store.set("fresh").unwrap();
        assert_eq!(store.get().as_deref(), Some("fresh"));
    }

    #[test]
    fn clearing_a_missing_file_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSessionStore::new(dir.path().join("absent.json"));
        store.clear().unwrap();
        assert!(!store.path().exists());
    }

    #[test]
    fn signal_reaches_every_subscriber() {
        let signal = SessionSignal::default();
        let first = signal.subscribe();
        let second = signal.subscribe();
        drop(second);

        signal.broadcast(SessionEvent::LoggedIn);
        signal.broadcast(SessionEvent::LoggedOut);

        assert_eq!(first.try_recv(), Ok(SessionEvent::LoggedIn));
        assert_eq!(first.try_recv(), Ok(SessionEvent::LoggedOut));
        assert_eq!(lock(&signal.subscribers).len(), 1);
    }
}
