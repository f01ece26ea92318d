//! Key/value session context with optional per-key expiry.
//!
//! Values are stored as JSON text so any serde type can be kept. When a file
//! path is configured the whole table is written with bincode after every
//! mutation. Persistence problems are logged and never interrupt the game.

use crate::error::ClientError;
use log::{debug, warn};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use shared::{GameKind, GameStatus, PlayerProfile};
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

pub mod keys {
    pub const ACCOUNT: &str = "account";
    pub const TOKEN: &str = "token";
    pub const GAME_TYPE: &str = "gameType";
    pub const GAME_ROOM_ID: &str = "gameRoomId";
    pub const GAME_STATUS: &str = "gameStatus";
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Entry {
    value: String,
    /// Absolute expiry in unix milliseconds.
    expires_at: Option<u64>,
}

#[derive(Debug, Default)]
pub struct SessionContext {
    entries: HashMap<String, Entry>,
    path: Option<PathBuf>,
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::from_secs(0))
        .as_millis() as u64
}

impl SessionContext {
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Loads the table from `path`, starting empty if the file does not exist
    /// or cannot be decoded.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ClientError> {
        let path = path.as_ref().to_path_buf();
        let entries = match fs::read(&path) {
            Ok(bytes) => match bincode::deserialize(&bytes) {
                Ok(entries) => entries,
                Err(e) => {
                    warn!("Discarding unreadable session file {}: {}", path.display(), e);
                    HashMap::new()
                }
            },
            Err(e) if e.kind() == ErrorKind::NotFound => HashMap::new(),
            Err(e) => return Err(e.into()),
        };

        debug!("Session loaded with {} keys", entries.len());
        Ok(Self {
            entries,
            path: Some(path),
        })
    }

    /// Reads `key`. Expired or undecodable entries are removed and read as `None`.
    pub fn get<T: DeserializeOwned>(&mut self, key: &str) -> Option<T> {
        let entry = self.entries.get(key)?;

        if entry.expires_at.is_some_and(|at| at <= now_millis()) {
            debug!("Session key {} expired", key);
            self.remove(key);
            return None;
        }

        match serde_json::from_str(&entry.value) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Dropping undecodable session key {}: {}", key, e);
                self.remove(key);
                None
            }
        }
    }

    pub fn set<T: Serialize + ?Sized>(&mut self, key: &str, value: &T) {
        self.insert(key, value, None);
    }

    /// Stores `value` until `expires_at` (unix milliseconds).
    pub fn set_until<T: Serialize + ?Sized>(&mut self, key: &str, value: &T, expires_at: u64) {
        self.insert(key, value, Some(expires_at));
    }

    pub fn remove(&mut self, key: &str) {
        if self.entries.remove(key).is_some() {
            self.persist();
        }
    }

    pub fn contains(&mut self, key: &str) -> bool {
        self.get::<serde_json::Value>(key).is_some()
    }

    pub fn account(&mut self) -> Option<PlayerProfile> {
        self.get(keys::ACCOUNT)
    }

    pub fn token(&mut self) -> Option<String> {
        self.get(keys::TOKEN)
    }

    pub fn room_id(&mut self) -> Option<String> {
        self.get::<String>(keys::GAME_ROOM_ID)
            .filter(|id| !id.is_empty())
    }

    pub fn game_kind(&mut self) -> Option<GameKind> {
        self.get(keys::GAME_TYPE)
    }

    pub fn game_status(&mut self) -> Option<GameStatus> {
        self.get(keys::GAME_STATUS)
    }

    pub fn set_room_id(&mut self, room_id: &str) {
        self.set(keys::GAME_ROOM_ID, room_id);
    }

    pub fn set_game_kind(&mut self, kind: GameKind) {
        self.set(keys::GAME_TYPE, &kind);
    }

    pub fn set_game_status(&mut self, status: GameStatus) {
        self.set(keys::GAME_STATUS, &status);
    }

    /// Drops the room, game kind and game status keys.
    pub fn clear_game(&mut self) {
        self.remove(keys::GAME_ROOM_ID);
        self.remove(keys::GAME_TYPE);
        self.remove(keys::GAME_STATUS);
    }

    pub fn clear_identity(&mut self) {
        self.remove(keys::ACCOUNT);
        self.remove(keys::TOKEN);
    }

    fn insert<T: Serialize + ?Sized>(&mut self, key: &str, value: &T, expires_at: Option<u64>) {
        let value = match serde_json::to_string(value) {
            Ok(value) => value,
            Err(e) => {
                warn!("Cannot store session key {}: {}", key, e);
                return;
            }
        };
        self.entries
            .insert(key.to_string(), Entry { value, expires_at });
        self.persist();
    }

    fn persist(&self) {
        let Some(path) = &self.path else {
            return;
        };
        let result = bincode::serialize(&self.entries)
            .map_err(ClientError::from)
            .and_then(|bytes| fs::write(path, bytes).map_err(ClientError::from));
        if let Err(e) = result {
            warn!("Failed to persist session to {}: {}", path.display(), e);
        }
    }
}
