use std::collections::HashMap;
use std::path::PathBuf;

use tracing::{debug, warn};

use crate::codec::{normalize_hex, Color};
use crate::error::{Error, Result};

/// Storage key of the selected color.
pub const USER_HEX_KEY: &str = "userHex";

/// Durable key/value storage for user preferences
pub trait PreferenceStore: Send {
    fn load(&self, key: &str) -> Option<String>;

    fn store(&mut self, key: &str, value: &str) -> Result<()>;
}

pub fn default_store_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("button-canvas")
}

/// One file per key under a directory
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn open_default() -> Self {
        Self::new(default_store_dir())
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(key)
    }
}

impl PreferenceStore for FileStore {
    fn load(&self, key: &str) -> Option<String> {
        std::fs::read_to_string(self.path(key))
            .ok()
            .map(|s| s.trim().to_string())
    }

    fn store(&mut self, key: &str, value: &str) -> Result<()> {
        std::fs::create_dir_all(&self.dir).map_err(|e| Error::Storage(e.to_string()))?;
        std::fs::write(self.path(key), value).map_err(|e| Error::Storage(e.to_string()))
    }
}

/// Ephemeral store
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    values: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, value: &str) -> Self {
        self.values.insert(key.to_string(), value.to_string());
        self
    }
}

impl PreferenceStore for MemoryStore {
    fn load(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn store(&mut self, key: &str, value: &str) -> Result<()> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// The user's selected press color, persisted as bare `rrggbb`
pub struct ColorPreference {
    store: Box<dyn PreferenceStore>,
    hex: String,
}

impl ColorPreference {
    /// Read the stored color, generating and persisting a random one when
    /// missing or unreadable.
    pub fn load_or_init(mut store: Box<dyn PreferenceStore>) -> Self {
        let hex = match store.load(USER_HEX_KEY).as_deref().and_then(normalize_hex) {
            Some(hex) => hex,
            None => {
                let hex = Color::random().to_hex();
                debug!(%hex, "generated color preference");
                if let Err(e) = store.store(USER_HEX_KEY, &hex) {
                    warn!(error = %e, "could not persist color preference");
                }
                hex
            }
        };
        Self { store, hex }
    }

    pub fn hex(&self) -> &str {
        &self.hex
    }

    /// Accepts `#rrggbb` or `rrggbb`.
    pub fn set(&mut self, hex: &str) -> Result<()> {
        let hex = normalize_hex(hex).ok_or_else(|| Error::Storage(format!("not a color: {hex:?}")))?;
        if hex == self.hex {
            return Ok(());
        }
        self.store.store(USER_HEX_KEY, &hex)?;
        self.hex = hex;
        Ok(())
    }

    pub fn cursor_path(&self) -> String {
        format!("/cursor/{}/cursor.png", self.hex)
    }
}
