//! Typed load/save of chat history and settings over [`LocalStorage`].
//!
//! Nothing here returns an error to the caller: a missing, corrupt or
//! unreadable entry decodes to its default, and a failed write is logged and
//! dropped. The in-memory state stays authoritative for the session.

use crate::db::models::{Chat, Language, Settings, Theme};
use crate::db::{LocalStorage, StorageError};
use tracing::{debug, warn};

pub const CHATS_KEY: &str = "tou-chats";
pub const API_KEY_KEY: &str = "gemini-api-key";
pub const THEME_KEY: &str = "theme";
pub const LANGUAGE_KEY: &str = "language";

pub struct ChatHistory;

impl ChatHistory {
    /// Stored chats, or a single fresh chat when nothing usable is stored.
    pub fn load(storage: &dyn LocalStorage) -> Vec<Chat> {
        match Self::decode(storage) {
            Ok(Some(chats)) if !chats.is_empty() => chats,
            Ok(_) => vec![Chat::new()],
            Err(e) => {
                warn!(error = %e, "Stored chat history unreadable, starting fresh");
                vec![Chat::new()]
            }
        }
    }

    fn decode(storage: &dyn LocalStorage) -> Result<Option<Vec<Chat>>, StorageError> {
        let Some(raw) = storage.get_item(CHATS_KEY)? else {
            return Ok(None);
        };
        let chats: Vec<Chat> = serde_json::from_str(&raw)?;
        Ok(Some(chats))
    }

    pub fn save(storage: &dyn LocalStorage, chats: &[Chat]) {
        if let Err(e) = Self::encode(storage, chats) {
            warn!(error = %e, "Failed to persist chat history");
        }
    }

    fn encode(storage: &dyn LocalStorage, chats: &[Chat]) -> Result<(), StorageError> {
        let json = serde_json::to_string(chats)?;
        storage.set_item(CHATS_KEY, &json)?;
        debug!(chats = chats.len(), bytes = json.len(), "Chat history saved");
        Ok(())
    }
}

pub struct SettingsStore;

impl SettingsStore {
    pub fn load(storage: &dyn LocalStorage) -> Settings {
        let api_key = read(storage, API_KEY_KEY).unwrap_or_default();
        let theme = read(storage, THEME_KEY)
            .and_then(|v| v.parse::<Theme>().ok())
            .unwrap_or_default();
        let language = read(storage, LANGUAGE_KEY)
            .and_then(|v| v.parse::<Language>().ok())
            .unwrap_or_default();
        Settings {
            api_key,
            theme,
            language,
        }
    }

    pub fn save_api_key(storage: &dyn LocalStorage, api_key: &str) {
        write(storage, API_KEY_KEY, api_key);
    }

    pub fn clear_api_key(storage: &dyn LocalStorage) {
        if let Err(e) = storage.remove_item(API_KEY_KEY) {
            warn!(key = API_KEY_KEY, error = %e, "Failed to remove setting");
        }
    }

    pub fn save_theme(storage: &dyn LocalStorage, theme: Theme) {
        write(storage, THEME_KEY, theme.as_str());
    }

    pub fn save_language(storage: &dyn LocalStorage, language: Language) {
        write(storage, LANGUAGE_KEY, language.as_str());
    }
}

fn read(storage: &dyn LocalStorage, key: &str) -> Option<String> {
    match storage.get_item(key) {
        Ok(value) => value,
        Err(e) => {
            warn!(key, error = %e, "Failed to read setting");
            None
        }
    }
}

fn write(storage: &dyn LocalStorage, key: &str, value: &str) {
    if let Err(e) = storage.set_item(key, value) {
        warn!(key, error = %e, "Failed to persist setting");
    }
}
