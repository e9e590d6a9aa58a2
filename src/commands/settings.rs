use crate::db::models::{Language, Theme};
use crate::persistence::SettingsStore;
use crate::state::AppState;
use std::collections::HashMap;

/// Current settings for display, with the API key masked.
pub fn get_settings(state: &AppState) -> HashMap<String, String> {
    let settings = state.settings();
    let mut map = HashMap::new();
    if !settings.api_key.is_empty() {
        map.insert("api_key".to_string(), mask_api_key(&settings.api_key));
    }
    map.insert("theme".to_string(), settings.theme.to_string());
    map.insert("language".to_string(), settings.language.to_string());
    map
}

fn mask_api_key(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() > 8 {
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{}...{}", head, tail)
    } else {
        "*".repeat(chars.len())
    }
}

pub fn set_api_key(state: &AppState, value: &str) -> Result<(), String> {
    let value = value.trim();
    if value.is_empty() {
        return Err("API key cannot be empty".into());
    }
    state.settings.lock().api_key = value.to_string();
    SettingsStore::save_api_key(state.storage.as_ref(), value);
    Ok(())
}

pub fn clear_api_key(state: &AppState) {
    state.settings.lock().api_key.clear();
    SettingsStore::clear_api_key(state.storage.as_ref());
}

pub fn set_theme(state: &AppState, value: &str) -> Result<Theme, String> {
    let theme: Theme = value.parse()?;
    state.settings.lock().theme = theme;
    SettingsStore::save_theme(state.storage.as_ref(), theme);
    Ok(theme)
}

pub fn set_language(state: &AppState, value: &str) -> Result<Language, String> {
    let language: Language = value.parse()?;
    state.settings.lock().language = language;
    SettingsStore::save_language(state.storage.as_ref(), language);
    Ok(language)
}
