use crate::db::models::{Chat, Message};
use crate::dispatcher::SendOutcome;
use crate::state::AppState;
use serde::Serialize;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ChatSummary {
    pub id: String,
    pub title: String,
    pub message_count: usize,
    pub active: bool,
}

pub fn list_chats(state: &AppState) -> Vec<ChatSummary> {
    let session = state.session.lock();
    let active = session.active_id();
    session
        .chats()
        .iter()
        .map(|c| ChatSummary {
            id: c.id.clone(),
            title: c.title.clone(),
            message_count: c.messages.len(),
            active: active == Some(c.id.as_str()),
        })
        .collect()
}

pub fn active_chat(state: &AppState) -> Option<Chat> {
    state.session.lock().active_chat().cloned()
}

pub fn new_chat(state: &AppState) -> String {
    let id = state.session.lock().create_chat();
    state.dispatcher.reset(&id);
    id
}

pub fn select_chat(state: &AppState, id: &str) -> Result<(), String> {
    state.session.lock().select_chat(id).map_err(|e| e.to_string())
}

pub fn clear_chat(state: &AppState, id: &str) -> Result<(), String> {
    state.session.lock().clear_chat(id).map_err(|e| e.to_string())?;
    state.dispatcher.dismiss_error(id);
    Ok(())
}

pub fn delete_chat(state: &AppState, id: &str) -> Result<(), String> {
    state.session.lock().delete_chat(id).map_err(|e| e.to_string())?;
    state.dispatcher.reset(id);
    Ok(())
}

pub fn rename_chat(state: &AppState, id: &str, title: &str) -> Result<(), String> {
    let title = title.trim();
    if title.is_empty() {
        return Err("Title cannot be empty".into());
    }
    state
        .session
        .lock()
        .rename_chat(id, title)
        .map_err(|e| e.to_string())
}

pub fn get_messages(state: &AppState, chat_id: &str) -> Result<Vec<Message>, String> {
    state
        .session
        .lock()
        .chat(chat_id)
        .map(|c| c.messages.clone())
        .ok_or_else(|| format!("Unknown chat: {}", chat_id))
}

fn require_active(state: &AppState) -> Result<String, String> {
    state
        .session
        .lock()
        .active_id()
        .map(str::to_string)
        .ok_or_else(|| "No active chat, create one first".to_string())
}

pub fn set_input(state: &AppState, text: &str) -> Result<(), String> {
    let id = require_active(state)?;
    state.dispatcher.set_input(&id, text);
    Ok(())
}

/// Send `content` to the active chat.
pub async fn send_message(state: &AppState, content: &str) -> Result<SendOutcome, String> {
    let id = require_active(state)?;
    let settings = state.settings();
    Ok(state.dispatcher.send_message(&id, content, &settings).await)
}

/// Send the active chat's draft input.
pub async fn submit(state: &AppState) -> Result<SendOutcome, String> {
    let id = require_active(state)?;
    let settings = state.settings();
    Ok(state.dispatcher.submit(&id, &settings).await)
}
