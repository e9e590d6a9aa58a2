use crate::db::models::{derive_title, Chat, Message, DEFAULT_TITLE};
use crate::db::LocalStorage;
use crate::persistence::ChatHistory;
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;

/// What happens when the last remaining chat is deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmptyPolicy {
    /// Replace it with a fresh placeholder chat and activate that.
    #[default]
    Recreate,
    /// Leave the list empty with no active chat.
    AllowEmpty,
}

impl FromStr for EmptyPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "recreate" => Ok(EmptyPolicy::Recreate),
            "allow-empty" => Ok(EmptyPolicy::AllowEmpty),
            other => Err(format!("Unknown empty-chat policy: {}", other)),
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("Unknown chat: {0}")]
    UnknownChat(String),
}

/// All chats plus the active pointer. Every mutation is written through to storage.
pub struct ChatSession {
    chats: Vec<Chat>,
    active_id: Option<String>,
    policy: EmptyPolicy,
    storage: Arc<dyn LocalStorage>,
}

impl ChatSession {
    pub fn restore(storage: Arc<dyn LocalStorage>, policy: EmptyPolicy) -> Self {
        let chats = ChatHistory::load(storage.as_ref());
        let active_id = chats.first().map(|c| c.id.clone());
        debug!(chats = chats.len(), "Chat session restored");
        Self {
            chats,
            active_id,
            policy,
            storage,
        }
    }

    pub fn chats(&self) -> &[Chat] {
        &self.chats
    }

    pub fn chat(&self, id: &str) -> Option<&Chat> {
        self.chats.iter().find(|c| c.id == id)
    }

    pub fn active_id(&self) -> Option<&str> {
        self.active_id.as_deref()
    }

    pub fn active_chat(&self) -> Option<&Chat> {
        self.active_id.as_deref().and_then(|id| self.chat(id))
    }

    pub fn create_chat(&mut self) -> String {
        let chat = Chat::new();
        let id = chat.id.clone();
        self.chats.insert(0, chat);
        self.active_id = Some(id.clone());
        self.persist();
        id
    }

    pub fn select_chat(&mut self, id: &str) -> Result<(), SessionError> {
        if self.chat(id).is_none() {
            return Err(SessionError::UnknownChat(id.to_string()));
        }
        self.active_id = Some(id.to_string());
        Ok(())
    }

    pub fn clear_chat(&mut self, id: &str) -> Result<(), SessionError> {
        let chat = self.chat_mut(id)?;
        chat.messages.clear();
        chat.title = DEFAULT_TITLE.to_string();
        self.persist();
        Ok(())
    }

    pub fn rename_chat(&mut self, id: &str, title: &str) -> Result<(), SessionError> {
        self.chat_mut(id)?.title = title.to_string();
        self.persist();
        Ok(())
    }

    pub fn delete_chat(&mut self, id: &str) -> Result<(), SessionError> {
        let pos = self
            .chats
            .iter()
            .position(|c| c.id == id)
            .ok_or_else(|| SessionError::UnknownChat(id.to_string()))?;
        self.chats.remove(pos);

        if self.chats.is_empty() {
            match self.policy {
                EmptyPolicy::Recreate => {
                    let chat = Chat::new();
                    self.active_id = Some(chat.id.clone());
                    self.chats.push(chat);
                }
                EmptyPolicy::AllowEmpty => self.active_id = None,
            }
        } else if self.active_id.as_deref() == Some(id) {
            self.active_id = self.chats.first().map(|c| c.id.clone());
        }

        self.persist();
        Ok(())
    }

    /// Returns false when the chat is gone, e.g. deleted while a request was in flight.
    pub fn append_message(&mut self, chat_id: &str, message: Message) -> bool {
        let Some(chat) = self.chats.iter_mut().find(|c| c.id == chat_id) else {
            debug!(chat_id, "Dropping message for deleted chat");
            return false;
        };
        chat.messages.push(message);
        self.persist();
        true
    }

    /// Derive the title from the first user message while it is still the placeholder.
    pub fn complete_title(&mut self, chat_id: &str) {
        let Some(chat) = self.chats.iter_mut().find(|c| c.id == chat_id) else {
            return;
        };
        if !chat.has_default_title() {
            return;
        }
        let title = derive_title(&chat.messages);
        if title != chat.title {
            chat.title = title;
            self.persist();
        }
    }

    fn chat_mut(&mut self, id: &str) -> Result<&mut Chat, SessionError> {
        self.chats
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| SessionError::UnknownChat(id.to_string()))
    }

    fn persist(&self) {
        ChatHistory::save(self.storage.as_ref(), &self.chats);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStorage;

    fn session(policy: EmptyPolicy) -> (ChatSession, Arc<MemoryStorage>) {
        let storage = Arc::new(MemoryStorage::new());
        (ChatSession::restore(storage.clone(), policy), storage)
    }

    fn assert_active_valid(session: &ChatSession) {
        if !session.chats().is_empty() {
            let active = session.active_id().expect("active id must be set");
            assert!(session.chat(active).is_some());
        }
    }

    #[test]
    fn test_restore_starts_with_one_active_chat() {
        let (session, _) = session(EmptyPolicy::Recreate);
        assert_eq!(session.chats().len(), 1);
        assert_eq!(session.active_id(), Some(session.chats()[0].id.as_str()));
    }

    #[test]
    fn test_create_inserts_at_front_and_activates() {
        let (mut session, _) = session(EmptyPolicy::Recreate);
        let first = session.chats()[0].id.clone();
        let id = session.create_chat();
        assert_eq!(session.chats()[0].id, id);
        assert_eq!(session.chats()[1].id, first);
        assert_eq!(session.active_id(), Some(id.as_str()));
    }

    #[test]
    fn test_select_unknown_is_error_and_noop() {
        let (mut session, _) = session(EmptyPolicy::Recreate);
        let active = session.active_id().map(str::to_string);
        assert_eq!(
            session.select_chat("missing"),
            Err(SessionError::UnknownChat("missing".into()))
        );
        assert_eq!(session.active_id().map(str::to_string), active);
    }

    #[test]
    fn test_clear_resets_messages_and_title_only_for_target() {
        let (mut session, _) = session(EmptyPolicy::Recreate);
        let a = session.create_chat();
        let b = session.create_chat();
        for id in [&a, &b] {
            session.append_message(id, Message::user("Hello"));
            session.complete_title(id);
        }
        session.clear_chat(&a).unwrap();
        assert!(session.chat(&a).unwrap().messages.is_empty());
        assert_eq!(session.chat(&a).unwrap().title, DEFAULT_TITLE);
        assert_eq!(session.chat(&b).unwrap().messages.len(), 1);
        assert_eq!(session.chat(&b).unwrap().title, "Hello");
    }

    #[test]
    fn test_delete_active_activates_first_remaining() {
        let (mut session, _) = session(EmptyPolicy::Recreate);
        let second = session.chats()[0].id.clone();
        let first = session.create_chat();
        session.select_chat(&second).unwrap();

        session.delete_chat(&second).unwrap();
        assert_eq!(session.chats().len(), 1);
        assert_eq!(session.active_id(), Some(first.as_str()));
    }

    #[test]
    fn test_delete_inactive_keeps_active() {
        let (mut session, _) = session(EmptyPolicy::Recreate);
        let old = session.chats()[0].id.clone();
        let new = session.create_chat();
        session.delete_chat(&old).unwrap();
        assert_eq!(session.active_id(), Some(new.as_str()));
    }

    #[test]
    fn test_delete_last_recreates() {
        let (mut session, _) = session(EmptyPolicy::Recreate);
        let only = session.chats()[0].id.clone();
        session.delete_chat(&only).unwrap();
        assert_eq!(session.chats().len(), 1);
        let fresh = &session.chats()[0];
        assert_ne!(fresh.id, only);
        assert!(fresh.messages.is_empty());
        assert_eq!(session.active_id(), Some(fresh.id.as_str()));
    }

    #[test]
    fn test_delete_last_allow_empty() {
        let (mut session, _) = session(EmptyPolicy::AllowEmpty);
        let only = session.chats()[0].id.clone();
        session.delete_chat(&only).unwrap();
        assert!(session.chats().is_empty());
        assert_eq!(session.active_id(), None);

        let id = session.create_chat();
        assert_eq!(session.active_id(), Some(id.as_str()));
    }

    #[test]
    fn test_active_pointer_survives_create_delete_sequences() {
        for policy in [EmptyPolicy::Recreate, EmptyPolicy::AllowEmpty] {
            let (mut session, _) = session(policy);
            let mut ids = vec![session.chats()[0].id.clone()];
            for step in 0..24 {
                if step % 3 == 2 {
                    let victim = ids.remove(step % ids.len().max(1));
                    session.delete_chat(&victim).unwrap();
                    ids = session.chats().iter().map(|c| c.id.clone()).collect();
                } else {
                    ids.push(session.create_chat());
                }
                if ids.is_empty() {
                    ids.push(session.create_chat());
                }
                assert_active_valid(&session);
            }
            while let Some(id) = session.chats().first().map(|c| c.id.clone()) {
                session.delete_chat(&id).unwrap();
                assert_active_valid(&session);
                if policy == EmptyPolicy::Recreate {
                    break;
                }
            }
        }
    }

    #[test]
    fn test_append_to_deleted_chat_is_noop() {
        let (mut session, _) = session(EmptyPolicy::Recreate);
        let id = session.create_chat();
        session.delete_chat(&id).unwrap();
        assert!(!session.append_message(&id, Message::user("late")));
    }

    #[test]
    fn test_renamed_title_is_not_derived() {
        let (mut session, _) = session(EmptyPolicy::Recreate);
        let id = session.active_id().unwrap().to_string();
        session.rename_chat(&id, "Exams").unwrap();
        session.append_message(&id, Message::user("When is the exam?"));
        session.complete_title(&id);
        assert_eq!(session.chat(&id).unwrap().title, "Exams");
    }

    #[test]
    fn test_mutations_write_through() {
        let (mut session, storage) = session(EmptyPolicy::Recreate);
        let id = session.create_chat();
        session.append_message(&id, Message::user("Dormitory"));

        let reloaded = ChatSession::restore(storage, EmptyPolicy::Recreate);
        assert_eq!(reloaded.chats(), session.chats());
        assert_eq!(reloaded.active_id(), Some(id.as_str()));
    }
}
