//! One question/answer cycle against the assistant backend.
//!
//! The in-flight guard is keyed by chat id: each chat allows one pending
//! request, and different chats may be waiting at the same time.

use crate::api::{AnswerSource, AskError, AskRequest};
use crate::db::models::{Language, Message, Settings};
use crate::i18n;
use crate::knowledge::KnowledgeBase;
use crate::session::ChatSession;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// Nothing but whitespace was submitted.
    Empty,
    /// A request for this chat is still pending.
    Busy,
    UnknownChat,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    Rejected(Rejection),
    Answered(Message),
    /// The assistant turn carries the failure text, which is also the chat's error.
    Failed { reply: Message, error: String },
}

impl SendOutcome {
    pub fn reply(&self) -> Option<&Message> {
        match self {
            SendOutcome::Rejected(_) => None,
            SendOutcome::Answered(reply) | SendOutcome::Failed { reply, .. } => Some(reply),
        }
    }
}

#[derive(Debug, Default)]
struct RequestState {
    draft: String,
    loading: bool,
    error: Option<String>,
}

type States = Mutex<HashMap<String, RequestState>>;

/// Lowers the loading flag however the send ends.
struct LoadingGuard<'a> {
    states: &'a States,
    chat_id: &'a str,
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        if let Some(state) = self.states.lock().get_mut(self.chat_id) {
            state.loading = false;
        }
    }
}

pub struct ChatDispatcher {
    source: Arc<dyn AnswerSource>,
    knowledge: Option<Arc<KnowledgeBase>>,
    session: Arc<Mutex<ChatSession>>,
    states: States,
}

impl ChatDispatcher {
    pub fn new(
        source: Arc<dyn AnswerSource>,
        knowledge: Option<Arc<KnowledgeBase>>,
        session: Arc<Mutex<ChatSession>>,
    ) -> Self {
        Self {
            source,
            knowledge,
            session,
            states: Mutex::new(HashMap::new()),
        }
    }

    pub fn set_input(&self, chat_id: &str, text: &str) {
        self.states.lock().entry(chat_id.to_string()).or_default().draft = text.to_string();
    }

    pub fn input(&self, chat_id: &str) -> String {
        self.states
            .lock()
            .get(chat_id)
            .map(|s| s.draft.clone())
            .unwrap_or_default()
    }

    pub fn is_loading(&self, chat_id: &str) -> bool {
        self.states.lock().get(chat_id).is_some_and(|s| s.loading)
    }

    pub fn is_any_loading(&self) -> bool {
        self.states.lock().values().any(|s| s.loading)
    }

    pub fn error(&self, chat_id: &str) -> Option<String> {
        self.states.lock().get(chat_id).and_then(|s| s.error.clone())
    }

    pub fn dismiss_error(&self, chat_id: &str) {
        if let Some(state) = self.states.lock().get_mut(chat_id) {
            state.error = None;
        }
    }

    /// Drop the draft and error of a chat; an in-flight request keeps its flag.
    pub fn reset(&self, chat_id: &str) {
        let mut states = self.states.lock();
        match states.get_mut(chat_id) {
            Some(state) if state.loading => {
                state.draft.clear();
                state.error = None;
            }
            Some(_) => {
                states.remove(chat_id);
            }
            None => {}
        }
    }

    /// Send the chat's current draft.
    pub async fn submit(&self, chat_id: &str, settings: &Settings) -> SendOutcome {
        let text = self.input(chat_id);
        self.send_message(chat_id, &text, settings).await
    }

    pub async fn send_message(
        &self,
        chat_id: &str,
        text: &str,
        settings: &Settings,
    ) -> SendOutcome {
        let question = text.trim();
        if question.is_empty() {
            return SendOutcome::Rejected(Rejection::Empty);
        }

        {
            let mut states = self.states.lock();
            let state = states.entry(chat_id.to_string()).or_default();
            if state.loading {
                debug!(chat_id, "Send rejected, request already in flight");
                return SendOutcome::Rejected(Rejection::Busy);
            }
            state.loading = true;
            state.error = None;
        }
        let loading = LoadingGuard {
            states: &self.states,
            chat_id,
        };

        if !self.session.lock().append_message(chat_id, Message::user(question)) {
            drop(loading);
            self.states.lock().remove(chat_id);
            return SendOutcome::Rejected(Rejection::UnknownChat);
        }
        if let Some(state) = self.states.lock().get_mut(chat_id) {
            state.draft.clear();
        }

        let request = AskRequest {
            question: self.build_question(question, settings.language).await,
            api_key: settings.api_key().map(str::to_string),
        };
        info!(chat_id, chars = question.chars().count(), "Sending question");

        let strings = i18n::strings(settings.language);
        let (content, error) = match self.source.ask(&request).await {
            Ok(reply) => (reply.answer().unwrap_or(strings.no_answer).to_string(), None),
            Err(e) => {
                warn!(chat_id, error = %e, "Question failed");
                let text = match e {
                    AskError::Status {
                        answer: Some(answer),
                        ..
                    } => answer,
                    AskError::Status { answer: None, .. } | AskError::InvalidBody { .. } => {
                        strings.server_error.to_string()
                    }
                    AskError::Timeout => strings.timeout.to_string(),
                    AskError::Connect(_) | AskError::Build(_) => strings.no_connection.to_string(),
                };
                (text.clone(), Some(text))
            }
        };

        let reply = Message::assistant(content);
        let kept = {
            let mut session = self.session.lock();
            let kept = session.append_message(chat_id, reply.clone());
            if kept {
                session.complete_title(chat_id);
            }
            kept
        };
        if !kept {
            // The chat is gone; forget its request state once the guard lowers loading.
            drop(loading);
            self.states.lock().remove(chat_id);
        }

        match error {
            None => SendOutcome::Answered(reply),
            Some(error) => {
                if kept {
                    if let Some(state) = self.states.lock().get_mut(chat_id) {
                        state.error = Some(error.clone());
                    }
                }
                SendOutcome::Failed { reply, error }
            }
        }
    }

    async fn build_question(&self, question: &str, language: Language) -> String {
        let Some(knowledge) = &self.knowledge else {
            return question.to_string();
        };
        match knowledge.context_for(question, language).await {
            Ok(context) => i18n::with_context(language, &context, question),
            Err(e) => {
                warn!(error = %e, "Knowledge lookup failed, asking without context");
                question.to_string()
            }
        }
    }
}
