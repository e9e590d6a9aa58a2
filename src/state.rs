use crate::api::AnswerSource;
use crate::config::{AppConfig, KnowledgeSource};
use crate::db::models::Settings;
use crate::db::{Database, LocalStorage, MemoryStorage};
use crate::dispatcher::ChatDispatcher;
use crate::knowledge::{BlobStore, KnowledgeBase, LocalDirStore, SupabaseStorage};
use crate::persistence::SettingsStore;
use crate::session::{ChatSession, EmptyPolicy};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{info, warn};

/// Everything the command handlers work on.
pub struct AppState {
    pub storage: Arc<dyn LocalStorage>,
    pub session: Arc<Mutex<ChatSession>>,
    pub dispatcher: Arc<ChatDispatcher>,
    pub settings: Mutex<Settings>,
    pub knowledge: Option<Arc<KnowledgeBase>>,
}

impl AppState {
    pub fn new(
        storage: Arc<dyn LocalStorage>,
        source: Arc<dyn AnswerSource>,
        knowledge: Option<Arc<KnowledgeBase>>,
        policy: EmptyPolicy,
    ) -> Self {
        let settings = SettingsStore::load(storage.as_ref());
        let session = Arc::new(Mutex::new(ChatSession::restore(storage.clone(), policy)));
        let dispatcher = Arc::new(ChatDispatcher::new(
            source,
            knowledge.clone(),
            session.clone(),
        ));
        Self {
            storage,
            session,
            dispatcher,
            settings: Mutex::new(settings),
            knowledge,
        }
    }

    pub fn from_config(config: &AppConfig, source: Arc<dyn AnswerSource>) -> Self {
        let storage: Arc<dyn LocalStorage> = match Database::new(&config.data_dir) {
            Ok(db) => {
                info!(dir = %config.data_dir.display(), "Local storage opened");
                Arc::new(db)
            }
            Err(e) => {
                warn!(error = %e, "Local storage unavailable, history will not survive restart");
                Arc::new(MemoryStorage::new())
            }
        };

        let store: Option<Arc<dyn BlobStore>> = match &config.knowledge {
            KnowledgeSource::None => None,
            KnowledgeSource::LocalDir(dir) => Some(Arc::new(LocalDirStore::new(dir.clone()))),
            KnowledgeSource::Supabase { .. } => config
                .supabase_config()
                .map(|c| Arc::new(SupabaseStorage::new(c)) as Arc<dyn BlobStore>),
        };
        let knowledge =
            store.map(|store| Arc::new(KnowledgeBase::new(store, config.knowledge_cache_files)));

        Self::new(storage, source, knowledge, config.empty_policy)
    }

    pub fn settings(&self) -> Settings {
        self.settings.lock().clone()
    }
}
