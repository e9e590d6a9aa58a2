use crate::knowledge::{KnowledgeBase, ObjectEntry, SearchHit};
use crate::state::AppState;
use std::sync::Arc;

fn knowledge(state: &AppState) -> Result<Arc<KnowledgeBase>, String> {
    state
        .knowledge
        .clone()
        .ok_or_else(|| "Knowledge base not configured".to_string())
}

pub async fn list_documents(state: &AppState) -> Result<Vec<ObjectEntry>, String> {
    knowledge(state)?
        .list_files()
        .await
        .map_err(|e| e.to_string())
}

/// Search knowledge files for a query
pub async fn search_knowledge_base(
    state: &AppState,
    query: &str,
) -> Result<Vec<SearchHit>, String> {
    knowledge(state)?
        .search_in_files(query)
        .await
        .map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{AnswerSource, AskError, AskReply, AskRequest};
    use crate::db::MemoryStorage;
    use crate::knowledge::tests::FakeStore;
    use crate::session::EmptyPolicy;
    use async_trait::async_trait;

    struct Silent;

    #[async_trait]
    impl AnswerSource for Silent {
        async fn ask(&self, _request: &AskRequest) -> Result<AskReply, AskError> {
            Ok(AskReply::default())
        }
    }

    fn state(knowledge: Option<Arc<KnowledgeBase>>) -> AppState {
        AppState::new(
            Arc::new(MemoryStorage::new()),
            Arc::new(Silent),
            knowledge,
            EmptyPolicy::Recreate,
        )
    }

    #[tokio::test]
    async fn test_unconfigured_knowledge_is_error() {
        let app = state(None);
        assert!(list_documents(&app).await.is_err());
        assert!(search_knowledge_base(&app, "x").await.is_err());
    }

    #[tokio::test]
    async fn test_list_and_search() {
        let store = FakeStore::with_files(&[("grants.txt", "Grant deadline: August 20")]);
        let app = state(Some(Arc::new(KnowledgeBase::new(Arc::new(store), 4))));

        let docs = list_documents(&app).await.unwrap();
        assert_eq!(docs.len(), 1);
        let hits = search_knowledge_base(&app, "DEADLINE").await.unwrap();
        assert_eq!(hits[0].file_name, "grants.txt");
    }
}
