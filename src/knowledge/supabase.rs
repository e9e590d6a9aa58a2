use super::{BlobStore, KnowledgeError, ObjectEntry};
use crate::doc_processor;
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};

pub const DEFAULT_BUCKET: &str = "ai-knowledge";
const LIST_LIMIT: u32 = 100;

#[derive(Debug, Clone)]
pub struct SupabaseConfig {
    pub url: String,
    pub anon_key: String,
    pub bucket: String,
}

#[derive(Serialize)]
struct ListRequest<'a> {
    prefix: &'a str,
    limit: u32,
}

#[derive(Deserialize)]
struct StorageObject {
    name: String,
    // Folders come back with a null id.
    id: Option<String>,
    created_at: Option<String>,
}

/// Supabase Storage bucket, read through its REST API.
pub struct SupabaseStorage {
    client: Client,
    config: SupabaseConfig,
}

impl SupabaseStorage {
    pub fn new(config: SupabaseConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    /// `<url>/storage/v1/object/<segments..>`, each segment percent-encoded.
    fn object_url(&self, segments: &[&str]) -> Result<Url, KnowledgeError> {
        let invalid = || KnowledgeError::InvalidUrl(self.config.url.clone());
        let mut url = Url::parse(&self.config.url).map_err(|_| invalid())?;
        url.path_segments_mut()
            .map_err(|_| invalid())?
            .pop_if_empty()
            .extend(["storage", "v1", "object"])
            .extend(segments);
        Ok(url)
    }

    fn authorized(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        req.header("apikey", &self.config.anon_key)
            .header("Authorization", format!("Bearer {}", self.config.anon_key))
    }
}

async fn check(resp: reqwest::Response) -> Result<reqwest::Response, KnowledgeError> {
    if resp.status().is_success() {
        return Ok(resp);
    }
    let status = resp.status().as_u16();
    let message = resp.text().await.unwrap_or_default();
    Err(KnowledgeError::Api { status, message })
}

#[async_trait]
impl BlobStore for SupabaseStorage {
    async fn list(&self) -> Result<Vec<ObjectEntry>, KnowledgeError> {
        let req = self
            .client
            .post(self.object_url(&["list", self.config.bucket.as_str()])?)
            .json(&ListRequest {
                prefix: "",
                limit: LIST_LIMIT,
            });
        let resp = check(self.authorized(req).send().await?).await?;
        let objects: Vec<StorageObject> = resp.json().await?;

        Ok(objects
            .into_iter()
            .filter(|o| o.id.is_some() && !o.name.starts_with('.'))
            .map(|o| ObjectEntry {
                name: o.name,
                created_at: o.created_at,
            })
            .collect())
    }

    async fn download(&self, name: &str) -> Result<String, KnowledgeError> {
        let req = self
            .client
            .get(self.object_url(&[self.config.bucket.as_str(), name])?);
        let resp = check(self.authorized(req).send().await?).await?;
        let bytes = resp.bytes().await?;
        Ok(doc_processor::decode(name, &bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn storage(server: &MockServer) -> SupabaseStorage {
        SupabaseStorage::new(SupabaseConfig {
            url: server.uri(),
            anon_key: "anon".into(),
            bucket: DEFAULT_BUCKET.into(),
        })
    }

    #[tokio::test]
    async fn test_list_skips_folders_and_placeholders() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/storage/v1/object/list/ai-knowledge"))
            .and(header("apikey", "anon"))
            .and(header("Authorization", "Bearer anon"))
            .and(body_json(json!({"prefix": "", "limit": 100})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"name": "rules.txt", "id": "1", "created_at": "2024-09-01T10:00:00Z"},
                {"name": "archive", "id": null, "created_at": null},
                {"name": ".emptyFolderPlaceholder", "id": "2", "created_at": null}
            ])))
            .mount(&server)
            .await;

        let files = storage(&server).list().await.unwrap();
        assert_eq!(
            files,
            vec![ObjectEntry {
                name: "rules.txt".into(),
                created_at: Some("2024-09-01T10:00:00Z".into()),
            }]
        );
    }

    #[tokio::test]
    async fn test_download_text() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/storage/v1/object/ai-knowledge/rules.txt"))
            .respond_with(ResponseTemplate::new(200).set_body_string("Quiet hours start at 23:00"))
            .mount(&server)
            .await;

        let text = storage(&server).download("rules.txt").await.unwrap();
        assert_eq!(text, "Quiet hours start at 23:00");
    }

    #[tokio::test]
    async fn test_download_encodes_object_name() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/storage/v1/object/ai-knowledge/faq%232%3F.txt"))
            .respond_with(ResponseTemplate::new(200).set_body_string("Second FAQ"))
            .expect(1)
            .mount(&server)
            .await;

        let text = storage(&server).download("faq#2?.txt").await.unwrap();
        assert_eq!(text, "Second FAQ");
    }

    #[test]
    fn test_object_url_keeps_base_path() {
        let storage = SupabaseStorage::new(SupabaseConfig {
            url: "https://abc.supabase.co/".into(),
            anon_key: "anon".into(),
            bucket: "docs".into(),
        });
        let url = storage.object_url(&["docs", "a b.txt"]).unwrap();
        assert_eq!(url.as_str(), "https://abc.supabase.co/storage/v1/object/docs/a%20b.txt");

        let broken = SupabaseStorage::new(SupabaseConfig {
            url: "not a url".into(),
            ..storage.config.clone()
        });
        assert!(matches!(broken.object_url(&["x"]), Err(KnowledgeError::InvalidUrl(_))));
    }

    #[tokio::test]
    async fn test_download_missing_is_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404).set_body_string("Object not found"))
            .mount(&server)
            .await;

        let err = storage(&server).download("nope.txt").await.unwrap_err();
        assert!(matches!(err, KnowledgeError::Api { status: 404, .. }));
    }
}
