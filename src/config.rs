use crate::api::client::AskConfig;
use crate::knowledge::supabase::{SupabaseConfig, DEFAULT_BUCKET};
use crate::session::EmptyPolicy;
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

const DEFAULT_API_BASE: &str = "http://localhost:8000";
const DEFAULT_CACHE_FILES: usize = 64;

#[derive(Debug, Clone, PartialEq)]
pub enum KnowledgeSource {
    None,
    LocalDir(PathBuf),
    Supabase { url: String, anon_key: String, bucket: String },
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api_base: String,
    pub data_dir: PathBuf,
    pub request_timeout: Option<Duration>,
    pub empty_policy: EmptyPolicy,
    pub knowledge: KnowledgeSource,
    pub knowledge_cache_files: usize,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any variable lookup; unset or blank values take defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let api_base = get("TOU_API_BASE").unwrap_or_else(|| DEFAULT_API_BASE.to_string());
        let data_dir = get("TOU_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(default_data_dir);
        let request_timeout =
            get("TOU_REQUEST_TIMEOUT_SECS").and_then(|v| match v.trim().parse::<u64>() {
                Ok(secs) => Some(Duration::from_secs(secs)),
                Err(_) => {
                    warn!(value = %v, "Ignoring invalid TOU_REQUEST_TIMEOUT_SECS");
                    None
                }
            });
        let empty_policy = get("TOU_EMPTY_POLICY")
            .and_then(|v| match v.parse::<EmptyPolicy>() {
                Ok(policy) => Some(policy),
                Err(e) => {
                    warn!(error = %e, "Ignoring TOU_EMPTY_POLICY");
                    None
                }
            })
            .unwrap_or_default();

        let knowledge = match (
            get("TOU_KNOWLEDGE_DIR"),
            get("SUPABASE_URL"),
            get("SUPABASE_ANON_KEY"),
        ) {
            (Some(dir), _, _) => KnowledgeSource::LocalDir(PathBuf::from(dir)),
            (None, Some(url), Some(anon_key)) => KnowledgeSource::Supabase {
                url,
                anon_key,
                bucket: get("TOU_KNOWLEDGE_BUCKET").unwrap_or_else(|| DEFAULT_BUCKET.to_string()),
            },
            _ => KnowledgeSource::None,
        };
        let knowledge_cache_files = get("TOU_KNOWLEDGE_CACHE")
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(DEFAULT_CACHE_FILES);

        Self {
            api_base,
            data_dir,
            request_timeout,
            empty_policy,
            knowledge,
            knowledge_cache_files,
        }
    }

    pub fn ask_config(&self) -> AskConfig {
        AskConfig {
            base_url: self.api_base.clone(),
            timeout: self.request_timeout,
        }
    }

    pub fn supabase_config(&self) -> Option<SupabaseConfig> {
        match &self.knowledge {
            KnowledgeSource::Supabase { url, anon_key, bucket } => Some(SupabaseConfig {
                url: url.clone(),
                anon_key: anon_key.clone(),
                bucket: bucket.clone(),
            }),
            _ => None,
        }
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tou-chat")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> AppConfig {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config(&[]);
        assert_eq!(config.api_base, "http://localhost:8000");
        assert_eq!(config.request_timeout, None);
        assert_eq!(config.empty_policy, EmptyPolicy::Recreate);
        assert_eq!(config.knowledge, KnowledgeSource::None);
        assert_eq!(config.knowledge_cache_files, 64);
        assert!(config.data_dir.ends_with("tou-chat"));
    }

    #[test]
    fn test_overrides() {
        let config = config(&[
            ("TOU_API_BASE", "https://tou.example.kz"),
            ("TOU_DATA_DIR", "/tmp/tou"),
            ("TOU_REQUEST_TIMEOUT_SECS", "30"),
            ("TOU_EMPTY_POLICY", "allow-empty"),
            ("SUPABASE_URL", "https://abc.supabase.co"),
            ("SUPABASE_ANON_KEY", "anon"),
        ]);
        assert_eq!(config.ask_config().base_url, "https://tou.example.kz");
        assert_eq!(config.data_dir, PathBuf::from("/tmp/tou"));
        assert_eq!(config.request_timeout, Some(Duration::from_secs(30)));
        assert_eq!(config.empty_policy, EmptyPolicy::AllowEmpty);
        let supabase = config.supabase_config().unwrap();
        assert_eq!(supabase.bucket, "ai-knowledge");
    }

    #[test]
    fn test_local_dir_wins_and_bad_values_fall_back() {
        let config = config(&[
            ("TOU_KNOWLEDGE_DIR", "/srv/knowledge"),
            ("SUPABASE_URL", "https://abc.supabase.co"),
            ("SUPABASE_ANON_KEY", "anon"),
            ("TOU_REQUEST_TIMEOUT_SECS", "soon"),
            ("TOU_EMPTY_POLICY", "sometimes"),
            ("TOU_API_BASE", "  "),
        ]);
        assert_eq!(config.knowledge, KnowledgeSource::LocalDir("/srv/knowledge".into()));
        assert_eq!(config.request_timeout, None);
        assert_eq!(config.empty_policy, EmptyPolicy::Recreate);
        assert_eq!(config.api_base, "http://localhost:8000");
    }
}
