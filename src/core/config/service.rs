use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::{Map, Value};

use super::paths::AppPaths;
use super::settings::Settings;
use super::validation::validate_config;
use crate::core::errors::ApiError;

const REDACT_PLACEHOLDER: &str = "****";

const SENSITIVE_PATTERNS: [&str; 8] = [
    "api_key",
    "secret",
    "password",
    "_token",
    "token_",
    "credential",
    "private_key",
    "bearer",
];

const SENSITIVE_WHITELIST: [&str; 3] = ["max_tokens", "tokens", "token_count"];

#[derive(Clone)]
pub struct ConfigService {
    paths: Arc<AppPaths>,
}

impl ConfigService {
    pub fn new(paths: Arc<AppPaths>) -> Self {
        Self { paths }
    }

    pub fn paths(&self) -> Arc<AppPaths> {
        self.paths.clone()
    }

    pub fn config_path(&self) -> PathBuf {
        if let Ok(path) = env::var("COURSE_RAG_CONFIG_PATH") {
            return PathBuf::from(path);
        }

        let user_config = self.paths.user_data_dir.join("config.yml");
        if user_config.exists() {
            return user_config;
        }

        self.paths.project_root.join("config.yml")
    }

    pub fn secrets_path(&self) -> PathBuf {
        self.paths.secrets_path.clone()
    }

    /// Public config deep-merged with secrets and environment overrides.
    pub fn load_config(&self) -> Value {
        let public_config = load_yaml_file(&self.config_path());
        let secrets_config = load_yaml_file(&self.secrets_path());
        let mut merged = deep_merge(&public_config, &secrets_config);
        apply_env_overrides(&mut merged);
        merged
    }

    pub fn load_settings(&self) -> Result<Settings, ApiError> {
        settings_from_value(&self.load_config())
    }

    pub fn redact_sensitive_values(&self, value: &Value) -> Value {
        redact_sensitive_values(value)
    }
}

pub fn settings_from_value(config: &Value) -> Result<Settings, ApiError> {
    validate_config(config)?;
    serde_json::from_value(config.clone())
        .map_err(|e| ApiError::BadRequest(format!("Invalid config: {}", e)))
}

fn load_yaml_file(path: &Path) -> Value {
    if !path.exists() {
        return Value::Object(Map::new());
    }

    match fs::read_to_string(path) {
        Ok(contents) => match serde_yaml::from_str::<Value>(&contents) {
            Ok(value @ Value::Object(_)) => value,
            Ok(_) => Value::Object(Map::new()),
            Err(err) => {
                tracing::warn!("Ignoring unparsable config file {}: {}", path.display(), err);
                Value::Object(Map::new())
            }
        },
        Err(_) => Value::Object(Map::new()),
    }
}

fn apply_env_overrides(config: &mut Value) {
    if let Ok(key) = env::var("ANTHROPIC_API_KEY") {
        if !key.trim().is_empty() {
            ensure_object_path(config, &["llm", "api_key"], Value::String(key));
        }
    }
}

fn ensure_object_path(config: &mut Value, path: &[&str], value: Value) {
    if path.is_empty() {
        return;
    }

    let mut current = config;
    for (index, key) in path.iter().enumerate() {
        if index == path.len() - 1 {
            if let Some(map) = current.as_object_mut() {
                map.insert(key.to_string(), value);
            }
            return;
        }

        if !current.get(*key).map(|v| v.is_object()).unwrap_or(false) {
            let Some(map) = current.as_object_mut() else {
                return;
            };
            map.insert((*key).to_string(), Value::Object(Map::new()));
        }

        let Some(next) = current.get_mut(*key) else {
            return;
        };
        current = next;
    }
}

fn deep_merge(base: &Value, override_value: &Value) -> Value {
    match (base, override_value) {
        (Value::Object(base_map), Value::Object(override_map)) => {
            let mut merged: Map<String, Value> = base_map.clone();
            for (key, value) in override_map {
                let merged_value = match merged.get(key) {
                    Some(existing) => deep_merge(existing, value),
                    None => value.clone(),
                };
                merged.insert(key.clone(), merged_value);
            }
            Value::Object(merged)
        }
        _ => override_value.clone(),
    }
}

fn redact_sensitive_values(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut redacted = Map::new();
            for (key, val) in map {
                if is_sensitive_key(key) && !val.is_null() {
                    redacted.insert(key.clone(), Value::String(REDACT_PLACEHOLDER.to_string()));
                } else {
                    redacted.insert(key.clone(), redact_sensitive_values(val));
                }
            }
            Value::Object(redacted)
        }
        Value::Array(items) => Value::Array(items.iter().map(redact_sensitive_values).collect()),
        _ => value.clone(),
    }
}

fn is_sensitive_key(key: &str) -> bool {
    let key_lower = key.to_lowercase();
    if SENSITIVE_WHITELIST
        .iter()
        .any(|allowed| *allowed == key_lower)
    {
        return false;
    }
    SENSITIVE_PATTERNS
        .iter()
        .any(|pattern| key_lower.contains(pattern))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn deep_merge_merges_objects_and_overrides_scalars() {
        let base = json!({
            "llm": { "model": "a", "max_tokens": 800 },
            "search": { "max_results": 5 }
        });
        let secrets = json!({
            "llm": { "api_key": "sk-test" },
            "search": { "max_results": 3 }
        });

        let merged = deep_merge(&base, &secrets);

        assert_eq!(
            merged,
            json!({
                "llm": { "model": "a", "max_tokens": 800, "api_key": "sk-test" },
                "search": { "max_results": 3 }
            })
        );
    }

    #[test]
    fn redact_sensitive_values_replaces_secrets_only() {
        let input = json!({
            "llm": { "api_key": "sk-live", "max_tokens": 800 },
            "embedding": { "model": "all-MiniLM-L6-v2" }
        });

        let redacted = redact_sensitive_values(&input);

        assert_eq!(
            redacted,
            json!({
                "llm": { "api_key": "****", "max_tokens": 800 },
                "embedding": { "model": "all-MiniLM-L6-v2" }
            })
        );
    }

    #[test]
    fn ensure_object_path_creates_missing_sections() {
        let mut config = json!({ "search": { "max_results": 5 } });
        ensure_object_path(&mut config, &["llm", "api_key"], json!("k"));
        assert_eq!(config["llm"]["api_key"], "k");
        assert_eq!(config["search"]["max_results"], 5);
    }

    #[test]
    fn load_config_reads_yaml_and_secrets() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = Arc::new(AppPaths::with_dirs(
            tmp.path().to_path_buf(),
            tmp.path().join("data"),
        ));
        fs::write(
            tmp.path().join("config.yml"),
            "llm:\n  model: custom-model\ndocuments:\n  chunk_size: 400\n  chunk_overlap: 40\n",
        )
        .unwrap();
        fs::write(&paths.secrets_path, "llm:\n  api_key: from-secrets\n").unwrap();

        let service = ConfigService::new(paths);
        let config = service.load_config();
        assert_eq!(config["llm"]["model"], "custom-model");
        assert!(config["llm"]["api_key"].is_string());

        let settings = settings_from_value(&config).unwrap();
        assert_eq!(settings.documents.chunk_size, 400);
        assert_eq!(settings.documents.chunk_overlap, 40);
        assert_eq!(settings.search.max_results, 5);
    }

    #[test]
    fn settings_from_value_rejects_invalid_chunking() {
        let err = settings_from_value(&json!({
            "documents": { "chunk_size": 50, "chunk_overlap": 80 }
        }))
        .unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }
}
