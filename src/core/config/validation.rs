use serde_json::{Map, Value};

use crate::core::errors::ApiError;

const EMBEDDING_PROVIDERS: [&str; 2] = ["hash", "openai_compatible"];

pub fn validate_config(config: &Value) -> Result<(), ApiError> {
    let root = config
        .as_object()
        .ok_or_else(|| config_type_error("root", "object"))?;

    if let Some(llm) = expect_optional_object(root, "llm")? {
        validate_optional_string_field(llm, "llm.api_key", "api_key")?;
        validate_non_empty_string_field(llm, "llm.model", "model")?;
        validate_non_empty_string_field(llm, "llm.base_url", "base_url")?;
        validate_u64_field(llm, "llm.max_tokens", "max_tokens", 1, 64_000)?;
        validate_f64_field(llm, "llm.temperature", "temperature", 0.0, 1.0)?;
        validate_u64_field(llm, "llm.max_tool_rounds", "max_tool_rounds", 0, 10)?;
        validate_u64_field(llm, "llm.timeout_secs", "timeout_secs", 1, 3_600)?;
    }

    if let Some(embedding) = expect_optional_object(root, "embedding")? {
        if let Some(provider) = embedding.get("provider") {
            let Some(name) = provider.as_str() else {
                return Err(config_type_error("embedding.provider", "string"));
            };
            if !EMBEDDING_PROVIDERS.contains(&name) {
                return Err(ApiError::BadRequest(format!(
                    "Invalid config at 'embedding.provider': expected one of {}",
                    EMBEDDING_PROVIDERS.join(", ")
                )));
            }
        }
        validate_non_empty_string_field(embedding, "embedding.model", "model")?;
        validate_non_empty_string_field(embedding, "embedding.base_url", "base_url")?;
        validate_u64_field(embedding, "embedding.dimensions", "dimensions", 8, 8_192)?;
    }

    if let Some(documents) = expect_optional_object(root, "documents")? {
        validate_u64_field(documents, "documents.chunk_size", "chunk_size", 1, 1_000_000)?;
        validate_u64_field(
            documents,
            "documents.chunk_overlap",
            "chunk_overlap",
            0,
            1_000_000,
        )?;
        validate_non_empty_string_field(documents, "documents.docs_dir", "docs_dir")?;

        let size = documents.get("chunk_size").and_then(Value::as_u64);
        let overlap = documents.get("chunk_overlap").and_then(Value::as_u64);
        let size = size.unwrap_or(super::settings::DEFAULT_CHUNK_SIZE as u64);
        let overlap = overlap.unwrap_or(super::settings::DEFAULT_CHUNK_OVERLAP as u64);
        if overlap >= size {
            return Err(ApiError::BadRequest(format!(
                "Invalid config at 'documents.chunk_overlap': must be smaller than chunk_size ({} >= {})",
                overlap, size
            )));
        }
    }

    if let Some(search) = expect_optional_object(root, "search")? {
        validate_u64_field(search, "search.max_results", "max_results", 1, 100)?;
    }

    if let Some(session) = expect_optional_object(root, "session")? {
        validate_u64_field(session, "session.max_history", "max_history", 0, 100)?;
    }

    if let Some(server) = expect_optional_object(root, "server")? {
        validate_optional_string_field(server, "server.host", "host")?;
        validate_u64_field(server, "server.port", "port", 0, 65_535)?;
        validate_string_array_field(
            server,
            "server.cors_allowed_origins",
            "cors_allowed_origins",
        )?;
        validate_u64_field(
            server,
            "server.query_rate_limit_per_minute",
            "query_rate_limit_per_minute",
            0,
            100_000,
        )?;
    }

    Ok(())
}

fn expect_optional_object<'a>(
    root: &'a Map<String, Value>,
    key: &str,
) -> Result<Option<&'a Map<String, Value>>, ApiError> {
    match root.get(key) {
        Some(Value::Object(map)) => Ok(Some(map)),
        Some(_) => Err(config_type_error(key, "object")),
        None => Ok(None),
    }
}

fn validate_u64_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
    min: u64,
    max: u64,
) -> Result<(), ApiError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(number) = value.as_u64() else {
        return Err(config_type_error(path, "integer"));
    };
    if number < min || number > max {
        return Err(out_of_range(path, min, max));
    }
    Ok(())
}

fn validate_f64_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
    min: f64,
    max: f64,
) -> Result<(), ApiError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(number) = value.as_f64() else {
        return Err(config_type_error(path, "number"));
    };
    if number < min || number > max {
        return Err(out_of_range(path, min, max));
    }
    Ok(())
}

fn validate_non_empty_string_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), ApiError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(text) = value.as_str() else {
        return Err(config_type_error(path, "string"));
    };
    if text.trim().is_empty() {
        return Err(ApiError::BadRequest(format!(
            "Invalid config at '{}': value cannot be empty",
            path
        )));
    }
    Ok(())
}

fn validate_optional_string_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), ApiError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    if value.as_str().is_none() && !value.is_null() {
        return Err(config_type_error(path, "string"));
    }
    Ok(())
}

fn validate_string_array_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), ApiError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(items) = value.as_array() else {
        return Err(config_type_error(path, "array of strings"));
    };
    for (index, item) in items.iter().enumerate() {
        let Some(text) = item.as_str() else {
            return Err(config_type_error(&format!("{}[{}]", path, index), "string"));
        };
        if text.trim().is_empty() {
            return Err(ApiError::BadRequest(format!(
                "Invalid config at '{}[{}]': value cannot be empty",
                path, index
            )));
        }
    }
    Ok(())
}

fn out_of_range<T: std::fmt::Display>(path: &str, min: T, max: T) -> ApiError {
    ApiError::BadRequest(format!(
        "Invalid config at '{}': must be between {} and {}",
        path, min, max
    ))
}

fn config_type_error(path: &str, expected: &str) -> ApiError {
    ApiError::BadRequest(format!(
        "Invalid config at '{}': expected {}",
        path, expected
    ))
}
