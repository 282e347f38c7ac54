//! Knowledge base file loading.
//!
//! Accepted JSON shapes:
//! - an object: each member is `topic → guidance`
//! - an array: `{"question": .., "answer": ..}` items are keyed by question,
//!   anything else becomes `entry_<index>`
//!
//! Non-string guidance values are kept as their JSON text.

use mindmate_core::error::KnowledgeBaseError;
use serde_json::Value;
use std::path::Path;
use tracing::{error, info, warn};

use crate::base::KnowledgeBase;

/// Load a knowledge base from `path`.
///
/// A missing file is not an error: it yields an empty base.
pub fn load(path: &Path) -> Result<KnowledgeBase, KnowledgeBaseError> {
    if !path.exists() {
        warn!(path = %path.display(), "Knowledge base file not found, starting empty");
        return Ok(KnowledgeBase::new());
    }

    let content = std::fs::read_to_string(path).map_err(|e| KnowledgeBaseError::Read {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    let value: Value = serde_json::from_str(&content).map_err(|e| KnowledgeBaseError::Parse {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    let kb = from_value(value).map_err(|found| KnowledgeBaseError::UnsupportedShape {
        path: path.to_path_buf(),
        found,
    })?;

    info!(path = %path.display(), entries = kb.len(), "Knowledge base loaded");
    Ok(kb)
}

/// Like [`load`], but logs any error and returns an empty base instead.
pub fn load_or_empty(path: &Path) -> KnowledgeBase {
    load(path).unwrap_or_else(|e| {
        error!(error = %e, "Knowledge base unusable, continuing without guidance");
        KnowledgeBase::new()
    })
}

/// Convert parsed JSON into a knowledge base.
///
/// On an unsupported top-level shape, returns the JSON type name found.
pub fn from_value(value: Value) -> Result<KnowledgeBase, &'static str> {
    match value {
        Value::Object(map) => Ok(map
            .into_iter()
            .map(|(key, value)| (key, guidance_text(value)))
            .collect()),
        Value::Array(items) => {
            let mut kb = KnowledgeBase::new();
            for (i, item) in items.into_iter().enumerate() {
                let (key, value) = array_item(i, item);
                kb.insert(key, value);
            }
            Ok(kb)
        }
        other => Err(json_type(&other)),
    }
}

fn array_item(index: usize, item: Value) -> (String, String) {
    if let Value::Object(ref map) = item {
        if let (Some(Value::String(q)), Some(Value::String(a))) =
            (map.get("question"), map.get("answer"))
        {
            if !q.is_empty() && !a.is_empty() {
                return (q.clone(), a.clone());
            }
        }
    }
    (format!("entry_{index}"), guidance_text(item))
}

fn guidance_text(value: Value) -> String {
    match value {
        Value::String(s) => s,
        other => other.to_string(),
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
