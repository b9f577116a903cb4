// src/loader.rs
use crate::error::SeederError;
use bson::{Bson, Document};
use minijinja::{context, Environment};
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// A loaded document together with its provenance, kept so failures can be
/// reported against the file they came from.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    pub collection: String,
    pub path: PathBuf,
    pub body: Document,
}

/// Reads and parses one file into zero or more documents. A `.json` or
/// `.yaml` file holds either a single object or an array of objects; a `.csv`
/// file yields one string-valued document per record; a `.j2` file is a
/// minijinja template rendered first and then parsed as JSON. Malformed
/// content is a `Parse` error carrying the file path and the underlying
/// cause.
pub async fn load_file(path: &Path) -> Result<Vec<Document>, SeederError> {
    let parse_err = |reason: String| SeederError::Parse {
        path: path.to_path_buf(),
        reason,
    };

    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| parse_err(e.to_string()))?;

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let documents = match ext.as_str() {
        "json" => json_documents(&content),
        "yaml" | "yml" => yaml_documents(&content),
        "csv" => csv_documents(&content),
        "j2" => template_documents(&content),
        other => Err(format!("unsupported file extension '{other}'")),
    }
    .map_err(parse_err)?;

    Ok(documents)
}

fn json_documents(content: &str) -> Result<Vec<Document>, String> {
    let value: Value = serde_json::from_str(content).map_err(|e| e.to_string())?;
    value_to_documents(value)
}

fn yaml_documents(content: &str) -> Result<Vec<Document>, String> {
    let value: Value = serde_yaml::from_str(content).map_err(|e| e.to_string())?;
    value_to_documents(value)
}

fn csv_documents(content: &str) -> Result<Vec<Document>, String> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(content.as_bytes());

    let headers = rdr.headers().map_err(|e| e.to_string())?.clone();

    let mut documents = Vec::new();
    for (row, record) in rdr.records().enumerate() {
        let record = record.map_err(|e| format!("row {}: {}", row + 1, e))?;
        let mut doc = Document::new();
        for (key, value) in headers.iter().zip(record.iter()) {
            doc.insert(key, Bson::String(value.to_string()));
        }
        documents.push(doc);
    }
    Ok(documents)
}

/// The stand-in for code-as-data document files: the template is rendered
/// with the process environment and the current time in scope, and the output
/// must parse under the JSON rule.
fn template_documents(content: &str) -> Result<Vec<Document>, String> {
    let env = Environment::new();
    let vars: HashMap<String, String> = std::env::vars().collect();
    let rendered = env
        .render_str(
            content,
            context! {
                env => vars,
                now => chrono::Utc::now().to_rfc3339(),
            },
        )
        .map_err(|e| e.to_string())?;
    json_documents(&rendered)
}

fn value_to_documents(value: Value) -> Result<Vec<Document>, String> {
    match value {
        Value::Object(_) => Ok(vec![to_document(&value)?]),
        Value::Array(items) => {
            let mut documents = Vec::with_capacity(items.len());
            for (index, item) in items.into_iter().enumerate() {
                if !item.is_object() {
                    return Err(format!("array element {index} is not an object"));
                }
                documents.push(to_document(&item)?);
            }
            Ok(documents)
        }
        _ => Err("expected an object or an array of objects".to_string()),
    }
}

fn to_document(value: &Value) -> Result<Document, String> {
    bson::to_document(value).map_err(|e| e.to_string())
}
