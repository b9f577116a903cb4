// src/transform.rs
use crate::error::SeederError;
use bson::{Bson, DateTime, Document};
use chrono::Utc;

/// A pure, stateless document rewrite applied before write. Transformers run
/// in the order they are listed; a failure halts the pipeline for that
/// document only.
#[derive(Debug, Clone, Copy)]
pub struct Transformer {
    name: &'static str,
    func: fn(Document) -> Result<Document, String>,
}

impl Transformer {
    pub fn new(name: &'static str, func: fn(Document) -> Result<Document, String>) -> Self {
        Self { name, func }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Renames the `id` field to `_id`. Documents that already carry an `_id`
    /// are left unchanged, so re-application is a no-op.
    pub fn replace_id_with_underscore_id() -> Self {
        Self::new("replace-id-with-underscore-id", |mut doc| {
            if doc.contains_key("_id") {
                return Ok(doc);
            }
            if let Some(value) = doc.remove("id") {
                doc.insert("_id", value);
            }
            Ok(doc)
        })
    }

    /// Sets `createdAt` to the current time when the field is absent.
    pub fn set_created_at_timestamp() -> Self {
        Self::new("set-created-at-timestamp", |doc| {
            Ok(set_timestamp_if_absent(doc, "createdAt"))
        })
    }

    /// Sets `updatedAt` to the current time when the field is absent.
    pub fn set_updated_at_timestamp() -> Self {
        Self::new("set-updated-at-timestamp", |doc| {
            Ok(set_timestamp_if_absent(doc, "updatedAt"))
        })
    }
}

fn set_timestamp_if_absent(mut doc: Document, field: &str) -> Document {
    if !doc.contains_key(field) {
        doc.insert(field, Bson::DateTime(DateTime::from_chrono(Utc::now())));
    }
    doc
}

/// Runs every transformer over the document in order. The first failure stops
/// the pipeline and is reported as a `Transform` error for that document.
pub fn apply_pipeline(
    transformers: &[Transformer],
    mut doc: Document,
) -> Result<Document, SeederError> {
    for transformer in transformers {
        doc = (transformer.func)(doc).map_err(|reason| SeederError::Transform {
            name: transformer.name.to_string(),
            reason,
        })?;
    }
    Ok(doc)
}
