// src/coordinator.rs
use crate::config::{ReadingOptions, SeederConfig};
use crate::error::SeederError;
use crate::loader::{self, SourceDocument};
use crate::scanner::{self, CollectionSpec};
use crate::transform;
use crate::writer::DocumentWriter;
use futures::stream::{self, StreamExt};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

const MAX_RETRY_BACKOFF: Duration = Duration::from_secs(5);

/// A named collection with its loaded, transformed documents in write order.
#[derive(Debug, Clone)]
pub struct Collection {
    pub name: String,
    pub documents: Vec<SourceDocument>,
}

/// One recorded, non-fatal failure: which collection, which file (when the
/// failure is tied to one) and why.
#[derive(Debug, Clone)]
pub struct Failure {
    pub collection: String,
    pub path: Option<PathBuf>,
    pub reason: String,
}

#[derive(Debug, Clone, Default)]
pub struct CollectionResult {
    pub name: String,
    /// Documents loaded and transformed for this collection.
    pub loaded: usize,
    /// Documents written to the backend.
    pub written: usize,
    /// Documents in batches that exhausted their retries.
    pub failed: usize,
    /// Documents never attempted because the run was cancelled.
    pub skipped: usize,
}

/// Summary of a run. Per-document and per-batch problems land in `failures`;
/// they never abort the run and are never silently dropped.
#[derive(Debug, Clone, Default)]
pub struct ImportResult {
    pub collections: Vec<CollectionResult>,
    pub failures: Vec<Failure>,
}

impl ImportResult {
    pub fn total_written(&self) -> usize {
        self.collections.iter().map(|c| c.written).sum()
    }

    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Run-level cancellation signal. Cancelling stops new batches from being
/// issued; in-flight batches complete or fail cleanly.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// The import coordinator: reads collection directories, then groups writes
/// per collection, dropping targets first when configured. Collections are
/// independent and processed with bounded parallelism; documents within one
/// collection are written in scan order.
pub struct Seeder<W> {
    config: SeederConfig,
    writer: W,
    cancel: CancelHandle,
}

impl<W: DocumentWriter> Seeder<W> {
    pub fn new(config: SeederConfig, writer: W) -> Self {
        Self {
            config,
            writer,
            cancel: CancelHandle::new(),
        }
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    pub fn writer(&self) -> &W {
        &self.writer
    }

    /// Scans the root and loads every collection, applying the transformer
    /// pipeline to each document. Parse and transform failures are recorded
    /// per document; only a bad root path is an error.
    pub async fn read_collections_from_path(
        &self,
        root: &Path,
        options: &ReadingOptions,
    ) -> Result<(Vec<Collection>, Vec<Failure>), SeederError> {
        let specs = scanner::scan_collections(root, &options.extensions)?;
        info!("found {} collection(s) under {}", specs.len(), root.display());

        let loaded: Vec<(Collection, Vec<Failure>)> =
            stream::iter(specs.into_iter().map(|spec| load_collection(spec, options)))
                .buffered(self.config.concurrency.max(1))
                .collect()
                .await;

        let mut collections = Vec::with_capacity(loaded.len());
        let mut failures = Vec::new();
        for (collection, mut collection_failures) in loaded {
            collections.push(collection);
            failures.append(&mut collection_failures);
        }
        Ok((collections, failures))
    }

    /// Writes the given collections. Partial failures are recorded in the
    /// returned result; only total connectivity loss is an error.
    pub async fn import(&self, collections: Vec<Collection>) -> Result<ImportResult, SeederError> {
        let mut result = ImportResult::default();

        if collections.is_empty() {
            info!("nothing to import");
            return Ok(result);
        }

        if self.config.dry_run {
            info!("dry run: skipping drops and writes");
            for collection in collections {
                result.collections.push(CollectionResult {
                    name: collection.name.clone(),
                    loaded: collection.documents.len(),
                    ..Default::default()
                });
            }
            return Ok(result);
        }

        if self.config.drop_database {
            info!("dropping target database");
            match self.writer.drop_database().await {
                Ok(()) => {}
                Err(e @ SeederError::Connection(_)) => return Err(e),
                Err(e) => result.failures.push(Failure {
                    collection: "<database>".to_string(),
                    path: None,
                    reason: e.to_string(),
                }),
            }
        }

        // Dropping the database already removed every collection.
        let drop_collections = self.config.drop_collections && !self.config.drop_database;

        let mut tasks = stream::iter(
            collections
                .into_iter()
                .map(|collection| self.write_collection(collection, drop_collections)),
        )
        .buffered(self.config.concurrency.max(1));

        while let Some(outcome) = tasks.next().await {
            let (collection_result, mut failures) = outcome?;
            result.collections.push(collection_result);
            result.failures.append(&mut failures);
        }

        Ok(result)
    }

    /// Read and import in one step, folding read-phase failures into the
    /// final result ahead of the write-phase ones.
    pub async fn seed(
        &self,
        root: &Path,
        options: &ReadingOptions,
    ) -> Result<ImportResult, SeederError> {
        let (collections, read_failures) = self.read_collections_from_path(root, options).await?;
        let mut result = self.import(collections).await?;
        let mut failures = read_failures;
        failures.append(&mut result.failures);
        result.failures = failures;
        Ok(result)
    }

    async fn write_collection(
        &self,
        collection: Collection,
        drop_first: bool,
    ) -> Result<(CollectionResult, Vec<Failure>), SeederError> {
        let name = collection.name;
        let total = collection.documents.len();
        let mut result = CollectionResult {
            name: name.clone(),
            loaded: total,
            ..Default::default()
        };
        let mut failures = Vec::new();

        if drop_first {
            match self.writer.drop_collection(&name).await {
                Ok(()) => debug!("dropped collection '{}'", name),
                Err(e @ SeederError::Connection(_)) => return Err(e),
                Err(e) => failures.push(Failure {
                    collection: name.clone(),
                    path: None,
                    reason: e.to_string(),
                }),
            }
        }

        let batch_size = self.config.batch_size.max(1);
        let mut offset = 0;
        for batch in collection.documents.chunks(batch_size) {
            if self.cancel.is_cancelled() {
                result.skipped = total - offset;
                warn!(
                    "cancelled: leaving {} document(s) of '{}' unwritten",
                    result.skipped, name
                );
                break;
            }
            match self.write_batch(&name, batch).await {
                Ok(()) => result.written += batch.len(),
                Err(e @ SeederError::Connection(_)) => return Err(e),
                Err(e) => {
                    warn!(
                        "giving up on a batch of {} document(s) for '{}': {}",
                        batch.len(),
                        name,
                        e
                    );
                    result.failed += batch.len();
                    let reason = e.to_string();
                    failures.extend(batch.iter().map(|document| Failure {
                        collection: name.clone(),
                        path: Some(document.path.clone()),
                        reason: reason.clone(),
                    }));
                }
            }
            offset += batch.len();
        }

        info!(
            "collection '{}': wrote {}/{} document(s)",
            name, result.written, result.loaded
        );
        Ok((result, failures))
    }

    /// One batch, retried with doubling backoff until the retry budget is
    /// spent. Connection loss is returned as-is and aborts the run.
    async fn write_batch(
        &self,
        name: &str,
        batch: &[SourceDocument],
    ) -> Result<(), SeederError> {
        let documents: Vec<bson::Document> =
            batch.iter().map(|document| document.body.clone()).collect();
        let mut backoff = Duration::from_millis(self.config.retry_backoff_ms);
        let mut attempts = 0;
        loop {
            match self.writer.insert_many(name, documents.clone()).await {
                Ok(()) => return Ok(()),
                Err(e @ SeederError::Connection(_)) => return Err(e),
                Err(e) => {
                    attempts += 1;
                    if attempts > self.config.write_retries {
                        return Err(e);
                    }
                    warn!(
                        "batch write to '{}' failed (attempt {}): {}; retrying in {:?}",
                        name, attempts, e, backoff
                    );
                    sleep(backoff).await;
                    backoff = (backoff * 2).min(MAX_RETRY_BACKOFF);
                }
            }
        }
    }
}

async fn load_collection(
    spec: CollectionSpec,
    options: &ReadingOptions,
) -> (Collection, Vec<Failure>) {
    let mut documents = Vec::new();
    let mut failures = Vec::new();

    for path in &spec.files {
        match loader::load_file(path).await {
            Ok(bodies) => {
                for body in bodies {
                    match transform::apply_pipeline(&options.transformers, body) {
                        Ok(body) => documents.push(SourceDocument {
                            collection: spec.name.clone(),
                            path: path.clone(),
                            body,
                        }),
                        Err(e) => failures.push(Failure {
                            collection: spec.name.clone(),
                            path: Some(path.clone()),
                            reason: e.to_string(),
                        }),
                    }
                }
            }
            Err(e) => failures.push(Failure {
                collection: spec.name.clone(),
                path: Some(path.clone()),
                reason: e.to_string(),
            }),
        }
    }

    debug!(
        "loaded {} document(s) for '{}' ({} failure(s))",
        documents.len(),
        spec.name,
        failures.len()
    );
    (
        Collection {
            name: spec.name,
            documents,
        },
        failures,
    )
}
