// src/writer.rs
use crate::error::SeederError;
use async_trait::async_trait;
use bson::{doc, Document};
use mongodb::options::ClientOptions;
use mongodb::Client;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use tracing::debug;

/// The storage boundary. Any backend that can drop and bulk-insert named
/// collections can stand in for MongoDB here.
#[async_trait]
pub trait DocumentWriter: Send + Sync {
    async fn drop_database(&self) -> Result<(), SeederError>;
    async fn drop_collection(&self, name: &str) -> Result<(), SeederError>;
    async fn insert_many(&self, name: &str, documents: Vec<Document>) -> Result<(), SeederError>;
}

pub struct MongoWriter {
    client: Client,
    database: String,
}

impl MongoWriter {
    /// Connects and pings the server so connectivity problems surface as a
    /// fatal `Connection` error before any write is attempted.
    pub async fn connect(uri: &str, database: &str) -> Result<Self, SeederError> {
        let client_options = ClientOptions::parse(uri)
            .await
            .map_err(|e| SeederError::Connection(e.to_string()))?;
        let client = Client::with_options(client_options)
            .map_err(|e| SeederError::Connection(e.to_string()))?;
        client
            .database("admin")
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| SeederError::Connection(e.to_string()))?;
        debug!("connected to {}", database);
        Ok(Self {
            client,
            database: database.to_string(),
        })
    }
}

#[async_trait]
impl DocumentWriter for MongoWriter {
    async fn drop_database(&self) -> Result<(), SeederError> {
        self.client
            .database(&self.database)
            .drop()
            .await
            .map_err(|e| classify(&self.database, e))
    }

    async fn drop_collection(&self, name: &str) -> Result<(), SeederError> {
        self.client
            .database(&self.database)
            .collection::<Document>(name)
            .drop()
            .await
            .map_err(|e| classify(name, e))
    }

    async fn insert_many(&self, name: &str, documents: Vec<Document>) -> Result<(), SeederError> {
        self.client
            .database(&self.database)
            .collection::<Document>(name)
            .insert_many(documents)
            .await
            .map(|_| ())
            .map_err(|e| classify(name, e))
    }
}

/// Connectivity-shaped driver errors become the fatal `Connection` variant;
/// everything else is a retryable `Write`.
fn classify(collection: &str, err: mongodb::error::Error) -> SeederError {
    use mongodb::error::ErrorKind;
    match err.kind.as_ref() {
        ErrorKind::ServerSelection { .. }
        | ErrorKind::Io(_)
        | ErrorKind::Authentication { .. }
        | ErrorKind::DnsResolve { .. } => SeederError::Connection(err.to_string()),
        _ => SeederError::Write {
            collection: collection.to_string(),
            reason: err.to_string(),
        },
    }
}

/// In-memory writer used by `--dry-run` and the test suite. Failures can be
/// scripted: a number of transient insert failures, or collections that fail
/// every insert.
#[derive(Default)]
pub struct MemoryWriter {
    collections: Mutex<HashMap<String, Vec<Document>>>,
    dropped_collections: Mutex<Vec<String>>,
    database_dropped: AtomicBool,
    transient_failures: AtomicUsize,
    insert_calls: AtomicUsize,
    always_failing: Mutex<HashSet<String>>,
}

impl MemoryWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// The next `n` insert calls fail with a `Write` error, then inserts
    /// succeed again.
    pub fn fail_next_inserts(&self, n: usize) {
        self.transient_failures.store(n, Ordering::SeqCst);
    }

    /// Every insert into `collection` fails with a `Write` error.
    pub fn always_fail(&self, collection: &str) {
        self.always_failing
            .lock()
            .unwrap()
            .insert(collection.to_string());
    }

    pub fn documents(&self, collection: &str) -> Vec<Document> {
        self.collections
            .lock()
            .unwrap()
            .get(collection)
            .cloned()
            .unwrap_or_default()
    }

    pub fn collection_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.collections.lock().unwrap().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn dropped_collections(&self) -> Vec<String> {
        self.dropped_collections.lock().unwrap().clone()
    }

    pub fn database_dropped(&self) -> bool {
        self.database_dropped.load(Ordering::SeqCst)
    }

    /// Number of `insert_many` calls seen, including failed ones.
    pub fn insert_calls(&self) -> usize {
        self.insert_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DocumentWriter for MemoryWriter {
    async fn drop_database(&self) -> Result<(), SeederError> {
        self.database_dropped.store(true, Ordering::SeqCst);
        self.collections.lock().unwrap().clear();
        Ok(())
    }

    async fn drop_collection(&self, name: &str) -> Result<(), SeederError> {
        self.dropped_collections
            .lock()
            .unwrap()
            .push(name.to_string());
        self.collections.lock().unwrap().remove(name);
        Ok(())
    }

    async fn insert_many(&self, name: &str, documents: Vec<Document>) -> Result<(), SeederError> {
        self.insert_calls.fetch_add(1, Ordering::SeqCst);
        if self.always_failing.lock().unwrap().contains(name) {
            return Err(SeederError::Write {
                collection: name.to_string(),
                reason: "scripted failure".to_string(),
            });
        }
        if self
            .transient_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(SeederError::Write {
                collection: name.to_string(),
                reason: "scripted transient failure".to_string(),
            });
        }
        self.collections
            .lock()
            .unwrap()
            .entry(name.to_string())
            .or_default()
            .extend(documents);
        Ok(())
    }
}
