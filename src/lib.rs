//! Directory-driven MongoDB seeding: one sub-directory per collection, one
//! or more documents per file, an optional transformer pipeline, batched
//! writes with retry.

pub mod config;
pub mod coordinator;
pub mod error;
pub mod loader;
pub mod scanner;
pub mod transform;
pub mod writer;

pub use config::{DatabaseConfig, ReadingOptions, SeederConfig};
pub use coordinator::{
    CancelHandle, Collection, CollectionResult, Failure, ImportResult, Seeder,
};
pub use error::SeederError;
pub use loader::SourceDocument;
pub use scanner::CollectionSpec;
pub use transform::Transformer;
pub use writer::{DocumentWriter, MemoryWriter, MongoWriter};
