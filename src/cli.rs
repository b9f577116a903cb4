// src/cli.rs
use clap::Parser;
use mongoseed::{DatabaseConfig, ReadingOptions, SeederConfig, Transformer};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Root directory containing one sub-directory per collection
    #[arg(long, default_value = "./")]
    pub data: String,

    /// Full MongoDB connection URI (overrides the discrete db options)
    #[arg(long)]
    pub db_uri: Option<String>,

    #[arg(long, default_value = "127.0.0.1")]
    pub db_host: String,

    #[arg(long, default_value_t = 27017)]
    pub db_port: u16,

    /// Target database name
    #[arg(long, default_value = "database")]
    pub db_name: String,

    #[arg(long)]
    pub db_username: Option<String>,

    #[arg(long)]
    pub db_password: Option<String>,

    /// Drop the entire database before import
    #[arg(long)]
    pub drop_database: bool,

    /// Drop every target collection before import
    #[arg(long)]
    pub drop_collections: bool,

    /// Rename the 'id' field of every document to '_id'
    #[arg(long)]
    pub replace_id: bool,

    /// Inject createdAt/updatedAt timestamps into every document
    #[arg(long)]
    pub set_timestamps: bool,

    /// Comma-separated list of eligible file extensions
    #[arg(long, value_delimiter = ',', default_value = "json,yaml,yml,csv,j2")]
    pub extensions: Vec<String>,

    /// Documents per insert batch
    #[arg(long, default_value_t = 1000)]
    pub batch_size: usize,

    /// Collections processed in parallel
    #[arg(long, default_value_t = 4)]
    pub concurrency: usize,

    /// Retries per failed batch
    #[arg(long, default_value_t = 3)]
    pub write_retries: u32,

    /// Load and transform everything but write nothing
    #[arg(long)]
    pub dry_run: bool,

    /// Only log warnings and failures
    #[arg(long)]
    pub quiet: bool,
}

impl Cli {
    pub fn seeder_config(&self) -> SeederConfig {
        SeederConfig {
            database: DatabaseConfig {
                uri: self.db_uri.clone(),
                host: self.db_host.clone(),
                port: self.db_port,
                name: self.db_name.clone(),
                username: self.db_username.clone(),
                password: self.db_password.clone(),
            },
            drop_database: self.drop_database,
            drop_collections: self.drop_collections,
            batch_size: self.batch_size,
            concurrency: self.concurrency,
            write_retries: self.write_retries,
            dry_run: self.dry_run,
            ..Default::default()
        }
    }

    pub fn reading_options(&self) -> ReadingOptions {
        let mut transformers = Vec::new();
        if self.replace_id {
            transformers.push(Transformer::replace_id_with_underscore_id());
        }
        if self.set_timestamps {
            transformers.push(Transformer::set_created_at_timestamp());
            transformers.push(Transformer::set_updated_at_timestamp());
        }
        ReadingOptions {
            extensions: self.extensions.clone(),
            transformers,
        }
    }
}
