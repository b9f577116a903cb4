use mongoseed::{
    MemoryWriter, ReadingOptions, Seeder, SeederConfig, SeederError, Transformer,
};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn config() -> SeederConfig {
    SeederConfig {
        retry_backoff_ms: 1,
        ..Default::default()
    }
}

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

#[tokio::test]
async fn seeds_every_collection_with_every_document() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "users/a.json", r#"[{"name": "alice"}, {"name": "bob"}]"#);
    write(tmp.path(), "users/b.json", r#"{"name": "carol"}"#);
    write(tmp.path(), "posts/a.json", r#"{"title": "hello"}"#);
    write(tmp.path(), "posts/notes.txt", "not eligible");

    let seeder = Seeder::new(config(), MemoryWriter::new());
    let result = seeder
        .seed(tmp.path(), &ReadingOptions::default())
        .await
        .unwrap();

    assert!(result.is_success());
    assert_eq!(result.total_written(), 4);
    assert_eq!(seeder.writer().documents("users").len(), 3);
    assert_eq!(seeder.writer().documents("posts").len(), 1);
}

#[tokio::test]
async fn documents_written_in_file_order_within_a_collection() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "events/a.json", r#"[{"seq": 1}, {"seq": 2}]"#);
    write(tmp.path(), "events/b.json", r#"[{"seq": 3}]"#);

    let seeder = Seeder::new(config(), MemoryWriter::new());
    seeder
        .seed(tmp.path(), &ReadingOptions::default())
        .await
        .unwrap();

    let seqs: Vec<i64> = seeder
        .writer()
        .documents("events")
        .iter()
        .map(|d| d.get_i64("seq").unwrap())
        .collect();
    assert_eq!(seqs, vec![1, 2, 3]);
}

#[tokio::test]
async fn malformed_file_does_not_block_other_collections() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "broken/a.json", "{not json at all");
    write(tmp.path(), "users/a.json", r#"{"name": "alice"}"#);
    write(tmp.path(), "posts/a.json", r#"{"title": "hello"}"#);

    let seeder = Seeder::new(config(), MemoryWriter::new());
    let result = seeder
        .seed(tmp.path(), &ReadingOptions::default())
        .await
        .unwrap();

    assert!(!result.is_success());
    assert_eq!(result.failures.len(), 1);
    assert_eq!(result.failures[0].collection, "broken");
    assert!(result.failures[0].path.as_ref().unwrap().ends_with("a.json"));
    assert_eq!(seeder.writer().documents("users").len(), 1);
    assert_eq!(seeder.writer().documents("posts").len(), 1);
}

#[tokio::test]
async fn malformed_file_does_not_block_the_rest_of_its_collection() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "users/a.json", "{broken");
    write(tmp.path(), "users/b.json", r#"{"name": "bob"}"#);

    let seeder = Seeder::new(config(), MemoryWriter::new());
    let result = seeder
        .seed(tmp.path(), &ReadingOptions::default())
        .await
        .unwrap();

    assert_eq!(result.failures.len(), 1);
    assert_eq!(seeder.writer().documents("users").len(), 1);
}

#[tokio::test]
async fn transient_write_failure_recovers_within_retry_budget() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "users/a.json", r#"[{"n": 1}, {"n": 2}]"#);

    let writer = MemoryWriter::new();
    writer.fail_next_inserts(1);
    let seeder = Seeder::new(config(), writer);
    let result = seeder
        .seed(tmp.path(), &ReadingOptions::default())
        .await
        .unwrap();

    assert!(result.is_success());
    assert_eq!(result.total_written(), 2);
    // First attempt failed, the retry succeeded.
    assert_eq!(seeder.writer().insert_calls(), 2);
}

#[tokio::test]
async fn exhausted_retries_fail_the_batch_but_not_the_run() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "cursed/a.json", r#"[{"n": 1}, {"n": 2}]"#);
    write(tmp.path(), "users/a.json", r#"{"name": "alice"}"#);

    let writer = MemoryWriter::new();
    writer.always_fail("cursed");
    let seeder = Seeder::new(config(), writer);
    let result = seeder
        .seed(tmp.path(), &ReadingOptions::default())
        .await
        .unwrap();

    assert!(!result.is_success());
    // One failure per document of the exhausted batch, with provenance.
    assert_eq!(result.failures.len(), 2);
    assert!(result.failures.iter().all(|f| f.collection == "cursed"));
    assert!(result.failures.iter().all(|f| f.path.is_some()));

    let cursed = result.collections.iter().find(|c| c.name == "cursed").unwrap();
    assert_eq!(cursed.failed, 2);
    assert_eq!(cursed.written, 0);
    assert_eq!(seeder.writer().documents("users").len(), 1);
}

#[tokio::test]
async fn nonexistent_root_fails_before_any_write() {
    let seeder = Seeder::new(config(), MemoryWriter::new());
    let result = seeder
        .seed(Path::new("/no/such/root"), &ReadingOptions::default())
        .await;

    assert!(matches!(result, Err(SeederError::InvalidPath(_))));
    assert_eq!(seeder.writer().insert_calls(), 0);
}

#[tokio::test]
async fn writes_are_batched_by_batch_size() {
    let tmp = TempDir::new().unwrap();
    write(
        tmp.path(),
        "users/a.json",
        r#"[{"n": 1}, {"n": 2}, {"n": 3}, {"n": 4}, {"n": 5}]"#,
    );

    let seeder = Seeder::new(
        SeederConfig {
            batch_size: 2,
            ..config()
        },
        MemoryWriter::new(),
    );
    let result = seeder
        .seed(tmp.path(), &ReadingOptions::default())
        .await
        .unwrap();

    assert_eq!(result.total_written(), 5);
    assert_eq!(seeder.writer().insert_calls(), 3);
}

#[tokio::test]
async fn transformers_run_before_write() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "users/a.json", r#"{"id": 7, "name": "alice"}"#);

    let options = ReadingOptions {
        transformers: vec![
            Transformer::replace_id_with_underscore_id(),
            Transformer::set_created_at_timestamp(),
            Transformer::set_updated_at_timestamp(),
        ],
        ..Default::default()
    };
    let seeder = Seeder::new(config(), MemoryWriter::new());
    seeder.seed(tmp.path(), &options).await.unwrap();

    let docs = seeder.writer().documents("users");
    assert_eq!(docs[0].get_i64("_id").unwrap(), 7);
    assert!(!docs[0].contains_key("id"));
    assert!(docs[0].get_datetime("createdAt").is_ok());
    assert!(docs[0].get_datetime("updatedAt").is_ok());
}

#[tokio::test]
async fn failing_transformer_skips_only_that_document() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "users/a.json", r#"[{"name": "alice"}, {"poison": true}]"#);

    let reject_poison = Transformer::new("reject-poison", |doc| {
        if doc.contains_key("poison") {
            Err("poisoned document".to_string())
        } else {
            Ok(doc)
        }
    });
    let options = ReadingOptions {
        transformers: vec![reject_poison],
        ..Default::default()
    };
    let seeder = Seeder::new(config(), MemoryWriter::new());
    let result = seeder.seed(tmp.path(), &options).await.unwrap();

    assert_eq!(result.failures.len(), 1);
    assert!(result.failures[0].reason.contains("reject-poison"));
    assert_eq!(seeder.writer().documents("users").len(), 1);
}

#[tokio::test]
async fn drop_collections_drops_each_target_first() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "users/a.json", r#"{"name": "alice"}"#);

    let seeder = Seeder::new(
        SeederConfig {
            drop_collections: true,
            ..config()
        },
        MemoryWriter::new(),
    );
    seeder
        .seed(tmp.path(), &ReadingOptions::default())
        .await
        .unwrap();

    assert_eq!(seeder.writer().dropped_collections(), vec!["users".to_string()]);
    assert_eq!(seeder.writer().documents("users").len(), 1);
}

#[tokio::test]
async fn drop_database_replaces_per_collection_drops() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "users/a.json", r#"{"name": "alice"}"#);

    let seeder = Seeder::new(
        SeederConfig {
            drop_database: true,
            drop_collections: true,
            ..config()
        },
        MemoryWriter::new(),
    );
    seeder
        .seed(tmp.path(), &ReadingOptions::default())
        .await
        .unwrap();

    assert!(seeder.writer().database_dropped());
    assert!(seeder.writer().dropped_collections().is_empty());
}

#[tokio::test]
async fn dry_run_loads_but_writes_nothing() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "users/a.json", r#"[{"n": 1}, {"n": 2}]"#);

    let seeder = Seeder::new(
        SeederConfig {
            dry_run: true,
            drop_collections: true,
            ..config()
        },
        MemoryWriter::new(),
    );
    let result = seeder
        .seed(tmp.path(), &ReadingOptions::default())
        .await
        .unwrap();

    assert!(result.is_success());
    assert_eq!(result.total_written(), 0);
    assert_eq!(result.collections[0].loaded, 2);
    assert_eq!(seeder.writer().insert_calls(), 0);
    assert!(seeder.writer().dropped_collections().is_empty());
}

#[tokio::test]
async fn cancellation_stops_new_batches() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "users/a.json", r#"[{"n": 1}, {"n": 2}, {"n": 3}]"#);

    let seeder = Seeder::new(config(), MemoryWriter::new());
    seeder.cancel_handle().cancel();
    let result = seeder
        .seed(tmp.path(), &ReadingOptions::default())
        .await
        .unwrap();

    assert_eq!(result.total_written(), 0);
    assert_eq!(result.collections[0].skipped, 3);
    assert_eq!(seeder.writer().insert_calls(), 0);
}

#[tokio::test]
async fn mixed_formats_load_into_one_collection() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "users/a.json", r#"{"name": "alice"}"#);
    write(tmp.path(), "users/b.yaml", "name: bob\n");
    write(tmp.path(), "users/c.csv", "name\ncarol\n");
    write(tmp.path(), "users/d.j2", r#"{"name": "dave", "n": {{ 1 + 1 }}}"#);

    let seeder = Seeder::new(config(), MemoryWriter::new());
    let result = seeder
        .seed(tmp.path(), &ReadingOptions::default())
        .await
        .unwrap();

    assert!(result.is_success());
    let names: Vec<String> = seeder
        .writer()
        .documents("users")
        .iter()
        .map(|d| d.get_str("name").unwrap().to_string())
        .collect();
    assert_eq!(names, vec!["alice", "bob", "carol", "dave"]);
}
