//! Create, extend, and garbage-collect a partitioned dataset on the local
//! filesystem using the core API.

use std::collections::BTreeMap;
use std::path::PathBuf;

use dataset_table_core::batch::{RowBatch, Value, row};
use dataset_table_core::codec::JsonCodec;
use dataset_table_core::dataset::{CreateRequest, Dataset, UpdateRequest};
use dataset_table_core::gc;
use dataset_table_core::storage::FsStore;

fn measurements(run: i64, labels: &[&str]) -> Vec<RowBatch> {
    let rows = labels
        .iter()
        .enumerate()
        .map(|(i, label)| {
            row([
                ("A", Value::Int64(run * 100 + i as i64)),
                ("E", Value::Utf8(label.to_string())),
            ])
        })
        .collect();
    vec![RowBatch::new(rows)]
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Start clean so the example is repeatable.
    let root = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../target/example-dataset");
    if tokio::fs::try_exists(&root).await? {
        tokio::fs::remove_dir_all(&root).await?;
    }
    let store = FsStore::new(&root);

    // 1) Create a dataset partitioned and indexed by the E column.
    let mut batches = BTreeMap::new();
    batches.insert("measurements".to_string(), measurements(0, &["test", "train"]));
    let request = CreateRequest {
        uuid: "demo".to_string(),
        partition_columns: vec!["E".to_string()],
        index_columns: vec!["E".to_string()],
        user_metadata: BTreeMap::from([("owner".to_string(), "example".to_string())]),
    };
    let dataset = Dataset::create(&store, &JsonCodec, request, batches).await?;
    println!(
        "created dataset {} with partitions {:?}",
        dataset.uuid(),
        dataset.metadata().labels_in_order()
    );

    // 2) Append another run; partitioning and indices carry over.
    let mut batches = BTreeMap::new();
    batches.insert("measurements".to_string(), measurements(1, &["train"]));
    let request = UpdateRequest {
        uuid: "demo".to_string(),
        ..UpdateRequest::default()
    };
    let dataset = Dataset::update(&store, &JsonCodec, request, batches).await?;

    // 3) Query through the secondary index, then read the rows back.
    let index = dataset.load_index(&store, "E").await?;
    let train_partitions = dataset.indexed_partitions(&index, &Value::Utf8("train".to_string()));
    println!("partitions containing E=train: {train_partitions:?}");

    let read_back = dataset.read_table(&store, &JsonCodec, "measurements").await?;
    println!("read {} rows back", read_back.len());

    // 4) Drop the oldest partition and reclaim its bytes.
    let doomed = dataset
        .metadata()
        .labels_in_order()
        .first()
        .map(|label| label.to_string())
        .into_iter()
        .collect();
    Dataset::delete_partitions(&store, "demo", &doomed).await?;
    let reclaimed = gc::collect(&store, "demo").await?;
    println!("garbage collection removed {} key(s)", reclaimed.len());

    Ok(())
}
