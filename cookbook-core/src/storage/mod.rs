//! Dataset storage behind the Flight service.
//!
//! A dataset is addressed by a key that is a single path component, e.g.
//! `airquality.parquet`. The only backend is `parquet`, which keeps one
//! Parquet file per dataset under a root directory.
//!
//! Each backend implements the `DatasetStore` trait, giving the Flight
//! service a consistent interface for listing, reading, writing and deleting.

pub mod parquet;

use arrow_array::RecordBatch;
use arrow_schema::SchemaRef;
use async_trait::async_trait;
use tonic::Status;

/// What the store knows about a dataset without reading its rows.
#[derive(Debug, Clone)]
pub struct DatasetEntry {
    /// Dataset key, also used as the Flight ticket
    pub key: String,
    /// Arrow schema of the stored data
    pub schema: SchemaRef,
    /// Number of rows
    pub total_records: i64,
    /// Size on disk in bytes
    pub total_bytes: i64,
}

/// Storage trait for datasets served over Flight.
#[async_trait]
pub trait DatasetStore: Send + Sync + 'static {
    /// List all stored datasets.
    async fn list(&self) -> Result<Vec<DatasetEntry>, Status>;

    /// Describe one dataset.
    async fn entry(&self, key: &str) -> Result<DatasetEntry, Status>;

    /// Store `batches` under `key`, replacing any existing dataset.
    async fn write(
        &self,
        key: &str,
        schema: SchemaRef,
        batches: Vec<RecordBatch>,
    ) -> Result<(), Status>;

    /// Read back a whole dataset.
    async fn read(&self, key: &str) -> Result<(SchemaRef, Vec<RecordBatch>), Status>;

    /// Delete a dataset.
    async fn delete(&self, key: &str) -> Result<(), Status>;
}

/// Checks that `key` names a single entry directly under the store root.
pub fn validate_key(key: &str) -> Result<(), Status> {
    let has_separator = key.contains(|c: char| c == '/' || c == '\\');
    if key.is_empty() || key == "." || key == ".." || has_separator {
        return Err(Status::invalid_argument(format!(
            "Invalid dataset key '{}': must be a single path component",
            key
        )));
    }
    Ok(())
}
