//! Parquet directory storage backend.
//!
//! Every dataset is a single Parquet file directly under the store root, named
//! by its key:
//!
//! ```text
//! flight_datasets/
//! ├── airquality.parquet
//! └── iris.parquet
//! ```
//!
//! The root directory is configured for the server binary with:
//!
//! ```toml
//! [storage]
//! root = "./flight_datasets"
//! ```

use crate::storage::{validate_key, DatasetEntry, DatasetStore};
use arrow_array::RecordBatch;
use arrow_schema::SchemaRef;
use async_trait::async_trait;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use parquet::file::properties::WriterProperties;
use std::fs::{self, File};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tonic::Status;
use tracing::debug;

/// Rows per Parquet row group when writing uploaded datasets.
const MAX_ROW_GROUP_SIZE: usize = 65536;

const PARQUET_EXTENSION: &str = "parquet";

/// Parquet-file-per-dataset storage rooted at a local directory.
#[derive(Debug, Clone)]
pub struct ParquetDirStore {
    root: PathBuf,
}

impl ParquetDirStore {
    /// Opens the store, creating the root directory if needed.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, Status> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| {
            Status::internal(format!("Failed to create {}: {}", root.display(), e))
        })?;
        Ok(Self { root })
    }

    /// Opens the store and removes every file already in it.
    pub fn new_empty(root: impl Into<PathBuf>) -> Result<Self, Status> {
        let store = Self::new(root)?;
        let entries = fs::read_dir(&store.root).map_err(|e| io_status(&store.root, e))?;
        for entry in entries {
            let path = entry.map_err(|e| io_status(&store.root, e))?.path();
            let removed = if path.is_dir() {
                fs::remove_dir_all(&path)
            } else {
                fs::remove_file(&path)
            };
            removed.map_err(|e| io_status(&path, e))?;
        }
        Ok(store)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, Status> {
        validate_key(key)?;
        Ok(self.root.join(key))
    }

    fn describe(&self, key: &str, path: &Path) -> Result<DatasetEntry, Status> {
        let file = File::open(path).map_err(|e| io_status(path, e))?;
        let total_bytes = file
            .metadata()
            .map_err(|e| io_status(path, e))?
            .len() as i64;

        let builder = ParquetRecordBatchReaderBuilder::try_new(file)
            .map_err(|e| Status::internal(format!("Failed to open {}: {}", key, e)))?;

        Ok(DatasetEntry {
            key: key.to_string(),
            schema: builder.schema().clone(),
            total_records: builder.metadata().file_metadata().num_rows(),
            total_bytes,
        })
    }
}

fn io_status(path: &Path, e: std::io::Error) -> Status {
    match e.kind() {
        ErrorKind::NotFound => Status::not_found(format!("Dataset {} not found", path.display())),
        _ => Status::internal(format!("I/O error on {}: {}", path.display(), e)),
    }
}

#[async_trait]
impl DatasetStore for ParquetDirStore {
    async fn list(&self) -> Result<Vec<DatasetEntry>, Status> {
        let mut entries = Vec::new();
        for dir_entry in fs::read_dir(&self.root).map_err(|e| io_status(&self.root, e))? {
            let path = dir_entry.map_err(|e| io_status(&self.root, e))?.path();
            let is_parquet =
                path.extension().and_then(|ext| ext.to_str()) == Some(PARQUET_EXTENSION);
            if !path.is_file() || !is_parquet {
                continue;
            }
            let Some(key) = path.file_name().and_then(|name| name.to_str()) else {
                continue;
            };
            entries.push(self.describe(key, &path)?);
        }
        entries.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(entries)
    }

    async fn entry(&self, key: &str) -> Result<DatasetEntry, Status> {
        let path = self.path_for(key)?;
        self.describe(key, &path)
    }

    async fn write(
        &self,
        key: &str,
        schema: SchemaRef,
        batches: Vec<RecordBatch>,
    ) -> Result<(), Status> {
        let path = self.path_for(key)?;
        let file = File::create(&path).map_err(|e| io_status(&path, e))?;

        let props = WriterProperties::builder()
            .set_max_row_group_size(MAX_ROW_GROUP_SIZE)
            .build();
        let mut writer = ArrowWriter::try_new(file, schema, Some(props))
            .map_err(|e| Status::internal(format!("Failed to create writer for {}: {}", key, e)))?;

        let mut rows = 0;
        for batch in &batches {
            writer
                .write(batch)
                .map_err(|e| Status::internal(format!("Failed to write {}: {}", key, e)))?;
            rows += batch.num_rows();
        }
        writer
            .close()
            .map_err(|e| Status::internal(format!("Failed to finish {}: {}", key, e)))?;

        debug!("Stored {} rows in {} batches as {}", rows, batches.len(), path.display());
        Ok(())
    }

    async fn read(&self, key: &str) -> Result<(SchemaRef, Vec<RecordBatch>), Status> {
        let path = self.path_for(key)?;
        let file = File::open(&path).map_err(|e| io_status(&path, e))?;

        let builder = ParquetRecordBatchReaderBuilder::try_new(file)
            .map_err(|e| Status::internal(format!("Failed to open {}: {}", key, e)))?;
        let schema = builder.schema().clone();
        let reader = builder
            .build()
            .map_err(|e| Status::internal(format!("Failed to read {}: {}", key, e)))?;

        let batches = reader
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| Status::internal(format!("Failed to decode {}: {}", key, e)))?;
        Ok((schema, batches))
    }

    async fn delete(&self, key: &str) -> Result<(), Status> {
        let path = self.path_for(key)?;
        fs::remove_file(&path).map_err(|e| io_status(&path, e))?;
        debug!("Deleted {}", path.display());
        Ok(())
    }
}
