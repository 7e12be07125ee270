//! Hive-partitioned Parquet datasets: listing, discovery and scanning.

use super::{format_schema, load_airquality};
use crate::BoxError;
use arrow::datatypes::{DataType, SchemaRef};
use arrow::record_batch::RecordBatch;
use cookbook_core::RecipeLedger;
use datafusion::dataframe::DataFrameWriteOptions;
use datafusion::prelude::{DataFrame, ParquetReadOptions, SessionContext};
use std::fmt::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// How many data files `ListPartitionedDataset` prints before writing `...`.
const MAX_LISTED_FILES: usize = 10;

const DATASET_TABLE: &str = "airquality";

fn partition_cols() -> Vec<(String, DataType)> {
    vec![
        ("Month".to_string(), DataType::Int32),
        ("Day".to_string(), DataType::Int32),
    ]
}

fn dir_url(dir: &Path) -> String {
    format!("{}/", dir.display())
}

/// Writes the airquality fixture under `base_dir` as `Month=M/Day=D/*.parquet`.
pub async fn write_partitioned_airquality(base_dir: &Path) -> Result<(), BoxError> {
    let ctx = SessionContext::new();
    let df = ctx.read_batches(load_airquality()?)?;
    let options = DataFrameWriteOptions::new()
        .with_partition_by(partition_cols().into_iter().map(|(name, _)| name).collect());
    df.write_parquet(&dir_url(base_dir), options, None).await?;
    Ok(())
}

/// Data files under `base_dir`, relative to it, in sorted order.
pub fn list_dataset_files(base_dir: &Path) -> Result<Vec<String>, BoxError> {
    let pattern = format!("{}/**/*.parquet", base_dir.display());
    let mut files = Vec::new();
    for entry in glob::glob(&pattern)? {
        let path = entry?;
        if !path.is_file() {
            continue;
        }
        let relative = path.strip_prefix(base_dir)?;
        files.push(format!("/{}", relative.display()));
    }
    files.sort();
    Ok(files)
}

pub fn list_partitioned_dataset(
    rout: &mut RecipeLedger,
    base_dir: &Path,
) -> Result<Vec<String>, BoxError> {
    rout.start_recipe("ListPartitionedDataset");
    let files = list_dataset_files(base_dir)?;
    for file in files.iter().take(MAX_LISTED_FILES) {
        writeln!(rout, "{}", file)?;
    }
    // The cutoff is reached as soon as the tenth file is printed
    if files.len() >= MAX_LISTED_FILES {
        writeln!(rout, "...")?;
    }
    rout.end_recipe("ListPartitionedDataset");
    Ok(files)
}

pub async fn creating_a_dataset(
    rout: &mut RecipeLedger,
    ctx: &SessionContext,
    base_dir: &Path,
) -> Result<(DataFrame, SchemaRef), BoxError> {
    rout.start_recipe("CreatingADataset");
    // Partition values are parsed from the directory names
    let options = ParquetReadOptions::default().table_partition_cols(partition_cols());
    ctx.register_parquet(DATASET_TABLE, &dir_url(base_dir), options).await?;

    let dataset = ctx.table(DATASET_TABLE).await?;
    let schema: SchemaRef = Arc::new(dataset.schema().as_arrow().clone());
    writeln!(rout, "We discovered the following schema for the dataset:")?;
    writeln!(rout)?;
    writeln!(rout, "{}", format_schema(&schema))?;
    rout.end_recipe("CreatingADataset");
    Ok((dataset, schema))
}

pub async fn scanning_a_dataset(
    rout: &mut RecipeLedger,
    dataset: DataFrame,
) -> Result<Vec<RecordBatch>, BoxError> {
    rout.start_recipe("ScanningADataset");
    let num_columns = dataset.schema().fields().len();
    let batches = dataset.collect().await?;
    let num_rows: usize = batches.iter().map(|b| b.num_rows()).sum();
    write!(rout, "Read in a table with {} rows and {} columns", num_rows, num_columns)?;
    rout.end_recipe("ScanningADataset");
    Ok(batches)
}

pub async fn run(rout: &mut RecipeLedger) -> Result<(), BoxError> {
    let scratch = tempfile::tempdir()?;
    let base_dir: PathBuf = scratch.path().join("airquality_partitioned");
    write_partitioned_airquality(&base_dir).await?;

    list_partitioned_dataset(rout, &base_dir)?;
    let ctx = SessionContext::new();
    let (dataset, _) = creating_a_dataset(rout, &ctx, &base_dir).await?;
    scanning_a_dataset(rout, dataset).await?;
    Ok(())
}
