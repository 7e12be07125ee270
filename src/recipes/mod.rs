//! Runnable recipes.
//!
//! Every recipe brackets its work with `start_recipe`/`end_recipe` on the
//! [`RecipeLedger`] it is handed and writes what it wants shown in the
//! documentation with `writeln!(rout, ...)`.

pub mod basic_arrow;
pub mod compute_fn;
pub mod creating_arrow_objects;
pub mod data_manipulation;
pub mod datasets;
pub mod flight;
pub mod io;
pub mod schema_definition;

use crate::config::CookbookSettings;
use crate::BoxError;
use arrow::csv::ReaderBuilder;
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use arrow::record_batch::RecordBatch;
use cookbook_core::{find_test_data_file, RecipeLedger};
use std::fs::File;
use std::sync::Arc;
use tracing::info;

/// Fixture shared by the dataset and Flight recipes.
pub const AIRQUALITY_CSV: &str = "airquality.csv";

pub fn airquality_schema() -> SchemaRef {
    Arc::new(Schema::new(vec![
        Field::new("Ozone", DataType::Int32, true),
        Field::new("Solar_R", DataType::Int32, true),
        Field::new("Wind", DataType::Float64, true),
        Field::new("Temp", DataType::Int32, true),
        Field::new("Month", DataType::Int32, true),
        Field::new("Day", DataType::Int32, true),
    ]))
}

/// Reads the airquality fixture; empty CSV fields become nulls.
pub fn load_airquality() -> Result<Vec<RecordBatch>, BoxError> {
    let path = find_test_data_file(AIRQUALITY_CSV)?;
    let reader = ReaderBuilder::new(airquality_schema())
        .with_header(true)
        .build(File::open(&path)?)?;
    Ok(reader.collect::<Result<Vec<_>, _>>()?)
}

/// One `name: type` line per field.
pub fn format_schema(schema: &Schema) -> String {
    schema
        .fields()
        .iter()
        .map(|field| format!("{}: {}", field.name(), field.data_type()))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Runs every recipe in documentation order.
pub async fn run_all(rout: &mut RecipeLedger, settings: &CookbookSettings) -> Result<(), BoxError> {
    basic_arrow::run(rout)?;
    creating_arrow_objects::run(rout)?;
    schema_definition::run(rout)?;
    data_manipulation::run(rout)?;
    io::run(rout)?;
    compute_fn::run(rout).await?;
    datasets::run(rout).await?;
    flight::run(rout, &settings.flight).await?;

    info!("Ran {} recipes", rout.runs().len());
    Ok(())
}
