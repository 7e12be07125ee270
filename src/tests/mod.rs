use crate::config::{CookbookSettings, FlightSettings, LoggingSettings, OutputSettings};
use crate::recipes::{basic_arrow, run_all};
use cookbook_core::{RecipeLedger, RecipeTable};
use std::path::Path;

/// Every recipe name `run_all` records, in documentation order.
const ALL_RECIPES: &[&str] = &[
    "ReturnNotOkNoMacro",
    "ReturnNotOk",
    "VisitorSummationExample",
    "CreatingArrays",
    "CreatingArraysPtr",
    "CreatingRecordBatches",
    "DefiningSchema",
    "SchemaToJson",
    "CompareVectorFields",
    "CompareValuesAtIndices",
    "LinearSearch",
    "BinarySearch",
    "SortArray",
    "SortToIndices",
    "WriteIpcFile",
    "ReadIpcFile",
    "WriteIpcStream",
    "ReadIpcStream",
    "WriteParquetFile",
    "ReadParquetFile",
    "DefineAComputeKernel",
    "AddKernelsToFunction",
    "RegisterAndCallComputeFunction",
    "ListPartitionedDataset",
    "CreatingADataset",
    "ScanningADataset",
    "ParquetStorageService::StartServer",
    "ParquetStorageService::Connect",
    "ParquetStorageService::DoPut",
    "ParquetStorageService::GetFlightInfo",
    "ParquetStorageService::DoGet",
    "ParquetStorageService::DoAction",
    "ParquetStorageService::ListFlights",
    "ParquetStorageService::StopServer",
    "TestClientOptions::Connect",
];

fn settings_in(dir: &Path) -> CookbookSettings {
    CookbookSettings {
        output: OutputSettings {
            path: dir.join("recipes_out.arrow"),
        },
        flight: FlightSettings {
            host: "127.0.0.1".to_string(),
            root: dir.join("flight_datasets"),
        },
        logging: LoggingSettings {
            filter: "info".to_string(),
        },
    }
}

#[tokio::test]
async fn test_run_all_records_every_recipe() {
    let dir = tempfile::tempdir().unwrap();
    let settings = settings_in(dir.path());
    let mut rout = RecipeLedger::new();

    run_all(&mut rout, &settings).await.unwrap();

    let names: Vec<_> = rout.runs().iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, ALL_RECIPES);
    assert!(rout.active_recipe().is_none());

    let table = rout.dump_to_file(&settings.output.path).unwrap();
    assert_eq!(table.num_rows(), ALL_RECIPES.len());
    assert_eq!(table.output_of("VisitorSummationExample"), Some("Total is 21"));
    assert_eq!(
        table.output_of("ScanningADataset"),
        Some("Read in a table with 36 rows and 6 columns")
    );
}

#[tokio::test]
async fn test_partial_rerun_keeps_other_recipes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("recipes_out.arrow");

    let earlier = RecipeTable::from_rows([
        ("CreatingArrays", "stale output"),
        ("VisitorSummationExample", "Total is 0"),
    ])
    .unwrap();
    earlier.persist(&path).unwrap();

    let mut rout = RecipeLedger::new();
    basic_arrow::run(&mut rout).unwrap();
    let merged = rout.dump_to_file(&path).unwrap();

    // Two earlier recipes, one re-run, plus two new
    assert_eq!(merged.num_rows(), 4);
    assert_eq!(merged.output_of("CreatingArrays"), Some("stale output"));
    assert_eq!(merged.output_of("VisitorSummationExample"), Some("Total is 21"));
    assert_eq!(RecipeTable::load_existing(&path).unwrap(), merged);
}
