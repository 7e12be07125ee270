//! Reading and writing Arrow IPC and Parquet, both on disk and in memory.

use crate::BoxError;
use arrow::array::{Int32Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::ipc::reader::{FileReader, StreamReader};
use arrow::ipc::writer::{FileWriter, StreamWriter};
use arrow::record_batch::RecordBatch;
use cookbook_core::RecipeLedger;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use std::fmt::Write;
use std::fs::File;
use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;

fn sample_batches() -> Result<Vec<RecordBatch>, BoxError> {
    let schema = Arc::new(Schema::new(vec![
        Field::new("id", DataType::Int32, false),
        Field::new("city", DataType::Utf8, true),
    ]));
    let first = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(Int32Array::from(vec![1, 2, 3])),
            Arc::new(StringArray::from(vec![Some("Lisbon"), Some("Oslo"), None])),
        ],
    )?;
    let second = RecordBatch::try_new(
        schema,
        vec![
            Arc::new(Int32Array::from(vec![4, 5])),
            Arc::new(StringArray::from(vec![Some("Quito"), Some("Hanoi")])),
        ],
    )?;
    Ok(vec![first, second])
}

fn total_rows(batches: &[RecordBatch]) -> usize {
    batches.iter().map(|b| b.num_rows()).sum()
}

/// Random access IPC format, to a file and to a buffer.
pub fn ipc_file(rout: &mut RecipeLedger, dir: &Path) -> Result<Vec<RecordBatch>, BoxError> {
    let batches = sample_batches()?;
    let schema = batches[0].schema();
    let path = dir.join("cities.arrow");

    rout.start_recipe("WriteIpcFile");
    let mut writer = FileWriter::try_new(File::create(&path)?, &schema)?;
    for batch in &batches {
        writer.write(batch)?;
    }
    writer.finish()?;

    let mut buffer_writer = FileWriter::try_new(Vec::new(), &schema)?;
    for batch in &batches {
        buffer_writer.write(batch)?;
    }
    let buffer = buffer_writer.into_inner()?;
    writeln!(
        rout,
        "Wrote {} batches ({} rows) to a file and to a buffer",
        batches.len(),
        total_rows(&batches)
    )?;
    rout.end_recipe("WriteIpcFile");

    rout.start_recipe("ReadIpcFile");
    let mut reader = FileReader::try_new(File::open(&path)?, None)?;
    writeln!(rout, "File has {} batches", reader.num_batches())?;
    // Random access: read the last batch first
    reader.set_index(reader.num_batches() - 1)?;
    if let Some(last) = reader.next() {
        writeln!(rout, "Last batch has {} rows", last?.num_rows())?;
    }

    let from_buffer = FileReader::try_new(Cursor::new(buffer), None)?
        .collect::<Result<Vec<_>, _>>()?;
    writeln!(rout, "Read {} rows from the buffer", total_rows(&from_buffer))?;
    rout.end_recipe("ReadIpcFile");
    Ok(from_buffer)
}

/// Streaming IPC format, to a file and to a buffer.
pub fn ipc_stream(rout: &mut RecipeLedger, dir: &Path) -> Result<Vec<RecordBatch>, BoxError> {
    let batches = sample_batches()?;
    let schema = batches[0].schema();
    let path = dir.join("cities.arrows");

    rout.start_recipe("WriteIpcStream");
    let mut writer = StreamWriter::try_new(File::create(&path)?, &schema)?;
    for batch in &batches {
        writer.write(batch)?;
    }
    writer.finish()?;

    let mut buffer_writer = StreamWriter::try_new(Vec::new(), &schema)?;
    for batch in &batches {
        buffer_writer.write(batch)?;
    }
    let buffer = buffer_writer.into_inner()?;
    writeln!(
        rout,
        "Wrote {} batches ({} rows) to a stream file and to a buffer",
        batches.len(),
        total_rows(&batches)
    )?;
    rout.end_recipe("WriteIpcStream");

    rout.start_recipe("ReadIpcStream");
    let from_file = StreamReader::try_new(File::open(&path)?, None)?
        .collect::<Result<Vec<_>, _>>()?;
    writeln!(rout, "Read {} batches from the stream file", from_file.len())?;

    let from_buffer = StreamReader::try_new(Cursor::new(buffer), None)?
        .collect::<Result<Vec<_>, _>>()?;
    writeln!(rout, "Read {} rows from the buffer", total_rows(&from_buffer))?;
    rout.end_recipe("ReadIpcStream");
    Ok(from_file)
}

pub fn parquet_file(rout: &mut RecipeLedger, dir: &Path) -> Result<Vec<RecordBatch>, BoxError> {
    let batches = sample_batches()?;
    let path = dir.join("cities.parquet");

    rout.start_recipe("WriteParquetFile");
    let mut writer = ArrowWriter::try_new(File::create(&path)?, batches[0].schema(), None)?;
    for batch in &batches {
        writer.write(batch)?;
    }
    let metadata = writer.close()?;
    writeln!(rout, "Wrote {} rows in {} row groups", metadata.num_rows, metadata.row_groups.len())?;
    rout.end_recipe("WriteParquetFile");

    rout.start_recipe("ReadParquetFile");
    let builder = ParquetRecordBatchReaderBuilder::try_new(File::open(&path)?)?;
    writeln!(rout, "Parquet schema has {} columns", builder.schema().fields().len())?;
    let read = builder.build()?.collect::<Result<Vec<_>, _>>()?;
    writeln!(rout, "Read {} rows", total_rows(&read))?;
    rout.end_recipe("ReadParquetFile");
    Ok(read)
}

pub fn run(rout: &mut RecipeLedger) -> Result<(), BoxError> {
    let dir = tempfile::tempdir()?;
    ipc_file(rout, dir.path())?;
    ipc_stream(rout, dir.path())?;
    parquet_file(rout, dir.path())?;
    Ok(())
}
