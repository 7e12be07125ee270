use crate::BoxError;
use arrow::array::{
    ArrayRef, Float64Array, Float64Builder, Int32Array, Int32Builder, Int64Builder, StringArray,
};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use arrow::util::pretty::pretty_format_batches;
use cookbook_core::RecipeLedger;
use std::fmt::Write;
use std::sync::Arc;

pub fn creating_arrays(rout: &mut RecipeLedger) -> Result<ArrayRef, BoxError> {
    rout.start_recipe("CreatingArrays");
    let mut builder = Int32Builder::new();
    builder.append_value(1);
    builder.append_value(2);
    builder.append_value(3);
    let arr: ArrayRef = Arc::new(builder.finish());
    writeln!(rout, "{:?}", arr)?;
    rout.end_recipe("CreatingArrays");
    Ok(arr)
}

/// Builds arrays from a slice, a vector and an iterator.
pub fn creating_arrays_from_collections(
    rout: &mut RecipeLedger,
) -> Result<Vec<ArrayRef>, BoxError> {
    rout.start_recipe("CreatingArraysPtr");
    // Slices
    let mut long_builder = Int64Builder::new();
    let values: [i64; 4] = [1, 2, 3, 4];
    long_builder.append_slice(&values);
    let longs: ArrayRef = Arc::new(long_builder.finish());
    writeln!(rout, "{:?}", longs)?;

    // Vectors
    let strvals = vec!["x", "y", "z"];
    let strings: ArrayRef = Arc::new(StringArray::from(strvals));
    writeln!(rout, "{:?}", strings)?;

    // Iterators; the duplicate collapses like an ordered set would
    let mut dblvals = vec![1.1, 1.1, 2.3];
    dblvals.dedup();
    let mut dbl_builder = Float64Builder::with_capacity(dblvals.len());
    dbl_builder.extend(dblvals.into_iter().map(Some));
    let doubles: ArrayRef = Arc::new(dbl_builder.finish());
    writeln!(rout, "{:?}", doubles)?;
    rout.end_recipe("CreatingArraysPtr");
    Ok(vec![longs, strings, doubles])
}

pub fn creating_record_batches(rout: &mut RecipeLedger) -> Result<RecordBatch, BoxError> {
    rout.start_recipe("CreatingRecordBatches");
    let schema = Arc::new(Schema::new(vec![
        Field::new("day", DataType::Int32, false),
        Field::new("month", DataType::Int32, false),
        Field::new("temperature", DataType::Float64, true),
    ]));

    let mut days = Int32Builder::new();
    days.append_slice(&[1, 12, 17, 23, 28]);
    let months: ArrayRef = Arc::new(Int32Array::from(vec![1, 3, 5, 7, 1]));
    let temperatures =
        Float64Array::from(vec![Some(14.5), None, Some(21.0), Some(29.5), Some(6.25)]);

    let batch = RecordBatch::try_new(
        schema,
        vec![Arc::new(days.finish()), months, Arc::new(temperatures)],
    )?;
    writeln!(rout, "{}", pretty_format_batches(&[batch.clone()])?)?;
    rout.end_recipe("CreatingRecordBatches");
    Ok(batch)
}

pub fn run(rout: &mut RecipeLedger) -> Result<(), BoxError> {
    creating_arrays(rout)?;
    creating_arrays_from_collections(rout)?;
    creating_record_batches(rout)?;
    Ok(())
}
