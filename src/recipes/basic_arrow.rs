//! Error propagation and type dispatch over array columns.

use crate::BoxError;
use arrow::array::{Array, ArrayRef, AsArray, Float64Array, Int32Array};
use arrow::datatypes::{
    DataType, Field, Float32Type, Float64Type, Int16Type, Int32Type, Int64Type, Int8Type,
    Schema, SchemaRef, UInt16Type, UInt32Type, UInt64Type, UInt8Type,
};
use arrow::error::ArrowError;
use arrow::record_batch::RecordBatch;
use cookbook_core::RecipeLedger;
use std::fmt::Write;
use std::sync::Arc;

fn two_column_schema() -> SchemaRef {
    Arc::new(Schema::new(vec![
        Field::new("a", DataType::Int32, false),
        Field::new("b", DataType::Float64, false),
    ]))
}

/// Columns of different lengths, which `RecordBatch::try_new` rejects.
fn mismatched_columns() -> Vec<ArrayRef> {
    vec![
        Arc::new(Int32Array::from(vec![1, 2, 3])),
        Arc::new(Float64Array::from(vec![4.0, 5.0])),
    ]
}

fn status_line(result: &Result<(), BoxError>) -> String {
    match result {
        Ok(()) => "OK".to_string(),
        Err(e) => e.to_string(),
    }
}

pub fn return_not_ok_no_macro(rout: &mut RecipeLedger) -> Result<(), BoxError> {
    rout.start_recipe("ReturnNotOkNoMacro");
    fn build(rout: &mut RecipeLedger) -> Result<(), BoxError> {
        let batch = match RecordBatch::try_new(two_column_schema(), mismatched_columns()) {
            Ok(batch) => batch,
            // Tedious return value check
            Err(e) => return Err(e.into()),
        };
        writeln!(rout, "Built a batch of {} rows?", batch.num_rows())?;
        Ok(())
    }
    let result = build(rout);
    writeln!(rout, "{}", status_line(&result))?;
    rout.end_recipe("ReturnNotOkNoMacro");
    Ok(())
}

pub fn return_not_ok(rout: &mut RecipeLedger) -> Result<(), BoxError> {
    rout.start_recipe("ReturnNotOk");
    fn build(rout: &mut RecipeLedger) -> Result<(), BoxError> {
        let batch = RecordBatch::try_new(two_column_schema(), mismatched_columns())?;
        writeln!(rout, "Built a batch of {} rows?", batch.num_rows())?;
        Ok(())
    }
    let result = build(rout);
    writeln!(rout, "{}", status_line(&result))?;
    rout.end_recipe("ReturnNotOk");
    Ok(())
}

/// Sums every numeric value of a batch, skipping nulls.
///
/// Integer and floating point columns are supported; anything else,
/// decimals included, is `NotYetImplemented`.
#[derive(Debug, Default)]
pub struct TableSummation {
    partial: f64,
}

macro_rules! sum_primitive {
    ($array:expr, $t:ty) => {
        $array
            .as_primitive::<$t>()
            .iter()
            .flatten()
            .map(|value| value as f64)
            .sum::<f64>()
    };
}

impl TableSummation {
    pub fn compute(&mut self, batch: &RecordBatch) -> Result<f64, ArrowError> {
        for column in batch.columns() {
            self.visit(column.as_ref())?;
        }
        Ok(self.partial)
    }

    fn visit(&mut self, array: &dyn Array) -> Result<(), ArrowError> {
        self.partial += match array.data_type() {
            DataType::Int8 => sum_primitive!(array, Int8Type),
            DataType::Int16 => sum_primitive!(array, Int16Type),
            DataType::Int32 => sum_primitive!(array, Int32Type),
            DataType::Int64 => sum_primitive!(array, Int64Type),
            DataType::UInt8 => sum_primitive!(array, UInt8Type),
            DataType::UInt16 => sum_primitive!(array, UInt16Type),
            DataType::UInt32 => sum_primitive!(array, UInt32Type),
            DataType::UInt64 => sum_primitive!(array, UInt64Type),
            DataType::Float32 => sum_primitive!(array, Float32Type),
            DataType::Float64 => sum_primitive!(array, Float64Type),
            other => {
                return Err(ArrowError::NotYetImplemented(format!(
                    "Can not compute sum for array of type {}",
                    other
                )))
            }
        };
        Ok(())
    }
}

pub fn visitor_summation_example(rout: &mut RecipeLedger) -> Result<f64, BoxError> {
    rout.start_recipe("VisitorSummationExample");
    let batch = RecordBatch::try_new(
        two_column_schema(),
        vec![
            Arc::new(Int32Array::from(vec![1, 2, 3])),
            Arc::new(Float64Array::from(vec![4.0, 5.0, 6.0])),
        ],
    )?;

    let total = TableSummation::default().compute(&batch)?;
    write!(rout, "Total is {}", total)?;
    rout.end_recipe("VisitorSummationExample");
    Ok(total)
}

pub fn run(rout: &mut RecipeLedger) -> Result<(), BoxError> {
    return_not_ok_no_macro(rout)?;
    return_not_ok(rout)?;
    visitor_summation_example(rout)?;
    Ok(())
}
