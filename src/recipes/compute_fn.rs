//! A custom scalar function: a row hash kernel, a named function grouping
//! type-specialized kernels, and registration with a DataFusion session.

use crate::BoxError;
use arrow::array::{Array, ArrayRef, AsArray, Int32Array, UInt32Array};
use arrow::datatypes::{DataType, Field, Int32Type, Int64Type, Schema};
use arrow::error::ArrowError;
use arrow::record_batch::RecordBatch;
use arrow::util::pretty::pretty_format_columns;
use cookbook_core::RecipeLedger;
use datafusion::error::{DataFusionError, Result as DataFusionResult};
use datafusion::execution::FunctionRegistry;
use datafusion::logical_expr::{
    ColumnarValue, ScalarFunctionArgs, ScalarUDF, ScalarUDFImpl, Signature, Volatility,
};
use datafusion::prelude::{col, SessionContext};
use std::any::Any;
use std::fmt::Write;
use std::sync::Arc;

pub const NAMED_SCALAR_FN: &str = "named_scalar_fn";

const PRIME32_1: u32 = 0x9E37_79B1;
const PRIME32_2: u32 = 0x85EB_CA77;
const PRIME32_3: u32 = 0xC2B2_AE3D;
const PRIME32_4: u32 = 0x27D4_EB2F;
const PRIME32_5: u32 = 0x1656_67B1;

/// 32-bit xxHash of a short key (under 16 bytes), seed 0.
fn hash32(bytes: &[u8]) -> u32 {
    let mut h = PRIME32_5.wrapping_add(bytes.len() as u32);

    let mut chunks = bytes.chunks_exact(4);
    for chunk in &mut chunks {
        let lane = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        h = h.wrapping_add(lane.wrapping_mul(PRIME32_3));
        h = h.rotate_left(17).wrapping_mul(PRIME32_4);
    }
    for &byte in chunks.remainder() {
        h = h.wrapping_add((byte as u32).wrapping_mul(PRIME32_5));
        h = h.rotate_left(11).wrapping_mul(PRIME32_1);
    }

    h ^= h >> 15;
    h = h.wrapping_mul(PRIME32_2);
    h ^= h >> 13;
    h = h.wrapping_mul(PRIME32_3);
    h ^ (h >> 16)
}

/// Hashes every row of an Int32 array. Null rows stay null.
pub fn hash_int32_kernel(input: &ArrayRef) -> Result<ArrayRef, ArrowError> {
    let values = input.as_primitive_opt::<Int32Type>().ok_or_else(|| {
        ArrowError::InvalidArgumentError(format!("Expected Int32 input, got {}", input.data_type()))
    })?;
    let hashes: UInt32Array = values.iter().map(|v| v.map(|v| hash32(&v.to_le_bytes()))).collect();
    Ok(Arc::new(hashes))
}

/// Hashes every row of an Int64 array. Null rows stay null.
pub fn hash_int64_kernel(input: &ArrayRef) -> Result<ArrayRef, ArrowError> {
    let values = input.as_primitive_opt::<Int64Type>().ok_or_else(|| {
        ArrowError::InvalidArgumentError(format!("Expected Int64 input, got {}", input.data_type()))
    })?;
    let hashes: UInt32Array = values.iter().map(|v| v.map(|v| hash32(&v.to_le_bytes()))).collect();
    Ok(Arc::new(hashes))
}

/// Short description, long description and argument names of a function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionDoc {
    pub summary: &'static str,
    pub description: &'static str,
    pub arg_names: &'static [&'static str],
}

pub const NAMED_SCALAR_FN_DOC: FunctionDoc = FunctionDoc {
    summary: "Unary function that calculates a hash for each row of the input",
    description: "This function uses an xxHash-like algorithm which produces 32-bit hashes.",
    arg_names: &["input_array"],
};

type KernelFn = fn(&ArrayRef) -> Result<ArrayRef, ArrowError>;

/// An implementation selected by exact input type.
#[derive(Debug, Clone)]
pub struct ScalarKernel {
    pub input: DataType,
    pub output: DataType,
    pub exec: KernelFn,
}

/// A unary scalar function dispatching to its kernels by input type.
#[derive(Debug)]
pub struct NamedScalarFn {
    name: String,
    doc: FunctionDoc,
    kernels: Vec<ScalarKernel>,
    signature: Signature,
}

impl NamedScalarFn {
    pub fn new(name: impl Into<String>, doc: FunctionDoc) -> Self {
        Self {
            name: name.into(),
            doc,
            kernels: Vec::new(),
            signature: Signature::uniform(1, vec![], Volatility::Immutable),
        }
    }

    /// Adds a kernel; an input type may only be registered once.
    pub fn add_kernel(&mut self, kernel: ScalarKernel) -> Result<(), ArrowError> {
        if self.kernel_for(&kernel.input).is_some() {
            return Err(ArrowError::InvalidArgumentError(format!(
                "Function {} already has a kernel for {}",
                self.name, kernel.input
            )));
        }
        self.kernels.push(kernel);
        let inputs = self.kernels.iter().map(|k| k.input.clone()).collect();
        self.signature = Signature::uniform(1, inputs, Volatility::Immutable);
        Ok(())
    }

    pub fn doc(&self) -> &FunctionDoc {
        &self.doc
    }

    pub fn kernels(&self) -> &[ScalarKernel] {
        &self.kernels
    }

    fn kernel_for(&self, input: &DataType) -> Option<&ScalarKernel> {
        self.kernels.iter().find(|k| &k.input == input)
    }
}

impl ScalarUDFImpl for NamedScalarFn {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn signature(&self) -> &Signature {
        &self.signature
    }

    fn return_type(&self, arg_types: &[DataType]) -> DataFusionResult<DataType> {
        match arg_types {
            [input] => self
                .kernel_for(input)
                .map(|k| k.output.clone())
                .ok_or_else(|| {
                    DataFusionError::Plan(format!("{} has no kernel for {}", self.name, input))
                }),
            _ => Err(DataFusionError::Plan(format!(
                "{} takes exactly one argument, got {}",
                self.name,
                arg_types.len()
            ))),
        }
    }

    fn invoke_with_args(&self, args: ScalarFunctionArgs) -> DataFusionResult<ColumnarValue> {
        let arrays = ColumnarValue::values_to_arrays(&args.args)?;
        let [input] = arrays.as_slice() else {
            return Err(DataFusionError::Execution(format!(
                "{} takes exactly one argument, got {}",
                self.name,
                arrays.len()
            )));
        };
        let kernel = self.kernel_for(input.data_type()).ok_or_else(|| {
            DataFusionError::Execution(format!(
                "{} has no kernel for {}",
                self.name,
                input.data_type()
            ))
        })?;
        Ok(ColumnarValue::Array((kernel.exec)(input)?))
    }
}

fn fibonacci_batch() -> Result<RecordBatch, ArrowError> {
    let schema = Arc::new(Schema::new(vec![Field::new("input_array", DataType::Int32, false)]));
    RecordBatch::try_new(
        schema,
        vec![Arc::new(Int32Array::from(vec![0, 1, 1, 2, 3, 5, 8, 13, 21, 34]))],
    )
}

pub fn define_a_compute_kernel(rout: &mut RecipeLedger) -> Result<ArrayRef, BoxError> {
    rout.start_recipe("DefineAComputeKernel");
    let input: ArrayRef = Arc::new(Int32Array::from(vec![Some(7), None, Some(7)]));
    let hashes = hash_int32_kernel(&input)?;
    writeln!(rout, "{}", pretty_format_columns("hash", &[hashes.clone()])?)?;
    rout.end_recipe("DefineAComputeKernel");
    Ok(hashes)
}

pub fn add_kernels_to_function(rout: &mut RecipeLedger) -> Result<NamedScalarFn, BoxError> {
    rout.start_recipe("AddKernelsToFunction");
    let mut function = NamedScalarFn::new(NAMED_SCALAR_FN, NAMED_SCALAR_FN_DOC);
    function.add_kernel(ScalarKernel {
        input: DataType::Int32,
        output: DataType::UInt32,
        exec: hash_int32_kernel,
    })?;
    function.add_kernel(ScalarKernel {
        input: DataType::Int64,
        output: DataType::UInt32,
        exec: hash_int64_kernel,
    })?;

    writeln!(rout, "{}: {}", function.name(), function.doc().summary)?;
    for kernel in function.kernels() {
        writeln!(rout, "  ({}) -> {}", kernel.input, kernel.output)?;
    }
    rout.end_recipe("AddKernelsToFunction");
    Ok(function)
}

pub async fn register_and_call_compute_function(
    rout: &mut RecipeLedger,
    function: NamedScalarFn,
) -> Result<ArrayRef, BoxError> {
    let batch = fibonacci_batch()?;

    rout.start_recipe("RegisterAndCallComputeFunction");
    let ctx = SessionContext::new();
    ctx.register_udf(ScalarUDF::new_from_impl(function));

    // Look the function up by name, as a caller without the impl would
    let udf = ctx.udf(NAMED_SCALAR_FN)?;
    let results = ctx
        .read_batch(batch)?
        .select(vec![udf.call(vec![col("input_array")]).alias("hash")])?
        .collect()
        .await?;

    let hashes = results
        .first()
        .map(|b| b.column(0).clone())
        .ok_or_else(|| DataFusionError::Execution("No output batch".to_string()))?;
    writeln!(rout, "Success:")?;
    writeln!(rout, "{}", pretty_format_columns("hash", &[hashes.clone()])?)?;
    rout.end_recipe("RegisterAndCallComputeFunction");
    Ok(hashes)
}

pub async fn run(rout: &mut RecipeLedger) -> Result<(), BoxError> {
    define_a_compute_kernel(rout)?;
    let function = add_kernels_to_function(rout)?;
    register_and_call_compute_function(rout, function).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::Int64Array;
    use arrow::datatypes::UInt32Type;

    #[test]
    fn test_hash_is_deterministic_and_spreads() {
        assert_eq!(hash32(&7i32.to_le_bytes()), hash32(&7i32.to_le_bytes()));
        assert_ne!(hash32(&0i32.to_le_bytes()), hash32(&1i32.to_le_bytes()));
        assert_ne!(hash32(&1i32.to_le_bytes()), hash32(&1i64.to_le_bytes()));
    }

    #[test]
    fn test_kernel_keeps_nulls() {
        let mut rout = RecipeLedger::new();
        let hashes = define_a_compute_kernel(&mut rout).unwrap();
        let hashes = hashes.as_primitive::<UInt32Type>();
        assert_eq!(hashes.len(), 3);
        assert!(hashes.is_null(1));
        assert_eq!(hashes.value(0), hashes.value(2));
    }

    #[test]
    fn test_kernel_rejects_wrong_type() {
        let input: ArrayRef = Arc::new(Int64Array::from(vec![1]));
        assert!(hash_int32_kernel(&input).is_err());
    }

    #[test]
    fn test_duplicate_kernel_is_rejected() {
        let mut rout = RecipeLedger::new();
        let mut function = add_kernels_to_function(&mut rout).unwrap();
        let err = function
            .add_kernel(ScalarKernel {
                input: DataType::Int32,
                output: DataType::UInt32,
                exec: hash_int32_kernel,
            })
            .unwrap_err();
        assert!(err.to_string().contains("already has a kernel for Int32"));
        assert_eq!(function.doc().arg_names, &["input_array"]);
        assert!(rout.runs()[0].output.contains("(Int64) -> UInt32"));
    }

    #[tokio::test]
    async fn test_register_and_call_by_name() {
        let mut rout = RecipeLedger::new();
        let function = add_kernels_to_function(&mut rout).unwrap();
        let hashes = register_and_call_compute_function(&mut rout, function).await.unwrap();

        let hashes = hashes.as_primitive::<UInt32Type>();
        assert_eq!(hashes.len(), 10);
        assert_eq!(hashes.null_count(), 0);
        // Fibonacci starts 0, 1, 1
        assert_ne!(hashes.value(0), hashes.value(1));
        assert_eq!(hashes.value(1), hashes.value(2));
        assert_eq!(hashes.value(3), hash32(&2i32.to_le_bytes()));

        let output = &rout.runs()[1].output;
        assert!(output.starts_with("Success:\n"));
    }

    #[tokio::test]
    async fn test_int64_input_uses_its_own_kernel() {
        let mut rout = RecipeLedger::new();
        let ctx = SessionContext::new();
        ctx.register_udf(ScalarUDF::new_from_impl(add_kernels_to_function(&mut rout).unwrap()));

        let schema = Arc::new(Schema::new(vec![Field::new("v", DataType::Int64, false)]));
        let batch =
            RecordBatch::try_new(schema, vec![Arc::new(Int64Array::from(vec![2i64]))]).unwrap();
        let udf = ctx.udf(NAMED_SCALAR_FN).unwrap();
        let results = ctx
            .read_batch(batch)
            .unwrap()
            .select(vec![udf.call(vec![col("v")])])
            .unwrap()
            .collect()
            .await
            .unwrap();

        let hashes = results[0].column(0).as_primitive::<UInt32Type>();
        assert_eq!(hashes.value(0), hash32(&2i64.to_le_bytes()));
    }
}
