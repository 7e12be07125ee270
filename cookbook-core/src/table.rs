//! Persisted recipe output table.
//!
//! The table has exactly two Utf8 columns, `Recipe Name` and `Recipe Output`,
//! and is stored on disk as an Arrow IPC stream holding a single record batch.
//! This is the file the documentation build reads with `pyarrow.ipc.open_stream`.

use crate::error::{LedgerError, Result};
use arrow::compute::concat_batches;
use arrow::ipc::reader::StreamReader;
use arrow::ipc::writer::StreamWriter;
use arrow_array::cast::AsArray;
use arrow_array::{Array, ArrayRef, RecordBatch, StringArray};
use arrow_schema::{DataType, Field, Schema, SchemaRef};
use indexmap::IndexMap;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, ErrorKind, Read, Write};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

pub const RECIPE_NAME_COLUMN: &str = "Recipe Name";
pub const RECIPE_OUTPUT_COLUMN: &str = "Recipe Output";

/// Gets the schema of the recipe table in Arrow format.
pub fn recipe_table_schema() -> SchemaRef {
    Arc::new(Schema::new(vec![
        Field::new(RECIPE_NAME_COLUMN, DataType::Utf8, true),
        Field::new(RECIPE_OUTPUT_COLUMN, DataType::Utf8, true),
    ]))
}

/// A two column `(name, output)` table backed by one record batch.
#[derive(Debug, Clone)]
pub struct RecipeTable {
    batch: RecordBatch,
}

impl Default for RecipeTable {
    fn default() -> Self {
        Self::empty()
    }
}

impl PartialEq for RecipeTable {
    /// Tables compare as name to output mappings; row order is not significant.
    fn eq(&self, other: &Self) -> bool {
        self.to_map() == other.to_map()
    }
}

impl RecipeTable {
    /// Two columns, zero rows.
    pub fn empty() -> Self {
        Self {
            batch: RecordBatch::new_empty(recipe_table_schema()),
        }
    }

    /// Creates a table from `(name, output)` pairs, keeping their order and any duplicates.
    pub fn from_rows<'a, I>(rows: I) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let (names, outputs): (Vec<&str>, Vec<&str>) = rows.into_iter().unzip();

        let columns: Vec<ArrayRef> = vec![
            Arc::new(StringArray::from_iter_values(names)),
            Arc::new(StringArray::from_iter_values(outputs)),
        ];

        let batch = RecordBatch::try_new(recipe_table_schema(), columns)?;
        Ok(Self { batch })
    }

    /// Creates a table from record batches read back from storage.
    ///
    /// Every batch must carry the two recipe columns as Utf8. Multiple batches
    /// are concatenated into one.
    pub fn try_from_batches(schema: &SchemaRef, batches: &[RecordBatch]) -> Result<Self> {
        for column in [RECIPE_NAME_COLUMN, RECIPE_OUTPUT_COLUMN] {
            let field = schema.field_with_name(column).map_err(|_| {
                LedgerError::InvalidTable(format!("missing column '{}'", column))
            })?;
            if field.data_type() != &DataType::Utf8 {
                return Err(LedgerError::InvalidTable(format!(
                    "column '{}' has type {}, expected Utf8",
                    column,
                    field.data_type()
                )));
            }
        }

        let combined = concat_batches(schema, batches)?;
        let names = combined
            .column_by_name(RECIPE_NAME_COLUMN)
            .and_then(|col| col.as_string_opt::<i32>())
            .ok_or_else(|| LedgerError::InvalidTable("invalid name column".to_string()))?;
        let outputs = combined
            .column_by_name(RECIPE_OUTPUT_COLUMN)
            .and_then(|col| col.as_string_opt::<i32>())
            .ok_or_else(|| LedgerError::InvalidTable("invalid output column".to_string()))?;
        if names.null_count() > 0 {
            return Err(LedgerError::InvalidTable(format!(
                "{} rows have a null '{}'",
                names.null_count(),
                RECIPE_NAME_COLUMN
            )));
        }

        // Always rebuilt against the canonical schema; extra columns are dropped.
        let columns: Vec<ArrayRef> = vec![Arc::new(names.clone()), Arc::new(outputs.clone())];
        let batch = RecordBatch::try_new(recipe_table_schema(), columns)?;
        Ok(Self { batch })
    }

    pub fn num_rows(&self) -> usize {
        self.batch.num_rows()
    }

    pub fn is_empty(&self) -> bool {
        self.batch.num_rows() == 0
    }

    pub fn batch(&self) -> &RecordBatch {
        &self.batch
    }

    pub fn schema(&self) -> SchemaRef {
        self.batch.schema()
    }

    /// Iterates over `(name, output)` rows. Null outputs read as empty strings.
    pub fn rows(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        let names = self.batch.column(0).as_string::<i32>();
        let outputs = self.batch.column(1).as_string::<i32>();
        names
            .iter()
            .zip(outputs.iter())
            .map(|(name, output)| (name.unwrap_or_default(), output.unwrap_or_default()))
    }

    /// Looks up the output recorded for `name`. The last row wins if the name repeats.
    pub fn output_of(&self, name: &str) -> Option<&str> {
        self.rows()
            .filter(|(row_name, _)| *row_name == name)
            .map(|(_, output)| output)
            .last()
    }

    pub fn to_map(&self) -> HashMap<String, String> {
        self.rows()
            .map(|(name, output)| (name.to_string(), output.to_string()))
            .collect()
    }

    /// Merges two tables keyed by recipe name.
    ///
    /// Rows of `old` are inserted first and rows of `new` second, so `new`
    /// wins whenever a name is present in both. The result holds one row per
    /// distinct name, in first-seen order.
    pub fn merge(old: &RecipeTable, new: &RecipeTable) -> Result<RecipeTable> {
        let mut values: IndexMap<&str, &str> = IndexMap::new();
        for (name, output) in old.rows().chain(new.rows()) {
            values.insert(name, output);
        }
        RecipeTable::from_rows(values)
    }

    /// Reads a table from an Arrow IPC stream.
    pub fn read_from<R: Read>(reader: R) -> Result<Self> {
        let reader = StreamReader::try_new(reader, None)?;
        let schema = reader.schema();
        let batches = reader.collect::<std::result::Result<Vec<_>, _>>()?;
        Self::try_from_batches(&schema, &batches)
    }

    /// Writes the table as an Arrow IPC stream containing one record batch.
    pub fn write_to<W: Write>(&self, writer: W) -> Result<W> {
        let mut writer = StreamWriter::try_new(writer, &self.batch.schema())?;
        writer.write(&self.batch)?;
        writer.finish()?;
        Ok(writer.into_inner()?)
    }

    /// Loads the table previously persisted at `path`.
    ///
    /// A missing file is the first-run case and yields an empty table. Any
    /// other failure to open or decode the file is returned as an error.
    pub fn load_existing<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = match File::open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No recipe table at {}, starting empty", path.display());
                return Ok(Self::empty());
            }
            Err(e) => return Err(e.into()),
        };
        Self::read_from(BufReader::new(file))
    }

    /// Replaces the contents of `path` with this table.
    pub fn persist<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path.as_ref())?;
        let mut out = self.write_to(BufWriter::new(file))?;
        out.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow_array::Int32Array;

    fn table(rows: &[(&str, &str)]) -> RecipeTable {
        RecipeTable::from_rows(rows.iter().copied()).unwrap()
    }

    #[test]
    fn test_empty_table_has_recipe_schema() {
        let empty = RecipeTable::empty();
        assert!(empty.is_empty());
        assert_eq!(empty.schema(), recipe_table_schema());
        assert_eq!(empty.schema().field(0).name(), "Recipe Name");
        assert_eq!(empty.schema().field(1).name(), "Recipe Output");
    }

    #[test]
    fn test_from_rows_keeps_duplicates_and_order() {
        let t = table(&[("A", "1"), ("B", "2"), ("A", "3")]);
        let rows: Vec<_> = t.rows().collect();
        assert_eq!(rows, vec![("A", "1"), ("B", "2"), ("A", "3")]);
        assert_eq!(t.output_of("A"), Some("3"));
    }

    #[test]
    fn test_merge_with_itself_changes_nothing() {
        let t = table(&[("A", "x"), ("B", "y")]);
        let merged = RecipeTable::merge(&t, &t).unwrap();
        assert_eq!(merged.num_rows(), 2);
        assert_eq!(merged, t);
    }

    #[test]
    fn test_merge_new_value_overwrites_old() {
        let old = table(&[("k", "v1"), ("other", "o")]);
        let new = table(&[("k", "v2")]);
        let merged = RecipeTable::merge(&old, &new).unwrap();

        let hits: Vec<_> = merged.rows().filter(|(name, _)| *name == "k").collect();
        assert_eq!(hits, vec![("k", "v2")]);
        assert_eq!(merged.output_of("other"), Some("o"));
    }

    #[test]
    fn test_merge_is_union_of_names() {
        let old = table(&[("A", "1"), ("B", "2")]);
        let new = table(&[("B", "3"), ("C", "4"), ("C", "5")]);
        let merged = RecipeTable::merge(&old, &new).unwrap();

        assert_eq!(merged.num_rows(), 3);
        let mut names: Vec<_> = merged.rows().map(|(name, _)| name.to_string()).collect();
        names.sort();
        assert_eq!(names, vec!["A", "B", "C"]);
        assert_eq!(merged.output_of("C"), Some("5"));
    }

    #[test]
    fn test_merge_of_empty_tables_is_empty() {
        let merged = RecipeTable::merge(&RecipeTable::empty(), &RecipeTable::empty()).unwrap();
        assert!(merged.is_empty());
        assert_eq!(merged.schema(), recipe_table_schema());
    }

    #[test]
    fn test_load_missing_file_is_empty_table() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = RecipeTable::load_existing(dir.path().join("recipes_out.arrow")).unwrap();
        assert!(loaded.is_empty());
    }

    #[test]
    fn test_load_directory_is_an_error() {
        // Not a missing file, so it must not be read as an empty table.
        let dir = tempfile::tempdir().unwrap();
        assert!(RecipeTable::load_existing(dir.path()).is_err());
    }

    #[test]
    fn test_load_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("recipes_out.arrow");
        std::fs::write(&path, b"definitely not arrow").unwrap();
        assert!(RecipeTable::load_existing(&path).is_err());
    }

    #[test]
    fn test_persist_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("recipes_out.arrow");
        let t = table(&[("A", "x\ny\n"), ("B", "")]);

        t.persist(&path).unwrap();
        let loaded = RecipeTable::load_existing(&path).unwrap();
        assert_eq!(loaded, t);
        assert_eq!(loaded.output_of("A"), Some("x\ny\n"));
    }

    #[test]
    fn test_persist_replaces_previous_contents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("recipes_out.arrow");

        table(&[("A", "x"), ("B", "y"), ("C", "z")]).persist(&path).unwrap();
        table(&[("D", "w")]).persist(&path).unwrap();

        let loaded = RecipeTable::load_existing(&path).unwrap();
        assert_eq!(loaded.num_rows(), 1);
        assert_eq!(loaded.output_of("D"), Some("w"));
    }

    #[test]
    fn test_rejects_table_with_wrong_columns() {
        let schema = Arc::new(Schema::new(vec![
            Field::new(RECIPE_NAME_COLUMN, DataType::Utf8, false),
            Field::new(RECIPE_OUTPUT_COLUMN, DataType::Int32, false),
        ]));
        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![
                Arc::new(StringArray::from(vec!["A"])),
                Arc::new(Int32Array::from(vec![1])),
            ],
        )
        .unwrap();

        let err = RecipeTable::try_from_batches(&schema, &[batch]).unwrap_err();
        assert!(matches!(err, LedgerError::InvalidTable(_)));
    }

    #[test]
    fn test_reads_multiple_batches() {
        let first = table(&[("A", "1")]);
        let second = table(&[("B", "2")]);

        let mut buffer = Vec::new();
        {
            let mut writer = StreamWriter::try_new(&mut buffer, &recipe_table_schema()).unwrap();
            writer.write(first.batch()).unwrap();
            writer.write(second.batch()).unwrap();
            writer.finish().unwrap();
        }

        let loaded = RecipeTable::read_from(buffer.as_slice()).unwrap();
        assert_eq!(loaded.num_rows(), 2);
        assert_eq!(loaded.output_of("B"), Some("2"));
    }

    #[test]
    fn test_rejects_null_recipe_names() {
        let batch = RecordBatch::try_new(
            recipe_table_schema(),
            vec![
                Arc::new(StringArray::from(vec![Some("A"), None])),
                Arc::new(StringArray::from(vec![Some("1"), Some("2")])),
            ],
        )
        .unwrap();

        let mut buffer = Vec::new();
        {
            let mut writer = StreamWriter::try_new(&mut buffer, &recipe_table_schema()).unwrap();
            writer.write(&batch).unwrap();
            writer.finish().unwrap();
        }

        let err = RecipeTable::read_from(buffer.as_slice()).unwrap_err();
        assert!(matches!(err, LedgerError::InvalidTable(_)));
    }

    #[test]
    fn test_null_outputs_read_as_empty() {
        let batch = RecordBatch::try_new(
            recipe_table_schema(),
            vec![
                Arc::new(StringArray::from(vec![Some("A")])),
                Arc::new(StringArray::from(vec![None::<&str>])),
            ],
        )
        .unwrap();

        let loaded = RecipeTable::try_from_batches(&recipe_table_schema(), &[batch]).unwrap();
        assert_eq!(loaded.output_of("A"), Some(""));
    }
}
