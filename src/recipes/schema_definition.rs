use super::format_schema;
use crate::BoxError;
use arrow::datatypes::{DataType, Field, Schema};
use cookbook_core::RecipeLedger;
use std::collections::HashMap;
use std::fmt::Write;
use std::sync::Arc;

pub fn defining_schema(rout: &mut RecipeLedger) -> Result<Schema, BoxError> {
    rout.start_recipe("DefiningSchema");
    let name = Field::new("name", DataType::Utf8, false);
    let weight = Field::new("weight", DataType::Float64, true)
        .with_metadata(HashMap::from([("unit".to_string(), "kg".to_string())]));
    let tags = Field::new(
        "tags",
        DataType::List(Arc::new(Field::new("item", DataType::Utf8, true))),
        true,
    );

    let schema = Schema::new(vec![name, weight, tags])
        .with_metadata(HashMap::from([("source".to_string(), "cookbook".to_string())]));
    writeln!(rout, "{}", format_schema(&schema))?;
    rout.end_recipe("DefiningSchema");
    Ok(schema)
}

pub fn schema_to_json(rout: &mut RecipeLedger, schema: &Schema) -> Result<Schema, BoxError> {
    rout.start_recipe("SchemaToJson");
    let json = serde_json::to_string_pretty(schema)?;
    writeln!(rout, "{}", json)?;

    let parsed: Schema = serde_json::from_str(&json)?;
    writeln!(rout, "Round trip preserved the schema: {}", &parsed == schema)?;
    rout.end_recipe("SchemaToJson");
    Ok(parsed)
}

pub fn run(rout: &mut RecipeLedger) -> Result<(), BoxError> {
    let schema = defining_schema(rout)?;
    schema_to_json(rout, &schema)?;
    Ok(())
}
