//! Comparing, searching and sorting array values.

use crate::BoxError;
use arrow::array::{make_comparator, Array, ArrayRef, Int32Array, Scalar, StringArray};
use arrow::compute::kernels::cmp::not_distinct;
use arrow::compute::kernels::substring::substring;
use arrow::compute::{sort, sort_to_indices, take, SortOptions};
use arrow::datatypes::{DataType, Field};
use arrow::util::pretty::pretty_format_columns;
use cookbook_core::RecipeLedger;
use std::cmp::Ordering;
use std::fmt::Write;
use std::sync::Arc;

/// Ascending with nulls first, the order the searches expect.
const NULLS_FIRST: SortOptions = SortOptions {
    descending: false,
    nulls_first: true,
};

/// `[null, 1, 2, ..., 9]`, already sorted.
fn sorted_with_leading_null() -> Int32Array {
    (0..10i32).map(|i| (i > 0).then_some(i)).collect()
}

fn unsorted_with_nulls() -> Int32Array {
    Int32Array::from(vec![
        Some(10),
        Some(8),
        None,
        Some(10),
        Some(12),
        Some(17),
        None,
        Some(23),
        Some(35),
        Some(2),
    ])
}

fn index_or_missing(index: Option<usize>) -> String {
    index.map_or_else(|| "-1".to_string(), |i| i.to_string())
}

pub fn compare_fields(rout: &mut RecipeLedger) -> Result<Vec<bool>, BoxError> {
    rout.start_recipe("CompareVectorFields");
    let right = Field::new("int", DataType::Int32, true);
    let left1 = Field::new("int", DataType::Int32, true);
    let left2 = Field::new("int2", DataType::Int32, true);

    let results = vec![right == left1, right == left2];
    for equal in &results {
        writeln!(rout, "{}", equal)?;
    }
    rout.end_recipe("CompareVectorFields");
    Ok(results)
}

/// Orders rows of `values` by their first character, breaking ties by row
/// position so the order is stable.
pub fn first_char_comparator(
    values: &StringArray,
) -> Result<impl Fn(usize, usize) -> Ordering, BoxError> {
    let first_chars = substring(values, 0, Some(1))?;
    let cmp = make_comparator(&first_chars, &first_chars, NULLS_FIRST)?;
    Ok(move |i: usize, j: usize| cmp(i, j).then(i.cmp(&j)))
}

pub fn compare_values_at_indices(rout: &mut RecipeLedger) -> Result<Vec<bool>, BoxError> {
    rout.start_recipe("CompareValuesAtIndices");
    let values = StringArray::from(vec!["ba", "abc", "aa", "abc", "a"]);
    let cmp = first_char_comparator(&values)?;

    let results = vec![
        cmp(0, 1).is_gt(),
        cmp(1, 2).is_lt(),
        cmp(2, 3).is_lt(),
        cmp(1, 3).is_lt(),
        cmp(3, 1).is_gt(),
        cmp(3, 3).is_eq(),
    ];
    for result in &results {
        writeln!(rout, "{}", result)?;
    }
    rout.end_recipe("CompareValuesAtIndices");
    Ok(results)
}

/// Position of the first row of `values` equal to the single value in
/// `key`. Nulls match nulls.
pub fn linear_search(values: &dyn Array, key: ArrayRef) -> Result<Option<usize>, BoxError> {
    let matches = not_distinct(&values, &Scalar::new(key))?;
    Ok(matches.values().set_indices().next())
}

/// Position of the single value in `key` within `values`, which must be
/// sorted ascending with nulls first.
pub fn binary_search(values: &dyn Array, key: &dyn Array) -> Result<Option<usize>, BoxError> {
    let cmp = make_comparator(values, key, NULLS_FIRST)?;
    let (mut low, mut high) = (0, values.len());
    while low < high {
        let mid = low + (high - low) / 2;
        match cmp(mid, 0) {
            Ordering::Less => low = mid + 1,
            Ordering::Greater => high = mid,
            Ordering::Equal => return Ok(Some(mid)),
        }
    }
    Ok(None)
}

fn search_recipe<F>(
    rout: &mut RecipeLedger,
    name: &str,
    search: F,
) -> Result<Vec<Option<usize>>, BoxError>
where
    F: Fn(&Int32Array, ArrayRef) -> Result<Option<usize>, BoxError>,
{
    rout.start_recipe(name);
    let values = sorted_with_leading_null();
    let mut found = Vec::with_capacity(values.len() + 1);
    for i in 0..values.len() {
        let key: ArrayRef = Arc::new(values.slice(i, 1));
        found.push(search(&values, key)?);
    }
    let absent: ArrayRef = Arc::new(Int32Array::from(vec![-333]));
    found.push(search(&values, absent)?);
    for index in &found {
        writeln!(rout, "{}", index_or_missing(*index))?;
    }
    rout.end_recipe(name);
    Ok(found)
}

pub fn linear_search_recipe(rout: &mut RecipeLedger) -> Result<Vec<Option<usize>>, BoxError> {
    search_recipe(rout, "LinearSearch", |values, key| linear_search(values, key))
}

pub fn binary_search_recipe(rout: &mut RecipeLedger) -> Result<Vec<Option<usize>>, BoxError> {
    search_recipe(rout, "BinarySearch", |values, key| binary_search(values, key.as_ref()))
}

pub fn sort_array(rout: &mut RecipeLedger) -> Result<ArrayRef, BoxError> {
    rout.start_recipe("SortArray");
    let sorted = sort(&unsorted_with_nulls(), Some(NULLS_FIRST))?;
    writeln!(rout, "{}", pretty_format_columns("sorted", &[sorted.clone()])?)?;
    rout.end_recipe("SortArray");
    Ok(sorted)
}

pub fn sort_by_indices(rout: &mut RecipeLedger) -> Result<ArrayRef, BoxError> {
    rout.start_recipe("SortToIndices");
    let values = unsorted_with_nulls();
    let indices = sort_to_indices(&values, Some(NULLS_FIRST), None)?;
    let sorted = take(&values, &indices, None)?;
    writeln!(rout, "Indices: {:?}", &indices.values()[..])?;
    writeln!(rout, "{}", pretty_format_columns("sorted", &[sorted.clone()])?)?;
    rout.end_recipe("SortToIndices");
    Ok(sorted)
}

pub fn run(rout: &mut RecipeLedger) -> Result<(), BoxError> {
    compare_fields(rout)?;
    compare_values_at_indices(rout)?;
    linear_search_recipe(rout)?;
    binary_search_recipe(rout)?;
    sort_array(rout)?;
    sort_by_indices(rout)?;
    Ok(())
}
