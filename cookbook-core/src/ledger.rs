//! Recipe output capture.
//!
//! A [`RecipeLedger`] brackets the execution of a named recipe, collects the
//! text the recipe writes into it, and seals `(name, output)` pairs for the
//! documentation table. Each caller owns its ledger, so tests running in
//! parallel simply use one ledger each.
//!
//! ```rust
//! use cookbook_core::RecipeLedger;
//! use std::fmt::Write;
//!
//! let mut rout = RecipeLedger::new();
//! rout.start_recipe("CreatingArrays");
//! writeln!(rout, "[1, 2, 3]").unwrap();
//! rout.end_recipe("CreatingArrays");
//!
//! assert_eq!(rout.runs()[0].output, "[1, 2, 3]\n");
//! ```

use crate::error::Result;
use crate::table::RecipeTable;
use std::fmt;
use std::path::Path;
use tracing::info;

/// Output captured for one finished recipe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipeRun {
    pub name: String,
    pub output: String,
}

/// Capture session and sealed recipe outputs.
#[derive(Debug, Default)]
pub struct RecipeLedger {
    current: Option<String>,
    output: String,
    runs: Vec<RecipeRun>,
}

impl RecipeLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `recipe_name` as running and clears the output buffer.
    ///
    /// # Panics
    ///
    /// If the name is empty, or if another recipe has not been ended yet.
    pub fn start_recipe(&mut self, recipe_name: &str) {
        if let Some(current) = &self.current {
            panic!(
                "Attempt to start a recipe {} but the recipe {} has not been marked finished",
                recipe_name, current
            );
        }
        if recipe_name.is_empty() {
            panic!("Invalid empty recipe name");
        }
        self.current = Some(recipe_name.to_string());
        self.output.clear();
    }

    /// Seals the output written since the matching [`start_recipe`](Self::start_recipe).
    ///
    /// # Panics
    ///
    /// If `recipe_name` is not the recipe currently in progress.
    pub fn end_recipe(&mut self, recipe_name: &str) {
        if self.current.as_deref() != Some(recipe_name) {
            panic!(
                "Attempt to end a recipe {} but the recipe was not in progress",
                recipe_name
            );
        }
        self.current = None;
        self.runs.push(RecipeRun {
            name: recipe_name.to_string(),
            output: std::mem::take(&mut self.output),
        });
    }

    /// Name of the recipe in progress, if any.
    pub fn active_recipe(&self) -> Option<&str> {
        self.current.as_deref()
    }

    /// Text written so far by the recipe in progress.
    pub fn pending_output(&self) -> &str {
        &self.output
    }

    pub fn runs(&self) -> &[RecipeRun] {
        &self.runs
    }

    pub fn has_recipe_output(&self) -> bool {
        !self.runs.is_empty()
    }

    /// Builds the table of this session's runs, in the order they were sealed.
    pub fn current_table(&self) -> Result<RecipeTable> {
        RecipeTable::from_rows(
            self.runs
                .iter()
                .map(|run| (run.name.as_str(), run.output.as_str())),
        )
    }

    /// Merges this session into the table stored at `path` and rewrites the file.
    ///
    /// Recipes recorded in this session replace previously stored outputs of the
    /// same name; all other stored recipes are kept. Returns the merged table.
    pub fn dump_to_file<P: AsRef<Path>>(&self, path: P) -> Result<RecipeTable> {
        let path = path.as_ref();
        let existing = RecipeTable::load_existing(path)?;
        let merged = RecipeTable::merge(&existing, &self.current_table()?)?;
        merged.persist(path)?;

        info!(
            "Wrote {} recipe outputs ({} from this run) to {}",
            merged.num_rows(),
            self.runs.len(),
            path.display()
        );
        Ok(merged)
    }
}

impl fmt::Write for RecipeLedger {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.output.push_str(s);
        Ok(())
    }
}
