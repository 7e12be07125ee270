/*!
# cookbook-core: recipe output capture and a Parquet-backed Arrow Flight service

The Arrow cookbook runs small, named code samples ("recipes") and stores what
each one printed, so the rendered documentation can show real output next to
the code. This crate holds the pieces shared by every recipe:

- [`RecipeLedger`] brackets a recipe with `start_recipe`/`end_recipe`,
  captures the text written into it through [`std::fmt::Write`], and merges
  the session into an Arrow IPC stream file with [`RecipeLedger::dump_to_file`].
- [`RecipeTable`] is the two-column (`Recipe Name`, `Recipe Output`) table
  stored in that file, with last-writer-wins merging.
- [`find_test_data_file`] resolves fixtures in the nearest `testdata`
  directory.
- [`service::ParquetStorageService`] is an Arrow Flight service that stores
  uploaded datasets as Parquet files, used by the Flight recipes and by the
  `cookbook-flight-server` binary.

## Usage

```rust,no_run
use cookbook_core::RecipeLedger;
use std::fmt::Write;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut rout = RecipeLedger::new();

    rout.start_recipe("CreatingArrays");
    writeln!(rout, "[1, 2, 3]")?;
    rout.end_recipe("CreatingArrays");

    // Recipes from earlier runs stay in the file unless re-run here.
    rout.dump_to_file("recipes_out.arrow")?;
    Ok(())
}
```
*/

pub mod config;
pub mod error;
pub mod ledger;
pub mod server;
pub mod service;
pub mod storage;
pub mod table;
pub mod testdata;

pub use error::{LedgerError, Result};
pub use ledger::{RecipeLedger, RecipeRun};
pub use server::{spawn_flight_server, FlightServerHandle};
pub use service::ParquetStorageService;
pub use storage::{DatasetEntry, DatasetStore};
pub use table::RecipeTable;
pub use testdata::find_test_data_file;
