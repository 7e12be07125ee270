//! Arrow cookbook: runnable recipes whose console output is captured for the
//! rendered documentation.
//!
//! # Example
//!
//! ```rust,no_run
//! use cookbook::{run_all, CookbookSettings};
//! use cookbook_core::RecipeLedger;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), cookbook::BoxError> {
//!     let settings = CookbookSettings::new()?;
//!     let mut rout = RecipeLedger::new();
//!
//!     run_all(&mut rout, &settings).await?;
//!     rout.dump_to_file(&settings.output.path)?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod recipes;
#[cfg(test)]
mod tests;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

pub use config::CookbookSettings;
pub use recipes::run_all;
