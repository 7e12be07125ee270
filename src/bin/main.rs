use cookbook::{run_all, BoxError, CookbookSettings};
use cookbook_core::{config::init_tracing, RecipeLedger};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let settings = CookbookSettings::new()?;
    init_tracing(&settings.logging.filter);

    let mut rout = RecipeLedger::new();
    run_all(&mut rout, &settings).await?;

    let table = rout.dump_to_file(&settings.output.path)?;
    info!(
        "{} recipes now documented in {}",
        table.num_rows(),
        settings.output.path.display()
    );
    Ok(())
}
