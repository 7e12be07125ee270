//! Flight storage server binary.
//!
//! Serves a [`ParquetStorageService`](cookbook_core::ParquetStorageService):
//! datasets uploaded with `DoPut` are written as Parquet files under the
//! storage root and can be listed, fetched with `DoGet` and removed with the
//! `drop_dataset` action.
//!
//! # Configuration
//!
//! In order of precedence:
//!
//! 1. Command-line arguments (highest precedence)
//! 2. Environment variables (prefixed with `COOKBOOK_`)
//! 3. User-specified configuration file (via `--config`)
//! 4. Default configuration (embedded in binary)
//!
//! ```text
//! Options:
//!   -c, --config <FILE>        Path to configuration file
//!       --host <HOST>          Server host address [env: COOKBOOK_SERVER_HOST]
//!       --port <PORT>          Server port [env: COOKBOOK_SERVER_PORT]
//!       --root <ROOT>          Dataset directory [env: COOKBOOK_STORAGE_ROOT]
//!       --log-filter <FILTER>  Log filter used when RUST_LOG is unset
//! ```
//!
//! ```toml
//! [server]
//! host = "127.0.0.1"
//! port = 50051
//!
//! [storage]
//! root = "./flight_datasets"
//!
//! [logging]
//! filter = "info"
//! ```

use clap::Parser;
use cookbook_core::{
    config::{init_tracing, CliArgs, Settings},
    service::ParquetStorageService,
    storage::parquet::ParquetDirStore,
};
use arrow_flight::flight_service_server::FlightServiceServer;
use tonic::transport::Server;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli_args = CliArgs::parse();
    let settings = Settings::new(cli_args)?;
    init_tracing(&settings.logging.filter);

    let store = ParquetDirStore::new(&settings.storage.root)?;
    let location = format!("grpc+tcp://{}", settings.listen_addr());
    let service = ParquetStorageService::new(Box::new(store), location);

    let addr = settings.listen_addr().parse()?;
    info!(
        "Serving datasets from {} on {}",
        settings.storage.root.display(),
        addr
    );

    Server::builder()
        .add_service(FlightServiceServer::new(service))
        .serve_with_shutdown(addr, async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down");
        })
        .await?;

    Ok(())
}
