//! Uploading, describing, downloading and dropping datasets through the
//! Parquet-backed Flight service.

use super::{format_schema, load_airquality};
use crate::config::FlightSettings;
use crate::BoxError;
use arrow::record_batch::RecordBatch;
use arrow::util::pretty::pretty_format_batches;
use arrow_flight::encode::FlightDataEncoderBuilder;
use arrow_flight::error::FlightError;
use arrow_flight::flight_service_client::FlightServiceClient;
use arrow_flight::{Action, FlightClient, FlightDescriptor, FlightInfo};
use cookbook_core::service::DROP_DATASET_ACTION;
use cookbook_core::storage::parquet::ParquetDirStore;
use cookbook_core::{spawn_flight_server, RecipeLedger};
use futures::{stream, TryStreamExt};
use std::fmt::Write;
use tonic::transport::Channel;
use tonic::{Code, Status};

pub const AIRQUALITY_KEY: &str = "airquality.parquet";

/// Rows of the downloaded table shown by `ParquetStorageService::DoGet`.
const PREVIEW_ROWS: usize = 2;

fn write_flight_info(rout: &mut RecipeLedger, info: &FlightInfo) -> Result<(), BoxError> {
    if let Some(descriptor) = &info.flight_descriptor {
        writeln!(rout, "{}", descriptor)?;
    }
    writeln!(rout, "=== Schema ===")?;
    let schema = info.clone().try_decode_schema()?;
    writeln!(rout, "{}", format_schema(&schema))?;
    writeln!(rout, "==============")?;
    Ok(())
}

fn airquality_descriptor() -> FlightDescriptor {
    FlightDescriptor::new_path(vec![AIRQUALITY_KEY.to_string()])
}

/// Uploads the airquality fixture under `descriptor` and returns the number
/// of batches sent.
async fn upload_airquality(
    client: &mut FlightClient,
    descriptor: &FlightDescriptor,
) -> Result<usize, BoxError> {
    let batches = load_airquality()?;
    let num_batches = batches.len();
    let upload = FlightDataEncoderBuilder::new()
        .with_flight_descriptor(Some(descriptor.clone()))
        .build(stream::iter(batches.into_iter().map(Ok::<_, FlightError>)));
    client.do_put(upload).await?.try_collect::<Vec<_>>().await?;
    Ok(num_batches)
}

/// Runs a server over a freshly emptied `settings.root` and walks a dataset
/// through its whole lifecycle. Returns the batches downloaded by `DoGet`.
pub async fn parquet_storage_service(
    rout: &mut RecipeLedger,
    settings: &FlightSettings,
) -> Result<Vec<RecordBatch>, BoxError> {
    rout.start_recipe("ParquetStorageService::StartServer");
    let store = ParquetDirStore::new_empty(&settings.root)?;
    let server = spawn_flight_server(Box::new(store), &settings.host).await?;
    writeln!(rout, "Listening on port {}", server.port())?;
    rout.end_recipe("ParquetStorageService::StartServer");

    rout.start_recipe("ParquetStorageService::Connect");
    let channel = Channel::from_shared(server.uri())?.connect().await?;
    let mut client = FlightClient::new(channel);
    writeln!(rout, "Connected to {}", server.location())?;
    rout.end_recipe("ParquetStorageService::Connect");

    rout.start_recipe("ParquetStorageService::DoPut");
    let descriptor = airquality_descriptor();
    let num_batches = upload_airquality(&mut client, &descriptor).await?;
    writeln!(rout, "Wrote {} batches", num_batches)?;
    rout.end_recipe("ParquetStorageService::DoPut");

    rout.start_recipe("ParquetStorageService::GetFlightInfo");
    let info = client.get_flight_info(descriptor).await?;
    write_flight_info(rout, &info)?;
    rout.end_recipe("ParquetStorageService::GetFlightInfo");

    rout.start_recipe("ParquetStorageService::DoGet");
    let ticket = info
        .endpoint
        .first()
        .and_then(|endpoint| endpoint.ticket.clone())
        .ok_or("Flight info has no ticket")?;
    let downloaded: Vec<RecordBatch> = client.do_get(ticket).await?.try_collect().await?;
    let num_rows: usize = downloaded.iter().map(|b| b.num_rows()).sum();
    writeln!(rout, "Read {} rows", num_rows)?;
    if let Some(first) = downloaded.first() {
        let preview = first.slice(0, first.num_rows().min(PREVIEW_ROWS));
        writeln!(rout, "{}", pretty_format_batches(&[preview])?)?;
    }
    rout.end_recipe("ParquetStorageService::DoGet");

    rout.start_recipe("ParquetStorageService::DoAction");
    client
        .do_action(Action::new(DROP_DATASET_ACTION, AIRQUALITY_KEY))
        .await?
        .try_collect::<Vec<_>>()
        .await?;
    writeln!(rout, "Deleted dataset")?;
    rout.end_recipe("ParquetStorageService::DoAction");

    rout.start_recipe("ParquetStorageService::ListFlights");
    let listing: Vec<FlightInfo> = client.list_flights("").await?.try_collect().await?;
    for info in &listing {
        write_flight_info(rout, info)?;
    }
    writeln!(rout, "End of listing")?;
    rout.end_recipe("ParquetStorageService::ListFlights");

    rout.start_recipe("ParquetStorageService::StopServer");
    drop(client);
    server.shutdown().await?;
    writeln!(rout, "Server shut down successfully")?;
    rout.end_recipe("ParquetStorageService::StopServer");
    Ok(downloaded)
}

/// Connects with a 2 byte outbound message limit to a server that holds the
/// airquality dataset, so `GetFlightInfo` fails on the client side before the
/// request is sent. Returns the status of the rejected call.
pub async fn test_client_options(
    rout: &mut RecipeLedger,
    settings: &FlightSettings,
) -> Result<Status, BoxError> {
    let store = ParquetDirStore::new_empty(&settings.root)?;
    let server = spawn_flight_server(Box::new(store), &settings.host).await?;
    let descriptor = airquality_descriptor();
    let mut unlimited = FlightClient::new(Channel::from_shared(server.uri())?.connect().await?);
    upload_airquality(&mut unlimited, &descriptor).await?;

    rout.start_recipe("TestClientOptions::Connect");
    let channel = Channel::from_shared(server.uri())?.connect().await?;
    let mut client = FlightServiceClient::new(channel).max_encoding_message_size(2);
    writeln!(rout, "Connected to {}", server.location())?;
    rout.end_recipe("TestClientOptions::Connect");

    let limited = client.get_flight_info(descriptor.clone()).await;
    // The dataset exists, so only the size limit can reject the call
    let reference = unlimited.get_flight_info(descriptor).await;
    drop(client);
    drop(unlimited);
    server.shutdown().await?;

    reference?;
    match limited {
        Ok(_) => Err("GetFlightInfo succeeded despite the message size limit".into()),
        Err(status) if status.code() == Code::NotFound => {
            Err(format!("GetFlightInfo failed before reaching the limit: {}", status).into())
        }
        Err(status) => Ok(status),
    }
}

pub async fn run(rout: &mut RecipeLedger, settings: &FlightSettings) -> Result<(), BoxError> {
    parquet_storage_service(rout, settings).await?;
    test_client_options(rout, settings).await?;
    Ok(())
}
