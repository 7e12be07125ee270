//! Arrow Flight service storing uploaded datasets as Parquet files.
//!
//! The service exposes a `DatasetStore` over the Flight protocol:
//! - `list_flights` lists every stored dataset
//! - `get_flight_info` / `get_schema` describe one dataset
//! - `do_put` uploads a stream of record batches as a dataset
//! - `do_get` streams a dataset back
//! - `do_action("drop_dataset")` deletes a dataset
//!
//! Datasets are addressed by PATH descriptors with exactly one component, and
//! the ticket of a dataset's single endpoint is its key.

use crate::storage::{DatasetEntry, DatasetStore};
use arrow_flight::{
    encode::FlightDataEncoderBuilder,
    error::FlightError,
    flight_descriptor::DescriptorType,
    flight_service_server::FlightService,
    utils::flight_data_to_batches,
    Action, ActionType, Criteria, Empty, FlightData, FlightDescriptor, FlightEndpoint,
    FlightInfo, HandshakeRequest, HandshakeResponse, PollInfo, PutResult, SchemaAsIpc,
    SchemaResult, Ticket,
};
use arrow_ipc::writer::IpcWriteOptions;
use arrow_schema::Schema;
use bytes::Bytes;
use futures::{stream, Stream, StreamExt, TryStreamExt};
use std::pin::Pin;
use std::sync::Arc;
use tonic::{Request, Response, Status, Streaming};
use tracing::{debug, info};

/// Action type that deletes the dataset named by the action body.
pub const DROP_DATASET_ACTION: &str = "drop_dataset";

fn drop_dataset_action_type() -> ActionType {
    ActionType {
        r#type: DROP_DATASET_ACTION.to_string(),
        description: "Delete a dataset.".to_string(),
    }
}

pub struct ParquetStorageService {
    store: Box<dyn DatasetStore>,
    location: String,
}

impl ParquetStorageService {
    /// Creates a service advertising `location` (e.g. `grpc+tcp://localhost:50051`)
    /// as the endpoint of every dataset.
    pub fn new(store: Box<dyn DatasetStore>, location: impl Into<String>) -> Self {
        Self {
            store,
            location: location.into(),
        }
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    fn make_flight_info(&self, entry: &DatasetEntry) -> Result<FlightInfo, Status> {
        let endpoint = FlightEndpoint::new()
            .with_ticket(Ticket::new(entry.key.clone()))
            .with_location(self.location.clone());

        let info = FlightInfo::new()
            .try_with_schema(&entry.schema)
            .map_err(|e| Status::internal(format!("Failed to encode schema: {}", e)))?
            .with_descriptor(FlightDescriptor::new_path(vec![entry.key.clone()]))
            .with_endpoint(endpoint)
            .with_total_records(entry.total_records)
            .with_total_bytes(entry.total_bytes);
        Ok(info)
    }
}

/// Extracts the dataset key from a PATH descriptor with one component.
pub fn key_from_descriptor(descriptor: &FlightDescriptor) -> Result<String, Status> {
    if descriptor.r#type != DescriptorType::Path as i32 {
        return Err(Status::invalid_argument("Must provide PATH-type FlightDescriptor"));
    }
    match descriptor.path.as_slice() {
        [key] => Ok(key.clone()),
        _ => Err(Status::invalid_argument(
            "Must provide PATH-type FlightDescriptor with one path component",
        )),
    }
}

fn utf8_key(bytes: &Bytes) -> Result<String, Status> {
    String::from_utf8(bytes.to_vec())
        .map_err(|_| Status::invalid_argument("Dataset key must be valid UTF-8"))
}

type BoxedStream<T> = Pin<Box<dyn Stream<Item = Result<T, Status>> + Send + 'static>>;

#[tonic::async_trait]
impl FlightService for ParquetStorageService {
    type HandshakeStream = BoxedStream<HandshakeResponse>;
    type ListFlightsStream = BoxedStream<FlightInfo>;
    type DoGetStream = BoxedStream<FlightData>;
    type DoPutStream = BoxedStream<PutResult>;
    type DoActionStream = BoxedStream<arrow_flight::Result>;
    type ListActionsStream = BoxedStream<ActionType>;
    type DoExchangeStream = BoxedStream<FlightData>;

    async fn handshake(
        &self,
        _request: Request<Streaming<HandshakeRequest>>,
    ) -> Result<Response<Self::HandshakeStream>, Status> {
        Err(Status::unimplemented("handshake not implemented"))
    }

    async fn list_flights(
        &self,
        _request: Request<Criteria>,
    ) -> Result<Response<Self::ListFlightsStream>, Status> {
        let entries = self.store.list().await?;
        let infos = entries
            .iter()
            .map(|entry| self.make_flight_info(entry))
            .collect::<Result<Vec<_>, Status>>()?;

        debug!("Listing {} datasets", infos.len());
        Ok(Response::new(Box::pin(stream::iter(
            infos.into_iter().map(Ok::<_, Status>),
        ))))
    }

    async fn get_flight_info(
        &self,
        request: Request<FlightDescriptor>,
    ) -> Result<Response<FlightInfo>, Status> {
        let key = key_from_descriptor(request.get_ref())?;
        let entry = self.store.entry(&key).await?;
        Ok(Response::new(self.make_flight_info(&entry)?))
    }

    async fn poll_flight_info(
        &self,
        _request: Request<FlightDescriptor>,
    ) -> Result<Response<PollInfo>, Status> {
        Err(Status::unimplemented("poll_flight_info not implemented"))
    }

    async fn get_schema(
        &self,
        request: Request<FlightDescriptor>,
    ) -> Result<Response<SchemaResult>, Status> {
        let key = key_from_descriptor(request.get_ref())?;
        let entry = self.store.entry(&key).await?;
        let options = IpcWriteOptions::default();
        let result: SchemaResult = SchemaAsIpc::new(&entry.schema, &options)
            .try_into()
            .map_err(|e| Status::internal(format!("Failed to encode schema: {}", e)))?;
        Ok(Response::new(result))
    }

    async fn do_get(
        &self,
        request: Request<Ticket>,
    ) -> Result<Response<Self::DoGetStream>, Status> {
        let key = utf8_key(&request.get_ref().ticket)?;
        let (schema, batches) = self.store.read(&key).await?;
        debug!("Serving {} batches of {}", batches.len(), key);

        let batches = stream::iter(batches.into_iter().map(Ok::<_, FlightError>));
        let encoded = FlightDataEncoderBuilder::new()
            .with_schema(schema)
            .build(batches)
            .map_err(Status::from);
        Ok(Response::new(Box::pin(encoded)))
    }

    async fn do_put(
        &self,
        request: Request<Streaming<FlightData>>,
    ) -> Result<Response<Self::DoPutStream>, Status> {
        let flight_data: Vec<FlightData> = request.into_inner().try_collect().await?;
        let first = flight_data
            .first()
            .ok_or_else(|| Status::invalid_argument("Empty DoPut stream"))?;
        let descriptor = first
            .flight_descriptor
            .as_ref()
            .ok_or_else(|| Status::invalid_argument("DoPut stream is missing a FlightDescriptor"))?;
        let key = key_from_descriptor(descriptor)?;

        let schema = Schema::try_from(first)
            .map_err(|e| Status::invalid_argument(format!("Invalid schema message: {}", e)))?;
        let batches = flight_data_to_batches(&flight_data)
            .map_err(|e| Status::invalid_argument(format!("Invalid record batches: {}", e)))?;

        let rows: usize = batches.iter().map(|b| b.num_rows()).sum();
        self.store.write(&key, Arc::new(schema), batches).await?;
        info!("Stored dataset {} ({} rows)", key, rows);

        let ack = PutResult {
            app_metadata: Bytes::new(),
        };
        Ok(Response::new(Box::pin(stream::once(async {
            Ok::<_, Status>(ack)
        }))))
    }

    async fn do_action(
        &self,
        request: Request<Action>,
    ) -> Result<Response<Self::DoActionStream>, Status> {
        let action = request.into_inner();
        if action.r#type != DROP_DATASET_ACTION {
            return Err(Status::unimplemented(format!(
                "Unknown action type: {}",
                action.r#type
            )));
        }

        let key = utf8_key(&action.body)?;
        self.store.delete(&key).await?;
        info!("Dropped dataset {}", key);
        Ok(Response::new(Box::pin(stream::empty::<
            Result<arrow_flight::Result, Status>,
        >())))
    }

    async fn list_actions(
        &self,
        _request: Request<Empty>,
    ) -> Result<Response<Self::ListActionsStream>, Status> {
        let actions = vec![Ok(drop_dataset_action_type())];
        Ok(Response::new(stream::iter(actions).boxed()))
    }

    async fn do_exchange(
        &self,
        _request: Request<Streaming<FlightData>>,
    ) -> Result<Response<Self::DoExchangeStream>, Status> {
        Err(Status::unimplemented("do_exchange not implemented"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow_array::RecordBatch;
    use arrow_schema::{DataType, Field, SchemaRef};
    use async_trait::async_trait;
    use mockall::mock;
    use tonic::Code;

    mock! {
        pub Store {}
        #[async_trait]
        impl DatasetStore for Store {
            async fn list(&self) -> Result<Vec<DatasetEntry>, Status>;
            async fn entry(&self, key: &str) -> Result<DatasetEntry, Status>;
            async fn write(
                &self,
                key: &str,
                schema: SchemaRef,
                batches: Vec<RecordBatch>,
            ) -> Result<(), Status>;
            async fn read(&self, key: &str) -> Result<(SchemaRef, Vec<RecordBatch>), Status>;
            async fn delete(&self, key: &str) -> Result<(), Status>;
        }
    }

    fn entry(key: &str) -> DatasetEntry {
        DatasetEntry {
            key: key.to_string(),
            schema: Arc::new(Schema::new(vec![Field::new("Ozone", DataType::Int32, true)])),
            total_records: 153,
            total_bytes: 4096,
        }
    }

    fn service(store: MockStore) -> ParquetStorageService {
        ParquetStorageService::new(Box::new(store), "grpc+tcp://localhost:5005")
    }

    #[test]
    fn test_key_from_descriptor() {
        let path = FlightDescriptor::new_path(vec!["airquality.parquet".to_string()]);
        assert_eq!(key_from_descriptor(&path).unwrap(), "airquality.parquet");

        let nested = FlightDescriptor::new_path(vec!["a".to_string(), "b".to_string()]);
        assert_eq!(key_from_descriptor(&nested).unwrap_err().code(), Code::InvalidArgument);

        let cmd = FlightDescriptor::new_cmd("SELECT 1");
        assert_eq!(key_from_descriptor(&cmd).unwrap_err().code(), Code::InvalidArgument);
    }

    #[tokio::test]
    async fn test_get_flight_info_describes_dataset() {
        let mut store = MockStore::new();
        store
            .expect_entry()
            .times(1)
            .returning(|key| Ok(entry(key)));

        let descriptor = FlightDescriptor::new_path(vec!["airquality.parquet".to_string()]);
        let info = service(store)
            .get_flight_info(Request::new(descriptor.clone()))
            .await
            .unwrap()
            .into_inner();

        assert_eq!(info.flight_descriptor, Some(descriptor));
        assert_eq!(info.total_records, 153);
        assert_eq!(info.total_bytes, 4096);
        assert_eq!(info.endpoint.len(), 1);
        let endpoint = &info.endpoint[0];
        assert_eq!(
            endpoint.ticket.as_ref().map(|t| t.ticket.clone()),
            Some(Bytes::from("airquality.parquet"))
        );
        assert_eq!(endpoint.location[0].uri, "grpc+tcp://localhost:5005");

        let schema = info.try_decode_schema().unwrap();
        assert_eq!(schema.field(0).name(), "Ozone");
    }

    #[tokio::test]
    async fn test_list_flights_covers_every_entry() {
        let mut store = MockStore::new();
        store
            .expect_list()
            .times(1)
            .returning(|| Ok(vec![entry("a.parquet"), entry("b.parquet")]));

        let infos: Vec<FlightInfo> = service(store)
            .list_flights(Request::new(Criteria::default()))
            .await
            .unwrap()
            .into_inner()
            .try_collect()
            .await
            .unwrap();

        let paths: Vec<_> = infos
            .iter()
            .map(|info| info.flight_descriptor.as_ref().unwrap().path[0].clone())
            .collect();
        assert_eq!(paths, vec!["a.parquet", "b.parquet"]);
    }

    #[tokio::test]
    async fn test_drop_dataset_deletes_key() {
        let mut store = MockStore::new();
        store
            .expect_delete()
            .withf(|key| key.to_string() == "airquality.parquet")
            .times(1)
            .returning(|_| Ok(()));

        let results: Vec<_> = service(store)
            .do_action(Request::new(Action::new(DROP_DATASET_ACTION, "airquality.parquet")))
            .await
            .unwrap()
            .into_inner()
            .try_collect()
            .await
            .unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_action_is_unimplemented() {
        let store = MockStore::new();
        let err = service(store)
            .do_action(Request::new(Action::new("compact", "")))
            .await
            .err()
            .unwrap();
        assert_eq!(err.code(), Code::Unimplemented);
        assert!(err.message().contains("Unknown action type: compact"));
    }

    #[tokio::test]
    async fn test_store_errors_propagate() {
        let mut store = MockStore::new();
        store
            .expect_entry()
            .returning(|key| Err(Status::not_found(format!("Dataset {} not found", key))));

        let descriptor = FlightDescriptor::new_path(vec!["missing.parquet".to_string()]);
        let err = service(store)
            .get_flight_info(Request::new(descriptor))
            .await
            .unwrap_err();
        assert_eq!(err.code(), Code::NotFound);
    }

    #[tokio::test]
    async fn test_list_actions_offers_drop_dataset() {
        let actions: Vec<ActionType> = service(MockStore::new())
            .list_actions(Request::new(Empty {}))
            .await
            .unwrap()
            .into_inner()
            .try_collect()
            .await
            .unwrap();
        assert_eq!(actions, vec![drop_dataset_action_type()]);
    }
}
