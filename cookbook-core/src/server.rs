//! Running the Flight service on an ephemeral port.

use crate::service::ParquetStorageService;
use crate::storage::DatasetStore;
use arrow_flight::flight_service_server::FlightServiceServer;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::transport::Server;
use tracing::info;

pub type ServerError = Box<dyn std::error::Error + Send + Sync>;

/// A Flight server running on a background task.
#[derive(Debug)]
pub struct FlightServerHandle {
    port: u16,
    location: String,
    shutdown_tx: oneshot::Sender<()>,
    task: JoinHandle<Result<(), tonic::transport::Error>>,
}

impl FlightServerHandle {
    pub fn port(&self) -> u16 {
        self.port
    }

    /// `grpc+tcp://host:port` URI advertised in flight endpoints.
    pub fn location(&self) -> &str {
        &self.location
    }

    /// `http://host:port` URI for a tonic channel.
    pub fn uri(&self) -> String {
        format!("http://{}", self.location.trim_start_matches("grpc+tcp://"))
    }

    /// Stops accepting connections and waits for the server task to finish.
    pub async fn shutdown(self) -> Result<(), ServerError> {
        // The receiver is gone only if the server already exited.
        let _ = self.shutdown_tx.send(());
        self.task.await??;
        info!("Flight server on port {} stopped", self.port);
        Ok(())
    }
}

/// Binds `host` on a free port and serves a [`ParquetStorageService`] over `store`.
pub async fn spawn_flight_server(
    store: Box<dyn DatasetStore>,
    host: &str,
) -> Result<FlightServerHandle, ServerError> {
    let listener = TcpListener::bind((host, 0)).await?;
    let port = listener.local_addr()?.port();
    let location = format!("grpc+tcp://{}:{}", host, port);

    let service = ParquetStorageService::new(store, location.clone());
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let incoming = TcpListenerStream::new(listener);

    let task = tokio::spawn(async move {
        Server::builder()
            .add_service(FlightServiceServer::new(service))
            .serve_with_incoming_shutdown(incoming, async {
                let _ = shutdown_rx.await;
            })
            .await
    });

    info!("Flight server listening on {}", location);
    Ok(FlightServerHandle {
        port,
        location,
        shutdown_tx,
        task,
    })
}
