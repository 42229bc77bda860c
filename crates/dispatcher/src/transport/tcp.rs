//! TcpTransport - newline-delimited metric lines over TCP

use contracts::{ContractError, MetricBatch, Transport};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tracing::{debug, instrument};

/// Plain TCP connection to a line-oriented backend (e.g. a carbon relay)
///
/// Nothing is ever read back from the socket.
pub struct TcpTransport {
    address: String,
    connect_timeout: Duration,
    stream: Option<TcpStream>,
}

impl TcpTransport {
    /// Create an unconnected transport; the delivery task dials it
    pub fn new(address: impl Into<String>, connect_timeout: Duration) -> Self {
        Self {
            address: address.into(),
            connect_timeout,
            stream: None,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    fn stream(&mut self) -> Result<&mut TcpStream, ContractError> {
        self.stream
            .as_mut()
            .ok_or_else(|| ContractError::destination_write(&self.address, "socket not connected"))
    }
}

impl Transport for TcpTransport {
    fn address(&self) -> &str {
        &self.address
    }

    #[instrument(name = "tcp_transport_connect", skip(self), fields(destination = %self.address))]
    async fn connect(&mut self) -> Result<(), ContractError> {
        self.stream = None;

        let stream = tokio::time::timeout(
            self.connect_timeout,
            TcpStream::connect(self.address.as_str()),
        )
        .await
        .map_err(|_| {
            ContractError::destination_connection(
                &self.address,
                format!("timed out after {}ms", self.connect_timeout.as_millis()),
            )
        })?
        .map_err(|e| ContractError::destination_connection(&self.address, e.to_string()))?;

        if let Err(e) = stream.set_nodelay(true) {
            debug!(destination = %self.address, error = %e, "Failed to set TCP_NODELAY");
        }

        debug!(destination = %self.address, "TcpTransport connected");
        self.stream = Some(stream);
        Ok(())
    }

    async fn write_batch(&mut self, batch: &MetricBatch) -> Result<(), ContractError> {
        let data = batch.encode();
        let address = self.address.clone();
        let stream = self.stream()?;

        let result = async {
            stream.write_all(&data).await?;
            stream.flush().await
        }
        .await;

        if let Err(e) = result {
            self.stream = None;
            return Err(ContractError::destination_write(address, e.to_string()));
        }
        Ok(())
    }

    #[instrument(name = "tcp_transport_close", skip(self), fields(destination = %self.address))]
    async fn close(&mut self) -> Result<(), ContractError> {
        if let Some(mut stream) = self.stream.take() {
            stream.shutdown().await?;
            debug!(destination = %self.address, "TcpTransport closed");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_tcp_transport_writes_lines() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap().to_string();

        let mut transport = TcpTransport::new(&address, Duration::from_secs(1));
        transport.connect().await.unwrap();
        let (mut socket, _) = listener.accept().await.unwrap();

        transport
            .write_batch(&MetricBatch::from_lines(["a 1 100", "b 2 200"]))
            .await
            .unwrap();
        transport.close().await.unwrap();
        assert!(!transport.is_connected());

        let mut received = String::new();
        socket.read_to_string(&mut received).await.unwrap();
        assert_eq!(received, "a 1 100\nb 2 200\n");
    }

    #[tokio::test]
    async fn test_tcp_transport_connect_refused() {
        // Bind then drop to get a port with nothing listening
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap().to_string();
        drop(listener);

        let mut transport = TcpTransport::new(&address, Duration::from_secs(1));
        let err = transport.connect().await.unwrap_err();
        assert!(matches!(err, ContractError::DestinationConnection { .. }));
        assert!(!transport.is_connected());
    }

    #[tokio::test]
    async fn test_tcp_transport_write_without_connect() {
        let mut transport = TcpTransport::new("127.0.0.1:9", Duration::from_secs(1));
        let err = transport
            .write_batch(&MetricBatch::from_lines(["a 1 1"]))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("not connected"));
    }
}
