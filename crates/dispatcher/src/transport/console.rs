//! ConsoleTransport - dumps metric lines to stdout

use contracts::{ContractError, MetricBatch, Transport};
use tokio::io::{AsyncWriteExt, Stdout};
use tracing::{debug, instrument};

/// Transport that writes batches to the process stdout, for debugging
pub struct ConsoleTransport {
    label: String,
    out: Option<Stdout>,
}

impl ConsoleTransport {
    /// Create a new ConsoleTransport with the given label
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            out: None,
        }
    }
}

impl Transport for ConsoleTransport {
    fn address(&self) -> &str {
        &self.label
    }

    async fn connect(&mut self) -> Result<(), ContractError> {
        self.out = Some(tokio::io::stdout());
        Ok(())
    }

    #[instrument(
        name = "console_transport_write",
        skip(self, batch),
        fields(destination = %self.label, lines = batch.len())
    )]
    async fn write_batch(&mut self, batch: &MetricBatch) -> Result<(), ContractError> {
        let out = self
            .out
            .as_mut()
            .ok_or_else(|| ContractError::destination_write(&self.label, "console not open"))?;
        out.write_all(&batch.encode()).await?;
        out.flush().await?;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), ContractError> {
        self.out = None;
        debug!(destination = %self.label, "ConsoleTransport closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_console_transport_write() {
        let mut transport = ConsoleTransport::new("console");
        transport.connect().await.unwrap();
        let result = transport
            .write_batch(&MetricBatch::from_lines(["a 1 100"]))
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_console_transport_requires_connect() {
        let mut transport = ConsoleTransport::new("console");
        assert_eq!(transport.address(), "console");
        assert!(transport
            .write_batch(&MetricBatch::from_lines(["a 1 100"]))
            .await
            .is_err());
    }
}
