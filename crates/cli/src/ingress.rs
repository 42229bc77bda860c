//! Plaintext line ingress for development and local testing.
//!
//! Accepts newline-delimited metric lines over TCP and submits them to the
//! distributor. No authentication: every batch carries the configured tenant.

use std::time::Duration;

use contracts::MetricBatch;
use dispatcher::{DispatcherError, IngressHandle};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info, instrument, trace, warn};

use crate::error::{CliError, Result};

/// Longest accepted line, newline included; longer lines close the connection
pub const MAX_LINE_BYTES: usize = 64 * 1024;

/// Pause after a failed accept
pub const ACCEPT_RETRY_DELAY: Duration = Duration::from_millis(100);

/// Bind the ingress socket
pub async fn bind(address: &str) -> Result<TcpListener> {
    TcpListener::bind(address)
        .await
        .map_err(|e| CliError::listen(address, e))
}

/// Line ingress settings shared by every connection
#[derive(Clone)]
pub struct LineIngress {
    handle: IngressHandle,
    tenant: String,
    key_prefix: bool,
    batch_lines: usize,
}

impl LineIngress {
    pub fn new(
        handle: IngressHandle,
        tenant: impl Into<String>,
        key_prefix: bool,
        batch_lines: usize,
    ) -> Self {
        Self {
            handle,
            tenant: tenant.into(),
            key_prefix,
            batch_lines: batch_lines.max(1),
        }
    }

    /// Accept connections until the inbound queue closes
    #[instrument(name = "line_ingress", skip_all, fields(tenant = %self.tenant))]
    pub async fn serve(self, listener: TcpListener) {
        if let Ok(address) = listener.local_addr() {
            info!(address = %address, "Line ingress listening");
        }

        while !self.handle.is_closed() {
            match listener.accept().await {
                Ok((stream, peer)) => {
                    debug!(peer = %peer, "Ingress connection accepted");
                    let ingress = self.clone();
                    tokio::spawn(async move {
                        ingress.handle_connection(stream).await;
                        debug!(peer = %peer, "Ingress connection closed");
                    });
                }
                Err(e) => accept_failed(&e).await,
            }
        }
    }

    async fn handle_connection(&self, stream: TcpStream) {
        let mut reader = BufReader::new(stream);
        let mut lines = Vec::new();
        let mut buf = String::new();

        loop {
            buf.clear();
            match (&mut reader).take(MAX_LINE_BYTES as u64).read_line(&mut buf).await {
                Ok(0) => break,
                Ok(n) if n == MAX_LINE_BYTES && !buf.ends_with('\n') => {
                    warn!(limit = MAX_LINE_BYTES, "Ingress line too long, closing connection");
                    break;
                }
                Ok(_) => {}
                Err(e) => {
                    warn!(error = %e, "Ingress read failed");
                    break;
                }
            }

            let line = buf.trim_end_matches(['\r', '\n']);
            if !line.is_empty() {
                lines.push(line.to_string());
            }

            // One batch per read, capped at batch_lines
            let drained = reader.buffer().is_empty();
            if lines.len() >= self.batch_lines || (drained && !lines.is_empty()) {
                if !self.submit(std::mem::take(&mut lines)) {
                    return;
                }
            }
        }

        if !lines.is_empty() {
            self.submit(lines);
        }
    }

    /// Returns false once the inbound queue is closed
    fn submit(&self, lines: Vec<String>) -> bool {
        let batch = self.to_batch(lines);
        let count = batch.len();

        match self.handle.submit(batch) {
            Ok(()) => {
                trace!(lines = count, "Batch submitted");
                true
            }
            Err(DispatcherError::InboundFull { lines }) => {
                observability::record_inbound_rejected(lines);
                warn!(lines, "Inbound queue full, batch rejected");
                true
            }
            Err(e) => {
                debug!(error = %e, "Inbound queue closed");
                false
            }
        }
    }

    fn to_batch(&self, lines: Vec<String>) -> MetricBatch {
        let batch = MetricBatch::with_tenant(lines, self.tenant.as_str());
        if self.key_prefix {
            batch.with_tenant_prefix()
        } else {
            batch
        }
    }
}

/// Log a failed accept and pause before the next one
async fn accept_failed(error: &std::io::Error) {
    warn!(error = %error, "Ingress accept failed");
    tokio::time::sleep(ACCEPT_RETRY_DELAY).await;
}
