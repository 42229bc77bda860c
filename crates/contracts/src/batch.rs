//! MetricBatch - ingress output, distributor input
//!
//! One upstream submission of metric lines.

use bytes::{BufMut, Bytes, BytesMut};
use std::sync::Arc;

/// Ordered, immutable sequence of metric lines from a single submission.
///
/// Cloning is cheap: the lines are shared, so a broadcast copy per
/// destination does not duplicate the payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricBatch {
    lines: Arc<[String]>,
    tenant: Option<Arc<str>>,
}

impl MetricBatch {
    /// Create a batch without tenant identity
    pub fn new(lines: Vec<String>) -> Self {
        Self {
            lines: lines.into(),
            tenant: None,
        }
    }

    /// Create a batch submitted by `tenant`
    pub fn with_tenant(lines: Vec<String>, tenant: impl Into<String>) -> Self {
        Self {
            lines: lines.into(),
            tenant: Some(Arc::from(tenant.into())),
        }
    }

    /// Convenience constructor from string slices
    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(lines.into_iter().map(Into::into).collect())
    }

    /// Metric lines in submission order
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Number of lines
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Submitting tenant, if the ingress attached one
    pub fn tenant(&self) -> Option<&str> {
        self.tenant.as_deref()
    }

    /// Key used by hash routing. Batches without a tenant share the empty key.
    pub fn routing_key(&self) -> &str {
        self.tenant().unwrap_or("")
    }

    /// Prepend `<tenant>.` to every line.
    ///
    /// Returns the batch unchanged when no tenant is attached.
    pub fn with_tenant_prefix(self) -> Self {
        let Some(tenant) = self.tenant.clone() else {
            return self;
        };
        let lines: Vec<String> = self
            .lines
            .iter()
            .map(|line| format!("{tenant}.{line}"))
            .collect();
        Self {
            lines: lines.into(),
            tenant: Some(tenant),
        }
    }

    /// Newline-delimited wire encoding.
    ///
    /// Lines are written verbatim; a trailing `\n` is added only where missing.
    pub fn encode(&self) -> Bytes {
        let size: usize = self.lines.iter().map(|l| l.len() + 1).sum();
        let mut buf = BytesMut::with_capacity(size);
        for line in self.lines.iter() {
            buf.put_slice(line.as_bytes());
            if !line.ends_with('\n') {
                buf.put_u8(b'\n');
            }
        }
        buf.freeze()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_adds_missing_newlines() {
        let batch = MetricBatch::from_lines(["a 1 100", "b 2 200\n"]);
        assert_eq!(&batch.encode()[..], b"a 1 100\nb 2 200\n");
    }

    #[test]
    fn test_clone_shares_lines() {
        let batch = MetricBatch::from_lines(["a 1 100"]);
        let copy = batch.clone();
        assert!(std::ptr::eq(batch.lines().as_ptr(), copy.lines().as_ptr()));
    }

    #[test]
    fn test_routing_key_defaults_to_empty() {
        let batch = MetricBatch::from_lines(["a 1 100"]);
        assert_eq!(batch.routing_key(), "");

        let batch = MetricBatch::with_tenant(vec!["a 1 100".into()], "tenantX");
        assert_eq!(batch.routing_key(), "tenantX");
    }

    #[test]
    fn test_tenant_prefix() {
        let batch = MetricBatch::with_tenant(vec!["cpu.load 1 100".into()], "acme");
        let prefixed = batch.with_tenant_prefix();
        assert_eq!(prefixed.lines(), ["acme.cpu.load 1 100".to_string()]);
        assert_eq!(prefixed.tenant(), Some("acme"));

        let untagged = MetricBatch::from_lines(["cpu.load 1 100"]).with_tenant_prefix();
        assert_eq!(untagged.lines(), ["cpu.load 1 100".to_string()]);
    }
}
