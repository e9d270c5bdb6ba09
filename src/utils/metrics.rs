//! Observability and Metrics
//!
//! Atomic counters for framing and connection activity. The framer and the
//! TCP client record into the process-wide instance returned by
//! [`global_metrics`].

use crate::error::ProtocolError;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::{debug, info};

/// Protocol counters
#[derive(Debug)]
pub struct Metrics {
    /// Total connections established
    pub connections_total: AtomicU64,
    /// Currently open connections
    pub connections_active: AtomicU64,
    /// Buckets written to a peer
    pub buckets_sent: AtomicU64,
    /// Buckets fully received and validated
    pub buckets_received: AtomicU64,
    /// Bytes written, headers included
    pub bytes_sent: AtomicU64,
    /// Bytes received, headers included
    pub bytes_received: AtomicU64,
    /// Streams rejected for a bad bucket signature
    pub signature_rejections: AtomicU64,
    /// Buckets rejected for exceeding the payload limit
    pub oversize_rejections: AtomicU64,
    /// Payloads that failed portable-storage decoding
    pub decode_errors: AtomicU64,
    /// Connect failures and timeouts
    pub connection_errors: AtomicU64,
    start_time: Instant,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            connections_total: AtomicU64::new(0),
            connections_active: AtomicU64::new(0),
            buckets_sent: AtomicU64::new(0),
            buckets_received: AtomicU64::new(0),
            bytes_sent: AtomicU64::new(0),
            bytes_received: AtomicU64::new(0),
            signature_rejections: AtomicU64::new(0),
            oversize_rejections: AtomicU64::new(0),
            decode_errors: AtomicU64::new(0),
            connection_errors: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn connection_established(&self) {
        self.connections_total.fetch_add(1, Ordering::Relaxed);
        self.connections_active.fetch_add(1, Ordering::Relaxed);
    }

    pub fn connection_closed(&self) {
        // saturating: a close without a matching open must not wrap
        let _ = self
            .connections_active
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |v| v.checked_sub(1));
    }

    pub fn bucket_sent(&self, byte_count: u64) {
        self.buckets_sent.fetch_add(1, Ordering::Relaxed);
        self.bytes_sent.fetch_add(byte_count, Ordering::Relaxed);
    }

    pub fn bucket_received(&self, byte_count: u64) {
        self.buckets_received.fetch_add(1, Ordering::Relaxed);
        self.bytes_received.fetch_add(byte_count, Ordering::Relaxed);
    }

    pub fn connection_error(&self) {
        self.connection_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a framing or decoding failure under the matching counter
    pub fn record_error(&self, error: &ProtocolError) {
        match error {
            ProtocolError::BadSignature { .. } => {
                self.signature_rejections.fetch_add(1, Ordering::Relaxed);
            }
            ProtocolError::PacketTooLarge { .. } => {
                self.oversize_rejections.fetch_add(1, Ordering::Relaxed);
            }
            ProtocolError::Timeout | ProtocolError::Io(_) | ProtocolError::ConnectionClosed => {
                self.connection_errors.fetch_add(1, Ordering::Relaxed);
            }
            _ => {
                self.decode_errors.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            connections_total: self.connections_total.load(Ordering::Relaxed),
            connections_active: self.connections_active.load(Ordering::Relaxed),
            buckets_sent: self.buckets_sent.load(Ordering::Relaxed),
            buckets_received: self.buckets_received.load(Ordering::Relaxed),
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
            signature_rejections: self.signature_rejections.load(Ordering::Relaxed),
            oversize_rejections: self.oversize_rejections.load(Ordering::Relaxed),
            decode_errors: self.decode_errors.load(Ordering::Relaxed),
            connection_errors: self.connection_errors.load(Ordering::Relaxed),
            uptime_seconds: self.start_time.elapsed().as_secs(),
        }
    }

    pub fn log_metrics(&self) {
        let snapshot = self.snapshot();
        info!(
            connections_total = snapshot.connections_total,
            connections_active = snapshot.connections_active,
            buckets_sent = snapshot.buckets_sent,
            buckets_received = snapshot.buckets_received,
            bytes_sent = snapshot.bytes_sent,
            bytes_received = snapshot.bytes_received,
            signature_rejections = snapshot.signature_rejections,
            oversize_rejections = snapshot.oversize_rejections,
            decode_errors = snapshot.decode_errors,
            connection_errors = snapshot.connection_errors,
            uptime_seconds = snapshot.uptime_seconds,
            "levin metrics snapshot"
        );
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time copy of [`Metrics`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub connections_total: u64,
    pub connections_active: u64,
    pub buckets_sent: u64,
    pub buckets_received: u64,
    pub bytes_sent: u64,
    pub bytes_received: u64,
    pub signature_rejections: u64,
    pub oversize_rejections: u64,
    pub decode_errors: u64,
    pub connection_errors: u64,
    pub uptime_seconds: u64,
}

static METRICS: once_cell::sync::Lazy<Metrics> = once_cell::sync::Lazy::new(Metrics::new);

/// Process-wide metrics instance
pub fn global_metrics() -> &'static Metrics {
    &METRICS
}

/// Logs how long an operation took when dropped
pub struct Timer {
    start: Instant,
    operation: &'static str,
}

impl Timer {
    pub fn start(operation: &'static str) -> Self {
        Self {
            start: Instant::now(),
            operation,
        }
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        debug!(
            operation = self.operation,
            duration_ms = self.start.elapsed().as_millis() as u64,
            "operation completed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters() {
        let metrics = Metrics::new();
        metrics.connection_established();
        metrics.bucket_sent(40);
        metrics.bucket_received(60);
        metrics.bucket_received(33);
        metrics.connection_closed();
        metrics.connection_closed();

        let snap = metrics.snapshot();
        assert_eq!(snap.connections_total, 1);
        assert_eq!(snap.connections_active, 0);
        assert_eq!(snap.buckets_sent, 1);
        assert_eq!(snap.buckets_received, 2);
        assert_eq!(snap.bytes_received, 93);
    }

    #[test]
    fn test_record_error_classification() {
        let metrics = Metrics::new();
        metrics.record_error(&ProtocolError::BadSignature {
            expected: 1,
            found: 2,
        });
        metrics.record_error(&ProtocolError::PacketTooLarge { size: 9, limit: 8 });
        metrics.record_error(&ProtocolError::UnknownType(99));
        metrics.record_error(&ProtocolError::Timeout);

        let snap = metrics.snapshot();
        assert_eq!(snap.signature_rejections, 1);
        assert_eq!(snap.oversize_rejections, 1);
        assert_eq!(snap.decode_errors, 1);
        assert_eq!(snap.connection_errors, 1);
    }

    #[test]
    fn test_global_is_shared() {
        let before = global_metrics().snapshot().buckets_sent;
        global_metrics().bucket_sent(1);
        assert!(global_metrics().snapshot().buckets_sent > before);
    }
}
