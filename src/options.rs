//! Printer configuration options.

use std::time::Duration;

use crate::protocol::PACKET_SIZE_BYTES;

/// Configuration for scanning, connecting and streaming.
#[derive(Debug, Clone)]
pub struct PrinterOptions {
    /// Maximum bytes per body write.
    pub packet_size: usize,

    /// How long `scan` listens for advertisements.
    pub scan_timeout: Duration,

    /// How long `connect` waits for the device to show up and connect.
    pub connect_timeout: Duration,
}

impl Default for PrinterOptions {
    fn default() -> Self {
        Self {
            packet_size: PACKET_SIZE_BYTES,
            scan_timeout: Duration::from_secs(3),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

impl PrinterOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: set packet size.
    ///
    /// # Panics
    /// Panics if `val` is zero.
    pub fn with_packet_size(mut self, val: usize) -> Self {
        assert!(val > 0, "Packet size must be greater than zero");
        self.packet_size = val;
        self
    }

    /// Builder: set scan timeout.
    pub fn with_scan_timeout(mut self, val: Duration) -> Self {
        self.scan_timeout = val;
        self
    }

    /// Builder: set connect timeout.
    pub fn with_connect_timeout(mut self, val: Duration) -> Self {
        self.connect_timeout = val;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let opts = PrinterOptions::default();
        assert_eq!(opts.packet_size, 128);
        assert_eq!(opts.scan_timeout, Duration::from_secs(3));
        assert_eq!(opts.connect_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_builder_chain() {
        let opts = PrinterOptions::new()
            .with_packet_size(64)
            .with_scan_timeout(Duration::from_secs(5))
            .with_connect_timeout(Duration::from_millis(1500));

        assert_eq!(opts.packet_size, 64);
        assert_eq!(opts.scan_timeout, Duration::from_secs(5));
        assert_eq!(opts.connect_timeout, Duration::from_millis(1500));
    }

    #[test]
    #[should_panic(expected = "Packet size must be greater than zero")]
    fn test_zero_packet_size() {
        PrinterOptions::new().with_packet_size(0);
    }
}
