//! Phomemo library: print images to Phomemo D30 label printers via BLE.
//!
//! Main modules:
//! - ble: BLE transport (scan, connect, write-with-response)
//! - canvas: pixel sources the encoder reads from
//! - options: printer configuration
//! - printer: async print session over any transport
//! - protocol: quantizing, bitmap packing and session framing

pub mod ble;
pub mod canvas;
mod guard;
pub mod options;
pub mod printer;
pub mod protocol;

/// BLE API: scan/connect to printers
pub use ble::{connect, scan, BlePrinter, BleTransport, DeviceInfo};
/// Pixel sources
pub use canvas::{PixelSource, RawCanvas};
pub use options::PrinterOptions;
/// Print session API
pub use printer::{Printer, Transport};
/// Protocol utilities (header, packing, chunking)
pub use protocol::*;

/// Errors that can occur while encoding or sending a print.
#[derive(Debug, thiserror::Error)]
pub enum PrinterError {
    #[error("Image has zero width or height")]
    EmptyImage,

    #[error("Image width {0} is not a multiple of 8")]
    WidthNotByteAligned(u32),

    #[error("Image {width}x{height} exceeds the 16-bit header fields")]
    DimensionTooLarge { width: u32, height: u32 },

    #[error("Canvas buffer has {actual} bytes, expected {expected}")]
    CanvasSize { expected: usize, actual: usize },

    #[error("Invalid printer options: {0}")]
    InvalidOptions(String),

    #[error("Printer not found: {0}")]
    PrinterNotFound(String),

    #[error("Missing write characteristic on connected device")]
    MissingCharacteristic,

    #[error("BLE scan error: {0}")]
    BleScan(String),

    #[error("BLE connection error: {0}")]
    BleConnection(String),

    #[error("BLE write error: {0}")]
    BleWrite(String),

    #[error("Not connected to any device")]
    NotConnected,

    #[error("Connection timeout after {0} seconds")]
    ConnectionTimeout(u64),

    #[error(transparent)]
    Image(#[from] image::ImageError),
}

/// Result type alias for printer operations.
pub type Result<T> = std::result::Result<T, PrinterError>;
