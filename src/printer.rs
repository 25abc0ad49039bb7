use std::path::Path;

use async_trait::async_trait;

use crate::canvas::PixelSource;
use crate::options::PrinterOptions;
use crate::protocol::PrintFrame;
use crate::Result;

/// Byte transport to the printer.
/// Implement this for your BLE or mock transport.
#[async_trait]
pub trait Transport: Send {
    /// Write bytes and return once the link has accepted them.
    async fn write_with_response(&mut self, data: &[u8]) -> Result<()>;
}

/// Async print API over any transport.
///
/// Printing takes `&mut self`, so one connection never carries two sessions at
/// once. Share a printer between tasks behind a `tokio::sync::Mutex`.
pub struct Printer<T: Transport> {
    pub transport: T,
    pub options: PrinterOptions,
}

impl<T: Transport> Printer<T> {
    pub fn new(transport: T) -> Self {
        Self::with_options(transport, PrinterOptions::default())
    }

    pub fn with_options(transport: T, options: PrinterOptions) -> Self {
        Self { transport, options }
    }

    /// Encode and print a pixel source.
    ///
    /// The width must be a multiple of 8. Nothing is written if the image
    /// fails validation.
    pub async fn print<S: PixelSource + ?Sized>(&mut self, source: &S) -> Result<()> {
        let frame = PrintFrame::encode(source, self.options.packet_size)?;
        self.send_frame(&frame).await
    }

    /// Print an image file in any format the `image` crate can decode.
    pub async fn print_image_from_path(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let img = image::open(path)?.to_rgba8();
        tracing::info!(
            path = %path.display(),
            width = img.width(),
            height = img.height(),
            "Loaded image"
        );
        self.print(&img).await
    }

    /// Stream an encoded frame: header, body packets, trailer.
    ///
    /// Each write is awaited before the next one starts. The first failed
    /// write ends the session; the trailer is not sent after a failure.
    pub async fn send_frame(&mut self, frame: &PrintFrame) -> Result<()> {
        let total = frame.body().len();
        tracing::info!(
            bytes_per_row = u16::from_le_bytes([frame.header()[6], frame.header()[7]]),
            total_bytes = total,
            packet_size = frame.packet_size(),
            "Starting print session"
        );

        self.transport.write_with_response(frame.header()).await?;

        let mut sent = 0;
        for chunk in frame.body_chunks() {
            self.transport.write_with_response(chunk).await?;
            sent += chunk.len();
            tracing::debug!(sent, total, "Sent body chunk");
        }

        self.transport.write_with_response(frame.trailer()).await?;
        tracing::info!(total_bytes = total, "Print session complete");
        Ok(())
    }

    pub fn into_inner(self) -> T {
        self.transport
    }
}
