use crate::canvas::PixelSource;
use crate::{PrinterError, Result};

/// Largest write the printer handles reliably.
pub const PACKET_SIZE_BYTES: usize = 128;

/// `ESC @` (initialize) followed by `GS v 0` with mode 0 (normal raster).
pub const HEADER_PREFIX: [u8; 6] = [0x1B, 0x40, 0x1D, 0x76, 0x30, 0x00];

/// `ESC d 0`: ends the print session.
pub const END_DATA: [u8; 3] = [0x1B, 0x64, 0x00];

/// Pixels with alpha below this never print.
pub const ALPHA_THRESHOLD: u8 = 128;

/// Builds the 10-byte header that starts a print session.
///
/// - `width`: bytes per raster row (pixel width / 8)
/// - `bytes`: second raster parameter; the printer reads it as the line count
///
/// Both values are written little-endian.
pub fn build_header(width: u16, bytes: u16) -> [u8; 10] {
    let [width_lo, width_hi] = width.to_le_bytes();
    let [bytes_lo, bytes_hi] = bytes.to_le_bytes();
    let mut out = [0u8; 10];
    out[..6].copy_from_slice(&HEADER_PREFIX);
    out[6] = width_lo;
    out[7] = width_hi;
    out[8] = bytes_lo;
    out[9] = bytes_hi;
    out
}

/// Classification of a single pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dot {
    /// Burn this dot.
    Black,
    /// Leave blank.
    White,
}

impl Dot {
    /// Bit value in the packed raster.
    pub fn bit(self) -> u8 {
        match self {
            Dot::Black => 1,
            Dot::White => 0,
        }
    }
}

/// Decides whether an RGBA pixel prints.
///
/// Mostly transparent pixels are white. Opaque pixels print only when pure
/// black; any color at all is white.
pub fn quantize(rgba: [u8; 4]) -> Dot {
    let [red, green, blue, alpha] = rgba;
    if alpha < ALPHA_THRESHOLD {
        return Dot::White;
    }
    if u16::from(red) + u16::from(green) + u16::from(blue) > 0 {
        Dot::White
    } else {
        Dot::Black
    }
}

/// Checks that `source` can be framed and returns `(bytes_per_row, height)`.
pub fn validate_dimensions<S: PixelSource + ?Sized>(source: &S) -> Result<(u16, u16)> {
    let (width, height) = (source.width(), source.height());
    if width == 0 || height == 0 {
        return Err(PrinterError::EmptyImage);
    }
    if width % 8 != 0 {
        return Err(PrinterError::WidthNotByteAligned(width));
    }
    let too_large = || PrinterError::DimensionTooLarge { width, height };
    let bytes_per_row = u16::try_from(width / 8).map_err(|_| too_large())?;
    let lines = u16::try_from(height).map_err(|_| too_large())?;
    Ok((bytes_per_row, lines))
}

/// Packs a pixel source into the printer's 1bpp raster.
///
/// - rows top to bottom
/// - 8 pixels per byte, leftmost pixel in bit 7
/// - black dots are 1, white dots are 0
///
/// The result is exactly `width / 8 * height` bytes.
pub fn pack_bitmap<S: PixelSource + ?Sized>(source: &S) -> Result<Vec<u8>> {
    let (bytes_per_row, lines) = validate_dimensions(source)?;
    Ok(pack_rows(source, bytes_per_row, lines))
}

/// Packs already validated dimensions.
fn pack_rows<S: PixelSource + ?Sized>(source: &S, bytes_per_row: u16, lines: u16) -> Vec<u8> {
    let mut out = Vec::with_capacity(bytes_per_row as usize * lines as usize);
    for y in 0..u32::from(lines) {
        for group in 0..u32::from(bytes_per_row) {
            let x = group * 8;
            let mut byte = 0u8;
            for bit in 0..8 {
                byte |= quantize(source.pixel(x + bit, y)).bit() << (7 - bit);
            }
            out.push(byte);
        }
    }
    out
}

/// Splits data into chunks of given size.
///
/// - `data`: input bytes
/// - `chunk_size`: size of each chunk
///
/// Returns Vec of byte slices
pub fn chunk_data(data: &[u8], chunk_size: usize) -> Vec<&[u8]> {
    if chunk_size == 0 {
        return vec![data];
    }
    data.chunks(chunk_size).collect()
}

/// A fully encoded print session: header, packed body, trailer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrintFrame {
    header: [u8; 10],
    body: Vec<u8>,
    packet_size: usize,
}

impl PrintFrame {
    /// Encodes `source`, splitting the body into packets of `packet_size` bytes.
    pub fn encode<S: PixelSource + ?Sized>(source: &S, packet_size: usize) -> Result<Self> {
        if packet_size == 0 {
            return Err(PrinterError::InvalidOptions(
                "packet size must be > 0".into(),
            ));
        }
        let (bytes_per_row, lines) = validate_dimensions(source)?;
        Ok(Self {
            header: build_header(bytes_per_row, lines),
            body: pack_rows(source, bytes_per_row, lines),
            packet_size,
        })
    }

    pub fn header(&self) -> &[u8; 10] {
        &self.header
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn trailer(&self) -> &[u8; 3] {
        &END_DATA
    }

    pub fn packet_size(&self) -> usize {
        self.packet_size
    }

    /// Body packets in send order.
    pub fn body_chunks(&self) -> Vec<&[u8]> {
        chunk_data(&self.body, self.packet_size)
    }

    /// Every write of the session in order: header, body packets, trailer.
    pub fn packets(&self) -> impl Iterator<Item = &[u8]> + '_ {
        std::iter::once(&self.header[..])
            .chain(self.body_chunks())
            .chain(std::iter::once(&END_DATA[..]))
    }
}
