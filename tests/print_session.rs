use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use image::{Rgba, RgbaImage};
use phomemo::{
    build_header, pack_bitmap, Printer, PrinterError, PrinterOptions, RawCanvas, Result,
    Transport, END_DATA, PACKET_SIZE_BYTES,
};

/// Records writes into a shared log so the test can inspect them after the
/// printer is done with the transport.
#[derive(Clone, Default)]
struct SharedLog(Arc<Mutex<Vec<Vec<u8>>>>);

#[async_trait]
impl Transport for SharedLog {
    async fn write_with_response(&mut self, data: &[u8]) -> Result<()> {
        self.0.lock().unwrap().push(data.to_vec());
        Ok(())
    }
}

fn label_image() -> RgbaImage {
    // 96 px wide like a 12mm label, one black stripe per 8-row band
    RgbaImage::from_fn(96, 320, |x, y| {
        if (y / 8) % 2 == 0 && x < 48 {
            Rgba([0, 0, 0, 255])
        } else if x >= 88 {
            Rgba([0, 0, 0, 0])
        } else {
            Rgba([255, 255, 255, 255])
        }
    })
}

#[tokio::test]
async fn image_prints_in_protocol_order() {
    let log = SharedLog::default();
    let mut printer = Printer::new(log.clone());
    let img = label_image();
    printer.print(&img).await.unwrap();

    let writes = log.0.lock().unwrap().clone();
    let expected_body = pack_bitmap(&img).unwrap();
    assert_eq!(expected_body.len(), 12 * 320);

    assert_eq!(writes.first().unwrap(), &build_header(12, 320).to_vec());
    assert_eq!(writes.last().unwrap(), &END_DATA.to_vec());

    let body = &writes[1..writes.len() - 1];
    assert_eq!(body.len(), expected_body.len().div_ceil(PACKET_SIZE_BYTES));
    assert!(body.iter().all(|c| c.len() <= PACKET_SIZE_BYTES));
    assert_eq!(body.concat(), expected_body);

    // first row: 6 black bytes then white, trailing transparent pixels stay white
    assert_eq!(&expected_body[..12], &[0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0, 0, 0, 0, 0, 0]);
    assert!(expected_body[12 * 8..12 * 9].iter().all(|&b| b == 0));
}

#[tokio::test]
async fn raw_canvas_and_image_encode_identically() {
    let img = label_image();
    let canvas = RawCanvas::from_rgba(96, 320, img.clone().into_raw()).unwrap();
    assert_eq!(pack_bitmap(&canvas).unwrap(), pack_bitmap(&img).unwrap());
}

#[tokio::test]
async fn printing_from_missing_file_fails_before_writing() {
    let log = SharedLog::default();
    let mut printer = Printer::with_options(log.clone(), PrinterOptions::new());
    let err = printer
        .print_image_from_path("does/not/exist.png")
        .await
        .unwrap_err();
    assert!(matches!(err, PrinterError::Image(_)));
    assert!(log.0.lock().unwrap().is_empty());
}

#[tokio::test]
async fn printing_from_file_round_trips_through_decoder() {
    let path = std::env::temp_dir().join(format!("phomemo-test-{}.png", std::process::id()));
    label_image().save(&path).unwrap();

    let log = SharedLog::default();
    let mut printer = Printer::new(log.clone());
    printer.print_image_from_path(&path).await.unwrap();
    std::fs::remove_file(&path).unwrap();

    let writes = log.0.lock().unwrap().clone();
    let body = writes[1..writes.len() - 1].concat();
    assert_eq!(body, pack_bitmap(&label_image()).unwrap());
}
