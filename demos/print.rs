use std::io::{self, Write};
use std::time::Duration;

use phomemo::ble::{connect, scan};
use tracing_subscriber::EnvFilter;

/// Example: print an image file on a Phomemo D30
/// - Scans for BLE printers
/// - Lets user select device
/// - Prints the image given as the first argument
///
/// The image width must be a multiple of 8 pixels. Labels print sideways, so a
/// 40mm x 12mm label wants an image 96 pixels wide.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let Some(path) = std::env::args().nth(1) else {
        eprintln!("Usage: cargo run --example print -- <image>");
        return Ok(());
    };

    println!("Scanning for Phomemo BLE devices for 3 seconds...");
    let devices = scan(Duration::from_secs(3)).await?;
    if devices.is_empty() {
        println!(
            "No devices found. Make sure your Bluetooth adapter is up and the printer is powered on and advertising."
        );
        return Ok(());
    }

    println!("Found devices:");
    for (i, d) in devices.iter().enumerate() {
        println!("  {}) id={} name={:?}", i + 1, d.id, d.name);
    }

    let mut input = String::new();
    let chosen = loop {
        print!("Select device number to connect to (1-{}): ", devices.len());
        io::stdout().flush()?;
        input.clear();
        if io::stdin().read_line(&mut input)? == 0 {
            println!("No selection made.");
            return Ok(());
        }
        if let Ok(n) = input.trim().parse::<usize>() {
            if n >= 1 && n <= devices.len() {
                break &devices[n - 1];
            }
        }
        println!("Invalid selection.");
    };

    println!("Connecting to device id={} name={:?} ...", chosen.id, chosen.name);
    let mut printer = match connect(&chosen.id, Duration::from_secs(10)).await {
        Ok(p) => {
            println!("Connected successfully.");
            p
        }
        Err(e) => {
            eprintln!("Failed to connect: {}", e);
            return Ok(());
        }
    };

    println!("Sending print job ({})...", path);
    match printer.print_image_from_path(&path).await {
        Ok(()) => println!("Print job sent."),
        Err(e) => eprintln!("Print job failed: {}", e),
    }

    printer.transport.disconnect().await?;
    Ok(())
}
