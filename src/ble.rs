//! BLE transport for Phomemo printers using btleplug.
//!
//! Provides scanning, connecting by device id and write-with-response
//! transmission to the printer's write characteristic.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use btleplug::api::{
    Central, CentralEvent, Characteristic, Manager as _, Peripheral as _, ScanFilter, WriteType,
};
use btleplug::platform::{Adapter, Manager, Peripheral};
use futures::StreamExt;
use uuid::Uuid;

use crate::guard::{release_on_error, timeout_with_cleanup};
use crate::options::PrinterOptions;
use crate::printer::{Printer, Transport};
use crate::{PrinterError, Result};

/// Service advertised by D30-family printers.
pub const SERVICE_UUID: Uuid = Uuid::from_u128(0x0000_ff00_0000_1000_8000_00805f9b34fb);

/// Characteristic that accepts print data.
pub const WRITE_CHARACTERISTIC: Uuid = Uuid::from_u128(0x0000_ff02_0000_1000_8000_00805f9b34fb);

/// Some units only advertise their name, not the service.
const NAME_PREFIX: &str = "D30";

const PERIPHERAL_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// A printer found during a scan.
#[derive(Debug, Clone)]
pub struct DeviceInfo {
    /// Platform-specific device identifier (address on Linux, UUID on macOS).
    pub id: String,
    pub name: Option<String>,
}

/// Printer connected over BLE.
pub type BlePrinter = Printer<BleTransport>;

/// Connected peripheral plus its write characteristic.
pub struct BleTransport {
    peripheral: Peripheral,
    write_char: Characteristic,
}

impl BleTransport {
    pub async fn is_connected(&self) -> bool {
        self.peripheral.is_connected().await.unwrap_or(false)
    }

    pub async fn disconnect(&self) -> Result<()> {
        tracing::info!("Disconnecting BLE device");
        self.peripheral
            .disconnect()
            .await
            .map_err(|e| PrinterError::BleConnection(e.to_string()))
    }
}

#[async_trait]
impl Transport for BleTransport {
    async fn write_with_response(&mut self, data: &[u8]) -> Result<()> {
        self.peripheral
            .write(&self.write_char, data, WriteType::WithResponse)
            .await
            .map_err(|e| PrinterError::BleWrite(format!("{} bytes: {}", data.len(), e)))
    }
}

async fn first_adapter() -> Result<Adapter> {
    let manager = Manager::new()
        .await
        .map_err(|e| PrinterError::BleConnection(e.to_string()))?;
    manager
        .adapters()
        .await
        .map_err(|e| PrinterError::BleConnection(e.to_string()))?
        .into_iter()
        .next()
        .ok_or_else(|| PrinterError::BleConnection("No BLE adapter found".into()))
}

fn is_printer(services: &[Uuid], name: Option<&str>) -> bool {
    services.contains(&SERVICE_UUID) || name.is_some_and(|n| n.starts_with(NAME_PREFIX))
}

/// Scan for printers for `timeout` and return everything that looks like one.
pub async fn scan(timeout: Duration) -> Result<Vec<DeviceInfo>> {
    let adapter = first_adapter().await?;
    tracing::info!(timeout_ms = timeout.as_millis() as u64, "Starting BLE scan");

    let mut events = adapter
        .events()
        .await
        .map_err(|e| PrinterError::BleScan(e.to_string()))?;
    adapter
        .start_scan(ScanFilter::default())
        .await
        .map_err(|e| PrinterError::BleScan(e.to_string()))?;

    let deadline = tokio::time::sleep(timeout);
    tokio::pin!(deadline);

    let mut found = Vec::new();
    let mut seen = HashSet::new();
    loop {
        tokio::select! {
            _ = &mut deadline => break,
            event = events.next() => {
                let Some(event) = event else { break };
                let (CentralEvent::DeviceDiscovered(id) | CentralEvent::DeviceUpdated(id)) = event else {
                    continue;
                };
                let id_str = id.to_string();
                if seen.contains(&id_str) {
                    continue;
                }
                let Ok(peripheral) = adapter.peripheral(&id).await else { continue };
                let Ok(Some(props)) = peripheral.properties().await else { continue };
                if is_printer(&props.services, props.local_name.as_deref()) {
                    tracing::info!(id = %id_str, name = ?props.local_name, "Found printer");
                    seen.insert(id_str.clone());
                    found.push(DeviceInfo {
                        id: id_str,
                        name: props.local_name,
                    });
                }
            }
        }
    }

    adapter
        .stop_scan()
        .await
        .map_err(|e| PrinterError::BleScan(e.to_string()))?;
    tracing::info!(count = found.len(), "BLE scan complete");
    Ok(found)
}

/// Connect to the printer with the given id, as returned by [`scan`].
pub async fn connect(id: &str, timeout: Duration) -> Result<BlePrinter> {
    connect_with_options(id, PrinterOptions::new().with_connect_timeout(timeout)).await
}

/// Connect using all settings from `options`.
pub async fn connect_with_options(id: &str, options: PrinterOptions) -> Result<BlePrinter> {
    let adapter = first_adapter().await?;
    let timeout = options.connect_timeout;

    let transport = timeout_with_cleanup(timeout, open_transport(&adapter, id), || async {
        // a scan started by `find_peripheral` would otherwise keep running
        let _ = adapter.stop_scan().await;
    })
    .await?;

    Ok(Printer::with_options(transport, options))
}

async fn open_transport(adapter: &Adapter, id: &str) -> Result<BleTransport> {
    let peripheral = find_peripheral(adapter, id).await?;
    tracing::info!(id, "Connecting to device");

    peripheral
        .connect()
        .await
        .map_err(|e| PrinterError::BleConnection(e.to_string()))?;

    let write_char = release_on_error(find_write_characteristic(&peripheral).await, || async {
        tracing::info!(id, "Setup failed, disconnecting");
        let _ = peripheral.disconnect().await;
    })
    .await?;

    tracing::info!(id, characteristic = %write_char.uuid, "Connected");
    Ok(BleTransport {
        peripheral,
        write_char,
    })
}

async fn find_write_characteristic(peripheral: &Peripheral) -> Result<Characteristic> {
    peripheral
        .discover_services()
        .await
        .map_err(|e| PrinterError::BleConnection(e.to_string()))?;
    peripheral
        .characteristics()
        .into_iter()
        .find(|c| c.uuid == WRITE_CHARACTERISTIC)
        .ok_or(PrinterError::MissingCharacteristic)
}

/// Waits until the adapter knows about `id`, scanning if needed.
/// Runs until found; the caller bounds it with a timeout.
async fn find_peripheral(adapter: &Adapter, id: &str) -> Result<Peripheral> {
    let mut scanning = false;
    loop {
        let peripherals = adapter
            .peripherals()
            .await
            .map_err(|e| PrinterError::BleScan(e.to_string()))?;
        if let Some(p) = peripherals.into_iter().find(|p| p.id().to_string() == id) {
            if scanning {
                adapter
                    .stop_scan()
                    .await
                    .map_err(|e| PrinterError::BleScan(e.to_string()))?;
            }
            return Ok(p);
        }
        if !scanning {
            tracing::debug!(id, "Device not cached, scanning");
            adapter
                .start_scan(ScanFilter::default())
                .await
                .map_err(|e| PrinterError::BleScan(e.to_string()))?;
            scanning = true;
        }
        tokio::time::sleep(PERIPHERAL_POLL_INTERVAL).await;
    }
}
