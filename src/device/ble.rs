use crate::device::{NotificationReceiver, Transport, TransportError, TransportOutput};
use crate::{prelude::*, protocol::*};
use async_stream::stream;
use btleplug::api::{Central, Characteristic, Manager as _, Peripheral as _, ScanFilter, WriteType};
use btleplug::platform::{Adapter, Manager};
use stream_cancel::{StreamExt as _, Tripwire};
use tokio::time;

const SCAN_INTERVAL: Duration = Duration::from_millis(500);

/// The concrete peripheral type to avoid going crazy here managaing an unsized trait.
type Peripheral = <Adapter as Central>::Peripheral;

/// Bluetooth implementation of [`Transport`], running on top of [`btleplug`].
pub struct BleTransport {
    peripheral: MachinePeripheral,
    notifications: NotificationReceiver,
}

impl BleTransport {
    /// Scans every adapter for the peripheral at `address`, connects to it and subscribes to the
    /// control characteristic.
    pub async fn connect(
        address: &str,
        variant: ProtocolVariant,
        scan_timeout: Duration,
    ) -> Result<Self, TransportError> {
        let catalog = variant.catalog();
        let manager = Manager::new().await?;
        let adapters = manager.adapters().await?;
        if adapters.is_empty() {
            return Err(TransportError::NotFound);
        }

        trace_packet!("Looking for peripheral '{}'", address);
        for adapter in &adapters {
            adapter.start_scan(scan_filter(catalog)).await?;
        }
        let found = time::timeout(scan_timeout, find_peripheral(&adapters, address)).await;
        for adapter in &adapters {
            let _ = adapter.stop_scan().await;
        }
        let peripheral = found.map_err(|_| TransportError::NotFound)??;

        trace_packet!("Got peripheral: {:?}", peripheral.id());
        let peripheral = MachinePeripheral::connect(peripheral, catalog).await?;
        trace_packet!("Connected");
        let notifications =
            NotificationReceiver::from_stream(Box::pin(peripheral.notifications().await?), true);

        Ok(BleTransport {
            peripheral,
            notifications,
        })
    }
}

/// Polls the adapters until one of them has seen the peripheral at `address`.
async fn find_peripheral(adapters: &[Adapter], address: &str) -> Result<Peripheral, TransportError> {
    loop {
        for adapter in adapters {
            for peripheral in adapter.peripherals().await? {
                if MachinePeripheral::matches(&peripheral, address) {
                    return Ok(peripheral);
                }
            }
        }
        time::sleep(SCAN_INTERVAL).await;
    }
}

/// Lists `(name, address)` for every named peripheral seen within `scan_timeout`, filtered by the
/// variant's service where one is known.
pub async fn scan(
    variant: ProtocolVariant,
    scan_timeout: Duration,
) -> Result<Vec<(String, String)>, TransportError> {
    let catalog = variant.catalog();
    let manager = Manager::new().await?;
    let adapters = manager.adapters().await?;
    if adapters.is_empty() {
        return Err(TransportError::NotFound);
    }
    for adapter in &adapters {
        trace_packet!("Starting scan on {}...", adapter.adapter_info().await?);
        adapter.start_scan(scan_filter(catalog)).await?;
    }
    time::sleep(scan_timeout).await;

    let mut found = vec![];
    for adapter in &adapters {
        for peripheral in adapter.peripherals().await? {
            let properties = match peripheral.properties().await? {
                Some(properties) => properties,
                None => continue,
            };
            trace_packet!("Found peripheral, address = {:?}", properties.address);
            if let Some(name) = properties.local_name {
                found.push((name, properties.address.to_string()));
            }
        }
        let _ = adapter.stop_scan().await;
    }
    found.sort();
    found.dedup();
    Ok(found)
}

fn scan_filter(catalog: &CommandCatalog) -> ScanFilter {
    ScanFilter {
        services: catalog.service.into_iter().collect(),
    }
}

impl Transport for BleTransport {
    fn read<'a>(&'a self) -> AsyncFuture<'a, Option<TransportOutput>> {
        Box::pin(self.notifications.recv())
    }

    fn write<'a>(&'a self, data: Frame) -> AsyncFuture<'a, ()> {
        Box::pin(self.peripheral.write(data))
    }

    fn read_device_name<'a>(&'a self) -> AsyncFuture<'a, Vec<u8>> {
        Box::pin(self.peripheral.read_name())
    }

    fn address(&self) -> String {
        self.peripheral.address()
    }
}

/// Holds most of the device BTLE communication functionality.
struct MachinePeripheral {
    peripheral: Peripheral,
    catalog: &'static CommandCatalog,
    control: Characteristic,
    name: Option<Characteristic>,
}

impl MachinePeripheral {
    fn matches(peripheral: &Peripheral, address: &str) -> bool {
        peripheral
            .address()
            .to_string()
            .eq_ignore_ascii_case(address)
            || format!("{:?}", peripheral.id()).contains(address)
    }

    /// Connects and locates the control and name characteristics.
    async fn connect(
        peripheral: Peripheral,
        catalog: &'static CommandCatalog,
    ) -> Result<Self, TransportError> {
        if !peripheral.is_connected().await? {
            peripheral.connect().await?;
        }
        peripheral.discover_services().await?;
        let characteristics = peripheral.characteristics();
        let find = |uuid| characteristics.iter().find(|c| c.uuid == uuid).cloned();
        let control = find(catalog.control_characteristic).ok_or(TransportError::NotFound)?;
        let name = find(catalog.name_characteristic);
        Ok(MachinePeripheral {
            peripheral,
            catalog,
            control,
            name,
        })
    }

    fn address(&self) -> String {
        self.peripheral.address().to_string()
    }

    async fn write(&self, frame: Frame) -> Result<(), TransportError> {
        trace_packet!(
            "{{host->device}} {} {}",
            self.catalog.describe(frame.bytes()),
            hexdump(frame.bytes())
        );
        Ok(self
            .peripheral
            .write(&self.control, frame.bytes(), WriteType::WithoutResponse)
            .await?)
    }

    async fn read_name(&self) -> Result<Vec<u8>, TransportError> {
        let characteristic = self.name.as_ref().ok_or(TransportError::NotFound)?;
        Ok(self.peripheral.read(characteristic).await?)
    }

    async fn notifications(&self) -> Result<impl Stream<Item = TransportOutput>, TransportError> {
        self.peripheral.subscribe(&self.control).await?;
        let peripheral = self.peripheral.clone();
        let (trigger, tripwire) = Tripwire::new();
        tokio::spawn(async move {
            while peripheral.is_connected().await.unwrap_or_default() {
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
            trace_shutdown!("peripheral.is_connected");
            drop(trigger);
        });

        let control = self.control.uuid;
        let mut raw = self.peripheral.notifications().await?;
        // Only frames from the control characteristic, stopping when the device disconnects
        let n = stream! {
            while let Some(notification) = raw.next().await {
                if notification.uuid != control {
                    continue;
                }
                trace_packet!("{{device->host}} {}", hexdump(&notification.value));
                yield TransportOutput::Notification(Frame::from_vec(notification.value));
            }
        }
        .take_until_if(tripwire);
        Ok(n)
    }
}
