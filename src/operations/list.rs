use crate::device::{ble_scan, SessionError};
use crate::prelude::*;
use crate::protocol::ProtocolVariant;

/// Scans for nearby machines and prints each name and address.
pub async fn list(variant: ProtocolVariant, scan_timeout: Duration) -> Result<(), SessionError> {
    info!("Scanning for {}s...", scan_timeout.as_secs());
    let found = ble_scan(variant, scan_timeout).await?;
    if found.is_empty() {
        info!("No devices found");
    }
    for (name, address) in found {
        info!("{}  {}", name, address);
    }
    Ok(())
}
