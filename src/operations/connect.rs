use crate::device::{BleTransport, DeviceSession, SessionError, SimulatedMachine, Transport};
use crate::prelude::*;
use crate::protocol::ProtocolVariant;

/// Which machine to talk to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DeviceId {
    /// A Bluetooth address, or a fragment of the platform's peripheral id.
    Address(String),
    Simulator,
}

/// Everything needed to reach a machine, usually taken from the command line.
#[derive(Clone, Debug)]
pub struct ConnectConfig {
    pub device: DeviceId,
    pub variant: ProtocolVariant,
    /// Connection attempts before giving up. Zero is treated as one.
    pub retries: usize,
    pub scan_timeout: Duration,
    /// How long to wait for a reply to a status request.
    pub timeout: Duration,
}

impl Default for ConnectConfig {
    fn default() -> Self {
        ConnectConfig {
            device: DeviceId::Simulator,
            variant: ProtocolVariant::default(),
            retries: 3,
            scan_timeout: Duration::from_secs(10),
            timeout: Duration::from_millis(1000),
        }
    }
}

/// Connects to the configured machine, retrying Bluetooth discovery, and waits for the
/// notification channel to come up.
pub async fn connect(config: &ConnectConfig) -> Result<DeviceSession, SessionError> {
    let transport: Box<dyn Transport> = match &config.device {
        DeviceId::Simulator => Box::new(SimulatedMachine::new(config.variant)),
        DeviceId::Address(address) => Box::new(connect_ble(address, config).await?),
    };
    let session = DeviceSession::start(transport, config.variant);
    session
        .wait_for(|state| state.connected, config.scan_timeout)
        .await?;
    trace_packet!(
        "Session ready on {} ({} protocol)",
        session.address(),
        config.variant.name()
    );
    Ok(session)
}

async fn connect_ble(address: &str, config: &ConnectConfig) -> Result<BleTransport, SessionError> {
    let attempts = config.retries.max(1);
    let mut attempt = 1;
    loop {
        match BleTransport::connect(address, config.variant, config.scan_timeout).await {
            Ok(transport) => return Ok(transport),
            Err(e) if attempt < attempts => {
                warning!(
                    "Connection attempt {} of {} failed: {}",
                    attempt,
                    attempts,
                    e
                );
                attempt += 1;
            }
            Err(e) => return Err(e.into()),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[tokio::test]
    async fn connect_to_simulator() -> Result<(), SessionError> {
        let session = connect(&ConnectConfig::default()).await?;
        assert!(session.state().connected);
        assert_eq!(session.variant(), ProtocolVariant::Legacy);
        Ok(())
    }
}
