//! Sessions with a machine, and the transports that carry their frames.

use thiserror::Error;

mod ble;
mod driver;
mod packet_receiver;
mod session;
mod simulate;

pub use ble::{scan as ble_scan, BleTransport};
pub use driver::{Transport, TransportOutput};
pub use packet_receiver::NotificationReceiver;
pub use session::DeviceSession;
pub use simulate::SimulatedMachine;

use crate::protocol::FrameError;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("not found")]
    NotFound,
    #[error("timed out")]
    Timeout,
    #[error("disconnected")]
    Disconnected,
    #[error(transparent)]
    BTError(#[from] btleplug::Error),
    #[error(transparent)]
    IOError(#[from] std::io::Error),
    #[error("Unknown error")]
    Unknown,
}

#[derive(Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Frame(#[from] FrameError),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("timed out waiting for the machine")]
    Timeout,
}
