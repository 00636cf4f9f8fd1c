//! Brew coffee on a DeLonghi PrimaDonna from the command-line!
//!
//! Primadonna is an API and command-line application that talks to PrimaDonna machines over
//! Bluetooth Low Energy. It speaks both the fixed 19-byte frames of older firmware and the
//! length-prefixed packets of current firmware.
//!
//! # Examples
//!
//! Get the status of a given device:
//! ```text
//! $ primadonna status --device-name (address)
//! Device name: D1234567
//! Power: ON
//! Status: Ok
//! Steam nozzle: Steam
//! Currently brewing: none
//! ```
//!
//! Brew a beverage and wait for it:
//!
//! ```text
//! $ primadonna espresso --device-name (address) --wait
//! Make an espresso
//! Dispensing...
//! ```
//!
//! Try things out without a machine:
//!
//! ```text
//! $ primadonna status --simulate --protocol current
//! ```

pub mod device;
pub mod display;
pub mod logging;
pub mod operations;
mod prelude;
pub mod protocol;
