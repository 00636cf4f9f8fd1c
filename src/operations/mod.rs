//! Machine operations behind the command line: connecting, status, power, brewing and scanning.

mod brew;
mod connect;
mod list;
mod power;
mod status;

pub use brew::*;
pub use connect::*;
pub use list::*;
pub use power::*;
pub use status::*;
