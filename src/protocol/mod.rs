//! Frame codec for PrimaDonna machines: signing, command tables, switch encoding and notification
//! decoding. Nothing in here performs I/O.

mod catalog;
mod hardware_enums;
mod machine_enum;
mod notification;
mod packet;
mod switches;

pub use catalog::*;
pub use hardware_enums::*;
pub use machine_enum::*;
pub use notification::*;
pub use packet::*;
pub use switches::*;
