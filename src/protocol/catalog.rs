//! Command tables for the two protocol variants.
//!
//! Every template carries two placeholder signature bytes at the end. Templates are never signed
//! in place: callers copy them (see [`super::Frame::signed`]) before sending.

use std::str::FromStr;

use enum_iterator::Sequence;
use uuid::Uuid;

use super::{hardware_enums::*, packet::SIGNATURE_LEN};

/// The standard GAP device name characteristic.
pub const NAME_CHARACTERISTIC_UUID: Uuid = Uuid::from_u128(0x00002a00_0000_1000_8000_00805f9b34fb);

const LEGACY_CONTROL_CHARACTERISTIC_UUID: Uuid =
    Uuid::from_u128(0x00035b03_58e6_07dd_021a_08123a000300);
const CURRENT_SERVICE_UUID: Uuid = Uuid::from_u128(0x00035b03_58e6_07dd_021a_08123a000300);
const CURRENT_CONTROL_CHARACTERISTIC_UUID: Uuid =
    Uuid::from_u128(0x00035b03_58e6_07dd_021a_08123a000301);

/// Device protocol variant, chosen once when a session is built.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Sequence)]
pub enum ProtocolVariant {
    /// Fixed 19-byte `d0 12` frames used by older PrimaDonna firmware.
    #[default]
    Legacy,
    /// Length-prefixed `0d` packets used by current ECAM firmware.
    Current,
}

impl ProtocolVariant {
    pub fn name(&self) -> &'static str {
        match self {
            ProtocolVariant::Legacy => "legacy",
            ProtocolVariant::Current => "current",
        }
    }

    pub fn catalog(&self) -> &'static CommandCatalog {
        match self {
            ProtocolVariant::Legacy => &LEGACY_CATALOG,
            ProtocolVariant::Current => &CURRENT_CATALOG,
        }
    }
}

impl FromStr for ProtocolVariant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        enum_iterator::all::<ProtocolVariant>()
            .find(|v| v.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown protocol variant '{}'", s))
    }
}

/// The on/off frame pair for a single beverage.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct CommandTemplate {
    pub on: &'static [u8],
    pub off: &'static [u8],
}

impl CommandTemplate {
    pub fn get(&self, action: Action) -> &'static [u8] {
        match action {
            Action::On => self.on,
            Action::Off => self.off,
        }
    }
}

/// The switch frame, with the offset the encoded switch status byte is written to.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SwitchTemplate {
    pub bytes: &'static [u8],
    pub status_offset: usize,
}

/// A frame identified by [`CommandCatalog::lookup`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Command {
    StatusRequest,
    PowerOn,
    Switches(u8),
    Beverage(Beverage, Action),
}

/// Read-only command table for one protocol variant.
#[derive(Debug)]
pub struct CommandCatalog {
    pub variant: ProtocolVariant,
    /// The service to filter scans by, if the variant advertises one we know of.
    pub service: Option<Uuid>,
    pub control_characteristic: Uuid,
    pub name_characteristic: Uuid,
    pub status_request: &'static [u8],
    pub power_on: &'static [u8],
    pub switches: SwitchTemplate,
    beverages: &'static [(Beverage, CommandTemplate)],
}

impl CommandCatalog {
    /// Returns the pristine template for a beverage. [`Beverage::None`] maps to the status request.
    pub fn command_for(&self, beverage: Beverage, action: Action) -> &'static [u8] {
        self.beverages
            .iter()
            .find(|(b, _)| *b == beverage)
            .map(|(_, template)| template.get(action))
            .unwrap_or(self.status_request)
    }

    pub fn template_for(&self, beverage: Beverage) -> Option<&CommandTemplate> {
        self.beverages
            .iter()
            .find(|(b, _)| *b == beverage)
            .map(|(_, template)| template)
    }

    /// A short label for a frame, used when tracing writes.
    pub fn describe(&self, frame: &[u8]) -> String {
        match self.lookup(frame) {
            Some(command) => format!("{:?}", command),
            None => "Unrecognized".to_owned(),
        }
    }

    /// Identifies a frame by comparing everything but its signature against the templates.
    /// The status request wins when two templates share a body.
    pub fn lookup(&self, frame: &[u8]) -> Option<Command> {
        let body = |bytes: &[u8]| -> Option<Vec<u8>> {
            let split = bytes.len().checked_sub(SIGNATURE_LEN)?;
            Some(bytes[..split].to_vec())
        };
        let frame = body(frame)?;
        let matches = |template: &[u8]| body(template).as_ref() == Some(&frame);

        if matches(self.status_request) {
            return Some(Command::StatusRequest);
        }
        if matches(self.power_on) {
            return Some(Command::PowerOn);
        }
        let offset = self.switches.status_offset;
        if frame.len() + SIGNATURE_LEN == self.switches.bytes.len() && offset < frame.len() {
            let mut masked = frame.clone();
            masked[offset] = self.switches.bytes[offset];
            if body(self.switches.bytes).as_ref() == Some(&masked) {
                return Some(Command::Switches(frame[offset]));
            }
        }
        for (beverage, template) in self.beverages {
            for action in enum_iterator::all::<Action>() {
                if matches(template.get(action)) {
                    return Some(Command::Beverage(*beverage, action));
                }
            }
        }
        None
    }
}

const LEGACY_FRAME_LEN: usize = 19;

/// Builds a `d0 12` legacy frame: the command kind at byte 2 and the on flag at byte 9.
const fn legacy_frame(kind: u8, on: bool) -> [u8; LEGACY_FRAME_LEN] {
    let mut frame = [0; LEGACY_FRAME_LEN];
    frame[0] = 0xd0;
    frame[1] = 0x12;
    frame[2] = kind;
    frame[9] = on as u8;
    frame
}

const LEGACY_STATUS_REQUEST: [u8; LEGACY_FRAME_LEN] = legacy_frame(0x01, false);
const LEGACY_POWER_ON: [u8; LEGACY_FRAME_LEN] = legacy_frame(0x00, true);
const LEGACY_SWITCHES: [u8; LEGACY_FRAME_LEN] = legacy_frame(0x32, false);

macro_rules! legacy_beverages {
    ($($beverage:ident => $kind:literal),* $(,)?) => {
        &[
            (Beverage::None, CommandTemplate {
                on: &LEGACY_STATUS_REQUEST,
                off: &LEGACY_STATUS_REQUEST,
            }),
            $(
                (Beverage::$beverage, CommandTemplate {
                    on: &legacy_frame($kind, true),
                    off: &legacy_frame($kind, false),
                }),
            )*
        ]
    };
}

static LEGACY_CATALOG: CommandCatalog = CommandCatalog {
    variant: ProtocolVariant::Legacy,
    service: None,
    control_characteristic: LEGACY_CONTROL_CHARACTERISTIC_UUID,
    name_characteristic: NAME_CHARACTERISTIC_UUID,
    status_request: &LEGACY_STATUS_REQUEST,
    power_on: &LEGACY_POWER_ON,
    switches: SwitchTemplate {
        bytes: &LEGACY_SWITCHES,
        status_offset: 9,
    },
    beverages: legacy_beverages!(
        Steam => 0x04,
        Long => 0x03,
        Coffee => 0x02,
        Doppio => 0x0a,
        HotWater => 0x05,
        Espresso => 0x01,
        Americano => 0x09,
        Espresso2 => 0x08,
    ),
};

/// Dispensing packet: `0d len 83 f0 <beverage> <trigger> 06 <sig> <sig>`.
const DISPENSE_FRAME_LEN: usize = 9;
const TRIGGER_START: u8 = 1;
const TRIGGER_STOP: u8 = 2;
const TASTE_PREPARE_INVERSION: u8 = 6;

const fn dispense_frame(beverage_id: u8, trigger: u8) -> [u8; DISPENSE_FRAME_LEN] {
    [
        0x0d,
        (DISPENSE_FRAME_LEN - 1) as u8,
        0x83,
        0xf0,
        beverage_id,
        trigger,
        TASTE_PREPARE_INVERSION,
        0,
        0,
    ]
}

const CURRENT_STATUS_REQUEST: [u8; 6] = [0x0d, 0x05, 0x75, 0x0f, 0, 0];
const CURRENT_POWER_ON: [u8; 8] = [0x0d, 0x07, 0x84, 0x0f, 0x02, 0x01, 0, 0];
const CURRENT_SWITCHES: [u8; 12] = [0x0d, 0x0b, 0x90, 0x0f, 0x00, 0x32, 0, 0, 0, 0, 0, 0];

macro_rules! current_beverages {
    ($($beverage:ident => $id:literal),* $(,)?) => {
        &[
            (Beverage::None, CommandTemplate {
                on: &CURRENT_STATUS_REQUEST,
                off: &CURRENT_STATUS_REQUEST,
            }),
            $(
                (Beverage::$beverage, CommandTemplate {
                    on: &dispense_frame($id, TRIGGER_START),
                    off: &dispense_frame($id, TRIGGER_STOP),
                }),
            )*
        ]
    };
}

static CURRENT_CATALOG: CommandCatalog = CommandCatalog {
    variant: ProtocolVariant::Current,
    service: Some(CURRENT_SERVICE_UUID),
    control_characteristic: CURRENT_CONTROL_CHARACTERISTIC_UUID,
    name_characteristic: NAME_CHARACTERISTIC_UUID,
    status_request: &CURRENT_STATUS_REQUEST,
    power_on: &CURRENT_POWER_ON,
    switches: SwitchTemplate {
        bytes: &CURRENT_SWITCHES,
        status_offset: 9,
    },
    beverages: current_beverages!(
        Espresso => 1,
        Coffee => 2,
        Long => 3,
        Espresso2 => 4,
        Doppio => 5,
        Americano => 6,
        HotWater => 16,
        Steam => 17,
    ),
};
