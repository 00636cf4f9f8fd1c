//! Decoding of inbound notification frames into [`DeviceState`] snapshots.
//!
//! Two frame shapes are understood, chosen purely by length:
//!
//! * long frames (more than [`LONG_FORMAT_MIN_LEN`] - 1 bytes) with fixed field offsets, and
//! * three-byte frames whose meaning is inferred from observed traffic rather than documented.
//!
//! Anything else passes through, only updating [`DeviceState::last_raw_frame`].

use super::{hardware_enums::*, machine_enum::MachineEnum, switches::SwitchState};

pub const LONG_FORMAT_MIN_LEN: usize = 10;
pub const SHORT_FORMAT_LEN: usize = 3;

const LONG_NOZZLE_OFFSET: usize = 4;
const LONG_STATUS_OFFSET: usize = 5;
const LONG_SERVICE_OFFSET: usize = 7;
const LONG_POWER_OFFSET: usize = 9;

/// Activity markers seen at byte 1 of short frames while the machine is dispensing.
const SHORT_BUSY_MARKERS: &[u8] = &[0x9c];
/// Activity marker seen at byte 1 of short frames while the machine is idle.
const SHORT_IDLE_MARKER: u8 = 0xb5;

/// The shape of an inbound frame.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum NotificationShape {
    Long,
    /// Best-effort three-byte format. The marker values are inferred, not vendor-documented.
    InferredShort,
    Unrecognized,
}

impl NotificationShape {
    pub fn classify(raw: &[u8]) -> Self {
        if raw.len() >= LONG_FORMAT_MIN_LEN {
            NotificationShape::Long
        } else if raw.len() == SHORT_FORMAT_LEN {
            NotificationShape::InferredShort
        } else {
            NotificationShape::Unrecognized
        }
    }
}

/// Snapshot of everything we know about the machine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeviceState {
    /// The beverage we last asked for, or [`Beverage::None`].
    pub cooking: Beverage,
    pub connected: bool,
    /// `None` until the machine reports its nozzle.
    pub steam_nozzle: Option<MachineEnum<SteamNozzle>>,
    pub status: DeviceStatus,
    pub service: u8,
    pub switches: SwitchState,
    /// The most recent notification, empty until one arrives.
    pub last_raw_frame: Vec<u8>,
}

impl Default for DeviceState {
    fn default() -> Self {
        DeviceState {
            cooking: Beverage::None,
            connected: false,
            steam_nozzle: None,
            status: DeviceStatus::Ok,
            service: 0,
            switches: SwitchState::default(),
            last_raw_frame: vec![],
        }
    }
}

/// Produces the state that follows `previous` once `raw` has been received. Never fails: fields a
/// frame does not carry are left as they were.
pub fn decode_notification(raw: &[u8], previous: &DeviceState) -> DeviceState {
    let mut state = previous.clone();
    match NotificationShape::classify(raw) {
        NotificationShape::Long => {
            state.switches.is_on = raw[LONG_POWER_OFFSET] > 0;
            state.steam_nozzle = Some(MachineEnum::decode(raw[LONG_NOZZLE_OFFSET]));
            state.service = raw[LONG_SERVICE_OFFSET];
            state.status = DeviceStatus::from_code(raw[LONG_STATUS_OFFSET]);
        }
        NotificationShape::InferredShort => {
            if raw[0] != 0 {
                state.switches.is_on = true;
            }
            let marker = raw[1];
            if SHORT_BUSY_MARKERS.contains(&marker) {
                state.status = DeviceStatus::Cooking;
                state.switches.is_on = true;
            } else if marker == SHORT_IDLE_MARKER {
                state.status = DeviceStatus::Ok;
            }
            // raw[2] has no known meaning yet
        }
        NotificationShape::Unrecognized => {}
    }
    state.last_raw_frame = raw.to_vec();
    state
}

#[cfg(test)]
mod test {
    use super::*;
    use rstest::*;

    fn long_frame(nozzle: u8, status: u8, service: u8, power: u8) -> Vec<u8> {
        vec![0, 0, 0, 0, nozzle, status, 0, service, 0, power]
    }

    #[test]
    fn long_frame_power_on() {
        let raw = long_frame(1, 5, 0, 1);
        let state = decode_notification(&raw, &DeviceState::default());
        assert!(state.switches.is_on);
        assert_eq!(state.steam_nozzle, Some(SteamNozzle::Steam.into()));
        assert_eq!(state.status, DeviceStatus::Ok);
        assert_eq!(state.last_raw_frame, raw);
    }

    #[test]
    fn long_frame_power_off() {
        let on = decode_notification(&long_frame(1, 5, 0, 1), &DeviceState::default());
        let off = decode_notification(&long_frame(1, 5, 0, 0), &on);
        assert!(!off.switches.is_on);
        assert_eq!(off.steam_nozzle, on.steam_nozzle);
        assert_eq!(off.status, on.status);
        assert_eq!(off.service, on.service);
        assert_eq!(off.cooking, on.cooking);
    }

    #[test]
    fn long_frame_passes_unknown_codes() {
        let state = decode_notification(&long_frame(7, 99, 42, 2), &DeviceState::default());
        assert_eq!(state.steam_nozzle, Some(MachineEnum::Unknown(7)));
        assert_eq!(state.status, DeviceStatus::Ok);
        assert_eq!(state.service, 42);
        assert!(state.switches.is_on);
    }

    #[test]
    fn long_frame_from_machine() {
        let raw = crate::protocol::test::RESPONSE_STATUS_CAPPUCCINO_MILK;
        let state = decode_notification(&raw, &DeviceState::default());
        assert_eq!(state.steam_nozzle, Some(SteamNozzle::MilkFrother.into()));
        assert_eq!(state.status, DeviceStatus::NozzleDetached);
        assert_eq!(state.service, 0);
        assert!(state.switches.is_on);
    }

    #[test]
    fn long_frame_keeps_local_fields() {
        let previous = DeviceState {
            cooking: Beverage::Americano,
            connected: true,
            switches: SwitchState {
                energy_save: true,
                cup_light: true,
                sounds: true,
                is_on: false,
            },
            ..Default::default()
        };
        let state = decode_notification(&long_frame(2, 3, 1, 1), &previous);
        assert_eq!(state.cooking, Beverage::Americano);
        assert!(state.connected);
        assert!(state.switches.energy_save && state.switches.cup_light && state.switches.sounds);
        assert_eq!(state.status, DeviceStatus::Cooking);
    }

    #[rstest]
    #[case([0x01, 0xb5, 0x00], true, DeviceStatus::Ok)]
    #[case([0x01, 0x9c, 0x00], true, DeviceStatus::Cooking)]
    #[case([0x00, 0x9c, 0x00], true, DeviceStatus::Cooking)]
    #[case([0x00, 0xb5, 0x00], false, DeviceStatus::Ok)]
    fn short_frames(
        #[case] raw: [u8; 3],
        #[case] is_on: bool,
        #[case] status: DeviceStatus,
    ) {
        let previous = DeviceState {
            status: DeviceStatus::WaterTankDetached,
            ..Default::default()
        };
        let state = decode_notification(&raw, &previous);
        assert_eq!(state.switches.is_on, is_on);
        assert_eq!(state.status, status);
        assert_eq!(state.steam_nozzle, None);
    }

    #[test]
    fn short_frame_unknown_marker_carries_status() {
        let previous = DeviceState {
            status: DeviceStatus::CoffeeGroundsContainerDetached,
            ..Default::default()
        };
        let state = decode_notification(&[0x00, 0x42, 0xff], &previous);
        assert_eq!(state.status, DeviceStatus::CoffeeGroundsContainerDetached);
        assert!(!state.switches.is_on);
        assert_eq!(state.last_raw_frame, vec![0x00, 0x42, 0xff]);
    }

    #[rstest]
    #[case(&[])]
    #[case(&[0x01])]
    #[case(&[0x01, 0x9c])]
    #[case(&[0x01, 0x9c, 0x00, 0x00])]
    #[case(&[0, 0, 0, 0, 1, 5, 0, 0, 0])]
    fn other_lengths_pass_through(#[case] raw: &[u8]) {
        let previous = DeviceState {
            cooking: Beverage::Steam,
            status: DeviceStatus::NozzleDetached,
            service: 9,
            ..Default::default()
        };
        assert_eq!(NotificationShape::classify(raw), NotificationShape::Unrecognized);
        let state = decode_notification(raw, &previous);
        assert_eq!(
            state,
            DeviceState {
                last_raw_frame: raw.to_vec(),
                ..previous
            }
        );
    }

    #[test]
    fn decode_is_deterministic() {
        let previous = DeviceState::default();
        let raw = long_frame(4, 13, 3, 1);
        assert_eq!(
            decode_notification(&raw, &previous),
            decode_notification(&raw, &previous)
        );
        assert_eq!(previous, DeviceState::default());
    }
}
