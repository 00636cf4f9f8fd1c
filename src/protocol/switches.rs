use super::catalog::SwitchTemplate;

/// Bit positions within the switch status byte. Every other bit stays at [`SWITCH_BASE`].
const ENERGY_SAVE_BIT: u8 = 1 << 4;
const CUP_LIGHT_BIT: u8 = 1 << 3;
const SOUNDS_BIT: u8 = 1 << 2;
const SWITCH_BASE: u8 = 0;

/// The binary settings of the machine.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct SwitchState {
    pub energy_save: bool,
    pub cup_light: bool,
    pub sounds: bool,
    /// Only ever populated from notifications; switch frames do not carry it.
    pub is_on: bool,
}

impl SwitchState {
    /// Packs the three settable switches into the status byte.
    pub fn status_byte(&self) -> u8 {
        let bit = |set: bool, mask: u8| if set { mask } else { 0 };
        SWITCH_BASE
            | bit(self.energy_save, ENERGY_SAVE_BIT)
            | bit(self.cup_light, CUP_LIGHT_BIT)
            | bit(self.sounds, SOUNDS_BIT)
    }
}

/// Builds an unsigned switch frame from a copy of the template. The full set of switches is
/// always sent, never a single toggle.
pub fn encode_switches(switches: &SwitchState, template: &SwitchTemplate) -> Vec<u8> {
    let mut frame = template.bytes.to_vec();
    if let Some(status) = frame.get_mut(template.status_offset) {
        *status = switches.status_byte();
    }
    frame
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::protocol::{Frame, ProtocolVariant};
    use rstest::*;

    fn switches(energy_save: bool, cup_light: bool, sounds: bool) -> SwitchState {
        SwitchState {
            energy_save,
            cup_light,
            sounds,
            is_on: false,
        }
    }

    #[rstest]
    #[case(switches(true, true, false), 24)]
    #[case(switches(false, false, true), 4)]
    #[case(switches(false, false, false), 0)]
    #[case(switches(true, false, false), 16)]
    #[case(switches(false, true, false), 8)]
    #[case(switches(true, true, true), 28)]
    fn switch_status_byte(
        #[values(ProtocolVariant::Legacy, ProtocolVariant::Current)] variant: ProtocolVariant,
        #[case] state: SwitchState,
        #[case] expected: u8,
    ) {
        let template = &variant.catalog().switches;
        let frame = encode_switches(&state, template);
        assert_eq!(frame[template.status_offset], expected);
        assert_eq!(frame.len(), template.bytes.len());
    }

    #[test]
    fn is_on_does_not_leak_into_frame() {
        let template = &ProtocolVariant::Legacy.catalog().switches;
        let mut state = switches(true, false, true);
        let off = encode_switches(&state, template);
        state.is_on = true;
        assert_eq!(encode_switches(&state, template), off);
    }

    #[test]
    fn encode_is_pure() {
        let template = &ProtocolVariant::Legacy.catalog().switches;
        let state = switches(true, true, false);
        let a = encode_switches(&state, template);
        let b = encode_switches(&state, template);
        assert_eq!(a, b);
        assert_eq!(state, switches(true, true, false));
        assert_eq!(template.bytes[template.status_offset], 0);
    }

    #[test]
    fn signed_switch_frames() {
        let state = switches(true, true, false);
        let legacy = &ProtocolVariant::Legacy.catalog().switches;
        assert_eq!(
            Frame::signed(&encode_switches(&state, legacy)).unwrap().stringify(),
            "d012320000000000001800000000000000fb26"
        );
        let current = &ProtocolVariant::Current.catalog().switches;
        assert_eq!(
            Frame::signed(&encode_switches(&state, current)).unwrap().stringify(),
            "0d0b900f00320000001899f1"
        );
    }
}
