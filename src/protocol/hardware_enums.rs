//! Enumerations shared by both protocol variants.

use enum_iterator::Sequence;
use num_enum::{IntoPrimitive, TryFromPrimitive};
use std::str::FromStr;

/// Beverages the machine can brew. [`Beverage::None`] means the machine is idle.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Sequence)]
pub enum Beverage {
    #[default]
    None,
    Steam,
    Long,
    Coffee,
    Doppio,
    HotWater,
    Espresso,
    Americano,
    Espresso2,
}

impl Beverage {
    /// The command-line name of this beverage.
    pub fn name(&self) -> &'static str {
        match self {
            Beverage::None => "none",
            Beverage::Steam => "steam",
            Beverage::Long => "long",
            Beverage::Coffee => "coffee",
            Beverage::Doppio => "doppio",
            Beverage::HotWater => "hotwater",
            Beverage::Espresso => "espresso",
            Beverage::Americano => "americano",
            Beverage::Espresso2 => "espresso2",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Beverage::None => "Nothing",
            Beverage::Steam => "Activate steam",
            Beverage::Long => "Make a long coffee",
            Beverage::Coffee => "Make a coffee",
            Beverage::Doppio => "Make a doppio",
            Beverage::HotWater => "Dispense hot water",
            Beverage::Espresso => "Make an espresso",
            Beverage::Americano => "Make an americano",
            Beverage::Espresso2 => "Make two espressos",
        }
    }

    /// Every beverage except [`Beverage::None`].
    pub fn brewable() -> impl Iterator<Item = Beverage> {
        enum_iterator::all::<Beverage>().filter(|b| *b != Beverage::None)
    }
}

impl FromStr for Beverage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        enum_iterator::all::<Beverage>()
            .find(|b| b.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown beverage '{}'", s))
    }
}

/// Which half of a beverage command pair to send.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Sequence)]
pub enum Action {
    On,
    Off,
}

/// Steam nozzle accessory codes, as reported in long-format notifications.
#[repr(u8)]
#[derive(
    Copy, Clone, Debug, PartialEq, PartialOrd, IntoPrimitive, TryFromPrimitive, Eq, Hash, Sequence,
)]
pub enum SteamNozzle {
    Detached = 0,
    Steam = 1,
    MilkFrother = 2,
    MilkFrotherCleaning = 4,
}

/// Machine status codes, as reported in long-format notifications.
#[repr(u8)]
#[derive(
    Copy, Clone, Debug, PartialEq, PartialOrd, IntoPrimitive, TryFromPrimitive, Eq, Hash, Sequence,
)]
pub enum DeviceStatus {
    Cooking = 3,
    NozzleDetached = 4,
    Ok = 5,
    CoffeeGroundsContainerDetached = 13,
    WaterTankDetached = 21,
}

impl Default for DeviceStatus {
    fn default() -> Self {
        DeviceStatus::Ok
    }
}

impl DeviceStatus {
    /// Maps a raw status code, treating anything unrecognized as [`DeviceStatus::Ok`].
    pub fn from_code(code: u8) -> Self {
        Self::try_from(code).unwrap_or_default()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use rstest::*;

    #[rstest]
    #[case(3, DeviceStatus::Cooking)]
    #[case(4, DeviceStatus::NozzleDetached)]
    #[case(5, DeviceStatus::Ok)]
    #[case(13, DeviceStatus::CoffeeGroundsContainerDetached)]
    #[case(21, DeviceStatus::WaterTankDetached)]
    #[case(0, DeviceStatus::Ok)]
    #[case(99, DeviceStatus::Ok)]
    fn status_codes(#[case] code: u8, #[case] expected: DeviceStatus) {
        assert_eq!(DeviceStatus::from_code(code), expected);
    }

    #[test]
    fn beverage_names_round_trip() {
        for beverage in enum_iterator::all::<Beverage>() {
            assert_eq!(beverage.name().parse::<Beverage>(), Ok(beverage));
        }
        assert_eq!("HotWater".parse::<Beverage>(), Ok(Beverage::HotWater));
        assert!("cappuccino".parse::<Beverage>().is_err());
        assert_eq!(Beverage::brewable().count(), 8);
    }
}
