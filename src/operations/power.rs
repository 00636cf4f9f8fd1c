use crate::device::{DeviceSession, SessionError};
use crate::prelude::*;

/// Turns the machine on. There is no protocol command to turn it off, so `off` cancels whatever
/// is brewing instead.
pub async fn power(session: &DeviceSession, on: bool) -> Result<(), SessionError> {
    if on {
        session.power_on().await?;
        info!("Power on command sent");
    } else {
        session.cancel_beverage().await?;
        info!("Cancelled brewing (note: machine may still be powered on)");
    }
    Ok(())
}

/// The three binary settings that can be switched from the command line.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Setting {
    CupLight,
    EnergySave,
    SoundAlarm,
}

impl Setting {
    pub fn name(&self) -> &'static str {
        match self {
            Setting::CupLight => "cup-light",
            Setting::EnergySave => "energy-save",
            Setting::SoundAlarm => "sound-alarm",
        }
    }
}

pub async fn set_switch(session: &DeviceSession, setting: Setting, on: bool) -> Result<(), SessionError> {
    match setting {
        Setting::CupLight => session.set_cup_light(on).await?,
        Setting::EnergySave => session.set_energy_save(on).await?,
        Setting::SoundAlarm => session.set_sound_alarm(on).await?,
    }
    info!(
        "Turned {} {}",
        setting.name(),
        if on { "on" } else { "off" }
    );
    Ok(())
}
