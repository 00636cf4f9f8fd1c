//! Status display utilities.

use crate::protocol::{Beverage, DeviceState, DeviceStatus, SteamNozzle};
use atty::Stream;
use colored::*;
use lazy_static::lazy_static;
use std::io::Write;
use std::sync::Mutex;

lazy_static! {
    static ref DISPLAY: Mutex<Option<Box<dyn StatusDisplay>>> = Mutex::new(None);
}

/// Initializes the global display based on the TERM and COLORTERM environment variables.
pub fn initialize_display() {
    let term = std::env::var("TERM").ok();
    let colorterm = std::env::var("COLORTERM").ok();

    let display: Box<dyn StatusDisplay> =
        if term.is_none() || !atty::is(Stream::Stdout) || !atty::is(Stream::Stderr) {
            Box::new(NoTtyStatusDisplay::default())
        } else if colorterm.is_some() {
            Box::new(ColouredStatusDisplay::new(60))
        } else {
            Box::new(NoTtyStatusDisplay::default())
        };
    if let Ok(mut global) = DISPLAY.lock() {
        *global = Some(display);
    }
}

/// Displays the [`DeviceState`] according to the current mode.
pub fn display_state(state: &DeviceState) {
    if let Ok(mut display) = DISPLAY.lock() {
        if let Some(ref mut display) = *display {
            display.display(state);
            return;
        }
    }
    println!("[default] {}", describe(state));
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Info,
    Warning,
    Error,
}

impl LogLevel {
    pub fn prefix(&self) -> &'static str {
        match self {
            LogLevel::Trace => "[TRACE] ",
            LogLevel::Warning => "[WARNING] ",
            LogLevel::Error => "[ERROR] ",
            LogLevel::Info => "",
        }
    }
}

/// Logs a line according to the current mode.
pub fn log(level: LogLevel, s: &str) {
    if let Ok(mut display) = DISPLAY.lock() {
        if let Some(ref mut display) = *display {
            display.log(level, s);
            return;
        }
    }
    if level == LogLevel::Info {
        println!("{}", s);
    } else {
        eprintln!("{}{}", level.prefix(), s);
    }
}

/// A one-line human description of the machine.
pub fn describe(state: &DeviceState) -> String {
    let power = if !state.connected {
        "Disconnected"
    } else if state.switches.is_on {
        "On"
    } else {
        "Standby"
    };
    let status = match state.status {
        DeviceStatus::Ok => "ready".to_owned(),
        DeviceStatus::Cooking => match state.cooking {
            Beverage::None => "dispensing".to_owned(),
            beverage => format!("dispensing {}", beverage.name()),
        },
        DeviceStatus::NozzleDetached => "steam nozzle detached".to_owned(),
        DeviceStatus::CoffeeGroundsContainerDetached => {
            "coffee grounds container detached".to_owned()
        }
        DeviceStatus::WaterTankDetached => "water tank detached".to_owned(),
    };
    let nozzle = match state.steam_nozzle {
        None => "unknown".to_owned(),
        Some(nozzle) => match nozzle.value() {
            Some(SteamNozzle::Detached) => "detached".to_owned(),
            Some(SteamNozzle::Steam) => "steam".to_owned(),
            Some(SteamNozzle::MilkFrother) => "milk frother".to_owned(),
            Some(SteamNozzle::MilkFrotherCleaning) => "milk frother (cleaning)".to_owned(),
            None => format!("{:?}", nozzle),
        },
    };
    format!("{}, {}, nozzle: {}", power, status, nozzle)
}

trait StatusDisplay: Send + Sync {
    fn display(&mut self, state: &DeviceState);
    fn log(&mut self, level: LogLevel, s: &str);
}

/// [`StatusDisplay`] for basic terminals, or non-TTY stdio.
#[derive(Default)]
struct NoTtyStatusDisplay {}

impl StatusDisplay for NoTtyStatusDisplay {
    fn display(&mut self, state: &DeviceState) {
        println!("{}", describe(state));
    }

    fn log(&mut self, level: LogLevel, s: &str) {
        if level == LogLevel::Info {
            println!("{}", s);
        } else {
            eprintln!("{}{}", level.prefix(), s);
        }
    }
}

struct ColouredStatusDisplay {
    width: usize,
    last_was_status: bool,
}

impl ColouredStatusDisplay {
    pub fn new(width: usize) -> Self {
        Self {
            width,
            last_was_status: false,
        }
    }

    fn status_line(&self, state: &DeviceState) -> String {
        let icon = if !state.connected {
            "🔌"
        } else if !state.switches.is_on {
            "💤"
        } else {
            match state.status {
                DeviceStatus::Ok => "✅",
                DeviceStatus::Cooking => "☕",
                _ => "🔔",
            }
        };
        let mut status = format!(" {} {}", icon, describe(state));
        let len = status.chars().count();
        if len < self.width {
            status += &" ".repeat(self.width - len);
        }
        status
    }
}

impl StatusDisplay for ColouredStatusDisplay {
    fn log(&mut self, level: LogLevel, s: &str) {
        if std::mem::take(&mut self.last_was_status) {
            println!();
        }
        match level {
            LogLevel::Info => println!("{}", s),
            LogLevel::Trace => eprintln!("{}{}", level.prefix().dimmed(), s.dimmed()),
            LogLevel::Warning => eprintln!("{}{}", level.prefix().yellow(), s),
            LogLevel::Error => eprintln!("{}{}", level.prefix().red(), s),
        }
    }

    fn display(&mut self, state: &DeviceState) {
        let status = self.status_line(state);
        let status = if state.connected && state.status == DeviceStatus::Cooking {
            status.black().on_white()
        } else {
            status.truecolor(153, 141, 109).on_truecolor(92, 69, 6)
        };
        print!("\r▐{}▌ ", status);
        let _ = std::io::stdout().flush();
        self.last_was_status = true;
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::protocol::{MachineEnum, SwitchState};
    use rstest::*;

    fn state(connected: bool, is_on: bool, status: DeviceStatus) -> DeviceState {
        DeviceState {
            connected,
            status,
            switches: SwitchState {
                is_on,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[rstest]
    #[case(state(false, false, DeviceStatus::Ok), "Disconnected, ready, nozzle: unknown")]
    #[case(state(true, false, DeviceStatus::Ok), "Standby, ready, nozzle: unknown")]
    #[case(state(true, true, DeviceStatus::Cooking), "On, dispensing, nozzle: unknown")]
    #[case(
        state(true, true, DeviceStatus::WaterTankDetached),
        "On, water tank detached, nozzle: unknown"
    )]
    fn describe_states(#[case] state: DeviceState, #[case] expected: &str) {
        assert_eq!(describe(&state), expected);
    }

    #[test]
    fn describe_cooking_and_nozzle() {
        let mut s = state(true, true, DeviceStatus::Cooking);
        s.cooking = Beverage::Espresso;
        s.steam_nozzle = Some(SteamNozzle::MilkFrother.into());
        assert_eq!(describe(&s), "On, dispensing espresso, nozzle: milk frother");
        s.steam_nozzle = Some(MachineEnum::Unknown(9));
        assert_eq!(describe(&s), "On, dispensing espresso, nozzle: Unknown(9)");
    }

    #[test]
    fn format_rich() {
        let mut display = ColouredStatusDisplay::new(60);
        let line = display.status_line(&state(true, true, DeviceStatus::Ok));
        assert_eq!(line.chars().count(), 60);
        for status in [DeviceStatus::Ok, DeviceStatus::Cooking, DeviceStatus::NozzleDetached] {
            display.display(&state(true, true, status));
        }
    }
}
