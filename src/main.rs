use clap::{arg, command, value_parser, Arg, ArgMatches, Command};
use std::time::Duration;

use primadonna::device::DeviceSession;
use primadonna::display;
use primadonna::logging::enable_tracing;
use primadonna::operations::*;
use primadonna::protocol::{Beverage, ProtocolVariant};

fn on_off() -> Arg {
    arg!(<state> "on or off").value_parser(["on", "off"])
}

fn cli() -> Command {
    let mut cmd = command!()
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            arg!(--"device-name" <address> "Bluetooth address of the machine")
                .required(false)
                .global(true),
        )
        .arg(
            arg!(--protocol <variant> "Protocol spoken by the machine")
                .required(false)
                .value_parser(["legacy", "current"])
                .default_value("legacy")
                .global(true),
        )
        .arg(arg!(--simulate "Talk to a simulated machine instead").global(true))
        .arg(
            arg!(--retries <count> "Connection attempts before giving up")
                .required(false)
                .value_parser(value_parser!(usize))
                .default_value("3")
                .global(true),
        )
        .arg(
            arg!(--"scan-timeout" <secs> "How long to look for the machine on each attempt")
                .required(false)
                .value_parser(value_parser!(u64))
                .default_value("10")
                .global(true),
        )
        .arg(
            arg!(--timeout <ms> "How long to wait for a status reply")
                .required(false)
                .value_parser(value_parser!(u64))
                .default_value("1000")
                .global(true),
        )
        .arg(arg!(--trace "Trace packets to and from the machine").global(true))
        .subcommand(command!("status").about("Get the current status of the machine"))
        .subcommand(command!("monitor").about("Follow the status of the machine"))
        .subcommand(
            command!("power")
                .about("Turn the machine on, or cancel brewing with 'off'")
                .arg(on_off()),
        )
        .subcommand(
            command!("cup-light")
                .about("Switch the cup light")
                .arg(on_off()),
        )
        .subcommand(
            command!("energy-save")
                .about("Switch energy saving")
                .arg(on_off()),
        )
        .subcommand(
            command!("sound-alarm")
                .about("Switch the sound alarm")
                .arg(on_off()),
        )
        .subcommand(command!("cancel").about("Cancel current brewing"))
        .subcommand(command!("list").about("List nearby machines"));
    for beverage in Beverage::brewable() {
        cmd = cmd.subcommand(
            Command::new(beverage.name())
                .about(beverage.description())
                .arg(arg!(--wait "Wait until the machine is done")),
        );
    }
    cmd
}

fn connect_config(cmd: &ArgMatches) -> Result<ConnectConfig, Box<dyn std::error::Error>> {
    let variant: ProtocolVariant = cmd
        .get_one::<String>("protocol")
        .map(String::as_str)
        .unwrap_or_default()
        .parse()?;
    let device = if cmd.get_flag("simulate") {
        DeviceId::Simulator
    } else {
        let address = cmd
            .get_one::<String>("device-name")
            .ok_or("--device-name is required unless --simulate is given")?;
        DeviceId::Address(address.clone())
    };
    let defaults = ConnectConfig::default();
    Ok(ConnectConfig {
        device,
        variant,
        retries: cmd.get_one::<usize>("retries").copied().unwrap_or(defaults.retries),
        scan_timeout: cmd
            .get_one::<u64>("scan-timeout")
            .map(|secs| Duration::from_secs(*secs))
            .unwrap_or(defaults.scan_timeout),
        timeout: cmd
            .get_one::<u64>("timeout")
            .map(|ms| Duration::from_millis(*ms))
            .unwrap_or(defaults.timeout),
    })
}

fn state_arg(cmd: &ArgMatches) -> bool {
    cmd.get_one::<String>("state").map(String::as_str) == Some("on")
}

async fn run(
    session: &DeviceSession,
    config: &ConnectConfig,
    subcommand: &str,
    cmd: &ArgMatches,
) -> Result<(), Box<dyn std::error::Error>> {
    match subcommand {
        "status" => print_status(session, config.timeout).await?,
        "monitor" => monitor(session).await?,
        "power" => power(session, state_arg(cmd)).await?,
        "cup-light" => set_switch(session, Setting::CupLight, state_arg(cmd)).await?,
        "energy-save" => set_switch(session, Setting::EnergySave, state_arg(cmd)).await?,
        "sound-alarm" => set_switch(session, Setting::SoundAlarm, state_arg(cmd)).await?,
        "cancel" => cancel(session).await?,
        name => {
            let beverage: Beverage = name.parse()?;
            if cmd.get_flag("wait") {
                let state = brew_and_wait(session, beverage, Duration::from_secs(300)).await?;
                display::display_state(&state);
            } else {
                brew(session, beverage).await?;
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();

    let matches = cli().get_matches();
    let (subcommand, cmd) = matches
        .subcommand()
        .ok_or("a command is required, see --help")?;
    if cmd.get_flag("trace") {
        enable_tracing();
    }
    display::initialize_display();

    let config = connect_config(cmd)?;
    if subcommand == "list" {
        list(config.variant, config.scan_timeout).await?;
        return Ok(());
    }

    let session = connect(&config).await?;
    run(&session, &config, subcommand, cmd).await?;
    Ok(())
}
