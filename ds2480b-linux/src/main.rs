use std::{io, process::ExitCode, str::FromStr, thread, time::Duration};

use clap::{Parser, Subcommand, ValueEnum};
use ds2480b::{Ds2480b, Ds2480bBuilder, Ds2480bError};
use ds18x20::{ReadoutResolution, Temperature};
use ds2423::Counter;
use embedded_onewire::{OneWire, OneWireError, OneWireNode, Rom};
use linux_embedded_hal::Delay;

mod registry;
mod uart;

use registry::{DEFAULT_HYSTERESIS, Registry, Thermostat};
use uart::SerialUart;

/// Talk to 1-Wire devices through a DS2480B serial line driver
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Serial port the DS2480B is attached to (e.g., /dev/ttyUSB0)
    #[arg(short, long)]
    port: String,
    /// Number of polls of the serial port before a reply times out
    #[arg(short, long, default_value_t = 3000)]
    retries: u16,
    /// Delay between two polls of the serial port, in microseconds
    #[arg(long, default_value_t = 100)]
    poll_interval_us: u32,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the devices on the bus
    Scan,
    /// Read every device on the bus periodically
    Poll {
        /// Seconds between two polling cycles
        #[arg(short, long, default_value_t = 10)]
        interval: u64,
        /// Temperature conversion resolution, in bits (9-12)
        #[arg(long, default_value = "12", value_parser = parse_resolution)]
        resolution: ReadoutResolution,
        /// Smallest temperature change recorded, in degrees Celsius
        #[arg(long, default_value_t = DEFAULT_HYSTERESIS, value_parser = parse_temperature)]
        hysteresis: Temperature,
        /// Stop after this many cycles
        #[arg(short, long)]
        count: Option<u32>,
        /// Drive a switch pin from a sensor: SENSOR:SWITCH:PIN:LOW:HIGH
        #[arg(long = "thermostat", value_parser = Thermostat::from_str)]
        thermostats: Vec<Thermostat>,
    },
    /// Operate a DS2408 switch
    Switch {
        #[command(subcommand)]
        action: SwitchAction,
    },
    /// Read a DS2423 counter
    Counter {
        #[arg(value_parser = parse_rom)]
        rom: Rom,
        #[arg(value_enum, ignore_case = true)]
        counter: CounterArg,
    },
    /// Read the temperature of a sensor
    Temperature {
        #[arg(value_parser = parse_rom)]
        rom: Rom,
    },
    /// Tell whether a device is parasite powered
    Power {
        #[arg(value_parser = parse_rom)]
        rom: Rom,
    },
}

#[derive(Subcommand, Debug)]
enum SwitchAction {
    /// Set the output latches; a 0 bit turns the output on
    Set {
        #[arg(value_parser = parse_rom)]
        rom: Rom,
        #[arg(value_parser = parse_byte)]
        state: u8,
    },
    /// Read the PIO pin state
    Get {
        #[arg(value_parser = parse_rom)]
        rom: Rom,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum CounterArg {
    A,
    B,
}

impl From<CounterArg> for Counter {
    fn from(value: CounterArg) -> Self {
        match value {
            CounterArg::A => Counter::A,
            CounterArg::B => Counter::B,
        }
    }
}

fn parse_rom(s: &str) -> Result<Rom, String> {
    Rom::from_str(s).map_err(|e| e.to_string())
}

fn parse_resolution(s: &str) -> Result<ReadoutResolution, String> {
    s.parse::<u8>()
        .ok()
        .filter(|bits| (9..=12).contains(bits))
        .and_then(|bits| ReadoutResolution::try_from(bits).ok())
        .ok_or_else(|| format!("{s:?} is not a resolution between 9 and 12 bits"))
}

fn parse_temperature(s: &str) -> Result<Temperature, String> {
    Temperature::from_str(s).map_err(|e| e.to_string())
}

fn parse_byte(s: &str) -> Result<u8, String> {
    let res = if let Some(hex) = s.strip_prefix("0x") {
        u8::from_str_radix(hex, 16)
    } else if let Some(bin) = s.strip_prefix("0b") {
        u8::from_str_radix(bin, 2)
    } else {
        s.parse()
    };
    res.map_err(|e| format!("{s:?}: {e}"))
}

type Bridge = Ds2480b<SerialUart, Delay>;
type BusError = OneWireError<Ds2480bError<io::Error>>;

#[derive(Debug)]
enum CliError {
    Serial(serialport::Error),
    Bridge(Ds2480bError<io::Error>),
    Bus(BusError),
}

impl From<serialport::Error> for CliError {
    fn from(value: serialport::Error) -> Self {
        Self::Serial(value)
    }
}

impl From<Ds2480bError<io::Error>> for CliError {
    fn from(value: Ds2480bError<io::Error>) -> Self {
        Self::Bridge(value)
    }
}

impl From<BusError> for CliError {
    fn from(value: BusError) -> Self {
        Self::Bus(value)
    }
}

fn open(args: &Args) -> Result<Bridge, CliError> {
    let serial = SerialUart::open(&args.port)?;
    let bridge = Ds2480bBuilder::default()
        .with_retries(args.retries)
        .with_poll_interval_us(args.poll_interval_us)
        .build(serial, Delay)?;
    log::debug!("DS2480B ready on {}", args.port);
    Ok(bridge)
}

fn scan(bus: &mut Bridge) -> Result<(), CliError> {
    let registry = Registry::scan(bus)?;
    for node in registry.nodes() {
        let rom = node.rom();
        let name = node.family().map_or("unknown", |f| f.name());
        let power = match bus.is_parasite_powered(&rom) {
            Ok(true) => "parasite",
            Ok(false) => "external",
            Err(_) => "unknown",
        };
        println!("{rom}  {name:<8} {power} power");
    }
    Ok(())
}

fn poll(
    bus: &mut Bridge,
    interval: u64,
    resolution: ReadoutResolution,
    hysteresis: Temperature,
    count: Option<u32>,
    thermostats: Vec<Thermostat>,
) -> Result<(), CliError> {
    let mut registry = Registry::scan(bus)?.with_thermostats(thermostats);
    if registry.nodes().is_empty() {
        log::warn!("no devices on the bus");
        return Ok(());
    }
    ds18x20::set_resolution_all(bus, resolution)?;
    registry.initialize_switches(bus);
    let mut delay = Delay;
    let mut cycle = 0u32;
    loop {
        let summary = registry.poll(bus, &mut delay, resolution, hysteresis);
        log::info!(
            "cycle {cycle}: {} read, {} failed, {} updated, {} switched",
            summary.read,
            summary.failed,
            summary.updated,
            summary.switched
        );
        for node in registry.nodes() {
            println!("{}  {:?}", node.rom(), node.reading);
        }
        cycle += 1;
        if count.is_some_and(|count| cycle >= count) {
            return Ok(());
        }
        thread::sleep(Duration::from_secs(interval));
    }
}

fn run(args: Args) -> Result<(), CliError> {
    let mut bus = open(&args)?;
    match args.command {
        Command::Scan => scan(&mut bus)?,
        Command::Poll {
            interval,
            resolution,
            hysteresis,
            count,
            thermostats,
        } => poll(&mut bus, interval, resolution, hysteresis, count, thermostats)?,
        Command::Switch { action } => match action {
            SwitchAction::Set { rom, state } => {
                let pins = ds2408::set_state(&mut bus, &mut OneWireNode::new(rom), state)?;
                println!("{rom}  pins {pins:#010b}");
            }
            SwitchAction::Get { rom } => {
                let pins = ds2408::get_state(&mut bus, &mut OneWireNode::new(rom))?;
                println!("{rom}  pins {pins:#010b}");
            }
        },
        Command::Counter { rom, counter } => {
            let counter = Counter::from(counter);
            let value = ds2423::read_counter(&mut bus, &mut OneWireNode::new(rom), counter)?;
            println!("{rom}  counter {counter}: {value}");
        }
        Command::Temperature { rom } => {
            let temp = ds18x20::read_temperature(&mut bus, &mut OneWireNode::new(rom))?;
            println!("{rom}  {temp} C");
        }
        Command::Power { rom } => {
            let parasite = bus.is_parasite_powered(&rom)?;
            println!(
                "{rom}  {} power",
                if parasite { "parasite" } else { "external" }
            );
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    // Initialize the logger
    env_logger::init();
    // Parse command line arguments
    let args = Args::parse();
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e:?}");
            eprintln!("error: {e:?}");
            ExitCode::FAILURE
        }
    }
}
