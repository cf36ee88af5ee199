use std::str::FromStr;

use ds18x20::{POWER_ON_TEMPERATURE, ReadoutResolution, Temperature};
use embedded_hal::delay::DelayNs;
use embedded_onewire::{Family, OneWire, OneWireNode, OneWireResult, OneWireSearch, Reading, Rom};

/// Smallest temperature change worth recording.
pub const DEFAULT_HYSTERESIS: Temperature = Temperature::from_bits(8);

/// A relay on a DS2408 pin keeping a temperature sensor between two limits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Thermostat {
    sensor: Rom,
    switch: Rom,
    pin: u8,
    low: Temperature,
    high: Temperature,
}

impl Thermostat {
    /// Binds pin `pin` (0-7) of `switch` to `sensor`, with `low` below `high`.
    pub fn new(
        sensor: Rom,
        switch: Rom,
        pin: u8,
        low: Temperature,
        high: Temperature,
    ) -> Result<Self, String> {
        if pin > 7 {
            return Err(format!("pin {pin} out of range 0-7"));
        }
        if low >= high {
            return Err(format!("low limit {low} not below high limit {high}"));
        }
        Ok(Self { sensor, switch, pin, low, high })
    }

    /// New switch state for `temperature`, or [`None`] while it stays within the limits.
    ///
    /// The relay is turned on (pin bit cleared) below the low limit and off
    /// (pin bit set) above the high limit.
    pub fn output(&self, temperature: Temperature, state: u8) -> Option<u8> {
        let mask = 1u8 << self.pin;
        if temperature < self.low {
            Some(state & !mask)
        } else if temperature > self.high {
            Some(state | mask)
        } else {
            None
        }
    }
}

impl FromStr for Thermostat {
    type Err = String;

    /// Parses `SENSOR:SWITCH:PIN:LOW:HIGH`, e.g. `28.EEA89B19160262:29.29E1030000009C:0:20:22.5`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(':').collect();
        let [sensor, switch, pin, low, high] = parts[..] else {
            return Err(format!("expected SENSOR:SWITCH:PIN:LOW:HIGH, got {s:?}"));
        };
        let rom = |s: &str| Rom::from_str(s).map_err(|e| format!("{s:?}: {e}"));
        let temp = |s: &str| Temperature::from_str(s).map_err(|e| format!("{s:?}: {e}"));
        let pin: u8 = pin.parse().map_err(|e| format!("{pin:?}: {e}"))?;
        Thermostat::new(rom(sensor)?, rom(switch)?, pin, temp(low)?, temp(high)?)
    }
}

/// Outcome of a polling cycle.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PollSummary {
    /// Devices read successfully.
    pub read: usize,
    /// Devices that could not be read after all retries.
    pub failed: usize,
    /// Temperature readings recorded.
    pub updated: usize,
    /// Switch states changed by a thermostat.
    pub switched: usize,
}

/// The devices on the bus and what the host does with them.
#[derive(Debug, Default)]
pub struct Registry {
    nodes: Vec<OneWireNode>,
    thermostats: Vec<Thermostat>,
}

impl Registry {
    /// Creates a registry of the devices of a supported family among `roms`.
    pub fn new(roms: impl IntoIterator<Item = Rom>) -> Self {
        let nodes = roms
            .into_iter()
            .filter(|rom| match rom.family() {
                Some(family) => {
                    log::info!("{rom}: {family}");
                    true
                }
                None => {
                    log::warn!("{rom}: unsupported family {:#04x}, ignored", rom.family_code());
                    false
                }
            })
            .map(OneWireNode::new)
            .collect();
        Self {
            nodes,
            thermostats: Vec::new(),
        }
    }

    /// Enumerates the bus and creates a registry of the devices found.
    pub fn scan<O: OneWire>(bus: &mut O) -> OneWireResult<Self, O::BusError> {
        let mut roms = Vec::new();
        let found = OneWireSearch::new().discover(bus, &mut roms)?;
        log::info!("found {found} device(s)");
        Ok(Self::new(roms))
    }

    /// Binds thermostats to the devices; bindings to unknown devices are dropped.
    pub fn with_thermostats(mut self, thermostats: impl IntoIterator<Item = Thermostat>) -> Self {
        for t in thermostats {
            let sensor = self.node(&t.sensor).and_then(|n| n.family());
            let switch = self.node(&t.switch).and_then(|n| n.family());
            match (sensor, switch) {
                (Some(s), Some(Family::Ds2408)) if s.is_temperature_sensor() => {
                    self.thermostats.push(t)
                }
                _ => log::warn!("thermostat {} -> {} ignored: no such devices", t.sensor, t.switch),
            }
        }
        self
    }

    /// The devices, in discovery order.
    pub fn nodes(&self) -> &[OneWireNode] {
        &self.nodes
    }

    /// The device with address `rom`.
    pub fn node(&self, rom: &Rom) -> Option<&OneWireNode> {
        self.nodes.iter().find(|n| n.rom() == *rom)
    }

    fn node_mut(&mut self, rom: &Rom) -> Option<&mut OneWireNode> {
        self.nodes.iter_mut().find(|n| n.rom() == *rom)
    }

    /// Brings every switch into its start-up state.
    pub fn initialize_switches<O: OneWire>(&mut self, bus: &mut O)
    where
        O::BusError: std::fmt::Debug,
    {
        for node in self.nodes.iter_mut().filter(|n| n.family() == Some(Family::Ds2408)) {
            if let Err(e) = ds2408::initialize(bus, node) {
                log::warn!("{}: initialization failed: {e:?}", node.rom());
            }
        }
    }

    /// Runs one polling cycle.
    ///
    /// Starts a conversion on every temperature sensor, waits for it, then
    /// reads every device. A temperature is recorded only when it moved by
    /// more than `hysteresis` and is below the power-on value; thermostats
    /// bound to a sensor act on recorded temperatures only.
    pub fn poll<O: OneWire, D: DelayNs>(
        &mut self,
        bus: &mut O,
        delay: &mut D,
        resolution: ReadoutResolution,
        hysteresis: Temperature,
    ) -> PollSummary
    where
        O::BusError: std::fmt::Debug,
    {
        let mut summary = PollSummary::default();
        let has_sensors = self
            .nodes
            .iter()
            .any(|n| n.family().is_some_and(Family::is_temperature_sensor));
        if has_sensors {
            if let Err(e) = ds18x20::trigger_conversion(bus, delay, resolution) {
                log::warn!("could not start conversions: {e:?}");
            }
        }

        let mut updated = Vec::new();
        for node in self.nodes.iter_mut() {
            let res = match node.family() {
                Some(f) if f.is_temperature_sensor() => {
                    ds18x20::read_temperature(bus, node).map(|t| {
                        if record_temperature(node, t, hysteresis) {
                            updated.push((node.rom(), t));
                        }
                    })
                }
                Some(Family::Ds2408) => ds2408::get_state(bus, node).map(|_| ()),
                Some(Family::Ds2423) => ds2423::read_counters(bus, node).map(|_| ()),
                _ => continue,
            };
            match res {
                Ok(()) => summary.read += 1,
                Err(e) => {
                    summary.failed += 1;
                    log::warn!(
                        "{}: read failed ({} in a row): {e:?}",
                        node.rom(),
                        node.failed_in_row
                    );
                }
            }
        }
        summary.updated = updated.len();

        for (sensor, temperature) in updated {
            let bound: Vec<Thermostat> = self
                .thermostats
                .iter()
                .filter(|t| t.sensor == sensor)
                .cloned()
                .collect();
            for t in bound {
                match self.regulate(bus, &t, temperature) {
                    Ok(true) => summary.switched += 1,
                    Ok(false) => {}
                    Err(e) => log::warn!("{}: thermostat failed: {e:?}", t.switch),
                }
            }
        }
        summary
    }

    fn regulate<O: OneWire>(
        &mut self,
        bus: &mut O,
        t: &Thermostat,
        temperature: Temperature,
    ) -> OneWireResult<bool, O::BusError> {
        let Some(node) = self.node_mut(&t.switch) else {
            return Ok(false);
        };
        let state = ds2408::get_state(bus, node)?;
        match t.output(temperature, state) {
            Some(new) if new != state => {
                ds2408::set_state(bus, node, new)?;
                log::info!(
                    "{}: {temperature} C, switch state {state:#010b} -> {new:#010b}",
                    t.sensor
                );
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

/// Records `temperature` as the reading of `node` if it is worth keeping.
fn record_temperature(
    node: &mut OneWireNode,
    temperature: Temperature,
    hysteresis: Temperature,
) -> bool {
    if temperature >= POWER_ON_TEMPERATURE {
        log::debug!("{}: ignoring {temperature} C", node.rom());
        return false;
    }
    let changed = match node.reading {
        Reading::Temperature(last) => (temperature - last).abs() > hysteresis,
        _ => true,
    };
    if changed {
        node.reading = Reading::Temperature(temperature);
    }
    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_hal_mock::eh1::delay::NoopDelay;
    use embedded_onewire::mock::{ScriptedBus, SimulatedBus};

    const SENSOR: &str = "28.EEA89B19160262";
    const SWITCH: &str = "29.29E1030000009C";

    fn scratchpad(lsb: u8, crc: u8) -> [u8; 9] {
        [lsb, 0x01, 0x4b, 0x46, 0x7f, 0xff, 0x0f, 0x10, crc]
    }

    fn temp(s: &str) -> Temperature {
        Temperature::from_str(s).unwrap()
    }

    #[test]
    fn scan_keeps_supported_families() {
        let mut unknown = [0x7e, 1, 2, 3, 4, 5, 6, 0];
        unknown[7] = embedded_onewire::crc8(&unknown[..7]);
        let roms = vec![
            SENSOR.parse().unwrap(),
            SWITCH.parse().unwrap(),
            Rom::new(unknown),
        ];
        let mut bus = SimulatedBus::new(roms);
        let registry = Registry::scan(&mut bus).unwrap();
        assert_eq!(registry.nodes().len(), 2);
        assert!(registry.node(&SENSOR.parse().unwrap()).is_some());
        assert!(registry.node(&Rom::new(unknown)).is_none());
    }

    #[test]
    fn readings_within_hysteresis_are_not_recorded() {
        let mut registry = Registry::new([SENSOR.parse().unwrap()]);
        let mut bus = ScriptedBus::new();
        // 25.0625, 25.3125, 25.5625, 25.625
        bus.push_reads(&scratchpad(0x91, 0x25))
            .push_reads(&scratchpad(0x95, 0x30))
            .push_reads(&scratchpad(0x99, 0x0f))
            .push_reads(&scratchpad(0x9a, 0xca));
        let mut delay = NoopDelay::new();
        let mut poll = || {
            registry.poll(&mut bus, &mut delay, ReadoutResolution::default(), DEFAULT_HYSTERESIS)
        };
        assert_eq!(poll().updated, 1);
        assert_eq!(poll().updated, 0);
        assert_eq!(poll().updated, 0);
        assert_eq!(poll().updated, 1);
        assert_eq!(
            registry.nodes()[0].reading,
            Reading::Temperature(temp("25.625"))
        );
    }

    #[test]
    fn power_on_value_is_ignored() {
        let mut node = OneWireNode::new(SENSOR.parse().unwrap());
        assert!(!record_temperature(&mut node, POWER_ON_TEMPERATURE, DEFAULT_HYSTERESIS));
        assert_eq!(node.reading, Reading::Unset);
        assert!(record_temperature(&mut node, temp("-3.5"), DEFAULT_HYSTERESIS));
    }

    #[test]
    fn failed_reads_are_counted() {
        let mut registry = Registry::new([SENSOR.parse().unwrap()]);
        let mut bus = ScriptedBus::new();
        for _ in 0..4 {
            bus.push_reads(&scratchpad(0x91, 0x00));
        }
        let summary = registry.poll(
            &mut bus,
            &mut NoopDelay::new(),
            ReadoutResolution::default(),
            DEFAULT_HYSTERESIS,
        );
        assert_eq!((summary.read, summary.failed), (0, 1));
        let node = &registry.nodes()[0];
        assert_eq!((node.errors, node.failed_in_row), (4, 1));
        assert_eq!(node.reading, Reading::Unset);
    }

    #[test]
    fn thermostat_output() {
        let t: Thermostat = format!("{SENSOR}:{SWITCH}:2:20:22.5").parse().unwrap();
        assert_eq!(t.pin, 2);
        assert_eq!(t.output(temp("19.5"), 0xff), Some(0xfb));
        assert_eq!(t.output(temp("23"), 0x00), Some(0x04));
        assert_eq!(t.output(temp("21"), 0x00), None);

        assert!(format!("{SENSOR}:{SWITCH}:8:20:22").parse::<Thermostat>().is_err());
        assert!(format!("{SENSOR}:{SWITCH}:1:22:20").parse::<Thermostat>().is_err());
        assert!(format!("{SENSOR}:{SWITCH}:1:20").parse::<Thermostat>().is_err());
    }

    #[test]
    fn thermostat_pins_are_checked_on_construction() {
        let sensor: Rom = SENSOR.parse().unwrap();
        let switch: Rom = SWITCH.parse().unwrap();
        assert!(Thermostat::new(sensor, switch, 8, temp("20"), temp("22")).is_err());
        assert!(Thermostat::new(sensor, switch, 255, temp("20"), temp("22")).is_err());
        let t = Thermostat::new(sensor, switch, 7, temp("20"), temp("22")).unwrap();
        assert_eq!(t.output(temp("25"), 0x00), Some(0x80));
    }

    #[test]
    fn thermostat_switches_the_relay() {
        let sensor: Rom = SENSOR.parse().unwrap();
        let switch: Rom = SWITCH.parse().unwrap();
        let t: Thermostat = format!("{SENSOR}:{SWITCH}:0:20:24").parse().unwrap();
        let mut registry = Registry::new([sensor, switch]).with_thermostats([t]);
        // PIO logic state 0x5a, CRC over the Read PIO Registers frame
        let registers = [0x5a, 0xff, 0x00, 0x00, 0x00, 0x84, 0xff, 0xff, 0xb1, 0x2b];
        let mut bus = ScriptedBus::new();
        bus.push_reads(&scratchpad(0x91, 0x25)) // 25.0625, above the limit
            .push_reads(&registers) // polled switch state
            .push_reads(&registers) // state before regulating
            .push_reads(&[0xaa, 0x5b]); // channel access ack, new pins
        let summary = registry.poll(
            &mut bus,
            &mut NoopDelay::new(),
            ReadoutResolution::default(),
            DEFAULT_HYSTERESIS,
        );
        assert_eq!(summary, PollSummary { read: 2, failed: 0, updated: 1, switched: 1 });
        assert_eq!(registry.node(&switch).unwrap().reading, Reading::Switch(0x5b));
        let written = bus.written();
        assert!(written.windows(3).any(|w| w == [0x5a, 0x5b, 0xa4]));
        assert_eq!(bus.pending_reads(), 0);
    }

    #[test]
    fn thermostats_need_known_devices() {
        let t: Thermostat = format!("{SENSOR}:{SWITCH}:0:20:24").parse().unwrap();
        let registry = Registry::new([SENSOR.parse().unwrap()]).with_thermostats([t]);
        assert!(registry.thermostats.is_empty());
    }
}
