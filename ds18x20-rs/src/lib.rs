#![cfg_attr(not(test), no_std)]
#![deny(missing_docs)]
//! # DS18x20
//!
//! Temperature readout for the DS18S20 (family `0x10`), DS1822 (`0x22`) and
//! DS18B20 (`0x28`) 1-Wire sensors, over any bus master implementing [`OneWire`].
//!
//! A typical cycle starts a conversion on every sensor at once with
//! [`trigger_conversion`], then reads each sensor with [`read_temperature`],
//! which retries failed reads and keeps the error counters of the device
//! record up to date.

use embedded_hal::delay::DelayNs;
use embedded_onewire::{
    Family, MAX_RETRIES, OneWire, OneWireError, OneWireNode, OneWireResult, Rom,
};

mod scratchpad;

pub use scratchpad::{
    POWER_ON_TEMPERATURE, ReadoutResolution, Scratchpad, Temperature, raw_to_celsius,
};

const CONVERT_T: u8 = 0x44;
const READ_SCRATCHPAD: u8 = 0xbe;
const WRITE_SCRATCHPAD: u8 = 0x4e;
// alarm limits written along with the configuration
const ALARM_HIGH: u8 = 0x55;
const ALARM_LOW: u8 = 0xaa;

/// Families handled by this crate.
pub const FAMILIES: [Family; 3] = [Family::Ds18b20, Family::Ds18s20, Family::Ds1822];

/// Starts a temperature conversion on every sensor on the bus.
///
/// The results are available after the conversion time of the resolution in use.
pub fn start_conversion_all<O: OneWire>(bus: &mut O) -> OneWireResult<(), O::BusError> {
    bus.address(None)?;
    bus.write_byte(CONVERT_T)
}

/// Starts a temperature conversion on a single sensor.
pub fn start_conversion<O: OneWire>(bus: &mut O, rom: &Rom) -> OneWireResult<(), O::BusError> {
    bus.address(Some(rom))?;
    bus.write_byte(CONVERT_T)
}

/// Starts a conversion on every sensor and waits until it is complete.
pub fn trigger_conversion<O: OneWire, D: DelayNs>(
    bus: &mut O,
    delay: &mut D,
    resolution: ReadoutResolution,
) -> OneWireResult<(), O::BusError> {
    start_conversion_all(bus)?;
    delay.delay_us(resolution.delay_us());
    Ok(())
}

fn write_configuration<O: OneWire>(
    bus: &mut O,
    rom: Option<&Rom>,
    resolution: ReadoutResolution,
) -> OneWireResult<(), O::BusError> {
    bus.address(rom)?;
    bus.write_bytes(&[WRITE_SCRATCHPAD, ALARM_HIGH, ALARM_LOW, resolution as u8])
}

/// Sets the conversion resolution of every sensor on the bus.
///
/// DS18S20 sensors ignore the configuration byte.
pub fn set_resolution_all<O: OneWire>(
    bus: &mut O,
    resolution: ReadoutResolution,
) -> OneWireResult<(), O::BusError> {
    log::debug!("setting all sensors to {} bits", resolution.bits());
    write_configuration(bus, None, resolution)
}

/// Sets the conversion resolution of a single sensor.
pub fn set_resolution<O: OneWire>(
    bus: &mut O,
    rom: &Rom,
    resolution: ReadoutResolution,
) -> OneWireResult<(), O::BusError> {
    write_configuration(bus, Some(rom), resolution)
}

/// Reads the scratchpad of a sensor and checks its CRC.
///
/// # Errors
/// [`OneWireError::NoDevicePresent`] if nothing answered the reset,
/// [`OneWireError::InvalidCrc`] if the scratchpad is corrupted.
pub fn read_scratchpad<O: OneWire>(
    bus: &mut O,
    rom: &Rom,
) -> OneWireResult<Scratchpad, O::BusError> {
    bus.address(Some(rom))?;
    bus.write_byte(READ_SCRATCHPAD)?;
    let mut buf = [0; 9];
    bus.read_bytes(&mut buf)?;
    let sp = Scratchpad::new(buf);
    if sp.is_valid() {
        Ok(sp)
    } else {
        log::warn!("{rom}: scratchpad CRC mismatch {buf:02x?}");
        Err(OneWireError::InvalidCrc)
    }
}

/// Reads the temperature of a sensor once, without retrying.
pub fn read_temperature_once<O: OneWire>(
    bus: &mut O,
    rom: &Rom,
) -> OneWireResult<Temperature, O::BusError> {
    let temp = read_scratchpad(bus, rom)?.temperature(rom.family_code());
    log::debug!("{rom}: {temp} C");
    Ok(temp)
}

/// Reads the temperature of the sensor `node`, retrying up to [`MAX_RETRIES`] times.
///
/// Updates the error and success counters of `node`. The last reading of
/// `node` is left alone, so that the caller can decide whether the new value
/// is worth keeping.
///
/// # Errors
/// [`OneWireError::WrongFamily`] if `node` is not a temperature sensor,
/// otherwise the error of the last attempt.
pub fn read_temperature<O: OneWire>(
    bus: &mut O,
    node: &mut OneWireNode,
) -> OneWireResult<Temperature, O::BusError> {
    node.expect_family::<O::BusError>(&FAMILIES)?;
    let rom = node.rom();
    node.retry(MAX_RETRIES, |_| read_temperature_once(bus, &rom))
}

/// Whether a sensor answers with a plausible scratchpad.
pub fn is_connected<O: OneWire>(bus: &mut O, rom: &Rom) -> OneWireResult<bool, O::BusError> {
    match read_scratchpad(bus, rom) {
        Ok(sp) => Ok(sp.bytes().iter().any(|&b| b != 0)),
        Err(OneWireError::NoDevicePresent) => Ok(false),
        Err(e) if e.is_integrity_failure() => Ok(false),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_hal_mock::eh1::delay::NoopDelay;
    use embedded_onewire::{
        ONEWIRE_MATCH_ROM_CMD, ONEWIRE_SKIP_ROM_CMD, Reading, crc8,
        mock::{Event, ScriptedBus},
    };

    const GOOD: [u8; 9] = [0x91, 0x01, 0x4b, 0x46, 0x7f, 0xff, 0x0f, 0x10, 0x25];

    fn sensor() -> Rom {
        "28.EEA89B19160262".parse().unwrap()
    }

    fn addressed(rom: &Rom, cmd: &[u8]) -> Vec<u8> {
        let mut v = vec![ONEWIRE_MATCH_ROM_CMD];
        v.extend_from_slice(rom.bytes());
        v.extend_from_slice(cmd);
        v
    }

    #[test]
    fn reads_the_scratchpad_of_one_sensor() {
        let rom = sensor();
        let mut bus = ScriptedBus::new();
        bus.push_reads(&GOOD);
        assert_eq!(
            read_temperature_once(&mut bus, &rom),
            Ok(Temperature::lit("25.0625"))
        );
        assert_eq!(bus.written(), addressed(&rom, &[READ_SCRATCHPAD]));
        assert_eq!(bus.resets(), 1);
        assert_eq!(bus.pending_reads(), 0);
    }

    #[test]
    fn corrupted_scratchpad_is_rejected() {
        let mut bus = ScriptedBus::new();
        let mut bad = GOOD;
        bad[8] ^= 0x01;
        bus.push_reads(&bad);
        assert_eq!(
            read_temperature_once(&mut bus, &sensor()),
            Err(OneWireError::InvalidCrc)
        );
    }

    #[test]
    fn ds18s20_readings_are_extended() {
        let mut bytes = [0x10, 0x5a, 0x3c, 0x11, 0x02, 0x08, 0x00, 0x00];
        bytes[7] = crc8(&bytes[..7]);
        let rom = Rom::new(bytes);
        let mut bus = ScriptedBus::new();
        bus.push_reads(&[0x32, 0x00, 0x4b, 0x46, 0xff, 0xff, 0x0c, 0x10, 0x6b]);
        assert_eq!(read_temperature_once(&mut bus, &rom), Ok(Temperature::lit("25")));
    }

    #[test]
    fn retries_count_errors() {
        let mut node = OneWireNode::new(sensor());
        let mut bad = GOOD;
        bad[0] = 0x92;
        let mut bus = ScriptedBus::new();
        bus.push_reads(&bad).push_reads(&GOOD);
        assert_eq!(
            read_temperature(&mut bus, &mut node),
            Ok(Temperature::lit("25.0625"))
        );
        assert_eq!((node.errors, node.success, node.failed_in_row), (1, 1, 0));
        assert_eq!(bus.resets(), 2);
        assert_eq!(node.reading, Reading::Unset);
    }

    #[test]
    fn gives_up_after_the_retry_bound() {
        let mut node = OneWireNode::new(sensor());
        let mut bus = ScriptedBus::new();
        for _ in 0..=MAX_RETRIES {
            bus.push_presence(false);
        }
        assert_eq!(
            read_temperature(&mut bus, &mut node),
            Err(OneWireError::NoDevicePresent)
        );
        assert_eq!(node.errors, u32::from(MAX_RETRIES) + 1);
        assert_eq!((node.success, node.failed_in_row), (0, 1));
    }

    #[test]
    fn link_timeouts_are_retried() {
        let mut node = OneWireNode::new(sensor());
        let mut bus = ScriptedBus::new();
        bus.push_reads(&GOOD[..3]).push_timeout().push_reads(&GOOD);
        assert_eq!(
            read_temperature(&mut bus, &mut node),
            Ok(Temperature::lit("25.0625"))
        );
        assert_eq!((node.errors, node.success), (1, 1));
    }

    #[test]
    fn other_families_are_refused() {
        let mut node = OneWireNode::new("29.29E1030000009C".parse().unwrap());
        let mut bus = ScriptedBus::new();
        assert_eq!(
            read_temperature(&mut bus, &mut node),
            Err(OneWireError::WrongFamily {
                expected: 0x28,
                found: 0x29
            })
        );
        assert!(bus.events().is_empty());
    }

    #[test]
    fn conversion_is_broadcast() {
        let mut bus = ScriptedBus::new();
        trigger_conversion(&mut bus, &mut NoopDelay::new(), ReadoutResolution::Resolution9bit)
            .unwrap();
        assert_eq!(
            bus.events(),
            &[
                Event::Reset,
                Event::Write(ONEWIRE_SKIP_ROM_CMD),
                Event::Write(CONVERT_T)
            ]
        );

        let rom = sensor();
        let mut bus = ScriptedBus::new();
        start_conversion(&mut bus, &rom).unwrap();
        assert_eq!(bus.written(), addressed(&rom, &[CONVERT_T]));
    }

    #[test]
    fn resolution_is_written_with_alarm_limits() {
        let mut bus = ScriptedBus::new();
        set_resolution_all(&mut bus, ReadoutResolution::Resolution10bit).unwrap();
        assert_eq!(
            bus.written(),
            vec![ONEWIRE_SKIP_ROM_CMD, WRITE_SCRATCHPAD, 0x55, 0xaa, 0x3f]
        );

        let rom = sensor();
        let mut bus = ScriptedBus::new();
        set_resolution(&mut bus, &rom, ReadoutResolution::Resolution12bit).unwrap();
        assert_eq!(
            bus.written(),
            addressed(&rom, &[WRITE_SCRATCHPAD, 0x55, 0xaa, 0x7f])
        );
    }

    #[test]
    fn connection_check() {
        let rom = sensor();
        let mut bus = ScriptedBus::new();
        bus.push_reads(&GOOD);
        assert_eq!(is_connected(&mut bus, &rom), Ok(true));

        // an all-zero scratchpad passes the CRC but no sensor reads like this
        let mut bus = ScriptedBus::new();
        bus.push_reads(&[0; 9]);
        assert_eq!(is_connected(&mut bus, &rom), Ok(false));

        let mut corrupted = GOOD;
        corrupted[0] ^= 0x01;
        let mut bus = ScriptedBus::new();
        bus.push_reads(&corrupted);
        assert_eq!(is_connected(&mut bus, &rom), Ok(false));

        // idle line
        let mut bus = ScriptedBus::new();
        assert_eq!(is_connected(&mut bus, &rom), Ok(false));

        let mut bus = ScriptedBus::new();
        bus.push_presence(false);
        assert_eq!(is_connected(&mut bus, &rom), Ok(false));
    }
}
