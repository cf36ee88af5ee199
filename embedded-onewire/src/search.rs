use crate::{
    ONEWIRE_SEARCH_CMD, OneWire, OneWireError, OneWireResult, OneWireStatus, Rom,
};

/// State of the [1-Wire search algorithm](https://www.analog.com/en/resources/app-notes/1wire-search-algorithm.html).
///
/// The state is independent of the bus master: it is passed the bus on every
/// step, so several enumerations (of one or several buses) can coexist.
/// Each call to [next](OneWireSearch::next) performs one search pass and
/// yields at most one ROM code. Devices are enumerated exactly once each, in
/// an order that only depends on the set of devices present.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OneWireSearch {
    last_device: bool,
    last_discrepancy: u8,
    last_family_discrepancy: u8,
    family: Option<u8>,
    rom: [u8; 8],
}

impl OneWireSearch {
    /// Creates a new [`OneWireSearch`] that enumerates every device on the bus.
    pub const fn new() -> Self {
        Self {
            last_device: false,
            last_discrepancy: 0,
            last_family_discrepancy: 0,
            family: None,
            rom: [0; 8],
        }
    }

    /// Creates a new [`OneWireSearch`] that only enumerates devices of the given family.
    pub fn with_family(family: u8) -> Self {
        let mut search = Self::new();
        search.target_family(family);
        search
    }

    /// Resets the search state, so the next search pass starts from the beginning.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Sets up the search to find devices of type `family` on the next call
    /// to [next](OneWireSearch::next).
    ///
    /// Subsequent calls only yield devices of that family; the search ends as
    /// soon as a device of another family would be returned.
    pub fn target_family(&mut self, family: u8) {
        self.rom = [family, 0, 0, 0, 0, 0, 0, 0];
        self.last_discrepancy = 64;
        self.last_family_discrepancy = 0;
        self.last_device = false;
        self.family = Some(family);
    }

    /// Skips the remaining devices sharing the family of the device found last.
    pub fn skip_family(&mut self) {
        self.last_discrepancy = self.last_family_discrepancy;
        self.last_family_discrepancy = 0;
        if self.last_discrepancy == 0 {
            self.last_device = true;
        }
    }

    /// Bit position (1-64) of the last discrepancy where the 0 branch was taken.
    pub fn last_discrepancy(&self) -> u8 {
        self.last_discrepancy
    }

    /// Bit position (1-8) of the last discrepancy within the family code.
    pub fn last_family_discrepancy(&self) -> u8 {
        self.last_family_discrepancy
    }

    /// Whether the last device has been found. Further calls to
    /// [next](OneWireSearch::next) return `None` without touching the bus,
    /// until the search is [reset](OneWireSearch::reset).
    pub fn is_exhausted(&self) -> bool {
        self.last_device
    }

    /// Searches for the next device on the 1-Wire bus.
    ///
    /// The [next](OneWireSearch::next) method can be called repeatedly to find all devices on the bus.
    /// At the end of the search, calling this method will return `None` to indicate that no more devices are present.
    /// A pass that finds no device, or whose bits become inconsistent midway, resets the search state.
    ///
    /// # Errors
    /// - [`OneWireError::InvalidRomCrc`] if the address read does not pass its CRC-8. The search
    ///   state has advanced past it, so the next call continues with the following device.
    /// - [`OneWireError::ShortCircuit`] if the bus master reported a short on reset.
    /// - Any bus error; the search state is reset.
    #[allow(clippy::should_implement_trait)]
    pub fn next<T: OneWire>(&mut self, bus: &mut T) -> OneWireResult<Option<Rom>, T::BusError> {
        if self.last_device {
            return Ok(None);
        }
        let status = match bus.reset() {
            Ok(status) => status,
            Err(e) => {
                self.reset();
                return Err(e);
            }
        };
        if status.shortcircuit() {
            self.reset();
            return Err(OneWireError::ShortCircuit);
        }
        if !status.presence() {
            log::debug!("search: no presence pulse");
            self.reset();
            return Ok(None);
        }
        match self.search_pass(bus) {
            Ok(true) => {}
            Ok(false) => {
                self.reset();
                return Ok(None);
            }
            Err(e) => {
                self.reset();
                return Err(e);
            }
        }
        let rom = Rom::new(self.rom);
        if !rom.is_valid() {
            log::warn!("search: CRC mismatch in ROM {rom}");
            return Err(OneWireError::InvalidRomCrc);
        }
        if let Some(family) = self.family {
            if rom.family_code() != family {
                // devices of one family are contiguous in search order
                self.last_device = true;
                return Ok(None);
            }
        }
        log::trace!("search: found {rom}");
        Ok(Some(rom))
    }

    /// One Search ROM pass over the 64 address bits. Returns `false` if the
    /// pass did not resolve a device.
    fn search_pass<T: OneWire>(&mut self, bus: &mut T) -> OneWireResult<bool, T::BusError> {
        let mut id_bit_num: u8 = 1;
        let mut last_zero: u8 = 0;
        bus.write_byte(ONEWIRE_SEARCH_CMD)?;
        for idx in 0..self.rom.len() {
            for bit in 0..8 {
                let rom_mask = 1u8 << bit;
                let id_bit = bus.read_bit()?;
                let complement_bit = bus.read_bit()?;
                if id_bit && complement_bit {
                    // Both bits are 1: no device took part in this time slot
                    log::debug!("search: no response at bit {id_bit_num}");
                    return Ok(false);
                }
                let dir = if id_bit != complement_bit {
                    id_bit
                } else {
                    let dir = if id_bit_num < self.last_discrepancy {
                        self.rom[idx] & rom_mask > 0
                    } else {
                        id_bit_num == self.last_discrepancy
                    };
                    if !dir {
                        last_zero = id_bit_num;
                        if last_zero < 9 {
                            self.last_family_discrepancy = last_zero;
                        }
                    }
                    dir
                };
                if dir {
                    self.rom[idx] |= rom_mask;
                } else {
                    self.rom[idx] &= !rom_mask;
                }
                bus.write_bit(dir)?;
                id_bit_num += 1;
            }
        }
        self.last_discrepancy = last_zero;
        self.last_device = last_zero == 0;
        // a zero family code means the bus read back as all zeros
        Ok(self.rom[0] != 0)
    }

    /// Verifies if the device with the given ROM code is present on the 1-Wire bus.
    ///
    /// The search state is left as it was before the call, so this can be
    /// interleaved with an ongoing enumeration.
    pub fn verify<T: OneWire>(&mut self, bus: &mut T, rom: &Rom) -> OneWireResult<bool, T::BusError> {
        let saved = self.clone();
        self.reset();
        self.rom = *rom.bytes();
        self.last_discrepancy = 64;
        let res = self.next(bus);
        *self = saved;
        Ok(res? == Some(*rom))
    }

    /// Iterates over the devices found by successive search passes.
    ///
    /// Addresses failing their CRC are yielded as [`OneWireError::InvalidRomCrc`]
    /// and the iteration continues. Any other error ends the iteration.
    pub fn devices<'a, T: OneWire>(&'a mut self, bus: &'a mut T) -> Devices<'a, T> {
        Devices {
            search: self,
            bus,
            done: false,
        }
    }

    /// Enumerates every device on the bus from a fresh search state, extending
    /// `found` with the addresses that pass their CRC.
    ///
    /// The search state and the bus are reset afterwards.
    ///
    /// # Returns
    /// The number of devices added to `found`.
    pub fn discover<T: OneWire, C: Extend<Rom>>(
        &mut self,
        bus: &mut T,
        found: &mut C,
    ) -> OneWireResult<usize, T::BusError> {
        self.reset();
        let mut count = 0;
        for res in self.devices(bus) {
            match res {
                Ok(rom) => {
                    found.extend(Some(rom));
                    count += 1;
                }
                Err(OneWireError::InvalidRomCrc) => {}
                Err(e) => return Err(e),
            }
        }
        self.reset();
        bus.reset()?;
        Ok(count)
    }
}

/// Iterator over devices on a bus, returned by [`OneWireSearch::devices`].
pub struct Devices<'a, T> {
    search: &'a mut OneWireSearch,
    bus: &'a mut T,
    done: bool,
}

impl<T: OneWire> Iterator for Devices<'_, T> {
    type Item = OneWireResult<Rom, T::BusError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.search.next(self.bus) {
            Ok(Some(rom)) => Some(Ok(rom)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(OneWireError::InvalidRomCrc) => Some(Err(OneWireError::InvalidRomCrc)),
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
