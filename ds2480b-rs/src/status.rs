use bitfield_struct::bitfield;
use embedded_onewire::OneWireStatus;

/// Reply to a 1-Wire Reset when a presence pulse was detected on a healthy bus.
pub(crate) const RESET_PRESENCE: u8 = 0xcd;

/// Reply of the DS2480B to a 1-Wire Reset command.
///
/// The two least significant bits report the state of the bus after the
/// reset, bits 2-4 identify the chip revision and the two most significant
/// bits are always `11`. A reset that times out is reported as `0x00`,
/// which is not a valid reply.
///
/// Only the exact reply `0xCD` (presence pulse, DS2480B) counts as a device
/// being present; alarming presence pulses and replies from other chip
/// revisions do not.
#[bitfield(u8)]
#[derive(PartialEq, Eq)]
pub struct ResetResponse {
    /// `00`: 1-Wire shorted, `01`: presence pulse, `10`: alarming presence
    /// pulse, `11`: no presence pulse.
    #[bits(2)]
    pub bus_state: u8,
    /// Chip revision, `011` for the DS2480B.
    #[bits(3)]
    pub chip_id: u8,
    #[bits(1)]
    __: u8,
    /// Always `11` in a reset reply.
    #[bits(2)]
    pub marker: u8,
}

impl ResetResponse {
    /// Whether the chip replied at all.
    pub fn replied(&self) -> bool {
        self.marker() == 0b11
    }
}

impl OneWireStatus for ResetResponse {
    fn presence(&self) -> bool {
        self.into_bits() == RESET_PRESENCE
    }

    fn shortcircuit(&self) -> bool {
        self.replied() && self.bus_state() == 0b00
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_reset_replies() {
        let present = ResetResponse::from_bits(0xcd);
        assert!(present.presence());
        assert_eq!(present.bus_state(), 0b01);
        assert_eq!(present.chip_id(), 0b011);

        let absent = ResetResponse::from_bits(0xcf);
        assert!(absent.replied() && !absent.presence() && !absent.shortcircuit());

        let shorted = ResetResponse::from_bits(0xcc);
        assert!(shorted.shortcircuit() && !shorted.presence());

        let alarm = ResetResponse::from_bits(0xce);
        assert!(!alarm.presence());

        let timeout = ResetResponse::new();
        assert!(!timeout.replied() && !timeout.presence() && !timeout.shortcircuit());
    }
}
