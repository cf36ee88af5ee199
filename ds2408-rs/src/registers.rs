use bitfield_struct::bitfield;
use embedded_onewire::check_crc16;

/// Address of the first PIO register (PIO Logic State).
pub(crate) const PIO_LOGIC_STATE_ADDR: u16 = 0x0088;
/// Address of the Control/Status register.
pub(crate) const CONTROL_STATUS_ADDR: u16 = 0x008d;

/// Control/Status register (address `0x8D`).
#[bitfield(u8)]
#[derive(PartialEq, Eq)]
pub struct ControlStatus {
    /// Pin activity latch (0) or PIO logic state (1) drives the conditional search.
    pub pls: bool,
    /// Conditional search terms are ORed (0) or ANDed (1).
    pub ct: bool,
    /// RSTZ pin is a reset input (0) or a strobe output (1).
    pub ros: bool,
    /// Power-on reset latch.
    pub porl: bool,
    #[bits(3)]
    __: u8,
    /// V<sub>CC</sub> is powered.
    pub vccp: bool,
}

/// The PIO registers (`0x88` to `0x8F`) as returned by Read PIO Registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PioRegisters([u8; 8]);

impl PioRegisters {
    /// Checks the inverted CRC-16 trailing a Read PIO Registers transfer.
    ///
    /// `frame` holds the command, the two address bytes, the eight register
    /// bytes and the two CRC bytes, in bus order.
    pub(crate) fn from_frame(frame: &[u8; 13]) -> Option<Self> {
        if !check_crc16(&frame[..11], [frame[11], frame[12]], 0) {
            return None;
        }
        let mut regs = [0; 8];
        regs.copy_from_slice(&frame[3..11]);
        Some(Self(regs))
    }

    /// Logic state of the PIO pins.
    pub fn logic_state(&self) -> u8 {
        self.0[0]
    }

    /// PIO output latch state; a 0 bit turns the output transistor on.
    pub fn output_latch(&self) -> u8 {
        self.0[1]
    }

    /// PIO activity latch state.
    pub fn activity_latch(&self) -> u8 {
        self.0[2]
    }

    /// Conditional search channel selection mask.
    pub fn search_mask(&self) -> u8 {
        self.0[3]
    }

    /// Conditional search channel polarity selection.
    pub fn search_polarity(&self) -> u8 {
        self.0[4]
    }

    /// Control/Status register.
    pub fn control_status(&self) -> ControlStatus {
        ControlStatus::from_bits(self.0[5])
    }
}
