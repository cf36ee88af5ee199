//! Command constants for 1-Wire communication.

/// Command to match a specific ROM address in 1-Wire communication.
pub const ONEWIRE_MATCH_ROM_CMD: u8 = 0x55;

/// Command to skip ROM address in 1-Wire communication, addressing every device on the bus.
pub const ONEWIRE_SKIP_ROM_CMD: u8 = 0xcc;

/// The Resume command re-selects the device that was last addressed
/// with a Match ROM or a successful Search ROM, without transmitting
/// the 64-bit ROM code again. Supported by the DS2408 and most
/// multi-drop devices with a RC (resume) flag.
pub const ONEWIRE_RESUME_CMD: u8 = 0xa5;

/// Command to search for devices on the 1-Wire bus
pub const ONEWIRE_SEARCH_CMD: u8 = 0xf0;

/// Read Power Supply function command. Parasite-powered devices pull
/// the bus low during the following read time slot.
pub const ONEWIRE_READ_POWER_SUPPLY_CMD: u8 = 0xb4;
