//! Hardware Platform Interface
//!
//! Every front panel task talks to the chassis exclusively through the
//! [`Platform`] trait. Calls are synchronous and individually atomic; there
//! is no transaction spanning several calls, so two tasks reading the hand
//! switch back to back may observe different positions.
//!
//! ## Implementations
//! - [`FilePlatform`]: one text file per hardware line under a root
//!   directory, sysfs style.
//! - `MockPlatform` (tests only): in-memory state that records every call.

mod file;
#[cfg(test)]
pub(crate) mod mock;

pub use file::FilePlatform;

use std::fmt;
use std::sync::Arc;

/// Number of server slots in the chassis
pub const MAX_SLOTS: u8 = 4;

// ============================================================================
// Types
// ============================================================================

/// Hand switch position selecting the owner of the shared front panel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandSwitch {
    /// The BMC itself owns the console
    Bmc,
    /// Server slot `1..=MAX_SLOTS`
    Slot(u8),
}

impl HandSwitch {
    /// Selected slot, or `None` when the BMC is selected
    pub fn slot(self) -> Option<u8> {
        match self {
            HandSwitch::Bmc => None,
            HandSwitch::Slot(n) => Some(n),
        }
    }

    pub fn is_bmc(self) -> bool {
        self == HandSwitch::Bmc
    }

    /// Parse the textual form used by the file-backed platform (`bmc` or `1`..`4`)
    pub fn parse(s: &str) -> Result<Self, PlatformError> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("bmc") {
            return Ok(HandSwitch::Bmc);
        }
        let n: u8 = s
            .parse()
            .map_err(|_| PlatformError::Parse(format!("hand switch position {:?}", s)))?;
        validate_slot(n)?;
        Ok(HandSwitch::Slot(n))
    }
}

impl fmt::Display for HandSwitch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandSwitch::Bmc => write!(f, "bmc"),
            HandSwitch::Slot(n) => write!(f, "{}", n),
        }
    }
}

/// Server power state as reported by a slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerState {
    Off,
    On,
    /// Graceful shutdown requested but the server has not powered off yet
    TransitioningGraceful,
}

impl PowerState {
    /// Treat anything other than a clean `Off` as powered
    pub fn is_on(self) -> bool {
        !matches!(self, PowerState::Off)
    }
}

/// Command accepted by [`Platform::set_server_power`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerCommand {
    Off,
    On,
    GracefulShutdown,
}

impl fmt::Display for PowerCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PowerCommand::Off => write!(f, "off"),
            PowerCommand::On => write!(f, "on"),
            PowerCommand::GracefulShutdown => write!(f, "graceful"),
        }
    }
}

/// Check that a slot number addresses a real slot
pub fn validate_slot(slot: u8) -> Result<u8, PlatformError> {
    if (1..=MAX_SLOTS).contains(&slot) {
        Ok(slot)
    } else {
        Err(PlatformError::InvalidSlot(slot))
    }
}

// ============================================================================
// Platform trait
// ============================================================================

/// Shared handle used by all tasks
pub type SharedPlatform = Arc<dyn Platform>;

/// Hardware primitives consumed by the front panel tasks
pub trait Platform: Send + Sync {
    /// Whether the debug card is plugged into the front panel
    fn is_debug_card_present(&self) -> Result<bool, PlatformError>;

    /// Route the shared UART to the given owner
    fn switch_uart_mux(&self, pos: HandSwitch) -> Result<(), PlatformError>;

    /// Route the shared USB port to the given owner
    fn switch_usb_mux(&self, pos: HandSwitch) -> Result<(), PlatformError>;

    /// Current hand switch position
    fn hand_switch(&self) -> Result<HandSwitch, PlatformError>;

    fn is_server_present(&self, slot: u8) -> Result<bool, PlatformError>;

    /// Whether the front panel reset button is held
    fn reset_button_pressed(&self) -> Result<bool, PlatformError>;

    /// Drive a slot's reset line; `false` asserts reset (active low)
    fn set_reset_line(&self, slot: u8, high: bool) -> Result<(), PlatformError>;

    /// Whether the front panel power button is held
    fn power_button_pressed(&self) -> Result<bool, PlatformError>;

    fn server_power(&self, slot: u8) -> Result<PowerState, PlatformError>;

    fn set_server_power(&self, slot: u8, cmd: PowerCommand) -> Result<(), PlatformError>;

    /// Start capturing POST codes for a slot
    fn post_enable(&self, slot: u8) -> Result<(), PlatformError>;

    fn post_last_code(&self, slot: u8) -> Result<u8, PlatformError>;

    /// Render a POST code on the debug card display
    fn post_display(&self, slot: u8, code: u8) -> Result<(), PlatformError>;

    fn set_status_led(&self, slot: u8, on: bool) -> Result<(), PlatformError>;

    fn set_identify_led(&self, slot: u8, on: bool) -> Result<(), PlatformError>;

    fn set_heartbeat_led(&self, on: bool) -> Result<(), PlatformError>;

    /// Whether the BMC came up from a power-on reset rather than a warm reboot
    fn is_cold_boot(&self) -> Result<bool, PlatformError>;

    /// Read a value from the persistent key/value store
    fn get_key_value(&self, key: &str) -> Result<Option<String>, PlatformError>;

    fn set_key_value(&self, key: &str, value: &str) -> Result<(), PlatformError>;
}

// ============================================================================
// Error Types
// ============================================================================

/// Hardware access error
#[derive(Debug)]
pub enum PlatformError {
    /// I/O error talking to the hardware line
    Io(std::io::Error),
    /// Line returned something that could not be interpreted
    Parse(String),
    /// Slot number outside `1..=MAX_SLOTS`
    InvalidSlot(u8),
}

impl fmt::Display for PlatformError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlatformError::Io(e) => write!(f, "I/O error: {}", e),
            PlatformError::Parse(what) => write!(f, "Unparsable {}", what),
            PlatformError::InvalidSlot(slot) => write!(f, "Invalid slot {}", slot),
        }
    }
}

impl std::error::Error for PlatformError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PlatformError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for PlatformError {
    fn from(e: std::io::Error) -> Self {
        PlatformError::Io(e)
    }
}

impl From<crate::kv::KvError> for PlatformError {
    fn from(e: crate::kv::KvError) -> Self {
        match e {
            crate::kv::KvError::Io(e) => PlatformError::Io(e),
            crate::kv::KvError::InvalidKey(key) => PlatformError::Parse(format!("key {:?}", key)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hand_switch_parse() {
        assert_eq!(HandSwitch::parse("bmc").unwrap(), HandSwitch::Bmc);
        assert_eq!(HandSwitch::parse("BMC\n").unwrap(), HandSwitch::Bmc);
        assert_eq!(HandSwitch::parse(" 3 ").unwrap(), HandSwitch::Slot(3));
        assert!(matches!(HandSwitch::parse("0"), Err(PlatformError::InvalidSlot(0))));
        assert!(matches!(HandSwitch::parse("5"), Err(PlatformError::InvalidSlot(5))));
        assert!(matches!(HandSwitch::parse("slot"), Err(PlatformError::Parse(_))));
    }

    #[test]
    fn test_hand_switch_slot() {
        assert_eq!(HandSwitch::Bmc.slot(), None);
        assert_eq!(HandSwitch::Slot(2).slot(), Some(2));
        assert!(HandSwitch::Bmc.is_bmc());
        assert!(!HandSwitch::Slot(1).is_bmc());
        assert_eq!(HandSwitch::Slot(4).to_string(), "4");
    }

    #[test]
    fn test_power_state_is_on() {
        assert!(!PowerState::Off.is_on());
        assert!(PowerState::On.is_on());
        assert!(PowerState::TransitioningGraceful.is_on());
    }

    #[test]
    fn test_platform_error_display() {
        assert_eq!(PlatformError::InvalidSlot(7).to_string(), "Invalid slot 7");
        assert_eq!(PlatformError::Parse("hand_sw".into()).to_string(), "Unparsable hand_sw");
    }
}
