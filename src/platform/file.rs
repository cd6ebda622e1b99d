//! File-backed hardware platform
//!
//! Each hardware line is a small text file under a root directory, the same
//! shape as Linux sysfs attributes. A board support layer (GPIO exporter,
//! CPLD shim) keeps the files in sync with the real lines.
//!
//! ```text
//! <root>/debug_card        0|1
//! <root>/hand_sw           bmc|1..4
//! <root>/uart_mux          bmc|1..4      (written)
//! <root>/usb_mux           bmc|1..4      (written)
//! <root>/reset_btn         0|1
//! <root>/power_btn         0|1
//! <root>/heartbeat_led     0|1           (written)
//! <root>/por               0|1
//! <root>/slot<N>/present   0|1
//! <root>/slot<N>/power     on|off|graceful
//! <root>/slot<N>/reset     0|1           (written)
//! <root>/slot<N>/led       0|1           (written)
//! <root>/slot<N>/identify_led 0|1        (written)
//! <root>/slot<N>/post_enable  1          (written)
//! <root>/slot<N>/post_code    hex byte
//! <root>/slot<N>/post_display hex byte   (written)
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use super::{validate_slot, HandSwitch, Platform, PlatformError, PowerCommand, PowerState};
use crate::kv::KvStore;

/// Platform reading and writing sysfs-style attribute files
pub struct FilePlatform {
    root: PathBuf,
    kv: KvStore,
}

impl FilePlatform {
    pub fn new<P: AsRef<Path>>(root: P, kv: KvStore) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            kv,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn slot_path(&self, slot: u8, name: &str) -> Result<PathBuf, PlatformError> {
        let slot = validate_slot(slot)?;
        Ok(self.root.join(format!("slot{}", slot)).join(name))
    }

    fn read_attr(&self, path: &Path) -> Result<String, PlatformError> {
        let value = fs::read_to_string(path)?;
        Ok(value.trim().to_string())
    }

    fn write_attr(&self, path: &Path, value: &str) -> Result<(), PlatformError> {
        fs::write(path, value)?;
        Ok(())
    }

    fn read_bool(&self, path: &Path) -> Result<bool, PlatformError> {
        match self.read_attr(path)?.as_str() {
            "0" => Ok(false),
            "1" => Ok(true),
            other => Err(PlatformError::Parse(format!(
                "{} value {:?}",
                path.display(),
                other
            ))),
        }
    }

    fn write_bool(&self, path: &Path, value: bool) -> Result<(), PlatformError> {
        self.write_attr(path, if value { "1" } else { "0" })
    }
}

fn parse_power(value: &str) -> Result<PowerState, PlatformError> {
    match value {
        "off" | "0" => Ok(PowerState::Off),
        "on" | "1" => Ok(PowerState::On),
        "graceful" => Ok(PowerState::TransitioningGraceful),
        other => Err(PlatformError::Parse(format!("power state {:?}", other))),
    }
}

fn parse_post_code(value: &str) -> Result<u8, PlatformError> {
    let digits = value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
        .unwrap_or(value);
    u8::from_str_radix(digits, 16).map_err(|_| PlatformError::Parse(format!("POST code {:?}", value)))
}

impl Platform for FilePlatform {
    fn is_debug_card_present(&self) -> Result<bool, PlatformError> {
        self.read_bool(&self.root.join("debug_card"))
    }

    fn switch_uart_mux(&self, pos: HandSwitch) -> Result<(), PlatformError> {
        self.write_attr(&self.root.join("uart_mux"), &pos.to_string())
    }

    fn switch_usb_mux(&self, pos: HandSwitch) -> Result<(), PlatformError> {
        self.write_attr(&self.root.join("usb_mux"), &pos.to_string())
    }

    fn hand_switch(&self) -> Result<HandSwitch, PlatformError> {
        HandSwitch::parse(&self.read_attr(&self.root.join("hand_sw"))?)
    }

    fn is_server_present(&self, slot: u8) -> Result<bool, PlatformError> {
        self.read_bool(&self.slot_path(slot, "present")?)
    }

    fn reset_button_pressed(&self) -> Result<bool, PlatformError> {
        self.read_bool(&self.root.join("reset_btn"))
    }

    fn set_reset_line(&self, slot: u8, high: bool) -> Result<(), PlatformError> {
        self.write_bool(&self.slot_path(slot, "reset")?, high)
    }

    fn power_button_pressed(&self) -> Result<bool, PlatformError> {
        self.read_bool(&self.root.join("power_btn"))
    }

    fn server_power(&self, slot: u8) -> Result<PowerState, PlatformError> {
        parse_power(&self.read_attr(&self.slot_path(slot, "power")?)?)
    }

    fn set_server_power(&self, slot: u8, cmd: PowerCommand) -> Result<(), PlatformError> {
        self.write_attr(&self.slot_path(slot, "power")?, &cmd.to_string())
    }

    fn post_enable(&self, slot: u8) -> Result<(), PlatformError> {
        self.write_bool(&self.slot_path(slot, "post_enable")?, true)
    }

    fn post_last_code(&self, slot: u8) -> Result<u8, PlatformError> {
        parse_post_code(&self.read_attr(&self.slot_path(slot, "post_code")?)?)
    }

    fn post_display(&self, slot: u8, code: u8) -> Result<(), PlatformError> {
        self.write_attr(&self.slot_path(slot, "post_display")?, &format!("{:02x}", code))
    }

    fn set_status_led(&self, slot: u8, on: bool) -> Result<(), PlatformError> {
        self.write_bool(&self.slot_path(slot, "led")?, on)
    }

    fn set_identify_led(&self, slot: u8, on: bool) -> Result<(), PlatformError> {
        self.write_bool(&self.slot_path(slot, "identify_led")?, on)
    }

    fn set_heartbeat_led(&self, on: bool) -> Result<(), PlatformError> {
        self.write_bool(&self.root.join("heartbeat_led"), on)
    }

    fn is_cold_boot(&self) -> Result<bool, PlatformError> {
        self.read_bool(&self.root.join("por"))
    }

    fn get_key_value(&self, key: &str) -> Result<Option<String>, PlatformError> {
        Ok(self.kv.get(key)?)
    }

    fn set_key_value(&self, key: &str, value: &str) -> Result<(), PlatformError> {
        Ok(self.kv.set(key, value)?)
    }
}
