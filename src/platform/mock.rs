//! In-memory platform for tests
//!
//! Holds plain state that tests poke directly, optional scripted reads for
//! lines that change mid-press, and a log of every write.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use super::{HandSwitch, Platform, PlatformError, PowerCommand, PowerState, MAX_SLOTS};

/// Write observed by the mock
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    UartMux(HandSwitch),
    UsbMux(HandSwitch),
    ResetLine(u8, bool),
    ServerPower(u8, PowerCommand),
    PostEnable(u8),
    PostDisplay(u8, u8),
    StatusLed(u8, bool),
    IdentifyLed(u8, bool),
    HeartbeatLed(bool),
    SetKeyValue(String, String),
}

#[derive(Debug)]
pub struct MockState {
    pub debug_card: bool,
    pub hand_switch: HandSwitch,
    /// Consumed before falling back to `hand_switch`
    pub hand_switch_script: VecDeque<Result<HandSwitch, ()>>,
    pub present: [bool; MAX_SLOTS as usize],
    pub power: [PowerState; MAX_SLOTS as usize],
    pub post_codes: [u8; MAX_SLOTS as usize],
    pub reset_button: bool,
    pub reset_script: VecDeque<bool>,
    pub power_button: bool,
    pub power_script: VecDeque<bool>,
    pub cold_boot: bool,
    pub kv: HashMap<String, String>,
    pub fail_debug_card: bool,
    pub fail_hand_switch: bool,
    pub fail_power_read: bool,
    pub fail_usb_mux: bool,
    pub fail_post_enable: bool,
    /// Number of power state reads served
    pub power_reads: usize,
    pub calls: Vec<Call>,
}

impl Default for MockState {
    fn default() -> Self {
        Self {
            debug_card: false,
            hand_switch: HandSwitch::Bmc,
            hand_switch_script: VecDeque::new(),
            present: [true; MAX_SLOTS as usize],
            power: [PowerState::Off; MAX_SLOTS as usize],
            post_codes: [0; MAX_SLOTS as usize],
            reset_button: false,
            reset_script: VecDeque::new(),
            power_button: false,
            power_script: VecDeque::new(),
            cold_boot: false,
            kv: HashMap::new(),
            fail_debug_card: false,
            fail_hand_switch: false,
            fail_power_read: false,
            fail_usb_mux: false,
            fail_post_enable: false,
            power_reads: 0,
            calls: Vec::new(),
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct MockPlatform {
    state: Arc<Mutex<MockState>>,
}

fn injected(op: &'static str) -> PlatformError {
    PlatformError::Io(std::io::Error::new(std::io::ErrorKind::Other, op))
}

fn idx(slot: u8) -> Result<usize, PlatformError> {
    super::validate_slot(slot).map(|s| (s - 1) as usize)
}

impl MockPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }

    /// Drain the recorded writes
    pub fn take_calls(&self) -> Vec<Call> {
        std::mem::take(&mut self.state().calls)
    }

    fn record(&self, call: Call) {
        self.state().calls.push(call);
    }
}

impl Platform for MockPlatform {
    fn is_debug_card_present(&self) -> Result<bool, PlatformError> {
        let state = self.state();
        if state.fail_debug_card {
            return Err(injected("debug card"));
        }
        Ok(state.debug_card)
    }

    fn switch_uart_mux(&self, pos: HandSwitch) -> Result<(), PlatformError> {
        self.record(Call::UartMux(pos));
        Ok(())
    }

    fn switch_usb_mux(&self, pos: HandSwitch) -> Result<(), PlatformError> {
        if self.state().fail_usb_mux {
            return Err(injected("usb mux"));
        }
        self.record(Call::UsbMux(pos));
        Ok(())
    }

    fn hand_switch(&self) -> Result<HandSwitch, PlatformError> {
        let mut state = self.state();
        if let Some(scripted) = state.hand_switch_script.pop_front() {
            return scripted.map_err(|_| injected("hand switch"));
        }
        if state.fail_hand_switch {
            return Err(injected("hand switch"));
        }
        Ok(state.hand_switch)
    }

    fn is_server_present(&self, slot: u8) -> Result<bool, PlatformError> {
        Ok(self.state().present[idx(slot)?])
    }

    fn reset_button_pressed(&self) -> Result<bool, PlatformError> {
        let mut state = self.state();
        Ok(match state.reset_script.pop_front() {
            Some(v) => v,
            None => state.reset_button,
        })
    }

    fn set_reset_line(&self, slot: u8, high: bool) -> Result<(), PlatformError> {
        idx(slot)?;
        self.record(Call::ResetLine(slot, high));
        Ok(())
    }

    fn power_button_pressed(&self) -> Result<bool, PlatformError> {
        let mut state = self.state();
        Ok(match state.power_script.pop_front() {
            Some(v) => v,
            None => state.power_button,
        })
    }

    fn server_power(&self, slot: u8) -> Result<PowerState, PlatformError> {
        let mut state = self.state();
        state.power_reads += 1;
        if state.fail_power_read {
            return Err(injected("server power"));
        }
        Ok(state.power[idx(slot)?])
    }

    fn set_server_power(&self, slot: u8, cmd: PowerCommand) -> Result<(), PlatformError> {
        idx(slot)?;
        self.record(Call::ServerPower(slot, cmd));
        Ok(())
    }

    fn post_enable(&self, slot: u8) -> Result<(), PlatformError> {
        if self.state().fail_post_enable {
            return Err(injected("post enable"));
        }
        self.record(Call::PostEnable(slot));
        Ok(())
    }

    fn post_last_code(&self, slot: u8) -> Result<u8, PlatformError> {
        Ok(self.state().post_codes[idx(slot)?])
    }

    fn post_display(&self, slot: u8, code: u8) -> Result<(), PlatformError> {
        self.record(Call::PostDisplay(slot, code));
        Ok(())
    }

    fn set_status_led(&self, slot: u8, on: bool) -> Result<(), PlatformError> {
        idx(slot)?;
        self.record(Call::StatusLed(slot, on));
        Ok(())
    }

    fn set_identify_led(&self, slot: u8, on: bool) -> Result<(), PlatformError> {
        idx(slot)?;
        self.record(Call::IdentifyLed(slot, on));
        Ok(())
    }

    fn set_heartbeat_led(&self, on: bool) -> Result<(), PlatformError> {
        self.record(Call::HeartbeatLed(on));
        Ok(())
    }

    fn is_cold_boot(&self) -> Result<bool, PlatformError> {
        Ok(self.state().cold_boot)
    }

    fn get_key_value(&self, key: &str) -> Result<Option<String>, PlatformError> {
        Ok(self.state().kv.get(key).cloned())
    }

    fn set_key_value(&self, key: &str, value: &str) -> Result<(), PlatformError> {
        let mut state = self.state();
        state.kv.insert(key.to_string(), value.to_string());
        state
            .calls
            .push(Call::SetKeyValue(key.to_string(), value.to_string()));
        Ok(())
    }
}
