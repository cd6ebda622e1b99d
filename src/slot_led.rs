//! Per-slot status LED
//!
//! Each present slot gets its own controller. The LED pattern tells an
//! operator standing at the chassis what the slot is doing:
//!
//! | condition                  | status LED            |
//! |----------------------------|-----------------------|
//! | identify requested         | off, identify LED blinks 200/200 ms |
//! | hand switch on BMC         | blink 500/500 ms      |
//! | selected, powered on       | blink 900 on/100 off  |
//! | selected, powered off      | blink 100 on/900 off  |
//! | not selected               | steady, on if powered |
//!
//! Identify is requested through the key/value store, either for the whole
//! SLED (`identify_sled`) or a single slot (`identify_slot<N>`).

use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::kv::{identify_slot_key, IDENTIFY_ON, KEY_IDENTIFY_SLED};
use crate::platform::{HandSwitch, PowerState, SharedPlatform};
use crate::HAND_SWITCH_IDLE_INTERVAL;

/// Identify LED on and off time
pub const IDENTIFY_BLINK: Blink = Blink::new(200, 200);

/// Every slot while the BMC owns the front panel
pub const BMC_SELECTED_BLINK: Blink = Blink::new(500, 500);

/// Selected slot, powered on
pub const SELECTED_ON_BLINK: Blink = Blink::new(900, 100);

/// Selected slot, powered off
pub const SELECTED_OFF_BLINK: Blink = Blink::new(100, 900);

/// Pause after a selected or unselected cycle
const CYCLE_PAUSE: Duration = Duration::from_millis(100);

/// On/off times of a blink pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Blink {
    pub on: Duration,
    pub off: Duration,
}

impl Blink {
    pub const fn new(on_ms: u64, off_ms: u64) -> Self {
        Self {
            on: Duration::from_millis(on_ms),
            off: Duration::from_millis(off_ms),
        }
    }
}

/// Status LED behaviour derived from power state and hand switch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerLed {
    /// Hand switch on the BMC: neutral blink regardless of power
    BmcSelected,
    /// This slot owns the front panel; blink rate follows power
    Selected(Blink),
    /// Another slot owns the front panel; LED mirrors power
    Steady(bool),
}

/// LED behaviour picked for one cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedMode {
    /// Identify LED blinking, power-state logic suppressed
    Identify,
    Power(PowerLed),
}

/// Pick the power-state LED behaviour for a slot
pub fn power_mode(slot: u8, pos: HandSwitch, power: PowerState) -> PowerLed {
    match pos {
        HandSwitch::Bmc => PowerLed::BmcSelected,
        HandSwitch::Slot(selected) if selected == slot => {
            if power.is_on() {
                PowerLed::Selected(SELECTED_ON_BLINK)
            } else {
                PowerLed::Selected(SELECTED_OFF_BLINK)
            }
        }
        HandSwitch::Slot(_) => PowerLed::Steady(power.is_on()),
    }
}

pub struct SlotLedController {
    platform: SharedPlatform,
    slot: u8,
    /// Whether the previous cycle was identifying; `None` before the first cycle
    identifying: Option<bool>,
}

impl SlotLedController {
    /// Controller for a present slot; an absent slot gets its LED turned off
    /// and no controller
    pub fn start(platform: SharedPlatform, slot: u8) -> Option<Self> {
        let present = platform.is_server_present(slot).unwrap_or_else(|e| {
            warn!(slot, error = %e, "Failed to read slot presence");
            false
        });

        if !present {
            info!(slot, "Slot not present, LED off");
            if let Err(e) = platform.set_status_led(slot, false) {
                warn!(slot, error = %e, "Failed to turn off slot LED");
            }
            return None;
        }

        Some(Self {
            platform,
            slot,
            identifying: None,
        })
    }

    /// Whether identify is requested for the whole SLED or for this slot
    fn identify_requested(&self) -> bool {
        let is_on = |key: &str| {
            matches!(self.platform.get_key_value(key), Ok(Some(v)) if v == IDENTIFY_ON)
        };
        is_on(KEY_IDENTIFY_SLED) || is_on(identify_slot_key(self.slot).as_str())
    }

    /// One LED cycle; `None` when the slot state could not be read
    pub async fn cycle(&mut self) -> Option<LedMode> {
        if self.identify_requested() {
            if self.identifying != Some(true) {
                info!(slot = self.slot, "Identify on");
                self.set_status(false);
                self.identifying = Some(true);
            }
            self.blink_identify().await;
            return Some(LedMode::Identify);
        }

        if self.identifying != Some(false) {
            if self.identifying == Some(true) {
                info!(slot = self.slot, "Identify off");
            }
            self.set_identify(false);
            self.identifying = Some(false);
        }

        let power = match self.platform.server_power(self.slot) {
            Ok(power) => power,
            Err(e) => {
                debug!(slot = self.slot, error = %e, "Failed to read power state");
                sleep(HAND_SWITCH_IDLE_INTERVAL).await;
                return None;
            }
        };
        let pos = match self.platform.hand_switch() {
            Ok(pos) => pos,
            Err(e) => {
                debug!(slot = self.slot, error = %e, "Failed to read hand switch");
                sleep(HAND_SWITCH_IDLE_INTERVAL).await;
                return None;
            }
        };

        let mode = power_mode(self.slot, pos, power);
        match mode {
            PowerLed::BmcSelected => {
                self.set_status(false);
                sleep(BMC_SELECTED_BLINK.off).await;
                self.set_status(true);
                sleep(BMC_SELECTED_BLINK.on).await;
            }
            PowerLed::Selected(blink) => {
                // A failed write skips the rest of the blink
                if self.platform.set_status_led(self.slot, true).is_ok() {
                    sleep(blink.on).await;
                    if self.platform.set_status_led(self.slot, false).is_ok() {
                        sleep(blink.off).await;
                    }
                }
                sleep(CYCLE_PAUSE).await;
            }
            PowerLed::Steady(on) => {
                self.set_status(on);
                sleep(CYCLE_PAUSE).await;
            }
        }
        Some(LedMode::Power(mode))
    }

    async fn blink_identify(&self) {
        self.set_identify(true);
        sleep(IDENTIFY_BLINK.on).await;
        self.set_identify(false);
        sleep(IDENTIFY_BLINK.off).await;
    }

    fn set_status(&self, on: bool) {
        if let Err(e) = self.platform.set_status_led(self.slot, on) {
            debug!(slot = self.slot, error = %e, "Failed to set status LED");
        }
    }

    fn set_identify(&self, on: bool) {
        if let Err(e) = self.platform.set_identify_led(self.slot, on) {
            debug!(slot = self.slot, error = %e, "Failed to set identify LED");
        }
    }

    pub async fn run(mut self) {
        debug!(slot = self.slot, "Slot LED controller started");
        loop {
            self.cycle().await;
        }
    }
}
