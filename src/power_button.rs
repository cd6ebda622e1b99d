//! Front panel power button
//!
//! Classifies a press on the shared power button and turns it into a power
//! command for the slot selected by the hand switch:
//!
//! | press | slot power | command |
//! |-------|------------|---------|
//! | short | on         | graceful shutdown |
//! | short | off        | power on |
//! | long  | any        | hard toggle |
//!
//! A button held past the sample budget never produces a command.

use tokio::time::sleep;
use tracing::{debug, error, warn};

use crate::button::{classify, wait_for_release, ButtonState, PressKind};
use crate::config::ButtonConfig;
use crate::platform::{PlatformError, PowerCommand, PowerState, SharedPlatform};
use crate::HAND_SWITCH_IDLE_INTERVAL;

/// Result of one power button poll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerButtonOutcome {
    NotSelected,
    Idle,
    Stuck { slot: u8 },
    Issued { slot: u8, press: PressKind, command: PowerCommand },
}

/// Power command for a classified press given the slot's current state
pub fn power_command(press: PressKind, power: PowerState) -> PowerCommand {
    match (press, power.is_on()) {
        (PressKind::Long, true) => PowerCommand::Off,
        (PressKind::Long, false) => PowerCommand::On,
        (PressKind::Short, true) => PowerCommand::GracefulShutdown,
        (PressKind::Short, false) => PowerCommand::On,
    }
}

pub struct PowerButtonController {
    platform: SharedPlatform,
    config: ButtonConfig,
}

impl PowerButtonController {
    pub fn new(platform: SharedPlatform, config: ButtonConfig) -> Self {
        Self { platform, config }
    }

    pub async fn poll(&self) -> Result<PowerButtonOutcome, PlatformError> {
        let slot = match self.platform.hand_switch().ok().and_then(|pos| pos.slot()) {
            Some(slot) => slot,
            None => return Ok(PowerButtonOutcome::NotSelected),
        };

        if !self.platform.power_button_pressed()? {
            return Ok(PowerButtonOutcome::Idle);
        }

        warn!(slot, "Power button pressed");

        let platform = &self.platform;
        let samples = match wait_for_release(|| platform.power_button_pressed(), &self.config).await
        {
            ButtonState::Released { samples } => samples,
            _ => {
                warn!(slot, "Power button seems to be stuck for a long time");
                return Ok(PowerButtonOutcome::Stuck { slot });
            }
        };
        warn!(slot, samples, "Power button released");

        let power = self.platform.server_power(slot)?;
        let press = classify(samples, self.config.power_off_threshold);
        let command = power_command(press, power);

        match press {
            PressKind::Long => {
                error!(critical = true, fru = slot, "Power Button Long Press for FRU: {}", slot)
            }
            PressKind::Short => {
                error!(critical = true, fru = slot, "Power Button Press for FRU: {}", slot)
            }
        }

        self.platform.set_server_power(slot, command)?;
        Ok(PowerButtonOutcome::Issued { slot, press, command })
    }

    pub async fn run(self) {
        debug!("Power button controller started");
        loop {
            let interval = match self.poll().await {
                Ok(PowerButtonOutcome::NotSelected) => HAND_SWITCH_IDLE_INTERVAL,
                Ok(_) => self.config.sample_interval(),
                Err(e) => {
                    debug!(error = %e, "Power button cycle aborted");
                    self.config.sample_interval()
                }
            };
            sleep(interval).await;
        }
    }
}
