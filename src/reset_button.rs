//! Front panel reset button
//!
//! Passes a reset button press through to the slot selected by the hand
//! switch: the slot's reset line is held low for as long as the button is.

use tokio::time::sleep;
use tracing::{debug, error, warn};

use crate::button::{wait_for_release, ButtonState};
use crate::config::ButtonConfig;
use crate::platform::{PlatformError, SharedPlatform};
use crate::HAND_SWITCH_IDLE_INTERVAL;

/// Result of one reset button poll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetOutcome {
    /// BMC selected or hand switch unreadable
    NotSelected,
    /// Button not pressed
    Idle,
    /// Full pulse delivered to the slot
    Pulsed { slot: u8 },
    /// Button held past the sample budget; reset line left asserted
    Stuck { slot: u8 },
}

pub struct ResetButtonController {
    platform: SharedPlatform,
    config: ButtonConfig,
}

impl ResetButtonController {
    pub fn new(platform: SharedPlatform, config: ButtonConfig) -> Self {
        Self { platform, config }
    }

    pub async fn poll(&self) -> Result<ResetOutcome, PlatformError> {
        let slot = match self.platform.hand_switch().ok().and_then(|pos| pos.slot()) {
            Some(slot) => slot,
            None => return Ok(ResetOutcome::NotSelected),
        };

        if !self.platform.reset_button_pressed()? {
            return Ok(ResetOutcome::Idle);
        }

        warn!(slot, "Reset button pressed");
        self.platform.set_reset_line(slot, false)?;

        let platform = &self.platform;
        match wait_for_release(|| platform.reset_button_pressed(), &self.config).await {
            ButtonState::Released { .. } => {
                warn!(slot, "Reset button released");
                error!(critical = true, fru = slot, "Reset Button pressed for FRU: {}", slot);
                self.platform.set_reset_line(slot, true)?;
                Ok(ResetOutcome::Pulsed { slot })
            }
            _ => {
                warn!(slot, "Reset button seems to be stuck for a long time");
                Ok(ResetOutcome::Stuck { slot })
            }
        }
    }

    pub async fn run(self) {
        debug!("Reset button controller started");
        loop {
            let interval = match self.poll().await {
                Ok(ResetOutcome::NotSelected) => HAND_SWITCH_IDLE_INTERVAL,
                Ok(_) => self.config.sample_interval(),
                Err(e) => {
                    debug!(error = %e, "Reset button cycle aborted");
                    self.config.sample_interval()
                }
            };
            sleep(interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::mock::{Call, MockPlatform};
    use crate::platform::HandSwitch;
    use std::sync::Arc;

    fn controller() -> (MockPlatform, ResetButtonController) {
        let mock = MockPlatform::new();
        let controller = ResetButtonController::new(Arc::new(mock.clone()), ButtonConfig::default());
        (mock, controller)
    }

    #[tokio::test(start_paused = true)]
    async fn test_bmc_selected_ignores_button() {
        let (mock, controller) = controller();
        mock.state().reset_button = true;
        assert_eq!(controller.poll().await.unwrap(), ResetOutcome::NotSelected);
        assert!(mock.take_calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_hand_switch_failure_is_not_selected() {
        let (mock, controller) = controller();
        mock.state().fail_hand_switch = true;
        mock.state().reset_button = true;
        assert_eq!(controller.poll().await.unwrap(), ResetOutcome::NotSelected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_not_pressed() {
        let (mock, controller) = controller();
        mock.state().hand_switch = HandSwitch::Slot(1);
        assert_eq!(controller.poll().await.unwrap(), ResetOutcome::Idle);
        assert!(mock.take_calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_press_pulses_selected_slot() {
        let (mock, controller) = controller();
        {
            let mut state = mock.state();
            state.hand_switch = HandSwitch::Slot(3);
            // Detect read, then held for five polls, then released
            state.reset_script.extend([true, true, true, true, true, true, false]);
        }

        assert_eq!(controller.poll().await.unwrap(), ResetOutcome::Pulsed { slot: 3 });
        assert_eq!(
            mock.take_calls(),
            vec![Call::ResetLine(3, false), Call::ResetLine(3, true)]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_stuck_button_leaves_line_low() {
        let (mock, controller) = controller();
        {
            let mut state = mock.state();
            state.hand_switch = HandSwitch::Slot(2);
            state.reset_button = true;
        }

        assert_eq!(controller.poll().await.unwrap(), ResetOutcome::Stuck { slot: 2 });
        assert_eq!(mock.take_calls(), vec![Call::ResetLine(2, false)]);
    }
}
