//! Debug card monitor
//!
//! Tracks debug card hotplug and, while a card is present, routes the UART
//! mux to the hand switch selection and shows the selected slot's last POST
//! code on the card.

use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, warn};

use crate::platform::{HandSwitch, PlatformError, SharedPlatform};

/// Poll period while a card is present
pub const CARD_PRESENT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Poll period while no card is present
pub const CARD_ABSENT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// What a single poll ended up doing with the console
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// No card attached
    Idle,
    /// UART routed to the BMC, nothing to display
    Bmc,
    /// Selected slot is empty
    SlotAbsent(u8),
    /// POST code shown, after a full mux switch and POST enable
    Displayed { slot: u8, code: u8 },
    /// POST code shown without touching the mux
    Redisplayed { slot: u8, code: u8 },
}

/// Last committed observation of the card and hand switch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DebugCardState {
    pub present: Option<bool>,
    pub position: Option<HandSwitch>,
}

pub struct DebugCardMonitor {
    platform: SharedPlatform,
    state: DebugCardState,
}

impl DebugCardMonitor {
    pub fn new(platform: SharedPlatform) -> Self {
        Self {
            platform,
            state: DebugCardState::default(),
        }
    }

    pub fn state(&self) -> DebugCardState {
        self.state
    }

    /// Whether the console can skip straight to redisplaying the POST code
    ///
    /// All three conditions must hold: same position as last cycle, a slot
    /// (not the BMC) selected, and the card was already present last cycle.
    fn can_redisplay(&self, pos: HandSwitch) -> bool {
        self.state.position == Some(pos) && !pos.is_bmc() && self.state.present == Some(true)
    }

    /// One poll. Returns the outcome and the card presence used to pick the
    /// next poll period; a failed cycle leaves the committed state untouched.
    pub fn poll(&mut self) -> (Result<CycleOutcome, PlatformError>, bool) {
        let present = match self.platform.is_debug_card_present() {
            Ok(present) => present,
            Err(e) => {
                debug!(error = %e, "Failed to read debug card presence");
                return (Err(e), false);
            }
        };
        (self.cycle(present), present)
    }

    fn cycle(&mut self, present: bool) -> Result<CycleOutcome, PlatformError> {
        if self.state.present != Some(present) {
            if present {
                warn!("Debug Card Insertion");
            } else {
                warn!("Debug Card Extraction");
                self.platform.switch_uart_mux(HandSwitch::Bmc)?;
            }
        }

        if !present {
            self.commit(present, self.state.position);
            return Ok(CycleOutcome::Idle);
        }

        let pos = self.platform.hand_switch()?;

        if self.can_redisplay(pos) {
            if let Some(slot) = pos.slot() {
                let code = self.display_post(slot)?;
                self.commit(present, Some(pos));
                return Ok(CycleOutcome::Redisplayed { slot, code });
            }
        }

        self.platform.switch_uart_mux(pos)?;

        let slot = match pos.slot() {
            Some(slot) => slot,
            None => {
                self.commit(present, Some(pos));
                return Ok(CycleOutcome::Bmc);
            }
        };

        // POST capture was never enabled, so an insertion must not redisplay
        if !self.platform.is_server_present(slot).unwrap_or(false) {
            self.commit(present, None);
            return Ok(CycleOutcome::SlotAbsent(slot));
        }

        self.platform.post_enable(slot)?;
        let code = self.display_post(slot)?;
        self.commit(present, Some(pos));
        Ok(CycleOutcome::Displayed { slot, code })
    }

    fn display_post(&self, slot: u8) -> Result<u8, PlatformError> {
        let code = self.platform.post_last_code(slot)?;
        self.platform.post_display(slot, code)?;
        Ok(code)
    }

    fn commit(&mut self, present: bool, position: Option<HandSwitch>) {
        self.state = DebugCardState {
            present: Some(present),
            position,
        };
    }

    pub async fn run(mut self) {
        debug!("Debug card monitor started");
        loop {
            let (outcome, present) = self.poll();
            if let Err(e) = outcome {
                debug!(error = %e, "Debug card cycle aborted");
            }
            let interval = if present {
                CARD_PRESENT_POLL_INTERVAL
            } else {
                CARD_ABSENT_POLL_INTERVAL
            };
            sleep(interval).await;
        }
    }
}
