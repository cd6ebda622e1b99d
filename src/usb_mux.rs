//! Hand switch USB mux monitor
//!
//! Follows the hand switch and routes the front panel USB port to the
//! selected owner. The mux is only touched when the position changes.

use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::platform::{HandSwitch, SharedPlatform};

/// Hand switch poll period
pub const USB_MUX_POLL_INTERVAL: Duration = Duration::from_secs(1);

pub struct UsbMuxMonitor {
    platform: SharedPlatform,
    /// Last position the mux was successfully switched to
    current: Option<HandSwitch>,
}

impl UsbMuxMonitor {
    pub fn new(platform: SharedPlatform) -> Self {
        Self {
            platform,
            current: None,
        }
    }

    pub fn current(&self) -> Option<HandSwitch> {
        self.current
    }

    /// One poll: read the hand switch and switch the mux if it moved
    pub fn poll(&mut self) {
        let pos = match self.platform.hand_switch() {
            Ok(pos) => pos,
            Err(e) => {
                warn!(error = %e, "Failed to read hand switch");
                return;
            }
        };

        if self.current == Some(pos) {
            return;
        }

        match self.platform.switch_usb_mux(pos) {
            Ok(()) => {
                info!(position = %pos, "USB mux switched");
                self.current = Some(pos);
            }
            Err(e) => {
                warn!(position = %pos, error = %e, "Failed to switch USB mux");
            }
        }
    }

    pub async fn run(mut self) {
        debug!("USB mux monitor started");
        loop {
            self.poll();
            sleep(USB_MUX_POLL_INTERVAL).await;
        }
    }
}
