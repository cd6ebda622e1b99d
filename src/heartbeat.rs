//! Heartbeat LED and SLED power-cycle tracking
//!
//! Blinks the heartbeat LED at 1 Hz and keeps a low-water mark of wall-clock
//! time in the key/value store (`timestamp_sled`). The BMC has no RTC
//! battery, so after a chassis power loss the clock restarts from a stale
//! value. The tracker uses the stored mark two ways:
//!
//! - On a cold boot the stored mark is the last instant the SLED was known to
//!   be powered, logged as the power-off time.
//! - The clock is only trusted once it reads at or past the stored mark. At
//!   that point `now - uptime` gives the instant the SLED powered back on.
//!
//! The mark is refreshed once per `timestamp_interval` heartbeats while the
//! clock is trusted, so the next power-off estimate is within that window.

use tokio::time::sleep;
use tracing::{debug, error, warn};

use crate::clock::{format_timestamp, SharedClock};
use crate::config::HeartbeatConfig;
use crate::kv::KEY_TIMESTAMP_SLED;
use crate::platform::SharedPlatform;

/// What a single heartbeat iteration observed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Clock still reads earlier than the stored mark
    pub clock_pending: bool,
    /// Reconstructed SLED power-on instant, logged on this tick
    pub powered_on_at: Option<i64>,
    /// Timestamp written to the store on this tick
    pub persisted: Option<i64>,
}

pub struct HeartbeatTracker {
    platform: SharedPlatform,
    clock: SharedClock,
    config: HeartbeatConfig,
    /// Stored power-cycle mark; only ever moves forward
    sled_off: i64,
    cold_boot: bool,
    time_valid: bool,
    count: u32,
}

impl HeartbeatTracker {
    /// Read the stored mark and the boot cause
    pub fn new(platform: SharedPlatform, clock: SharedClock, config: HeartbeatConfig) -> Self {
        let sled_off = match platform.get_key_value(KEY_TIMESTAMP_SLED) {
            Ok(Some(value)) => value.trim().parse::<i64>().unwrap_or_else(|_| {
                warn!(value = %value, "Unparsable {}, assuming 0", KEY_TIMESTAMP_SLED);
                0
            }),
            Ok(None) => 0,
            Err(e) => {
                warn!(error = %e, "Failed to read {}", KEY_TIMESTAMP_SLED);
                0
            }
        };

        let cold_boot = platform.is_cold_boot().unwrap_or_else(|e| {
            warn!(error = %e, "Failed to read boot cause, assuming warm reboot");
            false
        });

        Self {
            platform,
            clock,
            config,
            sled_off,
            cold_boot,
            time_valid: false,
            count: 0,
        }
    }

    pub fn sled_off(&self) -> i64 {
        self.sled_off
    }

    pub fn is_time_valid(&self) -> bool {
        self.time_valid
    }

    /// Log the power-off event recovered from the store; `Some` on a cold boot
    pub fn log_power_off(&self) -> Option<i64> {
        if !self.cold_boot {
            return None;
        }
        error!(
            critical = true,
            timestamp = self.sled_off,
            "SLED Powered OFF at {}",
            format_timestamp(self.sled_off)
        );
        Some(self.sled_off)
    }

    /// One heartbeat: a full LED blink, then clock validation and bookkeeping
    pub async fn tick(&mut self) -> TickReport {
        let half = self.config.half_period();
        self.set_led(true);
        sleep(half).await;
        self.set_led(false);
        sleep(half).await;

        let mut report = TickReport::default();

        if !self.time_valid {
            let now = self.clock.now();
            if now < self.sled_off {
                report.clock_pending = true;
                return report;
            }

            self.time_valid = true;
            debug!(now, stored = self.sled_off, "Wall clock validated");

            if self.cold_boot {
                let on_at = now - self.clock.uptime();
                error!(
                    critical = true,
                    timestamp = on_at,
                    "SLED Powered ON at {}",
                    format_timestamp(on_at)
                );
                report.powered_on_at = Some(on_at);
            }
        }

        self.count += 1;
        if self.count >= self.config.timestamp_interval {
            self.count = 0;
            report.persisted = self.persist();
        }

        report
    }

    fn persist(&mut self) -> Option<i64> {
        let now = self.clock.now();
        if now < self.sled_off {
            warn!(now, stored = self.sled_off, "Wall clock went backwards, keeping stored timestamp");
            return None;
        }
        match self.platform.set_key_value(KEY_TIMESTAMP_SLED, &now.to_string()) {
            Ok(()) => {
                self.sled_off = now;
                debug!(timestamp = now, "Power-cycle timestamp stored");
                Some(now)
            }
            Err(e) => {
                warn!(error = %e, "Failed to store power-cycle timestamp");
                None
            }
        }
    }

    fn set_led(&self, on: bool) {
        if let Err(e) = self.platform.set_heartbeat_led(on) {
            debug!(error = %e, "Failed to set heartbeat LED");
        }
    }

    pub async fn run(mut self) {
        debug!("Heartbeat tracker started");
        self.log_power_off();
        loop {
            self.tick().await;
        }
    }
}
