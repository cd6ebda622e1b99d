//! Wall clock and uptime sources
//!
//! The BMC has no battery-backed RTC, so after a power loss the wall clock
//! starts at some stale value until time sync catches up. Uptime comes from
//! `CLOCK_MONOTONIC`, which is valid from boot regardless.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{Local, TimeZone};

/// Source of wall-clock time and monotonic uptime, both in seconds
pub trait Clock: Send + Sync {
    /// Seconds since the Unix epoch
    fn now(&self) -> i64;

    /// Seconds since boot
    fn uptime(&self) -> i64;
}

pub type SharedClock = Arc<dyn Clock>;

/// Clock backed by the operating system
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> i64 {
        match SystemTime::now().duration_since(UNIX_EPOCH) {
            Ok(d) => d.as_secs() as i64,
            // Clock set before 1970
            Err(e) => -(e.duration().as_secs() as i64),
        }
    }

    fn uptime(&self) -> i64 {
        let mut ts = libc::timespec {
            tv_sec: 0,
            tv_nsec: 0,
        };
        // SAFETY: `ts` is a valid, writable timespec for the duration of the call
        let rc = unsafe { libc::clock_gettime(libc::CLOCK_MONOTONIC, &mut ts) };
        if rc != 0 {
            tracing::warn!(
                error = %std::io::Error::last_os_error(),
                "clock_gettime(CLOCK_MONOTONIC) failed"
            );
            return 0;
        }
        ts.tv_sec as i64
    }
}

/// Render a Unix timestamp as local time in `ctime` style
pub fn format_timestamp(secs: i64) -> String {
    match Local.timestamp_opt(secs, 0).single() {
        Some(t) => t.format("%a %b %e %H:%M:%S %Y").to_string(),
        None => format!("@{}", secs),
    }
}
