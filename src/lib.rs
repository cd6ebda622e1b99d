//! front-paneld Library
//!
//! Front panel controller for a multi-slot server chassis. One debug card
//! port, USB port, reset button, power button and heartbeat LED are shared by
//! every slot; the hand switch picks which slot owns them.
//!
//! Each component is an independent polling task. Tasks share no state in
//! process; they coordinate only through the hardware ([`platform`]) and the
//! key/value store ([`kv`]). Every task reads the hand switch itself, so two
//! tasks can briefly disagree on the selected slot around a switch flip
//! (e.g. the USB mux lags by up to one poll while a reset press already
//! targets the new slot). Each task acts on its own fresh read.

pub mod button;
pub mod clock;
pub mod config;
pub mod debug_card;
pub mod heartbeat;
pub mod kv;
pub mod lock;
pub mod platform;
pub mod power_button;
pub mod reset_button;
pub mod slot_led;
pub mod usb_mux;

use std::time::Duration;

use tokio::task::JoinSet;

/// Re-export commonly used types
pub use clock::{Clock, SharedClock, SystemClock};
pub use config::{ButtonConfig, Config, ConfigError, HeartbeatConfig};
pub use debug_card::DebugCardMonitor;
pub use heartbeat::HeartbeatTracker;
pub use kv::{KvError, KvStore};
pub use lock::{LockError, PidLock};
pub use platform::{
    FilePlatform, HandSwitch, Platform, PlatformError, PowerCommand, PowerState, SharedPlatform,
    MAX_SLOTS,
};
pub use power_button::PowerButtonController;
pub use reset_button::ResetButtonController;
pub use slot_led::SlotLedController;
pub use usb_mux::UsbMuxMonitor;

/// Back-off when the hand switch reads BMC or a read fails
pub const HAND_SWITCH_IDLE_INTERVAL: Duration = Duration::from_secs(1);

/// Spawn every front panel task onto the current runtime
///
/// Slot LED controllers are only spawned for present slots. Every spawned
/// task loops forever, so a task finishing means it panicked.
pub fn spawn_front_panel(
    platform: SharedPlatform,
    clock: SharedClock,
    config: &Config,
) -> JoinSet<&'static str> {
    let mut tasks = JoinSet::new();

    let monitor = DebugCardMonitor::new(platform.clone());
    tasks.spawn(async move {
        monitor.run().await;
        "debug card"
    });

    let monitor = UsbMuxMonitor::new(platform.clone());
    tasks.spawn(async move {
        monitor.run().await;
        "hand switch"
    });

    let controller = ResetButtonController::new(platform.clone(), config.button.clone());
    tasks.spawn(async move {
        controller.run().await;
        "reset button"
    });

    let controller = PowerButtonController::new(platform.clone(), config.button.clone());
    tasks.spawn(async move {
        controller.run().await;
        "power button"
    });

    let tracker = HeartbeatTracker::new(platform.clone(), clock, config.heartbeat.clone());
    tasks.spawn(async move {
        tracker.run().await;
        "heartbeat"
    });

    for slot in config.slots() {
        if let Some(controller) = SlotLedController::start(platform.clone(), slot) {
            tasks.spawn(async move {
                controller.run().await;
                "slot led"
            });
        }
    }

    tracing::info!(tasks = tasks.len(), "Front panel tasks spawned");
    tasks
}
