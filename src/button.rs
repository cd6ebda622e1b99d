//! Front panel button debounce and press classification
//!
//! A press is tracked by polling the button at a fixed interval until it is
//! released or the sample budget runs out. The tracker is a small explicit
//! state machine so the thresholds can be checked without hardware:
//!
//! ```text
//! Idle --pressed--> PressDetected --sample--> HoldingForRelease{n}
//! HoldingForRelease{n} --released--> Released{n}
//! HoldingForRelease{n} --held, n+1 == budget--> Stuck
//! ```

use tokio::time::sleep;

use crate::config::ButtonConfig;
use crate::platform::PlatformError;

/// Debounce state of one button
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonState {
    Idle,
    /// Press seen, release polling not started
    PressDetected,
    /// `samples` polls have seen the button still held
    HoldingForRelease { samples: u32 },
    /// Released after `samples` held polls
    Released { samples: u32 },
    /// Held for the whole sample budget
    Stuck,
}

impl ButtonState {
    /// Feed one sample; `max_samples` is the stuck budget
    pub fn step(self, pressed: bool, max_samples: u32) -> Self {
        match self {
            ButtonState::Idle if pressed => ButtonState::PressDetected,
            ButtonState::Idle => ButtonState::Idle,
            ButtonState::PressDetected => {
                ButtonState::HoldingForRelease { samples: 0 }.step(pressed, max_samples)
            }
            ButtonState::HoldingForRelease { samples } if !pressed => {
                ButtonState::Released { samples }
            }
            ButtonState::HoldingForRelease { samples } => {
                if samples + 1 >= max_samples {
                    ButtonState::Stuck
                } else {
                    ButtonState::HoldingForRelease { samples: samples + 1 }
                }
            }
            done @ (ButtonState::Released { .. } | ButtonState::Stuck) => done,
        }
    }

    pub fn is_done(self) -> bool {
        matches!(self, ButtonState::Released { .. } | ButtonState::Stuck)
    }
}

/// Long/short classification of a released press
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PressKind {
    Short,
    Long,
}

/// Classify a press by the number of held polls before release
pub fn classify(samples: u32, long_threshold: u32) -> PressKind {
    if samples >= long_threshold {
        PressKind::Long
    } else {
        PressKind::Short
    }
}

/// Poll a pressed button until it is released or declared stuck
///
/// Returns `Released { samples }` or `Stuck`. A failed read counts as still
/// held, so a flaky line can never shorten a press.
pub async fn wait_for_release<F>(mut read: F, config: &ButtonConfig) -> ButtonState
where
    F: FnMut() -> Result<bool, PlatformError>,
{
    let mut state = ButtonState::PressDetected;
    loop {
        let pressed = match read() {
            Ok(pressed) => pressed,
            Err(e) => {
                tracing::debug!(error = %e, "Button read failed, treating as held");
                true
            }
        };
        state = state.step(pressed, config.max_samples);
        if state.is_done() {
            return state;
        }
        sleep(config.sample_interval()).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::io;

    /// Run the FSM over `held` held samples followed by a release
    fn press_for(held: u32, max: u32) -> ButtonState {
        let mut state = ButtonState::Idle.step(true, max);
        for _ in 0..held {
            state = state.step(true, max);
            if state.is_done() {
                return state;
            }
        }
        state.step(false, max)
    }

    #[test]
    fn test_idle_stays_idle_when_released() {
        assert_eq!(ButtonState::Idle.step(false, 200), ButtonState::Idle);
        assert_eq!(ButtonState::Idle.step(true, 200), ButtonState::PressDetected);
    }

    #[test]
    fn test_immediate_release() {
        assert_eq!(
            ButtonState::PressDetected.step(false, 200),
            ButtonState::Released { samples: 0 }
        );
    }

    #[test]
    fn test_threshold_boundary() {
        let long = press_for(40, 200);
        assert_eq!(long, ButtonState::Released { samples: 40 });
        assert_eq!(classify(40, 40), PressKind::Long);

        let short = press_for(39, 200);
        assert_eq!(short, ButtonState::Released { samples: 39 });
        assert_eq!(classify(39, 40), PressKind::Short);
    }

    #[test]
    fn test_stuck_after_budget() {
        assert_eq!(press_for(199, 200), ButtonState::Released { samples: 199 });
        assert_eq!(press_for(200, 200), ButtonState::Stuck);
    }

    #[test]
    fn test_terminal_states_absorb() {
        let released = ButtonState::Released { samples: 5 };
        assert_eq!(released.step(true, 200), released);
        assert_eq!(ButtonState::Stuck.step(false, 200), ButtonState::Stuck);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_release_counts_samples() {
        let mut script: VecDeque<bool> = VecDeque::from(vec![true; 12]);
        script.push_back(false);
        let config = ButtonConfig::default();

        let start = tokio::time::Instant::now();
        let state = wait_for_release(|| Ok(script.pop_front().unwrap_or(false)), &config).await;

        assert_eq!(state, ButtonState::Released { samples: 12 });
        // One sample interval slept per held poll
        assert_eq!(start.elapsed(), config.sample_interval() * 12);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_release_stuck() {
        let config = ButtonConfig::default();
        let mut reads = 0u32;
        let state = wait_for_release(
            || {
                reads += 1;
                Ok(true)
            },
            &config,
        )
        .await;
        assert_eq!(state, ButtonState::Stuck);
        assert_eq!(reads, config.max_samples);
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_error_counts_as_held() {
        let config = ButtonConfig::default();
        let mut script: VecDeque<Result<bool, PlatformError>> = VecDeque::new();
        script.push_back(Ok(true));
        script.push_back(Err(PlatformError::Io(io::Error::new(io::ErrorKind::Other, "i2c"))));
        script.push_back(Ok(false));

        let state = wait_for_release(|| script.pop_front().unwrap_or(Ok(false)), &config).await;
        assert_eq!(state, ButtonState::Released { samples: 2 });
    }
}
