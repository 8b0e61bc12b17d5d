//! Fade curve schedules for play/pause transitions
//!
//! Volume ramps are applied in discrete steps against the output device
//! rather than per sample. Both directions use the equal-power pair:
//!
//! - **Fade-out**: v(i) = V0 × cos(π/2 × i/N)
//! - **Fade-in**:  v(i) = V0 × sin(π/2 × i/N)
//!
//! for `i` in `0..=N`. With the default schedule (N = 30, 100 ms per step)
//! a ramp takes 31 steps and about 3 seconds.

use serde::{Deserialize, Serialize};
use std::f64::consts::FRAC_PI_2;
use std::time::Duration;

/// Default number of intervals in a fade (31 steps including both ends)
pub const DEFAULT_FADE_INTERVALS: u32 = 30;

/// Default delay between fade steps
pub const DEFAULT_FADE_STEP_MS: u64 = 100;

/// Direction of a fade
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FadeDirection {
    /// 0 → V0 (resume)
    In,
    /// V0 → 0 (pause)
    Out,
}

impl FadeDirection {
    /// Gain multiplier at normalized position `t` (clamped to 0.0..=1.0)
    pub fn gain(&self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        match self {
            FadeDirection::In => (FRAC_PI_2 * t).sin(),
            FadeDirection::Out => (FRAC_PI_2 * t).cos(),
        }
    }
}

/// Discrete fade schedule: number of intervals and the delay between steps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FadeSchedule {
    pub intervals: u32,
    pub step_ms: u64,
}

impl Default for FadeSchedule {
    fn default() -> Self {
        Self {
            intervals: DEFAULT_FADE_INTERVALS,
            step_ms: DEFAULT_FADE_STEP_MS,
        }
    }
}

impl FadeSchedule {
    pub fn new(intervals: u32, step_ms: u64) -> Self {
        Self {
            intervals: intervals.max(1),
            step_ms,
        }
    }

    /// Number of volume writes performed (both endpoints included)
    pub fn step_count(&self) -> u32 {
        self.intervals + 1
    }

    pub fn step_delay(&self) -> Duration {
        Duration::from_millis(self.step_ms)
    }

    /// Volume to apply at step `i` of a fade from/to `base`
    pub fn level(&self, direction: FadeDirection, base: f64, step: u32) -> f64 {
        let t = step as f64 / self.intervals as f64;
        base * direction.gain(t)
    }

    /// All volumes of a fade, in application order
    pub fn levels(&self, direction: FadeDirection, base: f64) -> impl Iterator<Item = f64> + '_ {
        (0..=self.intervals).map(move |i| self.level(direction, base, i))
    }
}
