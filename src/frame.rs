//! Frame pacing and simulation time accumulation.

use crate::params::FrameConfig;

/// Longest wall-clock gap folded into simulation time in one tick.
/// Keeps a dragged window or a debugger stop from teleporting the animation.
const MAX_STEP_S: f64 = 0.25;

/// Result of an accepted frame tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameTick {
    /// Accumulated simulation time in seconds (frozen while paused)
    pub time_s: f32,

    /// Simulation step folded in by this tick (0 while paused)
    pub dt_s: f32,
}

/// Gates simulation and draw to a target cadence.
///
/// Callers hand in a monotonic clock reading each redraw; ticks arriving
/// faster than the target interval are rejected without touching any state.
/// Simulation time advances only while `playing` is true.
pub struct FrameDriver {
    target_interval_s: f64,
    last_tick_s: Option<f64>,
    time_s: f64,
}

impl FrameDriver {
    pub fn new(config: &FrameConfig) -> Self {
        Self {
            target_interval_s: config.target_interval_s(),
            last_tick_s: None,
            time_s: 0.0,
        }
    }

    /// Accumulated simulation time in seconds
    pub fn time_s(&self) -> f32 {
        self.time_s as f32
    }

    /// Offer the driver a redraw opportunity at monotonic time `now_s`.
    ///
    /// Returns `None` when the frame arrives early; the caller must then
    /// skip both simulation and draw. Returns the tick to act on otherwise.
    pub fn tick(&mut self, now_s: f64, playing: bool) -> Option<FrameTick> {
        let Some(last) = self.last_tick_s else {
            // First frame: establish the timebase, draw immediately
            self.last_tick_s = Some(now_s);
            return Some(FrameTick {
                time_s: self.time_s as f32,
                dt_s: 0.0,
            });
        };

        let elapsed = now_s - last;
        if elapsed < self.target_interval_s {
            return None;
        }

        let step = if playing { elapsed.min(MAX_STEP_S) } else { 0.0 };
        self.time_s += step;
        self.last_tick_s = Some(now_s);

        Some(FrameTick {
            time_s: self.time_s as f32,
            dt_s: step as f32,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn driver_60hz() -> FrameDriver {
        FrameDriver::new(&FrameConfig { target_fps: 60 })
    }

    #[test]
    fn test_second_tick_within_half_interval_is_noop() {
        let mut driver = driver_60hz();
        assert!(driver.tick(0.0, true).is_some());

        // 1/60 s later: accepted
        assert!(driver.tick(1.0 / 60.0, true).is_some());
        let time_after = driver.time_s();

        // 1/120 s later: rejected, and no state moved
        assert!(driver.tick(1.0 / 60.0 + 1.0 / 120.0, true).is_none());
        assert_eq!(driver.time_s(), time_after);

        // Another 1/120 s completes the interval; elapsed counts from the
        // last accepted tick, not the rejected one
        let tick = driver.tick(2.0 / 60.0, true).unwrap();
        assert!((tick.dt_s - 1.0 / 60.0).abs() < 1e-6);
    }

    #[test]
    fn test_time_frozen_while_paused() {
        let mut driver = driver_60hz();
        driver.tick(0.0, true);
        driver.tick(0.1, true);
        let frozen = driver.time_s();

        let tick = driver.tick(0.2, false).unwrap();
        assert_eq!(tick.dt_s, 0.0);
        assert_eq!(tick.time_s, frozen);

        // Resuming accumulates only the new elapsed span
        let tick = driver.tick(0.3, true).unwrap();
        assert!((tick.time_s - frozen - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_long_stall_clamped() {
        let mut driver = driver_60hz();
        driver.tick(0.0, true);

        let tick = driver.tick(10.0, true).unwrap();
        assert!((tick.dt_s - MAX_STEP_S as f32).abs() < 1e-6);
    }

    #[test]
    fn test_first_tick_draws_without_advancing() {
        let mut driver = driver_60hz();
        let tick = driver.tick(5.0, true).unwrap();
        assert_eq!(tick.time_s, 0.0);
        assert_eq!(tick.dt_s, 0.0);
    }
}
