//! Touch tracking for the ripple and pulse effects.
//!
//! Both trackers are plain state machines: the event loop feeds them
//! press/move/release transitions, and the frame step feeds them the
//! simulation clock so finished effects expire.

use glam::Vec2;

use crate::params::EffectTimings;

/// Sentinel uniform position meaning "no touch"
pub const NO_TOUCH: [f32; 2] = [-1.0, -1.0];

/// Sentinel end time meaning "not released yet"
pub const NOT_RELEASED: f32 = -1.0;

/// Ripple-ring touch state for the pattern view.
///
/// Idle → Active on the first press (start time recorded, end time
/// cleared), stays Active through drags (position follows, start time
/// preserved), Released on release/cancel (end time recorded, position
/// kept), and back to Idle once the decay window after the press has
/// passed.
#[derive(Debug, Clone)]
pub struct RippleTracker {
    decay_s: f32,
    position: Option<Vec2>,
    start_time: f32,
    end_time: f32,
}

/// Per-frame ripple fields destined for the pattern uniforms
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RippleState {
    /// Normalized touch position, or `NO_TOUCH`
    pub position: [f32; 2],

    /// Seconds since the press began (0 when idle)
    pub elapsed_s: f32,

    /// Absolute release time, or `NOT_RELEASED`
    pub end_time: f32,
}

impl RippleTracker {
    pub fn new(timings: &EffectTimings) -> Self {
        Self {
            decay_s: timings.ripple_decay_s,
            position: None,
            start_time: 0.0,
            end_time: NOT_RELEASED,
        }
    }

    /// Press or drag at a normalized [0,1]² position.
    ///
    /// A fresh press starts a new ripple; a drag only moves it, so the ring
    /// keeps expanding on the first press's clock.
    pub fn press(&mut self, position: Vec2, now_s: f32) {
        if self.position.is_none() {
            self.start_time = now_s;
            self.end_time = NOT_RELEASED;
        }
        self.position = Some(position);
    }

    /// Release or cancel; the ripple keeps its last position while fading
    pub fn release(&mut self, now_s: f32) {
        if self.position.is_some() {
            self.end_time = now_s;
        }
    }

    /// Advance internal decay; call once per accepted frame
    pub fn update(&mut self, now_s: f32) {
        if self.position.is_some()
            && self.end_time >= 0.0
            && now_s - self.start_time > self.decay_s
        {
            self.position = None;
            self.end_time = NOT_RELEASED;
        }
    }

    pub fn is_idle(&self) -> bool {
        self.position.is_none()
    }

    pub fn is_released(&self) -> bool {
        self.position.is_some() && self.end_time >= 0.0
    }

    /// Sample the tracker for this frame's uniforms
    pub fn state(&self, now_s: f32) -> RippleState {
        match self.position {
            Some(position) => RippleState {
                position: position.to_array(),
                elapsed_s: now_s - self.start_time,
                end_time: self.end_time,
            },
            None => RippleState {
                position: NO_TOUCH,
                elapsed_s: 0.0,
                end_time: NOT_RELEASED,
            },
        }
    }
}

/// Tap-pulse state for the particle view: a flag plus the tap position,
/// cleared once the pulse window has decayed.
#[derive(Debug, Clone)]
pub struct PulseTracker {
    decay_s: f32,
    active: bool,
    start_time: f32,
    position: Vec2,
}

impl PulseTracker {
    pub fn new(timings: &EffectTimings) -> Self {
        Self {
            decay_s: timings.pulse_decay_s,
            active: false,
            start_time: 0.0,
            position: Vec2::ZERO,
        }
    }

    /// Trigger a pulse at a normalized [0,1]² position.
    /// Retriggering restarts the window from `now_s`.
    pub fn trigger(&mut self, position: Vec2, now_s: f32) {
        self.active = true;
        self.start_time = now_s;
        self.position = position;
    }

    /// Expire a finished pulse; call once per accepted frame
    pub fn update(&mut self, now_s: f32) {
        if self.active && now_s - self.start_time > self.decay_s {
            self.active = false;
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn start_time(&self) -> f32 {
        self.start_time
    }

    pub fn position(&self) -> Vec2 {
        self.position
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker() -> RippleTracker {
        RippleTracker::new(&EffectTimings::default())
    }

    #[test]
    fn test_press_release_decays_to_idle() {
        let mut ripple = tracker();
        ripple.press(Vec2::new(0.5, 0.5), 0.0);
        ripple.release(0.0);
        assert!(ripple.is_released());

        // Still fading inside the window
        ripple.update(1.4);
        assert!(!ripple.is_idle());

        // 1.6 s after the press: position cleared, back to idle
        ripple.update(1.6);
        assert!(ripple.is_idle());
        assert_eq!(ripple.state(1.6).position, NO_TOUCH);
        assert_eq!(ripple.state(1.6).end_time, NOT_RELEASED);
    }

    #[test]
    fn test_drag_preserves_start_time() {
        let mut ripple = tracker();
        ripple.press(Vec2::new(0.2, 0.2), 1.0);
        ripple.press(Vec2::new(0.8, 0.6), 1.3);

        let state = ripple.state(1.5);
        assert_eq!(state.position, [0.8, 0.6]);
        // elapsed counts from the first press
        assert!((state.elapsed_s - 0.5).abs() < 1e-6);
        assert_eq!(state.end_time, NOT_RELEASED);
    }

    #[test]
    fn test_held_touch_never_expires() {
        let mut ripple = tracker();
        ripple.press(Vec2::new(0.5, 0.5), 0.0);

        // Way past the decay window but never released
        ripple.update(10.0);
        assert!(!ripple.is_idle());
        assert_eq!(ripple.state(10.0).end_time, NOT_RELEASED);
    }

    #[test]
    fn test_new_press_after_decay_restarts() {
        let mut ripple = tracker();
        ripple.press(Vec2::new(0.1, 0.1), 0.0);
        ripple.release(0.1);
        ripple.update(2.0);
        assert!(ripple.is_idle());

        ripple.press(Vec2::new(0.9, 0.9), 3.0);
        let state = ripple.state(3.2);
        assert_eq!(state.position, [0.9, 0.9]);
        assert!((state.elapsed_s - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_release_when_idle_is_noop() {
        let mut ripple = tracker();
        ripple.release(5.0);
        assert!(ripple.is_idle());
        assert!(!ripple.is_released());
    }

    #[test]
    fn test_pulse_decays_after_window() {
        let mut pulse = PulseTracker::new(&EffectTimings::default());
        pulse.trigger(Vec2::new(0.3, 0.7), 1.0);
        assert!(pulse.is_active());

        pulse.update(2.9);
        assert!(pulse.is_active());

        pulse.update(3.1);
        assert!(!pulse.is_active());
    }

    #[test]
    fn test_pulse_retrigger_restarts_window() {
        let mut pulse = PulseTracker::new(&EffectTimings::default());
        pulse.trigger(Vec2::new(0.5, 0.5), 0.0);
        pulse.trigger(Vec2::new(0.6, 0.4), 1.5);

        pulse.update(3.0);
        assert!(pulse.is_active());
        assert_eq!(pulse.position(), Vec2::new(0.6, 0.4));

        pulse.update(3.6);
        assert!(!pulse.is_active());
    }
}
