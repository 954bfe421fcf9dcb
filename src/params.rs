//! Parameter definitions with documented ranges and defaults.
//!
//! Everything the control panel exposes lives here, with:
//! - Documented ranges and meanings
//! - `Default` impls matching the shipped defaults
//! - Validation for CLI-supplied values

use std::ops::RangeInclusive;

/// Which renderer the window is showing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewMode {
    /// Full-screen dot-grid pattern shader
    Pattern,
    /// Particle sphere with compute-driven physics
    Particles,
}

/// Full-screen pattern selector (uniform value = `as u32`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternKind {
    Wave = 0,
    Pulse = 1,
    Ripple = 2,
    Noise = 3,
}

impl PatternKind {
    pub fn name(self) -> &'static str {
        match self {
            PatternKind::Wave => "wave",
            PatternKind::Pulse => "pulse",
            PatternKind::Ripple => "ripple",
            PatternKind::Noise => "noise",
        }
    }

    /// Next pattern in display order, wrapping
    pub fn next(self) -> Self {
        match self {
            PatternKind::Wave => PatternKind::Pulse,
            PatternKind::Pulse => PatternKind::Ripple,
            PatternKind::Ripple => PatternKind::Noise,
            PatternKind::Noise => PatternKind::Wave,
        }
    }

    pub fn from_name(name: &str) -> Result<Self, String> {
        match name.to_lowercase().as_str() {
            "wave" => Ok(PatternKind::Wave),
            "pulse" => Ok(PatternKind::Pulse),
            "ripple" => Ok(PatternKind::Ripple),
            "noise" => Ok(PatternKind::Noise),
            other => Err(format!(
                "unknown pattern '{}' (expected wave, pulse, ripple, noise)",
                other
            )),
        }
    }
}

/// Dot-grid pattern parameters
#[derive(Debug, Clone)]
pub struct PatternParams {
    /// Grid density (dots per screen height), range 10–50
    pub density: f32,

    /// Dot radius as a fraction of one grid cell, range 0.05–0.3
    pub dot_size: f32,

    /// Animation speed multiplier (dimensionless), range 0.1–2.0
    pub speed: f32,

    /// Selected pattern function
    pub kind: PatternKind,

    /// Foreground color (RGBA)
    pub color_a: [f32; 4],

    /// Background color (RGBA)
    pub color_b: [f32; 4],

    /// Cycle dot hues instead of using `color_a`
    pub multi_color: bool,

    /// Hue cycle speed when multi-colored (dimensionless)
    pub gradient_speed: f32,
}

impl Default for PatternParams {
    fn default() -> Self {
        Self {
            density: 40.0,
            dot_size: 0.15,
            speed: 0.8,
            kind: PatternKind::Wave,
            color_a: [1.0, 1.0, 1.0, 1.0],
            color_b: [0.0, 0.0, 0.0, 1.0],
            multi_color: false,
            gradient_speed: 1.0,
        }
    }
}

impl PatternParams {
    pub const DENSITY_RANGE: RangeInclusive<f32> = 10.0..=50.0;
    pub const DOT_SIZE_RANGE: RangeInclusive<f32> = 0.05..=0.3;
    pub const SPEED_RANGE: RangeInclusive<f32> = 0.1..=2.0;

    pub fn validate(&self) -> Result<(), String> {
        if !Self::DENSITY_RANGE.contains(&self.density) {
            return Err(format!(
                "pattern density {} outside {:?}",
                self.density,
                Self::DENSITY_RANGE
            ));
        }
        if !Self::DOT_SIZE_RANGE.contains(&self.dot_size) {
            return Err(format!(
                "dot size {} outside {:?}",
                self.dot_size,
                Self::DOT_SIZE_RANGE
            ));
        }
        if !Self::SPEED_RANGE.contains(&self.speed) {
            return Err(format!(
                "pattern speed {} outside {:?}",
                self.speed,
                Self::SPEED_RANGE
            ));
        }
        Ok(())
    }
}

/// Particle-sphere parameters
#[derive(Debug, Clone)]
pub struct ParticleParams {
    /// Physics speed multiplier (dimensionless), range 0.1–2.0
    pub speed: f32,

    /// Particle radius as a fraction of the short viewport edge, range 0.001–0.01
    pub size: f32,

    /// Number of particles on the sphere, range 500–2000
    pub count: usize,

    /// Sphere radius in pixels before projection, range 200–800
    pub sphere_size: f32,
}

impl Default for ParticleParams {
    fn default() -> Self {
        Self {
            speed: 0.8,
            size: 0.003,
            count: 1000,
            sphere_size: 400.0,
        }
    }
}

impl ParticleParams {
    pub const SPEED_RANGE: RangeInclusive<f32> = 0.1..=2.0;
    pub const SIZE_RANGE: RangeInclusive<f32> = 0.001..=0.01;
    pub const COUNT_RANGE: RangeInclusive<usize> = 500..=2000;
    pub const SPHERE_SIZE_RANGE: RangeInclusive<f32> = 200.0..=800.0;

    pub fn validate(&self) -> Result<(), String> {
        if !Self::SPEED_RANGE.contains(&self.speed) {
            return Err(format!(
                "particle speed {} outside {:?}",
                self.speed,
                Self::SPEED_RANGE
            ));
        }
        if !Self::SIZE_RANGE.contains(&self.size) {
            return Err(format!(
                "particle size {} outside {:?}",
                self.size,
                Self::SIZE_RANGE
            ));
        }
        if !Self::COUNT_RANGE.contains(&self.count) {
            return Err(format!(
                "particle count {} outside {:?}",
                self.count,
                Self::COUNT_RANGE
            ));
        }
        if !Self::SPHERE_SIZE_RANGE.contains(&self.sphere_size) {
            return Err(format!(
                "sphere size {} outside {:?}",
                self.sphere_size,
                Self::SPHERE_SIZE_RANGE
            ));
        }
        Ok(())
    }
}

/// Decay windows for the touch-driven effects.
///
/// Historical builds shipped 1.5 s ripples with 2.0 s pulses; neither value
/// is load-bearing anywhere else.
#[derive(Debug, Clone, Copy)]
pub struct EffectTimings {
    /// Seconds a ripple persists after the press started, once released
    pub ripple_decay_s: f32,

    /// Seconds a tap pulse keeps pushing particles
    pub pulse_decay_s: f32,
}

impl Default for EffectTimings {
    fn default() -> Self {
        Self {
            ripple_decay_s: 1.5,
            pulse_decay_s: 2.0,
        }
    }
}

/// Frame pacing configuration
#[derive(Debug, Clone, Copy)]
pub struct FrameConfig {
    /// Target frame rate (Hz); simulation and draw never run faster
    pub target_fps: u32,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self { target_fps: 60 }
    }
}

impl FrameConfig {
    /// Minimum seconds between simulated frames
    pub fn target_interval_s(&self) -> f64 {
        1.0 / self.target_fps as f64
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.target_fps == 0 || self.target_fps > 240 {
            return Err(format!("target fps {} outside 1-240", self.target_fps));
        }
        Ok(())
    }
}

/// Microphone loudness mapping
#[derive(Debug, Clone, Copy)]
pub struct AudioConfig {
    /// Decibel value reported for perfect silence (rms = 0)
    pub silence_floor_db: f32,

    /// Loudness mapped to 0.0
    pub min_db: f32,

    /// Loudness mapped to 1.0
    pub max_db: f32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            silence_floor_db: -160.0,
            min_db: -60.0,
            max_db: 0.0,
        }
    }
}

impl AudioConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.min_db >= self.max_db {
            return Err(format!(
                "audio range invalid: min {} dB >= max {} dB",
                self.min_db, self.max_db
            ));
        }
        Ok(())
    }
}

/// Window configuration
#[derive(Debug, Clone, Copy)]
pub struct RenderConfig {
    /// Window width (pixels)
    pub window_width: u32,

    /// Window height (pixels)
    pub window_height: u32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            window_width: 1280,
            window_height: 720,
        }
    }
}

/// Live parameter state, mutated by input handling between frames and
/// sampled read-only once per frame by the renderer.
#[derive(Debug, Clone)]
pub struct ControlPanel {
    pub mode: ViewMode,
    pub playing: bool,
    pub audio_enabled: bool,
    pub pattern: PatternParams,
    pub particles: ParticleParams,
}

impl Default for ControlPanel {
    fn default() -> Self {
        Self {
            mode: ViewMode::Pattern,
            playing: true,
            audio_enabled: false,
            pattern: PatternParams::default(),
            particles: ParticleParams::default(),
        }
    }
}

impl ControlPanel {
    pub fn validate(&self) -> Result<(), String> {
        self.pattern.validate()?;
        self.particles.validate()?;
        Ok(())
    }

    /// Nudge a float parameter, clamped to its range
    pub fn nudge(value: &mut f32, delta: f32, range: RangeInclusive<f32>) {
        *value = (*value + delta).clamp(*range.start(), *range.end());
    }

    /// Step the particle count, clamped to its range
    pub fn step_count(&mut self, delta: isize) {
        let count = self.particles.count as isize + delta;
        self.particles.count = count.clamp(
            *ParticleParams::COUNT_RANGE.start() as isize,
            *ParticleParams::COUNT_RANGE.end() as isize,
        ) as usize;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        assert!(ControlPanel::default().validate().is_ok());
        assert!(FrameConfig::default().validate().is_ok());
        assert!(AudioConfig::default().validate().is_ok());
    }

    #[test]
    fn test_out_of_range_rejected() {
        let mut pattern = PatternParams::default();
        pattern.density = 9.0;
        assert!(pattern.validate().is_err());

        let mut particles = ParticleParams::default();
        particles.count = 3000;
        assert!(particles.validate().is_err());

        let frame = FrameConfig { target_fps: 0 };
        assert!(frame.validate().is_err());
    }

    #[test]
    fn test_pattern_kind_cycle() {
        let mut kind = PatternKind::Wave;
        for _ in 0..4 {
            kind = kind.next();
        }
        assert_eq!(kind, PatternKind::Wave);
        assert_eq!(PatternKind::Pulse.next(), PatternKind::Ripple);
    }

    #[test]
    fn test_pattern_kind_from_name() {
        assert_eq!(
            PatternKind::from_name("Ripple").unwrap(),
            PatternKind::Ripple
        );
        assert!(PatternKind::from_name("plasma").is_err());
    }

    #[test]
    fn test_nudge_clamps() {
        let mut value = 49.5;
        ControlPanel::nudge(&mut value, 2.0, PatternParams::DENSITY_RANGE);
        assert_eq!(value, 50.0);

        let mut panel = ControlPanel::default();
        panel.particles.count = 1900;
        panel.step_count(500);
        assert_eq!(panel.particles.count, 2000);
        panel.step_count(-5000);
        assert_eq!(panel.particles.count, 500);
    }
}
