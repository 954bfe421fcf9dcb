//! Command-line argument parsing.

use clap::Parser;

use crate::params::{
    ControlPanel, FrameConfig, ParticleParams, PatternKind, RenderConfig, ViewMode,
};

/// Command line arguments
#[derive(Parser, Debug)]
#[command(name = "Dotfield")]
#[command(about = "Audio-reactive dot grid and particle sphere visualizer", long_about = None)]
pub struct Args {
    /// Starting view: pattern or particles
    #[arg(long, value_name = "MODE", default_value = "pattern")]
    pub mode: String,

    /// Pattern function: wave, pulse, ripple, noise
    #[arg(long, value_name = "PATTERN", default_value = "wave")]
    pub pattern: String,

    /// Target frame rate (Hz)
    #[arg(long, value_name = "FPS", default_value = "60")]
    pub fps: u32,

    /// Number of particles on the sphere
    #[arg(long, value_name = "COUNT", default_value = "1000")]
    pub particles: usize,

    /// Sphere radius (pixels)
    #[arg(long, value_name = "PIXELS", default_value = "400")]
    pub sphere_size: f32,

    /// Start with microphone reactivity enabled
    #[arg(long)]
    pub audio: bool,

    /// Window width (pixels)
    #[arg(long, value_name = "PIXELS", default_value = "1280")]
    pub width: u32,

    /// Window height (pixels)
    #[arg(long, value_name = "PIXELS", default_value = "720")]
    pub height: u32,
}

impl Args {
    /// Build the initial control panel from the command line
    pub fn control_panel(&self) -> Result<ControlPanel, String> {
        let mode = match self.mode.to_lowercase().as_str() {
            "pattern" => ViewMode::Pattern,
            "particles" => ViewMode::Particles,
            other => {
                eprintln!("Warning: Unknown mode '{}', using pattern", other);
                ViewMode::Pattern
            }
        };

        let mut panel = ControlPanel {
            mode,
            ..ControlPanel::default()
        };
        panel.pattern.kind = PatternKind::from_name(&self.pattern)?;
        panel.particles = ParticleParams {
            count: self.particles,
            sphere_size: self.sphere_size,
            ..ParticleParams::default()
        };
        panel.audio_enabled = self.audio;
        panel.validate()?;

        match mode {
            ViewMode::Pattern => println!("View: pattern ({})", panel.pattern.kind.name()),
            ViewMode::Particles => println!(
                "View: particles ({} on a {}px sphere)",
                panel.particles.count, panel.particles.sphere_size
            ),
        }

        Ok(panel)
    }

    /// Frame pacing from the command line
    pub fn frame_config(&self) -> Result<FrameConfig, String> {
        let config = FrameConfig {
            target_fps: self.fps,
        };
        config.validate()?;
        Ok(config)
    }

    /// Window configuration from the command line
    pub fn render_config(&self) -> RenderConfig {
        RenderConfig {
            window_width: self.width,
            window_height: self.height,
        }
    }
}
