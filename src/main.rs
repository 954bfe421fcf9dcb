//! Dotfield - an audio- and touch-reactive visual toy
//!
//! Two views share one window: a full-screen dot-grid pattern that ripples
//! under the pointer, and a particle sphere that pulses away from taps.
//! Microphone loudness swells both when monitoring is on.

mod audio;
mod cli;
mod frame;
mod params;
mod particles;
mod rendering;
mod touch;

use std::sync::Arc;
use std::time::Instant;

use clap::Parser;
use glam::Vec2;
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalPosition,
    event::*,
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowId},
};

use audio::AudioMonitor;
use frame::FrameDriver;
use params::{
    AudioConfig, ControlPanel, EffectTimings, FrameConfig, ParticleParams, PatternKind,
    PatternParams, RenderConfig, ViewMode,
};
use particles::sphere_layout;
use rendering::{ParticleUniforms, PatternUniforms, RenderSystem};
use touch::{PulseTracker, RippleTracker};

/// Main application state
struct App {
    // Window and rendering
    window: Option<Arc<Window>>,
    render_system: Option<RenderSystem>,

    // Simulation systems
    panel: ControlPanel,
    driver: FrameDriver,
    ripple: RippleTracker,
    pulse: PulseTracker,
    audio: AudioMonitor,

    // Configuration
    render_config: RenderConfig,

    // Input and time tracking
    start_time: Instant,
    cursor: PhysicalPosition<f64>,
    pointer_down: bool,
}

impl App {
    fn new(panel: ControlPanel, frame_config: FrameConfig, render_config: RenderConfig) -> Self {
        let timings = EffectTimings::default();

        Self {
            window: None,
            render_system: None,
            driver: FrameDriver::new(&frame_config),
            ripple: RippleTracker::new(&timings),
            pulse: PulseTracker::new(&timings),
            audio: AudioMonitor::new(AudioConfig::default()),
            panel,
            render_config,
            start_time: Instant::now(),
            cursor: PhysicalPosition::new(0.0, 0.0),
            pointer_down: false,
        }
    }
}

impl ApplicationHandler for App {
    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }

    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return; // Already initialized
        }

        let window_attributes = Window::default_attributes()
            .with_title("Dotfield")
            .with_inner_size(winit::dpi::LogicalSize::new(
                self.render_config.window_width,
                self.render_config.window_height,
            ));

        let window = match event_loop.create_window(window_attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                log::error!("failed to create window: {}", e);
                event_loop.exit();
                return;
            }
        };

        // First particle layout is centered on the actual surface
        let size = window.inner_size();
        let center = Vec2::new(size.width as f32 / 2.0, size.height as f32 / 2.0);
        let layout = sphere_layout(
            self.panel.particles.count,
            self.panel.particles.sphere_size,
            center,
        );

        let render_system =
            match pollster::block_on(RenderSystem::new(Arc::clone(&window), &layout)) {
                Ok(render_system) => render_system,
                Err(e) => {
                    log::error!("failed to initialize rendering: {}", e);
                    event_loop.exit();
                    return;
                }
            };

        if self.panel.audio_enabled {
            self.start_audio();
        }

        println!("\nDotfield is running!");
        println!("Space play/pause, Tab pattern, 1-4 select, M colors, V view, A audio");
        println!("Arrows adjust density/count and speed, brackets adjust size, ESC quits\n");

        self.window = Some(window);
        self.render_system = Some(render_system);
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        state: ElementState::Pressed,
                        physical_key: PhysicalKey::Code(code),
                        repeat: false,
                        ..
                    },
                ..
            } => self.handle_key(code, event_loop),
            WindowEvent::Resized(size) => {
                if let Some(render_system) = self.render_system.as_mut() {
                    render_system.resize(size.width, size.height);
                }
                // Recenter the sphere on the new viewport
                self.relayout_particles();
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.cursor = position;
                if self.pointer_down && self.panel.mode == ViewMode::Pattern {
                    let now = self.driver.time_s();
                    let position = self.pattern_touch_position();
                    self.ripple.press(position, now);
                }
            }
            WindowEvent::MouseInput {
                state,
                button: MouseButton::Left,
                ..
            } => match state {
                ElementState::Pressed => {
                    self.pointer_down = true;
                    self.pointer_began();
                }
                ElementState::Released => {
                    self.pointer_down = false;
                    self.pointer_ended();
                }
            },
            WindowEvent::Touch(Touch {
                phase, location, ..
            }) => {
                self.cursor = location;
                match phase {
                    TouchPhase::Started => self.pointer_began(),
                    TouchPhase::Moved => {
                        if self.panel.mode == ViewMode::Pattern {
                            let now = self.driver.time_s();
                            let position = self.pattern_touch_position();
                            self.ripple.press(position, now);
                        }
                    }
                    TouchPhase::Ended | TouchPhase::Cancelled => self.pointer_ended(),
                }
            }
            WindowEvent::RedrawRequested => {
                self.render_frame(event_loop);
            }
            _ => {}
        }
    }
}

impl App {
    /// Window size in pixels, falling back to the configured size
    fn surface_size(&self) -> (f32, f32) {
        match &self.render_system {
            Some(render_system) => {
                let (w, h) = render_system.size();
                (w as f32, h as f32)
            }
            None => (
                self.render_config.window_width as f32,
                self.render_config.window_height as f32,
            ),
        }
    }

    /// Cursor in the pattern shader's normalized coords (origin bottom-left)
    fn pattern_touch_position(&self) -> Vec2 {
        let (width, height) = self.surface_size();
        Vec2::new(
            (self.cursor.x as f32 / width).clamp(0.0, 1.0),
            (1.0 - self.cursor.y as f32 / height).clamp(0.0, 1.0),
        )
    }

    /// Cursor in the particle kernel's normalized coords (origin top-left)
    fn particle_touch_position(&self) -> Vec2 {
        let (width, height) = self.surface_size();
        Vec2::new(
            (self.cursor.x as f32 / width).clamp(0.0, 1.0),
            (self.cursor.y as f32 / height).clamp(0.0, 1.0),
        )
    }

    fn pointer_began(&mut self) {
        let now = self.driver.time_s();
        match self.panel.mode {
            ViewMode::Pattern => {
                let position = self.pattern_touch_position();
                self.ripple.press(position, now);
            }
            ViewMode::Particles => {
                let position = self.particle_touch_position();
                self.pulse.trigger(position, now);
            }
        }
    }

    fn pointer_ended(&mut self) {
        if self.panel.mode == ViewMode::Pattern {
            self.ripple.release(self.driver.time_s());
        }
    }

    fn start_audio(&mut self) {
        if let Err(e) = self.audio.start() {
            log::warn!("audio reactivity unavailable: {}", e);
        }
        self.panel.audio_enabled = self.audio.is_active();
    }

    fn handle_key(&mut self, code: KeyCode, event_loop: &ActiveEventLoop) {
        let panel = &mut self.panel;
        match code {
            KeyCode::Escape => event_loop.exit(),
            KeyCode::Space => panel.playing = !panel.playing,
            KeyCode::KeyV => {
                panel.mode = match panel.mode {
                    ViewMode::Pattern => ViewMode::Particles,
                    ViewMode::Particles => ViewMode::Pattern,
                };
            }
            KeyCode::KeyA => {
                if self.audio.is_active() {
                    self.audio.stop();
                    panel.audio_enabled = false;
                } else if let Err(e) = self.audio.start() {
                    log::warn!("audio reactivity unavailable: {}", e);
                    panel.audio_enabled = false;
                } else {
                    panel.audio_enabled = true;
                }
            }
            KeyCode::Tab => panel.pattern.kind = panel.pattern.kind.next(),
            KeyCode::Digit1 => panel.pattern.kind = PatternKind::Wave,
            KeyCode::Digit2 => panel.pattern.kind = PatternKind::Pulse,
            KeyCode::Digit3 => panel.pattern.kind = PatternKind::Ripple,
            KeyCode::Digit4 => panel.pattern.kind = PatternKind::Noise,
            KeyCode::KeyM => panel.pattern.multi_color = !panel.pattern.multi_color,
            KeyCode::KeyG => {
                panel.pattern.gradient_speed = if panel.pattern.gradient_speed >= 2.0 {
                    0.5
                } else {
                    panel.pattern.gradient_speed + 0.5
                };
            }
            KeyCode::ArrowUp => match panel.mode {
                ViewMode::Pattern => ControlPanel::nudge(
                    &mut panel.pattern.density,
                    2.0,
                    PatternParams::DENSITY_RANGE,
                ),
                ViewMode::Particles => panel.step_count(100),
            },
            KeyCode::ArrowDown => match panel.mode {
                ViewMode::Pattern => ControlPanel::nudge(
                    &mut panel.pattern.density,
                    -2.0,
                    PatternParams::DENSITY_RANGE,
                ),
                ViewMode::Particles => panel.step_count(-100),
            },
            KeyCode::ArrowRight => match panel.mode {
                ViewMode::Pattern => {
                    ControlPanel::nudge(&mut panel.pattern.speed, 0.1, PatternParams::SPEED_RANGE)
                }
                ViewMode::Particles => ControlPanel::nudge(
                    &mut panel.particles.speed,
                    0.1,
                    ParticleParams::SPEED_RANGE,
                ),
            },
            KeyCode::ArrowLeft => match panel.mode {
                ViewMode::Pattern => {
                    ControlPanel::nudge(&mut panel.pattern.speed, -0.1, PatternParams::SPEED_RANGE)
                }
                ViewMode::Particles => ControlPanel::nudge(
                    &mut panel.particles.speed,
                    -0.1,
                    ParticleParams::SPEED_RANGE,
                ),
            },
            KeyCode::BracketRight => match panel.mode {
                ViewMode::Pattern => ControlPanel::nudge(
                    &mut panel.pattern.dot_size,
                    0.01,
                    PatternParams::DOT_SIZE_RANGE,
                ),
                ViewMode::Particles => ControlPanel::nudge(
                    &mut panel.particles.size,
                    0.001,
                    ParticleParams::SIZE_RANGE,
                ),
            },
            KeyCode::BracketLeft => match panel.mode {
                ViewMode::Pattern => ControlPanel::nudge(
                    &mut panel.pattern.dot_size,
                    -0.01,
                    PatternParams::DOT_SIZE_RANGE,
                ),
                ViewMode::Particles => ControlPanel::nudge(
                    &mut panel.particles.size,
                    -0.001,
                    ParticleParams::SIZE_RANGE,
                ),
            },
            KeyCode::Equal => ControlPanel::nudge(
                &mut panel.particles.sphere_size,
                20.0,
                ParticleParams::SPHERE_SIZE_RANGE,
            ),
            KeyCode::Minus => ControlPanel::nudge(
                &mut panel.particles.sphere_size,
                -20.0,
                ParticleParams::SPHERE_SIZE_RANGE,
            ),
            _ => {}
        }
    }

    /// Rebuild the particle set around the current viewport center
    fn relayout_particles(&mut self) {
        let Some(render_system) = self.render_system.as_mut() else {
            return;
        };
        let (width, height) = render_system.size();
        let center = Vec2::new(width as f32 / 2.0, height as f32 / 2.0);
        let layout = sphere_layout(
            self.panel.particles.count,
            self.panel.particles.sphere_size,
            center,
        );
        render_system.set_particles(&layout);
    }

    /// Run one frame: pace, expire touch effects, sample the panel into
    /// uniforms, dispatch compute/draw for the active view
    fn render_frame(&mut self, event_loop: &ActiveEventLoop) {
        if self.render_system.is_none() {
            return;
        }

        let now_s = self.start_time.elapsed().as_secs_f64();
        let Some(tick) = self.driver.tick(now_s, self.panel.playing) else {
            return; // Ahead of the target cadence: no mutation, no draw
        };

        self.ripple.update(tick.time_s);
        self.pulse.update(tick.time_s);

        // A count change from the panel rebuilds the buffer between frames
        if self.panel.mode == ViewMode::Particles {
            let applied = self
                .render_system
                .as_ref()
                .map(|rs| rs.particle_count() as usize);
            if applied != Some(self.panel.particles.count) {
                self.relayout_particles();
            }
        }

        let Some(render_system) = self.render_system.as_mut() else {
            return;
        };
        let (width, height) = render_system.size();
        let resolution = [width as f32, height as f32];

        let result = match self.panel.mode {
            ViewMode::Pattern => {
                let uniforms = PatternUniforms::compose(
                    &self.panel.pattern,
                    resolution,
                    tick.time_s,
                    &self.ripple.state(tick.time_s),
                );
                render_system.update_pattern_uniforms(&uniforms);
                render_system.render_pattern()
            }
            ViewMode::Particles => {
                let uniforms = ParticleUniforms::compose(
                    &self.panel.particles,
                    resolution,
                    tick.time_s,
                    tick.dt_s,
                    &self.pulse,
                    self.audio.level(),
                );
                render_system.update_particle_uniforms(&uniforms);
                render_system.render_particles()
            }
        };

        match result {
            Ok(()) => {}
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                render_system.resize(width, height);
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                log::error!("out of GPU memory");
                event_loop.exit();
            }
            Err(e) => log::warn!("skipping frame: {:?}", e),
        }
    }
}

fn main() {
    env_logger::init();
    let args = cli::Args::parse();

    println!("Dotfield - audio-reactive dot grid and particle sphere");

    let panel = args.control_panel().unwrap_or_else(|e| {
        eprintln!("Invalid configuration: {}", e);
        std::process::exit(1);
    });
    let frame_config = args.frame_config().unwrap_or_else(|e| {
        eprintln!("Invalid configuration: {}", e);
        std::process::exit(1);
    });

    let mut app = App::new(panel, frame_config, args.render_config());
    let event_loop = EventLoop::new().unwrap();
    let _ = event_loop.run_app(&mut app);
}
