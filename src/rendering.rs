//! Rendering system with wgpu pipelines for both view modes.
//!
//! Pattern mode draws one full-screen triangle shaded by the dot-grid
//! fragment stage; particle mode runs the compute kernel over the particle
//! storage buffer and then draws instanced quads from it. All per-frame
//! parameters travel through the two uniform blocks below, which mirror
//! the WGSL structs byte for byte.

use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

use crate::params::{ParticleParams, PatternParams};
use crate::particles::Particle;
use crate::touch::{PulseTracker, RippleState};

/// Compute kernel workgroup width; dispatch rounds particle count up to this
const WORKGROUP_SIZE: u32 = 128;

/// Uniform block for the dot-grid pattern shader
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct PatternUniforms {
    pub resolution: [f32; 2],
    pub pattern_scale: [f32; 2],
    pub color_a: [f32; 4],
    pub color_b: [f32; 4],
    pub touch_position: [f32; 2],
    pub time: f32,
    pub pattern_speed: f32,
    pub dot_size: f32,
    pub pattern_type: u32,
    pub touch_time: f32,
    pub touch_end_time: f32,
    pub multi_color: u32,
    pub gradient_speed: f32,
    pub _pad: [f32; 2],
}

impl PatternUniforms {
    /// Assemble this frame's block from the sampled control panel state
    pub fn compose(
        params: &PatternParams,
        resolution: [f32; 2],
        time_s: f32,
        ripple: &RippleState,
    ) -> Self {
        // Scale the grid horizontally so cells stay square
        let aspect = if resolution[1] > 0.0 {
            resolution[0] / resolution[1]
        } else {
            1.0
        };

        Self {
            resolution,
            pattern_scale: [params.density * aspect, params.density],
            color_a: params.color_a,
            color_b: params.color_b,
            touch_position: ripple.position,
            time: time_s,
            pattern_speed: params.speed,
            dot_size: params.dot_size,
            pattern_type: params.kind as u32,
            touch_time: ripple.elapsed_s,
            touch_end_time: ripple.end_time,
            multi_color: params.multi_color as u32,
            gradient_speed: params.gradient_speed,
            _pad: [0.0; 2],
        }
    }
}

/// Uniform block for the particle compute kernel and particle draw
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct ParticleUniforms {
    pub resolution: [f32; 2],
    pub touch_position: [f32; 2],
    pub time: f32,
    pub dt: f32,
    pub particle_speed: f32,
    pub particle_size: f32,
    pub sphere_size: f32,
    pub pulse_time: f32,
    pub pulsing: u32,
    pub audio_level: f32,
    pub particle_count: u32,
    pub _pad: [u32; 3],
}

impl ParticleUniforms {
    /// Assemble this frame's block from the sampled control panel state
    pub fn compose(
        params: &ParticleParams,
        resolution: [f32; 2],
        time_s: f32,
        dt_s: f32,
        pulse: &PulseTracker,
        audio_level: f32,
    ) -> Self {
        Self {
            resolution,
            touch_position: pulse.position().to_array(),
            time: time_s,
            dt: dt_s,
            particle_speed: params.speed,
            particle_size: params.size,
            sphere_size: params.sphere_size,
            pulse_time: pulse.start_time(),
            pulsing: pulse.is_active() as u32,
            audio_level: audio_level.clamp(0.0, 1.0),
            particle_count: params.count as u32,
            _pad: [0; 3],
        }
    }
}

/// Rendering system managing wgpu device, pipelines, and buffers
pub struct RenderSystem {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,

    pattern_pipeline: wgpu::RenderPipeline,
    pattern_uniform_buffer: wgpu::Buffer,
    pattern_bind_group: wgpu::BindGroup,

    compute_pipeline: wgpu::ComputePipeline,
    particle_pipeline: wgpu::RenderPipeline,
    particle_uniform_buffer: wgpu::Buffer,
    particle_buffer: wgpu::Buffer,
    particle_count: u32,
    compute_bind_group_layout: wgpu::BindGroupLayout,
    particle_bind_group_layout: wgpu::BindGroupLayout,
    compute_bind_group: wgpu::BindGroup,
    particle_bind_group: wgpu::BindGroup,
}

impl RenderSystem {
    /// Create the full GPU stack. Failure here is unrecoverable for the app.
    pub async fn new(
        window: std::sync::Arc<winit::window::Window>,
        initial_particles: &[Particle],
    ) -> Result<Self, String> {
        let size = window.inner_size();

        // Create wgpu instance
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        // Create surface (window must have 'static lifetime via Arc)
        let surface = instance
            .create_surface(window)
            .map_err(|e| format!("Failed to create surface: {}", e))?;

        // Request adapter
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or("Failed to find suitable GPU adapter")?;

        // Request device
        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Main Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    memory_hints: Default::default(),
                },
                None,
            )
            .await
            .map_err(|e| format!("Failed to request device: {}", e))?;

        // Configure surface
        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .copied()
            .unwrap_or(surface_caps.formats[0]);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        // Load shaders
        let pattern_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Pattern Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("pattern.wgsl").into()),
        });

        let particle_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Particle Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("particles.wgsl").into()),
        });

        // Pattern uniforms + bind group
        let pattern_uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Pattern Uniform Buffer"),
            contents: bytemuck::cast_slice(&[PatternUniforms::zeroed()]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let pattern_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Pattern Bind Group Layout"),
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                }],
            });

        let pattern_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Pattern Bind Group"),
            layout: &pattern_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: pattern_uniform_buffer.as_entire_binding(),
            }],
        });

        // Pattern render pipeline
        let pattern_pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Pattern Pipeline Layout"),
                bind_group_layouts: &[&pattern_bind_group_layout],
                push_constant_ranges: &[],
            });

        let pattern_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Pattern Pipeline"),
            layout: Some(&pattern_pipeline_layout),
            vertex: wgpu::VertexState {
                module: &pattern_shader,
                entry_point: Some("vs_main"),
                buffers: &[],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &pattern_shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: config.format,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        // Particle uniforms + storage buffer
        let particle_uniform_buffer =
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Particle Uniform Buffer"),
                contents: bytemuck::cast_slice(&[ParticleUniforms::zeroed()]),
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            });

        let particle_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Particle Buffer"),
            contents: bytemuck::cast_slice(initial_particles),
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
        });

        // Compute: particles read-write at 0, uniforms at 1
        let compute_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Particle Compute Bind Group Layout"),
                entries: &[
                    wgpu::BindGroupLayoutEntry {
                        binding: 0,
                        visibility: wgpu::ShaderStages::COMPUTE,
                        ty: wgpu::BindingType::Buffer {
                            ty: wgpu::BufferBindingType::Storage { read_only: false },
                            has_dynamic_offset: false,
                            min_binding_size: None,
                        },
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: 1,
                        visibility: wgpu::ShaderStages::COMPUTE,
                        ty: wgpu::BindingType::Buffer {
                            ty: wgpu::BufferBindingType::Uniform,
                            has_dynamic_offset: false,
                            min_binding_size: None,
                        },
                        count: None,
                    },
                ],
            });

        // Draw: uniforms at 1, particles read-only at 2
        let particle_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Particle Draw Bind Group Layout"),
                entries: &[
                    wgpu::BindGroupLayoutEntry {
                        binding: 1,
                        visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Buffer {
                            ty: wgpu::BufferBindingType::Uniform,
                            has_dynamic_offset: false,
                            min_binding_size: None,
                        },
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: 2,
                        visibility: wgpu::ShaderStages::VERTEX,
                        ty: wgpu::BindingType::Buffer {
                            ty: wgpu::BufferBindingType::Storage { read_only: true },
                            has_dynamic_offset: false,
                            min_binding_size: None,
                        },
                        count: None,
                    },
                ],
            });

        let (compute_bind_group, particle_bind_group) = Self::create_particle_bind_groups(
            &device,
            &compute_bind_group_layout,
            &particle_bind_group_layout,
            &particle_buffer,
            &particle_uniform_buffer,
        );

        // Particle compute pipeline
        let compute_pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Particle Compute Pipeline Layout"),
                bind_group_layouts: &[&compute_bind_group_layout],
                push_constant_ranges: &[],
            });

        let compute_pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("Particle Compute Pipeline"),
            layout: Some(&compute_pipeline_layout),
            module: &particle_shader,
            entry_point: Some("particle_compute"),
            compilation_options: Default::default(),
            cache: None,
        });

        // Particle render pipeline (instanced quads, alpha blended)
        let particle_pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Particle Pipeline Layout"),
                bind_group_layouts: &[&particle_bind_group_layout],
                push_constant_ranges: &[],
            });

        let particle_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Particle Pipeline"),
            layout: Some(&particle_pipeline_layout),
            vertex: wgpu::VertexState {
                module: &particle_shader,
                entry_point: Some("particle_vertex"),
                buffers: &[],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &particle_shader,
                entry_point: Some("particle_fragment"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: config.format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        Ok(Self {
            surface,
            device,
            queue,
            config,
            pattern_pipeline,
            pattern_uniform_buffer,
            pattern_bind_group,
            compute_pipeline,
            particle_pipeline,
            particle_uniform_buffer,
            particle_buffer,
            particle_count: initial_particles.len() as u32,
            compute_bind_group_layout,
            particle_bind_group_layout,
            compute_bind_group,
            particle_bind_group,
        })
    }

    fn create_particle_bind_groups(
        device: &wgpu::Device,
        compute_layout: &wgpu::BindGroupLayout,
        particle_layout: &wgpu::BindGroupLayout,
        particle_buffer: &wgpu::Buffer,
        uniform_buffer: &wgpu::Buffer,
    ) -> (wgpu::BindGroup, wgpu::BindGroup) {
        let compute_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Particle Compute Bind Group"),
            layout: compute_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: particle_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: uniform_buffer.as_entire_binding(),
                },
            ],
        });

        let particle_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Particle Draw Bind Group"),
            layout: particle_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: uniform_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: particle_buffer.as_entire_binding(),
                },
            ],
        });

        (compute_bind_group, particle_bind_group)
    }

    /// Current drawable size in pixels
    pub fn size(&self) -> (u32, u32) {
        (self.config.width, self.config.height)
    }

    /// Reconfigure the surface after a resize (or a Lost/Outdated error)
    pub fn resize(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.config.width = width;
            self.config.height = height;
        }
        self.surface.configure(&self.device, &self.config);
    }

    /// Replace the particle buffer contents.
    ///
    /// A count change swaps in a freshly created buffer and rebuilds both
    /// bind groups, so the next dispatch only ever sees the new set; a
    /// same-count relayout just rewrites in place.
    pub fn set_particles(&mut self, particles: &[Particle]) {
        if particles.len() as u32 != self.particle_count {
            self.particle_buffer =
                self.device
                    .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                        label: Some("Particle Buffer"),
                        contents: bytemuck::cast_slice(particles),
                        usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
                    });
            self.particle_count = particles.len() as u32;

            let (compute_bind_group, particle_bind_group) = Self::create_particle_bind_groups(
                &self.device,
                &self.compute_bind_group_layout,
                &self.particle_bind_group_layout,
                &self.particle_buffer,
                &self.particle_uniform_buffer,
            );
            self.compute_bind_group = compute_bind_group;
            self.particle_bind_group = particle_bind_group;
        } else {
            self.queue
                .write_buffer(&self.particle_buffer, 0, bytemuck::cast_slice(particles));
        }
    }

    pub fn particle_count(&self) -> u32 {
        self.particle_count
    }

    /// Update pattern uniforms
    pub fn update_pattern_uniforms(&self, uniforms: &PatternUniforms) {
        self.queue.write_buffer(
            &self.pattern_uniform_buffer,
            0,
            bytemuck::cast_slice(&[*uniforms]),
        );
    }

    /// Update particle uniforms
    pub fn update_particle_uniforms(&self, uniforms: &ParticleUniforms) {
        self.queue.write_buffer(
            &self.particle_uniform_buffer,
            0,
            bytemuck::cast_slice(&[*uniforms]),
        );
    }

    /// Draw the full-screen pattern
    pub fn render_pattern(&self) -> Result<(), wgpu::SurfaceError> {
        let output = self.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Pattern Encoder"),
            });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Pattern Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            render_pass.set_pipeline(&self.pattern_pipeline);
            render_pass.set_bind_group(0, &self.pattern_bind_group, &[]);
            render_pass.draw(0..3, 0..1); // Fullscreen triangle
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        Ok(())
    }

    /// Advance the particle simulation one step and draw it
    pub fn render_particles(&self) -> Result<(), wgpu::SurfaceError> {
        let output = self.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Particle Encoder"),
            });

        {
            let mut compute_pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("Particle Compute Pass"),
                timestamp_writes: None,
            });
            compute_pass.set_pipeline(&self.compute_pipeline);
            compute_pass.set_bind_group(0, &self.compute_bind_group, &[]);
            let workgroups = self.particle_count.div_ceil(WORKGROUP_SIZE);
            compute_pass.dispatch_workgroups(workgroups, 1, 1);
        }

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Particle Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            render_pass.set_pipeline(&self.particle_pipeline);
            render_pass.set_bind_group(0, &self.particle_bind_group, &[]);
            render_pass.draw(0..6, 0..self.particle_count);
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::{EffectTimings, PatternKind};
    use crate::touch::{RippleTracker, NOT_RELEASED, NO_TOUCH};
    use glam::Vec2;

    #[test]
    fn test_uniform_layouts_match_wgsl() {
        // Struct sizes pinned to the WGSL declarations
        assert_eq!(std::mem::size_of::<PatternUniforms>(), 96);
        assert_eq!(std::mem::size_of::<ParticleUniforms>(), 64);
        assert_eq!(std::mem::size_of::<Particle>(), 24);
    }

    #[test]
    fn test_pattern_compose_aspect_scaling() {
        let params = PatternParams::default();
        let ripple = RippleTracker::new(&EffectTimings::default()).state(0.0);
        let uniforms = PatternUniforms::compose(&params, [1280.0, 720.0], 2.5, &ripple);

        assert_eq!(uniforms.pattern_scale[1], params.density);
        let aspect = 1280.0 / 720.0;
        assert!((uniforms.pattern_scale[0] - params.density * aspect).abs() < 1e-3);
        assert_eq!(uniforms.time, 2.5);
        assert_eq!(uniforms.pattern_type, PatternKind::Wave as u32);
    }

    #[test]
    fn test_pattern_compose_idle_touch_sentinels() {
        let params = PatternParams::default();
        let ripple = RippleTracker::new(&EffectTimings::default()).state(1.0);
        let uniforms = PatternUniforms::compose(&params, [800.0, 600.0], 1.0, &ripple);

        assert_eq!(uniforms.touch_position, NO_TOUCH);
        assert_eq!(uniforms.touch_end_time, NOT_RELEASED);
        assert_eq!(uniforms.touch_time, 0.0);
    }

    #[test]
    fn test_particle_compose_clamps_audio() {
        let params = ParticleParams::default();
        let mut pulse = PulseTracker::new(&EffectTimings::default());
        pulse.trigger(Vec2::new(0.25, 0.75), 3.0);

        let uniforms =
            ParticleUniforms::compose(&params, [1280.0, 720.0], 3.5, 1.0 / 60.0, &pulse, 7.0);
        assert_eq!(uniforms.audio_level, 1.0);
        assert_eq!(uniforms.pulsing, 1);
        assert_eq!(uniforms.pulse_time, 3.0);
        assert_eq!(uniforms.touch_position, [0.25, 0.75]);
        assert_eq!(uniforms.particle_count, params.count as u32);
    }
}
