use std::sync::Arc;
use winit::window::Window;
use instant::Instant;
use glam::{Mat4, Vec2};
use wgpu::util::DeviceExt;
use bytemuck::Zeroable;

use crate::camera::{Camera, SceneUniform};
use crate::config::{check_particle_count, SceneConfig};
use crate::driver::{PointerSample, PulseDriver, RotationDriver};
use crate::models::{LineInstance, SphereInstance, Vertex2D};
use crate::scene::{GridScene, NetworkScene, ParticleField};
use crate::sections::{Backdrop, Section};

const COMMON_WGSL: &str = include_str!("./shaders/common.wgsl");
const LINES_WGSL: &str = include_str!("./shaders/lines.wgsl");
const SPHERES_WGSL: &str = include_str!("./shaders/spheres.wgsl");

const ADDITIVE_BLENDING: wgpu::BlendState = wgpu::BlendState {
    color: wgpu::BlendComponent {
        src_factor: wgpu::BlendFactor::SrcAlpha,
        dst_factor: wgpu::BlendFactor::One,
        operation: wgpu::BlendOperation::Add,
    },
    alpha: wgpu::BlendComponent::OVER,
};

/// Instance buffer that grows when more data arrives than it can hold.
pub struct GpuInstances<T> {
    pub buffer: wgpu::Buffer,
    pub len: u32,
    label: &'static str,
    _marker: std::marker::PhantomData<T>,
}

impl<T: bytemuck::Pod> GpuInstances<T> {
    pub fn new(device: &wgpu::Device, label: &'static str, data: &[T]) -> Self {
        Self {
            buffer: Self::create(device, label, data),
            len: data.len() as u32,
            label,
            _marker: std::marker::PhantomData,
        }
    }

    fn create(device: &wgpu::Device, label: &'static str, data: &[T]) -> wgpu::Buffer {
        // never allocate an empty buffer, slicing it would panic
        let placeholder = [T::zeroed()];
        let contents = if data.is_empty() { &placeholder[..] } else { data };
        device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: bytemuck::cast_slice(contents),
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        })
    }

    pub fn upload(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, data: &[T]) {
        self.len = data.len() as u32;
        if data.is_empty() {
            return;
        }
        let bytes: &[u8] = bytemuck::cast_slice(data);
        if self.buffer.size() < bytes.len() as u64 {
            log::debug!("Growing {} to {} bytes", self.label, bytes.len());
            self.buffer = Self::create(device, self.label, data);
        } else {
            queue.write_buffer(&self.buffer, 0, bytes);
        }
    }
}

/// GPU resources of one scene: its camera uniform and instance buffers.
pub struct ScenePass {
    pub camera: Camera,
    pub uniform_buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
    pub spheres: GpuInstances<SphereInstance>,
    pub lines: GpuInstances<LineInstance>,
}

impl ScenePass {
    fn new(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        camera: Camera,
        label: &'static str,
    ) -> Self {
        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: bytemuck::cast_slice(&[SceneUniform::zeroed()]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
            label: Some(label),
        });
        Self {
            camera,
            uniform_buffer,
            bind_group,
            spheres: GpuInstances::new(device, "Sphere Instance Buffer", &[]),
            lines: GpuInstances::new(device, "Line Instance Buffer", &[]),
        }
    }

    fn write_uniform(&self, queue: &wgpu::Queue, model: Mat4, needs_srgb_output_conversion: bool) {
        let uniform = self.camera.uniform(model, needs_srgb_output_conversion);
        queue.write_buffer(&self.uniform_buffer, 0, bytemuck::cast_slice(&[uniform]));
    }
}

pub struct State {
    pub surface: wgpu::Surface<'static>,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
    pub is_surface_configured: bool,
    pub needs_srgb_output_conversion: bool,

    pub line_render_pipeline: wgpu::RenderPipeline,
    pub sphere_render_pipeline: wgpu::RenderPipeline,
    pub point_render_pipeline: wgpu::RenderPipeline,
    pub quad_vertex_buffer: wgpu::Buffer,
    pub quad_index_buffer: wgpu::Buffer,

    pub network_pass: ScenePass,
    pub particle_pass: ScenePass,
    pub grid_pass: ScenePass,

    pub scene_config: SceneConfig,
    pub network: NetworkScene,
    pub particles: ParticleField,
    pub grid: GridScene,
    pub rotation_driver: RotationDriver,
    pub pulse_driver: PulseDriver,

    pub section: Section,
    pub backdrop: Backdrop,

    pub mouse_current_pos_screen: Option<Vec2>,
    pub pointer: PointerSample,
    pub hovered_node: Option<usize>,

    pub start_instant: Instant,
    pub last_frame_instant: Instant,
    pub frame_count_in_second: u32,
    pub current_fps: u32,
}

impl State {
    // Takes Arc<Window> for setup, doesn't store it.
    pub async fn new(window_arc: Arc<Window>, scene_config: SceneConfig) -> anyhow::Result<State> {
        let size = window_arc.inner_size();

        let gpu = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            #[cfg(not(target_arch = "wasm32"))]
            backends: wgpu::Backends::PRIMARY,
            #[cfg(target_arch = "wasm32")]
            backends: wgpu::Backends::BROWSER_WEBGPU,
            ..Default::default()
        });

        let surface = gpu.create_surface(window_arc)?;

        let adapter = gpu
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await?;
        let adapter_info = adapter.get_info();

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: None,
                required_features: wgpu::Features::empty(),
                experimental_features: wgpu::ExperimentalFeatures::disabled(),
                required_limits: wgpu::Limits::default(),
                memory_hints: Default::default(),
                trace: wgpu::Trace::Off,
            })
            .await?;

        let surface_caps = surface.get_capabilities(&adapter);
        let texture_format = surface_caps.formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| {
                let fallback = surface_caps.formats.first().copied();
                log::warn!("No sRGB surface format found, falling back to {:?}", fallback);
                fallback
            })
            .ok_or_else(|| anyhow::anyhow!("Surface reports no supported formats"))?;

        let needs_srgb_output_conversion = !texture_format.is_srgb();

        log::info!(
            "Using {} ({:?}, Target Format: {:?}), Needs Shader sRGB Output Conversion: {}",
            adapter_info.name,
            adapter_info.backend,
            texture_format,
            needs_srgb_output_conversion
        );

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: texture_format,
            width: size.width,
            height: size.height,
            present_mode: surface_caps.present_modes[0],
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let scene_bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                }
            ],
            label: Some("Scene Bind Group Layout"),
        });

        let lines_shader_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Lines Shader"),
            source: wgpu::ShaderSource::Wgsl(format!("{COMMON_WGSL}\n{LINES_WGSL}").into()),
        });

        let spheres_shader_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Spheres Shader"),
            source: wgpu::ShaderSource::Wgsl(format!("{COMMON_WGSL}\n{SPHERES_WGSL}").into()),
        });

        let render_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Render Pipeline Layout"),
            bind_group_layouts: &[
                &scene_bind_group_layout,
            ],
            push_constant_ranges: &[],
        });

        let line_render_pipeline = create_quad_pipeline(
            &device,
            &render_pipeline_layout,
            QuadPipeline {
                label: "Line Render Pipeline",
                module: &lines_shader_module,
                fragment_entry: "fs_main",
                instance_layout: LineInstance::layout(),
                format: texture_format,
                blend: wgpu::BlendState::ALPHA_BLENDING,
            },
        );

        let sphere_render_pipeline = create_quad_pipeline(
            &device,
            &render_pipeline_layout,
            QuadPipeline {
                label: "Sphere Render Pipeline",
                module: &spheres_shader_module,
                fragment_entry: "fs_sphere",
                instance_layout: SphereInstance::layout(),
                format: texture_format,
                blend: wgpu::BlendState::ALPHA_BLENDING,
            },
        );

        let point_render_pipeline = create_quad_pipeline(
            &device,
            &render_pipeline_layout,
            QuadPipeline {
                label: "Point Render Pipeline",
                module: &spheres_shader_module,
                fragment_entry: "fs_point",
                instance_layout: SphereInstance::layout(),
                format: texture_format,
                blend: ADDITIVE_BLENDING,
            },
        );

        let quad_vertex_buffer = device.create_buffer_init(
            &wgpu::util::BufferInitDescriptor {
                label: Some("Quad Vertex Buffer"),
                contents: bytemuck::cast_slice(Vertex2D::QUAD_VERTICES.as_slice()),
                usage: wgpu::BufferUsages::VERTEX,
            }
        );

        let quad_index_buffer = device.create_buffer_init(
            &wgpu::util::BufferInitDescriptor {
                label: Some("Quad Index Buffer"),
                contents: bytemuck::cast_slice(Vertex2D::QUAD_INDICES.as_slice()),
                usage: wgpu::BufferUsages::INDEX,
            }
        );

        let network_pass = ScenePass::new(
            &device,
            &scene_bind_group_layout,
            Camera::new(&scene_config.network.camera, size.width, size.height),
            "Network Uniform",
        );
        let particle_pass = ScenePass::new(
            &device,
            &scene_bind_group_layout,
            Camera::new(&scene_config.particles.camera, size.width, size.height),
            "Particle Uniform",
        );
        let grid_pass = ScenePass::new(
            &device,
            &scene_bind_group_layout,
            Camera::new(&scene_config.grid.camera, size.width, size.height),
            "Grid Uniform",
        );

        let network = NetworkScene::new(scene_config.network.clone());
        let particles = ParticleField::new(scene_config.particles.clone());
        let grid = GridScene::new(scene_config.grid.clone());
        let rotation_driver = RotationDriver::new(scene_config.driver.clone());
        let pulse_driver = PulseDriver::new(network.geometry().nodes.len());
        let section = Section::Home;
        let backdrop = section.backdrop(scene_config.default_backdrop);

        let mut state = Self {
            surface, device, queue, config, is_surface_configured: false,
            needs_srgb_output_conversion,
            line_render_pipeline, sphere_render_pipeline, point_render_pipeline,
            quad_vertex_buffer, quad_index_buffer,
            network_pass, particle_pass, grid_pass,
            scene_config, network, particles, grid, rotation_driver, pulse_driver,
            section, backdrop,
            mouse_current_pos_screen: None, pointer: PointerSample::default(), hovered_node: None,
            start_instant: Instant::now(), last_frame_instant: Instant::now(),
            frame_count_in_second: 0, current_fps: 0,
        };
        state.upload_static_instances();
        Ok(state)
    }

    /// Instances that only change with the config: network lines and particles.
    fn upload_static_instances(&mut self) {
        let lines = self.network.line_instances();
        self.network_pass.lines.upload(&self.device, &self.queue, &lines);
        let points = self.particles.sphere_instances();
        self.particle_pass.spheres.upload(&self.device, &self.queue, &points);
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            log::info!("Resize {}, {}", width, height);
            self.config.width = width;
            self.config.height = height;
            self.surface.configure(&self.device, &self.config);

            for pass in [&mut self.network_pass, &mut self.particle_pass, &mut self.grid_pass] {
                pass.camera.update_aspect_ratio(width, height);
            }
            self.refresh_pointer();
            self.is_surface_configured = true;
        }
    }

    pub fn apply_scene_config(&mut self, scene_config: SceneConfig) {
        let size = (self.config.width, self.config.height);
        let network_rebuilt = self.network.set_config(scene_config.network.clone());
        let particles_rebuilt = self.particles.set_config(scene_config.particles.clone());
        self.grid.set_config(scene_config.grid.clone());
        self.rotation_driver.set_config(scene_config.driver.clone());

        if network_rebuilt {
            self.pulse_driver = PulseDriver::new(self.network.geometry().nodes.len());
            self.hovered_node = None;
        }
        if network_rebuilt || particles_rebuilt {
            self.upload_static_instances();
        }

        self.network_pass.camera = Camera::new(&scene_config.network.camera, size.0, size.1);
        self.particle_pass.camera = Camera::new(&scene_config.particles.camera, size.0, size.1);
        self.grid_pass.camera = Camera::new(&scene_config.grid.camera, size.0, size.1);

        self.backdrop = self.section.backdrop(scene_config.default_backdrop);
        self.scene_config = scene_config;
        log::info!(
            "Applied scene config: {} nodes, {} edges, {} particles",
            self.network.geometry().nodes.len(),
            self.network.geometry().edges.len(),
            self.particles.positions().len()
        );
    }

    pub fn show_section(&mut self, section: Section) {
        self.section = section;
        self.backdrop = section.backdrop(self.scene_config.default_backdrop);
        log::info!("Showing #{} with {:?} backdrop", section.id(), self.backdrop);
    }

    pub fn set_particle_count(&mut self, count: u32) {
        if let Err(e) = check_particle_count(count) {
            log::warn!("Ignoring particle count: {e}");
            return;
        }
        if self.particles.set_count(count) {
            self.scene_config.particles.count = count;
            self.upload_static_instances();
        }
    }

    pub fn pointer_moved(&mut self, screen_pos: Vec2) {
        self.mouse_current_pos_screen = Some(screen_pos);
        self.refresh_pointer();
    }

    pub fn pointer_left(&mut self) {
        // the last sample keeps steering the tilt, only hover ends
        self.mouse_current_pos_screen = None;
    }

    fn refresh_pointer(&mut self) {
        let viewport = Vec2::new(self.config.width as f32, self.config.height as f32);
        let sample = self.mouse_current_pos_screen.and_then(|pos| PointerSample::from_screen(pos, viewport));
        if let Some(sample) = sample {
            self.pointer = sample;
        }
    }

    fn grid_visible(&self) -> bool {
        self.backdrop == Backdrop::Grid || self.scene_config.grid.enabled
    }

    pub fn update(&mut self) -> bool {
        let elapsed = self.start_instant.elapsed().as_secs_f32();
        let srgb = self.needs_srgb_output_conversion;

        match self.backdrop {
            Backdrop::Network => {
                self.rotation_driver.tick(elapsed, self.pointer);
                let model = self.rotation_driver.model_matrix();

                self.hovered_node = self.mouse_current_pos_screen.and_then(|pos| {
                    self.network.pick(&self.network_pass.camera, model, self.pulse_driver.scales(), pos)
                });
                self.pulse_driver.tick(&self.scene_config.driver, self.network.pulse_flags(), self.hovered_node);

                let spheres = self.network.sorted_sphere_instances(
                    &self.network_pass.camera,
                    model,
                    self.pulse_driver.scales(),
                    self.hovered_node,
                );
                self.network_pass.spheres.upload(&self.device, &self.queue, &spheres);
                self.network_pass.write_uniform(&self.queue, model, srgb);
            }
            Backdrop::Particles => {
                self.particles.tick(elapsed);
                self.particle_pass.write_uniform(&self.queue, self.particles.model_matrix(), srgb);
            }
            Backdrop::Grid => {}
        }

        if self.grid_visible() {
            self.grid.tick(elapsed);
            let lines = self.grid.line_instances(self.grid_pass.camera.eye);
            self.grid_pass.lines.upload(&self.device, &self.queue, &lines);
            self.grid_pass.write_uniform(&self.queue, self.grid.model_matrix(), srgb);
        }

        // every scene animates continuously
        true
    }

    pub fn render(&mut self) -> Result<(), wgpu::SurfaceError> {
        if !self.is_surface_configured {
            return Ok(());
        }

        // --- FPS Calculation ---
        self.frame_count_in_second += 1;
        let now = Instant::now();
        let elapsed = (now - self.last_frame_instant).as_secs_f32();

        if elapsed >= 1.0 {
            self.current_fps = self.frame_count_in_second;
            self.frame_count_in_second = 0;
            self.last_frame_instant = now;
        }

        let output = self.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.scene_config.clear_color.into_linear_wgpu_color()),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            render_pass.set_vertex_buffer(0, self.quad_vertex_buffer.slice(..));
            render_pass.set_index_buffer(self.quad_index_buffer.slice(..), wgpu::IndexFormat::Uint16);

            if self.grid_visible() {
                self.draw_pass(&mut render_pass, &self.grid_pass, &self.sphere_render_pipeline);
            }
            match self.backdrop {
                Backdrop::Network => self.draw_pass(&mut render_pass, &self.network_pass, &self.sphere_render_pipeline),
                Backdrop::Particles => self.draw_pass(&mut render_pass, &self.particle_pass, &self.point_render_pipeline),
                Backdrop::Grid => {}
            }
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        Ok(())
    }

    /// Lines first, then spheres on top.
    fn draw_pass(
        &self,
        render_pass: &mut wgpu::RenderPass<'_>,
        pass: &ScenePass,
        sphere_pipeline: &wgpu::RenderPipeline,
    ) {
        let index_count = Vertex2D::QUAD_INDICES.len() as u32;
        render_pass.set_bind_group(0, &pass.bind_group, &[]);

        if pass.lines.len > 0 {
            render_pass.set_pipeline(&self.line_render_pipeline);
            render_pass.set_vertex_buffer(1, pass.lines.buffer.slice(..));
            render_pass.draw_indexed(0..index_count, 0, 0..pass.lines.len);
        }
        if pass.spheres.len > 0 {
            render_pass.set_pipeline(sphere_pipeline);
            render_pass.set_vertex_buffer(1, pass.spheres.buffer.slice(..));
            render_pass.draw_indexed(0..index_count, 0, 0..pass.spheres.len);
        }
    }
}

struct QuadPipeline<'a> {
    label: &'static str,
    module: &'a wgpu::ShaderModule,
    fragment_entry: &'static str,
    instance_layout: wgpu::VertexBufferLayout<'a>,
    format: wgpu::TextureFormat,
    blend: wgpu::BlendState,
}

/// Instanced pipeline drawing one unit quad per instance.
fn create_quad_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    desc: QuadPipeline<'_>,
) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(desc.label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: desc.module,
            entry_point: Some("vs_main"),
            buffers: &[
                Vertex2D::layout(),
                desc.instance_layout,
            ],
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: desc.module,
            entry_point: Some(desc.fragment_entry),
            targets: &[Some(wgpu::ColorTargetState {
                format: desc.format,
                blend: Some(desc.blend),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            // lines may flip winding when their direction points left
            cull_mode: None,
            unclipped_depth: false,
            polygon_mode: wgpu::PolygonMode::Fill,
            conservative: false,
        },
        depth_stencil: None,
        multisample: wgpu::MultisampleState {
            count: 1,
            mask: !0,
            alpha_to_coverage_enabled: false,
        },
        multiview: None,
        cache: None,
    })
}
