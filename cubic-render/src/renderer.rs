//! Instanced wgpu renderer

use crate::RenderError;
use bytemuck::{Pod, Zeroable};
use cubic::PerspectiveCamera;
use cubic::mesh::{self, CubeInstance, InstanceBuffer, Vertex};
use cubic_protocol::{
    BackgroundData, CameraData, Command, EnvironmentCommand, LightingData, SceneCommand,
};
use std::sync::Arc;
use wgpu::util::DeviceExt;
use winit::window::Window;

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub(crate) struct Uniforms {
    view_proj: [[f32; 4]; 4],
    camera_position: [f32; 4],
    ambient: [f32; 4],
    light_direction: [f32; 4],
    light_color: [f32; 4],
}

impl Uniforms {
    pub(crate) fn new(camera: &CameraData, aspect: f32, lighting: &LightingData) -> Self {
        let camera = PerspectiveCamera::from_camera_data(camera, aspect);

        let scaled = |color: [f32; 3], intensity: f32| {
            [color[0] * intensity, color[1] * intensity, color[2] * intensity, 1.0]
        };
        let ambient = scaled(lighting.ambient.color, lighting.ambient.intensity);
        let (light_direction, light_color) = match &lighting.directional {
            Some(light) => {
                let [x, y, z] = light.direction;
                ([x, y, z, 0.0], scaled(light.color, light.intensity))
            }
            None => ([0.0, -1.0, 0.0, 0.0], [0.0; 4]),
        };

        Self {
            view_proj: camera.view_projection().to_cols_array_2d(),
            camera_position: camera.position.extend(1.0).to_array(),
            ambient,
            light_direction,
            light_color,
        }
    }
}

fn default_camera() -> CameraData {
    CameraData {
        position: [0.0, 0.0, 5.0],
        target: [0.0, 0.0, 0.0],
        up: [0.0, 1.0, 0.0],
        fov_degrees: 75.0,
        near: 0.1,
        far: 1000.0,
    }
}

fn default_lighting() -> LightingData {
    LightingData {
        ambient: cubic_protocol::AmbientLight {
            color: [1.0, 1.0, 1.0],
            intensity: 1.0,
        },
        directional: None,
    }
}

pub struct Renderer {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    cube_pipeline: wgpu::RenderPipeline,
    edge_pipeline: wgpu::RenderPipeline,
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    num_indices: u32,
    edge_vertex_buffer: wgpu::Buffer,
    edge_index_buffer: wgpu::Buffer,
    num_edge_indices: u32,
    instance_buffer: wgpu::Buffer,
    instance_capacity: usize,
    instances: InstanceBuffer,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    depth_texture: wgpu::TextureView,
    background_color: [f32; 4],
    camera: CameraData,
    lighting: LightingData,
}

impl Renderer {
    pub async fn new(window: Arc<Window>) -> Result<Self, RenderError> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let surface = instance.create_surface(window)?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await?;

        log::info!("Adapter acquired: {:?}", adapter.get_info());

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("CuBiC Device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: wgpu::MemoryHints::default(),
                trace: wgpu::Trace::Off,
                experimental_features: Default::default(),
            })
            .await?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .or(surface_caps.formats.first())
            .copied()
            .ok_or(RenderError::NoSurfaceFormat)?;

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode: wgpu::CompositeAlphaMode::Auto,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let depth_texture = create_depth_texture(&device, &config);

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Cube Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shader.wgsl").into()),
        });

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Uniform Buffer"),
            size: std::mem::size_of::<Uniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let uniform_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Uniform Bind Group Layout"),
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

        let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Uniform Bind Group"),
            layout: &uniform_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Render Pipeline Layout"),
            bind_group_layouts: &[&uniform_bind_group_layout],
            push_constant_ranges: &[],
        });

        let cube_vertex_layout = wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3],
        };
        let edge_vertex_layout = wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &wgpu::vertex_attr_array![0 => Float32x3],
        };
        let instance_layout = wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<CubeInstance>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &wgpu::vertex_attr_array![
                2 => Float32x4,
                3 => Float32x4,
                4 => Float32x4,
                5 => Float32x4,
            ],
        };

        let cube_pipeline = create_pipeline(
            &device,
            &pipeline_layout,
            &shader,
            PipelineKind {
                label: "Cube Pipeline",
                vertex_entry: "vs_main",
                fragment_entry: "fs_main",
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: Some(wgpu::Face::Back),
                depth_compare: wgpu::CompareFunction::Less,
            },
            &[cube_vertex_layout, instance_layout.clone()],
            config.format,
        );
        let edge_pipeline = create_pipeline(
            &device,
            &pipeline_layout,
            &shader,
            PipelineKind {
                label: "Edge Pipeline",
                vertex_entry: "vs_edge",
                fragment_entry: "fs_edge",
                topology: wgpu::PrimitiveTopology::LineList,
                cull_mode: None,
                depth_compare: wgpu::CompareFunction::LessEqual,
            },
            &[edge_vertex_layout, instance_layout],
            config.format,
        );

        let vertices = mesh::cube_vertices();
        let indices = mesh::cube_indices();
        let edge_vertices = mesh::edge_vertices();
        let edge_indices = mesh::edge_indices();

        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Vertex Buffer"),
            contents: bytemuck::cast_slice(&vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Index Buffer"),
            contents: bytemuck::cast_slice(&indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        let edge_vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Edge Vertex Buffer"),
            contents: bytemuck::cast_slice(&edge_vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let edge_index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Edge Index Buffer"),
            contents: bytemuck::cast_slice(&edge_indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        let instance_buffer = create_instance_buffer(&device, 1);

        Ok(Self {
            surface,
            device,
            queue,
            config,
            cube_pipeline,
            edge_pipeline,
            vertex_buffer,
            index_buffer,
            num_indices: indices.len() as u32,
            edge_vertex_buffer,
            edge_index_buffer,
            num_edge_indices: edge_indices.len() as u32,
            instance_buffer,
            instance_capacity: 1,
            instances: InstanceBuffer::new(),
            uniform_buffer,
            uniform_bind_group,
            depth_texture,
            background_color: [0.0, 0.0, 0.0, 1.0],
            camera: default_camera(),
            lighting: default_lighting(),
        })
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.config.width = width;
            self.config.height = height;
            self.surface.configure(&self.device, &self.config);
            self.depth_texture = create_depth_texture(&self.device, &self.config);
        }
    }

    /// Execute a scene or environment command. Returns false for commands
    /// that are not for the renderer.
    pub fn apply(&mut self, command: &Command) -> bool {
        match command {
            Command::Scene(SceneCommand::CreateCube(data)) => self.instances.create(data),
            Command::Scene(SceneCommand::SetEmissiveIntensity { cube_id, intensity }) => {
                if !self.instances.set_emissive_intensity(*cube_id, *intensity) {
                    log::warn!("SetEmissiveIntensity for unknown cube {}", cube_id);
                }
            }
            Command::Environment(EnvironmentCommand::SetCamera(camera)) => {
                self.camera = camera.clone();
            }
            Command::Environment(EnvironmentCommand::SetBackground(BackgroundData::Color(
                color,
            ))) => {
                self.background_color = *color;
            }
            Command::Environment(EnvironmentCommand::SetLighting(lighting)) => {
                self.lighting = lighting.clone();
            }
            _ => return false,
        }
        true
    }

    fn upload_instances(&mut self) {
        if !self.instances.take_dirty() {
            return;
        }
        if self.instances.len() > self.instance_capacity {
            self.instance_capacity = self.instances.len().next_power_of_two();
            self.instance_buffer = create_instance_buffer(&self.device, self.instance_capacity);
            log::debug!("Instance buffer grown to {} cubes", self.instance_capacity);
        }
        self.queue
            .write_buffer(&self.instance_buffer, 0, self.instances.as_bytes());
    }

    pub fn render(&mut self) {
        let output = match self.surface.get_current_texture() {
            Ok(t) => t,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                self.surface.configure(&self.device, &self.config);
                return;
            }
            Err(e) => {
                log::error!("Failed to get surface texture: {:?}", e);
                return;
            }
        };

        self.upload_instances();

        let aspect = self.config.width as f32 / self.config.height as f32;
        let uniforms = Uniforms::new(&self.camera, aspect, &self.lighting);
        self.queue
            .write_buffer(&self.uniform_buffer, 0, bytemuck::cast_slice(&[uniforms]));

        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        {
            let [r, g, b, a] = self.background_color;
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: r as f64,
                            g: g as f64,
                            b: b as f64,
                            a: a as f64,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_texture,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            let count = self.instances.len() as u32;
            if count > 0 {
                render_pass.set_bind_group(0, &self.uniform_bind_group, &[]);
                render_pass.set_vertex_buffer(1, self.instance_buffer.slice(..));

                render_pass.set_pipeline(&self.cube_pipeline);
                render_pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
                render_pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint16);
                render_pass.draw_indexed(0..self.num_indices, 0, 0..count);

                render_pass.set_pipeline(&self.edge_pipeline);
                render_pass.set_vertex_buffer(0, self.edge_vertex_buffer.slice(..));
                render_pass
                    .set_index_buffer(self.edge_index_buffer.slice(..), wgpu::IndexFormat::Uint16);
                render_pass.draw_indexed(0..self.num_edge_indices, 0, 0..count);
            }
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();
    }
}

struct PipelineKind {
    label: &'static str,
    vertex_entry: &'static str,
    fragment_entry: &'static str,
    topology: wgpu::PrimitiveTopology,
    cull_mode: Option<wgpu::Face>,
    depth_compare: wgpu::CompareFunction,
}

fn create_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    shader: &wgpu::ShaderModule,
    kind: PipelineKind,
    buffers: &[wgpu::VertexBufferLayout<'_>],
    format: wgpu::TextureFormat,
) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(kind.label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: shader,
            entry_point: Some(kind.vertex_entry),
            buffers,
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: shader,
            entry_point: Some(kind.fragment_entry),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: Some(wgpu::BlendState::REPLACE),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: kind.topology,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: kind.cull_mode,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: Some(wgpu::DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled: true,
            depth_compare: kind.depth_compare,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState {
            count: 1,
            mask: !0,
            alpha_to_coverage_enabled: false,
        },
        multiview: None,
        cache: None,
    })
}

fn create_instance_buffer(device: &wgpu::Device, capacity: usize) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Instance Buffer"),
        size: (capacity * std::mem::size_of::<CubeInstance>()) as u64,
        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

fn create_depth_texture(
    device: &wgpu::Device,
    config: &wgpu::SurfaceConfiguration,
) -> wgpu::TextureView {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Depth Texture"),
        size: wgpu::Extent3d {
            width: config.width,
            height: config.height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    texture.create_view(&wgpu::TextureViewDescriptor::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cubic::{Config, SceneBuilder};
    use glam::{Mat4, Vec4};

    #[test]
    fn test_uniform_layout() {
        // mat4 + four vec4
        assert_eq!(std::mem::size_of::<Uniforms>(), 64 + 4 * 16);
    }

    #[test]
    fn test_uniforms_match_core_camera() {
        let scene = SceneBuilder::new(&Config::default()).aspect(1.5).build();
        let data = scene.camera.to_camera_data();
        let lighting = LightingData {
            ambient: scene.lights.ambient.clone(),
            directional: Some(scene.lights.directional.clone()),
        };
        let uniforms = Uniforms::new(&data, 1.5, &lighting);

        let expected = scene.camera.view_projection();
        let actual = Mat4::from_cols_array_2d(&uniforms.view_proj);
        assert!(actual.abs_diff_eq(expected, 1e-5));

        // Grid center lands in the middle of the screen
        let clip = actual * Vec4::new(0.0, 0.0, 0.0, 1.0);
        assert!((clip.x / clip.w).abs() < 1e-5);
        assert!((clip.y / clip.w).abs() < 1e-5);

        assert_eq!(uniforms.ambient, [0.3, 0.3, 0.3, 1.0]);
        assert_eq!(uniforms.light_color, [0.8, 0.8, 0.8, 1.0]);
    }

    #[test]
    fn test_no_directional_light() {
        let uniforms = Uniforms::new(&default_camera(), 1.0, &default_lighting());
        assert_eq!(uniforms.light_color, [0.0; 4]);
        assert_eq!(uniforms.ambient, [1.0, 1.0, 1.0, 1.0]);
    }
}
