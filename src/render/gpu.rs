//! Offscreen wgpu context: multisampled colour and depth targets resolved into
//! a front/back pair of readable textures.

use std::borrow::Cow;
use std::path::Path;
use std::sync::mpsc;

use glam::Vec3;
use image::RgbaImage;
use log::{debug, error, info, trace};
use wgpu::util::DeviceExt;

use super::mesh::Mesh;
use super::shading::{ShaderSources, Uniforms, UNIFORM_SIZE};
use super::texture::Texture;
use super::{RenderConfig, Renderer, SceneMatrices};
use crate::error::RenderError;

const COLOR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;
const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;
const VERTEX_STRIDE: u64 = 8 * 4;
const VERTEX_ATTRIBUTES: [wgpu::VertexAttribute; 3] =
    wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x2, 2 => Float32x3];

fn extent(width: u32, height: u32) -> wgpu::Extent3d {
    wgpu::Extent3d {
        width,
        height,
        depth_or_array_layers: 1,
    }
}

fn padded_row_bytes(width: u32) -> u32 {
    let unpadded = width * 4;
    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    unpadded.div_ceil(align) * align
}

fn render_target(
    device: &wgpu::Device,
    label: &str,
    size: wgpu::Extent3d,
    sample_count: u32,
    format: wgpu::TextureFormat,
    usage: wgpu::TextureUsages,
) -> wgpu::Texture {
    device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size,
        mip_level_count: 1,
        sample_count,
        dimension: wgpu::TextureDimension::D2,
        format,
        usage,
        view_formats: &[],
    })
}

async fn request_device() -> Result<(wgpu::Device, wgpu::Queue), RenderError> {
    let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
    let adapter = match instance
        .request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::default(),
            force_fallback_adapter: false,
            compatible_surface: None,
        })
        .await
    {
        Ok(adapter) => adapter,
        Err(_) => instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                force_fallback_adapter: true,
                compatible_surface: None,
            })
            .await
            .map_err(|e| RenderError::NoAdapter(e.to_string()))?,
    };
    let adapter_info = adapter.get_info();
    info!("render adapter {} ({:?})", adapter_info.name, adapter_info.backend);
    adapter
        .request_device(&wgpu::DeviceDescriptor {
            label: Some("Unvisable"),
            required_limits: wgpu::Limits::downlevel_defaults(),
            ..Default::default()
        })
        .await
        .map_err(|e| RenderError::RequestDevice(e.to_string()))
}

fn shader_module(
    device: &wgpu::Device,
    label: &str,
    source: &str,
    stage: wgpu::naga::ShaderStage,
) -> wgpu::ShaderModule {
    device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Glsl {
            shader: Cow::Owned(source.to_string()),
            stage,
            defines: Default::default(),
        },
    })
}

/// Owns the device, the lighting pipeline, the uploaded mesh and texture and
/// the render targets. Everything is released when the context is dropped.
pub struct RenderContext {
    config: RenderConfig,
    matrices: SceneMatrices,
    uniforms: Uniforms,
    device: wgpu::Device,
    queue: wgpu::Queue,
    pipeline: wgpu::RenderPipeline,
    bind_group: wgpu::BindGroup,
    uniform_buffer: wgpu::Buffer,
    vertex_buffer: wgpu::Buffer,
    vertex_count: u32,
    msaa_view: Option<wgpu::TextureView>,
    depth_view: wgpu::TextureView,
    /// `targets[front]` holds the last finished frame.
    targets: [wgpu::Texture; 2],
    front: usize,
    readback: wgpu::Buffer,
    frames_drawn: u64,
}

impl RenderContext {
    pub fn new(
        config: RenderConfig,
        shaders: &ShaderSources,
        mesh: Mesh,
        texture: Texture,
    ) -> Result<RenderContext, RenderError> {
        if config.width == 0 || config.height == 0 {
            return Err(RenderError::InvalidViewport {
                width: config.width,
                height: config.height,
            });
        }
        if !matches!(config.samples, 1 | 4) {
            return Err(RenderError::InvalidSampleCount(config.samples));
        }
        if mesh.positions.is_empty() {
            return Err(RenderError::EmptyMesh("mesh has no vertices".to_string()));
        }
        let (device, queue) = pollster::block_on(request_device())?;
        device.on_uncaptured_error(Box::new(|e| error!("render device error: {}", e)));

        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let vs = shader_module(
            &device,
            "StandardShading.vertexshader",
            &shaders.vertex,
            wgpu::naga::ShaderStage::Vertex,
        );
        let fs = shader_module(
            &device,
            "StandardShading.fragmentshader",
            &shaders.fragment,
            wgpu::naga::ShaderStage::Fragment,
        );
        if let Some(e) = pollster::block_on(device.pop_error_scope()) {
            return Err(RenderError::Shader(e.to_string()));
        }

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("scene"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: wgpu::BufferSize::new(UNIFORM_SIZE),
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("StandardShading"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });
        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("StandardShading"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &vs,
                entry_point: Some("main"),
                compilation_options: Default::default(),
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: VERTEX_STRIDE,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &VERTEX_ATTRIBUTES,
                }],
            },
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: Some(wgpu::Face::Back),
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState {
                count: config.samples,
                mask: !0,
                alpha_to_coverage_enabled: false,
            },
            fragment: Some(wgpu::FragmentState {
                module: &fs,
                entry_point: Some("main"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: COLOR_FORMAT,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            multiview: None,
            cache: None,
        });
        if let Some(e) = pollster::block_on(device.pop_error_scope()) {
            return Err(RenderError::Shader(e.to_string()));
        }

        let uniforms = Uniforms::default();
        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("scene uniforms"),
            contents: &uniforms.std140_bytes(),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let vertices: Vec<u8> = mesh
            .interleaved()
            .iter()
            .flat_map(|v| v.to_le_bytes())
            .collect();
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("mesh"),
            contents: &vertices,
            usage: wgpu::BufferUsages::VERTEX,
        });

        let (tw, th) = texture.dimensions();
        let diffuse = render_target(
            &device,
            "diffuse",
            extent(tw, th),
            1,
            COLOR_FORMAT,
            wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        );
        queue.write_texture(
            diffuse.as_image_copy(),
            texture.image().as_raw(),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * tw),
                rows_per_image: Some(th),
            },
            extent(tw, th),
        );
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("myTextureSampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("scene"),
            layout: &bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniform_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(
                        &diffuse.create_view(&wgpu::TextureViewDescriptor::default()),
                    ),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&sampler),
                },
            ],
        });

        let size = extent(config.width, config.height);
        let msaa_view = (config.samples > 1).then(|| {
            render_target(
                &device,
                "msaa colour",
                size,
                config.samples,
                COLOR_FORMAT,
                wgpu::TextureUsages::RENDER_ATTACHMENT,
            )
            .create_view(&wgpu::TextureViewDescriptor::default())
        });
        let depth_view = render_target(
            &device,
            "depth",
            size,
            config.samples,
            DEPTH_FORMAT,
            wgpu::TextureUsages::RENDER_ATTACHMENT,
        )
        .create_view(&wgpu::TextureViewDescriptor::default());
        let target_usage = wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC;
        let targets = [
            render_target(&device, "front", size, 1, COLOR_FORMAT, target_usage),
            render_target(&device, "back", size, 1, COLOR_FORMAT, target_usage),
        ];
        let readback = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("read pixels"),
            size: padded_row_bytes(config.width) as u64 * config.height as u64,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        info!(
            "render context {}x{} x{} samples, {} triangles, texture {:?}",
            config.width,
            config.height,
            config.samples,
            mesh.triangle_count(),
            texture.dimensions()
        );
        Ok(RenderContext {
            matrices: SceneMatrices::from_config(&config),
            uniforms,
            device,
            queue,
            pipeline,
            bind_group,
            uniform_buffer,
            vertex_buffer,
            vertex_count: mesh.vertex_count() as u32,
            msaa_view,
            depth_view,
            targets,
            front: 0,
            readback,
            config,
            frames_drawn: 0,
        })
    }

    /// Loads the mesh, the texture and both shader stages from disk.
    pub fn from_files(
        config: RenderConfig,
        mesh_path: impl AsRef<Path>,
        texture_path: impl AsRef<Path>,
        vertex_shader_path: impl AsRef<Path>,
        fragment_shader_path: impl AsRef<Path>,
    ) -> Result<RenderContext, RenderError> {
        let mesh = Mesh::load_obj(mesh_path)?;
        let texture = Texture::load(texture_path)?;
        let shaders = ShaderSources::load(vertex_shader_path, fragment_shader_path)?;
        RenderContext::new(config, &shaders, mesh, texture)
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    pub fn matrices(&self) -> &SceneMatrices {
        &self.matrices
    }

    pub fn uniforms(&self) -> &Uniforms {
        &self.uniforms
    }

    fn back(&self) -> &wgpu::Texture {
        &self.targets[1 - self.front]
    }
}

impl Renderer for RenderContext {
    fn draw_frame(&mut self, light_position: Vec3) {
        self.uniforms = Uniforms {
            mvp: self.matrices.mvp().to_cols_array(),
            view: self.matrices.view.to_cols_array(),
            model: self.matrices.model.to_cols_array(),
            light_position_worldspace: light_position,
        };
        self.queue
            .write_buffer(&self.uniform_buffer, 0, &self.uniforms.std140_bytes());

        let back_view = self
            .back()
            .create_view(&wgpu::TextureViewDescriptor::default());
        let (view, resolve_target) = match &self.msaa_view {
            Some(msaa) => (msaa, Some(&back_view)),
            None => (&back_view, None),
        };
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some("frame") });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("StandardShading"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Discard,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            pass.set_pipeline(&self.pipeline);
            pass.set_bind_group(0, &self.bind_group, &[]);
            pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
            pass.draw(0..self.vertex_count, 0..1);
        }
        self.queue.submit(Some(encoder.finish()));
        trace!("frame {} submitted", self.frames_drawn);

        self.swap_buffers();
        self.frames_drawn += 1;
    }

    fn swap_buffers(&mut self) {
        self.front = 1 - self.front;
    }

    /// Front target contents, row 0 is the bottom of the view.
    fn read_pixels(&mut self) -> Result<RgbaImage, RenderError> {
        let (w, h) = (self.config.width, self.config.height);
        let padded = padded_row_bytes(w);
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some("read pixels") });
        encoder.copy_texture_to_buffer(
            self.targets[self.front].as_image_copy(),
            wgpu::TexelCopyBufferInfo {
                buffer: &self.readback,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded),
                    rows_per_image: Some(h),
                },
            },
            extent(w, h),
        );
        self.queue.submit(Some(encoder.finish()));

        let slice = self.readback.slice(..);
        let (tx, rx) = mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        self.device
            .poll(wgpu::PollType::Wait)
            .map_err(|e| RenderError::ReadBack(e.to_string()))?;
        rx.recv()
            .map_err(|e| RenderError::ReadBack(e.to_string()))?
            .map_err(|e| RenderError::ReadBack(e.to_string()))?;

        let row_bytes = (w * 4) as usize;
        let mut pixels = Vec::with_capacity(row_bytes * h as usize);
        {
            let data = slice.get_mapped_range();
            for row in (0..h as usize).rev() {
                let start = row * padded as usize;
                pixels.extend_from_slice(&data[start..start + row_bytes]);
            }
        }
        self.readback.unmap();
        RgbaImage::from_raw(w, h, pixels)
            .ok_or_else(|| RenderError::ReadBack(format!("short read-back for {}x{}", w, h)))
    }

    fn frames_drawn(&self) -> u64 {
        self.frames_drawn
    }

    fn size(&self) -> (u32, u32) {
        (self.config.width, self.config.height)
    }
}

impl Drop for RenderContext {
    fn drop(&mut self) {
        debug!(
            "releasing render context after {} frames ({} vertices)",
            self.frames_drawn, self.vertex_count
        );
    }
}
