use glam::{EulerRot, Mat4};
use wgpu::*;

use crate::controller::WorldState;
use crate::model::scene::{AMBIENT_INTENSITY, SKY_COLOR};
use crate::utils::{create_sphere_mesh, MeshBuffer, Vertex};

/// Radius of the rendered projectile sphere.
const PROJECTILE_RADIUS: f32 = 0.05;

#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    pub view_proj: [[f32; 4]; 4],
}

#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LightingUniform {
    pub lamp_pos: [f32; 3],
    pub lamp_intensity: f32,
    pub lamp_range: f32,
    pub ambient: f32,
    pub _pad: [f32; 2],
}

/// Per-instance model matrix, fed through an instance-rate vertex buffer.
#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct InstanceRaw {
    pub model: [[f32; 4]; 4],
}

impl InstanceRaw {
    pub fn from_mat4(m: Mat4) -> Self {
        Self {
            model: m.to_cols_array_2d(),
        }
    }
}

pub struct CameraResources {
    pub camera_buffer: wgpu::Buffer,
    pub lighting_buffer: wgpu::Buffer,
    pub bind_group_layout: wgpu::BindGroupLayout,
    pub camera_bind_group: wgpu::BindGroup,
}

pub fn create_depth_texture(
    device: &wgpu::Device,
    width: u32,
    height: u32,
) -> (wgpu::Texture, wgpu::TextureView) {
    let depth_texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("depth_texture"),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Depth32Float,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    let depth_view = depth_texture.create_view(&wgpu::TextureViewDescriptor::default());
    (depth_texture, depth_view)
}

pub fn create_camera_resources(device: &wgpu::Device) -> CameraResources {
    let camera_buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("camera_buffer"),
        size: std::mem::size_of::<CameraUniform>() as u64,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });
    let lighting_buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("lighting_buffer"),
        size: std::mem::size_of::<LightingUniform>() as u64,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });

    let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("camera_bind_group_layout"),
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            },
        ],
    });

    let camera_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("camera_bind_group"),
        layout: &bind_group_layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: camera_buffer.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: lighting_buffer.as_entire_binding(),
            },
        ],
    });

    CameraResources {
        camera_buffer,
        lighting_buffer,
        bind_group_layout,
        camera_bind_group,
    }
}

pub fn create_mesh_pipeline(
    device: &wgpu::Device,
    format: wgpu::TextureFormat,
    bind_group_layout: &wgpu::BindGroupLayout,
    depth_format: wgpu::TextureFormat,
) -> wgpu::RenderPipeline {
    let shader_src = include_str!("shaders/mesh.wgsl");
    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("mesh_shader"),
        source: wgpu::ShaderSource::Wgsl(shader_src.into()),
    });

    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("pipeline_layout"),
        bind_group_layouts: &[bind_group_layout],
        push_constant_ranges: &[],
    });

    let vertex_layout = wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &[
            wgpu::VertexAttribute {
                offset: 0,
                shader_location: 0,
                format: wgpu::VertexFormat::Float32x3,
            },
            wgpu::VertexAttribute {
                offset: 12,
                shader_location: 1,
                format: wgpu::VertexFormat::Float32x3,
            },
            wgpu::VertexAttribute {
                offset: 24,
                shader_location: 2,
                format: wgpu::VertexFormat::Float32x4,
            },
        ],
    };
    let instance_layout = wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<InstanceRaw>() as wgpu::BufferAddress,
        step_mode: wgpu::VertexStepMode::Instance,
        attributes: &[
            wgpu::VertexAttribute {
                offset: 0,
                shader_location: 3,
                format: wgpu::VertexFormat::Float32x4,
            },
            wgpu::VertexAttribute {
                offset: 16,
                shader_location: 4,
                format: wgpu::VertexFormat::Float32x4,
            },
            wgpu::VertexAttribute {
                offset: 32,
                shader_location: 5,
                format: wgpu::VertexFormat::Float32x4,
            },
            wgpu::VertexAttribute {
                offset: 48,
                shader_location: 6,
                format: wgpu::VertexFormat::Float32x4,
            },
        ],
    };

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("mesh_pipeline"),
        layout: Some(&pipeline_layout),
        vertex: wgpu::VertexState {
            module: &shader,
            entry_point: Some("vs_main"),
            buffers: &[vertex_layout, instance_layout],
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: &shader,
            entry_point: Some("fs_main"),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: Some(wgpu::Face::Back),
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: Some(wgpu::DepthStencilState {
            format: depth_format,
            depth_write_enabled: true,
            depth_compare: wgpu::CompareFunction::Less,
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

/// A mesh plus the instance buffer it is drawn with. The buffer grows when
/// the instance count exceeds its capacity.
pub struct Drawable {
    pub mesh: MeshBuffer,
    instances: wgpu::Buffer,
    capacity: u32,
    count: u32,
}

impl Drawable {
    pub fn new(device: &Device, mesh: MeshBuffer, capacity: u32) -> Self {
        Self {
            mesh,
            instances: Self::alloc_instances(device, capacity),
            capacity,
            count: 0,
        }
    }

    fn alloc_instances(device: &Device, capacity: u32) -> wgpu::Buffer {
        device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("instance_buffer"),
            size: capacity as u64 * std::mem::size_of::<InstanceRaw>() as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        })
    }

    pub fn write_instances(&mut self, device: &Device, queue: &Queue, data: &[InstanceRaw]) {
        let count = data.len() as u32;
        if count > self.capacity {
            self.capacity = count.next_power_of_two();
            self.instances = Self::alloc_instances(device, self.capacity);
        }
        if count > 0 {
            queue.write_buffer(&self.instances, 0, bytemuck::cast_slice(data));
        }
        self.count = count;
    }

    fn draw(&self, rp: &mut RenderPass<'_>) {
        if self.count == 0 || self.mesh.index_count == 0 {
            return;
        }
        rp.set_vertex_buffer(0, self.mesh.vertex_buffer.slice(..));
        rp.set_vertex_buffer(1, self.instances.slice(..));
        rp.set_index_buffer(self.mesh.index_buffer.slice(..), IndexFormat::Uint32);
        rp.draw_indexed(0..self.mesh.index_count, 0, 0..self.count);
    }
}

/// Consolidated render state: the one pipeline, the camera/lighting bind
/// group, and a drawable per scene element.
pub struct RenderState {
    pub format: TextureFormat,
    pub alpha_mode: CompositeAlphaMode,
    pub width: u32,
    pub height: u32,

    pipeline: RenderPipeline,
    camera_buffer: wgpu::Buffer,
    lighting_buffer: wgpu::Buffer,
    camera_bind_group: BindGroup,

    floor: Drawable,
    blocks: Vec<Drawable>,
    projectiles: Drawable,
    // Uploaded lazily once the asynchronous model load resolves
    player_model: Option<Drawable>,

    pub depth_view: TextureView,
}

impl RenderState {
    pub fn new(
        device: &Device,
        format: TextureFormat,
        alpha_mode: CompositeAlphaMode,
        width: u32,
        height: u32,
        world: &WorldState,
    ) -> Self {
        let camera_resources = create_camera_resources(device);
        let depth_format = wgpu::TextureFormat::Depth32Float;
        let pipeline = create_mesh_pipeline(
            device,
            format,
            &camera_resources.bind_group_layout,
            depth_format,
        );
        let (_, depth_view) = create_depth_texture(device, width, height);

        let floor = Drawable::new(device, world.scene.floor.upload(device), 1);

        let blocks = world
            .scene
            .blocks
            .iter()
            .map(|block| Drawable::new(device, block.mesh.upload(device), 1))
            .collect();

        let sphere = create_sphere_mesh(PROJECTILE_RADIUS, 8, 8, [1.0, 1.0, 0.0, 1.0]);
        let projectiles = Drawable::new(device, sphere.upload(device), 16);

        Self {
            format,
            alpha_mode,
            width,
            height,
            pipeline,
            camera_buffer: camera_resources.camera_buffer,
            lighting_buffer: camera_resources.lighting_buffer,
            camera_bind_group: camera_resources.camera_bind_group,
            floor,
            blocks,
            projectiles,
            player_model: None,
            depth_view,
        }
    }

    /// Push this frame's world state into GPU buffers: camera and lighting
    /// uniforms plus one model matrix per drawn instance.
    pub fn prepare(&mut self, device: &Device, queue: &Queue, world: &WorldState) {
        let cam_uniform = CameraUniform {
            view_proj: world.camera.view_proj().to_cols_array_2d(),
        };
        queue.write_buffer(&self.camera_buffer, 0, bytemuck::bytes_of(&cam_uniform));

        let lamp = world.scene.lamp;
        let lighting = LightingUniform {
            lamp_pos: lamp.position.to_array(),
            lamp_intensity: lamp.intensity,
            lamp_range: lamp.range,
            ambient: AMBIENT_INTENSITY,
            _pad: [0.0; 2],
        };
        queue.write_buffer(&self.lighting_buffer, 0, bytemuck::bytes_of(&lighting));

        self.floor
            .write_instances(device, queue, &[InstanceRaw::from_mat4(Mat4::IDENTITY)]);

        for (drawable, block) in self.blocks.iter_mut().zip(world.scene.blocks.iter()) {
            let m = Mat4::from_translation(block.position)
                * Mat4::from_euler(
                    EulerRot::XYZ,
                    block.rotation.x,
                    block.rotation.y,
                    block.rotation.z,
                );
            drawable.write_instances(device, queue, &[InstanceRaw::from_mat4(m)]);
        }

        let shots: Vec<InstanceRaw> = world
            .scene
            .projectiles
            .iter()
            .map(|p| InstanceRaw::from_mat4(Mat4::from_translation(p.position)))
            .collect();
        self.projectiles.write_instances(device, queue, &shots);

        if let Some(model) = world.scene.player_model.ready() {
            let drawable = self.player_model.get_or_insert_with(|| {
                Drawable::new(device, model.mesh.upload(device), 1)
            });
            let m = Mat4::from_translation(model.position)
                * Mat4::from_euler(
                    EulerRot::XYZ,
                    model.rotation.x,
                    model.rotation.y,
                    model.rotation.z,
                );
            drawable.write_instances(device, queue, &[InstanceRaw::from_mat4(m)]);
        }
    }

    pub fn resize(&mut self, device: &Device, surface: &Surface, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        surface.configure(device, &self.surface_config());
        let (_, depth_view) = create_depth_texture(device, width, height);
        self.depth_view = depth_view;
    }

    fn surface_config(&self) -> SurfaceConfiguration {
        SurfaceConfiguration {
            usage: TextureUsages::RENDER_ATTACHMENT,
            format: self.format,
            width: self.width,
            height: self.height,
            present_mode: PresentMode::Fifo,
            alpha_mode: self.alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        }
    }

    pub fn draw_frame(&mut self, device: &Device, queue: &Queue, surface: &Surface) {
        let frame = match surface.get_current_texture() {
            Ok(frame) => frame,
            Err(e) => match acquire_action(&e) {
                // The swapchain goes stale between a resize and the next
                // redraw; reconfigure and retry once, dropping the frame
                // if the surface still is not ready.
                AcquireAction::Reconfigure => {
                    surface.configure(device, &self.surface_config());
                    match surface.get_current_texture() {
                        Ok(frame) => frame,
                        Err(e) => {
                            tracing::warn!("surface not ready after reconfigure, skipping frame: {e:?}");
                            return;
                        }
                    }
                }
                AcquireAction::SkipFrame => {
                    tracing::warn!("failed to acquire frame, skipping: {e:?}");
                    return;
                }
                AcquireAction::Fail => panic!("surface out of memory"),
            },
        };

        let view = frame.texture.create_view(&TextureViewDescriptor::default());
        let mut encoder = device.create_command_encoder(&CommandEncoderDescriptor {
            label: Some("encoder"),
        });

        {
            let mut rp = encoder.begin_render_pass(&RenderPassDescriptor {
                label: Some("render_pass"),
                color_attachments: &[Some(RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: Operations {
                        load: LoadOp::Clear(Color {
                            r: SKY_COLOR[0],
                            g: SKY_COLOR[1],
                            b: SKY_COLOR[2],
                            a: 1.0,
                        }),
                        store: StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(Operations {
                        load: LoadOp::Clear(1.0),
                        store: StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            rp.set_pipeline(&self.pipeline);
            rp.set_bind_group(0, &self.camera_bind_group, &[]);

            self.floor.draw(&mut rp);
            for block in &self.blocks {
                block.draw(&mut rp);
            }
            self.projectiles.draw(&mut rp);
            if let Some(model) = &self.player_model {
                model.draw(&mut rp);
            }
        }

        queue.submit(std::iter::once(encoder.finish()));
        frame.present();
    }
}

/// How to respond when the swapchain refuses to hand out a frame.
#[derive(Debug, PartialEq, Eq)]
enum AcquireAction {
    Reconfigure,
    SkipFrame,
    Fail,
}

fn acquire_action(error: &SurfaceError) -> AcquireAction {
    match error {
        // `Outdated` shows up routinely mid-resize on native; both it and
        // `Lost` are cured by reconfiguring.
        SurfaceError::Lost | SurfaceError::Outdated => AcquireAction::Reconfigure,
        SurfaceError::OutOfMemory => AcquireAction::Fail,
        _ => AcquireAction::SkipFrame,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_surface_errors_never_abort() {
        assert_eq!(
            acquire_action(&SurfaceError::Outdated),
            AcquireAction::Reconfigure
        );
        assert_eq!(
            acquire_action(&SurfaceError::Lost),
            AcquireAction::Reconfigure
        );
        assert_eq!(
            acquire_action(&SurfaceError::Timeout),
            AcquireAction::SkipFrame
        );
        assert_eq!(acquire_action(&SurfaceError::OutOfMemory), AcquireAction::Fail);
    }
}
