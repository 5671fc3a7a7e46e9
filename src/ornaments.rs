//! Ornaments: instanced boxes, spheres and lights hanging on the cone
//! surface, plus the tree topper.
//!
//! Ornaments are partitioned into one pool per kind at generation time, so
//! each pool's instance buffer holds exactly the ornaments it renders and
//! per-frame updates never touch a non-owning pool.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Quat, Vec3};
use std::f32::consts::TAU;
use wgpu::util::DeviceExt;

use crate::config::{hex, palette, TreeConfig, ORNAMENT_CATALOG};
use crate::error::ConfigError;
use crate::mesh::{Mesh, MeshVertex};
use crate::spawn::SpawnContext;

/// Which instanced pool renders an ornament.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrnamentKind {
    /// Metallic gift box, slowly tumbling.
    Box,
    /// Polished bauble.
    Sphere,
    /// Small emissive light.
    Light,
}

impl OrnamentKind {
    /// Uniform world scale applied to the unit mesh.
    pub fn scale(self) -> f32 {
        match self {
            OrnamentKind::Box => 0.4,
            OrnamentKind::Sphere => 0.25,
            OrnamentKind::Light => 0.1,
        }
    }

    fn emissive(self) -> f32 {
        match self {
            OrnamentKind::Light => 4.0,
            _ => 0.0,
        }
    }

    fn mesh(self) -> Mesh {
        match self {
            OrnamentKind::Box => Mesh::cube(),
            OrnamentKind::Sphere => Mesh::uv_sphere(16, 32),
            OrnamentKind::Light => Mesh::uv_sphere(6, 8),
        }
    }
}

/// Static attributes of one ornament, generated once at mount.
#[derive(Debug, Clone)]
pub struct Ornament {
    pub target: Vec3,
    pub chaos: Vec3,
    pub kind: OrnamentKind,
    pub color: Vec3,
    pub weight: f32,
    pub phase: f32,
}

/// Per-weight interpolation factor.
///
/// Heavier ornaments lag behind lighter ones; clamped so neither a light
/// ornament's 1.2 head start nor a pathological weight can leave [0,1].
#[inline]
pub fn formation_factor(weight: f32, progress: f32) -> f32 {
    (progress * (1.2 - weight * 0.1)).clamp(0.0, 1.0)
}

/// Vertical float amplitude, dying out as the ornament settles.
#[inline]
pub fn float_amplitude(factor: f32) -> f32 {
    (1.0 - factor) * 2.0 + 0.1
}

/// Generate the full ornament population, cycling the catalog by index.
pub fn generate(config: &TreeConfig, ctx: &mut SpawnContext) -> Result<Vec<Ornament>, ConfigError> {
    config.validate()?;

    let mut ornaments = Vec::with_capacity(config.ornament_count as usize);
    for i in 0..config.ornament_count {
        let prop = ORNAMENT_CATALOG[i as usize % ORNAMENT_CATALOG.len()];

        // On the cone surface, pulled slightly inward, never at the very base.
        let h = ctx.random() * (config.height - 1.0) + 1.0;
        let r = config.radius_at(h) * 0.95;
        let angle = ctx.random_angle();
        let target = Vec3::new(angle.cos() * r, h, angle.sin() * r);

        let chaos = ctx.chaos_shell(config.chaos_radius, 0.5, 1.0);

        ornaments.push(Ornament {
            target,
            chaos,
            kind: prop.kind,
            color: hex(prop.color),
            weight: prop.weight,
            phase: ctx.random() * TAU,
        });
    }
    Ok(ornaments)
}

/// Per-instance GPU data. Color and emissive are written once at init;
/// the model matrix is rewritten every frame.
#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct OrnamentInstance {
    model: [[f32; 4]; 4],
    color: [f32; 3],
    emissive: f32,
}

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct OrnamentUniforms {
    view_proj: [[f32; 4]; 4],
    /// Directional key light in world space.
    light_dir: [f32; 3],
    _pad: f32,
}

/// One instanced mesh pool: geometry plus the instances of a single kind.
struct Pool {
    kind: OrnamentKind,
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
    instance_buffer: wgpu::Buffer,
    ornaments: Vec<Ornament>,
    /// Reused every frame; no hot-path allocation.
    staging: Vec<OrnamentInstance>,
}

impl Pool {
    fn new(device: &wgpu::Device, kind: OrnamentKind, ornaments: Vec<Ornament>) -> Self {
        let mesh = kind.mesh();
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Ornament Mesh Vertex Buffer"),
            contents: bytemuck::cast_slice(&mesh.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Ornament Mesh Index Buffer"),
            contents: bytemuck::cast_slice(&mesh.indices),
            usage: wgpu::BufferUsages::INDEX,
        });

        let staging: Vec<OrnamentInstance> = ornaments
            .iter()
            .map(|o| OrnamentInstance {
                model: Mat4::ZERO.to_cols_array_2d(),
                color: o.color.to_array(),
                emissive: kind.emissive(),
            })
            .collect();

        let instance_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Ornament Instance Buffer"),
            contents: bytemuck::cast_slice(&staging),
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        });

        Self {
            kind,
            vertex_buffer,
            index_buffer,
            index_count: mesh.index_count(),
            instance_buffer,
            ornaments,
            staging,
        }
    }

    fn update(&mut self, queue: &wgpu::Queue, progress: f32, time: f32) {
        for (i, o) in self.ornaments.iter().enumerate() {
            let factor = formation_factor(o.weight, progress);
            let mut pos = o.chaos.lerp(o.target, factor);
            pos.y += (time + o.phase).sin() * float_amplitude(factor) * (1.0 / o.weight);

            let rotation = match self.kind {
                OrnamentKind::Box => Quat::from_euler(
                    glam::EulerRot::XYZ,
                    time * 0.5,
                    time * 0.2,
                    0.0,
                ),
                _ => Quat::IDENTITY,
            };
            let model = Mat4::from_scale_rotation_translation(
                Vec3::splat(self.kind.scale()),
                rotation,
                pos,
            );
            self.staging[i].model = model.to_cols_array_2d();
        }
        if !self.staging.is_empty() {
            queue.write_buffer(&self.instance_buffer, 0, bytemuck::cast_slice(&self.staging));
        }
    }

    fn draw<'a>(&'a self, render_pass: &mut wgpu::RenderPass<'a>) {
        if self.ornaments.is_empty() {
            return;
        }
        render_pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        render_pass.set_vertex_buffer(1, self.instance_buffer.slice(..));
        render_pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        render_pass.draw_indexed(0..self.index_count, 0, 0..self.ornaments.len() as u32);
    }
}

/// The spinning golden octahedron crowning the tree.
///
/// Drops in from above and scales up with formation progress.
struct Topper {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
    instance_buffer: wgpu::Buffer,
    height: f32,
}

impl Topper {
    const DROP_START_Y: f32 = 15.0;

    fn new(device: &wgpu::Device, height: f32) -> Self {
        let mesh = Mesh::octahedron();
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Topper Vertex Buffer"),
            contents: bytemuck::cast_slice(&mesh.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Topper Index Buffer"),
            contents: bytemuck::cast_slice(&mesh.indices),
            usage: wgpu::BufferUsages::INDEX,
        });

        let instance = OrnamentInstance {
            model: Mat4::ZERO.to_cols_array_2d(),
            color: palette::gold_high().to_array(),
            emissive: 4.0,
        };
        let instance_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Topper Instance Buffer"),
            contents: bytemuck::bytes_of(&instance),
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        });

        Self {
            vertex_buffer,
            index_buffer,
            index_count: mesh.index_count(),
            instance_buffer,
            height,
        }
    }

    fn update(&self, queue: &wgpu::Queue, progress: f32, time: f32) {
        let y = Self::DROP_START_Y + (self.height + 0.5 - Self::DROP_START_Y) * progress;
        let scale = 1.2 * progress;
        let model = Mat4::from_scale_rotation_translation(
            Vec3::splat(scale.max(1e-4)),
            Quat::from_rotation_y(time * 1.2),
            Vec3::new(0.0, y, 0.0),
        );
        let instance = OrnamentInstance {
            model: model.to_cols_array_2d(),
            color: palette::gold_high().to_array(),
            emissive: 4.0,
        };
        queue.write_buffer(&self.instance_buffer, 0, bytemuck::bytes_of(&instance));
    }

    fn draw<'a>(&'a self, render_pass: &mut wgpu::RenderPass<'a>) {
        render_pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        render_pass.set_vertex_buffer(1, self.instance_buffer.slice(..));
        render_pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        render_pass.draw_indexed(0..self.index_count, 0, 0..1);
    }
}

/// Owns the three kind pools, the topper and the shared mesh pipeline.
pub struct OrnamentState {
    pipeline: wgpu::RenderPipeline,
    uniform_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    pools: Vec<Pool>,
    topper: Topper,
}

impl OrnamentState {
    pub fn new(
        device: &wgpu::Device,
        config: &TreeConfig,
        ornaments: Vec<Ornament>,
        surface_format: wgpu::TextureFormat,
        depth_format: wgpu::TextureFormat,
    ) -> Self {
        // Partition by kind; pool sizes are whatever the catalog cycle
        // produced, not the full ornament count.
        let mut boxes = Vec::new();
        let mut spheres = Vec::new();
        let mut lights = Vec::new();
        for o in ornaments {
            match o.kind {
                OrnamentKind::Box => boxes.push(o),
                OrnamentKind::Sphere => spheres.push(o),
                OrnamentKind::Light => lights.push(o),
            }
        }
        let pools = vec![
            Pool::new(device, OrnamentKind::Box, boxes),
            Pool::new(device, OrnamentKind::Sphere, spheres),
            Pool::new(device, OrnamentKind::Light, lights),
        ];
        let topper = Topper::new(device, config.height);

        let uniforms = OrnamentUniforms::zeroed();
        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Ornament Uniform Buffer"),
            contents: bytemuck::bytes_of(&uniforms),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Ornament Bind Group Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Ornament Bind Group"),
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Ornament Shader"),
            source: wgpu::ShaderSource::Wgsl(SHADER.into()),
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Ornament Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Ornament Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[
                    wgpu::VertexBufferLayout {
                        array_stride: std::mem::size_of::<MeshVertex>() as wgpu::BufferAddress,
                        step_mode: wgpu::VertexStepMode::Vertex,
                        attributes: &[
                            wgpu::VertexAttribute {
                                offset: 0,
                                shader_location: 0,
                                format: wgpu::VertexFormat::Float32x3, // position
                            },
                            wgpu::VertexAttribute {
                                offset: 12,
                                shader_location: 1,
                                format: wgpu::VertexFormat::Float32x3, // normal
                            },
                        ],
                    },
                    wgpu::VertexBufferLayout {
                        array_stride: std::mem::size_of::<OrnamentInstance>()
                            as wgpu::BufferAddress,
                        step_mode: wgpu::VertexStepMode::Instance,
                        attributes: &[
                            wgpu::VertexAttribute {
                                offset: 0,
                                shader_location: 2,
                                format: wgpu::VertexFormat::Float32x4, // model col 0
                            },
                            wgpu::VertexAttribute {
                                offset: 16,
                                shader_location: 3,
                                format: wgpu::VertexFormat::Float32x4, // model col 1
                            },
                            wgpu::VertexAttribute {
                                offset: 32,
                                shader_location: 4,
                                format: wgpu::VertexFormat::Float32x4, // model col 2
                            },
                            wgpu::VertexAttribute {
                                offset: 48,
                                shader_location: 5,
                                format: wgpu::VertexFormat::Float32x4, // model col 3
                            },
                            wgpu::VertexAttribute {
                                offset: 64,
                                shader_location: 6,
                                format: wgpu::VertexFormat::Float32x3, // color
                            },
                            wgpu::VertexAttribute {
                                offset: 76,
                                shader_location: 7,
                                format: wgpu::VertexFormat::Float32, // emissive
                            },
                        ],
                    },
                ],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: Some(wgpu::BlendState::REPLACE),
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
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        Self {
            pipeline,
            uniform_buffer,
            bind_group,
            pools,
            topper,
        }
    }

    /// Rewrite every instance matrix for this frame.
    pub fn update(&mut self, queue: &wgpu::Queue, view_proj: Mat4, progress: f32, time: f32) {
        let uniforms = OrnamentUniforms {
            view_proj: view_proj.to_cols_array_2d(),
            light_dir: Vec3::new(0.4, 0.8, 0.45).normalize().to_array(),
            _pad: 0.0,
        };
        queue.write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&uniforms));

        for pool in &mut self.pools {
            pool.update(queue, progress, time);
        }
        self.topper.update(queue, progress, time);
    }

    pub fn draw<'a>(&'a self, render_pass: &mut wgpu::RenderPass<'a>) {
        render_pass.set_pipeline(&self.pipeline);
        render_pass.set_bind_group(0, &self.bind_group, &[]);
        for pool in &self.pools {
            pool.draw(render_pass);
        }
        self.topper.draw(render_pass);
    }
}

const SHADER: &str = r#"
struct Uniforms {
    view_proj: mat4x4<f32>,
    light_dir: vec3<f32>,
};

@group(0) @binding(0)
var<uniform> u: Uniforms;

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) normal: vec3<f32>,
    @location(1) color: vec3<f32>,
    @location(2) emissive: f32,
};

@vertex
fn vs_main(
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
    @location(2) model_0: vec4<f32>,
    @location(3) model_1: vec4<f32>,
    @location(4) model_2: vec4<f32>,
    @location(5) model_3: vec4<f32>,
    @location(6) color: vec3<f32>,
    @location(7) emissive: f32,
) -> VertexOutput {
    let model = mat4x4<f32>(model_0, model_1, model_2, model_3);
    let world = model * vec4<f32>(position, 1.0);

    var out: VertexOutput;
    out.clip_position = u.view_proj * world;
    // Uniform scaling only, so the upper 3x3 rotates normals directly.
    out.normal = normalize((model * vec4<f32>(normal, 0.0)).xyz);
    out.color = color;
    out.emissive = emissive;
    return out;
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    let diffuse = max(dot(normalize(in.normal), u.light_dir), 0.0);
    let lit = in.color * (0.25 + 0.75 * diffuse);
    let final_color = lit + in.color * in.emissive;
    return vec4<f32>(final_color, 1.0);
}
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_formation_factor_heavy_lag() {
        // Heavier ornaments genuinely lag even at full progress.
        let f = formation_factor(5.0, 1.0);
        assert!((f - 0.7).abs() < 1e-6);
    }

    #[test]
    fn test_formation_factor_clamped() {
        assert_eq!(formation_factor(0.0, 1.0), 1.0);
        assert_eq!(formation_factor(0.5, 1.0), 1.0);
        assert_eq!(formation_factor(20.0, 1.0), 0.0);
        for w in [0.0, 0.5, 1.0, 2.8, 5.0, 100.0] {
            for p in [0.0, 0.3, 0.7, 1.0] {
                let f = formation_factor(w, p);
                assert!((0.0..=1.0).contains(&f), "w={} p={} f={}", w, p, f);
            }
        }
    }

    #[test]
    fn test_float_amplitude_diminishes() {
        assert!((float_amplitude(0.0) - 2.1).abs() < 1e-6);
        assert!((float_amplitude(1.0) - 0.1).abs() < 1e-6);
        assert!(float_amplitude(0.3) > float_amplitude(0.9));
    }

    #[test]
    fn test_generate_count_and_bounds() {
        let cfg = TreeConfig {
            ornament_count: 200,
            ..TreeConfig::default()
        };
        let mut ctx = SpawnContext::from_seed(21);
        let ornaments = generate(&cfg, &mut ctx).unwrap();
        assert_eq!(ornaments.len(), 200);

        for o in &ornaments {
            assert!(o.target.y >= 1.0 - 1e-4 && o.target.y <= cfg.height + 1e-4);
            let horizontal = (o.target.x * o.target.x + o.target.z * o.target.z).sqrt();
            assert!(horizontal <= cfg.radius_at(o.target.y) * 0.95 + 1e-4);
            assert!(o.chaos.length() <= cfg.chaos_radius + 1e-3);
            assert!(o.chaos.length() >= cfg.chaos_radius * 0.5 - 1e-3);
            assert!(o.weight > 0.0);
        }
    }

    #[test]
    fn test_catalog_cycling() {
        let cfg = TreeConfig {
            ornament_count: ORNAMENT_CATALOG.len() as u32 * 2,
            ..TreeConfig::default()
        };
        let mut ctx = SpawnContext::from_seed(8);
        let ornaments = generate(&cfg, &mut ctx).unwrap();
        for (i, o) in ornaments.iter().enumerate() {
            let prop = ORNAMENT_CATALOG[i % ORNAMENT_CATALOG.len()];
            assert_eq!(o.kind, prop.kind);
            assert_eq!(o.weight, prop.weight);
        }
    }

    #[test]
    fn test_partition_preserves_population() {
        let cfg = TreeConfig::default();
        let mut ctx = SpawnContext::from_seed(13);
        let ornaments = generate(&cfg, &mut ctx).unwrap();
        let boxes = ornaments.iter().filter(|o| o.kind == OrnamentKind::Box).count();
        let spheres = ornaments.iter().filter(|o| o.kind == OrnamentKind::Sphere).count();
        let lights = ornaments.iter().filter(|o| o.kind == OrnamentKind::Light).count();
        assert_eq!(boxes + spheres + lights, ornaments.len());
        assert!(boxes > 0 && spheres > 0 && lights > 0);
    }

    #[test]
    fn test_instance_layout() {
        assert_eq!(std::mem::size_of::<OrnamentInstance>(), 80);
    }
}
