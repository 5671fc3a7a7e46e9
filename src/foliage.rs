//! Foliage point cloud: generation and rendering.
//!
//! ~120k particles whose static attributes (target position in the tree,
//! chaos position in the dispersed cloud, color, size, twinkle phase) are
//! generated once and uploaded to an interleaved vertex buffer. Per frame,
//! only a small uniform block changes; the vertex shader interpolates every
//! particle between its two resting positions and billboards a quad per
//! particle.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};
use std::f32::consts::TAU;
use wgpu::util::DeviceExt;

use crate::config::{palette, Tuning, TreeConfig, SPIRAL_TURNS};
use crate::error::ConfigError;
use crate::spawn::SpawnContext;

/// Fraction of the foliage assigned to the spiral-ribbon-aligned subset.
const RIBBON_ALIGNED_FRACTION: f32 = 0.45;

/// Static per-particle attributes, generated once and immutable afterwards.
///
/// The vectors are parallel: index `i` in every field describes particle `i`.
#[derive(Debug, Clone)]
pub struct FoliageData {
    pub target_positions: Vec<Vec3>,
    pub chaos_positions: Vec<Vec3>,
    pub colors: Vec<Vec3>,
    pub sizes: Vec<f32>,
    /// Per-particle phase in [0,1) desynchronizing twinkle and sway.
    pub offsets: Vec<f32>,
}

impl FoliageData {
    /// Generate the full particle population for `config`.
    pub fn generate(config: &TreeConfig, ctx: &mut SpawnContext) -> Result<Self, ConfigError> {
        config.validate()?;

        let count = config.foliage_count as usize;
        let ribbon_aligned = (config.foliage_count as f32 * RIBBON_ALIGNED_FRACTION) as u32;
        let volume = config.foliage_count - ribbon_aligned;

        let emerald_deep = palette::emerald_deep();
        let emerald_bright = palette::emerald_bright();
        let gold = palette::gold_high();
        let white = palette::diamond_white();

        let mut data = Self {
            target_positions: Vec::with_capacity(count),
            chaos_positions: Vec::with_capacity(count),
            colors: Vec::with_capacity(count),
            sizes: Vec::with_capacity(count),
            offsets: Vec::with_capacity(count),
        };

        for i in 0..config.foliage_count {
            let mut size = ctx.random() * 0.5 + 0.3;
            let target;
            let mut color;

            if i < volume {
                // Volume stardust filling the cone.
                let h = ctx.random() * config.height;
                let radial_frac = ctx.disk_fraction();
                let r = config.radius_at(h) * radial_frac;
                let angle = ctx.random_angle();
                target = Vec3::new(angle.cos() * r, h, angle.sin() * r);

                // Particles near the cone surface trend brighter.
                color = emerald_deep.lerp(emerald_bright, ctx.random() * 0.5 + radial_frac * 0.5);

                // Rare bright accents; each overlay draws its own sample.
                if ctx.chance(0.01) {
                    color = color.lerp(white, 0.9);
                    size *= 2.5;
                }
                if ctx.chance(0.02) {
                    color = color.lerp(gold, 0.8);
                    size *= 1.8;
                }
            } else {
                // Stardust hugging the spiral ribbons.
                let strand = i % config.ribbon_count;
                let t = ctx.random();
                let start_angle = (strand as f32 / config.ribbon_count as f32) * TAU;
                let angle = start_angle + t * TAU * SPIRAL_TURNS;
                let spread = 0.35 * (1.0 - t + 0.1);
                let r = config.radius * (1.0 - t) * 1.1 + (ctx.random() - 0.5) * spread;
                target = Vec3::new(
                    angle.cos() * r,
                    t * config.height + (ctx.random() - 0.5) * spread,
                    angle.sin() * r,
                );

                color = emerald_bright.lerp(gold, ctx.random() * 0.9);
                size *= 1.4;

                if ctx.chance(0.05) {
                    color = color.lerp(white, 0.8);
                    size *= 2.0;
                }
            }

            data.target_positions.push(target);
            data.chaos_positions.push(ctx.chaos_position(config.chaos_radius));
            data.colors.push(color);
            data.sizes.push(size);
            data.offsets.push(ctx.random());
        }

        Ok(data)
    }

    pub fn len(&self) -> usize {
        self.target_positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.target_positions.is_empty()
    }

    /// Interleave the parallel arrays into the GPU vertex layout.
    pub fn to_vertices(&self) -> Vec<FoliageVertex> {
        (0..self.len())
            .map(|i| FoliageVertex {
                target: self.target_positions[i].to_array(),
                size: self.sizes[i],
                chaos: self.chaos_positions[i].to_array(),
                offset: self.offsets[i],
                color: self.colors[i].to_array(),
                _pad: 0.0,
            })
            .collect()
    }
}

/// GPU vertex layout, stepped per instance (one quad per particle).
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct FoliageVertex {
    pub target: [f32; 3],
    pub size: f32,
    pub chaos: [f32; 3],
    pub offset: f32,
    pub color: [f32; 3],
    _pad: f32,
}

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct FoliageUniforms {
    view: [[f32; 4]; 4],
    proj: [[f32; 4]; 4],
    time: f32,
    progress: f32,
    point_scale: f32,
    twinkle_exponent: f32,
    gold_threshold: [f32; 2],
    _pad: [f32; 2],
}

/// Owns the foliage pipeline and buffers; static data never changes after
/// construction, per-frame work is one uniform write and one draw call.
pub struct FoliageState {
    pipeline: wgpu::RenderPipeline,
    vertex_buffer: wgpu::Buffer,
    uniform_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    tuning: Tuning,
    count: u32,
}

impl FoliageState {
    pub fn new(
        device: &wgpu::Device,
        data: &FoliageData,
        tuning: Tuning,
        surface_format: wgpu::TextureFormat,
        depth_format: wgpu::TextureFormat,
    ) -> Self {
        let vertices = data.to_vertices();
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Foliage Vertex Buffer"),
            contents: bytemuck::cast_slice(&vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let uniforms = FoliageUniforms::zeroed();
        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Foliage Uniform Buffer"),
            contents: bytemuck::bytes_of(&uniforms),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Foliage Bind Group Layout"),
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
            label: Some("Foliage Bind Group"),
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Foliage Shader"),
            source: wgpu::ShaderSource::Wgsl(SHADER.into()),
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Foliage Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Foliage Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: std::mem::size_of::<FoliageVertex>() as wgpu::BufferAddress,
                    step_mode: wgpu::VertexStepMode::Instance,
                    attributes: &[
                        wgpu::VertexAttribute {
                            offset: 0,
                            shader_location: 0,
                            format: wgpu::VertexFormat::Float32x3, // target
                        },
                        wgpu::VertexAttribute {
                            offset: 12,
                            shader_location: 1,
                            format: wgpu::VertexFormat::Float32, // size
                        },
                        wgpu::VertexAttribute {
                            offset: 16,
                            shader_location: 2,
                            format: wgpu::VertexFormat::Float32x3, // chaos
                        },
                        wgpu::VertexAttribute {
                            offset: 28,
                            shader_location: 3,
                            format: wgpu::VertexFormat::Float32, // offset
                        },
                        wgpu::VertexAttribute {
                            offset: 32,
                            shader_location: 4,
                            format: wgpu::VertexFormat::Float32x3, // color
                        },
                    ],
                }],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    // Additive: the cloud glows where particles overlap.
                    blend: Some(wgpu::BlendState {
                        color: wgpu::BlendComponent {
                            src_factor: wgpu::BlendFactor::SrcAlpha,
                            dst_factor: wgpu::BlendFactor::One,
                            operation: wgpu::BlendOperation::Add,
                        },
                        alpha: wgpu::BlendComponent {
                            src_factor: wgpu::BlendFactor::One,
                            dst_factor: wgpu::BlendFactor::One,
                            operation: wgpu::BlendOperation::Add,
                        },
                    }),
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
            depth_stencil: Some(wgpu::DepthStencilState {
                format: depth_format,
                // Glows never occlude; they are occluded by ornaments.
                depth_write_enabled: false,
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
            vertex_buffer,
            uniform_buffer,
            bind_group,
            tuning,
            count: data.len() as u32,
        }
    }

    /// Push this frame's uniforms.
    pub fn update(
        &self,
        queue: &wgpu::Queue,
        view: Mat4,
        proj: Mat4,
        progress: f32,
        time: f32,
    ) {
        let uniforms = FoliageUniforms {
            view: view.to_cols_array_2d(),
            proj: proj.to_cols_array_2d(),
            time,
            progress,
            point_scale: self.tuning.point_scale,
            twinkle_exponent: self.tuning.twinkle_exponent,
            gold_threshold: [self.tuning.gold_threshold_r, self.tuning.gold_threshold_g],
            _pad: [0.0; 2],
        };
        queue.write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&uniforms));
    }

    pub fn draw<'a>(&'a self, render_pass: &mut wgpu::RenderPass<'a>) {
        render_pass.set_pipeline(&self.pipeline);
        render_pass.set_bind_group(0, &self.bind_group, &[]);
        render_pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        render_pass.draw(0..6, 0..self.count);
    }
}

const SHADER: &str = r#"
struct Uniforms {
    view: mat4x4<f32>,
    proj: mat4x4<f32>,
    time: f32,
    progress: f32,
    point_scale: f32,
    twinkle_exponent: f32,
    gold_threshold: vec2<f32>,
};

@group(0) @binding(0)
var<uniform> u: Uniforms;

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) color: vec3<f32>,
    @location(1) uv: vec2<f32>,
    @location(2) offset: f32,
};

@vertex
fn vs_main(
    @builtin(vertex_index) vertex_index: u32,
    @location(0) target_pos: vec3<f32>,
    @location(1) size: f32,
    @location(2) chaos_pos: vec3<f32>,
    @location(3) offset: f32,
    @location(4) color: vec3<f32>,
) -> VertexOutput {
    var quad_vertices = array<vec2<f32>, 6>(
        vec2<f32>(-1.0, -1.0),
        vec2<f32>( 1.0, -1.0),
        vec2<f32>(-1.0,  1.0),
        vec2<f32>(-1.0,  1.0),
        vec2<f32>( 1.0, -1.0),
        vec2<f32>( 1.0,  1.0),
    );

    var pos = mix(chaos_pos, target_pos, u.progress);

    // Nebular drift, fading out as the particle locks into formation.
    let sway = sin(u.time * 0.5 + pos.y * 0.2 + offset * 10.0)
        * (0.05 + 0.1 * (1.0 - u.progress));
    pos.x += sway;
    pos.z += cos(u.time * 0.4 + pos.x * 0.3) * sway;

    var mv = u.view * vec4<f32>(pos, 1.0);

    // Per-particle breathing; perspective supplies the 1/distance falloff.
    let pulse = 0.8 + 0.4 * sin(u.time * (1.5 + offset) + offset * 100.0);
    let half_extent = size * pulse * u.point_scale * 0.01;

    let corner = quad_vertices[vertex_index];
    mv.x += corner.x * half_extent;
    mv.y += corner.y * half_extent;

    var out: VertexOutput;
    out.clip_position = u.proj * mv;
    out.color = color;
    out.uv = corner;
    out.offset = offset;
    return out;
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    let r = length(in.uv);
    if r > 1.0 {
        discard;
    }

    // Sharply peaked core.
    let strength = pow(1.0 - r, 3.0);

    // Rare sharp spikes; near-zero most of the time.
    let twinkle = pow(
        abs(sin(u.time * (1.0 + in.offset * 2.0) + in.offset * 50.0)),
        u.twinkle_exponent,
    );

    var final_color = in.color;
    if in.color.r > u.gold_threshold.x && in.color.g > u.gold_threshold.y {
        final_color += vec3<f32>(0.5, 0.4, 0.2) * twinkle * u.progress;
    } else {
        final_color += vec3<f32>(0.1, 0.2, 0.1) * twinkle * u.progress;
    }

    return vec4<f32>(final_color, strength * (0.7 + twinkle * 0.3));
}
"#;

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config() -> TreeConfig {
        TreeConfig {
            foliage_count: 1000,
            ribbon_count: 4,
            ribbon_points: 10,
            ..TreeConfig::default()
        }
    }

    #[test]
    fn test_generate_exact_parallel_counts() {
        let cfg = small_config();
        let mut ctx = SpawnContext::from_seed(42);
        let data = FoliageData::generate(&cfg, &mut ctx).unwrap();

        assert_eq!(data.len(), 1000);
        assert_eq!(data.target_positions.len(), 1000);
        assert_eq!(data.chaos_positions.len(), 1000);
        assert_eq!(data.colors.len(), 1000);
        assert_eq!(data.sizes.len(), 1000);
        assert_eq!(data.offsets.len(), 1000);
    }

    #[test]
    fn test_generate_rejects_bad_config() {
        let mut cfg = small_config();
        cfg.foliage_count = 0;
        let mut ctx = SpawnContext::from_seed(0);
        assert!(FoliageData::generate(&cfg, &mut ctx).is_err());
    }

    #[test]
    fn test_all_coordinates_finite() {
        let cfg = small_config();
        let mut ctx = SpawnContext::from_seed(9);
        let data = FoliageData::generate(&cfg, &mut ctx).unwrap();
        for i in 0..data.len() {
            assert!(data.target_positions[i].is_finite());
            assert!(data.chaos_positions[i].is_finite());
            assert!(data.colors[i].is_finite());
            assert!(data.sizes[i].is_finite() && data.sizes[i] > 0.0);
            assert!((0.0..1.0).contains(&data.offsets[i]));
        }
    }

    #[test]
    fn test_targets_inside_cone_envelope() {
        let cfg = small_config();
        let mut ctx = SpawnContext::from_seed(3);
        let data = FoliageData::generate(&cfg, &mut ctx).unwrap();

        // Ribbon-aligned particles overhang the cone by 1.1 plus jitter; the
        // base spread term is bounded by 0.35 * 1.1.
        let jitter = 0.35 * 1.1 * 0.5 + 1e-3;
        for p in &data.target_positions {
            assert!(p.y >= -jitter && p.y <= cfg.height + jitter, "y = {}", p.y);
            let horizontal = (p.x * p.x + p.z * p.z).sqrt();
            let envelope = cfg.radius * (1.0 - (p.y.clamp(0.0, cfg.height)) / cfg.height) * 1.1;
            assert!(
                horizontal <= envelope + jitter + 0.35,
                "horizontal {} exceeds envelope {} at y {}",
                horizontal,
                envelope,
                p.y
            );
        }
    }

    #[test]
    fn test_chaos_positions_inside_sphere() {
        let cfg = small_config();
        let mut ctx = SpawnContext::from_seed(5);
        let data = FoliageData::generate(&cfg, &mut ctx).unwrap();
        for p in &data.chaos_positions {
            assert!(p.length() <= cfg.chaos_radius + 1e-3);
        }
    }

    #[test]
    fn test_vertex_layout() {
        assert_eq!(std::mem::size_of::<FoliageVertex>(), 48);

        let cfg = small_config();
        let mut ctx = SpawnContext::from_seed(11);
        let data = FoliageData::generate(&cfg, &mut ctx).unwrap();
        let verts = data.to_vertices();
        assert_eq!(verts.len(), data.len());
        assert_eq!(verts[0].target, data.target_positions[0].to_array());
        assert_eq!(verts[0].chaos, data.chaos_positions[0].to_array());
    }

    #[test]
    fn test_same_seed_same_data() {
        let cfg = small_config();
        let a = FoliageData::generate(&cfg, &mut SpawnContext::from_seed(77)).unwrap();
        let b = FoliageData::generate(&cfg, &mut SpawnContext::from_seed(77)).unwrap();
        assert_eq!(a.target_positions, b.target_positions);
        assert_eq!(a.colors, b.colors);
    }
}
