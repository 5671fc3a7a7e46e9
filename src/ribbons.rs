//! Spiral ribbons wrapping the cone, drawn as camera-facing thin quads.
//!
//! Each strand is a fixed-length polyline rewritten in place every frame;
//! point count and segment order never change after generation, so the GPU
//! buffer layout stays stable and uploads are a single `write_buffer`.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Quat, Vec3, Vec4};
use std::f32::consts::TAU;
use wgpu::util::DeviceExt;

use crate::config::{palette, TreeConfig};
use crate::error::ConfigError;
use crate::spawn::{spiral_point, SpawnContext};

/// One spiral strand: static endpoints of the morph plus a twinkle phase.
#[derive(Debug, Clone)]
pub struct Ribbon {
    pub target: Vec<Vec3>,
    pub chaos: Vec<Vec3>,
    pub phase: f32,
}

/// Generate all strands. Target points sit exactly on the spiral (no
/// jitter, unlike the ribbon-aligned foliage); chaos points live in a
/// loose shell just outside the foliage cloud.
pub fn generate(config: &TreeConfig, ctx: &mut SpawnContext) -> Result<Vec<Ribbon>, ConfigError> {
    config.validate()?;

    let n = config.ribbon_points;
    let mut ribbons = Vec::with_capacity(config.ribbon_count as usize);
    for strand in 0..config.ribbon_count {
        let mut target = Vec::with_capacity(n as usize);
        let mut chaos = Vec::with_capacity(n as usize);
        for i in 0..n {
            let t = i as f32 / (n - 1) as f32;
            target.push(spiral_point(
                strand,
                config.ribbon_count,
                t,
                config.height,
                config.radius,
            ));
            chaos.push(ctx.chaos_shell(config.chaos_radius, 0.8, 1.2));
        }
        ribbons.push(Ribbon {
            target,
            chaos,
            phase: ctx.random() * TAU,
        });
    }
    Ok(ribbons)
}

/// Current point positions and opacity for one frame, written into `out`
/// as `vec4(position, opacity)` per point. `out` keeps its length; every
/// slot is overwritten.
pub fn update_points(ribbons: &[Ribbon], progress: f32, time: f32, out: &mut [Vec4]) {
    // The whole assembly spins slowly once formation is underway.
    let rotation = if progress > 0.05 {
        Quat::from_rotation_y(time * 0.15 * progress)
    } else {
        Quat::IDENTITY
    };

    let mut cursor = 0;
    for ribbon in ribbons {
        let opacity = (0.4 + (time * 3.0 + ribbon.phase).sin() * 0.2) * progress;
        for (chaos, target) in ribbon.chaos.iter().zip(&ribbon.target) {
            let pos = rotation * chaos.lerp(*target, progress);
            out[cursor] = pos.extend(opacity);
            cursor += 1;
        }
    }
}

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct RibbonUniforms {
    view_proj: [[f32; 4]; 4],
    color: [f32; 3],
    points_per_strand: u32,
}

/// Ribbon renderer: a storage buffer of points expanded into a thin quad
/// per segment in the vertex shader, no vertex buffer.
pub struct RibbonState {
    pipeline: wgpu::RenderPipeline,
    point_buffer: wgpu::Buffer,
    uniform_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    ribbons: Vec<Ribbon>,
    staging: Vec<Vec4>,
    segment_count: u32,
    points_per_strand: u32,
}

impl RibbonState {
    pub fn new(
        device: &wgpu::Device,
        ribbons: Vec<Ribbon>,
        surface_format: wgpu::TextureFormat,
        depth_format: wgpu::TextureFormat,
    ) -> Self {
        let points_per_strand = ribbons.first().map_or(0, |r| r.target.len() as u32);
        let point_count = ribbons.len() as u32 * points_per_strand;
        let segment_count = ribbons.len() as u32 * points_per_strand.saturating_sub(1);

        let staging = vec![Vec4::ZERO; point_count as usize];
        let point_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Ribbon Point Buffer"),
            contents: bytemuck::cast_slice(&staging),
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
        });

        let uniforms = RibbonUniforms {
            view_proj: Mat4::IDENTITY.to_cols_array_2d(),
            color: palette::gold_soft().to_array(),
            points_per_strand,
        };
        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Ribbon Uniform Buffer"),
            contents: bytemuck::bytes_of(&uniforms),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Ribbon Bind Group Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
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

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Ribbon Bind Group"),
            layout: &bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniform_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: point_buffer.as_entire_binding(),
                },
            ],
        });

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Ribbon Shader"),
            source: wgpu::ShaderSource::Wgsl(SHADER.into()),
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Ribbon Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Ribbon Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
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
            point_buffer,
            uniform_buffer,
            bind_group,
            ribbons,
            staging,
            segment_count,
            points_per_strand,
        }
    }

    pub fn update(&mut self, queue: &wgpu::Queue, view_proj: Mat4, progress: f32, time: f32) {
        update_points(&self.ribbons, progress, time, &mut self.staging);
        queue.write_buffer(&self.point_buffer, 0, bytemuck::cast_slice(&self.staging));

        let uniforms = RibbonUniforms {
            view_proj: view_proj.to_cols_array_2d(),
            color: palette::gold_soft().to_array(),
            points_per_strand: self.points_per_strand,
        };
        queue.write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&uniforms));
    }

    pub fn draw<'a>(&'a self, render_pass: &mut wgpu::RenderPass<'a>) {
        if self.segment_count == 0 {
            return;
        }
        render_pass.set_pipeline(&self.pipeline);
        render_pass.set_bind_group(0, &self.bind_group, &[]);
        render_pass.draw(0..6, 0..self.segment_count);
    }
}

const SHADER: &str = r#"
struct Uniforms {
    view_proj: mat4x4<f32>,
    color: vec3<f32>,
    points_per_strand: u32,
};

@group(0) @binding(0) var<uniform> u: Uniforms;
@group(0) @binding(1) var<storage, read> points: array<vec4<f32>>;

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) alpha: f32,
};

@vertex
fn vs_main(
    @builtin(vertex_index) vertex_index: u32,
    @builtin(instance_index) instance_index: u32,
) -> VertexOutput {
    var out: VertexOutput;

    // Instances index segments within strands; skip the seam between
    // the last point of one strand and the first of the next.
    let segments_per_strand = u.points_per_strand - 1u;
    let strand = instance_index / segments_per_strand;
    let seg = instance_index % segments_per_strand;
    let base = strand * u.points_per_strand + seg;

    let a = points[base];
    let b = points[base + 1u];

    let pos_a = a.xyz;
    let pos_b = b.xyz;
    let alpha = a.w;

    if alpha < 0.001 {
        out.clip_position = vec4<f32>(0.0, 0.0, -1000.0, 1.0);
        out.alpha = 0.0;
        return out;
    }

    let line_dir = normalize(pos_b - pos_a);

    var perp = cross(line_dir, vec3<f32>(0.0, 1.0, 0.0));
    if length(perp) < 0.001 {
        perp = cross(line_dir, vec3<f32>(1.0, 0.0, 0.0));
    }
    perp = normalize(perp) * 0.03;

    var pos: vec3<f32>;
    switch vertex_index {
        case 0u: { pos = pos_a - perp; }
        case 1u: { pos = pos_a + perp; }
        case 2u: { pos = pos_b - perp; }
        case 3u: { pos = pos_a + perp; }
        case 4u: { pos = pos_b - perp; }
        default: { pos = pos_b + perp; }
    }

    out.clip_position = u.view_proj * vec4<f32>(pos, 1.0);
    out.alpha = alpha;

    return out;
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    return vec4<f32>(u.color, in.alpha);
}
"#;

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config() -> TreeConfig {
        TreeConfig {
            ribbon_count: 4,
            ribbon_points: 10,
            ..TreeConfig::default()
        }
    }

    #[test]
    fn test_generate_counts() {
        let cfg = small_config();
        let mut ctx = SpawnContext::from_seed(3);
        let ribbons = generate(&cfg, &mut ctx).unwrap();
        assert_eq!(ribbons.len(), 4);
        for r in &ribbons {
            assert_eq!(r.target.len(), 10);
            assert_eq!(r.chaos.len(), 10);
        }
    }

    #[test]
    fn test_targets_follow_spiral() {
        let cfg = small_config();
        let mut ctx = SpawnContext::from_seed(3);
        let ribbons = generate(&cfg, &mut ctx).unwrap();
        for (s, r) in ribbons.iter().enumerate() {
            // Base at y=0, apex at y=height with radius pinched to zero.
            assert!(r.target[0].y.abs() < 1e-5);
            let apex = r.target[9];
            assert!((apex.y - cfg.height).abs() < 1e-4);
            assert!((apex.x * apex.x + apex.z * apex.z).sqrt() < 1e-4, "strand {}", s);
        }
    }

    #[test]
    fn test_chaos_shell_bounds() {
        let cfg = small_config();
        let mut ctx = SpawnContext::from_seed(9);
        let ribbons = generate(&cfg, &mut ctx).unwrap();
        for r in &ribbons {
            for c in &r.chaos {
                let len = c.length();
                assert!(len >= cfg.chaos_radius * 0.8 - 1e-3);
                assert!(len <= cfg.chaos_radius * 1.2 + 1e-3);
            }
        }
    }

    #[test]
    fn test_update_preserves_length_and_order() {
        let cfg = small_config();
        let mut ctx = SpawnContext::from_seed(5);
        let ribbons = generate(&cfg, &mut ctx).unwrap();
        let total = ribbons.iter().map(|r| r.target.len()).sum::<usize>();
        let mut out = vec![Vec4::ZERO; total];

        update_points(&ribbons, 1.0, 2.7, &mut out);
        assert_eq!(out.len(), total);

        // At full progress with rotation applied, distances from the axis
        // must match the targets point for point (rotation is rigid).
        let mut cursor = 0;
        for r in &ribbons {
            for t in &r.target {
                let p = out[cursor].truncate();
                let pr = (p.x * p.x + p.z * p.z).sqrt();
                let tr = (t.x * t.x + t.z * t.z).sqrt();
                assert!((pr - tr).abs() < 1e-3);
                assert!((p.y - t.y).abs() < 1e-4);
                cursor += 1;
            }
        }
    }

    #[test]
    fn test_update_at_full_progress_time_zero() {
        let cfg = small_config();
        let mut ctx = SpawnContext::from_seed(5);
        let ribbons = generate(&cfg, &mut ctx).unwrap();
        let total = ribbons.iter().map(|r| r.target.len()).sum::<usize>();
        let mut out = vec![Vec4::ZERO; total];

        // Rotation angle is zero at time zero, so points land exactly on
        // their targets.
        update_points(&ribbons, 1.0, 0.0, &mut out);
        let mut cursor = 0;
        for r in &ribbons {
            for t in &r.target {
                assert!((out[cursor].truncate() - *t).length() < 1e-5);
                cursor += 1;
            }
        }
    }

    #[test]
    fn test_update_at_zero_progress() {
        let cfg = small_config();
        let mut ctx = SpawnContext::from_seed(5);
        let ribbons = generate(&cfg, &mut ctx).unwrap();
        let total = ribbons.iter().map(|r| r.target.len()).sum::<usize>();
        let mut out = vec![Vec4::ZERO; total];

        update_points(&ribbons, 0.0, 10.0, &mut out);

        // No rotation, points equal chaos positions, opacity zero.
        let mut cursor = 0;
        for r in &ribbons {
            for c in &r.chaos {
                let p = out[cursor];
                assert!((p.truncate() - *c).length() < 1e-5);
                assert!(p.w.abs() < 1e-6);
                cursor += 1;
            }
        }
    }

    #[test]
    fn test_opacity_bounded() {
        let cfg = small_config();
        let mut ctx = SpawnContext::from_seed(1);
        let ribbons = generate(&cfg, &mut ctx).unwrap();
        let total = ribbons.iter().map(|r| r.target.len()).sum::<usize>();
        let mut out = vec![Vec4::ZERO; total];

        for frame in 0..50 {
            update_points(&ribbons, 0.8, frame as f32 * 0.16, &mut out);
            for p in &out {
                assert!(p.w >= 0.0 && p.w <= 0.6 + 1e-6);
            }
        }
    }
}
