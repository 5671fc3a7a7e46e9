//! Procedural ornament meshes.
//!
//! Small indexed position+normal meshes built in memory at startup; no asset
//! loading anywhere in the installation.

use bytemuck::{Pod, Zeroable};

/// One mesh vertex.
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct MeshVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
}

/// An indexed triangle mesh.
#[derive(Debug, Clone)]
pub struct Mesh {
    pub vertices: Vec<MeshVertex>,
    pub indices: Vec<u32>,
}

impl Mesh {
    pub fn index_count(&self) -> u32 {
        self.indices.len() as u32
    }

    /// Unit cube centered at the origin with flat face normals.
    pub fn cube() -> Self {
        // (normal, four corners CCW when viewed from outside)
        const FACES: [([f32; 3], [[f32; 3]; 4]); 6] = [
            ([0.0, 0.0, 1.0], [
                [-0.5, -0.5, 0.5], [0.5, -0.5, 0.5], [0.5, 0.5, 0.5], [-0.5, 0.5, 0.5],
            ]),
            ([0.0, 0.0, -1.0], [
                [0.5, -0.5, -0.5], [-0.5, -0.5, -0.5], [-0.5, 0.5, -0.5], [0.5, 0.5, -0.5],
            ]),
            ([1.0, 0.0, 0.0], [
                [0.5, -0.5, 0.5], [0.5, -0.5, -0.5], [0.5, 0.5, -0.5], [0.5, 0.5, 0.5],
            ]),
            ([-1.0, 0.0, 0.0], [
                [-0.5, -0.5, -0.5], [-0.5, -0.5, 0.5], [-0.5, 0.5, 0.5], [-0.5, 0.5, -0.5],
            ]),
            ([0.0, 1.0, 0.0], [
                [-0.5, 0.5, 0.5], [0.5, 0.5, 0.5], [0.5, 0.5, -0.5], [-0.5, 0.5, -0.5],
            ]),
            ([0.0, -1.0, 0.0], [
                [-0.5, -0.5, -0.5], [0.5, -0.5, -0.5], [0.5, -0.5, 0.5], [-0.5, -0.5, 0.5],
            ]),
        ];

        let mut vertices = Vec::with_capacity(24);
        let mut indices = Vec::with_capacity(36);
        for (normal, corners) in FACES {
            let base = vertices.len() as u32;
            for position in corners {
                vertices.push(MeshVertex { position, normal });
            }
            indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        }
        Self { vertices, indices }
    }

    /// Unit-radius UV sphere with smooth normals.
    pub fn uv_sphere(rings: u32, segments: u32) -> Self {
        let rings = rings.max(2);
        let segments = segments.max(3);

        let mut vertices = Vec::with_capacity(((rings + 1) * (segments + 1)) as usize);
        for r in 0..=rings {
            let v = r as f32 / rings as f32;
            let phi = v * std::f32::consts::PI;
            for s in 0..=segments {
                let u = s as f32 / segments as f32;
                let theta = u * std::f32::consts::TAU;
                let p = [
                    phi.sin() * theta.cos(),
                    phi.cos(),
                    phi.sin() * theta.sin(),
                ];
                vertices.push(MeshVertex { position: p, normal: p });
            }
        }

        let mut indices = Vec::with_capacity((rings * segments * 6) as usize);
        let stride = segments + 1;
        for r in 0..rings {
            for s in 0..segments {
                let a = r * stride + s;
                let b = a + stride;
                indices.extend_from_slice(&[a, b, a + 1, a + 1, b, b + 1]);
            }
        }
        Self { vertices, indices }
    }

    /// Regular octahedron with unit circumradius, smooth normals.
    ///
    /// Used for the tree topper.
    pub fn octahedron() -> Self {
        const CORNERS: [[f32; 3]; 6] = [
            [1.0, 0.0, 0.0],
            [-1.0, 0.0, 0.0],
            [0.0, 1.0, 0.0],
            [0.0, -1.0, 0.0],
            [0.0, 0.0, 1.0],
            [0.0, 0.0, -1.0],
        ];
        const FACES: [[u32; 3]; 8] = [
            [2, 4, 0],
            [2, 0, 5],
            [2, 5, 1],
            [2, 1, 4],
            [3, 0, 4],
            [3, 5, 0],
            [3, 1, 5],
            [3, 4, 1],
        ];

        let vertices = CORNERS
            .iter()
            .map(|&position| MeshVertex { position, normal: position })
            .collect();
        let indices = FACES.iter().flatten().copied().collect();
        Self { vertices, indices }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cube_counts() {
        let m = Mesh::cube();
        assert_eq!(m.vertices.len(), 24);
        assert_eq!(m.indices.len(), 36);
        assert_eq!(m.index_count(), 36);
    }

    #[test]
    fn test_cube_indices_in_range() {
        let m = Mesh::cube();
        assert!(m.indices.iter().all(|&i| (i as usize) < m.vertices.len()));
    }

    #[test]
    fn test_sphere_counts_and_radius() {
        let m = Mesh::uv_sphere(8, 16);
        assert_eq!(m.vertices.len(), 9 * 17);
        assert_eq!(m.indices.len(), 8 * 16 * 6);
        for v in &m.vertices {
            let len = (v.position[0].powi(2) + v.position[1].powi(2) + v.position[2].powi(2)).sqrt();
            assert!((len - 1.0).abs() < 1e-4);
        }
    }

    #[test]
    fn test_sphere_clamps_degenerate_resolution() {
        let m = Mesh::uv_sphere(0, 0);
        assert!(!m.vertices.is_empty());
        assert!(m.indices.iter().all(|&i| (i as usize) < m.vertices.len()));
    }

    #[test]
    fn test_octahedron_counts() {
        let m = Mesh::octahedron();
        assert_eq!(m.vertices.len(), 6);
        assert_eq!(m.indices.len(), 24);
        assert!(m.indices.iter().all(|&i| (i as usize) < m.vertices.len()));
    }
}
