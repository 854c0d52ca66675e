use foundation::math::Vec3;
use foundation::{Aabb3, BoundingSphere};

/// Unindexed triangle soup as delivered by the model endpoint.
///
/// `positions` holds three vertices per triangle; `normals` holds one facet
/// normal per triangle.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TriangleMesh {
    pub name: Option<String>,
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
}

impl TriangleMesh {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_triangle(&mut self, normal: [f32; 3], vertices: [[f32; 3]; 3]) {
        self.normals.push(normal);
        self.positions.extend_from_slice(&vertices);
    }

    pub fn triangle_count(&self) -> usize {
        self.normals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.normals.is_empty()
    }

    pub fn triangles(&self) -> impl Iterator<Item = ([f32; 3], &[[f32; 3]])> + '_ {
        self.normals
            .iter()
            .copied()
            .zip(self.positions.chunks_exact(3))
    }

    pub fn bounds(&self) -> Aabb3 {
        Aabb3::from_points(self.positions.iter().map(|p| Vec3::from_f32(*p)))
    }

    pub fn bounding_sphere(&self) -> BoundingSphere {
        BoundingSphere::from_points(self.positions.iter().map(|p| Vec3::from_f32(*p)))
    }
}

#[cfg(test)]
mod tests {
    use super::TriangleMesh;

    #[test]
    fn counts_and_bounds_follow_pushed_triangles() {
        let mut mesh = TriangleMesh::new();
        assert!(mesh.is_empty());
        mesh.push_triangle(
            [0.0, 0.0, 1.0],
            [[0.0, 0.0, 0.0], [10.0, 0.0, 0.0], [0.0, 10.0, 0.0]],
        );
        assert_eq!(mesh.triangle_count(), 1);
        assert_eq!(mesh.triangles().count(), 1);

        let b = mesh.bounds();
        assert_eq!(b.max.x, 10.0);
        assert_eq!(b.max.y, 10.0);

        let s = mesh.bounding_sphere();
        assert!(!s.is_degenerate());
    }
}
