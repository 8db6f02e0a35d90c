//! Indexed triangle mesh produced by the relief builder.
use std::collections::HashMap;

use nalgebra::{Point3, Vector3};

/// A triangle resolved to its three corner positions, in winding order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triangle {
    pub vertices: [Point3<f32>; 3],
}

impl Triangle {
    pub fn new(a: Point3<f32>, b: Point3<f32>, c: Point3<f32>) -> Self {
        Self {
            vertices: [a, b, c],
        }
    }

    /// Unit facet normal `normalize((C - B) x (A - B))`.
    ///
    /// Counter-clockwise triangles (seen from the side the normal points to)
    /// yield outward normals. Degenerate triangles yield the zero vector.
    pub fn calculate_normal(&self) -> Vector3<f32> {
        let [a, b, c] = self.vertices;
        let normal = (c - b).cross(&(a - b));
        let len = normal.norm();
        if len > f32::EPSILON * f32::EPSILON && len.is_finite() {
            normal / len
        } else {
            Vector3::zeros()
        }
    }
}

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: Point3<f32>,
    pub max: Point3<f32>,
}

impl Bounds {
    pub fn size(&self) -> Vector3<f32> {
        self.max - self.min
    }
}

/// Edge usage summary, see [`MeshGeometry::edge_report`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EdgeReport {
    /// Distinct undirected edges.
    pub edge_count: usize,
    /// Edges used by a single triangle.
    pub boundary_edges: usize,
    /// Edges used by more than two triangles.
    pub non_manifold_edges: usize,
    /// Edges traversed twice in the same direction.
    pub inconsistent_edges: usize,
}

impl EdgeReport {
    /// Every edge borders exactly two triangles.
    pub fn is_watertight(&self) -> bool {
        self.boundary_edges == 0 && self.non_manifold_edges == 0
    }

    /// Watertight with neighbouring triangles wound consistently.
    pub fn is_oriented_manifold(&self) -> bool {
        self.is_watertight() && self.inconsistent_edges == 0
    }
}

/// Vertex arena plus index triples.
///
/// The relief builder stores the top surface grid first and the bottom
/// surface grid right after it, both addressed by the same `(row, col)`
/// scheme.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshGeometry {
    pub vertices: Vec<Point3<f32>>,
    pub triangles: Vec<[u32; 3]>,
}

impl MeshGeometry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(vertex_count: usize, triangle_count: usize) -> Self {
        Self {
            vertices: Vec::with_capacity(vertex_count),
            triangles: Vec::with_capacity(triangle_count),
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    /// First triangle referencing a vertex outside the arena, with the
    /// offending index.
    pub fn find_dangling_index(&self) -> Option<(usize, u32)> {
        let vertex_count = self.vertices.len();
        self.triangles.iter().enumerate().find_map(|(i, tri)| {
            tri.iter()
                .find(|&&v| v as usize >= vertex_count)
                .map(|&v| (i, v))
        })
    }

    /// Resolve triangle `index` to positions. Panics when out of range.
    pub fn triangle(&self, index: usize) -> Triangle {
        let [a, b, c] = self.triangles[index];
        Triangle::new(
            self.vertices[a as usize],
            self.vertices[b as usize],
            self.vertices[c as usize],
        )
    }

    /// Iterate over all triangles as positions.
    pub fn iter_triangles(&self) -> impl Iterator<Item = Triangle> + '_ {
        (0..self.triangles.len()).map(move |i| self.triangle(i))
    }

    /// Bounding box of all vertices, `None` for an empty arena.
    pub fn bounds(&self) -> Option<Bounds> {
        let first = *self.vertices.first()?;
        let bounds = self.vertices.iter().fold(
            Bounds {
                min: first,
                max: first,
            },
            |acc, v| Bounds {
                min: acc.min.inf(v),
                max: acc.max.sup(v),
            },
        );
        Some(bounds)
    }

    /// Count how each edge is shared between triangles, by vertex index.
    pub fn edge_report(&self) -> EdgeReport {
        let mut directed: HashMap<(u32, u32), usize> =
            HashMap::with_capacity(self.triangles.len() * 3);
        for &[a, b, c] in &self.triangles {
            for edge in [(a, b), (b, c), (c, a)] {
                *directed.entry(edge).or_default() += 1;
            }
        }

        let mut undirected: HashMap<(u32, u32), usize> = HashMap::with_capacity(directed.len());
        for (&(a, b), &count) in &directed {
            *undirected.entry((a.min(b), a.max(b))).or_default() += count;
        }

        EdgeReport {
            edge_count: undirected.len(),
            boundary_edges: undirected.values().filter(|&&n| n == 1).count(),
            non_manifold_edges: undirected.values().filter(|&&n| n > 2).count(),
            inconsistent_edges: directed.values().filter(|&&n| n > 1).count(),
        }
    }

    /// Axis-aligned cube of edge `size` centred on the origin, wound outward.
    pub fn cube(size: f32) -> Self {
        let h = size / 2.0;
        let vertices = vec![
            Point3::new(-h, -h, -h),
            Point3::new(h, -h, -h),
            Point3::new(h, h, -h),
            Point3::new(-h, h, -h),
            Point3::new(-h, -h, h),
            Point3::new(h, -h, h),
            Point3::new(h, h, h),
            Point3::new(-h, h, h),
        ];
        let triangles = vec![
            // Bottom (-Z)
            [0, 2, 1],
            [0, 3, 2],
            // Top (+Z)
            [4, 5, 6],
            [4, 6, 7],
            // Front (-Y)
            [0, 1, 5],
            [0, 5, 4],
            // Back (+Y)
            [2, 3, 7],
            [2, 7, 6],
            // Left (-X)
            [0, 4, 7],
            [0, 7, 3],
            // Right (+X)
            [1, 2, 6],
            [1, 6, 5],
        ];
        Self {
            vertices,
            triangles,
        }
    }
}
