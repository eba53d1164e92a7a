// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Triangle meshes over a grid of heights.
//!
//! Used by [`HeadSurface`](crate::attribute::HeadSurface) to turn per-cell
//! head values into a continuous surface:
//!
//! 1. [`triangulate`] connects every 2×2 block of valid cells;
//! 2. [`subdivide`] splits each triangle into four at its edge midpoints;
//! 3. [`smooth`] relaxes heights toward their neighbors' average;
//! 4. [`compute_normals`] averages face normals per vertex.

use std::collections::HashMap;

use crate::geometry::Vec3;
use crate::layer::GridSize;

/// An indexed triangle mesh.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TriangleMesh {
    /// Vertex positions.
    pub positions: Vec<Vec3>,
    /// Per-vertex normals; empty until [`compute_normals`] runs.
    pub normals: Vec<Vec3>,
    /// Three indices per triangle, counter-clockwise seen from above.
    pub indices: Vec<u32>,
}

impl TriangleMesh {
    /// Number of vertices.
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Number of triangles.
    #[must_use]
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Triangles as index triples.
    pub fn triangles(&self) -> impl Iterator<Item = [u32; 3]> + '_ {
        self.indices.chunks_exact(3).map(|t| [t[0], t[1], t[2]])
    }
}

#[expect(
    clippy::cast_possible_truncation,
    reason = "surface meshes stay far below u32::MAX vertices"
)]
fn vertex_index(i: usize) -> u32 {
    i as u32
}

/// Triangulates row-major grid points; `None` marks a cell without a value.
///
/// Each 2×2 block of cells yields two triangles when all four corners are
/// valid and one when exactly three are.
#[must_use]
pub fn triangulate(grid: GridSize, points: &[Option<Vec3>]) -> TriangleMesh {
    let mut mesh = TriangleMesh::default();
    let mut remap = vec![None; points.len()];
    for (slot, point) in remap.iter_mut().zip(points) {
        if let Some(p) = point {
            *slot = Some(vertex_index(mesh.positions.len()));
            mesh.positions.push(*p);
        }
    }
    let at = |row: usize, col: usize| {
        grid.index(row, col)
            .ok()
            .and_then(|i| remap.get(i).copied().flatten())
    };

    for row in 0..grid.rows.saturating_sub(1) {
        for col in 0..grid.cols.saturating_sub(1) {
            // Counter-clockwise around the block, seen from above.
            let ring = [
                at(row, col),
                at(row, col + 1),
                at(row + 1, col + 1),
                at(row + 1, col),
            ];
            match ring {
                [Some(a), Some(b), Some(c), Some(d)] => {
                    mesh.indices.extend_from_slice(&[a, b, c, a, c, d]);
                }
                _ => {
                    let valid: Vec<u32> = ring.into_iter().flatten().collect();
                    if let [a, b, c] = valid[..] {
                        mesh.indices.extend_from_slice(&[a, b, c]);
                    }
                }
            }
        }
    }
    mesh
}

/// Splits every triangle into four, `levels` times.
///
/// Edge midpoints are shared between the triangles on either side. Normals
/// are cleared.
pub fn subdivide(mesh: &mut TriangleMesh, levels: u32) {
    for _ in 0..levels {
        let mut midpoints: HashMap<(u32, u32), u32> = HashMap::new();
        let mut indices = Vec::with_capacity(mesh.indices.len() * 4);
        let triangles: Vec<[u32; 3]> = mesh.triangles().collect();
        for [a, b, c] in triangles {
            let ab = midpoint(&mut mesh.positions, &mut midpoints, a, b);
            let bc = midpoint(&mut mesh.positions, &mut midpoints, b, c);
            let ca = midpoint(&mut mesh.positions, &mut midpoints, c, a);
            indices.extend_from_slice(&[a, ab, ca, ab, b, bc, ca, bc, c, ab, bc, ca]);
        }
        mesh.indices = indices;
    }
    mesh.normals.clear();
}

fn midpoint(
    positions: &mut Vec<Vec3>,
    cache: &mut HashMap<(u32, u32), u32>,
    a: u32,
    b: u32,
) -> u32 {
    *cache.entry((a.min(b), a.max(b))).or_insert_with(|| {
        let m = (positions[a as usize] + positions[b as usize]) * 0.5;
        positions.push(m);
        vertex_index(positions.len() - 1)
    })
}

/// Laplacian smoothing of heights.
///
/// Each iteration moves every vertex's z toward the mean z of its edge
/// neighbors by `weight` (clamped to `0.0..=1.0`). x and y are untouched.
pub fn smooth(mesh: &mut TriangleMesh, iterations: u32, weight: f64) {
    let weight = weight.clamp(0.0, 1.0);
    if iterations == 0 || weight == 0.0 || weight.is_nan() {
        return;
    }
    let adjacency = adjacency(mesh);
    let mut next = vec![0.0; mesh.positions.len()];
    for _ in 0..iterations {
        for (i, neighbors) in adjacency.iter().enumerate() {
            let z = mesh.positions[i].z;
            next[i] = if neighbors.is_empty() {
                z
            } else {
                let sum: f64 = neighbors
                    .iter()
                    .map(|&j| mesh.positions[j as usize].z)
                    .sum();
                let mean = sum / neighbors.len() as f64;
                z + (mean - z) * weight
            };
        }
        for (p, &z) in mesh.positions.iter_mut().zip(&next) {
            p.z = z;
        }
    }
}

fn adjacency(mesh: &TriangleMesh) -> Vec<Vec<u32>> {
    let mut adjacency: Vec<Vec<u32>> = vec![Vec::new(); mesh.positions.len()];
    let mut link = |a: u32, b: u32| {
        let list = &mut adjacency[a as usize];
        if !list.contains(&b) {
            list.push(b);
        }
    };
    for [a, b, c] in mesh.triangles() {
        for (p, q) in [(a, b), (b, c), (c, a)] {
            link(p, q);
            link(q, p);
        }
    }
    adjacency
}

/// Area-weighted average of adjacent face normals, per vertex.
///
/// Vertices without a face get +z.
pub fn compute_normals(mesh: &mut TriangleMesh) {
    let mut sums = vec![Vec3::ZERO; mesh.positions.len()];
    for [a, b, c] in mesh.triangles() {
        let (a, b, c) = (a as usize, b as usize, c as usize);
        let p = &mesh.positions;
        let n = (p[b] - p[a]).cross(p[c] - p[a]);
        for i in [a, b, c] {
            sums[i] = sums[i] + n;
        }
    }
    mesh.normals = sums
        .into_iter()
        .map(|n| n.normalize_or(Vec3::UNIT_Z))
        .collect();
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn grid_points(heights: &[Option<f64>], cols: usize) -> Vec<Option<Vec3>> {
        heights
            .iter()
            .enumerate()
            .map(|(i, h)| h.map(|z| Vec3::new((i % cols) as f64, (i / cols) as f64, z)))
            .collect()
    }

    #[test]
    fn full_block_makes_two_upward_triangles() {
        let points = grid_points(&[Some(1.0); 4], 2);
        let mut mesh = triangulate(GridSize::new(2, 2), &points);
        assert_eq!(mesh.vertex_count(), 4);
        assert_eq!(mesh.triangle_count(), 2);
        compute_normals(&mut mesh);
        for n in &mesh.normals {
            assert!((n.z - 1.0).abs() < EPS, "flat surface faces up, got {n:?}");
        }
    }

    #[test]
    fn three_valid_corners_make_one_triangle() {
        let points = grid_points(&[Some(1.0), None, Some(1.0), Some(1.0)], 2);
        let mut mesh = triangulate(GridSize::new(2, 2), &points);
        assert_eq!(mesh.vertex_count(), 3);
        assert_eq!(mesh.triangle_count(), 1);
        compute_normals(&mut mesh);
        assert!(mesh.normals[0].z > 0.0, "winding stays counter-clockwise");
    }

    #[test]
    fn two_valid_corners_make_nothing() {
        let points = grid_points(&[Some(1.0), None, None, Some(1.0)], 2);
        let mesh = triangulate(GridSize::new(2, 2), &points);
        assert_eq!(mesh.triangle_count(), 0);
    }

    #[test]
    fn subdivision_shares_edge_midpoints() {
        let points = grid_points(&[Some(0.0); 4], 2);
        let mut mesh = triangulate(GridSize::new(2, 2), &points);
        subdivide(&mut mesh, 1);
        // Four corners plus five edge midpoints (four sides and the diagonal).
        assert_eq!(mesh.vertex_count(), 9);
        assert_eq!(mesh.triangle_count(), 8);

        subdivide(&mut mesh, 1);
        assert_eq!(mesh.triangle_count(), 32);
        assert_eq!(mesh.vertex_count(), 25);
    }

    #[test]
    fn smoothing_pulls_spikes_down_and_keeps_flat_flat() {
        let mut flat = triangulate(GridSize::new(3, 3), &grid_points(&[Some(2.0); 9], 3));
        smooth(&mut flat, 4, 0.5);
        assert!(flat.positions.iter().all(|p| (p.z - 2.0).abs() < EPS), "flat stays flat");

        let mut heights = [Some(0.0); 9];
        heights[4] = Some(10.0);
        let mut spiky = triangulate(GridSize::new(3, 3), &grid_points(&heights, 3));
        let before = spiky.positions[4];
        smooth(&mut spiky, 1, 0.5);
        let after = spiky.positions[4];
        assert!(after.z < before.z, "spike is lowered");
        assert_eq!((after.x, after.y), (before.x, before.y), "only z moves");
    }

    #[test]
    fn zero_weight_is_a_no_op() {
        let mut heights = [Some(0.0); 4];
        heights[0] = Some(3.0);
        let mut mesh = triangulate(GridSize::new(2, 2), &grid_points(&heights, 2));
        let before = mesh.clone();
        smooth(&mut mesh, 10, 0.0);
        assert_eq!(mesh, before);
    }
}
