// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Scene-graph values handed to the renderer.
//!
//! A [`SceneNode`] is either a [`Group`] of children, a [`Switch`] with at
//! most one active child, or a leaf [`Geometry`] batch. Geometry is held
//! behind an [`Arc`] so cached nodes can be returned by cloning without
//! copying vertex data.

use std::sync::Arc;

use bytemuck::{Pod, Zeroable};

use crate::color::Color;
use crate::geometry::Vec3;

/// How the vertices of a [`Geometry`] are assembled.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Primitive {
    /// Every four consecutive vertices form one quad.
    Quads,
    /// `indices` lists triangles, three indices each.
    Triangles,
}

/// One draw batch.
#[derive(Clone, Debug, PartialEq)]
pub struct Geometry {
    /// Primitive assembly mode.
    pub primitive: Primitive,
    /// Vertex positions.
    pub positions: Vec<Vec3>,
    /// Per-vertex normals.
    pub normals: Vec<Vec3>,
    /// Per-vertex colors.
    pub colors: Vec<Color>,
    /// Triangle indices (empty for [`Primitive::Quads`]).
    pub indices: Vec<u32>,
}

impl Geometry {
    /// Number of vertices.
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Number of quads or triangles.
    #[must_use]
    pub fn primitive_count(&self) -> usize {
        match self.primitive {
            Primitive::Quads => self.positions.len() / 4,
            Primitive::Triangles => self.indices.len() / 3,
        }
    }

    /// Interleaves positions, normals, and colors for GPU upload.
    #[must_use]
    pub fn to_gpu_vertices(&self) -> Vec<GpuVertex> {
        self.positions
            .iter()
            .zip(&self.normals)
            .zip(&self.colors)
            .map(|((p, n), c)| GpuVertex {
                position: p.to_f32(),
                normal: n.to_f32(),
                color: c.to_array(),
            })
            .collect()
    }

    /// Triangle index list for uploading either primitive kind as
    /// triangles.
    #[must_use]
    pub fn triangle_indices(&self) -> Vec<u32> {
        match self.primitive {
            Primitive::Triangles => self.indices.clone(),
            Primitive::Quads => {
                let quads = u32::try_from(self.positions.len() / 4).unwrap_or(u32::MAX);
                let mut out = Vec::with_capacity(quads as usize * 6);
                for q in 0..quads {
                    let b = q * 4;
                    out.extend_from_slice(&[b, b + 1, b + 2, b, b + 2, b + 3]);
                }
                out
            }
        }
    }
}

/// GPU vertex layout: position, normal, color.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct GpuVertex {
    /// Position.
    pub position: [f32; 3],
    /// Normal.
    pub normal: [f32; 3],
    /// RGBA color.
    pub color: [f32; 4],
}

/// An ordered group of child nodes.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Group {
    /// Node name.
    pub name: String,
    /// Children in draw order.
    pub children: Vec<SceneNode>,
}

impl Group {
    /// Creates an empty group.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            children: Vec::new(),
        }
    }
}

/// A node with several children of which at most one is drawn.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Switch {
    /// Node name.
    pub name: String,
    /// All children, drawn or not.
    pub children: Vec<SceneNode>,
    /// Index of the drawn child.
    pub active: Option<usize>,
}

impl Switch {
    /// Creates an empty switch.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            children: Vec::new(),
            active: None,
        }
    }

    /// Activates `index` clamped into the child range; returns whether the
    /// active child changed.
    pub fn set_active_clamped(&mut self, index: usize) -> bool {
        let next = if self.children.is_empty() {
            None
        } else {
            Some(index.min(self.children.len() - 1))
        };
        let changed = next != self.active;
        self.active = next;
        changed
    }

    /// The drawn child, if any.
    #[must_use]
    pub fn active_child(&self) -> Option<&SceneNode> {
        self.active.and_then(|i| self.children.get(i))
    }
}

/// A node of the scene graph.
#[derive(Clone, Debug, PartialEq)]
pub enum SceneNode {
    /// A group of children.
    Group(Group),
    /// A one-of-many selector.
    Switch(Switch),
    /// A draw batch.
    Geometry(Arc<Geometry>),
}

impl SceneNode {
    /// An empty named group.
    #[must_use]
    pub fn empty(name: impl Into<String>) -> Self {
        Self::Group(Group::new(name))
    }

    /// Node name (geometry leaves are unnamed).
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Group(g) => &g.name,
            Self::Switch(s) => &s.name,
            Self::Geometry(_) => "",
        }
    }

    /// Direct children (the full child list for a switch).
    #[must_use]
    pub fn children(&self) -> &[Self] {
        match self {
            Self::Group(g) => &g.children,
            Self::Switch(s) => &s.children,
            Self::Geometry(_) => &[],
        }
    }

    /// Calls `f` on every drawn geometry, depth first.
    ///
    /// Inactive switch children are skipped.
    pub fn visit_geometry<'a>(&'a self, f: &mut impl FnMut(&'a Geometry)) {
        match self {
            Self::Group(g) => {
                for child in &g.children {
                    child.visit_geometry(f);
                }
            }
            Self::Switch(s) => {
                if let Some(child) = s.active_child() {
                    child.visit_geometry(f);
                }
            }
            Self::Geometry(geom) => f(geom.as_ref()),
        }
    }

    /// Drawn geometries, depth first.
    #[must_use]
    pub fn geometries(&self) -> Vec<&Geometry> {
        let mut out = Vec::new();
        self.visit_geometry(&mut |g| out.push(g));
        out
    }

    /// Total drawn vertex count.
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        let mut n = 0;
        self.visit_geometry(&mut |g| n += g.vertex_count());
        n
    }

    /// Number of drawn geometry batches.
    #[must_use]
    pub fn batch_count(&self) -> usize {
        let mut n = 0;
        self.visit_geometry(&mut |_| n += 1);
        n
    }

    /// Returns `true` if nothing would be drawn.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.batch_count() == 0
    }
}
