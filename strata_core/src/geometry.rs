// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Procedural quad generation for the faces of a rectangular cell.
//!
//! Every cell of a layer is drawn as an axis-aligned box centered on the
//! cell's `(x, y)` position. The builders here append one quad (four
//! vertices, four identical normals) per selected face into caller-owned
//! buffers and hold no state of their own.
//!
//! Quads are wound counter-clockwise when seen from outside the box, so the
//! cross product of the first two edges points along the face normal:
//!
//! | Face     | Normal       |
//! |----------|--------------|
//! | `TOP`    | `( 0, 0, 1)` |
//! | `BOTTOM` | `( 0, 0,-1)` |
//! | `EAST`   | `( 1, 0, 0)` |
//! | `WEST`   | `(-1, 0, 0)` |
//! | `NORTH`  | `( 0, 1, 0)` |
//! | `SOUTH`  | `( 0,-1, 0)` |
//!
//! All positions pass through a [`Placement`]: `offset + raw * scale`.

use core::ops::{Add, BitOr, BitOrAssign, Mul, Neg, Sub};

use kurbo::{Point, Size, Vec2};

use crate::layer::Margin;

/// A 3-D vector or point in model space.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Vec3 {
    /// East coordinate.
    pub x: f64,
    /// North coordinate.
    pub y: f64,
    /// Elevation.
    pub z: f64,
}

impl Vec3 {
    /// The origin.
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);
    /// Unit vector along +z.
    pub const UNIT_Z: Self = Self::new(0.0, 0.0, 1.0);

    /// Creates a vector from its components.
    #[inline]
    #[must_use]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Dot product.
    #[inline]
    #[must_use]
    pub fn dot(self, rhs: Self) -> f64 {
        self.x * rhs.x + self.y * rhs.y + self.z * rhs.z
    }

    /// Cross product.
    #[inline]
    #[must_use]
    pub fn cross(self, rhs: Self) -> Self {
        Self::new(
            self.y * rhs.z - self.z * rhs.y,
            self.z * rhs.x - self.x * rhs.z,
            self.x * rhs.y - self.y * rhs.x,
        )
    }

    /// Euclidean length.
    #[inline]
    #[must_use]
    pub fn length(self) -> f64 {
        self.dot(self).sqrt()
    }

    /// Returns the unit vector in the same direction, or `fallback` for a
    /// zero-length vector.
    #[must_use]
    pub fn normalize_or(self, fallback: Self) -> Self {
        let len = self.length();
        if len > 0.0 && len.is_finite() {
            self * (1.0 / len)
        } else {
            fallback
        }
    }

    /// Converts to a single-precision array for GPU upload.
    #[inline]
    #[must_use]
    #[expect(
        clippy::cast_possible_truncation,
        reason = "GPU buffers are single precision"
    )]
    pub fn to_f32(self) -> [f32; 3] {
        [self.x as f32, self.y as f32, self.z as f32]
    }
}

impl Add for Vec3 {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Vec3 {
    type Output = Self;

    #[inline]
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f64> for Vec3 {
    type Output = Self;

    #[inline]
    fn mul(self, rhs: f64) -> Self {
        Self::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

impl Neg for Vec3 {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Self::new(-self.x, -self.y, -self.z)
    }
}

/// One face of a cell box.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Face {
    /// Upper horizontal face.
    Top,
    /// Lower horizontal face.
    Bottom,
    /// Face at `x + half_x`.
    East,
    /// Face at `x - half_x`.
    West,
    /// Face at `y + half_y`.
    North,
    /// Face at `y - half_y`.
    South,
}

impl Face {
    /// All faces, in emission order.
    pub const ALL: [Self; 6] = [
        Self::Top,
        Self::Bottom,
        Self::East,
        Self::West,
        Self::North,
        Self::South,
    ];

    /// Outward unit normal.
    #[must_use]
    pub const fn normal(self) -> Vec3 {
        match self {
            Self::Top => Vec3::new(0.0, 0.0, 1.0),
            Self::Bottom => Vec3::new(0.0, 0.0, -1.0),
            Self::East => Vec3::new(1.0, 0.0, 0.0),
            Self::West => Vec3::new(-1.0, 0.0, 0.0),
            Self::North => Vec3::new(0.0, 1.0, 0.0),
            Self::South => Vec3::new(0.0, -1.0, 0.0),
        }
    }

    /// The single-face [`Faces`] set for this face.
    #[must_use]
    pub const fn flag(self) -> Faces {
        match self {
            Self::Top => Faces::TOP,
            Self::Bottom => Faces::BOTTOM,
            Self::East => Faces::EAST,
            Self::West => Faces::WEST,
            Self::North => Faces::NORTH,
            Self::South => Faces::SOUTH,
        }
    }

    /// Lower-case name, used for attribute and node names.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Top => "top",
            Self::Bottom => "bottom",
            Self::East => "east",
            Self::West => "west",
            Self::North => "north",
            Self::South => "south",
        }
    }
}

/// A set of cell faces, stored as a bit field.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Faces(u8);

impl Faces {
    /// No faces.
    pub const NONE: Self = Self(0);
    /// Upper face.
    pub const TOP: Self = Self(1 << 0);
    /// Lower face.
    pub const BOTTOM: Self = Self(1 << 1);
    /// `+x` face.
    pub const EAST: Self = Self(1 << 2);
    /// `-x` face.
    pub const WEST: Self = Self(1 << 3);
    /// `+y` face.
    pub const NORTH: Self = Self(1 << 4);
    /// `-y` face.
    pub const SOUTH: Self = Self(1 << 5);
    /// The four vertical faces.
    pub const SIDES: Self = Self(Self::EAST.0 | Self::WEST.0 | Self::NORTH.0 | Self::SOUTH.0);
    /// All six faces.
    pub const ALL: Self = Self(Self::TOP.0 | Self::BOTTOM.0 | Self::SIDES.0);

    /// Builds a set from raw bits; bits above the six face flags are ignored.
    #[must_use]
    pub const fn from_bits_truncate(bits: u8) -> Self {
        Self(bits & Self::ALL.0)
    }

    /// Raw bit value.
    #[must_use]
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Returns `true` if every face in `other` is in `self`.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Returns `true` if no face is selected.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Returns `self` without the faces in `other`.
    #[must_use]
    pub const fn without(self, other: Self) -> Self {
        Self(self.0 & !other.0)
    }

    /// Number of selected faces.
    #[must_use]
    pub const fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    /// Iterates the selected faces in emission order.
    pub fn iter(self) -> impl Iterator<Item = Face> {
        Face::ALL.into_iter().filter(move |f| self.contains(f.flag()))
    }
}

impl BitOr for Faces {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for Faces {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl From<Face> for Faces {
    fn from(face: Face) -> Self {
        face.flag()
    }
}

/// Uniform offset and scale applied to every emitted position.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Placement {
    /// Added after scaling.
    pub offset: Vec3,
    /// Length conversion factor.
    pub scale: f64,
}

impl Placement {
    /// Offset zero, scale one.
    pub const IDENTITY: Self = Self {
        offset: Vec3::ZERO,
        scale: 1.0,
    };

    /// Creates a placement.
    #[must_use]
    pub const fn new(offset: Vec3, scale: f64) -> Self {
        Self { offset, scale }
    }

    /// Maps a raw model-space position.
    #[inline]
    #[must_use]
    pub fn apply(&self, raw: Vec3) -> Vec3 {
        self.offset + raw * self.scale
    }
}

impl Default for Placement {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// The box drawn for one cell.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CellBox {
    /// Planar center.
    pub center: Point,
    /// Elevation of the upper face.
    pub top: f64,
    /// Elevation of the lower face.
    pub bottom: f64,
    /// Half-extents along x and y.
    pub half: Vec2,
}

impl CellBox {
    /// Builds the box of a cell, inset by `margin`.
    ///
    /// The horizontal half-extents are `(cell_size - margin) / 2`, floored
    /// at zero. The vertical margin trims `margin.z / 2` from each end but
    /// never inverts the box.
    #[must_use]
    pub fn new(center: Point, top: f64, bottom: f64, cell_size: Size, margin: Margin) -> Self {
        let half = Vec2::new(
            ((cell_size.width - margin.x) * 0.5).max(0.0),
            ((cell_size.height - margin.y) * 0.5).max(0.0),
        );
        let inset = (margin.z * 0.5).min((top - bottom).max(0.0) * 0.5).max(0.0);
        Self {
            center,
            top: top - inset,
            bottom: bottom + inset,
            half,
        }
    }

    /// Raw (unplaced) corners of `face`, counter-clockwise from outside.
    #[must_use]
    pub fn corners(&self, face: Face) -> [Vec3; 4] {
        let (x0, x1) = (self.center.x - self.half.x, self.center.x + self.half.x);
        let (y0, y1) = (self.center.y - self.half.y, self.center.y + self.half.y);
        let (zb, zt) = (self.bottom, self.top);
        match face {
            Face::Top => [
                Vec3::new(x0, y0, zt),
                Vec3::new(x1, y0, zt),
                Vec3::new(x1, y1, zt),
                Vec3::new(x0, y1, zt),
            ],
            Face::Bottom => [
                Vec3::new(x0, y0, zb),
                Vec3::new(x0, y1, zb),
                Vec3::new(x1, y1, zb),
                Vec3::new(x1, y0, zb),
            ],
            Face::East => [
                Vec3::new(x1, y0, zb),
                Vec3::new(x1, y1, zb),
                Vec3::new(x1, y1, zt),
                Vec3::new(x1, y0, zt),
            ],
            Face::West => [
                Vec3::new(x0, y1, zb),
                Vec3::new(x0, y0, zb),
                Vec3::new(x0, y0, zt),
                Vec3::new(x0, y1, zt),
            ],
            Face::North => [
                Vec3::new(x1, y1, zb),
                Vec3::new(x0, y1, zb),
                Vec3::new(x0, y1, zt),
                Vec3::new(x1, y1, zt),
            ],
            Face::South => [
                Vec3::new(x0, y0, zb),
                Vec3::new(x1, y0, zb),
                Vec3::new(x1, y0, zt),
                Vec3::new(x0, y0, zt),
            ],
        }
    }
}

/// Growable position/normal buffers that builders append to.
///
/// `raw_z` keeps each vertex's elevation before placement so colors can be
/// computed against a model-space elevation range.
#[derive(Clone, Debug, Default)]
pub struct QuadBuffers {
    /// Placed vertex positions, four per quad.
    pub positions: Vec<Vec3>,
    /// One normal per position.
    pub normals: Vec<Vec3>,
    /// Unplaced elevation of each position.
    pub raw_z: Vec<f64>,
}

impl QuadBuffers {
    /// Creates empty buffers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates buffers with room for `quads` quads.
    #[must_use]
    pub fn with_quad_capacity(quads: usize) -> Self {
        Self {
            positions: Vec::with_capacity(quads * 4),
            normals: Vec::with_capacity(quads * 4),
            raw_z: Vec::with_capacity(quads * 4),
        }
    }

    /// Number of vertices written so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// Returns `true` if nothing has been written.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Number of complete quads written so far.
    #[must_use]
    pub fn quad_count(&self) -> usize {
        self.positions.len() / 4
    }

    fn push_quad(&mut self, corners: [Vec3; 4], normal: Vec3, placement: &Placement) {
        for c in corners {
            self.positions.push(placement.apply(c));
            self.normals.push(normal);
            self.raw_z.push(c.z);
        }
    }
}

/// Appends one quad per face in `faces` for `cell`.
///
/// Faces are written in [`Face::ALL`] order. Returns the number of quads
/// written.
pub fn append_faces(
    faces: Faces,
    cell: &CellBox,
    placement: &Placement,
    out: &mut QuadBuffers,
) -> usize {
    let mut written = 0;
    for face in faces.iter() {
        out.push_quad(cell.corners(face), face.normal(), placement);
        written += 1;
    }
    written
}

/// A single-face builder with its own dimensions.
///
/// Head-level boxes use one wall per direction so each direction can be
/// batched into its own geometry.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CellWall {
    /// Which face this wall draws.
    pub face: Face,
    /// Horizontal half-extents.
    pub half: Vec2,
    /// Total vertical inset (half at each end).
    pub vertical_margin: f64,
}

impl CellWall {
    /// Creates a wall for cells of `cell_size` inset by `margin`.
    #[must_use]
    pub fn new(face: Face, cell_size: Size, margin: Margin) -> Self {
        Self {
            face,
            half: Vec2::new(
                ((cell_size.width - margin.x) * 0.5).max(0.0),
                ((cell_size.height - margin.y) * 0.5).max(0.0),
            ),
            vertical_margin: margin.z,
        }
    }

    /// Appends this wall's quad for a box at `center` spanning
    /// `bottom..top`.
    pub fn append(
        &self,
        center: Point,
        top: f64,
        bottom: f64,
        placement: &Placement,
        out: &mut QuadBuffers,
    ) {
        let inset = (self.vertical_margin * 0.5)
            .min((top - bottom).max(0.0) * 0.5)
            .max(0.0);
        let cell = CellBox {
            center,
            top: top - inset,
            bottom: bottom + inset,
            half: self.half,
        };
        out.push_quad(cell.corners(self.face), self.face.normal(), placement);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn sample_box() -> CellBox {
        CellBox::new(
            Point::new(15.0, -4.0),
            12.5,
            -3.0,
            Size::new(10.0, 6.0),
            Margin::new(1.0, 2.0, 0.0),
        )
    }

    #[test]
    fn faces_set_operations() {
        let f = Faces::TOP | Faces::EAST;
        assert!(f.contains(Faces::TOP));
        assert!(!f.contains(Faces::BOTTOM));
        assert_eq!(f.len(), 2);
        assert_eq!(f.without(Faces::TOP), Faces::EAST);
        assert_eq!(Faces::ALL.len(), 6);
        assert_eq!(Faces::from_bits_truncate(0xff), Faces::ALL);
        assert!(Faces::NONE.is_empty());
    }

    #[test]
    fn each_face_emits_four_vertices_with_its_normal() {
        let cell = sample_box();
        for face in Face::ALL {
            let mut out = QuadBuffers::new();
            let n = append_faces(face.flag(), &cell, &Placement::IDENTITY, &mut out);
            assert_eq!(n, 1, "one quad for {face:?}");
            assert_eq!(out.positions.len(), 4, "four vertices for {face:?}");
            assert_eq!(out.normals.len(), 4, "four normals for {face:?}");
            assert!(
                out.normals.iter().all(|&n| n == face.normal()),
                "normals of {face:?} must be axis-aligned"
            );
        }
    }

    #[test]
    fn winding_matches_outward_normal() {
        let cell = sample_box();
        for face in Face::ALL {
            let p = cell.corners(face);
            let normal = face.normal();
            // Every consecutive corner triple turns the same way.
            for i in 0..4 {
                let a = p[i];
                let b = p[(i + 1) % 4];
                let c = p[(i + 2) % 4];
                let turn = (b - a).cross(c - b);
                assert!(
                    turn.dot(normal) > 0.0,
                    "{face:?} corner {i} winds against its normal"
                );
            }
        }
    }

    #[test]
    fn corners_are_coplanar() {
        let cell = sample_box();
        for face in Face::ALL {
            let p = cell.corners(face);
            let n = face.normal();
            let d0 = p[0].dot(n);
            for (i, c) in p.iter().enumerate() {
                assert!(
                    (c.dot(n) - d0).abs() < EPS,
                    "{face:?} corner {i} leaves the face plane"
                );
            }
        }
    }

    #[test]
    fn placement_is_affine_in_raw_positions() {
        let cell = sample_box();
        let mut raw = QuadBuffers::new();
        append_faces(Faces::ALL, &cell, &Placement::IDENTITY, &mut raw);

        let placement = Placement::new(Vec3::new(100.0, -50.0, 7.5), 0.3048);
        let mut placed = QuadBuffers::new();
        append_faces(Faces::ALL, &cell, &placement, &mut placed);

        assert_eq!(raw.len(), placed.len());
        for (r, p) in raw.positions.iter().zip(&placed.positions) {
            let expected = placement.offset + *r * placement.scale;
            assert!((expected - *p).length() < EPS, "placed {p:?} != {expected:?}");
        }
        assert_eq!(raw.normals, placed.normals);
        assert_eq!(raw.raw_z, placed.raw_z);
    }

    #[test]
    fn margin_shrinks_half_extents() {
        let cell = sample_box();
        assert!((cell.half.x - 4.5).abs() < EPS);
        assert!((cell.half.y - 2.0).abs() < EPS);
        assert_eq!(cell.top, 12.5);
        assert_eq!(cell.bottom, -3.0);
    }

    #[test]
    fn vertical_margin_never_inverts() {
        let cell = CellBox::new(
            Point::ZERO,
            1.0,
            0.0,
            Size::new(1.0, 1.0),
            Margin::new(0.0, 0.0, 10.0),
        );
        assert!((cell.top - 0.5).abs() < EPS);
        assert!((cell.bottom - 0.5).abs() < EPS);
    }

    #[test]
    fn empty_selection_emits_nothing() {
        let mut out = QuadBuffers::new();
        let n = append_faces(Faces::NONE, &sample_box(), &Placement::IDENTITY, &mut out);
        assert_eq!(n, 0);
        assert!(out.is_empty());
    }

    #[test]
    fn cell_wall_matches_box_face() {
        let size = Size::new(10.0, 6.0);
        let margin = Margin::new(1.0, 2.0, 0.0);
        let center = Point::new(15.0, -4.0);
        for face in Face::ALL {
            let wall = CellWall::new(face, size, margin);
            let mut a = QuadBuffers::new();
            wall.append(center, 12.5, -3.0, &Placement::IDENTITY, &mut a);

            let mut b = QuadBuffers::new();
            append_faces(face.flag(), &sample_box(), &Placement::IDENTITY, &mut b);
            assert_eq!(a.positions, b.positions, "{face:?} wall differs from box face");
        }
    }
}
