// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Attributes: the renderable facets of a layer.
//!
//! Each [`Attribute`] turns a layer's cells into one scene node. All variants
//! share an [`AttributeBase`] holding the name, dirty and visibility flags,
//! an optional color override, and the node produced by the last build.
//!
//! # Build protocol
//!
//! Every variant follows the same gate before doing any work:
//!
//! 1. Without a document or a layer, return an empty group and stay dirty.
//! 2. If clean and a node is cached, return the cached node.
//! 3. If the layer is hidden, return an empty group and stay dirty.
//! 4. If the attribute is hidden or the grid is smaller than 2×2, cache an
//!    empty group.
//! 5. Otherwise build, cache, and clear the dirty flag.
//!
//! Colors are computed from raw cell elevations (or values) before
//! placement, so offsets and unit conversions never shift the color ramp.

mod boundary;
mod head;
mod pick;
mod quads;
pub mod surface;

pub use boundary::CellBoundary;
pub use head::{HeadLevels, HeadSurface, HeadSurfaceOptions, NO_DATA_SCALE, is_no_data};
pub use pick::CellIndexMap;
pub use quads::{Boxes, Quads};

use crate::color::{ColorRamp, ZRange};
use crate::document::{Document, GRID_OFFSET};
use crate::geometry::{Faces, Placement, QuadBuffers};
use crate::layer::LayerView;
use crate::scene::{Geometry, Primitive, SceneNode};
use crate::trace::{AttributeKind, BuildOutcome, EmptyReason};

// ---------------------------------------------------------------------------
// AttributeBase
// ---------------------------------------------------------------------------

/// State shared by every attribute variant.
#[derive(Clone, Debug)]
pub struct AttributeBase {
    name: String,
    dirty: bool,
    visible: bool,
    colors: Option<ColorRamp>,
    cached: Option<SceneNode>,
}

/// Result of the common build gate.
pub(crate) enum Prepared<'a, 'v> {
    /// Go ahead and build.
    Build(&'a dyn Document, &'a LayerView<'v>),
    /// Return this node without building.
    Skip(SceneNode, BuildOutcome),
}

impl AttributeBase {
    /// Creates a dirty, visible base with document colors.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            dirty: true,
            visible: true,
            colors: None,
            cached: None,
        }
    }

    /// Attribute name.
    #[must_use]
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the cached node is stale.
    #[must_use]
    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Forces a rebuild on the next build call.
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Whether the attribute is drawn.
    #[must_use]
    #[inline]
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Shows or hides the attribute. Returns `false` if nothing changed.
    pub fn set_visible(&mut self, visible: bool) -> bool {
        if self.visible == visible {
            return false;
        }
        self.visible = visible;
        self.dirty = true;
        true
    }

    /// Color override, if any.
    #[must_use]
    pub fn colors(&self) -> Option<ColorRamp> {
        self.colors
    }

    /// Overrides the document colors. `None` goes back to them.
    pub fn set_colors(&mut self, colors: Option<ColorRamp>) {
        if self.colors != colors {
            self.colors = colors;
            self.dirty = true;
        }
    }

    /// The node from the last build.
    #[must_use]
    pub fn cached(&self) -> Option<&SceneNode> {
        self.cached.as_ref()
    }

    /// The override, or the ramp between two named document colors.
    pub(crate) fn ramp(&self, doc: &dyn Document, min: &str, max: &str) -> ColorRamp {
        self.colors
            .unwrap_or_else(|| doc.color_ramp(min, max, ColorRamp::default()))
    }

    /// Runs the common gate described in the module docs.
    pub(crate) fn prepare<'a, 'v>(
        &mut self,
        doc: Option<&'a dyn Document>,
        layer: Option<&'a LayerView<'v>>,
    ) -> Prepared<'a, 'v> {
        let Some(doc) = doc else {
            return self.skip_dirty(EmptyReason::NoDocument);
        };
        let Some(layer) = layer else {
            return self.skip_dirty(EmptyReason::NoLayer);
        };
        if !self.dirty
            && let Some(node) = &self.cached
        {
            return Prepared::Skip(node.clone(), BuildOutcome::Cached);
        }
        if !layer.visible {
            return self.skip_dirty(EmptyReason::LayerHidden);
        }
        let reason = if !self.visible {
            EmptyReason::AttributeHidden
        } else if !layer.grid.is_drawable() {
            EmptyReason::GridTooSmall
        } else {
            return Prepared::Build(doc, layer);
        };
        let node = self.store(SceneNode::empty(self.name.clone()));
        Prepared::Skip(node, BuildOutcome::Empty(reason))
    }

    /// Caches `node`, clears the dirty flag, and hands `node` back.
    pub(crate) fn store(&mut self, node: SceneNode) -> SceneNode {
        self.dirty = false;
        self.cached = Some(node.clone());
        node
    }

    /// Replaces the cached node without touching the dirty flag.
    pub(crate) fn replace_cached(&mut self, node: SceneNode) {
        if self.cached.is_some() {
            self.cached = Some(node);
        }
    }

    fn skip_dirty<'a, 'v>(&self, reason: EmptyReason) -> Prepared<'a, 'v> {
        Prepared::Skip(
            SceneNode::empty(self.name.clone()),
            BuildOutcome::Empty(reason),
        )
    }
}

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

/// Grid placement from the document's grid offset and length conversion.
pub(crate) fn grid_placement(doc: &dyn Document) -> Placement {
    Placement::new(doc.offset(GRID_OFFSET), doc.length_conversion())
}

/// Colors quads by raw elevation, then maps positions through the
/// document transform.
pub(crate) fn quad_geometry(
    buffers: QuadBuffers,
    ramp: &ColorRamp,
    range: ZRange,
    doc: &dyn Document,
) -> Geometry {
    let QuadBuffers {
        mut positions,
        normals,
        raw_z,
    } = buffers;
    let colors = raw_z.iter().map(|&z| ramp.at(z, range)).collect();
    doc.transform_coordinates(&mut positions);
    Geometry {
        primitive: Primitive::Quads,
        positions,
        normals,
        colors,
        indices: Vec::new(),
    }
}

// ---------------------------------------------------------------------------
// Attribute
// ---------------------------------------------------------------------------

/// A renderable facet of a layer.
#[derive(Clone, Debug)]
pub enum Attribute {
    /// Selected faces of every cell box.
    Quads(Quads),
    /// All six faces of every cell box.
    Boxes(Boxes),
    /// Per-direction face groups.
    CellBoundary(CellBoundary),
    /// Time-stepped boxes up to the head level.
    HeadLevels(HeadLevels),
    /// Time-stepped smoothed head surface.
    HeadSurface(HeadSurface),
}

impl Attribute {
    fn base(&self) -> &AttributeBase {
        match self {
            Self::Quads(a) => a.base(),
            Self::Boxes(a) => a.base(),
            Self::CellBoundary(a) => a.base(),
            Self::HeadLevels(a) => a.base(),
            Self::HeadSurface(a) => a.base(),
        }
    }

    /// Attribute name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.base().name()
    }

    /// Which variant this is.
    #[must_use]
    pub fn kind(&self) -> AttributeKind {
        match self {
            Self::Quads(_) => AttributeKind::Quads,
            Self::Boxes(_) => AttributeKind::Boxes,
            Self::CellBoundary(_) => AttributeKind::CellBoundary,
            Self::HeadLevels(_) => AttributeKind::HeadLevels,
            Self::HeadSurface(_) => AttributeKind::HeadSurface,
        }
    }

    /// Whether the cached node is stale.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        match self {
            Self::CellBoundary(a) => a.is_dirty(),
            _ => self.base().is_dirty(),
        }
    }

    /// Forces a rebuild on the next build call.
    pub fn mark_dirty(&mut self) {
        match self {
            Self::Quads(a) => a.base_mut().mark_dirty(),
            Self::Boxes(a) => a.base_mut().mark_dirty(),
            Self::CellBoundary(a) => a.mark_dirty(),
            Self::HeadLevels(a) => a.base_mut().mark_dirty(),
            Self::HeadSurface(a) => a.base_mut().mark_dirty(),
        }
    }

    /// Whether the attribute is drawn.
    #[must_use]
    pub fn is_visible(&self) -> bool {
        self.base().is_visible()
    }

    /// Shows or hides the attribute. Returns `false` if nothing changed.
    pub fn set_visible(&mut self, visible: bool) -> bool {
        match self {
            Self::Quads(a) => a.base_mut().set_visible(visible),
            Self::Boxes(a) => a.base_mut().set_visible(visible),
            Self::CellBoundary(a) => a.set_visible(visible),
            Self::HeadLevels(a) => a.base_mut().set_visible(visible),
            Self::HeadSurface(a) => a.base_mut().set_visible(visible),
        }
    }

    /// Overrides the document colors. `None` goes back to them.
    pub fn set_colors(&mut self, colors: Option<ColorRamp>) {
        match self {
            Self::Quads(a) => a.base_mut().set_colors(colors),
            Self::Boxes(a) => a.base_mut().set_colors(colors),
            Self::CellBoundary(a) => a.set_colors(colors),
            Self::HeadLevels(a) => a.base_mut().set_colors(colors),
            Self::HeadSurface(a) => a.base_mut().set_colors(colors),
        }
    }

    /// Whether the geometry depends on neighboring layers.
    #[must_use]
    pub fn uses_neighbors(&self) -> bool {
        match self {
            Self::Quads(a) => a.culling(),
            Self::Boxes(a) => a.culling(),
            Self::CellBoundary(a) => a.culling(),
            Self::HeadLevels(_) | Self::HeadSurface(_) => false,
        }
    }

    /// Box faces this attribute draws, and the subset it draws whatever the
    /// neighbors are. Only visible face attributes draw any.
    #[must_use]
    pub fn drawn_faces(&self) -> (Faces, Faces) {
        match self {
            Self::Quads(a) => a.drawn_faces(),
            Self::Boxes(a) => a.drawn_faces(),
            Self::CellBoundary(a) => a.drawn_faces(),
            Self::HeadLevels(_) | Self::HeadSurface(_) => (Faces::NONE, Faces::NONE),
        }
    }

    /// The node from the last build.
    #[must_use]
    pub fn cached(&self) -> Option<SceneNode> {
        self.base().cached().cloned()
    }

    /// Builds (or returns the cached) node for this attribute.
    pub fn build_scene(
        &mut self,
        doc: Option<&dyn Document>,
        layer: Option<&LayerView<'_>>,
    ) -> SceneNode {
        self.build(doc, layer).0
    }

    pub(crate) fn build(
        &mut self,
        doc: Option<&dyn Document>,
        layer: Option<&LayerView<'_>>,
    ) -> (SceneNode, BuildOutcome) {
        match self {
            Self::Quads(a) => a.build(doc, layer),
            Self::Boxes(a) => a.build(doc, layer),
            Self::CellBoundary(a) => a.build(doc, layer),
            Self::HeadLevels(a) => a.build(doc, layer),
            Self::HeadSurface(a) => a.build(doc, layer),
        }
    }

    /// Selects the displayed time step. Returns `true` if it changed.
    ///
    /// Only time-stepped variants react.
    pub fn update(&mut self, time_step: usize) -> bool {
        match self {
            Self::HeadLevels(a) => a.update(time_step),
            Self::HeadSurface(a) => a.update(time_step),
            _ => false,
        }
    }

    /// Cell index that produced `vertex` in the last build.
    #[must_use]
    pub fn cell_for_vertex(&self, vertex: usize) -> Option<usize> {
        match self {
            Self::Quads(a) => a.picks().cell_for_vertex(vertex),
            Self::Boxes(a) => a.picks().cell_for_vertex(vertex),
            Self::CellBoundary(a) => a.cell_for_vertex(vertex),
            Self::HeadLevels(_) | Self::HeadSurface(_) => None,
        }
    }
}

impl From<Quads> for Attribute {
    fn from(a: Quads) -> Self {
        Self::Quads(a)
    }
}

impl From<Boxes> for Attribute {
    fn from(a: Boxes) -> Self {
        Self::Boxes(a)
    }
}

impl From<CellBoundary> for Attribute {
    fn from(a: CellBoundary) -> Self {
        Self::CellBoundary(a)
    }
}

impl From<HeadLevels> for Attribute {
    fn from(a: HeadLevels) -> Self {
        Self::HeadLevels(a)
    }
}

impl From<HeadSurface> for Attribute {
    fn from(a: HeadSurface) -> Self {
        Self::HeadSurface(a)
    }
}
