// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Face quads and full cell boxes.

use std::sync::Arc;

use crate::attribute::{AttributeBase, CellIndexMap, Prepared, grid_placement, quad_geometry};
use crate::document::{Document, ELEVATION_MAX_COLOR, ELEVATION_MIN_COLOR};
use crate::geometry::{CellBox, Faces, QuadBuffers, append_faces};
use crate::layer::LayerView;
use crate::scene::{Geometry, Group, SceneNode};
use crate::trace::BuildOutcome;

/// Draws a chosen set of faces of every active cell as one quad batch.
///
/// Vertices are colored by raw elevation against the document's z range.
/// With culling enabled, faces that a neighboring cell or stacked layer
/// covers are skipped (see [`LayerView::hidden_faces`]).
#[derive(Clone, Debug)]
pub struct Quads {
    base: AttributeBase,
    faces: Faces,
    culling: bool,
    picks: CellIndexMap,
}

impl Quads {
    /// Creates a quad attribute drawing `faces`.
    #[must_use]
    pub fn new(name: impl Into<String>, faces: Faces) -> Self {
        Self {
            base: AttributeBase::new(name),
            faces,
            culling: false,
            picks: CellIndexMap::new(),
        }
    }

    /// Enables or disables face culling.
    #[must_use]
    pub fn with_culling(mut self, culling: bool) -> Self {
        self.culling = culling;
        self
    }

    /// Shared state.
    #[must_use]
    pub fn base(&self) -> &AttributeBase {
        &self.base
    }

    /// Shared state, mutably.
    pub fn base_mut(&mut self) -> &mut AttributeBase {
        &mut self.base
    }

    /// Drawn faces.
    #[must_use]
    pub fn faces(&self) -> Faces {
        self.faces
    }

    /// Changes the drawn faces.
    pub fn set_faces(&mut self, faces: Faces) {
        if self.faces != faces {
            self.faces = faces;
            self.base.mark_dirty();
        }
    }

    /// Whether face culling is on.
    #[must_use]
    pub fn culling(&self) -> bool {
        self.culling
    }

    /// Turns face culling on or off.
    pub fn set_culling(&mut self, culling: bool) {
        if self.culling != culling {
            self.culling = culling;
            self.base.mark_dirty();
        }
    }

    /// Vertex → cell map of the last build.
    #[must_use]
    pub fn picks(&self) -> &CellIndexMap {
        &self.picks
    }

    /// Faces drawn, and the subset drawn whatever the neighbors are.
    ///
    /// Both are empty while the attribute is hidden.
    pub(crate) fn drawn_faces(&self) -> (Faces, Faces) {
        if !self.base.is_visible() {
            return (Faces::NONE, Faces::NONE);
        }
        let unculled = if self.culling { Faces::NONE } else { self.faces };
        (self.faces, unculled)
    }

    /// Builds (or returns the cached) node.
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
        let (doc, layer) = match self.base.prepare(doc, layer) {
            Prepared::Build(doc, layer) => (doc, layer),
            Prepared::Skip(node, outcome) => return (node, outcome),
        };
        let mut group = Group::new(self.base.name());
        if let Some(geometry) = self.build_batch(doc, layer) {
            group.children.push(SceneNode::Geometry(Arc::new(geometry)));
        }
        (self.base.store(SceneNode::Group(group)), BuildOutcome::Rebuilt)
    }

    fn build_batch(&mut self, doc: &dyn Document, layer: &LayerView<'_>) -> Option<Geometry> {
        let placement = grid_placement(doc);
        let ramp = self.base.ramp(doc, ELEVATION_MIN_COLOR, ELEVATION_MAX_COLOR);
        let mut buffers = QuadBuffers::with_quad_capacity(layer.cells.len() * self.faces.len());
        self.picks.reset(layer.cells.len());

        for (index, cell) in layer.cells.iter().enumerate() {
            let Some((top, bottom)) = cell.elevations() else {
                continue;
            };
            let mut faces = self.faces;
            if self.culling {
                faces = faces.without(layer.hidden_faces(cell.row(), cell.col(), top, bottom));
            }
            if faces.is_empty() {
                continue;
            }
            let first = buffers.len();
            let cell_box = CellBox::new(cell.center(), top, bottom, layer.cell_size, layer.margin);
            append_faces(faces, &cell_box, &placement, &mut buffers);
            self.picks.push(first..buffers.len(), index);
        }
        self.picks.shrink_to_fit();

        if buffers.is_empty() {
            return None;
        }
        Some(quad_geometry(buffers, &ramp, doc.z_range(), doc))
    }
}

/// Draws all six faces of every active cell as one quad batch.
#[derive(Clone, Debug)]
pub struct Boxes {
    quads: Quads,
}

impl Boxes {
    /// Creates a box attribute.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            quads: Quads::new(name, Faces::ALL),
        }
    }

    /// Enables or disables face culling.
    #[must_use]
    pub fn with_culling(mut self, culling: bool) -> Self {
        self.quads.culling = culling;
        self
    }

    /// Shared state.
    #[must_use]
    pub fn base(&self) -> &AttributeBase {
        &self.quads.base
    }

    /// Shared state, mutably.
    pub fn base_mut(&mut self) -> &mut AttributeBase {
        &mut self.quads.base
    }

    /// Whether face culling is on.
    #[must_use]
    pub fn culling(&self) -> bool {
        self.quads.culling
    }

    /// Turns face culling on or off.
    pub fn set_culling(&mut self, culling: bool) {
        self.quads.set_culling(culling);
    }

    /// Vertex → cell map of the last build.
    #[must_use]
    pub fn picks(&self) -> &CellIndexMap {
        &self.quads.picks
    }

    pub(crate) fn drawn_faces(&self) -> (Faces, Faces) {
        self.quads.drawn_faces()
    }

    /// Builds (or returns the cached) node.
    pub fn build_scene(
        &mut self,
        doc: Option<&dyn Document>,
        layer: Option<&LayerView<'_>>,
    ) -> SceneNode {
        self.quads.build(doc, layer).0
    }

    pub(crate) fn build(
        &mut self,
        doc: Option<&dyn Document>,
        layer: Option<&LayerView<'_>>,
    ) -> (SceneNode, BuildOutcome) {
        self.quads.build(doc, layer)
    }
}

#[cfg(test)]
mod tests {
    use kurbo::Size;

    use super::*;
    use crate::color::{Color, ColorRamp, ZRange};
    use crate::document::{BasicDocument, DocumentConfig};
    use crate::geometry::Vec3;
    use crate::attribute::HeadLevels;
    use crate::layer::{GridSize, Layer, Margin, NeighborView, Neighbors};
    use crate::trace::EmptyReason;

    fn layer_2x2() -> Layer {
        let layer = Layer::new("l1", GridSize::new(2, 2), Size::new(10.0, 10.0));
        layer
            .z_range(&[10.0, 10.0, 10.0, 10.0], &[0.0, 0.0, 0.0, 0.0])
            .unwrap();
        layer
    }

    fn view<'a>(layer: &'a Layer, margin: Margin, neighbors: Neighbors<'a>) -> LayerView<'a> {
        LayerView {
            name: layer.name(),
            grid: layer.grid_size(),
            cell_size: layer.cell_size(),
            margin,
            cells: layer.cells(),
            visible: true,
            neighbors,
        }
    }

    fn doc() -> BasicDocument {
        BasicDocument::new(DocumentConfig {
            z_range: ZRange::new(0.0, 10.0),
            ..DocumentConfig::default()
        })
    }

    #[test]
    fn boxes_on_2x2_make_one_batch_of_24_quads() {
        let layer = layer_2x2();
        let doc = doc();
        let mut boxes = Boxes::new("boxes");
        let node = boxes.build_scene(
            Some(&doc),
            Some(&view(&layer, Margin::ZERO, Neighbors::none())),
        );

        let geoms = node.geometries();
        assert_eq!(geoms.len(), 1, "single draw batch");
        assert_eq!(geoms[0].vertex_count(), 96);
        assert_eq!(geoms[0].normals.len(), 96);
        assert_eq!(geoms[0].primitive_count(), 24);
        assert!(!boxes.base().is_dirty());
    }

    #[test]
    fn colors_follow_raw_elevation() {
        let layer = layer_2x2();
        let mut config = DocumentConfig {
            z_range: ZRange::new(0.0, 10.0),
            length_conversion: 3.0,
            ..DocumentConfig::default()
        };
        config
            .offsets
            .insert(crate::document::GRID_OFFSET.to_owned(), Vec3::new(0.0, 0.0, 500.0));
        let doc = BasicDocument::new(config);
        let mut tops = Quads::new("tops", Faces::TOP);
        let node = tops.build_scene(
            Some(&doc),
            Some(&view(&layer, Margin::ZERO, Neighbors::none())),
        );

        let geom = node.geometries()[0];
        assert!(
            geom.colors.iter().all(|c| *c == Color::WHITE),
            "top at z = 10 is the top of the range regardless of placement"
        );
        assert!(
            geom.positions.iter().all(|p| (p.z - 530.0).abs() < 1e-9),
            "placed z = 500 + 10 * 3"
        );
    }

    #[test]
    fn color_override_wins() {
        let layer = layer_2x2();
        let doc = doc();
        let mut bottoms = Quads::new("bottoms", Faces::BOTTOM);
        let red = Color::rgba(1.0, 0.0, 0.0, 1.0);
        bottoms.base_mut().set_colors(Some(ColorRamp::new(red, red)));
        let node = bottoms.build_scene(
            Some(&doc),
            Some(&view(&layer, Margin::ZERO, Neighbors::none())),
        );
        assert!(node.geometries()[0].colors.iter().all(|c| *c == red), "override applies");
    }

    #[test]
    fn missing_document_stays_dirty() {
        let layer = layer_2x2();
        let mut boxes = Boxes::new("boxes");
        let node = boxes.build_scene(None, Some(&view(&layer, Margin::ZERO, Neighbors::none())));
        assert!(node.is_empty());
        assert!(boxes.base().is_dirty(), "retried once a document is present");

        let (_, outcome) = boxes.build(Some(&doc()), None);
        assert_eq!(outcome, BuildOutcome::Empty(EmptyReason::NoLayer));
        assert!(boxes.base().is_dirty());
    }

    #[test]
    fn clean_attribute_returns_cache() {
        let layer = layer_2x2();
        let doc = doc();
        let v = view(&layer, Margin::ZERO, Neighbors::none());
        let mut boxes = Boxes::new("boxes");
        let (first, outcome) = boxes.build(Some(&doc), Some(&v));
        assert_eq!(outcome, BuildOutcome::Rebuilt);
        let (second, outcome) = boxes.build(Some(&doc), Some(&v));
        assert_eq!(outcome, BuildOutcome::Cached);
        assert_eq!(first, second);
    }

    #[test]
    fn hidden_attribute_caches_empty_group() {
        let layer = layer_2x2();
        let doc = doc();
        let v = view(&layer, Margin::ZERO, Neighbors::none());
        let mut boxes = Boxes::new("boxes");
        boxes.base_mut().set_visible(false);
        let (node, outcome) = boxes.build(Some(&doc), Some(&v));
        assert!(node.is_empty());
        assert_eq!(outcome, BuildOutcome::Empty(EmptyReason::AttributeHidden));

        assert!(boxes.base_mut().set_visible(true));
        let (node, _) = boxes.build(Some(&doc), Some(&v));
        assert_eq!(node.vertex_count(), 96, "showing again rebuilds");
    }

    #[test]
    fn small_grid_builds_nothing() {
        let layer = Layer::new("thin", GridSize::new(1, 4), Size::new(1.0, 1.0));
        let doc = doc();
        let mut boxes = Boxes::new("boxes");
        let (node, outcome) = boxes.build(
            Some(&doc),
            Some(&view(&layer, Margin::ZERO, Neighbors::none())),
        );
        assert!(node.is_empty());
        assert_eq!(outcome, BuildOutcome::Empty(EmptyReason::GridTooSmall));
    }

    #[test]
    fn culling_drops_interior_faces() {
        let layer = layer_2x2();
        let doc = doc();
        let mut boxes = Boxes::new("boxes").with_culling(true);
        let node = boxes.build_scene(
            Some(&doc),
            Some(&view(&layer, Margin::ZERO, Neighbors::none())),
        );
        // Each cell keeps top, bottom, and its two outer sides.
        assert_eq!(node.vertex_count(), 4 * 4 * 4);
    }

    #[test]
    fn horizontal_margin_disables_side_culling() {
        let layer = layer_2x2();
        let doc = doc();
        let mut boxes = Boxes::new("boxes").with_culling(true);
        let node = boxes.build_scene(
            Some(&doc),
            Some(&view(&layer, Margin::new(1.0, 1.0, 0.0), Neighbors::none())),
        );
        assert_eq!(node.vertex_count(), 96);
    }

    fn build_against_above(tops: &mut Quads, layer: &Layer, above: &Layer) -> usize {
        let neighbors = Neighbors {
            above: Some(NeighborView::of(above)),
            below: None,
        };
        tops.base_mut().mark_dirty();
        tops.build_scene(Some(&doc()), Some(&view(layer, Margin::ZERO, neighbors)))
            .vertex_count()
    }

    #[test]
    fn stack_culling_needs_a_neighbor_drawing_the_face() {
        let layer = layer_2x2();
        let above = Layer::new("above", GridSize::new(2, 2), Size::new(10.0, 10.0));
        above
            .z_range(&[20.0, 20.0, 20.0, 20.0], &[10.0, 10.0, 10.0, 10.0])
            .unwrap();
        let mut tops = Quads::new("tops", Faces::TOP).with_culling(true);
        assert_eq!(
            build_against_above(&mut tops, &layer, &above),
            16,
            "nothing is drawn above"
        );

        above.add_attribute(HeadLevels::new("heads").into());
        assert_eq!(build_against_above(&mut tops, &layer, &above), 16);

        let boxes = above.add_attribute(Boxes::new("boxes").into());
        assert_eq!(
            build_against_above(&mut tops, &layer, &above),
            0,
            "every top face is covered by a box bottom"
        );

        above.set_attribute_visible(boxes, false).unwrap();
        assert_eq!(build_against_above(&mut tops, &layer, &above), 16);

        above.set_attribute_visible(boxes, true).unwrap();
        above.set_margin(Margin::new(0.0, 0.0, 1.0));
        assert_eq!(
            build_against_above(&mut tops, &layer, &above),
            16,
            "inset boxes do not touch"
        );

        above.set_margin(Margin::ZERO);
        above.set_visible(false);
        assert_eq!(
            build_against_above(&mut tops, &layer, &above),
            16,
            "hidden neighbor does not cull"
        );
    }

    #[test]
    fn culling_layers_keep_the_face_they_share() {
        let layer = layer_2x2();
        let above = Layer::new("above", GridSize::new(2, 2), Size::new(10.0, 10.0));
        above
            .z_range(&[20.0, 20.0, 20.0, 20.0], &[10.0, 10.0, 10.0, 10.0])
            .unwrap();
        above.add_attribute(Boxes::new("boxes").with_culling(true).into());
        let mut tops = Quads::new("tops", Faces::TOP).with_culling(true);
        assert_eq!(
            build_against_above(&mut tops, &layer, &above),
            16,
            "the layer above may drop its bottoms against these tops"
        );
    }

    #[test]
    fn purged_cells_are_skipped_and_unpickable() {
        let layer = layer_2x2();
        layer.purge(&[0, 1, 1, 1]).unwrap();
        let doc = doc();
        let mut boxes = Boxes::new("boxes");
        let node = boxes.build_scene(
            Some(&doc),
            Some(&view(&layer, Margin::ZERO, Neighbors::none())),
        );
        assert_eq!(node.vertex_count(), 72);
        assert_eq!(boxes.picks().cell_for_vertex(0), Some(1));
        assert_eq!(boxes.picks().cell_for_vertex(71), Some(3));
    }
}
