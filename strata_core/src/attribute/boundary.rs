// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Cell boundaries split by face direction.

use crate::attribute::{AttributeBase, Quads};
use crate::color::ColorRamp;
use crate::document::Document;
use crate::geometry::{Face, Faces};
use crate::layer::LayerView;
use crate::scene::{Group, SceneNode};
use crate::trace::{BuildOutcome, EmptyReason};

/// Six single-face [`Quads`] children, one per direction, under one group.
///
/// Each direction can be shown, hidden, or recolored on its own. Visibility
/// is enforced by the children: the boundary's own group is always built.
#[derive(Clone, Debug)]
pub struct CellBoundary {
    base: AttributeBase,
    faces: Vec<Quads>,
    vertex_counts: Vec<usize>,
}

impl CellBoundary {
    /// Creates a boundary whose children are named `"{name}/{face}"`.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let faces = Face::ALL
            .iter()
            .map(|&face| Quads::new(format!("{name}/{}", face.as_str()), face.flag()))
            .collect();
        Self {
            base: AttributeBase::new(name),
            faces,
            vertex_counts: Vec::new(),
        }
    }

    /// Enables or disables face culling on every direction.
    #[must_use]
    pub fn with_culling(mut self, culling: bool) -> Self {
        for quads in &mut self.faces {
            quads.set_culling(culling);
        }
        self
    }

    /// Shared state.
    #[must_use]
    pub fn base(&self) -> &AttributeBase {
        &self.base
    }

    /// The child drawing `face`.
    #[must_use]
    pub fn face(&self, face: Face) -> &Quads {
        &self.faces[face_index(face)]
    }

    /// The child drawing `face`, mutably.
    ///
    /// Changes made through it are seen by [`is_dirty`](Self::is_dirty).
    pub fn face_mut(&mut self, face: Face) -> &mut Quads {
        &mut self.faces[face_index(face)]
    }

    /// Whether this boundary or any direction needs rebuilding.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.base.is_dirty() || self.faces.iter().any(|q| q.base().is_dirty())
    }

    /// Marks this boundary and every direction dirty.
    pub fn mark_dirty(&mut self) {
        self.base.mark_dirty();
        for quads in &mut self.faces {
            quads.base_mut().mark_dirty();
        }
    }

    /// Shows or hides every direction. Returns `false` if nothing changed.
    pub fn set_visible(&mut self, visible: bool) -> bool {
        let mut changed = self.base.set_visible(visible);
        for quads in &mut self.faces {
            changed |= quads.base_mut().set_visible(visible);
        }
        changed
    }

    /// Recolors every direction.
    pub fn set_colors(&mut self, colors: Option<ColorRamp>) {
        self.base.set_colors(colors);
        for quads in &mut self.faces {
            quads.base_mut().set_colors(colors);
        }
    }

    /// Whether any direction culls against neighbors.
    #[must_use]
    pub fn culling(&self) -> bool {
        self.faces.iter().any(Quads::culling)
    }

    pub(crate) fn drawn_faces(&self) -> (Faces, Faces) {
        self.faces
            .iter()
            .map(Quads::drawn_faces)
            .fold((Faces::NONE, Faces::NONE), |(all, unculled), (a, u)| {
                (all | a, unculled | u)
            })
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
        let empty = |reason| {
            (
                SceneNode::empty(self.base.name()),
                BuildOutcome::Empty(reason),
            )
        };
        if doc.is_none() {
            return empty(EmptyReason::NoDocument);
        }
        let Some(view) = layer else {
            return empty(EmptyReason::NoLayer);
        };
        if !self.is_dirty()
            && let Some(node) = self.base.cached()
        {
            return (node.clone(), BuildOutcome::Cached);
        }
        if !view.visible {
            return empty(EmptyReason::LayerHidden);
        }

        let mut group = Group::new(self.base.name());
        self.vertex_counts.clear();
        for quads in &mut self.faces {
            let (node, _) = quads.build(doc, layer);
            self.vertex_counts.push(node.vertex_count());
            group.children.push(node);
        }
        (self.base.store(SceneNode::Group(group)), BuildOutcome::Rebuilt)
    }

    /// Cell index that produced `vertex`, counting vertices across the
    /// directions in [`Face::ALL`] order.
    #[must_use]
    pub fn cell_for_vertex(&self, vertex: usize) -> Option<usize> {
        let mut local = vertex;
        for (quads, &count) in self.faces.iter().zip(&self.vertex_counts) {
            if local < count {
                return quads.picks().cell_for_vertex(local);
            }
            local -= count;
        }
        None
    }
}

const fn face_index(face: Face) -> usize {
    match face {
        Face::Top => 0,
        Face::Bottom => 1,
        Face::East => 2,
        Face::West => 3,
        Face::North => 4,
        Face::South => 5,
    }
}

#[cfg(test)]
mod tests {
    use kurbo::Size;

    use super::*;
    use crate::color::ZRange;
    use crate::document::{BasicDocument, DocumentConfig};
    use crate::geometry::Vec3;
    use crate::layer::{GridSize, Layer, Margin, Neighbors};

    fn fixture() -> (Layer, BasicDocument) {
        let layer = Layer::new("l1", GridSize::new(2, 2), Size::new(10.0, 10.0));
        layer
            .z_range(&[10.0, 10.0, 10.0, 10.0], &[0.0, 0.0, 0.0, 0.0])
            .unwrap();
        let doc = BasicDocument::new(DocumentConfig {
            z_range: ZRange::new(0.0, 10.0),
            ..DocumentConfig::default()
        });
        (layer, doc)
    }

    fn view(layer: &Layer) -> LayerView<'_> {
        LayerView {
            name: layer.name(),
            grid: layer.grid_size(),
            cell_size: layer.cell_size(),
            margin: Margin::ZERO,
            cells: layer.cells(),
            visible: true,
            neighbors: Neighbors::none(),
        }
    }

    #[test]
    fn one_child_per_direction() {
        let (layer, doc) = fixture();
        let mut boundary = CellBoundary::new("bounds");
        let node = boundary.build_scene(Some(&doc), Some(&view(&layer)));

        assert_eq!(node.children().len(), 6);
        assert_eq!(node.children()[0].name(), "bounds/top");
        assert_eq!(node.vertex_count(), 96);
        assert_eq!(node.batch_count(), 6);

        let east = &node.children()[face_index(Face::East)].geometries()[0];
        assert!(
            east.normals.iter().all(|n| *n == Vec3::new(1.0, 0.0, 0.0)),
            "east child only holds east faces"
        );
    }

    #[test]
    fn hiding_one_direction_keeps_the_group() {
        let (layer, doc) = fixture();
        let mut boundary = CellBoundary::new("bounds");
        let v = view(&layer);
        boundary.build_scene(Some(&doc), Some(&v));
        assert!(!boundary.is_dirty());

        boundary.face_mut(Face::Top).base_mut().set_visible(false);
        assert!(boundary.is_dirty(), "child change is visible to the parent");
        let node = boundary.build_scene(Some(&doc), Some(&v));
        assert_eq!(node.children().len(), 6);
        assert_eq!(node.vertex_count(), 80);
    }

    #[test]
    fn hiding_everything_leaves_empty_children() {
        let (layer, doc) = fixture();
        let mut boundary = CellBoundary::new("bounds");
        assert!(boundary.set_visible(false));
        let node = boundary.build_scene(Some(&doc), Some(&view(&layer)));
        assert_eq!(node.children().len(), 6, "own group is never hidden");
        assert!(node.is_empty());
    }

    #[test]
    fn picks_span_directions() {
        let (layer, doc) = fixture();
        let mut boundary = CellBoundary::new("bounds");
        boundary.build_scene(Some(&doc), Some(&view(&layer)));
        // Top faces come first: four cells, four vertices each.
        assert_eq!(boundary.cell_for_vertex(0), Some(0));
        assert_eq!(boundary.cell_for_vertex(15), Some(3));
        // First bottom vertex.
        assert_eq!(boundary.cell_for_vertex(16), Some(0));
        assert_eq!(boundary.cell_for_vertex(96), None);
    }
}
