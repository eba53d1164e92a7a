// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! One horizontal slice of a grid model.
//!
//! A [`Layer`] owns:
//!
//! - a fixed-size grid of [`Cell`]s in row-major order, each behind its own
//!   mutex so a reader thread can write one cell while the render thread
//!   copies out another;
//! - an ordered list of [`Attribute`]s, each producing one renderable facet;
//! - visibility and dirty flags, the margin that insets every cell box, a
//!   weak reference to its [`Document`], and the cached root node.
//!
//! Everything except the cells sits behind the layer's own mutex. The layer
//! lock may be held while a cell lock is taken, never the other way round,
//! and no other layer's lock is taken while it is held: neighbor visibility
//! and drawn faces are read into [`Neighbors`] before a build starts.
//!
//! # Dirty state
//!
//! [`set_dirty(true)`](Layer::set_dirty) forwards to
//! [`Document::mark_dirty`] but leaves attributes alone. Data writes
//! ([`z_range`](Layer::z_range), [`purge`](Layer::purge),
//! [`set_vector`](Layer::set_vector), margin changes) mark the layer *and*
//! every attribute dirty, since each of them invalidates cached geometry.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use kurbo::{Point, Rect, Size};

use crate::attribute::Attribute;
use crate::cell::{Cell, CellSnapshot};
use crate::document::Document;
use crate::error::Error;
use crate::geometry::Faces;
use crate::scene::{Group, SceneNode};
use crate::trace::{AttributeBuildEvent, LayerBuildEvent, Tracer};

/// Tolerance for treating two elevations as the same plane.
const COINCIDENT_EPS: f64 = 1e-9;

/// Number of rows and columns of a layer grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GridSize {
    /// Number of rows (along y).
    pub rows: usize,
    /// Number of columns (along x).
    pub cols: usize,
}

impl GridSize {
    /// Creates a grid size.
    #[must_use]
    pub const fn new(rows: usize, cols: usize) -> Self {
        Self { rows, cols }
    }

    /// `rows * cols`.
    #[must_use]
    pub const fn cell_count(self) -> usize {
        self.rows * self.cols
    }

    /// Flat row-major index of `(row, col)`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfRange`] if either coordinate is outside the
    /// grid.
    pub fn index(self, row: usize, col: usize) -> Result<usize, Error> {
        if row >= self.rows {
            return Err(Error::OutOfRange {
                what: "row",
                index: row,
                len: self.rows,
            });
        }
        if col >= self.cols {
            return Err(Error::OutOfRange {
                what: "column",
                index: col,
                len: self.cols,
            });
        }
        Ok(row * self.cols + col)
    }

    /// Returns `true` if the grid is at least 2×2.
    #[must_use]
    pub const fn is_drawable(self) -> bool {
        self.rows >= 2 && self.cols >= 2
    }
}

/// Inset applied to every cell box: the total gap along x, y, and z.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Margin {
    /// Gap between neighboring boxes along x.
    pub x: f64,
    /// Gap between neighboring boxes along y.
    pub y: f64,
    /// Gap between stacked boxes along z.
    pub z: f64,
}

impl Margin {
    /// No inset.
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);

    /// Creates a margin.
    #[must_use]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

/// Per-layer boolean flags.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct LayerFlags {
    /// Whether the layer is drawn.
    pub visible: bool,
    /// Whether the cached root is stale.
    pub dirty: bool,
}

impl Default for LayerFlags {
    fn default() -> Self {
        Self {
            visible: true,
            dirty: true,
        }
    }
}

/// What attributes see of an adjacent layer while building.
#[derive(Clone, Copy, Debug)]
pub struct NeighborView<'a> {
    /// The neighbor's cells, same grid as the building layer.
    pub cells: &'a [Cell],
    /// Whether the neighbor was visible when the build started.
    pub visible: bool,
    /// Box faces the neighbor draws on its own cell planes.
    ///
    /// Empty when the neighbor is hidden or insets its boxes vertically.
    pub draws: Faces,
    /// The part of [`draws`](Self::draws) that no culling can remove.
    pub draws_unculled: Faces,
}

impl<'a> NeighborView<'a> {
    /// Snapshots `layer`'s visibility and drawn faces (taking its lock
    /// briefly).
    #[must_use]
    pub fn of(layer: &'a Layer) -> Self {
        let state = layer.lock();
        let visible = state.flags.visible;
        let (mut draws, mut draws_unculled) = (Faces::NONE, Faces::NONE);
        if visible && state.margin.z == 0.0 {
            for attribute in &state.attributes {
                let (all, unculled) = attribute.drawn_faces();
                draws |= all;
                draws_unculled |= unculled;
            }
        }
        drop(state);
        Self {
            cells: layer.cells(),
            visible,
            draws,
            draws_unculled,
        }
    }
}

/// The layers directly above and below the one being built.
#[derive(Clone, Copy, Debug, Default)]
pub struct Neighbors<'a> {
    /// Layer stacked on top.
    pub above: Option<NeighborView<'a>>,
    /// Layer stacked underneath.
    pub below: Option<NeighborView<'a>>,
}

impl Neighbors<'_> {
    /// No neighbors.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            above: None,
            below: None,
        }
    }
}

/// Read-only view of a layer handed to attribute builders.
#[derive(Clone, Copy, Debug)]
pub struct LayerView<'a> {
    /// Layer name.
    pub name: &'a str,
    /// Grid dimensions.
    pub grid: GridSize,
    /// Size of one cell.
    pub cell_size: Size,
    /// Cell box inset.
    pub margin: Margin,
    /// Row-major cells.
    pub cells: &'a [Cell],
    /// Whether the layer is drawn.
    pub visible: bool,
    /// Adjacent layers, for face culling.
    pub neighbors: Neighbors<'a>,
}

impl LayerView<'_> {
    /// Cell at `(row, col)`, if inside the grid.
    #[must_use]
    pub fn cell(&self, row: usize, col: usize) -> Option<&Cell> {
        let idx = self.grid.index(row, col).ok()?;
        self.cells.get(idx)
    }

    /// Faces of the box `bottom..top` at `(row, col)` that another box
    /// already covers.
    ///
    /// - A side face is hidden when the horizontal margin on that axis is
    ///   zero and the adjacent cell of this layer is active and spans at
    ///   least `bottom..top`.
    /// - With no vertical margin, the bottom face is hidden when the layer
    ///   below draws top faces and its cell here has its top at `bottom`.
    /// - With no vertical margin, the top face is hidden when the layer
    ///   above draws bottom faces that nothing culls and its cell here has
    ///   its bottom at `top`.
    ///
    /// The asymmetry keeps two culling layers from both dropping the face
    /// they share.
    #[must_use]
    pub fn hidden_faces(&self, row: usize, col: usize, top: f64, bottom: f64) -> Faces {
        let mut hidden = Faces::NONE;
        let covers = |cell: Option<&Cell>| {
            cell.and_then(Cell::elevations).is_some_and(|(t, b)| {
                t >= top - COINCIDENT_EPS && b <= bottom + COINCIDENT_EPS
            })
        };

        if self.margin.x == 0.0 {
            if covers(self.cell(row, col + 1)) {
                hidden |= Faces::EAST;
            }
            if col > 0 && covers(self.cell(row, col - 1)) {
                hidden |= Faces::WEST;
            }
        }
        if self.margin.y == 0.0 {
            if covers(self.cell(row + 1, col)) {
                hidden |= Faces::NORTH;
            }
            if row > 0 && covers(self.cell(row - 1, col)) {
                hidden |= Faces::SOUTH;
            }
        }

        if self.margin.z == 0.0 {
            let Ok(idx) = self.grid.index(row, col) else {
                return hidden;
            };
            let elevations =
                |view: NeighborView<'_>| view.cells.get(idx).and_then(Cell::elevations);
            let meets = |z: f64, plane: f64| (z - plane).abs() <= COINCIDENT_EPS;
            if let Some(above) = self.neighbors.above
                && above.draws_unculled.contains(Faces::BOTTOM)
                && elevations(above).is_some_and(|(_, b)| meets(b, top))
            {
                hidden |= Faces::TOP;
            }
            if let Some(below) = self.neighbors.below
                && below.draws.contains(Faces::TOP)
                && elevations(below).is_some_and(|(t, _)| meets(t, bottom))
            {
                hidden |= Faces::BOTTOM;
            }
        }
        hidden
    }
}

#[derive(Debug)]
struct LayerState {
    flags: LayerFlags,
    margin: Margin,
    attributes: Vec<Attribute>,
    document: Option<Weak<dyn Document>>,
    root: SceneNode,
}

/// A grid of cells plus the attributes that render it.
#[derive(Debug)]
pub struct Layer {
    name: String,
    grid: GridSize,
    cell_size: Size,
    cells: Box<[Cell]>,
    state: Mutex<LayerState>,
}

impl Layer {
    /// Creates a layer with one active, flat cell per grid position.
    ///
    /// Cell centers are `((col + 0.5) * width, (row + 0.5) * height)`.
    #[must_use]
    pub fn new(name: impl Into<String>, grid: GridSize, cell_size: Size) -> Self {
        let name = name.into();
        let mut cells = Vec::with_capacity(grid.cell_count());
        for row in 0..grid.rows {
            for col in 0..grid.cols {
                let center = Point::new(
                    (col as f64 + 0.5) * cell_size.width,
                    (row as f64 + 0.5) * cell_size.height,
                );
                cells.push(Cell::new(row, col, center));
            }
        }
        let root = SceneNode::empty(name.clone());
        Self {
            name,
            grid,
            cell_size,
            cells: cells.into_boxed_slice(),
            state: Mutex::new(LayerState {
                flags: LayerFlags::default(),
                margin: Margin::ZERO,
                attributes: Vec::new(),
                document: None,
                root,
            }),
        }
    }

    /// Layer name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Grid dimensions.
    #[must_use]
    pub fn grid_size(&self) -> GridSize {
        self.grid
    }

    /// Size of one cell.
    #[must_use]
    pub fn cell_size(&self) -> Size {
        self.cell_size
    }

    /// Planar footprint of the whole grid.
    #[must_use]
    pub fn bounds(&self) -> Rect {
        Rect::new(
            0.0,
            0.0,
            self.grid.cols as f64 * self.cell_size.width,
            self.grid.rows as f64 * self.cell_size.height,
        )
    }

    /// All cells, row-major.
    #[must_use]
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// Cell at `(row, col)`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfRange`] for a position outside the grid.
    pub fn cell(&self, row: usize, col: usize) -> Result<&Cell, Error> {
        let idx = self.grid.index(row, col)?;
        Ok(&self.cells[idx])
    }

    /// The active cell whose footprint contains `point`.
    #[must_use]
    pub fn cell_at(&self, point: Point) -> Option<&Cell> {
        if !self.bounds().contains(point) {
            return None;
        }
        let col = (point.x / self.cell_size.width).floor();
        let row = (point.y / self.cell_size.height).floor();
        if !(col.is_finite() && row.is_finite()) {
            return None;
        }
        #[expect(
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss,
            reason = "non-negative and bounded by the grid after the bounds check"
        )]
        let (row, col) = (row as usize, col as usize);
        let cell = self.cell(row, col).ok()?;
        cell.is_active().then_some(cell)
    }

    /// Number of cells that have not been purged.
    #[must_use]
    pub fn active_cell_count(&self) -> usize {
        self.cells.iter().filter(|c| c.is_active()).count()
    }

    // -- Flags --

    /// Whether the layer is drawn.
    #[must_use]
    pub fn is_visible(&self) -> bool {
        self.lock().flags.visible
    }

    /// Shows or hides the layer. Returns `false` if nothing changed.
    ///
    /// A change marks the layer dirty.
    pub fn set_visible(&self, visible: bool) -> bool {
        let mut state = self.lock();
        if state.flags.visible == visible {
            return false;
        }
        state.flags.visible = visible;
        let document = Self::mark_dirty_locked(&mut state);
        drop(state);
        notify(document);
        true
    }

    /// Whether the cached root is stale.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.lock().flags.dirty
    }

    /// Sets the dirty flag. Returns `false` if nothing changed.
    ///
    /// Setting it forwards to [`Document::mark_dirty`]; attributes keep
    /// their own flags.
    pub fn set_dirty(&self, dirty: bool) -> bool {
        let mut state = self.lock();
        if state.flags.dirty == dirty {
            return false;
        }
        let document = if dirty {
            Self::mark_dirty_locked(&mut state)
        } else {
            state.flags.dirty = false;
            None
        };
        drop(state);
        notify(document);
        true
    }

    /// Cell box inset.
    #[must_use]
    pub fn margin(&self) -> Margin {
        self.lock().margin
    }

    /// Sets the cell box inset, invalidating all attributes.
    pub fn set_margin(&self, margin: Margin) {
        let mut state = self.lock();
        if state.margin == margin {
            return;
        }
        state.margin = margin;
        let document = Self::invalidate_locked(&mut state);
        drop(state);
        notify(document);
    }

    /// Attaches the owning document.
    pub fn set_document(&self, document: Weak<dyn Document>) {
        let mut state = self.lock();
        state.document = Some(document);
        let document = Self::mark_dirty_locked(&mut state);
        drop(state);
        notify(document);
    }

    /// The owning document, if attached and still alive.
    #[must_use]
    pub fn document(&self) -> Option<Arc<dyn Document>> {
        self.lock().document.as_ref().and_then(Weak::upgrade)
    }

    // -- Attributes --

    /// Appends an attribute and returns its index.
    pub fn add_attribute(&self, attribute: Attribute) -> usize {
        let mut state = self.lock();
        state.attributes.push(attribute);
        let index = state.attributes.len() - 1;
        let document = Self::mark_dirty_locked(&mut state);
        drop(state);
        notify(document);
        index
    }

    /// Number of attributes.
    #[must_use]
    pub fn attribute_count(&self) -> usize {
        self.lock().attributes.len()
    }

    /// Attribute names in list order.
    #[must_use]
    pub fn attribute_names(&self) -> Vec<String> {
        self.lock()
            .attributes
            .iter()
            .map(|a| a.name().to_owned())
            .collect()
    }

    /// Runs `f` on attribute `index`.
    ///
    /// If the attribute is dirty afterwards the layer is marked dirty too.
    ///
    /// # Deadlocks
    ///
    /// `f` runs with the layer lock held. Calling back into this layer from
    /// `f` (even [`is_visible`](Self::is_visible)) deadlocks.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfRange`] for an unknown index.
    pub fn with_attribute<R>(
        &self,
        index: usize,
        f: impl FnOnce(&mut Attribute) -> R,
    ) -> Result<R, Error> {
        let mut state = self.lock();
        let len = state.attributes.len();
        let attribute = state.attributes.get_mut(index).ok_or(Error::OutOfRange {
            what: "attribute",
            index,
            len,
        })?;
        let out = f(attribute);
        let document = if attribute.is_dirty() {
            Self::mark_dirty_locked(&mut state)
        } else {
            None
        };
        drop(state);
        notify(document);
        Ok(out)
    }

    /// Shows or hides attribute `index`. Returns whether it changed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfRange`] for an unknown index.
    pub fn set_attribute_visible(&self, index: usize, visible: bool) -> Result<bool, Error> {
        self.with_attribute(index, |a| a.set_visible(visible))
    }

    /// Marks every attribute that culls against neighbors dirty.
    ///
    /// Returns `true` if any attribute was affected.
    pub fn invalidate_culling(&self) -> bool {
        let mut state = self.lock();
        let mut any = false;
        for attribute in &mut state.attributes {
            if attribute.uses_neighbors() {
                attribute.mark_dirty();
                any = true;
            }
        }
        let document = if any {
            Self::mark_dirty_locked(&mut state)
        } else {
            None
        };
        drop(state);
        notify(document);
        any
    }

    /// Selects the displayed time step of every time-stepped attribute.
    ///
    /// Returns `true` if any attribute switched.
    pub fn update_time_step(&self, time_step: usize) -> bool {
        let mut state = self.lock();
        let mut changed = false;
        for attribute in &mut state.attributes {
            changed |= attribute.update(time_step);
        }
        if changed {
            state.root = compose_root(&self.name, &state.attributes);
        }
        drop(state);
        changed
    }

    /// Like [`update_time_step`](Self::update_time_step), reading the step
    /// from the attached document.
    pub fn sync_time_step(&self) -> bool {
        match self.document() {
            Some(doc) => self.update_time_step(doc.time_step()),
            None => false,
        }
    }

    // -- Bulk data --

    /// Assigns every cell's top and bottom from row-major arrays.
    ///
    /// Purged cells consume a slot but are skipped. The whole batch is
    /// validated before any cell is written.
    ///
    /// # Errors
    ///
    /// - [`Error::LengthMismatch`] if either array is not one entry per cell.
    /// - [`Error::InvertedCell`] if an active cell would get `top < bottom`.
    pub fn z_range(&self, top: &[f64], bottom: &[f64]) -> Result<(), Error> {
        self.check_len(top.len())?;
        self.check_len(bottom.len())?;
        for (index, ((cell, &t), &b)) in self.cells.iter().zip(top).zip(bottom).enumerate() {
            if cell.is_active() && (t < b || t.is_nan() || b.is_nan()) {
                return Err(Error::InvertedCell {
                    index,
                    top: t,
                    bottom: b,
                });
            }
        }
        for ((cell, &t), &b) in self.cells.iter().zip(top).zip(bottom) {
            cell.set_elevations(t, b);
        }
        self.invalidate();
        Ok(())
    }

    /// Purges every cell whose flag is zero. Returns how many cells were
    /// newly purged.
    ///
    /// Purging is irreversible; purging the same cell again is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LengthMismatch`] unless there is one flag per cell.
    pub fn purge(&self, bounds: &[i32]) -> Result<usize, Error> {
        self.check_len(bounds.len())?;
        let purged = self
            .cells
            .iter()
            .zip(bounds)
            .filter(|&(cell, &flag)| flag == 0 && cell.purge())
            .count();
        if purged > 0 {
            self.invalidate();
        }
        Ok(purged)
    }

    /// Writes time step `time_step` of vector `name` for every cell from a
    /// row-major array. Purged cells consume a slot but are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LengthMismatch`] unless there is one value per cell.
    pub fn set_vector(&self, name: &str, time_step: usize, values: &[f64]) -> Result<(), Error> {
        self.check_len(values.len())?;
        for (cell, &v) in self.cells.iter().zip(values) {
            cell.set_value(name, time_step, v);
        }
        self.invalidate();
        Ok(())
    }

    /// Writes a single vector slot of one cell. Returns `false` if the cell
    /// is purged.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfRange`] for a position outside the grid.
    pub fn set_cell_value(
        &self,
        row: usize,
        col: usize,
        name: &str,
        time_step: usize,
        value: f64,
    ) -> Result<bool, Error> {
        let written = self.cell(row, col)?.set_value(name, time_step, value);
        if written {
            self.invalidate();
        }
        Ok(written)
    }

    /// Longest vector `name` over all cells.
    #[must_use]
    pub fn time_step_count(&self, name: &str) -> usize {
        self.cells.iter().map(|c| c.vector_len(name)).max().unwrap_or(0)
    }

    // -- Scene --

    /// Rebuilds the root node from the attributes, in list order.
    ///
    /// The dirty flag is cleared first. A hidden layer gets an empty root.
    pub fn build_scene(&self, neighbors: Neighbors<'_>) -> SceneNode {
        self.build_scene_traced(neighbors, &mut Tracer::none())
    }

    /// Like [`build_scene`](Self::build_scene), reporting each attribute to
    /// `tracer`.
    pub fn build_scene_traced(
        &self,
        neighbors: Neighbors<'_>,
        tracer: &mut Tracer<'_>,
    ) -> SceneNode {
        let mut state = self.lock();
        state.flags.dirty = false;
        let document = state.document.as_ref().and_then(Weak::upgrade);
        let visible = state.flags.visible;

        if !visible {
            state.root = SceneNode::empty(self.name.clone());
        } else {
            let view = LayerView {
                name: &self.name,
                grid: self.grid,
                cell_size: self.cell_size,
                margin: state.margin,
                cells: &self.cells,
                visible,
                neighbors,
            };
            for attribute in &mut state.attributes {
                let (node, outcome) = attribute.build(document.as_deref(), Some(&view));
                tracer.attribute_build(&AttributeBuildEvent {
                    layer: &self.name,
                    attribute: attribute.name(),
                    kind: attribute.kind(),
                    outcome,
                    vertices: node.vertex_count(),
                });
            }
            state.root = compose_root(&self.name, &state.attributes);
        }

        let root = state.root.clone();
        let attributes = state.attributes.len();
        drop(state);
        tracer.layer_build(&LayerBuildEvent {
            layer: &self.name,
            visible,
            attributes,
            vertices: root.vertex_count(),
            batches: root.batch_count(),
        });
        root
    }

    /// The root node from the last build.
    #[must_use]
    pub fn root(&self) -> SceneNode {
        self.lock().root.clone()
    }

    /// Maps vertex `vertex` of attribute `attribute`'s last build back to
    /// its cell.
    ///
    /// Returns `Ok(None)` if the vertex is unknown or its cell has been
    /// purged since. Picking leaves the dirty flag and the document alone.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfRange`] for an unknown attribute.
    pub fn pick(&self, attribute: usize, vertex: usize) -> Result<Option<CellSnapshot>, Error> {
        let state = self.lock();
        let len = state.attributes.len();
        let index = state
            .attributes
            .get(attribute)
            .ok_or(Error::OutOfRange {
                what: "attribute",
                index: attribute,
                len,
            })?
            .cell_for_vertex(vertex);
        drop(state);
        Ok(index
            .and_then(|i| self.cells.get(i))
            .and_then(Cell::snapshot))
    }

    /// Drops all attributes and the root, and purges every cell.
    pub fn clear(&self) {
        for cell in self.cells.iter() {
            cell.purge();
        }
        let mut state = self.lock();
        state.attributes.clear();
        state.root = SceneNode::empty(self.name.clone());
        let document = Self::mark_dirty_locked(&mut state);
        drop(state);
        notify(document);
    }

    // -- Internal helpers --

    fn lock(&self) -> MutexGuard<'_, LayerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn check_len(&self, actual: usize) -> Result<(), Error> {
        let expected = self.cells.len();
        if actual == expected {
            Ok(())
        } else {
            Err(Error::LengthMismatch { expected, actual })
        }
    }

    /// Marks the layer and all attributes dirty after a data write.
    fn invalidate(&self) {
        let mut state = self.lock();
        let document = Self::invalidate_locked(&mut state);
        drop(state);
        notify(document);
    }

    fn invalidate_locked(state: &mut LayerState) -> Option<Arc<dyn Document>> {
        for attribute in &mut state.attributes {
            attribute.mark_dirty();
        }
        Self::mark_dirty_locked(state)
    }

    /// Sets the dirty flag and returns the document to notify once the lock
    /// is released.
    fn mark_dirty_locked(state: &mut LayerState) -> Option<Arc<dyn Document>> {
        state.flags.dirty = true;
        state.document.as_ref().and_then(Weak::upgrade)
    }
}

/// Document notification happens outside the layer lock.
fn notify(document: Option<Arc<dyn Document>>) {
    if let Some(doc) = document {
        doc.mark_dirty();
    }
}

fn compose_root(name: &str, attributes: &[Attribute]) -> SceneNode {
    let mut root = Group::new(name);
    root.children = attributes
        .iter()
        .map(|a| a.cached().unwrap_or_else(|| SceneNode::empty(a.name())))
        .collect();
    SceneNode::Group(root)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribute::Boxes;
    use crate::document::{BasicDocument, DocumentConfig};

    fn layer_with_document() -> (Layer, Arc<BasicDocument>) {
        let doc = Arc::new(BasicDocument::new(DocumentConfig::default()));
        let layer = Layer::new("layer", GridSize::new(2, 2), Size::new(1.0, 1.0));
        let weak: Weak<dyn Document> = Arc::downgrade(&doc) as Weak<dyn Document>;
        layer.set_document(weak);
        layer.z_range(&[10.0; 4], &[0.0; 4]).unwrap();
        layer.add_attribute(Boxes::new("boxes").into());
        (layer, doc)
    }

    #[test]
    fn grid_index_is_row_major() {
        let grid = GridSize::new(2, 3);
        assert_eq!(grid.index(1, 2), Ok(5));
        assert!(matches!(
            grid.index(2, 0),
            Err(Error::OutOfRange { what: "row", .. })
        ));
        assert!(!GridSize::new(1, 4).is_drawable());
    }

    #[test]
    fn boxes_build_one_batch() {
        let (layer, _doc) = layer_with_document();
        let root = layer.build_scene(Neighbors::none());
        assert_eq!(root.name(), "layer");
        assert_eq!(root.vertex_count(), 96);
        assert_eq!(root.batch_count(), 1);
        assert!(!layer.is_dirty());
    }

    #[test]
    fn purge_drops_cells_once() {
        let (layer, _doc) = layer_with_document();
        layer.build_scene(Neighbors::none());
        assert_eq!(layer.purge(&[0, 1, 1, 1]), Ok(1));
        assert!(layer.is_dirty());
        assert_eq!(layer.build_scene(Neighbors::none()).vertex_count(), 72);

        assert_eq!(layer.purge(&[0, 1, 1, 1]), Ok(0), "already purged");
        assert!(!layer.is_dirty());
        assert_eq!(layer.active_cell_count(), 3);
    }

    #[test]
    fn rejected_z_range_writes_nothing() {
        let (layer, _doc) = layer_with_document();
        assert_eq!(
            layer.z_range(&[1.0; 3], &[0.0; 4]),
            Err(Error::LengthMismatch {
                expected: 4,
                actual: 3
            })
        );
        assert!(matches!(
            layer.z_range(&[20.0, 20.0, 20.0, 1.0], &[0.0, 0.0, 0.0, 2.0]),
            Err(Error::InvertedCell { index: 3, .. })
        ));
        assert_eq!(layer.cell(0, 0).unwrap().elevations(), Some((10.0, 0.0)));
    }

    #[test]
    fn set_dirty_reports_changes_and_notifies() {
        let (layer, doc) = layer_with_document();
        layer.build_scene(Neighbors::none());
        doc.take_redraw();
        assert!(layer.set_dirty(true));
        assert!(!layer.set_dirty(true));
        assert!(doc.take_redraw());
        assert!(layer.set_dirty(false));
        assert!(!layer.is_dirty());
    }

    #[test]
    fn hidden_layer_builds_empty_root() {
        let (layer, _doc) = layer_with_document();
        assert!(layer.set_visible(false));
        assert!(!layer.set_visible(false));
        let root = layer.build_scene(Neighbors::none());
        assert!(root.is_empty());
        assert!(layer.set_visible(true));
        assert_eq!(layer.build_scene(Neighbors::none()).vertex_count(), 96);
    }

    #[test]
    fn pick_maps_vertices_to_live_cells() {
        let (layer, _doc) = layer_with_document();
        layer.build_scene(Neighbors::none());
        let hit = layer.pick(0, 0).unwrap().unwrap();
        assert_eq!((hit.row, hit.col), (0, 0));
        assert_eq!(layer.pick(0, 96).unwrap(), None);
        assert!(matches!(
            layer.pick(1, 0),
            Err(Error::OutOfRange { .. })
        ));

        layer.purge(&[0, 1, 1, 1]).unwrap();
        assert_eq!(layer.pick(0, 0).unwrap(), None, "purged since the build");
    }

    #[test]
    fn pick_is_read_only() {
        let (layer, doc) = layer_with_document();
        layer.build_scene(Neighbors::none());
        layer.with_attribute(0, Attribute::mark_dirty).unwrap();
        layer.set_dirty(false);
        doc.take_redraw();

        assert!(layer.pick(0, 0).unwrap().is_some());
        assert!(!layer.is_dirty());
        assert!(!doc.take_redraw(), "picking does not request a redraw");
    }

    #[test]
    fn cell_at_finds_active_cells() {
        let (layer, _doc) = layer_with_document();
        let cell = layer.cell_at(Point::new(1.5, 0.5)).unwrap();
        assert_eq!((cell.row(), cell.col()), (0, 1));
        assert!(layer.cell_at(Point::new(-0.5, 0.5)).is_none());
        layer.purge(&[1, 0, 1, 1]).unwrap();
        assert!(layer.cell_at(Point::new(1.5, 0.5)).is_none());
    }

    #[test]
    fn clear_drops_everything() {
        let (layer, _doc) = layer_with_document();
        layer.build_scene(Neighbors::none());
        layer.clear();
        assert_eq!(layer.attribute_count(), 0);
        assert_eq!(layer.active_cell_count(), 0);
        assert!(layer.root().is_empty());
    }

    #[test]
    fn neighbor_faces_are_hidden_when_planes_meet() {
        let (layer, _doc) = layer_with_document();
        let below = Layer::new("below", GridSize::new(2, 2), Size::new(1.0, 1.0));
        below.z_range(&[0.0; 4], &[-5.0; 4]).unwrap();
        below.add_attribute(Boxes::new("boxes").with_culling(true).into());
        let neighbors = Neighbors {
            above: None,
            below: Some(NeighborView::of(&below)),
        };
        let view = LayerView {
            name: "layer",
            grid: layer.grid_size(),
            cell_size: layer.cell_size(),
            margin: Margin::ZERO,
            cells: layer.cells(),
            visible: true,
            neighbors,
        };
        let hidden = view.hidden_faces(0, 0, 10.0, 0.0);
        assert!(hidden.contains(Faces::BOTTOM));
        assert!(hidden.contains(Faces::EAST));
        assert!(hidden.contains(Faces::NORTH));
        assert!(!hidden.contains(Faces::TOP));
        assert!(!hidden.contains(Faces::WEST));

        let inset = LayerView {
            margin: Margin::new(0.1, 0.0, 0.1),
            ..view
        };
        let hidden = inset.hidden_faces(0, 0, 10.0, 0.0);
        assert!(!hidden.contains(Faces::EAST));
        assert!(!hidden.contains(Faces::BOTTOM));
        assert!(hidden.contains(Faces::NORTH));
    }

    #[test]
    fn neighbors_without_face_attributes_hide_nothing() {
        let (layer, _doc) = layer_with_document();
        let above = Layer::new("above", GridSize::new(2, 2), Size::new(1.0, 1.0));
        above.z_range(&[20.0; 4], &[10.0; 4]).unwrap();
        let below = Layer::new("below", GridSize::new(2, 2), Size::new(1.0, 1.0));
        below.z_range(&[0.0; 4], &[-5.0; 4]).unwrap();

        let view = |above: &Layer, below: &Layer| {
            let neighbors = Neighbors {
                above: Some(NeighborView::of(above)),
                below: Some(NeighborView::of(below)),
            };
            LayerView {
                name: "layer",
                grid: layer.grid_size(),
                cell_size: layer.cell_size(),
                margin: Margin::ZERO,
                cells: layer.cells(),
                visible: true,
                neighbors,
            }
            .hidden_faces(0, 0, 10.0, 0.0)
        };
        let hidden = view(&above, &below);
        assert!(!hidden.contains(Faces::TOP));
        assert!(!hidden.contains(Faces::BOTTOM));

        // A culling attribute above may itself drop the shared face.
        above.add_attribute(Boxes::new("boxes").with_culling(true).into());
        assert!(!view(&above, &below).contains(Faces::TOP));
        above.add_attribute(Boxes::new("plain").into());
        assert!(view(&above, &below).contains(Faces::TOP));
    }

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn layers_are_shareable_across_threads() {
        assert_send_sync::<Layer>();
        assert_send_sync::<crate::model::Model>();
    }

    #[test]
    fn writer_and_renderer_run_concurrently() {
        let (layer, _doc) = layer_with_document();
        let layer = Arc::new(layer);

        std::thread::scope(|scope| {
            let writer = scope.spawn(|| {
                for step in 0..200_usize {
                    let z = 10.0 + (step % 5) as f64;
                    layer.z_range(&[z; 4], &[0.0; 4]).unwrap();
                    layer.set_vector("heads", step % 3, &[z; 4]).unwrap();
                    layer.set_cell_value(1, 1, "heads", 0, z).unwrap();
                }
            });
            let renderer = scope.spawn(|| {
                for _ in 0..200 {
                    let root = layer.build_scene(Neighbors::none());
                    assert_eq!(root.vertex_count(), 96);
                    let _ = layer.pick(0, 0).unwrap();
                }
            });
            writer.join().unwrap();
            renderer.join().unwrap();
        });

        let root = layer.build_scene(Neighbors::none());
        assert_eq!(root.vertex_count(), 96);
        assert_eq!(layer.time_step_count("heads"), 3);
        assert_eq!(layer.cell(1, 1).unwrap().elevations(), Some((14.0, 0.0)));
    }
}
