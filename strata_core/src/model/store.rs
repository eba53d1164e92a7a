// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Struct-of-arrays layer storage with allocation and stacking.

use std::sync::{Arc, Weak};

use understory_dirty::{Channel, CycleHandling, DirtyTracker};

use super::id::{INVALID, LayerId};
use super::traverse::Stack;
use crate::dirty;
use crate::document::Document;
use crate::error::Error;
use crate::layer::{GridSize, Layer};

/// Arena of layers and their stacking.
///
/// Layers are addressed by [`LayerId`] handles. Each layer occupies a slot in
/// parallel arrays; removed layers are recycled through a free list, and
/// generation counters turn old handles stale.
///
/// Layers are shared as `Arc<Layer>` so a reader thread can keep writing
/// cell data while the model evaluates on another.
#[derive(Debug)]
pub struct Model {
    // -- Slots --
    pub(crate) layers: Vec<Option<Arc<Layer>>>,

    // -- Stacking --
    pub(crate) above: Vec<u32>,
    pub(crate) below: Vec<u32>,

    // -- Allocation --
    pub(crate) generation: Vec<u32>,
    pub(crate) free_list: Vec<u32>,
    pub(crate) len: u32,

    // -- Shared --
    pub(crate) document: Option<Weak<dyn Document>>,

    // -- Dirty tracking --
    pub(crate) dirty: DirtyTracker<u32>,

    // -- Stack order cache --
    pub(crate) stack_order: Vec<u32>,
    pub(crate) stack_dirty: bool,

    // -- Lifecycle tracking --
    pub(crate) pending_added: Vec<u32>,
    pub(crate) pending_removed: Vec<u32>,
}

impl Default for Model {
    fn default() -> Self {
        Self::new()
    }
}

impl Model {
    /// Creates an empty model.
    #[must_use]
    pub fn new() -> Self {
        Self {
            layers: Vec::new(),
            above: Vec::new(),
            below: Vec::new(),
            generation: Vec::new(),
            free_list: Vec::new(),
            len: 0,
            document: None,
            dirty: DirtyTracker::with_cycle_handling(CycleHandling::Error),
            stack_order: Vec::new(),
            stack_dirty: true,
            pending_added: Vec::new(),
            pending_removed: Vec::new(),
        }
    }

    // -- Document --

    /// Attaches a document to the model and every layer in it.
    ///
    /// Layers inserted later are attached on insert.
    pub fn set_document(&mut self, document: Weak<dyn Document>) {
        for layer in self.layers.iter().flatten() {
            layer.set_document(document.clone());
        }
        self.document = Some(document);
    }

    /// The attached document, if still alive.
    #[must_use]
    pub fn document(&self) -> Option<Arc<dyn Document>> {
        self.document.as_ref().and_then(Weak::upgrade)
    }

    // -- Allocation API --

    /// Adds a layer and returns its handle.
    ///
    /// The layer starts unstacked and is built on the next
    /// [`evaluate`](Self::evaluate).
    pub fn insert(&mut self, layer: Layer) -> LayerId {
        self.insert_shared(Arc::new(layer))
    }

    /// Adds an already shared layer and returns its handle.
    pub fn insert_shared(&mut self, layer: Arc<Layer>) -> LayerId {
        if let Some(document) = &self.document {
            layer.set_document(document.clone());
        }
        let idx = if let Some(idx) = self.free_list.pop() {
            // Reuse a freed slot; its generation was bumped on removal.
            self.layers[idx as usize] = Some(layer);
            self.above[idx as usize] = INVALID;
            self.below[idx as usize] = INVALID;
            idx
        } else {
            let idx = self.len;
            self.len += 1;
            self.layers.push(Some(layer));
            self.above.push(INVALID);
            self.below.push(INVALID);
            self.generation.push(0);
            idx
        };

        self.stack_dirty = true;
        self.pending_added.push(idx);
        self.dirty.mark(idx, dirty::TOPOLOGY);

        LayerId {
            idx,
            generation: self.generation[idx as usize],
        }
    }

    /// Removes a layer, unstacking it, and hands it back.
    ///
    /// Its former neighbors have their culling recomputed on the next
    /// evaluate.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StaleLayer`] if the handle is stale.
    pub fn remove(&mut self, id: LayerId) -> Result<Arc<Layer>, Error> {
        let idx = self.check(id)?;
        self.detach_below(idx);
        self.detach_above(idx);

        self.dirty.remove_key(idx);

        // Bump generation so old handles immediately fail validation.
        self.generation[idx as usize] += 1;
        let layer = self.layers[idx as usize].take().ok_or(Error::StaleLayer(id))?;

        self.free_list.push(idx);
        self.stack_dirty = true;
        self.pending_removed.push(idx);
        self.dirty.mark(idx, dirty::TOPOLOGY);
        Ok(layer)
    }

    /// Returns whether the given handle refers to a live layer.
    #[must_use]
    pub fn is_alive(&self, id: LayerId) -> bool {
        id.idx < self.len
            && self.generation[id.idx as usize] == id.generation
            && self.layers[id.idx as usize].is_some()
    }

    /// The layer behind `id`, if the handle is live.
    #[must_use]
    pub fn get(&self, id: LayerId) -> Option<&Arc<Layer>> {
        if self.is_alive(id) {
            self.layers[id.idx as usize].as_ref()
        } else {
            None
        }
    }

    /// The layer in slot `idx`, without a generation check.
    ///
    /// Intended for indices reported in
    /// [`SceneChanges`](super::SceneChanges).
    #[must_use]
    pub fn layer_at(&self, idx: u32) -> Option<&Arc<Layer>> {
        self.layers.get(idx as usize).and_then(Option::as_ref)
    }

    /// Number of live layers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len as usize - self.free_list.len()
    }

    /// Returns `true` if the model holds no layers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Handles of all live layers, in slot order.
    pub fn ids(&self) -> impl Iterator<Item = LayerId> + '_ {
        (0..self.len)
            .filter(|&idx| self.layers[idx as usize].is_some())
            .map(|idx| LayerId {
                idx,
                generation: self.generation[idx as usize],
            })
    }

    // -- Stacking API --

    /// Stacks `upper` directly on top of `lower`.
    ///
    /// Any previous layer below `upper` or above `lower` is unstacked from
    /// it first.
    ///
    /// # Errors
    ///
    /// - [`Error::StaleLayer`] if either handle is stale.
    /// - [`Error::GridMismatch`] if the grids differ.
    /// - [`Error::InvalidArgument`] if the link would form a cycle.
    pub fn link(&mut self, upper: LayerId, lower: LayerId) -> Result<(), Error> {
        let u = self.check(upper)?;
        let l = self.check(lower)?;
        if u == l {
            return Err(Error::InvalidArgument("cannot stack a layer on itself"));
        }
        let (upper_grid, lower_grid) = (self.grid_at(u), self.grid_at(l));
        if upper_grid != lower_grid {
            return Err(Error::GridMismatch {
                upper: upper_grid,
                lower: lower_grid,
            });
        }
        if self.stack(lower).any(|id| id.idx == u) {
            return Err(Error::InvalidArgument("stacking would form a cycle"));
        }

        self.detach_below(u);
        self.detach_above(l);
        self.below[u as usize] = l;
        self.above[l as usize] = u;

        self.dirty.mark(u, dirty::CULLING);
        self.dirty.mark(l, dirty::CULLING);
        self.dirty.mark(u, dirty::TOPOLOGY);
        self.stack_dirty = true;
        Ok(())
    }

    /// Unstacks whatever lies below `upper`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StaleLayer`] if the handle is stale.
    pub fn unlink_below(&mut self, upper: LayerId) -> Result<(), Error> {
        let u = self.check(upper)?;
        if self.below[u as usize] != INVALID {
            self.detach_below(u);
            self.dirty.mark(u, dirty::TOPOLOGY);
            self.stack_dirty = true;
        }
        Ok(())
    }

    /// The layer stacked on top of `id`.
    ///
    /// `None` for stale handles and unstacked layers.
    #[must_use]
    pub fn above(&self, id: LayerId) -> Option<LayerId> {
        if !self.is_alive(id) {
            return None;
        }
        self.handle_at(self.above[id.idx as usize])
    }

    /// The layer stacked underneath `id`.
    ///
    /// `None` for stale handles and unstacked layers.
    #[must_use]
    pub fn below(&self, id: LayerId) -> Option<LayerId> {
        if !self.is_alive(id) {
            return None;
        }
        self.handle_at(self.below[id.idx as usize])
    }

    /// Walks down the stack starting at `top` (inclusive).
    ///
    /// Empty for a stale handle.
    #[must_use]
    pub fn stack(&self, top: LayerId) -> Stack<'_> {
        let start = if self.is_alive(top) { top.idx } else { INVALID };
        Stack::new(self, start)
    }

    /// Live layers with nothing stacked on top, in slot order.
    #[must_use]
    pub fn tops(&self) -> Vec<LayerId> {
        self.ids()
            .filter(|id| self.above[id.idx as usize] == INVALID)
            .collect()
    }

    // -- Property API --

    /// Shows or hides a layer. Returns whether visibility changed.
    ///
    /// The layers above and below have their culling recomputed on the next
    /// evaluate.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StaleLayer`] if the handle is stale.
    pub fn set_visible(&mut self, id: LayerId, visible: bool) -> Result<bool, Error> {
        let idx = self.check(id)?;
        let changed = self.layers[idx as usize]
            .as_ref()
            .is_some_and(|layer| layer.set_visible(visible));
        if changed {
            self.dirty.mark(idx, dirty::VISIBILITY);
            self.mark_neighbors(idx, dirty::CULLING);
        }
        Ok(changed)
    }

    /// Selects the displayed time step on every layer.
    ///
    /// Returns the slots whose root changed.
    pub fn update_time_step(&mut self, time_step: usize) -> Vec<u32> {
        (0..self.len)
            .filter(|&idx| {
                self.layer_at(idx)
                    .is_some_and(|layer| layer.update_time_step(time_step))
            })
            .collect()
    }

    /// Like [`update_time_step`](Self::update_time_step), reading the step
    /// from the attached document.
    pub fn sync_time_step(&mut self) -> Vec<u32> {
        match self.document() {
            Some(doc) => self.update_time_step(doc.time_step()),
            None => Vec::new(),
        }
    }

    // -- Internal helpers --

    /// Returns the slot index of a live handle.
    pub(crate) fn check(&self, id: LayerId) -> Result<u32, Error> {
        if self.is_alive(id) {
            Ok(id.idx)
        } else {
            Err(Error::StaleLayer(id))
        }
    }

    fn handle_at(&self, idx: u32) -> Option<LayerId> {
        self.layer_at(idx)?;
        Some(LayerId {
            idx,
            generation: self.generation[idx as usize],
        })
    }

    fn grid_at(&self, idx: u32) -> GridSize {
        self.layers[idx as usize]
            .as_ref()
            .map_or(GridSize::new(0, 0), |layer| layer.grid_size())
    }

    /// Marks the layers directly above and below `idx` on `channel`.
    pub(crate) fn mark_neighbors(&mut self, idx: u32, channel: Channel) {
        for n in [self.above[idx as usize], self.below[idx as usize]] {
            if n != INVALID {
                self.dirty.mark(n, channel);
            }
        }
    }

    /// Breaks the link from `idx` to the layer below, if any.
    fn detach_below(&mut self, idx: u32) {
        let old = self.below[idx as usize];
        if old != INVALID {
            self.above[old as usize] = INVALID;
            self.below[idx as usize] = INVALID;
            self.dirty.mark(old, dirty::CULLING);
            self.dirty.mark(idx, dirty::CULLING);
            self.stack_dirty = true;
        }
    }

    /// Breaks the link from `idx` to the layer above, if any.
    fn detach_above(&mut self, idx: u32) {
        let old = self.above[idx as usize];
        if old != INVALID {
            self.below[old as usize] = INVALID;
            self.above[idx as usize] = INVALID;
            self.dirty.mark(old, dirty::CULLING);
            self.dirty.mark(idx, dirty::CULLING);
            self.stack_dirty = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use kurbo::Size;

    use super::*;

    fn layer(name: &str) -> Layer {
        Layer::new(name, GridSize::new(2, 2), Size::new(1.0, 1.0))
    }

    #[test]
    fn insert_and_remove() {
        let mut model = Model::new();
        let id = model.insert(layer("a"));
        assert!(model.is_alive(id));
        assert_eq!(model.len(), 1);
        let removed = model.remove(id).unwrap();
        assert_eq!(removed.name(), "a");
        assert!(!model.is_alive(id));
        assert!(model.is_empty());
    }

    #[test]
    fn generation_prevents_stale_access() {
        let mut model = Model::new();
        let id1 = model.insert(layer("a"));
        model.remove(id1).unwrap();
        let id2 = model.insert(layer("b"));
        // id2 reuses the same slot but has a different generation.
        assert!(!model.is_alive(id1));
        assert!(model.is_alive(id2));
        assert_eq!(id1.idx, id2.idx);
        assert_ne!(id1.generation, id2.generation);
        assert!(model.get(id1).is_none());
        assert_eq!(model.get(id2).map(|l| l.name()), Some("b"));
    }

    #[test]
    fn stale_handles_are_errors() {
        let mut model = Model::new();
        let a = model.insert(layer("a"));
        let b = model.insert(layer("b"));
        model.remove(a).unwrap();
        assert_eq!(model.remove(a).unwrap_err(), Error::StaleLayer(a));
        assert_eq!(model.link(a, b), Err(Error::StaleLayer(a)));
        assert_eq!(model.set_visible(a, false), Err(Error::StaleLayer(a)));
        assert_eq!(model.above(a), None);
    }

    #[test]
    fn link_and_query() {
        let mut model = Model::new();
        let top = model.insert(layer("top"));
        let mid = model.insert(layer("mid"));
        let bot = model.insert(layer("bot"));
        model.link(top, mid).unwrap();
        model.link(mid, bot).unwrap();

        assert_eq!(model.below(top), Some(mid));
        assert_eq!(model.above(bot), Some(mid));
        assert_eq!(model.above(top), None);
        let names: Vec<_> = model
            .stack(top)
            .map(|id| model.get(id).unwrap().name().to_owned())
            .collect();
        assert_eq!(names, ["top", "mid", "bot"]);
        assert_eq!(model.tops(), vec![top]);
    }

    #[test]
    fn relinking_breaks_old_links() {
        let mut model = Model::new();
        let a = model.insert(layer("a"));
        let b = model.insert(layer("b"));
        let c = model.insert(layer("c"));
        model.link(a, b).unwrap();
        model.link(c, b).unwrap();
        assert_eq!(model.below(a), None, "b now sits under c");
        assert_eq!(model.above(b), Some(c));
    }

    #[test]
    fn removed_neighbor_reads_as_none() {
        let mut model = Model::new();
        let a = model.insert(layer("a"));
        let b = model.insert(layer("b"));
        model.link(a, b).unwrap();
        model.remove(b).unwrap();
        assert_eq!(model.below(a), None);
        let c = model.insert(layer("c"));
        assert_eq!(model.below(a), None, "reused slot is not linked");
        assert_eq!(model.above(c), None);
    }

    #[test]
    fn link_rejects_mismatched_grids() {
        let mut model = Model::new();
        let a = model.insert(Layer::new("a", GridSize::new(2, 3), Size::new(1.0, 1.0)));
        let b = model.insert(Layer::new("b", GridSize::new(4, 3), Size::new(1.0, 1.0)));
        assert_eq!(
            model.link(a, b),
            Err(Error::GridMismatch {
                upper: GridSize::new(2, 3),
                lower: GridSize::new(4, 3),
            })
        );
        assert_eq!(model.below(a), None);
    }

    #[test]
    fn link_rejects_cycles() {
        let mut model = Model::new();
        let a = model.insert(layer("a"));
        let b = model.insert(layer("b"));
        assert!(matches!(model.link(a, a), Err(Error::InvalidArgument(_))));
        model.link(a, b).unwrap();
        assert!(matches!(model.link(b, a), Err(Error::InvalidArgument(_))));
        assert_eq!(model.below(a), Some(b), "failed link leaves stack intact");
    }

    #[test]
    fn unlink_below_detaches_both_sides() {
        let mut model = Model::new();
        let a = model.insert(layer("a"));
        let b = model.insert(layer("b"));
        model.link(a, b).unwrap();
        model.unlink_below(a).unwrap();
        assert_eq!(model.below(a), None);
        assert_eq!(model.above(b), None);
    }
}
