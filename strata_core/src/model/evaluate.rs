// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Scene evaluation and change tracking.
//!
//! Evaluation polls layers for data writes, then drains each dirty channel:
//!
//! 1. **CONTENT** is marked for every layer whose dirty flag is set; the
//!    layers stacked directly above and below it get **CULLING**.
//! 2. **CULLING** drains into [`Layer::invalidate_culling`], which marks the
//!    attributes that hide faces against neighbors.
//! 3. **VISIBILITY** and **CONTENT** drain into the rebuild set.
//! 4. **TOPOLOGY** drains and is discarded (the stack order was already
//!    rebuilt at the start of evaluation if needed).
//!
//! Every slot in the rebuild set is built once, top of stack first, with
//! its neighbors' cells, visibility and drawn faces snapshotted before the
//! layer's own lock is taken.
//!
//! [`SceneChanges`] uses raw slot indices (`u32`) rather than [`LayerId`]
//! handles; use [`Model::layer_at`] to resolve them.
//!
//! [`LayerId`]: super::LayerId
//! [`Layer::invalidate_culling`]: crate::layer::Layer::invalidate_culling

use super::id::INVALID;
use super::store::Model;
use crate::dirty;
use crate::layer::{NeighborView, Neighbors};
use crate::scene::{Group, SceneNode};
use crate::trace::{EvaluateEvent, Tracer};

/// The set of changes produced by a single [`Model::evaluate`] call.
#[derive(Clone, Debug, Default)]
pub struct SceneChanges {
    /// Layers whose scene was rebuilt, in slot order.
    pub rebuilt: Vec<u32>,
    /// Layers shown or hidden since the last evaluate.
    pub visibility: Vec<u32>,
    /// Layers whose face culling was recomputed.
    pub culling: Vec<u32>,
    /// Layers added since the last evaluate.
    pub added: Vec<u32>,
    /// Layers removed since the last evaluate.
    pub removed: Vec<u32>,
    /// Whether the stacking changed (stack order was rebuilt).
    pub topology_changed: bool,
}

impl SceneChanges {
    /// Clears all change lists.
    pub fn clear(&mut self) {
        self.rebuilt.clear();
        self.visibility.clear();
        self.culling.clear();
        self.added.clear();
        self.removed.clear();
        self.topology_changed = false;
    }

    /// Returns `true` if nothing changed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rebuilt.is_empty()
            && self.visibility.is_empty()
            && self.culling.is_empty()
            && self.added.is_empty()
            && self.removed.is_empty()
            && !self.topology_changed
    }
}

impl Model {
    /// Rebuilds every layer that changed and returns what changed.
    pub fn evaluate(&mut self) -> SceneChanges {
        let mut changes = SceneChanges::default();
        self.evaluate_into(&mut changes, &mut Tracer::none());
        changes
    }

    /// Like [`evaluate`](Self::evaluate), reporting builds to `tracer`.
    pub fn evaluate_traced(&mut self, tracer: &mut Tracer<'_>) -> SceneChanges {
        let mut changes = SceneChanges::default();
        self.evaluate_into(&mut changes, tracer);
        changes
    }

    /// Like [`evaluate_traced`](Self::evaluate_traced), but reuses a
    /// caller-provided buffer.
    pub fn evaluate_into(&mut self, changes: &mut SceneChanges, tracer: &mut Tracer<'_>) {
        changes.clear();

        if self.stack_dirty {
            self.rebuild_stack_order();
            changes.topology_changed = true;
            self.stack_dirty = false;
        }

        // Poll for data writes made directly on shared layers.
        for idx in 0..self.len {
            let dirty = self.layer_at(idx).is_some_and(|layer| layer.is_dirty());
            if dirty {
                self.dirty.mark(idx, dirty::CONTENT);
                self.mark_neighbors(idx, dirty::CULLING);
            }
        }

        let culling: Vec<u32> = self
            .dirty
            .drain(dirty::CULLING)
            .deterministic()
            .run()
            .collect();
        for idx in culling {
            if self
                .layer_at(idx)
                .is_some_and(|layer| layer.invalidate_culling())
            {
                changes.culling.push(idx);
            }
        }

        changes.visibility = self
            .dirty
            .drain(dirty::VISIBILITY)
            .deterministic()
            .run()
            .filter(|&idx| self.layer_at(idx).is_some())
            .collect();

        let content: Vec<u32> = self
            .dirty
            .drain(dirty::CONTENT)
            .deterministic()
            .run()
            .collect();

        let mut rebuild: Vec<u32> = content
            .into_iter()
            .chain(changes.visibility.iter().copied())
            .chain(changes.culling.iter().copied())
            .filter(|&idx| self.layer_at(idx).is_some())
            .collect();
        rebuild.sort_unstable();
        rebuild.dedup();

        let mut vertices = 0;
        for &idx in &self.stack_order {
            if rebuild.binary_search(&idx).is_ok() {
                vertices += self.build_slot(idx, tracer).vertex_count();
            }
        }
        changes.rebuilt = rebuild;

        // Topology was handled by the stack order rebuild above.
        let _: Vec<u32> = self
            .dirty
            .drain(dirty::TOPOLOGY)
            .deterministic()
            .run()
            .collect();

        core::mem::swap(&mut self.pending_added, &mut changes.added);
        core::mem::swap(&mut self.pending_removed, &mut changes.removed);

        tracer.evaluate(&EvaluateEvent {
            rebuilt: changes.rebuilt.len(),
            visibility_changed: changes.visibility.len(),
            culling_invalidated: changes.culling.len(),
            added: changes.added.len(),
            removed: changes.removed.len(),
            topology_changed: changes.topology_changed,
            vertices,
        });
    }

    /// The current model scene: one group per live layer, top of stack
    /// first.
    ///
    /// Reflects the last [`evaluate`](Self::evaluate); layers never
    /// evaluated contribute empty groups.
    #[must_use]
    pub fn scene(&self) -> SceneNode {
        let mut group = Group::new("model");
        group.children = self
            .stack_order
            .iter()
            .filter_map(|&idx| self.layer_at(idx))
            .map(|layer| layer.root())
            .collect();
        SceneNode::Group(group)
    }

    /// Slot indices of live layers, each stack top to bottom, stacks in
    /// slot order of their top layer.
    ///
    /// Only valid after [`evaluate`](Self::evaluate) has been called at
    /// least once.
    #[must_use]
    pub fn stack_order(&self) -> &[u32] {
        &self.stack_order
    }

    /// Builds one layer against its current neighbors.
    fn build_slot(&self, idx: u32, tracer: &mut Tracer<'_>) -> SceneNode {
        let Some(layer) = self.layer_at(idx) else {
            return SceneNode::empty("");
        };
        let neighbor = |n: u32| {
            if n == INVALID {
                None
            } else {
                self.layer_at(n).map(|l| NeighborView::of(l))
            }
        };
        let neighbors = Neighbors {
            above: neighbor(self.above[idx as usize]),
            below: neighbor(self.below[idx as usize]),
        };
        layer.build_scene_traced(neighbors, tracer)
    }

    fn rebuild_stack_order(&mut self) {
        self.stack_order.clear();
        for idx in 0..self.len {
            if self.layers[idx as usize].is_none() || self.above[idx as usize] != INVALID {
                continue;
            }
            let mut current = idx;
            // Bounded walk; link() refuses cycles.
            for _ in 0..self.len {
                if current == INVALID {
                    break;
                }
                self.stack_order.push(current);
                current = self.below[current as usize];
            }
        }
    }
}
