// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Time-stepped head attributes.
//!
//! Both attributes build one child per simulation time step into a
//! [`Switch`] and activate the step being displayed. [`HeadLevels`] draws a
//! box per cell from its bottom up to the head; [`HeadSurface`] draws a
//! smoothed triangulated surface through the heads.

use std::sync::Arc;

use crate::attribute::{AttributeBase, Prepared, grid_placement, quad_geometry, surface};
use crate::cell::Cell;
use crate::color::{ColorRamp, ZRange};
use crate::document::{Document, HEAD_MAX_COLOR, HEAD_MIN_COLOR, HEADS};
use crate::geometry::{CellWall, Face, Placement, QuadBuffers, Vec3};
use crate::layer::LayerView;
use crate::scene::{Geometry, Group, Primitive, SceneNode, Switch};
use crate::trace::BuildOutcome;

/// Values are compared with the no-data sentinel after scaling by this and
/// truncating to an integer.
pub const NO_DATA_SCALE: f64 = 1000.0;

/// Returns `true` if `value` equals `sentinel` at [`NO_DATA_SCALE`]
/// resolution.
#[must_use]
#[expect(
    clippy::cast_possible_truncation,
    reason = "truncation is the comparison"
)]
pub fn is_no_data(value: f64, sentinel: f64) -> bool {
    (value * NO_DATA_SCALE) as i64 == (sentinel * NO_DATA_SCALE) as i64
}

/// Parameters of the head surface pipeline.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HeadSurfaceOptions {
    /// Midpoint subdivision passes.
    pub subdivisions: u32,
    /// Laplacian smoothing iterations.
    pub smoothing_iterations: u32,
    /// Per-iteration pull toward the neighbor mean, `0.0..=1.0`.
    pub smoothing_weight: f64,
}

impl HeadSurfaceOptions {
    /// Plain triangulation: no subdivision, no smoothing.
    #[must_use]
    pub const fn raw() -> Self {
        Self {
            subdivisions: 0,
            smoothing_iterations: 0,
            smoothing_weight: 0.0,
        }
    }
}

impl Default for HeadSurfaceOptions {
    fn default() -> Self {
        Self {
            subdivisions: 1,
            smoothing_iterations: 2,
            smoothing_weight: 0.5,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Style {
    Cells,
    Surface(HeadSurfaceOptions),
}

/// Shared inputs of every step build.
struct StepContext {
    range: ZRange,
    no_data: Option<f64>,
    ramp: ColorRamp,
    placement: Placement,
}

/// `(bottom, head)` of an active cell with a usable head at `time_step`.
fn valid_head(
    cell: &Cell,
    vector: &str,
    time_step: usize,
    no_data: Option<f64>,
) -> Option<(f64, f64)> {
    cell.bottom_and_value(vector, time_step)
        .filter(|&(_, head)| !no_data.is_some_and(|s| is_no_data(head, s)))
}

/// Boxes from each cell's bottom up to its head, one child per time step.
///
/// A step child is a group with one quad geometry per face direction. Boxes
/// are colored by head value against the document's value range for the
/// vector, or the range of the heads themselves.
#[derive(Clone, Debug)]
pub struct HeadLevels {
    base: AttributeBase,
    vector: String,
    style: Style,
    switch: Switch,
    time_step: usize,
}

impl HeadLevels {
    /// Creates a head attribute reading the [`HEADS`] vector.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        let base = AttributeBase::new(name);
        let switch = Switch::new(base.name());
        Self {
            base,
            vector: HEADS.to_owned(),
            style: Style::Cells,
            switch,
            time_step: 0,
        }
    }

    /// Reads vector `name` instead of [`HEADS`].
    #[must_use]
    pub fn with_vector(mut self, name: impl Into<String>) -> Self {
        self.vector = name.into();
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

    /// Name of the vector drawn.
    #[must_use]
    pub fn vector(&self) -> &str {
        &self.vector
    }

    /// Number of built time steps.
    #[must_use]
    pub fn step_count(&self) -> usize {
        self.switch.children.len()
    }

    /// Index of the displayed step.
    #[must_use]
    pub fn active(&self) -> Option<usize> {
        self.switch.active
    }

    /// Activates the child for `time_step`, clamped into the built range.
    ///
    /// Returns `true` if the active child changed. The requested step is
    /// remembered and reapplied after the next rebuild.
    pub fn update(&mut self, time_step: usize) -> bool {
        self.time_step = time_step;
        let changed = self.switch.set_active_clamped(time_step);
        if changed && matches!(self.base.cached(), Some(SceneNode::Switch(_))) {
            self.base
                .replace_cached(SceneNode::Switch(self.switch.clone()));
        }
        changed
    }

    /// Builds every time step from scratch.
    ///
    /// The step count is the longest vector in the layer, or the document's
    /// step count if larger.
    pub fn init(&mut self, doc: &dyn Document, layer: &LayerView<'_>) {
        let steps = layer
            .cells
            .iter()
            .map(|c| c.vector_len(&self.vector))
            .max()
            .unwrap_or(0)
            .max(doc.num_time_steps());
        let no_data = doc.no_data(&self.vector);
        let ctx = StepContext {
            range: doc
                .value_range(&self.vector)
                .or_else(|| self.value_range(layer, steps, no_data))
                .unwrap_or_default(),
            no_data,
            ramp: self.base.ramp(doc, HEAD_MIN_COLOR, HEAD_MAX_COLOR),
            placement: grid_placement(doc),
        };

        let mut switch = Switch::new(self.base.name());
        for t in 0..steps {
            let step = match self.style {
                Style::Cells => self.cell_step(doc, layer, t, &ctx),
                Style::Surface(options) => self.surface_step(options, doc, layer, t, &ctx),
            };
            switch.children.push(step);
        }
        switch.set_active_clamped(self.time_step);
        self.switch = switch;
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
        self.init(doc, layer);
        let node = SceneNode::Switch(self.switch.clone());
        (self.base.store(node), BuildOutcome::Rebuilt)
    }

    /// Range of all valid heads over every step.
    fn value_range(
        &self,
        layer: &LayerView<'_>,
        steps: usize,
        no_data: Option<f64>,
    ) -> Option<ZRange> {
        ZRange::from_values(layer.cells.iter().flat_map(|cell| {
            (0..steps).filter_map(move |t| {
                valid_head(cell, &self.vector, t, no_data).map(|(_, head)| head)
            })
        }))
    }

    fn step_name(&self, time_step: usize) -> String {
        format!("{}/{time_step}", self.base.name())
    }

    fn cell_step(
        &self,
        doc: &dyn Document,
        layer: &LayerView<'_>,
        time_step: usize,
        ctx: &StepContext,
    ) -> SceneNode {
        let walls = Face::ALL.map(|face| CellWall::new(face, layer.cell_size, layer.margin));
        let mut buffers: [QuadBuffers; 6] = core::array::from_fn(|_| QuadBuffers::default());

        for cell in layer.cells {
            let Some((bottom, head)) = valid_head(cell, &self.vector, time_step, ctx.no_data) else {
                continue;
            };
            let bottom = bottom.min(head);
            for (wall, out) in walls.iter().zip(&mut buffers) {
                let first = out.len();
                wall.append(cell.center(), head, bottom, &ctx.placement, out);
                // Color the whole box by its head.
                out.raw_z[first..].fill(head);
            }
        }

        let mut group = Group::new(self.step_name(time_step));
        for out in buffers {
            if !out.is_empty() {
                let geometry = quad_geometry(out, &ctx.ramp, ctx.range, doc);
                group.children.push(SceneNode::Geometry(Arc::new(geometry)));
            }
        }
        SceneNode::Group(group)
    }

    fn surface_step(
        &self,
        options: HeadSurfaceOptions,
        doc: &dyn Document,
        layer: &LayerView<'_>,
        time_step: usize,
        ctx: &StepContext,
    ) -> SceneNode {
        let points: Vec<Option<Vec3>> = layer
            .cells
            .iter()
            .map(|cell| {
                valid_head(cell, &self.vector, time_step, ctx.no_data).map(|(_, head)| {
                    let c = cell.center();
                    Vec3::new(c.x, c.y, head)
                })
            })
            .collect();

        let mut mesh = surface::triangulate(layer.grid, &points);
        surface::subdivide(&mut mesh, options.subdivisions);
        surface::smooth(
            &mut mesh,
            options.smoothing_iterations,
            options.smoothing_weight,
        );
        surface::compute_normals(&mut mesh);

        let mut group = Group::new(self.step_name(time_step));
        if mesh.indices.is_empty() {
            return SceneNode::Group(group);
        }
        let colors = mesh
            .positions
            .iter()
            .map(|p| ctx.ramp.at(p.z, ctx.range))
            .collect();
        let mut positions: Vec<Vec3> = mesh
            .positions
            .iter()
            .map(|&p| ctx.placement.apply(p))
            .collect();
        doc.transform_coordinates(&mut positions);
        group.children.push(SceneNode::Geometry(Arc::new(Geometry {
            primitive: Primitive::Triangles,
            positions,
            normals: mesh.normals,
            colors,
            indices: mesh.indices,
        })));
        SceneNode::Group(group)
    }
}

/// A smoothed surface through the heads, one child per time step.
#[derive(Clone, Debug)]
pub struct HeadSurface {
    levels: HeadLevels,
}

impl HeadSurface {
    /// Creates a surface attribute reading the [`HEADS`] vector.
    #[must_use]
    pub fn new(name: impl Into<String>, options: HeadSurfaceOptions) -> Self {
        let mut levels = HeadLevels::new(name);
        levels.style = Style::Surface(options);
        Self { levels }
    }

    /// Reads vector `name` instead of [`HEADS`].
    #[must_use]
    pub fn with_vector(mut self, name: impl Into<String>) -> Self {
        self.levels.vector = name.into();
        self
    }

    /// Shared state.
    #[must_use]
    pub fn base(&self) -> &AttributeBase {
        &self.levels.base
    }

    /// Shared state, mutably.
    pub fn base_mut(&mut self) -> &mut AttributeBase {
        &mut self.levels.base
    }

    /// Surface pipeline parameters.
    #[must_use]
    pub fn options(&self) -> HeadSurfaceOptions {
        match self.levels.style {
            Style::Surface(options) => options,
            Style::Cells => HeadSurfaceOptions::raw(),
        }
    }

    /// Changes the surface pipeline parameters.
    pub fn set_options(&mut self, options: HeadSurfaceOptions) {
        if self.options() != options {
            self.levels.style = Style::Surface(options);
            self.levels.base.mark_dirty();
        }
    }

    /// Number of built time steps.
    #[must_use]
    pub fn step_count(&self) -> usize {
        self.levels.step_count()
    }

    /// Index of the displayed step.
    #[must_use]
    pub fn active(&self) -> Option<usize> {
        self.levels.active()
    }

    /// See [`HeadLevels::update`].
    pub fn update(&mut self, time_step: usize) -> bool {
        self.levels.update(time_step)
    }

    /// Builds every time step from scratch.
    pub fn init(&mut self, doc: &dyn Document, layer: &LayerView<'_>) {
        self.levels.init(doc, layer);
    }

    /// Builds (or returns the cached) node.
    pub fn build_scene(
        &mut self,
        doc: Option<&dyn Document>,
        layer: Option<&LayerView<'_>>,
    ) -> SceneNode {
        self.levels.build(doc, layer).0
    }

    pub(crate) fn build(
        &mut self,
        doc: Option<&dyn Document>,
        layer: Option<&LayerView<'_>>,
    ) -> (SceneNode, BuildOutcome) {
        self.levels.build(doc, layer)
    }
}
