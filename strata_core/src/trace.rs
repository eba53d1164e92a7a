// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tracing and diagnostics for scene builds.
//!
//! This module provides a [`TraceSink`] trait with one method per build
//! event. All method bodies default to no-ops, so implementing only the
//! events you care about is fine.
//!
//! [`Tracer`] wraps an optional `&mut dyn TraceSink`. When the `trace`
//! feature is **off**, every `Tracer` method compiles to nothing. When
//! **on**, each method performs a single `Option` branch before dispatching.
//!
//! # Crate features
//!
//! - `trace` enables the `Tracer` method bodies.

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Which attribute variant produced an event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AttributeKind {
    /// Selected cell faces.
    Quads,
    /// All six cell faces.
    Boxes,
    /// One group per face direction.
    CellBoundary,
    /// Time-stepped head boxes.
    HeadLevels,
    /// Time-stepped smoothed head surface.
    HeadSurface,
}

impl AttributeKind {
    /// Short lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Quads => "quads",
            Self::Boxes => "boxes",
            Self::CellBoundary => "cell_boundary",
            Self::HeadLevels => "head_levels",
            Self::HeadSurface => "head_surface",
        }
    }
}

/// Why an attribute produced an empty group.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EmptyReason {
    /// No document was available; the attribute stays dirty.
    NoDocument,
    /// No layer was available; the attribute stays dirty.
    NoLayer,
    /// The layer is hidden.
    LayerHidden,
    /// The attribute is hidden.
    AttributeHidden,
    /// The grid is smaller than 2×2.
    GridTooSmall,
}

/// What an attribute build did.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BuildOutcome {
    /// Geometry was regenerated.
    Rebuilt,
    /// The attribute was clean and returned its cached node.
    Cached,
    /// An empty group was produced.
    Empty(EmptyReason),
}

impl BuildOutcome {
    /// Returns `true` if geometry was regenerated.
    #[must_use]
    pub const fn is_rebuilt(self) -> bool {
        matches!(self, Self::Rebuilt)
    }
}

// ---------------------------------------------------------------------------
// Event structs
// ---------------------------------------------------------------------------

/// Emitted once per attribute during a layer build.
#[derive(Clone, Copy, Debug)]
pub struct AttributeBuildEvent<'a> {
    /// Owning layer name.
    pub layer: &'a str,
    /// Attribute name.
    pub attribute: &'a str,
    /// Attribute variant.
    pub kind: AttributeKind,
    /// What the build did.
    pub outcome: BuildOutcome,
    /// Drawn vertices in the resulting node.
    pub vertices: usize,
}

/// Emitted at the end of a layer build.
#[derive(Clone, Copy, Debug)]
pub struct LayerBuildEvent<'a> {
    /// Layer name.
    pub layer: &'a str,
    /// Whether the layer was visible.
    pub visible: bool,
    /// Number of attributes.
    pub attributes: usize,
    /// Drawn vertices under the new root.
    pub vertices: usize,
    /// Drawn geometry batches under the new root.
    pub batches: usize,
}

/// Emitted at the end of [`Model::evaluate`](crate::model::Model::evaluate).
#[derive(Clone, Copy, Debug, Default)]
pub struct EvaluateEvent {
    /// Layers whose root was rebuilt.
    pub rebuilt: usize,
    /// Layers whose visibility changed.
    pub visibility_changed: usize,
    /// Layers whose culling was invalidated by a neighbor.
    pub culling_invalidated: usize,
    /// Layers inserted since the previous evaluate.
    pub added: usize,
    /// Layers removed since the previous evaluate.
    pub removed: usize,
    /// Whether the stacking order was rebuilt.
    pub topology_changed: bool,
    /// Drawn vertices across the rebuilt layers.
    pub vertices: usize,
}

// ---------------------------------------------------------------------------
// TraceSink trait
// ---------------------------------------------------------------------------

/// Receives trace events from scene builds.
///
/// All methods have default no-op implementations, so you only need to
/// override the events you care about.
pub trait TraceSink {
    /// Called after each attribute build.
    fn on_attribute_build(&mut self, e: &AttributeBuildEvent<'_>) {
        _ = e;
    }

    /// Called after each layer build.
    fn on_layer_build(&mut self, e: &LayerBuildEvent<'_>) {
        _ = e;
    }

    /// Called at the end of a model evaluation.
    fn on_evaluate(&mut self, e: &EvaluateEvent) {
        _ = e;
    }
}

// ---------------------------------------------------------------------------
// NoopSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that discards all events.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl TraceSink for NoopSink {}

// ---------------------------------------------------------------------------
// Tracer wrapper
// ---------------------------------------------------------------------------

/// Thin wrapper around an optional [`TraceSink`].
///
/// When the `trace` feature is **off**, every method compiles to nothing.
/// When **on**, each method checks the inner `Option` (one branch) before
/// dispatching to the sink.
pub struct Tracer<'a> {
    #[cfg(feature = "trace")]
    sink: Option<&'a mut dyn TraceSink>,
    #[cfg(not(feature = "trace"))]
    _marker: core::marker::PhantomData<&'a mut dyn TraceSink>,
}

impl core::fmt::Debug for Tracer<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Tracer").finish_non_exhaustive()
    }
}

impl<'a> Tracer<'a> {
    /// Creates a tracer that dispatches to the given sink.
    #[inline]
    #[must_use]
    pub fn new(sink: &'a mut dyn TraceSink) -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: Some(sink) }
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = sink;
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Creates a tracer that discards all events.
    #[inline]
    #[must_use]
    pub fn none() -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: None }
        }
        #[cfg(not(feature = "trace"))]
        {
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Emits an [`AttributeBuildEvent`].
    #[inline]
    pub fn attribute_build(&mut self, e: &AttributeBuildEvent<'_>) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_attribute_build(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`LayerBuildEvent`].
    #[inline]
    pub fn layer_build(&mut self, e: &LayerBuildEvent<'_>) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_layer_build(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits an [`EvaluateEvent`].
    #[inline]
    pub fn evaluate(&mut self, e: &EvaluateEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_evaluate(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
