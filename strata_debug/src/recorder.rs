// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! In-memory event recording.
//!
//! [`RecorderSink`] implements [`TraceSink`] and stores every event as an
//! owned [`RecordedEvent`], so a log can outlive the names borrowed by the
//! live events.

use strata_core::trace::{
    AttributeBuildEvent, AttributeKind, BuildOutcome, EvaluateEvent, LayerBuildEvent, TraceSink,
};

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// An owned copy of an [`AttributeBuildEvent`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AttributeRecord {
    /// Owning layer name.
    pub layer: String,
    /// Attribute name.
    pub attribute: String,
    /// Attribute variant.
    pub kind: AttributeKind,
    /// What the build did.
    pub outcome: BuildOutcome,
    /// Drawn vertices in the resulting node.
    pub vertices: usize,
}

/// An owned copy of a [`LayerBuildEvent`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LayerRecord {
    /// Layer name.
    pub layer: String,
    /// Whether the layer was visible.
    pub visible: bool,
    /// Number of attributes.
    pub attributes: usize,
    /// Drawn vertices under the new root.
    pub vertices: usize,
    /// Drawn geometry batches under the new root.
    pub batches: usize,
}

/// A recorded event.
#[derive(Clone, Debug)]
pub enum RecordedEvent {
    /// An attribute build.
    AttributeBuild(AttributeRecord),
    /// A layer build.
    LayerBuild(LayerRecord),
    /// A model evaluation.
    Evaluate(EvaluateEvent),
}

// ---------------------------------------------------------------------------
// RecorderSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that keeps every event in memory.
#[derive(Debug, Default)]
pub struct RecorderSink {
    events: Vec<RecordedEvent>,
}

impl RecorderSink {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Recorded events, oldest first.
    #[must_use]
    pub fn events(&self) -> &[RecordedEvent] {
        &self.events
    }

    /// Consumes the recorder and returns the events.
    #[must_use]
    pub fn into_events(self) -> Vec<RecordedEvent> {
        self.events
    }

    /// Drops everything recorded so far.
    pub fn clear(&mut self) {
        self.events.clear();
    }

    /// Attribute builds that regenerated geometry.
    pub fn rebuilt_attributes(&self) -> impl Iterator<Item = &AttributeRecord> {
        self.events.iter().filter_map(|e| match e {
            RecordedEvent::AttributeBuild(a) if a.outcome.is_rebuilt() => Some(a),
            _ => None,
        })
    }

    /// Names of the layers built, in build order.
    pub fn built_layers(&self) -> impl Iterator<Item = &str> {
        self.events.iter().filter_map(|e| match e {
            RecordedEvent::LayerBuild(l) => Some(l.layer.as_str()),
            _ => None,
        })
    }
}

impl TraceSink for RecorderSink {
    fn on_attribute_build(&mut self, e: &AttributeBuildEvent<'_>) {
        self.events
            .push(RecordedEvent::AttributeBuild(AttributeRecord {
                layer: e.layer.to_owned(),
                attribute: e.attribute.to_owned(),
                kind: e.kind,
                outcome: e.outcome,
                vertices: e.vertices,
            }));
    }

    fn on_layer_build(&mut self, e: &LayerBuildEvent<'_>) {
        self.events.push(RecordedEvent::LayerBuild(LayerRecord {
            layer: e.layer.to_owned(),
            visible: e.visible,
            attributes: e.attributes,
            vertices: e.vertices,
            batches: e.batches,
        }));
    }

    fn on_evaluate(&mut self, e: &EvaluateEvent) {
        self.events.push(RecordedEvent::Evaluate(*e));
    }
}
