// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Human-readable trace output.
//!
//! [`PrettyPrintSink`] implements [`TraceSink`] and writes one line per event
//! to a [`Write`](std::io::Write) destination (default: stderr).

use std::io::Write;

use strata_core::trace::{
    AttributeBuildEvent, BuildOutcome, EmptyReason, EvaluateEvent, LayerBuildEvent, TraceSink,
};

/// Writes human-readable trace lines to a [`Write`](std::io::Write) destination.
pub struct PrettyPrintSink<W: Write = Box<dyn Write>> {
    writer: W,
}

impl<W: Write> std::fmt::Debug for PrettyPrintSink<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrettyPrintSink").finish_non_exhaustive()
    }
}

impl PrettyPrintSink {
    /// Creates a sink that writes to stderr.
    #[must_use]
    pub fn stderr() -> Self {
        Self {
            writer: Box::new(std::io::stderr()),
        }
    }

    /// Creates a sink that writes to a boxed writer.
    #[must_use]
    pub fn new(writer: Box<dyn Write>) -> Self {
        Self { writer }
    }
}

impl<W: Write> PrettyPrintSink<W> {
    /// Creates a sink that writes to the given destination.
    #[must_use]
    pub fn with_writer(writer: W) -> Self {
        Self { writer }
    }

    /// Consumes the sink and returns the writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

pub(crate) fn outcome_name(outcome: BuildOutcome) -> &'static str {
    match outcome {
        BuildOutcome::Rebuilt => "rebuilt",
        BuildOutcome::Cached => "cached",
        BuildOutcome::Empty(EmptyReason::NoDocument) => "empty:no-document",
        BuildOutcome::Empty(EmptyReason::NoLayer) => "empty:no-layer",
        BuildOutcome::Empty(EmptyReason::LayerHidden) => "empty:layer-hidden",
        BuildOutcome::Empty(EmptyReason::AttributeHidden) => "empty:hidden",
        BuildOutcome::Empty(EmptyReason::GridTooSmall) => "empty:grid-too-small",
    }
}

impl<W: Write> TraceSink for PrettyPrintSink<W> {
    fn on_attribute_build(&mut self, e: &AttributeBuildEvent<'_>) {
        let _ = writeln!(
            self.writer,
            "[attr] {}/{} kind={} {} vertices={}",
            e.layer,
            e.attribute,
            e.kind.as_str(),
            outcome_name(e.outcome),
            e.vertices,
        );
    }

    fn on_layer_build(&mut self, e: &LayerBuildEvent<'_>) {
        let _ = writeln!(
            self.writer,
            "[layer] {} visible={} attributes={} vertices={} batches={}",
            e.layer, e.visible, e.attributes, e.vertices, e.batches,
        );
    }

    fn on_evaluate(&mut self, e: &EvaluateEvent) {
        let _ = writeln!(
            self.writer,
            "[eval] rebuilt={} visibility={} culling={} added={} removed={} topology={} vertices={}",
            e.rebuilt,
            e.visibility_changed,
            e.culling_invalidated,
            e.added,
            e.removed,
            if e.topology_changed { "changed" } else { "same" },
            e.vertices,
        );
    }
}

#[cfg(test)]
mod tests {
    use strata_core::trace::AttributeKind;

    use super::*;

    fn output(f: impl FnOnce(&mut PrettyPrintSink<Vec<u8>>)) -> String {
        let mut sink = PrettyPrintSink::with_writer(Vec::new());
        f(&mut sink);
        String::from_utf8(sink.into_inner()).unwrap()
    }

    #[test]
    fn attribute_line() {
        let text = output(|sink| {
            sink.on_attribute_build(&AttributeBuildEvent {
                layer: "Layer 1",
                attribute: "heads",
                kind: AttributeKind::HeadLevels,
                outcome: BuildOutcome::Empty(EmptyReason::NoDocument),
                vertices: 0,
            });
        });
        assert_eq!(
            text,
            "[attr] Layer 1/heads kind=head_levels empty:no-document vertices=0\n"
        );
    }

    #[test]
    fn layer_and_evaluate_lines() {
        let text = output(|sink| {
            sink.on_layer_build(&LayerBuildEvent {
                layer: "Layer 2",
                visible: true,
                attributes: 2,
                vertices: 96,
                batches: 1,
            });
            sink.on_evaluate(&EvaluateEvent {
                rebuilt: 1,
                topology_changed: true,
                vertices: 96,
                ..EvaluateEvent::default()
            });
        });
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(
            lines,
            [
                "[layer] Layer 2 visible=true attributes=2 vertices=96 batches=1",
                "[eval] rebuilt=1 visibility=0 culling=0 added=0 removed=0 topology=changed vertices=96",
            ]
        );
    }
}
