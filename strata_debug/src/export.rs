// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! JSON export of scene graphs and recorded events.
//!
//! [`scene_json`] summarizes a [`SceneNode`] tree: names, node kinds, the
//! active child of switches, and per-batch vertex and primitive counts.
//! Vertex data itself is not written. [`events_json`] turns a
//! [`RecorderSink`](crate::recorder::RecorderSink) log into an array of
//! event objects.

use std::io::{self, Write};

use serde_json::{Value, json};

use strata_core::scene::{Primitive, SceneNode};

use crate::pretty::outcome_name;
use crate::recorder::RecordedEvent;

/// Summarizes a scene graph as JSON.
#[must_use]
pub fn scene_json(node: &SceneNode) -> Value {
    match node {
        SceneNode::Group(g) => json!({
            "type": "group",
            "name": g.name,
            "vertices": node.vertex_count(),
            "children": g.children.iter().map(scene_json).collect::<Vec<_>>(),
        }),
        SceneNode::Switch(s) => json!({
            "type": "switch",
            "name": s.name,
            "active": s.active,
            "vertices": node.vertex_count(),
            "children": s.children.iter().map(scene_json).collect::<Vec<_>>(),
        }),
        SceneNode::Geometry(geom) => json!({
            "type": "geometry",
            "primitive": match geom.primitive {
                Primitive::Quads => "quads",
                Primitive::Triangles => "triangles",
            },
            "vertices": geom.vertex_count(),
            "primitives": geom.primitive_count(),
        }),
    }
}

/// Writes [`scene_json`] of `node`, pretty-printed, to `writer`.
pub fn write_scene(node: &SceneNode, writer: &mut dyn Write) -> io::Result<()> {
    serde_json::to_writer_pretty(&mut *writer, &scene_json(node))?;
    writeln!(writer)
}

/// Converts recorded events to a JSON array, oldest first.
#[must_use]
pub fn events_json(events: &[RecordedEvent]) -> Value {
    let events: Vec<Value> = events
        .iter()
        .map(|recorded| match recorded {
            RecordedEvent::AttributeBuild(a) => json!({
                "event": "attribute_build",
                "layer": a.layer,
                "attribute": a.attribute,
                "kind": a.kind.as_str(),
                "outcome": outcome_name(a.outcome),
                "vertices": a.vertices,
            }),
            RecordedEvent::LayerBuild(l) => json!({
                "event": "layer_build",
                "layer": l.layer,
                "visible": l.visible,
                "attributes": l.attributes,
                "vertices": l.vertices,
                "batches": l.batches,
            }),
            RecordedEvent::Evaluate(e) => json!({
                "event": "evaluate",
                "rebuilt": e.rebuilt,
                "visibility_changed": e.visibility_changed,
                "culling_invalidated": e.culling_invalidated,
                "added": e.added,
                "removed": e.removed,
                "topology_changed": e.topology_changed,
                "vertices": e.vertices,
            }),
        })
        .collect();
    Value::Array(events)
}
