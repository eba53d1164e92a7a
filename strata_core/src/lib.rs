// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Cell geometry, attribute compositing and layer stacking for groundwater
//! model visualization.
//!
//! `strata_core` turns the structured grid of a layered Modflow model into
//! renderer-neutral scene graphs. Each cell is a box between its top and
//! bottom elevation; attributes decide which faces of those boxes (or which
//! head levels) are drawn, how they are colored, and which faces can be
//! culled because a neighbor covers them.
//!
//! # Architecture
//!
//! ```text
//!   Discretization / HeadLevelOutput (reader)
//!       │
//!       ▼
//!   Model ──► Layer ──► Cell
//!     │         │
//!     │         └──► Attribute (Quads, Boxes, CellBoundary,
//!     │                         HeadLevels, HeadSurface)
//!     ▼
//!   Model::evaluate() ──► SceneChanges
//!     │
//!     ▼
//!   Model::scene() ──► SceneNode ──► renderer
//! ```
//!
//! **[`model`]**: Struct-of-arrays arena of layers with generational
//! handles and above/below stacking. Evaluation rebuilds only layers whose
//! data, visibility or neighbors changed.
//!
//! **[`layer`]**: A grid of [`Cell`](cell::Cell)s plus an ordered list of
//! attributes composed into one root node.
//!
//! **[`attribute`]**: The attribute variants and their geometry builders.
//!
//! **[`geometry`]**: Cell boxes, faces, and the quad builders shared by all
//! attributes.
//!
//! **[`document`]**: The [`Document`](document::Document) trait supplying
//! colors, offsets, scaling, no-data sentinels and the current time step.
//!
//! **[`scene`]**: The scene graph handed to a renderer.
//!
//! **[`dirty`]**: Model-level dirty channels via `understory_dirty`.
//!
//! **[`trace`]**: [`TraceSink`](trace::TraceSink) trait and event types for
//! build instrumentation, with zero-overhead [`Tracer`](trace::Tracer)
//! wrapper.
//!
//! # Crate features
//!
//! - `trace` (disabled by default): Enables `Tracer` method bodies (one
//!   branch per call site).

#![cfg_attr(docsrs, feature(doc_auto_cfg))]

pub mod attribute;
pub mod cell;
pub mod color;
pub mod dirty;
pub mod document;
pub mod error;
pub mod geometry;
pub mod layer;
pub mod model;
pub mod reader;
pub mod scene;
pub mod trace;
pub mod transform;

pub use error::Error;
