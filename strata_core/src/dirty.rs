// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Dirty-tracking channel constants.
//!
//! A [`Model`](crate::model::Model) tracks pending work per layer slot with
//! [`understory_dirty`]. Each channel is an independent category of change,
//! and all of them are local-only: stacked layers see each other in both
//! directions, so dependency edges would form cycles. Where a change to one
//! layer affects its neighbors, the model marks the neighbors explicitly.
//!
//! - [`CONTENT`] is marked when a layer's own dirty flag is found set, i.e.
//!   after cell data, attributes, or the margin changed.
//! - [`VISIBILITY`] is marked on show/hide through the model.
//! - [`CULLING`] is marked on the layers above and below one whose content,
//!   visibility, or stacking changed; their face culling may be stale.
//! - [`TOPOLOGY`] is marked on insert, remove, link, and unlink. It triggers
//!   a stacking order rebuild but no geometry work by itself.
//!
//! # Consumption
//!
//! [`Model::evaluate`](crate::model::Model::evaluate) drains every channel
//! and reports the result as [`SceneChanges`](crate::model::SceneChanges).

use understory_dirty::Channel;

/// Cell data, attributes, or layer parameters changed.
pub const CONTENT: Channel = Channel::new(0);

/// Layer shown or hidden.
pub const VISIBILITY: Channel = Channel::new(1);

/// A stacked neighbor changed; culled faces may need recomputing.
pub const CULLING: Channel = Channel::new(2);

/// Layers inserted, removed, or restacked.
pub const TOPOLOGY: Channel = Channel::new(3);
