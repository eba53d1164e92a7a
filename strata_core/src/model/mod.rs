// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Layer stack data model.
//!
//! A [`Model`] owns the layers of one groundwater model. Each layer has:
//!
//! - An identity ([`LayerId`]), a generational handle that becomes stale
//!   when the layer is removed.
//! - Stacking: at most one layer directly [`above`](Model::above) and one
//!   directly [`below`](Model::below). Linked layers share a grid size, and
//!   attributes with face culling hide the faces they share.
//! - Its own cells and attributes, held behind an `Arc` so data can be
//!   written from elsewhere while the model keeps evaluating.
//!
//! Layers are stored in struct-of-arrays layout with index-based handles.
//!
//! # Dirty tracking
//!
//! Model mutations mark the corresponding dirty channel (see
//! [`dirty`](crate::dirty)); data writes on a layer are picked up by polling
//! its dirty flag in [`evaluate`](Model::evaluate).
//!
//! - **CONTENT** / **VISIBILITY**: local; only the layer itself rebuilds.
//! - **CULLING**: marked on the layers above and below whenever a layer
//!   changes, is shown or hidden, or is linked or unlinked.
//! - **TOPOLOGY**: insert, remove, link and unlink; triggers a stack order
//!   rebuild.

mod evaluate;
mod id;
mod store;
mod traverse;

pub use evaluate::SceneChanges;
pub use id::{INVALID, LayerId};
pub use store::Model;
pub use traverse::Stack;
