// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Error type for grid, layer, and model operations.
//!
//! Geometry builders and `build_scene` never fail; a missing document or
//! layer degrades to an empty group. Everything that validates caller input
//! (grid indices, bulk array lengths, elevation ordering, stale handles)
//! reports one of these variants instead.

use core::fmt;

use crate::layer::GridSize;
use crate::model::LayerId;

/// Errors from layer and model operations.
#[derive(Clone, Debug, PartialEq)]
pub enum Error {
    /// A grid position or attribute index is outside its container.
    OutOfRange {
        /// What was being indexed (e.g. `"row"`, `"attribute"`).
        what: &'static str,
        /// The offending index.
        index: usize,
        /// Number of valid entries.
        len: usize,
    },
    /// A bulk per-cell array does not have one entry per grid cell.
    LengthMismatch {
        /// Number of grid cells.
        expected: usize,
        /// Number of values supplied.
        actual: usize,
    },
    /// A cell would end up with `top < bottom`.
    InvertedCell {
        /// Flat row-major grid index.
        index: usize,
        /// Requested top elevation.
        top: f64,
        /// Requested bottom elevation.
        bottom: f64,
    },
    /// Two layers linked above/below do not share a grid size.
    GridMismatch {
        /// Grid size of the upper layer.
        upper: GridSize,
        /// Grid size of the lower layer.
        lower: GridSize,
    },
    /// The handle refers to a layer that has been removed.
    StaleLayer(LayerId),
    /// An argument is malformed in a way not covered above.
    InvalidArgument(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfRange { what, index, len } => {
                write!(f, "{what} index {index} out of range (len {len})")
            }
            Self::LengthMismatch { expected, actual } => {
                write!(f, "expected {expected} per-cell values, got {actual}")
            }
            Self::InvertedCell { index, top, bottom } => {
                write!(f, "cell {index} has top {top} below bottom {bottom}")
            }
            Self::GridMismatch { upper, lower } => write!(
                f,
                "cannot stack a {}x{} layer above a {}x{} layer",
                upper.rows, upper.cols, lower.rows, lower.cols
            ),
            Self::StaleLayer(id) => write!(f, "stale layer handle {id:?}"),
            Self::InvalidArgument(msg) => write!(f, "invalid argument: {msg}"),
        }
    }
}

impl core::error::Error for Error {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_mentions_index_and_len() {
        let e = Error::OutOfRange {
            what: "row",
            index: 7,
            len: 4,
        };
        assert_eq!(e.to_string(), "row index 7 out of range (len 4)");
    }

    #[test]
    fn display_grid_mismatch() {
        let e = Error::GridMismatch {
            upper: GridSize::new(2, 3),
            lower: GridSize::new(4, 3),
        };
        assert_eq!(e.to_string(), "cannot stack a 2x3 layer above a 4x3 layer");
    }
}
