// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Grid cells.
//!
//! A [`Cell`] has a fixed grid position and planar center, plus mutable
//! state behind its own mutex: elevations and named per-time-step value
//! vectors. Purging a cell drops that state for good; a purged cell reads
//! as absent everywhere.
//!
//! Cells are only mutated through their [`Layer`](crate::layer::Layer),
//! which keeps the dirty flags of its attributes in step.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use kurbo::Point;

/// Mutable state of an active cell.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CellData {
    /// Elevation of the cell's upper surface.
    pub top: f64,
    /// Elevation of the cell's lower surface.
    pub bottom: f64,
    /// Named time series, one entry per time step.
    pub vectors: HashMap<String, Vec<f64>>,
}

/// A copy of a cell's position and elevations.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CellSnapshot {
    /// Grid row.
    pub row: usize,
    /// Grid column.
    pub col: usize,
    /// Planar center.
    pub center: Point,
    /// Upper elevation.
    pub top: f64,
    /// Lower elevation.
    pub bottom: f64,
}

/// One grid unit of a layer.
#[derive(Debug)]
pub struct Cell {
    row: usize,
    col: usize,
    center: Point,
    data: Mutex<Option<CellData>>,
}

impl Cell {
    pub(crate) fn new(row: usize, col: usize, center: Point) -> Self {
        Self {
            row,
            col,
            center,
            data: Mutex::new(Some(CellData::default())),
        }
    }

    /// Grid row.
    #[must_use]
    pub fn row(&self) -> usize {
        self.row
    }

    /// Grid column.
    #[must_use]
    pub fn col(&self) -> usize {
        self.col
    }

    /// Planar center.
    #[must_use]
    pub fn center(&self) -> Point {
        self.center
    }

    /// Returns `false` once the cell has been purged.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.lock().is_some()
    }

    /// `(top, bottom)`, or `None` if purged.
    #[must_use]
    pub fn elevations(&self) -> Option<(f64, f64)> {
        self.lock().as_ref().map(|d| (d.top, d.bottom))
    }

    /// Position and elevations, or `None` if purged.
    #[must_use]
    pub fn snapshot(&self) -> Option<CellSnapshot> {
        self.elevations().map(|(top, bottom)| CellSnapshot {
            row: self.row,
            col: self.col,
            center: self.center,
            top,
            bottom,
        })
    }

    /// Value of vector `name` at `time_step`.
    ///
    /// `None` if the cell is purged, the vector is missing or too short, or
    /// the slot was never written.
    #[must_use]
    pub fn value(&self, name: &str, time_step: usize) -> Option<f64> {
        let guard = self.lock();
        let v = *guard.as_ref()?.vectors.get(name)?.get(time_step)?;
        (!v.is_nan()).then_some(v)
    }

    /// `(bottom, value)` read under one lock.
    pub(crate) fn bottom_and_value(&self, name: &str, time_step: usize) -> Option<(f64, f64)> {
        let guard = self.lock();
        let data = guard.as_ref()?;
        let v = *data.vectors.get(name)?.get(time_step)?;
        (!v.is_nan()).then_some((data.bottom, v))
    }

    /// A copy of vector `name`, or `None` if purged or missing.
    #[must_use]
    pub fn vector(&self, name: &str) -> Option<Vec<f64>> {
        self.lock().as_ref()?.vectors.get(name).cloned()
    }

    /// Length of vector `name` (zero if purged or missing).
    #[must_use]
    pub fn vector_len(&self, name: &str) -> usize {
        self.lock()
            .as_ref()
            .and_then(|d| d.vectors.get(name))
            .map_or(0, Vec::len)
    }

    /// Sets both elevations; returns `false` if the cell is purged.
    pub(crate) fn set_elevations(&self, top: f64, bottom: f64) -> bool {
        match self.lock().as_mut() {
            Some(d) => {
                d.top = top;
                d.bottom = bottom;
                true
            }
            None => false,
        }
    }

    /// Writes one vector slot, growing the vector with NaN as needed.
    ///
    /// Returns `false` if the cell is purged.
    pub(crate) fn set_value(&self, name: &str, time_step: usize, value: f64) -> bool {
        let mut guard = self.lock();
        let Some(data) = guard.as_mut() else {
            return false;
        };
        let vector = data.vectors.entry(name.to_owned()).or_default();
        if vector.len() <= time_step {
            vector.resize(time_step + 1, f64::NAN);
        }
        vector[time_step] = value;
        true
    }

    /// Drops the cell's state; returns `true` if it was active.
    pub(crate) fn purge(&self) -> bool {
        self.lock().take().is_some()
    }

    fn lock(&self) -> MutexGuard<'_, Option<CellData>> {
        self.data.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
