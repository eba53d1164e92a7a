// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The document a model belongs to.
//!
//! Layers and attributes ask their [`Document`] for everything that is
//! shared across a model: the elevation range colors are mapped against,
//! named colors, the length conversion factor, origin offsets, no-data
//! sentinels, the current time step, and a final coordinate transform.
//! Layers hold it weakly; if the document is gone, geometry builds degrade
//! to empty groups.
//!
//! [`BasicDocument`] implements the trait from a [`DocumentConfig`].

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use crate::color::{Color, ColorRamp, ZRange};
use crate::geometry::Vec3;
use crate::transform::Transform3d;

/// Offset key applied to all grid geometry.
pub const GRID_OFFSET: &str = "grid";
/// Vector name holding simulated head levels.
pub const HEADS: &str = "heads";
/// Color at the bottom of the elevation range.
pub const ELEVATION_MIN_COLOR: &str = "elevation_min";
/// Color at the top of the elevation range.
pub const ELEVATION_MAX_COLOR: &str = "elevation_max";
/// Color at the bottom of the head range.
pub const HEAD_MIN_COLOR: &str = "head_min";
/// Color at the top of the head range.
pub const HEAD_MAX_COLOR: &str = "head_max";

/// Model-wide parameters consumed while building geometry.
///
/// Only [`z_range`](Self::z_range) is required; every other method has a
/// neutral default.
pub trait Document: Send + Sync {
    /// Elevation range that elevation colors are interpolated over.
    fn z_range(&self) -> ZRange;

    /// A named color.
    fn color(&self, name: &str) -> Option<Color> {
        _ = name;
        None
    }

    /// Factor converting model length units to display units.
    fn length_conversion(&self) -> f64 {
        1.0
    }

    /// A named origin offset.
    fn offset(&self, name: &str) -> Vec3 {
        _ = name;
        Vec3::ZERO
    }

    /// The no-data sentinel of a named vector, if it has one.
    fn no_data(&self, name: &str) -> Option<f64> {
        _ = name;
        None
    }

    /// A named value range (e.g. [`HEADS`]) for color interpolation.
    fn value_range(&self, name: &str) -> Option<ZRange> {
        _ = name;
        None
    }

    /// Maps placed vertices into display coordinates, in place.
    fn transform_coordinates(&self, vertices: &mut [Vec3]) {
        _ = vertices;
    }

    /// Time step currently being displayed.
    fn time_step(&self) -> usize {
        0
    }

    /// Number of time steps the document knows about.
    fn num_time_steps(&self) -> usize {
        0
    }

    /// Signals that something in the document needs redrawing.
    fn mark_dirty(&self) {}

    /// Ramp built from two named colors, falling back to `fallback`.
    fn color_ramp(&self, min: &str, max: &str, fallback: ColorRamp) -> ColorRamp {
        ColorRamp::new(
            self.color(min).unwrap_or(fallback.min),
            self.color(max).unwrap_or(fallback.max),
        )
    }
}

/// Settings for a [`BasicDocument`].
#[derive(Clone, Debug)]
pub struct DocumentConfig {
    /// Elevation range for color interpolation.
    pub z_range: ZRange,
    /// Named colors.
    pub colors: HashMap<String, Color>,
    /// Length conversion factor.
    pub length_conversion: f64,
    /// Named origin offsets.
    pub offsets: HashMap<String, Vec3>,
    /// No-data sentinels by vector name.
    pub no_data: HashMap<String, f64>,
    /// Value ranges by vector name.
    pub value_ranges: HashMap<String, ZRange>,
    /// Coordinate transform applied after placement.
    pub transform: Transform3d,
    /// Number of simulation time steps.
    pub num_time_steps: usize,
}

impl DocumentConfig {
    /// Elevation colors running brown → green and head colors running
    /// light → dark blue, with the usual Modflow dry-cell sentinel for
    /// heads.
    #[must_use]
    pub fn modflow(z_range: ZRange) -> Self {
        let mut config = Self {
            z_range,
            ..Self::default()
        };
        config.colors.extend([
            (ELEVATION_MIN_COLOR.to_owned(), Color::rgba(0.45, 0.3, 0.15, 1.0)),
            (ELEVATION_MAX_COLOR.to_owned(), Color::rgba(0.3, 0.7, 0.25, 1.0)),
            (HEAD_MIN_COLOR.to_owned(), Color::rgba(0.6, 0.8, 1.0, 0.8)),
            (HEAD_MAX_COLOR.to_owned(), Color::rgba(0.0, 0.2, 0.7, 0.8)),
        ]);
        config.no_data.insert(HEADS.to_owned(), -999.99);
        config
    }
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self {
            z_range: ZRange::default(),
            colors: HashMap::new(),
            length_conversion: 1.0,
            offsets: HashMap::new(),
            no_data: HashMap::new(),
            value_ranges: HashMap::new(),
            transform: Transform3d::IDENTITY,
            num_time_steps: 0,
        }
    }
}

/// A [`Document`] backed by a [`DocumentConfig`], with an atomic time step
/// and redraw flag.
#[derive(Debug)]
pub struct BasicDocument {
    config: DocumentConfig,
    time_step: AtomicUsize,
    needs_redraw: AtomicBool,
}

impl BasicDocument {
    /// Creates a document.
    #[must_use]
    pub fn new(config: DocumentConfig) -> Self {
        Self {
            config,
            time_step: AtomicUsize::new(0),
            needs_redraw: AtomicBool::new(false),
        }
    }

    /// The configuration.
    #[must_use]
    pub fn config(&self) -> &DocumentConfig {
        &self.config
    }

    /// Selects the time step to display.
    pub fn set_time_step(&self, step: usize) {
        self.time_step.store(step, Ordering::Relaxed);
        self.needs_redraw.store(true, Ordering::Release);
    }

    /// Returns and clears the redraw flag.
    pub fn take_redraw(&self) -> bool {
        self.needs_redraw.swap(false, Ordering::AcqRel)
    }

    /// Returns the redraw flag without clearing it.
    #[must_use]
    pub fn needs_redraw(&self) -> bool {
        self.needs_redraw.load(Ordering::Acquire)
    }
}

impl Document for BasicDocument {
    fn z_range(&self) -> ZRange {
        self.config.z_range
    }

    fn color(&self, name: &str) -> Option<Color> {
        self.config.colors.get(name).copied()
    }

    fn length_conversion(&self) -> f64 {
        self.config.length_conversion
    }

    fn offset(&self, name: &str) -> Vec3 {
        self.config.offsets.get(name).copied().unwrap_or(Vec3::ZERO)
    }

    fn no_data(&self, name: &str) -> Option<f64> {
        self.config.no_data.get(name).copied()
    }

    fn value_range(&self, name: &str) -> Option<ZRange> {
        self.config.value_ranges.get(name).copied()
    }

    fn transform_coordinates(&self, vertices: &mut [Vec3]) {
        self.config.transform.apply_in_place(vertices);
    }

    fn time_step(&self) -> usize {
        self.time_step.load(Ordering::Relaxed)
    }

    fn num_time_steps(&self) -> usize {
        self.config.num_time_steps
    }

    fn mark_dirty(&self) {
        self.needs_redraw.store(true, Ordering::Release);
    }
}
