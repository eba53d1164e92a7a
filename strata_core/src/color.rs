// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Colors and value → color ramps.

/// A linear RGBA color with components in `0.0..=1.0`.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Color {
    /// Red.
    pub r: f32,
    /// Green.
    pub g: f32,
    /// Blue.
    pub b: f32,
    /// Alpha.
    pub a: f32,
}

impl Color {
    /// Opaque black.
    pub const BLACK: Self = Self::rgba(0.0, 0.0, 0.0, 1.0);
    /// Opaque white.
    pub const WHITE: Self = Self::rgba(1.0, 1.0, 1.0, 1.0);

    /// Creates a color from its components.
    #[must_use]
    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Component-wise `self + (other - self) * t`.
    #[must_use]
    pub fn lerp(self, other: Self, t: f32) -> Self {
        Self {
            r: self.r + (other.r - self.r) * t,
            g: self.g + (other.g - self.g) * t,
            b: self.b + (other.b - self.b) * t,
            a: self.a + (other.a - self.a) * t,
        }
    }

    /// Components as an array.
    #[must_use]
    pub const fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

/// A closed value range, usually elevations.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ZRange {
    /// Lower bound.
    pub min: f64,
    /// Upper bound.
    pub max: f64,
}

impl ZRange {
    /// Creates a range; the bounds are swapped if given in the wrong order.
    #[must_use]
    pub fn new(a: f64, b: f64) -> Self {
        if a <= b {
            Self { min: a, max: b }
        } else {
            Self { min: b, max: a }
        }
    }

    /// Smallest range containing every finite value of `values`.
    ///
    /// Returns `None` if there is no finite value.
    #[must_use]
    pub fn from_values(values: impl IntoIterator<Item = f64>) -> Option<Self> {
        values
            .into_iter()
            .filter(|v| v.is_finite())
            .fold(None, |acc: Option<Self>, v| match acc {
                None => Some(Self { min: v, max: v }),
                Some(r) => Some(Self {
                    min: r.min.min(v),
                    max: r.max.max(v),
                }),
            })
    }

    /// `max - min`.
    #[must_use]
    pub fn extent(&self) -> f64 {
        self.max - self.min
    }

    /// Position of `v` in the range, clamped to `0.0..=1.0`.
    ///
    /// A degenerate range maps everything to `0.0`.
    #[must_use]
    pub fn fraction(&self, v: f64) -> f64 {
        let extent = self.extent();
        if extent.is_nan() || extent <= 0.0 || !v.is_finite() {
            return 0.0;
        }
        ((v - self.min) / extent).clamp(0.0, 1.0)
    }
}

impl Default for ZRange {
    fn default() -> Self {
        Self { min: 0.0, max: 1.0 }
    }
}

/// A two-stop linear color ramp.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ColorRamp {
    /// Color at the bottom of the range.
    pub min: Color,
    /// Color at the top of the range.
    pub max: Color,
}

impl ColorRamp {
    /// Creates a ramp.
    #[must_use]
    pub const fn new(min: Color, max: Color) -> Self {
        Self { min, max }
    }

    /// Color of value `v` within `range`.
    #[must_use]
    #[expect(
        clippy::cast_possible_truncation,
        reason = "colors are single precision"
    )]
    pub fn at(&self, v: f64, range: ZRange) -> Color {
        self.min.lerp(self.max, range.fraction(v) as f32)
    }
}

impl Default for ColorRamp {
    fn default() -> Self {
        Self::new(Color::BLACK, Color::WHITE)
    }
}
