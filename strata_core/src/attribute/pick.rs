// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Vertex → cell lookup for picking.

use std::ops::Range;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Span {
    start: usize,
    end: usize,
    cell: usize,
}

/// Maps contiguous vertex ranges of a built batch back to the cells that
/// produced them.
///
/// Ranges are pushed in ascending vertex order during a build, so lookup is
/// a binary search.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CellIndexMap {
    spans: Vec<Span>,
}

impl CellIndexMap {
    /// Creates an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Clears the map and reserves room for `cells` entries.
    pub fn reset(&mut self, cells: usize) {
        self.spans.clear();
        self.spans.reserve(cells);
    }

    /// Records that `vertices` came from cell `cell`. Empty ranges are
    /// ignored.
    pub fn push(&mut self, vertices: Range<usize>, cell: usize) {
        if vertices.is_empty() {
            return;
        }
        debug_assert!(
            self.spans.last().is_none_or(|s| s.end <= vertices.start),
            "vertex ranges must be pushed in order"
        );
        self.spans.push(Span {
            start: vertices.start,
            end: vertices.end,
            cell,
        });
    }

    /// Releases excess capacity once a build is done.
    pub fn shrink_to_fit(&mut self) {
        self.spans.shrink_to_fit();
    }

    /// Cell index that produced `vertex`.
    #[must_use]
    pub fn cell_for_vertex(&self, vertex: usize) -> Option<usize> {
        let i = self.spans.partition_point(|s| s.end <= vertex);
        self.spans
            .get(i)
            .filter(|s| s.start <= vertex)
            .map(|s| s.cell)
    }

    /// Number of mapped cells.
    #[must_use]
    pub fn len(&self) -> usize {
        self.spans.len()
    }

    /// Returns `true` if nothing is mapped.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    /// One past the last mapped vertex.
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.spans.last().map_or(0, |s| s.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_hits_owning_cell() {
        let mut map = CellIndexMap::new();
        map.reset(3);
        map.push(0..24, 0);
        map.push(24..48, 2);
        map.push(48..48, 5);
        map.push(48..52, 3);
        map.shrink_to_fit();

        assert_eq!(map.len(), 3);
        assert_eq!(map.cell_for_vertex(0), Some(0));
        assert_eq!(map.cell_for_vertex(23), Some(0));
        assert_eq!(map.cell_for_vertex(24), Some(2));
        assert_eq!(map.cell_for_vertex(51), Some(3));
        assert_eq!(map.cell_for_vertex(52), None, "past the end");
        assert_eq!(map.vertex_count(), 52);
    }

    #[test]
    fn gaps_are_unmapped() {
        let mut map = CellIndexMap::new();
        map.push(4..8, 1);
        assert_eq!(map.cell_for_vertex(2), None);
        assert_eq!(map.cell_for_vertex(4), Some(1));
    }

    #[test]
    fn reset_forgets_previous_build() {
        let mut map = CellIndexMap::new();
        map.push(0..4, 7);
        map.reset(1);
        assert!(map.is_empty());
        assert_eq!(map.cell_for_vertex(0), None);
    }
}
