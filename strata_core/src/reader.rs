// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! What Modflow file readers hand to the model.
//!
//! Parsing discretization and head files happens elsewhere; readers fill in
//! these plain structs and let them populate a [`Model`].

use std::sync::Weak;

use kurbo::Size;

use crate::attribute::is_no_data;
use crate::color::ZRange;
use crate::document::{Document, HEADS};
use crate::error::Error;
use crate::layer::{GridSize, Layer};
use crate::model::{LayerId, Model};

/// Grid geometry of a layered model, as read from a discretization file.
///
/// All per-cell arrays are row-major with one entry per grid cell.
#[derive(Clone, Debug, PartialEq)]
pub struct Discretization {
    /// Rows and columns shared by every layer.
    pub grid: GridSize,
    /// Size of one cell.
    pub cell_size: Size,
    /// Top elevation of the uppermost layer.
    pub top: Vec<f64>,
    /// Bottom elevation of each layer, top layer first.
    pub bottoms: Vec<Vec<f64>>,
    /// Activity flags of each layer; `0` marks an inactive cell.
    ///
    /// Layers without an entry are fully active.
    pub bounds: Vec<Vec<i32>>,
}

impl Discretization {
    /// Name given to layer `k` (zero-based).
    #[must_use]
    pub fn layer_name(k: usize) -> String {
        format!("Layer {}", k + 1)
    }

    /// Creates one layer per entry of [`bottoms`](Self::bottoms), stacked in
    /// order, in a new model attached to `document`.
    ///
    /// Layer `k`'s top is layer `k - 1`'s bottom. Inactive cells are purged
    /// before elevations are assigned, so their elevations are not checked.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidArgument`] if there are more `bounds` than layers.
    /// - [`Error::LengthMismatch`] if a per-cell array has the wrong length.
    /// - [`Error::InvertedCell`] if an active cell's top is below its bottom.
    pub fn build(&self, document: Weak<dyn Document>) -> Result<(Model, Vec<LayerId>), Error> {
        if self.bounds.len() > self.bottoms.len() {
            return Err(Error::InvalidArgument("more bounds arrays than layers"));
        }
        let mut model = Model::new();
        model.set_document(document);

        let mut ids = Vec::with_capacity(self.bottoms.len());
        let mut top = self.top.as_slice();
        for (k, bottom) in self.bottoms.iter().enumerate() {
            let layer = Layer::new(Self::layer_name(k), self.grid, self.cell_size);
            if let Some(bounds) = self.bounds.get(k) {
                layer.purge(bounds)?;
            }
            layer.z_range(top, bottom)?;
            let id = model.insert(layer);
            if let Some(&upper) = ids.last() {
                model.link(upper, id)?;
            }
            ids.push(id);
            top = bottom;
        }
        Ok((model, ids))
    }
}

/// Simulated heads, as read from a head output file.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct HeadLevelOutput {
    /// Heads indexed as `[time step][layer][cell]`.
    pub time_steps: Vec<Vec<Vec<f64>>>,
}

impl HeadLevelOutput {
    /// Writes every time step into the [`HEADS`] vector of `layers`.
    ///
    /// Each step must carry one array per layer, in the same order. Every
    /// step is checked before any head is written.
    ///
    /// # Errors
    ///
    /// - [`Error::LengthMismatch`] if a step has the wrong number of layers
    ///   or a layer array the wrong number of cells.
    /// - [`Error::StaleLayer`] if a handle is stale.
    pub fn apply(&self, model: &Model, layers: &[LayerId]) -> Result<(), Error> {
        let targets = layers
            .iter()
            .map(|&id| model.get(id).ok_or(Error::StaleLayer(id)))
            .collect::<Result<Vec<_>, _>>()?;
        for step in &self.time_steps {
            if step.len() != targets.len() {
                return Err(Error::LengthMismatch {
                    expected: targets.len(),
                    actual: step.len(),
                });
            }
            for (layer, values) in targets.iter().zip(step) {
                let expected = layer.grid_size().cell_count();
                if values.len() != expected {
                    return Err(Error::LengthMismatch {
                        expected,
                        actual: values.len(),
                    });
                }
            }
        }
        for (t, step) in self.time_steps.iter().enumerate() {
            for (layer, values) in targets.iter().zip(step) {
                layer.set_vector(HEADS, t, values)?;
            }
        }
        Ok(())
    }

    /// Number of time steps.
    #[must_use]
    pub fn step_count(&self) -> usize {
        self.time_steps.len()
    }

    /// Range of all heads that are not `no_data`.
    ///
    /// Returns `None` if there is none.
    #[must_use]
    pub fn value_range(&self, no_data: Option<f64>) -> Option<ZRange> {
        ZRange::from_values(
            self.time_steps
                .iter()
                .flatten()
                .flatten()
                .copied()
                .filter(|&v| no_data.is_none_or(|sentinel| !is_no_data(v, sentinel))),
        )
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::document::{BasicDocument, DocumentConfig};

    fn document() -> Arc<dyn Document> {
        Arc::new(BasicDocument::new(DocumentConfig::default()))
    }

    fn two_layers() -> Discretization {
        Discretization {
            grid: GridSize::new(1, 2),
            cell_size: Size::new(10.0, 10.0),
            top: vec![100.0, 90.0],
            bottoms: vec![vec![50.0, 40.0], vec![0.0, 0.0]],
            bounds: vec![vec![1, 0]],
        }
    }

    #[test]
    fn build_stacks_layers_top_down() {
        let doc = document();
        let (model, ids) = two_layers().build(Arc::downgrade(&doc)).unwrap();
        assert_eq!(ids.len(), 2);
        assert_eq!(model.below(ids[0]), Some(ids[1]));
        assert_eq!(model.above(ids[1]), Some(ids[0]));

        let upper = model.get(ids[0]).unwrap();
        let lower = model.get(ids[1]).unwrap();
        assert_eq!(upper.name(), "Layer 1");
        assert_eq!(upper.cell(0, 0).unwrap().elevations(), Some((100.0, 50.0)));
        assert!(!upper.cell(0, 1).unwrap().is_active(), "bound 0 purges");
        assert_eq!(upper.active_cell_count(), 1);
        assert_eq!(lower.cell(0, 1).unwrap().elevations(), Some((40.0, 0.0)));
        assert!(lower.document().is_some());
    }

    #[test]
    fn inactive_cells_skip_elevation_checks() {
        let mut dis = two_layers();
        // Inverted, but the cell is inactive.
        dis.bottoms[0][1] = 200.0;
        dis.bottoms[1][1] = 150.0;
        let doc = document();
        let (model, ids) = dis.build(Arc::downgrade(&doc)).unwrap();
        assert_eq!(model.len(), 2);
        assert_eq!(
            model.get(ids[1]).unwrap().cell(0, 1).unwrap().elevations(),
            Some((200.0, 150.0))
        );
    }

    #[test]
    fn build_rejects_bad_input() {
        let doc = document();
        let mut dis = two_layers();
        dis.top.pop();
        assert_eq!(
            dis.build(Arc::downgrade(&doc)).unwrap_err(),
            Error::LengthMismatch {
                expected: 2,
                actual: 1
            }
        );

        let mut dis = two_layers();
        dis.bottoms[1][0] = 60.0;
        assert!(matches!(
            dis.build(Arc::downgrade(&doc)),
            Err(Error::InvertedCell { index: 0, .. })
        ));

        let mut dis = two_layers();
        dis.bounds = vec![vec![1, 1]; 3];
        assert!(matches!(
            dis.build(Arc::downgrade(&doc)),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn heads_are_written_per_step() {
        let doc = document();
        let (model, ids) = two_layers().build(Arc::downgrade(&doc)).unwrap();
        let heads = HeadLevelOutput {
            time_steps: vec![
                vec![vec![80.0, 70.0], vec![30.0, 20.0]],
                vec![vec![81.0, 71.0], vec![31.0, 21.0]],
            ],
        };
        heads.apply(&model, &ids).unwrap();

        let upper = model.get(ids[0]).unwrap();
        assert_eq!(upper.time_step_count(HEADS), 2);
        assert_eq!(upper.cell(0, 0).unwrap().value(HEADS, 1), Some(81.0));
        assert_eq!(
            upper.cell(0, 1).unwrap().value(HEADS, 0),
            None,
            "purged cells keep no values"
        );
        let lower = model.get(ids[1]).unwrap();
        assert_eq!(lower.cell(0, 1).unwrap().value(HEADS, 0), Some(20.0));
    }

    #[test]
    fn heads_reject_layer_count_mismatch() {
        let doc = document();
        let (model, ids) = two_layers().build(Arc::downgrade(&doc)).unwrap();
        let heads = HeadLevelOutput {
            time_steps: vec![vec![vec![1.0, 2.0]]],
        };
        assert_eq!(
            heads.apply(&model, &ids),
            Err(Error::LengthMismatch {
                expected: 2,
                actual: 1
            })
        );
    }

    #[test]
    fn bad_later_step_writes_nothing() {
        let doc = document();
        let (model, ids) = two_layers().build(Arc::downgrade(&doc)).unwrap();
        let heads = HeadLevelOutput {
            time_steps: vec![
                vec![vec![80.0, 70.0], vec![30.0, 20.0]],
                vec![vec![81.0, 71.0], vec![31.0]],
            ],
        };
        assert_eq!(
            heads.apply(&model, &ids),
            Err(Error::LengthMismatch {
                expected: 2,
                actual: 1
            })
        );
        for &id in &ids {
            assert_eq!(model.get(id).unwrap().time_step_count(HEADS), 0);
        }
    }

    #[test]
    fn value_range_skips_no_data() {
        let heads = HeadLevelOutput {
            time_steps: vec![vec![vec![5.0, -999.99, 12.5]], vec![vec![-1.0]]],
        };
        assert_eq!(heads.value_range(Some(-999.99)), Some(ZRange::new(-1.0, 12.5)));
        assert_eq!(heads.value_range(None), Some(ZRange::new(-999.99, 12.5)));
        assert_eq!(HeadLevelOutput::default().value_range(None), None);
    }
}
