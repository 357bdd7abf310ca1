//! Hyperparameter grid definition and expansion.
//!
//! The grid is a fixed set of axes for the sentiment classifier; expanding it
//! yields one [`GridPoint`] per combination, enumerated in axis order
//! (`hidden_size` outermost, `lr` innermost) so slot keys are stable across
//! runs and resumable sweeps line up with earlier ones.

use serde::{Deserialize, Serialize};

/// The hyperparameter axes swept over, each as a list of candidate values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParamGrid {
    #[serde(default = "default_hidden_size")]
    pub hidden_size: Vec<u32>,
    #[serde(default = "default_num_layers")]
    pub num_layers: Vec<u32>,
    #[serde(default = "default_dropout")]
    pub dropout: Vec<f64>,
    #[serde(default = "default_bidirectional")]
    pub bidirectional: Vec<bool>,
    #[serde(default = "default_batch_size")]
    pub batch_size: Vec<u32>,
    #[serde(default = "default_lr")]
    pub lr: Vec<f64>,
}

fn default_hidden_size() -> Vec<u32> {
    vec![64, 128, 256, 512]
}

fn default_num_layers() -> Vec<u32> {
    vec![1, 2]
}

fn default_dropout() -> Vec<f64> {
    vec![0.5]
}

fn default_bidirectional() -> Vec<bool> {
    vec![true, false]
}

fn default_batch_size() -> Vec<u32> {
    vec![64, 256]
}

fn default_lr() -> Vec<f64> {
    vec![1e-3, 1e-2, 1e-1]
}

impl Default for ParamGrid {
    fn default() -> Self {
        Self {
            hidden_size: default_hidden_size(),
            num_layers: default_num_layers(),
            dropout: default_dropout(),
            bidirectional: default_bidirectional(),
            batch_size: default_batch_size(),
            lr: default_lr(),
        }
    }
}

impl ParamGrid {
    /// Number of combinations the grid expands to.
    pub fn len(&self) -> usize {
        self.hidden_size.len()
            * self.num_layers.len()
            * self.dropout.len()
            * self.bidirectional.len()
            * self.batch_size.len()
            * self.lr.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Expand the Cartesian product of all axes.
    pub fn combinations(&self) -> Vec<GridPoint> {
        let mut points = Vec::with_capacity(self.len());
        for &hidden_size in &self.hidden_size {
            for &num_layers in &self.num_layers {
                for &dropout in &self.dropout {
                    for &bidirectional in &self.bidirectional {
                        for &batch_size in &self.batch_size {
                            for &lr in &self.lr {
                                points.push(GridPoint {
                                    hidden_size,
                                    num_layers,
                                    dropout,
                                    bidirectional,
                                    batch_size,
                                    lr,
                                });
                            }
                        }
                    }
                }
            }
        }
        points
    }
}

/// One raw combination of grid axis values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridPoint {
    pub hidden_size: u32,
    pub num_layers: u32,
    pub dropout: f64,
    pub bidirectional: bool,
    pub batch_size: u32,
    pub lr: f64,
}

impl GridPoint {
    /// Checkpoint slot key: the raw axis values joined by `_`.
    ///
    /// Raw values, not the derived [`TrialParams`], so the key identifies the
    /// grid combination even when derivation collapses two points to the same
    /// effective parameters.
    pub fn slot_key(&self) -> String {
        format!(
            "{}_{}_{}_{}_{}_{}",
            self.hidden_size,
            self.num_layers,
            self.dropout,
            self.bidirectional,
            self.batch_size,
            self.lr
        )
    }
}

/// The parameter record handed to the trainer, derived from a [`GridPoint`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrialParams {
    pub hidden_size: u32,
    pub num_layers: u32,
    pub dropout: f64,
    pub bidirectional: bool,
    pub batch_size: u32,
    pub lr: f64,
}

impl From<&GridPoint> for TrialParams {
    fn from(point: &GridPoint) -> Self {
        Self {
            hidden_size: point.hidden_size,
            num_layers: point.num_layers,
            // A single recurrent layer has no inter-layer dropout to apply.
            dropout: if point.num_layers == 1 {
                0.0
            } else {
                point.dropout
            },
            bidirectional: point.bidirectional,
            batch_size: point.batch_size,
            lr: point.lr,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn default_grid_expands_to_full_product() {
        let grid = ParamGrid::default();
        let points = grid.combinations();
        // 4 * 2 * 1 * 2 * 2 * 3
        assert_eq!(points.len(), 96);
        assert_eq!(points.len(), grid.len());
    }

    #[test]
    fn enumeration_order_is_stable() {
        let grid = ParamGrid::default();
        let points = grid.combinations();
        // hidden_size is the outermost axis, lr the innermost.
        assert_eq!(points[0].hidden_size, 64);
        assert_eq!(points[0].lr, 1e-3);
        assert_eq!(points[1].lr, 1e-2);
        assert_eq!(points[2].lr, 1e-1);
        assert_eq!(points[95].hidden_size, 512);
        assert_eq!(points[95].lr, 1e-1);
    }

    #[test]
    fn empty_axis_yields_empty_product() {
        let grid = ParamGrid {
            lr: Vec::new(),
            ..ParamGrid::default()
        };
        assert!(grid.is_empty());
        assert!(grid.combinations().is_empty());
    }

    #[test]
    fn slot_key_joins_raw_values() {
        let point = GridPoint {
            hidden_size: 128,
            num_layers: 1,
            dropout: 0.5,
            bidirectional: true,
            batch_size: 64,
            lr: 0.001,
        };
        assert_eq!(point.slot_key(), "128_1_0.5_true_64_0.001");
    }

    #[test]
    fn single_layer_forces_zero_dropout() {
        let point = GridPoint {
            hidden_size: 64,
            num_layers: 1,
            dropout: 0.5,
            bidirectional: false,
            batch_size: 64,
            lr: 0.01,
        };
        let params = TrialParams::from(&point);
        assert_eq!(params.dropout, 0.0);
        // The slot key still carries the raw grid value.
        assert!(point.slot_key().contains("0.5"));

        let deep = GridPoint {
            num_layers: 2,
            ..point
        };
        assert_eq!(TrialParams::from(&deep).dropout, 0.5);
    }
}
