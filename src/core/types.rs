//! Core type definitions for max-kernel search

use crate::core::{FastMksError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Dense point set stored row-major: point `i` occupies
/// `values[i * dim..(i + 1) * dim]`.
#[derive(Clone, Debug, PartialEq)]
pub struct Dataset {
    values: Vec<f64>,
    dim: usize,
}

impl Dataset {
    /// Create a dataset from a flat row-major buffer
    pub fn new(values: Vec<f64>, dim: usize) -> Result<Self> {
        if dim == 0 {
            return Err(FastMksError::InvalidArgument(
                "Dataset dimension must be positive".to_string(),
            ));
        }
        if values.is_empty() {
            return Err(FastMksError::InvalidArgument("Empty dataset".to_string()));
        }
        if values.len() % dim != 0 {
            return Err(FastMksError::InvalidArgument(format!(
                "{} values cannot be split into points of dimension {dim}",
                values.len()
            )));
        }
        Ok(Self { values, dim })
    }

    /// Create a dataset from one vector per point
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Result<Self> {
        let dim = rows
            .first()
            .map(|row| row.len())
            .ok_or_else(|| FastMksError::InvalidArgument("Empty dataset".to_string()))?;

        let mut values = Vec::with_capacity(rows.len() * dim);
        for row in rows {
            if row.len() != dim {
                return Err(FastMksError::dimension_mismatch(dim, row.len()));
            }
            values.extend(row);
        }
        Self::new(values, dim)
    }

    /// Number of points
    pub fn len(&self) -> usize {
        self.values.len() / self.dim
    }

    /// Always false for a constructed dataset; kept for API symmetry with `len`
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Dimensionality of every point
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Borrow point `i`
    ///
    /// # Panics
    /// Panics if `i >= len()`
    pub fn point(&self, i: usize) -> &[f64] {
        &self.values[i * self.dim..(i + 1) * self.dim]
    }

    /// Iterate over all points in index order
    pub fn points(&self) -> impl Iterator<Item = &[f64]> {
        self.values.chunks_exact(self.dim)
    }

    /// Fail with `ConstructionError` if any coordinate is NaN or infinite
    pub fn check_finite(&self) -> Result<()> {
        match self.values.iter().position(|v| !v.is_finite()) {
            Some(pos) => Err(FastMksError::ConstructionError(format!(
                "Non-finite value {} at point {}, dimension {}",
                self.values[pos],
                pos / self.dim,
                pos % self.dim
            ))),
            None => Ok(()),
        }
    }
}

/// Fixed-shape output table with one column per query.
///
/// Storage is column-major so a query's `k` results are contiguous.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Table<T> {
    rows: usize,
    cols: usize,
    data: Vec<T>,
}

impl<T: Copy> Table<T> {
    /// Build a table from column-major data
    pub fn from_columns(rows: usize, cols: usize, data: Vec<T>) -> Result<Self> {
        if data.len() != rows * cols {
            return Err(FastMksError::InvalidArgument(format!(
                "Table of {rows}x{cols} cannot hold {} values",
                data.len()
            )));
        }
        Ok(Self { rows, cols, data })
    }

    /// Number of rows (k)
    pub fn n_rows(&self) -> usize {
        self.rows
    }

    /// Number of columns (queries)
    pub fn n_cols(&self) -> usize {
        self.cols
    }

    /// Entry at `row` of query column `col`
    ///
    /// # Panics
    /// Panics if either coordinate is out of range
    pub fn get(&self, row: usize, col: usize) -> T {
        assert!(row < self.rows, "Row {row} out of range");
        self.data[col * self.rows + row]
    }

    /// All rows of one query column, best result first
    pub fn column(&self, col: usize) -> &[T] {
        &self.data[col * self.rows..(col + 1) * self.rows]
    }

    /// Iterate over the query columns in order
    pub fn columns(&self) -> impl Iterator<Item = &[T]> {
        // chunks_exact(0) would panic on an empty table
        self.data.chunks(self.rows.max(1))
    }
}

/// Traversal strategy used for a search
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SearchMode {
    /// Evaluate every query against every reference
    Naive,
    /// Reference tree only, queries handled one at a time
    SingleTree,
    /// Query tree and reference tree traversed together
    DualTree,
}

impl SearchMode {
    /// Map the classic pair of flags onto a mode; `naive` wins over `single`
    pub fn from_flags(single: bool, naive: bool) -> Self {
        if naive {
            Self::Naive
        } else if single {
            Self::SingleTree
        } else {
            Self::DualTree
        }
    }
}

impl Default for SearchMode {
    fn default() -> Self {
        Self::DualTree
    }
}

impl fmt::Display for SearchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Naive => "naive",
            Self::SingleTree => "single-tree",
            Self::DualTree => "dual-tree",
        };
        f.write_str(name)
    }
}

/// Configuration for a max-kernel search engine
#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// Traversal strategy
    pub mode: SearchMode,
    /// Maximum number of points held by a tree leaf
    pub leaf_size: usize,
    /// Spread independent queries (or query subtrees) over the rayon pool
    pub parallel: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            mode: SearchMode::DualTree,
            leaf_size: 20,
            parallel: true,
        }
    }
}

/// Work counters collected during a traversal
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchStats {
    /// Kernel evaluations between a query point and a reference point
    pub base_cases: u64,
    /// Bound computations (each needs one center kernel evaluation or cache hit)
    pub scores: u64,
    /// Subtrees or node pairs discarded by the bound
    pub prunes: u64,
}

impl SearchStats {
    /// Accumulate counters from another traversal
    pub fn merge(&mut self, other: &SearchStats) {
        self.base_cases += other.base_cases;
        self.scores += other.scores;
        self.prunes += other.prunes;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dataset_creation() {
        let data = Dataset::new(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], 2).unwrap();
        assert_eq!(data.len(), 3);
        assert_eq!(data.dim(), 2);
        assert_eq!(data.point(1), &[3.0, 4.0]);
        assert_eq!(data.points().count(), 3);
    }

    #[test]
    fn test_dataset_from_rows() {
        let data = Dataset::from_rows(vec![vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap();
        assert_eq!(data.len(), 2);
        assert_eq!(data.point(0), &[1.0, 2.0]);
    }

    #[test]
    fn test_dataset_rejects_malformed_input() {
        assert!(matches!(
            Dataset::new(vec![], 3),
            Err(FastMksError::InvalidArgument(_))
        ));
        assert!(matches!(
            Dataset::new(vec![1.0, 2.0, 3.0], 2),
            Err(FastMksError::InvalidArgument(_))
        ));
        assert!(matches!(
            Dataset::new(vec![1.0], 0),
            Err(FastMksError::InvalidArgument(_))
        ));
        assert!(matches!(
            Dataset::from_rows(vec![vec![1.0, 2.0], vec![3.0]]),
            Err(FastMksError::InvalidArgument(_))
        ));
        assert!(matches!(
            Dataset::from_rows(vec![]),
            Err(FastMksError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_dataset_check_finite() {
        let good = Dataset::new(vec![0.0, -1.5], 1).unwrap();
        assert!(good.check_finite().is_ok());

        let bad = Dataset::new(vec![0.0, 1.0, f64::NAN, 2.0], 2).unwrap();
        let err = bad.check_finite().unwrap_err();
        assert!(matches!(err, FastMksError::ConstructionError(_)));
        assert!(err.to_string().contains("point 1"));
    }

    #[test]
    fn test_table_layout() {
        // Two queries, three results each
        let table = Table::from_columns(3, 2, vec![1, 2, 3, 4, 5, 6]).unwrap();
        assert_eq!(table.n_rows(), 3);
        assert_eq!(table.n_cols(), 2);
        assert_eq!(table.get(0, 1), 4);
        assert_eq!(table.column(0), &[1, 2, 3]);
        assert_eq!(table.columns().count(), 2);

        assert!(Table::from_columns(2, 2, vec![1.0]).is_err());
    }

    #[test]
    fn test_search_mode_flags() {
        assert_eq!(SearchMode::from_flags(false, false), SearchMode::DualTree);
        assert_eq!(SearchMode::from_flags(true, false), SearchMode::SingleTree);
        assert_eq!(SearchMode::from_flags(false, true), SearchMode::Naive);
        assert_eq!(SearchMode::from_flags(true, true), SearchMode::Naive);
        assert_eq!(SearchMode::default(), SearchMode::DualTree);
        assert_eq!(SearchMode::SingleTree.to_string(), "single-tree");
    }

    #[test]
    fn test_search_config_default() {
        let config = SearchConfig::default();
        assert_eq!(config.mode, SearchMode::DualTree);
        assert_eq!(config.leaf_size, 20);
        assert!(config.parallel);
    }

    #[test]
    fn test_stats_merge() {
        let mut total = SearchStats::default();
        total.merge(&SearchStats {
            base_cases: 10,
            scores: 3,
            prunes: 1,
        });
        total.merge(&SearchStats {
            base_cases: 5,
            scores: 2,
            prunes: 0,
        });
        assert_eq!(total.base_cases, 15);
        assert_eq!(total.scores, 5);
        assert_eq!(total.prunes, 1);
    }
}
