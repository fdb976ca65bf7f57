//! Proportional column widths and row heights.
//!
//! Each vector holds one positive fraction per column (or row) and sums to
//! 1.0. The model has no knowledge of panes; it only tracks the current
//! grid dimensions through the lengths of its two vectors.

use crate::layout::{Axis, GridShape};
use crate::{Error, Result};

/// Tolerance used when checking that a vector sums to 1.
pub const RATIO_TOLERANCE: f64 = 1e-9;

/// Normalize a ratio vector against an expected length.
///
/// Returns `None` when the length differs, when any entry is not a finite
/// positive number, or when the normalized vector does not sum to 1.
///
/// # Example
///
/// ```rust
/// use splitgrid_core::ratio::normalize_ratios;
///
/// let ratios = normalize_ratios(&[2.0, 2.0], 2).unwrap();
/// assert_eq!(ratios, vec![0.5, 0.5]);
/// assert!(normalize_ratios(&[0.5, 0.5], 3).is_none());
/// assert!(normalize_ratios(&[1.0, -1.0], 2).is_none());
/// ```
pub fn normalize_ratios(values: &[f64], expected_len: usize) -> Option<Vec<f64>> {
    if expected_len == 0 || values.len() != expected_len {
        return None;
    }
    if values.iter().any(|v| !v.is_finite() || *v <= 0.0) {
        return None;
    }

    let sum: f64 = values.iter().sum();
    if !sum.is_finite() || sum <= 0.0 {
        return None;
    }
    // Already-normalized input is returned unchanged.
    if (sum - 1.0).abs() <= RATIO_TOLERANCE {
        return Some(values.to_vec());
    }

    let normalized: Vec<f64> = values.iter().map(|v| v / sum).collect();
    let check: f64 = normalized.iter().sum();
    if (check - 1.0).abs() > RATIO_TOLERANCE || normalized.iter().any(|v| *v <= 0.0) {
        return None;
    }
    Some(normalized)
}

fn uniform(len: usize) -> Vec<f64> {
    let len = len.max(1);
    vec![1.0 / len as f64; len]
}

/// Column and row ratio vectors for one grid.
#[derive(Debug, Clone, PartialEq)]
pub struct RatioModel {
    cols: Vec<f64>,
    rows: Vec<f64>,
}

impl RatioModel {
    /// Create a uniform model for a shape.
    pub fn new(shape: GridShape) -> Self {
        Self {
            cols: uniform(shape.cols),
            rows: uniform(shape.rows),
        }
    }

    /// Replace both vectors with uniform fractions.
    ///
    /// # Example
    ///
    /// ```rust
    /// use splitgrid_core::layout::GridShape;
    /// use splitgrid_core::ratio::RatioModel;
    ///
    /// let mut ratios = RatioModel::new(GridShape::single());
    /// ratios.reset(4, 2);
    /// assert_eq!(ratios.cols(), &[0.25; 4]);
    /// assert_eq!(ratios.rows(), &[0.5; 2]);
    /// ```
    pub fn reset(&mut self, cols: usize, rows: usize) {
        self.cols = uniform(cols);
        self.rows = uniform(rows);
    }

    /// Current `(colRatios, rowRatios)`.
    pub fn get(&self) -> (&[f64], &[f64]) {
        (&self.cols, &self.rows)
    }

    pub fn cols(&self) -> &[f64] {
        &self.cols
    }

    pub fn rows(&self) -> &[f64] {
        &self.rows
    }

    /// The vector for one axis.
    pub fn axis(&self, axis: Axis) -> &[f64] {
        match axis {
            Axis::Column => &self.cols,
            Axis::Row => &self.rows,
        }
    }

    pub(crate) fn axis_mut(&mut self, axis: Axis) -> &mut Vec<f64> {
        match axis {
            Axis::Column => &mut self.cols,
            Axis::Row => &mut self.rows,
        }
    }

    /// Grid shape implied by the vector lengths.
    pub fn shape(&self) -> GridShape {
        GridShape::new(self.cols.len(), self.rows.len())
    }

    /// Whether the vectors match a shape's dimensions.
    pub fn matches(&self, shape: GridShape) -> bool {
        self.cols.len() == shape.cols && self.rows.len() == shape.rows
    }

    /// Replace both vectors after normalizing them against their own lengths.
    ///
    /// Both vectors are validated before either is applied; on error the
    /// model is unchanged.
    pub fn set(&mut self, cols: &[f64], rows: &[f64]) -> Result<()> {
        let shape = GridShape::new(cols.len(), rows.len());
        self.set_for_shape(shape, cols, rows)
    }

    /// Replace both vectors after normalizing them against `shape`.
    pub fn set_for_shape(&mut self, shape: GridShape, cols: &[f64], rows: &[f64]) -> Result<()> {
        let cols = normalize_ratios(cols, shape.cols)
            .ok_or_else(|| Error::validation("colRatios", "does not normalize against grid"))?;
        let rows = normalize_ratios(rows, shape.rows)
            .ok_or_else(|| Error::validation("rowRatios", "does not normalize against grid"))?;
        self.cols = cols;
        self.rows = rows;
        Ok(())
    }

    /// Offset and size fractions of the half-open track range `[start, end)`
    /// (1-based) along an axis.
    ///
    /// # Example
    ///
    /// ```rust
    /// use splitgrid_core::layout::{Axis, GridShape};
    /// use splitgrid_core::ratio::RatioModel;
    ///
    /// let ratios = RatioModel::new(GridShape::new(4, 1));
    /// let (offset, size) = ratios.span_fraction(Axis::Column, 2, 4);
    /// assert!((offset - 0.25).abs() < 1e-12);
    /// assert!((size - 0.5).abs() < 1e-12);
    /// ```
    pub fn span_fraction(&self, axis: Axis, start: usize, end: usize) -> (f64, f64) {
        let values = self.axis(axis);
        let start = start.saturating_sub(1).min(values.len());
        let end = end.saturating_sub(1).clamp(start, values.len());
        let offset: f64 = values[..start].iter().sum();
        let size: f64 = values[start..end].iter().sum();
        (offset, size)
    }

    /// Offsets of the interior boundaries along an axis, left to right.
    pub fn boundaries(&self, axis: Axis) -> Vec<f64> {
        let values = self.axis(axis);
        let mut acc = 0.0;
        values
            .iter()
            .take(values.len().saturating_sub(1))
            .map(|v| {
                acc += v;
                acc
            })
            .collect()
    }
}

impl Default for RatioModel {
    fn default() -> Self {
        Self::new(GridShape::single())
    }
}
