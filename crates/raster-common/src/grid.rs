//! Row-major floating point raster grids.

use serde::{Deserialize, Serialize};

/// A 2-D grid of samples stored row-major (row 0 first).
///
/// `NaN` marks no-data. Every stage that derives a new grid either preserves
/// the no-data mask of its input or deliberately recomputes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RasterGrid {
    rows: usize,
    cols: usize,
    data: Vec<f32>,
}

impl RasterGrid {
    /// Wrap row-major data. Returns `None` when the length does not match.
    pub fn from_vec(data: Vec<f32>, rows: usize, cols: usize) -> Option<Self> {
        if data.len() != rows * cols {
            return None;
        }
        Some(Self { rows, cols, data })
    }

    /// A grid filled with no-data.
    pub fn nan(rows: usize, cols: usize) -> Self {
        Self::filled(rows, cols, f32::NAN)
    }

    /// A grid filled with a constant.
    pub fn filled(rows: usize, cols: usize, value: f32) -> Self {
        Self {
            rows,
            cols,
            data: vec![value; rows * cols],
        }
    }

    /// Build a grid by evaluating `f(row, col)` for every cell.
    pub fn from_fn<F>(rows: usize, cols: usize, mut f: F) -> Self
    where
        F: FnMut(usize, usize) -> f32,
    {
        let mut data = Vec::with_capacity(rows * cols);
        for row in 0..rows {
            for col in 0..cols {
                data.push(f(row, col));
            }
        }
        Self { rows, cols, data }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// `(rows, cols)`
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [f32] {
        &mut self.data
    }

    pub fn into_vec(self) -> Vec<f32> {
        self.data
    }

    /// Value at `(row, col)`, or `None` outside the grid.
    pub fn get(&self, row: usize, col: usize) -> Option<f32> {
        if row >= self.rows || col >= self.cols {
            return None;
        }
        Some(self.data[row * self.cols + col])
    }

    /// Set the value at `(row, col)`; out-of-range writes are ignored.
    pub fn set(&mut self, row: usize, col: usize, value: f32) {
        if row < self.rows && col < self.cols {
            self.data[row * self.cols + col] = value;
        }
    }

    /// One row as a slice.
    pub fn row(&self, row: usize) -> &[f32] {
        let start = row * self.cols;
        &self.data[start..start + self.cols]
    }

    /// Per-pixel validity mask (`true` where finite).
    pub fn finite_mask(&self) -> Vec<bool> {
        self.data.iter().map(|v| v.is_finite()).collect()
    }

    /// Iterator over finite samples.
    pub fn finite_values(&self) -> impl Iterator<Item = f32> + '_ {
        self.data.iter().copied().filter(|v| v.is_finite())
    }

    pub fn finite_count(&self) -> usize {
        self.finite_values().count()
    }

    /// Mean of the finite samples, accumulated in f64.
    pub fn finite_mean(&self) -> Option<f64> {
        let mut sum = 0.0f64;
        let mut count = 0usize;
        for v in self.finite_values() {
            sum += v as f64;
            count += 1;
        }
        if count == 0 {
            None
        } else {
            Some(sum / count as f64)
        }
    }

    /// Copy with every non-finite sample replaced by `fill`.
    pub fn filled_nan(&self, fill: f32) -> RasterGrid {
        let data = self
            .data
            .iter()
            .map(|&v| if v.is_finite() { v } else { fill })
            .collect();
        RasterGrid {
            rows: self.rows,
            cols: self.cols,
            data,
        }
    }

    /// Set every sample whose mask entry is `false` to `NaN`.
    ///
    /// # Panics
    /// Panics if the mask length differs from the grid length.
    pub fn apply_mask(&mut self, mask: &[bool]) {
        assert_eq!(mask.len(), self.data.len(), "mask shape mismatch");
        for (value, &keep) in self.data.iter_mut().zip(mask) {
            if !keep {
                *value = f32::NAN;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_vec_rejects_wrong_length() {
        assert!(RasterGrid::from_vec(vec![1.0; 5], 2, 3).is_none());
        assert!(RasterGrid::from_vec(vec![1.0; 6], 2, 3).is_some());
    }

    #[test]
    fn test_finite_mean_skips_nan() {
        let grid = RasterGrid::from_vec(vec![1.0, f32::NAN, 3.0, f32::INFINITY], 2, 2).unwrap();
        assert_eq!(grid.finite_count(), 2);
        assert_eq!(grid.finite_mean(), Some(2.0));
        assert_eq!(RasterGrid::nan(2, 2).finite_mean(), None);
    }

    #[test]
    fn test_apply_mask_and_fill() {
        let mut grid = RasterGrid::from_fn(2, 2, |r, c| (r * 2 + c) as f32);
        grid.apply_mask(&[true, false, true, false]);
        assert!(grid.get(0, 1).unwrap().is_nan());
        assert_eq!(grid.get(1, 0), Some(2.0));

        let filled = grid.filled_nan(-1.0);
        assert_eq!(filled.data(), &[0.0, -1.0, 2.0, -1.0]);
    }
}
