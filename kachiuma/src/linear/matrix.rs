//! A dense, row-major matrix of regression observations.

#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    data: Vec<f64>,
    rows: usize,
    cols: usize,
}
impl Matrix {
    pub fn allocate(rows: usize, cols: usize) -> Self {
        let (len, overflow) = rows.overflowing_mul(cols);
        assert!(
            !overflow,
            "allocation of a {rows}x{cols} matrix failed due to overflow"
        );
        Self {
            data: vec![0.0; len],
            rows,
            cols,
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn row_slice_mut(&mut self, row: usize) -> &mut [f64] {
        debug_assert!(self.validate_row_index(row));
        let row_start = row * self.cols;
        &mut self.data[row_start..(row_start + self.cols)]
    }

    /// The observations in row-major order, as `linregress` consumes them.
    pub fn flatten(&self) -> &[f64] {
        &self.data
    }

    fn validate_row_index(&self, row: usize) -> bool {
        assert!(
            row < self.rows,
            "invalid row index {row} for a {}x{} matrix",
            self.rows,
            self.cols
        );
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn design_layout() {
        // response, intercept, two features per observation
        let observations = [(1.0, [0.5, -0.25]), (0.0, [1.5, 2.0]), (1.0, [-1.0, 0.0])];
        let mut matrix = Matrix::allocate(observations.len(), 4);
        assert_eq!(3, matrix.rows());
        assert_eq!(4, matrix.cols());
        assert!(matrix.flatten().iter().all(|&value| value == 0.0));

        for (row, (target, features)) in observations.iter().enumerate() {
            let row_slice = matrix.row_slice_mut(row);
            row_slice[0] = *target;
            row_slice[1] = 1.0;
            row_slice[2..].copy_from_slice(features);
        }
        assert_eq!(
            &[1.0, 1.0, 0.5, -0.25, 0.0, 1.0, 1.5, 2.0, 1.0, 1.0, -1.0, 0.0],
            matrix.flatten()
        );
    }

    #[test]
    fn no_observations() {
        let matrix = Matrix::allocate(0, 3);
        assert_eq!(0, matrix.rows());
        assert!(matrix.flatten().is_empty());
    }

    #[test]
    #[should_panic = "invalid row index 2 for a 2x4 matrix"]
    fn row_past_last_observation_panics() {
        let mut matrix = Matrix::allocate(2, 4);
        matrix.row_slice_mut(2);
    }

    #[test]
    #[should_panic = "failed due to overflow"]
    fn allocate_overflow_panics() {
        Matrix::allocate(usize::MAX, 3);
    }
}
