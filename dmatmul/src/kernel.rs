//! Local multiply kernel.
//!
//! Textbook i-j-k loop. Each output cell starts from zero and accumulates in
//! `k` order, so a row-block computed anywhere in the group is bit-identical
//! to the same rows of the sequential product.
use crate::{Error, Matrix, MatrixView, MatrixViewMut, Result};

/// Compute `c = a * b` for a block of `a.rows()` rows against the full
/// `n x n` operand `b`.
pub fn multiply_into(a: MatrixView<'_>, b: MatrixView<'_>, c: &mut MatrixViewMut<'_>) -> Result<()> {
    let rows = a.rows();
    let n = a.cols();
    if rows == 0 || n == 0 {
        return Err(Error::Dimension(format!("empty operand block {rows}x{n}")));
    }
    if b.rows() != n || b.cols() != n {
        return Err(Error::Dimension(format!(
            "operand is {}x{}, expected {n}x{n}",
            b.rows(),
            b.cols()
        )));
    }
    if c.rows() != rows || c.cols() != n {
        return Err(Error::Dimension(format!(
            "output block is {}x{}, expected {rows}x{n}",
            c.rows(),
            c.cols()
        )));
    }

    let b_rows: Vec<&[f64]> = (0..n).map(|k| b.row(k)).collect();
    for i in 0..rows {
        let a_row = a.row(i);
        let c_row = c.row_mut(i);
        for (j, out) in c_row.iter_mut().enumerate() {
            let mut sum = 0.0;
            for (x, b_row) in a_row.iter().zip(&b_rows) {
                sum += x * b_row[j];
            }
            *out = sum;
        }
    }
    Ok(())
}

/// Sequential reference product of two square matrices.
pub fn multiply(a: &Matrix, b: &Matrix) -> Result<Matrix> {
    let mut c = Matrix::zeros(a.rows(), b.cols())?;
    multiply_into(a.view(), b.view(), &mut c.view_mut())?;
    Ok(c)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_by_two() {
        let a = Matrix::from_vec(2, 2, vec![1.0, 2.0, 3.0, 4.0]).unwrap();
        let b = Matrix::from_vec(2, 2, vec![5.0, 6.0, 7.0, 8.0]).unwrap();
        let c = multiply(&a, &b).unwrap();
        assert_eq!(c.as_slice(), &[19.0, 22.0, 43.0, 50.0]);
    }

    #[test]
    fn row_block_matches_rows_of_full_product() {
        let n = 6;
        let a = Matrix::from_fn(n, n, |i, j| (i * 7 + j * 3) as f64 * 0.25).unwrap();
        let b = Matrix::from_fn(n, n, |i, j| (i as f64 - j as f64) / 3.0).unwrap();
        let full = multiply(&a, &b).unwrap();

        let block = a.view().row_block(2, 3).unwrap();
        let mut c = Matrix::zeros(3, n).unwrap();
        multiply_into(block, b.view(), &mut c.view_mut()).unwrap();
        for i in 0..3 {
            assert_eq!(c.row(i), full.row(i + 2));
        }
    }

    #[test]
    fn output_is_overwritten_not_accumulated() {
        let a = Matrix::identity(3).unwrap();
        let b = Matrix::from_fn(3, 3, |i, j| (i + j) as f64).unwrap();
        let mut c = Matrix::from_fn(3, 3, |_, _| 99.0).unwrap();
        multiply_into(a.view(), b.view(), &mut c.view_mut()).unwrap();
        assert_eq!(c, b);
    }

    #[test]
    fn strided_operand_gives_the_dense_result() {
        let a = Matrix::from_fn(2, 2, |i, j| (i * 2 + j + 1) as f64).unwrap();
        // 2x2 operand [5 6; 7 8] stored with one padding column
        let padded = [5.0, 6.0, -100.0, 7.0, 8.0];
        let b = MatrixView::with_stride(&padded, 2, 2, 3).unwrap();
        let mut c = Matrix::zeros(2, 2).unwrap();
        multiply_into(a.view(), b, &mut c.view_mut()).unwrap();
        assert_eq!(c.as_slice(), &[19.0, 22.0, 43.0, 50.0]);
    }

    #[test]
    fn bad_shapes_are_rejected() {
        let a = Matrix::zeros(2, 3).unwrap();
        let b = Matrix::zeros(2, 2).unwrap();
        let mut c = Matrix::zeros(2, 3).unwrap();
        assert!(matches!(
            multiply_into(a.view(), b.view(), &mut c.view_mut()),
            Err(Error::Dimension(_))
        ));

        let b = Matrix::zeros(3, 3).unwrap();
        let mut c = Matrix::zeros(1, 3).unwrap();
        assert!(matches!(
            multiply_into(a.view(), b.view(), &mut c.view_mut()),
            Err(Error::Dimension(_))
        ));

        let empty = Matrix::zeros(0, 3).unwrap();
        let mut c = Matrix::zeros(0, 3).unwrap();
        assert!(matches!(
            multiply_into(empty.view(), b.view(), &mut c.view_mut()),
            Err(Error::Dimension(_))
        ));
    }
}
