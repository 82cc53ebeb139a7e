//! Row-major matrices and strided views over them.
//!
//! The collectives move matrices as flat `f64` slices, so [`Matrix`] keeps
//! its elements in one contiguous row-major buffer. Views add bounds-checked
//! row access on top of a slice without copying.
use std::io::{self, Write};
use crate::{Error, Result};

/// Allocate `len` zeroed elements, reporting failure instead of aborting.
pub fn try_zeroed(len: usize) -> Result<Vec<f64>> {
    let mut data = Vec::new();
    data.try_reserve_exact(len)
        .map_err(|_| Error::Allocation { requested: len })?;
    data.resize(len, 0.0);
    Ok(data)
}

fn element_count(rows: usize, cols: usize) -> Result<usize> {
    rows.checked_mul(cols).ok_or_else(|| {
        Error::Dimension(format!("{rows}x{cols} matrix does not fit in memory"))
    })
}

/// Dense row-major matrix of `f64`.
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl Matrix {
    pub fn zeros(rows: usize, cols: usize) -> Result<Matrix> {
        Ok(Matrix {
            rows,
            cols,
            data: try_zeroed(element_count(rows, cols)?)?,
        })
    }

    /// Build a matrix with `f(i, j)` at row `i`, column `j`.
    pub fn from_fn<F>(rows: usize, cols: usize, mut f: F) -> Result<Matrix>
    where
        F: FnMut(usize, usize) -> f64,
    {
        let mut m = Matrix::zeros(rows, cols)?;
        for i in 0..rows {
            for (j, x) in m.row_mut(i).iter_mut().enumerate() {
                *x = f(i, j);
            }
        }
        Ok(m)
    }

    pub fn from_vec(rows: usize, cols: usize, data: Vec<f64>) -> Result<Matrix> {
        if data.len() != element_count(rows, cols)? {
            return Err(Error::Dimension(format!(
                "{} elements cannot form a {rows}x{cols} matrix",
                data.len()
            )));
        }
        Ok(Matrix { rows, cols, data })
    }

    pub fn identity(n: usize) -> Result<Matrix> {
        Matrix::from_fn(n, n, |i, j| if i == j { 1.0 } else { 0.0 })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn is_square_of(&self, n: usize) -> bool {
        self.rows == n && self.cols == n
    }

    pub fn get(&self, i: usize, j: usize) -> Option<f64> {
        self.view().get(i, j)
    }

    pub fn row(&self, i: usize) -> &[f64] {
        &self.data[i * self.cols..(i + 1) * self.cols]
    }

    pub fn row_mut(&mut self, i: usize) -> &mut [f64] {
        &mut self.data[i * self.cols..(i + 1) * self.cols]
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        &mut self.data
    }

    pub fn view(&self) -> MatrixView<'_> {
        MatrixView {
            data: &self.data,
            rows: self.rows,
            cols: self.cols,
            stride: self.cols,
        }
    }

    pub fn view_mut(&mut self) -> MatrixViewMut<'_> {
        MatrixViewMut {
            rows: self.rows,
            cols: self.cols,
            stride: self.cols,
            data: &mut self.data,
        }
    }

    /// Largest absolute element-wise difference to `other`, or `None` when
    /// the shapes differ.
    pub fn max_abs_diff(&self, other: &Matrix) -> Option<f64> {
        if self.rows != other.rows || self.cols != other.cols {
            return None;
        }
        Some(
            self.data
                .iter()
                .zip(&other.data)
                .map(|(x, y)| (x - y).abs())
                .fold(0.0, f64::max),
        )
    }

    /// Write one line per row, each element as `{:.6}` followed by a space.
    pub fn write_rows<W: Write>(&self, mut w: W) -> io::Result<()> {
        for i in 0..self.rows {
            for x in self.row(i) {
                write!(w, "{x:.6} ")?;
            }
            writeln!(w)?;
        }
        Ok(())
    }
}

/// Smallest slice length holding `rows` rows of `cols` elements `stride`
/// apart.
fn required_len(rows: usize, cols: usize, stride: usize) -> Option<usize> {
    match rows {
        0 => Some(0),
        _ => (rows - 1).checked_mul(stride)?.checked_add(cols),
    }
}

fn check_layout(len: usize, rows: usize, cols: usize, stride: usize) -> Result<()> {
    if stride < cols {
        return Err(Error::Dimension(format!(
            "row stride {stride} is shorter than a row of {cols}"
        )));
    }
    match required_len(rows, cols, stride) {
        Some(needed) if needed <= len => Ok(()),
        _ => Err(Error::Dimension(format!(
            "{len} elements cannot hold {rows}x{cols} with stride {stride}"
        ))),
    }
}

/// Read-only view of a row-major matrix inside a slice.
#[derive(Debug, Clone, Copy)]
pub struct MatrixView<'a> {
    data: &'a [f64],
    rows: usize,
    cols: usize,
    stride: usize,
}

impl<'a> MatrixView<'a> {
    /// View `data` as a densely packed `rows x cols` matrix.
    pub fn new(data: &'a [f64], rows: usize, cols: usize) -> Result<MatrixView<'a>> {
        MatrixView::with_stride(data, rows, cols, cols)
    }

    /// View `data` as `rows` rows of `cols` elements, `stride` elements apart.
    pub fn with_stride(
        data: &'a [f64],
        rows: usize,
        cols: usize,
        stride: usize,
    ) -> Result<MatrixView<'a>> {
        check_layout(data.len(), rows, cols, stride)?;
        Ok(MatrixView {
            data,
            rows,
            cols,
            stride,
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn row(&self, i: usize) -> &'a [f64] {
        assert!(i < self.rows, "row {i} out of {}", self.rows);
        &self.data[i * self.stride..i * self.stride + self.cols]
    }

    pub fn get(&self, i: usize, j: usize) -> Option<f64> {
        if i < self.rows && j < self.cols {
            Some(self.data[i * self.stride + j])
        } else {
            None
        }
    }

    /// View of `count` consecutive rows starting at `start`.
    pub fn row_block(&self, start: usize, count: usize) -> Result<MatrixView<'a>> {
        if start.checked_add(count).map_or(true, |end| end > self.rows) {
            return Err(Error::Dimension(format!(
                "rows {start}..{} are outside of {} rows",
                start.saturating_add(count),
                self.rows
            )));
        }
        let data = if count == 0 {
            &self.data[..0]
        } else {
            &self.data[start * self.stride..]
        };
        MatrixView::with_stride(data, count, self.cols, self.stride)
    }
}

/// Mutable view of a row-major matrix inside a slice.
#[derive(Debug)]
pub struct MatrixViewMut<'a> {
    data: &'a mut [f64],
    rows: usize,
    cols: usize,
    stride: usize,
}

impl<'a> MatrixViewMut<'a> {
    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn row_mut(&mut self, i: usize) -> &mut [f64] {
        assert!(i < self.rows, "row {i} out of {}", self.rows);
        &mut self.data[i * self.stride..i * self.stride + self.cols]
    }

    pub fn as_view(&self) -> MatrixView<'_> {
        MatrixView {
            data: &*self.data,
            rows: self.rows,
            cols: self.cols,
            stride: self.stride,
        }
    }
}
