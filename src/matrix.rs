use crate::error::{Axis, HeatmapError, Result};
use log::debug;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Dense row-major matrix with row and column labels. Missing values are `NaN`.
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    n_rows: usize,
    n_cols: usize,
    data: Vec<f64>,
    row_labels: Vec<String>,
    col_labels: Vec<String>,
}

impl Matrix {
    pub fn new(
        n_rows: usize,
        n_cols: usize,
        data: Vec<f64>,
        row_labels: Vec<String>,
        col_labels: Vec<String>,
    ) -> Result<Self> {
        if data.len() != n_rows * n_cols {
            return Err(HeatmapError::mismatch(
                "matrix data",
                Axis::Row,
                n_rows * n_cols,
                data.len(),
            ));
        }
        if row_labels.len() != n_rows {
            return Err(HeatmapError::mismatch("row labels", Axis::Row, n_rows, row_labels.len()));
        }
        if col_labels.len() != n_cols {
            return Err(HeatmapError::mismatch(
                "column labels",
                Axis::Column,
                n_cols,
                col_labels.len(),
            ));
        }
        Ok(Matrix {
            n_rows,
            n_cols,
            data,
            row_labels,
            col_labels,
        })
    }

    /// Build from row vectors; every row must have `col_labels.len()` values.
    pub fn from_rows(
        rows: Vec<Vec<f64>>,
        row_labels: Vec<String>,
        col_labels: Vec<String>,
    ) -> Result<Self> {
        let n_rows = rows.len();
        let n_cols = col_labels.len();
        let mut data = Vec::with_capacity(n_rows * n_cols);
        for (i, row) in rows.into_iter().enumerate() {
            if row.len() != n_cols {
                return Err(HeatmapError::mismatch(
                    format!("row {}", i),
                    Axis::Column,
                    n_cols,
                    row.len(),
                ));
            }
            data.extend(row);
        }
        Matrix::new(n_rows, n_cols, data, row_labels, col_labels)
    }

    /// Build with generated labels `r0..`, `c0..`.
    pub fn from_unlabeled(rows: Vec<Vec<f64>>) -> Result<Self> {
        let n_cols = rows.first().map(|r| r.len()).unwrap_or(0);
        let row_labels = (0..rows.len()).map(|i| format!("r{}", i)).collect();
        let col_labels = (0..n_cols).map(|j| format!("c{}", j)).collect();
        Matrix::from_rows(rows, row_labels, col_labels)
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_cols(&self) -> usize {
        self.n_cols
    }

    pub fn len(&self, axis: Axis) -> usize {
        match axis {
            Axis::Row => self.n_rows,
            Axis::Column => self.n_cols,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data[row * self.n_cols + col]
    }

    pub fn row(&self, row: usize) -> &[f64] {
        &self.data[row * self.n_cols..(row + 1) * self.n_cols]
    }

    pub fn column(&self, col: usize) -> Vec<f64> {
        (0..self.n_rows).map(|r| self.get(r, col)).collect()
    }

    pub fn values(&self) -> &[f64] {
        &self.data
    }

    pub fn row_labels(&self) -> &[String] {
        &self.row_labels
    }

    pub fn col_labels(&self) -> &[String] {
        &self.col_labels
    }

    /// Observation vectors along `axis`: one per row (row axis) or per column.
    pub fn axis_vectors(&self, axis: Axis) -> Vec<Vec<f64>> {
        match axis {
            Axis::Row => (0..self.n_rows).map(|r| self.row(r).to_vec()).collect(),
            Axis::Column => (0..self.n_cols).map(|c| self.column(c)).collect(),
        }
    }

    /// Sub-matrix of the given rows, in the given order.
    pub fn select_rows(&self, rows: &[usize]) -> Matrix {
        let mut data = Vec::with_capacity(rows.len() * self.n_cols);
        for &r in rows {
            data.extend_from_slice(self.row(r));
        }
        Matrix {
            n_rows: rows.len(),
            n_cols: self.n_cols,
            data,
            row_labels: rows.iter().map(|&r| self.row_labels[r].clone()).collect(),
            col_labels: self.col_labels.clone(),
        }
    }

    /// Sub-matrix of the given columns, in the given order.
    pub fn select_cols(&self, cols: &[usize]) -> Matrix {
        let mut data = Vec::with_capacity(self.n_rows * cols.len());
        for r in 0..self.n_rows {
            let row = self.row(r);
            data.extend(cols.iter().map(|&c| row[c]));
        }
        Matrix {
            n_rows: self.n_rows,
            n_cols: cols.len(),
            data,
            row_labels: self.row_labels.clone(),
            col_labels: cols.iter().map(|&c| self.col_labels[c].clone()).collect(),
        }
    }

    /// Same labels and shape, new values.
    pub(crate) fn with_values(&self, data: Vec<f64>) -> Matrix {
        debug_assert_eq!(data.len(), self.data.len());
        Matrix {
            n_rows: self.n_rows,
            n_cols: self.n_cols,
            data,
            row_labels: self.row_labels.clone(),
            col_labels: self.col_labels.clone(),
        }
    }

    /// Read a tab-separated matrix: header `<corner>\t<col labels...>`, then
    /// `<row label>\t<values...>` per line.
    pub fn read_tsv<R: BufRead>(reader: R) -> Result<Matrix> {
        let mut col_labels: Option<Vec<String>> = None;
        let mut row_labels = Vec::new();
        let mut rows = Vec::new();

        for (line_no, line) in reader.lines().enumerate() {
            let line = line?;
            let line = line.trim_end_matches(['\r', '\n']);
            if line.trim().is_empty() || line.starts_with('#') {
                continue;
            }
            let parts: Vec<&str> = line.split('\t').collect();
            let Some(header) = &col_labels else {
                col_labels = Some(parts.iter().skip(1).map(|s| s.trim().to_string()).collect());
                continue;
            };
            if parts.len() != header.len() + 1 {
                return Err(HeatmapError::Parse {
                    line: line_no + 1,
                    detail: format!("expected {} values, found {}", header.len(), parts.len() - 1),
                });
            }
            let mut values = Vec::with_capacity(header.len());
            for field in &parts[1..] {
                match parse_value(field) {
                    Some(v) => values.push(v),
                    None => {
                        return Err(HeatmapError::Parse {
                            line: line_no + 1,
                            detail: format!("not a number: {:?}", field),
                        })
                    }
                }
            }
            row_labels.push(parts[0].trim().to_string());
            rows.push(values);
        }

        let col_labels = col_labels.unwrap_or_default();
        debug!("Read {}x{} matrix", rows.len(), col_labels.len());
        Matrix::from_rows(rows, row_labels, col_labels)
    }

    pub fn read_tsv_path(path: &Path) -> Result<Matrix> {
        let file = File::open(path)?;
        Matrix::read_tsv(BufReader::new(file))
    }
}

/// Parse one numeric cell. Empty, `NA` and `NaN` are missing.
pub fn parse_value(field: &str) -> Option<f64> {
    let field = field.trim();
    if is_missing_token(field) {
        return Some(f64::NAN);
    }
    field.parse::<f64>().ok()
}

pub(crate) fn is_missing_token(field: &str) -> bool {
    field.is_empty()
        || field.eq_ignore_ascii_case("na")
        || field.eq_ignore_ascii_case("nan")
        || field.eq_ignore_ascii_case("null")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(prefix: &str, n: usize) -> Vec<String> {
        (0..n).map(|i| format!("{}{}", prefix, i)).collect()
    }

    #[test]
    fn rejects_label_length_mismatch() {
        let err = Matrix::from_rows(vec![vec![1.0, 2.0]], labels("r", 2), labels("c", 2)).unwrap_err();
        assert!(matches!(
            err,
            HeatmapError::DimensionMismatch { axis: Axis::Row, expected: 1, found: 2, .. }
        ));
    }

    #[test]
    fn rejects_ragged_rows() {
        let err = Matrix::from_rows(
            vec![vec![1.0, 2.0], vec![3.0]],
            labels("r", 2),
            labels("c", 2),
        )
        .unwrap_err();
        assert!(matches!(err, HeatmapError::DimensionMismatch { found: 1, .. }));
    }

    #[test]
    fn selects_rows_and_columns() {
        let m = Matrix::from_unlabeled(vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]]).unwrap();
        let rows = m.select_rows(&[1, 0]);
        assert_eq!(rows.row(0), &[4.0, 5.0, 6.0]);
        assert_eq!(rows.row_labels(), &["r1".to_string(), "r0".to_string()]);

        let cols = m.select_cols(&[2, 0]);
        assert_eq!(cols.row(1), &[6.0, 4.0]);
        assert_eq!(cols.column(0), vec![3.0, 6.0]);
        assert_eq!(m.axis_vectors(Axis::Column).len(), 3);
    }

    #[test]
    fn reads_tsv_with_missing_values() {
        let input = "gene\ts1\ts2\ts3\nA\t1\t2\t3\n# comment\nB\tNA\t5\t\n";
        let m = Matrix::read_tsv(input.as_bytes()).unwrap();
        assert_eq!(m.n_rows(), 2);
        assert_eq!(m.n_cols(), 3);
        assert_eq!(m.col_labels(), &["s1", "s2", "s3"]);
        assert_eq!(m.row_labels(), &["A", "B"]);
        assert!(m.get(1, 0).is_nan());
        assert!(m.get(1, 2).is_nan());
        assert_eq!(m.get(1, 1), 5.0);
    }

    #[test]
    fn tsv_reports_bad_cells() {
        let input = "x\ta\tb\nr\t1\tfoo\n";
        let err = Matrix::read_tsv(input.as_bytes()).unwrap_err();
        assert!(matches!(err, HeatmapError::Parse { line: 2, .. }));
    }
}
