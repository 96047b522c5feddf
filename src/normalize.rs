use crate::error::{ConfigErrorKind, HeatmapError, Result};
use crate::matrix::Matrix;
use std::fmt;
use std::str::FromStr;

/// Z-score normalization variants applied before color mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NormalizeMethod {
    #[default]
    None,
    Row,
    Column,
    Global,
}

impl NormalizeMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            NormalizeMethod::None => "none",
            NormalizeMethod::Row => "row",
            NormalizeMethod::Column => "column",
            NormalizeMethod::Global => "global",
        }
    }
}

impl fmt::Display for NormalizeMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NormalizeMethod {
    type Err = HeatmapError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(NormalizeMethod::None),
            "row" => Ok(NormalizeMethod::Row),
            "column" | "col" => Ok(NormalizeMethod::Column),
            "global" => Ok(NormalizeMethod::Global),
            _ => Err(HeatmapError::config(
                ConfigErrorKind::UnknownNormalizationMethod,
                format!("unknown normalization method {:?} (expected none, row, column or global)", s),
            )),
        }
    }
}

/// Mean and population standard deviation of the finite values.
/// `None` when there are no finite values.
fn finite_stats(values: &[f64]) -> Option<(f64, f64)> {
    let finite = || values.iter().copied().filter(|v| v.is_finite());
    let n = finite().count();
    if n == 0 {
        return None;
    }
    let mean = finite().sum::<f64>() / n as f64;
    let var = finite().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n as f64;
    let std = var.sqrt();
    // Constant axis: avoid dividing by zero.
    let std = if std > 0.0 { std } else { 1.0 };
    Some((mean, std))
}

fn zscore(v: f64, (mean, std): (f64, f64)) -> f64 {
    if v.is_finite() {
        (v - mean) / std
    } else {
        v
    }
}

/// Normalize `matrix` with `method`. Missing values pass through unchanged.
pub fn normalize(matrix: &Matrix, method: NormalizeMethod) -> Matrix {
    let n_rows = matrix.n_rows();
    let n_cols = matrix.n_cols();
    match method {
        NormalizeMethod::None => matrix.clone(),
        NormalizeMethod::Global => match finite_stats(matrix.values()) {
            Some(stats) => matrix.with_values(matrix.values().iter().map(|&v| zscore(v, stats)).collect()),
            None => matrix.clone(),
        },
        NormalizeMethod::Row => {
            let mut out = Vec::with_capacity(n_rows * n_cols);
            for r in 0..n_rows {
                let row = matrix.row(r);
                match finite_stats(row) {
                    Some(stats) => out.extend(row.iter().map(|&v| zscore(v, stats))),
                    None => out.extend_from_slice(row),
                }
            }
            matrix.with_values(out)
        }
        NormalizeMethod::Column => {
            let mut out = matrix.values().to_vec();
            for c in 0..n_cols {
                let col = matrix.column(c);
                if let Some(stats) = finite_stats(&col) {
                    for (r, &v) in col.iter().enumerate() {
                        out[r * n_cols + c] = zscore(v, stats);
                    }
                }
            }
            matrix.with_values(out)
        }
    }
}
