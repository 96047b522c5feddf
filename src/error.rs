use std::fmt;
use thiserror::Error;

/// Matrix axis an element, track or label vector is aligned with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    Row,
    Column,
}

impl Axis {
    pub fn as_str(self) -> &'static str {
        match self {
            Axis::Row => "row",
            Axis::Column => "column",
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Discriminator for configuration errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigErrorKind {
    UnknownNormalizationMethod,
    UnknownSplitReference,
    AnnotationBudgetExceeded,
    InvalidTrackSize,
    DuplicateTrackName,
    InvalidDendrogramRatio,
    InvalidHeatmapFraction,
}

impl fmt::Display for ConfigErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConfigErrorKind::UnknownNormalizationMethod => "UnknownNormalizationMethod",
            ConfigErrorKind::UnknownSplitReference => "UnknownSplitReference",
            ConfigErrorKind::AnnotationBudgetExceeded => "AnnotationBudgetExceeded",
            ConfigErrorKind::InvalidTrackSize => "InvalidTrackSize",
            ConfigErrorKind::DuplicateTrackName => "DuplicateTrackName",
            ConfigErrorKind::InvalidDendrogramRatio => "InvalidDendrogramRatio",
            ConfigErrorKind::InvalidHeatmapFraction => "InvalidHeatmapFraction",
        };
        f.write_str(name)
    }
}

/// Errors raised while building a heatmap layout.
#[derive(Error, Debug)]
pub enum HeatmapError {
    #[error("configuration error ({kind}): {detail}")]
    Configuration { kind: ConfigErrorKind, detail: String },

    #[error("dimension mismatch: {what} has length {found}, expected {expected} to match the {axis} axis")]
    DimensionMismatch {
        what: String,
        axis: Axis,
        expected: usize,
        found: usize,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("malformed input at line {line}: {detail}")]
    Parse { line: usize, detail: String },
}

impl HeatmapError {
    pub fn config(kind: ConfigErrorKind, detail: impl Into<String>) -> Self {
        HeatmapError::Configuration {
            kind,
            detail: detail.into(),
        }
    }

    pub fn mismatch(what: impl Into<String>, axis: Axis, expected: usize, found: usize) -> Self {
        HeatmapError::DimensionMismatch {
            what: what.into(),
            axis,
            expected,
            found,
        }
    }

    /// Configuration kind, if this is a configuration error.
    pub fn config_kind(&self) -> Option<ConfigErrorKind> {
        match self {
            HeatmapError::Configuration { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, HeatmapError>;
