//! Layout and ordering engine for clustered, split and annotated heatmaps.
//!
//! [`HeatmapPlan::build`] takes a [`Matrix`] and a [`HeatmapConfig`] and
//! returns normalized values, cluster orderings, encoded annotation tracks and
//! a proportional [`GridLayout`] describing where each element goes.

pub mod annotation;
pub mod cluster;
pub mod color;
pub mod error;
pub mod layout;
pub mod matrix;
pub mod normalize;
pub mod plan;
pub mod preview;
pub mod split;

pub use annotation::{
    read_annotation_tsv, read_annotation_tsv_path, AnnotationTrack, AnnotationValues, EncodedTrack, Side,
    TrackColoring, TrackStack, TrackStacks,
};
pub use cluster::{average_linkage, order_axis, ClusterOrdering, GroupOrdering, GroupOrderings, MergeTree};
pub use color::{categorical_colorscale, generate_colors, ColorSide, DivergingScale, Rgb};
pub use error::{Axis, ConfigErrorKind, HeatmapError, Result};
pub use layout::{BudgetPolicy, Cell, ColumnKind, GridLayout, LayoutOptions, LayoutRequest, Occupant, RowKind};
pub use matrix::Matrix;
pub use normalize::{normalize, NormalizeMethod};
pub use plan::{HeatmapConfig, HeatmapPlan};
pub use split::{split_rows, SplitBy, SplitGroup};
