use crate::annotation::{AnnotationTrack, EncodedTrack, Side, TrackStacks};
use crate::cluster::{order_axis, ClusterOrdering, GroupOrderings};
use crate::error::{Axis, Result};
use crate::layout::{GridLayout, LayoutOptions, LayoutRequest};
use crate::matrix::Matrix;
use crate::normalize::{normalize, NormalizeMethod};
use crate::split::{resolve_labels, split_rows, SplitBy, SplitGroup};
use log::debug;

/// Declarative description of the figure.
#[derive(Debug, Clone, PartialEq)]
pub struct HeatmapConfig {
    pub cluster_rows: bool,
    pub cluster_cols: bool,
    pub normalize: NormalizeMethod,
    pub split_rows_by: Option<SplitBy>,
    /// Explicit group order; unlisted groups follow in first-seen order.
    pub split_order: Option<Vec<String>>,
    pub annotations: Vec<AnnotationTrack>,
    /// Draw the row dendrogram when rows are clustered.
    pub show_row_dendrogram: bool,
    /// Draw the column dendrogram when columns are clustered.
    pub show_col_dendrogram: bool,
    /// Rendering hint passed through untouched.
    pub use_gl: bool,
    pub layout: LayoutOptions,
}

impl Default for HeatmapConfig {
    fn default() -> Self {
        HeatmapConfig {
            cluster_rows: true,
            cluster_cols: true,
            normalize: NormalizeMethod::None,
            split_rows_by: None,
            split_order: None,
            annotations: Vec::new(),
            show_row_dendrogram: true,
            show_col_dendrogram: true,
            use_gl: false,
            layout: LayoutOptions::default(),
        }
    }
}

/// Everything a figure assembler needs, computed in one pass.
#[derive(Debug, Clone)]
pub struct HeatmapPlan {
    /// The normalized matrix, in original row/column order.
    pub matrix: Matrix,
    pub layout: GridLayout,
    pub column_ordering: ClusterOrdering,
    pub row_orderings: GroupOrderings,
    pub groups: Vec<SplitGroup>,
    /// Encoded tracks, aligned with `layout.annotations`.
    pub tracks: Vec<EncodedTrack>,
    pub use_gl: bool,
}

impl HeatmapPlan {
    /// Validate `config` against `matrix` and compute the plan.
    /// Fails without partial results.
    pub fn build(matrix: &Matrix, config: &HeatmapConfig) -> Result<HeatmapPlan> {
        let n_rows = matrix.n_rows();
        let stacks = TrackStacks::build(&config.annotations, n_rows, matrix.n_cols())?;
        config.layout.validate()?;

        let mut groups = match &config.split_rows_by {
            Some(split) => {
                let labels = resolve_labels(split, &config.annotations)?;
                split_rows(&labels, n_rows, config.split_order.as_deref())?
            }
            None => Vec::new(),
        };
        // at least one heatmap panel, even for an empty split
        if groups.is_empty() {
            groups.push(SplitGroup::whole(n_rows));
        }

        let normalized = normalize(matrix, config.normalize);
        let column_ordering = order_axis(&normalized, Axis::Column, config.cluster_cols);
        let row_orderings = GroupOrderings::compute(&normalized, &groups, config.cluster_rows);

        let group_sizes: Vec<usize> = groups.iter().map(|g| g.len()).collect();
        let layout = GridLayout::compute(&LayoutRequest {
            column_dendrogram: config.cluster_cols && config.show_col_dendrogram,
            row_dendrogram: config.cluster_rows && config.show_row_dendrogram,
            group_sizes: &group_sizes,
            tracks: &stacks,
            options: config.layout,
        })?;

        let tracks = layout
            .annotations
            .iter()
            .map(|cells| stacks.get(cells.side).tracks()[cells.track].encode())
            .collect();

        debug!(
            "Planned {}x{} heatmap: normalize={}, {} group(s), {} track(s)",
            n_rows,
            matrix.n_cols(),
            config.normalize,
            groups.len(),
            config.annotations.len()
        );

        Ok(HeatmapPlan {
            matrix: normalized,
            layout,
            column_ordering,
            row_orderings,
            groups,
            tracks,
            use_gl: config.use_gl,
        })
    }

    /// All rows in display order.
    pub fn row_order(&self) -> Vec<usize> {
        self.row_orderings.row_order()
    }

    pub fn ordered_row_labels(&self) -> Vec<String> {
        self.row_order()
            .into_iter()
            .map(|r| self.matrix.row_labels()[r].clone())
            .collect()
    }

    pub fn ordered_col_labels(&self) -> Vec<String> {
        self.column_ordering.apply(self.matrix.col_labels())
    }

    /// The sub-matrix shown in heatmap panel `group`, rows and columns reordered.
    pub fn panel(&self, group: usize) -> Option<Matrix> {
        let rows = self.row_orderings.iter().nth(group)?.ordered_rows();
        Some(self.matrix.select_rows(&rows).select_cols(self.column_ordering.order()))
    }

    /// Encoded track `track` of `side`, as indexed by layout occupants.
    pub fn track(&self, side: Side, track: usize) -> Option<&EncodedTrack> {
        self.layout
            .annotations
            .iter()
            .position(|a| a.side == side && a.track == track)
            .map(|i| &self.tracks[i])
    }

    pub fn track_by_name(&self, name: &str) -> Option<&EncodedTrack> {
        self.tracks.iter().find(|t| t.name == name)
    }
}
