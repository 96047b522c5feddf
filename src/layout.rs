use crate::annotation::{Side, TrackStacks};
use crate::error::{ConfigErrorKind, HeatmapError, Result};
use log::debug;
use std::fmt;

pub const DEFAULT_DENDROGRAM_RATIO: f64 = 0.08;
pub const DEFAULT_MIN_HEATMAP_FRACTION: f64 = 0.3;

/// What happens when the heatmap minimum pushes an axis past 1.0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BudgetPolicy {
    /// Keep the floored heatmap size; the axis may sum past 1.0.
    #[default]
    Floor,
    /// Floor, then scale every fraction on the axis so it sums to 1.0.
    Renormalize,
}

/// Sizing knobs for the layout engine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutOptions {
    pub dendrogram_ratio: f64,
    pub min_heatmap_fraction: f64,
    pub budget_policy: BudgetPolicy,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        LayoutOptions {
            dendrogram_ratio: DEFAULT_DENDROGRAM_RATIO,
            min_heatmap_fraction: DEFAULT_MIN_HEATMAP_FRACTION,
            budget_policy: BudgetPolicy::Floor,
        }
    }
}

impl LayoutOptions {
    pub fn validate(&self) -> Result<()> {
        let ratio = self.dendrogram_ratio;
        if !ratio.is_finite() || !(0.0..1.0).contains(&ratio) {
            return Err(HeatmapError::config(
                ConfigErrorKind::InvalidDendrogramRatio,
                format!("dendrogram_ratio must be in [0, 1), got {}", ratio),
            ));
        }
        let min = self.min_heatmap_fraction;
        if !min.is_finite() || min <= 0.0 || min > 1.0 {
            return Err(HeatmapError::config(
                ConfigErrorKind::InvalidHeatmapFraction,
                format!("min_heatmap_fraction must be in (0, 1], got {}", min),
            ));
        }
        Ok(())
    }
}

/// Structural content of a grid row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowKind {
    ColumnDendrogram,
    TopAnnotation { track: usize },
    Heatmap { group: usize },
    BottomAnnotation { track: usize },
}

/// Structural content of a grid column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    RowDendrogram,
    LeftAnnotation { track: usize },
    Heatmap,
    RightAnnotation { track: usize },
}

/// The element placed in an occupied cell. `track` indexes the side's stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Occupant {
    ColumnDendrogram,
    RowDendrogram { group: usize },
    Heatmap { group: usize },
    Annotation { side: Side, track: usize, group: Option<usize> },
}

/// 1-indexed grid coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Cell {
    pub row: usize,
    pub col: usize,
}

impl Cell {
    fn at(row0: usize, col0: usize) -> Self {
        Cell { row: row0 + 1, col: col0 + 1 }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// Cells of one annotation track: one for top/bottom, one per group otherwise.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationCells {
    pub name: String,
    pub side: Side,
    pub track: usize,
    pub cells: Vec<Cell>,
}

/// What the engine needs to know about the figure.
#[derive(Debug, Clone, Copy)]
pub struct LayoutRequest<'a> {
    pub column_dendrogram: bool,
    pub row_dendrogram: bool,
    /// Row count of every split group, in group order.
    pub group_sizes: &'a [usize],
    pub tracks: &'a TrackStacks,
    pub options: LayoutOptions,
}

/// Abstract proportional grid. Immutable once computed.
#[derive(Debug, Clone, PartialEq)]
pub struct GridLayout {
    pub n_rows: usize,
    pub n_cols: usize,
    pub row_heights: Vec<f64>,
    pub column_widths: Vec<f64>,
    pub row_kinds: Vec<RowKind>,
    pub column_kinds: Vec<ColumnKind>,
    pub occupancy: Vec<Vec<Option<Occupant>>>,
    pub column_dendrogram: Option<Cell>,
    pub row_dendrograms: Vec<Cell>,
    pub heatmaps: Vec<Cell>,
    pub annotations: Vec<AnnotationCells>,
    /// Total height given to heatmap rows, before any renormalization.
    pub heatmap_height: f64,
    /// Width of the heatmap column, before any renormalization.
    pub heatmap_width: f64,
    /// Whether the minimum heatmap fraction kicked in on each axis.
    pub rows_floored: bool,
    pub columns_floored: bool,
}

/// `max(min, 1 - reserved)`, and whether the minimum won.
fn heatmap_budget(reserved: f64, min: f64) -> (f64, bool) {
    let raw = 1.0 - reserved;
    if raw < min {
        (min, true)
    } else {
        (raw, false)
    }
}

fn renormalize(sizes: &mut [f64]) {
    let total: f64 = sizes.iter().sum();
    if total > 0.0 {
        for s in sizes.iter_mut() {
            *s /= total;
        }
    }
}

impl GridLayout {
    pub fn compute(request: &LayoutRequest<'_>) -> Result<GridLayout> {
        let options = request.options;
        options.validate()?;
        let tracks = request.tracks;
        let groups: &[usize] = if request.group_sizes.is_empty() { &[0] } else { request.group_sizes };

        // Rows, top to bottom.
        let mut rows: Vec<(RowKind, f64)> = Vec::new();
        if request.column_dendrogram {
            rows.push((RowKind::ColumnDendrogram, options.dendrogram_ratio));
        }
        for slot in tracks.top.slots(rows.len()) {
            rows.push((RowKind::TopAnnotation { track: slot.track }, slot.size));
        }
        let reserved: f64 = rows.iter().map(|(_, h)| h).sum();
        let (heatmap_height, rows_floored) =
            heatmap_budget(reserved + tracks.bottom.total_size(), options.min_heatmap_fraction);
        let first_heatmap_row = rows.len();
        let total_rows: usize = groups.iter().sum();
        for (group, &size) in groups.iter().enumerate() {
            let share = if total_rows > 0 {
                size as f64 / total_rows as f64
            } else {
                1.0 / groups.len() as f64
            };
            rows.push((RowKind::Heatmap { group }, heatmap_height * share));
        }
        for slot in tracks.bottom.slots(rows.len()) {
            rows.push((RowKind::BottomAnnotation { track: slot.track }, slot.size));
        }

        // Columns, left to right.
        let mut cols: Vec<(ColumnKind, f64)> = Vec::new();
        if request.row_dendrogram {
            cols.push((ColumnKind::RowDendrogram, options.dendrogram_ratio));
        }
        for slot in tracks.left.slots(cols.len()) {
            cols.push((ColumnKind::LeftAnnotation { track: slot.track }, slot.size));
        }
        let reserved: f64 = cols.iter().map(|(_, w)| w).sum();
        let (heatmap_width, columns_floored) =
            heatmap_budget(reserved + tracks.right.total_size(), options.min_heatmap_fraction);
        let heatmap_col = cols.len();
        cols.push((ColumnKind::Heatmap, heatmap_width));
        for slot in tracks.right.slots(cols.len()) {
            cols.push((ColumnKind::RightAnnotation { track: slot.track }, slot.size));
        }

        let (row_kinds, mut row_heights): (Vec<RowKind>, Vec<f64>) = rows.into_iter().unzip();
        let (column_kinds, mut column_widths): (Vec<ColumnKind>, Vec<f64>) = cols.into_iter().unzip();
        if options.budget_policy == BudgetPolicy::Renormalize {
            if rows_floored {
                renormalize(&mut row_heights);
            }
            if columns_floored {
                renormalize(&mut column_widths);
            }
        }
        if rows_floored || columns_floored {
            debug!(
                "Heatmap minimum {:.2} applied (rows: {}, columns: {}, policy: {:?})",
                options.min_heatmap_fraction, rows_floored, columns_floored, options.budget_policy
            );
        }

        let n_rows = row_kinds.len();
        let n_cols = column_kinds.len();
        let mut layout = GridLayout {
            n_rows,
            n_cols,
            row_heights,
            column_widths,
            row_kinds,
            column_kinds,
            occupancy: vec![vec![None; n_cols]; n_rows],
            column_dendrogram: None,
            row_dendrograms: Vec::new(),
            heatmaps: Vec::new(),
            annotations: Vec::new(),
            heatmap_height,
            heatmap_width,
            rows_floored,
            columns_floored,
        };

        if request.column_dendrogram {
            layout.column_dendrogram = Some(layout.place(0, heatmap_col, Occupant::ColumnDendrogram));
        }
        for group in 0..groups.len() {
            let row = first_heatmap_row + group;
            let cell = layout.place(row, heatmap_col, Occupant::Heatmap { group });
            layout.heatmaps.push(cell);
            if request.row_dendrogram {
                let cell = layout.place(row, 0, Occupant::RowDendrogram { group });
                layout.row_dendrograms.push(cell);
            }
        }

        let top_first = usize::from(request.column_dendrogram);
        let bottom_first = first_heatmap_row + groups.len();
        for (side, first) in [(Side::Top, top_first), (Side::Bottom, bottom_first)] {
            for slot in tracks.get(side).slots(first) {
                let occupant = Occupant::Annotation { side, track: slot.track, group: None };
                let cell = layout.place(slot.index, heatmap_col, occupant);
                layout.annotations.push(AnnotationCells {
                    name: slot.name,
                    side,
                    track: slot.track,
                    cells: vec![cell],
                });
            }
        }
        let left_first = usize::from(request.row_dendrogram);
        for (side, first) in [(Side::Left, left_first), (Side::Right, heatmap_col + 1)] {
            for slot in tracks.get(side).slots(first) {
                let cells = (0..groups.len())
                    .map(|group| {
                        let occupant = Occupant::Annotation { side, track: slot.track, group: Some(group) };
                        layout.place(first_heatmap_row + group, slot.index, occupant)
                    })
                    .collect();
                layout.annotations.push(AnnotationCells {
                    name: slot.name,
                    side,
                    track: slot.track,
                    cells,
                });
            }
        }
        layout.annotations.sort_by_key(|a| {
            let side_rank = Side::ALL.iter().position(|&s| s == a.side).unwrap_or(Side::ALL.len());
            (side_rank, a.track)
        });

        debug!(
            "Grid {}x{}: heatmap {:.3} x {:.3}, {} group(s)",
            n_rows,
            n_cols,
            heatmap_height,
            heatmap_width,
            groups.len()
        );
        Ok(layout)
    }

    fn place(&mut self, row: usize, col: usize, occupant: Occupant) -> Cell {
        debug_assert!(self.occupancy[row][col].is_none(), "cell ({}, {}) assigned twice", row, col);
        self.occupancy[row][col] = Some(occupant);
        Cell::at(row, col)
    }

    pub fn occupant(&self, cell: Cell) -> Option<&Occupant> {
        self.occupancy
            .get(cell.row.checked_sub(1)?)?
            .get(cell.col.checked_sub(1)?)?
            .as_ref()
    }

    pub fn is_occupied(&self, cell: Cell) -> bool {
        self.occupant(cell).is_some()
    }

    /// Every occupied cell with its occupant, row-major.
    pub fn occupied_cells(&self) -> impl Iterator<Item = (Cell, &Occupant)> {
        self.occupancy.iter().enumerate().flat_map(|(r, row)| {
            row.iter()
                .enumerate()
                .filter_map(move |(c, occ)| occ.as_ref().map(|o| (Cell::at(r, c), o)))
        })
    }

    /// 1-indexed column holding the heatmap panels.
    pub fn heatmap_column(&self) -> usize {
        self.column_kinds
            .iter()
            .position(|k| *k == ColumnKind::Heatmap)
            .map_or(0, |c| c + 1)
    }

    pub fn annotation(&self, name: &str) -> Option<&AnnotationCells> {
        self.annotations.iter().find(|a| a.name == name)
    }

    pub fn total_height(&self) -> f64 {
        self.row_heights.iter().sum()
    }

    pub fn total_width(&self) -> f64 {
        self.column_widths.iter().sum()
    }
}

impl fmt::Display for RowKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowKind::ColumnDendrogram => write!(f, "column dendrogram"),
            RowKind::TopAnnotation { track } => write!(f, "top annotation #{}", track),
            RowKind::Heatmap { group } => write!(f, "heatmap group #{}", group),
            RowKind::BottomAnnotation { track } => write!(f, "bottom annotation #{}", track),
        }
    }
}

impl fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnKind::RowDendrogram => write!(f, "row dendrogram"),
            ColumnKind::LeftAnnotation { track } => write!(f, "left annotation #{}", track),
            ColumnKind::Heatmap => write!(f, "heatmap"),
            ColumnKind::RightAnnotation { track } => write!(f, "right annotation #{}", track),
        }
    }
}

impl fmt::Display for GridLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "grid {} rows x {} columns", self.n_rows, self.n_cols)?;
        for (i, (kind, h)) in self.row_kinds.iter().zip(&self.row_heights).enumerate() {
            writeln!(f, "  row {:>2}  {:.4}  {}", i + 1, h, kind)?;
        }
        for (i, (kind, w)) in self.column_kinds.iter().zip(&self.column_widths).enumerate() {
            writeln!(f, "  col {:>2}  {:.4}  {}", i + 1, w, kind)?;
        }
        for (r, row) in self.occupancy.iter().enumerate() {
            let marks: String = row
                .iter()
                .map(|occ| match occ {
                    None => '.',
                    Some(Occupant::ColumnDendrogram) | Some(Occupant::RowDendrogram { .. }) => 'D',
                    Some(Occupant::Heatmap { .. }) => 'H',
                    Some(Occupant::Annotation { .. }) => 'A',
                })
                .collect();
            writeln!(f, "  {:>2} {}", r + 1, marks)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::{AnnotationTrack, TrackStack};

    fn track(name: &str, side: Side, size: f64, len: usize) -> AnnotationTrack {
        AnnotationTrack::continuous(name, side, size, vec![0.0; len])
    }

    fn stacks(tracks: &[AnnotationTrack]) -> TrackStacks {
        TrackStacks::build(tracks, 4, 3).unwrap()
    }

    fn request<'a>(groups: &'a [usize], tracks: &'a TrackStacks) -> LayoutRequest<'a> {
        LayoutRequest {
            column_dendrogram: false,
            row_dendrogram: false,
            group_sizes: groups,
            tracks,
            options: LayoutOptions::default(),
        }
    }

    #[test]
    fn bare_heatmap_fills_the_grid() {
        let tracks = TrackStacks::default();
        let layout = GridLayout::compute(&request(&[4], &tracks)).unwrap();
        assert_eq!((layout.n_rows, layout.n_cols), (1, 1));
        assert_eq!(layout.row_heights, vec![1.0]);
        assert_eq!(layout.column_widths, vec![1.0]);
        assert_eq!(layout.heatmaps, vec![Cell { row: 1, col: 1 }]);
        assert!(layout.column_dendrogram.is_none());
        assert!(layout.row_dendrograms.is_empty());
    }

    #[test]
    fn full_layout_places_every_element() {
        let tracks = stacks(&[
            track("t0", Side::Top, 0.05, 3),
            track("t1", Side::Top, 0.04, 3),
            track("b0", Side::Bottom, 0.03, 3),
            track("l0", Side::Left, 0.06, 4),
            track("r0", Side::Right, 0.02, 4),
            track("r1", Side::Right, 0.01, 4),
        ]);
        let groups = [1, 3];
        let mut req = request(&groups, &tracks);
        req.column_dendrogram = true;
        req.row_dendrogram = true;
        let layout = GridLayout::compute(&req).unwrap();

        assert_eq!(
            layout.row_kinds,
            vec![
                RowKind::ColumnDendrogram,
                RowKind::TopAnnotation { track: 1 },
                RowKind::TopAnnotation { track: 0 },
                RowKind::Heatmap { group: 0 },
                RowKind::Heatmap { group: 1 },
                RowKind::BottomAnnotation { track: 0 },
            ]
        );
        assert_eq!(
            layout.column_kinds,
            vec![
                ColumnKind::RowDendrogram,
                ColumnKind::LeftAnnotation { track: 0 },
                ColumnKind::Heatmap,
                ColumnKind::RightAnnotation { track: 0 },
                ColumnKind::RightAnnotation { track: 1 },
            ]
        );
        let budget = 1.0 - 0.08 - 0.05 - 0.04 - 0.03;
        assert!((layout.heatmap_height - budget).abs() < 1e-12);
        assert!((layout.row_heights[3] - budget * 0.25).abs() < 1e-12);
        assert!((layout.row_heights[4] - budget * 0.75).abs() < 1e-12);
        assert!((layout.total_height() - 1.0).abs() < 1e-9);
        assert!((layout.total_width() - 1.0).abs() < 1e-9);

        assert_eq!(layout.heatmap_column(), 3);
        assert_eq!(layout.column_dendrogram, Some(Cell { row: 1, col: 3 }));
        assert_eq!(layout.heatmaps, vec![Cell { row: 4, col: 3 }, Cell { row: 5, col: 3 }]);
        assert_eq!(layout.row_dendrograms, vec![Cell { row: 4, col: 1 }, Cell { row: 5, col: 1 }]);
        assert_eq!(layout.annotation("t0").unwrap().cells, vec![Cell { row: 3, col: 3 }]);
        assert_eq!(layout.annotation("t1").unwrap().cells, vec![Cell { row: 2, col: 3 }]);
        assert_eq!(layout.annotation("b0").unwrap().cells, vec![Cell { row: 6, col: 3 }]);
        assert_eq!(
            layout.annotation("l0").unwrap().cells,
            vec![Cell { row: 4, col: 2 }, Cell { row: 5, col: 2 }]
        );
        assert_eq!(
            layout.annotation("r1").unwrap().cells,
            vec![Cell { row: 4, col: 5 }, Cell { row: 5, col: 5 }]
        );
        let names: Vec<&str> = layout.annotations.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["t0", "t1", "b0", "l0", "r0", "r1"]);

        // corners stay empty
        assert!(!layout.is_occupied(Cell { row: 1, col: 1 }));
        assert!(!layout.is_occupied(Cell { row: 6, col: 5 }));
        assert_eq!(
            layout.occupant(Cell { row: 5, col: 4 }),
            Some(&Occupant::Annotation { side: Side::Right, track: 0, group: Some(1) })
        );
        // 1 col dendro + 2 heatmaps + 2 row dendros + 3 top/bottom + 3 x 2 left/right
        assert_eq!(layout.occupied_cells().count(), 14);
    }

    #[test]
    fn floor_is_kept_or_renormalized() {
        let tracks = stacks(&[
            track("a", Side::Top, 0.4, 3),
            track("b", Side::Bottom, 0.4, 3),
        ]);
        let groups = [4];
        let mut req = request(&groups, &tracks);
        req.column_dendrogram = true;
        let floored = GridLayout::compute(&req).unwrap();
        assert!(floored.rows_floored);
        assert!(!floored.columns_floored);
        assert_eq!(floored.heatmap_height, 0.3);
        assert!((floored.total_height() - 1.18).abs() < 1e-9);

        req.options.budget_policy = BudgetPolicy::Renormalize;
        let renormalized = GridLayout::compute(&req).unwrap();
        assert!((renormalized.total_height() - 1.0).abs() < 1e-12);
        assert!((renormalized.row_heights[2] - 0.3 / 1.18).abs() < 1e-12);
        assert_eq!(renormalized.column_widths, vec![1.0]);
    }

    #[test]
    fn rejects_bad_options() {
        let tracks = TrackStacks::default();
        let mut req = request(&[1], &tracks);
        req.options.dendrogram_ratio = 1.0;
        let err = GridLayout::compute(&req).unwrap_err();
        assert_eq!(err.config_kind(), Some(ConfigErrorKind::InvalidDendrogramRatio));
        req.options.dendrogram_ratio = 0.1;
        req.options.min_heatmap_fraction = 0.0;
        let err = GridLayout::compute(&req).unwrap_err();
        assert_eq!(err.config_kind(), Some(ConfigErrorKind::InvalidHeatmapFraction));
    }

    #[test]
    fn empty_groups_share_the_budget() {
        let tracks = TrackStacks::default();
        let layout = GridLayout::compute(&request(&[0, 0], &tracks)).unwrap();
        assert_eq!(layout.row_heights, vec![0.5, 0.5]);
        let layout = GridLayout::compute(&request(&[], &tracks)).unwrap();
        assert_eq!(layout.heatmaps.len(), 1);
    }

    #[test]
    fn summary_marks_cells() {
        let side = TrackStack::new(Side::Left, vec![track("l", Side::Left, 0.1, 2)], 2).unwrap();
        let tracks = TrackStacks { left: side, ..TrackStacks::default() };
        let layout = GridLayout::compute(&request(&[2], &tracks)).unwrap();
        let text = layout.to_string();
        assert!(text.contains("grid 1 rows x 2 columns"));
        assert!(text.contains(" 1 AH"));
    }
}
