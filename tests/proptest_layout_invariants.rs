//! Property-based invariant tests for normalization, colors, ordering and the
//! grid layout.
//!
//! 1. Z-scored axes have near-zero mean; `none` is the identity.
//! 2. Generated colors are deterministic and row/column palettes differ.
//! 3. Categorical colorscales have two stops per color spanning [0, 1].
//! 4. Orderings are permutations, identity when clustering is off.
//! 5. Axis fractions sum to 1 unless the heatmap floor kicks in, and always
//!    under `BudgetPolicy::Renormalize`.
//! 6. Every element lands in exactly one cell.

use heatgrid::{
    categorical_colorscale, generate_colors, normalize, order_axis, AnnotationTrack, Axis, BudgetPolicy,
    ColorSide, GridLayout, LayoutOptions, LayoutRequest, Matrix, NormalizeMethod, Side, TrackStacks,
};
use proptest::prelude::*;

// ── Helpers ─────────────────────────────────────────────────────────────

fn matrix_strategy() -> impl Strategy<Value = Matrix> {
    (1usize..8, 1usize..8).prop_flat_map(|(rows, cols)| {
        proptest::collection::vec(proptest::collection::vec(-100.0f64..100.0, cols), rows)
            .prop_map(|data| Matrix::from_unlabeled(data).unwrap())
    })
}

fn side_sizes() -> impl Strategy<Value = Vec<f64>> {
    proptest::collection::vec(0.01f64..0.2, 0..=3)
}

#[derive(Debug, Clone)]
struct Figure {
    column_dendrogram: bool,
    row_dendrogram: bool,
    group_sizes: Vec<usize>,
    sizes: [Vec<f64>; 4],
    min_heatmap_fraction: f64,
}

fn figure_strategy() -> impl Strategy<Value = Figure> {
    (
        any::<bool>(),
        any::<bool>(),
        proptest::collection::vec(0usize..6, 1..=4),
        proptest::array::uniform4(side_sizes()),
        0.1f64..0.6,
    )
        .prop_map(|(column_dendrogram, row_dendrogram, group_sizes, sizes, min_heatmap_fraction)| Figure {
            column_dendrogram,
            row_dendrogram,
            group_sizes,
            sizes,
            min_heatmap_fraction,
        })
}

fn stacks(figure: &Figure, n_rows: usize, n_cols: usize) -> TrackStacks {
    let mut tracks = Vec::new();
    for (side, sizes) in Side::ALL.iter().zip(&figure.sizes) {
        let len = match side.axis() {
            Axis::Row => n_rows,
            Axis::Column => n_cols,
        };
        for (k, &size) in sizes.iter().enumerate() {
            tracks.push(AnnotationTrack::continuous(format!("{}{}", side, k), *side, size, vec![0.0; len]));
        }
    }
    TrackStacks::build(&tracks, n_rows, n_cols).unwrap()
}

fn layout(figure: &Figure, policy: BudgetPolicy) -> GridLayout {
    let n_rows: usize = figure.group_sizes.iter().sum();
    let tracks = stacks(figure, n_rows, 4);
    GridLayout::compute(&LayoutRequest {
        column_dendrogram: figure.column_dendrogram,
        row_dendrogram: figure.row_dendrogram,
        group_sizes: &figure.group_sizes,
        tracks: &tracks,
        options: LayoutOptions {
            min_heatmap_fraction: figure.min_heatmap_fraction,
            budget_policy: policy,
            ..LayoutOptions::default()
        },
    })
    .unwrap()
}

// ═════════════════════════════════════════════════════════════════════════
// 1. Normalization
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn zscore_centres_the_normalized_axis(m in matrix_strategy()) {
        let rows = normalize(&m, NormalizeMethod::Row);
        for r in 0..m.n_rows() {
            let mean = rows.row(r).iter().sum::<f64>() / m.n_cols() as f64;
            prop_assert!(mean.abs() < 1e-9, "row {} mean {}", r, mean);
        }

        let cols = normalize(&m, NormalizeMethod::Column);
        for c in 0..m.n_cols() {
            let mean = cols.column(c).iter().sum::<f64>() / m.n_rows() as f64;
            prop_assert!(mean.abs() < 1e-9, "column {} mean {}", c, mean);
        }

        let global = normalize(&m, NormalizeMethod::Global);
        let mean = global.values().iter().sum::<f64>() / global.values().len() as f64;
        prop_assert!(mean.abs() < 1e-9);

        prop_assert_eq!(normalize(&m, NormalizeMethod::None), m);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 2-3. Colors
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn colors_are_deterministic(n in 1usize..40) {
        prop_assert_eq!(generate_colors(n, ColorSide::Row), generate_colors(n, ColorSide::Row));
        prop_assert_eq!(generate_colors(n, ColorSide::Column).len(), n);
        if n <= 10 {
            prop_assert_ne!(generate_colors(n, ColorSide::Row)[0], generate_colors(n, ColorSide::Column)[0]);
        }
    }

    #[test]
    fn categorical_colorscale_spans_unit_interval(n in 1usize..30) {
        let stops = categorical_colorscale(&generate_colors(n, ColorSide::Column));
        prop_assert_eq!(stops.len(), 2 * n);
        prop_assert_eq!(stops[0].0, 0.0);
        prop_assert!((stops[2 * n - 1].0 - 1.0).abs() < 1e-12);
        for pair in stops.windows(2) {
            prop_assert!(pair[0].0 <= pair[1].0);
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 4. Orderings
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn orderings_are_permutations(m in matrix_strategy()) {
        prop_assert!(order_axis(&m, Axis::Row, false).is_identity());
        for axis in [Axis::Row, Axis::Column] {
            let mut order = order_axis(&m, axis, true).order().to_vec();
            order.sort_unstable();
            prop_assert_eq!(order, (0..m.len(axis)).collect::<Vec<_>>());
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 5-6. Layout
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn axis_fractions_sum_to_one_unless_floored(figure in figure_strategy()) {
        let floored = layout(&figure, BudgetPolicy::Floor);
        if !floored.rows_floored {
            prop_assert!((floored.total_height() - 1.0).abs() < 1e-6);
        } else {
            prop_assert!(floored.heatmap_height >= figure.min_heatmap_fraction);
        }
        if !floored.columns_floored {
            prop_assert!((floored.total_width() - 1.0).abs() < 1e-6);
        }

        let renormalized = layout(&figure, BudgetPolicy::Renormalize);
        prop_assert!((renormalized.total_height() - 1.0).abs() < 1e-6);
        prop_assert!((renormalized.total_width() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn every_element_gets_exactly_one_cell(figure in figure_strategy()) {
        let grid = layout(&figure, BudgetPolicy::Floor);
        let groups = figure.group_sizes.len();
        let [top, bottom, left, right] = &figure.sizes;
        let expected = usize::from(figure.column_dendrogram)
            + groups * (1 + usize::from(figure.row_dendrogram))
            + top.len()
            + bottom.len()
            + groups * (left.len() + right.len());
        prop_assert_eq!(grid.occupied_cells().count(), expected);
        prop_assert_eq!(grid.heatmaps.len(), groups);
        prop_assert_eq!(grid.row_heights.len(), grid.n_rows);
        prop_assert_eq!(grid.column_widths.len(), grid.n_cols);
        for cell in &grid.heatmaps {
            prop_assert_eq!(cell.col, grid.heatmap_column());
        }
    }
}
