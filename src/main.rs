use clap::Parser;
use heatgrid::{
    read_annotation_tsv_path, Axis, BudgetPolicy, HeatmapConfig, HeatmapPlan, LayoutOptions, Matrix,
    NormalizeMethod, Side, SplitBy,
};
use log::{debug, info};
use std::fmt::Display;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "heatgrid")]
#[command(about = "Lay out a clustered, split and annotated heatmap.", long_about = None)]
struct Args {
    // MANDATORY OPTIONS
    /// Load the matrix from this tab-separated FILE (header row of column labels, one labelled row per line).
    #[arg(short = 'i', long = "input", value_name = "FILE")]
    input: PathBuf,

    /// Write a preview to this FILE (PNG or SVG based on extension). Without it the grid is printed.
    #[arg(short = 'o', long = "out", value_name = "FILE")]
    out: Option<PathBuf>,

    /// Write the row and column display order to this FILE as TSV.
    #[arg(short = 'O', long = "order-out", value_name = "FILE")]
    order_out: Option<PathBuf>,

    // Preview Options
    /// Set the width in pixels of the preview.
    #[arg(short = 'x', long = "width", value_name = "N", default_value_t = 1200)]
    width: u32,

    /// Set the height in pixels of the preview.
    #[arg(short = 'y', long = "height", value_name = "N", default_value_t = 800)]
    height: u32,

    // Ordering Options
    /// Keep rows in input order instead of clustering them.
    #[arg(long = "no-cluster-rows")]
    no_cluster_rows: bool,

    /// Keep columns in input order instead of clustering them.
    #[arg(long = "no-cluster-cols")]
    no_cluster_cols: bool,

    /// Z-score normalization: none, row, column or global.
    #[arg(short = 'n', long = "normalize", value_name = "METHOD", default_value = "none")]
    normalize: String,

    /// Split rows into panels by this row annotation track.
    #[arg(short = 's', long = "split-rows-by", value_name = "TRACK")]
    split_rows_by: Option<String>,

    /// Comma-separated order of the split groups.
    #[arg(long = "split-order", value_name = "LABELS", value_delimiter = ',', requires = "split_rows_by")]
    split_order: Option<Vec<String>>,

    // Annotation Options
    /// Read row annotation tracks from this TSV FILE (first column holds row labels).
    #[arg(short = 'R', long = "row-annotations", value_name = "FILE")]
    row_annotations: Option<PathBuf>,

    /// Side for row annotation tracks: left or right.
    #[arg(long = "row-annotation-side", value_name = "SIDE", default_value = "left")]
    row_annotation_side: String,

    /// Read column annotation tracks from this TSV FILE (first column holds column labels).
    #[arg(short = 'C', long = "col-annotations", value_name = "FILE")]
    col_annotations: Option<PathBuf>,

    /// Side for column annotation tracks: top or bottom.
    #[arg(long = "col-annotation-side", value_name = "SIDE", default_value = "top")]
    col_annotation_side: String,

    /// Relative size of each annotation track.
    #[arg(short = 'a', long = "annotation-size", value_name = "FLOAT", default_value_t = 0.03)]
    annotation_size: f64,

    // Layout Options
    /// Share of each axis given to its dendrogram.
    #[arg(short = 'd', long = "dendrogram-ratio", value_name = "FLOAT", default_value_t = 0.08)]
    dendrogram_ratio: f64,

    /// Minimum share of each axis kept for the heatmap.
    #[arg(long = "min-heatmap-fraction", value_name = "FLOAT", default_value_t = 0.3)]
    min_heatmap_fraction: f64,

    /// Rescale an over-budget axis so its fractions sum to 1.
    #[arg(long = "renormalize")]
    renormalize: bool,

    /// Don't draw the row dendrogram.
    #[arg(long = "hide-row-dendrogram")]
    hide_row_dendrogram: bool,

    /// Don't draw the column dendrogram.
    #[arg(long = "hide-col-dendrogram")]
    hide_col_dendrogram: bool,

    /// Ask the renderer for hardware-accelerated heatmap traces.
    #[arg(long = "use-gl")]
    use_gl: bool,

    // Threading
    /// Number of threads to use for parallel operations.
    #[arg(short = 't', long = "threads", value_name = "N")]
    threads: Option<usize>,

    // Logging
    /// Verbosity level (0 = error, 1 = info, 2 = debug).
    #[arg(short = 'v', long = "verbose", value_name = "N", default_value_t = 1)]
    verbose: u8,
}

fn die(context: &str, err: impl Display) -> ! {
    eprintln!("Error {}: {}", context, err);
    std::process::exit(1);
}

fn parse_side(value: &str, axis: Axis) -> Side {
    let side: Side = value.parse().unwrap_or_else(|e| die("parsing annotation side", e));
    if side.axis() != axis {
        die(
            "parsing annotation side",
            format!("{} tracks cannot be placed on the {} side", axis, side),
        );
    }
    side
}

impl Args {
    fn config(&self, matrix: &Matrix) -> HeatmapConfig {
        let normalize: NormalizeMethod = self
            .normalize
            .parse()
            .unwrap_or_else(|e| die("parsing normalization method", e));

        let mut annotations = Vec::new();
        if let Some(path) = &self.row_annotations {
            let side = parse_side(&self.row_annotation_side, Axis::Row);
            match read_annotation_tsv_path(path, side, self.annotation_size, matrix.row_labels()) {
                Ok(tracks) => annotations.extend(tracks),
                Err(e) => die("loading row annotations", e),
            }
        }
        if let Some(path) = &self.col_annotations {
            let side = parse_side(&self.col_annotation_side, Axis::Column);
            match read_annotation_tsv_path(path, side, self.annotation_size, matrix.col_labels()) {
                Ok(tracks) => annotations.extend(tracks),
                Err(e) => die("loading column annotations", e),
            }
        }

        HeatmapConfig {
            cluster_rows: !self.no_cluster_rows,
            cluster_cols: !self.no_cluster_cols,
            normalize,
            split_rows_by: self.split_rows_by.clone().map(SplitBy::Track),
            split_order: self.split_order.clone(),
            annotations,
            show_row_dendrogram: !self.hide_row_dendrogram,
            show_col_dendrogram: !self.hide_col_dendrogram,
            use_gl: self.use_gl,
            layout: LayoutOptions {
                dendrogram_ratio: self.dendrogram_ratio,
                min_heatmap_fraction: self.min_heatmap_fraction,
                budget_policy: if self.renormalize {
                    BudgetPolicy::Renormalize
                } else {
                    BudgetPolicy::Floor
                },
            },
        }
    }
}

/// Write the display order: one line per row, then one per column.
fn write_order_tsv(path: &Path, plan: &HeatmapPlan) {
    let mut content = String::from("axis\tlabel\tgroup\n");
    for group in plan.row_orderings.iter() {
        for row in group.ordered_rows() {
            content.push_str(&format!("row\t{}\t{}\n", plan.matrix.row_labels()[row], group.label));
        }
    }
    for label in plan.ordered_col_labels() {
        content.push_str(&format!("column\t{}\t\n", label));
    }

    match std::fs::write(path, content) {
        Ok(_) => info!("Display order saved to {:?}", path),
        Err(e) => eprintln!("Warning: could not write order TSV: {}", e),
    }
}

fn main() {
    let args = Args::parse();

    // Initialize logger based on verbosity
    env_logger::Builder::new()
        .filter_level(match args.verbose {
            0 => log::LevelFilter::Error,
            1 => log::LevelFilter::Info,
            _ => log::LevelFilter::Debug,
        })
        .init();

    if let Some(threads) = args.threads {
        if let Err(e) = rayon::ThreadPoolBuilder::new().num_threads(threads).build_global() {
            eprintln!("Warning: could not configure {} threads: {}", threads, e);
        }
    }

    info!("Loading matrix from {:?}...", args.input);
    let matrix = match Matrix::read_tsv_path(&args.input) {
        Ok(m) => m,
        Err(e) => die("loading matrix", e),
    };
    if matrix.is_empty() {
        eprintln!("Warning: the matrix has no values.");
    }

    let config = args.config(&matrix);
    info!(
        "Planning {}x{} heatmap with {} annotation track(s)...",
        matrix.n_rows(),
        matrix.n_cols(),
        config.annotations.len()
    );
    let plan = match HeatmapPlan::build(&matrix, &config) {
        Ok(p) => p,
        Err(e) => die("building layout", e),
    };
    if plan.layout.rows_floored || plan.layout.columns_floored {
        info!("Heatmap minimum size applied ({:?} policy)", config.layout.budget_policy);
    }
    debug!("Grid:\n{}", plan.layout);

    if let Some(path) = &args.order_out {
        write_order_tsv(path, &plan);
    }

    match &args.out {
        Some(out) => {
            info!("Saving preview to {:?}...", out);
            if let Err(e) = heatgrid::preview::write_preview(&plan, out, args.width, args.height) {
                die("writing preview", e);
            }
        }
        None => print!("{}", plan.layout),
    }

    info!("Done.");
}
