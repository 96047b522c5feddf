use crate::annotation::EncodedTrack;
use crate::cluster::MergeTree;
use crate::color::{DivergingScale, Rgb};
use crate::error::Result;
use crate::layout::{Cell, GridLayout, Occupant};
use crate::plan::HeatmapPlan;
use image::RgbImage;
use log::debug;
use std::fs::File;
use std::io::Write;
use std::path::Path;

const BACKGROUND: Rgb = Rgb(255, 255, 255);
const DENDROGRAM_COLOR: Rgb = Rgb(68, 68, 68);

/// Axis-aligned rectangle in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

/// Pixel rectangle of `cell`. Fractions are divided by the axis total, so a
/// floored layout still fits the canvas.
pub fn cell_rect(layout: &GridLayout, cell: Cell, width: f64, height: f64) -> Rect {
    let (r, c) = (cell.row - 1, cell.col - 1);
    let total_w = layout.total_width();
    let total_h = layout.total_height();
    let x: f64 = layout.column_widths[..c].iter().sum();
    let y: f64 = layout.row_heights[..r].iter().sum();
    Rect {
        x: x / total_w * width,
        y: y / total_h * height,
        w: layout.column_widths[c] / total_w * width,
        h: layout.row_heights[r] / total_h * height,
    }
}

/// Drawing surface for a preview.
pub trait Canvas {
    fn fill_rect(&mut self, rect: Rect, color: Rgb);
    fn line(&mut self, from: (f64, f64), to: (f64, f64), color: Rgb);
    /// Attach a hover label to a region. Surfaces without labels ignore it.
    fn label(&mut self, _rect: Rect, _text: &str) {}
}

pub struct RasterCanvas {
    image: RgbImage,
}

impl RasterCanvas {
    pub fn new(width: u32, height: u32) -> Self {
        let image = RgbImage::from_pixel(width, height, pixel(BACKGROUND));
        RasterCanvas { image }
    }

    pub fn into_image(self) -> RgbImage {
        self.image
    }

    fn put(&mut self, x: i64, y: i64, color: Rgb) {
        if x >= 0 && y >= 0 && (x as u32) < self.image.width() && (y as u32) < self.image.height() {
            self.image.put_pixel(x as u32, y as u32, pixel(color));
        }
    }
}

fn pixel(color: Rgb) -> image::Rgb<u8> {
    image::Rgb([color.0, color.1, color.2])
}

impl Canvas for RasterCanvas {
    fn fill_rect(&mut self, rect: Rect, color: Rgb) {
        let x0 = rect.x.round() as i64;
        let x1 = (rect.x + rect.w).round() as i64;
        let y0 = rect.y.round() as i64;
        let y1 = (rect.y + rect.h).round() as i64;
        for y in y0..y1 {
            for x in x0..x1 {
                self.put(x, y, color);
            }
        }
    }

    fn line(&mut self, from: (f64, f64), to: (f64, f64), color: Rgb) {
        let (dx, dy) = (to.0 - from.0, to.1 - from.1);
        let steps = dx.abs().max(dy.abs()).ceil().max(1.0) as i64;
        for i in 0..=steps {
            let t = i as f64 / steps as f64;
            let x = (from.0 + dx * t).floor() as i64;
            let y = (from.1 + dy * t).floor() as i64;
            self.put(x, y, color);
        }
    }
}

/// Escape special XML characters
fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

pub struct SvgCanvas {
    svg: String,
}

impl SvgCanvas {
    pub fn new(width: u32, height: u32) -> Self {
        let mut svg = String::new();
        svg.push_str(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
        svg.push('\n');
        svg.push_str(&format!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{}" height="{}" viewBox="0 0 {} {}">"#,
            width, height, width, height
        ));
        svg.push('\n');
        svg.push_str(&format!(
            r#"<rect width="100%" height="100%" fill="{}"/>"#,
            BACKGROUND
        ));
        svg.push('\n');
        SvgCanvas { svg }
    }

    pub fn finish(mut self) -> String {
        self.svg.push_str("</svg>\n");
        self.svg
    }
}

impl Canvas for SvgCanvas {
    fn fill_rect(&mut self, rect: Rect, color: Rgb) {
        self.svg.push_str(&format!(
            r#"<rect x="{:.2}" y="{:.2}" width="{:.2}" height="{:.2}" fill="{}"/>"#,
            rect.x, rect.y, rect.w, rect.h, color
        ));
        self.svg.push('\n');
    }

    fn line(&mut self, from: (f64, f64), to: (f64, f64), color: Rgb) {
        self.svg.push_str(&format!(
            r#"<line x1="{:.2}" y1="{:.2}" x2="{:.2}" y2="{:.2}" stroke="{}" stroke-width="1"/>"#,
            from.0, from.1, to.0, to.1, color
        ));
        self.svg.push('\n');
    }

    fn label(&mut self, rect: Rect, text: &str) {
        self.svg.push_str(&format!(
            r#"<rect x="{:.2}" y="{:.2}" width="{:.2}" height="{:.2}" fill="none"><title>{}</title></rect>"#,
            rect.x,
            rect.y,
            rect.w,
            rect.h,
            escape_xml(text)
        ));
        self.svg.push('\n');
    }
}

/// Where a dendrogram's leaves sit relative to its cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Orientation {
    /// Leaves along the bottom edge, root towards the top.
    Top,
    /// Leaves along the right edge, root towards the left.
    Left,
}

fn paint_dendrogram<C: Canvas>(canvas: &mut C, rect: Rect, tree: &MergeTree, orientation: Orientation) {
    let segments = tree.dendrogram_segments();
    let span = 10.0 * tree.n_leaves() as f64;
    let max_height = segments
        .iter()
        .flat_map(|s| s.dcoord)
        .filter(|d| d.is_finite())
        .fold(0.0_f64, f64::max);
    let max_height = if max_height > 0.0 { max_height } else { 1.0 };

    let point = |i: f64, d: f64| {
        // unbounded merges are drawn at the top of the cell
        let d = d.min(max_height);
        match orientation {
            Orientation::Top => (rect.x + i / span * rect.w, rect.y + rect.h - d / max_height * rect.h),
            Orientation::Left => (rect.x + rect.w - d / max_height * rect.w, rect.y + i / span * rect.h),
        }
    };
    for segment in &segments {
        for k in 0..3 {
            let from = point(segment.icoord[k], segment.dcoord[k]);
            let to = point(segment.icoord[k + 1], segment.dcoord[k + 1]);
            canvas.line(from, to, DENDROGRAM_COLOR);
        }
    }
}

/// Paint `track` along the columns (`horizontal`) or rows of `rect`.
fn paint_track<C: Canvas>(canvas: &mut C, rect: Rect, track: &EncodedTrack, order: &[usize], horizontal: bool) {
    let n = order.len().max(1) as f64;
    for (k, &i) in order.iter().enumerate() {
        let sub = if horizontal {
            Rect { x: rect.x + rect.w * k as f64 / n, y: rect.y, w: rect.w / n, h: rect.h }
        } else {
            Rect { x: rect.x, y: rect.y + rect.h * k as f64 / n, w: rect.w, h: rect.h / n }
        };
        canvas.fill_rect(sub, track.color_of(i));
    }
    canvas.label(rect, &track.name);
}

/// Draw every occupied cell of the plan's grid onto `canvas`.
pub fn paint<C: Canvas>(plan: &HeatmapPlan, canvas: &mut C, width: u32, height: u32) {
    let layout = &plan.layout;
    let scale = DivergingScale::for_values(plan.matrix.values());
    let col_order = plan.column_ordering.order();
    let group_rows: Vec<Vec<usize>> = plan.row_orderings.iter().map(|g| g.ordered_rows()).collect();

    for (cell, occupant) in layout.occupied_cells() {
        let rect = cell_rect(layout, cell, width as f64, height as f64);
        match *occupant {
            Occupant::Heatmap { group } => {
                let rows = &group_rows[group];
                let (nr, nc) = (rows.len().max(1) as f64, col_order.len().max(1) as f64);
                for (i, &r) in rows.iter().enumerate() {
                    for (j, &c) in col_order.iter().enumerate() {
                        let sub = Rect {
                            x: rect.x + rect.w * j as f64 / nc,
                            y: rect.y + rect.h * i as f64 / nr,
                            w: rect.w / nc,
                            h: rect.h / nr,
                        };
                        canvas.fill_rect(sub, scale.color(plan.matrix.get(r, c)));
                    }
                }
            }
            Occupant::Annotation { side, track, group } => {
                let Some(encoded) = plan.track(side, track) else {
                    continue;
                };
                match group {
                    None => paint_track(canvas, rect, encoded, col_order, true),
                    Some(g) => paint_track(canvas, rect, encoded, &group_rows[g], false),
                }
            }
            Occupant::ColumnDendrogram => {
                if let Some(tree) = plan.column_ordering.tree() {
                    paint_dendrogram(canvas, rect, tree, Orientation::Top);
                }
            }
            Occupant::RowDendrogram { group } => {
                let tree = plan.row_orderings.iter().nth(group).and_then(|g| g.ordering.tree());
                if let Some(tree) = tree {
                    paint_dendrogram(canvas, rect, tree, Orientation::Left);
                }
            }
        }
    }
}

pub fn render_png(plan: &HeatmapPlan, width: u32, height: u32) -> RgbImage {
    let mut canvas = RasterCanvas::new(width, height);
    paint(plan, &mut canvas, width, height);
    canvas.into_image()
}

pub fn render_svg(plan: &HeatmapPlan, width: u32, height: u32) -> String {
    let mut canvas = SvgCanvas::new(width, height);
    paint(plan, &mut canvas, width, height);
    canvas.finish()
}

/// Write a preview to `path`, as SVG when the extension says so and as a
/// raster image otherwise.
pub fn write_preview(plan: &HeatmapPlan, path: &Path, width: u32, height: u32) -> Result<()> {
    let is_svg = path
        .extension()
        .map(|ext| ext.to_ascii_lowercase() == "svg")
        .unwrap_or(false);
    debug!("Writing {}x{} {} preview", width, height, if is_svg { "SVG" } else { "raster" });
    if is_svg {
        let mut file = File::create(path)?;
        file.write_all(render_svg(plan, width, height).as_bytes())?;
    } else {
        render_png(plan, width, height).save(path)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::{AnnotationTrack, Side};
    use crate::matrix::Matrix;
    use crate::plan::HeatmapConfig;

    fn flat_plan() -> HeatmapPlan {
        let matrix = Matrix::from_unlabeled(vec![vec![1.0, -1.0]]).unwrap();
        let config = HeatmapConfig {
            cluster_rows: false,
            cluster_cols: false,
            ..HeatmapConfig::default()
        };
        HeatmapPlan::build(&matrix, &config).unwrap()
    }

    #[test]
    fn raster_paints_heatmap_cells_in_order() {
        let plan = flat_plan();
        let image = render_png(&plan, 20, 10);
        assert_eq!(image.dimensions(), (20, 10));
        let scale = DivergingScale::for_values(plan.matrix.values());
        assert_eq!(*image.get_pixel(5, 5), pixel(scale.color(1.0)));
        assert_eq!(*image.get_pixel(15, 5), pixel(scale.color(-1.0)));
    }

    #[test]
    fn cell_rects_tile_the_canvas() {
        let matrix = Matrix::from_unlabeled(vec![vec![0.0, 1.0, 2.0], vec![2.0, 1.0, 0.0]]).unwrap();
        let config = HeatmapConfig {
            annotations: vec![AnnotationTrack::continuous("t", Side::Top, 0.1, vec![0.0, 1.0, 2.0])],
            ..HeatmapConfig::default()
        };
        let plan = HeatmapPlan::build(&matrix, &config).unwrap();
        let area: f64 = (1..=plan.layout.n_rows)
            .flat_map(|r| (1..=plan.layout.n_cols).map(move |c| Cell { row: r, col: c }))
            .map(|cell| {
                let rect = cell_rect(&plan.layout, cell, 100.0, 50.0);
                rect.w * rect.h
            })
            .sum();
        assert!((area - 5000.0).abs() < 1e-6);
    }

    #[test]
    fn svg_labels_are_escaped() {
        let matrix = Matrix::from_unlabeled(vec![vec![0.0, 1.0], vec![1.0, 0.0]]).unwrap();
        let config = HeatmapConfig {
            annotations: vec![AnnotationTrack::categorical(
                "a&b",
                Side::Left,
                0.05,
                vec!["x".to_string(), "y".to_string()],
            )],
            ..HeatmapConfig::default()
        };
        let plan = HeatmapPlan::build(&matrix, &config).unwrap();
        let svg = render_svg(&plan, 200, 100);
        assert!(svg.starts_with("<?xml"));
        assert!(svg.contains("<title>a&amp;b</title>"));
        assert!(svg.contains("<line"));
        assert!(svg.trim_end().ends_with("</svg>"));
    }

    #[test]
    fn empty_split_renders_without_rows() {
        let empty = Matrix::from_unlabeled(Vec::new()).unwrap();
        let config = HeatmapConfig {
            split_rows_by: Some(crate::split::SplitBy::Labels(Vec::new())),
            ..HeatmapConfig::default()
        };
        let plan = HeatmapPlan::build(&empty, &config).unwrap();
        let image = render_png(&plan, 16, 8);
        assert_eq!(*image.get_pixel(8, 4), pixel(BACKGROUND));
        assert!(render_svg(&plan, 16, 8).contains("</svg>"));
    }
}
