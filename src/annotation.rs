use crate::color::{categorical_colorscale, generate_colors, ColorSide, ColorStop, DivergingScale, Rgb, MISSING_COLOR};
use crate::error::{Axis, ConfigErrorKind, HeatmapError, Result};
use crate::matrix::{is_missing_token, parse_value};
use log::debug;
use rustc_hash::{FxHashMap, FxHashSet};
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::str::FromStr;

/// Side of the heatmap an annotation track is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Top,
    Bottom,
    Left,
    Right,
}

impl Side {
    pub const ALL: [Side; 4] = [Side::Top, Side::Bottom, Side::Left, Side::Right];

    /// Matrix axis the track values align with.
    pub fn axis(self) -> Axis {
        match self {
            Side::Top | Side::Bottom => Axis::Column,
            Side::Left | Side::Right => Axis::Row,
        }
    }

    /// Whether the side comes before the heatmap in grid order.
    fn leads(self) -> bool {
        matches!(self, Side::Top | Side::Left)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Side::Top => "top",
            Side::Bottom => "bottom",
            Side::Left => "left",
            Side::Right => "right",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Side {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "top" => Ok(Side::Top),
            "bottom" => Ok(Side::Bottom),
            "left" => Ok(Side::Left),
            "right" => Ok(Side::Right),
            _ => Err(format!("unknown side {:?} (expected top, bottom, left or right)", s)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AnnotationValues {
    Categorical(Vec<String>),
    Continuous(Vec<f64>),
}

impl AnnotationValues {
    pub fn len(&self) -> usize {
        match self {
            AnnotationValues::Categorical(v) => v.len(),
            AnnotationValues::Continuous(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A strip of per-row or per-column metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationTrack {
    pub name: String,
    pub side: Side,
    /// Fraction of the figure reserved for this track.
    pub size: f64,
    pub values: AnnotationValues,
}

impl AnnotationTrack {
    pub fn categorical(name: impl Into<String>, side: Side, size: f64, values: Vec<String>) -> Self {
        AnnotationTrack {
            name: name.into(),
            side,
            size,
            values: AnnotationValues::Categorical(values),
        }
    }

    pub fn continuous(name: impl Into<String>, side: Side, size: f64, values: Vec<f64>) -> Self {
        AnnotationTrack {
            name: name.into(),
            side,
            size,
            values: AnnotationValues::Continuous(values),
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Numeric codes plus colorscale, ready for a heatmap-style strip.
    pub fn encode(&self) -> EncodedTrack {
        match &self.values {
            AnnotationValues::Categorical(values) => {
                let mut categories: Vec<String> = Vec::new();
                let mut codes: FxHashMap<&str, usize> = FxHashMap::default();
                let mut z = Vec::with_capacity(values.len());
                for value in values {
                    let value = value.trim();
                    if is_missing_token(value) {
                        z.push(f64::NAN);
                        continue;
                    }
                    let code = *codes.entry(value).or_insert_with(|| {
                        categories.push(value.to_string());
                        categories.len() - 1
                    });
                    z.push(code as f64);
                }
                let colors = generate_colors(categories.len(), ColorSide::from(self.side.axis()));
                EncodedTrack {
                    name: self.name.clone(),
                    side: self.side,
                    z,
                    zmin: 0.0,
                    zmax: categories.len().saturating_sub(1) as f64,
                    colorscale: categorical_colorscale(&colors),
                    coloring: TrackColoring::Categorical { categories, colors },
                }
            }
            AnnotationValues::Continuous(values) => {
                let scale = DivergingScale::for_values(values);
                EncodedTrack {
                    name: self.name.clone(),
                    side: self.side,
                    z: values.clone(),
                    zmin: scale.zmin(),
                    zmax: scale.zmax(),
                    colorscale: scale.colorscale(),
                    coloring: TrackColoring::Continuous(scale),
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TrackColoring {
    Categorical { categories: Vec<String>, colors: Vec<Rgb> },
    Continuous(DivergingScale),
}

/// A track reduced to numeric values and a colorscale.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedTrack {
    pub name: String,
    pub side: Side,
    pub z: Vec<f64>,
    pub zmin: f64,
    pub zmax: f64,
    pub colorscale: Vec<ColorStop>,
    pub coloring: TrackColoring,
}

impl EncodedTrack {
    /// Color of element `i` (in original axis order).
    pub fn color_of(&self, i: usize) -> Rgb {
        let z = self.z[i];
        match &self.coloring {
            TrackColoring::Categorical { colors, .. } if z.is_finite() => colors[z as usize],
            TrackColoring::Categorical { .. } => MISSING_COLOR,
            TrackColoring::Continuous(scale) => scale.color(z),
        }
    }
}

/// Grid position of one track: `index` is a row (top/bottom) or column
/// (left/right) index, 0-based.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackSlot {
    pub track: usize,
    pub name: String,
    pub index: usize,
    pub size: f64,
}

/// Tracks of one side, validated. Track 0 sits next to the heatmap.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackStack {
    side: Side,
    tracks: Vec<AnnotationTrack>,
}

impl TrackStack {
    pub fn new(side: Side, tracks: Vec<AnnotationTrack>, axis_len: usize) -> Result<Self> {
        let mut total = 0.0;
        debug_assert!(tracks.iter().all(|t| t.side == side));
        for track in &tracks {
            if !track.size.is_finite() || track.size <= 0.0 {
                return Err(HeatmapError::config(
                    ConfigErrorKind::InvalidTrackSize,
                    format!("track {:?} has size {}, expected a positive fraction", track.name, track.size),
                ));
            }
            if track.len() != axis_len {
                return Err(HeatmapError::mismatch(
                    format!("{} annotation track {:?}", side, track.name),
                    side.axis(),
                    axis_len,
                    track.len(),
                ));
            }
            total += track.size;
        }
        if total >= 1.0 {
            return Err(HeatmapError::config(
                ConfigErrorKind::AnnotationBudgetExceeded,
                format!("{} annotation tracks reserve {:.3} of the figure, leaving no room for the heatmap", side, total),
            ));
        }
        Ok(TrackStack { side, tracks })
    }

    pub fn empty(side: Side) -> Self {
        TrackStack { side, tracks: Vec::new() }
    }

    pub fn side(&self) -> Side {
        self.side
    }

    pub fn tracks(&self) -> &[AnnotationTrack] {
        &self.tracks
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn total_size(&self) -> f64 {
        self.tracks.iter().map(|t| t.size).sum()
    }

    /// Slots starting at grid index `first`, in grid order. Top and left
    /// stacks list the outermost track first; bottom and right list the
    /// innermost first.
    pub fn slots(&self, first: usize) -> Vec<TrackSlot> {
        let n = self.tracks.len();
        (0..n)
            .map(|k| {
                let track = if self.side.leads() { n - 1 - k } else { k };
                TrackSlot {
                    track,
                    name: self.tracks[track].name.clone(),
                    index: first + k,
                    size: self.tracks[track].size,
                }
            })
            .collect()
    }
}

/// The four validated stacks.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackStacks {
    pub top: TrackStack,
    pub bottom: TrackStack,
    pub left: TrackStack,
    pub right: TrackStack,
}

impl TrackStacks {
    /// Validate and sort `tracks` by side, preserving their order.
    pub fn build(tracks: &[AnnotationTrack], n_rows: usize, n_cols: usize) -> Result<Self> {
        let mut seen: FxHashSet<&str> = FxHashSet::default();
        for track in tracks {
            if !seen.insert(track.name.as_str()) {
                return Err(HeatmapError::config(
                    ConfigErrorKind::DuplicateTrackName,
                    format!("annotation track name {:?} is used more than once", track.name),
                ));
            }
        }
        let stack = |side: Side| {
            let on_side: Vec<AnnotationTrack> = tracks.iter().filter(|t| t.side == side).cloned().collect();
            let axis_len = match side.axis() {
                Axis::Row => n_rows,
                Axis::Column => n_cols,
            };
            TrackStack::new(side, on_side, axis_len)
        };
        Ok(TrackStacks {
            top: stack(Side::Top)?,
            bottom: stack(Side::Bottom)?,
            left: stack(Side::Left)?,
            right: stack(Side::Right)?,
        })
    }

    pub fn get(&self, side: Side) -> &TrackStack {
        match side {
            Side::Top => &self.top,
            Side::Bottom => &self.bottom,
            Side::Left => &self.left,
            Side::Right => &self.right,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &TrackStack> {
        [&self.top, &self.bottom, &self.left, &self.right].into_iter()
    }
}

impl Default for TrackStacks {
    fn default() -> Self {
        TrackStacks {
            top: TrackStack::empty(Side::Top),
            bottom: TrackStack::empty(Side::Bottom),
            left: TrackStack::empty(Side::Left),
            right: TrackStack::empty(Side::Right),
        }
    }
}

/// Read annotation tracks from a tab-separated table: header
/// `<id>\t<track names...>`, then one line per matrix label. Rows are matched
/// to `labels` by id; labels absent from the table get missing values. A
/// column whose every present entry is numeric becomes a continuous track.
pub fn read_annotation_tsv<R: BufRead>(
    reader: R,
    side: Side,
    size: f64,
    labels: &[String],
) -> Result<Vec<AnnotationTrack>> {
    let mut names: Option<Vec<String>> = None;
    let mut by_id: FxHashMap<String, Vec<String>> = FxHashMap::default();

    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim_end_matches(['\r', '\n']);
        if line.trim().is_empty() || line.starts_with('#') {
            continue;
        }
        let parts: Vec<&str> = line.split('\t').collect();
        let Some(header) = &names else {
            names = Some(parts.iter().skip(1).map(|s| s.trim().to_string()).collect());
            continue;
        };
        if parts.len() != header.len() + 1 {
            return Err(HeatmapError::Parse {
                line: line_no + 1,
                detail: format!("expected {} fields, found {}", header.len(), parts.len() - 1),
            });
        }
        let id = parts[0].trim().to_string();
        let fields = parts[1..].iter().map(|s| s.trim().to_string()).collect();
        if by_id.insert(id.clone(), fields).is_some() {
            return Err(HeatmapError::Parse {
                line: line_no + 1,
                detail: format!("duplicate id {:?}", id),
            });
        }
    }

    let names = names.unwrap_or_default();
    let unmatched = labels.iter().filter(|l| !by_id.contains_key(l.as_str())).count();
    if unmatched > 0 {
        debug!("{} of {} labels have no annotation row", unmatched, labels.len());
    }

    let tracks = names
        .iter()
        .enumerate()
        .map(|(k, name)| {
            let raw: Vec<String> = labels
                .iter()
                .map(|l| by_id.get(l.as_str()).map(|f| f[k].clone()).unwrap_or_default())
                .collect();
            let numeric: Option<Vec<f64>> = raw.iter().map(|v| parse_value(v)).collect();
            let any_present = raw.iter().any(|v| !is_missing_token(v));
            match numeric {
                Some(values) if any_present => AnnotationTrack::continuous(name.clone(), side, size, values),
                _ => AnnotationTrack::categorical(name.clone(), side, size, raw),
            }
        })
        .collect();
    Ok(tracks)
}

pub fn read_annotation_tsv_path(
    path: &Path,
    side: Side,
    size: f64,
    labels: &[String],
) -> Result<Vec<AnnotationTrack>> {
    let file = File::open(path)?;
    read_annotation_tsv(BufReader::new(file), side, size, labels)
}
