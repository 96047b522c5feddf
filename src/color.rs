use crate::error::Axis;
use std::fmt;

/// An sRGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub fn hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.0, self.1, self.2)
    }

    fn lerp(self, other: Rgb, t: f64) -> Rgb {
        let mix = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * t).round().clamp(0.0, 255.0) as u8;
        Rgb(mix(self.0, other.0), mix(self.1, other.1), mix(self.2, other.2))
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.0, self.1, self.2)
    }
}

/// A colorscale stop: position in `[0, 1]` and its color.
pub type ColorStop = (f64, Rgb);

/// RdBu 11-class diverging palette, reversed so it runs blue -> white -> red.
pub const DIVERGING_11: [Rgb; 11] = [
    Rgb(5, 48, 97),
    Rgb(33, 102, 172),
    Rgb(67, 147, 195),
    Rgb(146, 197, 222),
    Rgb(209, 229, 240),
    Rgb(255, 255, 255),
    Rgb(253, 219, 199),
    Rgb(244, 165, 130),
    Rgb(214, 96, 77),
    Rgb(178, 24, 43),
    Rgb(103, 0, 31),
];

/// Color used for missing values.
pub const MISSING_COLOR: Rgb = Rgb(211, 211, 211);

/// Warm qualitative palette for column-side categories
const WARM_PALETTE: [Rgb; 10] = [
    Rgb(230, 75, 53),   // vermilion
    Rgb(243, 155, 127), // salmon
    Rgb(255, 127, 14),  // orange
    Rgb(214, 39, 40),   // red
    Rgb(253, 174, 97),  // apricot
    Rgb(227, 119, 194), // pink
    Rgb(188, 189, 34),  // olive
    Rgb(140, 86, 75),   // brown
    Rgb(255, 187, 120), // peach
    Rgb(251, 154, 153), // rose
];

/// Cool qualitative palette for row-side categories
const COOL_PALETTE: [Rgb; 10] = [
    Rgb(31, 119, 180),  // blue
    Rgb(23, 190, 207),  // cyan
    Rgb(44, 160, 44),   // green
    Rgb(148, 103, 189), // purple
    Rgb(77, 187, 213),  // sky
    Rgb(0, 160, 135),   // teal
    Rgb(60, 84, 136),   // navy
    Rgb(145, 209, 194), // mint
    Rgb(174, 199, 232), // light blue
    Rgb(152, 223, 138), // light green
];

/// Which axis a categorical strip belongs to; selects the palette.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColorSide {
    Row,
    Column,
}

impl ColorSide {
    fn palette(self) -> &'static [Rgb] {
        match self {
            ColorSide::Row => &COOL_PALETTE,
            ColorSide::Column => &WARM_PALETTE,
        }
    }

    fn hue_offset(self) -> f64 {
        match self {
            ColorSide::Row => 0.5,
            ColorSide::Column => 0.0,
        }
    }
}

impl From<Axis> for ColorSide {
    fn from(axis: Axis) -> Self {
        match axis {
            Axis::Row => ColorSide::Row,
            Axis::Column => ColorSide::Column,
        }
    }
}

/// Palette length shared by both sides.
pub fn palette_len() -> usize {
    WARM_PALETTE.len()
}

fn hsv_to_rgb(h: f64, s: f64, v: f64) -> Rgb {
    let h6 = (h.rem_euclid(1.0)) * 6.0;
    let sector = h6.floor() as u32 % 6;
    let f = h6 - h6.floor();
    let p = v * (1.0 - s);
    let q = v * (1.0 - s * f);
    let t = v * (1.0 - s * (1.0 - f));
    let (r, g, b) = match sector {
        0 => (v, t, p),
        1 => (q, v, p),
        2 => (p, v, t),
        3 => (p, q, v),
        4 => (t, p, v),
        _ => (v, p, q),
    };
    let to_u8 = |c: f64| (c * 255.0).round().clamp(0.0, 255.0) as u8;
    Rgb(to_u8(r), to_u8(g), to_u8(b))
}

/// Color `index` of a set of `n` colors for `side`. Pure in its arguments.
pub fn color_at(index: usize, n: usize, side: ColorSide) -> Rgb {
    let palette = side.palette();
    if index < palette.len() {
        return palette[index];
    }
    let hue = side.hue_offset() + index as f64 / n.max(1) as f64;
    hsv_to_rgb(hue, 0.65, 0.85)
}

/// `n` deterministic colors: palette first, then hue rotation in `1/n` steps.
pub fn generate_colors(n: usize, side: ColorSide) -> Vec<Rgb> {
    (0..n).map(|i| color_at(i, n, side)).collect()
}

/// Stepped colorscale giving each color the band `[i/n, (i+1)/n]`.
pub fn categorical_colorscale(colors: &[Rgb]) -> Vec<ColorStop> {
    let n = colors.len();
    let mut stops = Vec::with_capacity(2 * n);
    for (i, &color) in colors.iter().enumerate() {
        stops.push((i as f64 / n as f64, color));
        stops.push(((i + 1) as f64 / n as f64, color));
    }
    stops
}

/// Diverging continuous scale with white pinned to zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DivergingScale {
    bound: f64,
}

impl DivergingScale {
    /// Symmetric scale over `[-bound, bound]`.
    pub fn new(bound: f64) -> Self {
        let bound = if bound.is_finite() && bound > 0.0 { bound } else { 1.0 };
        DivergingScale { bound }
    }

    /// Bound is the largest absolute finite value.
    pub fn for_values(values: &[f64]) -> Self {
        let max_abs = values
            .iter()
            .filter(|v| v.is_finite())
            .fold(0.0f64, |acc, v| acc.max(v.abs()));
        DivergingScale::new(max_abs)
    }

    pub fn zmin(&self) -> f64 {
        -self.bound
    }

    pub fn zmax(&self) -> f64 {
        self.bound
    }

    /// Position of `value` on the scale, clamped to `[0, 1]`. Zero maps to 0.5.
    pub fn position(&self, value: f64) -> f64 {
        (0.5 + value / (2.0 * self.bound)).clamp(0.0, 1.0)
    }

    pub fn color(&self, value: f64) -> Rgb {
        if !value.is_finite() {
            return MISSING_COLOR;
        }
        let scaled = self.position(value) * (DIVERGING_11.len() - 1) as f64;
        let lo = scaled.floor() as usize;
        let hi = (lo + 1).min(DIVERGING_11.len() - 1);
        DIVERGING_11[lo].lerp(DIVERGING_11[hi], scaled - lo as f64)
    }

    /// The 11 stops, evenly spaced.
    pub fn colorscale(&self) -> Vec<ColorStop> {
        let last = (DIVERGING_11.len() - 1) as f64;
        DIVERGING_11
            .iter()
            .enumerate()
            .map(|(i, &c)| (i as f64 / last, c))
            .collect()
    }
}
