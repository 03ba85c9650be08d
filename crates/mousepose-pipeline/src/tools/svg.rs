//! Minimal SVG line charts.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use super::{Figure, Plotter};

/// Categorical line colors.
const PALETTE: [&str; 10] = [
    "#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b", "#e377c2", "#7f7f7f",
    "#bcbd22", "#17becf",
];

const MARGIN_LEFT: f64 = 70.0;
const MARGIN_RIGHT: f64 = 20.0;
const MARGIN_TOP: f64 = 40.0;
const MARGIN_BOTTOM: f64 = 55.0;
const TICK_FONT: f64 = 11.0;

/// Writes figures as standalone SVG documents.
#[derive(Debug, Clone, Copy)]
pub struct SvgPlotter {
    /// Pixels per inch of figure size.
    pub dpi: f64,
}

impl Default for SvgPlotter {
    fn default() -> Self {
        Self { dpi: 100.0 }
    }
}

impl Plotter for SvgPlotter {
    fn plot(&self, figure: &Figure, output: &Path) -> Result<()> {
        let svg = self.render_svg(figure);
        fs::write(output, svg).with_context(|| format!("writing {}", output.display()))
    }
}

/// Maps data coordinates into the plot area.
struct Frame {
    x0: f64,
    x1: f64,
    y0: f64,
    y1: f64,
    left: f64,
    right: f64,
    top: f64,
    bottom: f64,
}

impl Frame {
    fn px(&self, x: f64) -> f64 {
        self.left + (x - self.x0) / (self.x1 - self.x0) * (self.right - self.left)
    }

    fn py(&self, y: f64) -> f64 {
        self.bottom - (y - self.y0) / (self.y1 - self.y0) * (self.bottom - self.top)
    }
}

impl SvgPlotter {
    pub fn render_svg(&self, figure: &Figure) -> String {
        let width = (figure.width * self.dpi).round();
        let height = (figure.height * self.dpi).round();
        let (x0, x1) = padded_range(
            figure.series.iter().flat_map(|s| s.points.iter().map(|p| p.0)),
            0.0,
        );
        let (y0, y1) = padded_range(
            figure.series.iter().flat_map(|s| s.points.iter().map(|p| p.1)),
            0.05,
        );
        let frame = Frame {
            x0,
            x1,
            y0,
            y1,
            left: MARGIN_LEFT,
            right: (width - MARGIN_RIGHT).max(MARGIN_LEFT + 1.0),
            top: MARGIN_TOP,
            bottom: (height - MARGIN_BOTTOM).max(MARGIN_TOP + 1.0),
        };

        let mut svg = String::new();
        let _ = writeln!(
            svg,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{width}" height="{height}" viewBox="0 0 {width} {height}" font-family="sans-serif">"#
        );
        let _ = writeln!(svg, r#"<rect width="100%" height="100%" fill="white"/>"#);
        let _ = writeln!(
            svg,
            r#"<text x="{:.1}" y="{:.1}" font-size="14" text-anchor="middle">{}</text>"#,
            width / 2.0,
            MARGIN_TOP / 2.0 + 5.0,
            escape(&figure.title)
        );

        self.write_axes(&mut svg, &frame, figure);

        for (i, series) in figure.series.iter().enumerate() {
            let d = path_data(&frame, &series.points);
            if d.is_empty() {
                continue;
            }
            let _ = writeln!(
                svg,
                r#"<path d="{d}" fill="none" stroke="{}" stroke-width="1.5"/>"#,
                PALETTE[i % PALETTE.len()]
            );
        }

        self.write_legend(&mut svg, &frame, figure);
        svg.push_str("</svg>\n");
        svg
    }

    fn write_axes(&self, svg: &mut String, frame: &Frame, figure: &Figure) {
        let _ = writeln!(
            svg,
            r#"<rect x="{:.1}" y="{:.1}" width="{:.1}" height="{:.1}" fill="none" stroke="black"/>"#,
            frame.left,
            frame.top,
            frame.right - frame.left,
            frame.bottom - frame.top
        );
        for tick in nice_ticks(frame.x0, frame.x1, 8) {
            let x = frame.px(tick);
            let _ = writeln!(
                svg,
                r#"<line x1="{x:.1}" y1="{:.1}" x2="{x:.1}" y2="{:.1}" stroke="black"/>"#,
                frame.bottom,
                frame.bottom + 5.0
            );
            let _ = writeln!(
                svg,
                r#"<text x="{x:.1}" y="{:.1}" font-size="{TICK_FONT}" text-anchor="middle">{}</text>"#,
                frame.bottom + 18.0,
                format_tick(tick)
            );
        }
        for tick in nice_ticks(frame.y0, frame.y1, 6) {
            let y = frame.py(tick);
            let _ = writeln!(
                svg,
                r#"<line x1="{:.1}" y1="{y:.1}" x2="{:.1}" y2="{y:.1}" stroke="black"/>"#,
                frame.left - 5.0,
                frame.left
            );
            let _ = writeln!(
                svg,
                r#"<text x="{:.1}" y="{:.1}" font-size="{TICK_FONT}" text-anchor="end">{}</text>"#,
                frame.left - 8.0,
                y + 4.0,
                format_tick(tick)
            );
        }
        let _ = writeln!(
            svg,
            r#"<text x="{:.1}" y="{:.1}" font-size="12" text-anchor="middle">{}</text>"#,
            (frame.left + frame.right) / 2.0,
            frame.bottom + 42.0,
            escape(&figure.x_label)
        );
        let cy = (frame.top + frame.bottom) / 2.0;
        let _ = writeln!(
            svg,
            r#"<text x="18" y="{cy:.1}" font-size="12" text-anchor="middle" transform="rotate(-90 18 {cy:.1})">{}</text>"#,
            escape(&figure.y_label)
        );
    }

    fn write_legend(&self, svg: &mut String, frame: &Frame, figure: &Figure) {
        if figure.series.is_empty() {
            return;
        }
        let font = figure.legend_font_size * self.dpi / 72.0;
        let row = font * 1.4;
        let longest = figure
            .series
            .iter()
            .map(|s| s.name.chars().count())
            .max()
            .unwrap_or(0) as f64;
        let box_w = 30.0 + longest * font * 0.6 + 10.0;
        let box_h = row * figure.series.len() as f64 + 8.0;
        let x = frame.right - box_w - 8.0;
        let y = frame.top + 8.0;
        let _ = writeln!(
            svg,
            r##"<rect x="{x:.1}" y="{y:.1}" width="{box_w:.1}" height="{box_h:.1}" fill="white" fill-opacity="0.8" stroke="#cccccc"/>"##
        );
        for (i, series) in figure.series.iter().enumerate() {
            let ly = y + 4.0 + row * (i as f64 + 0.5);
            let _ = writeln!(
                svg,
                r#"<line x1="{:.1}" y1="{ly:.1}" x2="{:.1}" y2="{ly:.1}" stroke="{}" stroke-width="2"/>"#,
                x + 6.0,
                x + 24.0,
                PALETTE[i % PALETTE.len()]
            );
            let _ = writeln!(
                svg,
                r#"<text x="{:.1}" y="{:.1}" font-size="{font:.1}">{}</text>"#,
                x + 30.0,
                ly + font * 0.35,
                escape(&series.name)
            );
        }
    }
}

/// Finite range of the values, widened by `pad` of its span; a degenerate
/// or empty range becomes a unit interval.
fn padded_range(values: impl Iterator<Item = f64>, pad: f64) -> (f64, f64) {
    let (lo, hi) = values
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
    if !lo.is_finite() {
        return (0.0, 1.0);
    }
    if hi - lo <= f64::EPSILON {
        return (lo - 0.5, hi + 0.5);
    }
    let margin = (hi - lo) * pad;
    (lo - margin, hi + margin)
}

/// Round tick positions inside `[lo, hi]`.
fn nice_ticks(lo: f64, hi: f64, target: usize) -> Vec<f64> {
    let span = hi - lo;
    if !(span > 0.0) || target == 0 {
        return Vec::new();
    }
    let raw = span / target as f64;
    let magnitude = 10f64.powf(raw.log10().floor());
    let step = [1.0, 2.0, 2.5, 5.0, 10.0]
        .iter()
        .map(|m| m * magnitude)
        .find(|s| *s >= raw)
        .unwrap_or(10.0 * magnitude);
    let first = (lo / step).ceil();
    // Past 2^53 adding one to `first` stops changing it.
    let count = (span / step).ceil() as usize + 1;
    (0..count)
        .map(|i| (first + i as f64) * step)
        .take_while(|tick| *tick <= hi + step * 1e-9)
        .map(|tick| if tick.abs() < step * 1e-9 { 0.0 } else { tick })
        .collect()
}

fn format_tick(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        let s = format!("{value:.3}");
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}

/// SVG path commands; non-finite samples split the line.
fn path_data(frame: &Frame, points: &[(f64, f64)]) -> String {
    let mut d = String::new();
    let mut pen_down = false;
    for &(x, y) in points {
        if !(x.is_finite() && y.is_finite()) {
            pen_down = false;
            continue;
        }
        let cmd = if pen_down { 'L' } else { 'M' };
        if !d.is_empty() {
            d.push(' ');
        }
        let _ = write!(d, "{cmd}{:.2},{:.2}", frame.px(x), frame.py(y));
        pen_down = true;
    }
    d
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}
