//! Stick-plot rendering of mass spectra as SVG.
//!
//! Each spectrum becomes one trace: a vertical line from the baseline to the
//! intensity of every peak. Several traces share the same axes so spectra
//! can be overlaid and compared.

use svg::node::element::{Line, Rectangle, Text};
use svg::Document;

use crate::spectrum::LabeledSpectrum;

/// Trace colours, cycled in order
pub const PALETTE: [&str; 8] = [
    "#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b", "#e377c2", "#17becf",
];

const FONT: &str = "Helvetica, Arial, sans-serif";
const MARGIN_LEFT: f64 = 70.0;
const MARGIN_RIGHT: f64 = 150.0;
const MARGIN_TOP: f64 = 50.0;
const MARGIN_BOTTOM: f64 = 60.0;

/// Size and title of a rendered plot
#[derive(Debug, Clone, PartialEq)]
pub struct PlotOptions {
    /// Image width in pixels
    pub width: u32,
    /// Image height in pixels
    pub height: u32,
    /// Title drawn above the plot area
    pub title: String,
}

impl Default for PlotOptions {
    fn default() -> Self {
        Self {
            width: 900,
            height: 480,
            title: "MS1 Spectra".to_string(),
        }
    }
}

impl PlotOptions {
    /// Default size with a custom title
    pub fn with_title(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }
}

/// Render spectra as an overlaid stick plot
///
/// When no trace has a peak the image only carries the title and a
/// "No spectral data" message.
pub fn render_spectra_svg(traces: &[LabeledSpectrum], options: &PlotOptions) -> String {
    let width = f64::from(options.width.max(MARGIN_LEFT as u32 + MARGIN_RIGHT as u32 + 50));
    let height = f64::from(options.height.max(MARGIN_TOP as u32 + MARGIN_BOTTOM as u32 + 50));

    let mut doc = Document::new()
        .set("viewBox", (0.0, 0.0, width, height))
        .set("width", width)
        .set("height", height)
        .set("style", "background:#ffffff")
        .add(
            Rectangle::new()
                .set("width", width)
                .set("height", height)
                .set("fill", "#ffffff"),
        )
        .add(
            Text::new(options.title.as_str())
                .set("x", width / 2.0)
                .set("y", 30)
                .set("text-anchor", "middle")
                .set("font-family", FONT)
                .set("font-size", 18)
                .set("fill", "#202020"),
        );

    let Some(bounds) = Bounds::of(traces) else {
        return doc
            .add(
                Text::new("No spectral data")
                    .set("x", width / 2.0)
                    .set("y", height / 2.0)
                    .set("text-anchor", "middle")
                    .set("font-family", FONT)
                    .set("font-size", 14)
                    .set("fill", "#808080"),
            )
            .to_string();
    };

    let plot_left = MARGIN_LEFT;
    let plot_right = width - MARGIN_RIGHT;
    let plot_top = MARGIN_TOP;
    let baseline = height - MARGIN_BOTTOM;
    let x_of = |mz: f64| {
        plot_left + (mz - bounds.mz_min) / bounds.mz_span() * (plot_right - plot_left)
    };
    let y_of = |intensity: f64| {
        let fraction = (intensity / bounds.intensity_max).clamp(0.0, 1.0);
        baseline - fraction * (baseline - plot_top)
    };

    doc = doc
        .add(axis_line(plot_left, baseline, plot_right, baseline))
        .add(axis_line(plot_left, baseline, plot_left, plot_top))
        .add(tick_label(plot_left, baseline + 18.0, "middle", format!("{:.2}", bounds.mz_min)))
        .add(tick_label(plot_right, baseline + 18.0, "middle", format!("{:.2}", bounds.mz_max)))
        .add(tick_label(plot_left - 6.0, baseline + 4.0, "end", "0".to_string()))
        .add(tick_label(
            plot_left - 6.0,
            plot_top + 4.0,
            "end",
            format_intensity(bounds.intensity_max),
        ))
        .add(
            Text::new("m/z")
                .set("x", (plot_left + plot_right) / 2.0)
                .set("y", height - 15.0)
                .set("text-anchor", "middle")
                .set("font-family", FONT)
                .set("font-size", 13)
                .set("fill", "#202020"),
        )
        .add(
            Text::new("Relative Intensity")
                .set("x", 0)
                .set("y", 0)
                .set("text-anchor", "middle")
                .set(
                    "transform",
                    format!("translate(18,{}) rotate(-90)", (plot_top + baseline) / 2.0),
                )
                .set("font-family", FONT)
                .set("font-size", 13)
                .set("fill", "#202020"),
        );

    for (idx, trace) in traces.iter().enumerate() {
        let colour = PALETTE[idx % PALETTE.len()];
        for peak in &trace.spectrum.peaks {
            if !(peak.mz.is_finite() && peak.intensity.is_finite()) {
                continue;
            }
            let x = x_of(peak.mz);
            doc = doc.add(
                Line::new()
                    .set("x1", x)
                    .set("y1", baseline)
                    .set("x2", x)
                    .set("y2", y_of(peak.intensity))
                    .set("stroke", colour)
                    .set("stroke-width", 1.5)
                    .set("class", "peak"),
            );
        }

        let legend_y = plot_top + 10.0 + idx as f64 * 20.0;
        doc = doc
            .add(
                Rectangle::new()
                    .set("x", plot_right + 20.0)
                    .set("y", legend_y - 9.0)
                    .set("width", 12)
                    .set("height", 12)
                    .set("fill", colour),
            )
            .add(
                Text::new(trace.label.as_str())
                    .set("x", plot_right + 38.0)
                    .set("y", legend_y + 1.0)
                    .set("font-family", FONT)
                    .set("font-size", 12)
                    .set("fill", "#202020"),
            );
    }

    doc.to_string()
}

/// Data extent over every finite peak of every trace
struct Bounds {
    mz_min: f64,
    mz_max: f64,
    intensity_max: f64,
}

impl Bounds {
    fn of(traces: &[LabeledSpectrum]) -> Option<Self> {
        let mut peaks = traces
            .iter()
            .flat_map(|t| t.spectrum.peaks.iter())
            .filter(|p| p.mz.is_finite() && p.intensity.is_finite())
            .peekable();
        peaks.peek()?;

        let mut bounds = Bounds {
            mz_min: f64::INFINITY,
            mz_max: f64::NEG_INFINITY,
            intensity_max: 0.0,
        };
        for peak in peaks {
            bounds.mz_min = bounds.mz_min.min(peak.mz);
            bounds.mz_max = bounds.mz_max.max(peak.mz);
            bounds.intensity_max = bounds.intensity_max.max(peak.intensity);
        }

        // Pad the m/z range so edge peaks do not sit on the axis
        let pad = ((bounds.mz_max - bounds.mz_min) * 0.05).max(1.0);
        bounds.mz_min -= pad;
        bounds.mz_max += pad;
        if bounds.intensity_max <= 0.0 {
            bounds.intensity_max = 1.0;
        }
        Some(bounds)
    }

    fn mz_span(&self) -> f64 {
        self.mz_max - self.mz_min
    }
}

fn axis_line(x1: f64, y1: f64, x2: f64, y2: f64) -> Line {
    Line::new()
        .set("x1", x1)
        .set("y1", y1)
        .set("x2", x2)
        .set("y2", y2)
        .set("stroke", "#404040")
        .set("stroke-width", 1)
}

fn tick_label(x: f64, y: f64, anchor: &str, label: String) -> Text {
    Text::new(label)
        .set("x", x)
        .set("y", y)
        .set("text-anchor", anchor)
        .set("font-family", FONT)
        .set("font-size", 11)
        .set("fill", "#404040")
}

fn format_intensity(value: f64) -> String {
    if value >= 1000.0 {
        format!("{:.3e}", value)
    } else if value >= 10.0 {
        format!("{:.0}", value)
    } else {
        format!("{:.3}", value)
    }
}
