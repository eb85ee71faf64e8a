use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::Path;

use anyhow::{Context, Result};

use crate::color::generate_palette;
use crate::data::model::{Stage, StageSummary};

#[derive(Debug, Clone, PartialEq)]
pub struct ChartConfig {
    pub width: u32,
    pub height: u32,
    pub title: String,
    pub point_radius: f64,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            width: 1200,
            height: 600,
            title: "Mutation Frequency by Stage".to_string(),
            point_radius: 7.0,
        }
    }
}

const MARGIN_LEFT: f64 = 90.0;
const MARGIN_RIGHT: f64 = 40.0;
const MARGIN_TOP: f64 = 60.0;
const MARGIN_BOTTOM: f64 = 100.0;
const Y_TICKS: usize = 5;

/// Smallest 1/2/5 × 10^k step that covers `max` in [`Y_TICKS`] ticks.
fn tick_step(max: usize) -> usize {
    let raw = (max.max(1) as f64 / Y_TICKS as f64).max(1.0);
    let magnitude = 10f64.powi(raw.log10().floor() as i32);
    let step = [1.0, 2.0, 5.0, 10.0]
        .iter()
        .map(|m| m * magnitude)
        .find(|s| *s >= raw)
        .unwrap_or(10.0 * magnitude);
    step.round().max(1.0) as usize
}

/// One point per stage, x in canonical stage order, y = retained mutation
/// count, joined by a dashed line.
pub fn render_scatter_svg(summaries: &BTreeMap<Stage, StageSummary>, config: &ChartConfig) -> String {
    let w = config.width as f64;
    let h = config.height as f64;
    let plot_w = (w - MARGIN_LEFT - MARGIN_RIGHT).max(1.0);
    let plot_h = (h - MARGIN_TOP - MARGIN_BOTTOM).max(1.0);
    let bottom = MARGIN_TOP + plot_h;

    let max_count = summaries.values().map(|s| s.count).max().unwrap_or(0);
    let step = tick_step(max_count);
    let y_max = (max_count.div_ceil(step).max(1) * step) as f64;
    let y_of = |count: usize| bottom - (count as f64 / y_max) * plot_h;

    let n = summaries.len().max(1) as f64;
    let x_of = |i: usize| MARGIN_LEFT + (i as f64 + 0.5) * plot_w / n;

    let mut svg = format!(
        "<svg xmlns='http://www.w3.org/2000/svg' width='{}' height='{}' font-family='sans-serif'>",
        config.width, config.height
    );
    let _ = write!(svg, "<rect width='{w}' height='{h}' fill='white'/>");
    let _ = write!(
        svg,
        "<text x='{:.2}' y='{:.2}' text-anchor='middle' font-size='20'>{}</text>",
        w / 2.0,
        MARGIN_TOP / 2.0 + 6.0,
        escape(&config.title)
    );

    // Grid and y ticks.
    for k in 0..=(y_max as usize / step) {
        let value = k * step;
        let y = y_of(value);
        let _ = write!(
            svg,
            "<line x1='{MARGIN_LEFT:.2}' y1='{y:.2}' x2='{:.2}' y2='{y:.2}' stroke='#cccccc' stroke-dasharray='4 4'/>",
            MARGIN_LEFT + plot_w
        );
        let _ = write!(
            svg,
            "<text x='{:.2}' y='{:.2}' text-anchor='end' font-size='12'>{value}</text>",
            MARGIN_LEFT - 8.0,
            y + 4.0
        );
    }

    // Axes.
    let _ = write!(
        svg,
        "<line x1='{MARGIN_LEFT:.2}' y1='{bottom:.2}' x2='{:.2}' y2='{bottom:.2}' stroke='black'/>",
        MARGIN_LEFT + plot_w
    );
    let _ = write!(
        svg,
        "<line x1='{MARGIN_LEFT:.2}' y1='{MARGIN_TOP:.2}' x2='{MARGIN_LEFT:.2}' y2='{bottom:.2}' stroke='black'/>"
    );
    let _ = write!(
        svg,
        "<text x='{:.2}' y='{:.2}' text-anchor='middle' font-size='14'>Stage</text>",
        MARGIN_LEFT + plot_w / 2.0,
        h - 15.0
    );
    let _ = write!(
        svg,
        "<text x='20' y='{:.2}' text-anchor='middle' font-size='14' transform='rotate(-90 20 {:.2})'>Number of Mutations</text>",
        MARGIN_TOP + plot_h / 2.0,
        MARGIN_TOP + plot_h / 2.0
    );

    let points: Vec<(f64, f64)> = summaries
        .values()
        .enumerate()
        .map(|(i, s)| (x_of(i), y_of(s.count)))
        .collect();

    if points.len() > 1 {
        let path: Vec<String> = points.iter().map(|(x, y)| format!("{x:.2},{y:.2}")).collect();
        let _ = write!(
            svg,
            "<polyline points='{}' fill='none' stroke='black' stroke-dasharray='6 4'/>",
            path.join(" ")
        );
    }

    let colors = generate_palette(summaries.len());
    for (((x, y), summary), color) in points.iter().zip(summaries.values()).zip(&colors) {
        let _ = write!(
            svg,
            "<circle cx='{x:.2}' cy='{y:.2}' r='{:.2}' fill='{color}'><title>{}: {}</title></circle>",
            config.point_radius, summary.stage, summary.count
        );
        let _ = write!(
            svg,
            "<text x='{x:.2}' y='{:.2}' text-anchor='end' font-size='12' transform='rotate(-45 {x:.2} {:.2})'>{}</text>",
            bottom + 18.0,
            bottom + 18.0,
            summary.stage
        );
    }

    svg.push_str("</svg>");
    svg
}

pub fn write_chart(path: &Path, summaries: &BTreeMap<Stage, StageSummary>, config: &ChartConfig) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    std::fs::write(path, render_scatter_svg(summaries, config))
        .with_context(|| format!("writing chart {}", path.display()))
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}
