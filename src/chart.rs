use std::fmt::Write;

use crate::models::DailyActivity;

/// Embeddable SVG fragment with its intrinsic size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartFragment {
    pub svg: String,
    pub width: u32,
    pub height: u32,
}

const BASE_WIDTH: f64 = 800.0;
const WIDE_WIDTH: f64 = 900.0;
const HEIGHT: f64 = 300.0;

const MARGIN_LEFT: f64 = 48.0;
const MARGIN_RIGHT: f64 = 16.0;
const MARGIN_TOP: f64 = 24.0;
const MARGIN_BOTTOM: f64 = 40.0;

const GRIDLINES: usize = 5;

const MALWARE_COLOR: &str = "#c0392b";
const PHISHING_COLOR: &str = "#e67e22";
const GRID_COLOR: &str = "#d8dce1";
const AXIS_COLOR: &str = "#5a6472";
const TEXT_COLOR: &str = "#2c3640";

/// Render the dense daily series as a dual-series bar chart. Pure: the
/// same series always produces byte-identical markup.
pub fn render(series: &[DailyActivity]) -> ChartFragment {
    let width = if series.len() > 31 { WIDE_WIDTH } else { BASE_WIDTH };
    let mut svg = String::new();

    let _ = writeln!(
        svg,
        "<svg xmlns='http://www.w3.org/2000/svg' width='{width:.0}' height='{HEIGHT:.0}' viewBox='0 0 {width:.0} {HEIGHT:.0}' role='img'>"
    );
    let _ = writeln!(
        svg,
        "  <rect width='{width:.0}' height='{HEIGHT:.0}' fill='#ffffff' stroke='{GRID_COLOR}'/>"
    );

    if series.is_empty() {
        let _ = writeln!(
            svg,
            "  <text x='{:.1}' y='{:.1}' text-anchor='middle' fill='{AXIS_COLOR}' font-family='sans-serif' font-size='16'>No data</text>",
            width / 2.0,
            HEIGHT / 2.0
        );
        let _ = writeln!(svg, "</svg>");
        return ChartFragment {
            svg,
            width: width as u32,
            height: HEIGHT as u32,
        };
    }

    let max_value = series
        .iter()
        .map(|day| day.malware.max(day.phishing))
        .max()
        .unwrap_or(0)
        .max(1);

    let plot_w = width - MARGIN_LEFT - MARGIN_RIGHT;
    let plot_h = HEIGHT - MARGIN_TOP - MARGIN_BOTTOM;
    let base_y = MARGIN_TOP + plot_h;

    for i in 0..GRIDLINES {
        let frac = i as f64 / (GRIDLINES - 1) as f64;
        let y = base_y - plot_h * frac;
        let value = (max_value as f64 * frac).round() as u64;
        let _ = writeln!(
            svg,
            "  <line x1='{MARGIN_LEFT:.1}' y1='{y:.1}' x2='{:.1}' y2='{y:.1}' stroke='{GRID_COLOR}' stroke-width='1'/>",
            MARGIN_LEFT + plot_w
        );
        let _ = writeln!(
            svg,
            "  <text x='{:.1}' y='{:.1}' text-anchor='end' fill='{TEXT_COLOR}' font-family='sans-serif' font-size='11'>{value}</text>",
            MARGIN_LEFT - 6.0,
            y + 4.0
        );
    }

    let slot_w = plot_w / series.len() as f64;
    // two bars per slot; never thinner than one unit so dense series stay visible
    let bar_w = (slot_w * 0.35).max(1.0);

    for (idx, day) in series.iter().enumerate() {
        let x0 = MARGIN_LEFT + idx as f64 * slot_w;
        let malware_x = x0 + slot_w * 0.12;
        let phishing_x = malware_x + bar_w + 1.0;

        if day.malware > 0 {
            let h = plot_h * day.malware as f64 / max_value as f64;
            let _ = writeln!(
                svg,
                "  <rect x='{malware_x:.1}' y='{:.1}' width='{bar_w:.1}' height='{h:.1}' fill='{MALWARE_COLOR}'/>",
                base_y - h
            );
        }
        if day.phishing > 0 {
            let h = plot_h * day.phishing as f64 / max_value as f64;
            let _ = writeln!(
                svg,
                "  <rect x='{phishing_x:.1}' y='{:.1}' width='{bar_w:.1}' height='{h:.1}' fill='{PHISHING_COLOR}'/>",
                base_y - h
            );
        }

        if should_label(idx, series.len()) {
            let _ = writeln!(
                svg,
                "  <text x='{:.1}' y='{:.1}' text-anchor='middle' fill='{TEXT_COLOR}' font-family='sans-serif' font-size='10'>{}</text>",
                x0 + slot_w / 2.0,
                base_y + 16.0,
                day.date.format("%m-%d")
            );
        }
    }

    let _ = writeln!(
        svg,
        "  <line x1='{MARGIN_LEFT:.1}' y1='{base_y:.1}' x2='{:.1}' y2='{base_y:.1}' stroke='{AXIS_COLOR}' stroke-width='1'/>",
        MARGIN_LEFT + plot_w
    );

    let legend_x = width - MARGIN_RIGHT - 170.0;
    let _ = writeln!(
        svg,
        "  <rect x='{legend_x:.1}' y='6' width='10' height='10' fill='{MALWARE_COLOR}'/>"
    );
    let _ = writeln!(
        svg,
        "  <text x='{:.1}' y='15' fill='{TEXT_COLOR}' font-family='sans-serif' font-size='11'>Malware</text>",
        legend_x + 14.0
    );
    let _ = writeln!(
        svg,
        "  <rect x='{:.1}' y='6' width='10' height='10' fill='{PHISHING_COLOR}'/>",
        legend_x + 84.0
    );
    let _ = writeln!(
        svg,
        "  <text x='{:.1}' y='15' fill='{TEXT_COLOR}' font-family='sans-serif' font-size='11'>Phishing</text>",
        legend_x + 98.0
    );
    let _ = writeln!(svg, "</svg>");

    ChartFragment {
        svg,
        width: width as u32,
        height: HEIGHT as u32,
    }
}

/// X labels: every point on short series, every fifth point (plus the two
/// endpoints) once the series gets long.
fn should_label(idx: usize, len: usize) -> bool {
    if len <= 12 {
        return true;
    }
    idx % 5 == 0 || idx == 0 || idx + 1 == len
}
