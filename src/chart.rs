//! Chart triggering and bar-chart rendering.
//!
//! The trigger is a textual heuristic over the generated SQL, not an
//! analysis of the query plan or result shape; false positives and negatives
//! are acceptable. Rendering degrades gracefully: a result shape unsuitable
//! for a bar chart, or any drawing failure, skips the chart without error.

use crate::db::executor::QueryResult;
use image::{ImageFormat, RgbImage};
use plotters::prelude::*;
use regex::Regex;
use std::io::Cursor;
use tracing::warn;

const CHART_WIDTH: u32 = 1000;
const CHART_HEIGHT: u32 = 500;

const BACKGROUND: RGBColor = RGBColor(26, 26, 46);
const PLOT_AREA: RGBColor = RGBColor(22, 33, 62);
const BAR_COLOR: RGBColor = RGBColor(233, 69, 96);

/// True when the SQL looks like a date-range query: BETWEEN, a range
/// comparison on the date column, or grouping/ordering by date. A plain
/// equality filter on date does not trigger.
pub fn is_date_range_query(sql: &str) -> bool {
    let patterns = [
        r"(?i)\bBETWEEN\b",
        r"(?i)\bdate\b\s*(>=|<=|>|<)",
        r"(?i)\bGROUP\s+BY\s+date\b",
        r"(?i)\bORDER\s+BY\s+date\b",
    ];
    patterns
        .iter()
        .any(|p| Regex::new(p).unwrap().is_match(sql))
}

/// Renders a dark-background bar chart: first column on x, first numeric
/// column on y. Returns PNG bytes, or None when the result shape is
/// unsuitable or rendering fails.
pub fn render_bar_chart(result: &QueryResult, question: &str) -> Option<Vec<u8>> {
    let y_idx = first_numeric_column(result)?;

    let labels: Vec<String> = result
        .rows
        .iter()
        .map(|row| row.first().cloned().unwrap_or_default())
        .collect();
    let values: Vec<f64> = result
        .rows
        .iter()
        .map(|row| {
            row.get(y_idx)
                .and_then(|v| v.parse::<f64>().ok())
                .unwrap_or(0.0)
        })
        .collect();

    let x_name = humanize(&result.columns[0]);
    let y_name = humanize(&result.columns[y_idx]);

    match draw_png(&labels, &values, &x_name, &y_name, question) {
        Ok(png) => Some(png),
        Err(e) => {
            warn!("chart rendering failed (non-critical): {}", e);
            None
        }
    }
}

/// Index of the first numeric column after the label column, judged by
/// whether the first row's cell parses as a number. None when the shape is
/// not chartable (no rows, fewer than two columns, or nothing numeric).
fn first_numeric_column(result: &QueryResult) -> Option<usize> {
    let first_row = result.rows.first()?;
    if result.columns.len() < 2 {
        return None;
    }
    (1..result.columns.len())
        .find(|&idx| first_row.get(idx).is_some_and(|v| v.parse::<f64>().is_ok()))
}

fn draw_png(
    labels: &[String],
    values: &[f64],
    x_name: &str,
    y_name: &str,
    question: &str,
) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
    let mut rgb = vec![0u8; (CHART_WIDTH * CHART_HEIGHT * 3) as usize];
    {
        let root =
            BitMapBackend::with_buffer(&mut rgb, (CHART_WIDTH, CHART_HEIGHT)).into_drawing_area();
        root.fill(&BACKGROUND)?;

        let y_max = values.iter().cloned().fold(f64::MIN, f64::max).max(1.0) * 1.1;
        let title: String = if question.chars().count() > 60 {
            format!("{}...", question.chars().take(60).collect::<String>())
        } else {
            question.to_string()
        };

        let mut chart = ChartBuilder::on(&root)
            .caption(&title, ("sans-serif", 22).into_font().color(&WHITE))
            .margin(12)
            .x_label_area_size(70)
            .y_label_area_size(80)
            .build_cartesian_2d((0..labels.len()).into_segmented(), 0f64..y_max)?;

        chart.plotting_area().fill(&PLOT_AREA)?;

        chart
            .configure_mesh()
            .disable_x_mesh()
            .light_line_style(WHITE.mix(0.08))
            .bold_line_style(WHITE.mix(0.08))
            .axis_style(WHITE.mix(0.3))
            .label_style(("sans-serif", 12).into_font().color(&WHITE))
            .x_label_formatter(&|seg| match seg {
                SegmentValue::CenterOf(idx) => labels.get(*idx).cloned().unwrap_or_default(),
                _ => String::new(),
            })
            .x_desc(x_name)
            .y_desc(y_name)
            .draw()?;

        chart.draw_series(values.iter().enumerate().map(|(idx, value)| {
            let mut bar = Rectangle::new(
                [
                    (SegmentValue::Exact(idx), 0.0),
                    (SegmentValue::Exact(idx + 1), *value),
                ],
                BAR_COLOR.mix(0.85).filled(),
            );
            bar.set_margin(0, 0, 4, 4);
            bar
        }))?;

        root.present()?;
    }

    let image = RgbImage::from_raw(CHART_WIDTH, CHART_HEIGHT, rgb)
        .ok_or("chart buffer size mismatch")?;
    let mut png = Vec::new();
    image.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;
    Ok(png)
}

/// `total_revenue` -> `Total Revenue`
fn humanize(name: &str) -> String {
    name.split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
