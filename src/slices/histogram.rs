use std::path::Path;

use plotters::prelude::*;
use tracing::info;

use super::types::QueryError;

fn plot_err<E: std::fmt::Display>(e: E) -> QueryError {
    QueryError::Plot(e.to_string())
}

/// Draws a bar chart of chord successions as returned by
/// [`SvTable::follow_chord`](super::SvTable::follow_chord) and saves it as SVG.
pub fn write_follow_histogram(counts: &[(String, usize)], path: &Path) -> Result<(), QueryError> {
    if counts.is_empty() {
        return Err(QueryError::Empty("no chord successions to plot".into()));
    }

    let max_count = counts.iter().map(|(_, c)| *c).max().unwrap_or(1) as u32;
    let root = SVGBackend::new(path, (800, 500)).into_drawing_area();
    root.fill(&WHITE).map_err(plot_err)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Chord usage", ("sans-serif", 24))
        .margin(10)
        .x_label_area_size(100)
        .y_label_area_size(50)
        .build_cartesian_2d((0..counts.len()).into_segmented(), 0u32..max_count + 1)
        .map_err(plot_err)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_desc("Chord type")
        .y_desc("Count")
        .x_labels(counts.len())
        .x_label_style(
            ("sans-serif", 12)
                .into_font()
                .transform(FontTransform::Rotate90),
        )
        .x_label_formatter(&|value| match value {
            SegmentValue::CenterOf(index) | SegmentValue::Exact(index) => counts
                .get(*index)
                .map(|(label, _)| label.clone())
                .unwrap_or_default(),
            SegmentValue::Last => String::new(),
        })
        .draw()
        .map_err(plot_err)?;

    chart
        .draw_series(counts.iter().enumerate().map(|(index, (_, count))| {
            Rectangle::new(
                [
                    (SegmentValue::Exact(index), 0),
                    (SegmentValue::Exact(index + 1), *count as u32),
                ],
                BLUE.mix(0.6).filled(),
            )
        }))
        .map_err(plot_err)?;

    root.present().map_err(plot_err)?;
    info!(path = %path.display(), bars = counts.len(), "wrote histogram");
    Ok(())
}
