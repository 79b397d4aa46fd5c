//! Speedup chart construction and rendering
//!
//! [`SpeedupChart::build`] is pure: it turns speedup series into a chart model.
//! [`ChartRenderer`] draws that model with `plotters` as a log-log SVG and can
//! hand the file to the platform viewer. Persisting and displaying are
//! independent switches.

use crate::error::{HarnessError, HarnessResult};
use crate::sweep::SpeedupSeries;
use crate::types::{Marker, SeriesColor, SeriesStyle, ThreadCounts};
use plotters::coord::{CoordTranslate, Shift};
use plotters::prelude::*;
use plotters::series::DashedLineSeries;
use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Default chart file name
pub const DEFAULT_CHART_FILE: &str = "speedup.svg";

/// Default edge length of the square chart in pixels
pub const DEFAULT_CHART_SIZE: u32 = 600;

const MARKER_SIZE: i32 = 5;

/// What a chart series represents
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeriesKind {
    /// Measured speedup of one problem size
    Measured(SeriesStyle),
    /// Ideal speedup, equal to the thread count
    Reference,
}

/// One labelled line of the chart
#[derive(Debug, Clone, PartialEq)]
pub struct ChartSeries {
    pub label: String,
    pub kind: SeriesKind,
    pub points: Vec<(f64, f64)>,
}

/// Everything needed to draw the speedup chart
#[derive(Debug, Clone, PartialEq)]
pub struct SpeedupChart {
    pub series: Vec<ChartSeries>,
    /// Upper limit of both axes; both start at 1
    pub axis_max: f64,
    pub x_label: String,
    pub y_label: String,
}

impl SpeedupChart {
    /// Build the chart model: one series per problem size plus the reference line
    pub fn build(series: &[SpeedupSeries], threads: &ThreadCounts) -> Self {
        let max_threads = threads.max() as f64;

        let mut lines: Vec<ChartSeries> = series
            .iter()
            .map(|s| ChartSeries {
                label: format!("N_cell = {}", s.cells),
                kind: SeriesKind::Measured(s.style),
                points: s
                    .points
                    .iter()
                    .map(|p| (p.threads as f64, p.speedup))
                    .collect(),
            })
            .collect();

        lines.push(ChartSeries {
            label: "Reference".to_string(),
            kind: SeriesKind::Reference,
            points: vec![(1.0, 1.0), (max_threads, max_threads)],
        });

        Self {
            series: lines,
            // A log axis needs a non-empty range even for a 1-thread sweep
            axis_max: max_threads.max(2.0),
            x_label: "Number of Threads".to_string(),
            y_label: "Speedup".to_string(),
        }
    }
}

/// Draws a [`SpeedupChart`] to disk and/or the screen
#[derive(Debug, Clone)]
pub struct ChartRenderer {
    output: Option<PathBuf>,
    display: bool,
    size_px: u32,
}

impl Default for ChartRenderer {
    fn default() -> Self {
        Self {
            output: Some(PathBuf::from(DEFAULT_CHART_FILE)),
            display: true,
            size_px: DEFAULT_CHART_SIZE,
        }
    }
}

impl ChartRenderer {
    /// Renderer that neither persists nor displays
    pub fn disabled() -> Self {
        Self {
            output: None,
            display: false,
            size_px: DEFAULT_CHART_SIZE,
        }
    }

    pub fn with_output(mut self, output: Option<PathBuf>) -> Self {
        self.output = output;
        self
    }

    pub fn with_display(mut self, display: bool) -> Self {
        self.display = display;
        self
    }

    pub fn with_size(mut self, size_px: u32) -> Self {
        self.size_px = size_px;
        self
    }

    /// Render the chart; returns the SVG path when one was written
    ///
    /// A failed or unavailable display is logged, never returned as an error.
    pub fn render(&self, chart: &SpeedupChart) -> HarnessResult<Option<PathBuf>> {
        let written = match &self.output {
            Some(path) => {
                self.write_svg(chart, path)?;
                log::info!("wrote chart to {}", path.display());
                Some(path.clone())
            }
            None => None,
        };

        if self.display {
            let path = match &written {
                Some(path) => path.clone(),
                None => self.write_display_copy(chart)?,
            };
            show(&path);
        }

        Ok(written)
    }

    /// Write the chart to a uniquely named file in the temp directory
    ///
    /// The file is kept after the harness exits; viewers open it asynchronously.
    pub fn write_display_copy(&self, chart: &SpeedupChart) -> HarnessResult<PathBuf> {
        let path = tempfile::Builder::new()
            .prefix("cats-speedup-")
            .suffix(".svg")
            .tempfile()
            .and_then(|file| file.into_temp_path().keep().map_err(|e| e.error))
            .map_err(chart_error)?;
        self.write_svg(chart, &path)?;
        log::info!("chart for display left at {}", path.display());
        Ok(path)
    }

    /// Write the chart as an SVG file
    pub fn write_svg(&self, chart: &SpeedupChart, path: &Path) -> HarnessResult<()> {
        let root = SVGBackend::new(path, (self.size_px, self.size_px)).into_drawing_area();
        draw_chart(&root, chart)?;
        root.present().map_err(chart_error)
    }
}

fn chart_error<E: Display>(err: E) -> HarnessError {
    HarnessError::Chart(err.to_string())
}

fn rgb(color: SeriesColor) -> RGBColor {
    match color {
        SeriesColor::Red => RED,
        SeriesColor::Green => RGBColor(0, 128, 0),
        SeriesColor::Blue => BLUE,
        SeriesColor::Black => BLACK,
    }
}

fn diamond(size: i32) -> Vec<(i32, i32)> {
    vec![(0, -size), (size, 0), (0, size), (-size, 0)]
}

fn draw_chart<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    chart: &SpeedupChart,
) -> HarnessResult<()>
where
    DB::ErrorType: 'static,
{
    root.fill(&WHITE).map_err(chart_error)?;

    // Square plotting area with identical log axes keeps the aspect ratio 1:1
    let mut ctx = ChartBuilder::on(root)
        .margin(20)
        .x_label_area_size(50)
        .y_label_area_size(50)
        .build_cartesian_2d(
            (1.0..chart.axis_max).log_scale(),
            (1.0..chart.axis_max).log_scale(),
        )
        .map_err(chart_error)?;

    ctx.configure_mesh()
        .x_desc(chart.x_label.as_str())
        .y_desc(chart.y_label.as_str())
        .draw()
        .map_err(chart_error)?;

    for series in &chart.series {
        let points = series.points.clone();
        match series.kind {
            SeriesKind::Reference => {
                ctx.draw_series(DashedLineSeries::new(
                    points,
                    8,
                    5,
                    BLACK.stroke_width(1),
                ))
                .map_err(chart_error)?
                .label(series.label.as_str())
                .legend(|(x, y)| PathElement::new(vec![(x - 10, y), (x + 10, y)], BLACK));
            }
            SeriesKind::Measured(style) => {
                let color = rgb(style.color);
                ctx.draw_series(LineSeries::new(points.iter().copied(), color.stroke_width(2)))
                    .map_err(chart_error)?;
                draw_markers(&mut ctx, &points, style, &series.label)?;
            }
        }
    }

    ctx.configure_series_labels()
        .position(SeriesLabelPosition::UpperLeft)
        .border_style(TRANSPARENT)
        .background_style(WHITE.mix(0.8))
        .draw()
        .map_err(chart_error)?;

    Ok(())
}

fn draw_markers<'a, DB, CT>(
    ctx: &mut ChartContext<'a, DB, CT>,
    points: &[(f64, f64)],
    style: SeriesStyle,
    label: &str,
) -> HarnessResult<()>
where
    DB: DrawingBackend + 'a,
    DB::ErrorType: 'static,
    CT: CoordTranslate<From = (f64, f64)>,
{
    let color = rgb(style.color);
    let stroke = move || PathElement::new(vec![(-10, 0), (10, 0)], color);

    match style.marker {
        Marker::Circle => {
            ctx.draw_series(
                points
                    .iter()
                    .map(|&p| Circle::new(p, MARKER_SIZE, color.filled())),
            )
            .map_err(chart_error)?
            .label(label)
            .legend(move |c| {
                EmptyElement::at(c) + Circle::new((0, 0), MARKER_SIZE, color.filled()) + stroke()
            });
        }
        Marker::Triangle => {
            ctx.draw_series(
                points
                    .iter()
                    .map(|&p| TriangleMarker::new(p, MARKER_SIZE, color.filled())),
            )
            .map_err(chart_error)?
            .label(label)
            .legend(move |c| {
                EmptyElement::at(c)
                    + TriangleMarker::new((0, 0), MARKER_SIZE, color.filled())
                    + stroke()
            });
        }
        Marker::Diamond => {
            ctx.draw_series(points.iter().map(|&p| {
                EmptyElement::at(p) + Polygon::new(diamond(MARKER_SIZE), color.filled())
            }))
            .map_err(chart_error)?
            .label(label)
            .legend(move |c| {
                EmptyElement::at(c)
                    + Polygon::new(diamond(MARKER_SIZE), color.filled())
                    + stroke()
            });
        }
    }

    Ok(())
}

/// Open `path` in the platform's default viewer
///
/// Returns whether a viewer was launched. Headless sessions are skipped.
pub fn show(path: &Path) -> bool {
    if cfg!(target_os = "linux")
        && std::env::var_os("DISPLAY").is_none()
        && std::env::var_os("WAYLAND_DISPLAY").is_none()
    {
        log::warn!("no display available; not opening {}", path.display());
        return false;
    }

    let mut cmd = if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.args(["/C", "start", ""]);
        c
    } else if cfg!(target_os = "macos") {
        Command::new("open")
    } else {
        Command::new("xdg-open")
    };

    let status = cmd
        .arg(path)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();

    match status {
        Ok(status) if status.success() => true,
        Ok(status) => {
            log::warn!("chart viewer exited with {}", status);
            false
        }
        Err(e) => {
            log::warn!("could not launch chart viewer: {}", e);
            false
        }
    }
}
