//! Chart rendering behind a trait so the pipeline can run chartless.
//!
//! The bundled renderer draws a candlestick panel with MA overlays and a
//! red watermark for rejected symbols. Rendering is synchronous; the
//! engine serializes calls through its render mutex.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use plotters::prelude::*;

use crate::data::PriceSeries;

/// Named line overlay (typically a moving average).
#[derive(Debug, Clone)]
pub struct Overlay {
    pub label: String,
    pub values: Vec<f64>,
}

/// Visual parameters for the bundled renderer.
#[derive(Debug, Clone)]
pub struct ChartStyle {
    pub width: u32,
    pub height: u32,
}

impl Default for ChartStyle {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
        }
    }
}

/// Rendering seam. Implementations must be callable from any worker;
/// serialization is the caller's concern.
pub trait ChartRenderer: Send + Sync {
    /// Render one symbol's chart into `dest_dir`, watermarked with
    /// `fail_reason` when present. Returns the written path.
    fn render(
        &self,
        series: &PriceSeries,
        overlays: &[Overlay],
        style: &ChartStyle,
        dest_dir: &Path,
        fail_reason: Option<&str>,
    ) -> Result<PathBuf>;
}

/// Renderer that draws nothing, for chartless runs.
pub struct NullRenderer;

impl ChartRenderer for NullRenderer {
    fn render(
        &self,
        _series: &PriceSeries,
        _overlays: &[Overlay],
        _style: &ChartStyle,
        dest_dir: &Path,
        _fail_reason: Option<&str>,
    ) -> Result<PathBuf> {
        Ok(dest_dir.to_path_buf())
    }
}

const OVERLAY_COLORS: [RGBColor; 4] = [BLUE, MAGENTA, CYAN, BLACK];

/// Candlestick chart renderer backed by plotters.
pub struct CandlestickRenderer;

impl ChartRenderer for CandlestickRenderer {
    fn render(
        &self,
        series: &PriceSeries,
        overlays: &[Overlay],
        style: &ChartStyle,
        dest_dir: &Path,
        fail_reason: Option<&str>,
    ) -> Result<PathBuf> {
        if series.is_empty() {
            return Err(anyhow!("cannot chart an empty series"));
        }

        std::fs::create_dir_all(dest_dir)
            .with_context(|| format!("Failed to create chart dir {}", dest_dir.display()))?;
        let path = dest_dir.join(format!("{}.png", series.symbol));

        let lo = series
            .bars
            .iter()
            .map(|b| b.low)
            .fold(f64::INFINITY, f64::min);
        let hi = series
            .bars
            .iter()
            .map(|b| b.high)
            .fold(f64::NEG_INFINITY, f64::max);
        let pad = ((hi - lo) * 0.05).max(hi.abs() * 0.001).max(1e-9);
        let (y_lo, y_hi) = (lo - pad, hi + pad);
        let n = series.len();

        let root = BitMapBackend::new(&path, (style.width, style.height)).into_drawing_area();
        root.fill(&WHITE).map_err(|e| anyhow!("fill failed: {e}"))?;

        {
            let mut chart = ChartBuilder::on(&root)
                .caption(&series.symbol, ("sans-serif", 28))
                .margin(12)
                .x_label_area_size(36)
                .y_label_area_size(56)
                .build_cartesian_2d(0usize..n, y_lo..y_hi)
                .map_err(|e| anyhow!("chart build failed: {e}"))?;

            let dates = series.dates();
            chart
                .configure_mesh()
                .light_line_style(WHITE.mix(0.7))
                .x_labels(8)
                .x_label_formatter(&|idx| {
                    dates
                        .get(*idx)
                        .map(|d| d.format("%Y-%m-%d").to_string())
                        .unwrap_or_default()
                })
                .draw()
                .map_err(|e| anyhow!("mesh draw failed: {e}"))?;

            chart
                .draw_series(series.bars.iter().enumerate().map(|(i, bar)| {
                    CandleStick::new(
                        i,
                        bar.open,
                        bar.high,
                        bar.low,
                        bar.close,
                        GREEN.filled(),
                        RED.filled(),
                        3,
                    )
                }))
                .map_err(|e| anyhow!("candle draw failed: {e}"))?;

            for (idx, overlay) in overlays.iter().enumerate() {
                let color = OVERLAY_COLORS[idx % OVERLAY_COLORS.len()];
                chart
                    .draw_series(LineSeries::new(
                        overlay.values.iter().enumerate().map(|(i, v)| (i, *v)),
                        color.stroke_width(2),
                    ))
                    .map_err(|e| anyhow!("overlay draw failed: {e}"))?
                    .label(overlay.label.clone())
                    .legend(move |(x, y)| {
                        PathElement::new(vec![(x, y), (x + 18, y)], color.stroke_width(2))
                    });
            }

            if !overlays.is_empty() {
                chart
                    .configure_series_labels()
                    .border_style(BLACK.mix(0.4))
                    .background_style(WHITE.mix(0.8))
                    .draw()
                    .map_err(|e| anyhow!("legend draw failed: {e}"))?;
            }
        }

        if let Some(reason) = fail_reason {
            let text = format!("FAIL: {reason}");
            root.draw(&Text::new(
                text,
                (40, (style.height / 2) as i32),
                ("sans-serif", 36)
                    .into_font()
                    .color(&RED.mix(0.55)),
            ))
            .map_err(|e| anyhow!("watermark draw failed: {e}"))?;
        }

        root.present().map_err(|e| anyhow!("present failed: {e}"))?;
        // The backend borrows `path` until dropped.
        drop(root);
        Ok(path)
    }
}
