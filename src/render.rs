//! Rasterize laid-out traces onto a paper-sized RGB sheet.
//!
//! Horizontal data units are sample indices spread over the plot width;
//! vertical data units are millimetres above the bottom of the plot area.
//! Labels and legend text are not drawn.

use crate::config::{PaperConfig, RenderConfig};
use crate::container::Signal;
use crate::layout::LayoutCell;
use image::{Rgb, RgbImage};

/// Maps plot coordinates onto image pixels.
#[derive(Debug, Clone, Copy)]
pub struct SheetTransform {
    pixels_per_mm: f64,
    paper_height_mm: f64,
    left_mm: f64,
    bottom_mm: f64,
    mm_per_sample: f64,
}

impl SheetTransform {
    pub fn new(paper: &PaperConfig, render: &RenderConfig, sample_count: usize) -> Self {
        let span = sample_count.saturating_sub(1).max(1) as f64;
        Self {
            pixels_per_mm: render.pixels_per_mm,
            paper_height_mm: paper.paper_height_mm,
            left_mm: paper.margin_left_mm(),
            bottom_mm: paper.margin_bottom_mm,
            mm_per_sample: paper.width_mm / span,
        }
    }

    /// Pixel position of sample index `x` at height `y_mm` in the plot area.
    pub fn to_pixel(&self, x: f64, y_mm: f64) -> (f64, f64) {
        let x_mm = self.left_mm + x * self.mm_per_sample;
        let from_top_mm = self.paper_height_mm - (self.bottom_mm + y_mm);
        (x_mm * self.pixels_per_mm, from_top_mm * self.pixels_per_mm)
    }

    fn mm_to_pixel(&self, x_mm: f64, y_mm: f64) -> (f64, f64) {
        let from_top_mm = self.paper_height_mm - (self.bottom_mm + y_mm);
        (
            (self.left_mm + x_mm) * self.pixels_per_mm,
            from_top_mm * self.pixels_per_mm,
        )
    }
}

/// Draw grid, cell separators and traces for a computed layout.
pub fn render_sheet(
    cells: &[LayoutCell],
    signals: &[Signal],
    paper: &PaperConfig,
    render: &RenderConfig,
) -> RgbImage {
    let width_px = (paper.paper_width_mm * render.pixels_per_mm).round().max(1.0) as u32;
    let height_px = (paper.paper_height_mm * render.pixels_per_mm).round().max(1.0) as u32;
    let mut img = RgbImage::from_pixel(width_px, height_px, Rgb(render.background_color));

    let sample_count = signals.first().map_or(0, Signal::len);
    let transform = SheetTransform::new(paper, render, sample_count);

    draw_grid(&mut img, &transform, paper, Rgb(render.grid_color));

    let rows = cells.iter().map(|c| c.row_index + 1).max().unwrap_or(0);
    if rows == 0 {
        return img;
    }
    let row_height = paper.height_mm / rows as f64;
    let marker_half = row_height / paper.marker_divisor;

    for cell in cells {
        let v = cell.vertical_offset;
        let h = cell.horizontal_offset;
        draw_line(
            &mut img,
            transform.to_pixel(h, v - marker_half),
            transform.to_pixel(h, v + marker_half),
            Rgb(render.marker_color),
        );
    }

    // Each row is one continuous polyline over its cells' windows in order
    for row in 0..rows {
        let mut trace: Vec<f64> = Vec::new();
        let mut offset = None;
        for cell in cells.iter().filter(|c| c.row_index == row) {
            offset = Some(cell.vertical_offset);
            if let Some(window) = signals
                .get(cell.channel_index)
                .and_then(|s| s.samples().get(cell.sample_window.clone()))
            {
                trace.extend(window.iter().map(|v| v * paper.mm_per_millivolt));
            }
        }
        let Some(offset) = offset else { continue };

        for (i, pair) in trace.windows(2).enumerate() {
            draw_line(
                &mut img,
                transform.to_pixel(i as f64, pair[0] + offset),
                transform.to_pixel((i + 1) as f64, pair[1] + offset),
                Rgb(render.trace_color),
            );
        }
    }

    tracing::debug!(width_px, height_px, cells = cells.len(), "Rendered sheet");

    img
}

fn draw_grid(img: &mut RgbImage, transform: &SheetTransform, paper: &PaperConfig, color: Rgb<u8>) {
    let q = paper.grid_quantum_mm;
    let columns = (paper.width_mm / q).floor() as usize;
    let rows = (paper.height_mm / q).floor() as usize;

    for k in 0..=columns {
        let x = k as f64 * q;
        draw_line(
            img,
            transform.mm_to_pixel(x, 0.0),
            transform.mm_to_pixel(x, paper.height_mm),
            color,
        );
    }
    for k in 0..=rows {
        let y = k as f64 * q;
        draw_line(
            img,
            transform.mm_to_pixel(0.0, y),
            transform.mm_to_pixel(paper.width_mm, y),
            color,
        );
    }
}

/// DDA line, clipped to the image.
fn draw_line(img: &mut RgbImage, from: (f64, f64), to: (f64, f64), color: Rgb<u8>) {
    let (dx, dy) = (to.0 - from.0, to.1 - from.1);
    let steps = dx.abs().max(dy.abs()).ceil().max(1.0) as usize;

    for i in 0..=steps {
        let t = i as f64 / steps as f64;
        let x = (from.0 + dx * t).round();
        let y = (from.1 + dy * t).round();
        if x >= 0.0 && y >= 0.0 && (x as u32) < img.width() && (y as u32) < img.height() {
            img.put_pixel(x as u32, y as u32, color);
        }
    }
}
