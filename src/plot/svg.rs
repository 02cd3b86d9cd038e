//! Minimal SVG renderer.

use std::fmt::Write;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use super::{PlotData, PlotError, PlotRenderer, PlotSpec, ReferenceLine};

const MARGIN_LEFT: f64 = 60.0;
const MARGIN_RIGHT: f64 = 20.0;
const MARGIN_TOP: f64 = 40.0;
const MARGIN_BOTTOM: f64 = 50.0;

/// Renders figures as SVG documents, base64-encoded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SvgRenderer {
    pub width: f64,
    pub height: f64,
}

impl Default for SvgRenderer {
    fn default() -> Self {
        Self {
            width: 640.0,
            height: 480.0,
        }
    }
}

impl SvgRenderer {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// The SVG document for `spec`, before encoding.
    pub fn to_svg(&self, spec: &PlotSpec) -> Result<String, PlotError> {
        spec.validate()?;
        self.draw(spec).map_err(|e| PlotError::Render(e.to_string()))
    }

    fn draw(&self, spec: &PlotSpec) -> Result<String, std::fmt::Error> {
        let mut out = String::new();
        writeln!(
            out,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
            w = self.width,
            h = self.height
        )?;
        writeln!(
            out,
            r#"<rect width="100%" height="100%" fill="white"/><text x="{}" y="24" text-anchor="middle" font-size="16">{}</text>"#,
            self.width / 2.0,
            escape(&spec.title)
        )?;

        match &spec.data {
            PlotData::Scatter { x, y, reference } => {
                self.draw_scatter(&mut out, x, y, reference.as_ref())?
            }
            PlotData::Bars { x, heights, guides } => {
                self.draw_bars(&mut out, x, heights, guides)?
            }
            PlotData::Matrix { labels, values } => self.draw_matrix(&mut out, labels, values)?,
        }

        if !spec.x_label.is_empty() {
            writeln!(
                out,
                r#"<text x="{}" y="{}" text-anchor="middle" font-size="12">{}</text>"#,
                self.width / 2.0,
                self.height - 12.0,
                escape(&spec.x_label)
            )?;
        }
        if !spec.y_label.is_empty() {
            writeln!(
                out,
                r#"<text x="16" y="{y}" text-anchor="middle" font-size="12" transform="rotate(-90 16 {y})">{}</text>"#,
                escape(&spec.y_label),
                y = self.height / 2.0
            )?;
        }

        out.push_str("</svg>\n");
        Ok(out)
    }

    fn plot_area(&self) -> (f64, f64, f64, f64) {
        (
            MARGIN_LEFT,
            MARGIN_TOP,
            (self.width - MARGIN_LEFT - MARGIN_RIGHT).max(1.0),
            (self.height - MARGIN_TOP - MARGIN_BOTTOM).max(1.0),
        )
    }

    fn draw_axes(&self, out: &mut String, x: &Scale, y: &Scale) -> std::fmt::Result {
        let (left, top, width, height) = self.plot_area();
        writeln!(
            out,
            r#"<rect x="{left}" y="{top}" width="{width}" height="{height}" fill="none" stroke="black"/>"#
        )?;
        for value in [x.min, x.max] {
            writeln!(
                out,
                r#"<text x="{:.1}" y="{:.1}" text-anchor="middle" font-size="10">{value:.3}</text>"#,
                x.map(value),
                top + height + 14.0
            )?;
        }
        for value in [y.min, y.max] {
            writeln!(
                out,
                r#"<text x="{:.1}" y="{:.1}" text-anchor="end" font-size="10">{value:.3}</text>"#,
                left - 4.0,
                y.map(value) + 3.0
            )?;
        }
        Ok(())
    }

    fn scales(&self, xs: &[f64], ys: &[f64]) -> (Scale, Scale) {
        let (left, top, width, height) = self.plot_area();
        (
            Scale::fit(xs, left, left + width),
            Scale::fit(ys, top + height, top),
        )
    }

    fn draw_scatter(
        &self,
        out: &mut String,
        xs: &[f64],
        ys: &[f64],
        reference: Option<&ReferenceLine>,
    ) -> std::fmt::Result {
        let (sx, sy) = self.scales(xs, ys);
        self.draw_axes(out, &sx, &sy)?;

        for (&x, &y) in xs.iter().zip(ys) {
            if x.is_finite() && y.is_finite() {
                writeln!(
                    out,
                    r##"<circle cx="{:.1}" cy="{:.1}" r="2.5" fill="#1f77b4" fill-opacity="0.7"/>"##,
                    sx.map(x),
                    sy.map(y)
                )?;
            }
        }

        if let Some(line) = reference {
            let y0 = line.intercept + line.slope * sx.min;
            let y1 = line.intercept + line.slope * sx.max;
            writeln!(
                out,
                r#"<line x1="{:.1}" y1="{:.1}" x2="{:.1}" y2="{:.1}" stroke="red" stroke-dasharray="4 3"/>"#,
                sx.map(sx.min),
                sy.map(y0),
                sx.map(sx.max),
                sy.map(y1)
            )?;
        }
        Ok(())
    }

    fn draw_bars(
        &self,
        out: &mut String,
        xs: &[f64],
        heights: &[f64],
        guides: &[f64],
    ) -> std::fmt::Result {
        let mut y_extent: Vec<f64> = heights.to_vec();
        y_extent.push(0.0);
        y_extent.extend(guides);
        let (sx, sy) = self.scales(xs, &y_extent);
        self.draw_axes(out, &sx, &sy)?;

        let (_, _, width, _) = self.plot_area();
        let bar_width = (0.8 * width / xs.len() as f64).max(1.0);
        let base = sy.map(0.0);

        for (&x, &h) in xs.iter().zip(heights) {
            if !(x.is_finite() && h.is_finite()) {
                continue;
            }
            let top = sy.map(h);
            writeln!(
                out,
                r##"<rect x="{:.1}" y="{:.1}" width="{:.1}" height="{:.1}" fill="#1f77b4"/>"##,
                sx.map(x) - bar_width / 2.0,
                top.min(base),
                bar_width,
                (base - top).abs()
            )?;
        }

        for &g in guides {
            writeln!(
                out,
                r#"<line x1="{:.1}" y1="{:.1}" x2="{:.1}" y2="{:.1}" stroke="gray" stroke-dasharray="4 3"/>"#,
                sx.map(sx.min),
                sy.map(g),
                sx.map(sx.max),
                sy.map(g)
            )?;
        }
        Ok(())
    }

    fn draw_matrix(
        &self,
        out: &mut String,
        labels: &[String],
        values: &[Vec<f64>],
    ) -> std::fmt::Result {
        let (left, top, width, height) = self.plot_area();
        let p = labels.len() as f64;
        let cell_w = width / p;
        let cell_h = height / p;

        for (i, row) in values.iter().enumerate() {
            for (j, &v) in row.iter().enumerate() {
                let x = left + j as f64 * cell_w;
                let y = top + i as f64 * cell_h;
                writeln!(
                    out,
                    r#"<rect x="{x:.1}" y="{y:.1}" width="{cell_w:.1}" height="{cell_h:.1}" fill="{}" stroke="white"/><text x="{:.1}" y="{:.1}" text-anchor="middle" font-size="11">{v:.2}</text>"#,
                    diverging_color(v),
                    x + cell_w / 2.0,
                    y + cell_h / 2.0 + 4.0
                )?;
            }
        }

        for (k, label) in labels.iter().enumerate() {
            let label = escape(label);
            writeln!(
                out,
                r#"<text x="{:.1}" y="{:.1}" text-anchor="middle" font-size="10">{label}</text>"#,
                left + (k as f64 + 0.5) * cell_w,
                top + height + 14.0
            )?;
            writeln!(
                out,
                r#"<text x="{:.1}" y="{:.1}" text-anchor="end" font-size="10">{label}</text>"#,
                left - 4.0,
                top + (k as f64 + 0.5) * cell_h + 3.0
            )?;
        }
        Ok(())
    }
}

impl PlotRenderer for SvgRenderer {
    fn render(&self, spec: &PlotSpec) -> Result<String, PlotError> {
        Ok(STANDARD.encode(self.to_svg(spec)?))
    }
}

/// Linear map from a data range onto a pixel range.
struct Scale {
    min: f64,
    max: f64,
    from: f64,
    to: f64,
}

impl Scale {
    fn fit(values: &[f64], from: f64, to: f64) -> Self {
        let (mut min, mut max) = values
            .iter()
            .filter(|v| v.is_finite())
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            });
        if !min.is_finite() {
            min = 0.0;
            max = 1.0;
        } else if max - min < 1e-12 {
            min -= 0.5;
            max += 0.5;
        }
        Self { min, max, from, to }
    }

    fn map(&self, v: f64) -> f64 {
        self.from + (v - self.min) / (self.max - self.min) * (self.to - self.from)
    }
}

/// Blue for -1, white for 0, red for +1.
fn diverging_color(v: f64) -> String {
    let t = v.clamp(-1.0, 1.0);
    let fade = |c: f64| (255.0 - (255.0 - c) * t.abs()).round() as u8;
    let (r, g, b) = if t >= 0.0 {
        (fade(214.0), fade(39.0), fade(40.0))
    } else {
        (fade(31.0), fade(119.0), fade(180.0))
    };
    format!("#{r:02x}{g:02x}{b:02x}")
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plot::PlotKind;

    fn scatter() -> PlotSpec {
        PlotSpec::new(
            PlotKind::ResidualsVsFitted,
            "Residuals vs Fitted",
            PlotData::Scatter {
                x: vec![0.0, 1.0, 2.0],
                y: vec![0.5, -0.5, 0.1],
                reference: Some(ReferenceLine::horizontal(0.0)),
            },
        )
        .labels("Fitted values", "Residuals")
    }

    #[test]
    fn test_svg_contains_points_and_title() {
        let svg = SvgRenderer::default().to_svg(&scatter()).expect("render");
        assert!(svg.starts_with("<svg"));
        assert_eq!(svg.matches("<circle").count(), 3);
        assert!(svg.contains("Residuals vs Fitted"));
        assert!(svg.trim_end().ends_with("</svg>"));
    }

    #[test]
    fn test_render_is_base64_of_svg() {
        let renderer = SvgRenderer::default();
        let encoded = renderer.render(&scatter()).expect("render");
        let decoded = STANDARD.decode(encoded).expect("valid base64");
        assert_eq!(
            String::from_utf8(decoded).expect("utf8"),
            renderer.to_svg(&scatter()).expect("render")
        );
    }

    #[test]
    fn test_heatmap_colors() {
        assert_eq!(diverging_color(0.0), "#ffffff");
        assert_eq!(diverging_color(1.0), "#d62728");
        assert_eq!(diverging_color(-1.0), "#1f77b4");

        let spec = PlotSpec::new(
            PlotKind::CorrelationHeatmap,
            "Correlation <matrix>",
            PlotData::Matrix {
                labels: vec!["a".into(), "b".into()],
                values: vec![vec![1.0, 0.3], vec![0.3, 1.0]],
            },
        );
        let svg = SvgRenderer::default().to_svg(&spec).expect("render");
        assert!(svg.contains("&lt;matrix&gt;"));
        assert!(svg.contains("0.30"));
    }

    #[test]
    fn test_bars_with_constant_heights() {
        let spec = PlotSpec::new(
            PlotKind::Acf,
            "ACF",
            PlotData::Bars {
                x: vec![0.0, 1.0],
                heights: vec![0.0, 0.0],
                guides: vec![],
            },
        );
        assert!(SvgRenderer::default().render(&spec).is_ok());
    }
}
