use serde::{Deserialize, Serialize};

/// Render metadata for one page, captured when the page is rasterized.
///
/// `transform` is the affine map from PDF user space to viewport pixels,
/// `[a, b, c, d, e, f]` with `vx = a*x + c*y + e` and `vy = b*x + d*y + f`.
/// It accounts for the media box origin and the page's `/Rotate`.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct PageViewport {
    pub page_index: usize,
    pub pdf_width: f64,
    pub pdf_height: f64,
    pub render_scale: f64,
    pub rendered_width: f64,
    pub rendered_height: f64,
    pub transform: [f64; 6],
}

impl PageViewport {
    /// Viewport of an unrotated page whose media box starts at the origin.
    pub fn new(page_index: usize, pdf_width: f64, pdf_height: f64, render_scale: f64) -> Self {
        Self::from_view_box(page_index, [0.0, 0.0, pdf_width, pdf_height], 0, render_scale)
    }

    /// Viewport of a page with media box `[x0, y0, x1, y1]` and `/Rotate`
    /// `rotation` (a multiple of 90, negative values allowed). Produces the
    /// same mapping pdf.js uses for `convertToViewportPoint`.
    pub fn from_view_box(
        page_index: usize,
        view_box: [f64; 4],
        rotation: i32,
        render_scale: f64,
    ) -> Self {
        let [x0, y0, x1, y1] = view_box;
        let (a, b, c, d) = match rotation.rem_euclid(360) {
            90 => (0.0, 1.0, 1.0, 0.0),
            180 => (-1.0, 0.0, 0.0, 1.0),
            270 => (0.0, -1.0, -1.0, 0.0),
            _ => (1.0, 0.0, 0.0, -1.0),
        };
        let center_x = (x0 + x1) / 2.0;
        let center_y = (y0 + y1) / 2.0;
        let pdf_width = x1 - x0;
        let pdf_height = y1 - y0;
        let scale = render_scale;

        let quarter_turn = a == 0.0;
        let (offset_x, offset_y, rendered_width, rendered_height) = if quarter_turn {
            (
                (center_y - y0).abs() * scale,
                (center_x - x0).abs() * scale,
                pdf_height * scale,
                pdf_width * scale,
            )
        } else {
            (
                (center_x - x0).abs() * scale,
                (center_y - y0).abs() * scale,
                pdf_width * scale,
                pdf_height * scale,
            )
        };
        let transform = [
            a * scale,
            b * scale,
            c * scale,
            d * scale,
            offset_x - a * scale * center_x - c * scale * center_y,
            offset_y - b * scale * center_x - d * scale * center_y,
        ];

        Self {
            page_index,
            pdf_width,
            pdf_height,
            render_scale,
            rendered_width,
            rendered_height,
            transform,
        }
    }

    pub fn rendered_size(&self) -> PageSize {
        PageSize {
            width: self.rendered_width,
            height: self.rendered_height,
        }
    }

    pub fn pdf_size(&self) -> PageSize {
        PageSize {
            width: self.pdf_width,
            height: self.pdf_height,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct PageSize {
    pub width: f64,
    pub height: f64,
}

impl PageSize {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Overlay box in DOM pixels, relative to its page container.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct OverlayGeometry {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

/// Rectangle in PDF user space (origin bottom-left).
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct PdfRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScaleFactors {
    pub x: f64,
    pub y: f64,
}

impl ScaleFactors {
    /// Factors that take DOM pixels of a page container to PDF points.
    pub fn between(dom_page: PageSize, pdf_page: PageSize) -> Self {
        Self {
            x: pdf_page.width / dom_page.width,
            y: pdf_page.height / dom_page.height,
        }
    }
}

pub fn to_viewport(pdf_x: f64, pdf_y: f64, viewport: &PageViewport) -> (f64, f64) {
    let [a, b, c, d, e, f] = viewport.transform;
    (a * pdf_x + c * pdf_y + e, b * pdf_x + d * pdf_y + f)
}

/// Maps an overlay's DOM box onto the page in PDF space, anchoring at the
/// overlay's bottom edge because PDF y grows upward.
pub fn to_pdf(geometry: &OverlayGeometry, dom_page: PageSize, pdf_page: PageSize) -> PdfRect {
    let scale = ScaleFactors::between(dom_page, pdf_page);
    PdfRect {
        x: geometry.left * scale.x,
        y: pdf_page.height - (geometry.top + geometry.height) * scale.y,
        width: geometry.width * scale.x,
        height: geometry.height * scale.y,
    }
}

/// Keeps the overlay box inside its container. When the overlay is larger
/// than the container the axis collapses to 0.
pub fn clamp_position(left: f64, top: f64, container: PageSize, overlay: PageSize) -> (f64, f64) {
    let max_left = container.width - overlay.width;
    let max_top = container.height - overlay.height;
    (left.min(max_left).max(0.0), top.min(max_top).max(0.0))
}
