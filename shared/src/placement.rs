use serde::{Deserialize, Serialize};

use crate::geometry::{clamp_position, to_viewport, PageSize, PageViewport};
use crate::keywords::{default_keywords, find_signature_anchor, TextFragment};

/// Tunables for automatic placement. The offsets are heuristics fitted to
/// typical form layouts, so they are kept configurable.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct PlacementConfig {
    /// Horizontal gap between the anchor text's right edge and the overlay.
    pub gap_px: f64,
    /// Upward shift from the anchor baseline.
    pub baseline_lift_px: f64,
    pub fallback_left_px: f64,
    /// Distance of the fallback position from the bottom of the page.
    pub fallback_bottom_px: f64,
    pub keywords: Vec<String>,
}

impl Default for PlacementConfig {
    fn default() -> Self {
        Self {
            gap_px: 20.0,
            baseline_lift_px: 40.0,
            fallback_left_px: 50.0,
            fallback_bottom_px: 200.0,
            keywords: default_keywords(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum PlacementSource {
    Anchor { text: String },
    Fallback { reason: Option<String> },
}

#[derive(Clone, Debug, PartialEq)]
pub struct Placement {
    pub left: f64,
    pub top: f64,
    pub source: PlacementSource,
}

impl Placement {
    pub fn is_anchored(&self) -> bool {
        matches!(self.source, PlacementSource::Anchor { .. })
    }
}

pub fn place_default(
    fragments: &[TextFragment],
    viewport: &PageViewport,
    overlay: PageSize,
    config: &PlacementConfig,
) -> Placement {
    let (left, top, source) = match find_signature_anchor(fragments, &config.keywords) {
        Some(anchor) => {
            let (vx, vy) = to_viewport(anchor.origin_x(), anchor.origin_y(), viewport);
            let scaled_width = anchor.width * viewport.render_scale;
            (
                vx + scaled_width + config.gap_px,
                vy - config.baseline_lift_px,
                PlacementSource::Anchor {
                    text: anchor.text.clone(),
                },
            )
        }
        None => (
            config.fallback_left_px,
            viewport.rendered_height - config.fallback_bottom_px,
            PlacementSource::Fallback { reason: None },
        ),
    };
    let (left, top) = clamp_position(left, top, viewport.rendered_size(), overlay);
    Placement { left, top, source }
}

/// Placement when text extraction itself failed; the failure is carried in
/// the result so the caller can log it.
pub fn place_without_text(
    viewport: &PageViewport,
    overlay: PageSize,
    config: &PlacementConfig,
    reason: String,
) -> Placement {
    let mut placement = place_default(&[], viewport, overlay, config);
    placement.source = PlacementSource::Fallback {
        reason: Some(reason),
    };
    placement
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIG: PageSize = PageSize {
        width: 150.0,
        height: 60.0,
    };

    fn fragment(text: &str, x: f64, y: f64, width: f64) -> TextFragment {
        TextFragment {
            text: text.to_string(),
            transform: [10.0, 0.0, 0.0, 10.0, x, y],
            width,
        }
    }

    #[test]
    fn fallback_without_keyword() {
        let viewport = PageViewport::new(0, 612.0, 792.0, 1.5);
        let fragments = vec![fragment("Invoice", 72.0, 700.0, 50.0)];
        let placement = place_default(&fragments, &viewport, SIG, &PlacementConfig::default());
        assert_eq!(placement.left, 50.0);
        assert_eq!(placement.top, viewport.rendered_height - 200.0);
        assert!(!placement.is_anchored());
    }

    #[test]
    fn anchor_offsets_right_and_up() {
        let viewport = PageViewport::new(2, 612.0, 792.0, 1.5);
        let fragments = vec![
            fragment("Name", 72.0, 300.0, 30.0),
            fragment("Signature:", 72.0, 200.0, 60.0),
        ];
        let placement = place_default(&fragments, &viewport, SIG, &PlacementConfig::default());
        // vx = 108, vy = (792 - 200) * 1.5 = 888
        assert_eq!(placement.left, 108.0 + 90.0 + 20.0);
        assert_eq!(placement.top, 888.0 - 40.0);
        assert_eq!(
            placement.source,
            PlacementSource::Anchor {
                text: "Signature:".to_string()
            }
        );
    }

    #[test]
    fn anchor_follows_shifted_media_box() {
        let viewport = PageViewport::from_view_box(0, [0.0, 100.0, 612.0, 892.0], 0, 1.5);
        let fragments = vec![fragment("Signature", 72.0, 150.0, 60.0)];
        let placement = place_default(&fragments, &viewport, SIG, &PlacementConfig::default());
        // vx = 72 * 1.5 = 108, vy = (892 - 150) * 1.5 = 1113
        assert_eq!(placement.left, 108.0 + 90.0 + 20.0);
        assert_eq!(placement.top, 1113.0 - 40.0);
    }

    #[test]
    fn configured_offsets_are_used() {
        let viewport = PageViewport::new(0, 600.0, 800.0, 1.0);
        let config = PlacementConfig {
            gap_px: 5.0,
            baseline_lift_px: 10.0,
            ..PlacementConfig::default()
        };
        let fragments = vec![fragment("Signed", 100.0, 400.0, 40.0)];
        let placement = place_default(&fragments, &viewport, SIG, &config);
        assert_eq!(placement.left, 145.0);
        assert_eq!(placement.top, 390.0);
    }

    #[test]
    fn anchor_near_right_edge_is_clamped() {
        let viewport = PageViewport::new(0, 600.0, 800.0, 1.0);
        let fragments = vec![fragment("Signature", 560.0, 790.0, 30.0)];
        let placement = place_default(&fragments, &viewport, SIG, &PlacementConfig::default());
        assert_eq!(placement.left, 450.0);
        assert_eq!(placement.top, 0.0);
    }

    #[test]
    fn oversized_overlay_clamps_to_origin() {
        let viewport = PageViewport::new(0, 100.0, 50.0, 1.0);
        let big = PageSize::new(150.0, 60.0);
        let anchored = place_default(
            &[fragment("Signature", 10.0, 10.0, 5.0)],
            &viewport,
            big,
            &PlacementConfig::default(),
        );
        assert_eq!((anchored.left, anchored.top), (0.0, 0.0));
        let fallback = place_default(&[], &viewport, big, &PlacementConfig::default());
        assert_eq!((fallback.left, fallback.top), (0.0, 0.0));
    }

    #[test]
    fn extraction_failure_keeps_reason() {
        let viewport = PageViewport::new(0, 612.0, 792.0, 1.0);
        let placement = place_without_text(
            &viewport,
            SIG,
            &PlacementConfig::default(),
            "no text layer".to_string(),
        );
        assert_eq!((placement.left, placement.top), (50.0, 592.0));
        assert_eq!(
            placement.source,
            PlacementSource::Fallback {
                reason: Some("no text layer".to_string())
            }
        );
    }

    #[test]
    fn config_fills_missing_fields() {
        let config: PlacementConfig = serde_json::from_str(r#"{"gap_px":12}"#).unwrap();
        assert_eq!(config.gap_px, 12.0);
        assert_eq!(config.baseline_lift_px, 40.0);
        assert_eq!(config.keywords.len(), 5);
    }
}
