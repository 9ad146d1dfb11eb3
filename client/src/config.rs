use signflow_shared::overlay::{DEFAULT_OVERLAY_HEIGHT, DEFAULT_OVERLAY_WIDTH};
use signflow_shared::session::DEFAULT_RENDER_SCALE;
use signflow_shared::{PageSize, PlacementConfig};

const MIN_RENDER_SCALE: f64 = 0.5;
const MAX_RENDER_SCALE: f64 = 4.0;

/// Page-level settings, read once from the query string
/// (`?debug=1&scale=2&gap=24&lift=40`).
#[derive(Clone, Debug, PartialEq)]
pub struct ClientConfig {
    pub debug: bool,
    pub render_scale: f64,
    pub overlay_size: PageSize,
    pub placement: PlacementConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            debug: false,
            render_scale: DEFAULT_RENDER_SCALE,
            overlay_size: PageSize::new(DEFAULT_OVERLAY_WIDTH, DEFAULT_OVERLAY_HEIGHT),
            placement: PlacementConfig::default(),
        }
    }
}

fn flag(value: &str) -> bool {
    value == "1" || value.eq_ignore_ascii_case("true")
}

fn finite(value: &str) -> Option<f64> {
    value.parse::<f64>().ok().filter(|value| value.is_finite())
}

impl ClientConfig {
    pub fn from_query(search: &str) -> Self {
        let mut config = Self::default();
        for pair in search.trim_start_matches('?').split('&') {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            match key {
                "debug" | "log" => config.debug = config.debug || flag(value),
                "scale" => {
                    if let Some(scale) = finite(value) {
                        config.render_scale = scale.clamp(MIN_RENDER_SCALE, MAX_RENDER_SCALE);
                    }
                }
                "gap" => {
                    if let Some(gap) = finite(value) {
                        config.placement.gap_px = gap;
                    }
                }
                "lift" => {
                    if let Some(lift) = finite(value) {
                        config.placement.baseline_lift_px = lift;
                    }
                }
                _ => {}
            }
        }
        config
    }

    pub fn from_window(window: &web_sys::Window) -> Self {
        let search = window.location().search().ok().unwrap_or_default();
        Self::from_query(&search)
    }
}
