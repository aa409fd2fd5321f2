use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Visual attenuation applied to carousel items by distance from the centre.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformStyle {
    /// Horizontal distance between neighbouring items, in pixels.
    pub spacing: f32,
    pub active_scale: f32,
    pub inactive_scale: f32,
    pub scale_step: f32,
    pub min_scale: f32,
    pub active_opacity: f32,
    pub inactive_opacity: f32,
    pub opacity_step: f32,
    pub min_opacity: f32,
}

impl Default for TransformStyle {
    fn default() -> Self {
        Self {
            spacing: 320.0,
            active_scale: 1.1,
            inactive_scale: 0.9,
            scale_step: 0.1,
            min_scale: 0.5,
            active_opacity: 1.0,
            inactive_opacity: 0.6,
            opacity_step: 0.2,
            min_opacity: 0.1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CarouselConfig {
    pub auto_advance: bool,
    pub interval_ms: u64,
    pub animation_ms: u64,
    /// Cool-down before the timer resumes after user navigation or a drag.
    pub resume_after_ms: u64,
    pub drag_threshold_px: f32,
    /// Pixels per second.
    pub velocity_threshold: f32,
    pub keyboard: bool,
    /// Auto steps start every `interval_ms` instead of `interval_ms` after the last one
    /// settled.
    pub fixed_cadence: bool,
    pub style: TransformStyle,
}

impl Default for CarouselConfig {
    fn default() -> Self {
        Self {
            auto_advance: true,
            interval_ms: 5000,
            animation_ms: 800,
            resume_after_ms: 5000,
            drag_threshold_px: 100.0,
            velocity_threshold: 500.0,
            keyboard: false,
            fixed_cadence: false,
            style: TransformStyle::default(),
        }
    }
}

impl CarouselConfig {
    /// The landing page's rotating roles: faster, keyboard-driven, no drag surface.
    pub fn hero() -> Self {
        Self {
            interval_ms: 2500,
            animation_ms: 800,
            resume_after_ms: 2500,
            keyboard: true,
            fixed_cadence: true,
            ..Self::default()
        }
    }

    /// The category card deck.
    pub fn deck() -> Self {
        Self::default()
    }

    pub fn trace_loaded(&self, name: &str) {
        info!(
            carousel = name,
            interval_ms = self.interval_ms,
            auto_advance = self.auto_advance,
            keyboard = self.keyboard,
            "Loaded carousel config"
        );
        debug!(?self, "Carousel config loaded (full debug)");
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LandingConfig {
    pub hero: CarouselConfig,
    /// How long the name banner stays up after load.
    pub name_visible_ms: u64,
    pub secret_visible_ms: u64,
    /// Primary clicks needed, together with one secondary click, to reveal the secret.
    pub secret_primary_clicks: u32,
    pub enter_fade_ms: u64,
    pub enter_target: String,
}

impl Default for LandingConfig {
    fn default() -> Self {
        Self {
            hero: CarouselConfig::hero(),
            name_visible_ms: 10_000,
            secret_visible_ms: 5000,
            secret_primary_clicks: 3,
            enter_fade_ms: 800,
            enter_target: "/homer".to_string(),
        }
    }
}

/// Static route generation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouteConfig {
    /// Static export: use `static_slugs` and never contact the store.
    pub export_mode: bool,
    pub static_slugs: Vec<String>,
    pub prefetch_limit: usize,
    /// Returned when prefetching from the store fails.
    pub fallback_slug: String,
}

impl Default for RouteConfig {
    fn default() -> Self {
        Self {
            export_mode: false,
            static_slugs: vec![
                "coding".to_string(),
                "writing".to_string(),
                "virtual-art".to_string(),
            ],
            prefetch_limit: 50,
            fallback_slug: "coding".to_string(),
        }
    }
}
