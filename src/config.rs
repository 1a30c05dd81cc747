//! Runtime configuration parsed from environment variables.
//!
//! Every knob has a typed default so an empty environment yields a working
//! configuration. Only the link-preview endpoint is optional: when it is not
//! set, previews are disabled.

use std::time::Duration;

pub const DEFAULT_CHAT_PAGE_SIZE: usize = 50;
pub const DEFAULT_SNAPSHOT_DEBOUNCE_MS: u64 = 30;
pub const DEFAULT_RECONNECT_BACKOFF_MS: u64 = 1000;
pub const DEFAULT_MAX_BACKOFF_MS: u64 = 10_000;
pub const DEFAULT_SWIPE_THRESHOLD_PX: f64 = 80.0;
pub const DEFAULT_MAX_SWIPE_PX: f64 = 120.0;
pub const DEFAULT_LONG_PRESS_MS: u64 = 500;
pub const DEFAULT_DOUBLE_TAP_MS: u64 = 300;
pub const DEFAULT_LIKE_EMOJI: &str = "❤️";
pub const DEFAULT_PREVIEW_TIMEOUT_SECS: u64 = 8;

/// Errors produced while reading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A variable was present but could not be parsed.
    #[error("invalid value for {var}: {value}")]
    Invalid { var: String, value: String },
}

/// Timings and thresholds for the touch gesture machine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GestureConfig {
    /// Rightward displacement needed to trigger swipe-to-reply.
    pub swipe_threshold_px: f64,
    /// Visual clamp for the bubble offset while swiping.
    pub max_swipe_px: f64,
    /// Hold duration that opens the message menu.
    pub long_press_ms: u64,
    /// Maximum gap between two taps to count as a double tap.
    pub double_tap_ms: u64,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            swipe_threshold_px: DEFAULT_SWIPE_THRESHOLD_PX,
            max_swipe_px: DEFAULT_MAX_SWIPE_PX,
            long_press_ms: DEFAULT_LONG_PRESS_MS,
            double_tap_ms: DEFAULT_DOUBLE_TAP_MS,
        }
    }
}

/// Settings for the live message subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedConfig {
    /// Size of the "latest messages" window.
    pub page_size: usize,
    /// Snapshots arriving closer together than this are coalesced.
    pub snapshot_debounce_ms: u64,
    /// First reconnect delay after a listener failure.
    pub reconnect_backoff_ms: u64,
    /// Upper bound for the doubling reconnect delay.
    pub max_backoff_ms: u64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_CHAT_PAGE_SIZE,
            snapshot_debounce_ms: DEFAULT_SNAPSHOT_DEBOUNCE_MS,
            reconnect_backoff_ms: DEFAULT_RECONNECT_BACKOFF_MS,
            max_backoff_ms: DEFAULT_MAX_BACKOFF_MS,
        }
    }
}

impl FeedConfig {
    #[must_use]
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.snapshot_debounce_ms)
    }
}

/// Link-preview service endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MindlineConfig {
    pub feed: FeedConfig,
    pub gesture: GestureConfig,
    /// Emoji used by the double-tap shortcut.
    pub like_emoji: String,
    /// `None` disables link previews.
    pub preview: Option<PreviewConfig>,
}

impl Default for MindlineConfig {
    fn default() -> Self {
        Self {
            feed: FeedConfig::default(),
            gesture: GestureConfig::default(),
            like_emoji: DEFAULT_LIKE_EMOJI.to_string(),
            preview: None,
        }
    }
}

impl MindlineConfig {
    /// Load a `.env` file if present, then read the environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when a variable fails validation.
    pub fn load() -> Result<Self, ConfigError> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!(path = %path.display(), "loaded .env");
        }
        Self::from_env()
    }

    /// Build typed config from `MINDLINE_*` environment variables.
    ///
    /// Optional (defaults in parentheses):
    /// - `MINDLINE_CHAT_PAGE_SIZE` (50)
    /// - `MINDLINE_SNAPSHOT_DEBOUNCE_MS` (30)
    /// - `MINDLINE_RECONNECT_BACKOFF_MS` (1000)
    /// - `MINDLINE_MAX_BACKOFF_MS` (10000)
    /// - `MINDLINE_SWIPE_THRESHOLD_PX` (80)
    /// - `MINDLINE_MAX_SWIPE_PX` (120)
    /// - `MINDLINE_LONG_PRESS_MS` (500)
    /// - `MINDLINE_DOUBLE_TAP_MS` (300)
    /// - `MINDLINE_LIKE_EMOJI` (❤️)
    /// - `MINDLINE_PREVIEW_BASE_URL` (unset: previews disabled)
    /// - `MINDLINE_PREVIEW_TIMEOUT_SECS` (8)
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the page size is zero or the swipe
    /// threshold exceeds the visual clamp.
    pub fn from_env() -> Result<Self, ConfigError> {
        let feed = FeedConfig {
            page_size: env_parse("MINDLINE_CHAT_PAGE_SIZE", DEFAULT_CHAT_PAGE_SIZE),
            snapshot_debounce_ms: env_parse("MINDLINE_SNAPSHOT_DEBOUNCE_MS", DEFAULT_SNAPSHOT_DEBOUNCE_MS),
            reconnect_backoff_ms: env_parse("MINDLINE_RECONNECT_BACKOFF_MS", DEFAULT_RECONNECT_BACKOFF_MS),
            max_backoff_ms: env_parse("MINDLINE_MAX_BACKOFF_MS", DEFAULT_MAX_BACKOFF_MS),
        };
        if feed.page_size == 0 {
            return Err(ConfigError::Invalid { var: "MINDLINE_CHAT_PAGE_SIZE".into(), value: "0".into() });
        }

        let gesture = GestureConfig {
            swipe_threshold_px: env_parse("MINDLINE_SWIPE_THRESHOLD_PX", DEFAULT_SWIPE_THRESHOLD_PX),
            max_swipe_px: env_parse("MINDLINE_MAX_SWIPE_PX", DEFAULT_MAX_SWIPE_PX),
            long_press_ms: env_parse("MINDLINE_LONG_PRESS_MS", DEFAULT_LONG_PRESS_MS),
            double_tap_ms: env_parse("MINDLINE_DOUBLE_TAP_MS", DEFAULT_DOUBLE_TAP_MS),
        };
        if gesture.swipe_threshold_px > gesture.max_swipe_px {
            return Err(ConfigError::Invalid {
                var: "MINDLINE_SWIPE_THRESHOLD_PX".into(),
                value: gesture.swipe_threshold_px.to_string(),
            });
        }

        let like_emoji = std::env::var("MINDLINE_LIKE_EMOJI")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_LIKE_EMOJI.to_string());

        let preview = std::env::var("MINDLINE_PREVIEW_BASE_URL")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(|base| PreviewConfig {
                base_url: base.trim_end_matches('/').to_string(),
                timeout_secs: env_parse("MINDLINE_PREVIEW_TIMEOUT_SECS", DEFAULT_PREVIEW_TIMEOUT_SECS),
            });

        Ok(Self { feed, gesture, like_emoji, preview })
    }
}

pub(crate) fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
