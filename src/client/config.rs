use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::codec::GridLayout;
use crate::error::{Error, Result};

/// Client configuration
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub base_url: String,
    /// Grid maxima, mirrored from `--button-grid-count-x/-y`
    pub grid_max_x: i64,
    pub grid_max_y: i64,
    /// Buttons per tile; must be a perfect square
    pub page_size: usize,
    pub tile_width: f64,
    pub tile_height: f64,
    pub viewport_width: f64,
    pub viewport_height: f64,
    /// Pre-render slack around the viewport, in pixels
    pub visibility_margin: f64,
    pub tick_interval_ms: u64,
    /// Raw touch moves skipped between emitted pan deltas
    pub touch_throttle: u32,
    pub request_timeout_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8080".into(),
            grid_max_x: 4096,
            grid_max_y: 2500,
            page_size: 100,
            tile_width: 320.0,
            tile_height: 320.0,
            viewport_width: 1280.0,
            viewport_height: 720.0,
            visibility_margin: 10.0,
            tick_interval_ms: 1000,
            touch_throttle: 5,
            request_timeout_ms: 30_000,
        }
    }
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Defaults overridden by `BUTTON_CANVAS_URL`, `BUTTON_GRID_COUNT_X` and
    /// `BUTTON_GRID_COUNT_Y`.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        if let Ok(url) = std::env::var("BUTTON_CANVAS_URL") {
            config.base_url = url;
        }
        if let Some(x) = env_number("BUTTON_GRID_COUNT_X")? {
            config.grid_max_x = x;
        }
        if let Some(y) = env_number("BUTTON_GRID_COUNT_Y")? {
            config.grid_max_y = y;
        }
        config.validate()?;
        Ok(config)
    }

    /// Load a JSON config file; missing fields keep their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let data = std::fs::read(path).map_err(|e| Error::Io(e.to_string()))?;
        let config: Self = serde_json::from_slice(&data).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.grid_max_x < 1 || self.grid_max_y < 1 {
            return Err(Error::Config(format!(
                "grid maxima must be positive, got {}x{}",
                self.grid_max_x, self.grid_max_y
            )));
        }
        let row = self.layout().row_length();
        if self.page_size == 0 || row * row != self.page_size {
            return Err(Error::Config(format!("page size {} is not a square", self.page_size)));
        }
        if self.tile_width <= 0.0 || self.tile_height <= 0.0 {
            return Err(Error::Config("tile size must be positive".into()));
        }
        if self.tick_interval_ms == 0 {
            return Err(Error::Config("tick interval must be non-zero".into()));
        }
        if self.request_timeout_ms == 0 {
            return Err(Error::Config("request timeout must be non-zero".into()));
        }
        Ok(())
    }

    pub fn layout(&self) -> GridLayout {
        GridLayout::new(self.grid_max_x, self.page_size)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

fn env_number(name: &str) -> Result<Option<i64>> {
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| Error::Config(format!("{name} is not a number: {raw:?}"))),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_config() {
        let config = ClientConfig::new("http://canvas.test");
        assert_eq!(config.base_url, "http://canvas.test");
        assert_eq!(config.grid_max_x, 4096);
        assert_eq!(config.tick_interval(), Duration::from_secs(1));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config: ClientConfig = serde_json::from_str(r#"{"grid_max_x": 16, "page_size": 64}"#).unwrap();
        assert_eq!(config.grid_max_x, 16);
        assert_eq!(config.grid_max_y, 2500);
        assert_eq!(config.layout().row_length(), 8);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let bad_page = ClientConfig { page_size: 90, ..ClientConfig::default() };
        assert!(matches!(bad_page.validate(), Err(Error::Config(_))));
        let bad_grid = ClientConfig { grid_max_y: 0, ..ClientConfig::default() };
        assert!(bad_grid.validate().is_err());
        let bad_tile = ClientConfig { tile_width: 0.0, ..ClientConfig::default() };
        assert!(bad_tile.validate().is_err());
        let no_tick = ClientConfig { tick_interval_ms: 0, ..ClientConfig::default() };
        assert!(matches!(no_tick.validate(), Err(Error::Config(_))));
        let no_timeout = ClientConfig { request_timeout_ms: 0, ..ClientConfig::default() };
        assert!(matches!(no_timeout.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_json_zero_tick_interval_rejected() {
        let path = std::env::temp_dir().join(format!("button-canvas-zero-tick-{}.json", std::process::id()));
        std::fs::write(&path, r#"{"tick_interval_ms": 0}"#).unwrap();
        let result = ClientConfig::from_json_file(&path);
        let _ = std::fs::remove_file(&path);
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_from_json_file() {
        let path = std::env::temp_dir().join(format!("button-canvas-config-{}.json", std::process::id()));
        std::fs::write(&path, r#"{"base_url": "http://example.test", "tick_interval_ms": 250}"#).unwrap();
        let config = ClientConfig::from_json_file(&path).unwrap();
        assert_eq!(config.base_url, "http://example.test");
        assert_eq!(config.tick_interval(), Duration::from_millis(250));
        let _ = std::fs::remove_file(&path);
    }
}
