//! Engine configuration
//!
//! Configuration can be created programmatically, loaded from a TOML file,
//! or read from `TAKEOFF_*` environment variables. Every loader validates
//! the result before returning it.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::Path;
use std::time::Duration;

/// Errors that can occur while loading configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for configuration key {key}: {reason}")]
    InvalidValue { key: String, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("TOML serialization error: {0}")]
    Serialize(#[from] toml::ser::Error),
}

impl ConfigError {
    fn invalid(key: &str, reason: impl Into<String>) -> Self {
        ConfigError::InvalidValue {
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Tunables of the takeoff engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Line hit-test tolerance in screen pixels
    pub hit_tolerance_px: f64,
    /// Distance to the first vertex (screen pixels) that closes a polygon
    pub close_radius_px: f64,
    pub min_zoom: f64,
    pub max_zoom: f64,
    /// Factor applied by `zoom_in`
    pub zoom_in_step: f64,
    /// Factor applied by `zoom_out`
    pub zoom_out_step: f64,
    /// Factor applied per wheel notch scrolling up
    pub wheel_zoom_in_step: f64,
    /// Factor applied per wheel notch scrolling down
    pub wheel_zoom_out_step: f64,
    /// Target scale passed to the page renderer
    pub render_scale: f32,
    /// Unit label for pages without an explicit unit
    pub default_unit: String,
    /// Angle increment for Shift-constrained lines, in degrees
    pub angle_snap_degrees: f64,
    /// Redraw quiet period in milliseconds
    pub redraw_quiet_ms: u64,
    /// Maximum redraw latency during continuous input, in milliseconds
    pub redraw_max_latency_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            hit_tolerance_px: 10.0,
            close_radius_px: 15.0,
            min_zoom: 0.5,
            max_zoom: 5.0,
            zoom_in_step: 1.2,
            zoom_out_step: 0.8,
            wheel_zoom_in_step: 1.1,
            wheel_zoom_out_step: 0.9,
            render_scale: 1.5,
            default_unit: "ft".to_string(),
            angle_snap_degrees: 45.0,
            redraw_quiet_ms: 16,
            redraw_max_latency_ms: 100,
        }
    }
}

impl EngineConfig {
    pub fn with_hit_tolerance(mut self, px: f64) -> Self {
        self.hit_tolerance_px = px;
        self
    }

    pub fn with_close_radius(mut self, px: f64) -> Self {
        self.close_radius_px = px;
        self
    }

    pub fn with_zoom_limits(mut self, min_zoom: f64, max_zoom: f64) -> Self {
        self.min_zoom = min_zoom;
        self.max_zoom = max_zoom;
        self
    }

    pub fn with_render_scale(mut self, scale: f32) -> Self {
        self.render_scale = scale;
        self
    }

    pub fn with_default_unit(mut self, unit: impl Into<String>) -> Self {
        self.default_unit = unit.into();
        self
    }

    pub fn with_redraw_timing(mut self, quiet_ms: u64, max_latency_ms: u64) -> Self {
        self.redraw_quiet_ms = quiet_ms;
        self.redraw_max_latency_ms = max_latency_ms;
        self
    }

    pub fn redraw_quiet_period(&self) -> Duration {
        Duration::from_millis(self.redraw_quiet_ms)
    }

    pub fn redraw_max_latency(&self) -> Duration {
        Duration::from_millis(self.redraw_max_latency_ms)
    }

    /// Check every value is usable
    pub fn validate(&self) -> ConfigResult<()> {
        positive("hit_tolerance_px", self.hit_tolerance_px)?;
        positive("close_radius_px", self.close_radius_px)?;
        positive("min_zoom", self.min_zoom)?;
        positive("max_zoom", self.max_zoom)?;
        if self.min_zoom > 1.0 || self.max_zoom < 1.0 {
            return Err(ConfigError::invalid(
                "min_zoom",
                format!(
                    "zoom range [{}, {}] must include 1.0",
                    self.min_zoom, self.max_zoom
                ),
            ));
        }
        zoom_factor("zoom_in_step", self.zoom_in_step, true)?;
        zoom_factor("zoom_out_step", self.zoom_out_step, false)?;
        zoom_factor("wheel_zoom_in_step", self.wheel_zoom_in_step, true)?;
        zoom_factor("wheel_zoom_out_step", self.wheel_zoom_out_step, false)?;
        positive("render_scale", f64::from(self.render_scale))?;
        positive("angle_snap_degrees", self.angle_snap_degrees)?;
        if self.default_unit.trim().is_empty() {
            return Err(ConfigError::invalid("default_unit", "must not be empty"));
        }
        if self.redraw_max_latency_ms < self.redraw_quiet_ms {
            return Err(ConfigError::invalid(
                "redraw_max_latency_ms",
                "must not be shorter than redraw_quiet_ms",
            ));
        }
        Ok(())
    }

    /// Load configuration from a TOML file
    ///
    /// Missing keys fall back to their defaults:
    /// ```toml
    /// hit_tolerance_px = 12.0
    /// default_unit = "m"
    /// render_scale = 2.0
    /// ```
    pub fn from_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let contents = fs::read_to_string(path.as_ref())?;
        Self::from_toml(&contents)
    }

    /// Parse configuration from a TOML string
    pub fn from_toml(toml_str: &str) -> ConfigResult<Self> {
        let config: Self = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration as TOML
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> ConfigResult<()> {
        let contents = toml::to_string_pretty(self)?;
        fs::write(path.as_ref(), contents)?;
        Ok(())
    }

    /// Defaults overridden by environment variables
    ///
    /// - `TAKEOFF_HIT_TOLERANCE`: line hit tolerance in px
    /// - `TAKEOFF_CLOSE_RADIUS`: polygon close radius in px
    /// - `TAKEOFF_RENDER_SCALE`: renderer target scale
    /// - `TAKEOFF_UNIT`: default unit label
    /// - `TAKEOFF_REDRAW_QUIET_MS`: redraw quiet period
    pub fn from_env() -> ConfigResult<Self> {
        Self::default().apply_env()
    }

    /// Apply `TAKEOFF_*` overrides on top of this configuration
    pub fn apply_env(mut self) -> ConfigResult<Self> {
        if let Some(value) = env_parse::<f64>("TAKEOFF_HIT_TOLERANCE")? {
            self.hit_tolerance_px = value;
        }
        if let Some(value) = env_parse::<f64>("TAKEOFF_CLOSE_RADIUS")? {
            self.close_radius_px = value;
        }
        if let Some(value) = env_parse::<f32>("TAKEOFF_RENDER_SCALE")? {
            self.render_scale = value;
        }
        if let Ok(unit) = std::env::var("TAKEOFF_UNIT") {
            self.default_unit = unit;
        }
        if let Some(value) = env_parse::<u64>("TAKEOFF_REDRAW_QUIET_MS")? {
            self.redraw_quiet_ms = value;
        }

        self.validate()?;
        Ok(self)
    }
}

fn positive(key: &str, value: f64) -> ConfigResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::invalid(key, format!("must be positive, got {value}")))
    }
}

/// Zoom-in factors must exceed 1.0, zoom-out factors must lie in (0, 1)
fn zoom_factor(key: &str, value: f64, zooms_in: bool) -> ConfigResult<()> {
    let valid = if zooms_in {
        value.is_finite() && value > 1.0
    } else {
        value > 0.0 && value < 1.0
    };
    if valid {
        Ok(())
    } else if zooms_in {
        Err(ConfigError::invalid(key, "must be greater than 1.0"))
    } else {
        Err(ConfigError::invalid(key, "must be between 0.0 and 1.0"))
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> ConfigResult<Option<T>> {
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::invalid(key, format!("cannot parse '{raw}'"))),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    const ENV_KEYS: [&str; 5] = [
        "TAKEOFF_HIT_TOLERANCE",
        "TAKEOFF_CLOSE_RADIUS",
        "TAKEOFF_RENDER_SCALE",
        "TAKEOFF_UNIT",
        "TAKEOFF_REDRAW_QUIET_MS",
    ];

    fn clear_env() {
        for key in ENV_KEYS {
            std::env::remove_var(key);
        }
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.hit_tolerance_px, 10.0);
        assert_eq!(config.close_radius_px, 15.0);
        assert_eq!(config.default_unit, "ft");
        assert_eq!(config.redraw_quiet_period(), Duration::from_millis(16));
    }

    #[test]
    fn test_builder() {
        let config = EngineConfig::default()
            .with_hit_tolerance(4.0)
            .with_close_radius(8.0)
            .with_zoom_limits(0.25, 8.0)
            .with_render_scale(2.0)
            .with_default_unit("m")
            .with_redraw_timing(10, 50);
        assert_eq!(config.hit_tolerance_px, 4.0);
        assert_eq!(config.min_zoom, 0.25);
        assert_eq!(config.default_unit, "m");
        assert_eq!(config.redraw_max_latency(), Duration::from_millis(50));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let bad = [
            EngineConfig::default().with_hit_tolerance(0.0),
            EngineConfig::default().with_zoom_limits(2.0, 5.0),
            EngineConfig::default().with_render_scale(-1.0),
            EngineConfig::default().with_default_unit("  "),
            EngineConfig::default().with_redraw_timing(100, 10),
        ];
        for config in bad {
            assert!(
                matches!(config.validate(), Err(ConfigError::InvalidValue { .. })),
                "accepted {config:?}"
            );
        }
    }

    #[test]
    fn test_from_toml_partial() {
        let config = EngineConfig::from_toml("default_unit = \"m\"\nhit_tolerance_px = 6.0\n").unwrap();
        assert_eq!(config.default_unit, "m");
        assert_eq!(config.hit_tolerance_px, 6.0);
        assert_eq!(config.close_radius_px, 15.0);
    }

    #[test]
    fn test_from_toml_invalid() {
        assert!(matches!(
            EngineConfig::from_toml("hit_tolerance_px = \"wide\""),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            EngineConfig::from_toml("min_zoom = 3.0"),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_file_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("takeoff.toml");
        let config = EngineConfig::default().with_default_unit("m").with_render_scale(2.0);
        config.save_to_file(&path).unwrap();
        assert_eq!(EngineConfig::from_file(&path).unwrap(), config);
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            EngineConfig::from_file("/no/such/takeoff.toml"),
            Err(ConfigError::Io(_))
        ));
    }

    #[test]
    #[serial]
    fn test_from_env_overrides() {
        clear_env();
        std::env::set_var("TAKEOFF_HIT_TOLERANCE", "12.5");
        std::env::set_var("TAKEOFF_UNIT", "m");
        let config = EngineConfig::from_env().unwrap();
        clear_env();

        assert_eq!(config.hit_tolerance_px, 12.5);
        assert_eq!(config.default_unit, "m");
        assert_eq!(config.close_radius_px, 15.0);
    }

    #[test]
    #[serial]
    fn test_from_env_invalid_number() {
        clear_env();
        std::env::set_var("TAKEOFF_RENDER_SCALE", "big");
        let result = EngineConfig::from_env();
        clear_env();

        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue { ref key, .. }) if key == "TAKEOFF_RENDER_SCALE"
        ));
    }

    #[test]
    #[serial]
    fn test_from_env_without_variables_is_default() {
        clear_env();
        assert_eq!(EngineConfig::from_env().unwrap(), EngineConfig::default());
    }
}
