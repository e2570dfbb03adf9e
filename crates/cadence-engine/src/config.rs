//! Context configuration.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Highest bus index either bus table may be configured to hold.
pub const MAX_BUSES: usize = 4096;

/// Settings a [`Context`](crate::Context) is built from.
///
/// Missing JSON fields take their defaults. Out-of-range values are
/// sanitised by [`validated`](Self::validated) rather than rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextConfig {
    pub sample_rate: u32,
    /// Samples per realtime clock tick.
    pub block_size: usize,
    pub bpm: f64,
    pub max_audio_buses: usize,
    pub max_control_buses: usize,
    /// When set, the context renders offline in a single block of this length.
    pub render_duration: Option<f64>,
    pub max_render_seconds: f64,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44_100,
            block_size: 1024,
            bpm: 120.0,
            max_audio_buses: 32,
            max_control_buses: 128,
            render_duration: None,
            max_render_seconds: 3600.0,
        }
    }
}

impl ContextConfig {
    /// Offline configuration rendering `duration` seconds.
    pub fn offline(duration: f64) -> Self {
        Self {
            render_duration: Some(duration),
            ..Self::default()
        }
    }

    /// Parse a JSON config and sanitise it.
    pub fn from_json(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text)?;
        Ok(config.validated())
    }

    /// Whether this renders a single offline block.
    pub fn is_offline(&self) -> bool {
        self.render_duration.is_some()
    }

    /// Replace unusable values with defaults.
    pub fn validated(mut self) -> Self {
        let defaults = Self::default();
        if self.sample_rate == 0 {
            log::warn!("sample_rate 0 replaced by {}", defaults.sample_rate);
            self.sample_rate = defaults.sample_rate;
        }
        if self.block_size == 0 {
            log::warn!("block_size 0 replaced by {}", defaults.block_size);
            self.block_size = defaults.block_size;
        }
        if !self.bpm.is_finite() || self.bpm <= 0.0 {
            log::warn!("bpm {} replaced by {}", self.bpm, defaults.bpm);
            self.bpm = defaults.bpm;
        }
        if !self.max_render_seconds.is_finite() || self.max_render_seconds < 0.0 {
            log::warn!(
                "max_render_seconds {} replaced by {}",
                self.max_render_seconds,
                defaults.max_render_seconds
            );
            self.max_render_seconds = defaults.max_render_seconds;
        }
        if self.max_audio_buses > MAX_BUSES {
            log::warn!("max_audio_buses {} clamped to {MAX_BUSES}", self.max_audio_buses);
            self.max_audio_buses = MAX_BUSES;
        }
        if self.max_control_buses > MAX_BUSES {
            log::warn!("max_control_buses {} clamped to {MAX_BUSES}", self.max_control_buses);
            self.max_control_buses = MAX_BUSES;
        }
        if let Some(d) = self.render_duration {
            if !d.is_finite() {
                log::warn!("render_duration {d} replaced by 0");
                self.render_duration = Some(0.0);
            }
        }
        self
    }

    /// Seconds covered by one realtime clock tick.
    pub fn block_duration(&self) -> f64 {
        self.block_size as f64 / self.sample_rate as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let config = ContextConfig::from_json(r#"{ "bpm": 90, "block_size": 512 }"#).unwrap();
        assert_eq!(config.bpm, 90.0);
        assert_eq!(config.block_size, 512);
        assert_eq!(config.sample_rate, 44_100);
        assert_eq!(config.render_duration, None);
    }

    #[test]
    fn bad_values_are_sanitised() {
        let config =
            ContextConfig::from_json(r#"{ "sample_rate": 0, "bpm": -3, "block_size": 0 }"#)
                .unwrap();
        assert_eq!(config, ContextConfig::default());

        let config = ContextConfig::from_json(
            r#"{ "max_audio_buses": 18446744073709551615, "max_control_buses": 1000000000 }"#,
        )
        .unwrap();
        assert_eq!(config.max_audio_buses, MAX_BUSES);
        assert_eq!(config.max_control_buses, MAX_BUSES);
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(ContextConfig::from_json("{ bpm: }").is_err());
    }

    #[test]
    fn offline_sets_render_duration() {
        let config = ContextConfig::offline(2.5);
        assert!(config.is_offline());
        assert_eq!(config.render_duration, Some(2.5));
    }

    #[test]
    fn realtime_block_duration() {
        let config = ContextConfig {
            sample_rate: 1000,
            block_size: 250,
            ..ContextConfig::default()
        };
        assert_eq!(config.block_duration(), 0.25);
    }
}
