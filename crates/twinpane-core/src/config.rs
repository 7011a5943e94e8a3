//! Engine configuration types.

use std::time::Duration;

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

/// Default copy buffer size (80 KiB).
pub const DEFAULT_CHUNK_SIZE: usize = 80 * 1024;

/// Configuration shared by the transfer and deletion engines.
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct EngineConfig {
    /// Copy buffer size in bytes. Cancellation is checked once per chunk.
    #[builder(default = "DEFAULT_CHUNK_SIZE")]
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Delay between deletion items, in milliseconds.
    #[builder(default = "25")]
    #[serde(default = "default_delete_pacing_ms")]
    pub delete_pacing_ms: u64,

    /// Copy modification, access and (on Windows) creation times.
    #[builder(default = "true")]
    #[serde(default = "default_true")]
    pub preserve_timestamps: bool,

    /// Copy attribute bits and Unix permissions.
    #[builder(default = "true")]
    #[serde(default = "default_true")]
    pub preserve_attributes: bool,

    /// Measure the whole source tree before transferring anything.
    #[builder(default = "false")]
    #[serde(default)]
    pub precompute_totals: bool,

    /// Send replaced destination items to the recycle bin instead of
    /// deleting them outright.
    #[builder(default = "true")]
    #[serde(default = "default_true")]
    pub recycle_replaced: bool,

    /// Capacity of the event channel between a worker and its UI.
    #[builder(default = "100")]
    #[serde(default = "default_channel_size")]
    pub channel_size: usize,
}

fn default_true() -> bool {
    true
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

fn default_delete_pacing_ms() -> u64 {
    25
}

fn default_channel_size() -> usize {
    100
}

impl EngineConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        if self.chunk_size == Some(0) {
            return Err("Chunk size must be greater than zero".to_string());
        }
        if self.channel_size == Some(0) {
            return Err("Channel size must be greater than zero".to_string());
        }
        Ok(())
    }
}

impl EngineConfig {
    /// Create a new engine config builder.
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::default()
    }

    /// The pause inserted between deletion items.
    pub fn delete_pacing(&self) -> Duration {
        Duration::from_millis(self.delete_pacing_ms)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            delete_pacing_ms: default_delete_pacing_ms(),
            preserve_timestamps: true,
            preserve_attributes: true,
            precompute_totals: false,
            recycle_replaced: true,
            channel_size: default_channel_size(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = EngineConfig::builder()
            .chunk_size(4096usize)
            .delete_pacing_ms(0u64)
            .precompute_totals(true)
            .build()
            .unwrap();

        assert_eq!(config.chunk_size, 4096);
        assert_eq!(config.delete_pacing(), Duration::ZERO);
        assert!(config.precompute_totals);
        assert!(config.recycle_replaced);
    }

    #[test]
    fn test_config_defaults_match_builder() {
        let built = EngineConfig::builder().build().unwrap();
        let default = EngineConfig::default();

        assert_eq!(built.chunk_size, default.chunk_size);
        assert_eq!(built.delete_pacing_ms, default.delete_pacing_ms);
        assert_eq!(built.channel_size, default.channel_size);
        assert_eq!(default.chunk_size, 81920);
    }

    #[test]
    fn test_config_rejects_zero_chunk() {
        assert!(EngineConfig::builder().chunk_size(0usize).build().is_err());
        assert!(EngineConfig::builder().channel_size(0usize).build().is_err());
    }

    #[test]
    fn test_config_deserializes_with_defaults() {
        let config: EngineConfig = serde_json::from_str(r#"{"precompute_totals": true}"#).unwrap();
        assert!(config.precompute_totals);
        assert_eq!(config.chunk_size, DEFAULT_CHUNK_SIZE);
        assert!(config.preserve_timestamps);
    }
}
