use serde::{Deserialize, Serialize};

/// Runtime configuration for the engine.
///
/// Everything else (pad counts, voice pool size, ring sizes) is a
/// compile-time constant in [`crate::engine`], matching the fixed memory
/// layout of the hardware unit this engine drives.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Output sample rate in Hz (44100 or 48000 typical).
    pub sample_rate: u32,
    /// Frames per render block.
    pub block_size: usize,
    /// Start with the built-in demo sequencer running.
    pub demo_mode: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48_000,
            block_size: 128,
            demo_mode: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_json_round_trip() {
        let config = EngineConfig {
            sample_rate: 44_100,
            block_size: 64,
            demo_mode: true,
        };
        let json = serde_json::to_string(&config).unwrap();
        let back: EngineConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.sample_rate, 44_100);
        assert_eq!(back.block_size, 64);
        assert!(back.demo_mode);
    }

    #[test]
    fn test_config_defaults_fill_missing_fields() {
        let config: EngineConfig = serde_json::from_str("{\"sample_rate\": 44100}").unwrap();
        assert_eq!(config.sample_rate, 44_100);
        assert_eq!(config.block_size, 128);
        assert!(!config.demo_mode);
    }
}
