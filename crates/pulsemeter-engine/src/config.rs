//! Engine configuration

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Default strftime-style format for dates written to interval sinks
pub const DEFAULT_DATE_FORMAT: &str = "%d.%m.%Y";

/// Metering engine settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSettings {
    /// Format for interval boundary dates written to from/to sinks
    pub date_format: String,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            date_format: DEFAULT_DATE_FORMAT.to_string(),
        }
    }
}

impl EngineSettings {
    /// Load settings from environment variables
    pub fn load() -> Result<Self> {
        // Try to load .env file
        let _ = dotenvy::dotenv();

        let mut cfg = Self::default();

        if let Ok(format) = std::env::var("PULSEMETER_DATE_FORMAT") {
            cfg.date_format = format;
        }

        Ok(cfg)
    }
}
