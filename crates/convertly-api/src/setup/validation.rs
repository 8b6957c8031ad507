//! Startup configuration checks

use anyhow::Result;
use convertly_core::Config;

/// Fail fast on invalid settings; warn on risky but legal ones.
pub fn validate_config(config: &Config) -> Result<()> {
    config.validate()?;

    if config.is_production() && config.cors_origins().iter().any(|o| o == "*") {
        return Err(anyhow::anyhow!(
            "CORS configured to allow all origins (*) in production. \
            Set explicit origins via CORS_ORIGINS."
        ));
    }

    if config.max_poll_attempts() > 600 {
        tracing::warn!(
            max_poll_attempts = config.max_poll_attempts(),
            "Very high poll ceiling; batch requests may hold connections for a long time"
        );
    }

    tracing::info!("Configuration validation passed");
    Ok(())
}
