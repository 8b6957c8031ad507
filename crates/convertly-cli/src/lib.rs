//! Shared helpers for the `convertly` binary.

use anyhow::{anyhow, Result};
use serde_json::{Map, Value};

/// Initialize tracing for the CLI. Logs go to stderr so stdout stays JSON.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();
}

/// Parse one `key=value` conversion option.
///
/// Values that parse as JSON (`true`, `3`, `[1,2]`) keep their type;
/// anything else is sent as a string.
pub fn parse_option(raw: &str) -> Result<(String, Value)> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| anyhow!("Option must be key=value: {}", raw))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(anyhow!("Option key is empty: {}", raw));
    }

    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((key.to_string(), value))
}

/// Collect `--option` flags into the request's options object.
pub fn options_from_args(raw: &[String]) -> Result<Option<Map<String, Value>>> {
    if raw.is_empty() {
        return Ok(None);
    }
    let mut options = Map::new();
    for item in raw {
        let (key, value) = parse_option(item)?;
        options.insert(key, value);
    }
    Ok(Some(options))
}
