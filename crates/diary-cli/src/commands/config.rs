//! Config command handlers

use std::path::PathBuf;

use anyhow::{bail, Context, Result};

use diary_core::Config;

use crate::output::{Output, OutputFormat};

/// Show current configuration
pub fn show(config_path: Option<&PathBuf>, output: &Output) -> Result<()> {
    let config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "data_dir": config.data_dir,
                    "sync_url": config.sync_url,
                    "sync_code": config.sync_code,
                    "api_key_set": config.api_key.is_some(),
                    "request_timeout_secs": config.request_timeout_secs,
                    "startup_delay_ms": config.startup_delay_ms,
                    "edit_debounce_ms": config.edit_debounce_ms,
                    "status_display_secs": config.status_display_secs,
                    "log_file": config.log_file,
                    "subgroups": config.subgroups
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", config.data_dir.display());
        }
        OutputFormat::Human => {
            let effective_path = config_path
                .cloned()
                .unwrap_or_else(Config::config_file_path);
            println!("Configuration:");
            println!("  data_dir:             {}", config.data_dir.display());
            println!("  sync_url:             {}", config.sync_url);
            println!(
                "  sync_code:            {}",
                config.sync_code.as_deref().unwrap_or("(from settings)")
            );
            println!(
                "  api_key:              {}",
                if config.api_key.is_some() {
                    "(set)"
                } else {
                    "(not set)"
                }
            );
            println!("  request_timeout_secs: {}", config.request_timeout_secs);
            println!("  startup_delay_ms:     {}", config.startup_delay_ms);
            println!("  edit_debounce_ms:     {}", config.edit_debounce_ms);
            println!("  status_display_secs:  {}", config.status_display_secs);
            println!(
                "  log_file:             {}",
                config
                    .log_file
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "(not set)".to_string())
            );
            println!();
            println!("Config file: {}", effective_path.display());
        }
    }

    Ok(())
}

/// Set a configuration value
///
/// Only the named key is rewritten; the rest of the file, including an
/// `api_key`, stays as it is. The API key itself is not settable here.
pub fn set(
    key: String,
    value: String,
    config_path: Option<&PathBuf>,
    output: &Output,
) -> Result<()> {
    let mut config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;

    apply(&mut config, &key, &value)?;

    // Save to the CLI-specified path or default
    let save_path = config_path
        .cloned()
        .unwrap_or_else(Config::config_file_path);
    config
        .save_key_to_path(&key, &save_path)
        .context("Failed to save configuration")?;

    output.success(&format!("Set {} = {}", key, value));

    Ok(())
}

fn apply(config: &mut Config, key: &str, value: &str) -> Result<()> {
    let cleared = value.is_empty() || value == "none";

    match key {
        "data_dir" => {
            config.data_dir = value.into();
        }
        "sync_url" => {
            if cleared {
                bail!("sync_url cannot be empty");
            }
            config.sync_url = value.trim_end_matches('/').to_string();
        }
        "sync_code" => {
            config.sync_code = (!cleared).then(|| value.trim().to_string());
        }
        "request_timeout_secs" => {
            config.request_timeout_secs = parse_positive(key, value)?;
        }
        "startup_delay_ms" => {
            config.startup_delay_ms = value
                .parse()
                .with_context(|| format!("Invalid value for {}", key))?;
        }
        "edit_debounce_ms" => {
            config.edit_debounce_ms = value
                .parse()
                .with_context(|| format!("Invalid value for {}", key))?;
        }
        "status_display_secs" => {
            config.status_display_secs = value
                .parse()
                .with_context(|| format!("Invalid value for {}", key))?;
        }
        "log_file" => {
            config.log_file = (!cleared).then(|| value.into());
        }
        _ => {
            bail!(
                "Unknown configuration key: '{}'\n\
                 Valid keys: data_dir, sync_url, sync_code, request_timeout_secs, \
                 startup_delay_ms, edit_debounce_ms, status_display_secs, log_file",
                key
            );
        }
    }

    Ok(())
}

fn parse_positive(key: &str, value: &str) -> Result<u64> {
    let parsed: u64 = value
        .parse()
        .with_context(|| format!("Invalid value for {}", key))?;
    if parsed == 0 {
        bail!("{} must be greater than zero", key);
    }
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_sync_code() {
        let mut config = Config::default();
        apply(&mut config, "sync_code", " class_diary_2025 ").unwrap();
        assert_eq!(config.sync_code.as_deref(), Some("class_diary_2025"));

        apply(&mut config, "sync_code", "none").unwrap();
        assert!(config.sync_code.is_none());
    }

    #[test]
    fn test_apply_timing() {
        let mut config = Config::default();
        apply(&mut config, "edit_debounce_ms", "2500").unwrap();
        assert_eq!(config.edit_debounce_ms, 2500);

        assert!(apply(&mut config, "request_timeout_secs", "0").is_err());
        assert!(apply(&mut config, "startup_delay_ms", "soon").is_err());
    }

    #[test]
    fn test_apply_rejects_unknown_and_empty_url() {
        let mut config = Config::default();
        assert!(apply(&mut config, "api_key", "secret").is_err());
        assert!(apply(&mut config, "sync_url", "").is_err());

        apply(&mut config, "sync_url", "http://localhost:8080/b/").unwrap();
        assert_eq!(config.sync_url, "http://localhost:8080/b");
    }

    #[test]
    fn test_set_writes_config_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            format!("data_dir = {:?}\n", dir.path().join("data").display().to_string()),
        )
        .unwrap();

        let output = Output::new(OutputFormat::Quiet);
        set("edit_debounce_ms".into(), "750".into(), Some(&path), &output).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("edit_debounce_ms = 750"));
        assert!(!written.contains("api_key"));
        assert!(!written.contains("sync_url"));
    }

    #[test]
    fn test_set_keeps_api_key_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            format!(
                "data_dir = {:?}\napi_key = \"secret\"\n",
                dir.path().join("data").display().to_string()
            ),
        )
        .unwrap();

        let output = Output::new(OutputFormat::Quiet);
        set("request_timeout_secs".into(), "30".into(), Some(&path), &output).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("api_key = \"secret\""));
        assert!(written.contains("request_timeout_secs = 30"));
    }
}
