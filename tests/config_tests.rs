// Tests for configuration loading
//
// Config files are written to a scratch directory and loaded by name,
// the same way the binary loads config/voice-memo-recorder.toml.

use anyhow::Result;
use std::fs;
use std::time::Duration;
use tempfile::TempDir;
use tracing::Level;
use voice_memo_recorder::{Config, RecorderSettings};

fn write_config(dir: &TempDir, contents: &str) -> Result<String> {
    let path = dir.path().join("recorder.toml");
    fs::write(&path, contents)?;
    Ok(dir.path().join("recorder").display().to_string())
}

#[test]
fn test_load_full_config() -> Result<()> {
    let dir = TempDir::new()?;
    let name = write_config(
        &dir,
        r#"
[recorder]
format_id = "lpcm"
sample_rate = 44100
channels = 2
encoder_quality = "max"

[session]
tick_interval_ms = 250
command_buffer = 8

[logging]
level = "debug"
"#,
    )?;

    let cfg = Config::load(&name)?;
    let settings = cfg.recorder_settings();

    assert_eq!(settings.format_id(), Some("lpcm"));
    assert_eq!(settings.sample_rate(), Some(44100));
    assert_eq!(settings.channels(), Some(2));
    assert_eq!(settings.encoder_quality(), Some("max"));

    let session = cfg.to_session_config();
    assert_eq!(session.tick_interval, Duration::from_millis(250));
    assert_eq!(session.command_buffer, 8);
    assert_eq!(cfg.log_level()?, Level::DEBUG);

    Ok(())
}

#[test]
fn test_partial_config_keeps_defaults() -> Result<()> {
    let dir = TempDir::new()?;
    let name = write_config(
        &dir,
        r#"
[recorder]
sample_rate = 22050
"#,
    )?;

    let cfg = Config::load(&name)?;
    let settings = cfg.recorder_settings();

    assert_eq!(settings.sample_rate(), Some(22050));
    assert_eq!(settings.format_id(), Some("aac"));
    assert_eq!(settings.channels(), Some(1));
    assert_eq!(cfg.to_session_config().tick_interval, Duration::from_secs(1));
    assert_eq!(cfg.log_level()?, Level::INFO);

    Ok(())
}

#[test]
fn test_default_config_matches_builtin_settings() {
    let cfg = Config::default();
    assert_eq!(cfg.recorder_settings(), RecorderSettings::default());
}

#[test]
fn test_missing_file() -> Result<()> {
    let dir = TempDir::new()?;
    let name = dir.path().join("absent").display().to_string();

    assert!(Config::load(&name).is_err(), "load requires the file");

    let cfg = Config::load_or_default(&name)?;
    assert_eq!(cfg.session.tick_interval_ms, 1000);

    Ok(())
}

#[test]
fn test_zero_tick_interval_is_clamped() -> Result<()> {
    let dir = TempDir::new()?;
    let name = write_config(&dir, "[session]\ntick_interval_ms = 0\n")?;

    let cfg = Config::load(&name)?;
    assert_eq!(cfg.to_session_config().tick_interval, Duration::from_millis(1));

    Ok(())
}

#[test]
fn test_invalid_log_level() -> Result<()> {
    let dir = TempDir::new()?;
    let name = write_config(&dir, "[logging]\nlevel = \"loud\"\n")?;

    let cfg = Config::load(&name)?;
    assert!(cfg.log_level().is_err());

    Ok(())
}

#[test]
fn test_shipped_config_loads() -> Result<()> {
    let name = format!("{}/config/voice-memo-recorder", env!("CARGO_MANIFEST_DIR"));
    let cfg = Config::load(&name)?;

    assert_eq!(cfg.recorder_settings(), RecorderSettings::default());
    Ok(())
}
