//! Configuration initialization and hierarchy management

use anyhow::{Context, Result};

use crate::adapters::toml_config::{AppConfig, TomlConfigAdapter};
use crate::cli::Cli;
use crate::utils::logging::parse_level;

/// Environment variables read on top of the config file
pub const ENV_MAPPINGS: &[(&str, &str)] = &[
    ("SEAMCUT_FFMPEG", "tools.ffmpeg"),
    ("SEAMCUT_FFPROBE", "tools.ffprobe"),
    ("SEAMCUT_LOG_LEVEL", "logging.level"),
    ("SEAMCUT_LOG_JSON", "logging.json"),
    ("SEAMCUT_OVERWRITE", "cut.overwrite"),
    ("SEAMCUT_SMART_CUT", "cut.smart_cut"),
    ("SEAMCUT_KEYFRAME_CUT", "cut.keyframe_cut"),
    ("SEAMCUT_KEYFRAME_WINDOW", "keyframes.window"),
];

/// Resolve configuration following precedence: CLI > Env > File > Defaults
pub fn resolve_config(cli: &Cli) -> Result<AppConfig> {
    let mut config = match TomlConfigAdapter::discover(cli.config.as_deref())? {
        Some(path) => TomlConfigAdapter::load(&path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => AppConfig::default(),
    };

    apply_environment(&mut config, |name| std::env::var(name).ok())?;
    apply_cli_overrides(&mut config, cli)?;
    Ok(config)
}

/// Apply `SEAMCUT_*` variables looked up through `lookup`
pub fn apply_environment(
    config: &mut AppConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<()> {
    for (variable, key) in ENV_MAPPINGS {
        let Some(value) = lookup(variable) else {
            continue;
        };
        let invalid = || format!("Invalid value for {}: '{}'", variable, value);
        match *key {
            "tools.ffmpeg" => config.tools.ffmpeg = value.clone(),
            "tools.ffprobe" => config.tools.ffprobe = value.clone(),
            "logging.level" => config.logging.level = parse_level(&value).with_context(invalid)?,
            "logging.json" => config.logging.json = parse_bool(&value).with_context(invalid)?,
            "cut.overwrite" => config.cut.overwrite = parse_bool(&value).with_context(invalid)?,
            "cut.smart_cut" => config.cut.smart_cut = parse_bool(&value).with_context(invalid)?,
            "cut.keyframe_cut" => {
                config.cut.keyframe_cut = parse_bool(&value).with_context(invalid)?
            }
            "keyframes.window" => {
                config.keyframes.window = value
                    .trim()
                    .parse::<f64>()
                    .ok()
                    .filter(|w| *w > 0.0)
                    .with_context(invalid)?
            }
            _ => {}
        }
    }
    Ok(())
}

/// Apply the global command-line flags
pub fn apply_cli_overrides(config: &mut AppConfig, cli: &Cli) -> Result<()> {
    if let Some(level) = &cli.log_level {
        config.logging.level = parse_level(level)?;
    }
    if cli.json_logs {
        config.logging.json = true;
    }
    if let Some(ffmpeg) = &cli.ffmpeg {
        config.tools.ffmpeg = ffmpeg.clone();
    }
    if let Some(ffprobe) = &cli.ffprobe {
        config.tools.ffprobe = ffprobe.clone();
    }
    Ok(())
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
