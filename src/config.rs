/*
 * This file is part of smcfan.
 *
 * Copyright (C) 2025 smcfan contributors
 *
 * smcfan is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * smcfan is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with smcfan. If not, see <https://www.gnu.org/licenses/>.
 */

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::constants::{cache, fan, paths, temperature};
use crate::error::{Result, SmcError};
use crate::sensors::SensorKeys;

#[derive(Debug, Copy, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    #[default]
    C,
    F,
}

/// Speed settings of one fan channel
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FanChannelSettings {
    /// RPM held while the temperature is below `lower_threshold`
    pub base_rpm: u32,
    /// °C where the fan starts to speed up
    pub lower_threshold: f32,
    /// °C where the fan reaches full speed
    pub upper_threshold: f32,
}

impl Default for FanChannelSettings {
    fn default() -> Self {
        Self {
            base_rpm: fan::DEFAULT_BASE_RPM,
            lower_threshold: temperature::DEFAULT_LOWER_THRESHOLD,
            upper_threshold: temperature::DEFAULT_UPPER_THRESHOLD,
        }
    }
}

/// Settings of both fan channels and the display unit
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FanSettings {
    pub a: FanChannelSettings,
    pub b: FanChannelSettings,
    pub metric: Metric,
}

fn default_cache_capacity() -> usize { cache::DEFAULT_CAPACITY }

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SmcConfig {
    /// Controller keys of each sensor
    #[serde(default)]
    pub keys: SensorKeys,
    /// Number of keys whose metadata is cached
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,
    #[serde(default)]
    pub fans: FanSettings,
}

impl Default for SmcConfig {
    fn default() -> Self {
        Self {
            keys: SensorKeys::default(),
            cache_capacity: default_cache_capacity(),
            fans: FanSettings::default(),
        }
    }
}

pub fn config_path() -> PathBuf {
    if let Ok(path) = env::var(paths::CONFIG_ENV) {
        return PathBuf::from(path);
    }
    if let Ok(xdg) = env::var("XDG_CONFIG_HOME") {
        return Path::new(&xdg).join(paths::CONFIG_DIR_NAME).join(paths::CONFIG_FILE);
    }
    if let Ok(home) = env::var("HOME") {
        return Path::new(&home)
            .join(".config")
            .join(paths::CONFIG_DIR_NAME)
            .join(paths::CONFIG_FILE);
    }
    PathBuf::from(paths::SYSTEM_CONFIG)
}

/// Check one fan channel's settings
pub fn validate_channel(name: &str, ch: &FanChannelSettings) -> std::result::Result<(), String> {
    if ch.base_rpm > fan::FPE2_MAX_RPM {
        return Err(format!("fan {}: base rpm {} above {}", name, ch.base_rpm, fan::FPE2_MAX_RPM));
    }
    for (label, t) in [("lower", ch.lower_threshold), ("upper", ch.upper_threshold)] {
        let range = temperature::MIN_THRESHOLD..=temperature::MAX_THRESHOLD;
        if !t.is_finite() || !range.contains(&t) {
            return Err(format!("fan {}: {} threshold {} out of range", name, label, t));
        }
    }
    if ch.lower_threshold >= ch.upper_threshold {
        return Err(format!("fan {}: lower threshold must be below upper threshold", name));
    }
    Ok(())
}

pub fn validate_config(cfg: &SmcConfig) -> std::result::Result<(), String> {
    if cfg.cache_capacity > cache::MAX_CAPACITY {
        return Err(format!("cache capacity {} above {}", cfg.cache_capacity, cache::MAX_CAPACITY));
    }
    validate_channel("a", &cfg.fans.a)?;
    validate_channel("b", &cfg.fans.b)?;
    Ok(())
}

/// Load and validate the configuration at `path`
pub fn load_config_from(path: &Path) -> Result<SmcConfig> {
    let read_err = |e: std::io::Error| SmcError::FileRead { path: path.to_path_buf(), source: e };
    let meta = fs::metadata(path).map_err(read_err)?;
    if meta.len() > paths::MAX_CONFIG_SIZE {
        return Err(SmcError::invalid_config(
            path.display().to_string(),
            format!("file is {} bytes, max {}", meta.len(), paths::MAX_CONFIG_SIZE),
        ));
    }
    let data = fs::read_to_string(path).map_err(read_err)?;
    let cfg: SmcConfig = serde_json::from_str(&data)?;
    validate_config(&cfg)
        .map_err(|reason| SmcError::invalid_config(path.display().to_string(), reason))?;
    info!(path = %path.display(), "loaded configuration");
    Ok(cfg)
}

/// Load the configuration from [`config_path`], falling back to defaults when
/// no file exists. A file that exists but is invalid is an error.
pub fn load_config() -> Result<SmcConfig> {
    let path = config_path();
    if !path.exists() {
        debug!(path = %path.display(), "no configuration file, using defaults");
        return Ok(SmcConfig::default());
    }
    load_config_from(&path)
}
