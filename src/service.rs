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

//! Fan service capability interface
//!
//! [`FanService`] is the narrow set of operations a fan daemon exposes to its
//! clients: per-channel base speed and thresholds, the display unit, and one
//! bulk sensor snapshot. How it is carried between processes is up to the
//! host; [`LocalFanService`] implements it in-process over an [`Smc`].

use parking_lot::RwLock;
use tracing::info;

use crate::channel::Channel;
use crate::config::{validate_channel, FanChannelSettings, FanSettings, Metric, SmcConfig};
use crate::error::{Result, SmcError};
use crate::protocol::Smc;
use crate::sensors::{SensorKeys, Snapshot};

/// One of the two independently configured fan channels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FanChannel {
    A,
    B,
}

impl FanChannel {
    fn name(self) -> &'static str {
        match self {
            FanChannel::A => "a",
            FanChannel::B => "b",
        }
    }
}

/// Operations a fan daemon offers its clients
pub trait FanService {
    fn base_rpm(&self, channel: FanChannel) -> u32;
    fn set_base_rpm(&self, channel: FanChannel, rpm: u32) -> Result<()>;

    fn lower_threshold(&self, channel: FanChannel) -> f32;
    fn set_lower_threshold(&self, channel: FanChannel, celsius: f32) -> Result<()>;

    fn upper_threshold(&self, channel: FanChannel) -> f32;
    fn set_upper_threshold(&self, channel: FanChannel, celsius: f32) -> Result<()>;

    fn fahrenheit(&self) -> bool;
    fn set_fahrenheit(&self, fahrenheit: bool);

    /// Current reading of every sensor, temperatures in °C
    fn snapshot(&self) -> Snapshot;
}

/// In-process [`FanService`] backed by a controller client
pub struct LocalFanService<C: Channel> {
    smc: Smc<C>,
    keys: SensorKeys,
    settings: RwLock<FanSettings>,
}

impl<C: Channel> LocalFanService<C> {
    pub fn new(smc: Smc<C>, keys: SensorKeys, settings: FanSettings) -> Self {
        Self { smc, keys, settings: RwLock::new(settings) }
    }

    pub fn from_config(smc: Smc<C>, config: &SmcConfig) -> Self {
        Self::new(smc, config.keys.clone(), config.fans)
    }

    pub fn smc(&self) -> &Smc<C> {
        &self.smc
    }

    pub fn settings(&self) -> FanSettings {
        *self.settings.read()
    }

    fn channel(&self, channel: FanChannel) -> FanChannelSettings {
        let settings = self.settings.read();
        match channel {
            FanChannel::A => settings.a,
            FanChannel::B => settings.b,
        }
    }

    /// Apply `change` to a copy of the channel settings and store it only if
    /// the result is valid
    fn update(
        &self,
        channel: FanChannel,
        change: impl FnOnce(&mut FanChannelSettings),
    ) -> Result<()> {
        let mut settings = self.settings.write();
        let slot = match channel {
            FanChannel::A => &mut settings.a,
            FanChannel::B => &mut settings.b,
        };
        let mut candidate = *slot;
        change(&mut candidate);
        validate_channel(channel.name(), &candidate).map_err(|reason| {
            SmcError::invalid_config(format!("fans.{}", channel.name()), reason)
        })?;
        *slot = candidate;
        info!(channel = channel.name(), ?candidate, "fan settings updated");
        Ok(())
    }
}

impl<C: Channel> FanService for LocalFanService<C> {
    fn base_rpm(&self, channel: FanChannel) -> u32 {
        self.channel(channel).base_rpm
    }

    fn set_base_rpm(&self, channel: FanChannel, rpm: u32) -> Result<()> {
        self.update(channel, |c| c.base_rpm = rpm)
    }

    fn lower_threshold(&self, channel: FanChannel) -> f32 {
        self.channel(channel).lower_threshold
    }

    fn set_lower_threshold(&self, channel: FanChannel, celsius: f32) -> Result<()> {
        self.update(channel, |c| c.lower_threshold = celsius)
    }

    fn upper_threshold(&self, channel: FanChannel) -> f32 {
        self.channel(channel).upper_threshold
    }

    fn set_upper_threshold(&self, channel: FanChannel, celsius: f32) -> Result<()> {
        self.update(channel, |c| c.upper_threshold = celsius)
    }

    fn fahrenheit(&self) -> bool {
        self.settings.read().metric == Metric::F
    }

    fn set_fahrenheit(&self, fahrenheit: bool) {
        self.settings.write().metric = if fahrenheit { Metric::F } else { Metric::C };
    }

    fn snapshot(&self) -> Snapshot {
        self.smc.snapshot(&self.keys)
    }
}
