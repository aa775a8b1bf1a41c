//! Tuning parameters for wave spawning.

use std::time::Duration;

use colony_defence_core::{MoverClass, FULL_CIRCLE_DEGREES};
use serde::Deserialize;

/// Reasons a [`SpawnerConfig`] is rejected.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    /// The crawler frequency lies outside `[0, 1]`.
    #[error("crawler frequency must lie in [0, 1], got {0}")]
    CrawlerFrequency(f32),
    /// A night must contain at least one wave.
    #[error("waves per night must be at least 1")]
    NoWavesPerNight,
    /// The sector width lies outside `(0, 360]`.
    #[error("sector width must lie in (0, 360] degrees, got {0}")]
    SectorWidth(f32),
    /// The majority share lies outside `[0, 1]`.
    #[error("majority share must lie in [0, 1], got {0}")]
    MajorityShare(f32),
    /// A per-building hostile count is negative or not finite.
    #[error("hostiles per building must be non-negative (cap {max}, nightly increment {increment})")]
    PerBuilding {
        /// Configured per-building cap.
        max: f32,
        /// Configured nightly increment.
        increment: f32,
    },
}

/// Parameters controlling wave size, pacing and placement.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct SpawnerConfig {
    /// Quiet period after the last hostile death before a new wave may start.
    pub wave_delay_ms: u64,
    /// Waves released per night.
    pub waves_per_night: u32,
    /// Hostiles per building in the last wave of the first night.
    pub max_per_building: f32,
    /// Added to `max_per_building` at the start of every night after the first.
    pub per_building_increment_per_night: f32,
    /// Fraction of hostiles that are crawlers.
    pub crawler_frequency: f32,
    /// Angular width of the majority sector, in degrees.
    pub sector_width_degrees: f32,
    /// Share of each wave placed inside the sector.
    pub majority_share: f32,
    /// Size of every combat tutorial wave.
    pub tutorial_wave_size: u32,
    /// Crowding margin cleared around a freshly placed scuttler.
    pub scuttler_margin: u32,
    /// Crowding margin cleared around a freshly placed crawler.
    pub crawler_margin: u32,
    /// Consecutive attempts without any open candidate before the wave is cut short.
    pub max_empty_retries: u32,
    /// Consecutive quota rejections before the wave is cut short.
    pub max_consecutive_rejections: u32,
    /// Seed all per-wave random streams are derived from.
    pub seed: u64,
}

impl SpawnerConfig {
    /// Checks that every parameter lies in its valid range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.crawler_frequency) {
            return Err(ConfigError::CrawlerFrequency(self.crawler_frequency));
        }
        if self.waves_per_night == 0 {
            return Err(ConfigError::NoWavesPerNight);
        }
        if !(self.sector_width_degrees > 0.0 && self.sector_width_degrees <= FULL_CIRCLE_DEGREES) {
            return Err(ConfigError::SectorWidth(self.sector_width_degrees));
        }
        if !(0.0..=1.0).contains(&self.majority_share) {
            return Err(ConfigError::MajorityShare(self.majority_share));
        }
        let per_building_valid = |value: f32| value.is_finite() && value >= 0.0;
        if !per_building_valid(self.max_per_building)
            || !per_building_valid(self.per_building_increment_per_night)
        {
            return Err(ConfigError::PerBuilding {
                max: self.max_per_building,
                increment: self.per_building_increment_per_night,
            });
        }
        Ok(())
    }

    /// Quiet period as a duration.
    #[must_use]
    pub fn wave_delay(&self) -> Duration {
        Duration::from_millis(self.wave_delay_ms)
    }

    /// Crowding margin for the mover class.
    #[must_use]
    pub fn margin(&self, mover: MoverClass) -> u32 {
        match mover {
            MoverClass::Scuttler => self.scuttler_margin,
            MoverClass::Crawler => self.crawler_margin,
        }
    }
}

impl Default for SpawnerConfig {
    fn default() -> Self {
        Self {
            wave_delay_ms: 5_000,
            waves_per_night: 3,
            max_per_building: 1.0,
            per_building_increment_per_night: 0.5,
            crawler_frequency: 0.2,
            sector_width_degrees: 120.0,
            majority_share: 0.7,
            tutorial_wave_size: 3,
            scuttler_margin: MoverClass::Scuttler.default_crowding_margin(),
            crawler_margin: MoverClass::Crawler.default_crowding_margin(),
            max_empty_retries: 3,
            max_consecutive_rejections: 4_096,
            seed: 0x5eed_c010_4e5d_0001,
        }
    }
}
