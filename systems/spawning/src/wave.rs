//! Wave sizing and per-wave bookkeeping.

use colony_defence_core::{Sector, WaveId};

/// Lifecycle of the spawner between and during waves.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WavePhase {
    /// No wave has started yet, or the last one was cancelled.
    Idle,
    /// A wave has sized its quotas and drawn its sector; placement begins
    /// on the next update.
    SelectingSector,
    /// Hostiles are being placed.
    Placing,
    /// The last attempt failed and placement is retrying with a new candidate.
    Retrying,
    /// The last wave finished placing.
    Complete,
}

impl WavePhase {
    /// Whether a wave is currently in progress.
    #[must_use]
    pub const fn is_running(self) -> bool {
        matches!(self, Self::SelectingSector | Self::Placing | Self::Retrying)
    }
}

/// Quotas and counters of the wave in progress.
#[derive(Clone, Debug, PartialEq)]
pub struct WaveState {
    id: WaveId,
    tutorial: bool,
    hostiles: u32,
    majority_quota: u32,
    minority_quota: u32,
    majority_count: u32,
    minority_count: u32,
    sector: Sector,
}

impl WaveState {
    pub(crate) fn new(id: WaveId, tutorial: bool, hostiles: u32, majority_share: f32, sector: Sector) -> Self {
        let majority_quota = if tutorial {
            hostiles
        } else {
            majority_quota(hostiles, majority_share)
        };
        Self {
            id,
            tutorial,
            hostiles,
            majority_quota,
            minority_quota: hostiles - majority_quota,
            majority_count: 0,
            minority_count: 0,
            sector,
        }
    }

    pub(crate) fn idle() -> Self {
        Self::new(WaveId::new(0, 0), false, 0, 0.0, Sector::full_circle())
    }

    /// Identifier of the wave.
    #[must_use]
    pub const fn id(&self) -> WaveId {
        self.id
    }

    /// Whether this is a combat tutorial wave.
    #[must_use]
    pub const fn is_tutorial(&self) -> bool {
        self.tutorial
    }

    /// Nominal number of hostiles in the wave.
    #[must_use]
    pub const fn hostiles(&self) -> u32 {
        self.hostiles
    }

    /// Hostiles allowed inside the sector.
    #[must_use]
    pub const fn majority_quota(&self) -> u32 {
        self.majority_quota
    }

    /// Hostiles allowed outside the sector.
    #[must_use]
    pub const fn minority_quota(&self) -> u32 {
        self.minority_quota
    }

    /// Hostiles placed inside the sector so far.
    #[must_use]
    pub const fn majority_count(&self) -> u32 {
        self.majority_count
    }

    /// Hostiles placed outside the sector so far.
    #[must_use]
    pub const fn minority_count(&self) -> u32 {
        self.minority_count
    }

    /// Hostiles placed so far.
    #[must_use]
    pub const fn spawned(&self) -> u32 {
        self.majority_count + self.minority_count
    }

    /// Sector receiving the majority of the wave.
    #[must_use]
    pub const fn sector(&self) -> Sector {
        self.sector
    }

    pub(crate) fn is_filled(&self) -> bool {
        self.spawned() >= self.hostiles
    }

    pub(crate) fn has_room(&self, in_majority: bool) -> bool {
        if in_majority {
            self.majority_count < self.majority_quota
        } else {
            self.minority_count < self.minority_quota
        }
    }

    pub(crate) fn record(&mut self, in_majority: bool) {
        if in_majority {
            self.majority_count += 1;
        } else {
            self.minority_count += 1;
        }
    }
}

/// Multiplier ramping wave size from half strength to full strength over a night.
///
/// The first wave of a night gets `0.5`, the last gets `1.0`; a single-wave
/// night always gets `1.0`.
#[must_use]
pub fn wave_multiplier(wave: u32, waves_per_night: u32) -> f32 {
    if waves_per_night <= 1 {
        return 1.0;
    }
    let progress = wave.saturating_sub(1) as f32 / (waves_per_night - 1) as f32;
    0.5 * (1.0 + progress.min(1.0))
}

/// Nominal hostiles in a regular wave.
#[must_use]
pub fn hostiles_in_wave(
    building_count: u32,
    max_per_building: f32,
    wave: u32,
    waves_per_night: u32,
) -> u32 {
    let nominal = building_count as f32 * max_per_building * wave_multiplier(wave, waves_per_night);
    nominal.round().max(0.0) as u32
}

/// Share of a wave assigned to the majority sector, rounded to the nearest hostile.
#[must_use]
pub fn majority_quota(hostiles: u32, majority_share: f32) -> u32 {
    let quota = (hostiles as f32 * majority_share).round().max(0.0) as u32;
    quota.min(hostiles)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multiplier_ramps_over_the_night() {
        assert_eq!(wave_multiplier(1, 3), 0.5);
        assert_eq!(wave_multiplier(2, 3), 0.75);
        assert_eq!(wave_multiplier(3, 3), 1.0);
        assert_eq!(wave_multiplier(1, 1), 1.0);
    }

    #[test]
    fn wave_size_rounds_to_nearest() {
        assert_eq!(hostiles_in_wave(10, 1.0, 1, 1), 10);
        assert_eq!(hostiles_in_wave(5, 1.0, 1, 2), 3);
        assert_eq!(hostiles_in_wave(4, 1.5, 2, 2), 6);
        assert_eq!(hostiles_in_wave(0, 3.0, 1, 1), 0);
    }

    #[test]
    fn quotas_split_seventy_thirty() {
        let state = WaveState::new(WaveId::new(0, 1), false, 10, 0.7, Sector::new(0.0, 120.0));
        assert_eq!(state.majority_quota(), 7);
        assert_eq!(state.minority_quota(), 3);

        let small = WaveState::new(WaveId::new(0, 1), false, 1, 0.7, Sector::new(0.0, 120.0));
        assert_eq!(small.majority_quota() + small.minority_quota(), 1);
    }

    #[test]
    fn tutorial_waves_place_everything_in_the_majority() {
        let mut state = WaveState::new(WaveId::new(0, 0), true, 3, 0.7, Sector::full_circle());
        assert_eq!(state.majority_quota(), 3);
        assert_eq!(state.minority_quota(), 0);
        assert!(!state.has_room(false));
        state.record(true);
        state.record(true);
        state.record(true);
        assert!(state.is_filled());
        assert!(!state.has_room(true));
    }
}
