//! Per-wave random stream derivation.

use sha2::{Digest, Sha256};

/// Derives the seed of a wave's random stream.
///
/// `sequence` counts every wave started in the session, so tutorial waves that
/// share a night and wave number still draw from distinct streams.
pub(crate) fn derive_wave_seed(global_seed: u64, night: u32, wave: u32, sequence: u64) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(global_seed.to_le_bytes());
    hasher.update(night.to_le_bytes());
    hasher.update(wave.to_le_bytes());
    hasher.update(sequence.to_le_bytes());
    let digest = hasher.finalize();
    let mut bytes = [0_u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(bytes)
}
