//! Deterministic variant bucketing.

use sha2::{Digest, Sha256};

use crate::catalog::{Experiment, Variant};

/// Stable bucket in `0..modulo` for a (user, experiment) pair.
///
/// The first eight bytes of `SHA-256("{experiment_id}:{user_id}")` read as a
/// big-endian integer. `modulo` of zero is treated as one.
pub fn bucket(user_id: &str, experiment_id: &str, modulo: u64) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(experiment_id.as_bytes());
    hasher.update(b":");
    hasher.update(user_id.as_bytes());
    let digest = hasher.finalize();

    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(prefix) % modulo.max(1)
}

/// Pick the variant a user lands in.
///
/// Variants own contiguous ranges of the bucket space sized by weight, in
/// declaration order. Returns `None` for experiments with no weight.
pub fn assign_variant<'a>(user_id: &str, experiment: &'a Experiment) -> Option<&'a Variant> {
    let total = experiment.total_weight();
    if total == 0 {
        return None;
    }

    let mut point = bucket(user_id, &experiment.id, total);
    for variant in &experiment.variants {
        let weight = u64::from(variant.weight);
        if point < weight {
            return Some(variant);
        }
        point -= weight;
    }
    None
}
