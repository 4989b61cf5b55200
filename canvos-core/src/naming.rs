//! Cluster profile names
//!
//! Names look like `edge-<suffix>-<YYYY-MM-DD>-<hash7>`. The hash is
//! seeded from the clock, a process-wide counter and a random nonce, so
//! two names generated back to back never share a suffix.

use chrono::Local;
use sha2::{Digest, Sha256};
use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

/// Length of the hex digest kept in a generated name
pub const NAME_HASH_LEN: usize = 7;

static NAME_COUNTER: AtomicU64 = AtomicU64::new(0);

pub fn generate_cluster_profile_name(suffix: &str) -> String {
    let now = Local::now();
    let seed = format!(
        "{}:{}:{}",
        now.timestamp_nanos_opt().unwrap_or_else(|| now.timestamp_micros()),
        NAME_COUNTER.fetch_add(1, Ordering::Relaxed),
        Uuid::new_v4()
    );

    let digest = hex::encode(Sha256::digest(seed.as_bytes()));

    format!(
        "edge-{}-{}-{}",
        suffix,
        now.format("%Y-%m-%d"),
        &digest[..NAME_HASH_LEN]
    )
}
