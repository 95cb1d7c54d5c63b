//! Status priority and usage billing.

use geosage_core::GeoStatus;
use geosage_store::UsageDelta;

/// Statuses from worst to best. A document reports the worst status of its entities.
const PRIORITY: [GeoStatus; 7] = [
    GeoStatus::Ratelimit,
    GeoStatus::Invalid,
    GeoStatus::Ok,
    GeoStatus::CacheMiss,
    GeoStatus::CacheNever,
    GeoStatus::CacheHit,
    GeoStatus::Requestlimit,
];

fn rank(status: GeoStatus) -> usize {
    PRIORITY
        .iter()
        .position(|s| *s == status)
        .unwrap_or(PRIORITY.len())
}

/// The lower-priority (worse) of two statuses.
pub fn worst(a: GeoStatus, b: GeoStatus) -> GeoStatus {
    if rank(b) < rank(a) {
        b
    } else {
        a
    }
}

/// Count one query with `status` in its usage bucket.
pub fn bill(delta: &mut UsageDelta, status: GeoStatus) {
    match status {
        GeoStatus::Ratelimit => delta.ratelimit += 1,
        GeoStatus::Invalid => delta.invalid += 1,
        GeoStatus::CacheMiss | GeoStatus::CacheNever | GeoStatus::Ok => delta.cache_miss += 1,
        GeoStatus::CacheHit => delta.cache_hit += 1,
        GeoStatus::Requestlimit => {}
    }
}
