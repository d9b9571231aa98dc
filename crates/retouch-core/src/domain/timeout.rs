//! Timeout policy: maps a workload size hint to a maximum processing duration.

use std::time::Duration;

/// Pixels per megapixel used for the thresholds below.
pub const PIXELS_PER_MEGAPIXEL: f64 = 1024.0 * 1024.0;

/// Used when no (or a zero) size hint is known.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Upper megapixel bound (inclusive) -> timeout. Anything above the last tier
/// gets `LARGEST_TIMEOUT`.
const TIERS: [(f64, Duration); 4] = [
    (2.0, Duration::from_secs(30)),
    (8.0, Duration::from_secs(120)),
    (20.0, Duration::from_secs(300)),
    (50.0, Duration::from_secs(600)),
];

const LARGEST_TIMEOUT: Duration = Duration::from_secs(900);

/// Size hint expressed in megapixels.
pub fn megapixels(size_hint: u64) -> f64 {
    size_hint as f64 / PIXELS_PER_MEGAPIXEL
}

/// Maximum processing time for a task with the given size hint.
///
/// The same value is returned to the submitter as the estimated processing time.
pub fn timeout_for(size_hint: Option<u64>) -> Duration {
    let Some(pixels) = size_hint.filter(|&p| p > 0) else {
        return DEFAULT_TIMEOUT;
    };
    let mp = megapixels(pixels);
    TIERS
        .iter()
        .find(|(ceiling, _)| mp <= *ceiling)
        .map(|(_, timeout)| *timeout)
        .unwrap_or(LARGEST_TIMEOUT)
}
